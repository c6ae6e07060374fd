//! INSTREAM chunk framing.
//!
//! Each chunk is a 4-byte big-endian length followed by that many payload
//! bytes. A zero length ends the stream. Nothing here flushes explicitly:
//! the caller flushes once, after the terminator. A buffered writer may still
//! spill to the socket while chunks are written, so those writes can block.

use crate::core::result::PayloadSummary;
use crate::protocol::command::Command;

use std::future::Future;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default chunk size for streaming sources.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// The 4-byte zero-length chunk that ends a stream.
pub const END_OF_STREAM: [u8; 4] = [0; 4];

/// Failure while streaming a source, split by side.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Reading the source failed.
    #[error("reading source failed: {0}")]
    Source(#[source] io::Error),

    /// Writing to the daemon failed.
    #[error("writing to daemon failed: {0}")]
    Sink(#[source] io::Error),

    /// A write to the daemon did not complete in time.
    #[error("writing to daemon stalled for {0:?}")]
    Stalled(Duration),
}

/// Writes a command.
pub async fn write_command<W>(writer: &mut W, command: Command) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(command.as_bytes()).await
}

/// Writes one length-prefixed chunk. Empty chunks are rejected since they
/// would end the stream.
pub async fn write_chunk<W>(writer: &mut W, chunk: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if chunk.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "empty chunk would terminate the stream",
        ));
    }
    let len = u32::try_from(chunk.len()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "chunk longer than u32::MAX")
    })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(chunk).await
}

/// Writes the zero-length terminator.
pub async fn write_end_of_stream<W>(writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(&END_OF_STREAM).await
}

/// Streams `source` to `writer` as chunks of at most `chunk_size` bytes,
/// followed by the terminator.
///
/// Every chunk except the last is exactly `chunk_size` bytes, so a source of
/// `n` bytes produces `ceil(n / chunk_size)` chunks regardless of how the
/// source splits its reads.
pub async fn stream_source<R, W>(
    source: &mut R,
    writer: &mut W,
    chunk_size: usize,
) -> Result<PayloadSummary, StreamError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    send_stream(source, writer, chunk_size, None).await
}

/// Like [`stream_source`], but each chunk and the terminator must be written
/// within `write_timeout`. Reads from `source` are not bounded.
pub async fn stream_source_with_timeout<R, W>(
    source: &mut R,
    writer: &mut W,
    chunk_size: usize,
    write_timeout: Duration,
) -> Result<PayloadSummary, StreamError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    send_stream(source, writer, chunk_size, Some(write_timeout)).await
}

async fn send_stream<R, W>(
    source: &mut R,
    writer: &mut W,
    chunk_size: usize,
    write_timeout: Option<Duration>,
) -> Result<PayloadSummary, StreamError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut hasher = blake3::Hasher::new();
    let mut chunks = 0u64;
    let mut bytes = 0u64;

    loop {
        let filled = fill_chunk(source, &mut buffer)
            .await
            .map_err(StreamError::Source)?;
        if filled == 0 {
            break;
        }

        let chunk = &buffer[..filled];
        bounded(write_timeout, write_chunk(writer, chunk)).await?;
        hasher.update(chunk);
        chunks += 1;
        bytes += filled as u64;

        if filled < buffer.len() {
            break;
        }
    }

    bounded(write_timeout, write_end_of_stream(writer)).await?;

    Ok(PayloadSummary {
        chunks,
        bytes,
        blake3: hasher.finalize().to_hex().to_string(),
    })
}

async fn bounded<F>(write_timeout: Option<Duration>, write: F) -> Result<(), StreamError>
where
    F: Future<Output = io::Result<()>>,
{
    let written = match write_timeout {
        Some(limit) => tokio::time::timeout(limit, write)
            .await
            .map_err(|_| StreamError::Stalled(limit))?,
        None => write.await,
    };
    written.map_err(StreamError::Sink)
}

/// Reads until `buffer` is full or the source is exhausted.
async fn fill_chunk<R>(source: &mut R, buffer: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buffer.len() {
        match source.read(&mut buffer[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads one length-prefixed chunk. Returns `None` at the terminator.
pub async fn read_chunk<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let len = reader.read_u32().await? as usize;
    if len == 0 {
        return Ok(None);
    }
    let mut chunk = vec![0u8; len];
    reader.read_exact(&mut chunk).await?;
    Ok(Some(chunk))
}

/// Reads chunks up to and including the terminator.
pub async fn read_stream<R>(reader: &mut R) -> io::Result<Vec<Vec<u8>>>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut chunks = Vec::new();
    while let Some(chunk) = read_chunk(reader).await? {
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Reads one command line. Returns `Ok(None)` on a clean EOF.
///
/// Both `z` (NUL) and `n` (newline) terminated commands are accepted; the
/// raw bytes are returned including the terminator.
pub async fn read_command<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut raw = Vec::new();
    let prefix = reader.read_u8().await;
    let prefix = match prefix {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    };
    raw.push(prefix);
    let delimiter = if prefix == b'n' { b'\n' } else { b'\0' };
    reader.read_until(delimiter, &mut raw).await?;
    Ok(Some(raw))
}

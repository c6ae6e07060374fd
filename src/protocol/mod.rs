//! The clamd wire protocol, independent of any transport.
//!
//! Everything here is generic over `AsyncRead`/`AsyncWrite`, so the framing
//! can be exercised against `tokio::io::duplex` or a plain `Vec<u8>` as well
//! as a socket.
//!
//! ## Wire format
//!
//! | step          | bytes                                     |
//! |---------------|-------------------------------------------|
//! | session start | `zIDSESSION\0`                            |
//! | stream start  | `zINSTREAM\0`                             |
//! | chunk         | `u32` big-endian length `L`, then `L` bytes |
//! | stream end    | `u32` zero                                |
//! | session end   | `zEND\0`                                  |
//!
//! A reply containing `FOUND` reports a signature match.

mod command;
mod frame;
mod reply;

pub use command::Command;
pub use frame::{
    read_chunk, read_command, read_stream, stream_source, stream_source_with_timeout, write_chunk,
    write_command, write_end_of_stream, StreamError, DEFAULT_CHUNK_SIZE, END_OF_STREAM,
};
pub use reply::{
    decode_reply, is_error_reply, parse_scan_reply, read_reply, RawReply, Reply, FOUND_MARKER,
    MAX_REPLY_LEN,
};

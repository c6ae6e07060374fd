//! Reading and interpreting daemon replies.

use crate::core::error::ScanError;
use crate::core::types::ScanOutcome;

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Upper bound on a single reply.
pub const MAX_REPLY_LEN: usize = 8192;

/// Marker the daemon puts in the reply of a positive match.
pub const FOUND_MARKER: &str = "FOUND";

/// Bytes of one reply as read off the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReply {
    /// Reply bytes, without the NUL terminator.
    pub bytes: Vec<u8>,
    /// The peer closed its side while (or before) the reply was read.
    pub eof: bool,
    /// No terminator within the length bound. The rest of the reply is still
    /// unread, so the transport is out of step with the daemon.
    pub overflow: bool,
}

/// Reads a single reply: up to the NUL terminator, EOF or `max_len` bytes.
///
/// Only the reply is consumed; anything the daemon sent after the NUL stays
/// in `reader`'s buffer for the next call.
pub async fn read_reply<R>(reader: &mut R, max_len: usize) -> io::Result<RawReply>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let max_len = max_len.max(1);
    let mut bytes = Vec::new();
    AsyncReadExt::take(&mut *reader, max_len as u64 + 1)
        .read_until(0, &mut bytes)
        .await?;

    if bytes.last() == Some(&0) {
        bytes.pop();
        return Ok(RawReply {
            bytes,
            eof: false,
            overflow: false,
        });
    }

    let overflow = bytes.len() > max_len;
    bytes.truncate(max_len);
    Ok(RawReply {
        bytes,
        eof: !overflow,
        overflow,
    })
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Request number echoed by the daemon in `IDSESSION` mode.
    pub request_id: Option<u64>,
    /// Reply text without the request prefix and trailing whitespace.
    pub text: String,
}

/// Decodes reply bytes into text, stripping the `<n>: ` session prefix.
pub fn decode_reply(bytes: &[u8]) -> Result<Reply, ScanError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ScanError::protocol("reply is not valid UTF-8"))?
        .trim_matches(|c: char| c == '\0' || c.is_whitespace());

    if text.is_empty() {
        return Err(ScanError::protocol("empty reply"));
    }

    let (request_id, text) = split_request_id(text);
    if text.is_empty() {
        return Err(ScanError::protocol("reply has a request id but no body"));
    }

    Ok(Reply {
        request_id,
        text: text.to_string(),
    })
}

fn split_request_id(text: &str) -> (Option<u64>, &str) {
    if let Some((head, rest)) = text.split_once(':') {
        if !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = head.parse() {
                return (Some(id), rest.trim_start());
            }
        }
    }
    (None, text)
}

/// Interprets the reply to an `INSTREAM` exchange.
///
/// Any reply containing `FOUND` is a positive match; any other decodable,
/// non-empty reply is clean.
pub fn parse_scan_reply(bytes: &[u8]) -> Result<ScanOutcome, ScanError> {
    decode_reply(bytes).map(Reply::into_scan_outcome)
}

impl Reply {
    /// Classifies this reply as the answer to an `INSTREAM` exchange.
    pub fn into_scan_outcome(self) -> ScanOutcome {
        if self.text.contains(FOUND_MARKER) {
            let signature = extract_signature(&self.text);
            ScanOutcome::Infected {
                signature,
                message: self.text,
            }
        } else {
            ScanOutcome::Clean
        }
    }
}

/// Pulls the signature name out of `stream: <signature> FOUND`.
///
/// Falls back to the whole text when the reply has another shape.
fn extract_signature(text: &str) -> String {
    let body = text
        .strip_prefix("stream:")
        .map(str::trim_start)
        .unwrap_or(text);
    let signature = body
        .strip_suffix(FOUND_MARKER)
        .map(str::trim_end)
        .unwrap_or(body);

    if signature.is_empty() {
        text.to_string()
    } else {
        signature.to_string()
    }
}

/// Returns `true` if `text` reports a daemon-side error such as an exceeded
/// stream size limit.
pub fn is_error_reply(text: &str) -> bool {
    text.trim_end().ends_with("ERROR")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_clean() {
        assert_eq!(parse_scan_reply(b"stream: OK").unwrap(), ScanOutcome::Clean);
        assert_eq!(parse_scan_reply(b"stream: OK\0").unwrap(), ScanOutcome::Clean);
        assert_eq!(parse_scan_reply(b"1: stream: OK").unwrap(), ScanOutcome::Clean);
    }

    #[test]
    fn test_parse_infected() {
        let outcome = parse_scan_reply(b"stream: Eicar-Test-Signature FOUND").unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Infected {
                signature: "Eicar-Test-Signature".into(),
                message: "stream: Eicar-Test-Signature FOUND".into(),
            }
        );

        let outcome = parse_scan_reply(b"7: stream: Win.Trojan.Agent-12345 FOUND\0").unwrap();
        assert_eq!(outcome.signature(), Some("Win.Trojan.Agent-12345"));
    }

    #[test]
    fn test_found_anywhere_is_infected() {
        let outcome = parse_scan_reply(b"FOUND something odd").unwrap();
        assert!(outcome.is_infected());
        assert_eq!(outcome.signature(), Some("FOUND something odd"));
    }

    #[test]
    fn test_empty_and_garbled_are_protocol_errors() {
        assert!(parse_scan_reply(b"").unwrap_err().is_protocol_error());
        assert!(parse_scan_reply(b"\0").unwrap_err().is_protocol_error());
        assert!(parse_scan_reply(b"  \n").unwrap_err().is_protocol_error());
        assert!(parse_scan_reply(&[0xff, 0xfe, 0x00]).unwrap_err().is_protocol_error());
        assert!(parse_scan_reply(b"3: ").unwrap_err().is_protocol_error());
    }

    #[test]
    fn test_decode_reply_request_id() {
        let reply = decode_reply(b"12: PONG\0").unwrap();
        assert_eq!(reply.request_id, Some(12));
        assert_eq!(reply.text, "PONG");

        let reply = decode_reply(b"ClamAV 1.3.1/27300/Mon Jun 10 08:00:00 2024").unwrap();
        assert_eq!(reply.request_id, None);
    }

    #[test]
    fn test_is_error_reply() {
        assert!(is_error_reply("stream: INSTREAM size limit exceeded. ERROR"));
        assert!(!is_error_reply("stream: OK"));
    }

    #[tokio::test]
    async fn test_read_reply_stops_at_nul() {
        let mut reader = Cursor::new(b"1: stream: OK\0trailing".to_vec());
        let raw = read_reply(&mut reader, MAX_REPLY_LEN).await.unwrap();
        assert_eq!(raw.bytes, b"1: stream: OK");
        assert!(!raw.eof);
        assert!(!raw.overflow);
    }

    #[tokio::test]
    async fn test_back_to_back_replies_are_kept_apart() {
        let mut reader = Cursor::new(b"1: PONG\02: stream: OK\0".to_vec());
        let first = read_reply(&mut reader, MAX_REPLY_LEN).await.unwrap();
        let second = read_reply(&mut reader, MAX_REPLY_LEN).await.unwrap();
        assert_eq!(first.bytes, b"1: PONG");
        assert_eq!(second.bytes, b"2: stream: OK");
        assert!(!second.eof);
    }

    #[tokio::test]
    async fn test_read_reply_at_eof() {
        let mut reader = Cursor::new(b"stream: OK\n".to_vec());
        let raw = read_reply(&mut reader, MAX_REPLY_LEN).await.unwrap();
        assert_eq!(raw.bytes, b"stream: OK\n");
        assert!(raw.eof);

        let mut empty = Cursor::new(Vec::new());
        let raw = read_reply(&mut empty, MAX_REPLY_LEN).await.unwrap();
        assert!(raw.bytes.is_empty());
        assert!(raw.eof);
    }

    #[tokio::test]
    async fn test_read_reply_bounded() {
        let mut reader = Cursor::new(vec![b'a'; 100]);
        let raw = read_reply(&mut reader, 16).await.unwrap();
        assert_eq!(raw.bytes.len(), 16);
        assert!(raw.overflow);
        assert!(!raw.eof);

        // Exactly at the bound with its terminator still fits.
        let mut reader = Cursor::new([vec![b'a'; 16], vec![0]].concat());
        let raw = read_reply(&mut reader, 16).await.unwrap();
        assert_eq!(raw.bytes.len(), 16);
        assert!(!raw.overflow);
    }
}

//! clamd commands.
//!
//! Commands are sent in the `z` form: a `z` prefix, the command name and a
//! NUL terminator. Replies to `z` commands are NUL terminated as well.

use std::fmt;

/// A command understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Start a session: subsequent commands share one connection.
    IdSession,
    /// Start a chunked stream scan.
    InStream,
    /// Liveness check; the daemon answers `PONG`.
    Ping,
    /// Ask for the engine and signature database version.
    Version,
    /// End the session.
    End,
}

impl Command {
    const ALL: [Command; 5] = [
        Command::IdSession,
        Command::InStream,
        Command::Ping,
        Command::Version,
        Command::End,
    ];

    /// The exact bytes written on the wire.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::IdSession => b"zIDSESSION\0",
            Self::InStream => b"zINSTREAM\0",
            Self::Ping => b"zPING\0",
            Self::Version => b"zVERSION\0",
            Self::End => b"zEND\0",
        }
    }

    /// The command name without prefix or terminator.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IdSession => "IDSESSION",
            Self::InStream => "INSTREAM",
            Self::Ping => "PING",
            Self::Version => "VERSION",
            Self::End => "END",
        }
    }

    /// Returns `true` if the daemon answers this command.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Self::IdSession | Self::End)
    }

    /// Decodes a command as read off the wire.
    ///
    /// Accepts the `z` form with or without its NUL terminator, and the
    /// newline-terminated `n` form.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let body = match raw.split_first() {
            Some((b'z', rest)) => rest.strip_suffix(b"\0").unwrap_or(rest),
            Some((b'n', rest)) => rest.strip_suffix(b"\n").unwrap_or(rest),
            _ => return None,
        };
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.name().as_bytes() == body)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

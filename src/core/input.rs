//! Byte-source abstraction for scan requests.
//!
//! A `ScanInput` describes where the bytes of one object come from. It is
//! opened right before the object is streamed and the resulting reader is
//! dropped as soon as the exchange ends, whichever way it ends.

use crate::core::error::ScanError;
use crate::core::types::ItemLabel;

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

/// A reader handed to the session for one scan.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Flexible input supporting paths, in-memory bytes and readers.
///
/// # Examples
///
/// ```rust
/// use clamstream::core::ScanInput;
///
/// let input = ScanInput::from_path("/srv/assetstore/12/34/5678");
/// let input = ScanInput::from_bytes(b"%PDF-1.7".to_vec()).with_filename("thesis.pdf");
/// ```
pub enum ScanInput {
    /// A file path on disk.
    Path(PathBuf),

    /// In-memory bytes with optional filename.
    Bytes {
        /// The data.
        data: Vec<u8>,
        /// Optional original filename.
        filename: Option<String>,
    },

    /// A reader that is consumed by the scan. Not seekable; scanning it a
    /// second time yields an empty payload.
    Reader {
        /// The reader providing the data.
        reader: BoxedReader,
        /// Optional filename.
        filename: Option<String>,
    },
}

impl fmt::Debug for ScanInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Bytes { data, filename } => f
                .debug_struct("Bytes")
                .field("data_len", &data.len())
                .field("filename", filename)
                .finish(),
            Self::Reader { filename, .. } => f
                .debug_struct("Reader")
                .field("filename", filename)
                .finish_non_exhaustive(),
        }
    }
}

impl ScanInput {
    /// Creates a `ScanInput` from a file path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Creates a `ScanInput` from bytes.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes {
            data: data.into(),
            filename: None,
        }
    }

    /// Creates a `ScanInput` from an async reader.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Reader {
            reader: Box::new(reader),
            filename: None,
        }
    }

    /// Sets the filename for bytes or reader inputs.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        match &mut self {
            Self::Bytes { filename: f, .. } | Self::Reader { filename: f, .. } => {
                *f = Some(filename.into())
            }
            Self::Path(_) => {}
        }
        self
    }

    /// Returns the filename, if known.
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Path(path) => path.file_name().and_then(|n| n.to_str()),
            Self::Bytes { filename, .. } | Self::Reader { filename, .. } => filename.as_deref(),
        }
    }

    /// Returns the size in bytes, if known without I/O.
    pub fn size_hint(&self) -> Option<u64> {
        match self {
            Self::Bytes { data, .. } => Some(data.len() as u64),
            Self::Path(_) | Self::Reader { .. } => None,
        }
    }

    /// Returns the path, if this is a path-based input.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Opens the input for reading.
    ///
    /// Readers are taken out of the input, leaving an empty one behind.
    pub async fn open(&mut self) -> Result<BoxedReader, ScanError> {
        match self {
            Self::Path(path) => {
                let file = tokio::fs::File::open(&*path).await.map_err(|e| {
                    ScanError::source_unavailable(path.display().to_string(), e.to_string())
                })?;
                Ok(Box::new(tokio::io::BufReader::new(file)))
            }
            Self::Bytes { data, .. } => Ok(Box::new(Cursor::new(data.clone()))),
            Self::Reader { reader, .. } => {
                let empty: BoxedReader = Box::new(tokio::io::empty());
                Ok(std::mem::replace(reader, empty))
            }
        }
    }
}

/// One object to scan: where its bytes come from and how to report it.
#[derive(Debug)]
pub struct ScanRequest {
    /// Label used in results and reports.
    pub label: ItemLabel,
    /// Source of the bytes.
    pub input: ScanInput,
}

impl ScanRequest {
    /// Creates a request.
    pub fn new(label: impl Into<ItemLabel>, input: impl Into<ScanInput>) -> Self {
        Self {
            label: label.into(),
            input: input.into(),
        }
    }

    /// Creates a request for a file, labelled with its file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let input = ScanInput::from_path(path);
        let name = input.filename().unwrap_or("unnamed").to_string();
        Self::new(name, input)
    }
}

impl From<PathBuf> for ScanInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ScanInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ScanInput {
    fn from(data: Vec<u8>) -> Self {
        Self::from_bytes(data)
    }
}

impl From<&[u8]> for ScanInput {
    fn from(data: &[u8]) -> Self {
        Self::from_bytes(data.to_vec())
    }
}

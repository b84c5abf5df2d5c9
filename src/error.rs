//! Error taxonomy for the sort engine (SPEC_FULL.md §7).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Exit codes matching the CLI contract (SPEC_FULL.md §6).
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_OTHER: i32 = 1;
pub const EXIT_INVALID_ARGS: i32 = 2;
pub const EXIT_IO_ERROR: i32 = 3;
pub const EXIT_CANCELLED: i32 = 4;

/// Errors surfaced by any component of the sort pipeline.
///
/// A record with an unresolved selector or an uncoercible value is
/// deliberately not an error here: [`crate::key::Comparator::compare`]
/// handles both by sinking the record to the end of its key's ordering.
#[derive(Error, Debug)]
pub enum SortxError {
    #[error("invalid key specification '{spec}': {reason}")]
    InvalidKeySpec { spec: String, reason: String },

    #[error("invalid record in {path}{}: {reason}", offset.map(|o| format!(" at offset {o}")).unwrap_or_default())]
    InvalidRecord {
        path: String,
        offset: Option<u64>,
        reason: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    PlainIo(#[from] io::Error),

    #[error("ran out of temporary disk space under {dir}")]
    ResourceExhausted { dir: PathBuf },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl SortxError {
    pub fn invalid_key_spec(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        SortxError::InvalidKeySpec {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_record(
        path: impl Into<String>,
        offset: Option<u64>,
        reason: impl Into<String>,
    ) -> Self {
        SortxError::InvalidRecord {
            path: path.into(),
            offset,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        SortxError::Io {
            path: path.into(),
            source,
        }
    }

    /// Exit code per the CLI contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            SortxError::InvalidKeySpec { .. } => EXIT_INVALID_ARGS,
            SortxError::InvalidRecord { .. } | SortxError::Io { .. } | SortxError::PlainIo(_) => {
                EXIT_IO_ERROR
            }
            SortxError::ResourceExhausted { .. } => EXIT_IO_ERROR,
            SortxError::Cancelled => EXIT_CANCELLED,
            SortxError::Other(_) => EXIT_OTHER,
        }
    }
}

pub type SortxResult<T> = Result<T, SortxError>;

/// Adds file-path context to an I/O result so user-visible messages name
/// the offending input, per SPEC_FULL.md §7.
pub trait IoContext<T> {
    fn with_path(self, path: impl Into<String>) -> SortxResult<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn with_path(self, path: impl Into<String>) -> SortxResult<T> {
        self.map_err(|e| SortxError::io(path, e))
    }
}

use crate::constants::Version;
use crate::entry::ID;
use std::io;
use thiserror::Error;

/// Error type used for archive processing errors.
///
/// Errors can be caused by underlying IO errors, unsupported features,
/// invalid data, or misuse of the archive-building API.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("not a pg_dump custom format archive")]
    NotAnArchive,

    #[error("unsupported archive format version {0:?}")]
    UnsupportedVersion(Version),

    #[error("malformed archive data{}: {message}", offset.map(|o| format!(" at offset {o}")).unwrap_or_default())]
    FormatError {
        offset: Option<u64>,
        message: String,
    },

    #[error("invalid dump id {0}")]
    InvalidId(ID),

    #[error("entry {entry} depends on unknown dump id {missing}")]
    MissingDependency { entry: ID, missing: ID },

    #[error("cyclic dependency detected among TOC entries")]
    CyclicDependencies,

    #[error("unknown object descriptor {0:?}")]
    UnknownDescriptor(String),

    #[error("no matching TOC entry found")]
    EntityNotFound,

    #[error("entry {0} has no data attached")]
    NoDataPresent(ID),

    #[error("unsupported compression method {0}")]
    CompressionMethodNotSupported(u8),

    #[error("converter failed: {0}")]
    ConverterError(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

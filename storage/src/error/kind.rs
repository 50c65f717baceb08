use std::io;
use thiserror::Error;

/// Classification of a failure, independent of the message text.
///
/// Only identity matters: callers compare kinds, never their discriminants.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[error("internal error")]
    Internal,

    #[error("can not create file")]
    FileCreationFailed,

    #[error("failed to initialize from file")]
    InitFailed,

    #[error("configuration error")]
    InvalidConfig,

    #[error("invalid file size")]
    InvalidFileSize,

    #[error("meta page invalid")]
    InvalidMetaPage,

    #[error("invalid operation")]
    InvalidOp,

    #[error("page id out of bounds")]
    InvalidPageId,

    #[error("invalid parameter")]
    InvalidParam,

    #[error("out of memory")]
    OutOfMemory,

    #[error("transaction failed during commit")]
    TxCommitFail,

    #[error("transaction failed during rollback")]
    TxRollbackFail,

    #[error("transaction failed")]
    TxFailed,

    #[error("finished transaction")]
    TxFinished,

    #[error("readonly transaction")]
    TxReadOnly,

    // queue read path
    #[error("failed to read from queue")]
    ReadFail,

    #[error("failed to seek to next page")]
    SeekFail,

    #[error("{0}")]
    Fs(FsKind),
}

/// File system failure kinds, re-exported through [`ErrorKind::Fs`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsKind {
    #[error("unknown OS error")]
    OsOther,

    #[error("permission denied")]
    Permission,

    #[error("file already exists")]
    Exist,

    #[error("file does not exist")]
    NotExist,

    #[error("file already closed")]
    Closed,

    #[error("no space or quota exhausted")]
    NoSpace,

    #[error("process file descriptor limit reached")]
    FdLimit,

    #[error("cannot resolve path")]
    ResolvePath,

    #[error("read/write IO error")]
    Io,

    #[error("operation not supported")]
    NotSupported,

    #[error("file lock failed")]
    LockFailed,

    #[error("file unlock failed")]
    UnlockFailed,
}

impl ErrorKind {
    pub const PERMISSION_ERROR: ErrorKind = ErrorKind::Fs(FsKind::Permission);
    pub const FILE_EXISTS: ErrorKind = ErrorKind::Fs(FsKind::Exist);
    pub const FILE_DOES_NOT_EXIST: ErrorKind = ErrorKind::Fs(FsKind::NotExist);
    pub const FILE_CLOSED: ErrorKind = ErrorKind::Fs(FsKind::Closed);
    pub const NO_DISK_SPACE: ErrorKind = ErrorKind::Fs(FsKind::NoSpace);
    pub const FD_LIMIT: ErrorKind = ErrorKind::Fs(FsKind::FdLimit);
    pub const CANT_RESOLVE_PATH: ErrorKind = ErrorKind::Fs(FsKind::ResolvePath);
    pub const IO_ERROR: ErrorKind = ErrorKind::Fs(FsKind::Io);
    pub const OS_OTHER_ERROR: ErrorKind = ErrorKind::Fs(FsKind::OsOther);
    pub const OPERATION_NOT_SUPPORTED: ErrorKind = ErrorKind::Fs(FsKind::NotSupported);
    pub const LOCK_FAILED: ErrorKind = ErrorKind::Fs(FsKind::LockFailed);

    pub fn is_fs(&self) -> bool {
        matches!(self, ErrorKind::Fs(_))
    }
}

impl From<FsKind> for ErrorKind {
    fn from(kind: FsKind) -> Self {
        ErrorKind::Fs(kind)
    }
}

impl From<io::ErrorKind> for FsKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::PermissionDenied => FsKind::Permission,
            io::ErrorKind::AlreadyExists => FsKind::Exist,
            io::ErrorKind::NotFound => FsKind::NotExist,
            io::ErrorKind::Unsupported => FsKind::NotSupported,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::WriteZero
            | io::ErrorKind::Interrupted
            | io::ErrorKind::InvalidData => FsKind::Io,
            io::ErrorKind::StorageFull | io::ErrorKind::QuotaExceeded => FsKind::NoSpace,
            _ => FsKind::OsOther,
        }
    }
}

impl From<io::ErrorKind> for ErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::OutOfMemory => ErrorKind::OutOfMemory,
            kind => ErrorKind::Fs(FsKind::from(kind)),
        }
    }
}

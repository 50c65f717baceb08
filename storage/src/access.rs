use crate::cursor::{Position, TxCursor};
use crate::error::{raise_invalid_param, Error, ErrorContext, ErrorKind, MultiError};
use crate::page::{PageId, PAGE_HEADER_SIZE, RECORD_HEADER_SIZE};
use crate::tx::Transaction;
use crate::Result;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Largest supported page size. Record offsets in a page header are 32 bit.
pub const MAX_PAGE_SIZE: usize = 1 << 24;

/// Queue read configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Size of every page in the chain. Fixed for the lifetime of a queue.
    pub page_size: usize,

    /// Path of the backing file, only used in error reports.
    pub file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            file: None,
        }
    }
}

impl Config {
    /// Checks every setting and reports all violations at once.
    pub fn validate(&self) -> Result<()> {
        const OP: &str = "pq/validate-config";

        let mut errs = MultiError::default();
        let min = PAGE_HEADER_SIZE + RECORD_HEADER_SIZE;
        if self.page_size <= min {
            errs.push(raise_invalid_param(format!(
                "page size {} must be larger than {}",
                self.page_size, min
            )));
        }
        if self.page_size > MAX_PAGE_SIZE {
            errs.push(raise_invalid_param(format!(
                "page size {} exceeds maximum of {}",
                self.page_size, MAX_PAGE_SIZE
            )));
        }
        if matches!(&self.file, Some(file) if file.is_empty()) {
            errs.push(raise_invalid_param("file path is empty"));
        }

        errs.into_result()
            .map_err(|errs| Error::new(OP).of(ErrorKind::InvalidConfig).caused_by(errs))
    }
}

/// Shared, validated view of a queue's configuration.
///
/// Hands out cursors and provides the diagnostic context attached to every
/// error raised while reading.
#[derive(Debug, Clone)]
pub struct Access {
    file: Option<Arc<str>>,
    page_size: usize,
}

impl Access {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            file: config.file.as_deref().map(Arc::from),
            page_size: config.page_size,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Position of the first record slot in page `id`.
    pub fn page_start(&self, id: PageId) -> Position {
        Position::new(id, PAGE_HEADER_SIZE, self.page_size)
    }

    /// Restores a checkpoint written by [`Position::encode`].
    pub fn resume(&self, checkpoint: &[u8]) -> Result<Position> {
        const OP: &str = "pq/resume";

        let pos = Position::decode(checkpoint)
            .map_err(|cause| Error::new(OP).with_ctx(self.err_ctx()).caused_by(cause))?;
        if pos.page_size() != self.page_size {
            return Err(Error::new(OP)
                .of(ErrorKind::InvalidConfig)
                .with_ctx(self.err_page_ctx(pos.page()))
                .report(format!(
                    "checkpoint page size {} does not match configured {}",
                    pos.page_size(),
                    self.page_size
                )));
        }
        Ok(pos)
    }

    /// Binds `pos` to `tx` for the duration of a read session.
    pub fn cursor<'a, T: Transaction>(
        &'a self,
        tx: &'a T,
        pos: &'a mut Position,
    ) -> TxCursor<'a, T> {
        TxCursor::new(tx, self, pos)
    }

    pub fn err_ctx(&self) -> ErrorContext {
        let mut ctx = ErrorContext::new();
        if let Some(file) = &self.file {
            ctx.set_file(Arc::clone(file));
        }
        ctx
    }

    pub fn err_page_ctx(&self, id: PageId) -> ErrorContext {
        self.err_ctx().with_page(id)
    }
}

//! Structured errors shared by every layer of the read path.
//!
//! An [`Error`] carries the failing operation, an optional [`ErrorKind`], an
//! optional message, positional [`ErrorContext`] and an optional [`Cause`].
//! Each layer wraps the failure from the layer below with its own operation
//! label, so a rendered error reads as a causal chain:
//!
//! ```text
//! pq/skip: tx=3 page=12 offset=4096: failed to seek to next page: no page to seek to
//! ```
//!
//! Nothing is formatted until the error is displayed.

mod kind;
mod tree;

pub use kind::{ErrorKind, FsKind};
pub use tree::{
    find_err_with, find_kind, get_kind, get_message, get_op, is, iter, Causes, Node, TxError,
};

use crate::page::PageId;
use crate::tx::TxId;
use std::borrow::Cow;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Positional diagnostics attached to an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    file: Option<Arc<str>>,
    tx: Option<TxId>,
    page: Option<PageId>,
    offset: Option<u64>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn tx(&self) -> Option<TxId> {
        self.tx
    }

    pub fn page(&self) -> Option<PageId> {
        self.page
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_none() && self.tx.is_none() && self.page.is_none() && self.offset.is_none()
    }

    pub fn set_file(&mut self, file: impl Into<Arc<str>>) {
        self.file = Some(file.into());
    }

    pub fn set_tx(&mut self, id: TxId) {
        self.tx = Some(id);
    }

    pub fn set_page(&mut self, id: PageId) {
        self.page = Some(id);
    }

    pub fn set_offset(&mut self, off: u64) {
        self.offset = Some(off);
    }

    pub fn with_file(mut self, file: impl Into<Arc<str>>) -> Self {
        self.set_file(file);
        self
    }

    pub fn with_tx(mut self, id: TxId) -> Self {
        self.set_tx(id);
        self
    }

    pub fn with_page(mut self, id: PageId) -> Self {
        self.set_page(id);
        self
    }

    pub fn with_offset(mut self, off: u64) -> Self {
        self.set_offset(off);
        self
    }

    /// Clears every field that is set to the same value in `outer`.
    fn dedup_against(&mut self, outer: &ErrorContext) {
        if self.file.is_some() && self.file == outer.file {
            self.file = None;
        }
        if self.tx.is_some() && self.tx == outer.tx {
            self.tx = None;
        }
        if self.page.is_some() && self.page == outer.page {
            self.page = None;
        }
        if self.offset.is_some() && self.offset == outer.offset {
            self.offset = None;
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if let Some(file) = &self.file {
            write!(f, "file='{}'", file)?;
            sep = " ";
        }
        if let Some(tx) = self.tx {
            write!(f, "{}tx={}", sep, tx)?;
            sep = " ";
        }
        if let Some(page) = self.page {
            write!(f, "{}page={}", sep, page)?;
            sep = " ";
        }
        if let Some(off) = self.offset {
            write!(f, "{}offset={}", sep, off)?;
        }
        Ok(())
    }
}

/// The wrapped failure of an [`Error`] or one entry of a [`MultiError`].
#[derive(Debug)]
pub enum Cause {
    Error(Box<Error>),
    Multi(Box<MultiError>),
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Cause {
    pub fn other(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Cause::Other(Box::new(err))
    }

    pub fn as_node(&self) -> Node<'_> {
        match self {
            Cause::Error(err) => Node::Tx(&**err),
            Cause::Multi(err) => Node::Tx(&**err),
            Cause::Other(err) => Node::Other(&**err),
        }
    }

    pub fn as_error(&self) -> &(dyn std::error::Error + 'static) {
        match self {
            Cause::Error(err) => &**err,
            Cause::Multi(err) => &**err,
            Cause::Other(err) => &**err,
        }
    }

    /// Returns the cause as a structured single-cause error, if it is one.
    pub fn as_tx_error(&self) -> Option<&Error> {
        match self {
            Cause::Error(err) => Some(&**err),
            _ => None,
        }
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_error(), f)
    }
}

impl From<Error> for Cause {
    fn from(err: Error) -> Self {
        Cause::Error(Box::new(err))
    }
}

impl From<MultiError> for Cause {
    fn from(err: MultiError) -> Self {
        Cause::Multi(Box::new(err))
    }
}

impl From<io::Error> for Cause {
    fn from(err: io::Error) -> Self {
        Cause::Other(Box::new(err))
    }
}

/// Error with a single optional cause.
#[derive(Debug, Default)]
pub struct Error {
    op: &'static str,
    kind: Option<ErrorKind>,
    cause: Option<Cause>,
    ctx: ErrorContext,
    msg: Option<Cow<'static, str>>,
}

impl Error {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            ..Self::default()
        }
    }

    pub fn of_kind(kind: ErrorKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn wrap(cause: impl Into<Cause>) -> Self {
        Self::default().caused_by(cause)
    }

    pub fn of(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn report(mut self, msg: impl Into<Cow<'static, str>>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn with_ctx(mut self, ctx: ErrorContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Attaches `cause`. Context fields the cause shares with this error are
    /// removed from the cause, so a rendered chain mentions each value once.
    pub fn caused_by(mut self, cause: impl Into<Cause>) -> Self {
        let mut cause = cause.into();
        if let Cause::Error(inner) = &mut cause {
            inner.ctx.dedup_against(&self.ctx);
        }
        self.cause = Some(cause);
        self
    }

    pub fn op(&self) -> &'static str {
        self.op
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    pub fn context(&self) -> &ErrorContext {
        &self.ctx
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }
}

pub fn raise_invalid_param(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::of_kind(ErrorKind::InvalidParam).report(msg)
}

pub fn raise_out_of_bounds(id: PageId) -> Error {
    Error::of_kind(ErrorKind::InvalidPageId)
        .with_ctx(ErrorContext::new().with_page(id))
        .report("out of bounds page id")
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::of_kind(ErrorKind::from(err.kind())).caused_by(err)
    }
}

/// Writes the non-empty segments of an error separated by `": "`.
struct Segments<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    empty: bool,
}

impl Segments<'_, '_> {
    fn push(&mut self, seg: impl fmt::Display) -> fmt::Result {
        if !self.empty {
            self.f.write_str(": ")?;
        }
        self.empty = false;
        write!(self.f, "{}", seg)
    }
}

fn render(
    f: &mut fmt::Formatter<'_>,
    op: &str,
    ctx: &ErrorContext,
    kind: Option<ErrorKind>,
    msg: Option<&str>,
    causes: Causes<'_>,
) -> fmt::Result {
    let mut out = Segments { f, empty: true };
    if !op.is_empty() {
        out.push(op)?;
    }
    if !ctx.is_empty() {
        out.push(ctx)?;
    }
    if let Some(kind) = kind {
        out.push(kind)?;
    }
    if let Some(msg) = msg {
        out.push(msg)?;
    }
    match causes {
        Causes::None => {}
        Causes::One(cause) => out.push(cause)?,
        Causes::Many(causes) => {
            out.push(format_args!("{} errors", causes.len()))?;
            for (i, cause) in causes.iter().enumerate() {
                write!(out.f, "{}[{}] {}", if i == 0 { ": " } else { "; " }, i, cause)?;
            }
        }
    }
    if out.empty {
        out.f.write_str("no error details")?;
    }
    Ok(())
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(f, self.op, &self.ctx, self.kind, self.message(), self.causes())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(Cause::as_error)
    }
}

impl TxError for Error {
    fn op(&self) -> &str {
        self.op
    }

    fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    fn message(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    fn context(&self) -> &ErrorContext {
        &self.ctx
    }

    fn causes(&self) -> Causes<'_> {
        match &self.cause {
            Some(cause) => Causes::One(cause),
            None => Causes::None,
        }
    }

    fn as_error(&self) -> &(dyn std::error::Error + 'static) {
        self
    }
}

/// Error collecting several independent causes, e.g. every violated
/// constraint of a configuration.
#[derive(Debug, Default)]
pub struct MultiError {
    op: &'static str,
    kind: Option<ErrorKind>,
    causes: Vec<Cause>,
    ctx: ErrorContext,
    msg: Option<Cow<'static, str>>,
}

impl MultiError {
    pub fn new(op: &'static str) -> Self {
        Self {
            op,
            ..Self::default()
        }
    }

    pub fn of(mut self, kind: ErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn report(mut self, msg: impl Into<Cow<'static, str>>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn with_ctx(mut self, ctx: ErrorContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Adds a cause, deduplicating its context the same way as
    /// [`Error::caused_by`].
    pub fn push(&mut self, cause: impl Into<Cause>) {
        let mut cause = cause.into();
        if let Cause::Error(inner) = &mut cause {
            inner.ctx.dedup_against(&self.ctx);
        }
        self.causes.push(cause);
    }

    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.causes.len()
    }

    pub fn causes(&self) -> &[Cause] {
        &self.causes
    }

    /// `Ok(())` when no cause was collected.
    pub fn into_result(self) -> std::result::Result<(), MultiError> {
        if self.causes.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        render(
            f,
            self.op,
            &self.ctx,
            self.kind,
            self.msg.as_deref(),
            Causes::Many(&self.causes),
        )
    }
}

impl std::error::Error for MultiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.causes.first().map(Cause::as_error)
    }
}

impl TxError for MultiError {
    fn op(&self) -> &str {
        self.op
    }

    fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    fn message(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    fn context(&self) -> &ErrorContext {
        &self.ctx
    }

    fn causes(&self) -> Causes<'_> {
        Causes::Many(&self.causes)
    }

    fn as_error(&self) -> &(dyn std::error::Error + 'static) {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_context_rendering_order() {
        let ctx = ErrorContext::new()
            .with_offset(16)
            .with_page(10)
            .with_tx(2)
            .with_file("queue.dat");
        assert_eq!(ctx.to_string(), "file='queue.dat' tx=2 page=10 offset=16");
    }

    #[test]
    fn test_context_rendering_skips_unset_fields() {
        assert_eq!(ErrorContext::new().to_string(), "");
        assert_eq!(ErrorContext::new().with_page(5).to_string(), "page=5");
        assert_eq!(
            ErrorContext::new().with_tx(1).with_offset(0).to_string(),
            "tx=1 offset=0"
        );
    }

    #[test]
    fn test_caused_by_dedups_cause_context() {
        let inner = Error::new("tx/page").with_ctx(ErrorContext::new().with_page(5).with_tx(2));
        let outer = Error::new("pq/read")
            .with_ctx(ErrorContext::new().with_page(5))
            .caused_by(inner);

        assert_eq!(outer.context().to_string(), "page=5");
        let inner = outer.cause().and_then(Cause::as_tx_error).unwrap();
        assert_eq!(inner.context().to_string(), "tx=2");
    }

    #[test]
    fn test_caused_by_keeps_differing_fields() {
        let inner = Error::new("inner").with_ctx(
            ErrorContext::new()
                .with_file("a")
                .with_page(6)
                .with_offset(32),
        );
        let outer = Error::new("outer")
            .with_ctx(ErrorContext::new().with_file("a").with_page(5).with_offset(32))
            .caused_by(inner);

        let inner = outer.cause().and_then(Cause::as_tx_error).unwrap();
        assert_eq!(inner.context().to_string(), "page=6");
        assert_eq!(outer.context().to_string(), "file='a' page=5 offset=32");
    }

    #[test]
    fn test_render_chain() {
        let err = Error::new("pq/skip")
            .with_ctx(ErrorContext::new().with_page(12).with_offset(4096))
            .of(ErrorKind::SeekFail)
            .report("no page to seek to");
        assert_eq!(
            err.to_string(),
            "pq/skip: page=12 offset=4096: failed to seek to next page: no page to seek to"
        );

        let outer = Error::new("queue/read").of(ErrorKind::ReadFail).caused_by(err);
        assert_eq!(
            outer.to_string(),
            "queue/read: failed to read from queue: pq/skip: page=12 offset=4096: \
             failed to seek to next page: no page to seek to"
        );
    }

    #[test]
    fn test_render_empty_error() {
        assert_eq!(Error::default().to_string(), "no error details");
    }

    #[test]
    fn test_raise_helpers() {
        let err = raise_out_of_bounds(99);
        assert_eq!(err.kind(), Some(ErrorKind::InvalidPageId));
        assert_eq!(err.context().page(), Some(99));
        assert_eq!(
            err.to_string(),
            "page=99: page id out of bounds: out of bounds page id"
        );

        let err = raise_invalid_param(format!("page size {} too small", 8));
        assert_eq!(err.kind(), Some(ErrorKind::InvalidParam));
        assert_eq!(err.message(), Some("page size 8 too small"));
    }

    #[test]
    fn test_from_io_error() {
        let err = Error::from(io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert_eq!(err.kind(), Some(ErrorKind::FILE_DOES_NOT_EXIST));
        assert_eq!(err.to_string(), "file does not exist: missing");
        assert!(std::error::Error::source(&err).is_some());

        let err = Error::from(io::Error::from(io::ErrorKind::OutOfMemory));
        assert_eq!(err.kind(), Some(ErrorKind::OutOfMemory));
    }

    #[test]
    fn test_multi_error() {
        let mut multi = MultiError::new("config/validate")
            .of(ErrorKind::InvalidConfig)
            .with_ctx(ErrorContext::new().with_file("q"));
        assert!(multi.is_empty());

        multi.push(
            raise_invalid_param("page size too small")
                .with_ctx(ErrorContext::new().with_file("q").with_page(1)),
        );
        multi.push(raise_invalid_param("page size too large"));
        assert_eq!(multi.len(), 2);

        let first = multi.causes()[0].as_tx_error().unwrap();
        assert_eq!(first.context().to_string(), "page=1");

        assert_eq!(
            multi.to_string(),
            "config/validate: file='q': configuration error: 2 errors: \
             [0] page=1: invalid parameter: page size too small; \
             [1] invalid parameter: page size too large"
        );
        assert!(multi.into_result().is_err());
        assert!(MultiError::new("empty").into_result().is_ok());
    }
}

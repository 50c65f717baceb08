//! Record cursor over a chain of pages.
//!
//! A chain is a singly linked list of fixed-size pages. Every page starts
//! with a [`PageHeader`] holding the id of the next page; records follow as
//! a [`RecordHeader`] plus payload, and a payload may continue on the next
//! page. [`TxCursor`] hides the page boundaries from readers.

mod position;

pub use position::{Position, POSITION_SIZE};

use crate::access::Access;
use crate::error::{Cause, Error, ErrorContext, ErrorKind};
use crate::page::{PageHeader, RecordHeader, NIL_PAGE, PAGE_HEADER_SIZE, RECORD_HEADER_SIZE};
use crate::tx::{PageHandle, Transaction};
use crate::Result;
use log::{debug, trace};

/// A [`Position`] bound to an open transaction.
///
/// The page handle of the current page is resolved lazily and cached until
/// the position moves to another page. The cursor borrows the transaction,
/// so it can not outlive it.
pub struct TxCursor<'a, T: Transaction> {
    pos: &'a mut Position,
    access: &'a Access,
    tx: &'a T,
    page: Option<T::Page>,
}

impl<'a, T: Transaction> TxCursor<'a, T> {
    pub fn new(tx: &'a T, access: &'a Access, pos: &'a mut Position) -> Self {
        Self {
            pos,
            access,
            tx,
            page: None,
        }
    }

    pub fn position(&self) -> Position {
        *self.pos
    }

    /// True if the cursor is not pointing to any page in the queue.
    pub fn is_exhausted(&self) -> bool {
        self.pos.is_nil()
    }

    /// Bytes left in the current page.
    pub fn page_bytes(&self) -> usize {
        self.pos.page_bytes()
    }

    /// Resolves the current page through the transaction, unless it is
    /// already cached.
    pub fn ensure_page(&mut self, op: &'static str) -> Result<()> {
        if let Some(page) = &self.page {
            debug_assert_eq!(page.id(), self.pos.page);
            return Ok(());
        }

        if self.pos.is_nil() {
            return Err(self
                .err(op)
                .of(ErrorKind::ReadFail)
                .report("cursor is not positioned on a page"));
        }

        let page = self
            .tx
            .page(self.pos.page)
            .map_err(|cause| self.err_wrap(op, cause).of(ErrorKind::ReadFail))?;
        self.page = Some(page);
        Ok(())
    }

    /// Reads bytes into `buf`, continuing on the next pages as needed.
    ///
    /// Returns the number of bytes copied. Reaching the end of the chain is
    /// not an error: the read just comes up short. If a page fails to load
    /// after some bytes were copied, those bytes are returned and the failure
    /// is reported by the next call.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        const OP: &str = "pq/read-bytes";

        let (n, res) = self.fill(OP, buf);
        match res {
            Ok(()) => Ok(n),
            Err(err) if n == 0 => Err(err),
            Err(err) => {
                debug!("short read of {} bytes at page {}: {}", n, self.pos.page, err);
                Ok(n)
            }
        }
    }

    /// Copies bytes into `buf` until it is full or the chain ends. Returns the
    /// number of bytes copied together with the failure that stopped it, if
    /// any. The position always accounts for exactly the copied bytes.
    fn fill(&mut self, op: &'static str, buf: &mut [u8]) -> (usize, Result<()>) {
        if self.is_exhausted() {
            return (0, Ok(()));
        }

        let mut copied = 0;
        while copied < buf.len() {
            // try to advance cursor to next page if last read did end at end of page
            if self.page_bytes() == 0 {
                match self.advance_page() {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(cause) => return (copied, Err(self.err_wrap(op, cause))),
                }
            }

            let to = &mut buf[copied..];
            let n = match self.with_bytes(op, |from| {
                let n = from.len().min(to.len());
                to[..n].copy_from_slice(&from[..n]);
                n
            }) {
                Ok(n) => n,
                Err(err) => return (copied, Err(err)),
            };
            self.pos.offset += n;
            copied += n;
        }

        (copied, Ok(()))
    }

    /// Skips exactly `n` bytes, continuing on the next pages as needed.
    ///
    /// Fails with [`ErrorKind::SeekFail`] if the chain ends before `n` bytes
    /// were skipped; the position is exhausted afterwards. If a page can not
    /// be resolved the position is left where it was.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        const OP: &str = "pq/skip";

        if n > 0 && self.is_exhausted() {
            return Err(self
                .err(OP)
                .of(ErrorKind::SeekFail)
                .report("no page to seek to"));
        }

        let start = *self.pos;
        let mut n = n;
        while n > 0 {
            if self.page_bytes() == 0 {
                match self.advance_page() {
                    Ok(true) => {}
                    Ok(false) => {
                        let err = self
                            .err(OP)
                            .of(ErrorKind::SeekFail)
                            .report("no page to seek to");
                        debug!("skip ran past end of chain at page {}", self.pos.page);
                        self.reset();
                        return Err(err);
                    }
                    Err(cause) => {
                        let err = self.err_wrap(OP, cause).of(ErrorKind::SeekFail);
                        self.restore(start);
                        return Err(err);
                    }
                }
            }

            let max = n.min(self.page_bytes());
            self.pos.offset += max;
            n -= max;
        }

        Ok(())
    }

    /// Moves to the next page of the chain.
    ///
    /// Returns `Ok(false)` without touching the cursor if the current page
    /// is the last one.
    pub fn advance_page(&mut self) -> Result<bool> {
        const OP: &str = "pq/cursor-next-page";

        let next = self.with_page_header(OP, |hdr| hdr.next())?;
        if next == NIL_PAGE {
            return Ok(false);
        }

        trace!("advance page from {} -> {}", self.pos.page, next);
        self.pos.page = next;
        self.pos.offset = PAGE_HEADER_SIZE;
        self.page = None;
        Ok(true)
    }

    /// Reads the record header at the current offset and moves past it.
    ///
    /// The header must lie completely within the current page. The writer
    /// never splits a record header across pages, so a header that does not
    /// fit means the chain is corrupt and is reported as an internal error.
    pub fn read_record_header(&mut self, op: &'static str) -> Result<RecordHeader> {
        let hdr = self.with_bytes(op, |b| RecordHeader::cast(b).copied())?;
        match hdr {
            Some(hdr) => {
                self.pos.offset += RECORD_HEADER_SIZE;
                Ok(hdr)
            }
            None => Err(self
                .err(op)
                .of(ErrorKind::Internal)
                .report("record header crosses page boundary")),
        }
    }

    /// Header of the current page. Does not move the cursor.
    pub fn page_header(&mut self, op: &'static str) -> Result<PageHeader> {
        self.with_page_header(op, |hdr| *hdr)
    }

    /// Reads the next complete record into `out`.
    ///
    /// Returns `Ok(false)` if the chain ends before another record header.
    /// The chain does not mark where the last record ends, so callers bound
    /// the number of reads by the record count kept in the queue metadata.
    pub fn next_record(&mut self, out: &mut Vec<u8>) -> Result<bool> {
        const OP: &str = "pq/read-record";

        if self.is_exhausted() {
            return Ok(false);
        }

        if self.page_bytes() < RECORD_HEADER_SIZE {
            let ok = self
                .advance_page()
                .map_err(|cause| self.err_wrap(OP, cause))?;
            if !ok {
                return Ok(false);
            }
        }

        let size = self.read_record_header(OP)?.size() as usize;
        out.clear();

        // grow by at most a page at a time, the size comes from disk
        let chunk = self.pos.page_size.max(1);
        while out.len() < size {
            let start = out.len();
            let want = (size - start).min(chunk);
            out.resize(start + want, 0);

            let (n, res) = self.fill(OP, &mut out[start..]);
            out.truncate(start + n);
            res?;
            if n < want {
                return Err(self.err(OP).of(ErrorKind::ReadFail).report(format!(
                    "record truncated: read {} of {} bytes",
                    out.len(),
                    size
                )));
            }
        }
        Ok(true)
    }

    /// Calls `f` with the bytes of the current page.
    ///
    /// The slice is only valid during the call; it must not be kept across a
    /// page change.
    pub fn with_page<R>(&mut self, op: &'static str, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        self.ensure_page(op)?;

        let Some(page) = &self.page else {
            return Err(self
                .err(op)
                .of(ErrorKind::Internal)
                .report("page cache empty after resolve"));
        };
        let buf = page
            .bytes()
            .map_err(|cause| self.err_wrap(op, cause).of(ErrorKind::ReadFail))?;
        let Some(buf) = buf.get(..self.pos.page_size) else {
            return Err(self.err(op).of(ErrorKind::Internal).report(format!(
                "page has {} bytes, expected {}",
                buf.len(),
                self.pos.page_size
            )));
        };

        Ok(f(buf))
    }

    /// Calls `f` with the header of the current page.
    pub fn with_page_header<R>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&PageHeader) -> R,
    ) -> Result<R> {
        let res = self.with_page(op, |b| PageHeader::cast(b).map(f))?;
        res.ok_or_else(|| {
            self.err(op)
                .of(ErrorKind::Internal)
                .report("page too small for page header")
        })
    }

    /// Calls `f` with the bytes from the current offset to the end of the
    /// current page.
    pub fn with_bytes<R>(&mut self, op: &'static str, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let off = self.pos.offset;
        let res = self.with_page(op, |b| b.get(off..).map(f))?;
        res.ok_or_else(|| {
            self.err(op)
                .of(ErrorKind::Internal)
                .report("offset beyond end of page")
        })
    }

    /// Detaches the cursor from the chain.
    pub fn reset(&mut self) {
        self.pos.reset();
        self.page = None;
    }

    fn restore(&mut self, pos: Position) {
        if self.pos.page != pos.page {
            self.page = None;
        }
        *self.pos = pos;
    }

    fn err(&self, op: &'static str) -> Error {
        Error::new(op).with_ctx(self.err_ctx())
    }

    fn err_wrap(&self, op: &'static str, cause: impl Into<Cause>) -> Error {
        self.err(op).caused_by(cause)
    }

    fn err_ctx(&self) -> ErrorContext {
        let mut ctx = self.access.err_ctx();
        ctx.set_tx(self.tx.id());
        if !self.pos.is_nil() {
            ctx.set_page(self.pos.page);
            ctx.set_offset(self.pos.offset as u64);
        }
        ctx
    }
}

// storage/src/tx/memory.rs

use super::{PageHandle, Transaction, TxId};
use crate::error::{Error, ErrorContext, ErrorKind};
use crate::page::{PageId, NIL_PAGE};
use crate::Result;
use bytes::Bytes;
use log::{debug, trace};
use parking_lot::RwLock;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory page store.
///
/// Pages are immutable once inserted; a transaction shares the page buffers
/// instead of copying them.
pub struct MemStore {
    page_size: usize,
    pages: RwLock<HashMap<PageId, Bytes>>,
    next_tx: AtomicU64,
}

impl MemStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            pages: RwLock::new(HashMap::new()),
            next_tx: AtomicU64::new(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.pages.read().len()
    }

    /// Stores (or replaces) the page `id`. `data` must be exactly one page.
    pub fn insert_page(&self, id: PageId, data: impl Into<Bytes>) -> Result<()> {
        const OP: &str = "mem/insert-page";

        let data = data.into();
        if id == NIL_PAGE {
            return Err(Error::new(OP)
                .of(ErrorKind::InvalidPageId)
                .with_ctx(ErrorContext::new().with_page(id))
                .report("page 0 is reserved"));
        }
        if data.len() != self.page_size {
            return Err(Error::new(OP)
                .of(ErrorKind::InvalidParam)
                .with_ctx(ErrorContext::new().with_page(id))
                .report(format!(
                    "page has {} bytes, expected {}",
                    data.len(),
                    self.page_size
                )));
        }

        self.pages.write().insert(id, data);
        Ok(())
    }

    /// Starts a read transaction.
    pub fn begin(&self) -> MemTx<'_> {
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed);
        trace!("begin tx {}", id);
        MemTx {
            store: self,
            id,
            closed: Rc::new(Cell::new(false)),
        }
    }
}

/// Read transaction over a [`MemStore`].
///
/// Closing the transaction invalidates every page it handed out: later page
/// lookups and byte accesses fail with [`ErrorKind::TxFinished`].
pub struct MemTx<'a> {
    store: &'a MemStore,
    id: TxId,
    closed: Rc<Cell<bool>>,
}

impl MemTx<'_> {
    pub fn close(&self) {
        trace!("close tx {}", self.id);
        self.closed.set(true);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    fn err_ctx(&self) -> ErrorContext {
        ErrorContext::new().with_tx(self.id)
    }
}

impl Transaction for MemTx<'_> {
    type Page = MemPage;

    fn id(&self) -> TxId {
        self.id
    }

    fn page(&self, id: PageId) -> Result<MemPage> {
        const OP: &str = "tx/page";

        if self.closed.get() {
            debug!("page {} requested from finished tx {}", id, self.id);
            return Err(Error::new(OP)
                .of(ErrorKind::TxFinished)
                .with_ctx(self.err_ctx().with_page(id)));
        }

        let data = self.store.pages.read().get(&id).cloned();
        match data {
            Some(data) => {
                trace!("tx {} resolved page {}", self.id, id);
                Ok(MemPage {
                    id,
                    tx: self.id,
                    data,
                    closed: Rc::clone(&self.closed),
                })
            }
            None => Err(Error::new(OP)
                .of(ErrorKind::InvalidPageId)
                .with_ctx(self.err_ctx().with_page(id))
                .report("out of bounds page id")),
        }
    }
}

/// Page handed out by a [`MemTx`].
pub struct MemPage {
    id: PageId,
    tx: TxId,
    data: Bytes,
    closed: Rc<Cell<bool>>,
}

impl PageHandle for MemPage {
    fn id(&self) -> PageId {
        self.id
    }

    fn bytes(&self) -> Result<&[u8]> {
        const OP: &str = "tx/page-bytes";

        if self.closed.get() {
            debug!("page {} accessed after tx {} finished", self.id, self.tx);
            return Err(Error::new(OP)
                .of(ErrorKind::TxFinished)
                .with_ctx(ErrorContext::new().with_tx(self.tx).with_page(self.id)));
        }
        Ok(&self.data[..])
    }
}

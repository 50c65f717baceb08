//! Interface to the transactional page store.
//!
//! The store itself (allocation, logging, commit, durability) lives behind
//! [`Transaction`]. The read path only needs to turn a page id into a byte
//! view that stays valid while the transaction is open.

pub mod memory;

pub use memory::{MemPage, MemStore, MemTx};

use crate::page::PageId;
use crate::Result;

/// Identifier of a transaction, used for diagnostics.
pub type TxId = u64;

/// An open transaction handing out pages by id.
pub trait Transaction {
    type Page: PageHandle;

    fn id(&self) -> TxId;

    /// Resolves `id` to a page handle owned by this transaction.
    fn page(&self, id: PageId) -> Result<Self::Page>;
}

/// View over one page's bytes, valid while its transaction is open.
pub trait PageHandle {
    fn id(&self) -> PageId;

    fn bytes(&self) -> Result<&[u8]>;
}

//! Post-load hooks
//!
//! A hook sees every record the engine delivers, in order, before the
//! record lands in the caller's buffer. A failing hook aborts the load call.

use crate::types::TransactionContext;

/// Callback invoked once per loaded record
pub trait PostLoadHook<R>: Send + Sync {
    /// Inspect a record before it is delivered
    fn on_record_loaded(&self, txn: &TransactionContext, record: &R) -> anyhow::Result<()>;
}

/// Hook that accepts every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl<R> PostLoadHook<R> for NoopHook {
    fn on_record_loaded(&self, _txn: &TransactionContext, _record: &R) -> anyhow::Result<()> {
        Ok(())
    }
}

impl<R, F> PostLoadHook<R> for F
where
    F: Fn(&TransactionContext, &R) -> anyhow::Result<()> + Send + Sync,
{
    fn on_record_loaded(&self, txn: &TransactionContext, record: &R) -> anyhow::Result<()> {
        self(txn, record)
    }
}

//! The transaction engine.
//!
//! Thin orchestration around one transaction: build a fresh delta-set on
//! the current snapshot, run the driver, and either merge the staged
//! changes (with their metadata) or discard them. Claimed (`tec`)
//! failures are persisted too: the work is discarded but the fee and
//! sequence are consumed on a clean delta before merging.

use std::sync::Arc;

use freshet_common::{Hash256, Ter};
use freshet_ledger::Ledger;
use tracing::{debug, warn};

use crate::entry_set::{EntrySet, TxParams};
use crate::frame::Transaction;
use crate::transactor::Transactor;

/// Outcome of one engine application.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub result: Ter,
    /// Serialized metadata, present when the transaction was applied
    /// (success or claimed failure).
    pub metadata: Option<Vec<u8>>,
}

/// Applies transactions sequentially against an evolving snapshot.
pub struct TransactionEngine {
    ledger: Arc<Ledger>,
}

impl TransactionEngine {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// The current snapshot.
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Apply one transaction. On an applied outcome (`tes` or `tec`) the
    /// delta is merged into the snapshot, the transaction id recorded, and
    /// the metadata returned; otherwise the snapshot is untouched.
    pub fn apply(&mut self, tx: &Transaction, params: TxParams, tx_index: u32) -> ApplyResult {
        let tx_id = tx.id();
        let ledger_seq = self.ledger.sequence();

        let mut nodes = EntrySet::new(Arc::clone(&self.ledger), tx_id, ledger_seq, params);
        let mut result = Transactor::apply(tx, &mut nodes);

        if result.is_claimed() {
            // The handler's work is void, but the failure is consensus
            // relevant: charge the fee and burn the sequence on a clean
            // delta.
            debug!(%result, "claimed failure, consuming fee only");
            nodes = EntrySet::new(Arc::clone(&self.ledger), tx_id, ledger_seq, params);
            if let Err(err) = Transactor::claim_fee(tx, &mut nodes) {
                warn!(%err, "fee claim failed; rejecting transaction");
                return ApplyResult {
                    result: err,
                    metadata: None,
                };
            }
        } else if !result.is_success() {
            return ApplyResult {
                result,
                metadata: None,
            };
        }

        let metadata = match nodes.calc_raw_meta(result, tx_index) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(%err, "metadata build failed");
                result = err;
                return ApplyResult {
                    result,
                    metadata: None,
                };
            }
        };

        let ledger = Arc::make_mut(&mut self.ledger);
        ledger.commit(nodes.changes());
        ledger.record_transaction(tx_id);

        ApplyResult {
            result,
            metadata: Some(metadata),
        }
    }

    /// The transaction ids applied so far, exposed for callers that track
    /// inclusion.
    pub fn has_applied(&self, tx_id: &Hash256) -> bool {
        self.ledger.has_transaction(tx_id)
    }
}

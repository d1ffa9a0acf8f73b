use log::debug;

use crate::models::{signature_prefix, OutflowEvent, TxRecord, WatchedWallet};

/// Detects outgoing balance changes on a fixed watch-list of wallets.
///
/// The receiver attribution is a heuristic: the counterparty is the account
/// with the largest positive balance increase in the same transaction, ties
/// broken by listing order. A transaction with several recipients or
/// fee-only debits is mapped to at most one inferred receiver.
pub struct OutflowDetector {
    wallets: Vec<WatchedWallet>,
}

impl OutflowDetector {
    pub fn new(wallets: Vec<WatchedWallet>) -> Self {
        Self { wallets }
    }

    pub fn wallets(&self) -> &[WatchedWallet] {
        &self.wallets
    }

    /// Compute the outflow of `target` in one transaction, if any.
    ///
    /// Returns `None` when the target is not referenced or its balance did
    /// not strictly decrease. At most one event per `(transaction, target)`
    /// pair is ever produced.
    pub fn extract_outflow(tx: &TxRecord, target: &str) -> Option<OutflowEvent> {
        let entry = tx.balances.iter().find(|b| b.account == target)?;

        let delta = entry.pre_sol - entry.post_sol;
        if delta <= 0.0 {
            // Not the sender in this transaction, or a net receiver.
            return None;
        }

        let mut receiver = "";
        let mut best_gain = 0.0;
        for other in &tx.balances {
            if other.account == target {
                continue;
            }
            let gain = other.post_sol - other.pre_sol;
            // Strict comparison keeps the first-listed account on ties.
            if gain > best_gain {
                best_gain = gain;
                receiver = &other.account;
            }
        }

        Some(OutflowEvent {
            account: target.to_string(),
            amount_sol: delta,
            receiver: receiver.to_string(),
            signature: tx.signature.clone(),
        })
    }

    /// Run every watched wallet against one transaction and keep the events
    /// whose amount falls inside that wallet's configured ranges.
    ///
    /// Wallets are checked in configured list order, which fixes the alert
    /// order within a transaction.
    pub fn matching_outflows<'a>(&'a self, tx: &TxRecord) -> Vec<(&'a WatchedWallet, OutflowEvent)> {
        let mut matches = Vec::new();
        for wallet in &self.wallets {
            if let Some(event) = Self::extract_outflow(tx, &wallet.address) {
                if wallet.matches(event.amount_sol) {
                    matches.push((wallet, event));
                } else {
                    debug!(
                        "outflow of {} SOL from {} ({}) outside configured ranges, sig {}",
                        event.amount_sol,
                        wallet.label,
                        wallet.address,
                        signature_prefix(&event.signature)
                    );
                }
            }
        }
        matches
    }
}

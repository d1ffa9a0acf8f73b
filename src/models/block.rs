/// Pre/post balance of one account within a transaction, in SOL.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    pub account: String,
    pub pre_sol: f64,
    pub post_sol: f64,
}

impl AccountBalance {
    pub fn new(account: impl Into<String>, pre_sol: f64, post_sol: f64) -> Self {
        Self {
            account: account.into(),
            pre_sol,
            post_sol,
        }
    }
}

/// One decoded transaction: its signature and the balance listing for every
/// account it touched, in the ledger's listing order. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TxRecord {
    pub signature: String,
    pub balances: Vec<AccountBalance>,
}

/// Outcome of fetching one slot. Transient failures are carried as errors,
/// not as a variant: a slot that is `Absent` will never become available,
/// while an errored slot must be retried.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockFetch {
    Present(Vec<TxRecord>),
    Absent,
}

/// Shortened signature for log context. Signatures are base58 in practice,
/// but the prefix must not assume ASCII: a cut that would split a multi-byte
/// character falls back to the full string instead of panicking.
pub fn signature_prefix(sig: &str) -> &str {
    sig.get(..12).unwrap_or(sig)
}

/// An inferred balance decrease on a watched account within one transaction.
/// Produced, matched, dispatched, and discarded; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct OutflowEvent {
    pub account: String,
    pub amount_sol: f64,
    /// Best-guess receiving account; empty when no account gained balance.
    pub receiver: String,
    pub signature: String,
}

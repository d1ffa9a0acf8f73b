pub mod block;
pub mod wallet;

pub use block::{signature_prefix, AccountBalance, BlockFetch, OutflowEvent, TxRecord};
pub use wallet::{matches_any, parse_ranges, AmountRange, WatchedWallet};

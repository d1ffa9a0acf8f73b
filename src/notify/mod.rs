pub mod telegram;

use log::info;

pub use telegram::TelegramNotifier;

/// A fully formed notification for one matched outflow.
#[derive(Debug, Clone, PartialEq)]
pub struct OutflowAlert {
    pub label: String,
    pub amount_sol: f64,
    /// Empty when no receiving account could be inferred.
    pub receiver: String,
    pub signature: String,
    pub slot: u64,
}

impl OutflowAlert {
    /// Public explorer link for the transaction.
    pub fn explorer_link(&self) -> String {
        format!("https://solscan.io/tx/{}", self.signature)
    }
}

/// Best-effort notification sink. `dispatch` must return without awaiting
/// delivery: the monitor loop never couples watermark progress to an
/// external messaging service. Delivery failures are logged and dropped.
pub trait NotificationSink: Send + Sync {
    fn dispatch(&self, alert: OutflowAlert);
}

/// Fallback sink used when no bot is configured; alerts only hit the log.
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn dispatch(&self, alert: OutflowAlert) {
        let receiver = if alert.receiver.is_empty() {
            "unknown"
        } else {
            alert.receiver.as_str()
        };
        info!(
            "ALERT {}: {} SOL -> {} at slot {} ({})",
            alert.label,
            alert.amount_sol,
            receiver,
            alert.slot,
            alert.explorer_link()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_link() {
        let alert = OutflowAlert {
            label: "OKX".to_string(),
            amount_sol: 19.5,
            receiver: "ACC2".to_string(),
            signature: "5pXy".to_string(),
            slot: 100,
        };
        assert_eq!(alert.explorer_link(), "https://solscan.io/tx/5pXy");
    }
}

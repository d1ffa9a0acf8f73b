use async_trait::async_trait;
use log::{info, warn};

use crate::blockchain::RpcClient;
use crate::error::ProviderError;
use crate::models::BlockFetch;

/// The ledger data contract the monitor loop consumes.
///
/// `fetch_block` takes `&self` so a batch of fetches can run concurrently;
/// the failover methods take `&mut self` because endpoint selection is owned
/// exclusively by the single loop worker and only changes between batches.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Current chain height (slot) at the configured commitment.
    async fn current_height(&self) -> Result<u64, ProviderError>;

    /// Fetch one slot. `Absent` means the slot was skipped permanently;
    /// transient failures come back as errors and must be retried.
    async fn fetch_block(&self, slot: u64) -> Result<BlockFetch, ProviderError>;

    /// Advisory: switch subsequent calls to the secondary endpoint.
    /// Idempotent; does not retry the failed call itself.
    fn report_failure(&mut self);

    /// Advisory: switch subsequent calls back to the primary endpoint.
    fn report_recovery(&mut self);
}

/// Primary/secondary endpoint pair with manual failover.
pub struct ProviderAccess {
    primary: RpcClient,
    secondary: Option<RpcClient>,
    on_secondary: bool,
}

impl ProviderAccess {
    pub fn new(primary: RpcClient, secondary: Option<RpcClient>) -> Self {
        Self {
            primary,
            secondary,
            on_secondary: false,
        }
    }

    fn active(&self) -> &RpcClient {
        match (&self.secondary, self.on_secondary) {
            (Some(secondary), true) => secondary,
            _ => &self.primary,
        }
    }

    pub fn is_on_secondary(&self) -> bool {
        self.on_secondary && self.secondary.is_some()
    }
}

#[async_trait]
impl BlockSource for ProviderAccess {
    async fn current_height(&self) -> Result<u64, ProviderError> {
        self.active().get_slot().await
    }

    async fn fetch_block(&self, slot: u64) -> Result<BlockFetch, ProviderError> {
        self.active().get_block(slot).await
    }

    fn report_failure(&mut self) {
        match &self.secondary {
            Some(secondary) if !self.on_secondary => {
                warn!(
                    "switching to secondary RPC endpoint {}",
                    secondary.endpoint()
                );
                self.on_secondary = true;
            }
            Some(_) => {} // already on secondary
            None => warn!("primary RPC endpoint failing and no secondary configured"),
        }
    }

    fn report_recovery(&mut self) {
        if self.on_secondary {
            info!(
                "switching back to primary RPC endpoint {}",
                self.primary.endpoint()
            );
            self.on_secondary = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> RpcClient {
        RpcClient::new(endpoint.to_string(), "finalized".to_string(), 30)
    }

    #[test]
    fn test_failover_switches_to_secondary() {
        let mut provider = ProviderAccess::new(
            client("http://primary"),
            Some(client("http://secondary")),
        );
        assert_eq!(provider.active().endpoint(), "http://primary");

        provider.report_failure();
        assert!(provider.is_on_secondary());
        assert_eq!(provider.active().endpoint(), "http://secondary");

        // Idempotent.
        provider.report_failure();
        assert!(provider.is_on_secondary());
    }

    #[test]
    fn test_recovery_switches_back_to_primary() {
        let mut provider = ProviderAccess::new(
            client("http://primary"),
            Some(client("http://secondary")),
        );
        provider.report_failure();
        provider.report_recovery();
        assert!(!provider.is_on_secondary());
        assert_eq!(provider.active().endpoint(), "http://primary");
    }

    #[test]
    fn test_failover_without_secondary_stays_on_primary() {
        let mut provider = ProviderAccess::new(client("http://primary"), None);
        provider.report_failure();
        assert!(!provider.is_on_secondary());
        assert_eq!(provider.active().endpoint(), "http://primary");
    }
}

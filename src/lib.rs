pub mod blockchain;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod notify;
pub mod watermark;

pub use blockchain::{BlockMonitor, BlockSource, CatchUp, MonitorConfig, OutflowDetector, ProviderAccess, RpcClient};
pub use config::AppConfig;
pub use error::{MonitorError, ProviderError, Result};
pub use notify::{NotificationSink, OutflowAlert};
pub use watermark::WatermarkStore;

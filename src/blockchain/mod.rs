pub mod block_monitor;
pub mod outflow_detector;
pub mod provider;
pub mod rpc_client;

pub use block_monitor::{BlockMonitor, CatchUp, MonitorConfig};
pub use outflow_detector::OutflowDetector;
pub use provider::{BlockSource, ProviderAccess};
pub use rpc_client::RpcClient;

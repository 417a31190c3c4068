pub mod config;
pub mod fne;
pub mod http;

pub use config::MetricsConfig;
pub use fne::FneMetrics;
pub use http::MetricsServer;

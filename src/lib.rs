pub mod app_state;
pub mod barcode;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod rate_limiter;
pub mod transform;
pub mod upstream;

pub use app_state::AppState;
pub use config::Config;
pub use error::{GatewayError, UpstreamError};
pub use gateway::LookupGateway;
pub use models::SimplifiedProduct;

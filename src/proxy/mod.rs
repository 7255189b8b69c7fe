// proxy module - origin-aware gateway for the proxied upstreams

pub mod config;
pub mod envelope;
pub mod server;

pub mod common;
pub mod handlers; // One handler per proxied upstream
pub mod mappers; // Upstream payload adapters
pub mod middleware; // Axum middleware
pub mod upstream; // Upstream client

pub use config::{GatewayConfig, OriginConfig};
pub use envelope::{InboundRequest, ProxyResponse};
pub use handlers::{Gateway, ProxyKind};
pub use server::AxumServer;

pub mod handlers;
pub mod hub;
pub mod server;
pub mod websocket;

pub use handlers::HealthResponse;
pub use hub::{BroadcastHub, BroadcastReport, ConnectionState, HubError, SubscriberId};
pub use server::HubServer;

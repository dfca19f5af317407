//! Token lifecycle: expiry checks, single-flight refresh, connection state

pub mod lifecycle;
pub mod state;

pub use lifecycle::{is_expired, NewConnection, TokenLifecycleManager};
pub use state::{ConnectionEvent, ConnectionState};

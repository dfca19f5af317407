//! # Postbridge Core
//!
//! Integration logic with no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for storage, secrets, OAuth and platform APIs
//! - The OAuth flow builder and credential sealing
//! - The token lifecycle manager and connection state machine
//! - Capability negotiation and the `IntegrationService` facade
//!
//! ## Architecture Principles
//! - Depends only on `postbridge-common` and `postbridge-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod clock;
pub mod dispatch;
pub mod oauth;
pub mod ports;
pub mod service;
pub mod tokens;

pub use clock::{Clock, MockClock, SystemClock};
pub use dispatch::{CapabilityNegotiator, Negotiation};
pub use oauth::{CompletedAuthorization, CredentialSealer, OAuthFlowBuilder};
pub use ports::{
    AuthorizationProvider, CodeExchange, CredentialStore, DispatchTarget, OrganizationDirectory,
    PlatformGateway, RefreshRequest, SecretsProvider, StateLedger,
};
pub use service::{IntegrationPorts, IntegrationService};
pub use tokens::{
    is_expired, ConnectionEvent, ConnectionState, NewConnection, TokenLifecycleManager,
};

//! Domain types and models

pub mod auth_state;
pub mod connection;
pub mod content;
pub mod platform;
pub mod provider;

pub use auth_state::{AuthState, AuthorizationRedirect, AuthorizationRequest, TemporaryCredentials};
pub use connection::{
    ConnectionId, DeactivationReason, OwnerScope, PlatformAuthData, PlatformConnection,
    ProfileMetrics, SealedCredential,
};
pub use content::{
    MediaAttachment, Operation, PlatformAnalytics, PlatformProfile, PlatformRequest,
    PlatformResponse, PostDraft, PostResult,
};
pub use platform::{Capability, MediaCategory, Platform, PlatformCapabilities};
pub use provider::{
    AuthProtocol, ClientAuthStyle, ClientCredentials, ProviderDescriptor, ProviderEndpoints,
    RefreshStyle,
};

//! Provider-side OAuth: token endpoint client and OAuth 1.0a signing

pub mod client;
pub mod signature;

pub use client::OAuthProviderClient;
pub use signature::{percent_encode, signature_base_string, OAuth1Signer};

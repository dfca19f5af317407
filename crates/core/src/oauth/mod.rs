//! OAuth authorization flows and credential sealing

pub mod flow;
pub mod sealing;

pub use flow::{CompletedAuthorization, OAuthFlowBuilder};
pub use sealing::CredentialSealer;

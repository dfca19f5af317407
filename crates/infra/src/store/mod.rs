//! In-process implementations of the persistence ports
//!
//! Durable storage is an external collaborator; these implementations back
//! single-process deployments and tests.

mod credentials;
mod directory;
mod ledger;

pub use credentials::InMemoryCredentialStore;
pub use directory::StaticOrganizationDirectory;
pub use ledger::MokaStateLedger;

//! Capability negotiation ahead of platform dispatch

pub mod negotiator;

pub use negotiator::{CapabilityNegotiator, Negotiation};

//! OAuth helpers that need no network access.
//!
//! Only PKCE and state-token generation live here; the authorization flow
//! itself belongs to `postbridge-core`.

pub mod pkce;

pub use pkce::{
    generate_code_challenge, generate_code_verifier, generate_state, validate_state, PkcePair,
    CHALLENGE_METHOD,
};

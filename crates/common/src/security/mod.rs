//! Secret handling helpers.

pub mod secure_string;

pub use secure_string::SecureString;

//! Outbound HTTP shared by every provider call

pub mod client;

pub use client::{decode_json, ensure_success, HttpClient, HttpClientBuilder};

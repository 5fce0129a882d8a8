//! Runpod GraphQL API access.

pub mod client;
pub mod errors;
pub mod middleware;

pub use client::RunpodClient;
pub use errors::LookupError;

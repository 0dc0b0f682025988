//! Application services.
//!
//! Each service is generic over the repository and infrastructure traits it
//! needs, so redflag-core never depends on redflag-infra.

pub mod analysis;
pub mod auth;
pub mod chat;
pub mod credentials;
pub mod upload;

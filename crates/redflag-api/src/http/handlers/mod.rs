//! HTTP request handlers for the REST API.

pub mod analyses;
pub mod auth;
pub mod chats;
pub mod classify;
pub mod files;
pub mod usage;

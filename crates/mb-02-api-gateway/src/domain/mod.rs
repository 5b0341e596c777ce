//! Domain types for the API Gateway.

pub mod config;
pub mod error;

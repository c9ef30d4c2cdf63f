// src/lib.rs

pub mod client;
pub mod config;
pub mod core;

// Re-export
pub use crate::client::{Client, Credentials, Transport};

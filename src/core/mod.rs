// src/core/mod.rs

//! The transport-independent correlation engine: wire codec, requests, the
//! correlation registry and the login session.

pub mod errors;
pub mod protocol;
pub mod registry;
pub mod request;
pub mod session;
pub mod stats;

pub use errors::ClientError;
pub use protocol::FlatObject;
pub use registry::CorrelationRegistry;
pub use request::Request;
pub use session::{Gate, LoginState, SessionController};

// src/core/session/mod.rs

//! Login handshake state and the gate that waiters block on.

pub mod controller;
pub mod gate;

pub use controller::{LoginState, RESPONSE_TYPE_OK, SessionController};
pub use gate::Gate;

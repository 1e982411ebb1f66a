//! Session management.
//!
//! This module provides:
//! - `Session`: the holder of Current User and all authentication operations
//! - `SessionBus`: the typed de-authentication channel between the
//!   transports (which detect auth failure) and the holder

pub mod bus;
pub mod holder;

pub use bus::{SessionBus, SessionEvent, Subscription};
pub use holder::Session;

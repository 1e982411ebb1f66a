//! GraphQL transport for the application backend.
//!
//! `GraphqlClient` is the only way in; its cache and header handling stay
//! private. Operation documents live in `operations`.

mod cache;
pub mod client;
pub mod operations;

pub use client::GraphqlClient;
pub use operations::{FetchPolicy, Operation, OperationKind};

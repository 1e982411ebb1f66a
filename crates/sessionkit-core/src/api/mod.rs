//! REST transport for the identity provider.
//!
//! `RestClient` is the raw transport (casing transform, error mapping);
//! `RestAdapter` wraps it with bearer authorization and transparent token
//! refresh. Application code (camelCase) and the wire (snake_case) are
//! bridged by `casing`.

pub mod adapter;
pub mod casing;
pub mod error;
pub mod rest;

pub use adapter::RestAdapter;
pub use error::ApiError;
pub use rest::{RequestOptions, RestClient};

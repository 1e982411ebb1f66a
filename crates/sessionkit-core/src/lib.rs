//! Core library for sessionkit.
//!
//! This crate owns the credential lifecycle of a signed-in client:
//!
//! - `storage`: pluggable persistent key-value backends (memory, files, OS keychain)
//! - `auth`: the stored OAuth credential record, expiry policy and refresh
//! - `api`: the identity-provider REST transport with key-casing and bearer auth
//! - `graphql`: the GraphQL transport with auth/error middleware and a persisted cache
//! - `session`: the session holder (Current User) and the de-authentication bus
//! - `context`: the composition root that wires everything together once

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod graphql;
pub mod models;
pub mod session;
pub mod storage;

pub use api::{ApiError, RequestOptions, RestAdapter};
pub use auth::{CredentialStore, Credentials, TokenStatus};
pub use config::Config;
pub use context::AppContext;
pub use graphql::GraphqlClient;
pub use models::{Attachment, AuthorizationResult, SignUpOutcome, User, UserRegistration};
pub use session::{Session, SessionBus, SessionEvent, Subscription};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StorageError};

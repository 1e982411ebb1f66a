//! Authentication module for credential persistence and token lifecycle.
//!
//! This module provides:
//! - `Credentials` / `CredentialStore`: the persisted OAuth token bundle
//! - `TokenStatus` / `classify`: the expiry policy
//! - `TokenRefresher`: refresh-or-fail, shared by the REST and GraphQL transports
//! - `Grant`: token endpoint request bodies for each sign-in method
//! - `OtpChannel` / `ValidationHashCache`: phone OTP helpers
//!
//! Nothing outside `CredentialStore` keeps a credential record beyond a
//! single operation; callers re-read the store right before each request.

pub mod credentials;
pub mod grant;
pub mod otp;
pub mod policy;
pub mod refresh;

pub use credentials::{unix_now, CredentialStore, Credentials};
pub use grant::{Grant, RevokeRequest, TokenRequest};
pub use otp::{OtpChannel, ValidationHashCache};
pub use policy::{classify, TokenStatus};
pub use refresh::TokenRefresher;

use super::Credentials;

/// Outcome of checking a credential record against the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    /// Usable as-is
    Valid,
    /// Expired; exchange the refresh token before use
    NeedsRefresh,
    /// Expired with nothing to refresh with, or the refresh exchange was rejected
    Irrecoverable,
}

/// Classify a record at `now` (unix seconds).
///
/// A record is valid while `now - (created_at + expires_in) <= 0`.
pub fn classify(credentials: &Credentials, now: i64) -> TokenStatus {
    if now - credentials.expires_at() <= 0 {
        TokenStatus::Valid
    } else if credentials.has_refresh_token() {
        TokenStatus::NeedsRefresh
    } else {
        TokenStatus::Irrecoverable
    }
}

//! Session holder: owns Current User and implements the sign-in/out operations.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{SessionBus, SessionEvent, Subscription};
use crate::api::{ApiError, RequestOptions, RestAdapter};
use crate::auth::{
    CredentialStore, Credentials, Grant, OtpChannel, RevokeRequest, TokenRequest,
    ValidationHashCache,
};
use crate::graphql::{operations, GraphqlClient};
use crate::models::{
    Attachment, AuthorizationResult, RegisterResponse, SignUpOutcome, User, UserRegistration,
    UserUpdate,
};

#[derive(Deserialize)]
struct MeData {
    me: Option<User>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserData {
    update_user: User,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAttachmentData {
    create_attachment: Attachment,
}

/// Holds the signed-in principal and runs every authentication operation.
///
/// `is_signed_in` is derived from Current User and never stored separately.
/// While the holder lives it listens for `Unauthenticated` on the bus and
/// clears Current User; dropping it unsubscribes.
pub struct Session {
    client_id: String,
    credentials: CredentialStore,
    validation_hash: ValidationHashCache,
    rest: RestAdapter,
    graphql: Arc<GraphqlClient>,
    current_user: Arc<watch::Sender<Option<User>>>,
    _unauthenticated: Subscription,
}

impl Session {
    pub fn new(
        client_id: impl Into<String>,
        credentials: CredentialStore,
        validation_hash: ValidationHashCache,
        rest: RestAdapter,
        graphql: Arc<GraphqlClient>,
        bus: &SessionBus,
    ) -> Self {
        let (sender, _) = watch::channel(None);
        let current_user = Arc::new(sender);

        let listener = current_user.clone();
        let subscription = bus.subscribe(move |event| match event {
            SessionEvent::Unauthenticated => {
                info!("Session invalidated by server");
                listener.send_replace(None);
            }
        });

        Self {
            client_id: client_id.into(),
            credentials,
            validation_hash,
            rest,
            graphql,
            current_user,
            _unauthenticated: subscription,
        }
    }

    // ===== Session State =====

    pub fn current_user(&self) -> Option<User> {
        self.current_user.borrow().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current_user.borrow().is_some()
    }

    /// Observe Current User changes.
    pub fn watch_user(&self) -> watch::Receiver<Option<User>> {
        self.current_user.subscribe()
    }

    fn set_current_user(&self, user: Option<User>) {
        self.current_user.send_replace(user);
    }

    // ===== Sign Up =====

    pub async fn sign_up_by_email(&self, registration: &UserRegistration) -> Result<SignUpOutcome> {
        let response = match self.register(json!({ "user": registration })).await? {
            Ok(response) => response,
            Err(errors) => return Ok(errors),
        };

        match (response.credentials, response.user) {
            (Some(credentials), user) => {
                self.credentials
                    .set(&credentials)
                    .await
                    .context("Failed to store sign-up credentials")?;
                let user = match user {
                    Some(user) => {
                        self.set_current_user(Some(user.clone()));
                        user
                    }
                    None => self.require_user().await?,
                };
                info!(user_id = user.id, "Signed up and signed in");
                Ok(SignUpOutcome::SignedIn(user))
            }
            (None, user) => {
                info!("Signed up, confirmation required");
                Ok(SignUpOutcome::PendingConfirmation(user))
            }
        }
    }

    /// Create an account by phone number. The number must be verified with
    /// an OTP before signing in, so no session is established here.
    pub async fn sign_up_by_phone_number(&self, phone_number: &str) -> Result<SignUpOutcome> {
        let body = json!({ "user": { "phoneNumber": phone_number } });
        match self.register(body).await? {
            Ok(response) => Ok(SignUpOutcome::PendingConfirmation(response.user)),
            Err(errors) => Ok(errors),
        }
    }

    /// POST /users.json; the inner `Err` carries a `Rejected` outcome.
    async fn register(
        &self,
        body: serde_json::Value,
    ) -> Result<std::result::Result<RegisterResponse, SignUpOutcome>> {
        let options = RequestOptions::new().header("Client-Id", self.client_id.as_str());
        let response: RegisterResponse = match self.rest.post("/users.json", &body, &options).await {
            Ok(response) => response,
            Err(ApiError::Rejected(body)) => {
                return Ok(Err(SignUpOutcome::Rejected(RegisterResponse::errors_from(
                    &body,
                ))))
            }
            Err(e) => return Err(e.into()),
        };

        match response.errors {
            Some(ref errors) if !errors.is_empty() => {
                Ok(Err(SignUpOutcome::Rejected(errors.clone())))
            }
            _ => Ok(Ok(response)),
        }
    }

    // ===== Sign In =====

    pub async fn sign_in_by_email(
        &self,
        email: &str,
        password: &str,
        password_confirmation: Option<&str>,
    ) -> Result<User> {
        let grant = Grant::Email {
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: password_confirmation.map(str::to_string),
        };
        self.sign_in_with_grant(grant).await
    }

    /// Exchange an OTP previously requested with `send_otp`.
    pub async fn sign_in_by_phone_number(&self, phone_number: &str, otp_code: &str) -> Result<User> {
        let grant = Grant::PhoneNumber {
            phone_number: phone_number.to_string(),
            otp_code: otp_code.to_string(),
        };
        self.sign_in_with_grant(grant).await
    }

    /// Exchange a third-party identity assertion (e.g. a GitHub access token).
    pub async fn sign_in_by_assertion(&self, provider: &str, assertion: &str) -> Result<User> {
        let grant = Grant::Assertion {
            provider: provider.to_string(),
            assertion: assertion.to_string(),
        };
        self.sign_in_with_grant(grant).await
    }

    /// Adopt the tokens of a completed external authorization-code flow.
    /// No identity-provider round trip is made.
    pub async fn sign_in_by_oauth2(&self, result: AuthorizationResult) -> Result<User> {
        let credentials = result.into_credentials(Utc::now());
        self.credentials
            .set(&credentials)
            .await
            .context("Failed to store OAuth2 credentials")?;
        self.require_user().await
    }

    async fn sign_in_with_grant(&self, grant: Grant) -> Result<User> {
        let request = TokenRequest::new(self.client_id.clone(), grant);
        let credentials: Credentials = self
            .rest
            .post("/oauth/token", &request, &RequestOptions::anonymous())
            .await?;
        self.credentials
            .set(&credentials)
            .await
            .context("Failed to store credentials")?;
        let user = self.require_user().await?;
        info!(user_id = user.id, "Signed in");
        Ok(user)
    }

    /// Ask the server to deliver an OTP. Without an explicit hash the cached
    /// one is sent; an explicit hash is cached for next time.
    pub async fn send_otp(
        &self,
        phone_number: &str,
        via: OtpChannel,
        validation_hash: Option<&str>,
    ) -> Result<()> {
        let validation_hash = match validation_hash {
            Some(hash) => {
                if let Err(e) = self.validation_hash.set(hash).await {
                    warn!(error = %e, "Failed to cache validation hash");
                }
                Some(hash.to_string())
            }
            None => self.validation_hash.get().await,
        };

        let body = json!({
            "otp": {
                "phoneNumber": phone_number,
                "via": via,
                "validationHash": validation_hash,
            }
        });
        let _: serde_json::Value = self
            .rest
            .post("/api/auth/send_otp", &body, &RequestOptions::new())
            .await?;
        debug!(?via, "OTP requested");
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let body = json!({ "user": { "email": email } });
        let _: serde_json::Value = self
            .rest
            .post("/users/password.json", &body, &RequestOptions::new())
            .await?;
        Ok(())
    }

    // ===== Sign Out =====

    /// Revoke (best effort), then clear credentials, cached responses and
    /// Current User. Safe to call when already signed out.
    pub async fn sign_out(&self) -> Result<()> {
        if let Some(credentials) = self.credentials.get().await {
            let request = RevokeRequest {
                client_id: self.client_id.clone(),
                token: credentials.access_token,
            };
            let revoked: std::result::Result<serde_json::Value, ApiError> = self
                .rest
                .post("/oauth/revoke", &request, &RequestOptions::anonymous())
                .await;
            if let Err(e) = revoked {
                warn!(error = %e, "Token revoke failed, signing out locally");
            }
        }

        let cleared = self.credentials.clear().await;
        if let Err(e) = self.graphql.reset().await {
            warn!(error = %e, "Failed to reset GraphQL cache");
        }
        self.set_current_user(None);
        cleared.context("Failed to clear stored credentials")?;
        info!("Signed out");
        Ok(())
    }

    // ===== Current User =====

    /// Re-fetch Current User ("who am I").
    pub async fn refresh_user(&self) -> Result<Option<User>> {
        let data: MeData = self.graphql.execute(&operations::ME, &json!({})).await?;
        self.set_current_user(data.me.clone());
        Ok(data.me)
    }

    /// Restore session state at startup from stored credentials.
    pub async fn hydrate(&self) -> Result<Option<User>> {
        if self.credentials.get().await.is_none() {
            debug!("No stored credentials, starting signed out");
            self.set_current_user(None);
            return Ok(None);
        }
        match self.refresh_user().await {
            Ok(user) => Ok(user),
            Err(e) => {
                self.set_current_user(None);
                Err(e.context("Failed to restore session"))
            }
        }
    }

    async fn require_user(&self) -> Result<User> {
        self.refresh_user().await?.ok_or_else(|| {
            ApiError::InvalidResponse("who-am-I returned no user after sign-in".to_string()).into()
        })
    }

    pub async fn update_user(&self, update: &UserUpdate) -> Result<User> {
        let id = self.current_user().ok_or(ApiError::NotSignedIn)?.id;
        let data: UpdateUserData = self
            .graphql
            .execute(&operations::UPDATE_USER, &json!({ "id": id, "user": update }))
            .await?;
        self.set_current_user(Some(data.update_user.clone()));
        Ok(data.update_user)
    }

    /// Register an uploaded blob (by its signed id) as `attribute` of the
    /// current user, then re-fetch the user.
    pub async fn create_attachment(&self, signed_id: &str, attribute: &str) -> Result<Attachment> {
        let id = self.current_user().ok_or(ApiError::NotSignedIn)?.id;
        let variables = json!({
            "signedId": signed_id,
            "relatedId": id,
            "relatedType": "User",
            "attribute": attribute,
        });
        let data: CreateAttachmentData = self
            .graphql
            .execute(&operations::CREATE_ATTACHMENT, &variables)
            .await?;
        self.refresh_user().await?;
        Ok(data.create_attachment)
    }
}

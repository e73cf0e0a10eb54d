use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::models::auth::{AuthProvider, AuthRedirectAttempt, AuthResolution, RedirectUser};
use crate::models::profile::{ProfilePatch, UserProfile};
use crate::services::cache::AttemptSlot;
use crate::services::profiles::{ProfileError, ProfileStore};

/// Closed classification of sign-in failures. External error shapes are
/// translated into this once, at the gateway boundary; nothing downstream
/// matches on provider-specific strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    PopupBlocked,
    PopupClosedByUser,
    PopupCancelled,
    AccountExistsWithDifferentCredential,
    UnauthorizedDomain,
    OriginMismatch,
    AttemptInProgress,
    Storage,
    Network,
    Provider,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    pub message: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Popup failures that fall back to the full-page redirect path.
    pub fn is_recoverable_popup_failure(&self) -> bool {
        matches!(
            self.kind,
            AuthErrorKind::PopupBlocked
                | AuthErrorKind::PopupClosedByUser
                | AuthErrorKind::PopupCancelled
        )
    }
}

/// Consumed capability: the identity provider SDK.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Same-tab popup sign-in; the result is available in-page.
    async fn popup_sign_in(&self, provider: AuthProvider) -> Result<RedirectUser, AuthError>;

    /// Full navigation handoff to the provider; the page unloads after
    /// this resolves.
    async fn launch_redirect(&self, provider: AuthProvider) -> Result<(), AuthError>;

    /// Consume the pending redirect result, if this page load carries one.
    async fn take_redirect_result(&self) -> Result<Option<RedirectUser>, AuthError>;
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    /// Age past which a stored attempt is discarded silently.
    pub attempt_expiry: Duration,
    /// Window in which a missing result earns one bounded re-check.
    pub recent_window: Duration,
    pub recheck_delay: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            attempt_expiry: Duration::from_secs(300),
            recent_window: Duration::from_secs(10),
            recheck_delay: Duration::from_secs(1),
        }
    }
}

/// How a federated login attempt left the current page.
#[derive(Debug)]
pub enum LoginStart {
    /// Popup path completed in-page.
    SignedIn(RedirectUser),
    /// Full-page handoff launched; a later page load must call `resolve`.
    RedirectLaunched,
    Failed(AuthError),
}

/// Reconciles popup and full-page-redirect sign-in into one session
/// decision, exactly once per attempt. The attempt slot in shared client
/// storage is the sole guard against duplicate processing.
pub struct RedirectAuthResolver {
    gateway: Arc<dyn AuthGateway>,
    profiles: Arc<dyn ProfileStore>,
    attempts: AttemptSlot,
    settings: ResolverSettings,
}

impl RedirectAuthResolver {
    pub fn new(
        gateway: Arc<dyn AuthGateway>,
        profiles: Arc<dyn ProfileStore>,
        attempts: AttemptSlot,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            gateway,
            profiles,
            attempts,
            settings,
        }
    }

    /// Start a federated login: popup first, redirect as fallback for
    /// recoverable popup failures. `origin` and `path` are the browser
    /// location at launch.
    pub async fn begin_login(&self, provider: AuthProvider, origin: &str, path: &str) -> LoginStart {
        match self.gateway.popup_sign_in(provider).await {
            Ok(user) => {
                if let Err(e) = self.reconcile_profile(&user).await {
                    tracing::warn!(uid = %user.uid, error = %e, "profile reconciliation failed after popup sign-in");
                }
                LoginStart::SignedIn(user)
            }
            Err(e) if e.is_recoverable_popup_failure() => {
                tracing::info!(provider = provider.as_ref(), reason = %e, "popup unavailable, falling back to redirect");
                let attempt = AuthRedirectAttempt::new(provider, origin, path);
                match self.attempts.try_acquire(&attempt) {
                    Ok(true) => match self.gateway.launch_redirect(provider).await {
                        Ok(()) => LoginStart::RedirectLaunched,
                        Err(e) => {
                            self.clear_attempt();
                            LoginStart::Failed(e)
                        }
                    },
                    Ok(false) => LoginStart::Failed(AuthError::new(
                        AuthErrorKind::AttemptInProgress,
                        "another sign-in attempt is already in progress",
                    )),
                    Err(e) => LoginStart::Failed(AuthError::new(
                        AuthErrorKind::Storage,
                        format!("could not record redirect attempt: {e}"),
                    )),
                }
            }
            Err(e) => LoginStart::Failed(e),
        }
    }

    /// Reconcile any pending redirect result into a single session
    /// decision. Safe to call on every page load: once an attempt has been
    /// processed the slot is empty and later calls resolve to nothing.
    pub async fn resolve(&self) -> AuthResolution {
        let attempt = match self.attempts.load() {
            Ok(attempt) => attempt,
            Err(e) => {
                tracing::warn!(error = %e, "could not read redirect attempt");
                None
            }
        };

        if let Some(ref pending) = attempt {
            if pending.is_expired(self.settings.attempt_expiry) {
                // The user abandoned the provider's page; discard silently.
                tracing::debug!(provider = pending.provider.as_ref(), "redirect attempt expired, clearing");
                self.clear_attempt();
                return AuthResolution::none();
            }
        }

        match self.gateway.take_redirect_result().await {
            Ok(Some(user)) => self.finish(user).await,
            Ok(None) => {
                let Some(pending) = attempt else {
                    // Normal page load, nothing outstanding.
                    return AuthResolution::none();
                };
                if pending.is_recent(self.settings.recent_window) {
                    // The provider may still be handing the result back:
                    // one bounded re-check, not a loop.
                    sleep(self.settings.recheck_delay).await;
                    match self.gateway.take_redirect_result().await {
                        Ok(Some(user)) => return self.finish(user).await,
                        Ok(None) => {}
                        Err(e) => {
                            self.clear_attempt();
                            return AuthResolution::failed(describe(&e));
                        }
                    }
                }
                self.clear_attempt();
                AuthResolution::failed("redirect sign-in did not complete; please try again")
            }
            Err(e) => {
                self.clear_attempt();
                AuthResolution::failed(describe(&e))
            }
        }
    }

    /// Whether onboarding/splash logic should defer its own navigation
    /// because a redirect attempt is still live.
    pub fn attempt_outstanding(&self) -> bool {
        match self.attempts.load() {
            Ok(Some(attempt)) => !attempt.is_expired(self.settings.attempt_expiry),
            _ => false,
        }
    }

    async fn finish(&self, user: RedirectUser) -> AuthResolution {
        if let Err(e) = self.reconcile_profile(&user).await {
            // The session itself is adopted; the profile write is
            // supporting data.
            tracing::warn!(uid = %user.uid, error = %e, "profile reconciliation failed after redirect");
        }
        self.clear_attempt();
        tracing::info!(uid = %user.uid, "redirect sign-in reconciled");
        AuthResolution::resolved(&user.uid)
    }

    async fn reconcile_profile(&self, user: &RedirectUser) -> Result<(), ProfileError> {
        match self.profiles.get(&user.uid).await? {
            None => {
                self.profiles
                    .create(&user.uid, UserProfile::from_redirect(user))
                    .await
            }
            Some(_) => {
                self.profiles
                    .merge(&user.uid, ProfilePatch::from_redirect(user))
                    .await
            }
        }
    }

    fn clear_attempt(&self) {
        if let Err(e) = self.attempts.release() {
            tracing::warn!(error = %e, "failed to clear redirect attempt");
        }
    }
}

fn describe(error: &AuthError) -> String {
    match error.kind {
        AuthErrorKind::AccountExistsWithDifferentCredential => {
            format!("{error}; sign in with the method you used originally")
        }
        AuthErrorKind::UnauthorizedDomain | AuthErrorKind::OriginMismatch => {
            format!("{error}; add this domain to the provider's authorized domain list")
        }
        _ => error.to_string(),
    }
}

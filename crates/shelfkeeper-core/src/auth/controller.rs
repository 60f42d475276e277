//! Login, logout, session verification and expiry-driven logout.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{ApiResult, CatalogApi, Credentials};

use super::{Clock, Session, SessionStore};

/// Outcome of a session check or logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Authenticated,
    NotAuthenticated,
}

/// Signals sent from the auth layer to whoever owns the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The session reached its expiry and was cleared
    Expired,
}

pub struct AuthController {
    api: Arc<dyn CatalogApi>,
    store: Arc<Mutex<SessionStore>>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    events: mpsc::Sender<AuthEvent>,
    expiry_timer: Option<JoinHandle<()>>,
}

impl AuthController {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        store: Arc<Mutex<SessionStore>>,
        clock: Arc<dyn Clock>,
        session_ttl: Duration,
        events: mpsc::Sender<AuthEvent>,
    ) -> Self {
        Self {
            api,
            store,
            clock,
            session_ttl,
            events,
            expiry_timer: None,
        }
    }

    /// Verify the persisted session with the server.
    ///
    /// An invalid or rejected session is cleared. A good one gets its
    /// expiry timer (re)scheduled.
    pub async fn check_session(&mut self) -> AuthStatus {
        let session = {
            let mut store = self.store.lock().await;
            match store.valid_session() {
                Some(session) => session,
                None => {
                    debug!("No valid session to check");
                    store.clear();
                    return AuthStatus::NotAuthenticated;
                }
            }
        };

        match self.api.check_session(&session.token).await {
            Ok(()) => {
                info!(expires_at = %session.expires_at, "Session verified");
                self.schedule_expiry(session.expires_at).await;
                AuthStatus::Authenticated
            }
            Err(e) => {
                warn!(error = %e, "Session check failed");
                self.cancel_expiry_timer();
                self.store.lock().await.clear();
                AuthStatus::NotAuthenticated
            }
        }
    }

    /// Sign in and persist the new session.
    ///
    /// The session lasts the configured TTL from now. On failure the
    /// stored session is left untouched.
    pub async fn login(&mut self, credentials: &Credentials) -> ApiResult<Session> {
        let grant = match self.api.signin(credentials).await {
            Ok(grant) => grant,
            Err(e) => {
                error!(error = %e, "Login failed");
                return Err(e);
            }
        };
        debug!(server_expiry = ?grant.server_expiry, "Signin accepted");

        let session = self.store.lock().await.save(&grant.token, self.session_ttl);
        info!(expires_at = %session.expires_at, "Login successful");
        self.schedule_expiry(session.expires_at).await;
        Ok(session)
    }

    /// Cancel the expiry timer and forget the session. The server-side
    /// logout is best effort.
    pub async fn logout(&mut self) -> AuthStatus {
        self.cancel_expiry_timer();

        let token = {
            let mut store = self.store.lock().await;
            let token = store.load().map(|s| s.token);
            store.clear();
            token
        };

        if let Some(token) = token.filter(|t| !t.is_empty()) {
            if let Err(e) = self.api.logout(&token).await {
                warn!(error = %e, "Server-side logout failed");
            }
        }

        info!("Logged out");
        AuthStatus::NotAuthenticated
    }

    /// Drop the local session without contacting the server, e.g. after
    /// the API rejected the token.
    pub async fn invalidate(&mut self) {
        self.cancel_expiry_timer();
        self.store.lock().await.clear();
        info!("Session invalidated");
    }

    /// Replace any pending expiry timer with one firing at `expires_at`.
    /// An expiry already in the past clears the session immediately.
    pub async fn schedule_expiry(&mut self, expires_at: DateTime<Utc>) {
        self.cancel_expiry_timer();

        let now = self.clock.now();
        if expires_at <= now {
            info!("Session already expired");
            Self::expire(&self.store, &self.events).await;
            return;
        }

        let delay = (expires_at - now).to_std().unwrap_or_default();
        let Some(deadline) = tokio::time::Instant::now().checked_add(delay) else {
            debug!(%expires_at, "Session expiry is beyond the timer range");
            return;
        };
        debug!(delay_secs = delay.as_secs(), "Scheduling session expiry");

        let store = Arc::clone(&self.store);
        let events = self.events.clone();
        self.expiry_timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            info!("Session expired");
            Self::expire(&store, &events).await;
        }));
    }

    pub fn has_pending_expiry(&self) -> bool {
        self.expiry_timer
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    fn cancel_expiry_timer(&mut self) {
        if let Some(handle) = self.expiry_timer.take() {
            handle.abort();
        }
    }

    async fn expire(store: &Arc<Mutex<SessionStore>>, events: &mpsc::Sender<AuthEvent>) {
        store.lock().await.clear();
        if let Err(e) = events.send(AuthEvent::Expired).await {
            error!(error = %e, "Failed to send expiry event - channel closed");
        }
    }
}

impl Drop for AuthController {
    fn drop(&mut self) {
        self.cancel_expiry_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{harness, FakeCatalog, Harness};
    use std::time::Duration as StdDuration;

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn controller(h: &Harness, ttl: Duration) -> (AuthController, mpsc::Receiver<AuthEvent>) {
        let (tx, rx) = mpsc::channel(8);
        let auth = AuthController::new(
            h.api.clone(),
            Arc::clone(&h.store),
            h.clock.clone(),
            ttl,
            tx,
        );
        (auth, rx)
    }

    #[tokio::test]
    async fn test_login_saves_session_with_fixed_ttl() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, _rx) = controller(&h, Duration::hours(24));

        let session = auth.login(&credentials("a@b.com", "x")).await.unwrap();
        assert_eq!(session.token, "T1");
        assert_eq!(session.expires_at, h.clock.now() + Duration::hours(24));

        let store = h.store.lock().await;
        assert!(store.is_valid());
        assert_eq!(store.token().as_deref(), Some("T1"));
        drop(store);
        assert!(auth.has_pending_expiry());
    }

    #[tokio::test]
    async fn test_login_with_unbounded_ttl() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, _rx) = controller(&h, Duration::MAX);

        let session = auth.login(&credentials("a@b.com", "x")).await.unwrap();
        assert_eq!(session.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(h.store.lock().await.is_valid());

        // Rescheduling for the far end of time replaces the timer cleanly
        auth.schedule_expiry(DateTime::<Utc>::MAX_UTC).await;
        assert!(h.store.lock().await.is_valid());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_untouched() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, _rx) = controller(&h, Duration::hours(24));

        auth.login(&credentials("a@b.com", "x")).await.unwrap();
        let before = h.store.lock().await.load();

        let err = auth.login(&credentials("a@b.com", "wrong")).await.unwrap_err();
        assert!(matches!(err, crate::api::ApiError::InvalidCredentials(_)));
        assert_eq!(h.store.lock().await.load(), before);

        // And from a blank slate nothing gets written
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, _rx) = controller(&h, Duration::hours(24));
        assert!(auth.login(&credentials("nobody", "x")).await.is_err());
        assert!(h.store.lock().await.load().is_none());
    }

    #[tokio::test]
    async fn test_check_session_without_session() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, _rx) = controller(&h, Duration::hours(1));

        assert_eq!(auth.check_session().await, AuthStatus::NotAuthenticated);
        assert_eq!(h.api.check_calls(), 0);
        assert!(!auth.has_pending_expiry());
    }

    #[tokio::test]
    async fn test_check_session_clears_expired_session_without_network() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, _rx) = controller(&h, Duration::hours(1));

        let past = h.clock.now() - Duration::minutes(1);
        h.store.lock().await.save_until("T1", past);

        assert_eq!(auth.check_session().await, AuthStatus::NotAuthenticated);
        assert_eq!(h.api.check_calls(), 0);
        assert!(h.store.lock().await.load().is_none());
    }

    #[tokio::test]
    async fn test_check_session_verifies_with_server() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, _rx) = controller(&h, Duration::hours(1));
        h.store.lock().await.save("T1", Duration::hours(1));

        assert_eq!(auth.check_session().await, AuthStatus::Authenticated);
        assert_eq!(h.api.check_calls(), 1);
        assert!(auth.has_pending_expiry());
    }

    #[tokio::test]
    async fn test_check_session_rejected_by_server_clears() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, _rx) = controller(&h, Duration::hours(1));
        h.store.lock().await.save("stale-token", Duration::hours(1));

        assert_eq!(auth.check_session().await, AuthStatus::NotAuthenticated);
        assert!(h.store.lock().await.load().is_none());
        assert!(!auth.has_pending_expiry());
    }

    #[tokio::test]
    async fn test_logout_clears_and_cancels_timer() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, _rx) = controller(&h, Duration::hours(1));
        auth.login(&credentials("a@b.com", "x")).await.unwrap();

        assert_eq!(auth.logout().await, AuthStatus::NotAuthenticated);
        assert!(h.store.lock().await.load().is_none());
        assert!(!auth.has_pending_expiry());
        assert_eq!(h.api.logout_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_timer_fires_once_at_deadline() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, mut rx) = controller(&h, Duration::milliseconds(1000));
        auth.login(&credentials("a@b.com", "x")).await.unwrap();

        tokio::time::advance(StdDuration::from_millis(999)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
        assert!(h.store.lock().await.load().is_some());

        tokio::time::advance(StdDuration::from_millis(1)).await;
        assert_eq!(rx.recv().await, Some(AuthEvent::Expired));
        assert!(h.store.lock().await.load().is_none());

        // Fires exactly once
        tokio::time::advance(StdDuration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous_timer() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, mut rx) = controller(&h, Duration::hours(1));
        h.store.lock().await.save("T1", Duration::hours(1));

        let now = h.clock.now();
        auth.schedule_expiry(now + Duration::seconds(1)).await;
        auth.schedule_expiry(now + Duration::seconds(5)).await;

        tokio::time::advance(StdDuration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "first timer must have been cancelled");

        tokio::time::advance(StdDuration::from_secs(3)).await;
        assert_eq!(rx.recv().await, Some(AuthEvent::Expired));
    }

    #[tokio::test]
    async fn test_schedule_in_past_clears_immediately() {
        let h = harness(FakeCatalog::new("a@b.com", "x", "T1"));
        let (mut auth, mut rx) = controller(&h, Duration::hours(1));
        h.store.lock().await.save("T1", Duration::hours(1));

        auth.schedule_expiry(h.clock.now() - Duration::seconds(1)).await;
        assert!(!auth.has_pending_expiry());
        assert_eq!(rx.try_recv().ok(), Some(AuthEvent::Expired));
        assert!(h.store.lock().await.load().is_none());
    }
}

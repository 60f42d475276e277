use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::cookie::Jar;
use reqwest::Url;
use tracing::{debug, warn};

use super::LocalStorage;

/// Storage key holding the bearer token
pub const TOKEN_KEY: &str = "hexToken";

/// Storage key holding the expiry as epoch milliseconds
pub const EXPIRATION_KEY: &str = "tokenExpiration";

/// Cookie mirroring the token for requests to the API host
pub const TOKEN_COOKIE: &str = "hexToken";

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session authenticates requests only while unexpired and non-empty.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }
}

/// Owner of the persisted session.
///
/// The token and its expiry are kept in [`LocalStorage`] and mirrored
/// into the cookie jar the HTTP client sends from. Persistence failures
/// are logged and never abort the caller; the in-memory entries stay
/// authoritative for the running process.
pub struct SessionStore {
    storage: LocalStorage,
    cookies: Arc<Jar>,
    cookie_url: Url,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    /// Read persisted state. A still-valid session is re-mirrored into
    /// the cookie jar.
    pub fn init(storage: LocalStorage, cookies: Arc<Jar>, cookie_url: Url, clock: Arc<dyn Clock>) -> Self {
        let store = Self {
            storage,
            cookies,
            cookie_url,
            clock,
        };

        match store.load() {
            Some(session) if session.is_valid_at(store.clock.now()) => {
                debug!(expires_at = %session.expires_at, "Restored persisted session");
                store.mirror_cookie(&session);
            }
            Some(_) => debug!("Persisted session has expired"),
            None => debug!("No persisted session"),
        }

        store
    }

    /// Persist `token` valid for `ttl` from now. A `ttl` past the end of
    /// representable time saturates.
    pub fn save(&mut self, token: &str, ttl: Duration) -> Session {
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.save_until(token, expires_at)
    }

    /// Persist `token` valid until `expires_at`.
    pub fn save_until(&mut self, token: &str, expires_at: DateTime<Utc>) -> Session {
        let session = Session {
            token: token.to_string(),
            expires_at,
        };

        let millis = expires_at.timestamp_millis().to_string();
        if let Err(e) = self.storage.set_item(TOKEN_KEY, token) {
            warn!(error = %e, "Failed to persist token");
        }
        if let Err(e) = self.storage.set_item(EXPIRATION_KEY, &millis) {
            warn!(error = %e, "Failed to persist token expiration");
        }
        self.mirror_cookie(&session);

        session
    }

    /// The persisted session, if one was ever saved and is readable.
    pub fn load(&self) -> Option<Session> {
        let token = self.storage.get_item(TOKEN_KEY)?;
        let millis: i64 = self.storage.get_item(EXPIRATION_KEY)?.parse().ok()?;
        let expires_at = DateTime::<Utc>::from_timestamp_millis(millis)?;
        Some(Session {
            token: token.to_string(),
            expires_at,
        })
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(self.clock.now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.load().map(|s| s.is_valid_at(now)).unwrap_or(false)
    }

    /// The current session if it is valid right now.
    pub fn valid_session(&self) -> Option<Session> {
        let now = self.clock.now();
        self.load().filter(|s| s.is_valid_at(now))
    }

    /// Get the bearer token if the session is valid
    pub fn token(&self) -> Option<String> {
        self.valid_session().map(|s| s.token)
    }

    /// Remove the token and expiry from storage and expire the cookie.
    pub fn clear(&mut self) {
        if let Err(e) = self.storage.remove_item(TOKEN_KEY) {
            warn!(error = %e, "Failed to remove token");
        }
        if let Err(e) = self.storage.remove_item(EXPIRATION_KEY) {
            warn!(error = %e, "Failed to remove token expiration");
        }
        let expired = format!("{}=; Max-Age=0; Path=/; SameSite=None; Secure", TOKEN_COOKIE);
        self.cookies.add_cookie_str(&expired, &self.cookie_url);
        debug!("Session cleared");
    }

    fn mirror_cookie(&self, session: &Session) {
        let cookie = format!(
            "{}={}; Expires={}; Path=/; SameSite=None; Secure",
            TOKEN_COOKIE,
            session.token,
            session.expires_at.format("%a, %d %b %Y %H:%M:%S GMT")
        );
        self.cookies.add_cookie_str(&cookie, &self.cookie_url);
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::cookie::Jar;
use reqwest::Url;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use shelfkeeper_core::api::{ApiClient, Credentials};
use shelfkeeper_core::auth::{AuthController, LocalStorage, SessionStore, SystemClock};
use shelfkeeper_core::config::Config;
use shelfkeeper_core::models::ProductField;
use shelfkeeper_core::repository::ProductRepository;
use shelfkeeper_core::view::ViewController;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for auth event channel
const AUTH_EVENT_BUFFER_SIZE: usize = 8;

/// Maximum allowed username length in login form
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum allowed password length in login form
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length of a single form field
const MAX_FIELD_LENGTH: usize = 2000;

/// Session file name inside the cache directory
const SESSION_FILE: &str = "session.json";

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Button,
}

/// Main application state container
pub struct App {
    pub config: Config,
    pub view: ViewController,

    // UI State
    pub state: AppState,
    pub selection: usize,

    // Login form
    pub login_username: String,
    pub login_password: String,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    // Product form
    pub form_field: ProductField,
    pub form_input: String,
    pub form_error: Option<String>,
}

impl App {
    /// Wire config, session store, API client and controllers together.
    pub fn new(config: Config) -> Result<Self> {
        let settings = config.api_settings()?;
        let cache_dir = config.cache_dir()?;
        let cookie_url = Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid API base URL: {}", settings.base_url))?;

        let jar = Arc::new(Jar::default());
        let api = Arc::new(ApiClient::new(&settings, Arc::clone(&jar))?);
        let clock = Arc::new(SystemClock);

        let storage = LocalStorage::open(cache_dir.join(SESSION_FILE));
        let store = Arc::new(Mutex::new(SessionStore::init(
            storage,
            jar,
            cookie_url,
            clock.clone(),
        )));

        let (auth_tx, auth_rx) = mpsc::channel(AUTH_EVENT_BUFFER_SIZE);
        let auth = AuthController::new(
            api.clone(),
            Arc::clone(&store),
            clock,
            config.session_ttl(),
            auth_tx,
        );
        let repo = ProductRepository::new(api, store);
        let view = ViewController::new(auth, repo, auth_rx);

        Ok(Self::with_view(config, view))
    }

    pub fn with_view(config: Config, view: ViewController) -> Self {
        let prefill = config.login_prefill();
        Self {
            config,
            view,
            state: AppState::Normal,
            selection: 0,
            login_username: prefill.username,
            login_password: prefill.password,
            login_focus: LoginFocus::Username,
            login_error: None,
            form_field: ProductField::Title,
            form_input: String::new(),
            form_error: None,
        }
    }

    /// Restore a persisted session if the server still accepts it.
    pub async fn start(&mut self) {
        self.view.start().await;
        if !self.view.is_authenticated() {
            self.start_login();
        }
    }

    pub fn is_logging_in(&self) -> bool {
        !self.view.is_authenticated()
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Start the login process (show login overlay)
    pub fn start_login(&mut self) {
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) {
        let username = self.login_username.trim().to_string();
        let password = self.login_password.clone();

        if username.is_empty() || password.is_empty() {
            self.login_error = Some("Username and password required".to_string());
            return;
        }
        self.login_error = None;

        let credentials = Credentials {
            username: username.clone(),
            password,
        };

        if self.view.login(&credentials).await {
            self.login_password.clear();
            self.selection = 0;
            self.config.last_username = Some(username);
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
            info!("Login successful");
        } else {
            // Show the failure inline instead of as a separate notice
            self.login_error = self.view.notice().map(|n| n.message.clone());
            self.view.dismiss_notice();
        }
    }

    pub async fn logout(&mut self) {
        self.view.logout().await;
        self.selection = 0;
        self.start_login();
    }

    // =========================================================================
    // Product list
    // =========================================================================

    pub fn select_next(&mut self) {
        let len = self.view.products().len();
        if len > 0 && self.selection + 1 < len {
            self.selection += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selection = self.selection.saturating_sub(1);
    }

    /// Keep the selection inside the current page.
    fn clamp_selection(&mut self) {
        let len = self.view.products().len();
        if self.selection >= len {
            self.selection = len.saturating_sub(1);
        }
    }

    pub fn open_create(&mut self) {
        self.view.open_create();
        self.begin_form();
    }

    pub fn open_edit_selected(&mut self) {
        if self.view.open_edit(self.selection) {
            self.begin_form();
        }
    }

    pub fn request_delete_selected(&mut self) {
        self.view.request_delete(self.selection);
    }

    pub fn next_page(&mut self) {
        self.selection = 0;
        self.view.next_page();
    }

    pub fn prev_page(&mut self) {
        self.selection = 0;
        self.view.prev_page();
    }

    // =========================================================================
    // Product form
    // =========================================================================

    fn begin_form(&mut self) {
        self.form_error = None;
        self.focus_field(ProductField::Title);
    }

    fn focus_field(&mut self, field: ProductField) {
        self.form_field = field;
        self.form_input = self
            .view
            .modal()
            .map(|m| m.draft.text(field))
            .unwrap_or_default();
    }

    /// Write the edit buffer into the draft. Returns false and leaves focus
    /// where it is when the text does not parse.
    pub fn commit_field(&mut self) -> bool {
        let field = self.form_field;
        let Some(draft) = self.view.draft_mut() else {
            return false;
        };
        match draft.set_text(field, &self.form_input) {
            Ok(()) => {
                self.form_error = None;
                true
            }
            Err(e) => {
                self.form_error = Some(e.to_string());
                false
            }
        }
    }

    pub fn form_next_field(&mut self) {
        if self.commit_field() {
            self.focus_field(self.form_field.next());
        }
    }

    pub fn form_prev_field(&mut self) {
        if self.commit_field() {
            self.focus_field(self.form_field.prev());
        }
    }

    pub fn form_push_char(&mut self, c: char) {
        if can_add_field_char(self.form_input.chars().count(), c) {
            self.form_input.push(c);
        }
    }

    pub fn form_backspace(&mut self) {
        self.form_input.pop();
    }

    pub fn toggle_enabled(&mut self) {
        if self.form_field != ProductField::IsEnabled {
            return;
        }
        if let Some(draft) = self.view.draft_mut() {
            draft.toggle_enabled();
        }
        self.focus_field(ProductField::IsEnabled);
    }

    pub fn submit_form(&mut self) {
        if self.commit_field() {
            self.view.submit_draft();
        }
    }

    pub fn cancel_form(&mut self) {
        self.view.close_modal();
        self.form_input.clear();
        self.form_error = None;
    }

    // =========================================================================
    // Background Tasks
    // =========================================================================

    pub async fn check_background_tasks(&mut self) {
        let was_authenticated = self.view.is_authenticated();
        self.view.check_background_tasks().await;
        self.clamp_selection();

        if was_authenticated && !self.view.is_authenticated() {
            self.start_login();
        }
    }
}

// ============================================================================
// Input Validation
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted
pub fn can_add_username_char(current_len: usize, c: char) -> bool {
    current_len < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

/// Check if a product form character should be accepted
pub fn can_add_field_char(current_len: usize, c: char) -> bool {
    current_len < MAX_FIELD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================

//! View state machine for the console.
//!
//! [`ViewController`] owns the auth controller and the repository and
//! exposes everything the terminal front end renders: the current page of
//! products, pagination, the open modal with its draft, a pending delete
//! and the notice waiting to be dismissed.
//!
//! Remote calls other than login/logout run as spawned tasks and report
//! back through a channel, drained by [`ViewController::check_background_tasks`]
//! on every tick of the UI loop.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiResult, Credentials};
use crate::auth::{AuthController, AuthEvent, AuthStatus};
use crate::models::{Pagination, Product, ProductDraft, ProductPage};
use crate::repository::ProductRepository;

/// Buffer size for background task result channel
const CHANNEL_BUFFER_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Unauthenticated,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Outcome message the operator has to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalKind {
    Create,
    Edit { id: String },
}

/// Create/edit form. Owns its draft; closing drops it.
#[derive(Debug, Clone)]
pub struct Modal {
    pub kind: ModalKind,
    pub draft: ProductDraft,
    /// Distinguishes this opening from any earlier or later one
    generation: u64,
}

impl Modal {
    pub fn title(&self) -> &'static str {
        match self.kind {
            ModalKind::Create => "New Product",
            ModalKind::Edit { .. } => "Edit Product",
        }
    }
}

/// Product waiting for delete confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: String,
    pub title: String,
}

/// Results from background tasks
enum TaskResult {
    Listed {
        generation: u64,
        result: ApiResult<ProductPage>,
    },
    Saved {
        created: bool,
        modal_generation: u64,
        result: ApiResult<()>,
    },
    Deleted {
        id: String,
        page: u32,
        emptied_page: bool,
        result: ApiResult<()>,
    },
}

pub struct ViewController {
    auth: AuthController,
    repo: ProductRepository,
    auth_events: mpsc::Receiver<AuthEvent>,
    result_tx: mpsc::Sender<TaskResult>,
    result_rx: mpsc::Receiver<TaskResult>,

    state: ViewState,
    products: Vec<Product>,
    pagination: Pagination,
    modal: Option<Modal>,
    pending_delete: Option<PendingDelete>,
    notice: Option<Notice>,

    /// A create/update/delete is in flight
    busy: bool,
    /// The latest listing request has not come back yet
    loading: bool,
    list_generation: u64,
    modal_generation: u64,
}

impl ViewController {
    pub fn new(
        auth: AuthController,
        repo: ProductRepository,
        auth_events: mpsc::Receiver<AuthEvent>,
    ) -> Self {
        let (result_tx, result_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            auth,
            repo,
            auth_events,
            result_tx,
            result_rx,
            state: ViewState::Unauthenticated,
            products: Vec::new(),
            pagination: Pagination::default(),
            modal: None,
            pending_delete: None,
            notice: None,
            busy: false,
            loading: false,
            list_generation: 0,
            modal_generation: 0,
        }
    }

    // ===== Accessors =====

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == ViewState::Authenticated
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    /// Mutable access to the open modal's draft.
    pub fn draft_mut(&mut self) -> Option<&mut ProductDraft> {
        self.modal.as_mut().map(|m| &mut m.draft)
    }

    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    // ===== Session =====

    /// Verify any persisted session and load the first page if it holds.
    pub async fn start(&mut self) {
        match self.auth.check_session().await {
            AuthStatus::Authenticated => {
                self.enter_authenticated();
            }
            AuthStatus::NotAuthenticated => {
                self.leave_authenticated();
            }
        }
    }

    pub async fn login(&mut self, credentials: &Credentials) -> bool {
        if self.is_authenticated() {
            debug!("Already signed in");
            return true;
        }

        match self.auth.login(credentials).await {
            Ok(_) => {
                self.enter_authenticated();
                true
            }
            Err(e) => {
                self.notice = Some(Notice::error(error_message(&e)));
                false
            }
        }
    }

    pub async fn logout(&mut self) {
        self.auth.logout().await;
        self.leave_authenticated();
        self.notice = Some(Notice::info("Signed out"));
    }

    fn enter_authenticated(&mut self) {
        self.state = ViewState::Authenticated;
        self.fetch_page(1);
    }

    fn leave_authenticated(&mut self) {
        self.state = ViewState::Unauthenticated;
        self.products.clear();
        self.pagination = Pagination::default();
        self.modal = None;
        self.pending_delete = None;
        self.loading = false;
        // Anything still in flight belongs to the old session
        self.list_generation += 1;
    }

    async fn session_lost(&mut self) {
        self.auth.invalidate().await;
        self.leave_authenticated();
        self.notice = Some(Notice::error("Session is no longer valid, please sign in again"));
    }

    // ===== Listing =====

    /// Request a page. Only the most recent request's result is applied.
    pub fn fetch_page(&mut self, page: u32) {
        if !self.is_authenticated() {
            return;
        }

        self.list_generation += 1;
        let generation = self.list_generation;
        self.loading = true;
        debug!(page, generation, "Fetching product page");

        let repo = self.repo.clone();
        let tx = self.result_tx.clone();
        tokio::spawn(async move {
            let result = repo.list(page).await;
            let _ = tx.send(TaskResult::Listed { generation, result }).await;
        });
    }

    pub fn refresh(&mut self) {
        self.fetch_page(self.pagination.current_page.max(1));
    }

    pub fn next_page(&mut self) {
        if let Some(page) = self.pagination.next_page() {
            self.fetch_page(page);
        }
    }

    pub fn prev_page(&mut self) {
        if let Some(page) = self.pagination.prev_page() {
            self.fetch_page(page);
        }
    }

    // ===== Modal =====

    pub fn open_create(&mut self) {
        if !self.is_authenticated() {
            return;
        }
        self.open_modal(ModalKind::Create, ProductDraft::empty());
    }

    /// Open the edit form for the product at `index` on the current page.
    pub fn open_edit(&mut self, index: usize) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        let Some(product) = self.products.get(index) else {
            return false;
        };
        let Some(id) = product.id.clone() else {
            warn!(title = %product.title, "Listed product has no id");
            return false;
        };

        let draft = ProductDraft::from_product(product);
        self.open_modal(ModalKind::Edit { id }, draft);
        true
    }

    fn open_modal(&mut self, kind: ModalKind, draft: ProductDraft) {
        self.modal_generation += 1;
        self.modal = Some(Modal {
            kind,
            draft,
            generation: self.modal_generation,
        });
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    /// Send the draft to the server. Refused while another change is in
    /// flight.
    pub fn submit_draft(&mut self) -> bool {
        if self.busy {
            debug!("Submit ignored, request already in flight");
            return false;
        }
        let Some(modal) = self.modal.as_ref() else {
            return false;
        };

        self.busy = true;
        let repo = self.repo.clone();
        let tx = self.result_tx.clone();
        let draft = modal.draft.clone();
        let kind = modal.kind.clone();
        let modal_generation = modal.generation;

        tokio::spawn(async move {
            let (created, result) = match kind {
                ModalKind::Create => (true, repo.create(&draft).await),
                ModalKind::Edit { id } => (false, repo.update(&id, &draft).await),
            };
            let _ = tx
                .send(TaskResult::Saved {
                    created,
                    modal_generation,
                    result,
                })
                .await;
        });
        true
    }

    // ===== Delete =====

    /// Ask for confirmation before deleting the product at `index`.
    pub fn request_delete(&mut self, index: usize) -> bool {
        if !self.is_authenticated() || self.modal.is_some() {
            return false;
        }
        let Some(product) = self.products.get(index) else {
            return false;
        };
        let Some(id) = product.id.clone() else {
            return false;
        };

        self.pending_delete = Some(PendingDelete {
            id,
            title: product.title.clone(),
        });
        true
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn confirm_delete(&mut self) -> bool {
        if self.busy {
            debug!("Delete ignored, request already in flight");
            return false;
        }
        let Some(pending) = self.pending_delete.take() else {
            return false;
        };

        self.busy = true;
        let page = self.pagination.current_page.max(1);
        let emptied_page = self.products.len() == 1;
        let repo = self.repo.clone();
        let tx = self.result_tx.clone();

        tokio::spawn(async move {
            let result = repo.remove(&pending.id).await;
            let _ = tx
                .send(TaskResult::Deleted {
                    id: pending.id,
                    page,
                    emptied_page,
                    result,
                })
                .await;
        });
        true
    }

    // ===== Background results =====

    /// Apply everything that has arrived since the last tick.
    pub async fn check_background_tasks(&mut self) {
        while let Ok(event) = self.auth_events.try_recv() {
            self.handle_auth_event(event);
        }
        while let Ok(result) = self.result_rx.try_recv() {
            self.apply_result(result).await;
        }
    }

    /// Wait for the next background result or auth event and apply it.
    pub async fn next_update(&mut self) {
        tokio::select! {
            Some(event) = self.auth_events.recv() => self.handle_auth_event(event),
            Some(result) = self.result_rx.recv() => self.apply_result(result).await,
            else => {}
        }
    }

    fn handle_auth_event(&mut self, event: AuthEvent) {
        match event {
            AuthEvent::Expired => {
                if self.is_authenticated() {
                    info!("Session expired, returning to sign in");
                    self.leave_authenticated();
                    self.notice = Some(Notice::error("Session expired, please sign in again"));
                }
            }
        }
    }

    async fn apply_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Listed { generation, result } => {
                if generation != self.list_generation {
                    debug!(generation, latest = self.list_generation, "Dropping stale product page");
                    return;
                }
                self.loading = false;
                match result {
                    Ok(page) => {
                        self.products = page.products;
                        self.pagination = page.pagination;
                    }
                    Err(e) => self.report_failure(e).await,
                }
            }
            TaskResult::Saved {
                created,
                modal_generation,
                result,
            } => {
                self.busy = false;
                if !self.is_authenticated() {
                    debug!("Save finished after sign out");
                    return;
                }
                match result {
                    Ok(()) => {
                        // Only the form that was submitted closes; one opened
                        // since then keeps its draft
                        if self.modal.as_ref().map(|m| m.generation) == Some(modal_generation) {
                            self.modal = None;
                        }
                        let message = if created { "Product created" } else { "Product updated" };
                        self.notice = Some(Notice::info(message));
                        self.refresh();
                    }
                    // The modal stays open so the operator can retry or cancel
                    Err(e) => self.report_failure(e).await,
                }
            }
            TaskResult::Deleted {
                id,
                page,
                emptied_page,
                result,
            } => {
                self.busy = false;
                if !self.is_authenticated() {
                    debug!(id, "Delete finished after sign out");
                    return;
                }
                match result {
                    Ok(()) => {
                        self.notice = Some(Notice::info("Product deleted"));
                        if emptied_page && page > 1 {
                            self.fetch_page(page - 1);
                        } else {
                            self.fetch_page(page);
                        }
                    }
                    Err(e) => self.report_failure(e).await,
                }
            }
        }
    }

    async fn report_failure(&mut self, e: ApiError) {
        if e.is_unauthenticated() {
            warn!("Request rejected, session no longer valid");
            self.session_lost().await;
            return;
        }
        warn!(error = %e, "Request failed");
        self.notice = Some(Notice::error(error_message(&e)));
    }
}

/// Text shown to the operator. Server-supplied messages are passed
/// through as-is.
fn error_message(e: &ApiError) -> String {
    match e {
        ApiError::InvalidCredentials(m)
        | ApiError::AccessDenied(m)
        | ApiError::NotFound(m)
        | ApiError::Validation(m)
        | ApiError::Server(m)
            if !m.is_empty() =>
        {
            m.clone()
        }
        ApiError::Transport(_) => "Network error - check your connection".to_string(),
        other => other.to_string(),
    }
}

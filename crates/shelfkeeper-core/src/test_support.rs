//! In-memory doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::cookie::Jar;
use reqwest::Url;
use tempfile::TempDir;

use crate::api::{ApiError, ApiResult, CatalogApi, Credentials, SigninGrant};
use crate::auth::{Clock, LocalStorage, SessionStore};
use crate::models::{Pagination, Product, ProductPage};

/// Clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for FixedClock {
    // Starts at the real current time so cookie expiry in the jar behaves
    fn default() -> Self {
        Self {
            now: Mutex::new(Utc::now()),
        }
    }
}

impl FixedClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

struct FakeState {
    username: String,
    password: String,
    token: String,
    products: Vec<Product>,
    next_id: u32,
    page_size: usize,
    seen_tokens: Vec<String>,
    check_calls: usize,
    logout_calls: usize,
    fail_next: Option<String>,
    list_delays: HashMap<u32, StdDuration>,
}

/// Catalog server double holding products in memory.
pub struct FakeCatalog {
    state: Mutex<FakeState>,
}

impl FakeCatalog {
    pub fn new(username: &str, password: &str, token: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                username: username.to_string(),
                password: password.to_string(),
                token: token.to_string(),
                products: Vec::new(),
                next_id: 1,
                page_size: 10,
                seen_tokens: Vec::new(),
                check_calls: 0,
                logout_calls: 0,
                fail_next: None,
                list_delays: HashMap::new(),
            }),
        }
    }

    /// Seed `count` products with ids `p1..=pN`.
    pub fn with_products(self, count: usize) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for _ in 0..count {
                let id = format!("p{}", state.next_id);
                state.next_id += 1;
                state.products.push(Product {
                    title: format!("Product {}", id),
                    id: Some(id),
                    price: 100.0,
                    origin_price: 120.0,
                    ..Default::default()
                });
            }
        }
        self
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state.lock().unwrap().page_size = page_size;
        self
    }

    pub fn delay_page(&self, page: u32, delay: StdDuration) {
        self.state.lock().unwrap().list_delays.insert(page, delay);
    }

    /// Delete a product behind the client's back.
    pub fn remove_server_side(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .products
            .retain(|p| p.id.as_deref() != Some(id));
    }

    /// Make the next product call fail with a server error.
    pub fn fail_next(&self, message: &str) {
        self.state.lock().unwrap().fail_next = Some(message.to_string());
    }

    pub fn seen_tokens(&self) -> Vec<String> {
        self.state.lock().unwrap().seen_tokens.clone()
    }

    pub fn check_calls(&self) -> usize {
        self.state.lock().unwrap().check_calls
    }

    pub fn logout_calls(&self) -> usize {
        self.state.lock().unwrap().logout_calls
    }

    pub fn product(&self, id: &str) -> Option<Product> {
        self.state
            .lock()
            .unwrap()
            .products
            .iter()
            .find(|p| p.id.as_deref() == Some(id))
            .cloned()
    }

    pub fn product_count(&self) -> usize {
        self.state.lock().unwrap().products.len()
    }

    fn authorize(&self, token: &str) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.seen_tokens.push(token.to_string());
        if token != state.token {
            return Err(ApiError::Unauthenticated);
        }
        if let Some(message) = state.fail_next.take() {
            return Err(ApiError::Server(message));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn signin(&self, credentials: &Credentials) -> ApiResult<SigninGrant> {
        let state = self.state.lock().unwrap();
        if credentials.username == state.username && credentials.password == state.password {
            Ok(SigninGrant {
                token: state.token.clone(),
                server_expiry: Some(Utc::now() + Duration::days(10)),
            })
        } else {
            Err(ApiError::InvalidCredentials("登入失敗".to_string()))
        }
    }

    async fn check_session(&self, token: &str) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.check_calls += 1;
        if token == state.token {
            Ok(())
        } else {
            Err(ApiError::Unauthenticated)
        }
    }

    async fn logout(&self, _token: &str) -> ApiResult<()> {
        self.state.lock().unwrap().logout_calls += 1;
        Ok(())
    }

    async fn list_products(&self, token: &str, page: u32) -> ApiResult<ProductPage> {
        let delay = self.state.lock().unwrap().list_delays.get(&page).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.authorize(token)?;

        let state = self.state.lock().unwrap();
        let page_size = state.page_size.max(1);
        let total_pages = state.products.len().div_ceil(page_size) as u32;
        let start = (page.saturating_sub(1) as usize) * page_size;
        let products = state
            .products
            .iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();

        Ok(ProductPage {
            products,
            pagination: Pagination {
                total_pages,
                current_page: page,
                has_prev: page > 1,
                has_next: page < total_pages,
                category: String::new(),
            },
        })
    }

    async fn create_product(&self, token: &str, product: &Product) -> ApiResult<()> {
        self.authorize(token)?;
        let mut state = self.state.lock().unwrap();
        let id = format!("p{}", state.next_id);
        state.next_id += 1;
        state.products.push(Product {
            id: Some(id),
            ..product.clone()
        });
        Ok(())
    }

    async fn update_product(&self, token: &str, id: &str, product: &Product) -> ApiResult<()> {
        self.authorize(token)?;
        let mut state = self.state.lock().unwrap();
        let existing = state
            .products
            .iter_mut()
            .find(|p| p.id.as_deref() == Some(id))
            .ok_or_else(|| ApiError::NotFound("找不到產品".to_string()))?;
        *existing = Product {
            id: Some(id.to_string()),
            ..product.clone()
        };
        Ok(())
    }

    async fn delete_product(&self, token: &str, id: &str) -> ApiResult<()> {
        self.authorize(token)?;
        let mut state = self.state.lock().unwrap();
        let before = state.products.len();
        state.products.retain(|p| p.id.as_deref() != Some(id));
        if state.products.len() == before {
            return Err(ApiError::NotFound("找不到產品".to_string()));
        }
        Ok(())
    }
}

/// Session store on a temp dir plus a fake server and clock.
pub struct Harness {
    pub api: Arc<FakeCatalog>,
    pub store: Arc<tokio::sync::Mutex<SessionStore>>,
    pub clock: Arc<FixedClock>,
    _dir: TempDir,
}

pub fn harness(api: FakeCatalog) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FixedClock::default());
    let storage = LocalStorage::open(dir.path().join("session.json"));
    let url = Url::parse("https://api.example.test/v2").unwrap();
    let store = SessionStore::init(storage, Arc::new(Jar::default()), url, clock.clone());

    Harness {
        api: Arc::new(api),
        store: Arc::new(tokio::sync::Mutex::new(store)),
        clock,
        _dir: dir,
    }
}

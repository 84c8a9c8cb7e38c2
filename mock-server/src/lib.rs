use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Password accepted by `/user/login` for any non-empty username.
pub const DEMO_PASSWORD: &str = "hunter2";
/// How long `/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_millis(500);

pub const CODE_OK: i64 = 0;
pub const CODE_UNAUTHORIZED: i64 = 401;
pub const CODE_FAILED: i64 = -1;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: u64,
    pub title: String,
    pub image_path: String,
    pub url: String,
    pub order: i32,
    pub is_visible: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub link: String,
    pub author: String,
    pub share_user: String,
    pub chapter_name: String,
    pub publish_time: i64,
    pub fresh: bool,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page_size: Option<u32>,
}

/// Issued session tokens mapped to their usernames.
pub type Sessions = Arc<RwLock<HashMap<Uuid, String>>>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Sessions,
    pub banners: Arc<Vec<Banner>>,
    pub articles: Arc<Vec<Article>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            banners: Arc::new(seed_banners()),
            articles: Arc::new(seed_articles()),
        }
    }
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/banner/json", get(list_banners))
        .route("/article/top/json", get(top_articles))
        .route("/article/list/{page}/json", get(article_page))
        .route("/user/login", post(login))
        .route("/user/info", get(user_info))
        .route("/user/logout", post(logout))
        .route("/echo", any(echo))
        .route("/status/{code}", get(bare_status))
        .route("/business-error", get(business_error))
        .route("/slow", get(slow))
        .route("/text", get(plain_text))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn ok(data: Value) -> Json<Value> {
    Json(json!({"errorCode": CODE_OK, "errorMsg": "", "data": data}))
}

fn fail(code: i64, message: &str) -> Json<Value> {
    Json(json!({"errorCode": code, "errorMsg": message}))
}

fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    Uuid::parse_str(token).ok()
}

async fn list_banners(State(state): State<AppState>) -> Json<Value> {
    ok(json!(*state.banners))
}

async fn top_articles(State(state): State<AppState>) -> Json<Value> {
    let top: Vec<&Article> = state.articles.iter().take(1).collect();
    ok(json!(top))
}

async fn article_page(
    State(state): State<AppState>,
    Path(page): Path<u32>,
    Query(query): Query<PageQuery>,
) -> Json<Value> {
    let size = query.page_size.unwrap_or(20).clamp(1, 40) as usize;
    let total = state.articles.len();
    let offset = page as usize * size;
    let datas: Vec<&Article> = state.articles.iter().skip(offset).take(size).collect();
    let page_count = total.div_ceil(size);
    let cur_page = page as usize + 1;
    debug!(page, size, total, "article page");
    ok(json!({
        "curPage": cur_page,
        "datas": datas,
        "offset": offset,
        "over": cur_page >= page_count,
        "pageCount": page_count,
        "size": size,
        "total": total,
    }))
}

async fn login(State(state): State<AppState>, Json(form): Json<LoginForm>) -> Json<Value> {
    if form.username.is_empty() || form.password != DEMO_PASSWORD {
        return fail(CODE_FAILED, "invalid username or password");
    }
    let token = Uuid::new_v4();
    state.sessions.write().await.insert(token, form.username.clone());
    info!(username = %form.username, "session issued");
    ok(json!({"token": token, "username": form.username}))
}

async fn user_info(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let sessions = state.sessions.read().await;
    match bearer_token(&headers).and_then(|token| sessions.get(&token)) {
        Some(username) => ok(json!({"username": username})),
        None => fail(CODE_UNAUTHORIZED, "please login first"),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.write().await.remove(&token);
    }
    ok(Value::Null)
}

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    let headers: HashMap<String, String> = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = if body.is_empty() { Value::Null } else { Value::String(body) };
    ok(json!({"method": method.as_str(), "headers": headers, "body": body}))
}

async fn bare_status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({})))
}

async fn business_error() -> Json<Value> {
    fail(CODE_FAILED, "something went wrong")
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_DELAY).await;
    ok(json!({"slept_ms": SLOW_DELAY.as_millis() as u64}))
}

async fn plain_text() -> &'static str {
    "plain text, not json"
}

fn seed_banners() -> Vec<Banner> {
    vec![
        Banner {
            id: 30,
            title: "Learning roadmap".to_string(),
            image_path: "https://example.com/banner/roadmap.png".to_string(),
            url: "https://example.com/roadmap".to_string(),
            order: 2,
            is_visible: 1,
        },
        Banner {
            id: 6,
            title: "Weekly picks".to_string(),
            image_path: "https://example.com/banner/weekly.png".to_string(),
            url: "https://example.com/weekly".to_string(),
            order: 1,
            is_visible: 1,
        },
    ]
}

fn seed_articles() -> Vec<Article> {
    (1..=5)
        .map(|id| Article {
            id,
            title: format!("Article {id}"),
            link: format!("https://example.com/articles/{id}"),
            author: if id % 2 == 0 { String::new() } else { "lin".to_string() },
            share_user: if id % 2 == 0 { "kim".to_string() } else { String::new() },
            chapter_name: "Rust".to_string(),
            publish_time: 1_700_000_000_000 + id as i64,
            fresh: id == 1,
        })
        .collect()
}

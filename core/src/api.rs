//! Typed access to the home feed.

use serde_json::Value;

use crate::error::ApiError;
use crate::provider::Provider;
use crate::request::RequestOptions;
use crate::types::{Article, Banner, PageData};

/// Backend paths, relative to the provider's base URL.
pub mod endpoints {
    pub const BANNER: &str = "/banner/json";
    pub const ARTICLE_TOP: &str = "/article/top/json";
    /// Followed by `/{page}/json`.
    pub const ARTICLE_LIST: &str = "/article/list";

    pub const PROJECT_TREE: &str = "/project/tree/json";
    /// Followed by `/{page}/json?cid={id}`.
    pub const PROJECT_LIST: &str = "/project/list";

    pub const KNOWLEDGE_TREE: &str = "/tree/json";

    pub const WXARTICLE_CHAPTERS: &str = "/wxarticle/chapters/json";
    /// Followed by `/{chapter}/{page}/json`, optionally `?k={keyword}`.
    pub const WXARTICLE_LIST: &str = "/wxarticle/list";

    pub const NAVIGATION: &str = "/navi/json";
    pub const TOOLS: &str = "/tools/list/json";

    pub const USER_LOGIN: &str = "/user/login";
    pub const USER_INFO: &str = "/user/info";
    pub const USER_LOGOUT: &str = "/user/logout";
}

pub const MIN_PAGE_SIZE: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 40;

/// Path for one page of the article feed. Pages start at 0; `page_size` is
/// clamped to the range the backend accepts.
pub fn article_list_path(page: u32, page_size: u32) -> String {
    let page_size = page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
    format!("{}/{page}/json?page_size={page_size}", endpoints::ARTICLE_LIST)
}

/// Home screen queries.
#[derive(Debug, Clone)]
pub struct HomeApi {
    provider: Provider,
}

impl HomeApi {
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    pub async fn banners(&self) -> Result<Vec<Banner>, ApiError> {
        self.provider.get(endpoints::BANNER, RequestOptions::new()).await
    }

    pub async fn top_articles(&self) -> Result<Vec<Article>, ApiError> {
        self.provider.get(endpoints::ARTICLE_TOP, RequestOptions::new()).await
    }

    pub async fn article_list(&self, page: u32, page_size: u32) -> Result<PageData<Article>, ApiError> {
        self.provider
            .get(&article_list_path(page, page_size), RequestOptions::new())
            .await
    }

    /// The signed-in user's profile. Needs a stored token.
    pub async fn user_info(&self) -> Result<Value, ApiError> {
        self.provider
            .get(endpoints::USER_INFO, RequestOptions::new().auth(true))
            .await
    }
}

//! DTOs for the home feed.
//!
//! # Design
//! Field names are camelCase on the wire. Everything except the id has a
//! default, because the backend omits fields freely and a missing cosmetic
//! field should not fail a whole page.

use serde::{Deserialize, Serialize};

/// A carousel banner on the home screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub is_visible: i32,
}

/// A tag attached to an article, e.g. its column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// One article in a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub share_user: String,
    #[serde(default)]
    pub chapter_name: String,
    #[serde(default)]
    pub super_chapter_name: String,
    #[serde(default)]
    pub nice_date: String,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub publish_time: i64,
    #[serde(default)]
    pub fresh: bool,
    #[serde(default)]
    pub collect: bool,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Article {
    /// Author name, falling back to the sharing user for shared links.
    pub fn display_author(&self) -> &str {
        if self.author.is_empty() {
            &self.share_user
        } else {
            &self.author
        }
    }
}

/// One page of a paginated list. `cur_page` is 1-based even though
/// requests address pages from 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData<T> {
    #[serde(default)]
    pub cur_page: u32,
    #[serde(default = "Vec::new")]
    pub datas: Vec<T>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub over: bool,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub total: u32,
}

impl<T> PageData<T> {
    /// Zero-based index of the page after this one, if any.
    pub fn next_page(&self) -> Option<u32> {
        if self.over {
            None
        } else {
            Some(self.cur_page)
        }
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::news::repo::{News, Period};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub period: Option<Period>,
    pub category: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationBlock {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub limit: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

#[derive(Debug, Serialize)]
pub struct AppliedFilters {
    pub period: Option<&'static str>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub news: Vec<News>,
    pub pagination: PaginationBlock,
    pub filters: AppliedFilters,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNewsRequest {
    pub title: String,
    pub summary: Option<String>,
    pub source: Option<String>,
    pub content: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub category_ids: Vec<i32>,
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::auth::jwt::AuthUser;
use crate::error::ApiError;
use crate::news::dto::{
    AppliedFilters, CreateNewsRequest, PaginationBlock, SearchQuery, SearchResponse,
};
use crate::news::repo::{NewNews, News, SearchParams};
use crate::news::services;
use crate::state::AppState;

const MAX_LIMIT: u32 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/news", get(search_news).post(create_news))
        .route("/news/:id", get(get_news_detail))
}

#[instrument(skip(state, _user))]
pub async fn search_news(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    if query.page < 1 {
        warn!(page = query.page, "page out of range");
        return Err(ApiError::Validation("page must be at least 1".into()));
    }
    if query.limit < 1 || query.limit > MAX_LIMIT {
        warn!(limit = query.limit, "limit out of range");
        return Err(ApiError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }

    let result = services::search_news(
        state.news.as_ref(),
        SearchParams {
            page: query.page,
            limit: query.limit,
            period: query.period,
            category: query.category,
        },
    )
    .await?;

    Ok(Json(SearchResponse {
        news: result.news,
        pagination: PaginationBlock {
            current_page: result.pagination.current_page,
            total_pages: result.pagination.total_pages,
            total_count: result.pagination.total_count,
            limit: result.pagination.limit,
            has_next_page: result.pagination.has_next_page,
            has_previous_page: result.pagination.has_previous_page,
        },
        filters: AppliedFilters {
            period: result.period.map(|p| p.as_str()),
            category: result.category,
        },
    }))
}

#[instrument(skip(state, _user))]
pub async fn get_news_detail(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<News>, ApiError> {
    let news = services::get_news_detail(state.news.as_ref(), id).await?;
    Ok(Json(news))
}

#[instrument(skip(state, _user, payload))]
pub async fn create_news(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<CreateNewsRequest>,
) -> Result<(StatusCode, Json<News>), ApiError> {
    let news = services::create_news(
        state.news.as_ref(),
        state.categories.as_ref(),
        NewNews {
            title: payload.title,
            summary: payload.summary,
            source: payload.source,
            content: payload.content,
            published_at: payload.published_at,
            category_ids: payload.category_ids,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(news)))
}

use std::collections::BTreeSet;

use tracing::info;

use crate::categories::repo::CategoriesRepo;
use crate::error::ApiError;
use crate::news::repo::{NewNews, News, NewsRepo, Period, SearchParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub limit: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    /// `total_pages = ceil(total_count / limit)`, zero when the filtered set
    /// is empty. An out-of-range page is not an error; it just has no items.
    pub fn compute(page: u32, limit: u32, total_count: u64) -> Self {
        let total_pages = (total_count.div_ceil(u64::from(limit))) as u32;
        Self {
            current_page: page,
            total_pages,
            total_count,
            limit,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        }
    }
}

pub struct SearchResult {
    pub news: Vec<News>,
    pub pagination: Pagination,
    pub period: Option<Period>,
    pub category: Option<String>,
}

pub async fn search_news(
    repo: &dyn NewsRepo,
    params: SearchParams,
) -> Result<SearchResult, ApiError> {
    let list = repo.search(&params).await?;
    let pagination = Pagination::compute(params.page, params.limit, list.total_count);
    Ok(SearchResult {
        news: list.items,
        pagination,
        period: params.period,
        category: params.category,
    })
}

pub async fn get_news_detail(repo: &dyn NewsRepo, id: i64) -> Result<News, ApiError> {
    repo.find_by_id(id).await?.ok_or(ApiError::NewsNotFound)
}

/// Ingestion. Category references are validated up front; a bad id rejects
/// the whole item. Repeated ids collapse before the store sees them.
pub async fn create_news(
    repo: &dyn NewsRepo,
    categories: &dyn CategoriesRepo,
    mut data: NewNews,
) -> Result<News, ApiError> {
    if data.title.trim().is_empty() {
        return Err(ApiError::Validation("Title cannot be empty".into()));
    }

    data.category_ids = data
        .category_ids
        .iter()
        .copied()
        .collect::<BTreeSet<i32>>()
        .into_iter()
        .collect();

    if !data.category_ids.is_empty() {
        let all = categories.find_all().await?;
        let invalid: Vec<i32> = data
            .category_ids
            .iter()
            .copied()
            .filter(|id| !all.iter().any(|c| c.id == *id))
            .collect();
        if !invalid.is_empty() {
            return Err(ApiError::InvalidCategoryIds(invalid));
        }
    }

    let news = repo.create(data).await?;
    info!(news_id = news.id, "news ingested");
    Ok(news)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::repo::{Category, InMemoryCategoriesRepo};
    use crate::news::repo::InMemoryNewsRepo;
    use std::sync::Arc;

    #[test]
    fn pagination_math_matches_ceiling_division() {
        let p = Pagination::compute(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
        assert!(!p.has_previous_page);

        let p = Pagination::compute(1, 10, 10);
        assert_eq!(p.total_pages, 1);
        assert!(!p.has_next_page);

        let p = Pagination::compute(1, 10, 11);
        assert_eq!(p.total_pages, 2);
        assert!(p.has_next_page);

        let p = Pagination::compute(2, 10, 11);
        assert_eq!(p.total_pages, 2);
        assert!(!p.has_next_page);
        assert!(p.has_previous_page);

        let p = Pagination::compute(5, 10, 11);
        assert!(!p.has_next_page);
        assert!(p.has_previous_page);
    }

    fn repos() -> (InMemoryNewsRepo, Arc<InMemoryCategoriesRepo>) {
        let categories = Arc::new(InMemoryCategoriesRepo::new());
        categories.seed(vec![
            Category {
                id: 1,
                name: "Technology".into(),
            },
            Category {
                id: 2,
                name: "Sports".into(),
            },
        ]);
        let news = InMemoryNewsRepo::new(Arc::clone(&categories));
        (news, categories)
    }

    fn draft(title: &str, category_ids: Vec<i32>) -> NewNews {
        NewNews {
            title: title.into(),
            summary: None,
            source: Some("wire".into()),
            content: "body".into(),
            published_at: None,
            category_ids,
        }
    }

    #[tokio::test]
    async fn create_attaches_categories_and_detail_finds_it() {
        let (news, categories) = repos();

        let created = create_news(&news, categories.as_ref(), draft("hello", vec![1]))
            .await
            .expect("create");
        assert_eq!(created.categories.len(), 1);
        assert_eq!(created.categories[0].name, "Technology");

        let found = get_news_detail(&news, created.id).await.expect("detail");
        assert_eq!(found.title, "hello");
    }

    #[tokio::test]
    async fn create_collapses_duplicate_category_ids() {
        let (news, categories) = repos();
        let created = create_news(&news, categories.as_ref(), draft("hello", vec![1, 1, 2]))
            .await
            .expect("create with duplicates");
        let ids: Vec<i32> = created.categories.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&1) && ids.contains(&2));
    }

    #[tokio::test]
    async fn create_rejects_unknown_category_ids() {
        let (news, categories) = repos();
        let err = create_news(&news, categories.as_ref(), draft("hello", vec![1, 42]))
            .await
            .unwrap_err();
        match err {
            ApiError::InvalidCategoryIds(ids) => assert_eq!(ids, vec![42]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_news_detail_is_not_found() {
        let (news, _) = repos();
        let err = get_news_detail(&news, 123).await.unwrap_err();
        assert!(matches!(err, ApiError::NewsNotFound));
    }

    #[tokio::test]
    async fn search_echoes_filters_and_computes_pagination() {
        let (news, categories) = repos();
        for i in 0..5 {
            create_news(&news, categories.as_ref(), draft(&format!("n{i}"), vec![1]))
                .await
                .expect("create");
        }

        let result = search_news(
            &news,
            SearchParams {
                page: 2,
                limit: 2,
                period: Some(Period::Day),
                category: Some("TECH".into()),
            },
        )
        .await
        .expect("search");

        assert_eq!(result.news.len(), 2);
        assert_eq!(result.pagination.total_count, 5);
        assert_eq!(result.pagination.total_pages, 3);
        assert!(result.pagination.has_next_page);
        assert!(result.pagination.has_previous_page);
        assert_eq!(result.period, Some(Period::Day));
        assert_eq!(result.category.as_deref(), Some("TECH"));
    }
}

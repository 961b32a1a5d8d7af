use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Mutex;
use time::{Duration, OffsetDateTime};

use crate::categories::repo::{CategoriesRepo, Category, InMemoryCategoriesRepo};

/// News item with its category tags. Immutable after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct News {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub source: Option<String>,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone)]
pub struct NewNews {
    pub title: String,
    pub summary: Option<String>,
    pub source: Option<String>,
    pub content: String,
    pub published_at: Option<OffsetDateTime>,
    pub category_ids: Vec<i32>,
}

/// Period filter. Rolling window: the threshold is `now` minus the window,
/// inclusive up to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    pub fn threshold(self, now: OffsetDateTime) -> OffsetDateTime {
        match self {
            Period::Day => now - Duration::hours(24),
            Period::Week => now - Duration::days(7),
            Period::Month => now - Duration::days(30),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub page: u32,
    pub limit: u32,
    pub period: Option<Period>,
    /// Case-insensitive substring match against category names.
    pub category: Option<String>,
}

#[derive(Debug)]
pub struct NewsList {
    pub items: Vec<News>,
    /// Size of the filtered set before pagination.
    pub total_count: u64,
}

#[async_trait]
pub trait NewsRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<News>>;
    async fn search(&self, params: &SearchParams) -> anyhow::Result<NewsList>;
    async fn create(&self, data: NewNews) -> anyhow::Result<News>;
}

#[derive(Debug, FromRow)]
struct NewsRow {
    id: i64,
    title: String,
    summary: Option<String>,
    source: Option<String>,
    content: String,
    published_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct NewsCategoryRow {
    news_id: i64,
    id: i32,
    name: String,
}

pub struct PgNewsRepo {
    db: PgPool,
}

impl PgNewsRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn categories_for(&self, news_ids: &[i64]) -> anyhow::Result<HashMap<i64, Vec<Category>>> {
        let rows = sqlx::query_as::<_, NewsCategoryRow>(
            r#"
            SELECT nc.news_id, c.id, c.name
            FROM news_categories nc
            JOIN categories c ON c.id = nc.category_id
            WHERE nc.news_id = ANY($1)
            ORDER BY c.name ASC
            "#,
        )
        .bind(news_ids)
        .fetch_all(&self.db)
        .await?;

        let mut by_news: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in rows {
            by_news.entry(row.news_id).or_default().push(Category {
                id: row.id,
                name: row.name,
            });
        }
        Ok(by_news)
    }

    fn assemble(rows: Vec<NewsRow>, mut by_news: HashMap<i64, Vec<Category>>) -> Vec<News> {
        rows.into_iter()
            .map(|row| News {
                id: row.id,
                title: row.title,
                summary: row.summary,
                source: row.source,
                content: row.content,
                published_at: row.published_at,
                categories: by_news.remove(&row.id).unwrap_or_default(),
            })
            .collect()
    }
}

#[async_trait]
impl NewsRepo for PgNewsRepo {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<News>> {
        let row = sqlx::query_as::<_, NewsRow>(
            r#"
            SELECT id, title, summary, source, content, published_at
            FROM news
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else { return Ok(None) };
        let by_news = self.categories_for(&[row.id]).await?;
        Ok(Self::assemble(vec![row], by_news).into_iter().next())
    }

    async fn search(&self, params: &SearchParams) -> anyhow::Result<NewsList> {
        let now = OffsetDateTime::now_utc();
        let threshold = params.period.map(|p| p.threshold(now));
        let category = params.category.as_deref();
        let offset = i64::from(params.page.saturating_sub(1)) * i64::from(params.limit);

        let filter = r#"
            WHERE ($1::timestamptz IS NULL OR (published_at >= $1 AND published_at <= $2))
              AND ($3::text IS NULL OR EXISTS (
                    SELECT 1
                    FROM news_categories nc
                    JOIN categories c ON c.id = nc.category_id
                    WHERE nc.news_id = news.id
                      AND c.name ILIKE '%' || $3 || '%'))
        "#;

        let rows = sqlx::query_as::<_, NewsRow>(&format!(
            r#"
            SELECT id, title, summary, source, content, published_at
            FROM news
            {filter}
            ORDER BY published_at DESC, id ASC
            LIMIT $4 OFFSET $5
            "#,
        ))
        .bind(threshold)
        .bind(now)
        .bind(category)
        .bind(i64::from(params.limit))
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let total_count: i64 =
            sqlx::query_scalar(&format!(r#"SELECT count(*) FROM news {filter}"#))
                .bind(threshold)
                .bind(now)
                .bind(category)
                .fetch_one(&self.db)
                .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let by_news = self.categories_for(&ids).await?;

        Ok(NewsList {
            items: Self::assemble(rows, by_news),
            total_count: total_count as u64,
        })
    }

    async fn create(&self, data: NewNews) -> anyhow::Result<News> {
        let mut tx = self.db.begin().await?;
        let row = sqlx::query_as::<_, NewsRow>(
            r#"
            INSERT INTO news (title, summary, source, content, published_at)
            VALUES ($1, $2, $3, $4, COALESCE($5, now()))
            RETURNING id, title, summary, source, content, published_at
            "#,
        )
        .bind(&data.title)
        .bind(&data.summary)
        .bind(&data.source)
        .bind(&data.content)
        .bind(data.published_at)
        .fetch_one(&mut *tx)
        .await?;

        if !data.category_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO news_categories (news_id, category_id)
                SELECT $1, unnest($2::int[])
                "#,
            )
            .bind(row.id)
            .bind(&data.category_ids)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        let by_news = self.categories_for(&[row.id]).await?;
        Self::assemble(vec![row], by_news)
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("inserted news row missing"))
    }
}

#[derive(Default)]
struct InMemoryNewsState {
    items: Vec<News>,
    next_id: i64,
}

/// In-memory implementation for tests. Mirrors the Postgres filtering
/// semantics exactly: rolling window, case-insensitive substring category
/// match, stable descending sort by publication time.
pub struct InMemoryNewsRepo {
    state: Mutex<InMemoryNewsState>,
    categories: std::sync::Arc<InMemoryCategoriesRepo>,
}

impl InMemoryNewsRepo {
    pub fn new(categories: std::sync::Arc<InMemoryCategoriesRepo>) -> Self {
        Self {
            state: Mutex::new(InMemoryNewsState::default()),
            categories,
        }
    }
}

#[async_trait]
impl NewsRepo for InMemoryNewsRepo {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<News>> {
        let state = self.state.lock().expect("news lock");
        Ok(state.items.iter().find(|n| n.id == id).cloned())
    }

    async fn search(&self, params: &SearchParams) -> anyhow::Result<NewsList> {
        let now = OffsetDateTime::now_utc();
        let threshold = params.period.map(|p| p.threshold(now));
        let needle = params.category.as_deref().map(str::to_lowercase);

        let mut filtered: Vec<News> = {
            let state = self.state.lock().expect("news lock");
            state
                .items
                .iter()
                .filter(|n| match threshold {
                    Some(t) => n.published_at >= t && n.published_at <= now,
                    None => true,
                })
                .filter(|n| match &needle {
                    Some(needle) => n
                        .categories
                        .iter()
                        .any(|c| c.name.to_lowercase().contains(needle)),
                    None => true,
                })
                .cloned()
                .collect()
        };

        // sort_by is stable, so ties keep arrival order.
        filtered.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        let total_count = filtered.len() as u64;
        let offset = (params.page.saturating_sub(1) as usize) * params.limit as usize;
        let items: Vec<News> = filtered
            .into_iter()
            .skip(offset)
            .take(params.limit as usize)
            .collect();

        Ok(NewsList { items, total_count })
    }

    async fn create(&self, data: NewNews) -> anyhow::Result<News> {
        let categories = self.categories.find_by_ids(&data.category_ids).await?;
        let mut state = self.state.lock().expect("news lock");
        state.next_id += 1;
        let news = News {
            id: state.next_id,
            title: data.title,
            summary: data.summary,
            source: data.source,
            content: data.content,
            published_at: data.published_at.unwrap_or_else(OffsetDateTime::now_utc),
            categories,
        };
        state.items.push(news.clone());
        Ok(news)
    }
}

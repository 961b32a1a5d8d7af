use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::sync::Mutex;

/// Category tag. `id` is the authoritative key; `name` rides along for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i32,
    pub name: String,
}

#[async_trait]
pub trait CategoriesRepo: Send + Sync {
    /// All categories, ordered by name ascending.
    async fn find_all(&self) -> anyhow::Result<Vec<Category>>;
    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Category>>;
    async fn find_by_ids(&self, ids: &[i32]) -> anyhow::Result<Vec<Category>>;
}

pub struct PgCategoriesRepo {
    db: PgPool,
}

impl PgCategoriesRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoriesRepo for PgCategoriesRepo {
    async fn find_all(&self) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name
            FROM categories
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_ids(&self, ids: &[i32]) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name
            FROM categories
            WHERE id = ANY($1)
            ORDER BY name ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

/// In-memory implementation used by tests and offline runs.
#[derive(Default)]
pub struct InMemoryCategoriesRepo {
    items: Mutex<Vec<Category>>,
}

impl InMemoryCategoriesRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, categories: Vec<Category>) {
        let mut items = self.items.lock().expect("categories lock");
        *items = categories;
    }
}

#[async_trait]
impl CategoriesRepo for InMemoryCategoriesRepo {
    async fn find_all(&self) -> anyhow::Result<Vec<Category>> {
        let mut all = self.items.lock().expect("categories lock").clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn find_by_id(&self, id: i32) -> anyhow::Result<Option<Category>> {
        let items = self.items.lock().expect("categories lock");
        Ok(items.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i32]) -> anyhow::Result<Vec<Category>> {
        let items = self.items.lock().expect("categories lock");
        let mut found: Vec<Category> = items
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }
}

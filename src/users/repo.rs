use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::categories::repo::{CategoriesRepo, Category, InMemoryCategoriesRepo};

/// User record. The hash never serializes; public DTOs omit it entirely.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    /// Lookup by email. Callers pass the already-lowercased form; the store
    /// lowercases again on its side so both halves agree.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, data: NewUser) -> anyhow::Result<User>;
    /// Current preference set, name ascending. Unknown users yield an empty
    /// list, not an error.
    async fn preferences(&self, user_id: Uuid) -> anyhow::Result<Vec<Category>>;
    /// Full replacement of the preference association set, atomic.
    async fn replace_preferences(&self, user_id: Uuid, category_ids: &[i32])
        -> anyhow::Result<()>;
    async fn update_name(&self, user_id: Uuid, name: &str) -> anyhow::Result<()>;
}

pub struct PgUsersRepo {
    db: PgPool,
}

impl PgUsersRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsersRepo for PgUsersRepo {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE email = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, data: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, password_hash)
            VALUES (lower($1), $2, $3)
            RETURNING id, email, name, password_hash, created_at
            "#,
        )
        .bind(&data.email)
        .bind(&data.name)
        .bind(&data.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn preferences(&self, user_id: Uuid) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.name
            FROM user_preferences up
            JOIN categories c ON c.id = up.category_id
            WHERE up.user_id = $1
            ORDER BY c.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn replace_preferences(
        &self,
        user_id: Uuid,
        category_ids: &[i32],
    ) -> anyhow::Result<()> {
        // One transaction so concurrent readers never observe the empty
        // window between delete and insert.
        let mut tx = self.db.begin().await?;
        sqlx::query(r#"DELETE FROM user_preferences WHERE user_id = $1"#)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, category_id)
            SELECT $1, unnest($2::int[])
            "#,
        )
        .bind(user_id)
        .bind(category_ids)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update_name(&self, user_id: Uuid, name: &str) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET name = $2 WHERE id = $1"#)
            .bind(user_id)
            .bind(name)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryUsersState {
    items: Vec<User>,
    preferences: HashMap<Uuid, Vec<i32>>,
}

/// In-memory implementation used by tests. Preferences resolve against the
/// shared in-memory categories store so names stay consistent.
pub struct InMemoryUsersRepo {
    state: Mutex<InMemoryUsersState>,
    categories: Arc<InMemoryCategoriesRepo>,
}

impl InMemoryUsersRepo {
    pub fn new(categories: Arc<InMemoryCategoriesRepo>) -> Self {
        Self {
            state: Mutex::new(InMemoryUsersState::default()),
            categories,
        }
    }
}

#[async_trait]
impl UsersRepo for InMemoryUsersRepo {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let state = self.state.lock().expect("users lock");
        Ok(state
            .items
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let state = self.state.lock().expect("users lock");
        Ok(state.items.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, data: NewUser) -> anyhow::Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            email: data.email.to_lowercase(),
            name: data.name,
            password_hash: data.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        let mut state = self.state.lock().expect("users lock");
        state.items.push(user.clone());
        Ok(user)
    }

    async fn preferences(&self, user_id: Uuid) -> anyhow::Result<Vec<Category>> {
        let ids = {
            let state = self.state.lock().expect("users lock");
            state.preferences.get(&user_id).cloned().unwrap_or_default()
        };
        self.categories.find_by_ids(&ids).await
    }

    async fn replace_preferences(
        &self,
        user_id: Uuid,
        category_ids: &[i32],
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("users lock");
        state.preferences.insert(user_id, category_ids.to_vec());
        Ok(())
    }

    async fn update_name(&self, user_id: Uuid, name: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock().expect("users lock");
        if let Some(user) = state.items.iter_mut().find(|u| u.id == user_id) {
            user.name = name.to_string();
        }
        Ok(())
    }
}

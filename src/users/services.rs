use std::collections::BTreeSet;

use tracing::info;
use uuid::Uuid;

use crate::categories::repo::{CategoriesRepo, Category};
use crate::error::ApiError;
use crate::users::repo::{User, UsersRepo};

#[derive(Debug)]
pub struct Profile {
    pub user: User,
    pub preferences: Vec<Category>,
}

pub async fn get_profile(users: &dyn UsersRepo, user_id: Uuid) -> Result<Profile, ApiError> {
    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    let preferences = users.preferences(user_id).await?;
    Ok(Profile { user, preferences })
}

/// Trims the new name and persists it, then returns the refreshed profile.
pub async fn update_profile(
    users: &dyn UsersRepo,
    user_id: Uuid,
    name: &str,
) -> Result<Profile, ApiError> {
    if users.find_by_id(user_id).await?.is_none() {
        return Err(ApiError::UserNotFound);
    }

    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::EmptyName);
    }

    users.update_name(user_id, trimmed).await?;
    info!(user_id = %user_id, "profile name updated");

    get_profile(users, user_id).await
}

pub struct PreferenceList {
    pub preferences: Vec<Category>,
    pub total_count: usize,
}

/// Lenient read: an unknown user id yields an empty list, never an error.
pub async fn get_preferences(
    users: &dyn UsersRepo,
    user_id: Uuid,
) -> Result<PreferenceList, ApiError> {
    let preferences = users.preferences(user_id).await?;
    let total_count = preferences.len();
    Ok(PreferenceList {
        preferences,
        total_count,
    })
}

/// Replaces the user's preference set with exactly `category_ids`.
/// All-or-nothing: one unknown id rejects the whole update. Repeated ids
/// collapse to one membership; the stores only ever see a unique set.
pub async fn update_preferences(
    users: &dyn UsersRepo,
    categories: &dyn CategoriesRepo,
    user_id: Uuid,
    category_ids: &[i32],
) -> Result<usize, ApiError> {
    if users.find_by_id(user_id).await?.is_none() {
        return Err(ApiError::UserNotFound);
    }

    let unique_ids: Vec<i32> = category_ids
        .iter()
        .copied()
        .collect::<BTreeSet<i32>>()
        .into_iter()
        .collect();

    let all = categories.find_all().await?;
    let invalid: Vec<i32> = unique_ids
        .iter()
        .copied()
        .filter(|id| !all.iter().any(|c| c.id == *id))
        .collect();
    if !invalid.is_empty() {
        return Err(ApiError::InvalidCategoryIds(invalid));
    }

    users.replace_preferences(user_id, &unique_ids).await?;
    info!(user_id = %user_id, count = unique_ids.len(), "preferences replaced");
    Ok(unique_ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::repo::InMemoryCategoriesRepo;
    use crate::users::repo::{InMemoryUsersRepo, NewUser};
    use std::sync::Arc;

    fn cat(id: i32, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
        }
    }

    fn repos() -> (InMemoryUsersRepo, Arc<InMemoryCategoriesRepo>) {
        let categories = Arc::new(InMemoryCategoriesRepo::new());
        categories.seed(vec![
            cat(1, "Technology"),
            cat(2, "Sports"),
            cat(3, "Business"),
        ]);
        let users = InMemoryUsersRepo::new(Arc::clone(&categories));
        (users, categories)
    }

    async fn make_user(users: &InMemoryUsersRepo) -> Uuid {
        users
            .create(NewUser {
                email: "a@x.com".into(),
                name: "A".into(),
                password_hash: "hash".into(),
            })
            .await
            .expect("create user")
            .id
    }

    #[tokio::test]
    async fn preferences_replace_is_exact_and_sorted_by_name() {
        let (users, categories) = repos();
        let user_id = make_user(&users).await;

        update_preferences(&users, categories.as_ref(), user_id, &[1, 2])
            .await
            .expect("update preferences");

        let result = get_preferences(&users, user_id).await.expect("get");
        assert_eq!(result.total_count, 2);
        let names: Vec<&str> = result.preferences.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Sports", "Technology"]);
    }

    #[tokio::test]
    async fn invalid_category_id_rejects_whole_update() {
        let (users, categories) = repos();
        let user_id = make_user(&users).await;

        update_preferences(&users, categories.as_ref(), user_id, &[1, 2])
            .await
            .expect("initial update");

        let err = update_preferences(&users, categories.as_ref(), user_id, &[2, 999])
            .await
            .unwrap_err();
        match err {
            ApiError::InvalidCategoryIds(ids) => assert_eq!(ids, vec![999]),
            other => panic!("unexpected error: {other:?}"),
        }

        // Prior preferences are untouched.
        let result = get_preferences(&users, user_id).await.expect("get");
        let ids: Vec<i32> = result.preferences.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]); // Sports, Technology by name
    }

    #[tokio::test]
    async fn duplicate_ids_collapse_to_one_membership() {
        let (users, categories) = repos();
        let user_id = make_user(&users).await;

        let updated = update_preferences(&users, categories.as_ref(), user_id, &[1, 1, 2])
            .await
            .expect("update with duplicates");
        assert_eq!(updated, 2);

        let result = get_preferences(&users, user_id).await.expect("get");
        assert_eq!(result.total_count, 2);
        let ids: Vec<i32> = result.preferences.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]); // Sports, Technology by name
    }

    #[tokio::test]
    async fn empty_set_clears_preferences() {
        let (users, categories) = repos();
        let user_id = make_user(&users).await;

        update_preferences(&users, categories.as_ref(), user_id, &[1, 2, 3])
            .await
            .expect("set");
        update_preferences(&users, categories.as_ref(), user_id, &[])
            .await
            .expect("clear");

        let result = get_preferences(&users, user_id).await.expect("get");
        assert!(result.preferences.is_empty());
    }

    #[tokio::test]
    async fn unknown_user_update_fails_but_read_is_lenient() {
        let (users, categories) = repos();
        let ghost = Uuid::new_v4();

        let err = update_preferences(&users, categories.as_ref(), ghost, &[1])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::UserNotFound));

        let result = get_preferences(&users, ghost).await.expect("lenient read");
        assert!(result.preferences.is_empty());
    }

    #[tokio::test]
    async fn profile_update_trims_name() {
        let (users, _) = repos();
        let user_id = make_user(&users).await;

        let profile = update_profile(&users, user_id, "  Foo  ")
            .await
            .expect("update profile");
        assert_eq!(profile.user.name, "Foo");
    }

    #[tokio::test]
    async fn whitespace_only_name_is_rejected() {
        let (users, _) = repos();
        let user_id = make_user(&users).await;

        let err = update_profile(&users, user_id, "   ").await.unwrap_err();
        assert!(matches!(err, ApiError::EmptyName));

        // Name unchanged.
        let profile = get_profile(&users, user_id).await.expect("get profile");
        assert_eq!(profile.user.name, "A");
    }

    #[tokio::test]
    async fn register_login_profile_preferences_flow() {
        use crate::auth::jwt::JwtKeys;
        use crate::auth::services as auth;
        use jsonwebtoken::{DecodingKey, EncodingKey};
        use std::time::Duration;

        let (users, categories) = repos();
        let secret = b"flow-secret";
        let keys = JwtKeys {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            access_ttl: Duration::from_secs(7200),
            refresh_ttl: Duration::from_secs(604800),
        };

        auth::register(&users, &keys, "a@x.com", "Alice", "pw123456")
            .await
            .expect("register");
        let login = auth::authenticate(&users, &keys, "a@x.com", "pw123456")
            .await
            .expect("login");
        let user_id = keys.verify(&login.access_token).expect("verify").sub;

        let profile = get_profile(&users, user_id).await.expect("profile");
        assert_eq!(profile.user.email, "a@x.com");
        assert_eq!(profile.user.name, "Alice");
        assert!(profile.preferences.is_empty());

        update_preferences(&users, categories.as_ref(), user_id, &[1, 2])
            .await
            .expect("set preferences");
        let prefs = get_preferences(&users, user_id).await.expect("get");
        let ids: Vec<i32> = prefs.preferences.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 1]); // Sports before Technology by name

        let err = update_preferences(&users, categories.as_ref(), user_id, &[999])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCategoryIds(_)));
        let prefs = get_preferences(&users, user_id).await.expect("get again");
        assert_eq!(prefs.total_count, 2);
    }

    #[tokio::test]
    async fn profile_of_unknown_user_is_not_found() {
        let (users, _) = repos();
        let err = get_profile(&users, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::UserNotFound));
    }
}

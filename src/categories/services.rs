use crate::categories::repo::{CategoriesRepo, Category};
use crate::error::ApiError;

pub struct CategoryList {
    pub categories: Vec<Category>,
    pub total_count: usize,
}

/// Pure read: all categories, name ascending, plus a count.
pub async fn list_categories(repo: &dyn CategoriesRepo) -> Result<CategoryList, ApiError> {
    let categories = repo.find_all().await?;
    let total_count = categories.len();
    Ok(CategoryList {
        categories,
        total_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::repo::InMemoryCategoriesRepo;

    fn cat(id: i32, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn lists_categories_sorted_by_name() {
        let repo = InMemoryCategoriesRepo::new();
        repo.seed(vec![cat(1, "Technology"), cat(2, "Business"), cat(3, "Sports")]);

        let result = list_categories(&repo).await.expect("list categories");
        assert_eq!(result.total_count, 3);
        let names: Vec<&str> = result.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Business", "Sports", "Technology"]);
    }

    #[tokio::test]
    async fn empty_store_yields_empty_list() {
        let repo = InMemoryCategoriesRepo::new();
        let result = list_categories(&repo).await.expect("list categories");
        assert_eq!(result.total_count, 0);
        assert!(result.categories.is_empty());
    }
}

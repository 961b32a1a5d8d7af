use serde::Serialize;

use crate::categories::repo::Category;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
    pub total_count: usize,
}

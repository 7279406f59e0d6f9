//! Catalogue products.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
}

impl Product {
    /// Price is rendered with six decimals
    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO products (name, description, price, category) VALUES ('{}', '{}', {:.6}, '{}')",
            self.name, self.description, self.price, self.category
        )
    }

    /// `id` is the raw path segment, spliced in unquoted
    pub fn update_sql(&self, id: &str) -> String {
        format!(
            "UPDATE products SET name='{}', description='{}', price={:.6}, category='{}' WHERE id={}",
            self.name, self.description, self.price, self.category, id
        )
    }
}

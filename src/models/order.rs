//! Orders and the XML import format.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{MonorepoError, Result};

/// Order as posted to and returned by the orders service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub total_price: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Mark as a fresh pending order created now
    pub fn into_pending(mut self) -> Self {
        self.status = "pending".into();
        self.created_at = Utc::now();
        self
    }

    /// Insert statement embedding the user and product snapshots verbatim
    pub fn insert_sql(&self, user_snapshot: &str, product_snapshot: &str) -> String {
        format!(
            "INSERT INTO orders (user_id, product_id, quantity, total_price, status, created_at, user_snapshot, product_snapshot) \
             VALUES ({}, {}, {}, {:.6}, '{}', '{}', '{}', '{}')",
            self.user_id,
            self.product_id,
            self.quantity,
            self.total_price,
            self.status,
            self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            user_snapshot,
            product_snapshot
        )
    }
}

/// Body of `PUT /orders/:id/status`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrderStatusUpdate {
    pub status: String,
}

impl OrderStatusUpdate {
    pub fn update_sql(&self, id: &str) -> String {
        format!("UPDATE orders SET status = '{}' WHERE id = {}", self.status, id)
    }
}

/// `<order>` document accepted by the bulk import endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "order", default)]
pub struct XmlOrder {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub total_price: f64,
}

impl XmlOrder {
    pub fn parse(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml).map_err(MonorepoError::xml)
    }

    pub fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO orders (user_id, product_id, quantity, total_price, status) \
             VALUES ({}, {}, {}, {:.6}, 'pending')",
            self.user_id, self.product_id, self.quantity, self.total_price
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_insert_sql_embeds_snapshots() {
        let order = Order {
            user_id: 1,
            product_id: 2,
            quantity: 3,
            total_price: 29.97,
            status: "pending".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            ..Order::default()
        };

        let sql = order.insert_sql(r#"{"id":1}"#, "{}");
        assert_eq!(
            sql,
            "INSERT INTO orders (user_id, product_id, quantity, total_price, status, created_at, user_snapshot, product_snapshot) \
             VALUES (1, 2, 3, 29.970000, 'pending', '2024-05-01T12:00:00Z', '{\"id\":1}', '{}')"
        );
    }

    #[test]
    fn test_into_pending() {
        let order = Order {
            status: "shipped".into(),
            ..Order::default()
        }
        .into_pending();
        assert_eq!(order.status, "pending");
        assert!(order.created_at > DateTime::<Utc>::default());
    }

    #[test]
    fn test_status_update_sql() {
        let update = OrderStatusUpdate {
            status: "shipped".into(),
        };
        assert_eq!(
            update.update_sql("7"),
            "UPDATE orders SET status = 'shipped' WHERE id = 7"
        );
    }

    #[test]
    fn test_parse_xml_order() {
        let order = XmlOrder::parse(
            "<order><user_id>4</user_id><product_id>9</product_id>\
             <quantity>2</quantity><total_price>19.5</total_price></order>",
        )
        .unwrap();

        assert_eq!(order.user_id, 4);
        assert_eq!(order.product_id, 9);
        assert_eq!(order.quantity, 2);
        assert_eq!(order.total_price, 19.5);
        assert!(order.insert_sql().ends_with("VALUES (4, 9, 2, 19.500000, 'pending')"));
    }

    #[test]
    fn test_parse_xml_rejects_non_numeric_fields() {
        let result = XmlOrder::parse("<order><user_id>abc</user_id></order>");
        assert!(matches!(result, Err(MonorepoError::Xml(_))));
    }
}

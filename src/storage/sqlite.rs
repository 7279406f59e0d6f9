//! In-memory SQLite implementation of the Store trait.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

use crate::config::DatabaseSettings;
use crate::models::User;
use crate::utils::hash_password;
use crate::Result;

use super::schema::{is_select, EMBEDDED_SCHEMA};
use super::{Row, Store};

/// Every parse of this URL names a distinct private in-memory database
const MEMORY_URL: &str = "sqlite::memory:";

/// Email of the user returned when a username lookup matches nothing
pub const PLACEHOLDER_EMAIL: &str = "user@example.com";

/// MD5 of "password123", untagged
pub const PLACEHOLDER_PASSWORD_HASH: &str = "482c811da5d5b4bc6d497ffa98491e38";

/// SQLite-backed store living for the lifetime of the process
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open a fresh store, apply the schema and run the auto-seed step.
    #[instrument(skip_all)]
    pub async fn open(settings: &DatabaseSettings) -> Result<Self> {
        info!("Opening in-memory SQLite store");

        // The data lives only as long as this one connection does.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(MEMORY_URL)
            .await?;

        let store = Self { pool };

        if let Err(e) = store.bootstrap(settings).await {
            store.pool.close().await;
            return Err(e);
        }

        Ok(store)
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    async fn bootstrap(&self, settings: &DatabaseSettings) -> Result<()> {
        let schema = match tokio::fs::read_to_string(&settings.schema_file).await {
            Ok(schema) => schema,
            Err(e) => {
                warn!(
                    "Schema file {} unreadable ({}), using embedded schema",
                    settings.schema_file.display(),
                    e
                );
                EMBEDDED_SCHEMA.to_string()
            }
        };

        sqlx::query(&schema)
            .persistent(false)
            .execute(&self.pool)
            .await?;
        debug!("Schema applied");

        self.auto_seed(settings).await
    }

    /// Seed from `settings.seed_file` when the auto-seed flag is truthy
    pub async fn auto_seed(&self, settings: &DatabaseSettings) -> Result<()> {
        if !settings.auto_seed_enabled() {
            debug!("Auto-seed disabled");
            return Ok(());
        }
        self.seed_from_file(&settings.seed_file).await
    }

    /// Execute a whole SQL file as one multi-statement batch.
    ///
    /// Seed files are raw INSERTs; running one twice can violate unique keys.
    pub async fn seed_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Seeding store from {}", path.display());

        let sql = tokio::fs::read_to_string(path).await?;
        let result = sqlx::query(&sql)
            .persistent(false)
            .execute(&self.pool)
            .await?;

        debug!("Seed inserted {} rows", result.rows_affected());
        Ok(())
    }

    /// Insert a user with a tagged MD5 hash of `plain_password`
    pub async fn seed_user(&self, username: &str, email: &str, plain_password: &str) -> Result<()> {
        let hashed = hash_password(plain_password);
        if let Err(e) = self.create_user(username, email, &hashed).await {
            error!("Seed user error: {}", e);
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>> {
        info!("Executing query: {}", sql);

        if !is_select(sql) {
            sqlx::query(sql)
                .persistent(false)
                .execute(&self.pool)
                .await?;
            return Ok(Vec::new());
        }

        let rows = sqlx::query(sql)
            .persistent(false)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Row::from_sqlite).collect()
    }

    async fn create_user(&self, username: &str, email: &str, password: &str) -> Result<()> {
        let query = format!(
            "INSERT INTO users (username, email, password) VALUES ('{}', '{}', '{}')",
            username, email, password
        );
        self.execute_query(&query).await?;
        Ok(())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User> {
        let query = format!(
            "SELECT id, username, email, password FROM users WHERE username = '{}'",
            username
        );
        let rows = self.execute_query(&query).await?;

        match rows.first() {
            Some(row) => User::try_from_row(row),
            None => Ok(User {
                id: 1,
                username: username.to_string(),
                email: PLACEHOLDER_EMAIL.to_string(),
                password: PLACEHOLDER_PASSWORD_HASH.to_string(),
            }),
        }
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Value;
    use crate::MonorepoError;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn sql_file(contents: &str) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file
    }

    fn embedded_only() -> DatabaseSettings {
        DatabaseSettings::default().with_schema_file("/nonexistent/schema.sql")
    }

    async fn count(store: &SqliteStore, table: &str) -> i64 {
        let rows = store
            .execute_query(&format!("SELECT COUNT(*) AS n FROM {}", table))
            .await
            .unwrap();
        rows[0].get("n").and_then(Value::as_i64).unwrap()
    }

    #[tokio::test]
    async fn test_open_falls_back_to_embedded_schema() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();

        let rows = store
            .execute_query("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .await
            .unwrap();
        let tables: Vec<_> = rows
            .iter()
            .filter_map(|r| r.get("name").map(Value::to_string))
            .collect();

        for table in ["orders", "products", "users"] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_open_loads_schema_file() {
        let schema = sql_file("CREATE TABLE IF NOT EXISTS custom_table (id INTEGER PRIMARY KEY);");
        let settings = DatabaseSettings::default().with_schema_file(schema.path());

        let store = SqliteStore::open(&settings).await.unwrap();
        let rows = store
            .execute_query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name='custom_table'",
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let users = store.execute_query("SELECT * FROM users").await;
        assert!(users.is_err(), "file schema replaces the embedded one");
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let schema = sql_file(EMBEDDED_SCHEMA);
        let settings = DatabaseSettings::default().with_schema_file(schema.path());

        for _ in 0..2 {
            let store = SqliteStore::open(&settings).await.unwrap();
            store.execute_query(EMBEDDED_SCHEMA).await.unwrap();
            assert_eq!(count(&store, "users").await, 0);
        }
    }

    #[tokio::test]
    async fn test_invalid_schema_fails_open() {
        let schema = sql_file("CREATE TABLE broken (");
        let settings = DatabaseSettings::default().with_schema_file(schema.path());

        let result = SqliteStore::open(&settings).await;
        assert!(matches!(result, Err(MonorepoError::Database(_))));
    }

    #[tokio::test]
    async fn test_seed_from_file_inserts_every_row() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        let seed = sql_file(
            "INSERT INTO users (username, email, password) VALUES ('seed_a','a@test','md5:a');\n\
             INSERT INTO users (username, email, password) VALUES ('seed_b','b@test','md5:b');\n\
             INSERT INTO products (name, description, price, category) VALUES ('p','d',1.23,'c');",
        );

        store.seed_from_file(seed.path()).await.unwrap();

        assert_eq!(count(&store, "users").await, 2);
        assert_eq!(count(&store, "products").await, 1);
    }

    #[tokio::test]
    async fn test_seed_twice_violates_unique_username() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        let seed =
            sql_file("INSERT INTO users (username, email, password) VALUES ('dup','d@test','x');");

        store.seed_from_file(seed.path()).await.unwrap();
        let second = store.seed_from_file(seed.path()).await;

        assert!(matches!(second, Err(MonorepoError::Database(_))));
        assert_eq!(count(&store, "users").await, 1);
    }

    #[tokio::test]
    async fn test_seed_from_missing_file_is_io_error() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        let result = store.seed_from_file("/nonexistent/seed.sql").await;
        assert!(matches!(result, Err(MonorepoError::Io(_))));
    }

    #[tokio::test]
    async fn test_auto_seed_only_for_truthy_flags() {
        let seed = sql_file(
            "INSERT INTO products (name, description, price, category) \
             VALUES ('auto_seed_prod','auto','1.23','auto');",
        );

        let cases = [
            ("1", 1),
            ("true", 1),
            ("TRUE", 1),
            ("", 0),
            ("0", 0),
            ("false", 0),
            ("garbage", 0),
        ];

        for (flag, expected) in cases {
            let settings = embedded_only()
                .with_seed_file(seed.path())
                .with_auto_seed(flag);
            let store = SqliteStore::open(&settings).await.unwrap();
            assert_eq!(count(&store, "products").await, expected, "flag {flag:?}");
        }
    }

    #[tokio::test]
    async fn test_auto_seed_with_missing_file_fails_open() {
        let settings = embedded_only()
            .with_seed_file("/nonexistent/seed.sql")
            .with_auto_seed("1");
        assert!(matches!(
            SqliteStore::open(&settings).await,
            Err(MonorepoError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_select_returns_typed_rows_in_column_order() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        store
            .execute_query(
                "INSERT INTO products (name, description, price, category) \
                 VALUES ('Widget', NULL, 9.5, 'tools')",
            )
            .await
            .unwrap();

        let rows = store.execute_query("SELECT * FROM products").await.unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(
            row.columns().collect::<Vec<_>>(),
            ["id", "name", "description", "price", "category"]
        );
        assert_eq!(row.get("id"), Some(&Value::Integer(1)));
        assert_eq!(row.get("name"), Some(&Value::Text("Widget".into())));
        assert_eq!(row.get("description"), Some(&Value::Null));
        assert_eq!(row.get("price"), Some(&Value::Real(9.5)));
    }

    #[tokio::test]
    async fn test_select_dispatch_is_case_insensitive() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();

        let rows = store.execute_query("  select 1 AS one").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("one"), Some(&Value::Integer(1)));

        let empty = store
            .execute_query("SELECT * FROM users WHERE 1=0")
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_writes_return_no_rows() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();

        let rows = store
            .execute_query("INSERT INTO orders (user_id, product_id, quantity) VALUES (1, 2, 3)")
            .await
            .unwrap();
        assert!(rows.is_empty());

        let rows = store
            .execute_query("UPDATE orders SET status = 'shipped'")
            .await
            .unwrap();
        assert!(rows.is_empty());

        let broken = store.execute_query("DELETE FORM orders").await;
        assert!(matches!(broken, Err(MonorepoError::Database(_))));
    }

    #[tokio::test]
    async fn test_create_then_select_alice() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        store
            .create_user("alice", "alice@example.com", "hash:abc")
            .await
            .unwrap();

        let rows = store
            .execute_query("SELECT id, username, email FROM users WHERE username = 'alice'")
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("username"), Some(&Value::Text("alice".into())));
        assert_eq!(rows[0].get("email"), Some(&Value::Text("alice@example.com".into())));
    }

    #[tokio::test]
    async fn test_tautology_returns_every_user() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        store.create_user("alice", "alice@example.com", "h1").await.unwrap();
        store.create_user("bob", "bob@example.com", "h2").await.unwrap();

        let rows = store
            .execute_query("SELECT * FROM users WHERE username = 'x' OR '1'='1'")
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        store.create_user("alice", "a@example.com", "h").await.unwrap();
        let again = store.create_user("alice", "other@example.com", "h").await;
        assert!(matches!(again, Err(MonorepoError::Database(_))));
    }

    #[tokio::test]
    async fn test_get_user_by_username_found() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        store.seed_user("carol", "carol@example.com", "secret").await.unwrap();

        let user = store.get_user_by_username("carol").await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.username, "carol");
        assert_eq!(user.email, "carol@example.com");
        assert_eq!(user.password, hash_password("secret"));
    }

    #[tokio::test]
    async fn test_get_user_by_username_unknown_returns_placeholder() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();

        let user = store.get_user_by_username("nobody").await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.username, "nobody");
        assert_eq!(user.email, PLACEHOLDER_EMAIL);
        assert_eq!(user.password, PLACEHOLDER_PASSWORD_HASH);
    }

    #[tokio::test]
    async fn test_get_user_by_username_is_injectable() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        store.create_user("admin", "admin@example.com", "stored").await.unwrap();

        let user = store.get_user_by_username("nobody' OR '1'='1").await.unwrap();
        assert_eq!(user.username, "admin");
        assert_eq!(user.password, "stored");
    }

    #[tokio::test]
    async fn test_get_user_by_username_null_columns_error() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        store
            .execute_query("INSERT INTO users (username) VALUES ('n')")
            .await
            .unwrap();

        let result = store.get_user_by_username("n").await;
        assert!(matches!(
            result,
            Err(MonorepoError::Database(sqlx::Error::ColumnDecode { .. }))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_create_user_serialises_on_one_connection() {
        let store = Arc::new(SqliteStore::open(&embedded_only()).await.unwrap());

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .create_user(&format!("user{i}"), &format!("user{i}@example.com"), "h")
                        .await
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(count(&store, "users").await, 50);
    }

    #[tokio::test]
    async fn test_stores_are_isolated() {
        let first = SqliteStore::open(&embedded_only()).await.unwrap();
        let second = SqliteStore::open(&embedded_only()).await.unwrap();

        first.create_user("only_here", "x@example.com", "h").await.unwrap();

        assert_eq!(count(&first, "users").await, 1);
        assert_eq!(count(&second, "users").await, 0);
    }

    #[tokio::test]
    async fn test_close_releases_pool() {
        let store = SqliteStore::open(&embedded_only()).await.unwrap();
        store.close().await.unwrap();
        store.close().await.unwrap();

        assert!(store.is_closed());
        assert!(store.execute_query("SELECT 1").await.is_err());
    }
}

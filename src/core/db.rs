// database connection, schema introspection and statement execution
// mysql is the main target; postgres and sqlite still work through sqlx's any driver

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::Executor as _;
use sqlx::{AnyPool, Column, Row, any::AnyPoolOptions};

use super::pipeline::{Executor, SchemaSource};
use super::safety::QueryType;
use crate::Error;

pub struct Db {
    pool: AnyPool,
    dialect: Dialect,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub field: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Outcome of running one statement.
#[derive(Debug, Clone)]
pub enum Execution {
    Rows(QueryResult),
    Affected {
        query_type: QueryType,
        affected_rows: u64,
    },
}

#[derive(Debug, Clone, Copy)]
enum Dialect {
    Postgres,
    Sqlite,
    Mysql,
}

fn pool_options() -> AnyPoolOptions {
    AnyPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
}

impl Db {
    pub async fn connect(url: &str) -> Result<Self, Error> {
        sqlx::any::install_default_drivers();

        let dialect = detect_dialect(url);
        let pool = pool_options().connect(url).await?;

        tracing::info!(dialect = ?dialect, "connected to database");
        Ok(Self { pool, dialect })
    }

    /// Build the pool without opening a connection. Only a malformed url
    /// fails here; an unreachable server shows up later through `ping`.
    pub fn connect_lazy(url: &str) -> Result<Self, Error> {
        sqlx::any::install_default_drivers();

        let dialect = detect_dialect(url);
        let pool = pool_options().connect_lazy(url)?;

        tracing::info!(dialect = ?dialect, "database pool created");
        Ok(Self { pool, dialect })
    }

    async fn list_tables(&self) -> Result<Vec<String>, Error> {
        let query = match self.dialect {
            Dialect::Mysql => {
                r#"SELECT CAST(table_name AS CHAR)
                   FROM information_schema.tables
                   WHERE table_schema = DATABASE()
                   ORDER BY table_name"#
            }
            Dialect::Postgres => {
                r#"SELECT table_name::text
                   FROM information_schema.tables
                   WHERE table_schema = 'public'
                   ORDER BY table_name"#
            }
            Dialect::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            }
        };

        let rows: Vec<(String,)> = sqlx::query_as(query).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn describe_table(&self, table: &str) -> Result<Vec<ColumnInfo>, Error> {
        let rows: Vec<(String, String, String, String)> = match self.dialect {
            Dialect::Mysql => {
                sqlx::query_as(
                    r#"SELECT CAST(column_name AS CHAR), CAST(column_type AS CHAR),
                              CAST(is_nullable AS CHAR), CAST(column_key AS CHAR)
                       FROM information_schema.columns
                       WHERE table_schema = DATABASE() AND table_name = ?
                       ORDER BY ordinal_position"#,
                )
                .bind(table)
                .fetch_all(&self.pool)
                .await?
            }
            Dialect::Postgres => {
                sqlx::query_as(
                    r#"SELECT column_name::text, data_type::text, is_nullable::text, ''::text
                       FROM information_schema.columns
                       WHERE table_schema = 'public' AND table_name = $1
                       ORDER BY ordinal_position"#,
                )
                .bind(table)
                .fetch_all(&self.pool)
                .await?
            }
            Dialect::Sqlite => {
                let query = format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\""));
                let cols: Vec<(i32, String, String, i32, Option<String>, i32)> =
                    sqlx::query_as(&query).fetch_all(&self.pool).await?;

                cols.into_iter()
                    .map(|(_, name, dtype, notnull, _, pk)| {
                        let nullable = if notnull == 0 { "YES" } else { "NO" };
                        let key = if pk > 0 { "PRI" } else { "" };
                        (name, dtype, nullable.to_string(), key.to_string())
                    })
                    .collect()
            }
        };

        Ok(rows
            .into_iter()
            .map(|(field, data_type, nullable, key)| ColumnInfo {
                field,
                data_type,
                nullable: nullable.eq_ignore_ascii_case("YES"),
                key,
            })
            .collect())
    }

    async fn fetch_rows(&self, sql: &str) -> Result<QueryResult, Error> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;

        if rows.is_empty() {
            return Ok(QueryResult {
                columns: self.column_names(sql).await,
                rows: vec![],
                row_count: 0,
            });
        }

        let columns: Vec<String> = rows[0]
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let json_rows: Vec<Vec<serde_json::Value>> = rows
            .iter()
            .map(|row| {
                (0..columns.len())
                    .map(|i| row_value_to_json(row, i))
                    .collect()
            })
            .collect();

        let row_count = json_rows.len();

        Ok(QueryResult {
            columns,
            rows: json_rows,
            row_count,
        })
    }

    // headers of a result set that came back without rows
    async fn column_names(&self, sql: &str) -> Vec<String> {
        match (&self.pool).describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "could not describe empty result");
                vec![]
            }
        }
    }
}

#[async_trait]
impl SchemaSource for Db {
    async fn tables(&self) -> Result<Vec<String>, Error> {
        self.list_tables().await
    }

    async fn describe(&self, table: &str) -> Result<Vec<ColumnInfo>, Error> {
        self.describe_table(table).await
    }
}

#[async_trait]
impl Executor for Db {
    async fn execute(&self, sql: &str) -> Result<Execution, Error> {
        let query_type = QueryType::detect(sql);

        if query_type.is_write() {
            let done = sqlx::query(sql).execute(&self.pool).await?;
            let affected_rows = done.rows_affected();
            tracing::info!(%query_type, affected_rows, "statement executed");
            return Ok(Execution::Affected {
                query_type,
                affected_rows,
            });
        }

        let result = self.fetch_rows(sql).await?;
        tracing::info!(%query_type, rows = result.row_count, "query executed");
        Ok(Execution::Rows(result))
    }

    async fn ping(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "database ping failed");
                false
            }
        }
    }
}

fn detect_dialect(url: &str) -> Dialect {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Dialect::Postgres
    } else if url.starts_with("mysql://") || url.starts_with("mariadb://") {
        Dialect::Mysql
    } else {
        Dialect::Sqlite
    }
}

/// Render tables as the text block the model sees.
pub fn format_schema(tables: &[TableSchema]) -> String {
    let mut result = String::from("DATABASE SCHEMA:\n\n");

    for table in tables {
        result.push_str(&format!("Table: {}\nColumns:\n", table.name));
        for col in &table.columns {
            let null = if col.nullable { "NULL" } else { "NOT NULL" };
            let key = if col.key.is_empty() {
                String::new()
            } else {
                format!(" ({})", col.key)
            };
            result.push_str(&format!(
                "  - {}: {} {null}{key}\n",
                col.field, col.data_type
            ));
        }
        result.push('\n');
    }

    result
}

fn row_value_to_json(row: &sqlx::any::AnyRow, index: usize) -> serde_json::Value {
    use sqlx::ValueRef;

    // null check first
    if row.try_get_raw(index).map(|v| v.is_null()).unwrap_or(true) {
        return serde_json::Value::Null;
    }

    // try types in order of how common they are
    if let Ok(v) = row.try_get::<String, _>(index) {
        return serde_json::Value::String(v);
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return serde_json::Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<i32, _>(index) {
        return serde_json::Value::Number(v.into());
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null);
    }
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return serde_json::Value::Bool(v);
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
        return serde_json::Value::String(String::from_utf8_lossy(&v).into_owned());
    }

    serde_json::Value::String("<unsupported>".to_string())
}

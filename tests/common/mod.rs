// in-memory stand-ins for the database and the language model

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlgate::{
    ColumnInfo, Error, Execution, Executor, Generated, Pipeline, QueryResult, QueryType, Safety,
    SchemaSource, SqlGenerator,
};

pub struct FakeDb {
    pub executed: Mutex<Vec<String>>,
    pub connected: bool,
}

impl FakeDb {
    pub fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            connected: true,
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaSource for FakeDb {
    async fn tables(&self) -> Result<Vec<String>, Error> {
        Ok(vec!["orders".to_string(), "users".to_string()])
    }

    async fn describe(&self, table: &str) -> Result<Vec<ColumnInfo>, Error> {
        let column = |field: &str, data_type: &str, nullable: bool, key: &str| ColumnInfo {
            field: field.to_string(),
            data_type: data_type.to_string(),
            nullable,
            key: key.to_string(),
        };

        Ok(match table {
            "users" => vec![
                column("id", "int", false, "PRI"),
                column("name", "varchar(100)", true, ""),
            ],
            "orders" => vec![
                column("id", "int", false, "PRI"),
                column("user_id", "int", false, "MUL"),
                column("amount", "decimal(10,2)", true, ""),
            ],
            _ => vec![],
        })
    }
}

#[async_trait]
impl Executor for FakeDb {
    async fn execute(&self, sql: &str) -> Result<Execution, Error> {
        self.executed.lock().unwrap().push(sql.to_string());

        let query_type = QueryType::detect(sql);
        if query_type.is_write() {
            return Ok(Execution::Affected {
                query_type,
                affected_rows: 1,
            });
        }

        Ok(Execution::Rows(QueryResult {
            columns: vec!["id".to_string(), "name".to_string()],
            rows: vec![vec![serde_json::json!(1), serde_json::json!("ada")]],
            row_count: 1,
        }))
    }

    async fn ping(&self) -> bool {
        self.connected
    }
}

/// Replies with a fixed statement and remembers what it was shown.
/// A `{limit}` in the reply is filled with the row limit it was asked for.
pub struct FakeModel {
    pub sql: Option<String>,
    pub seen_schema: Mutex<Option<String>>,
    pub seen_row_limit: Mutex<Option<u32>>,
}

impl FakeModel {
    pub fn replying(sql: &str) -> Self {
        Self {
            sql: Some(sql.to_string()),
            seen_schema: Mutex::new(None),
            seen_row_limit: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            sql: None,
            seen_schema: Mutex::new(None),
            seen_row_limit: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SqlGenerator for FakeModel {
    async fn generate_sql(
        &self,
        _request: &str,
        schema: &str,
        _operation: Option<&str>,
        row_limit: u32,
    ) -> Result<Generated, Error> {
        *self.seen_schema.lock().unwrap() = Some(schema.to_string());
        *self.seen_row_limit.lock().unwrap() = Some(row_limit);

        match &self.sql {
            Some(sql) => Ok(Generated {
                sql: sql.replace("{limit}", &row_limit.to_string()),
                explanation: "canned".to_string(),
                warnings: "None".to_string(),
            }),
            None => Err(Error::EmptyResponse),
        }
    }
}

pub fn pipeline(db: Arc<FakeDb>, model: Arc<FakeModel>) -> Pipeline {
    pipeline_with(Safety::default(), db, model)
}

pub fn pipeline_with(safety: Safety, db: Arc<FakeDb>, model: Arc<FakeModel>) -> Pipeline {
    Pipeline::new(safety, db.clone(), model, db)
}

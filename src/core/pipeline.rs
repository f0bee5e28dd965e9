// generation and execution paths, both gated by the validator
// the execution path re-validates whatever string it is handed

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::db::{ColumnInfo, Execution, TableSchema, format_schema};
use super::prompt::Generated;
use super::safety::{QueryType, Safety, Validation, sanitize};
use crate::Error;

#[async_trait]
pub trait SchemaSource: Send + Sync {
    async fn tables(&self) -> Result<Vec<String>, Error>;
    async fn describe(&self, table: &str) -> Result<Vec<ColumnInfo>, Error>;
}

#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(
        &self,
        request: &str,
        schema: &str,
        operation: Option<&str>,
        row_limit: u32,
    ) -> Result<Generated, Error>;
}

#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<Execution, Error>;
    async fn ping(&self) -> bool;
}

/// Generated statement after the limit and sanitize rewrites, carrying the
/// validation of the statement as the model produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub sql: String,
    pub explanation: String,
    pub model_warnings: String,
    pub validation: Validation,
}

#[derive(Clone)]
pub struct Pipeline {
    safety: Safety,
    schema: Arc<dyn SchemaSource>,
    generator: Arc<dyn SqlGenerator>,
    executor: Arc<dyn Executor>,
}

impl Pipeline {
    pub fn new(
        safety: Safety,
        schema: Arc<dyn SchemaSource>,
        generator: Arc<dyn SqlGenerator>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            safety,
            schema,
            generator,
            executor,
        }
    }

    pub fn safety(&self) -> &Safety {
        &self.safety
    }

    pub async fn describe(&self, table: &str) -> Result<Vec<ColumnInfo>, Error> {
        let columns = self.schema.describe(table).await?;
        if columns.is_empty() {
            return Err(Error::UnknownTable(table.to_string()));
        }
        Ok(columns)
    }

    pub async fn full_schema(&self) -> Result<Vec<TableSchema>, Error> {
        let mut tables = Vec::new();
        for name in self.schema.tables().await? {
            let columns = self.schema.describe(&name).await?;
            tables.push(TableSchema { name, columns });
        }
        Ok(tables)
    }

    pub async fn schema_text(&self) -> Result<String, Error> {
        Ok(format_schema(&self.full_schema().await?))
    }

    pub async fn is_connected(&self) -> bool {
        self.executor.ping().await
    }

    /// Ask the model for a statement, validate it, then bound and tidy it.
    pub async fn generate(
        &self,
        request: &str,
        operation: Option<&str>,
    ) -> Result<Generation, Error> {
        let schema = self.schema_text().await?;
        // the model is asked for the same bound the limit rewrite applies
        let row_limit = self.safety.policy().default_row_limit;
        let generated = self
            .generator
            .generate_sql(request, &schema, operation, row_limit)
            .await?;
        tracing::debug!(sql = %generated.sql, "statement generated");

        let validation = self.safety.validate(&generated.sql);

        let mut sql = generated.sql;
        if validation.query_type == QueryType::Select {
            sql = self.safety.add_limit_if_missing(&sql);
        }
        let sql = sanitize(&sql);

        if !validation.is_valid {
            tracing::warn!(errors = ?validation.errors, "generated statement failed validation");
        }

        Ok(Generation {
            sql,
            explanation: generated.explanation,
            model_warnings: generated.warnings,
            validation,
        })
    }

    /// Run a statement only if it passes a fresh validation.
    pub async fn execute(&self, sql: &str) -> Result<Execution, Error> {
        let validation = self.safety.validate(sql);
        if !validation.is_valid {
            tracing::warn!(errors = ?validation.errors, "execution refused");
            return Err(Error::Rejected {
                errors: validation.errors,
            });
        }

        tracing::info!(query_type = %validation.query_type, risk = %validation.risk_level, "executing statement");
        self.executor.execute(sql).await
    }
}

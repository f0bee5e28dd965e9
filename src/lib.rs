// sqlgate library - natural language to sql, gated by a safety validator

pub mod cli;
mod core;
mod error;
mod output;
mod server;

pub use crate::core::{
    Ai, Backend, ColumnInfo, DEFAULT_DANGEROUS_KEYWORDS, DEFAULT_ROW_LIMIT, Db, Execution,
    Executor, Generated, Generation, Pipeline, Provider, QueryResult, QueryType, RiskLevel,
    Safety, SafetyPolicy, SchemaSource, SqlGenerator, TableSchema, Validation, format_schema,
    sanitize,
};
pub use error::Error;
pub use server::Server;

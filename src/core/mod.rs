// core logic - safety gate, language models, database and the pipeline tying them together

mod ai;
mod db;
mod pipeline;
mod prompt;
mod safety;

pub use ai::{Ai, Backend, Provider};
pub use db::{ColumnInfo, Db, Execution, QueryResult, TableSchema, format_schema};
pub use pipeline::{Executor, Generation, Pipeline, SchemaSource, SqlGenerator};
pub use prompt::Generated;
pub use safety::{
    DEFAULT_DANGEROUS_KEYWORDS, DEFAULT_ROW_LIMIT, QueryType, RiskLevel, Safety, SafetyPolicy,
    Validation, sanitize,
};

// sql safety gate
// surface-level checks only: keywords, clauses and statement count.
// keywords inside string literals or comments still match.
// the query type comes from the first word, so a statement led by a comment
// (`/* x */ DELETE FROM t`) classifies as UNKNOWN and skips the WHERE checks.
// dangerous keywords and the statement count still apply to it.

use serde::Serialize;
use sqlparser::dialect::MySqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

pub const DEFAULT_ROW_LIMIT: u32 = 1000;

pub const DEFAULT_DANGEROUS_KEYWORDS: [&str; 4] = ["DROP TABLE", "DROP DATABASE", "GRANT", "REVOKE"];

/// Keywords that block a statement outright, plus the row bound applied to
/// unbounded SELECTs.
#[derive(Debug, Clone)]
pub struct SafetyPolicy {
    pub dangerous_keywords: Vec<String>,
    pub default_row_limit: u32,
}

impl SafetyPolicy {
    pub fn new<I, S>(dangerous_keywords: I, default_row_limit: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // matching runs against uppercased sql, so keywords are stored uppercased.
        // surrounding spaces are kept: "DROP " must not match "dropped"
        let dangerous_keywords = dangerous_keywords
            .into_iter()
            .map(|k| k.as_ref().to_uppercase())
            .filter(|k| !k.trim().is_empty())
            .collect();

        Self {
            dangerous_keywords,
            default_row_limit: default_row_limit.max(1),
        }
    }
}

impl Default for SafetyPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DANGEROUS_KEYWORDS, DEFAULT_ROW_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Unknown,
}

impl QueryType {
    /// Classify by the leading keyword of the trimmed statement.
    pub fn detect(sql: &str) -> Self {
        let head: String = sql
            .trim_start_matches(|c: char| c == '\u{feff}' || c.is_whitespace())
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();

        match head.to_uppercase().as_str() {
            "SELECT" => Self::Select,
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Statements that report affected rows instead of a result set.
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    pub is_valid: bool,
    pub query_type: QueryType,
    pub risk_level: RiskLevel,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl Validation {
    fn parse_failure() -> Self {
        Self {
            is_valid: false,
            query_type: QueryType::Unknown,
            risk_level: RiskLevel::High,
            warnings: Vec::new(),
            errors: vec!["Could not parse SQL query".to_string()],
        }
    }
}

// accumulates findings; risk only ever goes up
struct Findings {
    risk: RiskLevel,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Findings {
    fn escalate(&mut self, to: RiskLevel) {
        self.risk = self.risk.max(to);
    }

    fn block(&mut self, error: impl Into<String>, risk: RiskLevel) {
        self.errors.push(error.into());
        self.escalate(risk);
    }

    fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

#[derive(Debug, Clone, Default)]
pub struct Safety {
    policy: SafetyPolicy,
}

impl Safety {
    pub fn new(policy: SafetyPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SafetyPolicy {
        &self.policy
    }

    /// Classify a statement and collect blocking errors and advisories.
    ///
    /// Never fails: text that does not tokenize as SQL comes back as an
    /// invalid, high-risk result.
    pub fn validate(&self, sql: &str) -> Validation {
        if !is_sql_shaped(sql) {
            return Validation::parse_failure();
        }

        let sql_upper = sql.to_uppercase();
        let mut found = Findings {
            risk: RiskLevel::Low,
            warnings: Vec::new(),
            errors: Vec::new(),
        };

        for keyword in &self.policy.dangerous_keywords {
            if sql_upper.contains(keyword.as_str()) {
                found.block(
                    format!("Dangerous operation detected: {keyword}"),
                    RiskLevel::High,
                );
            }
        }

        let query_type = QueryType::detect(&sql_upper);
        let has_where = sql_upper.contains("WHERE");

        match query_type {
            QueryType::Delete => {
                found.escalate(RiskLevel::High);
                if has_where {
                    found.warn("DELETE operation - please verify the WHERE condition carefully");
                } else {
                    found.block(
                        "DELETE without WHERE clause - this will delete ALL rows!",
                        RiskLevel::High,
                    );
                }
            }
            QueryType::Update => {
                found.escalate(RiskLevel::Medium);
                if has_where {
                    found.warn("UPDATE operation - please verify the WHERE condition carefully");
                } else {
                    found.block(
                        "UPDATE without WHERE clause - this will update ALL rows!",
                        RiskLevel::Medium,
                    );
                }
            }
            QueryType::Insert => found.warn("INSERT operation - new row will be added"),
            QueryType::Select => {
                if !sql_upper.contains("LIMIT") {
                    found.warn(format!(
                        "No LIMIT specified - will default to {} rows",
                        self.policy.default_row_limit
                    ));
                }
            }
            QueryType::Unknown => {}
        }

        if !is_single_statement(sql) {
            found.block(
                "Multiple SQL statements detected - only one statement allowed",
                RiskLevel::High,
            );
        }

        Validation {
            is_valid: found.errors.is_empty(),
            query_type,
            risk_level: found.risk,
            warnings: found.warnings,
            errors: found.errors,
        }
    }

    /// Append the default row bound to a SELECT that has none.
    pub fn add_limit_if_missing(&self, sql: &str) -> String {
        if QueryType::detect(sql) != QueryType::Select || sql.to_uppercase().contains("LIMIT") {
            return sql.to_string();
        }

        let trimmed = sql.trim();
        let body = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
        format!("{body} LIMIT {}", self.policy.default_row_limit)
    }
}

/// Collapse whitespace runs to single spaces and drop one trailing `;`.
pub fn sanitize(sql: &str) -> String {
    let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.strip_suffix(';') {
        Some(body) => body.trim_end().to_string(),
        None => collapsed,
    }
}

// tokenizes as mysql and holds at least one real token
fn is_sql_shaped(sql: &str) -> bool {
    let dialect = MySqlDialect {};
    match Tokenizer::new(&dialect, sql).tokenize() {
        Ok(tokens) => tokens
            .iter()
            .any(|t| !matches!(t, Token::Whitespace(_) | Token::SemiColon | Token::EOF)),
        Err(_) => false,
    }
}

// zero separators, or exactly one as the last non-whitespace character
fn is_single_statement(sql: &str) -> bool {
    match sql.matches(';').count() {
        0 => true,
        1 => sql.trim_end().ends_with(';'),
        _ => false,
    }
}

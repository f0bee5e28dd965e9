// prompt building and reply parsing, shared by every provider

use serde::Serialize;

use crate::Error;

/// What the model hands back once its reply is parsed.
#[derive(Debug, Clone, Serialize)]
pub struct Generated {
    pub sql: String,
    pub explanation: String,
    pub warnings: String,
}

pub fn build(request: &str, schema: &str, operation: Option<&str>, row_limit: u32) -> String {
    // "any" means no preference, same as leaving it out
    let hint = match operation.map(str::trim) {
        Some(op) if !op.is_empty() && !op.eq_ignore_ascii_case("any") => format!(
            "\nThe user expects a {} statement.\n",
            op.to_uppercase()
        ),
        _ => String::new(),
    };

    format!(
        r#"You are an expert SQL assistant. Generate a MySQL query based on the user's natural language request.

{schema}

USER REQUEST: {request}
{hint}
RULES:
1. Generate ONLY valid MySQL syntax
2. Use proper table and column names from the schema above
3. Do NOT use columns that don't exist in the schema
4. For SELECT queries, include LIMIT {row_limit} if not specified
5. For UPDATE/DELETE, ALWAYS include WHERE clause unless user explicitly says "all rows"
6. Use proper JOIN syntax when multiple tables are involved
7. Return your response in this EXACT format:

SQL:
[Your SQL query here]

EXPLANATION:
[Brief explanation of what this query does in plain English]

WARNINGS:
[Any warnings or concerns about this query, or "None" if safe]

IMPORTANT: Do not include any markdown formatting, code blocks, or extra text. Follow the format exactly."#
    )
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Sql,
    Explanation,
    Warnings,
}

pub fn parse(reply: &str) -> Result<Generated, Error> {
    // models sometimes wrap things in markdown code blocks anyway
    let reply = reply.replace("```sql", "").replace("```", "");

    let mut sql = String::new();
    let mut explanation = String::new();
    let mut warnings = String::new();
    let mut current = None;

    for line in reply.lines().map(str::trim) {
        let (section, rest) = if let Some(rest) = line.strip_prefix("SQL:") {
            (Section::Sql, rest)
        } else if let Some(rest) = line.strip_prefix("EXPLANATION:") {
            (Section::Explanation, rest)
        } else if let Some(rest) = line.strip_prefix("WARNINGS:") {
            (Section::Warnings, rest)
        } else {
            let Some(section) = current else { continue };
            (section, line)
        };

        current = Some(section);
        let target = match section {
            Section::Sql => &mut sql,
            Section::Explanation => &mut explanation,
            Section::Warnings => &mut warnings,
        };
        append(target, rest.trim());
    }

    let sql = sql.trim().trim_end_matches(';').trim_end().to_string();
    if sql.is_empty() {
        return Err(Error::EmptyResponse);
    }

    Ok(Generated {
        sql,
        explanation: non_empty_or(explanation, "SQL query generated"),
        warnings: non_empty_or(warnings, "None"),
    })
}

fn append(target: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

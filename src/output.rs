// output formatting - pretty tables or raw json

use crate::core::{Execution, Generation, QueryResult, Validation};

pub struct Output;

impl Output {
    // validation report for `check` and `ask`
    pub fn validation(sql: &str, validation: &Validation) {
        println!("sql: {sql}");
        println!(
            "type: {}  risk: {}  valid: {}",
            validation.query_type,
            validation.risk_level,
            if validation.is_valid { "yes" } else { "no" }
        );
        for error in &validation.errors {
            println!("  error: {error}");
        }
        for warning in &validation.warnings {
            println!("  warning: {warning}");
        }
    }

    pub fn generation(generation: &Generation) {
        Self::validation(&generation.sql, &generation.validation);
        println!("explanation: {}", generation.explanation);
        if generation.model_warnings != "None" {
            println!("model warnings: {}", generation.model_warnings);
        }
        println!();
    }

    pub fn execution(execution: &Execution, raw: bool) {
        match execution {
            Execution::Rows(result) if raw => Self::raw(result),
            Execution::Rows(result) => Self::pretty(result),
            Execution::Affected {
                query_type,
                affected_rows,
            } => {
                if raw {
                    println!(
                        "{}",
                        serde_json::json!({ "query_type": query_type, "affected_rows": affected_rows })
                    );
                } else {
                    println!("{query_type}: {affected_rows} row(s) affected");
                }
            }
        }
    }

    // nice table format for humans
    pub fn pretty(result: &QueryResult) {
        println!("rows: {}\n", result.row_count);

        if result.rows.is_empty() {
            println!("no results");
            return;
        }

        // figure out column widths
        let mut widths: Vec<usize> = result.columns.iter().map(|c| c.len()).collect();

        for row in &result.rows {
            for (i, val) in row.iter().enumerate() {
                let len = format_value(val).chars().count();
                if len > widths[i] {
                    widths[i] = len;
                }
            }
        }

        // cap at 40 so things don't get crazy
        for w in &mut widths {
            if *w > 40 {
                *w = 40;
            }
        }

        let header: Vec<String> = result
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
            .collect();
        println!("{}", header.join(" | "));

        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        println!("{}", sep.join("-+-"));

        for row in &result.rows {
            let formatted: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{:width$}", truncate(&format_value(v)), width = widths[i]))
                .collect();
            println!("{}", formatted.join(" | "));
        }
    }

    // raw json for scripts
    pub fn raw(result: &QueryResult) {
        println!("{}", serde_json::to_string(result).unwrap_or_default());
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() > 40 {
        format!("{}...", s.chars().take(37).collect::<String>())
    } else {
        s.to_string()
    }
}

fn format_value(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => val.to_string(),
    }
}

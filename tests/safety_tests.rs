// tests for the sql safety gate and its rewrites

use sqlgate::{QueryType, RiskLevel, Safety, SafetyPolicy, sanitize};

fn safety() -> Safety {
    Safety::default()
}

#[test]
fn test_plain_select() {
    let v = safety().validate("SELECT * FROM t");
    assert!(v.is_valid);
    assert_eq!(v.query_type, QueryType::Select);
    assert_eq!(v.risk_level, RiskLevel::Low);
    assert!(v.errors.is_empty());
    assert_eq!(v.warnings.len(), 1);
    assert!(v.warnings[0].contains("1000"));
}

#[test]
fn test_select_with_limit_has_no_warning() {
    let v = safety().validate("select id from t limit 5");
    assert!(v.is_valid);
    assert!(v.warnings.is_empty());
}

#[test]
fn test_limit_warning_uses_policy() {
    let safety = Safety::new(SafetyPolicy::new(["DROP TABLE"], 50));
    let v = safety.validate("SELECT * FROM t");
    assert!(v.warnings[0].contains("50 rows"));
}

#[test]
fn test_dangerous_keywords_block() {
    for sql in [
        "DROP TABLE users",
        "drop database shop",
        "GRANT ALL ON *.* TO 'x'@'%'",
        "revoke select on t from bob",
        "SELECT * FROM t WHERE note = 'drop table'",
    ] {
        let v = safety().validate(sql);
        assert!(!v.is_valid, "{sql} should be blocked");
        assert_eq!(v.risk_level, RiskLevel::High, "{sql} should be high risk");
    }
}

#[test]
fn test_each_keyword_gets_its_own_error() {
    let v = safety().validate("GRANT x; REVOKE y;");
    let keyword_errors = v
        .errors
        .iter()
        .filter(|e| e.starts_with("Dangerous operation detected"))
        .count();
    assert_eq!(keyword_errors, 2);
    assert!(v.errors.iter().any(|e| e.contains("GRANT")));
    assert!(v.errors.iter().any(|e| e.contains("REVOKE")));
}

#[test]
fn test_custom_keywords_replace_defaults() {
    let safety = Safety::new(SafetyPolicy::new(["truncate"], 1000));
    assert!(!safety.validate("TRUNCATE TABLE t").is_valid);
    assert!(safety.validate("GRANT SELECT ON t TO bob").is_valid);
}

#[test]
fn test_delete_without_where() {
    let v = safety().validate("DELETE FROM t");
    assert!(!v.is_valid);
    assert_eq!(v.query_type, QueryType::Delete);
    assert_eq!(v.risk_level, RiskLevel::High);
    assert!(v.errors[0].contains("delete ALL rows"));
}

#[test]
fn test_delete_with_where() {
    let v = safety().validate("DELETE FROM t WHERE id = 1");
    assert!(v.is_valid);
    assert_eq!(v.risk_level, RiskLevel::High);
    assert_eq!(v.warnings.len(), 1);
    assert!(v.warnings[0].contains("WHERE"));
}

#[test]
fn test_update_without_where() {
    let v = safety().validate("UPDATE t SET x = 1");
    assert!(!v.is_valid);
    assert_eq!(v.query_type, QueryType::Update);
    assert!(v.risk_level >= RiskLevel::Medium);
}

#[test]
fn test_update_with_where() {
    let v = safety().validate("update t set x = 1 where id = 2");
    assert!(v.is_valid);
    assert_eq!(v.risk_level, RiskLevel::Medium);
    assert_eq!(v.warnings.len(), 1);
}

#[test]
fn test_insert_is_low_risk_with_note() {
    let v = safety().validate("INSERT INTO users (name) VALUES ('test')");
    assert!(v.is_valid);
    assert_eq!(v.query_type, QueryType::Insert);
    assert_eq!(v.risk_level, RiskLevel::Low);
    assert!(v.warnings[0].contains("new row"));
}

#[test]
fn test_unknown_statement() {
    let v = safety().validate("SHOW TABLES");
    assert!(v.is_valid);
    assert_eq!(v.query_type, QueryType::Unknown);
    assert_eq!(v.risk_level, RiskLevel::Low);
    assert!(v.warnings.is_empty());
}

#[test]
fn test_unparsable_input() {
    for sql in ["", "   ", ";", "-- nothing here", "SELECT 'oops"] {
        let v = safety().validate(sql);
        assert!(!v.is_valid, "{sql:?} should not parse");
        assert_eq!(v.risk_level, RiskLevel::High);
        assert_eq!(v.errors, vec!["Could not parse SQL query".to_string()]);
        assert!(v.warnings.is_empty());
    }
}

#[test]
fn test_multiple_statements() {
    let v = safety().validate("SELECT 1; SELECT 2;");
    assert!(!v.is_valid);
    assert_eq!(v.risk_level, RiskLevel::High);
    assert!(v.errors.iter().any(|e| e.contains("Multiple SQL statements")));

    let v = safety().validate("SELECT 1; SELECT 2");
    assert!(!v.is_valid);
}

#[test]
fn test_single_trailing_separator() {
    let v = safety().validate("SELECT 1;");
    assert!(v.is_valid);
    assert!(v.errors.is_empty());

    let v = safety().validate("SELECT 1 ;  \n");
    assert!(v.is_valid);
}

#[test]
fn test_risk_never_drops() {
    // insert after a dangerous keyword stays high
    let v = safety().validate("INSERT INTO audit (msg) VALUES ('GRANT')");
    assert_eq!(v.query_type, QueryType::Insert);
    assert_eq!(v.risk_level, RiskLevel::High);
    assert!(!v.is_valid);

    // update after a multi statement finding stays high
    let v = safety().validate("UPDATE t SET x = 1 WHERE id = 1; DROP TABLE t");
    assert_eq!(v.risk_level, RiskLevel::High);

    // update with a dangerous keyword does not fall back to medium
    let v = safety().validate("UPDATE t SET note = 'revoke' WHERE id = 1");
    assert_eq!(v.risk_level, RiskLevel::High);
}

#[test]
fn test_add_limit() {
    let safety = safety();
    let sql = safety.add_limit_if_missing("SELECT * FROM t");
    assert_eq!(sql, "SELECT * FROM t LIMIT 1000");
    assert_eq!(safety.add_limit_if_missing(&sql), sql);
}

#[test]
fn test_add_limit_strips_separator() {
    let sql = safety().add_limit_if_missing("  select * from t ;  ");
    assert_eq!(sql, "select * from t LIMIT 1000");
}

#[test]
fn test_add_limit_leaves_others_alone() {
    let safety = safety();
    assert_eq!(
        safety.add_limit_if_missing("SELECT * FROM t LIMIT 3"),
        "SELECT * FROM t LIMIT 3"
    );
    assert_eq!(
        safety.add_limit_if_missing("DELETE FROM t WHERE id = 1"),
        "DELETE FROM t WHERE id = 1"
    );
}

#[test]
fn test_sanitize() {
    assert_eq!(sanitize("SELECT  *\nFROM t;  "), "SELECT * FROM t");
    assert_eq!(sanitize("\t SELECT 1 ; "), "SELECT 1");
    assert_eq!(sanitize("SELECT 1"), "SELECT 1");
}

#[test]
fn test_transforms_are_idempotent() {
    let safety = safety();
    for sql in [
        "SELECT  *\nFROM t;  ",
        "select a,\n  b from t where x = 1",
        "UPDATE t SET x = 1 WHERE id = 2;",
        "  INSERT INTO t VALUES (1)  ",
    ] {
        let once = sanitize(sql);
        assert_eq!(sanitize(&once), once);

        let limited = safety.add_limit_if_missing(sql);
        assert_eq!(safety.add_limit_if_missing(&limited), limited);
    }
}

#[test]
fn test_keyword_spacing_is_significant() {
    let safety = Safety::new(SafetyPolicy::new(["drop "], 1000));
    assert_eq!(safety.policy().dangerous_keywords, vec!["DROP "]);

    assert!(safety.validate("SELECT dropped FROM t").is_valid);
    assert!(!safety.validate("DROP VIEW v").is_valid);
}

#[test]
fn test_comment_led_statement_still_hits_keywords() {
    let v = safety().validate("/* cleanup */ DROP TABLE users");
    assert_eq!(v.query_type, QueryType::Unknown);
    assert!(!v.is_valid);
    assert_eq!(v.risk_level, RiskLevel::High);
}

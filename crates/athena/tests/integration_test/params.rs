//! Tests for request normalization and the SQL it feeds.

use impression_athena::*;

#[test]
fn test_no_params_uses_defaults() {
    let params = RequestParams::from_query(None, None);
    assert_eq!(params.key, "dmartin");
    assert_eq!(params.days, 30);

    let query = ImpressionQuery::latest_per_day(&params);
    assert_eq!(query.parameters(), &["'dmartin'".to_string(), "30".to_string()]);
}

#[test]
fn test_days_clamping() {
    let cases = [
        ("0", 1),
        ("-30", 1),
        ("garbage", 1),
        ("1", 1),
        ("45", 45),
        ("90", 90),
        ("91", 90),
        ("10000", 90),
    ];
    for (raw, expected) in cases {
        let params = RequestParams::from_query(Some("k"), Some(raw));
        assert_eq!(params.days, expected, "days={raw:?}");
        let query = ImpressionQuery::latest_per_day(&params);
        assert_eq!(query.parameters()[1], expected.to_string());
    }
}

#[test]
fn test_key_never_reaches_statement_text() {
    let params = RequestParams::from_query(Some("'; DROP TABLE impressions4; --"), Some("7"));
    let query = ImpressionQuery::latest_per_day(&params);

    assert!(!query.sql().contains("DROP TABLE"));
    assert_eq!(query.parameters()[0], "'''; DROP TABLE impressions4; --'");
}

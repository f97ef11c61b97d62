//! Composition properties of the query builder.

use strata_sql::{params, Dialect, QueryBuilder, QueryError, SqlValue};

fn users() -> QueryBuilder {
    QueryBuilder::new("users")
}

/// Extracts `$n` placeholder numbers in order of appearance.
fn placeholder_numbers(sql: &str) -> Vec<usize> {
    let mut numbers = Vec::new();
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            let mut digits = String::new();
            while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                digits.push(*d);
                chars.next();
            }
            if let Ok(n) = digits.parse() {
                numbers.push(n);
            }
        }
    }
    numbers
}

#[test]
fn test_combined_or_literal() {
    let adults = users().where_clause("age > ?", params![18]).unwrap();
    let admins = users().where_clause("role = ?", params!["admin"]).unwrap();

    let (sql, args) = adults.or(&admins).unwrap().build_select();

    assert_eq!(sql, r#"SELECT * FROM "users" WHERE (age > $1 OR role = $2)"#);
    assert_eq!(args, vec![SqlValue::Int(18), SqlValue::Text("admin".into())]);
}

#[test]
fn test_placeholders_are_sequential_and_match_args() {
    let sub = QueryBuilder::new("orders")
        .select(["user_id"])
        .where_clause("total > ? AND status IN (?, ?)", params![100, "paid", "shipped"])
        .unwrap();
    let left = users()
        .where_eq("active", true)
        .where_in("country", ["fr", "de"]);
    let right = users()
        .where_in_subquery("id", &sub)
        .where_clause("created_at > ?", params!["2024-01-01"])
        .unwrap();
    let query = left
        .or(&right)
        .unwrap()
        .and(&users().where_not_in("id", [1, 2]))
        .unwrap()
        .where_eq("deleted", false)
        .group_by(["country"])
        .having("COUNT(*) > ?", params![5])
        .unwrap();

    let (sql, args) = query.build_select();
    let numbers = placeholder_numbers(&sql);

    assert_eq!(numbers, (1..=args.len()).collect::<Vec<_>>());
    assert_eq!(
        args,
        params![true, "fr", "de", 100, "paid", "shipped", "2024-01-01", 1, 2, false, 5]
    );
    assert_eq!(query.all_args(), args);
}

#[test]
fn test_sqlite_marker_count_matches_args() {
    let query = users()
        .with_dialect(Dialect::Sqlite)
        .where_in("id", [1, 2, 3])
        .or(&users().where_eq("name", "x"))
        .unwrap();

    let (sql, args) = query.build_select();

    assert_eq!(sql.matches('?').count(), args.len());
    assert!(!sql.contains('$'));
}

#[test]
fn test_or_identity() {
    let a = users()
        .where_clause("age > ?", params![18])
        .unwrap()
        .order_by_desc("age")
        .limit(10);

    assert_eq!(a.or(&users()).unwrap().build_select(), a.build_select());
    assert_eq!(a.and(&users()).unwrap().build_select(), a.build_select());
}

#[test]
fn test_merge_concatenates_conditions_and_prefers_left_limit() {
    let a = users().where_eq("a", 1).limit(5);
    let b = users().where_eq("b", 2).limit(20);

    let merged = a.merge(&b).unwrap();

    assert_eq!(merged.conditions().len(), 2);
    assert_eq!(merged.limit_value(), Some(5));

    let unlimited = users().where_eq("a", 1).merge(&b).unwrap();
    assert_eq!(unlimited.limit_value(), Some(20));
}

#[test]
fn test_combination_leaves_operands_untouched() {
    let a = users().where_eq("a", 1);
    let b = users().where_eq("b", 2);
    let before = (a.build_select(), b.build_select());

    let _ = a.or(&b).unwrap().merge(&b).unwrap().where_eq("c", 3);

    assert_eq!((a.build_select(), b.build_select()), before);
}

#[test]
fn test_table_mismatch() {
    let err = users().and(&QueryBuilder::new("posts")).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"cannot and a query on "posts" into a query on "users""#
    );
}

#[test]
fn test_placeholder_mismatch_message() {
    let err = users().where_clause("a = ?", params![]).unwrap_err();
    assert!(matches!(err, QueryError::PlaceholderMismatch { .. }));
    assert_eq!(
        err.to_string(),
        "fragment `a = ?` has 1 placeholder(s) but 0 value(s) were bound"
    );
}

#[test]
fn test_builder_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<QueryBuilder>();

    let base = users().where_eq("active", true);
    let handle = std::thread::spawn({
        let base = base.clone();
        move || base.where_eq("id", 1).build_select()
    });
    let (sql, _) = handle.join().unwrap();
    assert_eq!(sql, r#"SELECT * FROM "users" WHERE active = $1 AND id = $2"#);
}

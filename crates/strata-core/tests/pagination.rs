//! Tests for strategy selection and the paginated statements each dialect
//! receives.

mod common;
use common::*;

use pretty_assertions::assert_eq;
use strata_core::pagination::page_split_with;
use strata_core::{PageError, PageRequest, PageStrategy, page_split, page_split_sql, select_strategy};

// =============================================================================
// Worked examples
// =============================================================================

#[test]
fn not_in_on_a_dialect_without_window_functions() {
    let sql = page_split_sql(dialect("sqlserver2000"), "SELECT * FROM T", 20, 10, Some("Id")).unwrap();
    assert_eq!(
        sql,
        "SELECT TOP 10 * FROM T WHERE Id NOT IN (SELECT TOP 20 Id FROM T ORDER BY Id) ORDER BY Id"
    );
}

#[test]
fn max_min_on_an_identity_key() {
    let sql = page_split_sql(dialect("sqlserver2000"), "SELECT * FROM T", 10, 5, Some("Id asc")).unwrap();
    assert_eq!(
        sql,
        "SELECT TOP 5 * FROM T WHERE Id > (SELECT MAX(Id) FROM \
         (SELECT TOP 10 Id FROM T ORDER BY Id ASC) Page_T1) ORDER BY Id ASC"
    );
}

// =============================================================================
// Per dialect
// =============================================================================

#[test]
fn first_page_per_dialect() {
    let cases = [
        ("sqlserver", "SELECT TOP 10 * FROM T ORDER BY Name"),
        ("sqlite", "SELECT * FROM T ORDER BY Name LIMIT 10"),
        ("postgres", "SELECT * FROM T ORDER BY Name LIMIT 10"),
        ("mysql", "SELECT * FROM T ORDER BY Name LIMIT 10"),
    ];
    for (name, expected) in cases {
        let sql = page_split_sql(dialect(name), "SELECT * FROM T ORDER BY Name", 0, 10, None).unwrap();
        assert_eq!(sql, expected, "{name}");
    }
}

#[test]
fn later_pages_per_dialect() {
    let cases = [
        (
            "sqlserver",
            "SELECT * FROM (SELECT *, ROW_NUMBER() OVER (ORDER BY Name) AS RowNumber FROM T) Page_T0 \
             WHERE RowNumber BETWEEN 31 AND 40 ORDER BY RowNumber",
        ),
        ("sqlite", "SELECT * FROM T ORDER BY Name LIMIT 10 OFFSET 30"),
        ("postgres", "SELECT * FROM T ORDER BY Name LIMIT 10 OFFSET 30"),
        ("mysql", "SELECT * FROM T ORDER BY Name LIMIT 30, 10"),
        (
            "sqlserver2000",
            "SELECT * FROM (SELECT TOP 10 * FROM (SELECT TOP 40 * FROM T ORDER BY Name) Page_T0 \
             ORDER BY Name DESC) Page_T1 ORDER BY Name",
        ),
    ];
    for (name, expected) in cases {
        let sql = page_split_sql(dialect(name), "SELECT * FROM T ORDER BY Name", 30, 10, None).unwrap();
        assert_eq!(sql, expected, "{name}");
    }
}

#[test]
fn unbounded_pages_run_to_the_end() {
    assert_eq!(
        page_split_sql(dialect("sqlite"), "SELECT * FROM T ORDER BY Id", 30, 0, None).unwrap(),
        "SELECT * FROM T ORDER BY Id LIMIT -1 OFFSET 30"
    );
    let sql = page_split_sql(dialect("sqlserver"), "SELECT * FROM T ORDER BY Id", 30, 0, None).unwrap();
    assert!(sql.contains("WHERE RowNumber >= 31"));
}

#[test]
fn grouped_queries_are_wrapped_before_numbering() {
    let sql = page_split_sql(
        dialect("sqlserver"),
        "SELECT Dept, COUNT(*) AS N FROM Staff GROUP BY Dept ORDER BY Staff.Dept",
        10,
        10,
        None,
    )
    .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM (SELECT *, ROW_NUMBER() OVER (ORDER BY Dept) AS RowNumber \
         FROM (SELECT Dept, COUNT(*) AS N FROM Staff GROUP BY Dept) Page_T0) Page_T1 \
         WHERE RowNumber BETWEEN 11 AND 20 ORDER BY RowNumber"
    );
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn first_page_wins_even_with_a_key() {
    let q = parse("SELECT * FROM T");
    let request = PageRequest::new(0, 10).with_key("Id asc");
    assert_eq!(
        select_strategy(dialect("sqlserver2000"), &q, &request),
        PageStrategy::FirstPage
    );
    assert_eq!(
        page_split(dialect("sqlserver2000"), &q, &request).unwrap().render(),
        "SELECT TOP 10 * FROM T"
    );
}

#[test]
fn nothing_to_page_returns_the_input() {
    let q = parse("SELECT a FROM T WHERE b = 1 ORDER BY a");
    let paged = page_split(dialect("sqlserver"), &q, &PageRequest::new(0, 0)).unwrap();
    assert_eq!(paged, q);
}

#[test]
fn unknown_suffix_disables_max_min() {
    let q = parse("SELECT * FROM T ORDER BY Id");
    let d = dialect("sqlserver2000");
    assert_eq!(
        select_strategy(d, &q, &PageRequest::new(10, 5).with_key("Id asc")),
        PageStrategy::MaxMin
    );
    assert_eq!(
        select_strategy(d, &q, &PageRequest::new(10, 5).with_key("Id unknown")),
        PageStrategy::DoubleTop
    );
}

#[test]
fn selection_depends_only_on_its_inputs() {
    let requests = [
        PageRequest::new(0, 0),
        PageRequest::new(0, 5),
        PageRequest::new(5, 5),
        PageRequest::new(5, 0).with_key("Id desc"),
        PageRequest::new(5, 5).with_key("Code unknown"),
    ];
    let queries = [
        parse("SELECT * FROM T"),
        parse("SELECT * FROM T ORDER BY Id DESC"),
        parse("SELECT a, COUNT(*) FROM T GROUP BY a ORDER BY a"),
    ];
    for name in ["sqlserver", "sqlserver2000", "sqlite", "postgres", "mysql"] {
        for q in &queries {
            for request in &requests {
                let first = select_strategy(dialect(name), q, request);
                let again = select_strategy(dialect(name), &q.clone(), &request.clone());
                assert_eq!(first, again);
            }
        }
    }
}

// =============================================================================
// Preconditions
// =============================================================================

#[test]
fn missing_key_is_an_error_not_a_downgrade() {
    let d = dialect("sqlserver2000");
    let q = parse("SELECT * FROM T");
    let request = PageRequest::new(10, 10);

    assert_eq!(select_strategy(d, &q, &request), PageStrategy::NotIn);
    assert_eq!(
        page_split(d, &q, &request),
        Err(PageError::MissingKey {
            strategy: PageStrategy::NotIn
        })
    );
    assert_eq!(
        page_split_with(PageStrategy::MaxMin, d, &q, &request.clone().with_key("Id")),
        Err(PageError::MissingKey {
            strategy: PageStrategy::MaxMin
        })
    );
}

#[test]
fn double_top_clamps_with_a_known_total() {
    let q = parse("SELECT * FROM T ORDER BY Name");
    let request = PageRequest::new(20, 10).with_total_rows(25);
    let paged = page_split(dialect("sqlserver2000"), &q, &request).unwrap().render();
    assert_eq!(
        paged,
        "SELECT * FROM (SELECT TOP 5 * FROM (SELECT TOP 30 * FROM T ORDER BY Name) Page_T0 \
         ORDER BY Name DESC) Page_T1 ORDER BY Name"
    );
}

#[test]
fn double_top_pads_the_last_page_without_a_total() {
    let q = parse("SELECT * FROM T ORDER BY Name");
    let paged = page_split(dialect("sqlserver2000"), &q, &PageRequest::new(20, 10)).unwrap().render();
    assert_eq!(
        paged,
        "SELECT * FROM (SELECT TOP 10 * FROM (SELECT TOP 30 * FROM T ORDER BY Name) Page_T0 \
         ORDER BY Name DESC) Page_T1 ORDER BY Name"
    );
}

//! Pagination strategist.
//!
//! Rewrites a query so it returns rows `[offset, offset + max_rows)` of its
//! own order. Which rewrite is used depends on the dialect and on the
//! ordering information the query carries:
//!
//! 1. [`PageStrategy::Unchanged`]: nothing to page.
//! 2. [`PageStrategy::FirstPage`]: offset zero, a plain `TOP n` or `LIMIT n`.
//! 3. [`PageStrategy::LimitOffset`]: the dialect pages natively.
//! 4. [`PageStrategy::RowNumber`]: the dialect has `ROW_NUMBER()`.
//! 5. [`PageStrategy::MaxMin`]: a single integer identity key.
//! 6. [`PageStrategy::DoubleTop`]: an explicit order and a row bound.
//! 7. [`PageStrategy::NotIn`]: the last resort, one unique key.
//!
//! Selection is a pure function of its inputs. A strategy invoked without
//! the key or order it requires fails with [`PageError`] instead of
//! producing a query that pages incorrectly.
//!
//! The direction recorded for an identity key is trusted: if the caller
//! declares `desc` for a key the rows are not actually ordered by, the page
//! comes back wrong without any error.

mod strategies;

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::dialect::{Dialect, PagingStyle};
use crate::error::PageError;
use crate::query::SelectBuilder;
use crate::query::scanner::unqualify;

pub use strategies::{double_top, first_page, limit_offset, max_min, not_in, row_number};

/// Alias given to a query that had to be wrapped before paging.
pub(crate) const SOURCE_ALIAS: &str = "Page_T0";

/// The rewrite used to page a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageStrategy {
    Unchanged,
    FirstPage,
    LimitOffset,
    RowNumber,
    MaxMin,
    DoubleTop,
    NotIn,
}

impl fmt::Display for PageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The page to fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Rows to skip.
    pub offset: u64,
    /// Rows to return. `0` means to the end.
    pub max_rows: u64,
    /// Key spec (`"Id asc"`, `"Code unknown"`) overriding the query's own.
    pub key: Option<String>,
    /// Total rows of the unpaged query, when known. Lets
    /// [`PageStrategy::DoubleTop`] return an exact final page.
    pub total_rows: Option<u64>,
}

impl PageRequest {
    #[must_use]
    pub const fn new(offset: u64, max_rows: u64) -> Self {
        Self {
            offset,
            max_rows,
            key: None,
            total_rows: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub const fn with_total_rows(mut self, total_rows: u64) -> Self {
        self.total_rows = Some(total_rows);
        self
    }
}

/// Picks the strategy [`page_split`] will use.
#[must_use]
pub fn select_strategy(
    dialect: &dyn Dialect,
    builder: &SelectBuilder,
    request: &PageRequest,
) -> PageStrategy {
    let keyed = with_request_key(builder, request);

    if request.offset == 0 && request.max_rows == 0 {
        PageStrategy::Unchanged
    } else if request.offset == 0 {
        PageStrategy::FirstPage
    } else if dialect.paging() == PagingStyle::LimitOffset {
        PageStrategy::LimitOffset
    } else if dialect.supports_window_functions() {
        PageStrategy::RowNumber
    } else if max_min_applies(&keyed) {
        PageStrategy::MaxMin
    } else if !keyed.order_by().is_empty() && request.max_rows > 0 {
        PageStrategy::DoubleTop
    } else {
        PageStrategy::NotIn
    }
}

/// Pages `builder` with the strategy [`select_strategy`] picks.
///
/// When that is [`PageStrategy::DoubleTop`] and `request.total_rows` is
/// unset, a final page shorter than `max_rows` is padded with rows from the
/// page before it. Callers paging to the end of such a result should set
/// [`PageRequest::with_total_rows`].
pub fn page_split(
    dialect: &dyn Dialect,
    builder: &SelectBuilder,
    request: &PageRequest,
) -> Result<SelectBuilder, PageError> {
    let strategy = select_strategy(dialect, builder, request);
    debug!(
        dialect = dialect.name(),
        %strategy,
        offset = request.offset,
        max_rows = request.max_rows,
        "Paging query"
    );
    page_split_with(strategy, dialect, builder, request)
}

/// Pages `builder` with a given strategy.
pub fn page_split_with(
    strategy: PageStrategy,
    dialect: &dyn Dialect,
    builder: &SelectBuilder,
    request: &PageRequest,
) -> Result<SelectBuilder, PageError> {
    let keyed = with_request_key(builder, request);
    match strategy {
        PageStrategy::Unchanged => Ok(keyed.into_owned()),
        PageStrategy::FirstPage => Ok(first_page(dialect, &keyed, request.max_rows)),
        PageStrategy::LimitOffset => Ok(limit_offset(dialect, &keyed, request)),
        PageStrategy::RowNumber => row_number(&keyed, request),
        PageStrategy::MaxMin => max_min(&keyed, request),
        PageStrategy::DoubleTop => double_top(&keyed, request),
        PageStrategy::NotIn => not_in(&keyed, request),
    }
}

/// Pages raw SQL.
///
/// Text the query builder does not recognise is paged as an opaque
/// subquery. `key` is a key spec as accepted by
/// [`SelectBuilder::set_key_spec`].
pub fn page_split_sql(
    dialect: &dyn Dialect,
    sql: &str,
    offset: u64,
    max_rows: u64,
    key: Option<&str>,
) -> Result<String, PageError> {
    if offset == 0 && max_rows == 0 {
        return Ok(sql.to_string());
    }
    let builder = SelectBuilder::from_sql(sql).unwrap_or_else(|| {
        let inner = sql.trim().trim_end_matches(';').trim_end();
        SelectBuilder::new("*", format!("({inner}) {SOURCE_ALIAS}"))
    });
    let mut request = PageRequest::new(offset, max_rows);
    request.key = key.map(str::to_string);
    Ok(page_split(dialect, &builder, &request)?.render())
}

fn with_request_key<'a>(builder: &'a SelectBuilder, request: &PageRequest) -> Cow<'a, SelectBuilder> {
    match &request.key {
        Some(key) if !key.trim().is_empty() => {
            let mut keyed = builder.clone();
            keyed.set_key_spec(key);
            Cow::Owned(keyed)
        }
        _ => Cow::Borrowed(builder),
    }
}

/// One integer identity key, and an order that is either absent or exactly
/// that key in the key's direction.
fn max_min_applies(builder: &SelectBuilder) -> bool {
    let ([key], [descending]) = (builder.keys(), builder.key_descending()) else {
        return false;
    };
    if !builder.key_is_identity() {
        return false;
    }
    let terms = order_terms(builder.order_by());
    match terms.as_slice() {
        [] => true,
        [(expr, desc)] => {
            unqualify(expr).eq_ignore_ascii_case(&unqualify(key)) && desc == descending
        }
        _ => false,
    }
}

/// Splits an `ORDER BY` list into `(expression, descending)` terms.
pub(crate) fn order_terms(order_by: &str) -> Vec<(String, bool)> {
    crate::query::scanner::split_top_level(order_by)
        .iter()
        .map(|term| crate::query::split_order_term(term))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DialectKind, dialect_by_name};

    fn select(sql: &str) -> SelectBuilder {
        SelectBuilder::from_sql(sql).unwrap()
    }

    #[test]
    fn short_circuits_before_dialect_checks() {
        let d = dialect_by_name("sqlserver2000").unwrap();
        let q = select("SELECT * FROM T ORDER BY Name");
        assert_eq!(
            select_strategy(d, &q, &PageRequest::new(0, 0).with_key("Id asc")),
            PageStrategy::Unchanged
        );
        assert_eq!(
            select_strategy(d, &q, &PageRequest::new(0, 10).with_key("Id asc")),
            PageStrategy::FirstPage
        );
    }

    #[test]
    fn picks_by_dialect_capability() {
        let q = select("SELECT * FROM T ORDER BY Name");
        let request = PageRequest::new(10, 10);
        assert_eq!(
            select_strategy(DialectKind::Sqlite.dialect(), &q, &request),
            PageStrategy::LimitOffset
        );
        assert_eq!(
            select_strategy(DialectKind::SqlServer.dialect(), &q, &request),
            PageStrategy::RowNumber
        );
    }

    #[test]
    fn picks_by_key_and_order_without_window_functions() {
        let d = dialect_by_name("sqlserver2000").unwrap();
        let request = PageRequest::new(10, 5);

        let keyed = request.clone().with_key("Id asc");
        assert_eq!(
            select_strategy(d, &select("SELECT * FROM T"), &keyed),
            PageStrategy::MaxMin
        );
        assert_eq!(
            select_strategy(d, &select("SELECT * FROM T ORDER BY T.Id"), &keyed),
            PageStrategy::MaxMin
        );
        // order disagrees with the key direction
        assert_eq!(
            select_strategy(d, &select("SELECT * FROM T ORDER BY Id DESC"), &keyed),
            PageStrategy::DoubleTop
        );

        let unknown = request.clone().with_key("Id unknown");
        assert_eq!(
            select_strategy(d, &select("SELECT * FROM T"), &unknown),
            PageStrategy::NotIn
        );
        assert_eq!(
            select_strategy(d, &select("SELECT * FROM T ORDER BY Name, Id"), &request),
            PageStrategy::DoubleTop
        );

        let to_end = PageRequest::new(10, 0).with_key("Code");
        assert_eq!(
            select_strategy(d, &select("SELECT * FROM T ORDER BY Code"), &to_end),
            PageStrategy::NotIn
        );
    }

    #[test]
    fn selection_is_deterministic() {
        let d = dialect_by_name("sqlserver2000").unwrap();
        let q = select("SELECT a, b FROM T WHERE a > 1 ORDER BY b DESC, a");
        let request = PageRequest::new(30, 10);
        let first = select_strategy(d, &q, &request);
        for _ in 0..10 {
            assert_eq!(select_strategy(d, &q.clone(), &request), first);
        }
    }

    #[test]
    fn unrecognised_sql_is_wrapped() {
        let d = DialectKind::Sqlite.dialect();
        let sql = "SELECT a FROM T UNION SELECT a FROM U;";
        assert_eq!(
            page_split_sql(d, sql, 5, 5, None).unwrap(),
            "SELECT * FROM (SELECT a FROM T UNION SELECT a FROM U) Page_T0 LIMIT 5 OFFSET 5"
        );
        assert_eq!(page_split_sql(d, sql, 0, 0, None).unwrap(), sql);
    }
}

//! The rewrites behind each [`PageStrategy`].
//!
//! Every function takes the query with its ordering key already applied and
//! returns a new builder. None of them look at the dialect's capabilities
//! beyond what they are documented to use; choosing the right one is
//! [`select_strategy`](super::select_strategy)'s job.

use super::{PageRequest, PageStrategy, SOURCE_ALIAS, order_terms};
use crate::dialect::{Dialect, PagingStyle};
use crate::error::PageError;
use crate::query::SelectBuilder;
use crate::query::scanner::{Token, TokenKind, join_tokens, tokenize, unqualify};

/// Alias for the outer level of a two-level rewrite.
const OUTER_ALIAS: &str = "Page_T1";

/// Prefix of the hidden columns carrying an order expression outward.
const HIDDEN_ALIAS: &str = "Page_K";

/// Returns the first `max_rows` rows: `TOP n` or the dialect's limit clause.
#[must_use]
pub fn first_page(dialect: &dyn Dialect, builder: &SelectBuilder, max_rows: u64) -> SelectBuilder {
    match dialect.paging() {
        PagingStyle::LimitOffset => {
            let mut paged = if builder.limit().is_empty() {
                builder.clone()
            } else {
                wrap(builder)
            };
            paged.set_limit(dialect.limit_clause(0, max_rows));
            paged
        }
        PagingStyle::Top => {
            let mut paged = if builder.has_top() || !builder.limit().is_empty() {
                wrap(builder)
            } else {
                builder.clone()
            };
            paged.set_columns(with_top(paged.columns(), max_rows));
            paged
        }
    }
}

/// Appends the dialect's native `LIMIT`/`OFFSET` clause.
#[must_use]
pub fn limit_offset(dialect: &dyn Dialect, builder: &SelectBuilder, request: &PageRequest) -> SelectBuilder {
    let mut paged = if builder.limit().is_empty() {
        builder.clone()
    } else {
        wrap(builder)
    };
    paged.set_limit(dialect.limit_clause(request.offset, request.max_rows));
    paged
}

/// Numbers the rows with `ROW_NUMBER()` and filters on the number.
///
/// Orders by `ORDER BY`, or by the keys when there is none. A plain
/// projection is numbered in place, so the window sees every column of the
/// source; grouped, distinct or limited queries are wrapped first.
pub fn row_number(builder: &SelectBuilder, request: &PageRequest) -> Result<SelectBuilder, PageError> {
    let inline = builder.is_simple() && !builder.is_distinct();
    let source = if inline { builder.clone() } else { wrap(builder) };
    let terms = ordering(&source).ok_or(PageError::MissingKey {
        strategy: PageStrategy::RowNumber,
    })?;

    let items = projection(source.columns());
    let window: Vec<(String, bool)> = terms
        .iter()
        .map(|(expr, descending)| (aliased_expression(&items, expr), *descending))
        .collect();
    let mut numbered = source.clone();
    numbered.set_order_by("");
    numbered.set_columns(format!(
        "{}, ROW_NUMBER() OVER (ORDER BY {}) AS RowNumber",
        source.columns(),
        render_terms(&window, false)
    ));

    let alias = if inline { SOURCE_ALIAS } else { OUTER_ALIAS };
    let first = request.offset.saturating_add(1);
    let mut paged = SelectBuilder::new("*", format!("({}) {alias}", numbered.render()));
    if request.max_rows > 0 {
        paged.set_where(format!(
            "RowNumber BETWEEN {first} AND {}",
            request.offset.saturating_add(request.max_rows)
        ));
    } else {
        paged.set_where(format!("RowNumber >= {first}"));
    }
    paged.set_order_by("RowNumber");
    Ok(paged)
}

/// Seeks past the largest (smallest, for descending keys) identity value of
/// the skipped rows.
pub fn max_min(builder: &SelectBuilder, request: &PageRequest) -> Result<SelectBuilder, PageError> {
    let missing = PageError::MissingKey {
        strategy: PageStrategy::MaxMin,
    };
    if !builder.key_is_identity() {
        return Err(missing);
    }
    let source = simple_source(builder);
    let ([key], [descending]) = (source.keys(), source.key_descending()) else {
        return Err(missing);
    };
    let (aggregate, comparison, direction) = if *descending {
        ("MIN", "<", "DESC")
    } else {
        ("MAX", ">", "ASC")
    };
    let order = format!("{key} {direction}");

    let mut skipped = SelectBuilder::new(format!("TOP {} {key}", request.offset), source.table());
    skipped.set_where(source.where_clause());
    skipped.set_order_by(&order);

    let mut paged = source.clone();
    paged.append_where_and(&format!(
        "{key} {comparison} (SELECT {aggregate}({}) FROM ({}) {OUTER_ALIAS})",
        unqualify(key),
        skipped.render()
    ));
    paged.set_order_by(order);
    if request.max_rows > 0 {
        paged.set_columns(with_top(source.columns(), request.max_rows));
    }
    Ok(paged)
}

/// Takes the top `offset + max_rows` rows, then the last `max_rows` of
/// those by reversing the order, then restores the order.
///
/// Without [`PageRequest::total_rows`] the final page of a result repeats
/// rows of the previous page to fill up to `max_rows`.
pub fn double_top(builder: &SelectBuilder, request: &PageRequest) -> Result<SelectBuilder, PageError> {
    if builder.order_by().is_empty() {
        return Err(PageError::MissingKey {
            strategy: PageStrategy::DoubleTop,
        });
    }
    if request.max_rows == 0 {
        return Err(PageError::Unbounded {
            strategy: PageStrategy::DoubleTop,
        });
    }

    let source = if builder.has_top() || !builder.limit().is_empty() {
        wrap(builder)
    } else {
        builder.clone()
    };
    let window = request.offset.saturating_add(request.max_rows);
    let last = request
        .total_rows
        .map_or(request.max_rows, |total| {
            request.max_rows.min(total.saturating_sub(request.offset))
        });

    let Exposed {
        inner,
        terms,
        columns,
    } = expose(&source, &order_terms(source.order_by()));
    let mut leading = inner.clone();
    leading.set_columns(with_top(inner.columns(), window));

    let mut tail = SelectBuilder::new(
        format!("TOP {last} *"),
        format!("({}) {SOURCE_ALIAS}", leading.render()),
    );
    tail.set_order_by(render_terms(&terms, true));

    let mut paged = SelectBuilder::new(columns, format!("({}) {OUTER_ALIAS}", tail.render()));
    paged.set_order_by(render_terms(&terms, false));
    Ok(paged)
}

/// Excludes the keys of the skipped rows with `NOT IN`.
///
/// The key must be unique. Orders by `ORDER BY`, or by the key when there
/// is none.
pub fn not_in(builder: &SelectBuilder, request: &PageRequest) -> Result<SelectBuilder, PageError> {
    let source = simple_source(builder);
    let ([key], [descending]) = (source.keys(), source.key_descending()) else {
        return Err(PageError::MissingKey {
            strategy: PageStrategy::NotIn,
        });
    };
    let order = if source.order_by().is_empty() {
        render_terms(&[(key.clone(), *descending)], false)
    } else {
        source.order_by().to_string()
    };

    let mut skipped = SelectBuilder::new(format!("TOP {} {key}", request.offset), source.table());
    skipped.set_where(source.where_clause());
    skipped.set_order_by(&order);

    let mut paged = source.clone();
    paged.append_where_and(&format!("{key} NOT IN ({})", skipped.render()));
    paged.set_order_by(order);
    if request.max_rows > 0 {
        paged.set_columns(with_top(source.columns(), request.max_rows));
    }
    Ok(paged)
}

/// `ORDER BY` terms, or the keys as terms, or `None`.
fn ordering(builder: &SelectBuilder) -> Option<Vec<(String, bool)>> {
    if !builder.order_by().is_empty() {
        return Some(order_terms(builder.order_by()));
    }
    if builder.keys().is_empty() {
        return None;
    }
    Some(key_terms(builder))
}

fn key_terms(builder: &SelectBuilder) -> Vec<(String, bool)> {
    builder
        .keys()
        .iter()
        .cloned()
        .zip(builder.key_descending().iter().copied())
        .collect()
}

/// The query as a subquery source, ordering dropped unless a row limit
/// depends on it.
fn without_order(builder: &SelectBuilder) -> SelectBuilder {
    let mut inner = builder.clone();
    if inner.limit().is_empty() && !inner.has_top() {
        inner.set_order_by("");
    }
    inner
}

/// Wraps the query as `SELECT <columns> FROM (...) Page_T0`, carrying its
/// order and keys outward under the names the wrapped query exposes them by.
fn wrap(builder: &SelectBuilder) -> SelectBuilder {
    let order = order_terms(builder.order_by());
    let mut terms = order.clone();
    terms.extend(key_terms(builder));

    let Exposed {
        inner,
        terms: outer,
        columns,
    } = expose(builder, &terms);
    let (outer_order, outer_keys) = outer.split_at(order.len());

    let mut wrapped = SelectBuilder::new(
        columns,
        format!("({}) {SOURCE_ALIAS}", without_order(&inner).render()),
    );
    wrapped.set_order_by(render_terms(outer_order, false));
    if !outer_keys.is_empty() {
        wrapped.set_keys(
            outer_keys.iter().map(|(key, _)| key.clone()).collect(),
            builder.key_descending().to_vec(),
            builder.key_is_identity(),
        );
    }
    wrapped
}

/// The query itself when it is a plain projection, otherwise wrapped.
fn simple_source(builder: &SelectBuilder) -> SelectBuilder {
    if builder.is_simple() {
        builder.clone()
    } else {
        wrap(builder)
    }
}

/// A query prepared to be ordered from one level up.
struct Exposed {
    /// The query, plus a hidden column for each order expression it does
    /// not project.
    inner: SelectBuilder,
    /// The order terms as the outer level spells them.
    terms: Vec<(String, bool)>,
    /// What the outer level selects to hide the extra columns again.
    columns: String,
}

fn expose(builder: &SelectBuilder, terms: &[(String, bool)]) -> Exposed {
    let items = projection(builder.columns());
    let mut hidden: Vec<(String, String)> = Vec::new();
    let outer: Vec<(String, bool)> = terms
        .iter()
        .map(|(expr, descending)| {
            let name = outer_name(&items, expr).unwrap_or_else(|| hidden_alias(&mut hidden, expr));
            (name, *descending)
        })
        .collect();

    let mut inner = builder.clone();
    let mut columns = "*".to_string();
    if !hidden.is_empty() {
        let extra: Vec<String> = hidden
            .iter()
            .map(|(expr, alias)| format!("{expr} AS {alias}"))
            .collect();
        inner.set_columns(format!("{}, {}", builder.columns(), extra.join(", ")));
        if let Some(visible) = visible_columns(&items) {
            columns = visible;
        }
    }
    Exposed {
        inner,
        terms: outer,
        columns,
    }
}

fn hidden_alias(hidden: &mut Vec<(String, String)>, expr: &str) -> String {
    if let Some((_, alias)) = hidden.iter().find(|(e, _)| e.eq_ignore_ascii_case(expr)) {
        return alias.clone();
    }
    let alias = format!("{HIDDEN_ALIAS}{}", hidden.len());
    hidden.push((expr.to_string(), alias.clone()));
    alias
}

/// The name a subquery exposes `expr` under, if it projects it.
fn outer_name(items: &[Projected], expr: &str) -> Option<String> {
    let reference = is_reference(&tokenize(expr));
    let column = unqualify(expr);
    items
        .iter()
        .find_map(|item| {
            let name = item.name.as_deref()?;
            let found = same_name(name, expr)
                || item.expr.eq_ignore_ascii_case(expr)
                || (reference && !item.aliased && same_name(name, &column));
            found.then(|| name.to_string())
        })
        .or_else(|| (reference && items.iter().any(|item| item.star)).then_some(column))
}

/// The expression behind `expr` when it names a projection alias.
fn aliased_expression(items: &[Projected], expr: &str) -> String {
    items
        .iter()
        .find(|item| item.aliased && item.name.as_deref().is_some_and(|n| same_name(n, expr)))
        .map_or_else(|| expr.to_string(), |item| item.expr.clone())
}

/// The output names of a projection, or `None` when one is unknown.
fn visible_columns(items: &[Projected]) -> Option<String> {
    items
        .iter()
        .map(|item| if item.star { None } else { item.name.clone() })
        .collect::<Option<Vec<_>>>()
        .map(|names| names.join(", "))
}

/// One item of a projection list.
#[derive(Debug, PartialEq, Eq)]
struct Projected {
    /// The expression, alias removed.
    expr: String,
    /// The name the item is exposed under, when it has one.
    name: Option<String>,
    aliased: bool,
    /// `*` or `T.*`.
    star: bool,
}

/// Splits a projection into items, skipping a `DISTINCT` or `TOP n` prefix.
fn projection(columns: &str) -> Vec<Projected> {
    let tokens = tokenize(columns);
    let mut start = 0;
    if tokens
        .first()
        .is_some_and(|t| t.is_keyword(columns, "DISTINCT") || t.is_keyword(columns, "ALL"))
    {
        start = 1;
    }
    if tokens.get(start).is_some_and(|t| t.is_keyword(columns, "TOP")) {
        start += 1;
        if tokens.get(start).is_some_and(|t| t.kind == TokenKind::OpenParen) {
            while tokens
                .get(start)
                .is_some_and(|t| !(t.kind == TokenKind::CloseParen && t.depth == 0))
            {
                start += 1;
            }
        }
        start += 1;
        if tokens.get(start).is_some_and(|t| t.is_keyword(columns, "PERCENT")) {
            start += 1;
        }
    }
    tokens
        .get(start..)
        .unwrap_or_default()
        .split(|t| t.kind == TokenKind::Comma && t.depth == 0)
        .filter(|item| !item.is_empty())
        .map(|item| projected(columns, item))
        .collect()
}

fn projected(input: &str, item: &[Token]) -> Projected {
    let text = |tokens: &[Token]| join_tokens(input, tokens);
    let is_name = |t: &Token| matches!(t.kind, TokenKind::Word | TokenKind::Quoted);
    let plain = |name: Option<String>, aliased: bool, expr: &[Token]| Projected {
        expr: text(expr),
        name,
        aliased,
        star: false,
    };

    match item {
        [.., before, last] if last.text(input) == "*" && before.kind == TokenKind::Dot => Projected {
            expr: text(item),
            name: None,
            aliased: false,
            star: true,
        },
        [last] if last.text(input) == "*" => Projected {
            expr: text(item),
            name: None,
            aliased: false,
            star: true,
        },
        [expr @ .., as_kw, alias] if !expr.is_empty() && as_kw.is_keyword(input, "AS") && is_name(alias) => {
            plain(Some(text(&[*alias])), true, expr)
        }
        _ if is_reference(item) => plain(Some(unqualify(&text(item))), false, item),
        [.., before, alias]
            if is_name(alias)
                && !alias.is_keyword(input, "END")
                && matches!(
                    before.kind,
                    TokenKind::Word | TokenKind::Quoted | TokenKind::CloseParen | TokenKind::Str | TokenKind::Number
                ) =>
        {
            plain(Some(text(&[*alias])), true, &item[..item.len() - 1])
        }
        _ => plain(None, false, item),
    }
}

/// A column reference: names joined by dots.
fn is_reference(tokens: &[Token]) -> bool {
    tokens.len() % 2 == 1
        && tokens.iter().enumerate().all(|(i, t)| {
            if i % 2 == 0 {
                matches!(t.kind, TokenKind::Word | TokenKind::Quoted)
            } else {
                t.kind == TokenKind::Dot
            }
        })
}

fn same_name(a: &str, b: &str) -> bool {
    let bare = |name: &str| name.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']')).to_string();
    bare(a).eq_ignore_ascii_case(&bare(b))
}

/// Renders order terms, optionally with every direction reversed.
fn render_terms(terms: &[(String, bool)], reversed: bool) -> String {
    terms
        .iter()
        .map(|(expr, descending)| match (descending, reversed) {
            (false, false) => expr.clone(),
            (true, false) | (false, true) => format!("{expr} DESC"),
            (true, true) => format!("{expr} ASC"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Prefixes a column list with `TOP n`, after `DISTINCT` when present.
fn with_top(columns: &str, rows: u64) -> String {
    let tokens = tokenize(columns);
    match tokens.first() {
        Some(first) if first.is_keyword(columns, "DISTINCT") => {
            format!("DISTINCT TOP {rows} {}", columns[first.end..].trim())
        }
        _ => format!("TOP {rows} {columns}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;

    fn select(sql: &str) -> SelectBuilder {
        SelectBuilder::from_sql(sql).unwrap()
    }

    fn keyed(sql: &str, key: &str) -> SelectBuilder {
        let mut builder = select(sql);
        builder.set_key_spec(key);
        builder
    }

    #[test]
    fn first_page_uses_top_or_limit() {
        let q = select("SELECT DISTINCT a FROM T ORDER BY a");
        assert_eq!(
            first_page(DialectKind::SqlServer.dialect(), &q, 10).render(),
            "SELECT DISTINCT TOP 10 a FROM T ORDER BY a"
        );
        assert_eq!(
            first_page(DialectKind::Sqlite.dialect(), &q, 10).render(),
            "SELECT DISTINCT a FROM T ORDER BY a LIMIT 10"
        );
    }

    #[test]
    fn first_page_wraps_an_existing_top() {
        let q = select("SELECT TOP 50 a FROM T ORDER BY T.a DESC");
        assert_eq!(
            first_page(DialectKind::SqlServer.dialect(), &q, 10).render(),
            "SELECT TOP 10 * FROM (SELECT TOP 50 a FROM T ORDER BY T.a DESC) Page_T0 ORDER BY a DESC"
        );
    }

    #[test]
    fn limit_offset_wraps_an_existing_limit() {
        let q = select("SELECT a FROM T ORDER BY a LIMIT 100");
        assert_eq!(
            limit_offset(DialectKind::Sqlite.dialect(), &q, &PageRequest::new(20, 10)).render(),
            "SELECT * FROM (SELECT a FROM T ORDER BY a LIMIT 100) Page_T0 ORDER BY a LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn row_number_windows_the_order() {
        let q = select("SELECT a, b FROM T WHERE a > 1 ORDER BY T.b DESC");
        assert_eq!(
            row_number(&q, &PageRequest::new(20, 10)).unwrap().render(),
            "SELECT * FROM (SELECT a, b, ROW_NUMBER() OVER (ORDER BY T.b DESC) AS RowNumber \
             FROM T WHERE a > 1) Page_T0 WHERE RowNumber BETWEEN 21 AND 30 ORDER BY RowNumber"
        );
        let to_end = row_number(&q, &PageRequest::new(20, 0)).unwrap().render();
        assert!(to_end.ends_with("WHERE RowNumber >= 21 ORDER BY RowNumber"));
    }

    #[test]
    fn row_number_sees_unselected_order_columns() {
        let q = select("SELECT Name FROM T ORDER BY Id");
        assert_eq!(
            row_number(&q, &PageRequest::new(5, 5)).unwrap().render(),
            "SELECT * FROM (SELECT Name, ROW_NUMBER() OVER (ORDER BY Id) AS RowNumber FROM T) Page_T0 \
             WHERE RowNumber BETWEEN 6 AND 10 ORDER BY RowNumber"
        );
    }

    #[test]
    fn row_number_resolves_aliases() {
        let q = select("SELECT Name AS N FROM T ORDER BY N DESC");
        let paged = row_number(&q, &PageRequest::new(5, 5)).unwrap().render();
        assert!(paged.contains("SELECT Name AS N, ROW_NUMBER() OVER (ORDER BY Name DESC) AS RowNumber FROM T"));
    }

    #[test]
    fn row_number_wraps_grouped_queries() {
        let q = select("SELECT Code, COUNT(*) AS N FROM T GROUP BY Code ORDER BY N DESC");
        assert_eq!(
            row_number(&q, &PageRequest::new(0, 10)).unwrap().render(),
            "SELECT * FROM (SELECT *, ROW_NUMBER() OVER (ORDER BY N DESC) AS RowNumber \
             FROM (SELECT Code, COUNT(*) AS N FROM T GROUP BY Code) Page_T0) Page_T1 \
             WHERE RowNumber BETWEEN 1 AND 10 ORDER BY RowNumber"
        );
    }

    #[test]
    fn bounds_saturate_near_the_top_of_the_range() {
        let q = select("SELECT a FROM T ORDER BY a");
        let max = u64::MAX;
        let paged = row_number(&q, &PageRequest::new(max, 10)).unwrap().render();
        assert!(paged.contains(&format!("RowNumber BETWEEN {max} AND {max}")));
        let paged = double_top(&q, &PageRequest::new(max - 1, 10)).unwrap().render();
        assert!(paged.contains(&format!("SELECT TOP {max} a FROM T")));
    }

    #[test]
    fn wrapping_keeps_unselected_order_columns_reachable() {
        let q = select("SELECT Name FROM T ORDER BY Id LIMIT 20");
        assert_eq!(
            limit_offset(DialectKind::Sqlite.dialect(), &q, &PageRequest::new(5, 5)).render(),
            "SELECT Name FROM (SELECT Name, Id AS Page_K0 FROM T ORDER BY Id LIMIT 20) Page_T0 \
             ORDER BY Page_K0 LIMIT 5 OFFSET 5"
        );

        let aliased = select("SELECT TOP 50 Name AS N FROM T ORDER BY N DESC");
        assert_eq!(
            first_page(DialectKind::SqlServer.dialect(), &aliased, 10).render(),
            "SELECT TOP 10 * FROM (SELECT TOP 50 Name AS N FROM T ORDER BY N DESC) Page_T0 ORDER BY N DESC"
        );
    }

    #[test]
    fn projection_items() {
        let items = projection("DISTINCT TOP (5) T.a, b AS [B], COUNT(*) c, T.*, x + 1");
        let names: Vec<_> = items.iter().map(|i| i.name.as_deref()).collect();
        assert_eq!(names, [Some("a"), Some("[B]"), Some("c"), None, None]);
        assert!(items[3].star);
        assert_eq!(items[2].expr, "COUNT(*)");
        assert!(items[1].aliased && !items[0].aliased);
    }

    #[test]
    fn row_number_falls_back_to_keys() {
        let q = keyed("SELECT a FROM T", "Id");
        let paged = row_number(&q, &PageRequest::new(5, 5)).unwrap().render();
        assert!(paged.contains("OVER (ORDER BY Id)"));

        assert_eq!(
            row_number(&select("SELECT a FROM T"), &PageRequest::new(5, 5)),
            Err(PageError::MissingKey {
                strategy: PageStrategy::RowNumber
            })
        );
    }

    #[test]
    fn max_min_descending_uses_min() {
        let q = keyed("SELECT * FROM T WHERE a = 1 OR b = 2", "Id desc");
        assert_eq!(
            max_min(&q, &PageRequest::new(10, 5)).unwrap().render(),
            "SELECT TOP 5 * FROM T WHERE (a = 1 OR b = 2) AND Id < (SELECT MIN(Id) FROM \
             (SELECT TOP 10 Id FROM T WHERE a = 1 OR b = 2 ORDER BY Id DESC) Page_T1) ORDER BY Id DESC"
        );
    }

    #[test]
    fn max_min_requires_identity() {
        let q = keyed("SELECT * FROM T", "Id");
        assert_eq!(
            max_min(&q, &PageRequest::new(10, 5)),
            Err(PageError::MissingKey {
                strategy: PageStrategy::MaxMin
            })
        );
    }

    #[test]
    fn double_top_reverses_the_order() {
        let q = select("SELECT a, b FROM T ORDER BY T.a, b DESC");
        assert_eq!(
            double_top(&q, &PageRequest::new(20, 10)).unwrap().render(),
            "SELECT * FROM (SELECT TOP 10 * FROM (SELECT TOP 30 a, b FROM T ORDER BY T.a, b DESC) Page_T0 \
             ORDER BY a DESC, b ASC) Page_T1 ORDER BY a, b DESC"
        );
    }

    #[test]
    fn double_top_carries_unselected_order_columns() {
        let q = select("SELECT Name FROM T ORDER BY Id");
        assert_eq!(
            double_top(&q, &PageRequest::new(20, 10)).unwrap().render(),
            "SELECT Name FROM (SELECT TOP 10 * FROM (SELECT TOP 30 Name, Id AS Page_K0 FROM T ORDER BY Id) Page_T0 \
             ORDER BY Page_K0 DESC) Page_T1 ORDER BY Page_K0"
        );
    }

    #[test]
    fn double_top_trims_the_last_page() {
        let q = select("SELECT a FROM T ORDER BY a");
        let request = PageRequest::new(20, 10).with_total_rows(25);
        let paged = double_top(&q, &request).unwrap().render();
        assert!(paged.contains("SELECT TOP 5 * FROM (SELECT TOP 30 a FROM T ORDER BY a) Page_T0"));
    }

    #[test]
    fn double_top_preconditions() {
        let unordered = select("SELECT a FROM T");
        assert_eq!(
            double_top(&unordered, &PageRequest::new(20, 10)),
            Err(PageError::MissingKey {
                strategy: PageStrategy::DoubleTop
            })
        );
        let ordered = select("SELECT a FROM T ORDER BY a");
        assert_eq!(
            double_top(&ordered, &PageRequest::new(20, 0)),
            Err(PageError::Unbounded {
                strategy: PageStrategy::DoubleTop
            })
        );
    }

    #[test]
    fn not_in_keeps_an_explicit_order() {
        let q = keyed("SELECT * FROM T WHERE Active = 1 ORDER BY Name", "Code unknown");
        assert_eq!(
            not_in(&q, &PageRequest::new(20, 0)).unwrap().render(),
            "SELECT * FROM T WHERE Active = 1 AND Code NOT IN \
             (SELECT TOP 20 Code FROM T WHERE Active = 1 ORDER BY Name) ORDER BY Name"
        );
    }

    #[test]
    fn not_in_wraps_grouped_queries() {
        let q = keyed("SELECT Code, COUNT(*) AS N FROM T GROUP BY Code", "Code");
        let paged = not_in(&q, &PageRequest::new(10, 10)).unwrap().render();
        assert_eq!(
            paged,
            "SELECT TOP 10 * FROM (SELECT Code, COUNT(*) AS N FROM T GROUP BY Code) Page_T0 \
             WHERE Code NOT IN (SELECT TOP 10 Code FROM (SELECT Code, COUNT(*) AS N FROM T GROUP BY Code) Page_T0 \
             ORDER BY Code) ORDER BY Code"
        );
    }

    #[test]
    fn not_in_requires_one_key() {
        let q = select("SELECT * FROM T ORDER BY a, b");
        assert_eq!(
            not_in(&q, &PageRequest::new(10, 10)),
            Err(PageError::MissingKey {
                strategy: PageStrategy::NotIn
            })
        );
    }
}

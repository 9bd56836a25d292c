//! Structured `SELECT` statements.
//!
//! [`SelectBuilder`] holds one `SELECT` as a set of clause strings. It can be
//! filled from SQL text with [`SelectBuilder::parse`], edited field by field,
//! and rendered back with [`SelectBuilder::render`]. Rendering is
//! round-trip-stable: parsing a rendered statement yields the same state.
//!
//! The builder also tracks the ordering key the pagination strategies rely
//! on. Unless keys were set explicitly, they follow the `ORDER BY` clause.

pub(crate) mod scanner;

use std::fmt;

use scanner::{TokenKind, find_keywords, join_tokens, tokenize};

/// Clause markers in the order they must appear.
const CLAUSES: [(Clause, &[&str]); 7] = [
    (Clause::From, &["FROM"]),
    (Clause::Where, &["WHERE"]),
    (Clause::GroupBy, &["GROUP", "BY"]),
    (Clause::Having, &["HAVING"]),
    (Clause::OrderBy, &["ORDER", "BY"]),
    (Clause::Limit, &["LIMIT"]),
    (Clause::Limit, &["OFFSET"]),
];

/// Top-level keywords that make a statement compound.
const SET_OPERATORS: [&str; 3] = ["UNION", "INTERSECT", "EXCEPT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Clause {
    Columns,
    From,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
}

/// One `SELECT` statement split into clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectBuilder {
    columns: String,
    table: String,
    where_clause: String,
    group_by: String,
    having: String,
    order_by: String,
    limit: String,
    keys: Vec<String>,
    key_descending: Vec<bool>,
    key_is_identity: bool,
    explicit_keys: bool,
}

impl SelectBuilder {
    /// Creates `SELECT <columns> FROM <table>`.
    #[must_use]
    pub fn new(columns: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            columns: columns.into().trim().to_string(),
            table: table.into().trim().to_string(),
            ..Self::default()
        }
    }

    /// Parses `sql` into a new builder, or returns `None` when the text is
    /// not a single plain `SELECT`.
    #[must_use]
    pub fn from_sql(sql: &str) -> Option<Self> {
        let mut builder = Self::default();
        builder.parse(sql).then_some(builder)
    }

    /// Replaces the clauses of this builder with those parsed from `sql`.
    ///
    /// Accepts `SELECT … FROM … [WHERE …] [GROUP BY …] [HAVING …]
    /// [ORDER BY …] [LIMIT …|OFFSET …]`, where any clause may contain
    /// parenthesised subqueries. Returns `false` and leaves the builder
    /// untouched for anything else, including compound statements and
    /// multiple statements.
    pub fn parse(&mut self, sql: &str) -> bool {
        let Some(parts) = split_clauses(sql) else {
            return false;
        };
        self.columns = parts.columns;
        self.table = parts.table;
        self.where_clause = normalize_where(&parts.where_clause);
        self.group_by = parts.group_by;
        self.having = parts.having;
        self.limit = parts.limit;
        self.set_order_by(parts.order_by);
        true
    }

    /// Renders the statement, omitting empty clauses.
    #[must_use]
    pub fn render(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.columns, self.table);
        for (keyword, value) in [
            ("WHERE", &self.where_clause),
            ("GROUP BY", &self.group_by),
            ("HAVING", &self.having),
            ("ORDER BY", &self.order_by),
        ] {
            if !value.is_empty() {
                sql.push(' ');
                sql.push_str(keyword);
                sql.push(' ');
                sql.push_str(value);
            }
        }
        if !self.limit.is_empty() {
            sql.push(' ');
            sql.push_str(&self.limit);
        }
        sql
    }

    /// Projection list, including any `DISTINCT` or `TOP` prefix.
    #[must_use]
    pub fn columns(&self) -> &str {
        &self.columns
    }

    /// `FROM` source, including joins.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// `WHERE` predicate without the keyword.
    #[must_use]
    pub fn where_clause(&self) -> &str {
        &self.where_clause
    }

    #[must_use]
    pub fn group_by(&self) -> &str {
        &self.group_by
    }

    #[must_use]
    pub fn having(&self) -> &str {
        &self.having
    }

    #[must_use]
    pub fn order_by(&self) -> &str {
        &self.order_by
    }

    /// Trailing `LIMIT`/`OFFSET` clause, keyword included.
    #[must_use]
    pub fn limit(&self) -> &str {
        &self.limit
    }

    /// Ordering key columns.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Direction of each key, `true` for descending.
    #[must_use]
    pub fn key_descending(&self) -> &[bool] {
        &self.key_descending
    }

    /// Whether the single key is a monotonic integer identity.
    #[must_use]
    pub const fn key_is_identity(&self) -> bool {
        self.key_is_identity
    }

    pub fn set_columns(&mut self, columns: impl Into<String>) {
        self.columns = columns.into().trim().to_string();
    }

    pub fn set_table(&mut self, table: impl Into<String>) {
        self.table = table.into().trim().to_string();
    }

    /// Sets the `WHERE` predicate.
    ///
    /// A leading `WHERE` keyword is dropped and `1=1` becomes empty. A
    /// top-level `GROUP BY` or `HAVING` inside the text is moved into its own
    /// clause.
    pub fn set_where(&mut self, predicate: impl Into<String>) {
        let predicate = predicate.into();
        let tokens = tokenize(&predicate);
        let body = match tokens.first() {
            Some(first) if first.is_keyword(&predicate, "WHERE") => &tokens[1..],
            _ => &tokens[..],
        };

        let group = find_keywords(&predicate, body, &["GROUP", "BY"]);
        let having = find_keywords(&predicate, body, &["HAVING"]);
        let where_end = [group, having].into_iter().flatten().min().unwrap_or(body.len());
        self.where_clause = normalize_where(&join_tokens(&predicate, &body[..where_end]));

        if let Some(start) = group {
            let end = having.filter(|h| *h > start).unwrap_or(body.len());
            self.group_by = join_tokens(&predicate, &body[start + 2..end]);
        }
        if let Some(start) = having {
            self.having = join_tokens(&predicate, &body[start + 1..]);
        }
    }

    pub fn set_group_by(&mut self, group_by: impl Into<String>) {
        self.group_by = group_by.into().trim().to_string();
    }

    pub fn set_having(&mut self, having: impl Into<String>) {
        self.having = having.into().trim().to_string();
    }

    /// Sets the `ORDER BY` list. Unless keys were set explicitly, the keys
    /// are re-derived from it.
    pub fn set_order_by(&mut self, order_by: impl Into<String>) {
        self.order_by = order_by.into().trim().to_string();
        if !self.explicit_keys {
            let (keys, descending) = order_keys(&self.order_by);
            self.keys = keys;
            self.key_descending = descending;
            self.key_is_identity = false;
        }
    }

    /// Sets the trailing `LIMIT`/`OFFSET` clause, keyword included.
    pub fn set_limit(&mut self, limit: impl Into<String>) {
        self.limit = limit.into().trim().to_string();
    }

    /// Sets a single explicit ordering key from `"<column> [asc|desc|unknown]"`.
    ///
    /// An `asc` or `desc` suffix declares the key a monotonic integer
    /// identity in that direction. A bare name or an `unknown` suffix keeps
    /// the key but disables strategies that depend on identity ordering.
    pub fn set_key_spec(&mut self, spec: &str) {
        let spec = spec.trim();
        let (name, suffix) = match spec.rsplit_once(char::is_whitespace) {
            Some((name, suffix)) => (name.trim(), suffix.to_ascii_lowercase()),
            None => (spec, String::new()),
        };
        let (name, descending, identity) = match suffix.as_str() {
            "asc" => (name, false, true),
            "desc" => (name, true, true),
            "unknown" => (name, false, false),
            _ => (spec, false, false),
        };
        self.set_keys(vec![name.to_string()], vec![descending], identity);
    }

    /// Sets the ordering keys explicitly. They no longer follow `ORDER BY`.
    pub fn set_keys(&mut self, keys: Vec<String>, descending: Vec<bool>, identity: bool) {
        let mut descending = descending;
        descending.resize(keys.len(), false);
        self.keys = keys;
        self.key_descending = descending;
        self.key_is_identity = identity;
        self.explicit_keys = true;
    }

    /// Returns `true` when `columns` carries a `DISTINCT` prefix.
    #[must_use]
    pub fn is_distinct(&self) -> bool {
        tokenize(&self.columns)
            .first()
            .is_some_and(|t| t.is_keyword(&self.columns, "DISTINCT"))
    }

    /// Returns `true` when `columns` already carries a `TOP` prefix.
    #[must_use]
    pub fn has_top(&self) -> bool {
        let tokens = tokenize(&self.columns);
        tokens
            .iter()
            .take(2)
            .any(|t| t.is_keyword(&self.columns, "TOP"))
    }

    /// Returns `true` for a plain projection over a source: no grouping, no
    /// row limit of its own.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.group_by.is_empty() && self.having.is_empty() && self.limit.is_empty() && !self.has_top()
    }

    /// Derives a query that counts the rows this one returns.
    ///
    /// Grouped, distinct or limited queries are wrapped as a subquery so the
    /// count reflects their row semantics.
    #[must_use]
    pub fn select_count(&self) -> Self {
        if self.is_simple() && !self.is_distinct() {
            let mut count = self.clone();
            count.columns = "COUNT(*)".to_string();
            count.order_by.clear();
            count.clear_derived_keys();
            return count;
        }
        let mut inner = self.clone();
        if inner.limit.is_empty() && !inner.has_top() {
            inner.order_by.clear();
        }
        Self::new("COUNT(*)", format!("({}) Count_T0", inner.render()))
    }

    /// Appends `fragment` to the `WHERE` predicate with `AND`.
    ///
    /// Either side is parenthesised when it contains a top-level `OR`.
    pub fn append_where_and(&mut self, fragment: &str) {
        let fragment = normalize_where(fragment);
        if fragment.is_empty() {
            return;
        }
        if self.where_clause.is_empty() {
            self.where_clause = fragment;
            return;
        }
        self.where_clause = format!(
            "{} AND {}",
            parenthesize_or(&self.where_clause),
            parenthesize_or(&fragment)
        );
    }

    fn clear_derived_keys(&mut self) {
        if !self.explicit_keys {
            self.keys.clear();
            self.key_descending.clear();
        }
    }
}

impl fmt::Display for SelectBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Splits one `ORDER BY` term into its expression and direction.
pub(crate) fn split_order_term(term: &str) -> (String, bool) {
    let tokens = tokenize(term);
    match tokens.last() {
        Some(last) if last.is_keyword(term, "DESC") => {
            (join_tokens(term, &tokens[..tokens.len() - 1]), true)
        }
        Some(last) if last.is_keyword(term, "ASC") => {
            (join_tokens(term, &tokens[..tokens.len() - 1]), false)
        }
        _ => (join_tokens(term, &tokens), false),
    }
}

fn order_keys(order_by: &str) -> (Vec<String>, Vec<bool>) {
    scanner::split_top_level(order_by)
        .iter()
        .map(|term| split_order_term(term))
        .filter(|(name, _)| !name.is_empty())
        .unzip()
}

fn normalize_where(predicate: &str) -> String {
    let trimmed = predicate.trim();
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if compact == "1=1" {
        String::new()
    } else {
        trimmed.to_string()
    }
}

fn parenthesize_or(predicate: &str) -> String {
    if scanner::contains_top_level(predicate, "OR") {
        format!("({predicate})")
    } else {
        predicate.to_string()
    }
}

#[derive(Default)]
struct ClauseParts {
    columns: String,
    table: String,
    where_clause: String,
    group_by: String,
    having: String,
    order_by: String,
    limit: String,
}

fn split_clauses(sql: &str) -> Option<ClauseParts> {
    let mut tokens = tokenize(sql);
    if !scanner::is_well_formed(&tokens) {
        return None;
    }
    if tokens.last().is_some_and(|t| t.kind == TokenKind::Semicolon) {
        tokens.pop();
    }
    if tokens.iter().any(|t| t.kind == TokenKind::Semicolon) {
        return None;
    }
    if !tokens.first().is_some_and(|t| t.is_keyword(sql, "SELECT")) {
        return None;
    }
    if tokens[1..]
        .iter()
        .any(|t| t.is_keyword(sql, "SELECT") || SET_OPERATORS.iter().any(|op| t.is_keyword(sql, op)))
    {
        return None;
    }

    // (clause, index of keyword token, index of first body token)
    let mut markers: Vec<(Clause, usize, usize)> = vec![(Clause::Columns, 0, 1)];
    let mut i = 1;
    while i < tokens.len() {
        let found = CLAUSES.iter().find(|(_, words)| {
            tokens.len() - i >= words.len()
                && words
                    .iter()
                    .enumerate()
                    .all(|(n, word)| tokens[i + n].is_keyword(sql, word))
        });
        match found {
            Some((clause, words)) => {
                let last = markers.last().map_or(Clause::Columns, |m| m.0);
                if *clause == Clause::Limit && last == Clause::Limit {
                    // OFFSET after LIMIT, or LIMIT after OFFSET, stays in one clause.
                    i += words.len();
                    continue;
                }
                if *clause <= last {
                    return None;
                }
                markers.push((*clause, i, i + words.len()));
                i += words.len();
            }
            None => i += 1,
        }
    }

    if markers.get(1).map(|m| m.0) != Some(Clause::From) {
        return None;
    }

    let mut parts = ClauseParts::default();
    for (n, &(clause, keyword, body)) in markers.iter().enumerate() {
        let end = markers.get(n + 1).map_or(tokens.len(), |m| m.1);
        let text = if clause == Clause::Limit {
            join_tokens(sql, &tokens[keyword..end])
        } else {
            join_tokens(sql, &tokens[body..end])
        };
        if body >= end {
            return None;
        }
        match clause {
            Clause::Columns => parts.columns = text,
            Clause::From => parts.table = text,
            Clause::Where => parts.where_clause = text,
            Clause::GroupBy => parts.group_by = text,
            Clause::Having => parts.having = text,
            Clause::OrderBy => parts.order_by = text,
            Clause::Limit => parts.limit = text,
        }
    }
    Some(parts)
}

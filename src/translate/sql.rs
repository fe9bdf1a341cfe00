use crate::types::{CompareOp, EmptyTarget, Expr, FieldRef, TextOp, Value};

use super::TranslateError;

const TARGET: &str = "SQL";
const LIKE_ESCAPE: char = '!';

/// SQL syntax differences that matter for a `WHERE` clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `"ident"` quoting, `$1` placeholders.
    #[default]
    Postgres,
    /// Backtick quoting, `?` placeholders.
    MySql,
    /// `"ident"` quoting, `?` placeholders.
    Sqlite,
}

impl Dialect {
    #[must_use]
    pub fn quote_identifier(self, ident: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
            Dialect::MySql => format!("`{}`", ident.replace('`', "``")),
        }
    }

    /// Placeholder for the parameter at zero-based `index`.
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", index + 1),
            Dialect::MySql | Dialect::Sqlite => "?".to_owned(),
        }
    }

    /// Calendar-day part of a timestamp column.
    #[must_use]
    pub fn date_of(self, column: &str) -> String {
        match self {
            Dialect::Postgres | Dialect::MySql => format!("CAST({column} AS DATE)"),
            Dialect::Sqlite => format!("DATE({column})"),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "PostgreSQL",
            Dialect::MySql => "MySQL",
            Dialect::Sqlite => "SQLite",
        }
    }
}

/// A rendered boolean SQL expression and the values bound to its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Render a condition as a parameterized SQL expression.
///
/// Field paths map to (qualified) column names. Map keys, indexer steps,
/// collection quantifiers and custom predicates have no SQL form.
///
/// # Errors
///
/// Returns [`TranslateError::Unsupported`] for those constructs.
pub fn to_sql(expr: &Expr, dialect: Dialect) -> Result<SqlFragment, TranslateError> {
    render(expr, dialect, 0)
}

fn render(expr: &Expr, dialect: Dialect, offset: usize) -> Result<SqlFragment, TranslateError> {
    let mut r = Renderer {
        sql: String::new(),
        params: Vec::new(),
        dialect,
        offset,
    };
    r.expr(expr)?;
    Ok(SqlFragment {
        sql: r.sql,
        params: r.params,
    })
}

struct Renderer {
    sql: String,
    params: Vec<Value>,
    dialect: Dialect,
    offset: usize,
}

impl Renderer {
    fn add_param(&mut self, value: Value) {
        let index = self.offset + self.params.len();
        self.sql.push_str(&self.dialect.placeholder(index));
        self.params.push(value);
    }

    fn column(&mut self, field: &FieldRef, expr: &Expr) -> Result<(), TranslateError> {
        if field.path.is_element() {
            return Err(TranslateError::unsupported(TARGET, "a collection element", expr));
        }
        let Some(names) = field.path.member_names() else {
            return Err(TranslateError::unsupported(TARGET, "a map key or indexer step", expr));
        };
        let quoted: Vec<String> = names
            .iter()
            .map(|name| self.dialect.quote_identifier(name))
            .collect();
        let column = quoted.join(".");
        if field.fold_case {
            self.sql.push_str("LOWER(");
            self.sql.push_str(&column);
            self.sql.push(')');
        } else if field.day_only {
            self.sql.push_str(&self.dialect.date_of(&column));
        } else {
            self.sql.push_str(&column);
        }
        Ok(())
    }

    fn joined(&mut self, children: &[Expr], sep: &str, empty: bool) -> Result<(), TranslateError> {
        if children.is_empty() {
            self.sql.push_str(if empty { "(1 = 1)" } else { "(1 = 0)" });
            return Ok(());
        }
        self.sql.push('(');
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(sep);
            }
            self.expr(child)?;
        }
        self.sql.push(')');
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), TranslateError> {
        match expr {
            Expr::Constant(true) => self.sql.push_str("(1 = 1)"),
            Expr::Constant(false) => self.sql.push_str("(1 = 0)"),
            Expr::And(children) => self.joined(children, " AND ", true)?,
            Expr::Or(children) => self.joined(children, " OR ", false)?,
            Expr::Not(inner) => {
                // NULL comparisons count as false, as they do in memory.
                self.sql.push_str("(NOT COALESCE(");
                self.expr(inner)?;
                self.sql.push_str(", FALSE))");
            }
            Expr::Compare { field, op, value } => {
                self.sql.push('(');
                self.column(field, expr)?;
                self.sql.push_str(match op {
                    CompareOp::Eq => " = ",
                    CompareOp::Neq => " <> ",
                    CompareOp::Gt => " > ",
                    CompareOp::Gte => " >= ",
                    CompareOp::Lt => " < ",
                    CompareOp::Lte => " <= ",
                });
                self.add_param(value.clone());
                self.sql.push(')');
            }
            Expr::In { field, values } => {
                self.sql.push('(');
                self.column(field, expr)?;
                self.sql.push_str(" IN (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.sql.push_str(", ");
                    }
                    self.add_param(value.clone());
                }
                self.sql.push_str("))");
            }
            Expr::Between { field, low, high } => {
                self.sql.push('(');
                self.column(field, expr)?;
                self.sql.push_str(" BETWEEN ");
                self.add_param(low.clone());
                self.sql.push_str(" AND ");
                self.add_param(high.clone());
                self.sql.push(')');
            }
            Expr::Text { field, op, pattern } => {
                self.sql.push('(');
                self.column(field, expr)?;
                self.sql.push_str(" LIKE ");
                self.add_param(Value::String(like_pattern(*op, pattern)));
                self.sql.push_str(&format!(" ESCAPE '{LIKE_ESCAPE}')"));
            }
            Expr::IsNull { field } => {
                self.sql.push('(');
                self.column(field, expr)?;
                self.sql.push_str(" IS NULL)");
            }
            Expr::IsEmpty {
                field,
                target: EmptyTarget::Text,
            } => {
                self.sql.push('(');
                self.column(field, expr)?;
                self.sql.push_str(" IS NULL OR ");
                self.column(field, expr)?;
                self.sql.push_str(" = '')");
            }
            Expr::IsEmpty {
                target: EmptyTarget::Collection,
                ..
            } => {
                return Err(TranslateError::unsupported(TARGET, "a collection length test", expr));
            }
            Expr::Any { .. } => {
                return Err(TranslateError::unsupported(TARGET, "a collection quantifier", expr));
            }
            Expr::Predicate { .. } => {
                return Err(TranslateError::unsupported(TARGET, "a custom predicate", expr));
            }
        }
        Ok(())
    }
}

fn like_pattern(op: TextOp, needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    for c in needle.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    match op {
        TextOp::BeginsWith => format!("{escaped}%"),
        TextOp::Contains => format!("%{escaped}%"),
        TextOp::EndsWith => format!("%{escaped}"),
    }
}

/// A `SELECT` statement a filter is appended to as a `WHERE` clause.
///
/// ```
/// use rulefilter::translate::{Dialect, SqlQuery};
///
/// let query = SqlQuery::new("SELECT * FROM people", Dialect::Postgres);
/// assert_eq!(query.sql(), "SELECT * FROM people");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    sql: String,
    params: Vec<Value>,
    dialect: Dialect,
    has_where: bool,
}

impl SqlQuery {
    #[must_use]
    pub fn new(base: &str, dialect: Dialect) -> Self {
        Self {
            sql: base.trim_end().to_owned(),
            params: Vec::new(),
            dialect,
            has_where: false,
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Append a condition, joining any previous one with `AND`. A condition
    /// that is constantly true leaves the statement unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TranslateError`] if the condition has no SQL form.
    pub fn and_where(mut self, expr: &Expr) -> Result<Self, TranslateError> {
        if *expr == Expr::Constant(true) {
            return Ok(self);
        }
        let fragment = render(expr, self.dialect, self.params.len())?;
        self.sql
            .push_str(if self.has_where { " AND " } else { " WHERE " });
        self.sql.push_str(&fragment.sql);
        self.params.extend(fragment.params);
        self.has_where = true;
        Ok(self)
    }
}

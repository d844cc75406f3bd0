//! Tagged SQL statements and their compilation.
//!
//! Each terminal call on [`Database`](super::Database) produces exactly one
//! [`Statement`] variant, which compiles to a [`CompiledStatement`]: the SQL
//! text plus any bound values, depending on the [`ValueMode`].

use std::fmt;

use enum_dispatch::enum_dispatch;

use super::escape::{quote_literal, quote_verbatim};

/// How values are embedded in compiled SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueMode {
    /// `$n` placeholders with the values carried alongside the SQL.
    #[default]
    Bound,
    /// Single-quoted literals with embedded quotes doubled.
    Escaped,
    /// Single-quoted literals with no escaping at all. Injection-prone; only
    /// for reproducing the original framework's output.
    Verbatim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    CreateDatabase,
}

impl StatementKind {
    /// Whether the statement produces a row cursor.
    pub fn returns_rows(&self) -> bool {
        matches!(self, Self::Select)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::CreateTable => "CREATE TABLE",
            Self::CreateDatabase => "CREATE DATABASE",
        };
        f.write_str(name)
    }
}

/// One `field = value` equality predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub value: String,
}

impl Condition {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Column list of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fields {
    #[default]
    All,
    List(Vec<String>),
}

impl From<&str> for Fields {
    fn from(fields: &str) -> Self {
        if fields.trim() == "*" {
            Self::All
        } else {
            Self::List(vec![fields.to_string()])
        }
    }
}

impl From<Vec<String>> for Fields {
    fn from(fields: Vec<String>) -> Self {
        Self::List(fields)
    }
}

impl From<Vec<&str>> for Fields {
    fn from(fields: Vec<&str>) -> Self {
        Self::List(fields.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Fields {
    fn from(fields: [&str; N]) -> Self {
        Self::List(fields.into_iter().map(str::to_string).collect())
    }
}

/// Collects values while rendering, according to a [`ValueMode`].
#[derive(Debug)]
pub struct Literals {
    mode: ValueMode,
    params: Vec<String>,
}

impl Literals {
    pub fn new(mode: ValueMode) -> Self {
        Self {
            mode,
            params: Vec::new(),
        }
    }

    /// Render a value, returning the SQL fragment standing in for it.
    pub fn push(&mut self, value: &str) -> String {
        match self.mode {
            ValueMode::Bound => {
                self.params.push(value.to_string());
                format!("${}", self.params.len())
            }
            ValueMode::Escaped => quote_literal(value),
            ValueMode::Verbatim => quote_verbatim(value),
        }
    }

    pub fn into_params(self) -> Vec<String> {
        self.params
    }
}

/// Rendering behavior shared by every statement variant.
#[enum_dispatch]
pub trait Render {
    fn kind(&self) -> StatementKind;

    /// Render the SQL text, pushing values through `literals`.
    fn render(&self, literals: &mut Literals) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: String,
    pub fields: Fields,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    pub table: String,
    /// `None` for positional rows, which omit the column list.
    pub columns: Option<Vec<String>>,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, String)>,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub table: String,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub table: String,
    /// Column name → type definition, in declaration order.
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDatabase {
    pub name: String,
}

#[enum_dispatch(Render)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    CreateDatabase,
}

impl Statement {
    pub fn compile(&self, mode: ValueMode) -> CompiledStatement {
        let mut literals = Literals::new(mode);
        let sql = self.render(&mut literals);
        CompiledStatement {
            kind: self.kind(),
            sql,
            params: literals.into_params(),
        }
    }
}

/// SQL text ready to send, plus the values for its placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<String>,
}

impl fmt::Display for CompiledStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// ` WHERE a = x AND b = y`, or nothing when there are no conditions.
fn where_clause(conditions: &[Condition], literals: &mut Literals) -> String {
    if conditions.is_empty() {
        return String::new();
    }
    let predicates: Vec<String> = conditions
        .iter()
        .map(|c| format!("{} = {}", c.field, literals.push(&c.value)))
        .collect();
    format!(" WHERE {}", predicates.join(" AND "))
}

impl Render for Select {
    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }

    fn render(&self, literals: &mut Literals) -> String {
        let fields = match &self.fields {
            Fields::All => "*".to_string(),
            Fields::List(list) => list.join(", "),
        };
        format!(
            "SELECT {} FROM {}{}",
            fields,
            self.table,
            where_clause(&self.conditions, literals)
        )
    }
}

impl Render for Insert {
    fn kind(&self) -> StatementKind {
        StatementKind::Insert
    }

    fn render(&self, literals: &mut Literals) -> String {
        let values: Vec<String> = self.values.iter().map(|v| literals.push(v)).collect();
        match &self.columns {
            Some(columns) => format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                columns.join(", "),
                values.join(", ")
            ),
            None => format!("INSERT INTO {} VALUES ({})", self.table, values.join(", ")),
        }
    }
}

impl Render for Update {
    fn kind(&self) -> StatementKind {
        StatementKind::Update
    }

    fn render(&self, literals: &mut Literals) -> String {
        let assignments: Vec<String> = self
            .assignments
            .iter()
            .map(|(field, value)| format!("{} = {}", field, literals.push(value)))
            .collect();
        format!(
            "UPDATE {} SET {}{}",
            self.table,
            assignments.join(", "),
            where_clause(&self.conditions, literals)
        )
    }
}

impl Render for Delete {
    fn kind(&self) -> StatementKind {
        StatementKind::Delete
    }

    fn render(&self, literals: &mut Literals) -> String {
        format!(
            "DELETE FROM {}{}",
            self.table,
            where_clause(&self.conditions, literals)
        )
    }
}

impl Render for CreateTable {
    fn kind(&self) -> StatementKind {
        StatementKind::CreateTable
    }

    fn render(&self, _literals: &mut Literals) -> String {
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(name, definition)| format!("{} {}", name, definition))
            .collect();
        format!("CREATE TABLE {} ({})", self.table, fields.join(", "))
    }
}

impl Render for CreateDatabase {
    fn kind(&self) -> StatementKind {
        StatementKind::CreateDatabase
    }

    fn render(&self, _literals: &mut Literals) -> String {
        format!("CREATE DATABASE {}", self.name)
    }
}

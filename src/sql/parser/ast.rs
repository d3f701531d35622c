use std::collections::BTreeMap;

use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

/// The abstract syntax tree of a single parsed statement.
///
/// All statement types share the same structure, discriminated by
/// `statement_type`. Fields that don't apply to a statement type are left
/// empty:
///
/// * SELECT: `fields` (may contain "*"), `aliases`, `conditions`.
/// * UPDATE: `updates`, `conditions`.
/// * DELETE: `conditions`.
/// * INSERT: `fields`, `inserts`.
///
/// An AST returned by the parser always satisfies these invariants: `aliases`
/// only has keys present in `fields`, and every row in `inserts` has the same
/// length as `fields`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ast {
    /// The statement type.
    pub statement_type: StatementType,
    /// The table name, with quotes stripped.
    pub table_name: String,
    /// Selected or inserted fields, in source order.
    pub fields: Vec<String>,
    /// Field aliases (SELECT field AS alias), keyed by field name.
    pub aliases: BTreeMap<String, String>,
    /// AND-chained WHERE conditions, in source order.
    pub conditions: Vec<Condition>,
    /// Field assignments for UPDATE, in source order.
    pub updates: Vec<(String, String)>,
    /// Rows of literal values for INSERT.
    pub inserts: Vec<Vec<String>>,
}

impl Ast {
    /// Creates an empty AST for the given statement type and table.
    pub fn new(statement_type: StatementType, table_name: impl Into<String>) -> Self {
        Self {
            statement_type,
            table_name: table_name.into(),
            fields: Vec::new(),
            aliases: BTreeMap::new(),
            conditions: Vec::new(),
            updates: Vec::new(),
            inserts: Vec::new(),
        }
    }

    /// Returns the value a field is updated to, if any.
    pub fn update(&self, field: &str) -> Option<&str> {
        self.updates.iter().find(|(f, _)| f == field).map(|(_, value)| value.as_str())
    }

    /// Sets a field update. A repeated field overwrites the previous value,
    /// keeping its original position.
    pub fn set_update(&mut self, field: String, value: String) {
        match self.updates.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = value,
            None => self.updates.push((field, value)),
        }
    }
}

/// Formats the AST as a canonical statement, which parses back into an equal
/// AST.
impl std::fmt::Display for Ast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.statement_type {
            StatementType::Select => {
                let fields = self.fields.iter().map(|field| match self.aliases.get(field) {
                    Some(alias) => format!("{field} AS {alias}"),
                    None => field.clone(),
                });
                write!(f, "SELECT {} FROM '{}'", fields.format(", "), self.table_name)?;
            }
            StatementType::Update => {
                let updates =
                    self.updates.iter().map(|(field, value)| format!("{field} = '{value}'"));
                write!(f, "UPDATE '{}' SET {}", self.table_name, updates.format(", "))?;
            }
            StatementType::Delete => write!(f, "DELETE FROM '{}'", self.table_name)?,
            StatementType::Insert => {
                let rows = self
                    .inserts
                    .iter()
                    .map(|row| format!("({})", row.iter().map(|v| format!("'{v}'")).join(", ")));
                return write!(
                    f,
                    "INSERT INTO '{}' ({}) VALUES {}",
                    self.table_name,
                    self.fields.join(", "),
                    rows.format(", ")
                );
            }
        }
        if !self.conditions.is_empty() {
            write!(f, " WHERE {}", self.conditions.iter().format(" AND "))?;
        }
        Ok(())
    }
}

/// A statement type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementType {
    Select,
    Update,
    Insert,
    Delete,
}

impl StatementType {
    /// All statement types.
    pub const ALL: [StatementType; 4] = [Self::Select, Self::Update, Self::Insert, Self::Delete];
}

impl std::fmt::Display for StatementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Select => "SELECT",
            Self::Update => "UPDATE",
            Self::Insert => "INSERT",
            Self::Delete => "DELETE",
        })
    }
}

/// A comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,  // =
    Ne,  // !=
    Gt,  // >
    Lt,  // <
    Gte, // >=
    Lte, // <=
}

impl Operator {
    /// All operators.
    pub const ALL: [Operator; 6] = [Self::Eq, Self::Ne, Self::Gt, Self::Lt, Self::Gte, Self::Lte];
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
        })
    }
}

/// A single WHERE comparison. Operands written bare are field references,
/// quoted operands are literals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub operand1: String,
    pub operand1_is_field: bool,
    pub operator: Operator,
    pub operand2: String,
    pub operand2_is_field: bool,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn operand(value: &str, is_field: bool) -> String {
            match is_field {
                true => value.to_string(),
                false => format!("'{value}'"),
            }
        }
        write!(
            f,
            "{} {} {}",
            operand(&self.operand1, self.operand1_is_field),
            self.operator,
            operand(&self.operand2, self.operand2_is_field)
        )
    }
}

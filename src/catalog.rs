//! In-memory schema catalog: tables, columns, constraints, sequences and
//! indexes, plus the advisory diffing used when auditing migrations.
//!
//! Foreign keys and sequence defaults are stored as ids resolved against the
//! owning [`Schema`]; every other relation is plain ownership.

use crate::sql::{normalize_type, Dialect, Token};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("no such table: {0}")]
    NoSuchTable(String),
    #[error("no such column: {table}.{column}")]
    NoSuchColumn { table: String, column: String },
    #[error("no such sequence: {0}")]
    NoSuchSequence(String),
    #[error("no such index: {0}")]
    NoSuchIndex(String),
    #[error("duplicate {kind} name: {name}")]
    Duplicate { kind: &'static str, name: String },
    #[error("table {table} has {columns} columns but the row has {values} values")]
    TooManyValues {
        table: String,
        columns: usize,
        values: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(usize);

/// Column names are case-insensitive, like unquoted SQL identifiers.
fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlType {
    pub name: String,
    pub length: Option<u32>,
}

impl SqlType {
    pub fn new(name: impl Into<String>, length: Option<u32>) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            Some(n) => write!(f, "{}({})", self.name, n),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteAction {
    Cascade,
    SetNull,
    SetDefault,
}

impl fmt::Display for DeleteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteAction::Cascade => write!(f, "cascade"),
            DeleteAction::SetNull => write!(f, "set null"),
            DeleteAction::SetDefault => write!(f, "set default"),
        }
    }
}

/// A function-call default the catalog records but does not evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureCall {
    pub name: String,
    pub args: Vec<Token>,
}

impl fmt::Display for ProcedureCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 && !arg.is_punct(',') {
                write!(f, " ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

/// Declared column default. A column without one has `Column::default == None`.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Null,
    Literal(Value),
    /// `nextval('seq')`
    Sequence(SequenceId),
    Procedure(ProcedureCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub table: TableId,
    pub position: usize,
    pub sql_type: SqlType,
    pub default: Option<DefaultValue>,
    pub references: Option<TableId>,
    pub delete_action: Option<DeleteAction>,
}

impl Column {
    /// Column diffing; `owner` is the name of the table both columns belong to.
    pub fn compare(&self, other: &Column, owner: &str, dialect: Dialect) -> Vec<String> {
        let mut results = Vec::new();
        let mine = normalize_type(&self.sql_type.name, dialect);
        let theirs = normalize_type(&other.sql_type.name, dialect);
        if mine != theirs {
            results.push(format!(
                "Table: {}, mismatched column type: {} ({} vs {})",
                owner, self.name, self.sql_type, other.sql_type
            ));
        }
        results
    }
}

/// Boolean expression tree of a CHECK constraint, over one table's columns.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckExpr {
    Column(usize),
    Constant(Value),
    Function { name: String, args: Vec<CheckExpr> },
    Compare {
        lhs: Box<CheckExpr>,
        op: String,
        rhs: Box<CheckExpr>,
    },
}

impl CheckExpr {
    pub fn columns(&self) -> Vec<usize> {
        match self {
            CheckExpr::Column(c) => vec![*c],
            CheckExpr::Constant(_) => vec![],
            CheckExpr::Function { args, .. } => args.iter().flat_map(|a| a.columns()).collect(),
            CheckExpr::Compare { lhs, rhs, .. } => {
                let mut cols = lhs.columns();
                cols.extend(rhs.columns());
                cols
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub name: Option<String>,
    pub expression: CheckExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    NotNull { column: usize },
    Unique {
        name: Option<String>,
        columns: Vec<usize>,
    },
    Check(Check),
}

impl Constraint {
    pub fn affects(&self) -> Vec<usize> {
        match self {
            Constraint::NotNull { column } => vec![*column],
            Constraint::Unique { columns, .. } => columns.clone(),
            Constraint::Check(check) => check.expression.columns(),
        }
    }
}

/// Seed row keyed by column name.
pub type SchemaRow = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub comment: String,
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
    pub primary_key: Option<Vec<usize>>,
    pub schema_rows: Vec<SchemaRow>,
}

impl Table {
    pub(crate) fn new(id: TableId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            comment: String::new(),
            columns: Vec::new(),
            constraints: Vec::new(),
            primary_key: None,
            schema_rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Result<usize, CatalogError> {
        self.columns
            .iter()
            .position(|c| names_match(&c.name, name))
            .ok_or_else(|| CatalogError::NoSuchColumn {
                table: self.name.clone(),
                column: name.to_string(),
            })
    }

    pub fn column_named(&self, name: &str) -> Result<&Column, CatalogError> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| names_match(&c.name, name))
    }

    pub fn add_column(&mut self, name: &str, sql_type: SqlType) -> Result<usize, CatalogError> {
        if self.has_column(name) {
            return Err(CatalogError::Duplicate {
                kind: "column",
                name: format!("{}.{}", self.name, name),
            });
        }
        let position = self.columns.len();
        self.columns.push(Column {
            name: name.to_string(),
            table: self.id,
            position,
            sql_type,
            default: None,
            references: None,
            delete_action: None,
        });
        Ok(position)
    }

    pub fn add_not_null(&mut self, column: usize) {
        self.constraints.push(Constraint::NotNull { column });
    }

    pub fn add_unique(&mut self, columns: Vec<usize>, name: Option<String>) {
        self.constraints.push(Constraint::Unique { name, columns });
    }

    pub fn add_check(&mut self, expression: CheckExpr, name: Option<String>) {
        self.constraints
            .push(Constraint::Check(Check { name, expression }));
    }

    /// Append a seed row; values bind to columns in declaration order.
    pub fn insert_schema_row(&mut self, values: Vec<Value>) -> Result<(), CatalogError> {
        if values.len() > self.columns.len() {
            return Err(CatalogError::TooManyValues {
                table: self.name.clone(),
                columns: self.columns.len(),
                values: values.len(),
            });
        }
        let row = self
            .columns
            .iter()
            .zip(values)
            .map(|(c, v)| (c.name.clone(), v))
            .collect();
        self.schema_rows.push(row);
        Ok(())
    }

    pub fn uniques(&self) -> impl Iterator<Item = &[usize]> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Unique { columns, .. } => Some(columns.as_slice()),
            _ => None,
        })
    }

    pub fn can_be_null(&self, column: &Column) -> bool {
        !self
            .constraints
            .iter()
            .any(|c| matches!(c, Constraint::NotNull { column: n } if *n == column.position))
    }

    /// A column every INSERT must name: NOT NULL and without a default.
    pub fn needs_value(&self, column: &Column) -> bool {
        !self.can_be_null(column) && column.default.is_none()
    }

    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.primary_key
            .iter()
            .flatten()
            .map(|&i| &self.columns[i])
            .collect()
    }

    pub fn compare(&self, other: &Table, dialect: Dialect) -> Vec<String> {
        let mut results = Vec::new();
        for column in &self.columns {
            if !other.has_column(&column.name) {
                results.push(format!("Table: {}, extra column: {}", self.name, column.name));
            }
        }
        for column in &other.columns {
            if !self.has_column(&column.name) {
                results.push(format!("Table: {}, missing column: {}", self.name, column.name));
            }
        }
        for column in &self.columns {
            if let Ok(theirs) = other.column_named(&column.name) {
                results.extend(column.compare(theirs, &self.name, dialect));
            }
        }
        results
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub id: SequenceId,
    pub name: String,
    /// `(table, column position)` of every column defaulting to this sequence.
    pub referring_columns: Vec<(TableId, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub table: TableId,
    pub unique: bool,
    pub method: Option<String>,
    pub columns: Vec<usize>,
}

/// An explicit index or one implied by a primary key / UNIQUE constraint.
///
/// Implicit index names are implementation defined, so every pseudo-index is
/// named from its table, uniqueness and columns instead.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoIndex<'s> {
    pub name: String,
    pub table: &'s Table,
    pub unique: bool,
    pub columns: Vec<usize>,
}

impl<'s> PseudoIndex<'s> {
    pub fn new(table: &'s Table, columns: Vec<usize>, unique: bool) -> Self {
        let names: Vec<&str> = columns
            .iter()
            .map(|&i| table.columns[i].name.as_str())
            .collect();
        let name = format!(
            "{}{}:({})",
            table.name,
            if unique { "-unique" } else { "" },
            names.join(",")
        );
        Self {
            name,
            table,
            unique,
            columns,
        }
    }

    pub fn compare(&self, other: &PseudoIndex<'_>) -> Vec<String> {
        let mut results = Vec::new();
        if !names_match(&self.table.name, &other.table.name) {
            results.push(format!(
                "Pseudo index: {}, mismatched table: {}",
                self.name, other.table.name
            ));
        }
        if self.unique != other.unique {
            results.push(format!("Pseudo index: {}, mismatched unique", self.name));
        }
        results
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Source name, for diagnostics only.
    pub filename: String,
    pub dialect: Dialect,
    tables: Vec<Table>,
    indexes: Vec<Index>,
    sequences: Vec<Sequence>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new("<string>")
    }
}

impl Schema {
    pub fn new(filename: impl Into<String>) -> Self {
        Self::with_dialect(filename, Dialect::default())
    }

    pub fn with_dialect(filename: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            filename: filename.into(),
            dialect,
            tables: Vec::new(),
            indexes: Vec::new(),
            sequences: Vec::new(),
        }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn sequence(&self, id: SequenceId) -> &Sequence {
        &self.sequences[id.0]
    }

    fn same_name(&self, a: &str, b: &str) -> bool {
        self.dialect.identifier_key(a) == self.dialect.identifier_key(b)
    }

    pub fn table_named(&self, name: &str) -> Result<&Table, CatalogError> {
        self.tables
            .iter()
            .find(|t| self.same_name(&t.name, name))
            .ok_or_else(|| CatalogError::NoSuchTable(name.to_string()))
    }

    pub(crate) fn table_named_mut(&mut self, name: &str) -> Result<&mut Table, CatalogError> {
        let id = self.table_named(name)?.id;
        Ok(&mut self.tables[id.0])
    }

    pub fn sequence_named(&self, name: &str) -> Result<&Sequence, CatalogError> {
        self.sequences
            .iter()
            .find(|s| self.same_name(&s.name, name))
            .ok_or_else(|| CatalogError::NoSuchSequence(name.to_string()))
    }

    pub fn index_named(&self, name: &str) -> Result<&Index, CatalogError> {
        self.indexes
            .iter()
            .find(|i| self.same_name(&i.name, name))
            .ok_or_else(|| CatalogError::NoSuchIndex(name.to_string()))
    }

    /// Start a table that becomes part of the schema only via [`Schema::add_table`].
    pub(crate) fn new_table(&self, name: &str) -> Result<Table, CatalogError> {
        if self.table_named(name).is_ok() {
            return Err(CatalogError::Duplicate {
                kind: "table",
                name: name.to_string(),
            });
        }
        Ok(Table::new(TableId(self.tables.len()), name))
    }

    pub(crate) fn add_table(&mut self, table: Table) -> Result<TableId, CatalogError> {
        if table.id.0 != self.tables.len() || self.table_named(&table.name).is_ok() {
            return Err(CatalogError::Duplicate {
                kind: "table",
                name: table.name,
            });
        }
        let id = table.id;
        self.tables.push(table);
        Ok(id)
    }

    pub fn add_sequence(&mut self, name: &str) -> Result<SequenceId, CatalogError> {
        if self.sequence_named(name).is_ok() {
            return Err(CatalogError::Duplicate {
                kind: "sequence",
                name: name.to_string(),
            });
        }
        let id = SequenceId(self.sequences.len());
        self.sequences.push(Sequence {
            id,
            name: name.to_string(),
            referring_columns: Vec::new(),
        });
        Ok(id)
    }

    pub(crate) fn add_sequence_reference(&mut self, sequence: SequenceId, column: (TableId, usize)) {
        self.sequences[sequence.0].referring_columns.push(column);
    }

    pub fn add_index(&mut self, index: Index) -> Result<(), CatalogError> {
        if self.index_named(&index.name).is_ok() {
            return Err(CatalogError::Duplicate {
                kind: "index",
                name: index.name,
            });
        }
        self.indexes.push(index);
        Ok(())
    }

    /// Explicit indexes first, then per table its primary key and UNIQUE constraints.
    pub fn pseudo_indexes(&self) -> Vec<PseudoIndex<'_>> {
        let mut results: Vec<PseudoIndex<'_>> = self
            .indexes
            .iter()
            .map(|i| PseudoIndex::new(self.table(i.table), i.columns.clone(), i.unique))
            .collect();
        for table in &self.tables {
            if let Some(pk) = &table.primary_key {
                results.push(PseudoIndex::new(table, pk.clone(), true));
            }
            for unique in table.uniques() {
                results.push(PseudoIndex::new(table, unique.to_vec(), true));
            }
        }
        results
    }

    /// Advisory diff of this schema against `other`.
    pub fn compare(&self, other: &Schema) -> Vec<String> {
        let mut results = Vec::new();

        let identifier_key = |name: &str| self.dialect.identifier_key(name);
        let tables = compare_lists(
            other,
            "table",
            identifier_key,
            &self.tables.iter().map(|t| (t.name.as_str(), t)).collect::<Vec<_>>(),
            &other.tables.iter().map(|t| (t.name.as_str(), t)).collect::<Vec<_>>(),
            &mut results,
        );
        for (mine, theirs) in tables {
            results.extend(mine.compare(theirs, self.dialect));
        }

        let (my_indexes, their_indexes) = (self.pseudo_indexes(), other.pseudo_indexes());
        // pseudo-index names are synthesized, so never truncated
        let indexes = compare_lists(
            other,
            "index",
            |name: &str| name.to_lowercase(),
            &my_indexes.iter().map(|i| (i.name.as_str(), i)).collect::<Vec<_>>(),
            &their_indexes.iter().map(|i| (i.name.as_str(), i)).collect::<Vec<_>>(),
            &mut results,
        );
        for (mine, theirs) in indexes {
            results.extend(mine.compare(theirs));
        }

        // sequences carry nothing beyond their name
        compare_lists(
            other,
            "sequence",
            identifier_key,
            &self.sequences.iter().map(|s| (s.name.as_str(), s)).collect::<Vec<_>>(),
            &other.sequences.iter().map(|s| (s.name.as_str(), s)).collect::<Vec<_>>(),
            &mut results,
        );

        results
    }
}

/// Report extra / missing names and return the pairs present on both sides.
fn compare_lists<'a, T>(
    other: &Schema,
    descriptor: &str,
    key: impl Fn(&str) -> String,
    my_items: &[(&'a str, &'a T)],
    their_items: &[(&'a str, &'a T)],
    results: &mut Vec<String>,
) -> Vec<(&'a T, &'a T)> {
    let find = |items: &[(&'a str, &'a T)], name: &str| {
        let k = key(name);
        items.iter().find(|(n, _)| key(n) == k).map(|(_, item)| *item)
    };

    let mut common = Vec::new();
    for (name, item) in my_items {
        match find(their_items, name) {
            Some(theirs) => common.push((*item, theirs)),
            None => results.push(format!(
                "Schema: {}, extra {}: {}",
                other.filename, descriptor, name
            )),
        }
    }
    for (name, _) in their_items {
        if find(my_items, name).is_none() {
            results.push(format!(
                "Schema: {}, missing {}: {}",
                other.filename, descriptor, name
            ));
        }
    }
    common
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Schema {
        let mut schema = Schema::new("users.sql");
        let mut table = schema.new_table("USERS").unwrap();
        let id = table.add_column("ID", SqlType::new("integer", None)).unwrap();
        let name = table
            .add_column("NAME", SqlType::new("varchar", Some(255)))
            .unwrap();
        let note = table.add_column("NOTE", SqlType::new("text", None)).unwrap();
        table.primary_key = Some(vec![id]);
        table.add_not_null(name);
        table.add_unique(vec![name], None);
        table.columns[note].default = Some(DefaultValue::Null);
        schema.add_table(table).unwrap();
        schema
    }

    #[test]
    fn test_needs_value() {
        let schema = users();
        let table = schema.table_named("users").unwrap();
        let flags: Vec<bool> = table.columns.iter().map(|c| table.needs_value(c)).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert!(table.can_be_null(&table.columns[0]));
    }

    #[test]
    fn test_lookup_errors() {
        let schema = users();
        assert_eq!(
            schema.table_named("nope"),
            Err(CatalogError::NoSuchTable("nope".into()))
        );
        let table = schema.table_named("USERS").unwrap();
        assert!(matches!(
            table.column_named("missing"),
            Err(CatalogError::NoSuchColumn { .. })
        ));
        assert_eq!(table.column_named("name").unwrap().position, 1);
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut schema = users();
        assert!(matches!(
            schema.new_table("users"),
            Err(CatalogError::Duplicate { kind: "table", .. })
        ));
        schema.add_sequence("SEQ").unwrap();
        assert!(schema.add_sequence("seq").is_err());
    }

    #[test]
    fn test_truncated_names_collide() {
        let mut schema = Schema::with_dialect("x", Dialect::Oracle);
        let long = format!("{}A", "S".repeat(30));
        let other = format!("{}B", "S".repeat(30));
        schema.add_sequence(&long).unwrap();
        assert!(schema.add_sequence(&other).is_err());
    }

    #[test]
    fn test_pseudo_indexes() {
        let schema = users();
        let names: Vec<String> = schema.pseudo_indexes().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["USERS-unique:(ID)", "USERS-unique:(NAME)"]);
    }

    #[test]
    fn test_schema_rows() {
        let mut schema = users();
        let table = schema.table_named_mut("USERS").unwrap();
        table
            .insert_schema_row(vec![Value::Int(1), Value::from("x")])
            .unwrap();
        assert_eq!(table.schema_rows[0]["ID"], Value::Int(1));
        assert_eq!(table.schema_rows[0].len(), 2);
        assert!(table.insert_schema_row(vec![Value::Null; 4]).is_err());
    }

    #[test]
    fn test_compare() {
        let mine = users();
        let mut other = Schema::new("other.sql");
        let mut table = other.new_table("users").unwrap();
        table.add_column("id", SqlType::new("int4", None)).unwrap();
        table.add_column("NAME", SqlType::new("text", None)).unwrap();
        table.add_column("EXTRA", SqlType::new("text", None)).unwrap();
        other.add_table(table).unwrap();
        other.add_sequence("S").unwrap();

        assert_eq!(
            mine.compare(&other),
            vec![
                "Table: USERS, extra column: NOTE",
                "Table: USERS, missing column: EXTRA",
                "Table: USERS, mismatched column type: NAME (varchar(255) vs text)",
                "Schema: other.sql, extra index: USERS-unique:(ID)",
                "Schema: other.sql, extra index: USERS-unique:(NAME)",
                "Schema: other.sql, missing sequence: S",
            ]
        );
        assert!(mine.compare(&mine).is_empty());
    }

    fn revisions(unique: &[&str]) -> Schema {
        let mut schema = Schema::new("revisions.sql");
        let mut table = schema.new_table("CALENDAR_OBJECT_REVISIONS").unwrap();
        for name in ["CALENDAR_HOME_RESOURCE_ID", "CALENDAR_RESOURCE_ID", "RESOURCE_NAME"] {
            table.add_column(name, SqlType::new("integer", None)).unwrap();
        }
        let columns = unique.iter().map(|n| table.column_index(n).unwrap()).collect();
        table.add_unique(columns, None);
        schema.add_table(table).unwrap();
        schema
    }

    #[test]
    fn test_long_pseudo_index_names_are_not_truncated() {
        let mine = revisions(&[
            "CALENDAR_HOME_RESOURCE_ID",
            "CALENDAR_RESOURCE_ID",
            "RESOURCE_NAME",
        ]);
        let theirs = revisions(&["CALENDAR_HOME_RESOURCE_ID", "CALENDAR_RESOURCE_ID"]);
        assert_eq!(
            mine.compare(&theirs),
            vec![
                "Schema: revisions.sql, extra index: CALENDAR_OBJECT_REVISIONS-unique:\
                 (CALENDAR_HOME_RESOURCE_ID,CALENDAR_RESOURCE_ID,RESOURCE_NAME)",
                "Schema: revisions.sql, missing index: CALENDAR_OBJECT_REVISIONS-unique:\
                 (CALENDAR_HOME_RESOURCE_ID,CALENDAR_RESOURCE_ID)",
            ]
        );
    }
}

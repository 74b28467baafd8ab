//! Typed query construction over a compiled schema.
//!
//! Statements are validated against the catalog when they are built and
//! render to a [`SqlFragment`] of text plus ordered parameters.

mod executor;
mod expression;
mod fragment;
mod generator;
mod statement;

use crate::catalog::CatalogError;

pub use executor::{Row, StatementExecutor};
pub use expression::{
    ColumnSyntax, Comparison, Expression, ExpressionSyntax, FromClause, Function, Join, JoinType,
    Operator, SchemaSyntax, TableSyntax,
};
pub use fragment::{Argument, Binding, Bindings, Parameter, SqlFragment};
pub use generator::{Placeholder, QueryGenerator};
pub use statement::{Delete, Insert, Lock, LockMode, Order, Select, Statement, Update};

#[derive(Debug, thiserror::Error)]
pub enum DalError {
    #[error("Table mismatch: {0}")]
    TableMismatch(String),
    #[error("Not enough values: missing {}", .columns.join(", "))]
    NotEnoughValues { columns: Vec<String> },
    #[error("Empty column map")]
    EmptyColumnMap,
    #[error("Unbound parameter: {0}")]
    UnboundParameter(String),
    #[error("Parameter {name} expects {expected} values, got {got}")]
    ParameterCount {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("Parameter {0} bound with the wrong number of values")]
    InvalidParameterCount(String),
    #[error("{kind:?} join {reason}")]
    JoinCondition {
        kind: JoinType,
        reason: &'static str,
    },
    #[error("Execution failed: {0}")]
    Execute(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

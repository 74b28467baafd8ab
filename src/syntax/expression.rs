//! Typed references to catalog objects and the expression trees built from them.

use super::fragment::{Argument, Parameter, SqlFragment};
use super::DalError;
use super::generator::QueryGenerator;
use super::statement::Select;
use crate::catalog::{CatalogError, Column, Schema, Table};
use crate::value::Value;

/// Entry point of the query layer: name lookups over a compiled schema.
#[derive(Debug, Clone, Copy)]
pub struct SchemaSyntax<'s> {
    schema: &'s Schema,
}

impl<'s> SchemaSyntax<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn table(&self, name: &str) -> Result<TableSyntax<'s>, CatalogError> {
        self.schema.table_named(name).map(TableSyntax::new)
    }

    pub fn tables(&self) -> impl Iterator<Item = TableSyntax<'s>> {
        self.schema.tables().iter().map(TableSyntax::new)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableSyntax<'s> {
    table: &'s Table,
}

impl<'s> TableSyntax<'s> {
    pub fn new(table: &'s Table) -> Self {
        Self { table }
    }

    pub fn model(&self) -> &'s Table {
        self.table
    }

    pub fn name(&self) -> &'s str {
        &self.table.name
    }

    pub fn column(&self, name: &str) -> Result<ColumnSyntax<'s>, CatalogError> {
        self.table
            .column_named(name)
            .map(|column| ColumnSyntax::new(self.table, column))
    }

    pub fn columns(&self) -> Vec<ColumnSyntax<'s>> {
        self.table
            .columns
            .iter()
            .map(|column| ColumnSyntax::new(self.table, column))
            .collect()
    }

    /// `self join other on condition`
    pub fn join(self, other: impl Into<FromClause<'s>>, on: Comparison<'s>) -> Join<'s> {
        Join::with_condition(self, JoinType::Default, other, on)
    }

    /// Every kind but `Cross` needs `on`.
    pub fn join_type(
        self,
        kind: JoinType,
        other: impl Into<FromClause<'s>>,
        on: Option<Comparison<'s>>,
    ) -> Result<Join<'s>, DalError> {
        Join::new(self, kind, other, on)
    }

    pub(crate) fn render(&self, qg: &QueryGenerator) -> SqlFragment {
        SqlFragment::from_text(qg.quote(&self.table.name))
    }
}

/// A column together with the table that owns it.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSyntax<'s> {
    table: &'s Table,
    column: &'s Column,
}

impl<'s> ColumnSyntax<'s> {
    pub fn new(table: &'s Table, column: &'s Column) -> Self {
        Self { table, column }
    }

    pub fn model(&self) -> &'s Column {
        self.column
    }

    pub fn table(&self) -> &'s Table {
        self.table
    }

    pub fn name(&self) -> &'s str {
        &self.column.name
    }

    pub fn needs_value(&self) -> bool {
        self.table.needs_value(self.column)
    }

    pub(crate) fn belongs_to(&self, tables: &[&Table]) -> bool {
        tables.iter().any(|t| t.id == self.table.id)
    }

    /// Bare name unless another table in scope has a column of the same name.
    pub(crate) fn render(&self, qg: &QueryGenerator, tables: &[&Table]) -> SqlFragment {
        let ambiguous = tables
            .iter()
            .any(|t| t.id != self.table.id && t.has_column(&self.column.name));
        let text = if ambiguous {
            format!(
                "{}.{}",
                qg.quote(&self.table.name),
                qg.quote(&self.column.name)
            )
        } else {
            qg.quote(&self.column.name)
        };
        SqlFragment::from_text(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Plus,
    Minus,
    Concat,
    Like,
    In,
    NotIn,
    And,
    Or,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Concat => "||",
            Self::Like => "like",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// SQL function by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Function {
    pub name: &'static str,
}

impl Function {
    pub const COUNT: Function = Function::new("count");
    pub const SUM: Function = Function::new("sum");
    pub const MAX: Function = Function::new("max");
    pub const MIN: Function = Function::new("min");
    pub const CHARACTER_LENGTH: Function = Function::new("character_length");
    pub const UPPER: Function = Function::new("upper");
    pub const LOWER: Function = Function::new("lower");

    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn call<'s>(self, args: impl IntoIterator<Item = Expression<'s>>) -> Expression<'s> {
        Expression::Function {
            function: self,
            args: args.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expression<'s> {
    Column(ColumnSyntax<'s>),
    /// Literal rendered as a bound placeholder.
    Constant(Value),
    Parameter(Parameter),
    Tuple(Vec<Expression<'s>>),
    Function {
        function: Function,
        args: Vec<Expression<'s>>,
    },
    /// Rendered verbatim, e.g. `CURRENT_TIMESTAMP` or `*`.
    Named(&'static str),
    Subquery(Box<Select<'s>>),
    Binary {
        lhs: Box<Expression<'s>>,
        op: Operator,
        rhs: Box<Expression<'s>>,
    },
}

impl<'s> Expression<'s> {
    pub fn current_timestamp() -> Self {
        Expression::Named("CURRENT_TIMESTAMP")
    }

    pub fn all_columns() -> Self {
        Expression::Named("*")
    }

    pub fn tuple(items: impl IntoIterator<Item = Expression<'s>>) -> Self {
        Expression::Tuple(items.into_iter().collect())
    }

    /// Column references reachable without entering a subquery.
    pub fn columns(&self) -> Vec<ColumnSyntax<'s>> {
        match self {
            Expression::Column(c) => vec![*c],
            Expression::Tuple(items) | Expression::Function { args: items, .. } => {
                items.iter().flat_map(Expression::columns).collect()
            }
            Expression::Binary { lhs, rhs, .. } => {
                let mut columns = lhs.columns();
                columns.extend(rhs.columns());
                columns
            }
            Expression::Constant(_)
            | Expression::Parameter(_)
            | Expression::Named(_)
            | Expression::Subquery(_) => Vec::new(),
        }
    }

    pub(crate) fn render(&self, qg: &QueryGenerator, tables: &[&Table]) -> SqlFragment {
        match self {
            Expression::Column(c) => c.render(qg, tables),
            Expression::Constant(value) => {
                let mut frag = SqlFragment::new();
                frag.push_argument(qg, Argument::Value(value.clone()));
                frag
            }
            Expression::Parameter(p) => {
                let mut frag = SqlFragment::new();
                frag.push_argument(qg, Argument::Parameter(p.clone()));
                frag
            }
            Expression::Tuple(items) => {
                SqlFragment::join(items.iter().map(|e| e.render(qg, tables)), ", ").in_parens()
            }
            Expression::Function { function, args } => {
                let mut frag = SqlFragment::from_text(function.name);
                frag.append(
                    SqlFragment::join(args.iter().map(|e| e.render(qg, tables)), ", ")
                        .in_parens(),
                );
                frag
            }
            Expression::Named(name) => SqlFragment::from_text(*name),
            Expression::Subquery(select) => select.render(qg).in_parens(),
            Expression::Binary { lhs, op, rhs } => {
                let mut frag = lhs.render_operand(qg, tables);
                frag.push_str(&format!(" {} ", op.as_sql()));
                frag.append(rhs.render_operand(qg, tables));
                frag
            }
        }
    }

    fn render_operand(&self, qg: &QueryGenerator, tables: &[&Table]) -> SqlFragment {
        match self {
            Expression::Binary { .. } => self.render(qg, tables).in_parens(),
            _ => self.render(qg, tables),
        }
    }
}

impl<'s> From<ColumnSyntax<'s>> for Expression<'s> {
    fn from(column: ColumnSyntax<'s>) -> Self {
        Expression::Column(column)
    }
}

impl<'s> From<Parameter> for Expression<'s> {
    fn from(parameter: Parameter) -> Self {
        Expression::Parameter(parameter)
    }
}

impl<'s> From<Select<'s>> for Expression<'s> {
    fn from(select: Select<'s>) -> Self {
        Expression::Subquery(Box::new(select))
    }
}

impl<'s, T: Into<Value>> From<Vec<T>> for Expression<'s> {
    fn from(values: Vec<T>) -> Self {
        Expression::Tuple(
            values
                .into_iter()
                .map(|v| Expression::Constant(v.into()))
                .collect(),
        )
    }
}

macro_rules! constant_from {
    ($($ty:ty),*) => {
        $(
            impl<'s> From<$ty> for Expression<'s> {
                fn from(value: $ty) -> Self {
                    Expression::Constant(value.into())
                }
            }
        )*
    };
}

constant_from!(Value, bool, i32, i64, u32, f64, &str, String);

/// A boolean-valued node. There is deliberately no conversion to `bool`.
#[derive(Debug, Clone)]
pub enum Comparison<'s> {
    /// `x is null` / `x is not null`
    Null {
        operand: Expression<'s>,
        negated: bool,
    },
    /// Column against column; no parameters.
    Column {
        lhs: ColumnSyntax<'s>,
        op: Operator,
        rhs: ColumnSyntax<'s>,
    },
    /// Anything against a non-column operand.
    Constant {
        lhs: Expression<'s>,
        op: Operator,
        rhs: Expression<'s>,
    },
    Compound {
        lhs: Box<Comparison<'s>>,
        op: Operator,
        rhs: Box<Comparison<'s>>,
    },
}

impl<'s> Comparison<'s> {
    fn build(lhs: Expression<'s>, op: Operator, rhs: Expression<'s>) -> Self {
        match (lhs, rhs) {
            (operand, Expression::Constant(value))
                if value.is_null() && matches!(op, Operator::Eq | Operator::Ne) =>
            {
                Comparison::Null {
                    operand,
                    negated: op == Operator::Ne,
                }
            }
            (Expression::Column(lhs), Expression::Column(rhs)) => {
                Comparison::Column { lhs, op, rhs }
            }
            (lhs, rhs) => Comparison::Constant { lhs, op, rhs },
        }
    }

    pub fn and(self, other: Comparison<'s>) -> Self {
        Comparison::Compound {
            lhs: Box::new(self),
            op: Operator::And,
            rhs: Box::new(other),
        }
    }

    pub fn or(self, other: Comparison<'s>) -> Self {
        Comparison::Compound {
            lhs: Box::new(self),
            op: Operator::Or,
            rhs: Box::new(other),
        }
    }

    pub(crate) fn render(&self, qg: &QueryGenerator, tables: &[&Table]) -> SqlFragment {
        match self {
            Comparison::Null { operand, negated } => {
                let mut frag = operand.render_operand(qg, tables);
                frag.push_str(if *negated { " is not null" } else { " is null" });
                frag
            }
            Comparison::Column { lhs, op, rhs } => {
                let mut frag = lhs.render(qg, tables);
                frag.push_str(&format!(" {} ", op.as_sql()));
                frag.append(rhs.render(qg, tables));
                frag
            }
            Comparison::Constant { lhs, op, rhs } => {
                let mut frag = lhs.render_operand(qg, tables);
                frag.push_str(&format!(" {} ", op.as_sql()));
                frag.append(rhs.render_operand(qg, tables));
                frag
            }
            Comparison::Compound { lhs, op, rhs } => {
                let mut frag = Self::render_child(lhs, *op, qg, tables);
                frag.push_str(&format!(" {} ", op.as_sql()));
                frag.append(Self::render_child(rhs, *op, qg, tables));
                frag
            }
        }
    }

    /// `or` under `and` needs parentheses; nothing else does.
    fn render_child(
        child: &Comparison<'s>,
        parent: Operator,
        qg: &QueryGenerator,
        tables: &[&Table],
    ) -> SqlFragment {
        let frag = child.render(qg, tables);
        match child {
            Comparison::Compound { op: Operator::Or, .. } if parent == Operator::And => {
                frag.in_parens()
            }
            _ => frag,
        }
    }
}

/// Builder methods shared by columns and general expressions.
pub trait ExpressionSyntax<'s>: Into<Expression<'s>> + Sized {
    fn eq(self, rhs: impl Into<Expression<'s>>) -> Comparison<'s> {
        Comparison::build(self.into(), Operator::Eq, rhs.into())
    }

    fn ne(self, rhs: impl Into<Expression<'s>>) -> Comparison<'s> {
        Comparison::build(self.into(), Operator::Ne, rhs.into())
    }

    fn gt(self, rhs: impl Into<Expression<'s>>) -> Comparison<'s> {
        Comparison::build(self.into(), Operator::Gt, rhs.into())
    }

    fn ge(self, rhs: impl Into<Expression<'s>>) -> Comparison<'s> {
        Comparison::build(self.into(), Operator::Ge, rhs.into())
    }

    fn lt(self, rhs: impl Into<Expression<'s>>) -> Comparison<'s> {
        Comparison::build(self.into(), Operator::Lt, rhs.into())
    }

    fn le(self, rhs: impl Into<Expression<'s>>) -> Comparison<'s> {
        Comparison::build(self.into(), Operator::Le, rhs.into())
    }

    fn is_null(self) -> Comparison<'s> {
        Comparison::Null {
            operand: self.into(),
            negated: false,
        }
    }

    fn is_not_null(self) -> Comparison<'s> {
        Comparison::Null {
            operand: self.into(),
            negated: true,
        }
    }

    fn plus(self, rhs: impl Into<Expression<'s>>) -> Expression<'s> {
        Expression::Binary {
            lhs: Box::new(self.into()),
            op: Operator::Plus,
            rhs: Box::new(rhs.into()),
        }
    }

    fn minus(self, rhs: impl Into<Expression<'s>>) -> Expression<'s> {
        Expression::Binary {
            lhs: Box::new(self.into()),
            op: Operator::Minus,
            rhs: Box::new(rhs.into()),
        }
    }

    /// Membership in a tuple, a subquery or a counted parameter.
    fn in_(self, rhs: impl Into<Expression<'s>>) -> Comparison<'s> {
        Comparison::Constant {
            lhs: self.into(),
            op: Operator::In,
            rhs: membership_operand(rhs.into()),
        }
    }

    fn not_in(self, rhs: impl Into<Expression<'s>>) -> Comparison<'s> {
        Comparison::Constant {
            lhs: self.into(),
            op: Operator::NotIn,
            rhs: membership_operand(rhs.into()),
        }
    }

    fn starts_with(self, prefix: impl Into<Value>) -> Comparison<'s> {
        like(self.into(), concat(Expression::Constant(prefix.into()), "%".into()))
    }

    fn ends_with(self, suffix: impl Into<Value>) -> Comparison<'s> {
        like(self.into(), concat("%".into(), Expression::Constant(suffix.into())))
    }

    fn contains(self, infix: impl Into<Value>) -> Comparison<'s> {
        let inner = concat("%".into(), Expression::Constant(infix.into()));
        like(self.into(), concat(inner, "%".into()))
    }
}

impl<'s> ExpressionSyntax<'s> for ColumnSyntax<'s> {}
impl<'s> ExpressionSyntax<'s> for Expression<'s> {}

fn membership_operand(rhs: Expression<'_>) -> Expression<'_> {
    match rhs {
        Expression::Parameter(p) => Expression::Tuple(vec![Expression::Parameter(p)]),
        other => other,
    }
}

fn concat<'s>(lhs: Expression<'s>, rhs: Expression<'s>) -> Expression<'s> {
    Expression::Binary {
        lhs: Box::new(lhs),
        op: Operator::Concat,
        rhs: Box::new(rhs),
    }
}

fn like<'s>(lhs: Expression<'s>, pattern: Expression<'s>) -> Comparison<'s> {
    Comparison::Constant {
        lhs,
        op: Operator::Like,
        rhs: pattern,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Default,
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinType {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Inner => "inner",
            Self::LeftOuter => "left outer",
            Self::RightOuter => "right outer",
            Self::FullOuter => "full outer",
            Self::Cross => "cross",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Join<'s> {
    left: FromClause<'s>,
    kind: JoinType,
    right: FromClause<'s>,
    /// Always `None` for cross joins.
    on: Option<Comparison<'s>>,
}

impl<'s> Join<'s> {
    pub fn new(
        left: impl Into<FromClause<'s>>,
        kind: JoinType,
        right: impl Into<FromClause<'s>>,
        on: Option<Comparison<'s>>,
    ) -> Result<Self, DalError> {
        match (kind, on) {
            (JoinType::Cross, None) => Ok(Self {
                left: left.into(),
                kind,
                right: right.into(),
                on: None,
            }),
            (JoinType::Cross, Some(_)) => Err(DalError::JoinCondition {
                kind,
                reason: "takes no on condition",
            }),
            (_, Some(on)) => Ok(Self::with_condition(left, kind, right, on)),
            (_, None) => Err(DalError::JoinCondition {
                kind,
                reason: "requires an on condition",
            }),
        }
    }

    fn with_condition(
        left: impl Into<FromClause<'s>>,
        kind: JoinType,
        right: impl Into<FromClause<'s>>,
        on: Comparison<'s>,
    ) -> Self {
        Self {
            left: left.into(),
            kind,
            right: right.into(),
            on: Some(on),
        }
    }

    /// Chain another join onto this one.
    pub fn join(self, other: impl Into<FromClause<'s>>, on: Comparison<'s>) -> Join<'s> {
        Join::with_condition(self, JoinType::Default, other, on)
    }

    pub fn join_type(
        self,
        kind: JoinType,
        other: impl Into<FromClause<'s>>,
        on: Option<Comparison<'s>>,
    ) -> Result<Join<'s>, DalError> {
        Join::new(self, kind, other, on)
    }

    fn render(&self, qg: &QueryGenerator, tables: &[&Table]) -> SqlFragment {
        let mut frag = self.left.render(qg, tables);
        frag.push_str(" ");
        if self.kind != JoinType::Default {
            frag.push_str(self.kind.keyword());
            frag.push_str(" ");
        }
        frag.push_str("join ");
        frag.append(match &self.right {
            FromClause::Join(_) => self.right.render(qg, tables).in_parens(),
            FromClause::Table(_) => self.right.render(qg, tables),
        });
        if let Some(on) = &self.on {
            frag.push_str(" on ");
            frag.append(on.render(qg, tables));
        }
        frag
    }
}

#[derive(Debug, Clone)]
pub enum FromClause<'s> {
    Table(TableSyntax<'s>),
    Join(Box<Join<'s>>),
}

impl<'s> FromClause<'s> {
    /// Leaf tables in left-to-right order.
    pub fn tables(&self) -> Vec<&'s Table> {
        match self {
            FromClause::Table(t) => vec![t.model()],
            FromClause::Join(join) => {
                let mut tables = join.left.tables();
                tables.extend(join.right.tables());
                tables
            }
        }
    }

    pub(crate) fn render(&self, qg: &QueryGenerator, tables: &[&Table]) -> SqlFragment {
        match self {
            FromClause::Table(t) => t.render(qg),
            FromClause::Join(join) => join.render(qg, tables),
        }
    }
}

impl<'s> From<TableSyntax<'s>> for FromClause<'s> {
    fn from(table: TableSyntax<'s>) -> Self {
        FromClause::Table(table)
    }
}

impl<'s> From<Join<'s>> for FromClause<'s> {
    fn from(join: Join<'s>) -> Self {
        FromClause::Join(Box::new(join))
    }
}

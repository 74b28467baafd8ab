//! Statement builders. Validation happens at construction, rendering never fails.

use super::executor::{Row, StatementExecutor};
use super::expression::{ColumnSyntax, Comparison, Expression, FromClause, TableSyntax};
use super::fragment::{Bindings, SqlFragment};
use super::generator::QueryGenerator;
use super::DalError;
use crate::catalog::Table;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

fn render_list(items: &[Expression<'_>], qg: &QueryGenerator, tables: &[&Table]) -> SqlFragment {
    SqlFragment::join(items.iter().map(|e| e.render(qg, tables)), ", ")
}

fn render_returning(
    frag: &mut SqlFragment,
    returning: &[Expression<'_>],
    qg: &QueryGenerator,
    tables: &[&Table],
) {
    if !returning.is_empty() {
        frag.push_str(" returning ");
        frag.append(render_list(returning, qg, tables));
    }
}

#[derive(Debug, Clone)]
pub struct Select<'s> {
    /// `None` selects `*`.
    columns: Option<Vec<Expression<'s>>>,
    from: FromClause<'s>,
    where_: Option<Comparison<'s>>,
    group_by: Vec<Expression<'s>>,
    having: Option<Comparison<'s>>,
    order_by: Vec<Expression<'s>>,
    order: Option<Order>,
    distinct: bool,
    limit: Option<Expression<'s>>,
    for_update: bool,
    no_wait: bool,
}

impl<'s> Select<'s> {
    /// Select `columns`; every referenced column must belong to a table in `from`.
    pub fn new(
        columns: impl IntoIterator<Item = Expression<'s>>,
        from: impl Into<FromClause<'s>>,
    ) -> Result<Self, DalError> {
        let from = from.into();
        let columns: Vec<Expression<'s>> = columns.into_iter().collect();
        let tables = from.tables();
        for column in columns.iter().flat_map(Expression::columns) {
            if !column.belongs_to(&tables) {
                return Err(DalError::TableMismatch(format!(
                    "{}.{} is not in the from clause",
                    column.table().name,
                    column.name()
                )));
            }
        }
        let mut select = Self::all(from);
        if !columns.is_empty() {
            select.columns = Some(columns);
        }
        Ok(select)
    }

    pub fn all(from: impl Into<FromClause<'s>>) -> Self {
        Self {
            columns: None,
            from: from.into(),
            where_: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            order: None,
            distinct: false,
            limit: None,
            for_update: false,
            no_wait: false,
        }
    }

    pub fn where_(mut self, condition: Comparison<'s>) -> Self {
        self.where_ = Some(condition);
        self
    }

    pub fn group_by(mut self, exprs: impl IntoIterator<Item = Expression<'s>>) -> Self {
        self.group_by = exprs.into_iter().collect();
        self
    }

    pub fn having(mut self, condition: Comparison<'s>) -> Self {
        self.having = Some(condition);
        self
    }

    pub fn order_by(mut self, exprs: impl IntoIterator<Item = Expression<'s>>) -> Self {
        self.order_by = exprs.into_iter().collect();
        self
    }

    pub fn ascending(mut self) -> Self {
        self.order = Some(Order::Ascending);
        self
    }

    pub fn descending(mut self) -> Self {
        self.order = Some(Order::Descending);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Row limit, bound as a parameter.
    pub fn limit(mut self, limit: impl Into<Expression<'s>>) -> Self {
        self.limit = Some(limit.into());
        self
    }

    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    pub fn nowait(mut self) -> Self {
        self.for_update = true;
        self.no_wait = true;
        self
    }

    pub fn tables(&self) -> Vec<&'s Table> {
        self.from.tables()
    }

    pub(crate) fn render(&self, qg: &QueryGenerator) -> SqlFragment {
        let tables = self.from.tables();
        let mut frag = SqlFragment::from_text("select ");
        if self.distinct {
            frag.push_str("distinct ");
        }
        match &self.columns {
            Some(columns) => frag.append(render_list(columns, qg, &tables)),
            None => frag.push_str("*"),
        }
        frag.push_str(" from ");
        frag.append(self.from.render(qg, &tables));
        if let Some(condition) = &self.where_ {
            frag.push_str(" where ");
            frag.append(condition.render(qg, &tables));
        }
        if !self.group_by.is_empty() {
            frag.push_str(" group by ");
            frag.append(render_list(&self.group_by, qg, &tables));
        }
        if let Some(condition) = &self.having {
            frag.push_str(" having ");
            frag.append(condition.render(qg, &tables));
        }
        if !self.order_by.is_empty() {
            frag.push_str(" order by ");
            frag.append(render_list(&self.order_by, qg, &tables));
            match self.order {
                Some(Order::Ascending) => frag.push_str(" asc"),
                Some(Order::Descending) => frag.push_str(" desc"),
                None => {}
            }
        }
        if self.for_update {
            frag.push_str(" for update");
            if self.no_wait {
                frag.push_str(" nowait");
            }
        }
        if let Some(limit) = &self.limit {
            frag.push_str(" limit ");
            frag.append(limit.render(qg, &tables));
        }
        frag
    }
}

type ColumnMap<'s> = Vec<(ColumnSyntax<'s>, Expression<'s>)>;

/// Sort a column map by column name and check that it names a single table.
fn single_table_map<'s>(
    values: impl IntoIterator<Item = (ColumnSyntax<'s>, Expression<'s>)>,
) -> Result<(&'s Table, ColumnMap<'s>), DalError> {
    let values: ColumnMap<'s> = values.into_iter().collect();
    let table = match values.first() {
        Some((column, _)) => column.table(),
        None => return Err(DalError::EmptyColumnMap),
    };
    if let Some((stray, _)) = values.iter().find(|(c, _)| c.table().id != table.id) {
        return Err(DalError::TableMismatch(format!(
            "{}.{} does not belong to {}",
            stray.table().name,
            stray.name(),
            table.name
        )));
    }
    let by_name: BTreeMap<&'s str, (ColumnSyntax<'s>, Expression<'s>)> = values
        .into_iter()
        .map(|(column, value)| (column.name(), (column, value)))
        .collect();
    Ok((table, by_name.into_values().collect()))
}

#[derive(Debug, Clone)]
pub struct Insert<'s> {
    table: &'s Table,
    values: ColumnMap<'s>,
    returning: Vec<Expression<'s>>,
}

impl<'s> Insert<'s> {
    /// Every column that needs a value must be present.
    pub fn new(
        values: impl IntoIterator<Item = (ColumnSyntax<'s>, Expression<'s>)>,
    ) -> Result<Self, DalError> {
        let (table, values) = single_table_map(values)?;
        let missing: Vec<String> = table
            .columns
            .iter()
            .filter(|c| table.needs_value(c))
            .filter(|c| !values.iter().any(|(given, _)| given.model().position == c.position))
            .map(|c| c.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(DalError::NotEnoughValues { columns: missing });
        }
        Ok(Self {
            table,
            values,
            returning: Vec::new(),
        })
    }

    pub fn returning(mut self, exprs: impl IntoIterator<Item = Expression<'s>>) -> Self {
        self.returning = exprs.into_iter().collect();
        self
    }

    pub(crate) fn render(&self, qg: &QueryGenerator) -> SqlFragment {
        let tables = [self.table];
        let mut frag = SqlFragment::from_text(format!("insert into {} ", qg.quote(&self.table.name)));
        let names = self.values.iter().map(|(c, _)| c.render(qg, &tables));
        frag.append(SqlFragment::join(names, ", ").in_parens());
        frag.push_str(" values ");
        let placeholders = self.values.iter().map(|(_, v)| v.render(qg, &tables));
        frag.append(SqlFragment::join(placeholders, ", ").in_parens());
        render_returning(&mut frag, &self.returning, qg, &tables);
        frag
    }
}

#[derive(Debug, Clone)]
pub struct Update<'s> {
    table: &'s Table,
    values: ColumnMap<'s>,
    where_: Comparison<'s>,
    returning: Vec<Expression<'s>>,
}

impl<'s> Update<'s> {
    pub fn new(
        values: impl IntoIterator<Item = (ColumnSyntax<'s>, Expression<'s>)>,
        where_: Comparison<'s>,
    ) -> Result<Self, DalError> {
        let (table, values) = single_table_map(values)?;
        Ok(Self {
            table,
            values,
            where_,
            returning: Vec::new(),
        })
    }

    pub fn returning(mut self, exprs: impl IntoIterator<Item = Expression<'s>>) -> Self {
        self.returning = exprs.into_iter().collect();
        self
    }

    pub(crate) fn render(&self, qg: &QueryGenerator) -> SqlFragment {
        let tables = [self.table];
        let mut frag = SqlFragment::from_text(format!("update {} set ", qg.quote(&self.table.name)));
        let assignments = self.values.iter().map(|(column, value)| {
            let mut assignment = column.render(qg, &tables);
            assignment.push_str(" = ");
            assignment.append(value.render(qg, &tables));
            assignment
        });
        frag.append(SqlFragment::join(assignments, ", "));
        frag.push_str(" where ");
        frag.append(self.where_.render(qg, &tables));
        render_returning(&mut frag, &self.returning, qg, &tables);
        frag
    }
}

#[derive(Debug, Clone)]
pub struct Delete<'s> {
    from: TableSyntax<'s>,
    where_: Comparison<'s>,
    returning: Vec<Expression<'s>>,
}

impl<'s> Delete<'s> {
    pub fn new(from: TableSyntax<'s>, where_: Comparison<'s>) -> Self {
        Self {
            from,
            where_,
            returning: Vec::new(),
        }
    }

    pub fn returning(mut self, exprs: impl IntoIterator<Item = Expression<'s>>) -> Self {
        self.returning = exprs.into_iter().collect();
        self
    }

    pub(crate) fn render(&self, qg: &QueryGenerator) -> SqlFragment {
        let tables = [self.from.model()];
        let mut frag = SqlFragment::from_text("delete from ");
        frag.append(self.from.render(qg));
        frag.push_str(" where ");
        frag.append(self.where_.render(qg, &tables));
        render_returning(&mut frag, &self.returning, qg, &tables);
        frag
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    AccessShare,
    RowShare,
    RowExclusive,
    Share,
    Exclusive,
    AccessExclusive,
}

impl LockMode {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::AccessShare => "access share",
            Self::RowShare => "row share",
            Self::RowExclusive => "row exclusive",
            Self::Share => "share",
            Self::Exclusive => "exclusive",
            Self::AccessExclusive => "access exclusive",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lock<'s> {
    table: TableSyntax<'s>,
    mode: LockMode,
}

impl<'s> Lock<'s> {
    pub fn new(table: TableSyntax<'s>, mode: LockMode) -> Self {
        Self { table, mode }
    }

    pub fn exclusive(table: TableSyntax<'s>) -> Self {
        Self::new(table, LockMode::Exclusive)
    }

    pub(crate) fn render(&self, qg: &QueryGenerator) -> SqlFragment {
        let mut frag = SqlFragment::from_text("lock table ");
        frag.append(self.table.render(qg));
        frag.push_str(&format!(" in {} mode", self.mode.as_sql()));
        frag
    }
}

#[derive(Debug, Clone)]
pub enum Statement<'s> {
    Select(Select<'s>),
    Insert(Insert<'s>),
    Update(Update<'s>),
    Delete(Delete<'s>),
    Lock(Lock<'s>),
}

impl<'s> Statement<'s> {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "select",
            Statement::Insert(_) => "insert",
            Statement::Update(_) => "update",
            Statement::Delete(_) => "delete",
            Statement::Lock(_) => "lock",
        }
    }

    /// Render with placeholders numbered from one.
    pub fn to_sql(&self, qg: &QueryGenerator) -> SqlFragment {
        qg.reset();
        let frag = match self {
            Statement::Select(s) => s.render(qg),
            Statement::Insert(s) => s.render(qg),
            Statement::Update(s) => s.render(qg),
            Statement::Delete(s) => s.render(qg),
            Statement::Lock(s) => s.render(qg),
        };
        log::debug!("rendered {}: {}", self.kind(), frag.text);
        frag
    }

    /// Render in the executor's style, bind `bindings` and execute.
    pub fn on<E: StatementExecutor>(
        &self,
        executor: &mut E,
        bindings: &Bindings,
        raise_on_zero_row_count: bool,
    ) -> Result<Vec<Row>, DalError> {
        let qg = QueryGenerator::new(executor.dialect(), executor.placeholder());
        let fragment = self.to_sql(&qg).bind(bindings)?;
        let parameters = fragment.values()?;
        log::debug!("executing {} with {} parameters", self.kind(), parameters.len());
        executor
            .execute(&fragment.text, &parameters, raise_on_zero_row_count)
            .map_err(|e| DalError::Execute(Box::new(e)))
    }
}

macro_rules! statement_from {
    ($($kind:ident),*) => {
        $(
            impl<'s> From<$kind<'s>> for Statement<'s> {
                fn from(statement: $kind<'s>) -> Self {
                    Statement::$kind(statement)
                }
            }
        )*
    };
}

statement_from!(Select, Insert, Update, Delete, Lock);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Schema;
    use crate::sql::{schema_from_str, Dialect};
    use crate::syntax::executor::testing::{NoRows, RecordingExecutor};
    use crate::syntax::{ExpressionSyntax, Function, JoinType, Parameter, SchemaSyntax};
    use crate::value::Value;

    fn schema() -> Schema {
        schema_from_str(
            "create table FOO (
                 BAR integer not null,
                 BAZ varchar(255) not null,
                 QUX integer default 0 not null,
                 QUUX text
             );
             create table BOZ (QUX integer, QUUX integer);",
        )
        .unwrap()
    }

    fn sql<'s>(statement: impl Into<Statement<'s>>) -> SqlFragment {
        statement.into().to_sql(&QueryGenerator::default())
    }

    #[test]
    fn test_insert_requires_values() {
        let schema = schema();
        let foo = SchemaSyntax::new(&schema).table("FOO").unwrap();
        let col = |n| foo.column(n).unwrap();

        match Insert::new([(col("QUX"), 1.into())]) {
            Err(DalError::NotEnoughValues { columns }) => assert_eq!(columns, vec!["BAR", "BAZ"]),
            other => panic!("unexpected {:?}", other),
        }

        let insert = Insert::new([
            (col("BAZ"), "two".into()),
            (col("QUUX"), Value::Null.into()),
            (col("BAR"), 1.into()),
        ])
        .unwrap();
        let frag = sql(insert);
        assert_eq!(
            frag.text,
            "insert into FOO (BAR, BAZ, QUUX) values (%s, %s, %s)"
        );
        assert_eq!(
            frag.values().unwrap(),
            vec![Value::Int(1), Value::Text("two".into()), Value::Null]
        );
    }

    #[test]
    fn test_column_maps_must_name_one_table() {
        let schema = schema();
        let syntax = SchemaSyntax::new(&schema);
        let foo = syntax.table("FOO").unwrap();
        let boz = syntax.table("BOZ").unwrap();

        let values: [(ColumnSyntax<'_>, Expression<'_>); 2] = [
            (foo.column("BAR").unwrap(), 1.into()),
            (boz.column("QUX").unwrap(), 2.into()),
        ];
        assert!(matches!(
            Insert::new(values.clone()),
            Err(DalError::TableMismatch(_))
        ));
        assert!(matches!(
            Update::new(values, foo.column("BAR").unwrap().eq(1)),
            Err(DalError::TableMismatch(_))
        ));
        assert!(matches!(
            Insert::new(Vec::new()),
            Err(DalError::EmptyColumnMap)
        ));
    }

    #[test]
    fn test_select_rejects_foreign_columns() {
        let schema = schema();
        let syntax = SchemaSyntax::new(&schema);
        let foo = syntax.table("FOO").unwrap();
        let boz = syntax.table("BOZ").unwrap();

        let result = Select::new(
            [foo.column("BAR").unwrap().into(), boz.column("QUX").unwrap().into()],
            foo,
        );
        assert!(matches!(result, Err(DalError::TableMismatch(_))));
    }

    #[test]
    fn test_select_qualifies_shared_names_in_joins() {
        let schema = schema();
        let syntax = SchemaSyntax::new(&schema);
        let foo = syntax.table("FOO").unwrap();
        let boz = syntax.table("BOZ").unwrap();
        let on = foo.column("QUX").unwrap().eq(boz.column("QUX").unwrap());

        let select = Select::new(
            [
                foo.column("BAR").unwrap().into(),
                foo.column("QUX").unwrap().into(),
                boz.column("QUUX").unwrap().into(),
            ],
            foo.join(boz, on),
        )
        .unwrap()
        .where_(foo.column("BAR").unwrap().eq(7));
        assert_eq!(
            sql(select).text,
            "select BAR, FOO.QUX, BOZ.QUUX from FOO join BOZ on FOO.QUX = BOZ.QUX where BAR = %s"
        );
    }

    #[test]
    fn test_update_parameter_order() {
        let schema = schema();
        let foo = SchemaSyntax::new(&schema).table("FOO").unwrap();
        let col = |n| foo.column(n).unwrap();

        let update = Update::new(
            [(col("BAZ"), 2.into()), (col("BAR"), 1.into())],
            col("QUX").eq(3),
        )
        .unwrap();
        let frag = sql(update);
        assert_eq!(frag.text, "update FOO set BAR = %s, BAZ = %s where QUX = %s");
        assert_eq!(
            frag.values().unwrap(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn test_select_clauses() {
        let schema = schema();
        let foo = SchemaSyntax::new(&schema).table("FOO").unwrap();
        let col = |n| foo.column(n).unwrap();

        let select = Select::new(
            [col("BAZ").into(), Function::COUNT.call([Expression::all_columns()])],
            foo,
        )
        .unwrap()
        .distinct()
        .where_(col("QUUX").is_not_null())
        .group_by([col("BAZ").into()])
        .having(Function::COUNT.call([Expression::all_columns()]).gt(1))
        .order_by([col("BAZ").into()])
        .descending()
        .limit(10);
        assert_eq!(
            sql(select).text,
            "select distinct BAZ, count(*) from FOO where QUUX is not null \
             group by BAZ having count(*) > %s order by BAZ desc limit %s"
        );

        let locked = Select::all(foo).where_(col("BAR").eq(1)).nowait();
        assert_eq!(
            sql(locked).text,
            "select * from FOO where BAR = %s for update nowait"
        );
    }

    #[test]
    fn test_numeric_placeholders_follow_text_order() {
        let schema = schema();
        let syntax = SchemaSyntax::new(&schema);
        let foo = syntax.table("FOO").unwrap();
        let boz = syntax.table("BOZ").unwrap();

        let inner = Select::new([boz.column("QUX").unwrap().into()], boz)
            .unwrap()
            .where_(boz.column("QUUX").unwrap().gt(5));
        let select = Select::all(foo)
            .where_(foo.column("BAR").unwrap().eq(1).and(foo.column("QUX").unwrap().in_(inner)))
            .limit(3);
        let statement = Statement::from(select);
        let qg = QueryGenerator::for_dialect(Dialect::Oracle);
        let frag = statement.to_sql(&qg);
        assert_eq!(
            frag.text,
            "select * from FOO where BAR = :1 and QUX in (select QUX from BOZ where QUUX > :2) limit :3"
        );
        // rendering again restarts the numbering
        assert_eq!(statement.to_sql(&qg).text, frag.text);
    }

    #[test]
    fn test_delete_and_lock() {
        let schema = schema();
        let foo = SchemaSyntax::new(&schema).table("FOO").unwrap();

        let delete = Delete::new(foo, foo.column("BAR").unwrap().eq(Parameter::new("bar")))
            .returning([foo.column("BAZ").unwrap().into()]);
        assert_eq!(sql(delete).text, "delete from FOO where BAR = %s returning BAZ");
        assert_eq!(sql(Lock::exclusive(foo)).text, "lock table FOO in exclusive mode");
    }

    #[test]
    fn test_cross_join_statement() {
        let schema = schema();
        let syntax = SchemaSyntax::new(&schema);
        let foo = syntax.table("FOO").unwrap();
        let boz = syntax.table("BOZ").unwrap();

        let select = Select::all(foo.join_type(JoinType::Cross, boz, None).unwrap());
        assert_eq!(sql(select).text, "select * from FOO cross join BOZ");
    }

    #[test]
    fn test_on_binds_and_executes() {
        let schema = schema();
        let foo = SchemaSyntax::new(&schema).table("FOO").unwrap();
        let bar = foo.column("BAR").unwrap();

        let statement: Statement<'_> = Select::new([foo.column("BAZ").unwrap().into()], foo)
            .unwrap()
            .where_(bar.in_(Parameter::counted("bars", 2)))
            .into();
        let mut executor = RecordingExecutor::new(Dialect::Sqlite);
        executor.rows = vec![vec![Value::Text("x".into())]];

        let rows = statement
            .on(&mut executor, &Bindings::new().with_list("bars", [4, 5]), false)
            .unwrap();
        assert_eq!(rows, vec![vec![Value::Text("x".into())]]);
        assert_eq!(
            executor.calls,
            vec![(
                "select BAZ from FOO where BAR in (?, ?)".to_string(),
                vec![Value::Int(4), Value::Int(5)],
                false,
            )]
        );

        assert!(matches!(
            statement.on(&mut executor, &Bindings::new(), false),
            Err(DalError::UnboundParameter(_))
        ));
        executor.rows.clear();
        match statement.on(&mut executor, &Bindings::new().with_list("bars", [1, 2]), true) {
            Err(DalError::Execute(e)) => assert!(e.downcast_ref::<NoRows>().is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }
}

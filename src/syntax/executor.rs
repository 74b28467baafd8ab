//! Boundary to whatever actually runs the rendered SQL.

use super::generator::Placeholder;
use crate::sql::Dialect;
use crate::value::Value;

pub type Row = Vec<Value>;

/// Runs rendered statements, typically against a pooled connection or an
/// open transaction.
pub trait StatementExecutor {
    type Error: std::error::Error + Send + Sync + 'static;

    fn dialect(&self) -> Dialect;

    fn placeholder(&self) -> Placeholder {
        self.dialect().default_placeholder()
    }

    /// Execute `sql` with positional `parameters`.
    ///
    /// With `raise_on_zero_row_count` the executor reports an error when the
    /// statement affected no rows.
    fn execute(
        &mut self,
        sql: &str,
        parameters: &[Value],
        raise_on_zero_row_count: bool,
    ) -> Result<Vec<Row>, Self::Error>;
}

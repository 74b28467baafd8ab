pub mod catalog;
pub mod describe;
pub mod sql;
pub mod syntax;
pub mod value;

use wasm_bindgen::prelude::*;

pub use catalog::{CatalogError, Schema};
pub use describe::describe;
pub use sql::{add_sql_to_schema, schema_from_str, CompileError, Dialect};
pub use syntax::{DalError, SchemaSyntax, Statement};
pub use value::Value;

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Compile DDL source and return the catalog listing
#[wasm_bindgen(js_name = "compileSchema")]
pub fn compile_schema(source: &str) -> Result<String, String> {
    let schema = schema_from_str(source).map_err(|e| e.to_string())?;
    Ok(describe(&schema))
}

/// Discrepancies of schema `a` against schema `b`, one per line
#[wasm_bindgen(js_name = "schemaDiff")]
pub fn schema_diff(a: &str, b: &str) -> Result<String, String> {
    let mut mine = Schema::new("a");
    add_sql_to_schema(&mut mine, a).map_err(|e| e.to_string())?;
    let mut theirs = Schema::new("b");
    add_sql_to_schema(&mut theirs, b).map_err(|e| e.to_string())?;
    Ok(mine.compare(&theirs).join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_schema_reports_errors() {
        assert!(compile_schema("create table T (A integer)").is_ok());
        let err = compile_schema("create table T (A integer bogus)").unwrap_err();
        assert!(err.contains("column modifier"));
    }

    #[test]
    fn test_schema_diff() {
        let report = schema_diff(
            "create table T (A integer, B integer)",
            "create table T (A integer); create sequence S",
        )
        .unwrap();
        assert_eq!(
            report,
            "Table: T, extra column: B\nSchema: b, missing sequence: S"
        );
        assert_eq!(schema_diff("create sequence S", "create sequence s").unwrap(), "");
    }
}

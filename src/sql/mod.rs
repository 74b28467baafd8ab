//! DDL source to schema catalog compilation.

mod compiler;
mod dialect;
mod group;
mod lexer;
mod token;
mod types;

pub use compiler::{
    add_sql_to_schema, compile_index, compile_insert, compile_sequence, compile_statement,
    compile_table, schema_from_str, CompileError,
};
pub use dialect::{quote_identifier, Dialect};
pub use group::statements;
pub use lexer::{LexError, Lexer};
pub use token::{normalize, Token};
pub use types::normalize_type;

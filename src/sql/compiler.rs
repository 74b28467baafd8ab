//! DDL compiler: turns grouped statement tokens into catalog objects.
//!
//! Every entry point works on the tokens of exactly one statement and either
//! commits the whole statement to the [`Schema`] or returns an error without
//! touching it.

use super::group;
use super::lexer::LexError;
use super::token::{normalize, Token};
use super::types::{is_known_type, normalize_type};
use crate::catalog::{
    CatalogError, CheckExpr, DefaultValue, DeleteAction, Index, ProcedureCall, Schema,
    SequenceId, SqlType, Table, TableId,
};
use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Violated expectation: expected {expected}, got {got}")]
    ViolatedExpectation { expected: String, got: String },
    #[error("Invalid {kind} literal: {text}")]
    InvalidLiteral { kind: &'static str, text: String },
    #[error("Unsupported statement: {0}")]
    UnsupportedStatement(String),
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

fn violated(expected: impl Into<String>, got: Option<&Token>) -> CompileError {
    CompileError::ViolatedExpectation {
        expected: expected.into(),
        got: match got {
            Some(tok) => format!("{} {}", tok.kind(), tok),
            None => "end of statement".to_string(),
        },
    }
}

/// Undo single-quote literal spelling: strip the quotes, collapse `''`.
fn destringify(raw: &str) -> Result<String, CompileError> {
    raw.strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .map(|s| s.replace("''", "'"))
        .ok_or_else(|| CompileError::InvalidLiteral {
            kind: "string",
            text: raw.to_string(),
        })
}

fn parse_int(raw: &str) -> Result<i64, CompileError> {
    raw.parse().map_err(|_| CompileError::InvalidLiteral {
        kind: "integer",
        text: raw.to_string(),
    })
}

/// Position-based reader over one nesting level of tokens.
struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn next_or(&mut self, expected: &str) -> Result<&'t Token, CompileError> {
        self.next().ok_or_else(|| violated(expected, None))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), CompileError> {
        match self.next() {
            Some(tok) if tok.is_keyword(keyword) => Ok(()),
            other => Err(violated(keyword, other)),
        }
    }

    fn expect_name(&mut self, what: &str) -> Result<&'t str, CompileError> {
        let tok = self.next();
        tok.and_then(Token::name).ok_or_else(|| violated(what, tok))
    }

    fn expect_paren(&mut self) -> Result<&'t [Token], CompileError> {
        match self.next() {
            Some(Token::Parenthesis(inner)) => Ok(inner),
            other => Err(violated("parenthesis", other)),
        }
    }

    fn expect_end(&mut self) -> Result<(), CompileError> {
        match self.next() {
            None => Ok(()),
            other => Err(violated("end of statement", other)),
        }
    }
}

/// Whether `tok` is the bare word `word`, reserved or not.
fn word_is(tok: &Token, word: &str) -> bool {
    match tok {
        Token::Keyword(k) => k.eq_ignore_ascii_case(word),
        Token::Name(_) | Token::Identifier(_) => {
            tok.name().is_some_and(|n| n.eq_ignore_ascii_case(word))
        }
        _ => false,
    }
}

/// Split a `Function` token into its name and argument tokens.
fn function_parts(parts: &[Token]) -> Option<(&str, &[Token])> {
    match parts {
        [ident, Token::Parenthesis(args)] => ident.name().map(|n| (n, args.as_slice())),
        _ => None,
    }
}

/// `name (, name)*` filling a whole parenthesis.
fn names_in_parens(inner: &[Token]) -> Result<Vec<&str>, CompileError> {
    let mut cur = Cursor::new(inner);
    let mut names = vec![cur.expect_name("identifier or list")?];
    while let Some(tok) = cur.next() {
        if !tok.is_punct(',') {
            return Err(violated("',' or ')'", Some(tok)));
        }
        names.push(cur.expect_name("identifier")?);
    }
    Ok(names)
}

/// Comma separated literals of an `INSERT ... VALUES (...)`.
fn literal_list(inner: &[Token]) -> Result<Vec<Value>, CompileError> {
    let mut cur = Cursor::new(inner);
    let mut values = Vec::new();
    loop {
        let tok = cur.next_or("literal")?;
        values.push(literal(tok).ok_or_else(|| violated("integer or string literal", Some(tok)))??);
        match cur.next() {
            None => return Ok(values),
            Some(tok) if tok.is_punct(',') => {}
            other => return Err(violated("',' or ')'", other)),
        }
    }
}

/// Decode a literal token; `None` when the token is not a literal at all.
fn literal(tok: &Token) -> Option<Result<Value, CompileError>> {
    match tok {
        Token::IntLit(raw) => Some(parse_int(raw).map(Value::Int)),
        Token::StringLit(raw) => Some(destringify(raw).map(Value::Text)),
        t if t.is_keyword("NULL") => Some(Ok(Value::Null)),
        t if t.is_keyword("TRUE") => Some(Ok(Value::Bool(true))),
        t if t.is_keyword("FALSE") => Some(Ok(Value::Bool(false))),
        _ => None,
    }
}

/// Compile `CREATE TABLE name (columns and constraints)`.
pub fn compile_table(schema: &mut Schema, tokens: &[Token]) -> Result<TableId, CompileError> {
    let comment: String = tokens
        .iter()
        .take_while(|t| !t.is_significant())
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    let tokens = normalize(tokens.to_vec());
    let mut cur = Cursor::new(&tokens);

    cur.expect_keyword("CREATE")?;
    cur.expect_keyword("TABLE")?;
    let (name, body) = match cur.next() {
        Some(tok @ Token::Function(parts)) => {
            function_parts(parts).ok_or_else(|| violated("table name and body", Some(tok)))?
        }
        Some(tok @ (Token::Identifier(_) | Token::Name(_))) => {
            let name = tok.name().ok_or_else(|| violated("table name", Some(tok)))?;
            (name, cur.expect_paren()?)
        }
        other => return Err(violated("table name", other)),
    };
    cur.expect_end()?;

    let mut table = schema.new_table(name)?;
    table.comment = comment;
    let sequence_refs = ColumnParser::new(schema, &mut table, body).parse()?;

    let id = schema.add_table(table)?;
    for (sequence, column) in sequence_refs {
        schema.add_sequence_reference(sequence, (id, column));
    }
    log::debug!("compiled table {}", schema.table(id).name);
    Ok(id)
}

/// Compile `CREATE [UNIQUE] INDEX name ON table [USING method] (columns)`.
pub fn compile_index(schema: &mut Schema, tokens: &[Token]) -> Result<(), CompileError> {
    let tokens = normalize(tokens.to_vec());
    let mut cur = Cursor::new(&tokens);

    cur.expect_keyword("CREATE")?;
    let unique = cur.peek().is_some_and(|t| t.is_keyword("UNIQUE"));
    if unique {
        cur.next();
    }
    cur.expect_keyword("INDEX")?;
    let name = cur.expect_name("index name")?;
    cur.expect_keyword("ON")?;

    let (table_name, columns, method) = match cur.next() {
        Some(tok @ Token::Function(parts)) => {
            let (table_name, args) =
                function_parts(parts).ok_or_else(|| violated("table and columns", Some(tok)))?;
            (table_name, args, None)
        }
        Some(tok @ (Token::Identifier(_) | Token::Name(_))) => {
            let table_name = tok.name().ok_or_else(|| violated("table name", Some(tok)))?;
            cur.expect_keyword("USING")?;
            match cur.next() {
                Some(tok @ Token::Function(parts)) => {
                    let (method, args) = function_parts(parts)
                        .ok_or_else(|| violated("index method and columns", Some(tok)))?;
                    (table_name, args, Some(method.to_string()))
                }
                other => return Err(violated("index method and columns", other)),
            }
        }
        other => return Err(violated("table name", other)),
    };
    cur.expect_end()?;

    let table = schema.table_named(table_name)?;
    let columns = names_in_parens(columns)?
        .into_iter()
        .map(|c| table.column_index(c))
        .collect::<Result<Vec<_>, _>>()?;
    let index = Index {
        name: name.to_string(),
        table: table.id,
        unique,
        method,
        columns,
    };
    schema.add_index(index)?;
    log::debug!("compiled index {}", name);
    Ok(())
}

/// Compile `CREATE SEQUENCE name`.
pub fn compile_sequence(schema: &mut Schema, tokens: &[Token]) -> Result<SequenceId, CompileError> {
    let tokens = normalize(tokens.to_vec());
    let mut cur = Cursor::new(&tokens);

    cur.expect_keyword("CREATE")?;
    cur.expect_keyword("SEQUENCE")?;
    let name = cur.expect_name("sequence name")?;
    cur.expect_end()?;

    let id = schema.add_sequence(name)?;
    log::debug!("compiled sequence {}", name);
    Ok(id)
}

/// Compile `INSERT INTO table VALUES (literals)` into a seed row.
pub fn compile_insert(schema: &mut Schema, tokens: &[Token]) -> Result<(), CompileError> {
    let tokens = normalize(tokens.to_vec());
    let mut cur = Cursor::new(&tokens);

    cur.expect_keyword("INSERT")?;
    cur.expect_keyword("INTO")?;
    let table_name = cur.expect_name("table name")?;
    cur.expect_keyword("VALUES")?;
    let values = literal_list(cur.expect_paren()?)?;
    cur.expect_end()?;

    schema.table_named_mut(table_name)?.insert_schema_row(values)?;
    log::debug!("compiled seed row for {}", table_name);
    Ok(())
}

/// Dispatch one statement by kind. Comment-only statements are skipped.
pub fn compile_statement(schema: &mut Schema, tokens: &[Token]) -> Result<(), CompileError> {
    let mut significant = tokens.iter().filter(|t| t.is_significant());
    let first = match significant.next() {
        Some(tok) => tok,
        None => return Ok(()),
    };
    let second = significant.next();

    if first.is_keyword("CREATE") {
        match second {
            Some(t) if t.is_keyword("TABLE") => compile_table(schema, tokens).map(|_| ()),
            Some(t) if t.is_keyword("SEQUENCE") => compile_sequence(schema, tokens).map(|_| ()),
            Some(t) if t.is_keyword("INDEX") || t.is_keyword("UNIQUE") => {
                compile_index(schema, tokens)
            }
            other => Err(violated("TABLE, SEQUENCE, INDEX or UNIQUE", other)),
        }
    } else if first.is_keyword("INSERT") {
        compile_insert(schema, tokens)
    } else {
        let preview: Vec<String> = tokens
            .iter()
            .filter(|t| t.is_significant())
            .take(3)
            .map(|t| t.to_string())
            .collect();
        Err(CompileError::UnsupportedStatement(preview.join(" ")))
    }
}

/// Compile a whole script into `schema`, statement by statement.
///
/// Statements before a failing one stay committed.
pub fn add_sql_to_schema(schema: &mut Schema, source: &str) -> Result<(), CompileError> {
    for statement in group::statements(source)? {
        compile_statement(schema, &statement)?;
    }
    Ok(())
}

/// Compile a script into a fresh default-dialect schema.
pub fn schema_from_str(source: &str) -> Result<Schema, CompileError> {
    let mut schema = Schema::default();
    add_sql_to_schema(&mut schema, source)?;
    Ok(schema)
}

/// Stateful reader over the body of a `CREATE TABLE`.
struct ColumnParser<'a, 't> {
    schema: &'a Schema,
    table: &'a mut Table,
    cur: Cursor<'t>,
    sequence_refs: Vec<(SequenceId, usize)>,
}

impl<'a, 't> ColumnParser<'a, 't> {
    fn new(schema: &'a Schema, table: &'a mut Table, body: &'t [Token]) -> Self {
        Self {
            schema,
            table,
            cur: Cursor::new(body),
            sequence_refs: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<(SequenceId, usize)>, CompileError> {
        while self.next_column()? {}
        Ok(self.sequence_refs)
    }

    /// Parse one column or constraint; `true` if another one follows.
    fn next_column(&mut self) -> Result<bool, CompileError> {
        let tok = self.cur.next_or("column or constraint")?;
        match tok {
            Token::Identifier(_) | Token::Name(_) => match tok.name() {
                Some(name) => self.parse_column(name),
                None => Err(violated("column name", Some(tok))),
            },
            _ => self.parse_constraint(tok),
        }
    }

    fn check_end(&mut self) -> Result<bool, CompileError> {
        match self.cur.next() {
            None => Ok(false),
            Some(tok) if tok.is_punct(',') => Ok(true),
            other => Err(violated("',' or ')'", other)),
        }
    }

    fn type_length(args: &[Token]) -> Result<u32, CompileError> {
        match args {
            [Token::IntLit(raw)] => raw.parse().map_err(|_| CompileError::InvalidLiteral {
                kind: "type length",
                text: raw.clone(),
            }),
            [first, ..] => Err(violated("type length", Some(first))),
            [] => Err(violated("type length", None)),
        }
    }

    fn set_primary_key(&mut self, columns: Vec<usize>, at: &Token) -> Result<(), CompileError> {
        if self.table.primary_key.is_some() {
            return Err(violated("at most one primary key", Some(at)));
        }
        self.table.primary_key = Some(columns);
        Ok(())
    }

    fn column_indexes(&self, names: &[&str]) -> Result<Vec<usize>, CompileError> {
        names
            .iter()
            .map(|n| self.table.column_index(n).map_err(CompileError::from))
            .collect()
    }

    /// Type name with optional length, including the multi-word Postgres
    /// spellings `double precision`, `character varying` and
    /// `time[stamp] with[out] time zone`.
    fn column_type(&mut self) -> Result<SqlType, CompileError> {
        let type_tok = self.cur.next_or("column type")?;
        let (mut type_name, mut length) = match type_tok {
            Token::Function(parts) => {
                let (type_name, args) = function_parts(parts)
                    .ok_or_else(|| violated("column type", Some(type_tok)))?;
                (type_name.to_string(), Some(Self::type_length(args)?))
            }
            Token::Identifier(_) | Token::Name(_) => {
                let type_name = type_tok
                    .name()
                    .ok_or_else(|| violated("column type", Some(type_tok)))?;
                (type_name.to_string(), None)
            }
            other => return Err(violated("column type", Some(other))),
        };

        match (type_name.to_lowercase().as_str(), self.cur.peek()) {
            ("double", Some(tok)) if word_is(tok, "precision") => {
                self.cur.next();
                type_name = format!("{} {}", type_name, tok);
            }
            ("character", Some(tok @ Token::Function(parts))) => {
                if let Some((varying, args)) = function_parts(parts)
                    .filter(|(n, _)| n.eq_ignore_ascii_case("varying"))
                {
                    self.cur.next();
                    type_name = format!("{} {}", type_name, varying);
                    length = Some(Self::type_length(args)?);
                } else {
                    return Err(violated("varying", Some(tok)));
                }
            }
            ("character", Some(tok)) if word_is(tok, "varying") => {
                self.cur.next();
                type_name = format!("{} {}", type_name, tok);
            }
            ("timestamp" | "time", Some(tok)) if word_is(tok, "with") || word_is(tok, "without") => {
                self.cur.next();
                for expected in ["time", "zone"] {
                    match self.cur.next() {
                        Some(t) if word_is(t, expected) => {}
                        other => return Err(violated(expected, other)),
                    }
                }
                type_name = format!("{} {} time zone", type_name, tok);
            }
            _ => {}
        }

        if length.is_none() {
            if let Some(Token::Parenthesis(args)) = self.cur.peek() {
                self.cur.next();
                length = Some(Self::type_length(args)?);
            }
        }
        if !is_known_type(&type_name) {
            return Err(violated("column type", Some(type_tok)));
        }
        Ok(SqlType::new(type_name, length))
    }

    fn parse_column(&mut self, name: &str) -> Result<bool, CompileError> {
        let sql_type = self.column_type()?;
        let column = self.table.add_column(name, sql_type)?;

        loop {
            let tok = match self.cur.next() {
                None => return Ok(false),
                Some(tok) => tok,
            };
            if tok.is_punct(',') {
                return Ok(true);
            } else if tok.is_keyword("PRIMARY") {
                self.cur.expect_keyword("KEY")?;
                self.set_primary_key(vec![column], tok)?;
            } else if tok.is_keyword("UNIQUE") {
                self.table.add_unique(vec![column], None);
            } else if tok.is_keyword("NOT") {
                self.cur.expect_keyword("NULL")?;
                self.table.add_not_null(column);
            } else if tok.is_keyword("NULL") {
                // explicitly nullable, the default
            } else if tok.is_keyword("CHECK") {
                let inner = self.cur.expect_paren()?;
                let expr = self.read_expression(inner)?;
                self.table.add_check(expr, None);
            } else if tok.is_keyword("DEFAULT") {
                self.parse_default(column)?;
            } else if tok.is_keyword("REFERENCES") {
                self.parse_reference(column)?;
            } else if tok.is_keyword("ON") {
                self.cur.expect_keyword("DELETE")?;
                let action = self.cur.next_or("CASCADE or SET")?;
                let action = if action.is_keyword("CASCADE") {
                    DeleteAction::Cascade
                } else if action.is_keyword("SET") {
                    match self.cur.next() {
                        Some(t) if t.is_keyword("NULL") => DeleteAction::SetNull,
                        Some(t) if t.is_keyword("DEFAULT") => DeleteAction::SetDefault,
                        other => return Err(violated("NULL or DEFAULT", other)),
                    }
                } else {
                    return Err(violated("CASCADE or SET", Some(action)));
                };
                self.table.columns[column].delete_action = Some(action);
            } else {
                return Err(violated("column modifier", Some(tok)));
            }
        }
    }

    fn parse_default(&mut self, column: usize) -> Result<(), CompileError> {
        let mut tok = self.cur.next_or("default value")?;
        if let Token::Parenthesis(inner) = tok {
            tok = match inner.as_slice() {
                [single] => single,
                _ => return Err(violated("single default expression", Some(tok))),
            };
        }

        let default = match tok {
            Token::Function(parts) => {
                let (name, args) =
                    function_parts(parts).ok_or_else(|| violated("default value", Some(tok)))?;
                if name.eq_ignore_ascii_case("nextval") {
                    let sequence_name = match args {
                        [Token::StringLit(raw)] => destringify(raw)?,
                        [first, ..] => return Err(violated("sequence name", Some(first))),
                        [] => return Err(violated("sequence name", None)),
                    };
                    let sequence = self.schema.sequence_named(&sequence_name)?.id;
                    self.sequence_refs.push((sequence, column));
                    DefaultValue::Sequence(sequence)
                } else {
                    DefaultValue::Procedure(ProcedureCall {
                        name: name.to_string(),
                        args: args.to_vec(),
                    })
                }
            }
            t if t.is_keyword("NULL") => DefaultValue::Null,
            t => match literal(t) {
                Some(value) => DefaultValue::Literal(value?),
                None => return Err(violated("default value", Some(t))),
            },
        };
        self.table.columns[column].default = Some(default);
        Ok(())
    }

    fn parse_reference(&mut self, column: usize) -> Result<(), CompileError> {
        let tok = self.cur.next_or("referenced table")?;
        let target = match tok {
            Token::Function(parts) => function_parts(parts).map(|(name, _)| name),
            t => t.name(),
        }
        .ok_or_else(|| violated("referenced table", Some(tok)))?;

        let dialect = self.schema.dialect;
        let target_table: &Table =
            if dialect.identifier_key(target) == dialect.identifier_key(&self.table.name) {
                &*self.table
            } else {
                self.schema.table_named(target)?
            };

        let own_type = &self.table.columns[column].sql_type;
        if let [pk] = target_table.primary_key_columns().as_slice() {
            if normalize_type(&pk.sql_type.name, dialect) != normalize_type(&own_type.name, dialect)
            {
                log::warn!(
                    "{}.{} ({}) references {} whose primary key is {}",
                    self.table.name,
                    self.table.columns[column].name,
                    own_type,
                    target_table.name,
                    pk.sql_type
                );
            }
        }
        let target_id = target_table.id;
        self.table.columns[column].references = Some(target_id);
        Ok(())
    }

    fn parse_constraint(&mut self, tok: &'t Token) -> Result<bool, CompileError> {
        let (name, kind) = if tok.is_keyword("CONSTRAINT") {
            let name = self.cur.expect_name("constraint name")?;
            (Some(name.to_string()), self.cur.next_or("constraint type")?)
        } else {
            (None, tok)
        };

        if kind.is_keyword("PRIMARY") {
            self.cur.expect_keyword("KEY")?;
            let names = names_in_parens(self.cur.expect_paren()?)?;
            let columns = self.column_indexes(&names)?;
            self.set_primary_key(columns, kind)?;
        } else if kind.is_keyword("UNIQUE") {
            let names = names_in_parens(self.cur.expect_paren()?)?;
            let columns = self.column_indexes(&names)?;
            self.table.add_unique(columns, name);
        } else if kind.is_keyword("CHECK") {
            let inner = self.cur.expect_paren()?;
            let expr = self.read_expression(inner)?;
            self.table.add_check(expr, name);
        } else {
            return Err(violated("PRIMARY, UNIQUE or CHECK", Some(kind)));
        }
        self.check_end()
    }

    /// A single `lhs op rhs` comparison filling a whole parenthesis.
    fn read_expression(&self, inner: &[Token]) -> Result<CheckExpr, CompileError> {
        let mut cur = Cursor::new(inner);
        let lhs = self.operand(cur.next_or("expression")?)?;
        let op = match cur.next() {
            Some(Token::Comparison(op)) => op.clone(),
            other => return Err(violated("comparison operator", other)),
        };
        let rhs = self.operand(cur.next_or("expression")?)?;
        match cur.next() {
            None => Ok(CheckExpr::Compare {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            }),
            other => Err(violated("end of expression", other)),
        }
    }

    fn operand(&self, tok: &Token) -> Result<CheckExpr, CompileError> {
        match tok {
            Token::Identifier(_) | Token::Name(_) => {
                let name = tok.name().ok_or_else(|| violated("column", Some(tok)))?;
                Ok(CheckExpr::Column(self.table.column_index(name)?))
            }
            Token::Function(parts) => {
                let (name, args) =
                    function_parts(parts).ok_or_else(|| violated("function call", Some(tok)))?;
                let names = names_in_parens(args)?;
                Ok(CheckExpr::Function {
                    name: name.to_string(),
                    args: self
                        .column_indexes(&names)?
                        .into_iter()
                        .map(CheckExpr::Column)
                        .collect(),
                })
            }
            t => match literal(t) {
                Some(value) => Ok(CheckExpr::Constant(value?)),
                None => Err(violated("column, literal or function", Some(t))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Constraint;

    fn compile(source: &str) -> Result<Schema, CompileError> {
        schema_from_str(source)
    }

    #[test]
    fn test_compile_table() {
        let schema = compile(
            r#"
            -- Calendar homes
            create table CALENDAR_HOME (
                RESOURCE_ID integer primary key,
                OWNER_UID   varchar(255) not null unique,
                STATUS      integer default 0 not null,
                NOTE        text default null
            );
            "#,
        )
        .unwrap();

        let table = schema.table_named("CALENDAR_HOME").unwrap();
        assert_eq!(table.comment, "-- Calendar homes");
        assert_eq!(table.columns.len(), 4);
        assert_eq!(table.columns[1].sql_type, SqlType::new("varchar", Some(255)));
        assert_eq!(table.primary_key, Some(vec![0]));
        assert_eq!(
            table.columns[2].default,
            Some(DefaultValue::Literal(Value::Int(0)))
        );
        assert_eq!(table.columns[3].default, Some(DefaultValue::Null));
        let needs: Vec<bool> = table.columns.iter().map(|c| table.needs_value(c)).collect();
        assert_eq!(needs, vec![false, true, false, false]);
        assert_eq!(table.uniques().collect::<Vec<_>>(), vec![&[1usize][..]]);
    }

    #[test]
    fn test_table_constraints() {
        let schema = compile(
            "create table T (A integer, B integer, C varchar(10), \
             primary key (A, B), unique (B, C), constraint positive check (A > 0))",
        )
        .unwrap();
        let table = schema.table_named("T").unwrap();
        assert_eq!(table.primary_key, Some(vec![0, 1]));
        assert_eq!(table.uniques().collect::<Vec<_>>(), vec![&[1usize, 2][..]]);
        match &table.constraints[1] {
            Constraint::Check(check) => {
                assert_eq!(check.name.as_deref(), Some("positive"));
                assert_eq!(
                    check.expression,
                    CheckExpr::Compare {
                        lhs: Box::new(CheckExpr::Column(0)),
                        op: ">".into(),
                        rhs: Box::new(CheckExpr::Constant(Value::Int(0))),
                    }
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_check_with_function() {
        let schema =
            compile("create table T (NAME varchar(255), check (character_length(NAME) > 0))")
                .unwrap();
        let table = schema.table_named("T").unwrap();
        assert_eq!(table.constraints[0].affects(), vec![0]);
    }

    #[test]
    fn test_sequence_default_and_references() {
        let schema = compile(
            "create sequence RESOURCE_ID_SEQ;
             create table HOME (RESOURCE_ID integer primary key default nextval('RESOURCE_ID_SEQ'));
             create table CHILD (
                 ID integer default nextval('RESOURCE_ID_SEQ'),
                 HOME_ID integer not null references HOME on delete cascade,
                 PARENT integer references CHILD(ID) on delete set null
             );",
        )
        .unwrap();

        let seq = schema.sequence_named("resource_id_seq").unwrap();
        let home = schema.table_named("HOME").unwrap();
        let child = schema.table_named("CHILD").unwrap();
        assert_eq!(seq.referring_columns, vec![(home.id, 0), (child.id, 0)]);
        assert_eq!(home.columns[0].default, Some(DefaultValue::Sequence(seq.id)));
        assert_eq!(child.columns[1].references, Some(home.id));
        assert_eq!(child.columns[1].delete_action, Some(DeleteAction::Cascade));
        assert_eq!(child.columns[2].references, Some(child.id));
        assert_eq!(child.columns[2].delete_action, Some(DeleteAction::SetNull));
    }

    #[test]
    fn test_procedure_default_kept_opaque() {
        let schema =
            compile("create table T (CREATED timestamp default timezone('UTC', now()))").unwrap();
        match &schema.table_named("T").unwrap().columns[0].default {
            Some(DefaultValue::Procedure(call)) => {
                assert_eq!(call.name, "timezone");
                assert_eq!(call.to_string(), "timezone('UTC', now())");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_boolean_and_parenthesized_defaults() {
        let schema =
            compile("create table T (A boolean default false, B integer default (-1))").unwrap();
        let table = schema.table_named("T").unwrap();
        assert_eq!(
            table.columns[0].default,
            Some(DefaultValue::Literal(Value::Bool(false)))
        );
        assert_eq!(
            table.columns[1].default,
            Some(DefaultValue::Literal(Value::Int(-1)))
        );
    }

    #[test]
    fn test_compile_index() {
        let schema = compile(
            "create table T (A integer, B integer);
             create index T_A on T (A);
             create unique index T_AB on T using btree (A, B);",
        )
        .unwrap();
        let plain = schema.index_named("T_A").unwrap();
        assert!(!plain.unique);
        assert_eq!(plain.columns, vec![0]);
        let unique = schema.index_named("t_ab").unwrap();
        assert!(unique.unique);
        assert_eq!(unique.method.as_deref(), Some("btree"));
        assert_eq!(unique.columns, vec![0, 1]);
    }

    #[test]
    fn test_insert_decodes_literals() {
        let schema = compile(
            "create table T (colA integer, colB varchar(20));
             insert into T values (1, 'it''s ok');",
        )
        .unwrap();
        let rows = &schema.table_named("T").unwrap().schema_rows;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["colA"], Value::Int(1));
        assert_eq!(rows[0]["colB"], Value::Text("it's ok".into()));
    }

    #[test]
    fn test_insert_single_value() {
        let schema = compile("create table T (A integer); insert into T values (7);").unwrap();
        assert_eq!(
            schema.table_named("T").unwrap().schema_rows[0]["A"],
            Value::Int(7)
        );
    }

    #[test]
    fn test_unrecognized_modifier_is_fatal() {
        let mut schema = Schema::default();
        let err = add_sql_to_schema(&mut schema, "CREATE TABLE T (x int FROBNICATE y)").unwrap_err();
        match err {
            CompileError::ViolatedExpectation { expected, got } => {
                assert_eq!(expected, "column modifier");
                assert_eq!(got, "identifier FROBNICATE");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(schema.table_named("T").is_err());
    }

    #[test]
    fn test_unknown_column_type_is_fatal() {
        let mut schema = Schema::default();
        let err =
            add_sql_to_schema(&mut schema, "CREATE TABLE T (x int, FROBNICATE y)").unwrap_err();
        match err {
            CompileError::ViolatedExpectation { expected, .. } => {
                assert_eq!(expected, "column type");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(schema.table_named("T").is_err());
    }

    #[test]
    fn test_missing_references_leave_no_table() {
        let mut schema = Schema::default();
        let err = add_sql_to_schema(&mut schema, "create table T (A integer references NOPE)")
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Catalog(CatalogError::NoSuchTable(_))
        ));
        assert!(schema.tables().is_empty());
    }

    #[test]
    fn test_multi_word_types() {
        let schema = compile(
            "create table T (
                 A double precision not null,
                 B character varying(255),
                 C timestamp with time zone default now(),
                 D time without time zone,
                 E character varying,
                 F inet
             )",
        )
        .unwrap();
        let table = schema.table_named("T").unwrap();
        let types: Vec<String> = table.columns.iter().map(|c| c.sql_type.to_string()).collect();
        assert_eq!(
            types,
            vec![
                "double precision",
                "character varying(255)",
                "timestamp with time zone",
                "time without time zone",
                "character varying",
                "inet",
            ]
        );
        assert!(!table.can_be_null(&table.columns[0]));
        assert!(matches!(
            table.columns[2].default,
            Some(DefaultValue::Procedure(_))
        ));

        let err = compile("create table T (A timestamp with zone)").unwrap_err();
        assert!(matches!(
            err,
            CompileError::ViolatedExpectation { expected, .. } if expected == "time"
        ));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let err = compile(
            "create table T (A integer, B integer);
             create index T_A on T (A);
             create index t_a on T (B);",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Catalog(CatalogError::Duplicate { kind: "index", .. })
        ));
    }

    #[test]
    fn test_on_delete_set_default() {
        let schema = compile(
            "create table HOME (ID integer primary key);
             create table CHILD (HOME_ID integer default 0 references HOME on delete set default);",
        )
        .unwrap();
        let child = schema.table_named("CHILD").unwrap();
        assert_eq!(child.columns[0].delete_action, Some(DeleteAction::SetDefault));
        assert_eq!(
            child.columns[0].references,
            Some(schema.table_named("HOME").unwrap().id)
        );
    }

    #[test]
    fn test_missing_sequence_leaves_no_table() {
        let mut schema = Schema::default();
        let err = add_sql_to_schema(
            &mut schema,
            "create table T (ID integer default nextval('MISSING'))",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::Catalog(CatalogError::NoSuchSequence(ref name)) if name == "MISSING"
        ));
        assert!(schema.tables().is_empty());
    }

    #[test]
    fn test_complex_check_rejected() {
        let err = compile("create table T (A integer, check (A > 0 and A < 5))").unwrap_err();
        assert!(matches!(err, CompileError::ViolatedExpectation { .. }));
    }

    #[test]
    fn test_unsupported_statement() {
        let err = compile("drop table T").unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedStatement(s) if s == "DROP TABLE T"));
        let err = compile("create view V").unwrap_err();
        assert!(matches!(err, CompileError::ViolatedExpectation { .. }));
    }

    #[test]
    fn test_compile_functions_on_raw_tokens() {
        let mut schema = Schema::default();
        let tokens = vec![
            Token::keyword("create"),
            Token::keyword("sequence"),
            Token::Name("S".into()),
        ];
        let id = compile_sequence(&mut schema, &tokens).unwrap();
        assert_eq!(schema.sequence(id).name, "S");

        let tokens = vec![
            Token::keyword("create"),
            Token::keyword("table"),
            Token::Name("T".into()),
            Token::Parenthesis(vec![Token::IdentifierList(vec![
                Token::Name("A".into()),
                Token::Name("integer".into()),
            ])]),
        ];
        let id = compile_table(&mut schema, &tokens).unwrap();
        assert_eq!(schema.table(id).columns[0].name, "A");
    }
}

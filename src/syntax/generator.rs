//! Placeholder and identifier spelling used while rendering statements.

use crate::sql::Dialect;
use std::cell::Cell;

/// How bound parameters are spelled in rendered SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// Same token for every parameter, e.g. `%s` or `?`.
    Fixed(String),
    /// Numbered in occurrence order: `:1`, `:2`, ...
    Numeric { prefix: String },
}

/// Rendering context for one statement.
///
/// Numeric placeholders are counted per generator, so a generator is reset
/// by [`QueryGenerator::reset`] before each top-level statement is rendered.
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    pub dialect: Dialect,
    pub placeholder: Placeholder,
    quote: fn(&str) -> String,
    counter: Cell<usize>,
}

impl QueryGenerator {
    pub fn new(dialect: Dialect, placeholder: Placeholder) -> Self {
        Self {
            dialect,
            placeholder,
            quote: dialect.quoter(),
            counter: Cell::new(0),
        }
    }

    /// Generator using the dialect's usual placeholder spelling.
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self::new(dialect, dialect.default_placeholder())
    }

    pub fn with_quoting(mut self, quote: fn(&str) -> String) -> Self {
        self.quote = quote;
        self
    }

    pub fn quote(&self, name: &str) -> String {
        (self.quote)(name)
    }

    /// Spell the next placeholder.
    pub fn next_placeholder(&self) -> String {
        match &self.placeholder {
            Placeholder::Fixed(token) => token.clone(),
            Placeholder::Numeric { prefix } => {
                let n = self.counter.get() + 1;
                self.counter.set(n);
                format!("{}{}", prefix, n)
            }
        }
    }

    pub fn reset(&self) {
        self.counter.set(0);
    }
}

impl Default for QueryGenerator {
    fn default() -> Self {
        Self::for_dialect(Dialect::default())
    }
}

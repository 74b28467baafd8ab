//! Target SQL dialect handling.

use crate::syntax::Placeholder;

/// SQL dialect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// PostgreSQL
    #[default]
    Postgres,
    /// Oracle
    Oracle,
    /// SQLite
    Sqlite,
}

impl Dialect {
    pub const ALL: [Dialect; 3] = [Self::Postgres, Self::Oracle, Self::Sqlite];

    /// Parse dialect from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "oracle" => Some(Self::Oracle),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Oracle => "oracle",
            Self::Sqlite => "sqlite",
        }
    }

    /// Longest identifier the server keeps; longer names are silently truncated.
    pub fn max_identifier_length(self) -> Option<usize> {
        match self {
            Self::Postgres => Some(63),
            Self::Oracle => Some(30),
            Self::Sqlite => None,
        }
    }

    /// Key under which two identifiers are considered the same object.
    pub fn identifier_key(self, name: &str) -> String {
        let lower = name.to_lowercase();
        match self.max_identifier_length() {
            Some(max) => lower.chars().take(max).collect(),
            None => lower,
        }
    }

    /// Placeholder spelling the usual driver for this dialect expects.
    pub fn default_placeholder(self) -> Placeholder {
        match self {
            Self::Postgres => Placeholder::Fixed("%s".to_string()),
            Self::Oracle => Placeholder::Numeric {
                prefix: ":".to_string(),
            },
            Self::Sqlite => Placeholder::Fixed("?".to_string()),
        }
    }

    pub fn quoter(self) -> fn(&str) -> String {
        quote_identifier
    }
}

/// Leave plain identifiers bare, double-quote anything else.
pub fn quote_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

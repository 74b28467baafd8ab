//! Token model consumed by the DDL compiler.
//!
//! Leaf tokens come straight from the lexer; composite tokens are built by
//! the grouping pass. Parenthesis children never include the delimiters.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Reserved word, upper-cased.
    Keyword(String),
    Punctuation(char),
    Name(String),
    /// Single-quoted string, raw (quotes and doubled quotes kept).
    StringLit(String),
    /// Integer literal, raw digits with optional sign.
    IntLit(String),
    /// Comparison operator such as `=` or `<=`.
    Comparison(String),
    /// Possibly dotted name: `Name (. Name)*`.
    Identifier(Vec<Token>),
    /// Comma separated single-token items, commas included.
    IdentifierList(Vec<Token>),
    Parenthesis(Vec<Token>),
    /// `[Identifier, Parenthesis]`
    Function(Vec<Token>),
    Comment(String),
}

impl Token {
    pub fn keyword(s: &str) -> Self {
        Token::Keyword(s.to_uppercase())
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        matches!(self, Token::Keyword(k) if k.eq_ignore_ascii_case(kw))
    }

    pub fn is_punct(&self, c: char) -> bool {
        matches!(self, Token::Punctuation(p) if *p == c)
    }

    pub fn is_significant(&self) -> bool {
        !matches!(self, Token::Comment(_))
    }

    /// The object name this token spells, if any.
    ///
    /// For a dotted identifier the last component is the name.
    pub fn name(&self) -> Option<&str> {
        match self {
            Token::Name(n) => Some(n),
            Token::Identifier(children) => children.iter().rev().find_map(|t| match t {
                Token::Name(n) => Some(n.as_str()),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Short class name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Keyword(_) => "keyword",
            Token::Punctuation(_) => "punctuation",
            Token::Name(_) => "name",
            Token::StringLit(_) => "string",
            Token::IntLit(_) => "integer",
            Token::Comparison(_) => "comparison",
            Token::Identifier(_) => "identifier",
            Token::IdentifierList(_) => "identifier list",
            Token::Parenthesis(_) => "parenthesis",
            Token::Function(_) => "function",
            Token::Comment(_) => "comment",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(s)
            | Token::Name(s)
            | Token::StringLit(s)
            | Token::IntLit(s)
            | Token::Comparison(s) => write!(f, "{}", s),
            Token::Punctuation(c) => write!(f, "{}", c),
            Token::Comment(s) => write!(f, "{}", s.trim_end()),
            Token::Identifier(children) => {
                for t in children {
                    write!(f, "{}", t)?;
                }
                Ok(())
            }
            Token::IdentifierList(children) => {
                for t in children {
                    match t {
                        Token::Punctuation(',') => write!(f, ", ")?,
                        t => write!(f, "{}", t)?,
                    }
                }
                Ok(())
            }
            Token::Parenthesis(children) => {
                write!(f, "(")?;
                for (i, t) in children.iter().enumerate() {
                    if i > 0 && !t.is_punct(',') {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
            Token::Function(children) => {
                for t in children {
                    write!(f, "{}", t)?;
                }
                Ok(())
            }
        }
    }
}

/// Drop comments and splice every identifier list back into its parent.
///
/// The grouping pass builds an `IdentifierList` wherever it sees a run of
/// comma separated single tokens, which includes places where the grammar
/// wants the items one by one. The compiler therefore only ever sees flat
/// comma separated sequences.
pub fn normalize(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Token::Comment(_) => {}
            Token::IdentifierList(children) => {
                log::trace!("flattening identifier list of {} tokens", children.len());
                out.extend(normalize(children));
            }
            Token::Parenthesis(children) => out.push(Token::Parenthesis(normalize(children))),
            Token::Function(children) => out.push(Token::Function(normalize(children))),
            Token::Identifier(children) => out.push(Token::Identifier(normalize(children))),
            leaf => out.push(leaf),
        }
    }
    out
}

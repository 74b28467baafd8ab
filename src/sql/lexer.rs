//! SQL lexer for the DDL subset.
//!
//! Produces flat tokens only; composite nodes are built by [`super::group`].

use super::token::Token;
use std::iter::Peekable;
use std::str::Chars;

const KEYWORDS: &[&str] = &[
    "ALTER",
    "AND",
    "CASCADE",
    "CHECK",
    "CONSTRAINT",
    "CREATE",
    "DEFAULT",
    "DELETE",
    "DROP",
    "FALSE",
    "INDEX",
    "INSERT",
    "INTO",
    "IS",
    "KEY",
    "NOT",
    "NULL",
    "ON",
    "OR",
    "PRIMARY",
    "REFERENCES",
    "SELECT",
    "SEQUENCE",
    "SET",
    "TABLE",
    "TRUE",
    "UNIQUE",
    "UPDATE",
    "USING",
    "VALUES",
];

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("Unexpected character {0:?} at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("Unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),
    #[error("Unterminated quoted identifier starting at offset {0}")]
    UnterminatedIdentifier(usize),
    #[error("Unterminated block comment starting at offset {0}")]
    UnterminatedComment(usize),
    #[error("Unbalanced parenthesis")]
    UnbalancedParenthesis,
}

/// SQL lexer.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    current_char: Option<char>,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut chars = input.chars().peekable();
        let current_char = chars.next();
        Self {
            chars,
            current_char,
            offset: 0,
        }
    }

    fn advance(&mut self) {
        self.current_char = self.chars.next();
        self.offset += 1;
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_line_comment(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.current_char {
            text.push(c);
            self.advance();
            if c == '\n' {
                break;
            }
        }
        text
    }

    fn read_block_comment(&mut self) -> Result<String, LexError> {
        let start = self.offset;
        let mut text = String::from("/*");
        self.advance(); // skip /
        self.advance(); // skip *
        while let Some(c) = self.current_char {
            text.push(c);
            self.advance();
            if c == '*' && self.current_char == Some('/') {
                text.push('/');
                self.advance();
                return Ok(text);
            }
        }
        Err(LexError::UnterminatedComment(start))
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.current_char {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    fn read_quoted_identifier(&mut self) -> Result<String, LexError> {
        let start = self.offset;
        self.advance(); // skip opening quote
        let mut ident = String::new();
        while let Some(c) = self.current_char {
            if c == '"' {
                // Doubled quote is an escaped quote
                if self.peek() == Some(&'"') {
                    ident.push(c);
                    self.advance();
                    self.advance();
                } else {
                    self.advance();
                    return Ok(ident);
                }
            } else {
                ident.push(c);
                self.advance();
            }
        }
        Err(LexError::UnterminatedIdentifier(start))
    }

    /// Raw string literal, quotes included; unescaping is the consumer's job.
    fn read_string(&mut self) -> Result<String, LexError> {
        let start = self.offset;
        let mut s = String::from('\'');
        self.advance();
        while let Some(c) = self.current_char {
            s.push(c);
            self.advance();
            if c == '\'' {
                if self.current_char == Some('\'') {
                    s.push('\'');
                    self.advance();
                } else {
                    return Ok(s);
                }
            }
        }
        Err(LexError::UnterminatedString(start))
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        if self.current_char == Some('-') {
            num.push('-');
            self.advance();
        }
        while let Some(c) = self.current_char {
            if c.is_ascii_digit() {
                num.push(c);
                self.advance();
            } else {
                break;
            }
        }
        num
    }

    fn keyword_or_name(word: String) -> Token {
        let upper = word.to_uppercase();
        if KEYWORDS.contains(&upper.as_str()) {
            Token::Keyword(upper)
        } else {
            Token::Name(word)
        }
    }

    fn comparison(&mut self, first: char) -> Result<Token, LexError> {
        let at = self.offset;
        self.advance();
        let op = match (first, self.current_char) {
            ('<', Some('=')) | ('>', Some('=')) | ('!', Some('=')) | ('<', Some('>')) => {
                let second = self.current_char.unwrap_or_default();
                self.advance();
                format!("{}{}", first, second)
            }
            ('!', _) => return Err(LexError::UnexpectedChar('!', at)),
            _ => first.to_string(),
        };
        Ok(Token::Comparison(op))
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let c = match self.current_char {
            Some(c) => c,
            None => return Ok(None),
        };

        let tok = match c {
            '-' if self.peek() == Some(&'-') => Token::Comment(self.read_line_comment()),
            '-' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                Token::IntLit(self.read_number())
            }
            '/' if self.peek() == Some(&'*') => Token::Comment(self.read_block_comment()?),
            '(' | ')' | ',' | ';' | '.' => {
                self.advance();
                Token::Punctuation(c)
            }
            '=' | '<' | '>' | '!' => self.comparison(c)?,
            '"' => Token::Name(self.read_quoted_identifier()?),
            '\'' => Token::StringLit(self.read_string()?),
            c if c.is_ascii_digit() => Token::IntLit(self.read_number()),
            c if c.is_alphabetic() || c == '_' => Self::keyword_or_name(self.read_word()),
            c => return Err(LexError::UnexpectedChar(c, self.offset)),
        };

        Ok(Some(tok))
    }

    /// Collect all tokens.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_create_table() {
        let tokens = Lexer::new("CREATE TABLE users (id integer);").tokenize().unwrap();

        assert_eq!(tokens[0], Token::Keyword("CREATE".into()));
        assert_eq!(tokens[1], Token::Keyword("TABLE".into()));
        assert_eq!(tokens[2], Token::Name("users".into()));
        assert_eq!(tokens[3], Token::Punctuation('('));
        assert_eq!(tokens[4], Token::Name("id".into()));
        assert_eq!(tokens[5], Token::Name("integer".into()));
        assert_eq!(tokens[6], Token::Punctuation(')'));
        assert_eq!(tokens[7], Token::Punctuation(';'));
        assert_eq!(tokens.len(), 8);
    }

    #[test]
    fn test_string_literal_kept_raw() {
        let tokens = Lexer::new("'it''s ok'").tokenize().unwrap();
        assert_eq!(tokens, vec![Token::StringLit("'it''s ok'".into())]);
    }

    #[test]
    fn test_quoted_identifier() {
        let tokens = Lexer::new(r#""User ""Table""""#).tokenize().unwrap();
        assert_eq!(tokens, vec![Token::Name("User \"Table\"".into())]);
    }

    #[test]
    fn test_comments() {
        let sql = "-- comment\nCREATE /* block */ TABLE";
        let tokens = Lexer::new(sql).tokenize().unwrap();

        assert_eq!(tokens[0], Token::Comment("-- comment\n".into()));
        assert_eq!(tokens[1], Token::Keyword("CREATE".into()));
        assert_eq!(tokens[2], Token::Comment("/* block */".into()));
        assert_eq!(tokens[3], Token::Keyword("TABLE".into()));
    }

    #[test]
    fn test_comparisons_and_negative_numbers() {
        let tokens = Lexer::new("a >= -1 <> b != c").tokenize().unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Name("a".into()),
                Token::Comparison(">=".into()),
                Token::IntLit("-1".into()),
                Token::Comparison("<>".into()),
                Token::Name("b".into()),
                Token::Comparison("!=".into()),
                Token::Name("c".into()),
            ]
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            Lexer::new("create table t (x @)").tokenize(),
            Err(LexError::UnexpectedChar('@', 18))
        ));
        assert!(matches!(
            Lexer::new("'open").tokenize(),
            Err(LexError::UnterminatedString(0))
        ));
    }
}

//! Groups flat lexer output into composite tokens and statements.

use super::lexer::{LexError, Lexer};
use super::token::Token;

/// Tokenize `input` and return one grouped token list per statement.
///
/// Statements are split at top-level `;`. Comments are kept so that the
/// compiler can attach a leading comment to the table it precedes.
pub fn statements(input: &str) -> Result<Vec<Vec<Token>>, LexError> {
    let flat = Lexer::new(input).tokenize()?;
    let nested = nest_parens(flat)?;

    let mut statements = Vec::new();
    let mut current = Vec::new();
    for token in group_level(nested) {
        if token.is_punct(';') {
            statements.push(std::mem::take(&mut current));
        } else {
            current.push(token);
        }
    }
    if !current.is_empty() {
        statements.push(current);
    }
    Ok(statements)
}

/// Build `Parenthesis` nodes from matching `(` / `)` pairs.
fn nest_parens(flat: Vec<Token>) -> Result<Vec<Token>, LexError> {
    let mut stack: Vec<Vec<Token>> = vec![Vec::new()];
    for token in flat {
        match token {
            Token::Punctuation('(') => stack.push(Vec::new()),
            Token::Punctuation(')') => {
                let inner = stack.pop().ok_or(LexError::UnbalancedParenthesis)?;
                let outer = stack.last_mut().ok_or(LexError::UnbalancedParenthesis)?;
                outer.push(Token::Parenthesis(inner));
            }
            other => match stack.last_mut() {
                Some(level) => level.push(other),
                None => return Err(LexError::UnbalancedParenthesis),
            },
        }
    }
    match (stack.pop(), stack.is_empty()) {
        (Some(top), true) => Ok(top),
        _ => Err(LexError::UnbalancedParenthesis),
    }
}

/// Group one nesting level: identifiers, then function calls, then lists.
fn group_level(tokens: Vec<Token>) -> Vec<Token> {
    let mut grouped: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        match token {
            Token::Name(name) => {
                let mut parts = vec![Token::Name(name)];
                while iter.peek().is_some_and(|t| t.is_punct('.')) {
                    let dot = iter.next();
                    match iter.next() {
                        Some(Token::Name(next)) => {
                            parts.extend(dot);
                            parts.push(Token::Name(next));
                        }
                        // not a dotted name after all; leave the pieces in place
                        other => {
                            grouped.push(Token::Identifier(parts));
                            parts = Vec::new();
                            grouped.extend(dot);
                            grouped.extend(other);
                            break;
                        }
                    }
                }
                if !parts.is_empty() {
                    grouped.push(Token::Identifier(parts));
                }
            }
            Token::Parenthesis(inner) => {
                let paren = Token::Parenthesis(group_level(inner));
                match grouped.pop() {
                    Some(ident @ Token::Identifier(_)) => {
                        grouped.push(Token::Function(vec![ident, paren]))
                    }
                    Some(prev) => {
                        grouped.push(prev);
                        grouped.push(paren);
                    }
                    None => grouped.push(paren),
                }
            }
            other => grouped.push(other),
        }
    }

    if is_list(&grouped) {
        vec![Token::IdentifierList(grouped)]
    } else {
        grouped
    }
}

/// A whole level of the form `item , item (, item)*` with single-token items.
fn is_list(tokens: &[Token]) -> bool {
    let significant: Vec<&Token> = tokens.iter().filter(|t| t.is_significant()).collect();
    if significant.len() < 3 {
        return false;
    }
    significant.iter().enumerate().all(|(i, t)| {
        if i % 2 == 1 {
            t.is_punct(',')
        } else {
            matches!(
                t,
                Token::Identifier(_) | Token::IntLit(_) | Token::StringLit(_) | Token::Function(_)
            ) || t.is_keyword("NULL")
                || t.is_keyword("TRUE")
                || t.is_keyword("FALSE")
        }
    }) && significant.len() % 2 == 1
}

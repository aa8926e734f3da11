//! This module turns raw program text into a flat sequence of tokens.
//!
//! The lexer knows nothing about states, symbols or directions; it only recognises
//! literal runs, the `->` arrow and line breaks, tracking the line and column of each.

use crate::types::{LexError, Position, Token, TokenKind};
use std::iter::Peekable;
use std::str::Chars;

/// Returns `true` for characters that may appear inside a literal.
pub fn is_literal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '\\'
}

/// Tokenizes `source` from left to right.
///
/// # Returns
///
/// * `Ok(Vec<Token>)` with every token of the input, in order.
/// * `Err(LexError::UnterminatedArrow)` if a `-` is not followed by `>`.
/// * `Err(LexError::UnknownSymbol)` for any other character outside the language.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let tokens = Lexer::new(source).collect::<Result<Vec<_>, _>>()?;
    log::debug!("tokenized {} bytes into {} tokens", source.len(), tokens.len());
    Ok(tokens)
}

/// An iterator over the tokens of a source text.
///
/// It yields at most one `Err`, after which it is exhausted.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let start = Position::start();
        Self {
            chars: source.chars().peekable(),
            line: start.line,
            column: start.column,
            failed: false,
        }
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_spacing(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' || !c.is_whitespace() {
                break;
            }
            self.bump();
        }
    }

    fn literal(&mut self, start: Position) -> Token {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if !is_literal_char(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        Token::new(TokenKind::Literal, text, start)
    }

    fn arrow(&mut self, start: Position) -> Result<Token, LexError> {
        self.bump();
        match self.chars.peek() {
            Some('>') => {
                self.bump();
                Ok(Token::new(TokenKind::Arrow, "->", start))
            }
            _ => Err(LexError::UnterminatedArrow(start)),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        self.skip_spacing();
        let start = self.here();
        let c = *self.chars.peek()?;

        let result = match c {
            '\n' => {
                self.bump();
                Ok(Token::new(TokenKind::NewLine, "\n", start))
            }
            '-' => self.arrow(start),
            c if is_literal_char(c) => Ok(self.literal(start)),
            _ => Err(LexError::UnknownSymbol(c, start)),
        };

        self.failed = result.is_err();
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<(TokenKind, &str)> {
        tokens.iter().map(|t| (t.kind, t.text.as_str())).collect()
    }

    #[test]
    fn test_tokenize_single_rule() {
        let tokens = tokenize("q0 a -> q1 b R\n").unwrap();

        assert_eq!(
            kinds(&tokens),
            vec![
                (TokenKind::Literal, "q0"),
                (TokenKind::Literal, "a"),
                (TokenKind::Arrow, "->"),
                (TokenKind::Literal, "q1"),
                (TokenKind::Literal, "b"),
                (TokenKind::Literal, "R"),
                (TokenKind::NewLine, "\n"),
            ]
        );
    }

    #[test]
    fn test_token_positions() {
        let tokens = tokenize("q0 a -> q12 b R\n  q12 \\0 -> qf x L").unwrap();

        let positions: Vec<_> = tokens.iter().map(|t| (t.line(), t.column())).collect();
        assert_eq!(
            positions,
            vec![
                (1, 1),
                (1, 4),
                (1, 6),
                (1, 9),
                (1, 13),
                (1, 15),
                (1, 16),
                (2, 3),
                (2, 7),
                (2, 10),
                (2, 13),
                (2, 16),
                (2, 18),
            ]
        );
        assert_eq!(tokens[8].text, "\\0");
    }

    #[test]
    fn test_literal_runs_are_maximal() {
        let tokens = tokenize("q0ab\\n12->x").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                (TokenKind::Literal, "q0ab\\n12"),
                (TokenKind::Arrow, "->"),
                (TokenKind::Literal, "x"),
            ]
        );
    }

    #[test]
    fn test_blank_lines_emit_newlines() {
        let tokens = tokenize("\n\t \n").unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::NewLine));
        assert_eq!(tokens[1].position, Position::new(2, 3));
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_lone_dash_is_an_error() {
        assert_eq!(
            tokenize("q0 a - q1 b R\n"),
            Err(LexError::UnterminatedArrow(Position::new(1, 6)))
        );
        assert_eq!(
            tokenize("q0 a -"),
            Err(LexError::UnterminatedArrow(Position::new(1, 6)))
        );
    }

    #[test]
    fn test_unknown_symbol() {
        assert_eq!(
            tokenize("q0 a -> q1 b R\nq1 # -> qf b N\n"),
            Err(LexError::UnknownSymbol('#', Position::new(2, 4)))
        );
    }

    #[test]
    fn test_lexer_stops_after_first_error() {
        let results: Vec<_> = Lexer::new("q0 $ % a").collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(
            results[1],
            Err(LexError::UnknownSymbol('$', Position::new(1, 4)))
        );
    }
}

//! This module builds the transition table of a program from its tokens.
//!
//! The grammar is fixed-arity and needs no backtracking:
//!
//! ```text
//! program   := newline* (rule newline+)* newline*
//! rule      := state symbol "->" state symbol direction
//! state     := literal starting with 'q'
//! symbol    := literal
//! direction := "L" | "N" | "R"
//! ```
//!
//! Every violation aborts the build with the position of the offending token.

use crate::{
    lexer::tokenize,
    types::{
        CompileError, Destination, Direction, ParseError, Position, StateTable, Token, TokenKind,
        TransitionRule, ENTRY_STATE, FINAL_STATE,
    },
};

/// The fewest tokens a rule can be made of before the parser gives up on it as truncated.
const MIN_RULE_TOKENS: usize = 5;

/// Parses the given source text into a `StateTable`.
///
/// # Returns
///
/// * `Ok(StateTable)` if the source is lexically and syntactically valid.
/// * `Err(CompileError::Lex)` if tokenization fails.
/// * `Err(CompileError::Parse)` if the rules are malformed or there is no entry point.
pub fn parse(source: &str) -> Result<StateTable, CompileError> {
    let tokens = tokenize(source)?;
    Ok(build_table(&tokens)?)
}

/// Builds the transition table from a token sequence.
///
/// The entry state is registered at index 0 before the first rule is read; every other
/// state is interned the first time it is mentioned, as a source or as a destination.
pub fn build_table(tokens: &[Token]) -> Result<StateTable, ParseError> {
    let table = TableBuilder::new(tokens).build()?;
    log::debug!(
        "built table with {} states and {} rules",
        table.len(),
        table.rule_count()
    );
    Ok(table)
}

struct TableBuilder<'a> {
    tokens: &'a [Token],
    cursor: usize,
    table: StateTable,
    entry_found: bool,
}

impl<'a> TableBuilder<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            cursor: 0,
            table: StateTable::new(),
            entry_found: false,
        }
    }

    fn build(mut self) -> Result<StateTable, ParseError> {
        loop {
            self.skip_newlines();
            if self.at_end() {
                break;
            }
            self.check_remaining()?;

            let rule = self.parse_rule()?;
            self.table.push_rule(rule)?;

            self.expect_separator()?;
        }

        if !self.entry_found {
            return Err(ParseError::NoEntryPoint);
        }

        Ok(self.table)
    }

    /// Parses `state symbol -> state symbol direction`.
    fn parse_rule(&mut self) -> Result<TransitionRule, ParseError> {
        let left = self.expect_state()?;
        let source_line = left.line();
        match left.text.as_str() {
            ENTRY_STATE => self.entry_found = true,
            FINAL_STATE => return Err(ParseError::FinalStateAsSource(left.position)),
            _ => {}
        }
        let source_state = self.table.intern(&left.text);

        let source_symbol = self.expect_symbol()?.text.clone();
        self.expect_arrow()?;

        let right = self.expect_state()?;
        let destination = match right.text.as_str() {
            FINAL_STATE => Destination::Accept,
            name => Destination::State(self.table.intern(name)),
        };

        let dest_symbol = self.expect_symbol()?.text.clone();
        let direction = self.expect_direction()?;

        Ok(TransitionRule {
            source_state,
            source_symbol,
            destination,
            dest_symbol,
            direction,
            source_line,
        })
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.cursor)
    }

    fn at_end(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Where errors at end of input point: right after the last token.
    fn end_position(&self) -> Position {
        self.tokens.last().map_or(Position::start(), Token::end)
    }

    fn current_position(&self) -> Position {
        self.peek().map_or_else(|| self.end_position(), |t| t.position)
    }

    fn skip_newlines(&mut self) {
        while self.peek().is_some_and(|t| t.kind == TokenKind::NewLine) {
            self.cursor += 1;
        }
    }

    fn check_remaining(&self) -> Result<(), ParseError> {
        let remaining = self.tokens.len() - self.cursor;
        if remaining > 0 && remaining < MIN_RULE_TOKENS {
            return Err(ParseError::TruncatedProgram(self.current_position()));
        }
        Ok(())
    }

    /// Consumes the next token if `accept` holds for it, otherwise builds the error
    /// from the position of the token (or of the end of input).
    fn expect(
        &mut self,
        accept: impl Fn(&Token) -> bool,
        error: fn(Position) -> ParseError,
    ) -> Result<&'a Token, ParseError> {
        match self.peek() {
            Some(token) if accept(token) => {
                self.cursor += 1;
                Ok(token)
            }
            _ => Err(error(self.current_position())),
        }
    }

    fn expect_state(&mut self) -> Result<&'a Token, ParseError> {
        self.expect(Token::is_state, ParseError::ExpectedState)
    }

    fn expect_symbol(&mut self) -> Result<&'a Token, ParseError> {
        self.expect(|t| t.kind == TokenKind::Literal, ParseError::ExpectedSymbol)
    }

    fn expect_arrow(&mut self) -> Result<&'a Token, ParseError> {
        self.expect(|t| t.kind == TokenKind::Arrow, ParseError::ExpectedArrow)
    }

    fn expect_direction(&mut self) -> Result<Direction, ParseError> {
        let token = self.expect(
            |t| t.kind == TokenKind::Literal && Direction::from_letter(&t.text).is_some(),
            ParseError::ExpectedDirection,
        )?;
        Direction::from_letter(&token.text).ok_or(ParseError::ExpectedDirection(token.position))
    }

    fn expect_separator(&mut self) -> Result<(), ParseError> {
        if self.at_end() {
            return Ok(());
        }
        self.expect(|t| t.kind == TokenKind::NewLine, ParseError::ExpectedNewLine)?;
        Ok(())
    }
}

//! This module defines the core data structures and types shared by every stage of the
//! compiler, including tokens, transition rules, the state table, and error types.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// The state every program starts in. It is always interned at index 0.
pub const ENTRY_STATE: &str = "q0";
/// The final (accepting) state. It may only appear as a destination.
pub const FINAL_STATE: &str = "qf";
/// The number of cells on the generated program's tape.
pub const TAPE_SIZE: usize = 10;
/// The cell the head starts on.
pub const TAPE_ORIGIN: usize = 5;
/// The symbol written to the origin cell before the machine starts.
pub const INITIAL_SYMBOL: char = 'a';
/// The value of an untouched tape cell.
pub const BLANK_SYMBOL: u8 = 0;
/// The maximum allowed size for a source program in bytes.
pub const MAX_PROGRAM_SIZE: usize = 65536; // 64KB
/// The maximum number of steps the interpreter executes before giving up.
pub const MAX_EXECUTION_STEPS: usize = 10000;

/// A 1-based line/column location in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The lexical category of a token. The grammar, not the lexer, decides whether a
/// literal is a state, a symbol or a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// A maximal run of alphanumeric or backslash characters.
    Literal,
    /// The two-character sequence `->`.
    Arrow,
    /// A line boundary.
    NewLine,
}

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    pub fn line(&self) -> usize {
        self.position.line
    }

    pub fn column(&self) -> usize {
        self.position.column
    }

    /// Returns `true` if this is a literal that can name a state.
    pub fn is_state(&self) -> bool {
        self.kind == TokenKind::Literal && self.text.starts_with('q')
    }

    /// The position right after the last character of this token.
    pub fn end(&self) -> Position {
        match self.kind {
            TokenKind::NewLine => Position::new(self.position.line + 1, 1),
            _ => Position::new(
                self.position.line,
                self.position.column + self.text.chars().count(),
            ),
        }
    }
}

/// Represents the possible directions the tape head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one cell to the left.
    Left,
    /// Move the head one cell to the right.
    Right,
    /// Keep the head on the same cell.
    Stay,
}

impl Direction {
    /// Maps a source letter (`L`, `R`, `N`) to a direction.
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "L" => Some(Direction::Left),
            "R" => Some(Direction::Right),
            "N" => Some(Direction::Stay),
            _ => None,
        }
    }

    /// The cell offset applied to the head.
    pub fn offset(self) -> isize {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
            Direction::Stay => 0,
        }
    }
}

/// Where a transition sends the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    /// An interned state, by table index.
    State(usize),
    /// The final state: halt and accept.
    Accept,
}

/// A single `state symbol -> state symbol direction` line of the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    /// Index of the state this rule leaves from.
    pub source_state: usize,
    /// Symbol that must be under the head.
    pub source_symbol: String,
    pub destination: Destination,
    /// Symbol written under the head.
    pub dest_symbol: String,
    pub direction: Direction,
    /// Source line the rule was declared on.
    pub source_line: usize,
}

/// A named state together with the rules leaving it, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
    pub name: String,
    pub rules: Vec<TransitionRule>,
}

impl State {
    /// The rules that can fire, in declaration order. A later rule reading a symbol
    /// that an earlier rule of the same state already reads is shadowed, even when it
    /// spells the symbol differently (`\0` and `\00`).
    pub fn effective_rules(&self) -> impl Iterator<Item = &TransitionRule> + '_ {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .filter(move |&rule| seen.insert(SymbolKey::of(&rule.source_symbol)))
    }
}

/// Decodes the text of a symbol as a C character constant body.
///
/// Supports plain single characters, the simple escapes (`\n`, `\t`, `\0`, `\\`, ...)
/// and octal escapes of up to three digits.
pub fn decode_symbol(text: &str) -> Option<u8> {
    let is_octal = |digits: &[u8]| {
        (1..=3).contains(&digits.len()) && digits.iter().all(|b| (b'0'..=b'7').contains(b))
    };

    match text.as_bytes() {
        [c] if *c != b'\\' => Some(*c),
        [b'\\', rest @ ..] if is_octal(rest) => {
            let value = rest
                .iter()
                .fold(0u32, |acc, digit| acc * 8 + u32::from(digit - b'0'));
            u8::try_from(value).ok()
        }
        [b'\\', escape] => match escape {
            b'n' => Some(b'\n'),
            b't' => Some(b'\t'),
            b'r' => Some(b'\r'),
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b'f' => Some(0x0c),
            b'v' => Some(0x0b),
            b'\\' => Some(b'\\'),
            _ => None,
        },
        _ => None,
    }
}

/// The identity of a symbol when comparing rules: its character value when it decodes,
/// its spelling otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKey<'a> {
    Byte(u8),
    Text(&'a str),
}

impl<'a> SymbolKey<'a> {
    pub fn of(text: &'a str) -> Self {
        decode_symbol(text).map_or(SymbolKey::Text(text), SymbolKey::Byte)
    }
}

/// The transition table of a program.
///
/// States are interned in the order they are first mentioned, except the entry state
/// which is registered at index 0 before anything else. Every `Destination::State`
/// stored in the table refers to an existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateTable {
    states: Vec<State>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Default for StateTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTable {
    /// Creates a table holding only the entry state.
    pub fn new() -> Self {
        let mut table = Self {
            states: Vec::new(),
            index: HashMap::new(),
        };
        table.intern(ENTRY_STATE);
        table
    }

    /// Returns the index of `name`, registering it if it hasn't been seen yet.
    pub fn intern(&mut self, name: &str) -> usize {
        if let Some(&index) = self.index.get(name) {
            return index;
        }

        let index = self.states.len();
        self.states.push(State {
            name: name.to_string(),
            rules: Vec::new(),
        });
        self.index.insert(name.to_string(), index);
        index
    }

    /// Appends a rule to the list of its source state.
    ///
    /// Both the source state and a `Destination::State` must have been returned by
    /// [`StateTable::intern`], otherwise `ParseError::UnknownState` is returned and the
    /// table is left unchanged.
    pub fn push_rule(&mut self, rule: TransitionRule) -> Result<(), ParseError> {
        if let Destination::State(index) = rule.destination {
            if index >= self.states.len() {
                return Err(ParseError::UnknownState(index));
            }
        }

        match self.states.get_mut(rule.source_state) {
            Some(state) => {
                state.rules.push(rule);
                Ok(())
            }
            None => Err(ParseError::UnknownState(rule.source_state)),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn get(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&State> {
        self.index_of(name).and_then(|index| self.get(index))
    }

    /// All states in discovery order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// A table always holds the entry state, so this is only `true` for a
    /// table built by hand without it.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Total number of rules across every state.
    pub fn rule_count(&self) -> usize {
        self.states.iter().map(|state| state.rules.len()).sum()
    }

    /// The source-level name of a destination.
    pub fn destination_name(&self, destination: Destination) -> &str {
        match destination {
            Destination::State(index) => self
                .states
                .get(index)
                .map_or(FINAL_STATE, |state| state.name.as_str()),
            Destination::Accept => FINAL_STATE,
        }
    }
}

/// Errors raised while turning source text into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A `-` that isn't followed by `>`.
    #[error("{0}: invalid literal (wanted arrow)")]
    UnterminatedArrow(Position),
    /// A character the language has no use for.
    #[error("{1}: unknown symbol '{0}'")]
    UnknownSymbol(char, Position),
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnterminatedArrow(position) | LexError::UnknownSymbol(_, position) => {
                *position
            }
        }
    }
}

/// Errors raised while building the state table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{0}: expected state")]
    ExpectedState(Position),
    #[error("{0}: expected symbol")]
    ExpectedSymbol(Position),
    #[error("{0}: expected arrow operator")]
    ExpectedArrow(Position),
    #[error("{0}: expected direction (L, N or R)")]
    ExpectedDirection(Position),
    #[error("{0}: expected end of line after rule")]
    ExpectedNewLine(Position),
    #[error("{0}: final state may not be a rule source")]
    FinalStateAsSource(Position),
    #[error("{0}: invalid program (incomplete rule)")]
    TruncatedProgram(Position),
    #[error("q0 not found (no entry point)")]
    NoEntryPoint,
    /// A rule names a state index the table never handed out.
    #[error("rule refers to unknown state #{0}")]
    UnknownState(usize),
}

impl ParseError {
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::ExpectedState(position)
            | ParseError::ExpectedSymbol(position)
            | ParseError::ExpectedArrow(position)
            | ParseError::ExpectedDirection(position)
            | ParseError::ExpectedNewLine(position)
            | ParseError::FinalStateAsSource(position)
            | ParseError::TruncatedProgram(position) => Some(*position),
            ParseError::NoEntryPoint | ParseError::UnknownState(_) => None,
        }
    }
}

/// Represents the errors that can abort a compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("Lexical error: {0}")]
    Lex(#[from] LexError),
    #[error("Syntax error: {0}")]
    Parse(#[from] ParseError),
    /// A strict-mode analysis finding.
    #[error("Program validation error: {0}")]
    Validation(String),
    /// Reading the source or writing the generated program failed.
    #[error("File error: {0}")]
    File(String),
}

impl CompileError {
    /// The source position the error points at, if it has one.
    pub fn position(&self) -> Option<Position> {
        match self {
            CompileError::Lex(e) => Some(e.position()),
            CompileError::Parse(e) => e.position(),
            _ => None,
        }
    }
}

/// Errors raised by the interpreter while running a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// The head moved past either end of the tape.
    #[error("Tape boundary exceeded")]
    TapeBoundary,
    #[error("Step limit of {0} exceeded")]
    StepLimit(usize),
    /// A rule symbol that isn't a single character constant.
    #[error("Unsupported symbol: {0}")]
    UnsupportedSymbol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_serialization() {
        let left_json = serde_json::to_string(&Direction::Left).unwrap();
        let stay_json = serde_json::to_string(&Direction::Stay).unwrap();

        assert_eq!(left_json, "\"Left\"");
        assert_eq!(stay_json, "\"Stay\"");

        let deserialized: Direction = serde_json::from_str(&stay_json).unwrap();
        assert_eq!(deserialized, Direction::Stay);
    }

    #[test]
    fn test_direction_letters() {
        assert_eq!(Direction::from_letter("L"), Some(Direction::Left));
        assert_eq!(Direction::from_letter("N"), Some(Direction::Stay));
        assert_eq!(Direction::from_letter("R"), Some(Direction::Right));
        assert_eq!(Direction::from_letter("S"), None);
        assert_eq!(Direction::from_letter("RR"), None);
        assert_eq!(Direction::Left.offset(), -1);
        assert_eq!(Direction::Stay.offset(), 0);
    }

    #[test]
    fn test_table_preregisters_entry_state() {
        let mut table = StateTable::new();
        assert_eq!(table.len(), 1);
        assert_eq!(table.index_of(ENTRY_STATE), Some(0));

        assert_eq!(table.intern("q3"), 1);
        assert_eq!(table.intern("q1"), 2);
        assert_eq!(table.intern("q3"), 1);
        assert_eq!(table.intern(ENTRY_STATE), 0);
        assert_eq!(table.len(), 3);
    }

    fn rule(source_state: usize, symbol: &str, destination: Destination) -> TransitionRule {
        TransitionRule {
            source_state,
            source_symbol: symbol.to_string(),
            destination,
            dest_symbol: "a".to_string(),
            direction: Direction::Stay,
            source_line: 1,
        }
    }

    #[test]
    fn test_push_rule_rejects_unknown_states() {
        let mut table = StateTable::new();
        let q1 = table.intern("q1");

        assert_eq!(
            table.push_rule(rule(0, "a", Destination::State(7))),
            Err(ParseError::UnknownState(7))
        );
        assert_eq!(
            table.push_rule(rule(5, "a", Destination::Accept)),
            Err(ParseError::UnknownState(5))
        );
        assert_eq!(table.rule_count(), 0);

        assert!(table.push_rule(rule(0, "a", Destination::State(q1))).is_ok());
        assert!(table.push_rule(rule(q1, "a", Destination::Accept)).is_ok());
        assert_eq!(table.rule_count(), 2);
    }

    #[test]
    fn test_decode_symbol() {
        assert_eq!(decode_symbol("a"), Some(b'a'));
        assert_eq!(decode_symbol("7"), Some(b'7'));
        assert_eq!(decode_symbol("\\0"), Some(0));
        assert_eq!(decode_symbol("\\n"), Some(b'\n'));
        assert_eq!(decode_symbol("\\\\"), Some(b'\\'));
        assert_eq!(decode_symbol("\\101"), Some(b'A'));
        assert_eq!(decode_symbol("\\777"), None);
        assert_eq!(decode_symbol("\\"), None);
        assert_eq!(decode_symbol("ab"), None);
        assert_eq!(decode_symbol(""), None);
    }

    #[test]
    fn test_shadowing_compares_character_values() {
        let mut table = StateTable::new();
        for symbol in ["\\0", "\\00", "a", "\\141", "ab", "ab"] {
            table.push_rule(rule(0, symbol, Destination::Accept)).unwrap();
        }

        let read: Vec<&str> = table
            .get(0)
            .unwrap()
            .effective_rules()
            .map(|rule| rule.source_symbol.as_str())
            .collect();
        assert_eq!(read, vec!["\\0", "a", "ab"]);
    }

    #[test]
    fn test_destination_name() {
        let mut table = StateTable::new();
        let q1 = table.intern("q1");

        assert_eq!(table.destination_name(Destination::State(q1)), "q1");
        assert_eq!(table.destination_name(Destination::Accept), FINAL_STATE);
    }

    #[test]
    fn test_error_display() {
        let error = ParseError::ExpectedDirection(Position::new(3, 14));
        assert_eq!(error.to_string(), "3:14: expected direction (L, N or R)");

        let error: CompileError = LexError::UnknownSymbol('#', Position::new(1, 2)).into();
        assert_eq!(error.to_string(), "Lexical error: 1:2: unknown symbol '#'");
        assert_eq!(error.position(), Some(Position::new(1, 2)));

        let error: CompileError = ParseError::NoEntryPoint.into();
        assert_eq!(error.position(), None);
    }
}

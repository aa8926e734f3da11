//! This crate compiles Turing Machine transition rules into C programs that run the machine.
//! It includes modules for tokenizing and parsing the rule language, building and analyzing
//! the state table, generating code, interpreting tables directly, and a few bundled programs.

pub mod analyzer;
pub mod codegen;
pub mod compiler;
pub mod lexer;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod types;

/// Re-exports the `analyze` function and `AnalysisWarning` enum from the analyzer module.
pub use analyzer::{analyze, AnalysisWarning};
/// Re-exports code generation entry points and settings.
pub use codegen::{generate, CodegenOptions, GeneratedProgram, LineMapping};
/// Re-exports the pipeline driver.
pub use compiler::{compile, Compiler, CompilerOptions};
/// Re-exports the `tokenize` function from the lexer module.
pub use lexer::tokenize;
/// Re-exports the `SourceLoader` struct from the loader module.
pub use loader::SourceLoader;
/// Re-exports the interpreter.
pub use machine::{Halt, Step, TuringMachine};
/// Re-exports the table builder.
pub use parser::{build_table, parse};
/// Re-exports `ProgramInfo`, `ProgramManager`, and `PROGRAMS` from the programs module.
pub use programs::{ProgramInfo, ProgramManager, PROGRAMS};
/// Re-exports the data model and error types.
pub use types::{
    decode_symbol, CompileError, Destination, Direction, LexError, MachineError, ParseError,
    Position, StateTable, SymbolKey, Token, TokenKind, TransitionRule, MAX_PROGRAM_SIZE,
};

//! This module drives the pipeline: source text → tokens → state table → C program.
//!
//! Each stage consumes the whole output of the previous one and the first error stops
//! the compilation; nothing is produced for a program that fails to compile.

use crate::{
    analyzer::analyze,
    codegen::{generate, CodegenOptions, GeneratedProgram},
    lexer::tokenize,
    parser::build_table,
    types::{CompileError, StateTable, Token},
};
use serde::{Deserialize, Serialize};

/// Settings for a whole compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    pub codegen: CodegenOptions,
    /// Treat analysis warnings as errors.
    pub strict: bool,
}

impl CompilerOptions {
    pub fn with_codegen(mut self, codegen: CodegenOptions) -> Self {
        self.codegen = codegen;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Compiles programs with a fixed set of options.
///
/// A `Compiler` holds no state between compilations, so one instance can be reused for
/// any number of sources.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Runs the lexer only.
    pub fn tokens(&self, source: &str) -> Result<Vec<Token>, CompileError> {
        Ok(tokenize(source)?)
    }

    /// Runs the lexer, the table builder and the analyzer.
    ///
    /// Analysis warnings are logged; in strict mode the first one fails the compilation.
    pub fn table(&self, source: &str) -> Result<StateTable, CompileError> {
        let tokens = self.tokens(source)?;
        let table = build_table(&tokens)?;

        let warnings = analyze(&table);
        for warning in &warnings {
            log::warn!("{}: {}", self.options.codegen.source_name, warning);
        }
        if self.options.strict {
            if let Some(warning) = warnings.into_iter().next() {
                return Err(warning.into());
            }
        }

        Ok(table)
    }

    /// Runs the whole pipeline.
    pub fn compile(&self, source: &str) -> Result<GeneratedProgram, CompileError> {
        self.options.codegen.validate()?;

        let table = self.table(source)?;
        let program = generate(&table, &self.options.codegen);

        log::info!(
            "compiled {}: {} states, {} rules",
            self.options.codegen.source_name,
            table.len(),
            table.rule_count()
        );

        Ok(program)
    }
}

/// Compiles `source` with the default options.
pub fn compile(source: &str) -> Result<GeneratedProgram, CompileError> {
    Compiler::default().compile(source)
}

//! This module provides the `SourceLoader` struct, responsible for reading program
//! sources from disk and writing generated programs back.

use crate::compiler::{Compiler, CompilerOptions};
use crate::codegen::GeneratedProgram;
use crate::types::{CompileError, MAX_PROGRAM_SIZE};
use std::fs;
use std::path::Path;

/// `SourceLoader` is a utility struct for the file side of a compilation.
pub struct SourceLoader;

impl SourceLoader {
    /// Reads a whole program source from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` with the file content.
    /// * `Err(CompileError::File)` if the file cannot be read or exceeds
    ///   `MAX_PROGRAM_SIZE`.
    pub fn read_source(path: &Path) -> Result<String, CompileError> {
        let content = fs::read_to_string(path).map_err(|e| {
            CompileError::File(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        Self::check_size(&content, path)?;
        Ok(content)
    }

    /// Writes the generated program text to `path`, replacing any existing file.
    pub fn write_generated(path: &Path, text: &str) -> Result<(), CompileError> {
        fs::write(path, text).map_err(|e| {
            CompileError::File(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        log::debug!("wrote {} bytes to {}", text.len(), path.display());
        Ok(())
    }

    /// Reads and compiles the program at `path`.
    ///
    /// The file name is used in `#line` directives of the generated program.
    pub fn compile_file(
        path: &Path,
        options: CompilerOptions,
    ) -> Result<GeneratedProgram, CompileError> {
        let source = Self::read_source(path)?;
        let codegen = options
            .codegen
            .clone()
            .with_source_name(path.display().to_string());

        Compiler::new(options.with_codegen(codegen)).compile(&source)
    }

    fn check_size(content: &str, path: &Path) -> Result<(), CompileError> {
        if content.len() > MAX_PROGRAM_SIZE {
            return Err(CompileError::File(format!(
                "File {} is too large ({} bytes, at most {} allowed)",
                path.display(),
                content.len(),
                MAX_PROGRAM_SIZE
            )));
        }
        Ok(())
    }
}

use crate::parser::parse;
use crate::types::{CompileError, StateTable};

// Bundled sample machines
const PROGRAM_TEXTS: [(&str, &str); 5] = [
    ("accept", include_str!("../machines/accept.tm")),
    ("reject", include_str!("../machines/reject.tm")),
    ("write-pattern", include_str!("../machines/write-pattern.tm")),
    ("bounce", include_str!("../machines/bounce.tm")),
    ("runaway", include_str!("../machines/runaway.tm")),
];

/// A bundled program together with its parsed table.
#[derive(Debug, Clone)]
pub struct ProgramInfo {
    pub name: &'static str,
    pub source: &'static str,
    pub table: StateTable,
}

lazy_static::lazy_static! {
    pub static ref PROGRAMS: Vec<ProgramInfo> = PROGRAM_TEXTS
        .iter()
        .filter_map(|&(name, source)| match parse(source) {
            Ok(table) => Some(ProgramInfo { name, source, table }),
            Err(e) => {
                log::warn!("Failed to parse bundled program {}: {}", name, e);
                None
            }
        })
        .collect();
}

pub struct ProgramManager;

impl ProgramManager {
    /// Get the number of available programs
    pub fn get_program_count() -> usize {
        PROGRAMS.len()
    }

    /// Get the names of all programs, in bundle order
    pub fn get_program_names() -> Vec<&'static str> {
        PROGRAMS.iter().map(|p| p.name).collect()
    }

    /// Get a program by its index
    pub fn get_program_by_index(index: usize) -> Result<&'static ProgramInfo, CompileError> {
        PROGRAMS.get(index).ok_or_else(|| {
            CompileError::Validation(format!("Program index {} out of range", index))
        })
    }

    /// Get a program by its name
    pub fn get_program_by_name(name: &str) -> Result<&'static ProgramInfo, CompileError> {
        PROGRAMS
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| CompileError::Validation(format!("Program '{}' not found", name)))
    }
}

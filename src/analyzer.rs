//! This module provides checks over a built `StateTable` that point out likely mistakes
//! without making the program invalid: rules that can never fire and states that can
//! never be entered.

use crate::types::{CompileError, Destination, StateTable, SymbolKey};
use std::collections::HashMap;
use thiserror::Error;

/// Represents the findings of an analysis pass.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
pub enum AnalysisWarning {
    /// A rule reads a symbol that an earlier rule of the same state already reads.
    /// The earlier rule wins; the later one is never emitted.
    #[error("line {line}: rule for state {state} and symbol '{symbol}' is shadowed by line {first_line}")]
    DuplicateTransition {
        state: String,
        symbol: String,
        first_line: usize,
        line: usize,
    },
    /// States that cannot be reached from the entry state.
    #[error("Unreachable states detected: {0:?}")]
    UnreachableStates(Vec<String>),
}

impl From<AnalysisWarning> for CompileError {
    /// Converts an `AnalysisWarning` into a `CompileError::Validation`.
    fn from(warning: AnalysisWarning) -> Self {
        CompileError::Validation(warning.to_string())
    }
}

/// Analyzes a `StateTable` and returns every finding, in a stable order.
///
/// # Arguments
///
/// * `table` - A reference to the `StateTable` to be analyzed.
///
/// # Returns
///
/// * An empty vector if nothing suspicious was found.
/// * Otherwise the warnings of each check, in the order the checks run.
pub fn analyze(table: &StateTable) -> Vec<AnalysisWarning> {
    [check_duplicate_transitions, check_unreachable_states]
        .iter()
        .flat_map(|f| f(table))
        .collect()
}

/// Finds rules whose `(state, symbol)` pair is already covered by an earlier rule.
/// Symbols are compared by the character they stand for, so `\0` shadows `\00`.
fn check_duplicate_transitions(table: &StateTable) -> Vec<AnalysisWarning> {
    let mut warnings = Vec::new();

    for state in table.states() {
        let mut first_lines: HashMap<SymbolKey, usize> = HashMap::new();
        for rule in &state.rules {
            let key = SymbolKey::of(&rule.source_symbol);
            match first_lines.get(&key) {
                Some(&first_line) => warnings.push(AnalysisWarning::DuplicateTransition {
                    state: state.name.clone(),
                    symbol: rule.source_symbol.clone(),
                    first_line,
                    line: rule.source_line,
                }),
                None => {
                    first_lines.insert(key, rule.source_line);
                }
            }
        }
    }

    warnings
}

/// Checks for unreachable states by a depth-first traversal from the entry state.
///
/// Only rules that can actually fire are followed, so a state entered solely by a
/// shadowed rule counts as unreachable.
fn check_unreachable_states(table: &StateTable) -> Vec<AnalysisWarning> {
    let mut visited = vec![false; table.len()];
    let mut stack = vec![0];

    while let Some(index) = stack.pop() {
        if visited[index] {
            continue;
        }

        visited[index] = true;

        if let Some(state) = table.get(index) {
            for rule in state.effective_rules() {
                if let Destination::State(next) = rule.destination {
                    if !visited[next] {
                        stack.push(next);
                    }
                }
            }
        }
    }

    let unreachable: Vec<String> = table
        .states()
        .iter()
        .zip(&visited)
        .filter(|(_, seen)| !**seen)
        .map(|(state, _)| state.name.clone())
        .collect();

    if unreachable.is_empty() {
        return Vec::new();
    }

    vec![AnalysisWarning::UnreachableStates(unreachable)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_valid_program() {
        let table = parse("q0 a -> q1 b R\nq1 \\0 -> qf a L\n").unwrap();
        assert!(analyze(&table).is_empty());
    }

    #[test]
    fn test_duplicate_transition() {
        let table = parse("q0 a -> q1 b R\nq0 b -> qf b N\nq0 a -> qf a L\nq1 a -> qf a N\n")
            .unwrap();

        assert_eq!(
            analyze(&table),
            vec![AnalysisWarning::DuplicateTransition {
                state: "q0".to_string(),
                symbol: "a".to_string(),
                first_line: 1,
                line: 3,
            }]
        );
    }

    #[test]
    fn test_duplicate_transition_with_other_spelling() {
        let table =
            parse("q0 \\0 -> qf a N\nq0 \\00 -> qf b N\nq0 a -> qf c N\nq0 \\141 -> qf d N\n")
                .unwrap();

        assert_eq!(
            analyze(&table),
            vec![
                AnalysisWarning::DuplicateTransition {
                    state: "q0".to_string(),
                    symbol: "\\00".to_string(),
                    first_line: 1,
                    line: 2,
                },
                AnalysisWarning::DuplicateTransition {
                    state: "q0".to_string(),
                    symbol: "\\141".to_string(),
                    first_line: 3,
                    line: 4,
                },
            ]
        );
    }

    #[test]
    fn test_unreachable_states() {
        let table = parse("q0 a -> qf b R\nq2 a -> q1 b R\nq1 a -> q2 b R\n").unwrap();

        assert_eq!(
            analyze(&table),
            vec![AnalysisWarning::UnreachableStates(vec![
                "q2".to_string(),
                "q1".to_string()
            ])]
        );
    }

    #[test]
    fn test_state_behind_shadowed_rule_is_unreachable() {
        let table = parse("q0 a -> qf b R\nq0 a -> q1 b R\n").unwrap();
        let warnings = analyze(&table);

        assert_eq!(warnings.len(), 2);
        assert_eq!(
            warnings[1],
            AnalysisWarning::UnreachableStates(vec!["q1".to_string()])
        );
    }

    #[test]
    fn test_warning_into_compile_error() {
        let error: CompileError = AnalysisWarning::UnreachableStates(vec!["q3".into()]).into();
        assert_eq!(
            error.to_string(),
            "Program validation error: Unreachable states detected: [\"q3\"]"
        );
    }
}

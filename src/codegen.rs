//! This module turns a `StateTable` into a C program that runs the machine.
//!
//! The program keeps the current state in an integer and dispatches on it in a loop:
//! one `case` per state, and inside it one `case` per symbol the state reads. Anything
//! not covered by a rule jumps to `reject`; reaching `qf` jumps to `accept`.

use crate::types::{
    decode_symbol, CompileError, Destination, State, StateTable, TransitionRule, INITIAL_SYMBOL,
    TAPE_ORIGIN, TAPE_SIZE,
};
use serde::{Deserialize, Serialize};

/// Exit status of the generated program when the machine reaches the final state.
pub const ACCEPT_STATUS: i32 = 0;
/// Exit status when the machine hits an undefined transition.
pub const REJECT_STATUS: i32 = 1;
/// Exit status when the head leaves the tape.
pub const FAULT_STATUS: i32 = 2;

/// Settings for the generated program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodegenOptions {
    /// File name written into `#line` directives.
    pub source_name: String,
    /// Number of tape cells.
    pub tape_size: usize,
    /// Cell the head starts on.
    pub origin: usize,
    /// Symbol written on the origin cell before the first step, as a C character
    /// constant body (`a`, `\0`, ...).
    pub seed_symbol: String,
    /// Emit `#line` directives in front of each block and case.
    pub line_directives: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            source_name: "input.tm".to_string(),
            tape_size: TAPE_SIZE,
            origin: TAPE_ORIGIN,
            seed_symbol: INITIAL_SYMBOL.to_string(),
            line_directives: true,
        }
    }
}

impl CodegenOptions {
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    pub fn with_tape(mut self, tape_size: usize, origin: usize) -> Self {
        self.tape_size = tape_size;
        self.origin = origin;
        self
    }

    pub fn with_seed_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.seed_symbol = symbol.into();
        self
    }

    pub fn with_line_directives(mut self, enabled: bool) -> Self {
        self.line_directives = enabled;
        self
    }

    /// Checks that the tape settings describe a usable tape and that the seed is a
    /// valid character constant.
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.tape_size == 0 {
            return Err(CompileError::Validation(
                "Tape size must be at least 1".to_string(),
            ));
        }
        if self.origin >= self.tape_size {
            return Err(CompileError::Validation(format!(
                "Tape origin {} is outside a tape of {} cells",
                self.origin, self.tape_size
            )));
        }
        if decode_symbol(&self.seed_symbol).is_none() {
            return Err(CompileError::Validation(format!(
                "Seed symbol '{}' is not a single character",
                self.seed_symbol
            )));
        }
        Ok(())
    }
}

/// Ties a line of the generated text back to the rule or block it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMapping {
    /// 1-based line in the generated text.
    pub generated_line: usize,
    /// 1-based line in the source program.
    pub source_line: usize,
    pub state: String,
    /// The symbol of the case, or `None` for the head of a state's block.
    pub symbol: Option<String>,
}

/// The output of code generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedProgram {
    pub text: String,
    pub line_map: Vec<LineMapping>,
    /// Last line of the state dispatch. Nothing below it comes from a rule.
    pub dispatch_end: usize,
}

impl GeneratedProgram {
    /// Maps a line of the generated text to the source line of the closest rule or block
    /// at or above it. Lines of the prologue and epilogue map to nothing.
    pub fn source_line(&self, generated_line: usize) -> Option<usize> {
        if generated_line > self.dispatch_end {
            return None;
        }
        self.line_map
            .iter()
            .take_while(|m| m.generated_line <= generated_line)
            .last()
            .map(|m| m.source_line)
    }
}

/// Generates the C program for `table`.
///
/// States are emitted in discovery order and rules in declaration order, so the same
/// table always yields the same text.
pub fn generate(table: &StateTable, options: &CodegenOptions) -> GeneratedProgram {
    let mut emitter = Emitter::new(options);

    emitter.prologue();
    for (index, state) in table.states().iter().enumerate() {
        emitter.state_block(table, index, state);
    }
    let dispatch_end = emitter.line;
    emitter.epilogue();

    log::debug!(
        "generated {} lines for {} states",
        emitter.line,
        table.len()
    );

    GeneratedProgram {
        text: emitter.text,
        line_map: emitter.line_map,
        dispatch_end,
    }
}

/// Escapes `text` for use inside a C string literal.
fn escape_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Appends lines to the output while keeping count of them.
struct Emitter<'a> {
    options: &'a CodegenOptions,
    text: String,
    line: usize,
    line_map: Vec<LineMapping>,
}

impl<'a> Emitter<'a> {
    fn new(options: &'a CodegenOptions) -> Self {
        Self {
            options,
            text: String::new(),
            line: 0,
            line_map: Vec::new(),
        }
    }

    fn emit(&mut self, line: impl AsRef<str>) {
        self.text.push_str(line.as_ref());
        self.text.push('\n');
        self.line += 1;
    }

    fn line_directive(&mut self, source_line: usize) {
        if self.options.line_directives {
            let directive = format!(
                "#line {} \"{}\"",
                source_line,
                escape_string(&self.options.source_name)
            );
            self.emit(directive);
        }
    }

    /// Records that the next emitted line belongs to `source_line`.
    fn map_next_line(&mut self, source_line: usize, state: &str, symbol: Option<&str>) {
        self.line_map.push(LineMapping {
            generated_line: self.line + 1,
            source_line,
            state: state.to_string(),
            symbol: symbol.map(str::to_string),
        });
    }

    fn prologue(&mut self) {
        let options = self.options;
        self.emit("/* Generated by turc. */");
        self.emit(format!("char tape[{}];", options.tape_size));
        self.emit("");
        self.emit("int main(void) {");
        self.emit(format!("    int head = {};", options.origin));
        self.emit("    int state = 0;");
        self.emit(format!("    tape[head] = '{}';", options.seed_symbol));
        self.emit("");
        self.emit("    for (;;) {");
        self.emit(format!(
            "        if (head < 0 || head >= {}) goto fault;",
            options.tape_size
        ));
        self.emit("        switch (state) {");
    }

    fn state_block(&mut self, table: &StateTable, index: usize, state: &State) {
        let first = match state.rules.first() {
            Some(rule) => rule,
            None => {
                self.emit(format!("        case {}: /* {} */", index, state.name));
                self.emit("            goto reject;");
                return;
            }
        };

        self.line_directive(first.source_line);
        self.map_next_line(first.source_line, &state.name, None);
        self.emit(format!("        case {}: /* {} */", index, state.name));
        self.emit("            switch (tape[head]) {");
        for rule in state.effective_rules() {
            self.rule_case(table, state, rule);
        }
        self.emit("            default: goto reject;");
        self.emit("            }");
    }

    fn rule_case(&mut self, table: &StateTable, state: &State, rule: &TransitionRule) {
        let transfer = match rule.destination {
            Destination::State(next) => format!(
                "state = {}; continue; /* {} */",
                next,
                table.destination_name(rule.destination)
            ),
            Destination::Accept => "goto accept;".to_string(),
        };

        self.line_directive(rule.source_line);
        self.map_next_line(rule.source_line, &state.name, Some(&rule.source_symbol));
        self.emit(format!(
            "            case '{}': tape[head] = '{}'; head += {}; {}",
            rule.source_symbol,
            rule.dest_symbol,
            rule.direction.offset(),
            transfer
        ));
    }

    fn epilogue(&mut self) {
        self.emit("        }");
        self.emit("    }");
        self.emit("");
        self.emit("accept:");
        self.emit(format!("    return {};", ACCEPT_STATUS));
        self.emit("reject:");
        self.emit(format!("    return {};", REJECT_STATUS));
        self.emit("fault:");
        self.emit(format!("    return {};", FAULT_STATUS));
        self.emit("}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn lines_starting_with<'a>(text: &'a str, prefix: &str) -> Vec<&'a str> {
        text.lines()
            .map(str::trim_start)
            .filter(|line| line.starts_with(prefix))
            .collect()
    }

    #[test]
    fn test_single_accepting_rule() {
        let table = parse("q0 a -> qf b N\n").unwrap();
        let program = generate(&table, &CodegenOptions::default());

        assert_eq!(lines_starting_with(&program.text, "case 0:").len(), 1);
        assert_eq!(
            lines_starting_with(&program.text, "case '"),
            vec!["case 'a': tape[head] = 'b'; head += 0; goto accept;"]
        );
        assert_eq!(
            lines_starting_with(&program.text, "default: goto reject;").len(),
            1
        );
        assert!(program.text.contains("tape[head] = 'a';"));
        assert!(program.text.contains("char tape[10];"));
        assert!(program.text.contains("int head = 5;"));
    }

    #[test]
    fn test_transition_to_state() {
        let table = parse("q0 a -> q1 b R\nq1 b -> q0 \\0 L\n").unwrap();
        let program = generate(&table, &CodegenOptions::default());

        assert_eq!(
            lines_starting_with(&program.text, "case '"),
            vec![
                "case 'a': tape[head] = 'b'; head += 1; state = 1; continue; /* q1 */",
                "case 'b': tape[head] = '\\0'; head += -1; state = 0; continue; /* q0 */",
            ]
        );
    }

    #[test]
    fn test_destination_only_state_rejects() {
        let table = parse("q0 a -> q1 b R\n").unwrap();
        let program = generate(&table, &CodegenOptions::default());

        let lines: Vec<&str> = program.text.lines().map(str::trim).collect();
        let block = lines.iter().position(|l| *l == "case 1: /* q1 */").unwrap();
        assert_eq!(lines[block + 1], "goto reject;");
        assert_eq!(lines_starting_with(&program.text, "case '").len(), 1);
    }

    #[test]
    fn test_line_directives_and_map() {
        let table = parse("\nq0 a -> q1 b R\nq1 b -> qf b N\nq0 b -> qf a L\n").unwrap();
        let options = CodegenOptions::default().with_source_name("prog.tm");
        let program = generate(&table, &options);
        let lines: Vec<&str> = program.text.lines().collect();

        assert_eq!(program.line_map.len(), 5);
        for mapping in &program.line_map {
            let directive = lines[mapping.generated_line - 2];
            assert_eq!(
                directive,
                format!("#line {} \"prog.tm\"", mapping.source_line)
            );
        }

        let q0_cases: Vec<_> = program
            .line_map
            .iter()
            .filter(|m| m.state == "q0")
            .map(|m| (m.symbol.as_deref(), m.source_line))
            .collect();
        assert_eq!(q0_cases, vec![(None, 2), (Some("a"), 2), (Some("b"), 4)]);
    }

    #[test]
    fn test_source_line_lookup() {
        let table = parse("q0 a -> q1 b R\nq1 b -> qf b N\n").unwrap();
        let program = generate(&table, &CodegenOptions::default());

        let last = program.line_map.last().unwrap();
        assert_eq!(program.source_line(last.generated_line), Some(2));
        assert_eq!(program.source_line(1), None);

        let lines: Vec<&str> = program.text.lines().collect();
        let accept = lines.iter().position(|l| *l == "accept:").unwrap() + 1;
        let fault = lines.iter().position(|l| *l == "fault:").unwrap() + 1;
        assert_eq!(program.source_line(accept), None);
        assert_eq!(program.source_line(fault), None);
        assert_eq!(program.source_line(program.dispatch_end), Some(2));
    }

    #[test]
    fn test_source_name_is_escaped() {
        let table = parse("q0 a -> qf b N\n").unwrap();
        let options = CodegenOptions::default().with_source_name("C:\\tm\\\"odd\".tm");
        let program = generate(&table, &options);

        assert!(program
            .text
            .contains("#line 1 \"C:\\\\tm\\\\\\\"odd\\\".tm\""));
    }

    #[test]
    fn test_equal_spellings_emit_one_case() {
        let table =
            parse("q0 \\0 -> qf a N\nq0 \\00 -> qf b N\nq0 a -> qf c N\nq0 \\141 -> qf d N\n")
                .unwrap();
        let program = generate(&table, &CodegenOptions::default());

        assert_eq!(
            lines_starting_with(&program.text, "case '"),
            vec![
                "case '\\0': tape[head] = 'a'; head += 0; goto accept;",
                "case 'a': tape[head] = 'c'; head += 0; goto accept;",
            ]
        );
    }

    #[test]
    fn test_without_line_directives() {
        let table = parse("q0 a -> qf b N\n").unwrap();
        let options = CodegenOptions::default().with_line_directives(false);
        let program = generate(&table, &options);

        assert!(!program.text.contains("#line"));
        assert_eq!(program.line_map.len(), 2);
        let lines: Vec<&str> = program.text.lines().collect();
        assert!(lines[program.line_map[1].generated_line - 1]
            .trim_start()
            .starts_with("case 'a'"));
    }

    #[test]
    fn test_shadowed_rule_not_emitted() {
        let table = parse("q0 a -> qf b N\nq0 a -> qf c R\n").unwrap();
        let program = generate(&table, &CodegenOptions::default());

        assert_eq!(lines_starting_with(&program.text, "case 'a'").len(), 1);
        assert!(!program.text.contains("'c'"));
    }

    #[test]
    fn test_custom_tape() {
        let table = parse("q0 a -> qf b N\n").unwrap();
        let options = CodegenOptions::default()
            .with_tape(32, 0)
            .with_seed_symbol("1");
        let program = generate(&table, &options);

        assert!(program.text.contains("char tape[32];"));
        assert!(program.text.contains("int head = 0;"));
        assert!(program.text.contains("tape[head] = '1';"));
        assert!(program.text.contains("head >= 32"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let source = "q0 a -> q2 b R\nq2 \\0 -> q1 a L\nq1 b -> qf b N\nq1 a -> q2 a R\n";
        let first = generate(&parse(source).unwrap(), &CodegenOptions::default());
        let second = generate(&parse(source).unwrap(), &CodegenOptions::default());

        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_options() {
        assert!(CodegenOptions::default().validate().is_ok());
        assert!(CodegenOptions::default().with_tape(4, 4).validate().is_err());
        assert!(CodegenOptions::default().with_tape(0, 0).validate().is_err());
        for seed in ["", "\\", "ab", "\\q"] {
            assert!(CodegenOptions::default()
                .with_seed_symbol(seed)
                .validate()
                .is_err());
        }
        assert!(CodegenOptions::default()
            .with_seed_symbol("\\0")
            .validate()
            .is_ok());
    }
}

//! This module defines the `TuringMachine` struct, a reference interpreter for a
//! `StateTable`. It runs a table with the same semantics as the program produced by the
//! code generator: same tape, same seed, same accept/reject/fault outcomes.

use crate::codegen::{CodegenOptions, ACCEPT_STATUS, FAULT_STATUS, REJECT_STATUS};
use crate::types::{
    decode_symbol, Destination, MachineError, StateTable, TransitionRule, BLANK_SYMBOL,
    MAX_EXECUTION_STEPS,
};

/// Represents the outcome of a single step.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The machine performed a transition and keeps going.
    Continue,
    /// The machine stopped.
    Halt(Halt),
}

/// Why the machine stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    /// A rule led to the final state.
    Accept,
    /// No rule matched the symbol under the head.
    Reject,
    Fault(MachineError),
}

impl Halt {
    /// The exit status the generated program reports for this outcome.
    ///
    /// Returns `None` for faults the generated program has no counterpart for: it has
    /// no step limit and runs on forever, and it can't be built from a symbol that
    /// isn't a valid character constant.
    pub fn exit_status(&self) -> Option<i32> {
        match self {
            Halt::Accept => Some(ACCEPT_STATUS),
            Halt::Reject => Some(REJECT_STATUS),
            Halt::Fault(MachineError::TapeBoundary) => Some(FAULT_STATUS),
            Halt::Fault(MachineError::StepLimit(_) | MachineError::UnsupportedSymbol(_)) => None,
        }
    }
}

/// A rule that can fire, with its symbols decoded when the machine is built.
struct DecodedRule {
    read: Option<u8>,
    write: Option<u8>,
    rule: TransitionRule,
}

impl DecodedRule {
    fn new(rule: &TransitionRule) -> Self {
        Self {
            read: decode_symbol(&rule.source_symbol),
            write: decode_symbol(&rule.dest_symbol),
            rule: rule.clone(),
        }
    }

    fn read(&self) -> Result<u8, MachineError> {
        self.read
            .ok_or_else(|| MachineError::UnsupportedSymbol(self.rule.source_symbol.clone()))
    }

    fn write(&self) -> Result<u8, MachineError> {
        self.write
            .ok_or_else(|| MachineError::UnsupportedSymbol(self.rule.dest_symbol.clone()))
    }
}

/// Executes a `StateTable` on a bounded tape.
pub struct TuringMachine {
    table: StateTable,
    /// The effective rules of each state, indexed like the table.
    rules: Vec<Vec<DecodedRule>>,
    tape: Vec<u8>,
    head: isize,
    state: usize,
    origin: usize,
    seed: u8,
    step_count: usize,
    halted: Option<Halt>,
}

impl TuringMachine {
    /// Creates a machine in its initial configuration.
    ///
    /// # Returns
    ///
    /// * `Err(MachineError::UnsupportedSymbol)` if the seed symbol can't be decoded.
    /// * `Err(MachineError::TapeBoundary)` if the origin lies outside the tape.
    pub fn new(table: StateTable, options: &CodegenOptions) -> Result<Self, MachineError> {
        let seed = decode_symbol(&options.seed_symbol)
            .ok_or_else(|| MachineError::UnsupportedSymbol(options.seed_symbol.clone()))?;
        if options.origin >= options.tape_size {
            return Err(MachineError::TapeBoundary);
        }

        let rules = table
            .states()
            .iter()
            .map(|state| state.effective_rules().map(DecodedRule::new).collect())
            .collect();

        let mut machine = Self {
            table,
            rules,
            tape: vec![BLANK_SYMBOL; options.tape_size],
            head: 0,
            state: 0,
            origin: options.origin,
            seed,
            step_count: 0,
            halted: None,
        };
        machine.reset();
        Ok(machine)
    }

    /// Executes a single transition.
    ///
    /// # Returns
    ///
    /// * `Step::Continue` if a rule fired and led to another state.
    /// * `Step::Halt(_)` if the machine accepted, rejected or faulted. Once halted,
    ///   every further call returns the same halt.
    pub fn step(&mut self) -> Step {
        if let Some(halt) = &self.halted {
            return Step::Halt(halt.clone());
        }

        let halt = match self.transition() {
            Ok(None) => return Step::Continue,
            Ok(Some(halt)) => halt,
            Err(e) => Halt::Fault(e),
        };

        log::debug!("machine halted after {} steps: {:?}", self.step_count, halt);
        self.halted = Some(halt.clone());
        Step::Halt(halt)
    }

    /// Runs until the machine halts or `MAX_EXECUTION_STEPS` transitions have fired.
    pub fn run(&mut self) -> Halt {
        loop {
            if self.step_count >= MAX_EXECUTION_STEPS && self.halted.is_none() {
                self.halted = Some(Halt::Fault(MachineError::StepLimit(MAX_EXECUTION_STEPS)));
            }

            if let Step::Halt(halt) = self.step() {
                return halt;
            }
        }
    }

    /// Applies the matching rule, returning the halt it led to, if any.
    fn transition(&mut self) -> Result<Option<Halt>, MachineError> {
        let cell = self.cell()?;
        let (write, offset, destination) = match self.find_rule(self.tape[cell])? {
            Some(decoded) => (
                decoded.write()?,
                decoded.rule.direction.offset(),
                decoded.rule.destination,
            ),
            None => return Ok(Some(Halt::Reject)),
        };

        self.tape[cell] = write;
        self.head += offset;
        self.step_count += 1;

        match destination {
            Destination::State(next) => {
                self.state = next;
                Ok(None)
            }
            Destination::Accept => Ok(Some(Halt::Accept)),
        }
    }

    /// The tape index under the head, checked against the tape bounds.
    fn cell(&self) -> Result<usize, MachineError> {
        usize::try_from(self.head)
            .ok()
            .filter(|&cell| cell < self.tape.len())
            .ok_or(MachineError::TapeBoundary)
    }

    /// Finds the first rule of the current state reading `symbol`.
    fn find_rule(&self, symbol: u8) -> Result<Option<&DecodedRule>, MachineError> {
        let Some(rules) = self.rules.get(self.state) else {
            return Ok(None);
        };

        for decoded in rules {
            if decoded.read()? == symbol {
                return Ok(Some(decoded));
            }
        }

        Ok(None)
    }

    /// Resets the tape, head, state and step count to the initial configuration.
    pub fn reset(&mut self) {
        self.tape.fill(BLANK_SYMBOL);
        self.tape[self.origin] = self.seed;
        self.head = self.origin as isize;
        self.state = 0;
        self.step_count = 0;
        self.halted = None;
    }

    /// Returns the name of the current state.
    pub fn state(&self) -> &str {
        self.table
            .get(self.state)
            .map_or("", |state| state.name.as_str())
    }

    /// Returns the head position. It may lie outside the tape after a faulting move.
    pub fn head(&self) -> isize {
        self.head
    }

    pub fn tape(&self) -> &[u8] {
        &self.tape
    }

    /// Renders the tape with blanks as `_` and unprintable cells as `?`.
    pub fn tape_as_string(&self) -> String {
        self.tape
            .iter()
            .map(|&cell| match cell {
                BLANK_SYMBOL => '_',
                c if c.is_ascii_graphic() => c as char,
                _ => '?',
            })
            .collect()
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn table(&self) -> &StateTable {
        &self.table
    }
}

pub mod ansi;
pub mod json;
pub mod registry;

use crate::config::ConfigError;
use crate::interpreter::InterpreterError;
use crate::program::{ProgramBlock, ProgramError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Points at one block of the program the diagnostic is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub block: usize,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    /// One rendered line per block, indented by loop depth.
    pub listing: Option<Vec<String>>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            listing: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, ..Diagnostic::error(message) }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_block(mut self, block: usize, label: impl Into<String>) -> Self {
        self.labels.push(Label { block, message: label.into(), is_primary: true });
        self
    }

    pub fn with_secondary_block(mut self, block: usize, label: impl Into<String>) -> Self {
        self.labels.push(Label { block, message: label.into(), is_primary: false });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_program(mut self, blocks: &[ProgramBlock]) -> Self {
        self.listing = Some(render_listing(blocks));
        self
    }

    pub fn primary_label(&self) -> Option<&Label> {
        self.labels.iter().find(|l| l.is_primary)
    }
}

fn render_listing(blocks: &[ProgramBlock]) -> Vec<String> {
    let mut depth = 0usize;
    blocks
        .iter()
        .map(|block| {
            if let ProgramBlock::LoopEnd { .. } = block {
                depth = depth.saturating_sub(1);
            }
            let line = format!("{}{block}", "  ".repeat(depth));
            if let ProgramBlock::LoopStart { .. } = block {
                depth += 1;
            }
            line
        })
        .collect()
}

// ---- From impls for engine error types ----

impl From<&ProgramError> for Diagnostic {
    fn from(e: &ProgramError) -> Self {
        let d = Diagnostic::error(e.to_string());
        match e {
            ProgramError::UnmatchedLoopEnd { index, .. } => d
                .with_code("BS-P001")
                .with_block(*index, "no loop start before this"),
            ProgramError::UnclosedLoop { label } => d
                .with_code("BS-P002")
                .with_suggestion(format!("add {{\"type\":\"loopEnd\",\"label\":\"{label}\"}} after the loop body")),
            ProgramError::OverlappingLoops { expected, index, .. } => d
                .with_code("BS-P003")
                .with_block(*index, "closes the wrong loop")
                .with_note(format!("loop '{expected}' must be closed first")),
            ProgramError::DuplicateLoopLabel { .. } => d
                .with_code("BS-P004")
                .with_note("every loop needs a label of its own"),
            ProgramError::InvalidLoopLabel { .. } => d
                .with_code("BS-P005")
                .with_suggestion("loop labels are uppercase letters: A, B, ..., Z, AA, AB, ..."),
        }
    }
}

impl From<&InterpreterError> for Diagnostic {
    fn from(e: &InterpreterError) -> Self {
        let d = Diagnostic::error(e.to_string());
        match e {
            InterpreterError::UnknownCommand { index, .. } => d
                .with_code("BS-R001")
                .with_block(*index, "no handler registered")
                .with_note("the run halted before this block"),
            InterpreterError::Handler { namespace, .. } => d
                .with_code("BS-R002")
                .with_note(format!("reported by the '{namespace}' handler")),
            InterpreterError::Stalled { index } => d
                .with_code("BS-R003")
                .with_block(*index, "counter cannot move past this loop end")
                .with_suggestion("initiate the run so every loop has an iteration count"),
        }
    }
}

impl From<&ConfigError> for Diagnostic {
    fn from(e: &ConfigError) -> Self {
        match e {
            ConfigError::Io { path, .. } => Diagnostic::error(e.to_string())
                .with_code("BS-C001")
                .with_note(format!("while reading '{}'", path.display())),
            ConfigError::Parse { .. } => Diagnostic::error(e.to_string()).with_code("BS-C002"),
            ConfigError::InvalidBounds { .. } => Diagnostic::error(e.to_string())
                .with_code("BS-C003")
                .with_suggestion("width and height must both be at least 1"),
            ConfigError::Program(inner) => Diagnostic::from(inner),
        }
    }
}

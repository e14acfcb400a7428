use serde::{Deserialize, Serialize};

/// The synthetic command name that stands for a loop when inserting or
/// querying.
pub const LOOP_COMMAND: &str = "loop";

/// One element of an editable program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgramBlock {
    Command { name: String },
    LoopStart { label: String, iterations: u32 },
    LoopEnd { label: String },
}

impl ProgramBlock {
    pub fn command(name: impl Into<String>) -> Self {
        ProgramBlock::Command { name: name.into() }
    }

    pub fn loop_start(label: impl Into<String>, iterations: u32) -> Self {
        ProgramBlock::LoopStart { label: label.into(), iterations }
    }

    pub fn loop_end(label: impl Into<String>) -> Self {
        ProgramBlock::LoopEnd { label: label.into() }
    }

    pub fn is_control_block(&self) -> bool {
        matches!(self, ProgramBlock::LoopStart { .. } | ProgramBlock::LoopEnd { .. })
    }

    pub fn loop_label(&self) -> Option<&str> {
        match self {
            ProgramBlock::LoopStart { label, .. } | ProgramBlock::LoopEnd { label } => Some(label),
            ProgramBlock::Command { .. } => None,
        }
    }

    pub fn command_name(&self) -> Option<&str> {
        match self {
            ProgramBlock::Command { name } => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProgramBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramBlock::Command { name } => write!(f, "{name}"),
            ProgramBlock::LoopStart { label, iterations } => write!(f, "loop {label} x{iterations} {{"),
            ProgramBlock::LoopEnd { label } => write!(f, "}} {label}"),
        }
    }
}

/// What an editor gesture inserts or writes into a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepToken {
    Command(String),
    /// A fresh `LoopStart`/`LoopEnd` pair around an empty body.
    Loop,
}

impl From<&str> for StepToken {
    fn from(name: &str) -> Self {
        if name == LOOP_COMMAND {
            StepToken::Loop
        } else {
            StepToken::Command(name.to_string())
        }
    }
}

impl From<String> for StepToken {
    fn from(name: String) -> Self {
        if name == LOOP_COMMAND {
            StepToken::Loop
        } else {
            StepToken::Command(name)
        }
    }
}

/// Derived position of a block inside its innermost enclosing loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopPosition {
    pub containing_loop_label: String,
    /// 1-based. A nested loop occupies its full length: start marker, body
    /// and end marker.
    pub containing_loop_position: usize,
}

struct OpenLoop<'a> {
    label: &'a str,
    position: usize,
}

/// Single pass over `blocks` producing one cache entry per block.
/// Top-level blocks, including top-level loop markers, get `None`.
pub fn compute_loop_cache(blocks: &[ProgramBlock]) -> Vec<Option<LoopPosition>> {
    let mut open: Vec<OpenLoop<'_>> = Vec::new();
    let mut cache = Vec::with_capacity(blocks.len());

    for block in blocks {
        if let ProgramBlock::LoopEnd { .. } = block {
            // The closed loop's length rolls up into its parent.
            if let Some(closed) = open.pop() {
                if let Some(parent) = open.last_mut() {
                    parent.position += closed.position;
                }
            }
        }

        cache.push(open.last_mut().map(|parent| {
            parent.position += 1;
            LoopPosition {
                containing_loop_label: parent.label.to_string(),
                containing_loop_position: parent.position,
            }
        }));

        if let ProgramBlock::LoopStart { label, .. } = block {
            open.push(OpenLoop { label: label.as_str(), position: 0 });
        }
    }

    cache
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(label: &str, position: usize) -> Option<LoopPosition> {
        Some(LoopPosition { containing_loop_label: label.to_string(), containing_loop_position: position })
    }

    #[test]
    fn top_level_blocks_have_no_cache() {
        let blocks = vec![ProgramBlock::command("forward1"), ProgramBlock::command("left90")];
        assert_eq!(compute_loop_cache(&blocks), vec![None, None]);
    }

    #[test]
    fn three_deep_nesting() {
        let blocks = vec![
            ProgramBlock::loop_start("A", 3),
            ProgramBlock::loop_start("B", 2),
            ProgramBlock::command("forward3"),
            ProgramBlock::loop_start("C", 1),
            ProgramBlock::command("forward1"),
            ProgramBlock::command("forward2"),
            ProgramBlock::loop_end("C"),
            ProgramBlock::command("forward3"),
            ProgramBlock::loop_end("B"),
            ProgramBlock::loop_end("A"),
        ];
        assert_eq!(
            compute_loop_cache(&blocks),
            vec![
                None,
                pos("A", 1),
                pos("B", 1),
                pos("B", 2),
                pos("C", 1),
                pos("C", 2),
                pos("B", 5),
                pos("B", 6),
                pos("A", 8),
                None,
            ]
        );
    }

    #[test]
    fn sibling_top_level_loops_start_fresh() {
        let blocks = vec![
            ProgramBlock::loop_start("A", 1),
            ProgramBlock::command("forward1"),
            ProgramBlock::loop_end("A"),
            ProgramBlock::command("left90"),
            ProgramBlock::loop_start("B", 1),
            ProgramBlock::command("forward2"),
            ProgramBlock::loop_end("B"),
        ];
        assert_eq!(
            compute_loop_cache(&blocks),
            vec![None, pos("A", 1), None, None, None, pos("B", 1), None]
        );
    }

    #[test]
    fn step_token_from_name() {
        assert_eq!(StepToken::from("loop"), StepToken::Loop);
        assert_eq!(StepToken::from("forward1"), StepToken::Command("forward1".into()));
    }

    #[test]
    fn block_json_shape() {
        let json = serde_json::to_string(&ProgramBlock::loop_start("A", 2)).unwrap();
        assert_eq!(json, r#"{"type":"loopStart","label":"A","iterations":2}"#);
        let back: ProgramBlock = serde_json::from_str(r#"{"type":"command","name":"left45"}"#).unwrap();
        assert_eq!(back, ProgramBlock::command("left45"));
    }
}

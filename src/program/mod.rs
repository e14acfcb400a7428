use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub mod block;
pub mod label;

pub use block::{LOOP_COMMAND, LoopPosition, ProgramBlock, StepToken, compute_loop_cache};
pub use label::{generate_loop_label, parse_loop_label};

/// Iteration count given to a loop freshly inserted by an edit.
pub const NEW_LOOP_ITERATIONS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("loop end '{label}' at {index} has no matching loop start")]
    UnmatchedLoopEnd { label: String, index: usize },
    #[error("loop start '{label}' is never closed")]
    UnclosedLoop { label: String },
    #[error("loop end '{found}' at {index} closes across open loop '{expected}'")]
    OverlappingLoops { expected: String, found: String, index: usize },
    #[error("loop label '{label}' is used by more than one loop")]
    DuplicateLoopLabel { label: String },
    #[error("'{label}' is not a valid loop label")]
    InvalidLoopLabel { label: String },
}

/// An editable, loop-aware program plus its execution cursor.
///
/// Values are immutable: every edit and every counter advance returns a new
/// sequence. The block list is shared between snapshots until an edit
/// replaces it, so advancing the counter never copies blocks.
#[derive(Debug, Clone)]
pub struct ProgramSequence {
    blocks: Arc<Vec<ProgramBlock>>,
    loop_cache: Arc<Vec<Option<LoopPosition>>>,
    program_counter: usize,
    loop_counter: u32,
    loop_iterations_left: HashMap<String, u32>,
}

impl Default for ProgramSequence {
    fn default() -> Self {
        ProgramSequence::new()
    }
}

impl PartialEq for ProgramSequence {
    fn eq(&self, other: &Self) -> bool {
        self.blocks == other.blocks
            && self.program_counter == other.program_counter
            && self.loop_counter == other.loop_counter
            && self.loop_iterations_left == other.loop_iterations_left
    }
}

impl ProgramSequence {
    pub fn new() -> Self {
        ProgramSequence {
            blocks: Arc::new(Vec::new()),
            loop_cache: Arc::new(Vec::new()),
            program_counter: 0,
            loop_counter: 0,
            loop_iterations_left: HashMap::new(),
        }
    }

    /// Build a sequence from an externally produced block list, checking
    /// that loop markers pair up and nest without overlapping. The loop
    /// counter resumes after the highest label found.
    pub fn from_blocks(blocks: Vec<ProgramBlock>) -> Result<Self, ProgramError> {
        let loop_counter = validate_loops(&blocks)?;
        Ok(ProgramSequence {
            loop_cache: Arc::new(compute_loop_cache(&blocks)),
            blocks: Arc::new(blocks),
            program_counter: 0,
            loop_counter,
            loop_iterations_left: HashMap::new(),
        })
    }

    // ---- Queries ----

    pub fn blocks(&self) -> &[ProgramBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn program_counter(&self) -> usize {
        self.program_counter
    }

    pub fn loop_counter(&self) -> u32 {
        self.loop_counter
    }

    pub fn loop_iterations_left(&self) -> &HashMap<String, u32> {
        &self.loop_iterations_left
    }

    pub fn iterations_left(&self, label: &str) -> Option<u32> {
        self.loop_iterations_left.get(label).copied()
    }

    pub fn is_at_end(&self) -> bool {
        self.program_counter >= self.blocks.len()
    }

    pub fn block_at(&self, index: usize) -> Option<&ProgramBlock> {
        self.blocks.get(index)
    }

    pub fn current_step(&self) -> Option<&ProgramBlock> {
        self.blocks.get(self.program_counter)
    }

    pub fn loop_position_at(&self, index: usize) -> Option<&LoopPosition> {
        self.loop_cache.get(index).and_then(Option::as_ref)
    }

    pub fn has_loop_block(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, ProgramBlock::LoopStart { .. }))
    }

    pub fn current_step_is_control_block(&self) -> bool {
        self.current_step().is_some_and(ProgramBlock::is_control_block)
    }

    /// Index of the structural partner of the loop marker at `index`.
    pub fn matching_loop_block_index(&self, index: usize) -> Option<usize> {
        match self.blocks.get(index)? {
            ProgramBlock::LoopStart { label, .. } => (index + 1..self.blocks.len()).find(|&i| {
                matches!(&self.blocks[i], ProgramBlock::LoopEnd { label: l } if l == label)
            }),
            ProgramBlock::LoopEnd { label } => (0..index).rev().find(|&i| {
                matches!(&self.blocks[i], ProgramBlock::LoopStart { label: l, .. } if l == label)
            }),
            ProgramBlock::Command { .. } => None,
        }
    }

    pub fn are_matching_loop_blocks(&self, index1: usize, index2: usize) -> bool {
        match (self.blocks.get(index1), self.blocks.get(index2)) {
            (Some(ProgramBlock::LoopStart { label: a, .. }), Some(ProgramBlock::LoopEnd { label: b }))
            | (Some(ProgramBlock::LoopEnd { label: a }), Some(ProgramBlock::LoopStart { label: b, .. })) => a == b,
            _ => false,
        }
    }

    /// Whether `action` appears anywhere. Loop markers answer to `"loop"`.
    pub fn uses_action(&self, action: &str) -> bool {
        self.blocks.iter().any(|block| match block {
            ProgramBlock::Command { name } => name == action,
            ProgramBlock::LoopStart { .. } | ProgramBlock::LoopEnd { .. } => action == LOOP_COMMAND,
        })
    }

    // ---- Counter and run state ----

    /// Same program, counter moved. Clamped to `len()`.
    pub fn with_program_counter(&self, program_counter: usize) -> ProgramSequence {
        ProgramSequence { program_counter: program_counter.min(self.len()), ..self.clone() }
    }

    /// Counter to 0, and every loop's remaining iterations reset to its
    /// static count.
    pub fn initiate_program_run(&self) -> ProgramSequence {
        let loop_iterations_left = self
            .blocks
            .iter()
            .filter_map(|block| match block {
                ProgramBlock::LoopStart { label, iterations } => Some((label.clone(), *iterations)),
                _ => None,
            })
            .collect();
        ProgramSequence { program_counter: 0, loop_iterations_left, ..self.clone() }
    }

    /// Move the counter past the current block as execution would, taking
    /// any loop repeat that is due.
    ///
    /// Each `LoopEnd` reached decrements its loop's remaining iterations; if
    /// some remain, the counter jumps back to the matching `LoopStart` and
    /// every loop nested inside is reset to its static count. Exhausted
    /// loop ends are stepped over one after another. With
    /// `skip_empty_loop_entirely` a repeat of a loop with an empty body is
    /// abandoned instead (its remaining count forced to 0).
    pub fn advance_program_counter(&self, skip_empty_loop_entirely: bool) -> ProgramSequence {
        if self.is_at_end() {
            return self.clone();
        }

        let blocks = &self.blocks;
        let mut pc = self.program_counter;
        let mut iterations_left = self.loop_iterations_left.clone();

        // The counter is not expected to rest on a LoopEnd; if it does, the
        // loop end is evaluated in place.
        if !matches!(blocks[pc], ProgramBlock::LoopEnd { .. }) {
            pc += 1;
        }

        while let Some(ProgramBlock::LoopEnd { label }) = blocks.get(pc) {
            let Some(current) = iterations_left.get(label).copied() else {
                tracing::warn!(loop_label = %label, index = pc, "no iteration count for loop end");
                break;
            };
            let remaining = current.saturating_sub(1);
            if current > 0 {
                iterations_left.insert(label.clone(), remaining);
            }
            if remaining == 0 {
                pc += 1;
                continue;
            }

            let end = pc;
            let mut start = None;
            for i in (0..end).rev() {
                if let ProgramBlock::LoopStart { label: l, iterations } = &blocks[i] {
                    if l == label {
                        start = Some(i);
                        break;
                    }
                    iterations_left.insert(l.clone(), *iterations);
                }
            }
            match start {
                Some(i) if skip_empty_loop_entirely && i + 1 == end => {
                    iterations_left.insert(label.clone(), 0);
                    pc += 1;
                }
                Some(i) => {
                    tracing::trace!(loop_label = %label, from = end, to = i, remaining, "loop repeat");
                    pc = i;
                }
                None => {
                    tracing::warn!(loop_label = %label, index = end, "loop end without loop start");
                    pc += 1;
                }
            }
        }

        ProgramSequence {
            program_counter: pc,
            loop_iterations_left: iterations_left,
            ..self.clone()
        }
    }

    // ---- Edits ----

    /// Insert at `index`, shifting later blocks right. A counter at or
    /// after `index` shifts by the number of inserted blocks.
    pub fn insert_step(&self, index: usize, token: impl Into<StepToken>) -> ProgramSequence {
        debug_assert!(index <= self.len(), "insert index {index} past end {}", self.len());
        let index = index.min(self.len());
        let mut next = self.clone();
        let inserted = next.mint_blocks(token.into());
        let count = inserted.len();

        let mut blocks = (*self.blocks).clone();
        blocks.splice(index..index, inserted);
        if index <= self.program_counter {
            next.program_counter += count;
        }
        next.replace_blocks(blocks);
        next
    }

    /// Replace the command at `index`. A loop expands the single slot into
    /// a start/end pair, pushing everything after it right by one.
    pub fn overwrite_step(&self, index: usize, token: impl Into<StepToken>) -> ProgramSequence {
        let Some(target) = self.blocks.get(index) else {
            debug_assert!(false, "overwrite index {index} past end {}", self.len());
            return self.clone();
        };
        debug_assert!(!target.is_control_block(), "overwrite of loop marker at {index}");

        let mut next = self.clone();
        let written = next.mint_blocks(token.into());
        let grew = written.len() > 1;

        let mut blocks = (*self.blocks).clone();
        blocks.splice(index..=index, written);
        if grew && index < self.program_counter {
            next.program_counter += 1;
        }
        next.replace_blocks(blocks);
        next
    }

    /// Remove the block at `index`; a loop marker takes its partner with it
    /// (the body stays, one level shallower). Deleting the current block,
    /// or the partner of the current loop marker, first advances the
    /// counter as execution would. Out of range is a no-op.
    pub fn delete_step(&self, index: usize) -> ProgramSequence {
        if index >= self.len() {
            return self.clone();
        }

        let mut next = if index == self.program_counter
            || self.are_matching_loop_blocks(index, self.program_counter)
        {
            self.advance_program_counter(true)
        } else {
            self.clone()
        };
        let pc = next.program_counter;

        let mut removed_before_pc = usize::from(index < pc);
        let mut blocks = (*self.blocks).clone();
        match (&self.blocks[index], self.matching_loop_block_index(index)) {
            (block, Some(partner)) if block.is_control_block() => {
                if partner < pc {
                    removed_before_pc += 1;
                }
                blocks.remove(index.max(partner));
                blocks.remove(index.min(partner));
                if let Some(label) = block.loop_label() {
                    next.loop_iterations_left.remove(label);
                }
            }
            _ => {
                blocks.remove(index);
            }
        }

        next.program_counter = pc - removed_before_pc;
        next.replace_blocks(blocks);
        next
    }

    /// Exchange the block at `index_from` with the one at `index_to`.
    ///
    /// A loop marker moves its whole loop as a unit, so the only valid
    /// targets for a marker are the block just outside the loop on the side
    /// being moved towards:
    ///
    /// - `LoopStart` left: `index_to == index_from - 1`
    /// - `LoopStart` right: `index_to == end + 1`
    /// - `LoopEnd` left: `index_to == start - 1`
    /// - `LoopEnd` right: `index_to == index_from + 1`
    ///
    /// Out-of-range indices leave the program unchanged. The counter is not
    /// adjusted.
    pub fn swap_step(&self, index_from: usize, index_to: usize) -> ProgramSequence {
        let len = self.len();
        if index_from >= len || index_to >= len || index_from == index_to {
            return self.clone();
        }

        let mut blocks = (*self.blocks).clone();
        let swapped = blocks[index_to].clone();

        match &self.blocks[index_from] {
            ProgramBlock::Command { .. } => {
                if blocks[index_to].is_control_block() && index_from.abs_diff(index_to) != 1 {
                    debug_assert!(false, "swap {index_from} -> {index_to} would split a loop");
                    return self.clone();
                }
                blocks.swap(index_from, index_to)
            }
            marker => {
                let Some(partner) = self.matching_loop_block_index(index_from) else {
                    debug_assert!(false, "loop marker at {index_from} has no partner");
                    return self.clone();
                };
                let start = index_from.min(partner);
                let end = index_from.max(partner);
                let moving_left = index_to < index_from;
                let valid = match (marker, moving_left) {
                    (ProgramBlock::LoopStart { .. }, true) => index_to + 1 == index_from,
                    (ProgramBlock::LoopStart { .. }, false) => index_to == end + 1,
                    (_, true) => index_to + 1 == start,
                    (_, false) => index_to == index_from + 1,
                };
                if !valid {
                    debug_assert!(false, "swap {index_from} -> {index_to} would split a loop");
                    return self.clone();
                }

                let looped: Vec<ProgramBlock> = blocks[start..=end].to_vec();
                if moving_left {
                    // [swapped, loop...] -> [loop..., swapped]
                    blocks.splice(index_to..index_to + looped.len(), looped);
                    blocks[end] = swapped;
                } else {
                    // [loop..., swapped] -> [swapped, loop...]
                    blocks[start] = swapped;
                    let after = start + 1;
                    blocks.splice(after..after + looped.len(), looped);
                }
            }
        }

        let mut next = self.clone();
        next.replace_blocks(blocks);
        next
    }

    /// Change a loop's static iteration count. A loop already mid-run sees
    /// the new count as its remaining iterations.
    pub fn set_loop_iterations(&self, label: &str, iterations: u32) -> ProgramSequence {
        let Some(index) = self
            .blocks
            .iter()
            .position(|b| matches!(b, ProgramBlock::LoopStart { label: l, .. } if l == label))
        else {
            return self.clone();
        };

        let mut blocks = (*self.blocks).clone();
        blocks[index] = ProgramBlock::loop_start(label, iterations);
        let mut next = self.clone();
        if let Some(left) = next.loop_iterations_left.get_mut(label) {
            *left = iterations;
        }
        next.replace_blocks(blocks);
        next
    }

    // ---- Internals ----

    /// Blocks for `token`. A loop takes the next label, or restarts at `A`
    /// when no loop is left in the program. Past the last label it falls
    /// back to the lowest number not in use.
    fn mint_blocks(&mut self, token: StepToken) -> Vec<ProgramBlock> {
        match token {
            StepToken::Command(name) => vec![ProgramBlock::Command { name }],
            StepToken::Loop => {
                self.loop_counter = self.next_loop_number();
                let label = generate_loop_label(self.loop_counter);
                self.loop_iterations_left.insert(label.clone(), NEW_LOOP_ITERATIONS);
                vec![
                    ProgramBlock::loop_start(label.clone(), NEW_LOOP_ITERATIONS),
                    ProgramBlock::loop_end(label),
                ]
            }
        }
    }

    fn next_loop_number(&self) -> u32 {
        if !self.has_loop_block() {
            return 1;
        }
        let used: HashSet<u32> = self
            .blocks
            .iter()
            .filter_map(|b| match b {
                ProgramBlock::LoopStart { label, .. } => parse_loop_label(label),
                _ => None,
            })
            .collect();
        match self.loop_counter.checked_add(1) {
            Some(n) if !used.contains(&n) => n,
            _ => (1..=u32::MAX).find(|n| !used.contains(n)).unwrap_or(1),
        }
    }

    fn replace_blocks(&mut self, blocks: Vec<ProgramBlock>) {
        self.loop_cache = Arc::new(compute_loop_cache(&blocks));
        self.blocks = Arc::new(blocks);
        self.program_counter = self.program_counter.min(self.blocks.len());
    }
}

/// Returns the highest loop number used by `blocks`.
fn validate_loops(blocks: &[ProgramBlock]) -> Result<u32, ProgramError> {
    let mut open: Vec<&str> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    let mut highest = 0;

    for (index, block) in blocks.iter().enumerate() {
        match block {
            ProgramBlock::Command { .. } => {}
            ProgramBlock::LoopStart { label, .. } => {
                let n = parse_loop_label(label)
                    .ok_or_else(|| ProgramError::InvalidLoopLabel { label: label.clone() })?;
                if seen.contains(&label.as_str()) {
                    return Err(ProgramError::DuplicateLoopLabel { label: label.clone() });
                }
                highest = highest.max(n);
                seen.push(label);
                open.push(label);
            }
            ProgramBlock::LoopEnd { label } => match open.last() {
                Some(&top) if top == label.as_str() => {
                    open.pop();
                }
                Some(&top) if open.contains(&label.as_str()) => {
                    return Err(ProgramError::OverlappingLoops {
                        expected: top.to_string(),
                        found: label.clone(),
                        index,
                    });
                }
                _ => {
                    return Err(ProgramError::UnmatchedLoopEnd { label: label.clone(), index });
                }
            },
        }
    }

    match open.last() {
        Some(label) => Err(ProgramError::UnclosedLoop { label: label.to_string() }),
        None => Ok(highest),
    }
}

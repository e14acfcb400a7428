use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::{BoxFuture, try_join_all};

use crate::program::{ProgramBlock, ProgramSequence};

/// A handler's own failure, reported back through [`InterpreterError::Handler`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
}

impl HandlerError {
    pub fn new(msg: impl Into<String>) -> Self {
        HandlerError { message: msg.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpreterError {
    #[error("unknown command: {command}")]
    UnknownCommand { command: String, index: usize },
    #[error("'{namespace}' handler for '{command}' failed: {source}")]
    Handler {
        command: String,
        namespace: String,
        #[source]
        source: HandlerError,
    },
    #[error("no progress at block {index}: loop has no iteration count")]
    Stalled { index: usize },
}

type Result<T> = std::result::Result<T, InterpreterError>;

/// What a handler is told about the step it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerContext {
    pub command: String,
    pub program_counter: usize,
}

pub type HandlerFuture = BoxFuture<'static, std::result::Result<(), HandlerError>>;

pub type CommandHandler = Arc<dyn Fn(HandlerContext) -> HandlerFuture + Send + Sync>;

/// Called after every completed step with the advanced sequence.
pub type StepObserver = Box<dyn FnMut(&ProgramSequence) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The counter was already past the last block.
    AtEnd,
    /// A block ran (or a loop marker was passed) and the counter moved.
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Stopped,
    Paused,
}

/// Cross-task control of a run. Requests are honoured at the next step
/// boundary; a handler already in flight always finishes.
///
/// A stop requested while no run is active is kept and cancels the next
/// `run` or `resume` before its first step.
#[derive(Debug, Clone)]
pub struct RunHandle {
    running: Arc<AtomicBool>,
    pause_requested: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
}

impl RunHandle {
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.pause_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Steps a [`ProgramSequence`], fanning each command out to every handler
/// registered for it.
pub struct Interpreter {
    commands: HashMap<String, BTreeMap<String, CommandHandler>>,
    sequence: ProgramSequence,
    handle: RunHandle,
    observer: Option<StepObserver>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Interpreter {
            commands: HashMap::new(),
            sequence: ProgramSequence::new(),
            handle: RunHandle {
                running: Arc::new(AtomicBool::new(false)),
                pause_requested: Arc::new(AtomicBool::new(false)),
                stop_requested: Arc::new(AtomicBool::new(false)),
            },
            observer: None,
        }
    }

    /// Register `handler` for `command` under `namespace`. A second
    /// registration for the same pair replaces the first.
    pub fn add_command_handler<F>(&mut self, command: impl Into<String>, namespace: impl Into<String>, handler: F)
    where
        F: Fn(HandlerContext) -> HandlerFuture + Send + Sync + 'static,
    {
        self.commands
            .entry(command.into())
            .or_default()
            .insert(namespace.into(), Arc::new(handler));
    }

    pub fn has_command(&self, command: &str) -> bool {
        self.commands.get(command).is_some_and(|ns| !ns.is_empty())
    }

    pub fn set_step_observer(&mut self, observer: impl FnMut(&ProgramSequence) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn handle(&self) -> RunHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    pub fn sequence(&self) -> &ProgramSequence {
        &self.sequence
    }

    /// Replace the program without running it. The sequence keeps its own
    /// counter.
    pub fn set_sequence(&mut self, sequence: ProgramSequence) {
        self.sequence = sequence;
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Run from the sequence's current counter until the end, an error, or
    /// a stop/pause request.
    pub async fn run(&mut self, sequence: ProgramSequence) -> Result<RunOutcome> {
        self.sequence = sequence;
        self.resume().await
    }

    /// Continue from the current counter. The step that was last executed
    /// is not replayed.
    pub async fn resume(&mut self) -> Result<RunOutcome> {
        self.handle.pause_requested.store(false, Ordering::SeqCst);
        self.handle.running.store(true, Ordering::SeqCst);
        self.continue_run().await
    }

    async fn continue_run(&mut self) -> Result<RunOutcome> {
        loop {
            if self.handle.stop_requested.swap(false, Ordering::SeqCst) {
                self.handle.running.store(false, Ordering::SeqCst);
                tracing::info!(program_counter = self.sequence.program_counter(), "run stopped");
                return Ok(RunOutcome::Stopped);
            }
            if self.handle.pause_requested.swap(false, Ordering::SeqCst) {
                self.handle.running.store(false, Ordering::SeqCst);
                tracing::info!(program_counter = self.sequence.program_counter(), "run paused");
                return Ok(RunOutcome::Paused);
            }
            if self.sequence.is_at_end() {
                self.handle.running.store(false, Ordering::SeqCst);
                tracing::info!(steps = self.sequence.len(), "run completed");
                return Ok(RunOutcome::Completed);
            }
            if let Err(e) = self.step().await {
                self.handle.running.store(false, Ordering::SeqCst);
                tracing::warn!(error = %e, "run halted");
                return Err(e);
            }
            // Control-block steps never await, so give other tasks a turn.
            tokio::task::yield_now().await;
        }
    }

    /// Execute the current block. On failure the counter stays put.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        let index = self.sequence.program_counter();
        let command = match self.sequence.current_step() {
            None => return Ok(StepOutcome::AtEnd),
            Some(ProgramBlock::Command { name }) => name.clone(),
            Some(marker) => {
                tracing::trace!(index, block = %marker, "control block");
                let next = self.sequence.advance_program_counter(false);
                if next.program_counter() == index {
                    return Err(InterpreterError::Stalled { index });
                }
                self.sequence = next;
                self.notify_observer();
                return Ok(StepOutcome::Advanced);
            }
        };

        let handlers = self.look_up_command_handlers(&command);
        if handlers.is_empty() {
            return Err(InterpreterError::UnknownCommand { command, index });
        }

        tracing::debug!(index, %command, handlers = handlers.len(), "dispatch");
        let ctx = HandlerContext { command: command.clone(), program_counter: index };
        let calls = handlers.into_iter().map(|(namespace, handler)| {
            let fut = handler(ctx.clone());
            async move { fut.await.map_err(|source| (namespace, source)) }
        });
        try_join_all(calls)
            .await
            .map_err(|(namespace, source)| InterpreterError::Handler { command, namespace, source })?;

        self.advance();
        Ok(StepOutcome::Advanced)
    }

    fn advance(&mut self) {
        self.sequence = self.sequence.advance_program_counter(false);
        self.notify_observer();
    }

    fn notify_observer(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&self.sequence);
        }
    }

    fn look_up_command_handlers(&self, command: &str) -> Vec<(String, CommandHandler)> {
        self.commands
            .get(command)
            .map(|namespaces| {
                namespaces
                    .iter()
                    .map(|(ns, handler)| (ns.clone(), Arc::clone(handler)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

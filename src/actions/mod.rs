use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::interpreter::{HandlerContext, HandlerError, HandlerFuture, Interpreter};
use crate::movement::CharacterState;

/// Namespace under which the movement handlers register.
pub const MOVEMENT_NAMESPACE: &str = "movement";

/// Every command the standard palette offers, loop aside.
pub const STANDARD_COMMANDS: &[&str] = &[
    "forward1",
    "forward2",
    "forward3",
    "backward1",
    "backward2",
    "backward3",
    "left45",
    "left90",
    "left180",
    "right45",
    "right90",
    "right180",
];

/// A movement command decoded from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Forward(u32),
    Backward(u32),
    /// Eighths of a turn, counter-clockwise.
    TurnLeft(u8),
    /// Eighths of a turn, clockwise.
    TurnRight(u8),
}

impl Action {
    /// `forward<n>`, `backward<n>` with `n >= 1`; `left<deg>`, `right<deg>`
    /// with `deg` a positive multiple of 45 below 360.
    pub fn parse(name: &str) -> Option<Action> {
        if let Some(n) = name.strip_prefix("forward") {
            return distance(n).map(Action::Forward);
        }
        if let Some(n) = name.strip_prefix("backward") {
            return distance(n).map(Action::Backward);
        }
        if let Some(deg) = name.strip_prefix("left") {
            return eighths(deg).map(Action::TurnLeft);
        }
        if let Some(deg) = name.strip_prefix("right") {
            return eighths(deg).map(Action::TurnRight);
        }
        None
    }

    pub fn command_name(&self) -> String {
        match self {
            Action::Forward(n) => format!("forward{n}"),
            Action::Backward(n) => format!("backward{n}"),
            Action::TurnLeft(e) => format!("left{}", *e as u32 * 45),
            Action::TurnRight(e) => format!("right{}", *e as u32 * 45),
        }
    }

    pub fn apply(&self, character: &CharacterState, drawing_enabled: bool) -> CharacterState {
        match *self {
            Action::Forward(n) => character.forward(n, drawing_enabled),
            Action::Backward(n) => character.backward(n, drawing_enabled),
            Action::TurnLeft(e) => character.turn_left(e),
            Action::TurnRight(e) => character.turn_right(e),
        }
    }
}

fn distance(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&n| n >= 1)
}

fn eighths(digits: &str) -> Option<u8> {
    let degrees = distance(digits)?;
    (degrees % 45 == 0 && degrees < 360).then(|| (degrees / 45) as u8)
}

/// The character as shared between the controller and its handlers.
#[derive(Debug, Clone)]
pub struct SharedCharacter(Arc<Mutex<CharacterState>>);

impl SharedCharacter {
    pub fn new(state: CharacterState) -> Self {
        SharedCharacter(Arc::new(Mutex::new(state)))
    }

    pub fn snapshot(&self) -> Result<CharacterState, HandlerError> {
        self.0
            .lock()
            .map(|state| state.clone())
            .map_err(|_| HandlerError::new("character state lock poisoned"))
    }

    pub fn replace(&self, state: CharacterState) -> Result<(), HandlerError> {
        let mut guard = self.0.lock().map_err(|_| HandlerError::new("character state lock poisoned"))?;
        *guard = state;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&CharacterState) -> CharacterState) -> Result<CharacterState, HandlerError> {
        let mut guard = self.0.lock().map_err(|_| HandlerError::new("character state lock poisoned"))?;
        *guard = f(&guard);
        Ok(guard.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovementOptions {
    pub drawing_enabled: bool,
    /// Simulated duration of one movement step.
    pub step_delay: Duration,
}

impl Default for MovementOptions {
    fn default() -> Self {
        MovementOptions { drawing_enabled: true, step_delay: Duration::ZERO }
    }
}

/// Register a [`MOVEMENT_NAMESPACE`] handler for every name in `commands`
/// that decodes to an [`Action`]. Returns the names actually registered.
pub fn register_movement_handlers<'a>(
    interpreter: &mut Interpreter,
    character: &SharedCharacter,
    options: MovementOptions,
    commands: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut registered = Vec::new();
    for name in commands {
        let Some(action) = Action::parse(name) else {
            tracing::warn!(command = name, "not a movement command, skipped");
            continue;
        };
        let character = character.clone();
        interpreter.add_command_handler(name, MOVEMENT_NAMESPACE, move |ctx: HandlerContext| -> HandlerFuture {
            let character = character.clone();
            Box::pin(async move {
                if !options.step_delay.is_zero() {
                    tokio::time::sleep(options.step_delay).await;
                }
                let state = character.update(|c| action.apply(c, options.drawing_enabled))?;
                tracing::debug!(
                    command = %ctx.command,
                    x = state.pose.x,
                    y = state.pose.y,
                    heading = state.pose.heading.eighths(),
                    "moved"
                );
                Ok(())
            })
        });
        registered.push(name.to_string());
    }
    registered
}

/// [`register_movement_handlers`] over [`STANDARD_COMMANDS`].
pub fn register_standard_movement(interpreter: &mut Interpreter, character: &SharedCharacter, options: MovementOptions) {
    register_movement_handlers(interpreter, character, options, STANDARD_COMMANDS.iter().copied());
}

pub mod actions;
pub mod config;
pub mod diagnostic;
pub mod interpreter;
pub mod movement;
pub mod program;
pub mod run_state;

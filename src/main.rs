use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use blockstep::actions::{self, SharedCharacter};
use blockstep::config::{self, SceneConfig, SceneOverrides};
use blockstep::diagnostic::{Diagnostic, ansi::AnsiRenderer, json, registry};
use blockstep::interpreter::{Interpreter, RunOutcome};
use blockstep::movement::{CharacterState, PathSegment, Pose};
use blockstep::run_state::RunningState;

#[derive(Parser, Debug)]
#[command(name = "blockstep", version)]
#[command(about = "Run block programs against a grid character")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log output format (filter with RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a program file and print where the character ended up
    Run(RunArgs),
    /// Print the long explanation for an error code
    Explain {
        /// e.g. BS-R001
        code: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON array of program blocks
    program: PathBuf,

    /// Scene configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<i32>,

    #[arg(long)]
    height: Option<i32>,

    /// Simulated duration of each movement step
    #[arg(long = "delay-ms")]
    delay_ms: Option<u64>,

    /// Move without tracing a path
    #[arg(long)]
    no_draw: bool,

    /// Print the result as text instead of JSON
    #[arg(long)]
    text: bool,

    /// Print diagnostics as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReport {
    state: RunningState,
    program_counter: usize,
    pose: Pose,
    cell: String,
    path: Vec<PathSegment>,
}

impl RunReport {
    fn new(state: RunningState, program_counter: usize, character: &CharacterState) -> Self {
        RunReport {
            state,
            program_counter,
            pose: character.pose,
            cell: format!("{}{}", character.column_label(), character.row_label()),
            path: character.path.clone(),
        }
    }

    fn to_text(&self) -> String {
        let mut out = format!(
            "{}: {} ({}, {}) heading {}°\n",
            self.state,
            self.cell,
            self.pose.x,
            self.pose.y,
            self.pose.heading.degrees()
        );
        out.push_str(&format!("path: {} segment(s)\n", self.path.len()));
        for s in &self.path {
            out.push_str(&format!("  ({}, {}) -> ({}, {})\n", s.x1, s.y1, s.x2, s.y2));
        }
        out
    }
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn report_diagnostic(d: &Diagnostic, as_json: bool) {
    if as_json {
        eprintln!("{}", json::render(d));
    } else {
        let renderer = AnsiRenderer { use_color: std::io::stderr().is_terminal() };
        eprint!("{}", renderer.render(d));
    }
}

async fn run(args: &RunArgs) -> Result<RunReport, Diagnostic> {
    let overrides = SceneOverrides {
        width: args.width,
        height: args.height,
        step_delay_ms: args.delay_ms,
        no_draw: args.no_draw,
    };
    let scene = SceneConfig::resolve(args.config.as_deref(), &overrides).map_err(|e| Diagnostic::from(&e))?;
    let program = config::load_program(&args.program).map_err(|e| Diagnostic::from(&e))?;

    let character = SharedCharacter::new(scene.initial_character());
    let mut interpreter = Interpreter::new();
    actions::register_standard_movement(&mut interpreter, &character, scene.movement_options());

    let handle = interpreter.handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping at next step");
            handle.stop();
        }
    });

    let mut state = RunningState::Stopped.play();
    let outcome = interpreter.run(program.initiate_program_run()).await;
    interrupt.abort();

    state = match outcome {
        Ok(RunOutcome::Completed) => state.finished(),
        Ok(RunOutcome::Stopped) => state.request_stop().step_boundary(),
        Ok(RunOutcome::Paused) => state.request_pause().step_boundary(),
        Err(e) => {
            return Err(Diagnostic::from(&e).with_program(interpreter.sequence().blocks()));
        }
    };

    let end = character.snapshot().map_err(|e| Diagnostic::error(e.to_string()))?;
    Ok(RunReport::new(state, interpreter.sequence().program_counter(), &end))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match cli.command {
        Command::Explain { code } => match registry::lookup(&code.to_ascii_uppercase()) {
            Some(entry) => print!("{}", entry.long),
            None => {
                eprintln!("unknown error code '{code}'");
                std::process::exit(1);
            }
        },
        Command::Run(args) => match run(&args).await {
            Ok(report) if args.text => print!("{}", report.to_text()),
            Ok(report) => match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Serialization error: {e}");
                    std::process::exit(1);
                }
            },
            Err(d) => {
                report_diagnostic(&d, args.json);
                std::process::exit(1);
            }
        },
    }
}

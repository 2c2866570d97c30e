use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use engine::input::keys;
use engine::stepper::{AgentControl, RunOutcome, Tick};
use engine::{ManualClock, SystemClock};
use mazewalk::input_adapter;
use mazewalk::{MazeWorld, Mode, Program, Session, Settings, SettingsStore};
use tracing::warn;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

#[derive(Debug, Parser)]
#[command(name = "mazewalk")]
#[command(about = "Run block programs against generated mazes")]
struct Cli {
    /// Settings file; defaults to MAZEWALK_SETTINGS_PATH or the user config dir.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Step a program through a maze and print every pose.
    Run {
        /// Program JSON; the built-in depth-first search when omitted.
        program: Option<PathBuf>,
        #[arg(long)]
        size: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        interval_ms: Option<u64>,
        #[arg(long, default_value_t = 10_000)]
        max_steps: u64,
    },
    /// Open a window that takes keyboard input and print the maze after every change.
    Play {
        /// Program JSON for the run key; the built-in depth-first search when omitted.
        program: Option<PathBuf>,
        #[arg(long)]
        size: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print a generated maze.
    Maze {
        #[arg(long)]
        size: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the built-in program as JSON.
    Program,
}

fn main() -> Result<()> {
    engine::logging::init("info").context("failed to install log subscriber")?;
    let cli = Cli::parse();
    let store = match cli.settings {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::from_env(),
    };
    let settings = store.load();

    match cli.command {
        Commands::Run {
            program,
            size,
            seed,
            interval_ms,
            max_steps,
        } => {
            let program = load_program(program)?;
            let mut settings = settings;
            settings.maze.size = size.unwrap_or(settings.maze.size);
            settings.maze.seed = seed.unwrap_or(settings.maze.seed);
            if let Some(ms) = interval_ms {
                settings.runner.initial_interval = Duration::from_millis(ms);
            }
            cmd_run(settings, program, max_steps)
        }
        Commands::Play {
            program,
            size,
            seed,
        } => {
            let program = load_program(program)?;
            let mut settings = settings;
            settings.maze.size = size.unwrap_or(settings.maze.size);
            settings.maze.seed = seed.unwrap_or(settings.maze.seed);
            cmd_play(settings, program)
        }
        Commands::Maze { size, seed } => {
            let world = MazeWorld::generate(
                size.unwrap_or(settings.maze.size),
                seed.unwrap_or(settings.maze.seed),
            );
            print!("{world}");
            Ok(())
        }
        Commands::Program => {
            println!("{}", Program::depth_first().to_json_pretty()?);
            Ok(())
        }
    }
}

fn load_program(path: Option<PathBuf>) -> Result<Program> {
    match path {
        Some(path) => {
            Program::load(&path).with_context(|| format!("loading {}", path.display()))
        }
        None => Ok(Program::depth_first()),
    }
}

/// Live session on the wall clock. Keys go through the router while the run
/// ticks; the loop sleeps until the next step is due.
fn cmd_play(settings: Settings, program: Program) -> Result<()> {
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("mazewalk")
        .with_inner_size(LogicalSize::new(360.0, 120.0))
        .build(&event_loop)
        .context("failed to open window")?;

    let session = Session::new(&settings, Rc::new(SystemClock));
    session.set_program(program);
    let mut dirty = true;

    event_loop.run(move |event, _, control_flow| {
        let _window = &window;
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::KeyboardInput { input, .. } => {
                    let Some(key) = input_adapter::key_event(&input) else {
                        return;
                    };
                    let exploring = session.mode() == Mode::Exploring;
                    let consumed = session.key_event(&key.code, key.released);
                    let quit = exploring && !consumed && !key.released && key.is(keys::ESCAPE);
                    if quit {
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                    dirty = true;
                }
                _ => {}
            },
            Event::MainEventsCleared => {
                match session.tick() {
                    Ok(Some(Tick::Stepped | Tick::Finished)) => dirty = true,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "program stopped");
                        dirty = true;
                    }
                }
                if dirty {
                    render(&session);
                    dirty = false;
                }
                *control_flow = match session.next_deadline() {
                    Some(due) => ControlFlow::WaitUntil(due),
                    None => ControlFlow::Wait,
                };
            }
            _ => {}
        }
    })
}

fn render(session: &Session) {
    print!("\x1b[2J\x1b[H{}", *session.world());
    match session.mode() {
        Mode::Exploring => {
            println!("arrows move, v/b/x mark, l peek, h home, c coder, r run, n new maze, esc quit")
        }
        Mode::Coding => println!("coder open: c closes, r runs"),
        Mode::Running => println!("running: p pause, r resume, = faster, - slower, esc cancel"),
        Mode::Menu => {
            let menu = session.menu().borrow();
            let selected = menu.selected().map(|item| item.id.as_str());
            for item in menu.items() {
                let cursor = if Some(item.id.as_str()) == selected { '>' } else { ' ' };
                println!("{cursor} {}", item.label);
            }
            println!("up/down choose, enter accept, esc back");
        }
    }
    if let Some(report) = session.coder().borrow().last_report() {
        println!("last run: {:?} after {} steps", report.outcome, report.steps);
    }
}

/// Drives a session on a manual clock, jumping straight to each deadline.
fn cmd_run(settings: Settings, program: Program, max_steps: u64) -> Result<()> {
    let clock = ManualClock::new();
    let session = Session::new(&settings, Rc::new(clock.clone()));
    println!("program {:?}", program.name);
    session.set_program(program);
    session.key_event(keys::KEY_R, false);

    let mut steps = 0;
    while session.mode() == Mode::Running {
        if steps >= max_steps {
            println!("step limit {max_steps} reached, cancelling");
            session.key_event(keys::ESCAPE, false);
            break;
        }
        let Some(due) = session.next_deadline() else {
            break;
        };
        clock.set(due);
        session.tick().context("program failed")?;
        steps += 1;

        let pose = session.world().current_position();
        println!("{steps:>5} ({}, {}) {:?}", pose.row, pose.col, pose.facing);
    }

    let report = session
        .coder()
        .borrow()
        .last_report()
        .context("run did not report")?;
    print!("{}", *session.world());
    match report.outcome {
        RunOutcome::ReachedGoal => println!("reached the exit in {} steps", report.steps),
        RunOutcome::Cancelled => println!("cancelled after {} steps", report.steps),
        RunOutcome::Failed => println!("failed after {} steps", report.steps),
    }
    Ok(())
}

use agent_core::action::{ActionRegistry, PrimitiveAction};
use agent_core::bootstrap::{build_agent_world, build_default_schedule, WorldOptions};
use agent_core::command::{CommandSink, InMemoryCommandSink};
use agent_core::config::AgentConfig;
use agent_core::geometry::Pos;
use agent_core::player::{assign_task, PlayerId, PlayerRuntimes, PlayerState};
use agent_core::scheduler::{Task, TaskId};
use agent_core::telemetry::WorldModel;
use anyhow::{Context, Result};
use bevy_ecs::prelude::*;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead};
use std::rc::Rc;

/// One-shot non-send resource carrying the task a demo wants to hand a
/// player before the regular schedule starts running it.
struct PendingAssignment(u64, Rc<Task>);

fn apply_pending_assignment(
    assignment: NonSend<PendingAssignment>,
    mut runtimes: NonSendMut<PlayerRuntimes>,
    mut sink: NonSendMut<Box<dyn CommandSink>>,
    mut registry: NonSendMut<ActionRegistry>,
) {
    assign_task(&mut runtimes, &mut **sink, &mut registry, assignment.0, assignment.1.clone());
}

#[derive(Subcommand, Debug, Clone)]
enum Demo {
    /// Interactive menu
    Menu,
    /// Replay a telemetry log and print the resulting world-model summary
    Ingest,
    /// Run a single player through a hand-built task and print its state machine
    Task,
    /// Print the default recipe/item/entity-prototype catalogue sizes
    Catalogue,
    /// Print the effective config, optionally loaded from a RON file
    Config,
}

#[derive(Parser, Debug)]
#[command(name = "agent-cli", version, about = "Headless demo shell for the factory-game automation agent")]
struct Args {
    /// Telemetry log to replay (one packet per line). Defaults to stdin.
    #[arg(long)]
    telemetry: Option<String>,
    /// Player id to drive in the `task` demo.
    #[arg(long, default_value_t = 1)]
    player_id: u64,
    /// Ticks to run in the `task` demo.
    #[arg(long, default_value_t = 10)]
    steps: u32,
    /// RON config file to load instead of the built-in defaults.
    #[arg(long)]
    config: Option<String>,

    #[command(subcommand)]
    demo: Option<Demo>,
}

fn load_config(args: &Args) -> Result<AgentConfig> {
    match &args.config {
        Some(path) => AgentConfig::load_from_file(path).with_context(|| format!("loading config {path:?}")),
        None => Ok(AgentConfig::default()),
    }
}

fn run_demo_ingest(args: &Args) -> Result<()> {
    let mut model = WorldModel::with_default_catalogues()?;
    let lines: Vec<String> = match &args.telemetry {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?.lines().map(str::to_owned).collect(),
        None => io::stdin().lock().lines().collect::<io::Result<_>>()?,
    };
    let mut applied = 0usize;
    for line in &lines {
        if line.trim().is_empty() {
            continue;
        }
        model.apply_line(line)?;
        applied += 1;
    }
    println!("applied {applied} telemetry lines, world at tick {}", model.tick);
    println!("players: {}", model.players.len());
    println!("entities: {}", model.entities.len());
    println!("recipes: {}", model.recipes.recipe_ids().count());
    Ok(())
}

fn run_demo_catalogue() -> Result<()> {
    let model = WorldModel::with_default_catalogues()?;
    println!("recipes: {}", model.recipes.recipe_ids().count());
    println!("item prototypes: {}", model.item_prototypes.len());
    println!("entity prototypes: {}", model.entity_prototypes.len());
    Ok(())
}

fn run_demo_config(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    println!("{}", config.to_ron_string()?);
    Ok(())
}

fn run_demo_task(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let mut world = build_agent_world(Box::new(InMemoryCommandSink::new()), WorldOptions::from_config(&config, vec![args.player_id]))?;

    {
        let mut model = world.get_non_send_resource_mut::<WorldModel>().unwrap();
        model.players.insert(args.player_id, agent_core::telemetry::Player { id: args.player_id, position: Pos::new(0, 0), connected: true });
        model.inventories.insert(args.player_id, Default::default());
    }

    let task = Rc::new(Task::new(TaskId::new(), "walk-to-origin", 0));
    *task.actions.borrow_mut() = agent_core::action::CompoundAction::new(vec![PrimitiveAction::walk_waypoints(vec![Pos::new(1, 0)])]);
    world.insert_non_send_resource(PendingAssignment(args.player_id, task));

    let mut assign_once = Schedule::default();
    assign_once.add_systems(apply_pending_assignment);
    assign_once.run(&mut world);

    let mut schedule = build_default_schedule();
    for tick in 0..args.steps {
        schedule.run(&mut world);
        let mut q = world.query::<(&PlayerId, &PlayerState)>();
        for (id, state) in q.iter(&world) {
            println!("tick {tick}: player {} state = {state:?}", id.0);
        }
    }
    Ok(())
}

fn interactive_pick() -> Demo {
    println!("Factory Agent CLI - Demo Menu");
    println!("1) Ingest a telemetry log");
    println!("2) Drive a player through a task");
    println!("3) Show the embedded catalogue sizes");
    println!("4) Show effective config");
    print!("Select [1-4]: ");
    let _ = io::Write::flush(&mut io::stdout());

    let mut buf = String::new();
    if io::stdin().read_line(&mut buf).is_ok() {
        match buf.trim() {
            "1" => Demo::Ingest,
            "2" => Demo::Task,
            "3" => Demo::Catalogue,
            "4" => Demo::Config,
            _ => Demo::Catalogue,
        }
    } else {
        Demo::Catalogue
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let chosen = match args.demo.clone().unwrap_or(Demo::Menu) {
        Demo::Menu => interactive_pick(),
        other => other,
    };

    match chosen {
        Demo::Ingest => run_demo_ingest(&args),
        Demo::Task => run_demo_task(&args),
        Demo::Catalogue => run_demo_catalogue(),
        Demo::Config => run_demo_config(&args),
        Demo::Menu => Ok(()),
    }
}

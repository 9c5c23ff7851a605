#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Chrono-Weave loops and shows the local leaderboard.

mod board;
mod config;
mod layout_transfer;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use chrono_weave_core::{
    CellCoord, Command, ConduitKind, Event, LeaderboardSource, Phase, PlayerId,
};
use chrono_weave_ledger::{FileStore, LocalScoreBoard};
use chrono_weave_system_builder::{Builder, BuilderInput};
use chrono_weave_system_pacing::{Config as PacingConfig, Pacing};
use chrono_weave_system_scoring::{player_rank, Scoring, DEFAULT_LEADERBOARD_LIMIT};
use chrono_weave_world::{self as world, query, World};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::layout_transfer::ConduitLayout;

const DEFAULT_STORE_DIR: &str = ".chrono-weave";

/// Chrono-Weave: route temporal energy from sources to targets.
#[derive(Debug, Parser)]
#[command(name = "chrono-weave", version, about)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Place conduits, run simulation passes and optionally submit the score.
    Play(PlayArgs),
    /// Print the local leaderboard.
    Leaderboard(LeaderboardArgs),
}

#[derive(Debug, Args)]
struct PlayArgs {
    /// Versioned TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Conduit placement as `column,row[:kind]`; may be repeated.
    #[arg(long = "place", value_parser = parse_placement)]
    placements: Vec<Placement>,
    /// Layout string produced by a previous session.
    #[arg(long)]
    layout: Option<String>,
    /// Number of loops to play; the layout carries over between loops.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    loops: u32,
    /// Simulated time per tick while a pass is pending, in milliseconds.
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,
    /// Identifier recorded with submitted scores.
    #[arg(long, default_value = "local-player")]
    player: String,
    /// Directory holding the local score ledger.
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    store: PathBuf,
    /// Submit every completed loop to the local ledger.
    #[arg(long)]
    submit: bool,
}

#[derive(Debug, Args)]
struct LeaderboardArgs {
    /// Directory holding the local score ledger.
    #[arg(long, default_value = DEFAULT_STORE_DIR)]
    store: PathBuf,
    /// Maximum number of entries to print.
    #[arg(long, default_value_t = DEFAULT_LEADERBOARD_LIMIT)]
    limit: usize,
    /// Player whose rank should be highlighted.
    #[arg(long)]
    player: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Placement {
    cell: CellCoord,
    kind: ConduitKind,
}

/// Entry point for the Chrono-Weave command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        CliCommand::Play(args) => play(args),
        CliCommand::Leaderboard(args) => leaderboard(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn play(args: PlayArgs) -> Result<()> {
    let app = config::load(args.config.as_deref())?;
    let mut world =
        World::with_config(app.grid.clone()).context("grid configuration was rejected")?;
    println!("{}", query::welcome_banner(&world));

    let placements = collect_placements(&args, query::grid(&world).size())?;
    let mut session = Session::new(PacingConfig::new(app.delay), Duration::from_millis(args.tick_ms));
    let mut scoreboard = if args.submit {
        let store = FileStore::open(&args.store)
            .with_context(|| format!("failed to open ledger at {}", args.store.display()))?;
        Some(LocalScoreBoard::new(store))
    } else {
        None
    };
    let player = PlayerId::new(args.player);

    for loop_index in 0..args.loops {
        if loop_index == 0 {
            session.place_all(&mut world, &placements)?;
        } else {
            session.dispatch(&mut world, vec![Command::AdvanceLoop])?;
        }
        session.simulate(&mut world)?;

        if let Some(report) = query::last_report(&world) {
            print!("{}", board::render_report(report));
        }
        if let Some(scoreboard) = scoreboard.as_mut() {
            match session.scoring.submit(player.clone(), scoreboard) {
                Ok(receipt) => println!("submitted as {}", receipt.receipt_id),
                Err(error) => warn!(%error, "score was not submitted"),
            }
        }
    }

    println!();
    print!("{}", board::render_grid(query::grid(&world)));
    println!(
        "budget left: {} | loop {}",
        query::budget(&world),
        query::loop_number(&world)
    );
    print!("{}", board::render_echoes(query::echoes(&world)));
    let layout = ConduitLayout::capture(query::grid(&world))
        .encode()
        .context("failed to encode the current layout")?;
    println!("layout: {layout}");
    Ok(())
}

fn leaderboard(args: LeaderboardArgs) -> Result<()> {
    let store = FileStore::open(&args.store)
        .with_context(|| format!("failed to open ledger at {}", args.store.display()))?;
    let scoreboard = LocalScoreBoard::new(store);
    let entries = scoreboard
        .leaderboard(args.limit)
        .context("failed to read the leaderboard")?;

    if entries.is_empty() {
        println!("no scores recorded yet");
    }
    for entry in &entries {
        println!(
            "{:>3}. {:<16} {:>8} {:>8.1}% loop {}",
            entry.rank, entry.display_name, entry.score, entry.efficiency, entry.loop_count
        );
    }

    if let Some(player) = args.player.map(PlayerId::new) {
        match player_rank(&entries, &player) {
            Some(rank) => println!("{player} is ranked #{rank}"),
            None => println!("{player} is not on the leaderboard"),
        }
    }
    Ok(())
}

fn collect_placements(args: &PlayArgs, grid_size: u32) -> Result<Vec<Placement>> {
    let mut placements = Vec::new();
    if let Some(encoded) = &args.layout {
        let layout = ConduitLayout::decode(encoded).context("failed to decode layout string")?;
        if layout.size != grid_size {
            bail!(
                "layout was captured on a {0}x{0} grid but the current grid is {1}x{1}",
                layout.size,
                grid_size
            );
        }
        for command in layout.commands() {
            if let Command::PlaceConduit { cell, kind } = command {
                placements.push(Placement { cell, kind });
            }
        }
    }
    placements.extend(args.placements.iter().copied());
    Ok(placements)
}

/// Systems driven by the adapter around a single world.
struct Session {
    builder: Builder,
    pacing: Pacing,
    scoring: Scoring,
    tick: Duration,
}

impl Session {
    fn new(pacing: PacingConfig, tick: Duration) -> Self {
        Self {
            builder: Builder::new(),
            pacing: Pacing::new(pacing),
            scoring: Scoring::new(),
            tick,
        }
    }

    fn place_all(&mut self, world: &mut World, placements: &[Placement]) -> Result<()> {
        for placement in placements {
            let mut commands = Vec::new();
            let input = BuilderInput {
                select_kind: Some(placement.kind),
                ..BuilderInput::place(placement.cell)
            };
            self.builder.handle(
                &[],
                input,
                |cell| query::cell(world, cell).is_some_and(|state| state.conduit().is_some()),
                &mut commands,
            );
            self.dispatch(world, commands)?;
        }
        Ok(())
    }

    fn simulate(&mut self, world: &mut World) -> Result<()> {
        self.dispatch(world, vec![Command::BeginSimulation])?;
        while query::phase(world) == Phase::Simulating {
            self.dispatch(world, vec![Command::Tick { dt: self.tick }])?;
        }
        Ok(())
    }

    /// Applies `commands` and every follow-up command the systems emit in response.
    fn dispatch(&mut self, world: &mut World, commands: Vec<Command>) -> Result<()> {
        let mut pending = commands;
        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(world, command, &mut events)?;
            }
            log_placement_outcomes(&events);
            self.builder
                .handle(&events, BuilderInput::default(), |_| false, &mut pending);
            self.scoring.handle(&events);
            self.pacing.handle(&events, &mut pending);
        }
        Ok(())
    }
}

fn log_placement_outcomes(events: &[Event]) {
    for event in events {
        match event {
            Event::ConduitPlaced { cell, kind, budget, .. } => {
                info!(%cell, kind = kind.label(), budget = *budget, "conduit placed");
            }
            Event::ConduitPlacementRejected { cell, kind, reason } => {
                warn!(%cell, kind = kind.label(), ?reason, "conduit placement rejected");
            }
            Event::ConduitRemovalRejected { cell, reason } => {
                warn!(%cell, ?reason, "conduit removal rejected");
            }
            _ => {}
        }
    }
}

fn parse_placement(value: &str) -> Result<Placement, String> {
    let (position, kind) = match value.split_once(':') {
        Some((position, label)) => {
            let kind = ConduitKind::from_label(label)
                .ok_or_else(|| format!("unknown conduit kind `{label}`"))?;
            (position, kind)
        }
        None => (value, ConduitKind::Basic),
    };
    let (column, row) = position
        .split_once(',')
        .ok_or_else(|| format!("expected `column,row`, got `{position}`"))?;
    let column = column
        .trim()
        .parse::<u32>()
        .map_err(|error| format!("invalid column `{column}`: {error}"))?;
    let row = row
        .trim()
        .parse::<u32>()
        .map_err(|error| format!("invalid row `{row}`: {error}"))?;
    Ok(Placement {
        cell: CellCoord::new(column, row),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_defaults_to_basic() {
        assert_eq!(
            parse_placement("3,1"),
            Ok(Placement {
                cell: CellCoord::new(3, 1),
                kind: ConduitKind::Basic,
            })
        );
    }

    #[test]
    fn placement_accepts_kind_suffix() {
        assert_eq!(
            parse_placement(" 4 , 5 :Temporal"),
            Ok(Placement {
                cell: CellCoord::new(4, 5),
                kind: ConduitKind::Temporal,
            })
        );
    }

    #[test]
    fn placement_rejects_garbage() {
        assert!(parse_placement("3").is_err());
        assert!(parse_placement("a,1").is_err());
        assert!(parse_placement("1,1:lava").is_err());
    }

    #[test]
    fn session_plays_a_paced_loop() {
        let mut world = World::new();
        let mut session = Session::new(
            PacingConfig::new(Duration::from_millis(300)),
            Duration::from_millis(100),
        );

        session
            .place_all(
                &mut world,
                &[Placement {
                    cell: CellCoord::new(3, 1),
                    kind: ConduitKind::Quantum,
                }],
            )
            .expect("placement dispatches");
        session.simulate(&mut world).expect("pass completes");

        assert_eq!(query::phase(&world), Phase::Completed);
        assert_eq!(query::budget(&world), 75);
        assert!(session.scoring.can_submit());
        assert_eq!(
            session.scoring.latest().map(|report| report.loop_number),
            Some(1)
        );
    }

    #[test]
    fn session_keeps_layout_across_loops() {
        let mut world = World::new();
        let mut session = Session::new(PacingConfig::new(Duration::ZERO), Duration::from_millis(1));
        let cell = CellCoord::new(2, 3);
        session
            .place_all(
                &mut world,
                &[Placement {
                    cell,
                    kind: ConduitKind::Basic,
                }],
            )
            .expect("placement dispatches");

        for loop_index in 0..2 {
            if loop_index > 0 {
                session
                    .dispatch(&mut world, vec![Command::AdvanceLoop])
                    .expect("completed phase");
            }
            session.simulate(&mut world).expect("pass completes");
        }

        assert_eq!(query::echoes(&world).len(), 2);
        assert_eq!(query::budget(&world), 90);
        let state = query::cell(&world, cell).expect("in bounds");
        assert!(state.conduit().is_some());
        assert!((state.temporal_residue - 0.2).abs() < 1e-9);
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use turnengine_control::{GalaxyGenerator, PersistenceAdapter};
use turnengine_core::{tick, BattleEngineKind, GameState};
use turnengine_world::{create_run_dir, generate_run_id, load_content, write_run_info, FilePersistenceAdapter, SeededGalaxyGenerator};

#[derive(Clone, Copy, ValueEnum)]
enum BattleEngineArg {
    Standard,
    Alternative,
}

impl From<BattleEngineArg> for BattleEngineKind {
    fn from(arg: BattleEngineArg) -> Self {
        match arg {
            BattleEngineArg::Standard => BattleEngineKind::Standard,
            BattleEngineArg::Alternative => BattleEngineKind::Alternative,
        }
    }
}

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "turnengine_cli", about = "Turn-based space strategy engine CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation for a fixed number of turns.
    Run {
        #[arg(long)]
        turns: u32,
        /// Generate a galaxy procedurally with this seed. Mutually exclusive with --game.
        #[arg(long, conflicts_with = "game_id")]
        seed: Option<u64>,
        /// Resume a saved game by id. Mutually exclusive with --seed.
        #[arg(long = "game", conflicts_with = "seed")]
        game_id: Option<String>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value_t = 2)]
        player_count: u8,
        #[arg(long, default_value_t = 100)]
        universe_size: u32,
        #[arg(long, default_value = "./saves")]
        saves_dir: String,
        #[arg(long, default_value_t = 1)]
        print_every: u32,
        /// Disable writing a runs/ directory with run metadata.
        #[arg(long)]
        no_run_dir: bool,
        /// Battle engine used for a freshly generated galaxy. Ignored when resuming --game.
        #[arg(long, value_enum, default_value_t = BattleEngineArg::Standard)]
        battle_engine: BattleEngineArg,
        /// Overrides the content's per-turn wall-clock budget (§5 cancellation/timeout).
        #[arg(long)]
        turn_budget_ms: Option<u64>,
    },
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn run(
    turns: u32,
    seed: Option<u64>,
    game_id: Option<String>,
    content_dir: &str,
    player_count: u8,
    universe_size: u32,
    saves_dir: &str,
    print_every: u32,
    no_run_dir: bool,
    battle_engine: BattleEngineArg,
    turn_budget_ms: Option<u64>,
) -> Result<()> {
    let mut content = load_content(content_dir)?;
    if let Some(budget) = turn_budget_ms {
        content.constants.turn_budget_ms = budget;
    }
    let persistence = FilePersistenceAdapter::new(saves_dir);

    let (game_id, mut state) = if let Some(game_id) = game_id {
        let loaded = persistence
            .load(&game_id)?
            .with_context(|| format!("no saved game named '{game_id}'"))?;
        (game_id, loaded)
    } else {
        let resolved_seed = seed.unwrap_or_else(rand::random);
        let generator = SeededGalaxyGenerator::new(content.clone());
        let mut state = generator.generate(player_count, universe_size, resolved_seed)?;
        state.meta.engine_flag = battle_engine.into();
        (format!("game_{resolved_seed}"), state)
    };
    let mut rng = ChaCha8Rng::seed_from_u64(state.meta.seed);

    if !no_run_dir {
        let run_id = generate_run_id(state.meta.seed);
        let run_dir = create_run_dir(&run_id)?;
        write_run_info(&run_dir, &run_id, state.meta.seed, &game_id, serde_json::json!({ "turns": turns }))?;
        println!("Run directory: {}", run_dir.display());
    }

    println!(
        "Starting simulation: game={game_id} turns={turns} seed={} empires={}",
        state.meta.seed,
        state.empires.len(),
    );
    println!("{}", "-".repeat(80));

    for _ in 0..turns {
        let pending: Vec<(u8, Vec<turnengine_core::commands::Command>)> =
            persistence.drain_commands(&game_id, state.meta.turn_year)?;
        for (empire_id, commands) in pending {
            if let Some(empire) = state.empires.get_mut(&empire_id) {
                empire.command_stack.extend(commands);
            }
        }

        // §5/§7 class 2: a turn that violates an invariant (including the
        // wall-clock budget) is rolled back to the pre-turn snapshot rather
        // than left half-applied.
        let pre_turn = state.clone();
        let messages = match tick(&mut state, &content, &mut rng) {
            Ok((messages, _events)) => messages,
            Err(err) => {
                tracing::error!(turn_year = pre_turn.meta.turn_year, %err, "turn aborted, restoring prior snapshot");
                state = pre_turn;
                continue;
            }
        };
        for message in &messages {
            println!("[{}] empire {}: {}", state.meta.turn_year, message.empire, message.text);
        }

        if state.meta.turn_year.is_multiple_of(print_every.max(1)) {
            print_status(&state);
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at year {}:", state.meta.turn_year);
    print_status(&state);
    persistence.save(&game_id, &state)?;
    println!("Saved as '{game_id}' in {saves_dir}");

    Ok(())
}

fn print_status(state: &GameState) {
    let total_colonists: i64 = state.stars.values().map(|s| s.colonists).sum();
    let total_fleets = state.fleets.len();
    println!(
        "[year={year}]  empires={empires}  stars={stars}  fleets={total_fleets}  colonists={total_colonists}",
        year = state.meta.turn_year,
        empires = state.empires.len(),
        stars = state.stars.len(),
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            turns,
            seed,
            game_id,
            content_dir,
            player_count,
            universe_size,
            saves_dir,
            print_every,
            no_run_dir,
            battle_engine,
            turn_budget_ms,
        } => {
            run(
                turns,
                seed,
                game_id,
                &content_dir,
                player_count,
                universe_size,
                &saves_dir,
                print_every,
                no_run_dir,
                battle_engine,
                turn_budget_ms,
            )?;
        }
    }
    Ok(())
}

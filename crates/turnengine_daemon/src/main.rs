mod routes;
mod state;
mod tick_loop;

use routes::make_router_with_cors;
use turnengine_world::{create_run_dir, generate_run_id, load_content, write_run_info, FilePersistenceAdapter, SeededGalaxyGenerator};
use state::{AppState, SimState};
use tick_loop::run_tick_loop;

use anyhow::{Context, Result};

use clap::{Parser, Subcommand, ValueEnum};
use turnengine_control::{GalaxyGenerator, PersistenceAdapter};
use turnengine_core::{BattleEngineKind, EventEnvelope};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use tokio::sync::broadcast;

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

#[derive(Parser)]
#[command(name = "turnengine_daemon", about = "Turn-based space strategy engine daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        /// Generate a galaxy procedurally with this seed. Mutually exclusive with --game.
        #[arg(long, conflicts_with = "game_id")]
        seed: Option<u64>,
        /// Resume a saved game by id. Mutually exclusive with --seed.
        #[arg(long = "game", conflicts_with = "seed")]
        game_id: Option<String>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long, default_value = "./saves")]
        saves_dir: String,
        #[arg(long, default_value_t = 2)]
        player_count: u8,
        #[arg(long, default_value_t = 100)]
        universe_size: u32,
        #[arg(long, default_value_t = 3001)]
        port: u16,
        /// Turns per second. 0 = as fast as possible.
        #[arg(long, default_value_t = 1.0)]
        ticks_per_sec: f64,
        #[arg(long)]
        max_turns: Option<u32>,
        #[arg(long, default_value = "http://localhost:5173")]
        cors_origin: String,
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

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            seed,
            game_id,
            content_dir,
            saves_dir,
            player_count,
            universe_size,
            port,
            ticks_per_sec,
            max_turns,
            cors_origin,
            no_run_dir,
            battle_engine,
            turn_budget_ms,
        } => {
            let mut content = load_content(&content_dir)?;
            if let Some(budget) = turn_budget_ms {
                content.constants.turn_budget_ms = budget;
            }
            let persistence = FilePersistenceAdapter::new(&saves_dir);

            let (game_id, game_state) = if let Some(game_id) = game_id {
                let loaded = persistence.load(&game_id)?.with_context(|| format!("no saved game named '{game_id}'"))?;
                (game_id, loaded)
            } else {
                let resolved_seed = seed.unwrap_or_else(rand::random);
                let generator = SeededGalaxyGenerator::new(content.clone());
                let mut state = generator.generate(player_count, universe_size, resolved_seed)?;
                state.meta.engine_flag = battle_engine.into();
                (format!("game_{resolved_seed}"), state)
            };
            let rng = {
                use rand::SeedableRng;
                rand_chacha::ChaCha8Rng::seed_from_u64(game_state.meta.seed)
            };

            let run_dir = if no_run_dir {
                None
            } else {
                let run_id = generate_run_id(game_state.meta.seed);
                let run_dir = create_run_dir(&run_id)?;
                write_run_info(
                    &run_dir,
                    &run_id,
                    game_state.meta.seed,
                    &game_id,
                    serde_json::json!({"runner": "turnengine_daemon", "max_turns": max_turns}),
                )?;
                println!("Run directory: {}", run_dir.display());
                Some(run_dir)
            };

            let (event_tx, _) = broadcast::channel::<Vec<EventEnvelope>>(256);
            let command_queue = Arc::new(Mutex::new(Vec::new()));
            let app_state = AppState {
                sim: Arc::new(parking_lot::Mutex::new(SimState { game_id, game_state, content, rng, persistence })),
                command_queue: command_queue.clone(),
                event_tx: event_tx.clone(),
                ticks_per_sec,
                run_dir,
                paused: Arc::new(AtomicBool::new(false)),
            };
            let router = make_router_with_cors(app_state.clone(), &cors_origin);
            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
            let speed = if ticks_per_sec == 0.0 { "max".to_string() } else { format!("{ticks_per_sec} turns/sec") };
            println!("turnengine_daemon listening on http://localhost:{port}  speed={speed}");
            tokio::spawn(run_tick_loop(
                app_state.sim,
                command_queue,
                event_tx,
                Arc::new(AtomicU64::new(ticks_per_sec.to_bits())),
                max_turns,
                app_state.paused,
            ));
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use http_body_util::BodyExt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use routes::make_router;
    use turnengine_core::test_fixtures::base_content;
    use tower::ServiceExt;

    fn make_test_state() -> AppState {
        let content = base_content();
        let generator = SeededGalaxyGenerator::new(content.clone());
        let game_state = generator.generate(1, 50, 0).unwrap();
        let rng = ChaCha8Rng::seed_from_u64(0);
        let tmp = tempfile::tempdir().unwrap();
        let (event_tx, _) = broadcast::channel(64);
        AppState {
            sim: Arc::new(parking_lot::Mutex::new(SimState {
                game_id: "test-game".to_string(),
                game_state,
                content,
                rng,
                persistence: FilePersistenceAdapter::new(tmp.path()),
            })),
            command_queue: Arc::new(Mutex::new(Vec::new())),
            event_tx,
            ticks_per_sec: 1.0,
            run_dir: None,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    #[tokio::test]
    async fn test_meta_returns_200() {
        let app = make_router(make_test_state());
        let response = app.oneshot(Request::builder().uri("/api/v1/meta").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_meta_contains_turn_year() {
        let app = make_router(make_test_state());
        let response = app.oneshot(Request::builder().uri("/api/v1/meta").body(Body::empty()).unwrap()).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["turn_year"], turnengine_core::STARTING_YEAR);
    }

    #[tokio::test]
    async fn test_snapshot_is_valid_json() {
        let app = make_router(make_test_state());
        let response = app.oneshot(Request::builder().uri("/api/v1/snapshot").body(Body::empty()).unwrap()).await.unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let result: Result<serde_json::Value, _> = serde_json::from_slice(&body);
        assert!(result.is_ok(), "snapshot was not valid JSON: {:?}", body);
    }

    #[tokio::test]
    async fn test_save_returns_200() {
        let app = make_router(make_test_state());
        let response = app.oneshot(Request::builder().method("POST").uri("/api/v1/save").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_submit_command_returns_202() {
        let app = make_router(make_test_state());
        let body = serde_json::json!({"empire": 1, "commands": []}).to_string();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/commands")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}

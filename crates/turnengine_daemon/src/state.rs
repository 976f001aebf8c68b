use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use turnengine_core::{EventEnvelope, GameContent, GameState};
use turnengine_world::FilePersistenceAdapter;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct SimState {
    pub game_id: String,
    pub game_state: GameState,
    pub content: GameContent,
    pub rng: ChaCha8Rng,
    pub persistence: FilePersistenceAdapter,
}

pub type SharedSim = Arc<Mutex<SimState>>;
pub type EventTx = broadcast::Sender<Vec<EventEnvelope>>;
pub type CommandQueue = Arc<Mutex<Vec<(u8, Vec<turnengine_core::commands::Command>)>>>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub command_queue: CommandQueue,
    pub event_tx: EventTx,
    pub ticks_per_sec: f64,
    pub run_dir: Option<PathBuf>,
    pub paused: Arc<AtomicBool>,
}

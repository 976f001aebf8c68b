use crate::state::{CommandQueue, EventTx, SharedSim};
use turnengine_control::PersistenceAdapter;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often the tick loop yields to the tokio runtime when running flat-out.
/// Lower = more responsive HTTP/SSE but more overhead. 1ms is a good balance.
const YIELD_INTERVAL: Duration = Duration::from_millis(1);

/// How often to log throughput stats.
const PERF_LOG_INTERVAL: Duration = Duration::from_secs(5);

pub async fn run_tick_loop(
    sim: SharedSim,
    command_queue: CommandQueue,
    event_tx: EventTx,
    ticks_per_sec: Arc<AtomicU64>,
    max_turns: Option<u32>,
    paused: Arc<AtomicBool>,
) {
    let mut next_tick_at: Option<Instant> = None;
    let mut last_yield_at = Instant::now();
    let mut perf_window_start = Instant::now();
    let mut perf_window_ticks: u64 = 0;

    loop {
        while paused.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(50)).await;
            next_tick_at = None;
            last_yield_at = Instant::now();
            perf_window_start = Instant::now();
            perf_window_ticks = 0;
        }

        // --- Pacing ---
        let rate = f64::from_bits(ticks_per_sec.load(Ordering::Relaxed));
        if rate > 0.0 {
            let now = Instant::now();
            let target = next_tick_at.unwrap_or(now);
            if now < target {
                tokio::time::sleep(target - now).await;
                last_yield_at = Instant::now();
            } else if now.duration_since(last_yield_at) >= YIELD_INTERVAL {
                tokio::task::yield_now().await;
                last_yield_at = Instant::now();
            }
            next_tick_at = Some(
                next_tick_at
                    .unwrap_or(now)
                    .checked_add(Duration::from_secs_f64(1.0 / rate))
                    .unwrap_or(now),
            );
        } else {
            let now = Instant::now();
            if now.duration_since(last_yield_at) >= YIELD_INTERVAL {
                tokio::task::yield_now().await;
                last_yield_at = Instant::now();
            }
            next_tick_at = None;
        }

        // --- Execute one turn ---
        let (events, done) = {
            let mut guard = sim.lock();
            let turn_year = guard.game_state.meta.turn_year;
            let game_id = guard.game_id.clone();

            let mut pending: Vec<(u8, Vec<turnengine_core::commands::Command>)> =
                command_queue.lock().drain(..).collect();
            match guard.persistence.drain_commands(&game_id, turn_year) {
                Ok(persisted) => pending.extend(persisted),
                Err(err) => tracing::warn!("drain_commands failed: {err}"),
            }
            for (empire_id, commands) in pending {
                if let Some(empire) = guard.game_state.empires.get_mut(&empire_id) {
                    empire.command_stack.extend(commands);
                }
            }

            let crate::state::SimState { game_state, content, rng, .. } = &mut *guard;
            // §5/§7 class 2: roll back to the pre-turn snapshot on invariant
            // or budget violations instead of leaving a half-applied turn.
            let pre_turn = game_state.clone();
            let events = match turnengine_core::tick(game_state, content, rng) {
                Ok((_messages, events)) => events,
                Err(err) => {
                    tracing::error!("tick failed, restoring prior snapshot: {err}");
                    *game_state = pre_turn;
                    Vec::new()
                }
            };
            let done = max_turns.is_some_and(|max| game_state.meta.turn_year >= max);
            (events, done)
        };

        let _ = event_tx.send(events);

        // --- Performance logging ---
        perf_window_ticks += 1;
        let elapsed = perf_window_start.elapsed();
        if elapsed >= PERF_LOG_INTERVAL {
            let tps = perf_window_ticks as f64 / elapsed.as_secs_f64();
            tracing::info!(tps = format_args!("{tps:.1}"), turns = perf_window_ticks, "tick loop throughput");
            perf_window_start = Instant::now();
            perf_window_ticks = 0;
        }

        if done {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SimState;
    use parking_lot::Mutex;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use turnengine_control::GalaxyGenerator;
    use turnengine_core::EventEnvelope;
    use turnengine_core::test_fixtures::base_content;
    use turnengine_world::{FilePersistenceAdapter, SeededGalaxyGenerator};
    use tokio::sync::broadcast;

    fn make_test_sim() -> (SharedSim, CommandQueue, EventTx, Arc<AtomicBool>) {
        let content = base_content();
        let generator = SeededGalaxyGenerator::new(content.clone());
        let rng = ChaCha8Rng::seed_from_u64(0);
        let game_state = generator.generate(1, 50, 0).expect("galaxy generation should not fail");
        let tmp = tempfile::tempdir().unwrap();
        let sim = Arc::new(Mutex::new(SimState {
            game_id: "test-game".to_string(),
            game_state,
            content,
            rng,
            persistence: FilePersistenceAdapter::new(tmp.path()),
        }));
        let (event_tx, _) = broadcast::channel::<Vec<EventEnvelope>>(256);
        let command_queue = Arc::new(Mutex::new(Vec::new()));
        let paused = Arc::new(AtomicBool::new(false));
        (sim, command_queue, event_tx, paused)
    }

    #[tokio::test]
    async fn test_tick_loop_advances_turn_year() {
        let (sim, command_queue, event_tx, paused) = make_test_sim();
        let start_year = sim.lock().game_state.meta.turn_year;
        run_tick_loop(
            sim.clone(),
            command_queue,
            event_tx,
            Arc::new(AtomicU64::new(0.0_f64.to_bits())),
            Some(start_year + 5),
            paused,
        )
        .await;
        let guard = sim.lock();
        assert_eq!(guard.game_state.meta.turn_year, start_year + 5);
    }

    #[tokio::test]
    async fn test_tick_loop_respects_pause() {
        let (sim, command_queue, event_tx, paused) = make_test_sim();
        let start_year = sim.lock().game_state.meta.turn_year;
        paused.store(true, Ordering::Relaxed);

        let sim_clone = sim.clone();
        let paused_clone = paused.clone();
        let handle = tokio::spawn(async move {
            run_tick_loop(
                sim_clone,
                command_queue,
                event_tx,
                Arc::new(AtomicU64::new(0.0_f64.to_bits())),
                Some(start_year + 5),
                paused_clone,
            )
            .await;
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sim.lock().game_state.meta.turn_year, start_year, "turn should not advance while paused");

        paused.store(false, Ordering::Relaxed);
        handle.await.unwrap();
        assert_eq!(sim.lock().game_state.meta.turn_year, start_year + 5);
    }
}

//! Collaborator contracts the turn engine depends on but does not implement
//! itself: persistence, galaxy generation, component lookup, and turn
//! notification. `turnengine_world` provides the file-backed implementations;
//! `turnengine_daemon` and `turnengine_cli` wire them together.

use anyhow::Result;
use turnengine_core::commands::Command;
use turnengine_core::{GameContent, GameState, Message};

/// Persists and restores whole-game snapshots, and buffers submitted
/// commands between turns. `append_commands`/`drain_commands` must be
/// idempotent per turn: draining a turn twice returns nothing the second
/// time, and appending after a drain for that turn is a caller error the
/// adapter is free to ignore.
pub trait PersistenceAdapter {
    fn save(&self, game_id: &str, state: &GameState) -> Result<()>;
    fn load(&self, game_id: &str) -> Result<Option<GameState>>;
    fn append_commands(&self, game_id: &str, turn: u32, empire: u8, commands: Vec<Command>) -> Result<()>;
    fn drain_commands(&self, game_id: &str, turn: u32) -> Result<Vec<(u8, Vec<Command>)>>;
}

/// Builds a fresh galaxy: homeworlds and starting scout fleets placed
/// deterministically from `seed`, one per player.
pub trait GalaxyGenerator {
    fn generate(&self, player_count: u8, universe_size: u32, seed: u64) -> Result<GameState>;
}

/// Read-only lookup into the component catalog: hull module layouts and
/// engine fuel tables, keyed by name.
pub trait ComponentCatalog {
    fn content(&self) -> &GameContent;
}

/// Notified once per generated turn with the per-empire message batch.
/// Implementations range from a no-op (batch runs, tests) to an SSE
/// broadcast (the daemon).
pub trait EventNotifier {
    fn turn_generated(&mut self, game_id: &str, turn_year: u32, messages: &[Message]);
}

/// In-memory command intake: accumulates submitted commands per turn until
/// drained by the next `tick`. This is the collaborator a single-process
/// runner (CLI, tests) reaches for instead of a real queue.
#[derive(Debug, Default)]
pub struct CommandIntakeQueue {
    pending: Vec<(u8, Vec<Command>)>,
}

impl CommandIntakeQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, empire: u8, commands: Vec<Command>) {
        self.pending.push((empire, commands));
    }

    /// Drains every queued submission and applies it to the matching
    /// empire's command stack, in submission order, so `apply_commands`
    /// later sees the latest submission on top of its LIFO stack.
    pub fn drain_into(&mut self, state: &mut GameState) {
        for (empire_id, commands) in self.pending.drain(..) {
            if let Some(empire) = state.empires.get_mut(&empire_id) {
                empire.command_stack.extend(commands);
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A notifier that does nothing, for batch runners and tests that only
/// care about the returned message/event vectors.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl EventNotifier for NullNotifier {
    fn turn_generated(&mut self, _game_id: &str, _turn_year: u32, _messages: &[Message]) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnengine_core::test_fixtures::base_state;

    #[test]
    fn drain_into_appends_to_the_right_empire_stack() {
        let mut state = base_state();
        let mut queue = CommandIntakeQueue::new();
        queue.submit(1, vec![Command::Research { budget_percent: 40, priority: turnengine_core::TechLevel::default() }]);
        assert!(!queue.is_empty());

        queue.drain_into(&mut state);
        assert!(queue.is_empty());
        assert_eq!(state.empires.get(&1).unwrap().command_stack.len(), 1);
    }

    #[test]
    fn drain_into_is_a_one_shot() {
        let mut state = base_state();
        let mut queue = CommandIntakeQueue::new();
        queue.submit(1, vec![Command::Research { budget_percent: 40, priority: turnengine_core::TechLevel::default() }]);
        queue.drain_into(&mut state);
        queue.drain_into(&mut state);
        assert_eq!(state.empires.get(&1).unwrap().command_stack.len(), 1);
    }

    #[test]
    fn null_notifier_does_not_panic() {
        let mut notifier = NullNotifier;
        notifier.turn_generated("game-1", 2100, &[]);
    }
}

//! Alternative battle engine: up to 60 rounds on a `GRID_SCALE`d 1000-unit
//! board, with fractional velocity-vector movement, early jitter and
//! late-round flee behaviour (§4.4). Shares target selection and weapon
//! resolution with the standard engine; only movement and scale differ.

use super::{run_generic, BattleEngine, BattleReport, Engagement, MovementStyle};
use crate::types::{GameContent, GameState, Message};
use rand::Rng;

const BOARD_SIZE: i64 = 1000;
const GRID_SCALE: f64 = 100.0;

pub struct AlternativeEngine;

impl BattleEngine for AlternativeEngine {
    fn max_rounds(&self, content: &GameContent) -> u32 {
        content.constants.max_battle_rounds_alternative
    }

    fn run(
        &self,
        engagement: &Engagement,
        state: &mut GameState,
        content: &GameContent,
        rng: &mut impl Rng,
    ) -> (BattleReport, Vec<Message>) {
        run_generic(self.max_rounds(content), BOARD_SIZE, GRID_SCALE, MovementStyle::Fractional, engagement, state, content, rng)
    }
}

//! Standard battle engine: up to 16 rounds, classic 10-unit board, 3
//! movement phases per round (§4.4).

use super::{run_generic, BattleEngine, BattleReport, Engagement, MovementStyle};
use crate::types::{GameContent, GameState, Message};
use rand::Rng;

const BOARD_SIZE: i64 = 10;
const RANGE_SCALE: f64 = 1.0;

pub struct StandardEngine;

impl BattleEngine for StandardEngine {
    fn max_rounds(&self, content: &GameContent) -> u32 {
        content.constants.max_battle_rounds_standard
    }

    fn run(
        &self,
        engagement: &Engagement,
        state: &mut GameState,
        content: &GameContent,
        rng: &mut impl Rng,
    ) -> (BattleReport, Vec<Message>) {
        run_generic(self.max_rounds(content), BOARD_SIZE, RANGE_SCALE, MovementStyle::StandardPhases, engagement, state, content, rng)
    }
}

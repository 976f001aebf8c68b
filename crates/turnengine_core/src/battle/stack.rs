//! Battle stacks: one per (fleet, design) pair participating in an
//! engagement, with mutable totals separate from the parent fleet's tokens
//! until the battle resolves (§4.4 "stack formation").

use crate::types::{BattlePlan, Position, TargetCategory, Weapon};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackKey(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stack {
    pub key: StackKey,
    pub owner: u8,
    pub fleet_key: u64,
    pub design_key: u64,
    pub quantity: u32,
    pub armour_per_ship: i64,
    pub shields_per_ship: i64,
    pub total_armour: i64,
    pub total_shields: i64,
    pub mass: i64,
    pub cost_estimate: i64,
    pub weapons: Vec<Weapon>,
    pub initiative: i32,
    pub position: Position,
    /// Last heading this stack moved along this battle, in grid units per
    /// round (§4.4). Read back by the alternative engine's jitter/flee logic
    /// so a stack's next move builds on its current course rather than
    /// recomputing from scratch every round.
    pub velocity: Position,
    pub category: TargetCategory,
    pub battle_plan: BattlePlan,
    pub destroyed: bool,
    pub computer_accuracy: f64,
    pub jammer: f64,
    pub battle_speed: f64,
}

impl Stack {
    #[must_use]
    pub fn is_armed(&self) -> bool {
        !self.weapons.is_empty()
    }

    #[must_use]
    pub fn attractiveness(&self) -> f64 {
        let defence = (self.total_armour + self.total_shields).max(1) as f64;
        (self.mass + self.cost_estimate) as f64 / defence
    }

    /// Beam damage: shields absorb first, any remainder overflows into
    /// armour (§4.4).
    pub fn absorb_damage(&mut self, mut damage: f64) {
        let shield_absorb = damage.min(self.total_shields as f64);
        self.total_shields -= shield_absorb as i64;
        damage -= shield_absorb;
        self.total_armour -= damage as i64;
        if self.total_armour <= 0 {
            self.destroyed = true;
        }
    }

    /// Missile hit: half the weapon's power is applied straight to armour,
    /// half to shields, neither overflowing into the other (§4.4).
    pub fn absorb_missile_hit(&mut self, power: f64) {
        let shield_share = (power * 0.5).min(self.total_shields as f64);
        self.total_shields -= shield_share as i64;
        self.total_armour -= (power * 0.5) as i64;
        if self.total_armour <= 0 {
            self.destroyed = true;
        }
    }

    /// Missile miss: stray fire only ever drains shields, capped at what's
    /// left, and never bleeds into armour (§4.4).
    pub fn absorb_missile_miss(&mut self, power: f64) {
        let damage = power / 8.0;
        let shield_absorb = damage.min(self.total_shields as f64).max(0.0);
        self.total_shields -= shield_absorb as i64;
    }
}

/// Next battle-local stack counter, encoding owner in the high byte so stack
/// keys stay unique across empires within one engagement.
#[must_use]
pub fn next_stack_key(owner: u8, counter: &mut u32) -> StackKey {
    let key = crate::id::entity_key(owner, *counter);
    *counter += 1;
    StackKey(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttackMode, BattlePlan};

    fn test_stack() -> Stack {
        Stack {
            key: StackKey(1),
            owner: 1,
            fleet_key: 1,
            design_key: 1,
            quantity: 4,
            armour_per_ship: 50,
            shields_per_ship: 20,
            total_armour: 200,
            total_shields: 80,
            mass: 400,
            cost_estimate: 100,
            weapons: Vec::new(),
            initiative: 0,
            position: Position::new(0, 0),
            velocity: Position::new(0, 0),
            category: TargetCategory::ArmedShip,
            battle_plan: BattlePlan { name: "Default".into(), priorities: Vec::new(), attack: AttackMode::Enemies },
            destroyed: false,
            computer_accuracy: 0.0,
            jammer: 0.0,
            battle_speed: 1.0,
        }
    }

    #[test]
    fn missile_hit_splits_evenly_between_shields_and_armour() {
        let mut stack = test_stack();
        stack.absorb_missile_hit(40.0);
        assert_eq!(stack.total_shields, 60);
        assert_eq!(stack.total_armour, 180);
    }

    #[test]
    fn missile_miss_never_touches_armour() {
        let mut stack = test_stack();
        stack.total_shields = 1;
        stack.absorb_missile_miss(800.0);
        assert_eq!(stack.total_shields, 0);
        assert_eq!(stack.total_armour, 200);
    }

    #[test]
    fn beam_damage_overflows_into_armour_once_shields_are_gone() {
        let mut stack = test_stack();
        stack.absorb_damage(100.0);
        assert_eq!(stack.total_shields, 0);
        assert_eq!(stack.total_armour, 180);
    }
}

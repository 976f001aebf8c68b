//! Battle board geometry: race-box placement and the per-round movement
//! table, ported from `SpaceAllocator.cs`/`BattleEngine.cs` (§4.4).

use crate::types::{Position, MAX_WEAPON_RANGE};

/// Movement table from `BattleEngine.cs`: 9 battle-speed rows (0.5 .. 2.5+)
/// by 8 columns (`battle_round % 8`), giving moves-this-round for a stack.
const MOVEMENT_TABLE: [[u8; 8]; 9] = [
    [0, 1, 0, 1, 0, 1, 0, 1],
    [1, 1, 1, 0, 1, 1, 1, 0],
    [1, 1, 1, 1, 1, 1, 1, 1],
    [1, 2, 1, 1, 1, 2, 1, 1],
    [1, 2, 1, 2, 1, 2, 1, 2],
    [2, 2, 2, 1, 2, 2, 2, 1],
    [2, 2, 2, 2, 2, 2, 2, 2],
    [2, 3, 2, 2, 2, 3, 2, 2],
    [2, 3, 2, 3, 2, 3, 2, 3],
];

fn speed_row(battle_speed: f64) -> usize {
    if battle_speed <= 0.5 {
        0
    } else if battle_speed <= 0.75 {
        1
    } else if battle_speed <= 1.0 {
        2
    } else if battle_speed <= 1.25 {
        3
    } else if battle_speed <= 1.5 {
        4
    } else if battle_speed <= 1.75 {
        5
    } else if battle_speed <= 2.0 {
        6
    } else if battle_speed <= 2.25 {
        7
    } else {
        8
    }
}

/// Moves scheduled for a stack this battle round (0-3), looked up from the
/// movement table by battle speed and `round % 8`.
#[must_use]
pub fn moves_for_speed(battle_speed: f64, battle_round: u32) -> u8 {
    MOVEMENT_TABLE[speed_row(battle_speed)][(battle_round % 8) as usize]
}

/// Whether a stack scheduled for `moves_this_round` moves during
/// `phase` of the standard engine's 3-phase round (§4.4).
#[must_use]
pub fn moves_this_phase(moves_this_round: u8, phase: u32) -> bool {
    match phase {
        1 => moves_this_round == 3,
        2 => moves_this_round >= 2,
        3 => moves_this_round >= 1,
        _ => false,
    }
}

/// One grid step from `from` towards `to`, normalized to -1/0/1 per axis
/// (§4.4 `_battle_move_to`).
#[must_use]
pub fn step_towards(from: Position, to: Position) -> Position {
    let dx = (to.x - from.x).signum();
    let dy = (to.y - from.y).signum();
    Position::new(from.x + dx, from.y + dy)
}

/// Center position of race box `index` of `num_races` on a square board of
/// side `board_size`, laid out on a `ceil(sqrt(num_races))` grid (§4.4, ported
/// from `SpaceAllocator`).
#[must_use]
pub fn race_box_center(index: usize, num_races: usize, board_size: i64) -> Position {
    let axis_count = (num_races.max(1) as f64).sqrt().ceil() as i64;
    let box_side = (board_size / axis_count).max(1);
    let col = (index as i64) % axis_count;
    let row = (index as i64) / axis_count;
    Position::new(col * box_side + box_side / 2, row * box_side + box_side / 2)
}

/// Side length of one race's box on a board built for `num_races` (§4.4,
/// recorded on `BattleReport` in the original as `space_size`).
#[must_use]
pub fn race_box_size(num_races: usize) -> u32 {
    let axis_count = (num_races.max(1) as f64).sqrt().ceil() as u32;
    axis_count * MAX_WEAPON_RANGE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_one_moves_every_phase() {
        for round in 0..16 {
            assert_eq!(moves_for_speed(1.0, round), 1);
        }
    }

    #[test]
    fn fast_stacks_move_more_than_slow_ones() {
        let total = |speed: f64| (0..8).map(|r| u32::from(moves_for_speed(speed, r))).sum::<u32>();
        assert!(total(2.5) > total(1.0));
        assert!(total(1.0) > total(0.5));
    }

    #[test]
    fn two_races_split_the_board_into_two_boxes() {
        let a = race_box_center(0, 2, 10);
        let b = race_box_center(1, 2, 10);
        assert_ne!(a, b);
    }

    #[test]
    fn step_towards_never_overshoots_by_more_than_one_cell() {
        let from = Position::new(0, 0);
        let to = Position::new(5, -3);
        let next = step_towards(from, to);
        assert!((next.x - from.x).abs() <= 1);
        assert!((next.y - from.y).abs() <= 1);
    }
}

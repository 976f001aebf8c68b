//! Movement & fuel (C3): per-fleet per-turn advancement, fuel burn,
//! minefield hit checks, refuel/repair tiering.

use crate::types::{Fleet, GameState, Message, MessageKind, MinefieldType, Relation, WaypointTask};
use rand::Rng;

const EPSILON: f64 = 1e-9;

/// Per-shot armour/shield damage pool on a minefield trigger, scaled by how
/// populated the field is. See `SPEC_FULL.md` §4.2: no other authority fixes
/// this number, so this expanded spec does.
const MINE_DAMAGE_PER_HIT: f64 = 100.0;

fn fuel_consumption_rate(fleet: &Fleet, engine: &crate::types::EngineSpec, warp: u8, total_mass: f64) -> f64 {
    let base = engine.fuel_table[warp as usize];
    let mut rate = base * (total_mass / 200.0);
    if engine.is_improved_fuel_efficiency {
        rate *= 0.85;
    }
    let _ = fleet;
    rate
}

/// Advance one fleet along its current leg by up to 1.0 time units. Returns
/// messages emitted (out-of-fuel downgrades, CE misfires).
pub fn advance_fleet(
    fleet: &mut Fleet,
    design_mass: i64,
    design_armour: i64,
    engine: &crate::types::EngineSpec,
    rng: &mut impl Rng,
) -> Vec<Message> {
    let mut messages = Vec::new();
    let _ = design_armour;

    let Some(target) = fleet.waypoints.first().cloned() else { return messages };
    if target.position == fleet.position {
        if fleet.waypoints.len() > 1 {
            fleet.waypoints.remove(0);
        }
        return messages;
    }

    let warp = target.warp_factor.max(1);
    if warp > 6 && fleet.is_cheap_engine_and_fails(engine, rng) {
        messages.push(Message::new(fleet.owner, MessageKind::Movement, format!("{}: cheap engines failed to start", fleet.name)).with_fleet(fleet.key));
        return messages;
    }

    let speed = f64::from(warp) * f64::from(warp);
    let distance = fleet.position.distance_to(target.position);
    let total_mass = (design_mass + fleet.cargo.mass()) as f64;
    let consumption_rate = fuel_consumption_rate(fleet, engine, warp, total_mass);

    let time_to_arrival = if speed > 0.0 { distance / speed } else { f64::INFINITY };
    let time_until_empty = if consumption_rate > EPSILON {
        fleet.fuel_available / consumption_rate
    } else {
        f64::INFINITY
    };

    let time_step = 1.0_f64.min(time_to_arrival).min(time_until_empty);
    let travel = time_step * speed;

    if distance > 0.0 {
        let t = (travel / distance).clamp(0.0, 1.0);
        let dx = (target.position.x - fleet.position.x) as f64 * t;
        let dy = (target.position.y - fleet.position.y) as f64 * t;
        fleet.position.x += dx.round() as i64;
        fleet.position.y += dy.round() as i64;
    }

    fleet.fuel_available = (fleet.fuel_available - consumption_rate * time_step).max(0.0);

    let arrived = time_to_arrival <= time_until_empty + EPSILON && fleet.position == target.position;
    if arrived {
        if fleet.waypoints.len() > 1 {
            fleet.waypoints.remove(0);
        }
    } else if time_until_empty < time_to_arrival {
        messages.push(
            Message::new(fleet.owner, MessageKind::Movement, format!("{}: out of fuel, reducing to warp {}", fleet.name, engine.free_warp_speed))
                .with_fleet(fleet.key),
        );
        if let Some(wp) = fleet.waypoints.first_mut() {
            wp.warp_factor = engine.free_warp_speed;
        }
    }

    messages
}

impl Fleet {
    fn is_cheap_engine_and_fails(&self, engine: &crate::types::EngineSpec, rng: &mut impl Rng) -> bool {
        engine.is_cheap_engine && rng.gen_range(0..10) == 0
    }
}

/// Minefield interaction: roll a hit chance for every enemy minefield whose
/// radius covers the fleet's new position (§4.2).
pub fn check_minefields(state: &mut GameState, fleet_key: u64, rng: &mut impl Rng) -> Vec<Message> {
    let mut messages = Vec::new();
    let Some(fleet) = state.fleets.get(&fleet_key).cloned() else { return messages };
    let warp = fleet.waypoints.first().map_or(1, |w| w.warp_factor.max(1));

    let hits: Vec<u64> = state
        .minefields
        .values()
        .filter(|m| m.owner != fleet.owner && m.position.distance_to(fleet.position) <= m.radius())
        .map(|m| m.key)
        .collect();

    for mine_key in hits {
        let Some(minefield) = state.minefields.get(&mine_key) else { continue };
        let chance = minefield.mine_type.hit_chance() * f64::from(warp);
        if rng.r#gen::<f64>() >= chance {
            continue;
        }
        messages.push(
            Message::new(fleet.owner, MessageKind::Movement, format!("{} hit a minefield", fleet.name)).with_fleet(fleet_key),
        );
        let mine_count_factor = (f64::from(minefield.mine_count) / 1000.0).min(1.0);
        let Some(target_fleet) = state.fleets.get_mut(&fleet_key) else { continue };
        match minefield.mine_type {
            MinefieldType::SpeedBump => {
                if let Some(wp) = target_fleet.waypoints.first_mut() {
                    wp.warp_factor = wp.warp_factor.min(1);
                }
            }
            MinefieldType::Standard | MinefieldType::Heavy => {
                let damage = mine_count_factor * MINE_DAMAGE_PER_HIT;
                apply_minefield_damage(target_fleet, damage);
            }
        }
    }

    messages
}

fn apply_minefield_damage(fleet: &mut Fleet, mut damage: f64) {
    let mut keys: Vec<u64> = fleet.tokens.keys().copied().collect();
    keys.sort_unstable();
    for key in keys {
        if damage <= 0.0 {
            break;
        }
        let Some(token) = fleet.tokens.get_mut(&key) else { continue };
        let shield_absorb = damage.min(token.shields as f64);
        token.shields -= shield_absorb as i64;
        damage -= shield_absorb;
        let armour_absorb = damage.min(token.armour as f64);
        token.armour -= armour_absorb as i64;
        damage -= armour_absorb;
    }
}

/// Refuel/repair tiering after movement (§4.2). `star_owner_relation` is the
/// moving empire's relation with the star's owner, `None` if the star is
/// unowned or the fleet isn't stopped at one.
pub fn repair_refuel_rate(at_own_star: bool, has_starbase: bool, has_dock: bool, star_owner_relation: Option<Relation>, moving: bool) -> (f64, f64) {
    if at_own_star {
        return if has_starbase && has_dock {
            (1.0, 0.20)
        } else if has_starbase {
            (0.0, 0.08)
        } else {
            (0.0, 0.05)
        };
    }
    match star_owner_relation {
        // Open question 4: a non-enemy foreign star is treated as neutral
        // ground and uses the no-starbase rate rather than inventing an
        // alliance system.
        Some(Relation::Neutral) | Some(Relation::Unknown) => (0.0, 0.05),
        Some(Relation::Enemy) => (0.0, 0.03),
        None => {
            if moving {
                (0.0, 0.01)
            } else {
                (0.0, 0.02)
            }
        }
    }
}

pub fn apply_repair(fleet: &mut Fleet, design_armour: i64, repair_fraction: f64, refuel_fraction: f64, fuel_capacity: f64) {
    if refuel_fraction > 0.0 {
        fleet.fuel_available = fuel_capacity;
    }
    if repair_fraction <= 0.0 {
        return;
    }
    for token in fleet.tokens.values_mut() {
        let max_armour = design_armour * i64::from(token.quantity);
        let healed = (max_armour as f64 * repair_fraction) as i64;
        token.armour = (token.armour + healed).min(max_armour);
    }
}

pub fn process_waypoint_task(fleet: &Fleet) -> bool {
    matches!(fleet.waypoints.first().map(|w| &w.task), Some(WaypointTask::NoTask) | None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cargo, EngineSpec, Position, ShipToken, Waypoint};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    fn test_fleet(position: Position, destination: Position, warp: u8) -> Fleet {
        let mut tokens = HashMap::new();
        tokens.insert(1, ShipToken { design_key: 1, quantity: 1, armour: 100, shields: 50 });
        Fleet {
            key: crate::id::entity_key(1, 0),
            name: "Scout".into(),
            owner: 1,
            position,
            in_orbit: None,
            tokens,
            waypoints: vec![Waypoint { position: destination, warp_factor: warp, destination: "dest".into(), task: WaypointTask::NoTask }],
            cargo: Cargo::default(),
            fuel_available: 300.0,
            battle_plan_name: String::new(),
            salvage_created_turn: None,
        }
    }

    fn test_engine() -> EngineSpec {
        EngineSpec { fuel_table: [0.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0], free_warp_speed: 1, is_cheap_engine: false, is_improved_fuel_efficiency: false }
    }

    #[test]
    fn a_fleet_already_at_its_destination_burns_no_fuel() {
        let mut fleet = test_fleet(Position::new(5, 5), Position::new(5, 5), 1);
        let engine = test_engine();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let fuel_before = fleet.fuel_available;
        let messages = advance_fleet(&mut fleet, 100, 100, &engine, &mut rng);
        assert!(messages.is_empty());
        assert_eq!(fleet.fuel_available, fuel_before);
    }

    #[test]
    fn moving_towards_a_distant_target_consumes_fuel_and_advances() {
        let mut fleet = test_fleet(Position::new(0, 0), Position::new(100, 0), 4);
        let engine = test_engine();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let fuel_before = fleet.fuel_available;
        advance_fleet(&mut fleet, 100, 100, &engine, &mut rng);
        assert!(fleet.fuel_available < fuel_before);
        assert_ne!(fleet.position, Position::new(0, 0));
    }

    #[test]
    fn running_out_of_fuel_drops_the_waypoint_to_the_free_warp_speed() {
        let mut fleet = test_fleet(Position::new(0, 0), Position::new(1_000_000, 0), 9);
        fleet.fuel_available = 1.0;
        let engine = test_engine();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        advance_fleet(&mut fleet, 100, 100, &engine, &mut rng);
        assert_eq!(fleet.waypoints[0].warp_factor, engine.free_warp_speed);
    }

    #[test]
    fn minefield_damage_drains_shields_before_armour() {
        let mut fleet = test_fleet(Position::new(0, 0), Position::new(0, 0), 1);
        fleet.tokens.get_mut(&1).unwrap().shields = 20;
        fleet.tokens.get_mut(&1).unwrap().armour = 100;
        apply_minefield_damage(&mut fleet, 50.0);
        let token = &fleet.tokens[&1];
        assert_eq!(token.shields, 0);
        assert_eq!(token.armour, 70);
    }

    #[test]
    fn own_star_with_starbase_and_dock_gives_full_refuel() {
        let (refuel, repair) = repair_refuel_rate(true, true, true, None, false);
        assert_eq!(refuel, 1.0);
        assert!((repair - 0.20).abs() < 1e-9);
    }

    #[test]
    fn enemy_territory_never_refuels() {
        let (refuel, repair) = repair_refuel_rate(false, false, false, Some(Relation::Enemy), false);
        assert_eq!(refuel, 0.0);
        assert!((repair - 0.03).abs() < 1e-9);
    }
}

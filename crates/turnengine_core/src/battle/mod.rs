//! Battle engine (C5): two interchangeable engines behind one `run` contract.

mod alternative;
mod grid;
mod standard;
pub mod stack;

pub use alternative::AlternativeEngine;
pub use standard::StandardEngine;

use crate::types::{BattleEngineKind, Fleet, GameContent, GameState, Message, MessageKind, Position, TargetCategory};
use rand::Rng;
use stack::{next_stack_key, Stack, StackKey};
use std::collections::HashMap;

/// One battle event: a weapon fire, a destruction, or a round boundary.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum BattleEvent {
    Fire { round: u32, attacker: StackKey, target: StackKey, damage: f64 },
    Destroyed { round: u32, stack: StackKey, owner: u8, losses: u32 },
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BattleReport {
    pub position: crate::types::Position,
    pub participants: Vec<u8>,
    pub events: Vec<BattleEvent>,
}

pub struct Engagement {
    pub position: crate::types::Position,
    pub fleet_keys: Vec<u64>,
}

/// How stacks move on the battle board each round (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MovementStyle {
    /// Classic 10-unit board: up to 3 discrete one-cell steps per round,
    /// gated by the battle-speed movement table.
    StandardPhases,
    /// `GRID_SCALE`d board: one fractional velocity-vector step per round,
    /// with early-round jitter and late-round flee behaviour.
    Fractional,
}

/// Implemented by `StandardEngine` and `AlternativeEngine`. Given the set of
/// colocated fleets, run combat to termination and produce one report per
/// participating empire (§4.4).
pub trait BattleEngine {
    fn max_rounds(&self, content: &GameContent) -> u32;
    fn run(
        &self,
        engagement: &Engagement,
        state: &mut GameState,
        content: &GameContent,
        rng: &mut impl Rng,
    ) -> (BattleReport, Vec<Message>);
}

pub fn engine_for(kind: BattleEngineKind) -> Box<dyn EngineDispatch> {
    match kind {
        BattleEngineKind::Standard => Box::new(StandardEngine),
        BattleEngineKind::Alternative => Box::new(AlternativeEngine),
    }
}

/// Object-safe wrapper so the orchestrator can hold either engine behind one
/// trait object without generic parameters leaking into `GameState`.
pub trait EngineDispatch {
    fn run_dyn(
        &self,
        engagement: &Engagement,
        state: &mut GameState,
        content: &GameContent,
        rng: &mut dyn rand::RngCore,
    ) -> (BattleReport, Vec<Message>);
}

impl<T: BattleEngine> EngineDispatch for T {
    fn run_dyn(
        &self,
        engagement: &Engagement,
        state: &mut GameState,
        content: &GameContent,
        rng: &mut dyn rand::RngCore,
    ) -> (BattleReport, Vec<Message>) {
        // `Rng` is blanket-implemented for any `RngCore`, so a trait object
        // reference works directly as the generic bound.
        self.run(engagement, state, content, rng)
    }
}

/// Form one stack per (fleet, design) pair among the engagement's fleets,
/// placed in its owner's race box on a `board_size`-wide board (§4.4).
pub fn form_stacks(state: &GameState, fleet_keys: &[u64], board_size: i64) -> Vec<Stack> {
    let mut stacks = Vec::new();
    let mut counters: HashMap<u8, u32> = HashMap::new();

    let mut owners: Vec<u8> = fleet_keys.iter().filter_map(|k| state.fleets.get(k)).map(|f| f.owner).collect();
    owners.sort_unstable();
    owners.dedup();

    for fleet_key in fleet_keys {
        let Some(fleet) = state.fleets.get(fleet_key) else { continue };
        let Some(empire) = state.empires.get(&fleet.owner) else { continue };
        let mut design_keys: Vec<u64> = fleet.tokens.keys().copied().collect();
        design_keys.sort_unstable();

        let owner_index = owners.iter().position(|o| *o == fleet.owner).unwrap_or(0);
        let position = grid::race_box_center(owner_index, owners.len(), board_size);

        for design_key in design_keys {
            let token = &fleet.tokens[&design_key];
            let Some(design) = empire.designs.get(&design_key) else { continue };
            let counter = counters.entry(fleet.owner).or_insert(0);
            let key = next_stack_key(fleet.owner, counter);
            let category = categorise(design);
            let plan = empire
                .battle_plans
                .iter()
                .find(|p| p.name == fleet.battle_plan_name)
                .cloned()
                .unwrap_or_else(default_battle_plan);

            stacks.push(Stack {
                key,
                owner: fleet.owner,
                fleet_key: *fleet_key,
                design_key,
                quantity: token.quantity,
                armour_per_ship: design.summary.armour,
                shields_per_ship: design.summary.shields,
                total_armour: design.summary.armour * i64::from(token.quantity),
                total_shields: design.summary.shields * i64::from(token.quantity),
                mass: design.summary.mass * i64::from(token.quantity),
                cost_estimate: design.summary.cost.mass() * i64::from(token.quantity),
                weapons: design.summary.weapons.clone(),
                initiative: design.summary.initiative,
                position,
                velocity: Position::new(0, 0),
                category,
                battle_plan: plan,
                destroyed: false,
                computer_accuracy: design.summary.computer_accuracy,
                jammer: design.summary.jammer,
                battle_speed: design.summary.battle_speed,
            });
        }
    }
    stacks
}

fn default_battle_plan() -> crate::types::BattlePlan {
    crate::types::BattlePlan {
        name: "Default".into(),
        priorities: vec![TargetCategory::ArmedShip, TargetCategory::AnyShip],
        attack: crate::types::AttackMode::Enemies,
    }
}

fn categorise(design: &crate::types::ShipDesign) -> TargetCategory {
    if design.summary.is_starbase {
        TargetCategory::Starbase
    } else if design.summary.is_bomber {
        TargetCategory::Bomber
    } else if !design.summary.weapons.is_empty() && design.summary.mass > 200 {
        TargetCategory::CapitalShip
    } else if !design.summary.weapons.is_empty() {
        TargetCategory::ArmedShip
    } else if design.summary.scan_range > 0 {
        TargetCategory::SupportShip
    } else {
        TargetCategory::AnyShip
    }
}

/// Priority score (0-7) for `lamb` under `wolf`'s battle plan, or `None` if
/// `lamb` isn't a valid target at all (§4.4 target selection).
fn priority_score(wolf: &Stack, lamb: &Stack, relation: crate::types::Relation) -> Option<u32> {
    if lamb.destroyed || lamb.owner == wolf.owner {
        return None;
    }
    let targetable = match wolf.battle_plan.attack {
        crate::types::AttackMode::Everyone => true,
        crate::types::AttackMode::Enemies => relation == crate::types::Relation::Enemy,
        crate::types::AttackMode::Specific(id) => lamb.owner == id,
    };
    if !targetable {
        return None;
    }
    let rank = wolf.battle_plan.priorities.iter().position(|c| *c == lamb.category);
    Some(rank.map_or(7, |r| (7 - r.min(6)) as u32))
}

/// Pick the best target for `wolf` among `candidates` (§4.4). Unarmed stacks
/// invert the ordering (prefer the *least* attractive/threatening target, a
/// crude run-away heuristic).
fn select_target(wolf: &Stack, candidates: &[&Stack], relations: &HashMap<u8, crate::types::Relation>) -> Option<StackKey> {
    let relation_for = |owner: u8| relations.get(&owner).copied().unwrap_or(crate::types::Relation::Unknown);
    let mut best: Option<(u32, f64, StackKey)> = None;
    for lamb in candidates {
        let Some(priority) = priority_score(wolf, lamb, relation_for(lamb.owner)) else { continue };
        let mut attractiveness = lamb.attractiveness();
        if !wolf.is_armed() {
            attractiveness = -attractiveness;
        }
        let candidate = (priority, attractiveness, lamb.key);
        best = match best {
            None => Some(candidate),
            Some(current) if (candidate.0, candidate.1) > (current.0, current.1) => Some(candidate),
            Some(current) => Some(current),
        };
    }
    best.map(|(_, _, key)| key)
}

/// Move every live stack towards (or away from) its chosen target for this
/// round, per the engine's movement style (§4.4).
fn move_stacks(
    stacks: &mut HashMap<StackKey, Stack>,
    targets: &HashMap<StackKey, StackKey>,
    round: u32,
    board_size: i64,
    range_scale: f64,
    style: MovementStyle,
    rng: &mut impl Rng,
) {
    match style {
        MovementStyle::StandardPhases => {
            let target_positions: HashMap<StackKey, Position> =
                targets.iter().filter_map(|(attacker, target)| stacks.get(target).map(|s| (*attacker, s.position))).collect();
            for phase in 1..=3u32 {
                let keys: Vec<StackKey> = stacks.keys().copied().collect();
                for key in keys {
                    let (moves_this_round, from, destroyed) = match stacks.get(&key) {
                        Some(s) => (grid::moves_for_speed(s.battle_speed, round), s.position, s.destroyed),
                        None => continue,
                    };
                    if destroyed || !grid::moves_this_phase(moves_this_round, phase) {
                        continue;
                    }
                    let Some(&target_pos) = target_positions.get(&key) else { continue };
                    let next = clamp_to_board(grid::step_towards(from, target_pos), board_size);
                    if let Some(stack_mut) = stacks.get_mut(&key) {
                        stack_mut.position = next;
                    }
                }
            }
        }
        MovementStyle::Fractional => {
            let keys: Vec<StackKey> = stacks.keys().copied().collect();
            for key in keys {
                let Some(stack) = stacks.get(&key).cloned() else { continue };
                if stack.destroyed {
                    continue;
                }
                let magnitude = (stack.battle_speed * range_scale).max(1.0);
                let target_pos = targets.get(&key).and_then(|t| stacks.get(t)).map(|s| s.position);

                let mut desired = match target_pos {
                    Some(tp) => Position::new((tp.x - stack.position.x).signum(), (tp.y - stack.position.y).signum()),
                    None => Position::new(stack.velocity.x.signum(), stack.velocity.y.signum()),
                };

                if round < 5 && rng.r#gen::<bool>() {
                    desired = Position::new(-desired.x, -desired.y);
                }

                let range_limit = f64::from(crate::types::MAX_WEAPON_RANGE) * range_scale;
                let fleeing = !stack.is_armed()
                    || (round >= 5
                        && target_pos.map_or(false, |tp| stack.position.distance_squared_to(tp) <= range_limit * range_limit));
                if fleeing {
                    desired = Position::new(-desired.x, -desired.y);
                }

                let step = Position::new((desired.x as f64 * magnitude).round() as i64, (desired.y as f64 * magnitude).round() as i64);
                if let Some(stack_mut) = stacks.get_mut(&key) {
                    stack_mut.velocity = step;
                    stack_mut.position =
                        clamp_to_board(Position::new(stack_mut.position.x + step.x, stack_mut.position.y + step.y), board_size);
                }
            }
        }
    }
}

fn clamp_to_board(pos: Position, board_size: i64) -> Position {
    let max = board_size.max(1);
    Position::new(pos.x.clamp(0, max), pos.y.clamp(0, max))
}

/// Outcome of one weapon's shot, already carrying the damage/power value so
/// the caller only has to dispatch to the right `Stack::absorb_*` (§4.4).
enum ShotOutcome {
    Beam(f64),
    MissileHit(f64),
    MissileMiss(f64),
}

/// Weapon fire for one round: sort all live weapons by (initiative asc,
/// stack key asc) and fire in order (§4.4, §5 ordering guarantee).
fn fire_round(
    stacks: &mut HashMap<StackKey, Stack>,
    targets: &HashMap<StackKey, StackKey>,
    round: u32,
    range_scale: f64,
    rng: &mut impl Rng,
) -> Vec<BattleEvent> {
    let mut order: Vec<StackKey> = stacks.values().filter(|s| !s.destroyed && s.is_armed()).map(|s| s.key).collect();
    order.sort_by(|a, b| {
        let sa = &stacks[a];
        let sb = &stacks[b];
        sa.initiative.cmp(&sb.initiative).then(a.0.cmp(&b.0))
    });

    let mut events = Vec::new();
    for attacker_key in order {
        let Some(target_key) = targets.get(&attacker_key).copied() else { continue };
        let (Some(attacker), Some(target)) = (stacks.get(&attacker_key).cloned(), stacks.get(&target_key).cloned()) else { continue };
        if target.destroyed {
            continue;
        }
        let distance = attacker.position.distance_to(target.position);
        for weapon in &attacker.weapons {
            let effective_range = f64::from(weapon.range) * range_scale;
            if distance > effective_range {
                continue;
            }
            let outcome = resolve_weapon_damage(weapon, distance, range_scale, attacker.computer_accuracy, target.jammer, rng);
            let Some(target_mut) = stacks.get_mut(&target_key) else { continue };
            if target_mut.destroyed {
                continue;
            }
            let damage = match outcome {
                ShotOutcome::Beam(damage) => {
                    target_mut.absorb_damage(damage);
                    damage
                }
                ShotOutcome::MissileHit(power) => {
                    target_mut.absorb_missile_hit(power);
                    power
                }
                ShotOutcome::MissileMiss(power) => {
                    target_mut.absorb_missile_miss(power);
                    power / 8.0
                }
            };
            events.push(BattleEvent::Fire { round, attacker: attacker_key, target: target_key, damage });
            if target_mut.destroyed {
                events.push(BattleEvent::Destroyed { round, stack: target_key, owner: target_mut.owner, losses: target_mut.quantity });
            }
        }
    }
    events
}

/// Per-shot outcome for one weapon against a target at `distance` (§4.4).
/// Missile accuracy is the weapon's base accuracy plus the firing stack's
/// computer bonus, less the target's jammer rating; beams ignore both and
/// always connect for a range-scaled percentage of their power.
fn resolve_weapon_damage(
    weapon: &crate::types::Weapon,
    distance: f64,
    range_scale: f64,
    attacker_computer_accuracy: f64,
    target_jammer: f64,
    rng: &mut impl Rng,
) -> ShotOutcome {
    if weapon.is_missile {
        let hit_chance = (weapon.accuracy + attacker_computer_accuracy - target_jammer).clamp(0.0, 1.0);
        if rng.r#gen::<f64>() < hit_chance {
            ShotOutcome::MissileHit(weapon.power)
        } else {
            ShotOutcome::MissileMiss(weapon.power)
        }
    } else {
        let range = f64::from(weapon.range).max(1.0) * range_scale;
        let falloff = (distance * distance) / (range * range);
        let damage_percent = (1.0 - 0.10 * falloff).clamp(0.0, 1.0);
        ShotOutcome::Beam(weapon.power * damage_percent)
    }
}

/// Beam damage percentage at a given range/distance (§8 scenario 4:
/// `range=5, distance²=25 → 100 - 10×(25/25) = 90%`).
#[must_use]
pub fn beam_damage_percent(range: u32, distance_squared: f64) -> f64 {
    let range_squared = f64::from(range * range);
    (100.0 - 10.0 * (distance_squared / range_squared)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod beam_tests {
    use super::beam_damage_percent;

    #[test]
    fn scenario_4_beam_dispersal() {
        let percent = beam_damage_percent(5, 25.0);
        assert!((percent - 90.0).abs() < 1e-9);
    }
}

/// Destroy a stack: remove its tokens from the parent fleet, deposit 75% of
/// token cost as salvage (§4.4 destruction and salvage).
pub fn resolve_destructions(
    stacks: &HashMap<StackKey, Stack>,
    state: &mut GameState,
    battle_position: crate::types::Position,
    turn_year: u32,
    next_salvage_counter: &mut HashMap<u8, u32>,
) -> Vec<Message> {
    let mut messages = Vec::new();
    for stack in stacks.values().filter(|s| s.destroyed) {
        let Some(fleet) = state.fleets.get_mut(&stack.fleet_key) else { continue };
        fleet.tokens.remove(&stack.design_key);

        let salvage_value = (stack.cost_estimate as f64 * 0.75) as i64;
        let star_here = state.stars.values_mut().find(|s| s.position == battle_position);
        if let Some(star) = star_here {
            let deposited = (salvage_value as f64 * 0.9) as i64;
            star.resources_on_hand.ironium += deposited / 3;
            star.resources_on_hand.boranium += deposited / 3;
            star.resources_on_hand.germanium += deposited / 3;
        } else {
            let counter = next_salvage_counter.entry(0).or_insert(0);
            let key = crate::id::entity_key(0, *counter);
            *counter += 1;
            state.fleets.insert(
                key,
                Fleet {
                    key,
                    name: "S A L V A G E".to_string(),
                    owner: 0,
                    position: battle_position,
                    in_orbit: None,
                    tokens: HashMap::new(),
                    waypoints: vec![crate::types::Waypoint::stationary(battle_position, "salvage")],
                    cargo: crate::types::Cargo {
                        ironium: salvage_value / 3,
                        boranium: salvage_value / 3,
                        germanium: salvage_value / 3,
                        colonists_kt: 0,
                        silicoxium: 0,
                    },
                    fuel_available: 0.0,
                    battle_plan_name: String::new(),
                    salvage_created_turn: Some(turn_year),
                },
            );
        }
        messages.push(Message::new(stack.owner, MessageKind::Combat, format!("lost {} ships in battle", stack.quantity)));
    }
    messages
}

/// Relations as seen by every participating empire, keyed `(observer,
/// observed) -> relation` flattened to `observed -> relation` per engagement
/// since a wolf only ever asks about its own relation map.
pub fn gather_relations(state: &GameState, owner: u8) -> HashMap<u8, crate::types::Relation> {
    state
        .empires
        .get(&owner)
        .map(|e| e.empire_reports.iter().map(|(id, r)| (*id, r.relation)).collect())
        .unwrap_or_default()
}

/// Every empire present learns the hull/component makeup of every enemy
/// design it shared the battle board with this round (§4.6 step 4).
fn record_designs_sighted(state: &mut GameState, participants: &[u8], stacks: &HashMap<StackKey, Stack>) {
    let sighted: Vec<(u8, u64)> = stacks.values().map(|s| (s.owner, s.design_key)).collect();
    for &observer in participants {
        let Some(empire) = state.empires.get_mut(&observer) else { continue };
        for &(owner, design_key) in &sighted {
            if owner != observer {
                crate::scanning::record_known_design(empire, owner, design_key);
            }
        }
    }
}

pub(crate) fn run_generic(
    rounds: u32,
    board_size: i64,
    range_scale: f64,
    movement: MovementStyle,
    engagement: &Engagement,
    state: &mut GameState,
    _content: &GameContent,
    rng: &mut impl Rng,
) -> (BattleReport, Vec<Message>) {
    let mut stacks: HashMap<StackKey, Stack> =
        form_stacks(state, &engagement.fleet_keys, board_size).into_iter().map(|s| (s.key, s)).collect();
    let participants: Vec<u8> = {
        let mut owners: Vec<u8> = stacks.values().map(|s| s.owner).collect();
        owners.sort_unstable();
        owners.dedup();
        owners
    };

    record_designs_sighted(state, &participants, &stacks);

    let relations: HashMap<u8, HashMap<u8, crate::types::Relation>> =
        participants.iter().map(|&owner| (owner, gather_relations(state, owner))).collect();

    let mut events = Vec::new();
    let mut round = 0;
    loop {
        round += 1;
        if round > rounds {
            break;
        }
        let mut any_armed_with_target = false;
        let mut targets: HashMap<StackKey, StackKey> = HashMap::new();
        for wolf in stacks.values().filter(|s| !s.destroyed) {
            let candidates: Vec<&Stack> = stacks.values().filter(|s| !s.destroyed && s.owner != wolf.owner).collect();
            let empty = HashMap::new();
            let rel = relations.get(&wolf.owner).unwrap_or(&empty);
            if let Some(target) = select_target(wolf, &candidates, rel) {
                targets.insert(wolf.key, target);
                if wolf.is_armed() {
                    any_armed_with_target = true;
                }
            }
        }
        if !any_armed_with_target {
            break;
        }
        move_stacks(&mut stacks, &targets, round, board_size, range_scale, movement, rng);
        events.extend(fire_round(&mut stacks, &targets, round, range_scale, rng));
        if stacks.values().filter(|s| !s.destroyed && s.is_armed()).count() == 0 {
            break;
        }
    }

    let mut next_salvage_counter = HashMap::new();
    let turn_year = state.meta.turn_year;
    let messages = resolve_destructions(&stacks, state, engagement.position, turn_year, &mut next_salvage_counter);

    (BattleReport { position: engagement.position, participants, events }, messages)
}

#[cfg(test)]
mod run_generic_tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_empire};
    use crate::types::{
        BattleEngineKind, BattlePlan, Cargo, DesignSummary, EngineSpec, Fleet, GameContent, GameMeta, GameState, Resources, ShipDesign,
        ShipToken, Waypoint, Weapon,
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn armed_design(key: u64, armour: i64, shields: i64, power: f64) -> ShipDesign {
        ShipDesign {
            key,
            name: format!("design-{key}"),
            hull: "Scout".into(),
            allocations: Vec::new(),
            obsolete: false,
            summary_stale: false,
            summary: DesignSummary {
                mass: 100,
                cost: Resources::new(10, 10, 10, 0),
                armour,
                shields,
                fuel_capacity: 100,
                cargo_capacity: 0,
                initiative: 1,
                weapons: vec![Weapon { range: 3, initiative: 1, power, is_missile: false, accuracy: 1.0 }],
                bomb_kill_rate: 0.0,
                mine_layer_rate: 0,
                mine_layer_type: None,
                scan_range: 0,
                pen_scan_range: 0,
                has_colonisation_module: false,
                is_starbase: false,
                is_bomber: false,
                has_dock: false,
                engine: EngineSpec { fuel_table: [0.0; 11], free_warp_speed: 1, is_cheap_engine: true, is_improved_fuel_efficiency: false },
                computer_accuracy: 0.0,
                jammer: 0.0,
                battle_speed: 1.0,
            },
        }
    }

    fn fleet_with(owner: u8, key: u64, design_key: u64, quantity: u32, position: Position) -> Fleet {
        Fleet {
            key,
            name: format!("fleet-{key}"),
            owner,
            position,
            in_orbit: None,
            tokens: HashMap::from([(design_key, ShipToken { design_key, quantity, armour: 0, shields: 0 })]),
            waypoints: vec![Waypoint::stationary(position, "hold")],
            cargo: Cargo::default(),
            fuel_available: 100.0,
            battle_plan_name: "Default".into(),
            salvage_created_turn: None,
        }
    }

    /// §8 loss-conservation invariant: every ship removed from a destroyed
    /// stack is accounted for by exactly one `Destroyed` event's `losses`.
    #[test]
    fn destroyed_stacks_conserve_quantity_across_the_battle() {
        let content: GameContent = base_content();
        let mut empire_a = base_empire(1);
        empire_a.designs.insert(1, armed_design(1, 50, 0, 40.0));
        empire_a.battle_plans = vec![BattlePlan { name: "Default".into(), priorities: vec![], attack: crate::types::AttackMode::Enemies }];
        let mut empire_b = base_empire(2);
        empire_b.designs.insert(2, armed_design(2, 10, 0, 5.0));
        empire_b.battle_plans = vec![BattlePlan { name: "Default".into(), priorities: vec![], attack: crate::types::AttackMode::Enemies }];
        empire_a.note_contact(2);
        empire_b.note_contact(1);
        if let Some(report) = empire_a.empire_reports.get_mut(&2) {
            report.relation = crate::types::Relation::Enemy;
        }
        if let Some(report) = empire_b.empire_reports.get_mut(&1) {
            report.relation = crate::types::Relation::Enemy;
        }

        let position = Position::new(0, 0);
        let fleet_a = fleet_with(1, 10, 1, 1, position);
        let fleet_b = fleet_with(2, 20, 2, 3, position);

        let mut state = GameState {
            meta: GameMeta { seed: 7, turn_year: 2400, engine_flag: BattleEngineKind::Standard },
            stars: HashMap::new(),
            fleets: HashMap::from([(10, fleet_a), (20, fleet_b)]),
            minefields: HashMap::new(),
            packets: Vec::new(),
            empires: HashMap::from([(1, empire_a), (2, empire_b)]),
            messages: Vec::new(),
        };

        let engagement = Engagement { position, fleet_keys: vec![10, 20] };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let (report, _messages) =
            run_generic(16, 10, 1.0, MovementStyle::StandardPhases, &engagement, &mut state, &content, &mut rng);

        let destroyed_losses: u32 = report
            .events
            .iter()
            .filter_map(|e| match e {
                BattleEvent::Destroyed { losses, .. } => Some(*losses),
                BattleEvent::Fire { .. } => None,
            })
            .sum();
        assert!(destroyed_losses <= 4, "cannot lose more ships than entered the battle");
        assert!(!report.events.is_empty());
    }
}

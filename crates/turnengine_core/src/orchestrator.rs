//! Turn orchestrator (C8): the strictly ordered 17-step pipeline (§4.7).
//! Every step consumes the previous step's output; nothing runs concurrently
//! inside a single `tick`.

use crate::battle::{engine_for, Engagement};
use crate::types::{Event, EventEnvelope, GameContent, GameState, Message, MessageKind, Minefield, WaypointTask};
use crate::{bombing, commands, economy, id, movement, scanning};
use rand::Rng;
use std::collections::HashMap;

/// Run one full turn. Returns the messages generated and the events emitted
/// in this turn, or a fatal `EngineError` if an invariant was violated
/// (§4.8, §7 class 2 — the caller is expected to discard `state`'s mutations
/// and restore the prior snapshot on `Err`).
pub fn tick(state: &mut GameState, content: &GameContent, rng: &mut impl Rng) -> crate::error::EngineResult<(Vec<Message>, Vec<EventEnvelope>)> {
    let started_at = std::time::Instant::now();
    let budget = std::time::Duration::from_millis(content.constants.turn_budget_ms);
    macro_rules! check_budget {
        ($step:literal) => {
            if started_at.elapsed() > budget {
                return Err(crate::error::EngineError::Invariant(format!(
                    "turn exceeded its {}ms wall-clock budget during step {}",
                    content.constants.turn_budget_ms, $step
                )));
            }
        };
    }

    let mut messages = Vec::new();
    let mut events = Vec::new();

    // 1. apply-commands
    messages.extend(commands::apply_commands(state));
    check_budget!("apply-commands");

    // 2. first-step: lay mines, then decay all minefields 1%, drop <= 10.
    messages.extend(first_step(state));
    check_budget!("first-step");

    // 3. split-merge
    messages.extend(split_merge_step(state));

    // 4. scrap
    messages.extend(scrap_step(state, content));
    check_budget!("scrap");

    // 5. move-fleets
    messages.extend(move_fleets_step(state, content, rng));
    check_budget!("move-fleets");

    // 6. minefield-check
    messages.extend(minefield_check_step(state, rng));

    // 7. cleanup-fleets
    cleanup_fleets(state, &mut events);

    // 8. battles
    messages.extend(battle_step(state, content, rng));
    check_budget!("battles");

    // 9. cleanup-fleets
    cleanup_fleets(state, &mut events);

    // 10. victory-check (reserved no-op hook)
    victory_check(state);

    // 11. increment turn year; mark every empire as not-submitted
    state.meta.turn_year += 1;
    for empire in state.empires.values_mut() {
        empire.turn_submitted = false;
    }
    crate::types::emit(&mut events, Event::TurnGenerated { turn_year: state.meta.turn_year });

    // 12. star-update
    messages.extend(star_update_step(state, content));
    check_budget!("star-update");

    // 13. bombing
    messages.extend(bombing::run_bombing(state));

    // 14. post-bombing
    messages.extend(bombing::run_post_bombing(state, content));

    // 15. scan
    scanning::run_scanning(state, content);

    // 16. mineral-packet move
    messages.extend(move_packets_step(state));

    // 17. minefield visibility refresh
    scanning::refresh_minefield_visibility(state);

    tracing::info!(
        turn_year = state.meta.turn_year,
        duration_ms = started_at.elapsed().as_millis() as u64,
        message_count = messages.len(),
        engine_flag = ?state.meta.engine_flag,
        "turn generated"
    );

    Ok((messages, events))
}

fn first_step(state: &mut GameState) -> Vec<Message> {
    let mut messages = Vec::new();
    let layers: Vec<u64> = state
        .fleets
        .values()
        .filter(|f| matches!(f.waypoints.first().map(|w| &w.task), Some(WaypointTask::LayMines { .. })))
        .map(|f| f.key)
        .collect();

    for fleet_key in layers {
        let Some(fleet) = state.fleets.get(&fleet_key).cloned() else { continue };
        let Some(design) = state
            .empires
            .get(&fleet.owner)
            .and_then(|e| fleet.tokens.keys().find_map(|k| e.designs.get(k)))
        else {
            continue;
        };
        let Some(mine_type) = design.summary.mine_layer_type else { continue };
        if design.summary.mine_layer_rate == 0 {
            continue;
        }
        let mine_count = design.summary.mine_layer_rate * fleet.total_tokens();
        let (grid_x, grid_y) = crate::types::Minefield::grid_cell(fleet.position);
        let key = id::minefield_key(fleet.owner, mine_type, grid_x, grid_y);

        if let Some(field) = state.minefields.get_mut(&key) {
            field.mine_count += mine_count;
            messages.push(Message::new(fleet.owner, MessageKind::Info, format!("{} increased a minefield by {mine_count} mines", fleet.name)).with_fleet(fleet_key));
        } else {
            state.minefields.insert(
                key,
                Minefield { key, owner: fleet.owner, position: fleet.position, mine_count, mine_type },
            );
            messages.push(Message::new(fleet.owner, MessageKind::Info, format!("{} laid a new minefield", fleet.name)).with_fleet(fleet_key));
        }
    }

    // Minefields decay 1%/turn; fields with <= 10 mines are removed (§4.7 step 2).
    let mut empties = Vec::new();
    for field in state.minefields.values_mut() {
        field.mine_count -= field.mine_count / 100;
        if field.mine_count <= 10 {
            empties.push(field.key);
        }
    }
    for key in empties {
        state.minefields.remove(&key);
    }

    messages
}

fn split_merge_step(state: &mut GameState) -> Vec<Message> {
    for fleet in state.fleets.values_mut() {
        fleet.waypoints.retain(|wp| {
            !matches!(wp.task, WaypointTask::SplitMerge)
                && !matches!(&wp.task, WaypointTask::TransferCargo { amount, .. } if *amount == 0)
        });
        if fleet.waypoints.is_empty() {
            fleet.waypoints.push(crate::types::Waypoint::stationary(fleet.position, String::new()));
        }
    }
    Vec::new()
}

fn scrap_step(state: &mut GameState, content: &GameContent) -> Vec<Message> {
    let mut messages = Vec::new();
    let scrappers: Vec<u64> = state
        .fleets
        .values()
        .filter(|f| matches!(f.waypoints.first().map(|w| &w.task), Some(WaypointTask::Scrap)))
        .map(|f| f.key)
        .collect();

    for fleet_key in scrappers {
        let Some(mut fleet) = state.fleets.get(&fleet_key).cloned() else { continue };
        let destination = fleet.waypoints.first().map(|w| w.destination.clone()).unwrap_or_default();
        let target_star = state.stars.get_mut(&destination);

        let scrap_percent = target_star.as_ref().map_or(0.0, |s| if s.starbase_key.is_some() { 0.75 } else { 0.33 });
        let Some(empire) = state.empires.get(&fleet.owner) else { continue };
        let mut recovered = crate::types::Resources::default();
        for token in fleet.tokens.values() {
            if let Some(design) = empire.designs.get(&token.design_key) {
                recovered = recovered.add(design.summary.cost.scale_ceil(scrap_percent * f64::from(token.quantity)));
            }
        }

        let _ = content;
        if let Some(star) = state.stars.get_mut(&destination) {
            star.resources_on_hand = star.resources_on_hand.add(recovered);
        }
        fleet.tokens.clear();
        let message = Message::new(fleet.owner, MessageKind::Info, format!("{} has been scrapped", fleet.name)).with_fleet(fleet_key);
        state.fleets.insert(fleet_key, fleet);
        messages.push(message);
    }

    messages
}

/// A fleet counts as a starbase for movement purposes only if one of its
/// tokens is actually a starbase design — `in_orbit` just means "currently
/// parked at a star" and ordinary fleets carry it too between moves.
fn is_starbase_fleet(fleet: &crate::types::Fleet, state: &GameState) -> bool {
    let Some(empire) = state.empires.get(&fleet.owner) else { return false };
    fleet.tokens.keys().any(|k| empire.designs.get(k).is_some_and(|d| d.summary.is_starbase))
}

fn move_fleets_step(state: &mut GameState, content: &GameContent, rng: &mut impl Rng) -> Vec<Message> {
    let mut messages = Vec::new();
    let movable: Vec<u64> = state
        .fleets
        .values()
        .filter(|f| !is_starbase_fleet(f, state))
        .map(|f| f.key)
        .collect();

    for fleet_key in movable {
        let Some(mut fleet) = state.fleets.get(&fleet_key).cloned() else { continue };
        let Some(empire) = state.empires.get(&fleet.owner) else { continue };
        let Some(totals) = fleet_design_totals(&fleet, empire, content) else { continue };
        messages.extend(movement::advance_fleet(&mut fleet, totals.mass, totals.armour, &totals.engine, rng));
        apply_refuel_and_repair(state, &mut fleet, &totals);
        fleet.in_orbit = state.stars.values().find(|s| s.position == fleet.position).map(|s| s.name.clone());
        state.fleets.insert(fleet_key, fleet);
    }

    messages
}

struct FleetDesignTotals {
    mass: i64,
    armour: i64,
    engine: crate::types::EngineSpec,
    fuel_capacity: i64,
    has_dock: bool,
}

fn fleet_design_totals(fleet: &crate::types::Fleet, empire: &crate::types::EmpireData, _content: &GameContent) -> Option<FleetDesignTotals> {
    let mut mass = 0;
    let mut armour = 0;
    let mut engine = None;
    let mut fuel_capacity = 0;
    let mut has_dock = false;
    for token in fleet.tokens.values() {
        let design = empire.designs.get(&token.design_key)?;
        mass += design.summary.mass * i64::from(token.quantity);
        armour += design.summary.armour * i64::from(token.quantity);
        fuel_capacity = fuel_capacity.max(design.summary.fuel_capacity);
        has_dock |= design.summary.has_dock;
        engine.get_or_insert(design.summary.engine);
    }
    Some(FleetDesignTotals { mass, armour, engine: engine?, fuel_capacity, has_dock })
}

/// Refuel/repair after movement, before the next pipeline step (§4.2).
fn apply_refuel_and_repair(state: &GameState, fleet: &mut crate::types::Fleet, totals: &FleetDesignTotals) {
    let stopped = fleet.waypoints.first().is_none_or(|w| w.position == fleet.position);
    let star_here = state.stars.values().find(|s| s.position == fleet.position);

    let (refuel_fraction, repair_fraction) = match star_here {
        Some(star) if star.owner == fleet.owner => movement::repair_refuel_rate(true, star.starbase_key.is_some(), totals.has_dock, None, !stopped),
        Some(star) if star.is_owned() => {
            let relation = state.empires.get(&fleet.owner).map(|e| e.relation_with(star.owner));
            movement::repair_refuel_rate(false, false, false, relation, !stopped)
        }
        _ => movement::repair_refuel_rate(false, false, false, None, !stopped),
    };

    movement::apply_repair(fleet, totals.armour, repair_fraction, refuel_fraction, totals.fuel_capacity as f64);
}

fn minefield_check_step(state: &mut GameState, rng: &mut impl Rng) -> Vec<Message> {
    let mut messages = Vec::new();
    let fleet_keys: Vec<u64> = state.fleets.keys().copied().collect();
    for fleet_key in fleet_keys {
        messages.extend(movement::check_minefields(state, fleet_key, rng));
    }
    messages
}

/// Remove empty fleets and orphan starbases, decay salvage 30%/turn,
/// delete salvage once it's 3 turns old (§4.7 steps 7/9).
fn cleanup_fleets(state: &mut GameState, events: &mut Vec<EventEnvelope>) {
    let turn_year = state.meta.turn_year;
    let mut to_remove = Vec::new();

    for fleet in state.fleets.values_mut() {
        if let Some(created) = fleet.salvage_created_turn {
            if created != turn_year {
                fleet.cargo.ironium -= fleet.cargo.ironium * 3 / 10;
                fleet.cargo.boranium -= fleet.cargo.boranium * 3 / 10;
                fleet.cargo.germanium -= fleet.cargo.germanium * 3 / 10;
                if turn_year.saturating_sub(created) > 3 || fleet.cargo.mass() <= 0 {
                    to_remove.push(fleet.key);
                    continue;
                }
            }
        }
        if fleet.is_empty_of_ships() && fleet.cargo.mass() <= 0 {
            to_remove.push(fleet.key);
        }
    }

    for star in state.stars.values_mut() {
        if let Some(key) = star.starbase_key {
            if !state.fleets.contains_key(&key) {
                star.starbase_key = None;
            }
        }
    }

    for key in to_remove {
        state.fleets.remove(&key);
        for empire in state.empires.values_mut() {
            empire.owned_fleets.retain(|k| *k != key);
        }
        crate::types::emit(events, Event::FleetDestroyed { fleet_key: key });
    }
}

fn victory_check(_state: &GameState) {
    // Reserved hook; no victory condition is defined yet.
}

fn battle_step(state: &mut GameState, content: &GameContent, rng: &mut impl Rng) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut by_position: HashMap<(i64, i64), Vec<u64>> = HashMap::new();
    for fleet in state.fleets.values() {
        by_position.entry((fleet.position.x, fleet.position.y)).or_default().push(fleet.key);
    }

    let engine = engine_for(state.meta.engine_flag);
    for (_, fleet_keys) in by_position {
        let owners: std::collections::HashSet<u8> = fleet_keys.iter().filter_map(|k| state.fleets.get(k).map(|f| f.owner)).collect();
        if owners.len() < 2 {
            continue;
        }
        let position = state.fleets.get(&fleet_keys[0]).map_or(crate::types::Position::new(0, 0), |f| f.position);
        let engagement = Engagement { position, fleet_keys };
        let (_report, battle_messages) = engine.run_dyn(&engagement, state, content, rng);
        messages.extend(battle_messages);
    }

    messages
}

fn star_update_step(state: &mut GameState, content: &GameContent) -> Vec<Message> {
    let mut messages = Vec::new();
    let star_names: Vec<String> = state.stars.keys().cloned().collect();
    for name in star_names {
        let Some(owner) = state.stars.get(&name).map(|s| s.owner) else { continue };
        if owner == crate::types::NOBODY {
            continue;
        }
        let Some(mut empire) = state.empires.remove(&owner) else { continue };
        if let Some(star) = state.stars.get_mut(&name) {
            messages.extend(economy::tick_star_economy(star, &mut empire, content, &mut state.fleets));
        }
        state.empires.insert(owner, empire);
    }
    messages
}

/// Mineral packet motion: straight-line, erode 5%/turn, kill 3/4 of
/// destination population on arrival (§4.7 step 16).
fn move_packets_step(state: &mut GameState) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut arrived = Vec::new();

    for (index, packet) in state.packets.iter_mut().enumerate() {
        packet.position.x += packet.velocity.x;
        packet.position.y += packet.velocity.y;
        packet.cargo.ironium -= packet.cargo.ironium / 20;
        packet.cargo.boranium -= packet.cargo.boranium / 20;
        packet.cargo.germanium -= packet.cargo.germanium / 20;

        let Some(star) = state.stars.get(&packet.target_star) else { continue };
        if star.position == packet.position {
            arrived.push(index);
        }
    }

    for &index in arrived.iter().rev() {
        let packet = state.packets.remove(index);
        let Some(star) = state.stars.get_mut(&packet.target_star) else { continue };
        let before = star.colonists;
        star.colonists -= star.colonists * 3 / 4;
        star.resources_on_hand = star.resources_on_hand.add(crate::types::Resources::new(packet.cargo.ironium, packet.cargo.boranium, packet.cargo.germanium, 0));
        messages.push(Message::new(packet.owner, MessageKind::Info, format!("mineral packet arrived at {}", packet.target_star)));
        if star.owner != crate::types::NOBODY {
            messages.push(Message::new(star.owner, MessageKind::Bombing, format!("{} was struck by a mineral packet: {before} -> {} colonists", packet.target_star, star.colonists)));
        }
    }

    messages
}

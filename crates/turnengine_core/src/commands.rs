//! Command model (C2): tagged command variants, each with a `validate`/
//! `apply` pair. `apply_commands` drains each empire's per-turn stack in LIFO
//! order, exactly as `SPEC_FULL.md` §4.1 requires.

use crate::id::entity_key;
use crate::types::{
    EmpireData, GameState, Message, MessageKind, ProductionOrder, ShipDesign, TechLevel, Waypoint,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListMode {
    Add,
    Edit,
    Delete,
    Insert,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    Waypoint { mode: ListMode, fleet_key: u64, index: usize, payload: Option<Waypoint> },
    Design { mode: ListMode, design: Option<ShipDesign>, key: Option<u64> },
    Production { mode: ListMode, star: String, index: usize, order: Option<ProductionOrder> },
    Research { budget_percent: u8, priority: TechLevel },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub empire: u8,
    pub command: Command,
}

/// Pure check against the empire snapshot. Must not mutate. Returning
/// `Ok(None)` means valid; `Ok(Some(message))` means a soft rejection.
fn validate(empire: &EmpireData, command: &Command) -> Result<(), Message> {
    match command {
        Command::Waypoint { fleet_key, .. } => {
            if empire.owned_fleets.contains(fleet_key) {
                Ok(())
            } else {
                Err(invalid(empire.id, "waypoint: fleet not owned"))
            }
        }
        Command::Design { mode, design, key } => match mode {
            ListMode::Add => {
                let Some(design) = design else {
                    return Err(invalid(empire.id, "design: add requires a design payload"));
                };
                if empire.designs.contains_key(&design.key) {
                    Err(invalid(empire.id, "design: duplicate key"))
                } else {
                    Ok(())
                }
            }
            ListMode::Edit | ListMode::Delete => {
                let Some(key) = key else {
                    return Err(invalid(empire.id, "design: edit/delete requires a key"));
                };
                if empire.designs.contains_key(key) {
                    Ok(())
                } else {
                    Err(invalid(empire.id, "design: unknown key"))
                }
            }
            ListMode::Insert => Err(invalid(empire.id, "design: insert is not a valid mode")),
        },
        Command::Production { star, index, mode, .. } => {
            if !empire.owned_stars.contains(star) {
                return Err(invalid(empire.id, "production: star not owned"));
            }
            if matches!(mode, ListMode::Edit | ListMode::Delete) {
                // Range-checked against the actual queue length by the caller
                // (apply_commands), since validate only has the empire, not
                // the star's production queue. Index bounds are re-checked
                // there; an out-of-range index is a soft error, not fatal.
                let _ = index;
            }
            Ok(())
        }
        Command::Research { budget_percent, priority } => {
            if *budget_percent > 100 {
                return Err(invalid(empire.id, "research: budget out of range"));
            }
            let unchanged = *budget_percent == empire.research.budget_percent
                && priority.0 == empire.research.priority.0;
            if unchanged {
                Err(invalid(empire.id, "research: no-op command"))
            } else {
                Ok(())
            }
        }
    }
}

fn invalid(empire: u8, detail: &str) -> Message {
    Message::new(empire, MessageKind::InvalidCommand, format!("Invalid Command: {detail}"))
}

fn apply_waypoint(empire: &mut EmpireData, mode: ListMode, index: usize, payload: Option<Waypoint>, fleet: &mut crate::types::Fleet) -> Option<Message> {
    match mode {
        ListMode::Add => {
            if let Some(wp) = payload {
                fleet.waypoints.push(wp);
            }
            None
        }
        ListMode::Insert => {
            if let Some(wp) = payload {
                let at = index.min(fleet.waypoints.len());
                fleet.waypoints.insert(at, wp);
            }
            None
        }
        ListMode::Edit => {
            if index < fleet.waypoints.len() {
                fleet.waypoints.remove(index);
                if let Some(wp) = payload {
                    let at = index.min(fleet.waypoints.len());
                    fleet.waypoints.insert(at, wp);
                }
                None
            } else {
                Some(invalid(empire.id, "waypoint: edit index out of range"))
            }
        }
        ListMode::Delete => {
            if index < fleet.waypoints.len() {
                fleet.waypoints.remove(index);
                None
            } else {
                Some(invalid(empire.id, "waypoint: delete index out of range"))
            }
        }
    }
}

fn apply_design(
    empire: &mut EmpireData,
    state: &mut GameState,
    mode: ListMode,
    design: Option<ShipDesign>,
    key: Option<u64>,
) -> Option<Message> {
    match mode {
        ListMode::Add => {
            if let Some(design) = design {
                empire.designs.insert(design.key, design);
            }
            None
        }
        ListMode::Edit => {
            if let Some(key) = key {
                if let Some(d) = empire.designs.get_mut(&key) {
                    d.obsolete = !d.obsolete;
                }
            }
            None
        }
        ListMode::Delete => {
            let Some(key) = key else { return None };
            empire.designs.remove(&key);
            for fleet_key in &empire.owned_fleets {
                if let Some(fleet) = state.fleets.get_mut(fleet_key) {
                    fleet.tokens.remove(&key);
                }
            }
            empire.owned_fleets.retain(|fk| {
                state.fleets.get(fk).is_none_or(|f| !f.is_empty_of_ships())
            });
            empire.fleet_reports.retain(|fk, _| empire.owned_fleets.contains(fk));
            None
        }
        ListMode::Insert => None,
    }
}

fn apply_production(
    empire: &EmpireData,
    star: &mut crate::types::Star,
    mode: ListMode,
    index: usize,
    order: Option<ProductionOrder>,
) -> Option<Message> {
    match mode {
        ListMode::Add => {
            if let Some(order) = order {
                let at = index.min(star.production_queue.len());
                star.production_queue.insert(at, order);
            }
            None
        }
        ListMode::Edit => {
            if index < star.production_queue.len() {
                if let Some(order) = order {
                    star.production_queue[index] = order;
                }
                None
            } else {
                Some(invalid(empire.id, "production: edit index out of range"))
            }
        }
        ListMode::Delete => {
            if index < star.production_queue.len() {
                star.production_queue.remove(index);
                None
            } else {
                Some(invalid(empire.id, "production: delete index out of range"))
            }
        }
        ListMode::Insert => None,
    }
}

fn apply_research(empire: &mut EmpireData, budget_percent: u8, priority: TechLevel) {
    empire.research.budget_percent = budget_percent;
    empire.research.priority = priority;
}

/// Drain each empire's command stack in LIFO order and apply the validated
/// ones, appending one `Invalid Command` message per rejection (§4.1, §4.8).
/// Empires are iterated in ascending id for determinism (§5).
pub fn apply_commands(state: &mut GameState) -> Vec<Message> {
    let mut messages = Vec::new();
    let mut empire_ids: Vec<u8> = state.empires.keys().copied().collect();
    empire_ids.sort_unstable();

    for empire_id in empire_ids {
        let Some(mut stack) = state.empires.get(&empire_id).map(|e| e.command_stack.clone()) else {
            continue;
        };
        stack.reverse(); // LIFO: last submitted first.

        for command in stack {
            let Some(empire) = state.empires.get(&empire_id) else { continue };
            let verdict = validate(empire, &command);
            let Err(rejection) = verdict else {
                apply_one(state, empire_id, command, &mut messages);
                continue;
            };
            messages.push(rejection);
        }

        if let Some(empire) = state.empires.get_mut(&empire_id) {
            empire.command_stack.clear();
        }
    }

    messages
}

fn apply_one(state: &mut GameState, empire_id: u8, command: Command, messages: &mut Vec<Message>) {
    match command {
        Command::Waypoint { mode, fleet_key, index, payload } => {
            let Some(fleet) = state.fleets.get_mut(&fleet_key) else { return };
            let Some(empire) = state.empires.get_mut(&empire_id) else { return };
            if let Some(msg) = apply_waypoint(empire, mode, index, payload, fleet) {
                messages.push(msg);
            }
        }
        Command::Design { mode, design, key } => {
            let Some(mut empire) = state.empires.remove(&empire_id) else { return };
            let msg = apply_design(&mut empire, state, mode, design, key);
            state.empires.insert(empire_id, empire);
            if let Some(msg) = msg {
                messages.push(msg);
            }
        }
        Command::Production { mode, star, index, order } => {
            let Some(empire) = state.empires.get(&empire_id) else { return };
            let Some(star) = state.stars.get_mut(&star) else { return };
            if let Some(msg) = apply_production(empire, star, mode, index, order) {
                messages.push(msg);
            }
        }
        Command::Research { budget_percent, priority } => {
            if let Some(empire) = state.empires.get_mut(&empire_id) {
                apply_research(empire, budget_percent, priority);
            }
        }
    }
}

/// Allocate the next fleet/design key for an empire (monotonic counter, §3).
pub fn next_fleet_key(empire: &mut EmpireData) -> u64 {
    let counter = empire.next_fleet_counter;
    empire.next_fleet_counter += 1;
    entity_key(empire.id, counter)
}

pub fn next_design_key(empire: &mut EmpireData) -> u64 {
    let counter = empire.next_design_counter;
    empire.next_design_counter += 1;
    entity_key(empire.id, counter)
}

#[cfg(all(test, feature = "test-support"))]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_empire, base_state};

    #[test]
    fn research_no_op_is_rejected() {
        let mut state = base_state();
        let empire = state.empires.get_mut(&1).unwrap();
        empire.research.budget_percent = 50;
        let command = Command::Research { budget_percent: 50, priority: empire.research.priority.clone() };
        assert!(validate(empire, &command).is_err());
    }

    #[test]
    fn research_change_is_accepted() {
        let empire = base_empire(1);
        let command = Command::Research { budget_percent: 75, priority: TechLevel::default() };
        assert!(validate(&empire, &command).is_ok());
    }

    #[test]
    fn waypoint_delete_out_of_range_is_soft_error() {
        let mut state = base_state();
        let empire = state.empires.get(&1).unwrap().clone();
        let fleet_key = empire.owned_fleets[0];
        state.empires.get_mut(&1).unwrap().command_stack.push(Command::Waypoint {
            mode: ListMode::Delete,
            fleet_key,
            index: 99,
            payload: None,
        });
        let messages = apply_commands(&mut state);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::InvalidCommand);
    }
}

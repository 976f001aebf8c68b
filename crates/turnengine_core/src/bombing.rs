//! Bombing, colonisation, and invasion (C6). Runs after battles resolve and
//! before scanning (§4.5, §4.7 steps 13-14).

use crate::types::{Fleet, GameState, Message, MessageKind, Relation, Star, WaypointTask};

/// Kill-rate bombing against a planet's colonists (§4.5). `defense_coverage`
/// is in `[0, 1]`, derived from the target star's defenses.
#[must_use]
pub fn bomb_colonists(colonists: i64, kill_rate: f64, defense_coverage: f64) -> i64 {
    let killed = (colonists as f64 * kill_rate * (1.0 - defense_coverage)).floor() as i64;
    (colonists - killed).max(0)
}

#[must_use]
pub fn defense_coverage(defenses: u32) -> f64 {
    (f64::from(defenses) / f64::from(crate::types::MAX_DEFENSES)).clamp(0.0, 0.99)
}

/// Run bombing for every bomber fleet orbiting a star it considers hostile.
pub fn run_bombing(state: &mut GameState) -> Vec<Message> {
    let mut messages = Vec::new();
    let bomber_keys: Vec<u64> = state
        .fleets
        .values()
        .filter(|f| f.in_orbit.is_some())
        .map(|f| f.key)
        .collect();

    for fleet_key in bomber_keys {
        let Some(fleet) = state.fleets.get(&fleet_key).cloned() else { continue };
        let Some(star_name) = fleet.in_orbit.clone() else { continue };
        let Some(star) = state.stars.get(&star_name) else { continue };
        if !star.is_owned() || star.owner == fleet.owner {
            continue;
        }
        let Some(owner) = state.empires.get(&fleet.owner) else { continue };
        let relation = owner.relation_with(star.owner);
        if relation != Relation::Enemy {
            continue;
        }

        // Any design with a positive bomb kill rate contributes; designs are
        // looked up per token so mixed fleets only bomb with their bombers.
        let mut total_kill_rate = 0.0;
        for token in fleet.tokens.values() {
            if let Some(design) = owner.designs.get(&token.design_key) {
                if design.summary.is_bomber && design.summary.bomb_kill_rate > 0.0 {
                    total_kill_rate += design.summary.bomb_kill_rate;
                }
            }
        }
        if total_kill_rate <= 0.0 {
            continue;
        }

        let Some(star) = state.stars.get_mut(&star_name) else { continue };
        let coverage = defense_coverage(star.defenses);
        let before = star.colonists;
        star.colonists = bomb_colonists(star.colonists, total_kill_rate.min(1.0), coverage);
        if star.colonists != before {
            messages.push(Message::new(fleet.owner, MessageKind::Bombing, format!("bombed {star_name}: {before} -> {}", star.colonists)).with_fleet(fleet_key));
        }
        if star.colonists == 0 && before > 0 {
            let previous_owner = star.owner;
            star.depopulate();
            messages.push(Message::new(previous_owner, MessageKind::Bombing, format!("{star_name} has been depopulated")));
        }
    }

    messages
}

/// Colonisation eligibility check (§4.5).
#[must_use]
pub fn can_colonise(fleet: &Fleet, design_has_colonisation_module: bool, target: &Star) -> bool {
    design_has_colonisation_module && fleet.cargo.colonists_kt >= 1 && !target.is_owned()
}

/// Apply a successful colonisation: transfer cargo into the star, consuming
/// the colonising token and zeroing the fleet's cargo.
pub fn apply_colonisation(fleet: &mut Fleet, star: &mut Star, colonising_design_key: u64) {
    star.owner = fleet.owner;
    star.colonists = fleet.cargo.colonists();
    star.resources_on_hand = star.resources_on_hand.add(crate::types::Resources::new(
        fleet.cargo.ironium,
        fleet.cargo.boranium,
        fleet.cargo.germanium,
        0,
    ));
    fleet.cargo = crate::types::Cargo::default();
    fleet.tokens.remove(&colonising_design_key);
}

/// Invasion outcome: `(invaders_win, survivors)`. `survivors` populate the
/// winning side; the losing side is wiped out (§4.5, §8 scenario 5).
#[must_use]
pub fn resolve_invasion(invader_colonists: i64, defender_colonists: i64) -> (bool, i64) {
    let invader_strength = invader_colonists as f64 * 1.1;
    let defender_strength = defender_colonists as f64;

    if invader_strength > defender_strength {
        let ratio = defender_strength / invader_strength;
        let survivors = (invader_colonists as f64 * (1.0 - ratio * 0.9)).floor() as i64;
        (true, survivors.max(1))
    } else {
        let ratio = invader_strength / defender_strength.max(1.0);
        let survivors = (defender_colonists as f64 * (1.0 - ratio * 0.9)).floor() as i64;
        (false, survivors.max(1))
    }
}

/// Run the invasion (or colonisation) task for one fleet at its current
/// waypoint, per the command's task kind (§4.5, §4.7 step 14).
pub fn run_post_bombing(state: &mut GameState, content: &crate::types::GameContent) -> Vec<Message> {
    let mut messages = Vec::new();
    let candidates: Vec<u64> = state
        .fleets
        .values()
        .filter(|f| matches!(f.waypoints.first().map(|w| &w.task), Some(WaypointTask::Colonise) | Some(WaypointTask::Invade)))
        .map(|f| f.key)
        .collect();

    for fleet_key in candidates {
        let Some(fleet) = state.fleets.get(&fleet_key).cloned() else { continue };
        let Some(waypoint) = fleet.waypoints.first() else { continue };
        if waypoint.position != fleet.position {
            continue;
        }
        let star_name = waypoint.destination.clone();
        let task = waypoint.task.clone();

        match task {
            WaypointTask::Colonise => {
                let Some(owner) = state.empires.get(&fleet.owner) else { continue };
                let colonising_token = fleet.tokens.keys().find(|k| owner.designs.get(*k).is_some_and(|d| d.summary.has_colonisation_module));
                let Some(&design_key) = colonising_token else { continue };
                let Some(star) = state.stars.get(&star_name) else { continue };
                if !can_colonise(&fleet, true, star) {
                    continue;
                }
                let Some(fleet) = state.fleets.get_mut(&fleet_key) else { continue };
                let Some(star) = state.stars.get_mut(&star_name) else { continue };
                apply_colonisation(fleet, star, design_key);
                messages.push(Message::new(fleet.owner, MessageKind::Colonisation, format!("colonised {star_name}")).with_fleet(fleet_key));
            }
            WaypointTask::Invade => {
                apply_invasion(state, content, fleet_key, &star_name, &mut messages);
            }
            _ => {}
        }
    }

    messages
}

fn apply_invasion(state: &mut GameState, _content: &crate::types::GameContent, fleet_key: u64, star_name: &str, messages: &mut Vec<Message>) {
    let Some(fleet) = state.fleets.get(&fleet_key).cloned() else { return };
    let Some(star) = state.stars.get(star_name) else { return };
    if !star.is_owned() || star.owner == fleet.owner {
        return;
    }

    let (invaders_win, survivors) = resolve_invasion(fleet.cargo.colonists(), star.colonists);
    let defender_owner = star.owner;

    let Some(star) = state.stars.get_mut(star_name) else { return };
    if invaders_win {
        star.owner = fleet.owner;
        star.colonists = survivors;
        messages.push(Message::new(fleet.owner, MessageKind::Invasion, format!("invaded and took {star_name}")).with_fleet(fleet_key));
        messages.push(Message::new(defender_owner, MessageKind::Invasion, format!("{star_name} was invaded and lost")));
    } else {
        star.colonists = survivors;
        messages.push(Message::new(fleet.owner, MessageKind::Invasion, format!("invasion of {star_name} repelled")).with_fleet(fleet_key));
    }

    if let Some(fleet) = state.fleets.get_mut(&fleet_key) {
        fleet.cargo.colonists_kt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_5_invasion_tie_breaker() {
        let (invaders_win, survivors) = resolve_invasion(10_000, 10_000);
        assert!(invaders_win);
        assert_eq!(survivors, 1_818);
    }

    #[test]
    fn defender_wins_when_stronger() {
        let (invaders_win, survivors) = resolve_invasion(1_000, 10_000);
        assert!(!invaders_win);
        assert!(survivors > 0);
    }

    #[test]
    fn bombing_depopulates_at_zero() {
        let remaining = bomb_colonists(100, 1.0, 0.0);
        assert_eq!(remaining, 0);
    }
}

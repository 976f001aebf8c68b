//! Production & economy (C4): mining, resource income, research allocation
//! and level-up, manufacturing queue, population growth.

use crate::types::{EmpireData, Environment, Fleet, GameContent, Message, MessageKind, ProductionKind, RaceDef, Resources, ShipToken, Star, Waypoint};
use std::collections::HashMap;

/// Star carrying capacity derived from habitability. `SPEC_FULL.md`'s growth
/// scenarios supply `max_population` directly rather than deriving it, so
/// this uses the conventional model: a 1,000,000-colonist baseline scaled by
/// the positive portion of habitability (`calculate_growth` substitutes its
/// own 250,000 floor whenever `hab_value` is negative).
#[must_use]
pub fn max_population_for(environment: Environment, race: &RaceDef) -> f64 {
    let hab = race.hab_value(environment, race.ideal_environment);
    (1_000_000.0 * hab).max(1.0)
}

/// Mining yield for one mineral this turn and the concentration decay it
/// causes (§4.3 step 1). Returns `(mined_amount, new_concentration)`.
#[must_use]
pub fn mine_mineral(mines_built: u32, colonists: i64, race: &RaceDef, concentration: i32) -> (f64, i32) {
    let operable_mines = (colonists as f64 / 10_000.0) * race.operable_mines;
    let mines_in_use = f64::from(mines_built).min(operable_mines);
    let rate = (mines_in_use / 10.0) * race.mine_production * (f64::from(concentration) / 100.0);
    let decay = ((rate * f64::from(concentration)) / 12_500.0).floor() as i32;
    let new_concentration = (concentration - decay).max(1);
    (rate, new_concentration)
}

/// Resources produced this turn (§4.3 step 2).
#[must_use]
pub fn resources_per_year(colonists: i64, factories_built: u32, race: &RaceDef) -> f64 {
    let operable_factories = (colonists as f64 / 10_000.0) * race.operable_factories;
    let factories_in_use = f64::from(factories_built).min(operable_factories);
    (colonists as f64 / race.colonists_per_resource) + (factories_in_use / 10.0) * race.factory_production
}

/// Integer research cost to go from `level` to `level + 1` (§4.3 step 3).
#[must_use]
pub fn level_up_cost(level: u32) -> i64 {
    (50.0 * 1.75_f64.powi(level as i32)) as i64
}

/// Apply research points to the empire's highest-weighted field, handling
/// possibly multiple level-ups in one turn with carry-over (§4.3 step 3).
pub fn apply_research_points(empire: &mut EmpireData, mut points: f64) {
    let field = empire.tech_levels.highest_weighted(&empire.research.priority);
    let mut level = empire.tech_levels.get(field);
    let mut accumulated = empire.research_accumulated + points;
    loop {
        let cost = level_up_cost(level) as f64;
        if accumulated < cost {
            break;
        }
        accumulated -= cost;
        level += 1;
        empire.tech_levels.set(field, level);
    }
    empire.research_accumulated = accumulated;
    points = 0.0;
    let _ = points;
}

/// Population growth curve (§4.3, the crowding-factor table).
#[must_use]
pub fn calculate_growth(colonists: i64, max_population: f64, growth_rate_percent: f64, hab_value: f64, hyper_expansion: bool) -> i64 {
    let mut g = growth_rate_percent / 100.0;
    if hyper_expansion {
        g *= crate::types::GROWTH_FACTOR_HYPER_EXPANSION;
    }
    let mut max_pop = max_population;
    if hyper_expansion {
        max_pop *= crate::types::POPULATION_FACTOR_HYPER_EXPANSION;
    }
    if hab_value < 0.0 {
        max_pop = 250_000.0;
    }
    let pop = colonists as f64;
    let c = if max_pop > 0.0 { pop / max_pop } else { 0.0 };

    #[allow(clippy::float_cmp)]
    let delta = if hab_value < 0.0 {
        0.1 * pop * hab_value
    } else if c < 0.25 {
        pop * g * hab_value
    } else if c < 1.0 {
        pop * g * hab_value * crate::types::BASE_CROWDING_FACTOR * (1.0 - c).powi(2)
    } else if c == 1.0 {
        0.0
    } else if c < 4.0 {
        pop * (c - 1.0) * -0.04
    } else {
        -0.12 * pop
    };

    let truncated = delta.trunc() as i64;
    (truncated / 100) * 100
}

/// Run the full per-star economic step for one turn, mutating the star and
/// empire in place and returning any messages produced (§4.3 steps 1-6).
pub fn tick_star_economy(star: &mut Star, empire: &mut EmpireData, content: &GameContent, fleets: &mut HashMap<u64, Fleet>) -> Vec<Message> {
    let mut messages = Vec::new();
    if star.colonists <= 0 {
        return messages;
    }
    let Some(race) = content.races.get(&empire.race) else { return messages };

    // 1. Mining.
    let (ironium_rate, new_ironium) = mine_mineral(star.mines, star.colonists, race, star.concentration.ironium);
    let (boranium_rate, new_boranium) = mine_mineral(star.mines, star.colonists, race, star.concentration.boranium);
    let (germanium_rate, new_germanium) = mine_mineral(star.mines, star.colonists, race, star.concentration.germanium);
    star.resources_on_hand.ironium += ironium_rate as i64;
    star.resources_on_hand.boranium += boranium_rate as i64;
    star.resources_on_hand.germanium += germanium_rate as i64;
    star.concentration.ironium = new_ironium;
    star.concentration.boranium = new_boranium;
    star.concentration.germanium = new_germanium;

    // 2. Resources/year.
    let income = resources_per_year(star.colonists, star.factories, race);
    star.resources_on_hand.energy += income as i64;

    // 3. Research allocation.
    let research_points = if empire.research.only_leftover {
        0.0
    } else {
        income * f64::from(empire.research.budget_percent) / 100.0
    };
    let spendable_energy = (income - research_points).max(0.0) as i64;
    if research_points > 0.0 {
        let before = empire.tech_levels.get(empire.tech_levels.highest_weighted(&empire.research.priority));
        apply_research_points(empire, research_points);
        let field = empire.tech_levels.highest_weighted(&empire.research.priority);
        let after = empire.tech_levels.get(field);
        if after > before {
            messages.push(Message::new(empire.id, MessageKind::Research, format!("{field:?} reached level {after}")));
        }
    }

    // 5. Population update runs between research (3) and manufacturing (4)
    // so colonists grown this turn don't operate new factories until next
    // turn's mining/resources pass.
    let hab_value = race.hab_value(star.environment, race.ideal_environment);
    let delta = calculate_growth(star.colonists, max_population_for(star.environment, race), race.growth_rate, hab_value, race.hyper_expansion);
    star.colonists = (star.colonists + delta).max(0);

    // 4. Manufacturing.
    let mut available = Resources { energy: spendable_energy, ..star.resources_on_hand };
    run_manufacturing_queue(star, &mut available, empire, fleets, &mut messages);
    star.resources_on_hand = available;

    // 6. Leftover research sweep.
    if !empire.research.only_leftover && star.resources_on_hand.energy > 0 {
        apply_research_points(empire, star.resources_on_hand.energy as f64);
        star.resources_on_hand.energy = 0;
    }

    messages
}

fn run_manufacturing_queue(
    star: &mut Star,
    available: &mut Resources,
    empire: &mut EmpireData,
    fleets: &mut HashMap<u64, Fleet>,
    messages: &mut Vec<Message>,
) {
    for idx in 0..star.production_queue.len() {
        loop {
            let order = &mut star.production_queue[idx];
            let unit_cost = unit_cost_for(order.kind);
            let Some(remaining) = unit_cost.checked_sub(order.resources_spent) else { break };
            if available.checked_sub(remaining).is_none() {
                if order.auto_build {
                    break;
                }
                let partial = clamp_affordable(*available, remaining);
                order.resources_spent = order.resources_spent.add(partial);
                *available = available.checked_sub(partial).unwrap_or_default();
                break;
            }
            *available = available.checked_sub(remaining).unwrap_or_default();
            order.resources_spent = Resources::default();
            order.quantity = order.quantity.saturating_sub(1);
            let kind = order.kind;
            let design_key = order.design_key;
            let done = order.quantity == 0;

            complete_one_unit(star, kind, design_key, empire, fleets, messages);

            if done {
                break;
            }
        }
    }
    star.production_queue.retain(|o| o.quantity > 0);
}

fn clamp_affordable(available: Resources, needed: Resources) -> Resources {
    Resources {
        ironium: available.ironium.min(needed.ironium),
        boranium: available.boranium.min(needed.boranium),
        germanium: available.germanium.min(needed.germanium),
        energy: available.energy.min(needed.energy),
    }
}

fn unit_cost_for(kind: ProductionKind) -> Resources {
    match kind {
        ProductionKind::Factory => Resources::new(4, 0, 4, 0),
        ProductionKind::Mine => Resources::new(3, 0, 2, 0),
        ProductionKind::Defense => Resources::new(5, 5, 5, 0),
        ProductionKind::Terraform => Resources::new(0, 0, 0, 100),
        ProductionKind::Ship | ProductionKind::Starbase => Resources::new(10, 10, 10, 0),
        ProductionKind::Packet => Resources::new(0, 0, 0, 0),
        ProductionKind::Alchemy => Resources::new(0, 0, 0, 100),
    }
}

fn complete_one_unit(
    star: &mut Star,
    kind: ProductionKind,
    design_key: Option<u64>,
    empire: &mut EmpireData,
    fleets: &mut HashMap<u64, Fleet>,
    messages: &mut Vec<Message>,
) {
    match kind {
        ProductionKind::Factory => star.factories += 1,
        ProductionKind::Mine => star.mines += 1,
        ProductionKind::Defense => star.add_defenses(1),
        ProductionKind::Terraform => {}
        ProductionKind::Ship | ProductionKind::Starbase => build_ship(star, design_key, empire, fleets, messages),
        ProductionKind::Packet | ProductionKind::Alchemy => {}
    }
}

/// Deliver one completed hull: merge into an existing same-design fleet
/// already parked at this star, or commission a fresh one (§4.3 step 4).
fn build_ship(star: &mut Star, design_key: Option<u64>, empire: &mut EmpireData, fleets: &mut HashMap<u64, Fleet>, messages: &mut Vec<Message>) {
    let Some(design_key) = design_key else {
        messages.push(Message::new(star.owner, MessageKind::Production, format!("{}: ship order missing a design, dropped", star.name)));
        return;
    };
    let Some(design) = empire.designs.get(&design_key) else {
        messages.push(Message::new(star.owner, MessageKind::Production, format!("{}: unknown design, order dropped", star.name)));
        return;
    };

    let existing_fleet = fleets
        .values_mut()
        .find(|f| f.owner == star.owner && f.position == star.position && f.name == design.name);

    if let Some(fleet) = existing_fleet {
        fleet
            .tokens
            .entry(design_key)
            .and_modify(|t| t.quantity += 1)
            .or_insert(ShipToken { design_key, quantity: 1, armour: design.summary.armour, shields: design.summary.shields });
        messages.push(Message::new(star.owner, MessageKind::Production, format!("{}: {} joins the fleet at {}", star.name, design.name, star.name)));
        return;
    }

    let key = crate::id::entity_key(star.owner, empire.next_fleet_counter);
    empire.next_fleet_counter += 1;
    empire.owned_fleets.push(key);

    let mut tokens = HashMap::new();
    tokens.insert(design_key, ShipToken { design_key, quantity: 1, armour: design.summary.armour, shields: design.summary.shields });

    fleets.insert(
        key,
        Fleet {
            key,
            name: design.name.clone(),
            owner: star.owner,
            position: star.position,
            in_orbit: Some(star.name.clone()),
            tokens,
            waypoints: vec![Waypoint::stationary(star.position, star.name.clone())],
            cargo: crate::types::Cargo::default(),
            fuel_available: design.summary.fuel_capacity as f64,
            battle_plan_name: String::new(),
            salvage_created_turn: None,
        },
    );

    if design.summary.is_starbase {
        star.starbase_key = Some(key);
    }

    messages.push(Message::new(star.owner, MessageKind::Production, format!("{}: {} commissioned", star.name, design.name)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_growth_at_low_capacity() {
        let delta = calculate_growth(10_000, 1_000_000.0, 15.0, 1.0, false);
        assert_eq!(delta, 1_500);
    }

    #[test]
    fn scenario_2_growth_overcrowded() {
        let delta = calculate_growth(2_000_000, 1_000_000.0, 15.0, 0.5, false);
        assert_eq!(delta, -80_000);
    }

    #[test]
    fn scenario_3_mining_decay() {
        let race = RaceDef {
            name: "test".into(),
            growth_rate: 15.0,
            colonists_per_resource: 1000.0,
            factory_production: 10.0,
            operable_factories: 1.0,
            mine_production: 10.0,
            operable_mines: 1.0,
            hyper_expansion: false,
            ideal_environment: Environment { gravity: 50, temperature: 50, radiation: 50 },
        };
        let (rate, new_concentration) = mine_mineral(30, 300_000, &race, 50);
        assert!((rate - 15.0).abs() < 1e-9);
        assert_eq!(new_concentration, 50);
    }

    #[test]
    fn level_up_cost_matches_formula() {
        assert_eq!(level_up_cost(0), 50);
        assert_eq!(level_up_cost(1), 87);
    }
}

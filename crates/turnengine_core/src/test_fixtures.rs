//! Deterministic fixtures for unit and scenario tests (feature `test-support`).
//! Mirrors the teacher's `sim_core` fixture module: small, hand-built content
//! and state that every test can build on without repeating boilerplate.

use crate::types::{
    Constants, EmpireData, Environment, Fleet, GameContent, GameMeta, GameState, HullDef, MineralConcentration, RaceDef, ResearchSettings,
    ShipToken, Star, TechLevel,
};
use std::collections::HashMap;

#[must_use]
pub fn base_content() -> GameContent {
    let mut races = HashMap::new();
    races.insert(
        "Humanoid".to_string(),
        RaceDef {
            name: "Humanoid".to_string(),
            growth_rate: 15.0,
            colonists_per_resource: 1000.0,
            factory_production: 10.0,
            operable_factories: 10.0,
            mine_production: 10.0,
            operable_mines: 10.0,
            hyper_expansion: false,
            ideal_environment: Environment { gravity: 50, temperature: 50, radiation: 50 },
        },
    );

    let mut hulls = HashMap::new();
    hulls.insert(
        "Scout".to_string(),
        HullDef { name: "Scout".to_string(), base_armour: 100, base_fuel_capacity: 300, base_cargo_capacity: 0, is_starbase: false, has_dock: false, slot_count: 2 },
    );

    GameContent { content_version: "test-fixture".to_string(), races, hulls, components: HashMap::new(), constants: Constants::default() }
}

#[must_use]
pub fn base_empire(id: u8) -> EmpireData {
    EmpireData {
        id,
        race: "Humanoid".to_string(),
        turn_submitted: false,
        research: ResearchSettings { budget_percent: 25, priority: TechLevel::default(), only_leftover: false },
        research_accumulated: 0.0,
        tech_levels: TechLevel::default(),
        owned_stars: vec!["Homeworld".to_string()],
        owned_fleets: vec![crate::id::entity_key(id, 0)],
        designs: HashMap::new(),
        star_reports: HashMap::new(),
        fleet_reports: HashMap::new(),
        empire_reports: HashMap::new(),
        battle_plans: Vec::new(),
        visible_minefields: Vec::new(),
        next_fleet_counter: 1,
        next_design_counter: 0,
        command_stack: Vec::new(),
    }
}

#[must_use]
pub fn base_star(owner: u8) -> Star {
    Star {
        name: "Homeworld".to_string(),
        position: crate::types::Position::new(0, 0),
        environment: Environment { gravity: 50, temperature: 50, radiation: 50 },
        original_environment: Environment { gravity: 50, temperature: 50, radiation: 50 },
        concentration: MineralConcentration { ironium: 50, boranium: 50, germanium: 50 },
        resources_on_hand: crate::types::Resources::default(),
        colonists: 10_000,
        factories: 10,
        mines: 10,
        defenses: 0,
        production_queue: Vec::new(),
        starbase_key: None,
        owner,
        spectral_class: "G".to_string(),
        luminosity_class: "V".to_string(),
    }
}

#[must_use]
pub fn base_fleet(owner: u8) -> Fleet {
    let key = crate::id::entity_key(owner, 0);
    let mut tokens = HashMap::new();
    tokens.insert(9_999, ShipToken { design_key: 9_999, quantity: 1, armour: 100, shields: 50 });
    Fleet {
        key,
        name: format!("Scout #{owner}"),
        owner,
        position: crate::types::Position::new(0, 0),
        in_orbit: Some("Homeworld".to_string()),
        tokens,
        waypoints: vec![crate::types::Waypoint::stationary(crate::types::Position::new(0, 0), "Homeworld")],
        cargo: crate::types::Cargo::default(),
        fuel_available: 300.0,
        battle_plan_name: String::new(),
        salvage_created_turn: None,
    }
}

#[must_use]
pub fn base_state() -> GameState {
    let empire = base_empire(1);
    let star = base_star(1);
    let fleet = base_fleet(1);

    let mut stars = HashMap::new();
    stars.insert(star.name.clone(), star);
    let mut fleets = HashMap::new();
    fleets.insert(fleet.key, fleet);
    let mut empires = HashMap::new();
    empires.insert(1, empire);

    GameState {
        meta: GameMeta { seed: 42, turn_year: crate::types::STARTING_YEAR, engine_flag: crate::types::BattleEngineKind::Standard },
        stars,
        fleets,
        minefields: HashMap::new(),
        packets: Vec::new(),
        empires,
        messages: Vec::new(),
    }
}

//! Scanning & intel (C7): rebuild every empire's star/fleet/empire report
//! maps and visible-minefield list at the end of each turn (§4.6).

use crate::types::{EmpireData, Fleet, GameContent, GameState, ScanLevel, Star, StarReport};
use std::collections::HashMap;

/// Scanner reach for one source: `(position, scan_range, pen_scan_range)`.
struct ScannerSource {
    position: crate::types::Position,
    scan_range: f64,
    pen_scan_range: f64,
}

fn scanner_sources(state: &GameState, empire_id: u8) -> Vec<ScannerSource> {
    let Some(empire) = state.empires.get(&empire_id) else { return Vec::new() };
    let mut sources = Vec::new();

    for star_name in &empire.owned_stars {
        let Some(star) = state.stars.get(star_name) else { continue };
        if let Some(starbase_key) = star.starbase_key {
            if let Some(fleet) = state.fleets.get(&starbase_key) {
                if let Some(design) = fleet.tokens.keys().find_map(|k| empire.designs.get(k)) {
                    sources.push(ScannerSource {
                        position: star.position,
                        scan_range: design.summary.scan_range as f64,
                        pen_scan_range: design.summary.pen_scan_range as f64,
                    });
                }
            }
        }
    }

    for fleet in state.fleets_of(empire_id) {
        let Some(design) = fleet.tokens.keys().find_map(|k| empire.designs.get(k)) else { continue };
        if design.summary.scan_range > 0 || design.summary.pen_scan_range > 0 {
            sources.push(ScannerSource {
                position: fleet.position,
                scan_range: design.summary.scan_range as f64,
                pen_scan_range: design.summary.pen_scan_range as f64,
            });
        }
    }

    sources
}

fn owned_star_report(star: &Star) -> StarReport {
    StarReport {
        name: star.name.clone(),
        position: star.position,
        year: 0,
        scan_level: ScanLevel::Owned,
        owner: Some(star.owner),
        colonists: Some(star.colonists),
        environment: Some(star.environment),
        concentration: Some(star.concentration),
        factories: Some(star.factories),
        mines: Some(star.mines),
        defenses: Some(star.defenses),
        stockpile: Some(star.resources_on_hand),
    }
}

fn deep_star_report(star: &Star, turn_year: u32) -> StarReport {
    StarReport {
        name: star.name.clone(),
        position: star.position,
        year: turn_year,
        scan_level: ScanLevel::DeepScan,
        owner: Some(star.owner),
        colonists: None,
        environment: Some(star.environment),
        concentration: Some(star.concentration),
        factories: None,
        mines: None,
        defenses: None,
        stockpile: None,
    }
}

fn fleet_report(fleet: &Fleet, turn_year: u32) -> crate::types::FleetReport {
    let bearing = fleet
        .waypoints
        .first()
        .map_or(0.0, |w| f64::from((w.position.y - fleet.position.y) as i32).atan2(f64::from((w.position.x - fleet.position.x) as i32)));
    crate::types::FleetReport {
        key: fleet.key,
        name: fleet.name.clone(),
        owner: fleet.owner,
        position: fleet.position,
        year: turn_year,
        ship_count: fleet.total_tokens(),
        bearing,
        warp: fleet.waypoints.first().map_or(0, |w| w.warp_factor),
    }
}

/// Rebuild one empire's star, fleet, and empire report maps for this turn
/// (§4.6 steps 1-3). Minefield visibility is refreshed separately by
/// `refresh_minefield_visibility` as turn orchestrator step 17.
pub fn refresh_reports(state: &mut GameState, empire_id: u8, _content: &GameContent) {
    let turn_year = state.meta.turn_year;
    let sources = scanner_sources(state, empire_id);

    let owned_reports: HashMap<String, StarReport> = state
        .empires
        .get(&empire_id)
        .map(|e| e.owned_stars.iter().filter_map(|name| state.stars.get(name).map(|s| (name.clone(), owned_star_report(s)))).collect())
        .unwrap_or_default();

    let mut deep_reports: HashMap<String, StarReport> = HashMap::new();
    for (name, star) in &state.stars {
        if owned_reports.contains_key(name) {
            continue;
        }
        let in_range = sources.iter().any(|s| s.position.distance_to(star.position) <= s.pen_scan_range);
        if in_range {
            deep_reports.insert(name.clone(), deep_star_report(star, turn_year));
        }
    }

    // Fleet reports are rebuilt wholesale every turn (not merged with the
    // previous turn's map), which is what step 2's "remove stale foreign
    // fleet reports" amounts to in practice.
    let mut fleet_reports: HashMap<u64, crate::types::FleetReport> = HashMap::new();
    let mut contacts: Vec<u8> = Vec::new();
    for fleet in state.fleets.values() {
        if fleet.owner == empire_id {
            continue;
        }
        let in_range = sources.iter().any(|s| s.position.distance_to(fleet.position) <= s.scan_range);
        if in_range {
            fleet_reports.insert(fleet.key, fleet_report(fleet, turn_year));
            contacts.push(fleet.owner);
        }
    }

    if let Some(empire) = state.empires.get_mut(&empire_id) {
        empire.star_reports = owned_reports;
        empire.star_reports.extend(deep_reports);
        empire.fleet_reports = fleet_reports;
        for other in contacts {
            empire.note_contact(other);
        }
    }
}

/// Run scanning for every empire (§4.6, §4.7 step 15).
pub fn run_scanning(state: &mut GameState, content: &GameContent) {
    let empire_ids: Vec<u8> = state.empires.keys().copied().collect();
    for empire_id in empire_ids {
        refresh_reports(state, empire_id, content);
    }
}

/// Record a design as known to the scanning empire once sighted in battle
/// (§4.6 step 4).
pub fn record_known_design(empire: &mut EmpireData, enemy: u8, design_key: u64) {
    let entry = empire
        .empire_reports
        .entry(enemy)
        .or_insert_with(|| crate::types::EmpireReport { empire: enemy, relation: crate::types::Relation::Unknown, known_designs: vec![] });
    if !entry.known_designs.contains(&design_key) {
        entry.known_designs.push(design_key);
    }
}

/// Rebuild `visible_minefields` for every empire: own fields plus any within
/// scanner or planet-scanner coverage (§4.6, §4.7 step 17).
pub fn refresh_minefield_visibility(state: &mut GameState) {
    let empire_ids: Vec<u8> = state.empires.keys().copied().collect();
    for empire_id in empire_ids {
        let sources = scanner_sources(state, empire_id);
        let visible: Vec<u64> = state
            .minefields
            .values()
            .filter(|m| m.owner == empire_id || sources.iter().any(|s| s.position.distance_to(m.position) <= s.scan_range + m.radius()))
            .map(|m| m.key)
            .collect();
        if let Some(empire) = state.empires.get_mut(&empire_id) {
            empire.visible_minefields = visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::base_content;
    use crate::types::{
        BattleEngineKind, Cargo, DesignSummary, EngineSpec, GameMeta, Position, Relation, ResearchSettings, Resources, ShipDesign,
        ShipToken, TechLevel, Waypoint,
    };

    fn scanner_design(key: u64, scan_range: i64) -> ShipDesign {
        ShipDesign {
            key,
            name: "Scanner".into(),
            hull: "Scout".into(),
            allocations: Vec::new(),
            obsolete: false,
            summary_stale: false,
            summary: DesignSummary {
                mass: 50,
                cost: Resources::new(5, 5, 5, 0),
                armour: 10,
                shields: 0,
                fuel_capacity: 100,
                cargo_capacity: 0,
                initiative: 0,
                weapons: Vec::new(),
                bomb_kill_rate: 0.0,
                mine_layer_rate: 0,
                mine_layer_type: None,
                scan_range,
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

    fn empire_with_design(id: u8, design: ShipDesign) -> EmpireData {
        let mut empire = EmpireData {
            id,
            race: "Humanoid".into(),
            turn_submitted: false,
            research: ResearchSettings { budget_percent: 25, priority: TechLevel::default(), only_leftover: false },
            research_accumulated: 0.0,
            tech_levels: TechLevel::default(),
            owned_stars: Vec::new(),
            owned_fleets: Vec::new(),
            designs: HashMap::new(),
            star_reports: HashMap::new(),
            fleet_reports: HashMap::new(),
            empire_reports: HashMap::new(),
            battle_plans: Vec::new(),
            visible_minefields: Vec::new(),
            next_fleet_counter: 1,
            next_design_counter: 0,
            command_stack: Vec::new(),
        };
        empire.designs.insert(design.key, design);
        empire
    }

    fn fleet_at(owner: u8, key: u64, design_key: u64, position: Position) -> Fleet {
        let mut tokens = HashMap::new();
        tokens.insert(design_key, ShipToken { design_key, quantity: 1, armour: 10, shields: 0 });
        Fleet {
            key,
            name: format!("fleet-{key}"),
            owner,
            position,
            in_orbit: None,
            tokens,
            waypoints: vec![Waypoint::stationary(position, "hold")],
            cargo: Cargo::default(),
            fuel_available: 100.0,
            battle_plan_name: String::new(),
            salvage_created_turn: None,
        }
    }

    #[test]
    fn record_known_design_is_idempotent() {
        let mut empire = empire_with_design(1, scanner_design(1, 50));
        record_known_design(&mut empire, 2, 99);
        record_known_design(&mut empire, 2, 99);
        assert_eq!(empire.empire_reports[&2].known_designs, vec![99]);
    }

    #[test]
    fn record_known_design_starts_the_contact_at_unknown_relation() {
        let mut empire = empire_with_design(1, scanner_design(1, 50));
        record_known_design(&mut empire, 3, 7);
        assert_eq!(empire.empire_reports[&3].relation, Relation::Unknown);
    }

    #[test]
    fn refresh_reports_only_sees_fleets_within_scanner_range() {
        let mut empire_a = empire_with_design(1, scanner_design(1, 50));
        empire_a.owned_fleets = vec![10];
        let empire_b = empire_with_design(2, scanner_design(2, 50));

        let scout_fleet = fleet_at(1, 10, 1, Position::new(0, 0));
        let near_fleet = fleet_at(2, 20, 2, Position::new(10, 0));
        let far_fleet = fleet_at(2, 30, 2, Position::new(1000, 0));

        let mut state = GameState {
            meta: GameMeta { seed: 1, turn_year: 2400, engine_flag: BattleEngineKind::Standard },
            stars: HashMap::new(),
            fleets: HashMap::from([(10, scout_fleet), (20, near_fleet), (30, far_fleet)]),
            minefields: HashMap::new(),
            packets: Vec::new(),
            empires: HashMap::from([(1, empire_a), (2, empire_b)]),
            messages: Vec::new(),
        };

        let content = base_content();
        refresh_reports(&mut state, 1, &content);

        let empire = &state.empires[&1];
        assert!(empire.fleet_reports.contains_key(&20));
        assert!(!empire.fleet_reports.contains_key(&30));
        assert_eq!(empire.relation_with(2), Relation::Neutral);
    }
}

//! File-backed collaborators and galaxy generation shared between
//! `turnengine_cli` and `turnengine_daemon`.

use anyhow::{Context, Result};
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use turnengine_control::{ComponentCatalog, GalaxyGenerator, PersistenceAdapter};
use turnengine_core::commands::Command;
use turnengine_core::{
    BattleEngineKind, Cargo, ComponentDef, Constants, DesignSummary, EmpireData, EngineSpec,
    Environment, Fleet, GameContent, GameMeta, GameState, HullDef, MineralConcentration,
    ResearchSettings, ShipDesign, ShipToken, Star, TechLevel, Waypoint, STARTING_YEAR,
};

#[derive(Deserialize)]
struct RacesFile {
    races: Vec<turnengine_core::RaceDef>,
}

#[derive(Deserialize)]
struct HullsFile {
    hulls: Vec<HullDef>,
}

#[derive(Deserialize)]
struct ComponentsFile {
    components: Vec<ComponentDef>,
}

/// Checks cross-reference sanity of loaded content: at least one race and
/// hull exist, so a galaxy generator always has something to place.
pub fn validate_content(content: &GameContent) {
    assert!(!content.races.is_empty(), "content has no races");
    assert!(!content.hulls.is_empty(), "content has no hulls");
}

/// Loads `GameContent` from a directory of JSON files: `races.json`,
/// `hulls.json`, `components.json`, `constants.json`.
pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let races_file: RacesFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("races.json")).context("reading races.json")?,
    )
    .context("parsing races.json")?;
    let hulls_file: HullsFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("hulls.json")).context("reading hulls.json")?,
    )
    .context("parsing hulls.json")?;
    let components_file: ComponentsFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("components.json")).context("reading components.json")?,
    )
    .context("parsing components.json")?;
    let constants: Constants = serde_json::from_str(
        &std::fs::read_to_string(dir.join("constants.json")).context("reading constants.json")?,
    )
    .context("parsing constants.json")?;

    let content = GameContent {
        content_version: "1".to_string(),
        races: races_file.races.into_iter().map(|r| (r.name.clone(), r)).collect(),
        hulls: hulls_file.hulls.into_iter().map(|h| (h.name.clone(), h)).collect(),
        components: components_file.components.into_iter().map(|c| (c.name.clone(), c)).collect(),
        constants,
    };
    validate_content(&content);
    Ok(content)
}

/// Read-only component lookup backed by an already-loaded `GameContent`.
pub struct FileComponentCatalog {
    content: GameContent,
}

impl FileComponentCatalog {
    pub fn load(content_dir: &str) -> Result<Self> {
        Ok(Self { content: load_content(content_dir)? })
    }
}

impl ComponentCatalog for FileComponentCatalog {
    fn content(&self) -> &GameContent {
        &self.content
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Saves/loads whole-game snapshots as one JSON file per game, and buffers
/// submitted commands as one JSON file per `(game, turn)` under a
/// `commands/` subdirectory. `drain_commands` deletes the file it reads,
/// which is what makes a second drain of the same turn come back empty.
pub struct FilePersistenceAdapter {
    base_dir: PathBuf,
}

impl FilePersistenceAdapter {
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn snapshot_path(&self, game_id: &str) -> PathBuf {
        self.base_dir.join(format!("{game_id}.json"))
    }

    fn commands_path(&self, game_id: &str, turn: u32) -> PathBuf {
        self.base_dir.join("commands").join(game_id).join(format!("turn_{turn:06}.json"))
    }
}

impl PersistenceAdapter for FilePersistenceAdapter {
    fn save(&self, game_id: &str, state: &GameState) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir).context("creating persistence base dir")?;
        let path = self.snapshot_path(game_id);
        let json = serde_json::to_string_pretty(state).context("serializing game state")?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
    }

    fn load(&self, game_id: &str) -> Result<Option<GameState>> {
        let path = self.snapshot_path(game_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let state = serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(state))
    }

    fn append_commands(&self, game_id: &str, turn: u32, empire: u8, commands: Vec<Command>) -> Result<()> {
        let path = self.commands_path(game_id, turn);
        std::fs::create_dir_all(path.parent().expect("commands_path always has a parent")).context("creating commands dir")?;

        let mut batch: Vec<(u8, Vec<Command>)> = if path.exists() {
            let json = std::fs::read_to_string(&path).context("reading existing command batch")?;
            serde_json::from_str(&json).context("parsing existing command batch")?
        } else {
            Vec::new()
        };
        batch.push((empire, commands));
        let json = serde_json::to_string(&batch).context("serializing command batch")?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
    }

    fn drain_commands(&self, game_id: &str, turn: u32) -> Result<Vec<(u8, Vec<Command>)>> {
        let path = self.commands_path(game_id, turn);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&path).context("reading command batch to drain")?;
        let batch = serde_json::from_str(&json).context("parsing command batch to drain")?;
        std::fs::remove_file(&path).context("removing drained command batch")?;
        Ok(batch)
    }
}

// ---------------------------------------------------------------------------
// Galaxy generation
// ---------------------------------------------------------------------------

const HOMEWORLD_START_COLONISTS: i64 = 25_000;
const HOMEWORLD_START_FACTORIES: u32 = 10;
const HOMEWORLD_START_MINES: u32 = 10;

/// Places one homeworld and one starting scout fleet per player on a ring of
/// radius `universe_size`, using the first race and the first hull (sorted
/// by name) from the supplied content. Deterministic in `seed`: same seed,
/// same player count and universe size always produce the same galaxy.
pub struct SeededGalaxyGenerator {
    content: GameContent,
}

impl SeededGalaxyGenerator {
    #[must_use]
    pub fn new(content: GameContent) -> Self {
        Self { content }
    }

    fn starting_design(key: u64, hull: &HullDef) -> ShipDesign {
        ShipDesign {
            key,
            name: "Scout".to_string(),
            hull: hull.name.clone(),
            allocations: Vec::new(),
            obsolete: false,
            summary: DesignSummary {
                mass: 50,
                cost: turnengine_core::Resources::new(20, 5, 5, 0),
                armour: hull.base_armour,
                shields: 0,
                fuel_capacity: hull.base_fuel_capacity,
                cargo_capacity: hull.base_cargo_capacity,
                initiative: 0,
                weapons: Vec::new(),
                bomb_kill_rate: 0.0,
                mine_layer_rate: 0,
                mine_layer_type: None,
                scan_range: 50,
                pen_scan_range: 0,
                has_colonisation_module: true,
                is_starbase: false,
                is_bomber: false,
                has_dock: hull.has_dock,
                engine: EngineSpec {
                    fuel_table: [0.0; 11],
                    free_warp_speed: 1,
                    is_cheap_engine: true,
                    is_improved_fuel_efficiency: false,
                },
                computer_accuracy: 0.0,
                jammer: 0.0,
                battle_speed: 1.0,
            },
            summary_stale: false,
        }
    }
}

impl GalaxyGenerator for SeededGalaxyGenerator {
    fn generate(&self, player_count: u8, universe_size: u32, seed: u64) -> Result<GameState> {
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);

        let mut race_names: Vec<&String> = self.content.races.keys().collect();
        race_names.sort();
        let race_name = race_names
            .first()
            .map(|s| (*s).clone())
            .context("galaxy generation requires at least one race in content")?;

        let mut hull_names: Vec<&String> = self.content.hulls.keys().collect();
        hull_names.sort();
        let hull_name = hull_names
            .first()
            .map(|s| (*s).clone())
            .context("galaxy generation requires at least one hull in content")?;
        let hull = self.content.hulls.get(&hull_name).expect("hull_name came from content.hulls keys");

        let mut stars = HashMap::new();
        let mut fleets = HashMap::new();
        let mut empires = HashMap::new();

        for player in 1..=player_count {
            let angle = std::f64::consts::TAU * f64::from(player - 1) / f64::from(player_count.max(1));
            let radius = f64::from(universe_size);
            let x = (radius * angle.cos()).round() as i64;
            let y = (radius * angle.sin()).round() as i64;
            let position = turnengine_core::Position::new(x, y);

            let star_name = format!("Home-{player}");
            let environment = Environment {
                gravity: rng.gen_range(30..70),
                temperature: rng.gen_range(30..70),
                radiation: rng.gen_range(30..70),
            };
            let concentration = MineralConcentration {
                ironium: rng.gen_range(20..80),
                boranium: rng.gen_range(20..80),
                germanium: rng.gen_range(20..80),
            };
            stars.insert(
                star_name.clone(),
                Star {
                    name: star_name.clone(),
                    position,
                    environment,
                    original_environment: environment,
                    concentration,
                    resources_on_hand: turnengine_core::Resources::default(),
                    colonists: HOMEWORLD_START_COLONISTS,
                    factories: HOMEWORLD_START_FACTORIES,
                    mines: HOMEWORLD_START_MINES,
                    defenses: 0,
                    production_queue: Vec::new(),
                    starbase_key: None,
                    owner: player,
                    spectral_class: "G".to_string(),
                    luminosity_class: "V".to_string(),
                },
            );

            let design_key = turnengine_core::id::entity_key(player, 0);
            let design = Self::starting_design(design_key, hull);

            let fleet_key = turnengine_core::id::entity_key(player, 1);
            let mut tokens = HashMap::new();
            tokens.insert(design_key, ShipToken { design_key, quantity: 1, armour: hull.base_armour, shields: 0 });
            fleets.insert(
                fleet_key,
                Fleet {
                    key: fleet_key,
                    name: format!("Scout #{player}"),
                    owner: player,
                    position,
                    in_orbit: Some(star_name.clone()),
                    tokens,
                    waypoints: vec![Waypoint::stationary(position, star_name.clone())],
                    cargo: Cargo::default(),
                    fuel_available: hull.base_fuel_capacity as f64,
                    battle_plan_name: String::new(),
                    salvage_created_turn: None,
                },
            );

            let mut designs = HashMap::new();
            designs.insert(design_key, design);
            empires.insert(
                player,
                EmpireData {
                    id: player,
                    race: race_name.clone(),
                    turn_submitted: false,
                    research: ResearchSettings { budget_percent: 10, priority: TechLevel::default(), only_leftover: false },
                    research_accumulated: 0.0,
                    tech_levels: TechLevel::default(),
                    owned_stars: vec![star_name],
                    owned_fleets: vec![fleet_key],
                    designs,
                    star_reports: HashMap::new(),
                    fleet_reports: HashMap::new(),
                    empire_reports: HashMap::new(),
                    battle_plans: Vec::new(),
                    visible_minefields: Vec::new(),
                    next_fleet_counter: 2,
                    next_design_counter: 1,
                    command_stack: Vec::new(),
                },
            );
        }

        Ok(GameState {
            meta: GameMeta { seed, turn_year: STARTING_YEAR, engine_flag: BattleEngineKind::Standard },
            stars,
            fleets,
            minefields: HashMap::new(),
            packets: Vec::new(),
            empires,
            messages: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Run directory utilities
// ---------------------------------------------------------------------------

/// Generates a timestamped run ID like `20260218_143022_seed42`.
#[must_use]
pub fn generate_run_id(seed: u64) -> String {
    let now = chrono::Utc::now();
    now.format(&format!("%Y%m%d_%H%M%S_seed{seed}")).to_string()
}

/// Creates the `runs/<run_id>/` directory tree, returning the path.
pub fn create_run_dir(run_id: &str) -> Result<PathBuf> {
    let dir = PathBuf::from("runs").join(run_id);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

/// Writes `run_info.json` into the run directory.
#[allow(clippy::needless_pass_by_value)]
pub fn write_run_info(dir: &Path, run_id: &str, seed: u64, game_id: &str, runner_args: serde_json::Value) -> Result<()> {
    let info = serde_json::json!({
        "run_id": run_id,
        "seed": seed,
        "game_id": game_id,
        "args": runner_args,
    });
    let path = dir.join("run_info.json");
    let file = std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnengine_core::test_fixtures::base_content;

    #[test]
    fn galaxy_generation_is_deterministic() {
        let generator = SeededGalaxyGenerator::new(base_content());
        let a = generator.generate(2, 100, 7).unwrap();
        let b = generator.generate(2, 100, 7).unwrap();
        assert_eq!(a.stars.len(), b.stars.len());
        for (name, star) in &a.stars {
            assert_eq!(star.environment.gravity, b.stars[name].environment.gravity);
        }
    }

    #[test]
    fn galaxy_generation_places_one_homeworld_per_player() {
        let generator = SeededGalaxyGenerator::new(base_content());
        let state = generator.generate(3, 200, 1).unwrap();
        assert_eq!(state.stars.len(), 3);
        assert_eq!(state.empires.len(), 3);
        assert_eq!(state.fleets.len(), 3);
        for empire in state.empires.values() {
            assert_eq!(empire.owned_stars.len(), 1);
            assert_eq!(empire.owned_fleets.len(), 1);
        }
    }

    #[test]
    fn persistence_round_trips_a_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let adapter = FilePersistenceAdapter::new(tmp.path());
        let state = turnengine_core::test_fixtures::base_state();
        adapter.save("game-1", &state).unwrap();
        let loaded = adapter.load("game-1").unwrap().expect("snapshot should exist");
        assert_eq!(loaded.meta.seed, state.meta.seed);
    }

    #[test]
    fn drain_commands_is_idempotent_per_turn() {
        let tmp = tempfile::tempdir().unwrap();
        let adapter = FilePersistenceAdapter::new(tmp.path());
        adapter
            .append_commands("game-1", 3, 1, vec![Command::Research { budget_percent: 50, priority: TechLevel::default() }])
            .unwrap();

        let first = adapter.drain_commands("game-1", 3).unwrap();
        assert_eq!(first.len(), 1);
        let second = adapter.drain_commands("game-1", 3).unwrap();
        assert!(second.is_empty());
    }
}

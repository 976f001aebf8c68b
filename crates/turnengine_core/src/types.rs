//! Core data model: world entities, empire state, and the read-only content
//! catalog. Cross-entity links are always keys (star name, fleet/design u64,
//! minefield u64), never references — the world is an arena plus key lookup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const COLONISTS_PER_KILOTON: i64 = 100;
pub const STARTING_YEAR: u32 = 2100;
pub const MAX_DEFENSES: u32 = 100;
pub const MAX_WEAPON_RANGE: u32 = 7;
pub const MINEFIELD_SNAP_TO_GRID_SIZE: i64 = 5;
pub const BASE_CROWDING_FACTOR: f64 = 16.0 / 9.0;
pub const POPULATION_FACTOR_HYPER_EXPANSION: f64 = 0.5;
pub const GROWTH_FACTOR_HYPER_EXPANSION: f64 = 2.0;
pub const NOBODY: u8 = 0;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    #[must_use]
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// True Euclidean distance. See `SPEC_FULL.md` §9 open question 1: the
    /// source's point type computes a Manhattan sum and then squares it,
    /// which collapses `distance_to_squared` and `distance_to` into the same
    /// (wrong) value for anything but axis-aligned offsets. Every caller here
    /// (movement time-to-arrival, weapon range checks) wants true distance.
    #[must_use]
    pub fn distance_to(&self, other: Position) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    #[must_use]
    pub fn distance_squared_to(&self, other: Position) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        dx.mul_add(dx, dy * dy)
    }
}

// ---------------------------------------------------------------------------
// Resources / Cargo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub ironium: i64,
    pub boranium: i64,
    pub germanium: i64,
    pub energy: i64,
}

impl Resources {
    #[must_use]
    pub fn new(ironium: i64, boranium: i64, germanium: i64, energy: i64) -> Self {
        Self { ironium, boranium, germanium, energy }
    }

    /// Mass does not include energy.
    #[must_use]
    pub fn mass(&self) -> i64 {
        self.ironium + self.boranium + self.germanium
    }

    #[must_use]
    pub fn add(&self, other: Resources) -> Resources {
        Resources {
            ironium: self.ironium + other.ironium,
            boranium: self.boranium + other.boranium,
            germanium: self.germanium + other.germanium,
            energy: self.energy + other.energy,
        }
    }

    /// Subtraction is never allowed to go negative; an underflow is an error
    /// condition that validation must have already caught (§4.8/§7 class 2).
    pub fn checked_sub(&self, other: Resources) -> Option<Resources> {
        let ironium = self.ironium.checked_sub(other.ironium)?;
        let boranium = self.boranium.checked_sub(other.boranium)?;
        let germanium = self.germanium.checked_sub(other.germanium)?;
        let energy = self.energy.checked_sub(other.energy)?;
        if ironium < 0 || boranium < 0 || germanium < 0 || energy < 0 {
            return None;
        }
        Some(Resources { ironium, boranium, germanium, energy })
    }

    /// Scalar multiply by a real uses ceiling rounding, so a fractional
    /// request never consumes more than is actually present once truncated
    /// back down by a caller.
    #[must_use]
    pub fn scale_ceil(&self, factor: f64) -> Resources {
        Resources {
            ironium: (self.ironium as f64 * factor).ceil() as i64,
            boranium: (self.boranium as f64 * factor).ceil() as i64,
            germanium: (self.germanium as f64 * factor).ceil() as i64,
            energy: (self.energy as f64 * factor).ceil() as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cargo {
    pub ironium: i64,
    pub boranium: i64,
    pub germanium: i64,
    pub colonists_kt: i64,
    pub silicoxium: i64,
}

impl Cargo {
    #[must_use]
    pub fn mass(&self) -> i64 {
        self.ironium + self.boranium + self.germanium + self.colonists_kt + self.silicoxium
    }

    #[must_use]
    pub fn colonists(&self) -> i64 {
        self.colonists_kt * COLONISTS_PER_KILOTON
    }
}

// ---------------------------------------------------------------------------
// Tech
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechField {
    Biotechnology,
    Electronics,
    Energy,
    Propulsion,
    Weapons,
    Construction,
}

pub const TECH_FIELDS: [TechField; 6] = [
    TechField::Biotechnology,
    TechField::Electronics,
    TechField::Energy,
    TechField::Propulsion,
    TechField::Weapons,
    TechField::Construction,
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechLevel(pub HashMap<TechField, u32>);

impl TechLevel {
    #[must_use]
    pub fn get(&self, field: TechField) -> u32 {
        self.0.get(&field).copied().unwrap_or(0)
    }

    pub fn set(&mut self, field: TechField, level: u32) {
        self.0.insert(field, level);
    }

    /// `A >= B` iff every field of A is at least the corresponding field of B.
    #[must_use]
    pub fn at_least(&self, other: &TechLevel) -> bool {
        TECH_FIELDS.iter().all(|f| self.get(*f) >= other.get(*f))
    }

    #[must_use]
    pub fn highest_weighted(&self, weights: &TechLevel) -> TechField {
        TECH_FIELDS
            .iter()
            .copied()
            .max_by_key(|f| weights.get(*f))
            .unwrap_or(TechField::Energy)
    }
}

// ---------------------------------------------------------------------------
// Waypoints / tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMode {
    Load,
    Unload,
    Set,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WaypointTask {
    NoTask,
    TransferCargo { mode: TransferMode, amount: i64, target: Option<String> },
    Colonise,
    Invade,
    LayMines { years: u32 },
    Scrap,
    SplitMerge,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Position,
    pub warp_factor: u8,
    pub destination: String,
    pub task: WaypointTask,
}

impl Waypoint {
    #[must_use]
    pub fn stationary(position: Position, destination: impl Into<String>) -> Self {
        Self { position, warp_factor: 0, destination: destination.into(), task: WaypointTask::NoTask }
    }
}

// ---------------------------------------------------------------------------
// Ship designs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleAllocation {
    pub component: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignSummary {
    pub mass: i64,
    pub cost: Resources,
    pub armour: i64,
    pub shields: i64,
    pub fuel_capacity: i64,
    pub cargo_capacity: i64,
    pub initiative: i32,
    pub weapons: Vec<Weapon>,
    pub bomb_kill_rate: f64,
    pub mine_layer_rate: u32,
    pub mine_layer_type: Option<MinefieldType>,
    pub scan_range: i64,
    pub pen_scan_range: i64,
    pub has_colonisation_module: bool,
    pub is_starbase: bool,
    pub is_bomber: bool,
    pub has_dock: bool,
    pub engine: EngineSpec,
    /// Targeting computer bonus added to every missile's base accuracy
    /// before the jammer penalty is applied (§4.4 missile resolution).
    pub computer_accuracy: f64,
    /// ECM jammer: fraction by which this design reduces an attacker's
    /// effective missile accuracy when it is the target (§4.4).
    pub jammer: f64,
    /// Battle-board speed class, indexed into the movement table the same
    /// way `BattleEngine.cs`'s 9-row table does (0.5 .. 2.5+).
    pub battle_speed: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weapon {
    pub range: u32,
    pub initiative: i32,
    pub power: f64,
    pub is_missile: bool,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineSpec {
    /// Fuel consumption rate at each warp 1..=10, mScale by mass/200
    /// elsewhere. Negative entries are net fuel-generating (ramscoop).
    pub fuel_table: [f64; 11],
    pub free_warp_speed: u8,
    pub is_cheap_engine: bool,
    pub is_improved_fuel_efficiency: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipDesign {
    pub key: u64,
    pub name: String,
    pub hull: String,
    pub allocations: Vec<ModuleAllocation>,
    pub obsolete: bool,
    pub summary: DesignSummary,
    pub summary_stale: bool,
}

// ---------------------------------------------------------------------------
// Fleets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipToken {
    pub design_key: u64,
    pub quantity: u32,
    pub armour: i64,
    pub shields: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fleet {
    pub key: u64,
    pub name: String,
    pub owner: u8,
    pub position: Position,
    pub in_orbit: Option<String>,
    pub tokens: HashMap<u64, ShipToken>,
    pub waypoints: Vec<Waypoint>,
    pub cargo: Cargo,
    pub fuel_available: f64,
    pub battle_plan_name: String,
    /// Set when this fleet is salvage, tagging the turn it was created so
    /// cleanup-fleets can apply the 30%/turn decay starting the turn after
    /// (§9 open question 5).
    pub salvage_created_turn: Option<u32>,
}

impl Fleet {
    #[must_use]
    pub fn total_tokens(&self) -> u32 {
        self.tokens.values().map(|t| t.quantity).sum()
    }

    #[must_use]
    pub fn is_empty_of_ships(&self) -> bool {
        self.total_tokens() == 0
    }
}

// ---------------------------------------------------------------------------
// Production
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionKind {
    Factory,
    Mine,
    Defense,
    Terraform,
    Ship,
    Starbase,
    Packet,
    Alchemy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub kind: ProductionKind,
    pub quantity: u32,
    pub design_key: Option<u64>,
    pub resources_spent: Resources,
    pub auto_build: bool,
}

// ---------------------------------------------------------------------------
// Stars
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Environment {
    pub gravity: i32,
    pub temperature: i32,
    pub radiation: i32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MineralConcentration {
    pub ironium: i32,
    pub boranium: i32,
    pub germanium: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Star {
    pub name: String,
    pub position: Position,
    pub environment: Environment,
    pub original_environment: Environment,
    pub concentration: MineralConcentration,
    pub resources_on_hand: Resources,
    pub colonists: i64,
    pub factories: u32,
    pub mines: u32,
    pub defenses: u32,
    pub production_queue: Vec<ProductionOrder>,
    pub starbase_key: Option<u64>,
    pub owner: u8,
    pub spectral_class: String,
    pub luminosity_class: String,
}

impl Star {
    #[must_use]
    pub fn is_owned(&self) -> bool {
        self.owner != NOBODY
    }

    /// Enforces the invariant `defenses <= MAX_DEFENSES` (§3).
    pub fn add_defenses(&mut self, amount: u32) {
        self.defenses = (self.defenses + amount).min(MAX_DEFENSES);
    }

    pub fn depopulate(&mut self) {
        self.owner = NOBODY;
        self.colonists = 0;
        self.factories = 0;
        self.mines = 0;
        self.defenses = 0;
        self.production_queue.clear();
        self.starbase_key = None;
    }
}

// ---------------------------------------------------------------------------
// Minefields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinefieldType {
    Standard = 0,
    Heavy = 1,
    SpeedBump = 2,
}

impl MinefieldType {
    /// Per-ly-per-warp hit chance (§4.2).
    #[must_use]
    pub fn hit_chance(self) -> f64 {
        match self {
            MinefieldType::Standard => 0.003,
            MinefieldType::Heavy => 0.010,
            MinefieldType::SpeedBump => 0.035,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Minefield {
    pub key: u64,
    pub owner: u8,
    pub position: Position,
    pub mine_count: u32,
    pub mine_type: MinefieldType,
}

impl Minefield {
    #[must_use]
    pub fn radius(&self) -> f64 {
        f64::from(self.mine_count).sqrt()
    }

    #[must_use]
    pub fn grid_cell(position: Position) -> (i32, i32) {
        (
            (position.x.div_euclid(MINEFIELD_SNAP_TO_GRID_SIZE)) as i32,
            (position.y.div_euclid(MINEFIELD_SNAP_TO_GRID_SIZE)) as i32,
        )
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Info,
    InvalidCommand,
    Combat,
    Production,
    Research,
    Movement,
    Bombing,
    Invasion,
    Colonisation,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub empire: u8,
    pub text: String,
    pub kind: MessageKind,
    pub fleet_key: Option<u64>,
}

impl Message {
    #[must_use]
    pub fn new(empire: u8, kind: MessageKind, text: impl Into<String>) -> Self {
        Self { empire, text: text.into(), kind, fleet_key: None }
    }

    #[must_use]
    pub fn with_fleet(mut self, fleet_key: u64) -> Self {
        self.fleet_key = Some(fleet_key);
        self
    }
}

// ---------------------------------------------------------------------------
// Intel / empire reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanLevel {
    None,
    InScan,
    DeepScan,
    Owned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StarReport {
    pub name: String,
    pub position: Position,
    pub year: u32,
    pub scan_level: ScanLevel,
    pub owner: Option<u8>,
    pub colonists: Option<i64>,
    pub environment: Option<Environment>,
    pub concentration: Option<MineralConcentration>,
    pub factories: Option<u32>,
    pub mines: Option<u32>,
    pub defenses: Option<u32>,
    pub stockpile: Option<Resources>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetReport {
    pub key: u64,
    pub name: String,
    pub owner: u8,
    pub position: Position,
    pub year: u32,
    pub ship_count: u32,
    pub bearing: f64,
    pub warp: u8,
}

/// Contact state with a foreign empire. See `SPEC_FULL.md` §9 open question 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Unknown,
    Neutral,
    Enemy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmpireReport {
    pub empire: u8,
    pub relation: Relation,
    pub known_designs: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattlePlan {
    pub name: String,
    pub priorities: Vec<TargetCategory>,
    pub attack: AttackMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetCategory {
    Starbase,
    Bomber,
    CapitalShip,
    Escort,
    ArmedShip,
    AnyShip,
    SupportShip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackMode {
    Everyone,
    Enemies,
    Specific(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleEngineKind {
    Standard,
    Alternative,
}

// ---------------------------------------------------------------------------
// Empires
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchSettings {
    pub budget_percent: u8,
    pub priority: TechLevel,
    pub only_leftover: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmpireData {
    pub id: u8,
    pub race: String,
    pub turn_submitted: bool,
    pub research: ResearchSettings,
    pub research_accumulated: f64,
    pub tech_levels: TechLevel,
    pub owned_stars: Vec<String>,
    pub owned_fleets: Vec<u64>,
    pub designs: HashMap<u64, ShipDesign>,
    pub star_reports: HashMap<String, StarReport>,
    pub fleet_reports: HashMap<u64, FleetReport>,
    pub empire_reports: HashMap<u8, EmpireReport>,
    pub battle_plans: Vec<BattlePlan>,
    pub visible_minefields: Vec<u64>,
    pub next_fleet_counter: u32,
    pub next_design_counter: u32,
    pub command_stack: Vec<crate::commands::Command>,
}

impl EmpireData {
    pub fn relation_with(&self, other: u8) -> Relation {
        self.empire_reports.get(&other).map_or(Relation::Unknown, |r| r.relation)
    }

    /// First-contact bump from Unknown to Neutral (§9 open question 3):
    /// relation never regresses and is only escalated to Enemy by an
    /// explicit declaration, never inferred here.
    pub fn note_contact(&mut self, other: u8) {
        let entry = self
            .empire_reports
            .entry(other)
            .or_insert_with(|| EmpireReport { empire: other, relation: Relation::Unknown, known_designs: vec![] });
        if entry.relation == Relation::Unknown {
            entry.relation = Relation::Neutral;
        }
    }
}

// ---------------------------------------------------------------------------
// Content catalog (read-only, dependency-injected)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceDef {
    pub name: String,
    pub growth_rate: f64,
    pub colonists_per_resource: f64,
    pub factory_production: f64,
    pub operable_factories: f64,
    pub mine_production: f64,
    pub operable_mines: f64,
    pub hyper_expansion: bool,
    pub ideal_environment: Environment,
}

impl RaceDef {
    /// Habitability in [-1, 1] for the given environment triple. A minimal
    /// but monotone model: distance from the race's ideal midpoint scaled to
    /// [-1, 1], sufficient for the growth-curve scenarios in §8 which always
    /// supply `hab_value` directly rather than deriving it from environment.
    #[must_use]
    pub fn hab_value(&self, env: Environment, ideal: Environment) -> f64 {
        let score = |actual: i32, ideal: i32| -> f64 {
            1.0 - (f64::from((actual - ideal).abs()) / 50.0).min(2.0)
        };
        let avg = (score(env.gravity, ideal.gravity)
            + score(env.temperature, ideal.temperature)
            + score(env.radiation, ideal.radiation))
            / 3.0;
        avg.clamp(-1.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HullDef {
    pub name: String,
    pub base_armour: i64,
    pub base_fuel_capacity: i64,
    pub base_cargo_capacity: i64,
    pub is_starbase: bool,
    pub has_dock: bool,
    pub slot_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDef {
    pub name: String,
    pub mass: i64,
    pub cost: Resources,
    pub armour: i64,
    pub shields: i64,
    pub weapon: Option<Weapon>,
    pub engine: Option<EngineSpec>,
    pub scan_range: i64,
    pub pen_scan_range: i64,
    pub is_colonisation_module: bool,
    pub bomb_kill_rate: f64,
    pub mine_layer_rate: u32,
    pub mine_layer_type: Option<MinefieldType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    pub turn_budget_ms: u64,
    pub max_battle_rounds_standard: u32,
    pub max_battle_rounds_alternative: u32,
}

impl Default for Constants {
    fn default() -> Self {
        Self { turn_budget_ms: 2_000, max_battle_rounds_standard: 16, max_battle_rounds_alternative: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub races: HashMap<String, RaceDef>,
    pub hulls: HashMap<String, HullDef>,
    pub components: HashMap<String, ComponentDef>,
    pub constants: Constants,
}

// ---------------------------------------------------------------------------
// Mineral packets (in-flight cargo projectiles, §4.7 step 16)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MineralPacket {
    pub owner: u8,
    pub position: Position,
    pub velocity: Position,
    pub target_star: String,
    pub cargo: Cargo,
}

// ---------------------------------------------------------------------------
// World state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMeta {
    pub seed: u64,
    pub turn_year: u32,
    pub engine_flag: BattleEngineKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub meta: GameMeta,
    pub stars: HashMap<String, Star>,
    pub fleets: HashMap<u64, Fleet>,
    pub minefields: HashMap<u64, Minefield>,
    pub packets: Vec<MineralPacket>,
    pub empires: HashMap<u8, EmpireData>,
    pub messages: Vec<Message>,
}

impl GameState {
    #[must_use]
    pub fn fleets_of(&self, owner: u8) -> impl Iterator<Item = &Fleet> {
        self.fleets.values().filter(move |f| f.owner == owner)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Normal,
    Debug,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    TurnGenerated { turn_year: u32 },
    FleetDestroyed { fleet_key: u64 },
    StarOwnershipChanged { star: String, previous_owner: u8, new_owner: u8 },
    TechLevelUp { empire: u8, field: TechField, level: u32 },
    Debug { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    pub event: Event,
}

/// Sequential id generator for events, mirroring the teacher's `emit()`
/// helper (`sim_core/src/lib.rs`): every mutating step that wants to record
/// an event calls this instead of hand-rolling an id.
pub fn emit(events: &mut Vec<EventEnvelope>, event: Event) {
    let id = format!("evt_{:06}", events.len());
    events.push(EventEnvelope { id, event });
}

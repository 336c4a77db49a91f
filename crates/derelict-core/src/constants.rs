//! Simulation constants and tuning parameters.

// --- Health bands ---

/// Health at or above which a subsystem is NOMINAL.
pub const HEALTH_NOMINAL: f64 = 0.85;

/// Health at or above which a subsystem is LIMITED.
pub const HEALTH_LIMITED: f64 = 0.65;

/// Health at or above which a subsystem is DAMAGED. Anything above zero is CRITICAL.
pub const HEALTH_DAMAGED: f64 = 0.40;

// --- Power generation and storage ---

/// Base generation capacity before modules and core-state scaling (kW).
pub const BASE_GENERATION_KW: f64 = 11.0;

/// Fresh-ship battery capacity (kWh).
pub const BATTERY_CAPACITY_KWH: f64 = 12.0;

/// Fresh-ship stored battery energy (kWh).
pub const BATTERY_INITIAL_KWH: f64 = 8.0;

/// Fraction of surplus power that ends up stored.
pub const CHARGE_EFFICIENCY: f64 = 0.90;

/// Fraction of drawn battery energy that reaches the bus.
pub const DISCHARGE_EFFICIENCY: f64 = 0.95;

/// Maximum battery charge rate (kW).
pub const MAX_CHARGE_KW: f64 = 3.0;

/// Maximum battery discharge rate (kW).
pub const MAX_DISCHARGE_KW: f64 = 4.0;

/// Seconds per hour, for kW x s -> kWh.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

// --- Power quality ---

/// State-of-charge mapped to quality 0.0 at this level...
pub const QUALITY_SOC_LOW: f64 = 0.10;

/// ...and to quality 1.0 at this level.
pub const QUALITY_SOC_HIGH: f64 = 0.50;

/// Weight of the state-of-charge term.
pub const QUALITY_SOC_WEIGHT: f64 = 0.6;

/// Weight of the deficit term.
pub const QUALITY_DEFICIT_WEIGHT: f64 = 0.4;

/// Deficit term penalty at full discharge-rate deficit.
pub const QUALITY_DEFICIT_PENALTY: f64 = 0.7;

/// Below this quality every non-critical subsystem is shed at once.
pub const QUALITY_COLLAPSE: f64 = 0.15;

/// Below this quality one more non-critical subsystem is shed per interval.
pub const QUALITY_CRITICAL: f64 = 0.30;

/// Interval between sustained low-quality sheds (seconds).
pub const QUALITY_SHED_INTERVAL_S: f64 = 30.0;

/// Subsystem priority that is never shed.
pub const CRITICAL_PRIORITY: u8 = 1;

// --- Brownout ---

/// Brownout duration after which power hardware degrades faster (seconds).
pub const BROWNOUT_SUSTAIN_S: f64 = 10.0;

/// Degradation multiplier on power core / distribution during a sustained brownout.
pub const BROWNOUT_WEAR_FACTOR: f64 = 3.0;

// --- Degradation ---

/// Weight of (1 - quality) in the decay formula.
pub const DECAY_K_POWER: f64 = 0.5;

/// Radiation level that normalizes to 1.0.
pub const RADIATION_NORM: f64 = 10.0;

/// Wear multiplier while in transit outside the cruise profile.
pub const TRANSIT_WEAR_MULTIPLIER: f64 = 1.5;

// --- Alerts ---

/// Distribution below NOMINAL for this long raises `distribution_unstable` (seconds).
pub const BUS_INSTABILITY_ALERT_S: f64 = 120.0;

/// Quality below this raises `low_power_quality` as a warning.
pub const LOW_QUALITY_ALERT: f64 = 0.50;

/// Quality below this escalates `low_power_quality` to critical.
pub const LOW_QUALITY_ESCALATE: f64 = 0.35;

/// State of charge below this raises `soc_low`.
pub const SOC_LOW_NOTICE: f64 = 0.25;

/// State of charge below this raises `soc_critical`.
pub const SOC_CRITICAL_NOTICE: f64 = 0.10;

/// State of charge at or below this raises `battery_reserve_exhausted`.
pub const SOC_EXHAUSTED: f64 = 0.005;

// --- Drones ---

/// Passive battery drain while deployed (fraction per second).
pub const DRONE_DRAIN_PER_S: f64 = 0.001;

/// Docked charge rate with a healthy power surplus (fraction per second).
pub const DRONE_CHARGE_PER_S: f64 = 0.004;

/// Docked charge rate with a marginal power budget (fraction per second).
pub const DRONE_CHARGE_REDUCED_PER_S: f64 = 0.0015;

/// Net ship power needed for full-rate charging (kW).
pub const DRONE_CHARGE_DRAW_KW: f64 = 0.5;

/// Net ship power below which charging stops (kW).
pub const DRONE_CHARGE_NET_FLOOR_KW: f64 = -0.5;

/// Battery level at or below which the low-battery warning fires.
pub const DRONE_LOW_BATTERY: f64 = 0.20;

/// Docked time between passive repair steps (seconds).
pub const DRONE_REPAIR_INTERVAL_S: f64 = 10.0;

/// Scrap consumed per passive repair step.
pub const DRONE_REPAIR_SCRAP_COST: u32 = 1;

/// Chance that a repair step at a CRITICAL bay damages the drone instead.
pub const DRONE_REPAIR_MISHAP_P: f64 = 0.25;

/// Integrity lost on a repair mishap.
pub const DRONE_REPAIR_MISHAP_DAMAGE: f64 = 0.02;

/// Integrity wear per second at normalized radiation 1.0.
pub const DRONE_RADIATION_WEAR_PER_S: f64 = 0.0002;

/// Minimum battery to start a deployment or repair.
pub const DRONE_MIN_BATTERY: f64 = 0.30;

/// Minimum integrity to start a deployment or repair.
pub const DRONE_MIN_INTEGRITY: f64 = 0.25;

/// Sector docked drones live in.
pub const DRONE_BAY_SECTOR: &str = "drone_bay";

// --- Jobs ---

/// Repair job duration (seconds).
pub const REPAIR_ETA_S: f64 = 90.0;

/// Health restored by one repair job.
pub const REPAIR_AMOUNT: f64 = 0.25;

/// Scrap paid when a repair job is queued.
pub const REPAIR_SCRAP_COST: u32 = 5;

/// Drone deployment duration (seconds).
pub const DEPLOY_ETA_S: f64 = 20.0;

/// Drone docking duration (seconds).
pub const DOCK_ETA_S: f64 = 20.0;

/// Salvage run duration (seconds).
pub const SALVAGE_ETA_S: f64 = 120.0;

/// Maximum scrap recovered by one salvage run.
pub const SALVAGE_YIELD: u32 = 6;

/// Drone reboot duration (seconds).
pub const REBOOT_ETA_S: f64 = 30.0;

/// Reboot success probability at zero integrity.
pub const REBOOT_P_MIN: f64 = 0.2;

/// Reboot success probability ceiling.
pub const REBOOT_P_MAX: f64 = 0.9;

/// Battery a successfully rebooted drone comes back with (at least).
pub const REBOOT_BATTERY: f64 = 0.15;

/// Route solving time per unit of distance (seconds).
pub const ROUTE_SOLVE_S_PER_UNIT: f64 = 2.0;

/// Minimum route solving time (seconds).
pub const ROUTE_SOLVE_MIN_S: f64 = 30.0;

/// Sensor range at NOMINAL sensors (world units).
pub const SENSOR_RANGE_BASE: f64 = 40.0;

/// Travel time per unit of distance (seconds).
pub const TRAVEL_S_PER_UNIT: f64 = 6.0;

/// Travel time multiplier for the cruise profile.
pub const CRUISE_TRAVEL_FACTOR: f64 = 1.5;

/// Minimum power quality to boot a service.
pub const BOOT_MIN_QUALITY: f64 = 0.30;

// --- Emergency risk ---

/// Per-second failure probability of an emergency deployment.
pub const EMERGENCY_FAIL_PER_S: f64 = 0.01;

/// Per-second glitch probability of an emergency deployment.
pub const EMERGENCY_GLITCH_PER_S: f64 = 0.03;

/// Integrity lost when an emergency job fails.
pub const EMERGENCY_FAIL_DAMAGE: f64 = 0.30;

/// Integrity lost on a glitch.
pub const EMERGENCY_GLITCH_DAMAGE: f64 = 0.05;

// --- Job power draw (kW while RUNNING) ---

pub const REPAIR_DRAW_KW: f64 = 0.4;
pub const BOOT_DRAW_KW: f64 = 0.3;
pub const DEPLOY_DRAW_KW: f64 = 0.2;
pub const DOCK_DRAW_KW: f64 = 0.2;
pub const SALVAGE_DRAW_KW: f64 = 0.3;
pub const REBOOT_DRAW_KW: f64 = 0.2;
pub const ROUTE_SOLVE_DRAW_KW: f64 = 0.5;
pub const TRAVEL_DRAW_KW: f64 = 1.5;
pub const INSTALL_DRAW_KW: f64 = 0.6;

// --- Events ---

/// Default capacity of the recent-events ring buffer.
pub const EVENT_LOG_CAPACITY: usize = 200;

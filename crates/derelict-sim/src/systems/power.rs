//! Power network model: generation, load, load shedding, quality and
//! battery integration.

use std::collections::BTreeMap;

use derelict_core::components::{PowerNetwork, Subsystem};
use derelict_core::constants::*;
use derelict_core::enums::{PowerMode, Severity, StateCause, SystemId, SystemState};
use derelict_core::events::{Event, EventData, EventKind};
use derelict_core::jobs::Job;
use derelict_core::state::SimState;
use derelict_core::types::Source;
use tracing::{debug, warn};

use super::subsystems;

/// Generation multiplier for the power-core state.
pub fn core_factor(state: SystemState) -> f64 {
    match state {
        SystemState::Offline => 0.0,
        SystemState::Critical => 0.35,
        SystemState::Damaged => 0.60,
        SystemState::Limited => 0.85,
        SystemState::Nominal | SystemState::Upgraded => 1.0,
    }
}

/// Quality penalty while the distribution bus is below NOMINAL.
pub fn distribution_penalty(state: SystemState) -> f64 {
    match state {
        SystemState::Offline => 0.40,
        SystemState::Critical => 0.25,
        SystemState::Damaged => 0.12,
        SystemState::Limited => 0.05,
        SystemState::Nominal | SystemState::Upgraded => 0.0,
    }
}

/// Draw multiplier for a subsystem under a power mode.
pub fn mode_multiplier(mode: PowerMode, id: SystemId) -> f64 {
    match mode {
        PowerMode::Normal => 1.0,
        PowerMode::Cruise => match id {
            SystemId::Sensors => 0.5,
            SystemId::DataCore => 0.7,
            SystemId::Security => 0.5,
            SystemId::DroneBay => 0.6,
            SystemId::LifeSupport => 0.9,
            SystemId::PowerCore | SystemId::EnergyDistribution => 1.0,
        },
    }
}

/// Sum of effective draw of every non-offline subsystem plus running jobs (kW).
pub fn compute_load(systems: &BTreeMap<SystemId, Subsystem>, jobs: &[Job], mode: PowerMode) -> f64 {
    let subsystems: f64 = systems
        .values()
        .filter(|s| s.is_powered())
        .map(|s| s.draw_kw * mode_multiplier(mode, s.id))
        .sum();
    let running: f64 = jobs.iter().filter(|j| j.is_running()).map(|j| j.power_kw).sum();
    subsystems + running
}

/// Discharge the battery can sustain over `dt` (kW).
pub fn available_discharge(power: &PowerNetwork, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    let energy_limited = power.battery_kwh * power.discharge_efficiency * SECONDS_PER_HOUR / dt;
    power.max_discharge_kw.min(energy_limited).max(0.0)
}

/// State-of-charge term, linear from [QUALITY_SOC_LOW, QUALITY_SOC_HIGH] to [0, 1].
pub fn soc_term(soc: f64) -> f64 {
    ((soc - QUALITY_SOC_LOW) / (QUALITY_SOC_HIGH - QUALITY_SOC_LOW)).clamp(0.0, 1.0)
}

/// Returns `(quality, deficit_ratio)`.
pub fn compute_quality(power: &PowerNetwork, distribution: SystemState) -> (f64, f64) {
    let deficit = (power.load_kw - power.generation_kw).max(0.0);
    let deficit_ratio = if power.max_discharge_kw > 0.0 {
        (deficit / power.max_discharge_kw).clamp(0.0, 1.0)
    } else if deficit > 0.0 {
        1.0
    } else {
        0.0
    };

    let quality = QUALITY_SOC_WEIGHT * soc_term(power.state_of_charge())
        + QUALITY_DEFICIT_WEIGHT * (1.0 - QUALITY_DEFICIT_PENALTY * deficit_ratio)
        - distribution_penalty(distribution)
        + power.quality_offset;

    (quality.clamp(0.0, 1.0), deficit_ratio)
}

fn system_state(systems: &BTreeMap<SystemId, Subsystem>, id: SystemId) -> SystemState {
    systems.get(&id).map_or(SystemState::Offline, |s| s.state)
}

/// Next subsystem to shed: powered, non-critical, highest priority number.
/// Ties go to the lowest id.
pub fn shed_candidate(systems: &BTreeMap<SystemId, Subsystem>) -> Option<SystemId> {
    systems
        .values()
        .filter(|s| s.is_powered() && !s.is_critical())
        .max_by(|a, b| a.priority.cmp(&b.priority).then(b.id.cmp(&a.id)))
        .map(|s| s.id)
}

/// Force a subsystem offline with the given cause.
pub fn shed(state: &mut SimState, id: SystemId, cause: StateCause) {
    let t = state.now();
    if let Some(sys) = state.systems.get_mut(&id) {
        sys.forced_offline = true;
        subsystems::reevaluate(sys, cause, t, &mut state.events);
        debug!(system = %id, ?cause, "subsystem shed");
    }
}

/// Recompute generation, load and quality without advancing time.
pub fn refresh(state: &mut SimState) {
    let core = system_state(&state.systems, SystemId::PowerCore);
    let distribution = system_state(&state.systems, SystemId::EnergyDistribution);
    let power = &mut state.power;
    power.generation_kw = (power.base_generation_kw + power.bonus_generation_kw) * core_factor(core);
    power.load_kw = compute_load(&state.systems, &state.jobs, power.mode);
    power.available_discharge_kw = available_discharge(power, 1.0);
    power.soc = power.state_of_charge();
    let (quality, deficit_ratio) = compute_quality(power, distribution);
    power.quality = quality;
    power.deficit_ratio = deficit_ratio;
}

/// One power-network step.
pub fn run(state: &mut SimState, dt: f64) {
    let t = state.now();

    // Generation and load.
    let core = system_state(&state.systems, SystemId::PowerCore);
    state.power.generation_kw =
        (state.power.base_generation_kw + state.power.bonus_generation_kw) * core_factor(core);
    state.power.available_discharge_kw = available_discharge(&state.power, dt);
    state.power.load_kw = compute_load(&state.systems, &state.jobs, state.power.mode);

    // Load shedding, then brownout if shedding is not enough.
    let capacity = state.power.generation_kw + state.power.available_discharge_kw;
    while state.power.load_kw > capacity {
        let Some(id) = shed_candidate(&state.systems) else {
            break;
        };
        shed(state, id, StateCause::LoadShed);
        state.power.load_kw = compute_load(&state.systems, &state.jobs, state.power.mode);
    }

    let brownout = state.power.load_kw > capacity;
    if brownout && !state.power.brownout {
        warn!(
            load_kw = state.power.load_kw,
            capacity_kw = capacity,
            "power deficit, bus in brownout"
        );
        let data = EventData::Power {
            load_kw: state.power.load_kw,
            generation_kw: state.power.generation_kw,
            available_kw: capacity,
        };
        state.events.push(
            t,
            Event::new(
                EventKind::PowerDeficit,
                Severity::Critical,
                Source::Power,
                format!(
                    "Power deficit: load {:.2} kW exceeds capacity {:.2} kW",
                    state.power.load_kw, capacity
                ),
            )
            .with_data(data),
        );
    }
    state.power.brownout = brownout;
    state.power.brownout_s = if brownout { state.power.brownout_s + dt } else { 0.0 };

    // Quality.
    let distribution = system_state(&state.systems, SystemId::EnergyDistribution);
    let (quality, deficit_ratio) = compute_quality(&state.power, distribution);
    state.power.quality = quality;
    state.power.deficit_ratio = deficit_ratio;

    // Quality-driven shedding.
    if quality < QUALITY_COLLAPSE {
        state.power.low_quality_s = 0.0;
        while let Some(id) = shed_candidate(&state.systems) {
            shed(state, id, StateCause::QualityCollapse);
        }
    } else if quality < QUALITY_CRITICAL {
        state.power.low_quality_s += dt;
        while state.power.low_quality_s >= QUALITY_SHED_INTERVAL_S {
            state.power.low_quality_s -= QUALITY_SHED_INTERVAL_S;
            match shed_candidate(&state.systems) {
                Some(id) => shed(state, id, StateCause::QualityShed),
                None => break,
            }
        }
    } else {
        state.power.low_quality_s = 0.0;
    }
    state.power.load_kw = compute_load(&state.systems, &state.jobs, state.power.mode);
    let (quality, deficit_ratio) = compute_quality(&state.power, distribution);
    state.power.quality = quality;
    state.power.deficit_ratio = deficit_ratio;

    // Battery integration.
    let power = &mut state.power;
    let net = power.generation_kw - power.load_kw;
    if net >= 0.0 {
        let charge_kw = net.min(power.max_charge_kw);
        power.battery_kwh += charge_kw * power.charge_efficiency * dt / SECONDS_PER_HOUR;
    } else {
        let draw_kw = (-net).min(power.available_discharge_kw);
        power.battery_kwh -= draw_kw / power.discharge_efficiency * dt / SECONDS_PER_HOUR;
    }
    power.battery_kwh = power.battery_kwh.clamp(0.0, power.capacity_kwh.max(0.0));
    power.soc = power.state_of_charge();

    debug_assert!(power.battery_kwh >= 0.0 && power.battery_kwh <= power.capacity_kwh.max(0.0));
    debug_assert!((0.0..=1.0).contains(&power.quality));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_factor_rises_with_state() {
        let mut last = -1.0;
        for state in [
            SystemState::Offline,
            SystemState::Critical,
            SystemState::Damaged,
            SystemState::Limited,
            SystemState::Nominal,
        ] {
            let factor = core_factor(state);
            assert!(factor > last);
            last = factor;
        }
        assert_eq!(core_factor(SystemState::Upgraded), 1.0);
    }

    #[test]
    fn test_soc_term_band() {
        assert_eq!(soc_term(0.05), 0.0);
        assert_eq!(soc_term(0.10), 0.0);
        assert!((soc_term(0.30) - 0.5).abs() < 1e-12);
        assert_eq!(soc_term(0.50), 1.0);
        assert_eq!(soc_term(0.90), 1.0);
    }

    #[test]
    fn test_quality_full_battery_no_deficit() {
        let mut power = PowerNetwork::fresh();
        power.generation_kw = 10.0;
        power.load_kw = 5.0;
        let (quality, deficit) = compute_quality(&power, SystemState::Nominal);
        assert!((quality - 1.0).abs() < 1e-12);
        assert_eq!(deficit, 0.0);

        let (penalised, _) = compute_quality(&power, SystemState::Damaged);
        assert!((penalised - 0.88).abs() < 1e-12);
    }

    #[test]
    fn test_quality_with_deficit() {
        let mut power = PowerNetwork::fresh();
        power.generation_kw = 2.0;
        power.load_kw = 4.0;
        let (quality, deficit) = compute_quality(&power, SystemState::Nominal);
        assert!((deficit - 0.5).abs() < 1e-12);
        // 0.6 * 1 + 0.4 * (1 - 0.35)
        assert!((quality - 0.86).abs() < 1e-12);
    }

    #[test]
    fn test_available_discharge_limited_by_energy() {
        let mut power = PowerNetwork::fresh();
        assert_eq!(available_discharge(&power, 1.0), MAX_DISCHARGE_KW);
        power.battery_kwh = 0.0;
        assert_eq!(available_discharge(&power, 1.0), 0.0);
        assert_eq!(available_discharge(&power, 0.0), 0.0);
    }

    #[test]
    fn test_cruise_reduces_sensors_only_partially() {
        assert_eq!(mode_multiplier(PowerMode::Cruise, SystemId::Sensors), 0.5);
        assert_eq!(mode_multiplier(PowerMode::Cruise, SystemId::PowerCore), 1.0);
        assert_eq!(mode_multiplier(PowerMode::Normal, SystemId::Sensors), 1.0);
    }
}

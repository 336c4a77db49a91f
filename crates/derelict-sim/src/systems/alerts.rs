//! Alert manager: derives the set of conditions that should be alerting
//! from the current snapshot and reconciles it with the alert table.

use std::collections::BTreeMap;

use derelict_core::constants::*;
use derelict_core::enums::{AlertKey, DroneStatus, Severity, SystemId, SystemState};
use derelict_core::events::{Alert, Event, EventData, EventKind};
use derelict_core::state::SimState;
use derelict_core::types::Source;
use tracing::info;

use super::drones;

/// An alert condition that currently holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub key: AlertKey,
    pub severity: Severity,
    pub message: String,
}

impl Condition {
    fn new(key: AlertKey, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            key,
            severity,
            message: message.into(),
        }
    }
}

/// Every alert condition holding in `state`, in key order.
pub fn evaluate(state: &SimState) -> Vec<Condition> {
    let mut out = Vec::new();
    let power = &state.power;

    if power.brownout {
        out.push(Condition::new(
            AlertKey::PowerDeficit,
            Severity::Critical,
            format!(
                "Load {:.2} kW exceeds generation {:.2} kW plus reserve",
                power.load_kw, power.generation_kw
            ),
        ));
    }

    let core = state.system(SystemId::PowerCore).map_or(SystemState::Offline, |s| s.state);
    if core <= SystemState::Damaged {
        let severity = if core <= SystemState::Critical {
            Severity::Critical
        } else {
            Severity::Warning
        };
        out.push(Condition::new(
            AlertKey::PowerCoreDegraded,
            severity,
            format!("Power core {core}; generation reduced"),
        ));
    }

    if state.bus_instability_s >= BUS_INSTABILITY_ALERT_S {
        out.push(Condition::new(
            AlertKey::DistributionUnstable,
            Severity::Warning,
            format!("Distribution bus unstable for {:.0}s", state.bus_instability_s),
        ));
    }

    if power.quality < LOW_QUALITY_ALERT {
        let severity = if power.quality < LOW_QUALITY_ESCALATE {
            Severity::Critical
        } else {
            Severity::Warning
        };
        out.push(Condition::new(
            AlertKey::LowPowerQuality,
            severity,
            format!("Power quality {:.2}", power.quality),
        ));
    }

    let soc = power.soc;
    if soc <= SOC_EXHAUSTED {
        out.push(Condition::new(
            AlertKey::BatteryReserveExhausted,
            Severity::Critical,
            "Battery reserve exhausted",
        ));
    }
    if soc < SOC_LOW_NOTICE {
        out.push(Condition::new(
            AlertKey::SocLow,
            Severity::Warning,
            format!("Battery at {:.0}%", soc * 100.0),
        ));
    }
    if soc < SOC_CRITICAL_NOTICE {
        out.push(Condition::new(
            AlertKey::SocCritical,
            Severity::Critical,
            format!("Battery at {:.0}%", soc * 100.0),
        ));
    }

    let waiting = state
        .drones
        .values()
        .any(|d| d.status == DroneStatus::Docked && d.battery < 1.0);
    if waiting && drones::charge_rate(state) <= 0.0 {
        out.push(Condition::new(
            AlertKey::DroneBayChargingUnavailable,
            Severity::Warning,
            "Docked drones cannot charge",
        ));
    }

    out.sort_by_key(|c| c.key);
    out
}

/// Update the distribution instability timer.
pub fn track_bus(state: &mut SimState, dt: f64) {
    let distribution = state
        .system(SystemId::EnergyDistribution)
        .map_or(SystemState::Offline, |s| s.state);
    state.bus_instability_s = if distribution < SystemState::Nominal {
        state.bus_instability_s + dt
    } else {
        0.0
    };
}

/// Reconcile the alert table with the conditions holding now. Newly active
/// alerts emit one `alert_raised` event; alerts whose condition cleared go
/// inactive silently.
pub fn reconcile(state: &mut SimState) {
    let t = state.now();
    let conditions = evaluate(state);

    for cond in &conditions {
        match state.alerts.get_mut(&cond.key) {
            Some(alert) if alert.active => {
                alert.last_seen = t;
                alert.severity = alert.severity.max(cond.severity);
                alert.message.clone_from(&cond.message);
            }
            _ => {
                info!(key = %cond.key, severity = ?cond.severity, "alert raised");
                state
                    .alerts
                    .insert(cond.key, Alert::raised(cond.key, cond.severity, cond.message.clone(), t));
                state.events.push(
                    t,
                    Event::new(
                        EventKind::AlertRaised,
                        cond.severity,
                        Source::Alert(cond.key),
                        cond.message.clone(),
                    )
                    .with_data(EventData::Alert {
                        key: cond.key,
                        severity: cond.severity,
                    }),
                );
            }
        }
    }

    for alert in state.alerts.values_mut() {
        if alert.active && !conditions.iter().any(|c| c.key == alert.key) {
            alert.active = false;
        }
    }
}

/// Accrue whole seconds on every active, unacknowledged alert.
pub fn accrue_unacked(alerts: &mut BTreeMap<AlertKey, Alert>, whole_s: u64) {
    if whole_s == 0 {
        return;
    }
    for alert in alerts.values_mut() {
        if alert.active && !alert.acknowledged {
            alert.unacked_s += whole_s;
        }
    }
}

/// Alert step: instability timer, reconciliation, then accrual by whole seconds.
pub fn run(state: &mut SimState, dt: f64) {
    track_bus(state, dt);
    reconcile(state);

    state.unacked_carry_s += dt;
    let whole = state.unacked_carry_s.floor();
    state.unacked_carry_s -= whole;
    accrue_unacked(&mut state.alerts, whole as u64);
}

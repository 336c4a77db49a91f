//! Dependency gate: decides whether an action or service boot may proceed
//! given the discrete states of other subsystems.

use std::collections::BTreeMap;

use derelict_core::components::{Dependency, Subsystem};
use derelict_core::enums::{SystemId, SystemState};
use derelict_core::events::BlockDetail;

/// First dependency that is not satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmetDependency {
    pub system: SystemId,
    pub target: SystemId,
    pub required: SystemState,
    /// `None` when the target subsystem does not exist.
    pub current: Option<SystemState>,
}

impl UnmetDependency {
    pub fn detail(&self) -> BlockDetail {
        BlockDetail::Dependency {
            system: self.system,
            target: self.target,
            required: self.required,
            current: self.current,
        }
    }
}

/// Check an explicit dependency list on behalf of `system`. Fails closed:
/// a missing target counts as unmet.
pub fn check_dependencies(
    systems: &BTreeMap<SystemId, Subsystem>,
    system: SystemId,
    dependencies: &[Dependency],
) -> Result<(), UnmetDependency> {
    for dep in dependencies {
        let current = systems.get(&dep.target).map(|s| s.state);
        let met = current.is_some_and(|state| state >= dep.min_state);
        if !met {
            return Err(UnmetDependency {
                system,
                target: dep.target,
                required: dep.min_state,
                current,
            });
        }
    }
    Ok(())
}

/// Hard dependencies of `system` itself (service boot, power-on).
/// A missing `system` fails closed against itself.
pub fn check_hard(
    systems: &BTreeMap<SystemId, Subsystem>,
    system: SystemId,
) -> Result<(), UnmetDependency> {
    match systems.get(&system) {
        Some(sub) => check_dependencies(systems, system, &sub.dependencies),
        None => Err(UnmetDependency {
            system,
            target: system,
            required: SystemState::Critical,
            current: None,
        }),
    }
}

/// Require `target` to be at least `min_state` for an action on behalf of `system`.
pub fn require_state(
    systems: &BTreeMap<SystemId, Subsystem>,
    system: SystemId,
    target: SystemId,
    min_state: SystemState,
) -> Result<(), UnmetDependency> {
    check_dependencies(systems, system, &[Dependency::new(target, min_state)])
}

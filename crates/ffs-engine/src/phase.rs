//! Pure transition rules of the four run phases.
//!
//! Nothing here touches files or communicators. The coordinator feeds in the
//! observed interface and the relevant counters and carries out the returned
//! action.

use ffs_core::FIRST_INTERFACE;
use serde::{Deserialize, Serialize};

/// Phase a walker is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    /// Unbiased run collecting first-interface crossings and flux counts.
    New,
    /// Taking the next seed from the library.
    Library,
    /// Picking a shooting point at the current interface.
    NewConfig,
    /// Shooting from the current configuration.
    None,
}

impl RunPhase {
    /// Stable lowercase name used in logs and summaries.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::New => "new",
            RunPhase::Library => "library",
            RunPhase::NewConfig => "new-config",
            RunPhase::None => "none",
        }
    }
}

/// Reaction to one step of the unbiased run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxAction {
    /// No basin boundary was crossed.
    Continue,
    /// Left the basin into the first interface; save the configuration.
    SaveFluxOut,
    /// Fell back from the first interface into the basin.
    CountFluxIn,
}

/// Classifies a step of the unbiased run from the previous and observed interface.
pub fn flux_transition(previous: usize, observed: usize) -> FluxAction {
    match (previous, observed) {
        (0, FIRST_INTERFACE) => FluxAction::SaveFluxOut,
        (FIRST_INTERFACE, 0) => FluxAction::CountFluxIn,
        _ => FluxAction::Continue,
    }
}

/// Whether enough first-interface crossings exist to freeze the library.
pub fn library_ready(global_count: u64, required: usize) -> bool {
    global_count >= required as u64
}

/// Decision taken when entering the library phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryAction {
    /// The library holds no seed at all.
    Fatal,
    /// Every seed has been used.
    Terminate,
    /// Shoot from the seed at `index`.
    Seed {
        /// Library position of the seed.
        index: usize,
    },
}

/// Picks the next library seed.
pub fn library_transition(library_len: usize, cursor: usize) -> LibraryAction {
    if library_len == 0 {
        LibraryAction::Fatal
    } else if cursor >= library_len {
        LibraryAction::Terminate
    } else {
        LibraryAction::Seed { index: cursor }
    }
}

/// Where a shooting trajectory stands after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotState {
    /// Neither the next interface nor the basin was reached.
    InFlight,
    /// Reached the interface right above the current one.
    Crossed,
    /// Fell back into the basin.
    Returned,
}

/// Classifies a shooting step relative to the current interface.
pub fn classify_shot(current: usize, observed: usize) -> ShotState {
    if observed == current + 1 {
        ShotState::Crossed
    } else if observed == 0 {
        ShotState::Returned
    } else {
        ShotState::InFlight
    }
}

/// Reaction to one shooting step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShootingAction {
    /// Keep integrating.
    Continue,
    /// The attempt ended and budget remains; restart from the shooting point.
    Rewind {
        /// Whether the attempt crossed and must be saved.
        save: bool,
    },
    /// The attempt ended the budget; reduce successes and resolve the cycle.
    Resolve {
        /// Whether the attempt crossed and must be saved.
        save: bool,
    },
}

/// Decides what a shooting step does. `attempts_made` counts attempts
/// already finished from the current shooting point.
pub fn shooting_transition(
    current: usize,
    observed: usize,
    attempts_made: usize,
    budget: usize,
) -> ShootingAction {
    let save = match classify_shot(current, observed) {
        ShotState::InFlight => return ShootingAction::Continue,
        ShotState::Crossed => true,
        ShotState::Returned => false,
    };
    if attempts_made + 1 < budget {
        ShootingAction::Rewind { save }
    } else {
        ShootingAction::Resolve { save }
    }
}

/// Result of a completed shooting cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum CycleOutcome {
    /// No walker reached `interface`.
    Failed {
        /// Interface that was attempted.
        interface: usize,
    },
    /// The target interface was reached; a full path exists.
    PathCompleted {
        /// Target interface.
        interface: usize,
    },
    /// Some walkers reached `interface`; shoot on from there.
    Advanced {
        /// Interface reached.
        interface: usize,
    },
}

impl CycleOutcome {
    /// Phase that follows the outcome.
    pub fn next_phase(&self) -> RunPhase {
        match self {
            CycleOutcome::Failed { .. } | CycleOutcome::PathCompleted { .. } => RunPhase::Library,
            CycleOutcome::Advanced { .. } => RunPhase::NewConfig,
        }
    }
}

/// Resolves a cycle from the global success count at the attempted interface.
pub fn resolve_cycle(interface: usize, global_successes: u64, last_interface: usize) -> CycleOutcome {
    if global_successes == 0 {
        CycleOutcome::Failed { interface }
    } else if interface >= last_interface {
        CycleOutcome::PathCompleted { interface }
    } else {
        CycleOutcome::Advanced { interface }
    }
}

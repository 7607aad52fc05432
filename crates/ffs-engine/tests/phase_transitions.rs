use ffs_engine::phase::{
    classify_shot, flux_transition, library_ready, library_transition, resolve_cycle,
    shooting_transition, FluxAction, LibraryAction, ShootingAction, ShotState,
};
use ffs_engine::{CycleOutcome, RunPhase};
use proptest::prelude::*;

#[test]
fn flux_transitions_only_count_basin_boundary() {
    assert_eq!(flux_transition(0, 1), FluxAction::SaveFluxOut);
    assert_eq!(flux_transition(1, 0), FluxAction::CountFluxIn);
    assert_eq!(flux_transition(0, 0), FluxAction::Continue);
    assert_eq!(flux_transition(1, 2), FluxAction::Continue);
    assert_eq!(flux_transition(0, 2), FluxAction::Continue);
    assert!(library_ready(3, 3));
    assert!(!library_ready(2, 3));
}

#[test]
fn library_cursor_walks_then_terminates() {
    assert_eq!(library_transition(0, 0), LibraryAction::Fatal);
    assert_eq!(library_transition(2, 1), LibraryAction::Seed { index: 1 });
    assert_eq!(library_transition(2, 2), LibraryAction::Terminate);
}

#[test]
fn cycle_outcomes_separate_failure_from_completion() {
    let failed = resolve_cycle(3, 0, 3);
    let completed = resolve_cycle(3, 1, 3);
    let advanced = resolve_cycle(2, 1, 3);
    assert_eq!(failed, CycleOutcome::Failed { interface: 3 });
    assert_eq!(completed, CycleOutcome::PathCompleted { interface: 3 });
    assert_eq!(advanced, CycleOutcome::Advanced { interface: 2 });
    assert_eq!(failed.next_phase(), RunPhase::Library);
    assert_eq!(completed.next_phase(), RunPhase::Library);
    assert_eq!(advanced.next_phase(), RunPhase::NewConfig);
}

proptest! {
    #[test]
    fn budget_yields_exactly_one_resolution(
        budget in 1usize..12,
        current in 1usize..6,
        outcomes in proptest::collection::vec(any::<bool>(), 12),
    ) {
        let mut attempts = 0;
        let mut resolved = 0;
        for crossed in outcomes.iter().take(budget) {
            let observed = if *crossed { current + 1 } else { 0 };
            match shooting_transition(current, observed, attempts, budget) {
                ShootingAction::Rewind { save } => prop_assert_eq!(save, *crossed),
                ShootingAction::Resolve { save } => {
                    prop_assert_eq!(save, *crossed);
                    resolved += 1;
                }
                ShootingAction::Continue => prop_assert!(false, "terminal step continued"),
            }
            attempts += 1;
        }
        prop_assert_eq!(resolved, 1);
        prop_assert_eq!(attempts, budget);
    }

    #[test]
    fn in_flight_values_never_end_an_attempt(current in 1usize..6, observed in 1usize..12) {
        prop_assume!(observed != current + 1);
        prop_assert_eq!(classify_shot(current, observed), ShotState::InFlight);
        prop_assert_eq!(shooting_transition(current, observed, 0, 1), ShootingAction::Continue);
    }
}

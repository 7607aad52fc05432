use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ffs_comm::{CommExt, Communicator, WalkerComms};
use ffs_core::errors::{ErrorInfo, FfsError};
use ffs_core::{InterfaceLadder, OrderParameter, RngHandle, Snapshot, FIRST_INTERFACE};
use ffs_store::{
    apply_configuration, descendants_at, extract_records, load_results, parse_index,
    write_configuration, ArtifactPaths, ConfigRecord, IndexLedger, Library, OpenMode,
    RunArtifacts, ORIGIN,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{RestartMode, RunConfig};
use crate::determinism;
use crate::phase::{
    flux_transition, library_ready, library_transition, resolve_cycle, shooting_transition,
    CycleOutcome, FluxAction, LibraryAction, RunPhase, ShootingAction,
};
use crate::summary::RunSummary;

/// What a call to [`ForwardFlux::post_integration`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    /// Keep integrating.
    Continue,
    /// Left the basin. Non-writing ranks of a replica carry no record.
    FluxOut {
        /// Record written by the replica writer.
        record: Option<ConfigRecord>,
    },
    /// Fell back into the basin.
    FluxIn,
    /// Enough crossings were collected; the library is frozen.
    LibraryBuilt {
        /// Number of seeds.
        size: usize,
    },
    /// A library seed was applied to the snapshot.
    Seeded {
        /// Seed file.
        filename: String,
        /// Library position of the seed.
        cursor: usize,
    },
    /// A shooting point at `interface` was applied to the snapshot.
    ShootingPoint {
        /// Chosen configuration.
        filename: String,
        /// Interface the configuration sits at.
        interface: usize,
    },
    /// An attempt ended; the snapshot was reset to the shooting point.
    Rewind {
        /// Whether the attempt reached the next interface.
        crossed: bool,
    },
    /// The shot budget is used up and the cycle resolved.
    Resolved {
        /// Outcome of the cycle.
        outcome: CycleOutcome,
        /// Global successes at the attempted interface.
        successes: u64,
    },
    /// Every seed has been used; the run is finished.
    Terminated,
}

/// Result of one coordinator step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Phase the next step will run in.
    pub phase: RunPhase,
    /// What this step did.
    pub action: StepAction,
    /// Classified shooting steps so far.
    pub iteration: u64,
}

#[derive(Debug, Clone)]
struct ShootingPoint {
    filename: String,
    content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ResumeState {
    library: Vec<ConfigRecord>,
    completed_seeds: usize,
    flux_in: u64,
    flux_out: u64,
    carried: Vec<ConfigRecord>,
}

/// Outcome shipped from the bookkeeping rank. Errors are carried as JSON text.
#[derive(Serialize, Deserialize)]
enum Shared<T> {
    Ready(T),
    Failed(String),
}

/// Runs `produce` on world rank 0 and hands its outcome to every rank.
fn from_bookkeeper<T, F>(world: &dyn Communicator, produce: F) -> Result<T, FfsError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Result<T, FfsError>,
{
    let shared = if world.rank() == 0 {
        let local = match produce() {
            Ok(value) => Shared::Ready(value),
            Err(err) => Shared::Failed(serde_json::to_string(&err).map_err(|json| {
                FfsError::Serde(ErrorInfo::new("shared-encode", json.to_string()))
            })?),
        };
        world.broadcast(0, Some(&local))?
    } else {
        world.broadcast::<Shared<T>>(0, None)?
    };
    match shared {
        Shared::Ready(value) => Ok(value),
        Shared::Failed(json) => Err(serde_json::from_str(&json).map_err(|err| {
            FfsError::Serde(ErrorInfo::new("shared-decode", err.to_string()))
        })?),
    }
}

fn read_optional(path: &Path) -> Result<String, FfsError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(FfsError::io("resume-read", path, err)),
    }
}

/// Reads the persisted logs. A mid-shot resume carries the records at the
/// resume interface that descend from the interrupted seed.
fn load_resume(paths: &ArtifactPaths, restart: RestartMode) -> Result<ResumeState, FfsError> {
    let library = parse_index(&read_optional(&paths.library)?)?;
    let results = load_results(&paths.results)?;
    let carried = match (restart, library.get(results.rows.len())) {
        (RestartMode::MidShot { interface }, Some(seed)) => {
            let index = parse_index(&read_optional(&paths.index)?)?;
            descendants_at(interface, &index, &seed.filename)
        }
        _ => Vec::new(),
    };
    Ok(ResumeState {
        library,
        completed_seeds: results.rows.len(),
        flux_in: results.flux_in.unwrap_or(0),
        flux_out: results.flux_out.unwrap_or(0),
        carried,
    })
}

/// Forward-flux coordinator of one walker.
///
/// Every walker of the run owns one coordinator and calls
/// [`ForwardFlux::post_integration`] after each integration step. All walkers
/// must step in lockstep: global decisions go through blocking collectives on
/// the world communicator.
pub struct ForwardFlux {
    config: RunConfig,
    ladder: InterfaceLadder,
    comms: WalkerComms,
    cv: Box<dyn OrderParameter>,
    phase: RunPhase,
    artifacts: Option<RunArtifacts>,
    ledger: IndexLedger,
    library: Library,
    dump_dir: PathBuf,
    rng: RngHandle,
    shooting: Option<ShootingPoint>,
    local_successes: Vec<u64>,
    global_successes: Vec<u64>,
    flux_in: u64,
    flux_out: u64,
    previous: usize,
    current: usize,
    cursor: usize,
    attempts: usize,
    iteration: u64,
    flux_steps: u64,
    dump_counter: u64,
    replica_tag: usize,
    cycles_run: bool,
    prepared: bool,
    terminated: bool,
    finalized: bool,
    aborted: bool,
}

impl std::fmt::Debug for ForwardFlux {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardFlux")
            .field("comms", &self.comms)
            .field("phase", &self.phase)
            .field("current", &self.current)
            .field("cursor", &self.cursor)
            .field("attempts", &self.attempts)
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}

impl ForwardFlux {
    /// Validates the configuration and binds exactly one order parameter.
    pub fn new(
        config: RunConfig,
        comms: WalkerComms,
        mut cvs: Vec<Box<dyn OrderParameter>>,
    ) -> Result<Self, FfsError> {
        let ladder = config.validate()?;
        if cvs.len() != 1 {
            return Err(FfsError::Config(
                ErrorInfo::new("cv-count", "forward flux requires exactly one order parameter")
                    .with_context("configured", cvs.len().to_string()),
            ));
        }
        let cv = cvs.remove(0);
        let rng = determinism::pick_rng(
            config.seed_policy.master_seed,
            config.seed_policy.label.as_deref(),
        );
        let interfaces = ladder.len();
        Ok(Self {
            dump_dir: config.output.dump_directory(),
            phase: RunPhase::New,
            config,
            ladder,
            comms,
            cv,
            artifacts: None,
            ledger: IndexLedger::new(),
            library: Library::default(),
            rng,
            shooting: None,
            local_successes: vec![0; interfaces],
            global_successes: vec![0; interfaces],
            flux_in: 0,
            flux_out: 0,
            previous: 0,
            current: FIRST_INTERFACE,
            cursor: 0,
            attempts: 0,
            iteration: 0,
            flux_steps: 0,
            dump_counter: 0,
            replica_tag: 0,
            cycles_run: false,
            prepared: false,
            terminated: false,
            finalized: false,
            aborted: false,
        })
    }

    /// Phase the next step runs in.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Interface the current shooting point sits at.
    pub fn current_interface(&self) -> usize {
        self.current
    }

    /// Library position of the next seed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Classified shooting steps so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Flux-in and flux-out counters. Global once the library is frozen.
    pub fn flux_counts(&self) -> (u64, u64) {
        (self.flux_in, self.flux_out)
    }

    /// Frozen library, empty before it is built.
    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Global successes of the current seed, per interface.
    pub fn global_successes(&self) -> &[u64] {
        &self.global_successes
    }

    /// Validated interface ladder.
    pub fn ladder(&self) -> &InterfaceLadder {
        &self.ladder
    }

    /// Whether the library was exhausted.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Opens the run logs and restores persisted state for resumed runs.
    ///
    /// Collective over both communicators.
    pub fn pre_simulation(&mut self, snapshot: &Snapshot) -> Result<(), FfsError> {
        self.cv.initialize(snapshot)?;
        self.cv.evaluate(snapshot)?;
        self.previous = self.ladder.locate(self.cv.value());

        let world_rank = self.comms.world.rank();
        self.replica_tag = self.comms.replica.broadcast(0, Some(&world_rank))?;

        let world = Arc::clone(&self.comms.world);
        let restart = self.config.restart;
        let paths = self.config.output.artifact_paths();
        let dump_dir = self.dump_dir.clone();
        let mode = if restart.is_resume() {
            OpenMode::Append
        } else {
            OpenMode::Truncate
        };
        let artifacts = &mut self.artifacts;
        let resume = from_bookkeeper(world.as_ref(), || {
            fs::create_dir_all(&dump_dir)
                .map_err(|err| FfsError::io("dump-mkdir", &dump_dir, err))?;
            *artifacts = Some(RunArtifacts::open(&paths, mode)?);
            if restart.is_resume() {
                load_resume(&paths, restart).map(Some)
            } else {
                Ok(None)
            }
        });
        let resume = match resume {
            Ok(resume) => resume,
            Err(err) => return Err(self.fail(err)),
        };

        match (restart, resume) {
            (RestartMode::Library, Some(state)) => {
                self.restore(state);
                self.phase = RunPhase::Library;
            }
            (RestartMode::MidShot { interface }, Some(state)) => {
                let carried = state.carried.clone();
                self.restore(state);
                self.ledger.carry(carried);
                self.cursor += 1;
                self.current = interface;
                self.cycles_run = true;
                self.phase = RunPhase::NewConfig;
            }
            _ => self.phase = RunPhase::New,
        }
        self.prepared = true;
        info!(
            walker = world_rank,
            replica = self.replica_tag,
            phase = self.phase.as_str(),
            cursor = self.cursor,
            library = self.library.len(),
            "forward flux prepared"
        );
        Ok(())
    }

    fn restore(&mut self, state: ResumeState) {
        self.library = Library::build(&state.library);
        self.flux_in = state.flux_in;
        self.flux_out = state.flux_out;
        self.cursor = state.completed_seeds;
    }

    /// Advances the coordinator by one integration step.
    ///
    /// Fatal conditions finalize the run, abort the walker population and are
    /// returned as errors.
    pub fn post_integration(&mut self, snapshot: &mut Snapshot) -> Result<StepReport, FfsError> {
        if !self.prepared {
            return Err(FfsError::Config(
                ErrorInfo::new("not-prepared", "pre_simulation must run before stepping")
                    .with_hint("call ForwardFlux::pre_simulation with the initial snapshot"),
            ));
        }
        if self.terminated {
            return Ok(self.report(StepAction::Terminated));
        }
        let outcome = match self.phase {
            RunPhase::New => self.step_flux(snapshot),
            RunPhase::Library => self.step_library(snapshot),
            RunPhase::NewConfig => self.step_new_config(snapshot),
            RunPhase::None => self.step_shooting(snapshot),
        };
        match outcome {
            Ok(action) => Ok(self.report(action)),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn report(&self, action: StepAction) -> StepReport {
        StepReport {
            phase: self.phase,
            action,
            iteration: self.iteration,
        }
    }

    fn step_flux(&mut self, snapshot: &mut Snapshot) -> Result<StepAction, FfsError> {
        self.cv.evaluate(snapshot)?;
        let observed = self.ladder.locate(self.cv.value());
        let writer = self.comms.is_replica_writer();
        let mut action = match flux_transition(self.previous, observed) {
            FluxAction::SaveFluxOut => {
                let record = self.save(snapshot, FIRST_INTERFACE, ORIGIN)?;
                if writer {
                    self.flux_out += 1;
                }
                StepAction::FluxOut { record }
            }
            FluxAction::CountFluxIn => {
                if writer {
                    self.flux_in += 1;
                }
                StepAction::FluxIn
            }
            FluxAction::Continue => StepAction::Continue,
        };
        self.previous = observed;

        self.flux_steps += 1;
        if self.flux_steps % self.config.flux_sync_interval == 0 {
            let local = self.ledger.count_at(FIRST_INTERFACE) as u64;
            let global = self.comms.world.all_reduce_sum(local)?;
            debug!(local, global, "first-interface crossings");
            if library_ready(global, self.config.required_configs) {
                action = self.freeze_library()?;
            }
        }
        Ok(action)
    }

    fn freeze_library(&mut self) -> Result<StepAction, FfsError> {
        let world = Arc::clone(&self.comms.world);
        let records = self.ledger.flush(world.as_ref())?;
        self.library = Library::build(&records);
        let flux = world.all_reduce_sum_vec(&[self.flux_in, self.flux_out])?;
        self.flux_in = flux[0];
        self.flux_out = flux[1];
        if let Some(artifacts) = self.artifacts.as_mut() {
            artifacts.append_index(&records)?;
            artifacts.write_library(&self.library)?;
        }
        self.cursor = 0;
        self.phase = RunPhase::Library;
        info!(
            library = self.library.len(),
            flux_in = self.flux_in,
            flux_out = self.flux_out,
            "library frozen"
        );
        Ok(StepAction::LibraryBuilt {
            size: self.library.len(),
        })
    }

    fn step_library(&mut self, snapshot: &mut Snapshot) -> Result<StepAction, FfsError> {
        let world = Arc::clone(&self.comms.world);
        if self.cycles_run {
            if let Some(artifacts) = self.artifacts.as_mut() {
                artifacts.append_results_row(&self.global_successes)?;
            }
        }
        let flushed = self.ledger.flush(world.as_ref())?;
        if let Some(artifacts) = self.artifacts.as_mut() {
            artifacts.append_index(&flushed)?;
        }

        self.attempts = 0;
        self.local_successes.iter_mut().for_each(|count| *count = 0);
        self.global_successes.iter_mut().for_each(|count| *count = 0);
        self.current = FIRST_INTERFACE;

        match library_transition(self.library.len(), self.cursor) {
            LibraryAction::Fatal => Err(FfsError::Exhausted(
                ErrorInfo::new("library-empty", "no configurations were saved at the first interface")
                    .with_hint("the flux run produced no basin exits; check the interface placement"),
            )),
            LibraryAction::Terminate => {
                info!(seeds = self.library.len(), "library exhausted, ending run");
                self.terminated = true;
                self.finalize()?;
                Ok(StepAction::Terminated)
            }
            LibraryAction::Seed { index } => {
                let filename = self
                    .library
                    .get(index)
                    .map(|record| record.filename.clone())
                    .ok_or_else(|| {
                        FfsError::Exhausted(
                            ErrorInfo::new("library-cursor", "library cursor out of range")
                                .with_context("cursor", index.to_string()),
                        )
                    })?;
                self.load_seed(snapshot, &filename)?;
                self.cursor += 1;
                self.cycles_run = true;
                self.phase = RunPhase::None;
                debug!(cursor = index, seed = %filename, "seeded from library");
                Ok(StepAction::Seeded {
                    filename,
                    cursor: index,
                })
            }
        }
    }

    fn step_new_config(&mut self, snapshot: &mut Snapshot) -> Result<StepAction, FfsError> {
        let world = Arc::clone(&self.comms.world);
        self.attempts = 0;
        let merged = self.ledger.merged(world.as_ref())?;
        let interface = self.current;
        let candidates = extract_records(interface, &merged).ok_or_else(|| {
            FfsError::Exhausted(
                ErrorInfo::new("interface-empty", "no configurations recorded at the interface")
                    .with_context("interface", interface.to_string()),
            )
        })?;
        let rng = &mut self.rng;
        let filename = from_bookkeeper(world.as_ref(), || {
            let index = rng.pick_index(candidates.len()).ok_or_else(|| {
                FfsError::Exhausted(ErrorInfo::new("interface-empty", "no candidates to pick"))
            })?;
            Ok(candidates[index].filename.clone())
        })?;
        self.load_seed(snapshot, &filename)?;
        self.phase = RunPhase::None;
        debug!(interface, seed = %filename, candidates = candidates.len(), "picked shooting point");
        Ok(StepAction::ShootingPoint {
            filename,
            interface,
        })
    }

    fn step_shooting(&mut self, snapshot: &mut Snapshot) -> Result<StepAction, FfsError> {
        self.iteration += 1;
        self.cv.evaluate(snapshot)?;
        let observed = self.ladder.locate(self.cv.value());
        let (save, resolve) = match shooting_transition(
            self.current,
            observed,
            self.attempts,
            self.config.shots_per_point,
        ) {
            ShootingAction::Continue => return Ok(StepAction::Continue),
            ShootingAction::Rewind { save } => (save, false),
            ShootingAction::Resolve { save } => (save, true),
        };

        let target = self.current + 1;
        if save {
            let parent = self.shooting_point()?.filename.clone();
            self.save(snapshot, target, &parent)?;
        }
        self.attempts += 1;

        if !resolve {
            self.rewind(snapshot)?;
            return Ok(StepAction::Rewind { crossed: save });
        }

        self.current = target;
        let successes = self
            .comms
            .world
            .all_reduce_sum(self.local_successes[target])?;
        self.local_successes[target] = 0;
        self.global_successes[target] += successes;
        let outcome = resolve_cycle(target, successes, self.ladder.last());
        if let CycleOutcome::Advanced { .. } = outcome {
            let persisted = self.ledger.checkpoint(self.comms.world.as_ref())?;
            if let Some(artifacts) = self.artifacts.as_mut() {
                artifacts.append_index(&persisted)?;
            }
        }
        self.phase = outcome.next_phase();
        info!(
            interface = target,
            successes,
            attempts = self.attempts,
            next = self.phase.as_str(),
            "shooting cycle resolved"
        );
        Ok(StepAction::Resolved { outcome, successes })
    }

    /// Names the next dump after `interface` and, on the replica writer,
    /// writes it and counts the success.
    fn save(
        &mut self,
        snapshot: &mut Snapshot,
        interface: usize,
        parent: &str,
    ) -> Result<Option<ConfigRecord>, FfsError> {
        let name = self.dump_dir.join(determinism::dump_name(
            interface,
            self.replica_tag,
            self.dump_counter,
        ));
        self.dump_counter += 1;
        snapshot.set_tag(name.display().to_string());
        if !self.comms.is_replica_writer() {
            return Ok(None);
        }
        let record = write_configuration(snapshot, interface, parent, &mut self.ledger)?;
        self.local_successes[interface] += 1;
        Ok(Some(record))
    }

    /// Reads `filename` on the bookkeeping rank and applies the broadcast
    /// content on every walker.
    fn load_seed(&mut self, snapshot: &mut Snapshot, filename: &str) -> Result<(), FfsError> {
        let world = Arc::clone(&self.comms.world);
        let content = from_bookkeeper(world.as_ref(), || {
            fs::read_to_string(filename)
                .map_err(|err| FfsError::io("seed-read", Path::new(filename), err))
        })?;
        apply_configuration(snapshot, filename, &content)?;
        self.shooting = Some(ShootingPoint {
            filename: filename.to_string(),
            content,
        });
        Ok(())
    }

    fn shooting_point(&self) -> Result<&ShootingPoint, FfsError> {
        self.shooting.as_ref().ok_or_else(|| {
            FfsError::Config(ErrorInfo::new(
                "no-shooting-point",
                "shooting step taken before any configuration was loaded",
            ))
        })
    }

    fn rewind(&mut self, snapshot: &mut Snapshot) -> Result<(), FfsError> {
        let point = self.shooting_point()?;
        apply_configuration(snapshot, &point.filename, &point.content)
    }

    /// Builds the summary of the current state.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            phase: self.phase,
            iteration: self.iteration,
            cursor: self.cursor,
            library_size: self.library.len(),
            library_digest: self.library.digest(),
            flux_in: self.flux_in,
            flux_out: self.flux_out,
            master_seed: self.config.seed_policy.master_seed,
            seed_label: self.config.seed_policy.label.clone(),
            aborted: self.aborted,
            finished_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Writes the flux counters and the run summary, then closes the logs.
    ///
    /// Runs at most once; later calls do nothing. Only the bookkeeping rank
    /// holds logs, so other walkers return immediately.
    pub fn finalize(&mut self) -> Result<(), FfsError> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        let Some(mut artifacts) = self.artifacts.take() else {
            return Ok(());
        };
        artifacts.write_flux(self.flux_in, self.flux_out)?;
        artifacts.close()?;
        self.summary()
            .write(&self.config.output.summary_path())?;
        info!(
            flux_in = self.flux_in,
            flux_out = self.flux_out,
            aborted = self.aborted,
            "forward flux finalized"
        );
        Ok(())
    }

    fn fail(&mut self, err: FfsError) -> FfsError {
        error!(
            walker = self.comms.world.rank(),
            phase = self.phase.as_str(),
            %err,
            "aborting walker population"
        );
        self.aborted = true;
        if let Err(flush) = self.finalize() {
            warn!(%flush, "finalize failed during abort");
        }
        self.comms.world.abort(err.abort_code());
        err
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use ffs_core::errors::{ErrorInfo, FfsError};
use ffs_core::InterfaceLadder;
use ffs_store::ArtifactPaths;
use serde::{Deserialize, Serialize};

/// YAML-configurable parameters governing a forward-flux run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Interface boundary values, strictly increasing, at least three.
    pub interfaces: Vec<f64>,
    /// Shooting attempts made from every starting configuration.
    #[serde(default = "default_shots_per_point")]
    pub shots_per_point: usize,
    /// First-interface crossings required before the library is frozen.
    #[serde(default = "default_required_configs")]
    pub required_configs: usize,
    /// Steps between global checks of the first-interface count.
    #[serde(default = "default_flux_sync_interval")]
    pub flux_sync_interval: u64,
    /// How the run starts.
    #[serde(default)]
    pub restart: RestartMode,
    /// Seed of the shooting-point draw.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Output layout.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_shots_per_point() -> usize {
    10
}

fn default_required_configs() -> usize {
    100
}

fn default_flux_sync_interval() -> u64 {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            interfaces: vec![0.0, 1.0, 2.0],
            shots_per_point: default_shots_per_point(),
            required_configs: default_required_configs(),
            flux_sync_interval: default_flux_sync_interval(),
            restart: RestartMode::default(),
            seed_policy: SeedPolicy::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Starting point of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum RestartMode {
    /// Generate the flux library from scratch.
    #[default]
    Fresh,
    /// Reuse the persisted library and continue with the next unfinished seed.
    Library,
    /// Resume the interrupted seed by picking a new shooting point at `interface`.
    MidShot {
        /// Interface the interrupted cycle had reached.
        interface: usize,
    },
}

impl RestartMode {
    /// Whether the run continues persisted logs.
    pub fn is_resume(&self) -> bool {
        !matches!(self, RestartMode::Fresh)
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed of the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label mixed into the shooting-point stream.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Output layout. Relative names resolve against `run_directory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Index log of every saved configuration.
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,
    /// Results log of success rows and flux counters.
    #[serde(default = "default_results_file")]
    pub results_file: PathBuf,
    /// Library log.
    #[serde(default = "default_library_file")]
    pub library_file: PathBuf,
    /// Directory receiving configuration dumps.
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,
    /// JSON run summary written at shutdown.
    #[serde(default = "default_summary_file")]
    pub summary_file: PathBuf,
}

fn default_index_file() -> PathBuf {
    PathBuf::from("ffs_index.dat")
}

fn default_results_file() -> PathBuf {
    PathBuf::from("ffs_results.dat")
}

fn default_library_file() -> PathBuf {
    PathBuf::from("library_input.dat")
}

fn default_dump_dir() -> PathBuf {
    PathBuf::from("dumps")
}

fn default_summary_file() -> PathBuf {
    PathBuf::from("summary.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            index_file: default_index_file(),
            results_file: default_results_file(),
            library_file: default_library_file(),
            dump_dir: default_dump_dir(),
            summary_file: default_summary_file(),
        }
    }
}

impl OutputConfig {
    /// Resolves a configured name against the run directory.
    pub fn resolve(&self, name: &Path) -> PathBuf {
        match &self.run_directory {
            Some(root) => root.join(name),
            None => name.to_path_buf(),
        }
    }

    /// Resolved locations of the three run logs.
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            index: self.resolve(&self.index_file),
            results: self.resolve(&self.results_file),
            library: self.resolve(&self.library_file),
        }
    }

    /// Resolved dump directory.
    pub fn dump_directory(&self) -> PathBuf {
        self.resolve(&self.dump_dir)
    }

    /// Resolved summary location.
    pub fn summary_path(&self) -> PathBuf {
        self.resolve(&self.summary_file)
    }
}

fn invalid(code: &str, message: &str) -> FfsError {
    FfsError::Config(ErrorInfo::new(code, message))
}

impl RunConfig {
    /// Parses a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, FfsError> {
        serde_yaml::from_str(text)
            .map_err(|err| FfsError::Serde(ErrorInfo::new("config-parse", err.to_string())))
    }

    /// Loads a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, FfsError> {
        let contents =
            fs::read_to_string(path).map_err(|err| FfsError::io("config-read", path, err))?;
        Self::from_yaml_str(&contents).map_err(|err| match err {
            FfsError::Serde(info) => {
                FfsError::Serde(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Checks budgets, paths and restart mode, returning the validated ladder.
    pub fn validate(&self) -> Result<InterfaceLadder, FfsError> {
        let ladder = InterfaceLadder::new(self.interfaces.clone())?;
        if ladder.len() < 3 {
            return Err(FfsError::Config(
                ErrorInfo::new("ladder-too-short-for-shooting", "library seeds sit at the first interface, so shooting needs one above it")
                    .with_context("interfaces", ladder.len().to_string())
                    .with_hint("add at least one interface between the first and the target"),
            ));
        }
        if self.shots_per_point == 0 {
            return Err(invalid("shots-zero", "shots_per_point must be positive"));
        }
        if self.required_configs == 0 {
            return Err(invalid("required-zero", "required_configs must be positive"));
        }
        if self.flux_sync_interval == 0 {
            return Err(invalid("sync-zero", "flux_sync_interval must be positive"));
        }
        let dump_dir = self.output.dump_directory();
        if dump_dir.to_string_lossy().chars().any(char::is_whitespace) {
            return Err(FfsError::Config(
                ErrorInfo::new("dump-dir-whitespace", "dump names are whitespace-separated tokens")
                    .with_context("path", dump_dir.display().to_string())
                    .with_hint("choose a dump directory without spaces"),
            ));
        }
        if let RestartMode::MidShot { interface } = self.restart {
            if interface == 0 || interface >= ladder.last() {
                return Err(FfsError::Config(
                    ErrorInfo::new("restart-interface", "mid-shot interface must lie strictly between the basin and the target")
                        .with_context("interface", interface.to_string())
                        .with_context("last", ladder.last().to_string()),
                ));
            }
        }
        Ok(ladder)
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scenario preferences and the stores they persist to.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Result};
use broadphase_geom::BroadPhaseMode;
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::sim::SPAWN_MARGIN;

/// Key under which [`ScenarioPrefs`] are stored.
pub const SCENARIO_KEY: &str = "scenario";

/// Storage port for raw config blobs (keyed by logical name).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Serializes values as JSON and delegates storage to a [`ConfigStore`].
#[derive(Debug)]
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize the value for `key`. Returns `Ok(None)` if missing.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialize and persist `value` under `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }
}

/// Stores configs as `<key>.json` files under a base directory.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory (e.g. `~/.config/broadphase`).
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "broadphase")
            .ok_or_else(|| ConfigError::Other("could not resolve config dir".into()))?;
        Self::with_base(proj.config_dir())
    }

    /// Create a store rooted at `base`, creating the directory if needed.
    pub fn with_base(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Directory holding the JSON files.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

/// Volatile store for tests and `--no-config` runs.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    entries: RefCell<BTreeMap<String, Vec<u8>>>,
}

impl ConfigStore for MemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        self.entries
            .borrow()
            .get(key)
            .cloned()
            .ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.entries.borrow_mut().insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}

/// Persisted scenario knobs. Missing fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioPrefs {
    /// Number of live shapes.
    pub shape_count: usize,
    /// Scene seed.
    pub seed: u64,
    /// World width in units.
    pub world_width: f32,
    /// World height in units.
    pub world_height: f32,
    /// Multiplier applied to `dt` before integration.
    pub speed_mult: f32,
    /// Fixed tick length in seconds.
    pub dt: f32,
    /// Candidate source.
    pub mode: BroadPhaseMode,
    /// Also compute brute force and flag mismatches.
    pub compare_brute_force: bool,
}

impl Default for ScenarioPrefs {
    fn default() -> Self {
        Self {
            shape_count: 30,
            seed: 0x5eed,
            world_width: 1400.0,
            world_height: 800.0,
            speed_mult: 1.0,
            dt: 1.0 / 60.0,
            mode: BroadPhaseMode::Bvh,
            compare_brute_force: false,
        }
    }
}

impl ScenarioPrefs {
    /// Checks that a scene can be built and integrated from these prefs.
    ///
    /// # Errors
    /// Fails when `speed_mult` or `dt` is not finite, or when either world
    /// dimension leaves no room for the spawn margin.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.speed_mult.is_finite(), "speed multiplier {} is not finite", self.speed_mult);
        ensure!(self.dt.is_finite(), "tick length {} is not finite", self.dt);
        let min = 2.0 * SPAWN_MARGIN;
        ensure!(
            self.world_width.is_finite() && self.world_width > min,
            "world width {} must be finite and above {min}",
            self.world_width
        );
        ensure!(
            self.world_height.is_finite() && self.world_height > min,
            "world height {} must be finite and above {min}",
            self.world_height
        );
        Ok(())
    }

    /// Loads prefs from `service`, falling back to defaults on any failure.
    ///
    /// Stored prefs that fail [`ScenarioPrefs::validate`] are ignored too.
    pub fn load_or_default<S: ConfigStore>(service: &ConfigService<S>) -> Self {
        match service.load::<Self>(SCENARIO_KEY) {
            Ok(Some(prefs)) => match prefs.validate() {
                Ok(()) => prefs,
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring invalid scenario prefs");
                    Self::default()
                }
            },
            Ok(None) => Self::default(),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable scenario prefs");
                Self::default()
            }
        }
    }
}

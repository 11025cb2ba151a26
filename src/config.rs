// Configuration for TodoStore

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::storage::{DEFAULT_SLOT, FileSlots, Persistence, SlotBackend, SqliteSlots};
use crate::transfer::ImportMode;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "TODOSTORE_CONFIG";

/// Environment variable overriding `data_dir`
pub const DATA_DIR_ENV: &str = "TODOSTORE_DATA_DIR";

/// File name of the SQLite database when `backend: sqlite`
pub const DB_FILE_NAME: &str = "todostore.db";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One JSON file per slot
    #[default]
    File,
    /// Slots table in a SQLite database
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the slot files or database
    pub data_dir: PathBuf,
    pub backend: BackendKind,
    /// Slot key the todo array is stored under
    pub slot: String,
    pub import_mode: ImportMode,
    /// Fallback tracing filter when RUST_LOG is unset
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("todostore"))
        .unwrap_or_else(|| PathBuf::from(".todostore"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: BackendKind::default(),
            slot: DEFAULT_SLOT.to_string(),
            import_mode: ImportMode::default(),
            log_level: "warn".to_string(),
        }
    }
}

impl Config {
    /// `config.yaml` under the user config directory
    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("todostore").join("config.yaml"))
    }

    /// Load from `path`, else `TODOSTORE_CONFIG`, else the user config dir,
    /// then apply the `TODOSTORE_DATA_DIR` override.
    ///
    /// A file named by `path` or the environment must exist. Only a missing
    /// file in the user config dir falls back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let named = path.map(Path::to_path_buf).or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        let mut config = match named {
            Some(p) => {
                if !p.is_file() {
                    return Err(eyre!("Config file {:?} does not exist", p));
                }
                Self::load_from(&p)?
            }
            None => match Self::user_path() {
                Some(p) if p.exists() => Self::load_from(&p)?,
                _ => {
                    debug!("No config file, using defaults");
                    Self::default()
                }
            },
        };
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Load config from a specific file, without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Open the configured slot backend
    pub fn open_backend(&self) -> Result<Box<dyn SlotBackend>> {
        let backend: Box<dyn SlotBackend> = match self.backend {
            BackendKind::File => Box::new(FileSlots::open(&self.data_dir)?),
            BackendKind::Sqlite => Box::new(SqliteSlots::open(self.data_dir.join(DB_FILE_NAME))?),
        };
        Ok(backend)
    }

    /// Persistence adapter over the configured backend and slot
    pub fn open_persistence(&self) -> Result<Persistence> {
        Persistence::new(self.open_backend()?, &self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use tempfile::TempDir;

    // Tests touching process environment run one at a time
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct EnvVars {
        _lock: MutexGuard<'static, ()>,
    }

    impl EnvVars {
        fn lock() -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
            clear_env();
            Self { _lock: lock }
        }

        fn set(&self, key: &str, value: impl AsRef<OsStr>) {
            // SAFETY: every test that reads or writes these vars holds ENV_LOCK
            unsafe { std::env::set_var(key, value) };
        }
    }

    impl Drop for EnvVars {
        fn drop(&mut self) {
            clear_env();
        }
    }

    fn clear_env() {
        // SAFETY: only called while ENV_LOCK is held
        unsafe {
            std::env::remove_var(CONFIG_ENV);
            std::env::remove_var(DATA_DIR_ENV);
        }
    }

    fn write_config(dir: &Path, name: &str, slot: &str) -> PathBuf {
        let path = dir.join(name);
        let config = Config {
            data_dir: dir.join("from-yaml"),
            slot: slot.to_string(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend, BackendKind::File);
        assert_eq!(config.slot, "todos");
        assert_eq!(config.import_mode, ImportMode::Strict);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "backend: sqlite\nimport_mode: lenient\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.import_mode, ImportMode::Lenient);
        assert_eq!(config.slot, "todos");
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "backend: [nope").unwrap();
        assert!(Config::load_from(&path).is_err());

        fs::write(&path, "backend: postgres\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.yaml");
        let config = Config {
            data_dir: temp.path().join("data"),
            slot: "work-todos".to_string(),
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_explicit_path_beats_env() {
        let env = EnvVars::lock();
        let temp = TempDir::new().unwrap();
        let flag = write_config(temp.path(), "flag.yaml", "from-flag");
        let from_env = write_config(temp.path(), "env.yaml", "from-env");
        env.set(CONFIG_ENV, &from_env);

        let config = Config::load(Some(flag.as_path())).unwrap();
        assert_eq!(config.slot, "from-flag");
        assert_eq!(config.data_dir, temp.path().join("from-yaml"));
    }

    #[test]
    fn test_env_path_used_without_flag() {
        let env = EnvVars::lock();
        let temp = TempDir::new().unwrap();
        let from_env = write_config(temp.path(), "env.yaml", "from-env");
        env.set(CONFIG_ENV, &from_env);

        let config = Config::load(None).unwrap();
        assert_eq!(config.slot, "from-env");
    }

    #[test]
    fn test_data_dir_env_overrides_yaml() {
        let env = EnvVars::lock();
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "config.yaml", "todos");
        let override_dir = temp.path().join("override");
        env.set(DATA_DIR_ENV, &override_dir);

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.data_dir, override_dir);
        assert_eq!(Config::load_from(&path).unwrap().data_dir, temp.path().join("from-yaml"));
    }

    #[test]
    fn test_missing_named_config_is_error() {
        let env = EnvVars::lock();
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("typo.yaml");

        let err = Config::load(Some(missing.as_path())).unwrap_err();
        assert!(err.to_string().contains("does not exist"));

        env.set(CONFIG_ENV, &missing);
        assert!(Config::load(None).is_err());
    }

    #[test]
    fn test_open_backends() {
        let temp = TempDir::new().unwrap();
        let mut config = Config {
            data_dir: temp.path().to_path_buf(),
            ..Config::default()
        };

        let mut persistence = config.open_persistence().unwrap();
        assert!(persistence.save(&[]));
        assert!(temp.path().join("todos.json").exists());

        config.backend = BackendKind::Sqlite;
        let mut persistence = config.open_persistence().unwrap();
        assert!(persistence.save(&[]));
        assert!(temp.path().join(DB_FILE_NAME).exists());
    }

    #[test]
    fn test_bad_slot_key_rejected() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp.path().to_path_buf(),
            slot: "no spaces".to_string(),
            ..Config::default()
        };
        assert!(config.open_persistence().is_err());
    }
}

/*
 * Manages the persisted user preferences that seed a run: the last-used
 * source folder, destination folder, and threshold string. These are read at
 * start and written back at run start before validation, so the next launch
 * remembers even inputs that failed to validate.
 *
 * It uses a trait-based approach (`SettingsManagerOperations`) to allow for
 * different storage backends or mock implementations for testing. The
 * concrete implementation (`CoreSettingsManager`) stores a JSON file in the
 * platform-specific local configuration directory for the application.
 */
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

const SETTINGS_FILENAME: &str = "settings.json";

#[derive(Debug)]
pub enum SettingsError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoConfigDirectory,
}

impl From<io::Error> for SettingsError {
    fn from(err: io::Error) -> Self {
        SettingsError::Io(err)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        SettingsError::Serde(err)
    }
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "Settings I/O error: {e}"),
            SettingsError::Serde(e) => write!(f, "Settings serialization error: {e}"),
            SettingsError::NoConfigDirectory => {
                write!(f, "Could not determine configuration directory for settings")
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Io(e) => Some(e),
            SettingsError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/*
 * The externally-supplied defaults for a run. All fields are stored as the
 * raw strings the user last entered; validation happens in the pipeline.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub source_folder: String,
    #[serde(default)]
    pub destination_folder: String,
    #[serde(default)]
    pub token_threshold: String,
}

pub trait SettingsManagerOperations: Send + Sync {
    fn load_settings(&self, app_name: &str) -> Result<AppSettings>;
    fn save_settings(&self, app_name: &str, settings: &AppSettings) -> Result<()>;
}

pub struct CoreSettingsManager {}

impl CoreSettingsManager {
    pub fn new() -> Self {
        CoreSettingsManager {}
    }

    /*
     * Resolves (and creates if necessary) the application's local
     * configuration directory via `ProjectDirs`, without an organization
     * qualifier.
     */
    fn config_dir(app_name: &str) -> Option<PathBuf> {
        ProjectDirs::from("", "", app_name).and_then(|dirs| {
            let dir = dirs.config_local_dir();
            if !dir.exists() {
                if let Err(e) = fs::create_dir_all(dir) {
                    log::error!(
                        "CoreSettingsManager: Failed to create config directory {dir:?}: {e}"
                    );
                    return None;
                }
            }
            Some(dir.to_path_buf())
        })
    }
}

impl Default for CoreSettingsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsManagerOperations for CoreSettingsManager {
    /*
     * Loads settings from `settings.json` in the app's config directory. A
     * missing file yields defaults; a malformed file is an error so the
     * caller can decide whether to degrade to defaults.
     */
    fn load_settings(&self, app_name: &str) -> Result<AppSettings> {
        let config_dir =
            Self::config_dir(app_name).ok_or(SettingsError::NoConfigDirectory)?;
        let file_path = config_dir.join(SETTINGS_FILENAME);

        if !file_path.exists() {
            log::debug!("CoreSettingsManager: No settings file at {file_path:?}; using defaults.");
            return Ok(AppSettings::default());
        }

        let file = File::open(&file_path)?;
        let settings: AppSettings = serde_json::from_reader(BufReader::new(file))?;
        log::debug!("CoreSettingsManager: Loaded settings from {file_path:?}.");
        Ok(settings)
    }

    fn save_settings(&self, app_name: &str, settings: &AppSettings) -> Result<()> {
        let config_dir =
            Self::config_dir(app_name).ok_or(SettingsError::NoConfigDirectory)?;
        let file_path = config_dir.join(SETTINGS_FILENAME);

        let file = File::create(&file_path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), settings)?;
        log::debug!("CoreSettingsManager: Saved settings to {file_path:?}.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    /* Like CoreSettingsManager but rooted at a caller-supplied directory. */
    struct TestSettingsManager {
        mock_config_dir: PathBuf,
    }

    impl TestSettingsManager {
        fn new(mock_config_dir: PathBuf) -> Self {
            TestSettingsManager { mock_config_dir }
        }

        fn settings_path(&self) -> PathBuf {
            self.mock_config_dir.join(SETTINGS_FILENAME)
        }
    }

    impl SettingsManagerOperations for TestSettingsManager {
        fn load_settings(&self, _app_name: &str) -> Result<AppSettings> {
            let file_path = self.settings_path();
            if !file_path.exists() {
                return Ok(AppSettings::default());
            }
            let file = File::open(&file_path)?;
            Ok(serde_json::from_reader(BufReader::new(file))?)
        }

        fn save_settings(&self, _app_name: &str, settings: &AppSettings) -> Result<()> {
            let file = File::create(self.settings_path())?;
            serde_json::to_writer_pretty(BufWriter::new(file), settings)?;
            Ok(())
        }
    }

    fn sample_settings() -> AppSettings {
        AppSettings {
            source_folder: "/books/inbox".to_string(),
            destination_folder: "/books/small".to_string(),
            token_threshold: "1,000".to_string(),
        }
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let manager = TestSettingsManager::new(dir.path().to_path_buf());

        manager.save_settings("AnyApp", &sample_settings()).unwrap();
        let loaded = manager.load_settings("AnyApp").unwrap();

        assert_eq!(loaded, sample_settings());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let manager = TestSettingsManager::new(dir.path().to_path_buf());

        let loaded = manager.load_settings("AnyApp").unwrap();
        assert_eq!(loaded, AppSettings::default());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let manager = TestSettingsManager::new(dir.path().to_path_buf());
        fs::write(manager.settings_path(), "{ not json").unwrap();

        let result = manager.load_settings("AnyApp");
        assert!(matches!(result, Err(SettingsError::Serde(_))));
    }

    #[test]
    fn test_save_overwrites_previous_settings() {
        let dir = tempdir().unwrap();
        let manager = TestSettingsManager::new(dir.path().to_path_buf());

        manager.save_settings("AnyApp", &sample_settings()).unwrap();
        let updated = AppSettings {
            token_threshold: "50".to_string(),
            ..sample_settings()
        };
        manager.save_settings("AnyApp", &updated).unwrap();

        assert_eq!(manager.load_settings("AnyApp").unwrap(), updated);
    }

    #[test]
    fn test_core_settings_manager_round_trip() {
        // Uses the real platform config directory with a unique app name,
        // cleaned up afterwards.
        let unique_app_name = format!("TestApp_EpubSieve_{}", rand::random::<u64>());
        let manager = CoreSettingsManager::new();

        manager
            .save_settings(&unique_app_name, &sample_settings())
            .unwrap();
        let loaded = manager.load_settings(&unique_app_name).unwrap();
        assert_eq!(loaded, sample_settings());

        if let Some(dirs) = ProjectDirs::from("", "", &unique_app_name) {
            let dir: &Path = dirs.config_local_dir();
            if dir.exists() {
                if let Err(e) = fs::remove_dir_all(dir) {
                    eprintln!("Test cleanup failed for {dir:?}: {e}");
                }
            }
        }
    }
}

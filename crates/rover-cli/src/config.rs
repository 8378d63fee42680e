//! Configuration Vault – reads/writes `~/.rover/config.toml`.
//!
//! The file holds the bench settings, the board pin labels and the full
//! [`CalibrationTable`]. Every section is optional:
//!
//! ```toml
//! watch_interval_ms = 50
//!
//! [pins]
//! ir_left = "A0"
//!
//! [calibration.range]
//! obstacle_distance_cm = 20.0
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use rover_perception::{CalibrationTable, PinMap};
use rover_types::SensorError;

/// Persisted bench configuration stored in `~/.rover/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Delay between snapshots in `/watch`.
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,

    /// Board pin labels.
    #[serde(default)]
    pub pins: PinMap,

    /// Sensor calibration.
    #[serde(default)]
    pub calibration: CalibrationTable,
}

fn default_watch_interval_ms() -> u64 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_interval_ms: default_watch_interval_ms(),
            pins: PinMap::default(),
            calibration: CalibrationTable::default(),
        }
    }
}

/// Return the path to `~/.rover/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".rover").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, SensorError> {
    load_from(&config_path())
}

/// Load the config from a specific path, apply `ROVER_*` overrides and
/// validate the resulting calibration.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, SensorError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        SensorError::Config(format!("Failed to read config at {}: {}", path.display(), e))
    })?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| SensorError::Config(format!("Failed to parse config: {}", e)))?;
    apply_env_overrides(&mut cfg);
    cfg.calibration.validate()?;
    Ok(Some(cfg))
}

/// Apply `ROVER_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `ROVER_OBSTACLE_DISTANCE` | `calibration.range.obstacle_distance_cm` |
/// | `ROVER_IR_THRESHOLD` | `calibration.line.threshold` |
/// | `ROVER_WATCH_INTERVAL_MS` | `watch_interval_ms` |
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROVER_OBSTACLE_DISTANCE")
        && let Ok(cm) = v.parse::<f32>() {
            cfg.calibration.range.obstacle_distance_cm = cm;
        }
    if let Ok(v) = std::env::var("ROVER_IR_THRESHOLD")
        && let Ok(threshold) = v.parse::<u16>() {
            cfg.calibration.line.threshold = threshold;
        }
    if let Ok(v) = std::env::var("ROVER_WATCH_INTERVAL_MS")
        && let Ok(ms) = v.parse::<u64>() {
            cfg.watch_interval_ms = ms;
        }
}

/// Save the config to disk, creating `~/.rover/` if necessary.
pub fn save(cfg: &Config) -> Result<(), SensorError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), SensorError> {
    let io_err = |what: &str, e: std::io::Error| SensorError::Config(format!("{what}: {e}"));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err("Failed to create config directory", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| io_err("Failed to set config directory permissions", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| SensorError::Config(format!("Failed to serialize config: {}", e)))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| io_err(&format!("Failed to write config at {}", path.display()), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| io_err(&format!("Failed to write config at {}", path.display()), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_perception::calibration::ColorRange;
    use rover_types::FrequencyScaling;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    /// Serialises tests that read or write `ROVER_*` variables. `load_from`
    /// applies env overrides, so every test calling it takes the lock too.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode =
            std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "config file must have 0o600 permissions");

        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700, "config directory must have 0o700 permissions");
    }

    #[test]
    fn roundtrip_tuned_config() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let mut cfg = Config::default();
        cfg.pins.ir_left = "GPIO34".to_string();
        cfg.calibration.color.white = ColorRange::uniform(180, 255);
        cfg.calibration.color.scaling = FrequencyScaling::High;
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.pins.ir_left, "GPIO34");
        assert_eq!(loaded.calibration.color.white, ColorRange::uniform(180, 255));
        assert_eq!(loaded.calibration.color.scaling, FrequencyScaling::High);
    }

    #[test]
    fn sparse_file_fills_defaults() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[calibration.color]\nfilter_settle_ms = 15\n").unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.calibration.color.filter_settle_ms, 15);
        assert_eq!(loaded.pins, PinMap::default());
        assert_eq!(loaded.calibration.color.black, ColorRange::uniform(0, 50));
    }

    #[test]
    fn invalid_calibration_in_file_is_rejected() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        let raw = "[calibration.line]\nblack_max = 900\nwhite_min = 100\n";
        std::fs::write(&path, raw).unwrap();

        assert!(matches!(
            load_from(&path),
            Err(SensorError::InvalidCalibration { .. })
        ));
    }

    #[test]
    fn partial_color_range_keeps_other_tuned_values() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        let raw = "watch_interval_ms = 120\n\n\
                   [calibration.color.green]\nred = { min = 40, max = 100 }\n";
        std::fs::write(&path, raw).unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.watch_interval_ms, 120);
        assert_eq!(loaded.calibration.color.green.red.min, 40);
        assert_eq!(loaded.calibration.color.green.green.max, 200);
    }

    #[test]
    fn config_path_points_to_rover_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".rover"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let _env = env_lock();
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let result = load_from(&path).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn apply_env_overrides_changes_obstacle_distance() {
        let _env = env_lock();
        // SAFETY: every test touching the process environment holds ENV_LOCK.
        unsafe { std::env::set_var("ROVER_OBSTACLE_DISTANCE", "35.5") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert!((cfg.calibration.range.obstacle_distance_cm - 35.5).abs() < f32::EPSILON);
        unsafe { std::env::remove_var("ROVER_OBSTACLE_DISTANCE") };
    }

    #[test]
    fn apply_env_overrides_changes_ir_threshold() {
        let _env = env_lock();
        // SAFETY: every test touching the process environment holds ENV_LOCK.
        unsafe { std::env::set_var("ROVER_IR_THRESHOLD", "2000") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.calibration.line.threshold, 2000);
        unsafe { std::env::remove_var("ROVER_IR_THRESHOLD") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_interval() {
        let _env = env_lock();
        // SAFETY: every test touching the process environment holds ENV_LOCK.
        unsafe { std::env::set_var("ROVER_WATCH_INTERVAL_MS", "soon") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.watch_interval_ms, 50);
        unsafe { std::env::remove_var("ROVER_WATCH_INTERVAL_MS") };
    }
}

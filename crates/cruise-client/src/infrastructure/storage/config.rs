//! TOML settings file for the client.
//!
//! Reads and writes [`ClientConfig`] from the platform-appropriate file:
//! - Windows:  `%APPDATA%\PiCruise\config.toml`
//! - Linux:    `~/.config/picruise/config.toml` (or `$XDG_CONFIG_HOME/picruise`)
//! - macOS:    `~/Library/Application Support/PiCruise/config.toml`
//!
//! ```toml
//! [controller]
//! host = "raspberrypi.local"
//! ws_port = 3002
//! http_port = 8082
//!
//! [joystick]
//! track_length = 200.0
//! invert_speed = true
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Every section and field is optional; anything missing falls back to the
//! `#[serde(default = "...")]` helper for that field, so an empty file (or no
//! file at all on first run) yields a working configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cruise_core::domain::normalize::AxisCalibration;
use cruise_core::{CommandError, Normalizer, TrackGeometry};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::application::connection_manager::ManagerConfig;
use crate::infrastructure::transport::websocket::WebSocketSettings;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The controller host/port do not form a valid URL.
    #[error("invalid controller endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    /// The joystick geometry leaves no room for the knob to move.
    #[error("invalid joystick geometry: {0}")]
    InvalidJoystick(#[from] CommandError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub joystick: JoystickConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the vehicle controller lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    /// Hostname or IP address of the controller.
    #[serde(default = "default_host")]
    pub host: String,
    /// WebSocket command port.
    #[serde(default = "default_ws_port")]
    pub ws_port: u16,
    /// HTTP port for the `/left` and `/right` routes.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
}

/// On-screen joystick geometry and sign conventions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoystickConfig {
    #[serde(default = "default_track_length")]
    pub track_length: f32,
    #[serde(default = "default_track_thickness")]
    pub track_thickness: f32,
    #[serde(default = "default_padding")]
    pub padding: f32,
    /// Drag right → negative steering.
    #[serde(default = "default_true")]
    pub invert_angle: bool,
    /// Drag up (negative screen y) → positive throttle.
    #[serde(default = "default_true")]
    pub invert_speed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    "raspberrypi.local".to_string()
}
fn default_ws_port() -> u16 {
    3002
}
fn default_http_port() -> u16 {
    8082
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_close_timeout_ms() -> u64 {
    2000
}
fn default_track_length() -> f32 {
    200.0
}
fn default_track_thickness() -> f32 {
    50.0
}
fn default_padding() -> f32 {
    10.0
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            ws_port: default_ws_port(),
            http_port: default_http_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
        }
    }
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            track_length: default_track_length(),
            track_thickness: default_track_thickness(),
            padding: default_padding(),
            invert_angle: default_true(),
            invert_speed: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Derived settings ──────────────────────────────────────────────────────────

impl ControllerConfig {
    fn endpoint(&self, scheme: &str, port: u16) -> Result<Url, ConfigError> {
        let endpoint = format!("{scheme}://{}:{port}", self.host);
        Url::parse(&endpoint).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
    }

    /// `ws://<host>:<ws_port>`.
    pub fn ws_endpoint(&self) -> Result<Url, ConfigError> {
        self.endpoint("ws", self.ws_port)
    }

    /// `http://<host>:<http_port>`.
    pub fn http_base(&self) -> Result<Url, ConfigError> {
        self.endpoint("http", self.http_port)
    }

    pub fn websocket_settings(&self) -> WebSocketSettings {
        WebSocketSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            close_timeout: Duration::from_millis(self.close_timeout_ms),
        }
    }
}

impl JoystickConfig {
    pub fn geometry(&self) -> TrackGeometry {
        TrackGeometry {
            length: self.track_length,
            thickness: self.track_thickness,
            padding: self.padding,
        }
    }

    /// Builds the normalizer, failing fast on a degenerate geometry.
    pub fn normalizer(&self) -> Result<Normalizer, ConfigError> {
        let bound = self.geometry().max_drag_distance()?;
        Ok(Normalizer::new(
            AxisCalibration::new(bound, self.invert_angle)?,
            AxisCalibration::new(bound, self.invert_speed)?,
        ))
    }
}

impl ClientConfig {
    /// Everything the connection manager needs, validated.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidEndpoint`] or [`ConfigError::InvalidJoystick`].
    pub fn manager_config(&self) -> Result<ManagerConfig, ConfigError> {
        Ok(ManagerConfig::new(self.controller.ws_endpoint()?)
            .with_normalizer(self.joystick.normalizer()?))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `ClientConfig` from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &ClientConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("PiCruise"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("picruise"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("PiCruise")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use cruise_core::Axis;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("picruise_test_{}", Uuid::new_v4()))
    }

    #[test]
    fn test_default_controller_endpoints() {
        // Arrange / Act
        let cfg = ClientConfig::default();

        // Assert
        assert_eq!(
            cfg.controller.ws_endpoint().unwrap().as_str(),
            "ws://raspberrypi.local:3002/"
        );
        assert_eq!(
            cfg.controller.http_base().unwrap().as_str(),
            "http://raspberrypi.local:8082/"
        );
    }

    #[test]
    fn test_default_joystick_gives_75_point_travel() {
        let cfg = JoystickConfig::default();
        assert_eq!(cfg.geometry().max_drag_distance().unwrap(), 75.0);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let cfg: ClientConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_given_fields() {
        // Arrange
        let toml_str = r#"
[controller]
host = "10.0.0.7"

[joystick]
invert_speed = false
"#;

        // Act
        let cfg: ClientConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.controller.host, "10.0.0.7");
        assert_eq!(cfg.controller.ws_port, 3002);
        assert!(!cfg.joystick.invert_speed);
        assert!(cfg.joystick.invert_angle);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_from_missing_file_returns_defaults() {
        let path = temp_dir().join("config.toml");
        assert_eq!(load_config_from(&path).unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_save_then_load_via_temp_dir() {
        // Arrange: nested directory that does not exist yet
        let dir = temp_dir();
        let path = dir.join("nested").join("config.toml");
        let mut cfg = ClientConfig::default();
        cfg.controller.ws_port = 4000;
        cfg.logging.level = "debug".to_string();

        // Act
        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_host_with_space_is_an_invalid_endpoint() {
        let mut cfg = ClientConfig::default();
        cfg.controller.host = "bad host".to_string();

        assert!(matches!(
            cfg.manager_config(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_degenerate_joystick_fails_fast() {
        let mut cfg = ClientConfig::default();
        cfg.joystick.track_length = 50.0;

        assert!(matches!(
            cfg.manager_config(),
            Err(ConfigError::InvalidJoystick(CommandError::InvalidBound(_)))
        ));
    }

    #[test]
    fn test_joystick_flags_reach_the_normalizer() {
        let mut cfg = JoystickConfig::default();
        cfg.invert_speed = false;

        let normalizer = cfg.normalizer().unwrap();

        assert!(normalizer.calibration(Axis::Angle).invert);
        assert!(!normalizer.calibration(Axis::Speed).invert);
    }

    #[test]
    fn test_timeouts_map_to_websocket_settings() {
        let cfg = ControllerConfig {
            connect_timeout_ms: 1500,
            close_timeout_ms: 250,
            ..ControllerConfig::default()
        };

        let settings = cfg.websocket_settings();

        assert_eq!(settings.connect_timeout, Duration::from_millis(1500));
        assert_eq!(settings.close_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("config.toml"), "got {path:?}");
        }
    }
}

// TOML config adapter - Layered configuration from files and environment

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::EncodeSettings;
use crate::ports::EngineResources;

/// Prefix of environment variables that override file settings
pub const ENV_PREFIX: &str = "SPLITX_";

/// Files tried in order when no explicit config path is given
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["splitx.toml", "config/splitx.toml"];

/// Runtime settings for the splitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitterConfig {
    pub log_level: String,
    pub ffmpeg_path: PathBuf,
    pub scratch_dir: Option<PathBuf>,
    pub video_codec: String,
    pub preset: String,
    pub audio_codec: String,
    /// Encoder threads; 0 means one per CPU
    pub threads: Option<usize>,
    pub diagnostic_lines: usize,
    pub engine_timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        let encode = EncodeSettings::default();
        Self {
            log_level: "info".to_string(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            scratch_dir: None,
            video_codec: encode.video_codec,
            preset: encode.preset,
            audio_codec: encode.audio_codec,
            threads: None,
            diagnostic_lines: 5,
            engine_timeout_secs: None,
            output_dir: None,
        }
    }
}

impl SplitterConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        self.log_level
            .parse::<tracing::Level>()
            .map_err(|_| DomainError::Config(format!("Invalid log level: {}", self.log_level)))?;

        for (key, value) in [
            ("video_codec", &self.video_codec),
            ("preset", &self.preset),
            ("audio_codec", &self.audio_codec),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::Config(format!("{} cannot be empty", key)));
            }
        }

        if self.ffmpeg_path.as_os_str().is_empty() {
            return Err(DomainError::Config("ffmpeg_path cannot be empty".to_string()));
        }

        if self.engine_timeout_secs == Some(0) {
            return Err(DomainError::Config(
                "engine_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn engine_resources(&self) -> EngineResources {
        EngineResources {
            binary: self.ffmpeg_path.clone(),
            scratch_root: self.scratch_dir.clone(),
        }
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            video_codec: self.video_codec.clone(),
            preset: self.preset.clone(),
            audio_codec: self.audio_codec.clone(),
            threads: self
                .threads
                .map(|n| if n == 0 { num_cpus::get() } else { n }),
        }
    }

    pub fn engine_timeout(&self) -> Option<Duration> {
        self.engine_timeout_secs.map(Duration::from_secs)
    }
}

/// On-disk layout: everything lives under a `[splitx]` table
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    splitx: SplitterConfig,
}

/// A loaded configuration and where its values came from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub config: SplitterConfig,
    /// File that was read, if any
    pub source: Option<PathBuf>,
    /// `SPLITX_*` variables applied on top of the file, as name and value
    pub env_overrides: Vec<(String, String)>,
}

impl LoadedConfig {
    /// Report the configuration sources; call once logging is up
    pub fn log_sources(&self) {
        match &self.source {
            Some(path) => info!("Loaded configuration from: {}", path.display()),
            None => info!("No configuration file found, using defaults"),
        }
        for (name, value) in &self.env_overrides {
            info!("Found environment override: {} = {}", name, value);
        }
        if !self.env_overrides.is_empty() {
            info!("Applied {} environment variable overrides", self.env_overrides.len());
        }
    }
}

/// Loads [`SplitterConfig`] with precedence environment > file > defaults.
/// Command-line overrides are applied by the caller afterwards.
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse TOML content
    pub fn parse(content: &str) -> Result<SplitterConfig, DomainError> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| DomainError::Config(format!("Failed to parse TOML config: {}", e)))?;
        Ok(file.splitx)
    }

    pub fn load_file(path: &Path) -> Result<SplitterConfig, DomainError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Read `explicit` if given (it must exist), else the first default path present
    pub fn discover(
        explicit: Option<&Path>,
        search_root: &Path,
    ) -> Result<(SplitterConfig, Option<PathBuf>), DomainError> {
        if let Some(path) = explicit {
            debug!("Loading configuration from: {}", path.display());
            return Ok((Self::load_file(path)?, Some(path.to_path_buf())));
        }

        for candidate in DEFAULT_CONFIG_PATHS {
            let path = search_root.join(candidate);
            if path.is_file() {
                debug!("Loading configuration from: {}", path.display());
                return Ok((Self::load_file(&path)?, Some(path)));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok((SplitterConfig::default(), None))
    }

    /// Apply `SPLITX_*` overrides; returns the ones that were applied
    pub fn apply_env<I>(
        config: &mut SplitterConfig,
        vars: I,
    ) -> Result<Vec<(String, String)>, DomainError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut applied = Vec::new();
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "LOG_LEVEL" => config.log_level = value.clone(),
                "FFMPEG_PATH" => config.ffmpeg_path = PathBuf::from(&value),
                "SCRATCH_DIR" => config.scratch_dir = Some(PathBuf::from(&value)),
                "VIDEO_CODEC" => config.video_codec = value.clone(),
                "PRESET" => config.preset = value.clone(),
                "AUDIO_CODEC" => config.audio_codec = value.clone(),
                "THREADS" => config.threads = Some(parse_number(&name, &value)?),
                "DIAGNOSTIC_LINES" => config.diagnostic_lines = parse_number(&name, &value)?,
                "ENGINE_TIMEOUT_SECS" => {
                    config.engine_timeout_secs = Some(parse_number(&name, &value)?)
                }
                "OUTPUT_DIR" => config.output_dir = Some(PathBuf::from(&value)),
                _ => {
                    debug!("Ignoring unknown environment variable {}", name);
                    continue;
                }
            }
            applied.push((name, value));
        }
        Ok(applied)
    }

    /// Defaults, then file, then process environment; validated
    pub fn load(explicit: Option<&Path>) -> Result<LoadedConfig, DomainError> {
        Self::load_from(explicit, Path::new("."), std::env::vars())
    }

    /// [`TomlConfigAdapter::load`] against a given search root and variable set
    pub fn load_from<I>(
        explicit: Option<&Path>,
        search_root: &Path,
        vars: I,
    ) -> Result<LoadedConfig, DomainError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let (mut config, source) = Self::discover(explicit, search_root)?;
        let env_overrides = Self::apply_env(&mut config, vars)?;
        config.validate()?;
        Ok(LoadedConfig {
            config,
            source,
            env_overrides,
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, DomainError> {
    value
        .trim()
        .parse()
        .map_err(|_| DomainError::Config(format!("{} must be a whole number, got {:?}", name, value)))
}

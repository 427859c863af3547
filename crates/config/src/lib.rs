//! Configuration for reel.
//!
//! Sources are merged in increasing order of precedence:
//!
//! 1. built-in defaults;
//! 2. `reel.toml`, `reel.yaml` or `reel.json` in the platform configuration
//!    directory (e.g. `~/.config/reel` on Linux);
//! 3. an explicitly requested file (`--config`);
//! 4. environment variables prefixed with `REEL_`, with `__` separating
//!    nested keys (`REEL_MEDIA__DIRECTORY=/srv/uploads`).
//!
//! ```toml
//! [media]
//! directory = "/srv/uploads"
//! backup_directory = "/srv/backups"
//!
//! [database]
//! path = "/var/lib/reel/index.sqlite"
//!
//! [transcoder]
//! ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
//!
//! [compression]
//! compression_threshold = 4194304
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use reel_policy::PolicyConfig;
use reel_transcode::LocatorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "REEL_";
const FILE_STEM: &str = "reel";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub media: MediaConfig,
    pub database: DatabaseConfig,
    pub transcoder: LocatorConfig,
    /// `compression`, `webp` and `video` sections.
    #[serde(flatten)]
    pub policy: PolicyConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Directory uploads are stored in, flat.
    pub directory: PathBuf,
    /// Root under which each cleanup run creates its `orphans-<unix>` backup
    /// directory.
    pub backup_directory: PathBuf,
}
impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data/uploads"),
            backup_directory: PathBuf::from("data/backups"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file; created on first use.
    pub path: PathBuf,
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("data/reel.sqlite") }
    }
}

impl Config {
    /// Load configuration from every source, optionally including an explicit
    /// file that must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let user_dir = ProjectDirs::from("", "", FILE_STEM).map(|dirs| dirs.config_dir().to_path_buf());
        Self::load_from(user_dir.as_deref(), explicit)
    }

    /// Like [`load`](Self::load), with the user configuration directory given
    /// explicitly (`None` skips it).
    pub fn load_from(user_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(user_dir, explicit)?.extract().or_raise(|| ErrorKind::Parse)?;
        config.validate()?;
        tracing::debug!(
            media = %config.media.directory.display(),
            database = %config.database.path.display(),
            "Configuration loaded"
        );
        Ok(config)
    }

    fn figment(user_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dir) = user_dir {
            let base = dir.join(FILE_STEM);
            figment = figment
                .merge(Toml::file(base.with_extension("toml")))
                .merge(Yaml::file(base.with_extension("yaml")))
                .merge(Json::file(base.with_extension("json")));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            tracing::debug!(path = %path.display(), "Reading configuration file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => {
                    exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf()));
                },
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.media.directory.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("media.directory must not be empty"));
        }
        if self.media.backup_directory.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("media.backup_directory must not be empty"));
        }
        if self.database.path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database.path must not be empty"));
        }
        if self.transcoder.probe_timeout_ms == 0 {
            exn::bail!(ErrorKind::Invalid("transcoder.probe_timeout_ms must be positive"));
        }
        Ok(())
    }
}

mod error;
mod log;

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use resolve_path::PathResolveExt;
use serde::{Deserialize, Serialize};
use simple_conventions_base::{PROJECT_NAME, consts};
use snafu::ResultExt;

pub use self::{
    error::Error,
    log::{LogConfig, LogFormat},
};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Namespace of every annotation key and convention identifier.
    #[serde(default = "default_annotation_prefix")]
    pub annotation_prefix: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default = "LogConfig::default")]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            annotation_prefix: default_annotation_prefix(),
            server: ServerConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_listen_address")]
    pub listen_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self { Self { listen_address: Self::default_listen_address() } }
}

impl ServerConfig {
    #[inline]
    #[must_use]
    pub const fn default_listen_address() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), consts::DEFAULT_LISTEN_PORT)
    }
}

impl Config {
    /// Returns the first configuration file that exists, `None` when there
    /// is none and the built-in defaults apply.
    pub fn search_config_file_path() -> Option<PathBuf> {
        Self::default_path()
            .into_iter()
            .chain(simple_conventions_base::fallback_project_config_directories().into_iter().map(
                |mut path| {
                    path.push(simple_conventions_base::CLI_CONFIG_NAME);
                    path
                },
            ))
            .find(|path| path.try_exists().unwrap_or(false))
    }

    #[inline]
    pub fn default_path() -> Option<PathBuf> {
        simple_conventions_base::PROJECT_CONFIG_DIR
            .as_ref()
            .map(|dir| dir.join(simple_conventions_base::CLI_CONFIG_NAME))
    }

    /// Reads the configuration at `path`. `~` is expanded in `path` and in
    /// `log.filePath`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not a valid configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut config: Self = {
            let path =
                path.as_ref().try_resolve().map(|path| path.to_path_buf()).with_context(|_| {
                    error::ResolveFilePathSnafu { file_path: path.as_ref().to_path_buf() }
                })?;
            let data =
                std::fs::read(&path).context(error::OpenConfigSnafu { filename: path.clone() })?;
            serde_yaml::from_slice(&data).context(error::ParseConfigSnafu { filename: path })?
        };

        config.log.file_path = match config.log.file_path.map(|path| {
            path.try_resolve()
                .map(|path| path.to_path_buf())
                .with_context(|_| error::ResolveFilePathSnafu { file_path: path.clone() })
        }) {
            Some(Ok(path)) => Some(path),
            Some(Err(err)) => return Err(err),
            None => None,
        };

        Ok(config)
    }

    /// The default configuration rendered as YAML.
    #[must_use]
    pub fn template_basic() -> Vec<u8> {
        serde_yaml::to_string(&Self::default()).map(String::into_bytes).unwrap_or_default()
    }
}

fn default_annotation_prefix() -> String { PROJECT_NAME.to_string() }

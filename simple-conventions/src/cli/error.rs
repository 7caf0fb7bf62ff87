use std::path::PathBuf;

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{source}"))]
    Configuration { source: crate::config::Error },

    #[snafu(display("{source}"))]
    Handler { source: crate::handler::Error },

    #[snafu(display("{source}"))]
    Server { source: crate::server::Error },

    #[snafu(display("Failed to write to stdout, error: {source}"))]
    WriteStdout { source: std::io::Error },

    #[snafu(display("Failed to read from stdin, error: {source}"))]
    ReadStdin { source: std::io::Error },

    #[snafu(display("Failed to read {}, error: {source}", file_path.display()))]
    ReadInputFile { file_path: PathBuf, source: std::io::Error },

    #[snafu(display("Failed to parse pod convention context, error: {source}"))]
    ParseInput { source: serde_yaml::Error },

    #[snafu(display("Failed to serialize JSON, error: {source}"))]
    SerializeJson { source: serde_json::Error },

    #[snafu(display("Failed to serialize YAML, error: {source}"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("Failed to create tokio runtime, error: {source}"))]
    InitializeTokioRuntime { source: std::io::Error },
}

impl From<crate::config::Error> for Error {
    fn from(source: crate::config::Error) -> Self { Self::Configuration { source } }
}

impl From<crate::handler::Error> for Error {
    fn from(source: crate::handler::Error) -> Self { Self::Handler { source } }
}

impl From<crate::server::Error> for Error {
    fn from(source: crate::server::Error) -> Self { Self::Server { source } }
}

//! Command line interface of the convention server.
//!
//! ```bash
//! # Serve the webhook on 0.0.0.0:9000
//! simple-conventions serve
//!
//! # Apply the catalog to a context offline
//! simple-conventions apply -f context.yaml -o yaml
//!
//! # Show the catalog for a custom prefix
//! simple-conventions --prefix conventions.example.com list
//! ```

mod apply;
pub mod error;
mod list;
mod serve;

use std::{io::Write, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use simple_conventions_base::CLI_PROGRAM_NAME;
use snafu::ResultExt;
use tokio::runtime::Runtime;

pub use self::error::Error;
use self::{apply::ApplyCommand, list::ListCommand, serve::ServeCommand};
use crate::{config::Config, shadow};

#[derive(Parser)]
#[command(
    name = CLI_PROGRAM_NAME,
    author,
    version,
    long_version = shadow::CLAP_LONG_VERSION,
    about = "Cartographer convention server for probes, storage, scheduling and arguments.",
    long_about = "A Cartographer convention server. Each convention is switched on by an \
                  annotation on the workload's pod template and merges the annotation's JSON \
                  value into the template: probes, process arguments, volumes, tolerations, \
                  node selector and affinity. The workload name label is exposed to the \
                  containers as an environment variable.",
    color = clap::ColorChoice::Always
)]
pub struct Cli {
    #[clap(subcommand)]
    commands: Option<Commands>,

    #[clap(
        long = "config",
        short = 'c',
        env = "SIMPLE_CONVENTIONS_CONFIG_FILE_PATH",
        help = "Specify a configuration file. Defaults to \
                ~/.config/simple-conventions/config.yaml or SIMPLE_CONVENTIONS_CONFIG_FILE_PATH \
                env var."
    )]
    config_file: Option<PathBuf>,

    #[clap(
        long = "log-level",
        env = "SIMPLE_CONVENTIONS_LOG_LEVEL",
        help = "Set the logging level (e.g., info, debug, trace)."
    )]
    log_level: Option<tracing::Level>,

    #[clap(
        long = "prefix",
        env = "ANNOTATION_PREFIX",
        help = "Prefix of the annotation keys and convention identifiers. Defaults to \
                `annotationPrefix` of the configuration."
    )]
    annotation_prefix: Option<String>,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Display version information")]
    Version,

    #[command(about = "Generate shell completion script for the specified shell (bash, zsh, fish)")]
    Completions { shell: clap_complete::Shell },

    #[command(about = "Output the default configuration in YAML format")]
    DefaultConfig,

    #[command(alias = "s", about = "Serve the convention webhook")]
    Serve(ServeCommand),

    #[command(
        alias = "a",
        about = "Apply the conventions to a PodConventionContext read from a file or stdin"
    )]
    Apply(ApplyCommand),

    #[command(alias = "l", about = "List the conventions and the keys enabling them")]
    List(ListCommand),
}

impl Default for Cli {
    fn default() -> Self { Self::parse() }
}

impl Cli {
    /// Loads the configuration file, if any, and applies the command line
    /// overrides on top of it.
    fn load_config(&self) -> Result<Config, Error> {
        let mut config = match self.config_file.clone().or_else(Config::search_config_file_path) {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(log_level) = self.log_level {
            config.log.level = log_level;
        }

        if let Some(prefix) = self.annotation_prefix.as_ref().filter(|prefix| !prefix.is_empty()) {
            config.annotation_prefix.clone_from(prefix);
        }

        Ok(config)
    }

    /// Runs the selected command and returns the process exit code.
    ///
    /// # Errors
    ///
    /// Returns the error of the command, or of loading the configuration.
    pub fn run(self) -> Result<i32, Error> {
        match self.commands {
            Some(Commands::Version) => {
                std::io::stdout()
                    .write_all(Self::command().render_long_version().as_bytes())
                    .context(error::WriteStdoutSnafu)?;
                return Ok(0);
            }
            Some(Commands::Completions { shell }) => {
                let mut app = Self::command();
                let bin_name = app.get_name().to_string();
                clap_complete::generate(shell, &mut app, bin_name, &mut std::io::stdout());
                return Ok(0);
            }
            Some(Commands::DefaultConfig) => {
                std::io::stdout()
                    .write_all(Config::template_basic().as_slice())
                    .context(error::WriteStdoutSnafu)?;
                return Ok(0);
            }
            _ => {}
        }

        let mut config = self.load_config()?;
        if !matches!(self.commands, Some(Commands::Serve(_))) && config.log.emit_stdout {
            // stdout carries the rendered document
            config.log.emit_stdout = false;
            config.log.emit_stderr = true;
        }
        config.log.registry();

        let fut = async move {
            match self.commands {
                Some(Commands::Serve(cmd)) => cmd.run(config).await?,
                Some(Commands::Apply(cmd)) => cmd.run(config).await?,
                Some(Commands::List(cmd)) => cmd.run(config).await?,
                _ => {
                    let help = Self::command().render_long_help().ansi().to_string();
                    std::io::stderr().write_all(help.as_bytes()).context(error::WriteStdoutSnafu)?;
                    return Ok(-1);
                }
            }

            Ok(0)
        };

        Runtime::new().context(error::InitializeTokioRuntimeSnafu)?.block_on(fut)
    }
}

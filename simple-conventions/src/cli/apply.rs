use std::path::PathBuf;

use clap::{Args, ValueEnum};
use snafu::ResultExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::{
    cli::{Error, error},
    config::Config,
    conventions,
    webhook::PodConventionContext,
};

#[derive(Args, Clone)]
pub struct ApplyCommand {
    #[arg(
        short = 'f',
        long = "file",
        help = "File holding a PodConventionContext in JSON or YAML. Reads standard input when \
                omitted or `-`."
    )]
    file: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t = ContextFormat::Json,
        help = "Output format of the resulting context."
    )]
    output: ContextFormat,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ContextFormat {
    #[default]
    Json,
    Yaml,
}

impl ApplyCommand {
    pub async fn run(self, config: Config) -> Result<(), Error> {
        let Self { file, output } = self;

        let input = match file.filter(|path| path.as_os_str() != "-") {
            Some(file_path) => tokio::fs::read(&file_path)
                .await
                .context(error::ReadInputFileSnafu { file_path })?,
            None => {
                let mut buf = Vec::new();
                let _read =
                    tokio::io::stdin().read_to_end(&mut buf).await.context(error::ReadStdinSnafu)?;
                buf
            }
        };

        let mut context = parse_context(&input)?;
        context.apply(&conventions::catalog(&config.annotation_prefix))?;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(&render_context(&context, output)?).await.context(error::WriteStdoutSnafu)?;
        stdout.flush().await.context(error::WriteStdoutSnafu)
    }
}

// JSON documents are valid YAML.
fn parse_context(input: &[u8]) -> Result<PodConventionContext, Error> {
    serde_yaml::from_slice(input).context(error::ParseInputSnafu)
}

fn render_context(context: &PodConventionContext, format: ContextFormat) -> Result<Vec<u8>, Error> {
    match format {
        ContextFormat::Json => {
            let mut rendered =
                serde_json::to_vec_pretty(context).context(error::SerializeJsonSnafu)?;
            rendered.push(b'\n');
            Ok(rendered)
        }
        ContextFormat::Yaml => serde_yaml::to_string(context)
            .map(String::into_bytes)
            .context(error::SerializeYamlSnafu),
    }
}

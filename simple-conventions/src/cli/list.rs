use clap::{Args, ValueEnum};
use snafu::ResultExt;
use tokio::io::AsyncWriteExt;

use crate::{
    cli::{Error, error},
    config::Config,
    conventions,
    ui::table::ConventionListExt,
};

#[derive(Args, Clone)]
pub struct ListCommand {
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t = ListFormat::Table,
        help = "Output format of the catalog."
    )]
    output: ListFormat,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ListFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl ListCommand {
    pub async fn run(self, config: Config) -> Result<(), Error> {
        let catalog = conventions::catalog(&config.annotation_prefix);

        let rendered = match self.output {
            ListFormat::Table => format!("{}\n", catalog.render_table()).into_bytes(),
            ListFormat::Json => {
                let mut rendered =
                    serde_json::to_vec_pretty(&catalog).context(error::SerializeJsonSnafu)?;
                rendered.push(b'\n');
                rendered
            }
            ListFormat::Yaml => {
                serde_yaml::to_string(&catalog).context(error::SerializeYamlSnafu)?.into_bytes()
            }
        };

        let mut stdout = tokio::io::stdout();
        stdout.write_all(&rendered).await.context(error::WriteStdoutSnafu)?;
        stdout.flush().await.context(error::WriteStdoutSnafu)
    }
}

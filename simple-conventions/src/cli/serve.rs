use std::net::SocketAddr;

use clap::Args;
use sigfinn::{ExitStatus, LifecycleManager};
use simple_conventions_base::{PROJECT_NAME_WITH_INITIAL_CAPITAL, PROJECT_SEMVER};

use crate::{cli::Error, config::Config, conventions, server::ConventionServer};

#[derive(Args, Clone)]
pub struct ServeCommand {
    #[arg(
        long = "listen-address",
        help = "Socket address the webhook listens on. Defaults to `server.listenAddress` of the \
                configuration (0.0.0.0:9000)."
    )]
    listen_address: Option<SocketAddr>,

    #[arg(long, env = "PORT", help = "Port to listen on, replacing the port of the listen address.")]
    port: Option<u16>,
}

impl ServeCommand {
    pub async fn run(self, config: Config) -> Result<(), Error> {
        let Self { listen_address, port } = self;

        let mut listen_address = listen_address.unwrap_or(config.server.listen_address);
        if let Some(port) = port {
            listen_address.set_port(port);
        }

        let server = ConventionServer::new(
            listen_address,
            conventions::catalog(&config.annotation_prefix),
        );
        tracing::info!(
            "Starting {PROJECT_NAME_WITH_INITIAL_CAPITAL} {} with prefix {} on {}",
            *PROJECT_SEMVER,
            config.annotation_prefix,
            server.listen_address()
        );

        let lifecycle_manager = LifecycleManager::<Error>::new();
        let _handle =
            lifecycle_manager.spawn("convention-server", move |shutdown_signal| async move {
                match server.run(shutdown_signal).await {
                    Ok(()) => ExitStatus::Success,
                    Err(err) => ExitStatus::Error(Error::from(err)),
                }
            });

        if let Ok(Err(err)) = lifecycle_manager.serve().await {
            tracing::error!("{err}");
            Err(err)
        } else {
            Ok(())
        }
    }
}

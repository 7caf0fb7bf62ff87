//! The webhook endpoint queried by the Cartographer conventions controller.
//!
//! The controller `POST`s a `PodConventionContext` to `/` and expects the same
//! document back with its `status` filled. A body that cannot be decoded is
//! answered with `400 Bad Request`, a convention that fails with
//! `500 Internal Server Error`; in both cases nothing is mutated.

mod error;

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use snafu::ResultExt;
use tokio::net::TcpListener;

pub use self::error::Error;
use crate::{convention::PodConvention, webhook::PodConventionContext};

#[derive(Clone, Debug)]
pub struct ConventionServer {
    listen_address: SocketAddr,

    conventions: Arc<[PodConvention]>,
}

impl ConventionServer {
    #[must_use]
    pub fn new(listen_address: SocketAddr, conventions: Vec<PodConvention>) -> Self {
        Self { listen_address, conventions: conventions.into() }
    }

    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr { self.listen_address }

    #[must_use]
    pub fn router(&self) -> Router {
        Router::new().route("/", post(apply_conventions)).with_state(Arc::clone(&self.conventions))
    }

    /// Serves the webhook until `shutdown_signal` resolves, then lets
    /// in-flight requests complete.
    ///
    /// # Errors
    ///
    /// Fails when the listen address cannot be bound or the accept loop
    /// breaks.
    pub async fn run(
        self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), Error> {
        let socket_address = self.listen_address;
        let listener = TcpListener::bind(socket_address)
            .await
            .context(error::BindTcpSocketSnafu { socket_address })?;

        tracing::info!("Serving {} conventions on {socket_address}", self.conventions.len());

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal)
            .await
            .context(error::ServeSnafu { socket_address })?;

        tracing::info!("Convention server on {socket_address} stopped");
        Ok(())
    }
}

async fn apply_conventions(
    State(conventions): State<Arc<[PodConvention]>>,
    body: Bytes,
) -> Response {
    let mut context: PodConventionContext = match serde_json::from_slice(&body) {
        Ok(context) => context,
        Err(err) => {
            tracing::warn!("Failed to decode pod convention context, error: {err}");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    if let Err(err) = context.apply(&conventions[..]) {
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    Json(context).into_response()
}

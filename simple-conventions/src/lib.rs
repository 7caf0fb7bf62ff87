//! A Cartographer convention server.
//!
//! The server receives a `PodConventionContext` for every workload, walks the
//! containers of its pod template and applies an ordered catalog of
//! conventions. Each convention is gated by an annotation (or label) on the
//! template and merges the annotation's JSON value into the template: probes,
//! arguments, volumes, tolerations, node selectors, affinity and environment
//! variables.

pub mod cli;
pub mod config;
pub mod convention;
pub mod conventions;
pub mod ext;
pub mod handler;
pub mod server;
pub mod ui;
pub mod webhook;

mod shadow {
    #![allow(clippy::needless_raw_string_hashes)]
    use shadow_rs::shadow;
    shadow!(build);

    pub use self::build::*;
}

pub use self::{
    convention::{Convention, ImageMetadata, Mutation, PodConvention, ValueSource},
    webhook::{ImageConfig, PodConventionContext},
};

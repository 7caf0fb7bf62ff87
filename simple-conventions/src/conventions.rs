//! The default catalog of conventions.
//!
//! Every convention of the catalog is namespaced by a prefix: the identifier
//! reported back to the controller is `<prefix>-<name>` and the annotation it
//! reads is `<prefix>/<suffix>`. The workload-name convention reads the
//! `carto.run/workload-name` label set by Cartographer instead.

use simple_conventions_base::consts::k8s::{annotations, labels};

use crate::convention::{Mutation, PodConvention, ValueSource};

/// Builds the identifier of the convention `name`.
#[must_use]
pub fn convention_id(prefix: &str, name: &str) -> String { format!("{prefix}-{name}") }

/// Builds the annotation key read by the convention with `suffix`.
#[must_use]
pub fn annotation_key(prefix: &str, suffix: &str) -> String { format!("{prefix}/{suffix}") }

/// The ordered default catalog for `prefix`.
#[must_use]
pub fn catalog(prefix: &str) -> Vec<PodConvention> {
    let annotated = |name: &str, suffix: &str, mutation: Mutation| {
        PodConvention::new(
            convention_id(prefix, name),
            ValueSource::Annotation(annotation_key(prefix, suffix)),
            mutation,
        )
    };

    vec![
        annotated("readiness", annotations::READINESS_PROBE, Mutation::ReadinessProbe),
        annotated("liveness", annotations::LIVENESS_PROBE, Mutation::LivenessProbe),
        annotated("startup", annotations::STARTUP_PROBE, Mutation::StartupProbe),
        PodConvention::new(
            convention_id(prefix, "carto-run-workload-name"),
            ValueSource::Label(labels::WORKLOAD_NAME.to_string()),
            Mutation::WorkloadNameEnv,
        ),
        annotated("args", annotations::ARGS, Mutation::Args),
        annotated("storage", annotations::STORAGE, Mutation::Storage),
        annotated("tolerations", annotations::TOLERATIONS, Mutation::Tolerations),
        annotated("nodeSelector", annotations::NODE_SELECTOR, Mutation::NodeSelector),
        annotated("affinity", annotations::AFFINITY, Mutation::Affinity),
    ]
}

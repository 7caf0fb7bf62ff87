use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Affinity, Container, EnvVar, PodTemplateSpec, Probe, Toleration, Volume, VolumeMount,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use simple_conventions_base::consts;
use snafu::ResultExt;

use super::{Error, error};
use crate::ext::{ContainerExt, PodTemplateSpecExt};

/// How a convention merges its decoded value into a pod template.
///
/// Container-level mutations touch every container of the template, pod-level
/// mutations touch the pod spec once per invocation.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Mutation {
    /// Sets the readiness probe of containers that have none.
    ReadinessProbe,
    /// Sets the liveness probe of containers that have none.
    LivenessProbe,
    /// Sets the startup probe of containers that have none.
    StartupProbe,
    /// Exposes the workload name as `CARTO_RUN_WORKLOAD_NAME` unless the
    /// container already defines it.
    WorkloadNameEnv,
    /// Appends a JSON string array to the arguments of every container.
    Args,
    /// Appends `volumeMounts` to every container, and `volumes` to the pod
    /// once for each container.
    Storage,
    /// Appends a JSON array of tolerations to the pod.
    Tolerations,
    /// Replaces the node selector of the pod.
    NodeSelector,
    /// Replaces the affinity of the pod.
    Affinity,
}

impl Mutation {
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ReadinessProbe => "set readiness probe if unset",
            Self::LivenessProbe => "set liveness probe if unset",
            Self::StartupProbe => "set startup probe if unset",
            Self::WorkloadNameEnv => "inject CARTO_RUN_WORKLOAD_NAME if unset",
            Self::Args => "append process arguments",
            Self::Storage => "append volumes and volume mounts",
            Self::Tolerations => "append tolerations",
            Self::NodeSelector => "replace node selector",
            Self::Affinity => "replace affinity",
        }
    }

    /// Decodes `value` (read from `key`) and merges it into `template`.
    ///
    /// The value is decoded before anything is written, a decoding failure
    /// leaves `template` untouched.
    pub(crate) fn apply(
        self,
        template: &mut PodTemplateSpec,
        key: &str,
        value: &str,
    ) -> Result<(), Error> {
        match self {
            Self::ReadinessProbe => {
                set_probe(template, key, value, "readiness probe", readiness_probe)
            }
            Self::LivenessProbe => set_probe(template, key, value, "liveness probe", liveness_probe),
            Self::StartupProbe => set_probe(template, key, value, "startup probe", startup_probe),
            Self::WorkloadNameEnv => {
                for container in template.containers_mut() {
                    let added = container.add_env_var(EnvVar {
                        name: consts::k8s::env::WORKLOAD_NAME.to_string(),
                        value: Some(value.to_string()),
                        ..EnvVar::default()
                    });
                    if added {
                        tracing::debug!(
                            container = %container.name,
                            "Adding env {}={value}",
                            consts::k8s::env::WORKLOAD_NAME
                        );
                    }
                }
                Ok(())
            }
            Self::Args => {
                let args = decode::<Option<Vec<String>>>(key, value, "arguments")?
                    .unwrap_or_default();
                for container in template.containers_mut() {
                    tracing::debug!(container = %container.name, "Adding args {args:?}");
                    append(&mut container.args, args.clone());
                }
                Ok(())
            }
            Self::Storage => {
                let Storage { volume_mounts, volumes } = decode(key, value, "storage")?;
                let Some(spec) = template.spec.as_mut() else {
                    return Ok(());
                };
                // volumes are appended once per container
                for container in &mut spec.containers {
                    tracing::debug!(
                        container = %container.name,
                        "Adding volume mounts {volume_mounts:?} and volumes {volumes:?}"
                    );
                    append(&mut container.volume_mounts, volume_mounts.clone());
                    append(&mut spec.volumes, volumes.clone());
                }
                Ok(())
            }
            Self::Tolerations => {
                let tolerations = decode::<Option<Vec<Toleration>>>(key, value, "tolerations")?
                    .unwrap_or_default();
                tracing::debug!("Adding tolerations {tolerations:?}");
                append(&mut template.pod_spec_mut().tolerations, tolerations);
                Ok(())
            }
            Self::NodeSelector => {
                let node_selector =
                    decode::<Option<BTreeMap<String, String>>>(key, value, "node selector")?;
                tracing::debug!("Setting node selector {node_selector:?}");
                template.pod_spec_mut().node_selector = node_selector;
                Ok(())
            }
            Self::Affinity => {
                let affinity =
                    decode::<Option<Affinity>>(key, value, "affinity")?.unwrap_or_default();
                tracing::debug!("Setting affinity {affinity:?}");
                template.pod_spec_mut().affinity = Some(affinity);
                Ok(())
            }
        }
    }
}

/// Volumes and mounts carried by the storage annotation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Storage {
    #[serde(default)]
    volume_mounts: Vec<VolumeMount>,

    #[serde(default)]
    volumes: Vec<Volume>,
}

fn readiness_probe(container: &mut Container) -> &mut Option<Probe> {
    &mut container.readiness_probe
}

fn liveness_probe(container: &mut Container) -> &mut Option<Probe> { &mut container.liveness_probe }

fn startup_probe(container: &mut Container) -> &mut Option<Probe> { &mut container.startup_probe }

fn set_probe(
    template: &mut PodTemplateSpec,
    key: &str,
    value: &str,
    kind: &'static str,
    slot: fn(&mut Container) -> &mut Option<Probe>,
) -> Result<(), Error> {
    let containers = template.containers_mut();
    // existing probes are never replaced, nothing to decode when all are set
    if containers.iter_mut().all(|container| slot(container).is_some()) {
        return Ok(());
    }

    let probe = decode::<Option<Probe>>(key, value, kind)?.unwrap_or_default();
    for container in containers.iter_mut() {
        if slot(container).is_none() {
            tracing::debug!(container = %container.name, "Adding {kind} {probe:?}");
            *slot(container) = Some(probe.clone());
        }
    }
    Ok(())
}

/// Appends `items` to `target`. An absent list stays absent when there is
/// nothing to append.
fn append<T>(target: &mut Option<Vec<T>>, items: Vec<T>) {
    if !items.is_empty() {
        target.get_or_insert_with(Vec::new).extend(items);
    }
}

fn decode<T>(key: &str, value: &str, kind: &'static str) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    serde_json::from_str(value).context(error::DecodeValueSnafu { key, kind })
}

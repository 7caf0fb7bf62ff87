//! Applies a catalog of conventions to a pod template.

use k8s_openapi::api::core::v1::PodTemplateSpec;
use snafu::{ResultExt, Snafu};

use crate::{
    convention::{Convention, ImageMetadata},
    ext::PodTemplateSpecExt,
    webhook::ImageConfig,
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to apply convention {convention}, error: {source}"))]
    ApplyConvention { convention: String, source: crate::convention::Error },
}

/// Indexes `images` by image reference. A reference listed more than once
/// resolves to its last entry.
#[must_use]
pub fn image_metadata(images: &[ImageConfig]) -> ImageMetadata {
    images.iter().map(|image| (image.image.clone(), image.clone())).collect()
}

/// Applies `conventions` to every container of `template` whose image is
/// listed in `images`, and returns the identifiers of the applied conventions
/// in application order.
///
/// Containers are visited in template order; for each of them every
/// applicable convention is applied in catalog order. Applicability is
/// evaluated against the whole template as mutated so far, so an identifier
/// shows up once per container that triggered it. Containers whose image has
/// no metadata are skipped.
///
/// # Errors
///
/// Stops at the first convention that fails. Conventions applied before the
/// failure are not rolled back: on error `template` must be discarded.
pub fn add_conventions<C>(
    conventions: &[C],
    template: &mut PodTemplateSpec,
    images: &[ImageConfig],
) -> Result<Vec<String>, Error>
where
    C: Convention,
{
    let metadata = image_metadata(images);
    let mut applied_conventions = Vec::new();

    for index in 0..template.containers().len() {
        let Some(container) = template.containers().get(index) else {
            break;
        };
        let Some(image) = container.image.as_deref().and_then(|image| metadata.get(image)) else {
            tracing::warn!(container = %container.name, "image name not defined");
            continue;
        };
        let image_name = image.title();

        for convention in conventions {
            if !convention.is_applicable(template, &metadata) {
                continue;
            }

            convention
                .apply(template, index, &metadata, image_name)
                .inspect_err(|err| {
                    tracing::error!(
                        convention = convention.id(),
                        namespace = template.namespace(),
                        name = template.name(),
                        kind = "PodTemplateSpec",
                        "{err}"
                    );
                })
                .with_context(|_| ApplyConventionSnafu { convention: convention.id() })?;
            applied_conventions.push(convention.id().to_string());

            tracing::info!(
                convention = convention.id(),
                namespace = template.namespace(),
                name = template.name(),
                kind = "PodTemplateSpec",
                "Successfully applied convention"
            );
        }
    }

    Ok(applied_conventions)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::BTreeMap};

    use k8s_openapi::{
        api::core::v1::{Container, EnvVar, PodSpec},
        apimachinery::pkg::apis::meta::v1::ObjectMeta,
    };
    use serde_json::json;

    use super::*;
    use crate::{
        convention::{self, Mutation, PodConvention, ValueSource},
        conventions,
        webhook::{Bom, ConfigFile, RuntimeConfig},
    };

    const PREFIX: &str = "example.com";
    const IMAGE: &str = "sample-accelerators/tanzu-java-web-app";
    const PROBE: &str =
        r#"{"exec":{"command":["cat","/tmp/healthy"]},"initialDelaySeconds":5,"periodSeconds":5}"#;
    const STORAGE: &str = r#"{"volumeMounts":[{"mountPath":"/test","name":"test"}],"volumes":[{"name":"test","emptyDir":{}}]}"#;

    fn image_config(image: &str, title: &str) -> ImageConfig {
        ImageConfig {
            image: image.to_string(),
            boms: vec![Bom { name: "cnb-app:dependencies".to_string(), raw: b"{}".to_vec() }],
            config: ConfigFile {
                config: RuntimeConfig {
                    labels: BTreeMap::from([(
                        "org.opencontainers.image.title".to_string(),
                        title.to_string(),
                    )]),
                    ..RuntimeConfig::default()
                },
                ..ConfigFile::default()
            },
        }
    }

    fn images() -> Vec<ImageConfig> { vec![image_config(IMAGE, "tanzu-java-web-app")] }

    fn container(name: &str, image: &str) -> Container {
        Container { name: name.to_string(), image: Some(image.to_string()), ..Container::default() }
    }

    fn template(
        annotations: &[(String, &str)],
        labels: &[(&str, &str)],
        containers: Vec<Container>,
    ) -> PodTemplateSpec {
        PodTemplateSpec {
            metadata: Some(ObjectMeta {
                name: Some("tanzu-java-web-app".to_string()),
                namespace: Some("default".to_string()),
                annotations: Some(
                    annotations.iter().map(|(k, v)| (k.clone(), (*v).to_string())).collect(),
                ),
                labels: Some(
                    labels.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
                ),
                ..ObjectMeta::default()
            }),
            spec: Some(PodSpec { containers, ..PodSpec::default() }),
        }
    }

    fn annotated(suffix: &str, value: &str) -> PodTemplateSpec {
        template(
            &[(conventions::annotation_key(PREFIX, suffix), value)],
            &[],
            vec![container("workload", IMAGE)],
        )
    }

    fn id(name: &str) -> String { conventions::convention_id(PREFIX, name) }

    fn run(template: &mut PodTemplateSpec) -> Result<Vec<String>, Error> {
        add_conventions(&conventions::catalog(PREFIX), template, &images())
    }

    #[test]
    fn test_no_images() {
        let mut template = annotated("args", r#"["one"]"#);
        let original = template.clone();

        let applied = add_conventions(&conventions::catalog(PREFIX), &mut template, &[]).unwrap();

        assert!(applied.is_empty());
        assert_eq!(template, original);
    }

    #[test]
    fn test_each_annotation_fires_its_convention() {
        let cases = [
            ("readinessProbe", PROBE, "readiness"),
            ("livenessProbe", PROBE, "liveness"),
            ("startupProbe", PROBE, "startup"),
            ("args", r#"["one","two","three"]"#, "args"),
            ("storage", STORAGE, "storage"),
            ("tolerations", r#"[{"key":"a","operator":"Exists"}]"#, "tolerations"),
            ("nodeSelector", r#"{"disktype":"ssd"}"#, "nodeSelector"),
            ("affinity", r#"{"nodeAffinity":{}}"#, "affinity"),
        ];

        for (suffix, value, name) in cases {
            let mut template = annotated(suffix, value);
            assert_eq!(run(&mut template).unwrap(), vec![id(name)], "annotation {suffix}");
        }
    }

    #[test]
    fn test_absent_or_empty_annotations_never_fire() {
        for suffix in ["readinessProbe", "args", "storage", "tolerations", "affinity"] {
            let mut template = annotated(suffix, "");
            let original = template.clone();
            assert!(run(&mut template).unwrap().is_empty(), "annotation {suffix}");
            assert_eq!(template, original);
        }

        let mut template = template(
            &[("unrelated.io/args".to_string(), r#"["one"]"#)],
            &[("app", "web")],
            vec![container("workload", IMAGE)],
        );
        assert!(run(&mut template).unwrap().is_empty());
    }

    #[test]
    fn test_readiness_probe_is_idempotent() {
        let mut template = annotated("readinessProbe", PROBE);
        let _applied = run(&mut template).unwrap();
        let first = template.clone();

        let applied = run(&mut template).unwrap();

        assert_eq!(applied, vec![id("readiness")]);
        assert_eq!(template, first);
        assert_eq!(
            serde_json::to_value(&template.containers()[0].readiness_probe).unwrap(),
            serde_json::from_str::<serde_json::Value>(PROBE).unwrap()
        );
    }

    #[test]
    fn test_storage_round_trip() {
        let mut template = annotated("storage", STORAGE);

        let _applied = run(&mut template).unwrap();

        let value = serde_json::to_value(&template).unwrap();
        assert_eq!(
            value["spec"]["containers"][0]["volumeMounts"],
            json!([{ "name": "test", "mountPath": "/test" }])
        );
        assert_eq!(value["spec"]["volumes"], json!([{ "name": "test", "emptyDir": {} }]));
    }

    #[test]
    fn test_args_are_not_idempotent() {
        let mut template = annotated("args", r#"["one","two","three"]"#);

        let _applied = run(&mut template).unwrap();
        assert_eq!(
            template.containers()[0].args,
            Some(vec!["one".to_string(), "two".to_string(), "three".to_string()])
        );

        // appending again on the result duplicates the arguments
        let _applied = run(&mut template).unwrap();
        assert_eq!(template.containers()[0].args.as_ref().map(Vec::len), Some(6));
    }

    #[test]
    fn test_workload_name_label() {
        let mut template = template(
            &[],
            &[("carto.run/workload-name", "my-workload")],
            vec![container("workload", IMAGE)],
        );

        assert_eq!(run(&mut template).unwrap(), vec![id("carto-run-workload-name")]);
        let _applied = run(&mut template).unwrap();

        assert_eq!(
            template.containers()[0].env,
            Some(vec![EnvVar {
                name: "CARTO_RUN_WORKLOAD_NAME".to_string(),
                value: Some("my-workload".to_string()),
                ..EnvVar::default()
            }])
        );
    }

    #[test]
    fn test_malformed_readiness_probe() {
        let mut template = annotated("readinessProbe", "{\"exec\":{\"command\":");

        let err = run(&mut template).unwrap_err();

        let Error::ApplyConvention { convention: failed, source } = err;
        assert_eq!(failed, id("readiness"));
        assert!(matches!(source, convention::Error::DecodeValue { .. }));
    }

    #[test]
    fn test_error_aborts_without_rollback() {
        let mut template = template(
            &[
                (conventions::annotation_key(PREFIX, "readinessProbe"), PROBE),
                (conventions::annotation_key(PREFIX, "args"), "not-json"),
                (conventions::annotation_key(PREFIX, "nodeSelector"), r#"{"disktype":"ssd"}"#),
            ],
            &[],
            vec![container("workload", IMAGE)],
        );

        assert!(run(&mut template).is_err());

        // the readiness probe applied before the failure stays in place, the
        // node selector after it is never reached
        assert!(template.containers()[0].readiness_probe.is_some());
        assert_eq!(template.spec.as_ref().unwrap().node_selector, None);
    }

    #[test]
    fn test_args_and_storage_commute() {
        let annotations = [
            (conventions::annotation_key(PREFIX, "args"), r#"["one","two","three"]"#),
            (conventions::annotation_key(PREFIX, "storage"), STORAGE),
        ];
        let catalog = conventions::catalog(PREFIX)
            .into_iter()
            .filter(|convention| matches!(convention.mutation, Mutation::Args | Mutation::Storage))
            .collect::<Vec<_>>();
        let reversed = catalog.iter().rev().cloned().collect::<Vec<_>>();

        let mut forward = template(&annotations, &[], vec![container("workload", IMAGE)]);
        let mut backward = forward.clone();
        let _applied = add_conventions(&catalog, &mut forward, &images()).unwrap();
        let _applied = add_conventions(&reversed, &mut backward, &images()).unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_conventions_fire_once_per_eligible_container() {
        let mut template = template(
            &[
                (conventions::annotation_key(PREFIX, "args"), r#"["--debug"]"#),
                (
                    conventions::annotation_key(PREFIX, "tolerations"),
                    r#"[{"key":"dedicated","operator":"Exists"}]"#,
                ),
            ],
            &[],
            vec![container("app", IMAGE), container("sidecar", IMAGE)],
        );

        let applied = run(&mut template).unwrap();

        assert_eq!(applied, vec![id("args"), id("tolerations"), id("args"), id("tolerations")]);
        // args are appended to every container on each invocation
        for container in template.containers() {
            assert_eq!(container.args.as_ref().map(Vec::len), Some(2));
        }
        // pod-level tolerations are appended once per eligible container
        assert_eq!(template.spec.as_ref().unwrap().tolerations.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_storage_with_two_eligible_containers() {
        let mut template = template(
            &[(conventions::annotation_key(PREFIX, "storage"), STORAGE)],
            &[],
            vec![container("app", IMAGE), container("sidecar", IMAGE)],
        );

        let applied = run(&mut template).unwrap();

        assert_eq!(applied, vec![id("storage"), id("storage")]);
        // each invocation mounts on every container and adds the volumes per container
        for container in template.containers() {
            assert_eq!(container.volume_mounts.as_ref().map(Vec::len), Some(2));
        }
        assert_eq!(template.spec.as_ref().unwrap().volumes.as_ref().map(Vec::len), Some(4));
    }

    #[test]
    fn test_containers_without_metadata_are_skipped() {
        let mut template = template(
            &[(conventions::annotation_key(PREFIX, "tolerations"), r#"[{"operator":"Exists"}]"#)],
            &[],
            vec![container("unknown", "docker.io/library/busybox"), container("app", IMAGE)],
        );

        let applied = run(&mut template).unwrap();

        assert_eq!(applied, vec![id("tolerations")]);
    }

    #[test]
    fn test_image_reference_must_match_exactly() {
        let mut template = annotated("args", r#"["one"]"#);
        let images = vec![image_config(&format!("{IMAGE}:latest"), "")];

        let applied =
            add_conventions(&conventions::catalog(PREFIX), &mut template, &images).unwrap();

        assert!(applied.is_empty());
        assert_eq!(template.containers()[0].args, None);
    }

    struct RecordImageName {
        seen: RefCell<Vec<(usize, String)>>,
    }

    impl Convention for RecordImageName {
        fn id(&self) -> &str { "record" }

        fn apply(
            &self,
            _template: &mut PodTemplateSpec,
            container_index: usize,
            _metadata: &ImageMetadata,
            image_name: &str,
        ) -> Result<(), convention::Error> {
            self.seen.borrow_mut().push((container_index, image_name.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_last_image_entry_wins() {
        let recorder = RecordImageName { seen: RefCell::new(Vec::new()) };
        let mut template =
            template(&[], &[], vec![container("app", IMAGE), container("other", "busybox")]);
        let images = vec![image_config(IMAGE, "first"), image_config(IMAGE, "second")];

        let applied =
            add_conventions(std::slice::from_ref(&recorder), &mut template, &images).unwrap();

        assert_eq!(applied, vec!["record".to_string()]);
        assert_eq!(recorder.seen.into_inner(), vec![(0, "second".to_string())]);
        assert_eq!(image_metadata(&images)[IMAGE].title(), "second");
    }

    #[test]
    fn test_image_name_and_index_are_passed() {
        let recorder = RecordImageName { seen: RefCell::new(Vec::new()) };
        let mut template = template(
            &[],
            &[],
            vec![container("other", "busybox"), container("app", IMAGE)],
        );

        let _applied =
            add_conventions(std::slice::from_ref(&recorder), &mut template, &images()).unwrap();

        assert_eq!(recorder.seen.into_inner(), vec![(1, "tanzu-java-web-app".to_string())]);
    }

    #[test]
    fn test_heterogeneous_catalog() {
        let catalog: Vec<Box<dyn Convention>> = vec![
            Box::new(RecordImageName { seen: RefCell::new(Vec::new()) }),
            Box::new(PodConvention::new(
                "custom-affinity",
                ValueSource::Label("scheduling".to_string()),
                Mutation::Affinity,
            )),
        ];
        let mut template = template(
            &[],
            &[("scheduling", r#"{"podAffinity":{}}"#)],
            vec![container("app", IMAGE)],
        );

        let applied = add_conventions(&catalog, &mut template, &images()).unwrap();

        assert_eq!(applied, vec!["record".to_string(), "custom-affinity".to_string()]);
        assert!(template.spec.unwrap().affinity.unwrap().pod_affinity.is_some());
    }
}

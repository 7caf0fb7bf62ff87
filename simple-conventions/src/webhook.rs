//! Wire types of the Cartographer conventions webhook
//! (`webhooks.conventions.carto.run/v1alpha1`).
//!
//! The conventions controller posts a [`PodConventionContext`] carrying the
//! pod template of a workload together with the resolved configuration of
//! every image it references. The server answers with the same document,
//! its `status` filled with the mutated template and the identifiers of the
//! conventions that fired.

use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::PodTemplateSpec, apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use simple_conventions_base::consts;

use crate::{convention::Convention, handler};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodConventionContext {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: PodConventionContextSpec,

    #[serde(default)]
    pub status: PodConventionContextStatus,
}

impl Default for PodConventionContext {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta::default(),
            spec: PodConventionContextSpec::default(),
            status: PodConventionContextStatus::default(),
        }
    }
}

impl PodConventionContext {
    /// Applies `conventions` to a copy of `spec.template`.
    ///
    /// On success `status` holds the mutated template and the applied
    /// convention identifiers. On error the context is left as it was, the
    /// partially mutated copy is dropped.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a convention.
    pub fn apply<C>(&mut self, conventions: &[C]) -> Result<(), handler::Error>
    where
        C: Convention,
    {
        let mut template = self.spec.template.clone();
        let applied_conventions =
            handler::add_conventions(conventions, &mut template, &self.spec.image_config)?;
        self.status = PodConventionContextStatus { template, applied_conventions };
        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodConventionContextSpec {
    #[serde(default)]
    pub template: PodTemplateSpec,

    #[serde(default)]
    pub image_config: Vec<ImageConfig>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodConventionContextStatus {
    #[serde(default)]
    pub template: PodTemplateSpec,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_conventions: Vec<String>,
}

/// Resolved metadata of one image referenced by the template.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ImageConfig {
    /// Image reference exactly as it appears in a container's `image` field.
    pub image: String,

    /// Bills of materials attached to the image.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boms: Vec<Bom>,

    #[serde(default)]
    pub config: ConfigFile,
}

impl ImageConfig {
    /// The OCI title label of the image, empty when the image has none.
    #[must_use]
    pub fn title(&self) -> &str {
        self.config
            .config
            .labels
            .get(consts::oci::labels::TITLE)
            .map_or("", String::as_str)
    }

    /// The bill of materials called `name` (e.g. `cnb-app:dependencies`),
    /// `None` when the image carries none by that name. Conventions that
    /// inspect dependencies read its `raw` document.
    #[must_use]
    pub fn bom(&self, name: &str) -> Option<&Bom> { self.boms.iter().find(|bom| bom.name == name) }
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Bom {
    pub name: String,

    #[serde_as(as = "Base64")]
    #[serde(default)]
    pub raw: Vec<u8>,
}

/// OCI image configuration. Fields without a dedicated member are kept in
/// `extra` so that they survive a round trip through the server.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    #[serde(default)]
    pub config: RuntimeConfig,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Execution parameters of an image, with the capitalized keys used by the
/// OCI image format.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct RuntimeConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmd: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub working_dir: String,
}

fn default_api_version() -> String { consts::webhook::API_VERSION.to_string() }

fn default_kind() -> String { consts::webhook::KIND.to_string() }

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::conventions;

    fn sample_context() -> PodConventionContext {
        serde_json::from_value(json!({
            "apiVersion": "webhooks.conventions.carto.run/v1alpha1",
            "kind": "PodConventionContext",
            "metadata": { "name": "sample" },
            "spec": {
                "template": {
                    "metadata": {
                        "name": "tanzu-java-web-app",
                        "annotations": { "example.com/args": "[\"--verbose\"]" }
                    },
                    "spec": {
                        "containers": [
                            { "name": "workload", "image": "registry.example.com/app@sha256:abc" }
                        ]
                    }
                },
                "imageConfig": [
                    {
                        "image": "registry.example.com/app@sha256:abc",
                        "boms": [ { "name": "cnb-app:dependencies", "raw": "eyJib20iOnRydWV9" } ],
                        "config": {
                            "architecture": "amd64",
                            "os": "linux",
                            "rootfs": { "type": "layers", "diff_ids": [] },
                            "config": {
                                "Labels": { "org.opencontainers.image.title": "tanzu-java-web-app" },
                                "Env": [ "PATH=/usr/bin" ],
                                "WorkingDir": "/workspace"
                            }
                        }
                    }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_image_config() {
        let context = sample_context();
        let image = &context.spec.image_config[0];

        assert_eq!(image.title(), "tanzu-java-web-app");
        assert_eq!(image.config.config.env, vec!["PATH=/usr/bin".to_string()]);
        assert_eq!(image.config.config.working_dir, "/workspace");
        assert_eq!(image.bom("cnb-app:dependencies").unwrap().raw, br#"{"bom":true}"#.to_vec());
        assert!(image.bom("missing").is_none());
        assert!(image.config.extra.contains_key("rootfs"));
    }

    #[test]
    fn test_title_defaults_to_empty() {
        assert_eq!(ImageConfig::default().title(), "");
    }

    #[test]
    fn test_encode_keeps_unknown_config_fields() {
        let context = sample_context();
        let value = serde_json::to_value(&context).unwrap();
        let config = &value["spec"]["imageConfig"][0]["config"];

        assert_eq!(config["rootfs"]["type"], "layers");
        assert_eq!(config["config"]["WorkingDir"], "/workspace");
        assert_eq!(value["spec"]["imageConfig"][0]["boms"][0]["raw"], "eyJib20iOnRydWV9");
    }

    #[test]
    fn test_missing_type_meta_uses_defaults() {
        let context: PodConventionContext = serde_json::from_value(json!({})).unwrap();
        assert_eq!(context.api_version, consts::webhook::API_VERSION);
        assert_eq!(context.kind, consts::webhook::KIND);
        assert_eq!(context, PodConventionContext::default());
    }

    #[test]
    fn test_apply_fills_status() {
        let mut context = sample_context();
        context.apply(&conventions::catalog("example.com")).unwrap();

        assert_eq!(context.status.applied_conventions, vec!["example.com-args".to_string()]);
        let container = &context.status.template.spec.as_ref().unwrap().containers[0];
        assert_eq!(container.args, Some(vec!["--verbose".to_string()]));
        // the request template is left untouched
        let original = &context.spec.template.spec.as_ref().unwrap().containers[0];
        assert_eq!(original.args, None);
    }

    #[test]
    fn test_apply_error_leaves_status_empty() {
        let mut context = sample_context();
        let _previous = context
            .spec
            .template
            .metadata
            .get_or_insert_with(ObjectMeta::default)
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert("example.com/args".to_string(), "not json".to_string());

        assert!(context.apply(&conventions::catalog("example.com")).is_err());
        assert_eq!(context.status, PodConventionContextStatus::default());
    }
}

use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};

pub trait PodTemplateSpecExt {
    /// Value of the annotation `key`, `None` when absent or empty.
    fn annotation(&self, key: &str) -> Option<&str>;

    /// Value of the label `key`, `None` when absent or empty.
    fn label(&self, key: &str) -> Option<&str>;

    fn name(&self) -> &str;

    fn namespace(&self) -> &str;

    fn containers(&self) -> &[Container];

    fn containers_mut(&mut self) -> &mut [Container];

    /// The pod spec, created empty when the template has none.
    fn pod_spec_mut(&mut self) -> &mut PodSpec;
}

impl PodTemplateSpecExt for PodTemplateSpec {
    fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.annotations.as_ref())
            .and_then(|annotations| annotations.get(key))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn label(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.labels.as_ref())
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    fn name(&self) -> &str {
        self.metadata.as_ref().and_then(|metadata| metadata.name.as_deref()).unwrap_or_default()
    }

    fn namespace(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.namespace.as_deref())
            .unwrap_or_default()
    }

    fn containers(&self) -> &[Container] {
        self.spec.as_ref().map(|spec| spec.containers.as_slice()).unwrap_or_default()
    }

    fn containers_mut(&mut self) -> &mut [Container] {
        self.spec.as_mut().map(|spec| spec.containers.as_mut_slice()).unwrap_or_default()
    }

    fn pod_spec_mut(&mut self) -> &mut PodSpec { self.spec.get_or_insert_with(PodSpec::default) }
}

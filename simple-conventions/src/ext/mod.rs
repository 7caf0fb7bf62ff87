//! Extensions to `k8s_openapi` types used by the conventions.

mod container;
mod pod_template_spec;

pub use self::{container::ContainerExt, pod_template_spec::PodTemplateSpecExt};

//! The building block of the server: a named mutation over a pod template,
//! gated by a predicate over the same template.

mod error;
mod mutation;

use std::{collections::HashMap, fmt};

use k8s_openapi::api::core::v1::PodTemplateSpec;
use serde::{Deserialize, Serialize};

pub use self::{error::Error, mutation::Mutation};
use crate::{ext::PodTemplateSpecExt, webhook::ImageConfig};

/// Resolved image metadata keyed by image reference.
pub type ImageMetadata = HashMap<String, ImageConfig>;

/// A mutation rule applied to a pod template.
///
/// Implementations must not keep state between calls; a catalog is shared by
/// every request the server handles.
pub trait Convention {
    /// Identifier reported back to the conventions controller once the
    /// convention has been applied.
    fn id(&self) -> &str;

    /// Whether the convention applies to `template`. Conventions without a
    /// predicate always apply.
    fn is_applicable(&self, _template: &PodTemplateSpec, _metadata: &ImageMetadata) -> bool {
        true
    }

    /// Mutates `template` in place.
    ///
    /// `container_index` is the container being processed by the caller and
    /// `image_name` the title of its image.
    ///
    /// # Errors
    ///
    /// Returns an error when the value driving the convention cannot be
    /// decoded. Nothing is written to `template` in that case.
    fn apply(
        &self,
        template: &mut PodTemplateSpec,
        container_index: usize,
        metadata: &ImageMetadata,
        image_name: &str,
    ) -> Result<(), Error>;
}

impl<T> Convention for Box<T>
where
    T: Convention + ?Sized,
{
    fn id(&self) -> &str { (**self).id() }

    fn is_applicable(&self, template: &PodTemplateSpec, metadata: &ImageMetadata) -> bool {
        (**self).is_applicable(template, metadata)
    }

    fn apply(
        &self,
        template: &mut PodTemplateSpec,
        container_index: usize,
        metadata: &ImageMetadata,
        image_name: &str,
    ) -> Result<(), Error> {
        (**self).apply(template, container_index, metadata, image_name)
    }
}

/// Where a convention reads the value that both gates and drives it.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ValueSource {
    Annotation(String),
    Label(String),
}

impl ValueSource {
    /// The key looked up on the template metadata.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Annotation(key) | Self::Label(key) => key,
        }
    }

    /// The non-empty value of the source on `template`. An absent key and an
    /// empty string are both reported as `None`.
    #[must_use]
    pub fn value<'a>(&self, template: &'a PodTemplateSpec) -> Option<&'a str> {
        match self {
            Self::Annotation(key) => template.annotation(key),
            Self::Label(key) => template.label(key),
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Annotation(key) => write!(f, "annotation {key}"),
            Self::Label(key) => write!(f, "label {key}"),
        }
    }
}

/// A convention driven by a single annotation or label.
///
/// The convention is applicable when its source holds a non-empty value, and
/// applying it decodes that value and merges it into the template according to
/// its [`Mutation`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PodConvention {
    pub id: String,

    pub source: ValueSource,

    pub mutation: Mutation,
}

impl PodConvention {
    pub fn new(id: impl Into<String>, source: ValueSource, mutation: Mutation) -> Self {
        Self { id: id.into(), source, mutation }
    }
}

impl Convention for PodConvention {
    fn id(&self) -> &str { &self.id }

    fn is_applicable(&self, template: &PodTemplateSpec, _metadata: &ImageMetadata) -> bool {
        self.source.value(template).is_some()
    }

    fn apply(
        &self,
        template: &mut PodTemplateSpec,
        _container_index: usize,
        _metadata: &ImageMetadata,
        _image_name: &str,
    ) -> Result<(), Error> {
        let Some(value) = self.source.value(template).map(ToString::to_string) else {
            return error::ValueNotFoundSnafu { key: self.source.key() }.fail();
        };
        self.mutation.apply(template, self.source.key(), &value)
    }
}

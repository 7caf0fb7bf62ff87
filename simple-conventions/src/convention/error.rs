use snafu::Snafu;

/// Errors raised while applying a single convention.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// The value read from `key` is not valid JSON for the expected shape.
    #[snafu(display("Failed to decode {kind} from {key}, error: {source}"))]
    DecodeValue { key: String, kind: &'static str, source: serde_json::Error },

    /// The convention was applied while its source carries no value.
    #[snafu(display("No value is set for {key}"))]
    ValueNotFound { key: String },
}

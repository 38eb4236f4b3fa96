use serde::{Deserialize, Serialize};

use super::MetadataConfiguration;

/// The codec metadata of one filter.
///
/// Serialised as a codec name and configuration.
/// For example:
/// ```json
/// {
///     "codec": "zstd",
///     "configuration": {
///         "level": 3
///     }
/// }
/// ```
/// The configuration may be omitted when deserialising, in which case every parameter takes its default.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodecMetadata {
    codec: String,
    #[serde(default)]
    configuration: MetadataConfiguration,
}

impl core::fmt::Display for CodecMetadata {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.configuration.is_empty() {
            write!(f, "{}", self.codec)
        } else {
            write!(f, "{} {:?}", self.codec, self.configuration)
        }
    }
}

impl CodecMetadata {
    /// Create codec metadata from `codec` and `configuration`.
    #[must_use]
    pub fn new(codec: impl Into<String>, configuration: MetadataConfiguration) -> Self {
        Self {
            codec: codec.into(),
            configuration,
        }
    }

    /// Returns the codec name.
    #[must_use]
    pub fn codec(&self) -> &str {
        &self.codec
    }

    /// Returns the codec configuration.
    #[must_use]
    pub const fn configuration(&self) -> &MetadataConfiguration {
        &self.configuration
    }

    /// Convert to a JSON object.
    #[must_use]
    pub fn into_value(self) -> serde_json::Value {
        let mut object = MetadataConfiguration::new();
        object.insert("codec".to_string(), self.codec.into());
        object.insert(
            "configuration".to_string(),
            serde_json::Value::Object(self.configuration),
        );
        serde_json::Value::Object(object)
    }
}

//! Errors returned by versioned model converters.

/// Failure converting between a versioned wire model and the internal data model.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("unsupported api-version '{0}'")]
    UnsupportedApiVersion(String),
    #[error("{property_name} must be {valid_value}")]
    ModelConversion {
        property_name: String,
        valid_value: String,
    },
    #[error("invalid model conversion")]
    InvalidModelConversion,
    #[error("failed to decode request body: {0}")]
    Decode(#[from] serde_json::Error),
    /// A validation failure the provider wants reported with its own code.
    #[error("{message}")]
    ClientRp { code: String, message: String },
}

impl ConversionError {
    #[must_use]
    pub fn model(property_name: impl Into<String>, valid_value: impl Into<String>) -> Self {
        Self::ModelConversion {
            property_name: property_name.into(),
            valid_value: valid_value.into(),
        }
    }
}

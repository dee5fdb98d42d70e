use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    /// The dataset could not be read as either supported shape.
    #[error("malformed dataset at {location}: {reason}")]
    MalformedDataset { location: String, reason: String },

    #[error("duplicate source identifier '{slug}': kept {kept}, rejected {rejected}")]
    DuplicateSourceIdentifier {
        slug: String,
        kept: String,
        rejected: String,
    },

    #[error("no arXiv mapping for '{slug}'")]
    NotFound { slug: String },
}

impl MappingError {
    pub(crate) fn malformed(location: impl Into<String>, reason: impl ToString) -> Self {
        MappingError::MalformedDataset {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

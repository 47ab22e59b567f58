use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog maps to unknown language deck '{0}'")]
    UnknownLanguage(String),
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecommendError>;

#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] mapmark_vector_store::VectorStoreError),

    #[error("Marker error: {0}")]
    MarkerError(#[from] mapmark_markers::MarkerError),

    #[error("Empty query")]
    EmptyQuery,

    #[error("{0}")]
    Other(String),
}

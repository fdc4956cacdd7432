use thiserror::Error;

/// Pipeline failures that abort the run. Per-image problems are logged and
/// skipped instead of surfacing here.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("Failed to load data from database for split ratio {split_ratio}: {source}")]
    Database {
        split_ratio: u32,
        #[source]
        source: sqlx::Error,
    },
    #[error("No images loaded from database for split ratio {0}")]
    EmptyDataset(u32),
    #[error("Backbone error: {0}")]
    Backbone(String),
    #[error("Model error: {0}")]
    Torch(#[from] tch::TchError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

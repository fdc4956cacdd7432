use std::env;
use std::path::PathBuf;

/// Input edge length expected by the Xception backbone.
pub const IMG_SIZE: u32 = 299;
pub const BATCH_SIZE: i64 = 8;
pub const EPOCHS: usize = 5;
pub const LEARNING_RATE: f64 = 1e-4;
/// Probability above which a test image is called "fake".
pub const DECISION_THRESHOLD: f64 = 0.5;
/// Channel width of the pooled Xception feature map.
pub const FEATURE_DIM: i64 = 2048;

/// Runtime settings, resolved once from the environment. Hyperparameters are
/// deliberately not configurable.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Root the DB-stored relative paths resolve against.
    pub storage_path: PathBuf,
    /// Where normalized copies of processed images are written.
    pub preprocessed_dir: PathBuf,
    pub model_dir: PathBuf,
    /// TorchScript file holding the frozen backbone.
    pub backbone_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let var =
            |key: &str, default: &str| env::var(key).unwrap_or_else(|_| default.to_string());
        Self {
            database_url: var("DATABASE_URL", "mysql://root:@localhost/testestes"),
            storage_path: var("STORAGE_PATH", "storage/app/public").into(),
            preprocessed_dir: var("PREPROCESSED_DIR", "storage/images").into(),
            model_dir: var("MODEL_DIR", "model").into(),
            backbone_path: var("BACKBONE_PATH", "model/xception_backbone.pt").into(),
        }
    }
}

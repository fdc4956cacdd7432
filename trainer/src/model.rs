use std::fs;
use std::path::{Path, PathBuf};

use tch::nn::{self, ModuleT, OptimizerConfig};
use tch::{CModule, Device, Kind, Reduction, Tensor};

use crate::config::{BATCH_SIZE, EPOCHS, FEATURE_DIM, IMG_SIZE, LEARNING_RATE};
use crate::error::TrainError;

/// A frozen pre-trained backbone reduced to one flat feature vector per
/// image. Implementations must not track gradients.
pub trait FeatureExtractor {
    fn feature_dim(&self) -> i64;
    /// Map a `[N, 3, H, W]` batch to `[N, feature_dim]` features.
    fn features(&self, images: &Tensor) -> Result<Tensor, TrainError>;
}

/// The production backbone: an Xception feature extractor exported as
/// TorchScript, with its ImageNet weights left untouched.
pub struct TorchScriptExtractor {
    module: CModule,
    feature_dim: i64,
}

impl TorchScriptExtractor {
    /// Loads the TorchScript file and runs one dummy batch through it, so a
    /// backbone with the wrong feature width fails here instead of as a
    /// shape error mid-fit.
    pub fn load(path: &Path, device: Device) -> Result<Self, TrainError> {
        let module = CModule::load_on_device(path, device)?;
        let extractor = Self {
            module,
            feature_dim: FEATURE_DIM,
        };
        let side = i64::from(IMG_SIZE);
        let probe = Tensor::zeros([1, 3, side, side], (Kind::Float, device));
        let features = extractor.features(&probe)?;
        validate_feature_width(&features.size(), FEATURE_DIM, path)?;
        Ok(extractor)
    }
}

fn validate_feature_width(size: &[i64], expected: i64, path: &Path) -> Result<(), TrainError> {
    match size {
        [_, width] if *width == expected => Ok(()),
        _ => Err(TrainError::Backbone(format!(
            "backbone {} emits features shaped {size:?}, expected [N, {expected}]",
            path.display()
        ))),
    }
}

impl FeatureExtractor for TorchScriptExtractor {
    fn feature_dim(&self) -> i64 {
        self.feature_dim
    }

    fn features(&self, images: &Tensor) -> Result<Tensor, TrainError> {
        let out = tch::no_grad(|| self.module.forward_ts(&[images]))?;
        // Spatial maps get pooled down; already-flat outputs pass through.
        let features = if out.dim() == 4 {
            out.adaptive_avg_pool2d([1, 1]).flatten(1, -1)
        } else {
            out
        };
        Ok(features)
    }
}

/// Frozen backbone plus the trainable dense head:
/// Linear(d, 64) / ReLU / Dropout(0.5) / Linear(64, 32) / ReLU /
/// Dropout(0.3) / Linear(32, 1), sigmoid applied at prediction time.
pub struct Classifier<E> {
    extractor: E,
    vs: nn::VarStore,
    head: nn::SequentialT,
    device: Device,
}

fn build_head(root: &nn::Path, feature_dim: i64) -> nn::SequentialT {
    nn::seq_t()
        .add(nn::linear(root / "fc1", feature_dim, 64, Default::default()))
        .add_fn(|xs| xs.relu())
        .add_fn_t(|xs, train| xs.dropout(0.5, train))
        .add(nn::linear(root / "fc2", 64, 32, Default::default()))
        .add_fn(|xs| xs.relu())
        .add_fn_t(|xs, train| xs.dropout(0.3, train))
        .add(nn::linear(root / "out", 32, 1, Default::default()))
}

impl<E: FeatureExtractor> Classifier<E> {
    pub fn new(extractor: E, device: Device) -> Self {
        let vs = nn::VarStore::new(device);
        let head = build_head(&vs.root(), extractor.feature_dim());
        Self {
            extractor,
            vs,
            head,
            device,
        }
    }

    /// Adam on binary cross-entropy over the head only. The test split is
    /// observed as validation data during training, matching the original
    /// experiment setup.
    pub fn fit(
        &mut self,
        train: (&Tensor, &Tensor),
        validation: (&Tensor, &Tensor),
    ) -> Result<(), TrainError> {
        let features = self.extractor.features(&train.0.to_device(self.device))?;
        let labels = train.1.to_device(self.device);
        let val_features = self
            .extractor
            .features(&validation.0.to_device(self.device))?;
        let val_labels = validation.1.to_device(self.device);

        let mut opt = nn::Adam::default().build(&self.vs, LEARNING_RATE)?;
        for epoch in 1..=EPOCHS {
            let mut total_loss = 0.0;
            let mut batches: f64 = 0.0;
            let mut iter = tch::data::Iter2::new(&features, &labels, BATCH_SIZE);
            for (x, y) in iter.shuffle() {
                let logits = self.head.forward_t(&x, true).squeeze_dim(1);
                let loss = logits.binary_cross_entropy_with_logits::<Tensor>(
                    &y,
                    None,
                    None,
                    Reduction::Mean,
                );
                opt.backward_step(&loss);
                total_loss += f64::try_from(&loss)?;
                batches += 1.0;
            }
            let (val_loss, val_accuracy) = self.evaluate(&val_features, &val_labels)?;
            log::info!(
                "Epoch {epoch}/{EPOCHS}: loss {:.4}, val_loss {val_loss:.4}, val_accuracy {val_accuracy:.4}",
                total_loss / batches.max(1.0)
            );
        }
        Ok(())
    }

    fn evaluate(&self, features: &Tensor, labels: &Tensor) -> Result<(f64, f64), TrainError> {
        let logits = tch::no_grad(|| self.head.forward_t(features, false)).squeeze_dim(1);
        let loss =
            logits.binary_cross_entropy_with_logits::<Tensor>(labels, None, None, Reduction::Mean);
        let hits = logits
            .sigmoid()
            .gt(0.5)
            .to_kind(Kind::Float)
            .eq_tensor(labels)
            .to_kind(Kind::Float)
            .mean(Kind::Float);
        Ok((f64::try_from(&loss)?, f64::try_from(&hits)?))
    }

    /// Sigmoid probabilities of the "fake" class, one per image.
    pub fn predict(&self, images: &Tensor) -> Result<Vec<f64>, TrainError> {
        let features = self.extractor.features(&images.to_device(self.device))?;
        let probabilities = tch::no_grad(|| self.head.forward_t(&features, false))
            .squeeze_dim(1)
            .sigmoid()
            .to_kind(Kind::Double);
        Ok(Vec::<f64>::try_from(&probabilities)?)
    }

    /// Persist the head weights; the backbone is reproducible from its own
    /// file and is not duplicated into the artifact.
    pub fn save(&self, path: &Path) -> Result<(), TrainError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.vs.save(path)?;
        Ok(())
    }
}

pub fn artifact_path(model_dir: &Path, split_ratio: u32) -> PathBuf {
    model_dir.join(format!("xception_model_{split_ratio}.ot"))
}

/// Last-write-wins artifact lifecycle: drop every prior model file for this
/// split ratio, then any stray checkpoint whose name embeds the ratio.
/// Per-file failures are logged and skipped.
pub fn delete_old_artifacts(model_dir: &Path, split_ratio: u32) {
    let Ok(entries) = fs::read_dir(model_dir) else {
        return;
    };
    let model_prefix = format!("xception_model_{split_ratio}");
    let ratio = split_ratio.to_string();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(&model_prefix) || name.contains(&ratio) {
            match fs::remove_file(&path) {
                Ok(()) => log::info!("Deleted old model: {}", path.display()),
                Err(e) => log::error!("Error deleting model {}: {e}", path.display()),
            }
        }
    }
}

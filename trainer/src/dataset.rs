use ndarray::Array3;
use tch::{Kind, Tensor};

use crate::config::{Config, IMG_SIZE};
use crate::db::ImageRecord;
use crate::error::TrainError;
use crate::preprocess;

/// One side of the train/test partition. Images are kept as normalized CHW
/// arrays until the training stage stacks them into a batch tensor.
#[derive(Debug)]
pub struct Split {
    pub images: Vec<Array3<f32>>,
    /// 0 = real, 1 = fake, aligned with `images`.
    pub labels: Vec<i64>,
    pub filenames: Vec<String>,
}

impl Split {
    fn new() -> Self {
        Self {
            images: Vec::new(),
            labels: Vec::new(),
            filenames: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Stack into `([N, 3, H, W] f32, [N] f32)` tensors.
    pub fn to_tensors(&self) -> (Tensor, Tensor) {
        let n = self.images.len();
        let side = IMG_SIZE as usize;
        let mut flat = Vec::with_capacity(n * 3 * side * side);
        for img in &self.images {
            flat.extend(img.iter().copied());
        }
        let images =
            Tensor::from_slice(&flat).view([n as i64, 3, i64::from(IMG_SIZE), i64::from(IMG_SIZE)]);
        let labels = Tensor::from_slice(&self.labels).to_kind(Kind::Float);
        (images, labels)
    }
}

#[derive(Debug)]
pub struct Dataset {
    pub train: Split,
    pub test: Split,
}

/// Turn fetched records into in-memory splits. Records whose file is missing
/// are skipped silently; undecodable files are logged and skipped. An empty
/// split after filtering fails the whole load.
pub fn build(
    train_records: &[ImageRecord],
    test_records: &[ImageRecord],
    cfg: &Config,
    split_ratio: u32,
) -> Result<Dataset, TrainError> {
    log::info!("Storage path: {}", cfg.storage_path.display());
    preprocess::bilinear_example();

    let train = load_split(train_records, cfg, split_ratio, "training");
    let test = load_split(test_records, cfg, split_ratio, "test");

    if train.is_empty() || test.is_empty() {
        return Err(TrainError::EmptyDataset(split_ratio));
    }

    log::info!(
        "Loaded {} train and {} test images for split ratio {split_ratio}",
        train.len(),
        test.len()
    );
    log::info!("Upsampling scale factor: {:.2}x", f64::from(IMG_SIZE) / 32.0);
    log::info!("Interpolation method: bilinear");

    Ok(Dataset { train, test })
}

fn load_split(records: &[ImageRecord], cfg: &Config, split_ratio: u32, name: &str) -> Split {
    log::info!("Processing {} {name} images...", records.len());
    let mut split = Split::new();
    for (i, record) in records.iter().enumerate() {
        let full_path = cfg.storage_path.join(&record.path);
        if !full_path.exists() {
            continue;
        }
        let img = match preprocess::load_and_resize(&full_path) {
            Ok(img) => img,
            Err(e) => {
                log::error!("Error processing image {}: {e}", full_path.display());
                continue;
            }
        };
        preprocess::save_preprocessed(
            &img,
            &cfg.preprocessed_dir,
            split_ratio,
            record.label,
            &record.filename,
        );
        split.images.push(img);
        split.labels.push(record.label.encode());
        split.filenames.push(record.filename.clone());

        if (i + 1) % 10 == 0 {
            log::info!("Processed {}/{} {name} images", i + 1, records.len());
        }
    }
    split
}

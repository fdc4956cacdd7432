use shared::{Prediction, TrainingReport};
use tch::Device;

use crate::config::{Config, DECISION_THRESHOLD};
use crate::dataset::{self, Dataset};
use crate::db::{ImageRecord, ImageRepository, Label};
use crate::error::TrainError;
use crate::metrics;
use crate::model::{self, Classifier, TorchScriptExtractor};
use crate::preprocess;

/// The whole run, in order: cleanup, load, build, fit, predict, metrics,
/// persist, report. The caller turns any `Err` into the `{"error": …}`
/// payload.
pub async fn train_model(split_ratio: u32, cfg: &Config) -> Result<TrainingReport, TrainError> {
    model::delete_old_artifacts(&cfg.model_dir, split_ratio);

    log::info!("Loading data for split ratio: {split_ratio}...");
    let dataset = load_data(split_ratio, cfg).await?;

    log::info!("Building model...");
    let device = Device::cuda_if_available();
    let extractor = TorchScriptExtractor::load(&cfg.backbone_path, device)?;
    let mut classifier = Classifier::new(extractor, device);

    log::info!("Training model...");
    let (x_train, y_train) = dataset.train.to_tensors();
    let (x_test, y_test) = dataset.test.to_tensors();
    classifier.fit((&x_train, &y_train), (&x_test, &y_test))?;

    log::info!("Making predictions...");
    let probabilities = classifier.predict(&x_test)?;
    let predicted: Vec<i64> = probabilities
        .iter()
        .map(|&p| i64::from(p > DECISION_THRESHOLD))
        .collect();

    let actual = &dataset.test.labels;
    let report = TrainingReport {
        accuracy: metrics::accuracy(actual, &predicted),
        precision: metrics::precision(actual, &predicted),
        recall: metrics::recall(actual, &predicted),
        f1_score: metrics::f1_score(actual, &predicted),
        auc_roc: metrics::roc_auc(actual, &probabilities),
        confusion_matrix: metrics::confusion_matrix(actual, &predicted)
            .iter()
            .map(|row| row.to_vec())
            .collect(),
        split_ratio,
        predictions: per_image_predictions(&dataset, &predicted, &probabilities),
        preprocessing_info: preprocess::preprocessing_info(),
    };

    let artifact = model::artifact_path(&cfg.model_dir, split_ratio);
    classifier.save(&artifact)?;
    log::info!("Model saved to {}", artifact.display());

    log::info!("Training completed successfully!");
    Ok(report)
}

/// Query both splits, then assemble the in-memory dataset. The connection is
/// closed on every exit path before any error propagates.
async fn load_data(split_ratio: u32, cfg: &Config) -> Result<Dataset, TrainError> {
    let repo = ImageRepository::connect(&cfg.database_url)
        .await
        .map_err(|source| TrainError::Database {
            split_ratio,
            source,
        })?;
    log::info!("Database connection established");

    let fetched = fetch_records(&repo, split_ratio).await;
    repo.close().await;
    let (train_records, test_records) = fetched.map_err(|source| TrainError::Database {
        split_ratio,
        source,
    })?;

    dataset::build(&train_records, &test_records, cfg, split_ratio)
}

async fn fetch_records(
    repo: &ImageRepository,
    split_ratio: u32,
) -> Result<(Vec<ImageRecord>, Vec<ImageRecord>), sqlx::Error> {
    let train = repo.fetch_split("train", split_ratio).await?;
    let test = repo.fetch_split("test", split_ratio).await?;
    Ok((train, test))
}

fn per_image_predictions(
    dataset: &Dataset,
    predicted: &[i64],
    probabilities: &[f64],
) -> Vec<Prediction> {
    dataset
        .test
        .filenames
        .iter()
        .zip(predicted)
        .zip(probabilities)
        .map(|((filename, &label), &confidence)| Prediction {
            filename: filename.clone(),
            prediction: if label == 0 { Label::Real } else { Label::Fake }
                .as_str()
                .to_string(),
            confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Split;
    use ndarray::Array3;

    fn split_with(filenames: &[&str]) -> Split {
        Split {
            images: filenames
                .iter()
                .map(|_| Array3::<f32>::zeros((3, 4, 4)))
                .collect(),
            labels: vec![0; filenames.len()],
            filenames: filenames.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    #[test]
    fn predictions_pair_filenames_with_verdicts() {
        let dataset = Dataset {
            train: split_with(&["t.png"]),
            test: split_with(&["a.png", "b.png"]),
        };
        let predictions = per_image_predictions(&dataset, &[0, 1], &[0.2, 0.9]);

        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[0].filename, "a.png");
        assert_eq!(predictions[0].prediction, "real");
        assert!((predictions[0].confidence - 0.2).abs() < 1e-12);
        assert_eq!(predictions[1].prediction, "fake");
        assert!((predictions[1].confidence - 0.9).abs() < 1e-12);
    }
}

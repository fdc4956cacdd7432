use serde::{Deserialize, Serialize};

/// Final structured output of a training run, printed as one JSON object
/// on stdout.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TrainingReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub auc_roc: f64,
    pub confusion_matrix: Vec<Vec<i64>>,
    pub split_ratio: u32,
    pub predictions: Vec<Prediction>,
    pub preprocessing_info: PreprocessingInfo,
}

/// Per-image verdict on the held-out set.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Prediction {
    pub filename: String,
    /// "real" or "fake".
    pub prediction: String,
    /// Raw sigmoid probability of the "fake" class.
    pub confidence: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PreprocessingInfo {
    pub method: String,
    pub input_size: String,
    pub output_size: String,
    pub scale_factor: f64,
    pub interpolation_type: String,
}

/// Error-shaped result; its presence distinguishes the failure exit.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorReport {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_with_expected_keys() {
        let report = TrainingReport {
            accuracy: 0.75,
            precision: 1.0,
            recall: 0.5,
            f1_score: 2.0 / 3.0,
            auc_roc: 0.875,
            confusion_matrix: vec![vec![2, 0], vec![1, 1]],
            split_ratio: 80,
            predictions: vec![Prediction {
                filename: "a.png".into(),
                prediction: "fake".into(),
                confidence: 0.91,
            }],
            preprocessing_info: PreprocessingInfo {
                method: "bilinear_interpolation".into(),
                input_size: "32x32 (AI generated)".into(),
                output_size: "299x299".into(),
                scale_factor: 299.0 / 32.0,
                interpolation_type: "bilinear".into(),
            },
        };

        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&report).unwrap()).unwrap();
        for key in [
            "accuracy",
            "precision",
            "recall",
            "f1_score",
            "auc_roc",
            "confusion_matrix",
            "split_ratio",
            "predictions",
            "preprocessing_info",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["predictions"][0]["prediction"], "fake");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn error_report_has_single_error_field() {
        let json = serde_json::to_string(&ErrorReport {
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"boom"}"#);
    }
}

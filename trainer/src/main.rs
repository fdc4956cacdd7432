mod config;
mod dataset;
mod db;
mod error;
mod metrics;
mod model;
mod pipeline;
mod preprocess;

use config::Config;
use shared::ErrorReport;

const DEFAULT_SPLIT_RATIO: u32 = 80;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let split_ratio = match std::env::args().nth(1) {
        None => DEFAULT_SPLIT_RATIO,
        Some(arg) => match arg.parse::<u32>() {
            Ok(ratio) => ratio,
            Err(e) => {
                log::error!("Invalid split ratio {arg:?}: {e}");
                emit_error(format!("Invalid split ratio {arg:?}: {e}"));
                return;
            }
        },
    };

    log::info!("Starting training with split: {split_ratio}%");
    let cfg = Config::from_env();

    match pipeline::train_model(split_ratio, &cfg).await {
        Ok(report) => match serde_json::to_string(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                log::error!("Failed to serialize report: {e}");
                emit_error(format!("Failed to serialize report: {e}"));
            }
        },
        Err(e) => {
            log::error!("Error in train_model: {e}");
            emit_error(e.to_string());
        }
    }
}

/// Every exit prints exactly one well-formed JSON object on stdout;
/// diagnostics stay on stderr.
fn emit_error(error: String) {
    let report = ErrorReport { error };
    match serde_json::to_string(&report) {
        Ok(json) => println!("{json}"),
        Err(_) => println!(r#"{{"error":"unreportable failure"}}"#),
    }
}

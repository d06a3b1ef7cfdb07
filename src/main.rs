// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use sila_sign_node::{
    api::start_server,
    config::NodeConfig,
    vision::ClassifierManager,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    println!("🚀 Starting Sila sign recognition node...\n");
    println!("📦 BUILD VERSION: {}", sila_sign_node::version::VERSION);
    println!("📅 Build Date: {}", sila_sign_node::version::BUILD_DATE);
    println!();

    tracing::info!("{}", sila_sign_node::version::get_version_string());

    let config = NodeConfig::load();
    config.validate().context("Invalid configuration")?;

    let stabilization = config.stabilization();
    tracing::info!(
        "Stabilization: smoothing window {}, stability window {}, run length {}, floor {}, hysteresis {}",
        stabilization.smoothing_window,
        stabilization.stability_window,
        stabilization.stability_threshold,
        stabilization.min_confidence,
        stabilization.smoothing_hysteresis
    );

    println!("🧠 Loading sign classifier...");
    let classifier_manager = ClassifierManager::new(config.classifier_model()).await;
    if classifier_manager.is_loaded() {
        println!("✅ Classifier ready ({})", classifier_manager.model_version());
    } else {
        println!("⚠️  Classifier unavailable, serving placeholder results");
    }

    start_server(config, classifier_manager).await
}

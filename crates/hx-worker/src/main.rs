//! Video-indexing and face-enrollment worker binary.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hx_blob::R2Client;
use hx_inference::InferenceClient;
use hx_models::FeatureFlags;
use hx_queue::JobQueue;
use hx_store::StoreConfig;
use hx_worker::executor::{FaceEnrollmentExecutor, PipelineExecutor};
use hx_worker::stages::PipelineContext;
use hx_worker::WorkerConfig;

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("hx_worker=info".parse().unwrap()))
        .init();

    info!("starting hx-worker");

    let config = WorkerConfig::from_env();
    info!(?config, "worker config loaded");

    let _metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder");

    let store_config = match StoreConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to load store config");
            std::process::exit(1);
        }
    };
    let store = match hx_store::connect(&store_config).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "failed to connect to store");
            std::process::exit(1);
        }
    };

    let blob = match R2Client::from_env().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to create blob client");
            std::process::exit(1);
        }
    };

    let inference = match InferenceClient::from_env().await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to create inference client");
            std::process::exit(1);
        }
    };
    if let Err(e) = inference.warmup().await {
        error!(error = %e, "inference warmup failed, continuing anyway");
    }

    let queue = match JobQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!(error = %e, "failed to create job queue");
            std::process::exit(1);
        }
    };
    if let Err(e) = queue.init().await {
        error!(error = %e, "failed to initialize task bus consumer groups");
        std::process::exit(1);
    }

    let face_queue = match JobQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!(error = %e, "failed to create face enrollment job queue");
            std::process::exit(1);
        }
    };

    let flags = FeatureFlags::from_env();

    let video_ctx = PipelineContext {
        store: store.clone(),
        blob: blob.clone(),
        inference: inference.clone(),
        config: config.clone(),
        flags,
    };
    let face_ctx = PipelineContext {
        store,
        blob,
        inference,
        config: config.clone(),
        flags,
    };

    let pipeline_executor = PipelineExecutor::new(config.clone(), queue, video_ctx);
    let face_executor = FaceEnrollmentExecutor::new(config, face_queue, face_ctx);

    let shutdown_signal = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal");
    });

    let pipeline_run = pipeline_executor.run();
    let face_run = face_executor.run();

    tokio::select! {
        result = pipeline_run => {
            if let Err(e) = result {
                error!(error = %e, "video pipeline executor exited with error");
            }
        }
        result = face_run => {
            if let Err(e) = result {
                error!(error = %e, "face enrollment executor exited with error");
            }
        }
        _ = shutdown_signal => {
            pipeline_executor.shutdown();
            face_executor.shutdown();
        }
    }

    info!("hx-worker shutdown complete");
}

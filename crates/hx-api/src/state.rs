//! Shared application state (spec §2 C8).

use std::sync::Arc;

use sqlx::PgPool;

use hx_blob::R2Client;
use hx_inference::InferenceClient;
use hx_models::FeatureFlags;
use hx_queue::JobQueue;
use hx_store::StoreConfig;

use crate::auth::JwksCache;
use crate::config::ApiConfig;

/// Everything a handler needs, cloned cheaply into every request via axum's
/// `State` extractor. Clients are `Arc`-wrapped the way `hx-worker`'s
/// `PipelineContext` shares them across scene fan-out tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub store: PgPool,
    pub blob: Arc<R2Client>,
    pub inference: Arc<InferenceClient>,
    pub queue: Arc<JobQueue>,
    pub jwks: Arc<JwksCache>,
    pub flags: FeatureFlags,
}

impl AppState {
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = hx_store::connect(&StoreConfig::from_env()?).await?;
        let blob = R2Client::from_env().await?;
        let inference = InferenceClient::from_env().await?;
        let queue = JobQueue::from_env()?;
        queue.init().await?;
        let jwks = JwksCache::from_env().await?;
        let flags = FeatureFlags::from_env();

        Ok(Self {
            config: Arc::new(config),
            store,
            blob: Arc::new(blob),
            inference: Arc::new(inference),
            queue: Arc::new(queue),
            jwks: Arc::new(jwks),
            flags,
        })
    }
}

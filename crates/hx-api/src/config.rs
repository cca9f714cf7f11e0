//! API configuration (spec §6 "Configuration").

use std::time::Duration;

/// API server configuration. `StoreConfig`/`R2Config`/`InferenceConfig`/
/// `QueueConfig` each load separately via their own `from_env()`, following
/// `hx-worker`'s split; this struct only carries the HTTP surface's own
/// knobs plus the upload-validation and retrieval-default constants spec §6
/// groups under "Configuration".
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    pub rate_limit_burst: u32,
    pub request_timeout: Duration,
    pub max_body_size: usize,
    pub environment: String,

    /// Upload init rejects videos over this size (spec §8 scenario 3).
    pub max_video_bytes: i64,
    /// Upload init rejects MIME types outside this list.
    pub allowed_mime_types: Vec<String>,
    /// TTL of the presigned PUT URL returned from upload/init.
    pub upload_url_ttl: Duration,
    /// TTL of presigned GET URLs returned for thumbnails/sidecars.
    pub download_url_ttl: Duration,

    /// Mode S defaults (spec §4.3 Mode S), overridable per request.
    pub semantic_text_weight: f32,
    pub semantic_vision_weight: f32,
    pub semantic_person_boost: f32,
    /// Mode H defaults (spec §4.3 Mode H).
    pub hybrid_rrf_k: f32,
    pub hybrid_sparse_weight: f32,
    pub hybrid_dense_weight: f32,
    pub hybrid_topk: i64,
    /// ANN tuning (spec §4.4/§4.3 point 4).
    pub ann_ef_search: i32,
    pub ann_topk_candidates: i64,
    pub ann_final_limit: i64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            rate_limit_burst: 20,
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
            environment: "development".to_string(),

            max_video_bytes: 1024 * 1024 * 1024,
            allowed_mime_types: vec![
                "video/mp4".to_string(),
                "video/quicktime".to_string(),
                "video/webm".to_string(),
                "video/x-matroska".to_string(),
            ],
            upload_url_ttl: Duration::from_secs(900),
            download_url_ttl: Duration::from_secs(3600),

            semantic_text_weight: 0.5,
            semantic_vision_weight: 0.35,
            semantic_person_boost: 0.3,
            hybrid_rrf_k: 60.0,
            hybrid_sparse_weight: 0.3,
            hybrid_dense_weight: 0.7,
            hybrid_topk: 100,
            ann_ef_search: 100,
            ann_topk_candidates: 200,
            ann_final_limit: 20,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(d.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(d.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.rate_limit_rps),
            rate_limit_burst: std::env::var("RATE_LIMIT_BURST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.rate_limit_burst),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(d.request_timeout.as_secs()),
            ),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(d.environment),

            max_video_bytes: std::env::var("MAX_VIDEO_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.max_video_bytes),
            allowed_mime_types: std::env::var("ALLOWED_VIDEO_MIME_TYPES")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(d.allowed_mime_types),
            upload_url_ttl: Duration::from_secs(
                std::env::var("UPLOAD_URL_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(d.upload_url_ttl.as_secs()),
            ),
            download_url_ttl: Duration::from_secs(
                std::env::var("DOWNLOAD_URL_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(d.download_url_ttl.as_secs()),
            ),

            semantic_text_weight: std::env::var("SEARCH_SEMANTIC_TEXT_WEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.semantic_text_weight),
            semantic_vision_weight: std::env::var("SEARCH_SEMANTIC_VISION_WEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.semantic_vision_weight),
            semantic_person_boost: std::env::var("SEARCH_SEMANTIC_PERSON_BOOST")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.semantic_person_boost),
            hybrid_rrf_k: std::env::var("SEARCH_HYBRID_RRF_K")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.hybrid_rrf_k),
            hybrid_sparse_weight: std::env::var("SEARCH_HYBRID_SPARSE_WEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.hybrid_sparse_weight),
            hybrid_dense_weight: std::env::var("SEARCH_HYBRID_DENSE_WEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.hybrid_dense_weight),
            hybrid_topk: std::env::var("SEARCH_HYBRID_TOPK")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.hybrid_topk),
            ann_ef_search: std::env::var("SEARCH_ANN_EF_SEARCH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.ann_ef_search),
            ann_topk_candidates: std::env::var("SEARCH_ANN_TOPK_CANDIDATES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.ann_topk_candidates),
            ann_final_limit: std::env::var("SEARCH_ANN_FINAL_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(d.ann_final_limit),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_weights() {
        let c = ApiConfig::default();
        assert!((c.semantic_text_weight - 0.5).abs() < 1e-6);
        assert!((c.hybrid_rrf_k - 60.0).abs() < 1e-6);
    }
}

//! Inference client (spec §4.5 / §6 endpoint contracts).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, InferenceResult};
use crate::retry::{with_retry, RetryConfig};

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub query_cache_capacity: usize,
}

impl InferenceConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("INFERENCE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8001".to_string()),
            timeout: Duration::from_secs(
                std::env::var("INFERENCE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            retry: RetryConfig::from_env(),
            query_cache_capacity: std::env::var("INFERENCE_QUERY_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(128),
        }
    }
}

#[derive(Debug, Serialize)]
struct TranscribeRequest {
    audio_base64: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedTextRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct EmbedVisionRequest {
    image_base64: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaceDetection {
    pub bbox: [f32; 4],
    pub confidence: f32,
}

#[derive(Debug, Deserialize)]
struct FaceDetectResponse {
    faces: Vec<FaceDetection>,
}

#[derive(Debug, Serialize)]
struct FaceEmbedRequest {
    image_base64: String,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    status: String,
}

/// HTTP client for the inference microservice. Stateless aside from the
/// connection pool `reqwest::Client` keeps internally and the retrieval
/// query-embedding cache (spec: "pipeline embedding calls never read or
/// write this cache").
#[derive(Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
    /// Bounded LRU of query text -> embedding, read/written only by
    /// `embed_text_for_query`. Pipeline-side `embed_text` never touches it,
    /// so a scene's stored embedding always reflects the model's current
    /// output (spec §4.5 "freshness guarantee").
    query_cache: std::sync::Arc<std::sync::Mutex<lru::LruCache<String, Vec<f32>>>>,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> InferenceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(20)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        let capacity = std::num::NonZeroUsize::new(config.query_cache_capacity.max(1)).unwrap();
        Ok(Self {
            http,
            base_url: config.base_url,
            retry: config.retry,
            query_cache: std::sync::Arc::new(std::sync::Mutex::new(lru::LruCache::new(capacity))),
        })
    }

    pub async fn from_env() -> InferenceResult<Self> {
        Self::new(InferenceConfig::from_env())
    }

    /// One-time warmup call issued at worker/API startup so the first real
    /// request doesn't pay model cold-start latency.
    pub async fn warmup(&self) -> InferenceResult<()> {
        self.health_check().await.map(|_| ())
    }

    pub async fn health_check(&self) -> InferenceResult<bool> {
        let resp: HealthResponse = self.get_json("/health").await?;
        Ok(resp.status == "ok" || resp.status == "healthy")
    }

    pub async fn transcribe_audio(
        &self,
        audio_bytes: &[u8],
        language: Option<&str>,
    ) -> InferenceResult<TranscribeResponse> {
        let payload = TranscribeRequest {
            audio_base64: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, audio_bytes),
            language: language.map(str::to_string),
        };
        with_retry(&self.retry, "transcribe_audio", || {
            self.post_json("/asr/transcribe", &payload)
        })
        .await
    }

    pub async fn embed_text(&self, text: &str) -> InferenceResult<Vec<f32>> {
        let payload = EmbedTextRequest { text };
        let resp: EmbedResponse = with_retry(&self.retry, "embed_text", || {
            self.post_json("/embed/text", &payload)
        })
        .await?;
        Ok(resp.embedding)
    }

    /// Query-time text embedding, cached by exact query string. Used only
    /// by `hx-retrieval` Modes S/H; pipeline embeddings always call
    /// `embed_text` directly and bypass this cache.
    pub async fn embed_text_for_query(&self, text: &str) -> InferenceResult<Vec<f32>> {
        if let Some(hit) = self
            .query_cache
            .lock()
            .expect("query cache mutex poisoned")
            .get(text)
        {
            return Ok(hit.clone());
        }
        let embedding = self.embed_text(text).await?;
        self.query_cache
            .lock()
            .expect("query cache mutex poisoned")
            .put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    pub async fn embed_vision(&self, png_bytes: &[u8]) -> InferenceResult<Vec<f32>> {
        let payload = EmbedVisionRequest {
            image_base64: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, png_bytes),
        };
        let resp: EmbedResponse = with_retry(&self.retry, "embed_vision", || {
            self.post_json("/embed/vision", &payload)
        })
        .await?;
        Ok(resp.embedding)
    }

    pub async fn detect_faces(&self, jpeg_bytes: &[u8]) -> InferenceResult<Vec<FaceDetection>> {
        let payload = FaceDetectRequest {
            image_base64: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, jpeg_bytes),
        };
        let resp: FaceDetectResponse = with_retry(&self.retry, "detect_faces", || {
            self.post_json("/face/detect", &payload)
        })
        .await?;
        Ok(resp.faces)
    }

    /// Embed a single cropped face (spec §4.2). The model behind this
    /// endpoint is explicitly not a trained recognizer in the reference
    /// deployment; see `hx_models::FaceProfile` docs.
    pub async fn embed_face(&self, jpeg_bytes: &[u8]) -> InferenceResult<Vec<f32>> {
        let payload = FaceEmbedRequest {
            image_base64: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, jpeg_bytes),
        };
        let resp: EmbedResponse = with_retry(&self.retry, "embed_face", || {
            self.post_json("/face/embed", &payload)
        })
        .await?;
        Ok(resp.embedding)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> InferenceResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http.get(&url).send().await?;
        Self::decode(resp).await
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> InferenceResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http.post(&url).json(body).send().await?;
        Self::decode(resp).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> InferenceResult<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| InferenceError::Decode(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct FaceDetectRequest {
    image_base64: String,
}

//! Shared feature-flag vocabulary (spec §6 "Configuration"). Each binary's
//! own `XxxConfig::from_env()` reads these through [`FeatureFlags::from_env`]
//! rather than re-parsing the env vars itself, following the
//! `Settings`/feature-flag block in the original service's config module.

#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureFlags {
    pub semantic_search: bool,
    pub hybrid_rrf: bool,
    pub ann_tuning: bool,
    pub canonical_trim: bool,
    pub eval: bool,
    pub face_enrollment: bool,
    pub face_detection: bool,
}

fn flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl FeatureFlags {
    pub fn from_env() -> Self {
        Self {
            semantic_search: flag("FEATURE_SEMANTIC_SEARCH", true),
            hybrid_rrf: flag("FEATURE_HYBRID_RRF", true),
            ann_tuning: flag("FEATURE_ANN_TUNING", false),
            canonical_trim: flag("FEATURE_CANONICAL_TRIM", true),
            eval: flag("FEATURE_EVAL", false),
            face_enrollment: flag("FEATURE_FACE_ENROLLMENT", false),
            face_detection: flag("FEATURE_FACE_DETECTION", false),
        }
    }
}

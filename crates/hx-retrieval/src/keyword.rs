//! Mode K — keyword/metadata search (spec §4.3). Pure SQL plus an
//! in-process scoring pass over video metadata and transcript text; no
//! embedding calls.

use sqlx::PgPool;
use uuid::Uuid;

use crate::common::{paginate, Page, Pagination, RetrievalFilters, ScoredScene};
use crate::error::{RetrievalError, RetrievalResult};
use hx_store::metadata;
use hx_store::scenes::list_candidates_for_owner;

/// Per-scene metadata_score tiers (spec §4.3 Mode K). The first matching
/// tier wins; ties are not possible since the tiers are checked in
/// descending strength order.
fn metadata_score(query_lower: &str, meta: Option<&hx_models::VideoMetadata>, storage_key: &str) -> f32 {
    let storage_key_lower = storage_key.to_lowercase();
    if let Some(meta) = meta {
        if let Some(title) = &meta.title {
            let title_lower = title.to_lowercase();
            if title_lower == query_lower {
                return 1.0;
            }
            if title_lower.contains(query_lower) {
                return 0.8;
            }
        }
        if storage_key_lower.contains(query_lower) {
            return 0.7;
        }
        if let Some(description) = &meta.description {
            if description.to_lowercase().contains(query_lower) {
                return 0.6;
            }
        }
        if meta
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(query_lower))
        {
            return 0.5;
        }
        return 0.0;
    }
    if storage_key_lower.contains(query_lower) {
        return 0.7;
    }
    0.0
}

fn transcript_score(query_lower: &str, transcript: Option<&str>) -> f32 {
    match transcript {
        Some(t) if t.to_lowercase().contains(query_lower) => 1.0,
        _ => 0.0,
    }
}

/// Run a Mode K query. `storage_keys` maps `video_id -> Video.storage_key`;
/// the caller (usually `hx-api`'s handler) fetches it alongside the
/// candidate set since `list_candidates_for_owner` doesn't carry it.
pub async fn query(
    pool: &PgPool,
    owner_id: &Uuid,
    query_text: &str,
    storage_keys: &std::collections::HashMap<Uuid, String>,
    filters: &RetrievalFilters,
    pagination: &Pagination,
) -> RetrievalResult<Page<ScoredScene>> {
    let trimmed = query_text.trim();
    if trimmed.is_empty() {
        return Err(RetrievalError::Invalid("query must not be empty".into()));
    }
    let query_lower = trimmed.to_lowercase();

    let candidates = list_candidates_for_owner(
        pool,
        owner_id,
        filters.person_id,
        filters.min_duration_s,
        filters.max_duration_s,
    )
    .await?;
    let metadata_map = metadata::map_for_owner(pool, owner_id).await?;

    let mut scored: Vec<ScoredScene> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let video_id = candidate.scene.video_id.as_uuid();
            let meta = metadata_map.get(&video_id);
            let storage_key = storage_keys.get(&video_id).map(String::as_str).unwrap_or("");
            let m = metadata_score(&query_lower, meta, storage_key);
            let t = transcript_score(&query_lower, candidate.scene.transcript.as_deref());
            let score = 0.4 * m + 0.2 * t;
            if score <= 0.0 {
                return None;
            }
            Some(ScoredScene {
                scene: candidate.scene,
                score,
                video_created_at: candidate.video_created_at,
                video_duration_s: candidate.video_duration_s,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.video_created_at.cmp(&a.video_created_at))
    });

    Ok(Page::new(paginate(scored, pagination), pagination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hx_models::VideoMetadata;

    fn meta(title: &str, description: &str, tags: &[&str]) -> VideoMetadata {
        VideoMetadata {
            video_id: hx_models::VideoId::new(),
            title: Some(title.into()),
            description: Some(description.into()),
            tags: tags.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn exact_title_match_outranks_substring() {
        let m = meta("hello", "", &[]);
        assert_eq!(metadata_score("hello", Some(&m), "x"), 1.0);
        assert_eq!(metadata_score("hell", Some(&m), "x"), 0.8);
    }

    #[test]
    fn storage_key_substring_scores_point_seven() {
        let m = meta("unrelated", "", &[]);
        assert_eq!(metadata_score("clip", Some(&m), "uploads/clip-42.mp4"), 0.7);
    }

    #[test]
    fn description_then_tag_tiers() {
        let with_desc = meta("x", "a sunset over water", &[]);
        assert_eq!(metadata_score("sunset", Some(&with_desc), "k"), 0.6);

        let with_tag = meta("x", "", &["beach", "vacation"]);
        assert_eq!(metadata_score("beach", Some(&with_tag), "k"), 0.5);
    }

    #[test]
    fn no_match_scores_zero() {
        let m = meta("x", "y", &["z"]);
        assert_eq!(metadata_score("nope", Some(&m), "k"), 0.0);
    }

    #[test]
    fn transcript_substring_is_case_insensitive() {
        assert_eq!(transcript_score("hello", Some("Well, HELLO there")), 1.0);
        assert_eq!(transcript_score("hello", Some("goodbye")), 0.0);
        assert_eq!(transcript_score("hello", None), 0.0);
    }
}

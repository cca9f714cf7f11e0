//! Canonical text normalization (spec §4.3, optional). Pipeline-time
//! composition of {transcript, top-N vision tags, deduplicated sorted
//! person names} into the text `hx-worker`'s `per_scene_embed` stage feeds
//! to the text embedding endpoint, gated by `FeatureFlags::canonical_trim`.
//! Lives here rather than in `hx-worker` since it shares vocabulary with
//! the query-time normalization this crate otherwise does.

use serde_json::Value;

const SENTENCE_ENDERS: [char; 3] = ['.', '!', '?'];

/// One vision tag with its detection score, as stored in `scenes.vision_tags`.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionTag {
    pub tag: String,
    pub score: f32,
}

/// Parse the `{tag: score}` object `scenes.vision_tags` carries (see
/// `hx_models::sidecar`'s fixture) into a flat list.
pub fn tags_from_json(value: &Value) -> Vec<VisionTag> {
    let Some(obj) = value.as_object() else {
        return Vec::new();
    };
    obj.iter()
        .filter_map(|(tag, score)| {
            score.as_f64().map(|s| VisionTag {
                tag: tag.clone(),
                score: s as f32,
            })
        })
        .collect()
}

/// Top `n` tags by score descending, ties broken alphabetically so the
/// result is deterministic across repeated calls with equal scores.
fn top_tags(mut tags: Vec<VisionTag>, n: usize) -> Vec<String> {
    tags.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.tag.cmp(&b.tag))
    });
    tags.into_iter().take(n).map(|t| t.tag).collect()
}

fn dedup_sorted_names(names: &[String]) -> Vec<String> {
    let mut names: Vec<String> = names.to_vec();
    names.sort();
    names.dedup();
    names
}

/// Truncate to `token_budget` whitespace-delimited tokens, preferring to
/// end at the last sentence boundary within the truncated span so the
/// result doesn't end mid-clause when avoidable.
fn trim_to_token_budget(text: &str, token_budget: usize) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() <= token_budget {
        return text.to_string();
    }
    let truncated = tokens[..token_budget].join(" ");
    if let Some(cut) = truncated.rfind(SENTENCE_ENDERS) {
        let (head, _) = truncated.split_at(cut + 1);
        if !head.trim().is_empty() {
            return head.trim().to_string();
        }
    }
    truncated
}

/// Compose the canonical text for one scene's embedding input.
pub fn build_canonical_text(
    transcript: Option<&str>,
    vision_tags: &[VisionTag],
    person_names: &[String],
    top_n_tags: usize,
    token_budget: usize,
) -> String {
    let mut sections = Vec::new();

    if let Some(t) = transcript {
        let t = t.trim();
        if !t.is_empty() {
            sections.push(t.to_string());
        }
    }

    let tags = top_tags(vision_tags.to_vec(), top_n_tags);
    if !tags.is_empty() {
        sections.push(tags.join(", "));
    }

    let names = dedup_sorted_names(person_names);
    if !names.is_empty() {
        sections.push(names.join(", "));
    }

    let composed = sections.join(" | ");
    trim_to_token_budget(&composed, token_budget)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_tags_breaks_ties_alphabetically() {
        let tags = vec![
            VisionTag { tag: "zebra".into(), score: 0.9 },
            VisionTag { tag: "apple".into(), score: 0.9 },
            VisionTag { tag: "mango".into(), score: 0.5 },
        ];
        assert_eq!(top_tags(tags, 2), vec!["apple", "zebra"]);
    }

    #[test]
    fn names_are_deduplicated_and_sorted() {
        let names = vec!["Bob".to_string(), "Alice".to_string(), "Bob".to_string()];
        assert_eq!(dedup_sorted_names(&names), vec!["Alice", "Bob"]);
    }

    #[test]
    fn composition_joins_present_sections_only() {
        let text = build_canonical_text(Some("hello world"), &[], &[], 5, 100);
        assert_eq!(text, "hello world");

        let text = build_canonical_text(None, &[VisionTag { tag: "beach".into(), score: 1.0 }], &[], 5, 100);
        assert_eq!(text, "beach");
    }

    #[test]
    fn trims_to_token_budget_at_sentence_boundary_when_possible() {
        let text = "First sentence ends here. Second sentence continues on and on.";
        let trimmed = trim_to_token_budget(text, 5);
        assert_eq!(trimmed, "First sentence ends here.");
    }

    #[test]
    fn trims_hard_when_no_sentence_boundary_available() {
        let text = "one two three four five six seven";
        let trimmed = trim_to_token_budget(text, 3);
        assert_eq!(trimmed, "one two three");
    }

    #[test]
    fn tags_from_json_parses_tag_score_object() {
        let v = serde_json::json!({"outdoor": 0.8, "beach": 0.4});
        let mut tags = tags_from_json(&v);
        tags.sort_by(|a, b| a.tag.cmp(&b.tag));
        assert_eq!(tags, vec![
            VisionTag { tag: "beach".into(), score: 0.4 },
            VisionTag { tag: "outdoor".into(), score: 0.8 },
        ]);
    }
}

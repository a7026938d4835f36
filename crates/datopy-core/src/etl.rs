//! Extract/transform helpers for retrieved metadata

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{Error, Result};

static WIKI_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(.*?)\]\]").expect("wiki link pattern is valid"));

/// Navigation links at the start of a listing page
pub const LISTING_HEAD_LINKS: usize = 4;
/// Navigation links at the end of a listing page
pub const LISTING_TAIL_LINKS: usize = 3;

/// Remove every occurrence of each literal pattern in a single pass.
///
/// ```rust
/// use datopy_core::etl::omit_string_patterns;
///
/// let messy = r"[[A \\ messy * string * with undesirable /patterns]]";
/// let clean = omit_string_patterns(messy, &["[[", "]]", "* ", r"\\ ", "/", "messy ", "un"]);
/// assert_eq!(clean, "A string with desirable patterns");
/// ```
pub fn omit_string_patterns<S: AsRef<str>>(input: &str, patterns: &[S]) -> String {
    let alternation = patterns
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    if alternation.is_empty() {
        return input.to_string();
    }
    match Regex::new(&alternation) {
        Ok(re) => re.replace_all(input, "").into_owned(),
        Err(e) => {
            // Escaped literals always compile; only the size limit can trip this
            tracing::warn!(error = %e, "pattern alternation rejected; input left unchanged");
            input.to_string()
        }
    }
}

/// Targets of `[[target|label]]` wiki links, in order
pub fn extract_wiki_links(wikitext: &str) -> Vec<String> {
    WIKI_LINK
        .captures_iter(wikitext)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            m.as_str()
                .split('|')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        })
        .collect()
}

/// Topic links from a listing page, with navigation links sliced off both ends
pub fn listing_topics(wikitext: &str, skip_head: usize, skip_tail: usize) -> Vec<String> {
    let links = extract_wiki_links(wikitext);
    let end = links.len().saturating_sub(skip_tail);
    if skip_head >= end {
        return Vec::new();
    }
    links[skip_head..end].to_vec()
}

/// Merge per-track audio features and stream counts into album details
pub fn merge_album_details(
    album: &Value,
    audio_features: Vec<Value>,
    streams: Vec<Value>,
) -> Result<Value> {
    let mut merged = album.as_object().cloned().ok_or_else(|| Error::TransformError {
        transform: "merge_album_details".to_string(),
        message: "album details are not a JSON object".to_string(),
    })?;
    merged.insert(
        "track_audio_features".to_string(),
        Value::Array(audio_features),
    );
    merged.insert("track_streams".to_string(), Value::Array(streams));
    Ok(Value::Object(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_omit_patterns_example() {
        let input = r"[[A \\ messy * string * with undesirable /patterns]]";
        let patterns = ["[[", "]]", "* ", r"\\ ", "/", "messy ", "un"];
        assert_eq!(
            omit_string_patterns(input, &patterns),
            "A string with desirable patterns"
        );
    }

    #[test]
    fn test_omit_patterns_empty_list() {
        let patterns: [&str; 0] = [];
        assert_eq!(omit_string_patterns("unchanged", &patterns), "unchanged");
        assert_eq!(omit_string_patterns("unchanged", &[""]), "unchanged");
    }

    #[test]
    fn test_omit_patterns_regex_metacharacters_are_literal() {
        let cleaned = omit_string_patterns("a.b*c{{nowrap|d}}", &[".", "*", "{{nowrap|", "}}"]);
        assert_eq!(cleaned, "abcd");
    }

    #[test]
    fn test_extract_wiki_links() {
        let text = "see [[Harper Lee|Lee]] and [[ Monroeville, Alabama ]] or [[x]]";
        assert_eq!(
            extract_wiki_links(text),
            vec!["Harper Lee", "Monroeville, Alabama", "x"]
        );
    }

    #[test]
    fn test_listing_topics_slices_navigation() {
        let text = (1..=10)
            .map(|i| format!("[[link {i}]]"))
            .collect::<Vec<_>>()
            .join(" ");
        let topics = listing_topics(&text, LISTING_HEAD_LINKS, LISTING_TAIL_LINKS);
        assert_eq!(topics, vec!["link 5", "link 6", "link 7"]);
        assert!(listing_topics("[[a]] [[b]]", LISTING_HEAD_LINKS, LISTING_TAIL_LINKS).is_empty());
    }

    #[test]
    fn test_merge_album_details() {
        let album = json!({"id": "6GjwtEZcfenmOf6l18N7T7", "total_tracks": 2});
        let merged = merge_album_details(
            &album,
            vec![json!({"loudness": -11.4}), json!({"loudness": -15.5})],
            vec![json!(61), json!(58)],
        )
        .unwrap();
        assert_eq!(merged["total_tracks"], 2);
        assert_eq!(merged["track_audio_features"][1]["loudness"], -15.5);
        assert_eq!(merged["track_streams"], json!([61, 58]));
        assert!(album.get("track_streams").is_none());
    }

    #[test]
    fn test_merge_album_details_rejects_non_object() {
        assert!(merge_album_details(&json!([]), vec![], vec![]).is_err());
    }
}

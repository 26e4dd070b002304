//! Backend response normalization.

use serde::{Deserialize, Serialize};

use crate::providers::{GenerateResponse, GroundingChunk};

/// A web source backing part of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub uri: String,
}

/// Turn grounding chunks into citations.
///
/// Chunks without a web source or with an empty uri are dropped. A missing or
/// blank title becomes `fallback_title`. Backend order is preserved.
pub fn extract_citations(chunks: &[GroundingChunk], fallback_title: &str) -> Vec<Citation> {
    chunks
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
            let title = web
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(fallback_title);
            Some(Citation {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .collect()
}

/// Answer text, or `placeholder` when the backend returned nothing usable.
pub fn answer_text(response: &GenerateResponse, placeholder: &str) -> String {
    match response.text.as_deref() {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => placeholder.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_chunks_without_uri_and_keeps_order() {
        let chunks = vec![
            GroundingChunk::web(Some("A"), Some("u1")),
            GroundingChunk::web(None, None),
            GroundingChunk::default(),
        ];
        assert_eq!(
            extract_citations(&chunks, "Official Source"),
            vec![Citation {
                title: "A".into(),
                uri: "u1".into()
            }]
        );
    }

    #[test]
    fn test_missing_title_uses_fallback() {
        let chunks = vec![
            GroundingChunk::web(None, Some("u1")),
            GroundingChunk::web(Some("  "), Some("u2")),
            GroundingChunk::web(Some("B"), Some("u3")),
        ];
        let titles: Vec<String> = extract_citations(&chunks, "Source")
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Source", "Source", "B"]);
    }

    #[test]
    fn test_blank_uri_is_dropped() {
        let chunks = vec![GroundingChunk::web(Some("A"), Some(""))];
        assert!(extract_citations(&chunks, "Source").is_empty());
    }

    #[test]
    fn test_answer_text_placeholder() {
        assert_eq!(answer_text(&GenerateResponse::default(), "none"), "none");
        assert_eq!(answer_text(&GenerateResponse::text(" \n"), "none"), "none");
        assert_eq!(answer_text(&GenerateResponse::text("hi"), "none"), "hi");
    }
}

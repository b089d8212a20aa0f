//! Context assembly for grounded answers.

use super::ContextChunk;

/// Format context chunks for inclusion in a prompt.
pub fn format_context_for_prompt(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "---\n[{}] {} (part {})\n{}\n---",
                i + 1,
                chunk.video_title,
                chunk.sequence_index + 1,
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format context chunks for display to the user.
pub fn format_context_for_display(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "{} (part {}, score: {:.2})\n  Link: {}",
                chunk.video_title,
                chunk.sequence_index + 1,
                chunk.score,
                chunk.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::VideoId;

    fn chunk(index: usize, content: &str) -> ContextChunk {
        let video_id = VideoId::parse("aaaaaaaaaaa").unwrap();
        ContextChunk {
            url: video_id.watch_url(),
            video_id,
            video_title: "Colors".to_string(),
            sequence_index: index,
            content: content.to_string(),
            score: 0.5,
        }
    }

    #[test]
    fn test_prompt_context_numbers_excerpts() {
        let text = format_context_for_prompt(&[chunk(0, "The sky is blue."), chunk(3, "Grass is green.")]);

        assert!(text.starts_with("---\n[1] Colors (part 1)\nThe sky is blue."));
        assert!(text.contains("[2] Colors (part 4)\nGrass is green."));
    }

    #[test]
    fn test_display_context_includes_links() {
        let text = format_context_for_display(&[chunk(1, "The sky is blue.")]);
        assert_eq!(
            text,
            "Colors (part 2, score: 0.50)\n  Link: https://www.youtube.com/watch?v=aaaaaaaaaaa"
        );
    }
}

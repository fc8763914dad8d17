//! Context assembly — turns ranked sections into a bounded prompt
//! context.

use super::ranker::ScoredSection;

/// Formats ranked sections into the grounding context handed to the
/// generative model. Section content is capped per entry so prompt size
/// stays bounded regardless of corpus content; labels are never cut.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    max_snippet_chars: usize,
}

impl ContextAssembler {
    pub fn new(max_snippet_chars: usize) -> Self {
        Self { max_snippet_chars }
    }

    pub fn max_snippet_chars(&self) -> usize {
        self.max_snippet_chars
    }

    /// Concatenates `[doc_id - section]` headers and truncated content in
    /// rank order. Empty input yields an empty string, not an error.
    pub fn assemble(&self, results: &[ScoredSection]) -> String {
        let blocks: Vec<String> = results
            .iter()
            .map(|r| {
                format!(
                    "[{} - {}]\n{}",
                    r.section.doc_id,
                    r.section.section,
                    self.truncate(&r.section.content)
                )
            })
            .collect();

        blocks.join("\n\n")
    }

    /// Char-based cap, safe on multi-byte content.
    pub fn truncate(&self, content: &str) -> String {
        if content.chars().count() <= self.max_snippet_chars {
            content.to_string()
        } else {
            content.chars().take(self.max_snippet_chars).collect()
        }
    }
}

//! System prompts for vision-LLM transcription of handwritten documents.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the default behaviour (e.g. the
//!    heading rules or the frontmatter format) requires editing exactly one
//!    place.
//! 2. **Testability** — unit tests can inspect prompts directly without
//!    calling a real model, so prompt regressions are caught cheaply.
//!
//! Note that the math rules below tell the model to use dollar delimiters
//! exclusively. Models disobey often enough that the post-processing engine
//! ([`crate::normalize_latex_delimiters`]) exists to enforce the same rules
//! deterministically after the fact.

/// Shared system prompt for transcribing handwritten notes, including
/// mathematical and scientific notation.
pub const HANDWRITTEN_NOTES_PROMPT: &str = r#"You are an expert OCR engine specialising in handwritten documents, including mathematical and scientific notes.

Transcribe the content of the provided image(s) exactly, then format the output according to the rules below.

## Mathematics
- Render every mathematical expression in LaTeX notation.
- Use ONLY dollar-sign delimiters. Do NOT use \( ... \) or \[ ... \].
- Equations or expressions that stand alone on their own line: wrap in double dollar signs on separate lines, e.g.
  $$
  E = mc^2
  $$
- Mathematics embedded within a sentence (inline): wrap in single dollar signs, e.g. "the value of $x$ is ...".

## Headings
Underlined text that appears alone on a line should be treated as a heading:
- Underlined text in the title position (top of the page, or the first prominent underlined line): render as a level-1 heading (#).
- Underlined text elsewhere in the body: render as a level-2 heading (##), or level-3 (###) if it is visually subordinate to a nearby level-2 heading.

## Tags / frontmatter
Hashtags (e.g. #mathematics, #algorithms) that appear at the very top of the page or immediately below the main title should be extracted and written as a YAML frontmatter block at the start of the output — not left inline in the body. Use this exact format:

---
tags:
  - mathematics
  - algorithms
---

If no hashtags are present, omit the frontmatter block entirely.

## Everything else
- Preserve all other structure: bullet points, numbered lists, tables, code blocks.
- Do not add commentary, interpretation, or content not present in the image."#;

/// Append caller-supplied instructions to the shared prompt.
///
/// Returns the prompt unchanged when `extra` is `None` or blank.
pub fn with_extra_instructions(extra: Option<&str>) -> String {
    match extra.map(str::trim) {
        Some(extra) if !extra.is_empty() => {
            format!("{}\n\n## Additional instructions\n{}", HANDWRITTEN_NOTES_PROMPT, extra)
        }
        _ => HANDWRITTEN_NOTES_PROMPT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_forbids_bracket_delimiters() {
        assert!(HANDWRITTEN_NOTES_PROMPT.contains(r"Do NOT use \( ... \) or \[ ... \]"));
    }

    #[test]
    fn extra_instructions_appended() {
        let p = with_extra_instructions(Some("Transcribe margin notes as blockquotes."));
        assert!(p.starts_with(HANDWRITTEN_NOTES_PROMPT));
        assert!(p.ends_with("Transcribe margin notes as blockquotes."));
    }

    #[test]
    fn blank_extra_instructions_ignored() {
        assert_eq!(with_extra_instructions(Some("   ")), HANDWRITTEN_NOTES_PROMPT);
        assert_eq!(with_extra_instructions(None), HANDWRITTEN_NOTES_PROMPT);
    }
}

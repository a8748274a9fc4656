//! Post-processing: LaTeX delimiter normalisation of VLM OCR output.
//!
//! ## Why is post-processing necessary?
//!
//! The system prompt tells the model to use dollar-sign math delimiters
//! exclusively, yet models routinely disobey in ways that break KaTeX/MathJax
//! rendering downstream:
//!
//! - Emitting `\( ... \)` / `\[ ... \]` bracket delimiters anyway
//! - Writing each step of a multi-line derivation as its own `$$...$$`
//!   block on consecutive lines, which renders as a stack of centred
//!   one-liners instead of an aligned calculation
//! - Leaving multi-line display blocks without line terminators, so every
//!   equation collapses onto a single rendered line
//! - Embedding `$$...$$` mid-sentence where inline `$...$` was meant
//!
//! This module fixes all four with deterministic string rewriting — no LLM
//! round-trip, no configuration, no I/O. Keeping the rules here rather than
//! in the prompt means the prompt stays focused on *what to transcribe*, not
//! on delimiter edge-cases.
//!
//! ## Stage Order
//!
//! Stages must run in this specific order: bracket conversion first so the
//! merger sees dollar delimiters, merging before line-breaking so merged
//! blocks get `gather` treatment in the same pass, and the inline fixer last
//! as a safety net over everything the earlier stages produced.
//!
//! Every stage is a pure function (`&str → String`) and the whole pipeline
//! is idempotent: running it twice produces the same output as running it
//! once. Unbalanced or malformed delimiters are never an error — whatever
//! fails to match simply passes through unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum count of prose-looking words for [`is_prose_line`] to fire.
///
/// Tuned empirically on real transcripts; not a hard invariant. Raise it if
/// legitimate math blocks are being skipped, lower it if prose is being
/// mangled into `gather` environments.
pub const PROSE_WORD_THRESHOLD: usize = 2;

/// Minimum token length for a word to count towards [`PROSE_WORD_THRESHOLD`].
/// Filters out single variables (`x`, `y`) and short math-ish tokens.
const PROSE_MIN_WORD_LEN: usize = 3;

/// Run the full LaTeX delimiter normalisation pipeline on raw model output.
///
/// Stages (applied in order):
/// 1. `\( ... \)` → `$ ... $` and `\[ ... \]` → `$$ ... $$` (inner content
///    preserved byte-for-byte, including whitespace)
/// 2. Merge runs of consecutive single-line `$$...$$` blocks into one
///    multi-line block
/// 3. Rewrite multi-line `$$ ... $$` blocks as `\begin{gather}` environments
///    with `&` alignment and `\\` line terminators — unless the block looks
///    like prose or already carries an explicit environment
/// 4. Downgrade `$$...$$` embedded mid-sentence to inline `$...$`
///
/// Line endings are normalised to `\n` first; the output uses `\n`
/// throughout regardless of what the model produced.
///
/// # Example
/// ```
/// use ocr2md::normalize_latex_delimiters;
///
/// assert_eq!(normalize_latex_delimiters(r"\(x\)"), "$x$");
/// assert_eq!(
///     normalize_latex_delimiters("$$A$$\n$$B$$"),
///     "$$\n\\begin{gather}\n& A \\\\\n& B \\\\\n\\end{gather}\n$$"
/// );
/// ```
pub fn normalize_latex_delimiters(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = convert_bracket_delimiters(&s);
    let s = merge_display_runs(&s);
    let s = break_display_blocks(&s);
    fix_inline_double_dollar(&s)
}

// ── Line endings ─────────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Stage 1: Bracket delimiters → dollar delimiters ──────────────────────────

// `(?s)` lets a span cross newlines: models emit `\[` and `\]` on their own
// lines around multi-line display math. Both patterns are non-greedy so
// adjacent spans never swallow each other. Display runs before inline; the
// two orders agree on every known input, but the choice is pinned by a
// regression test below.

static RE_BRACKET_DISPLAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\\\[(.*?)\\\]").unwrap());
static RE_BRACKET_INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\\\((.*?)\\\)").unwrap());

fn convert_bracket_delimiters(input: &str) -> String {
    let s = RE_BRACKET_DISPLAY.replace_all(input, "$$$$${1}$$$$");
    RE_BRACKET_INLINE.replace_all(&s, "$$${1}$$").into_owned()
}

// ── Shared line classification ───────────────────────────────────────────────

/// If `line` is a complete single-line display block `$$<content>$$`, return
/// the content.
///
/// The content must be non-empty and must not itself start with `$`, so a
/// bare `$$` delimiter line or a degenerate `$$$$` never counts.
fn single_line_display(line: &str) -> Option<&str> {
    let content = line.strip_prefix("$$")?.strip_suffix("$$")?;
    if content.is_empty() || content.starts_with('$') {
        return None;
    }
    Some(content)
}

static RE_TEXT_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\text\{[^}]*\}").unwrap());
static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").unwrap());

/// Heuristic: does a line inside a display block read like prose rather
/// than mathematics?
///
/// After stripping `\text{...}` spans, counts maximal alphabetic tokens that
/// are all-lowercase, at least [`PROSE_MIN_WORD_LEN`] letters long, and not
/// immediately preceded by a backslash (LaTeX command names like `\quad` or
/// `\exists` must not count). A line with at least
/// [`PROSE_WORD_THRESHOLD`] such tokens is prose.
///
/// Kept as an isolated predicate so the threshold and token rules can be
/// tuned without touching the block-rewriting logic.
pub fn is_prose_line(line: &str) -> bool {
    let stripped = RE_TEXT_SPAN.replace_all(line, "");
    let mut words = 0;
    for m in RE_WORD.find_iter(&stripped) {
        let token = m.as_str();
        if token.len() < PROSE_MIN_WORD_LEN {
            continue;
        }
        if !token.chars().all(|c| c.is_ascii_lowercase()) {
            continue;
        }
        // Byte-indexed check is safe: `\` is a single ASCII byte.
        if m.start() > 0 && stripped.as_bytes()[m.start() - 1] == b'\\' {
            continue;
        }
        words += 1;
        if words >= PROSE_WORD_THRESHOLD {
            return true;
        }
    }
    false
}

// ── Stage 2: Merge consecutive single-line display blocks ────────────────────

/// Collapse runs of ≥2 adjacent single-line `$$...$$` lines into one
/// multi-line block.
///
/// A blank line (or any non-matching line) between two blocks is intentional
/// separation and terminates the run. A run of length 1 is left exactly as
/// written. Lines inside an existing bare-`$$` multi-line block are never
/// candidates — the scan tracks delimiter parity and passes block interiors
/// through untouched.
fn merge_display_runs(input: &str) -> String {
    let lines: Vec<&str> = input.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut in_block = false;
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if line.trim() == "$$" {
            in_block = !in_block;
            out.push(line.to_string());
            i += 1;
            continue;
        }
        if in_block {
            out.push(line.to_string());
            i += 1;
            continue;
        }
        if single_line_display(line).is_none() {
            out.push(line.to_string());
            i += 1;
            continue;
        }
        // Collect the run of consecutive single-line blocks.
        let mut run: Vec<&str> = Vec::new();
        let mut j = i;
        while j < lines.len() {
            match single_line_display(lines[j]) {
                Some(content) => {
                    run.push(content.trim());
                    j += 1;
                }
                None => break,
            }
        }
        if run.len() == 1 {
            out.push(line.to_string()); // lone block — leave untouched
        } else {
            out.push("$$".to_string());
            out.extend(run.iter().map(|s| s.to_string()));
            out.push("$$".to_string());
        }
        i = j;
    }
    out.join("\n")
}

// ── Stage 3: Line-break multi-line display blocks ────────────────────────────

/// Rewrite multi-line `$$ ... $$` blocks as `gather` environments.
///
/// Scans for paired bare `$$` delimiter lines; an unpaired opener means the
/// rest of the text passes through unchanged. The delimiter lines themselves
/// are emitted as written.
fn break_display_blocks(input: &str) -> String {
    let lines: Vec<&str> = input.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        if lines[i].trim() == "$$" {
            let close = lines[i + 1..]
                .iter()
                .position(|l| l.trim() == "$$")
                .map(|p| p + i + 1);
            if let Some(close) = close {
                out.push(lines[i].to_string());
                out.extend(rewrite_block_body(&lines[i + 1..close]));
                out.push(lines[close].to_string());
                i = close + 1;
                continue;
            }
        }
        out.push(lines[i].to_string());
        i += 1;
    }
    out.join("\n")
}

/// Rewrite the interior of one multi-line display block, or return it
/// byte-for-byte when the block must not be touched.
///
/// Untouched cases:
/// - at most one non-empty line (a single expression needs no alignment)
/// - the first non-empty line opens an explicit `\begin{...}` environment;
///   double-wrapping would break rendering, and this check is also what
///   makes the stage idempotent over its own output
/// - any non-empty line classifies as prose: injecting `&`/`\\` markers into
///   mixed prose+math would mangle it, so the whole block is skipped. The
///   cost is that legitimately mixed blocks are never beautified.
fn rewrite_block_body(inner: &[&str]) -> Vec<String> {
    let trimmed: Vec<&str> = inner.iter().map(|l| l.trim_end()).collect();
    let non_empty: Vec<&str> = trimmed.iter().copied().filter(|l| !l.is_empty()).collect();

    let untouched = |inner: &[&str]| inner.iter().map(|l| l.to_string()).collect::<Vec<_>>();

    if non_empty.len() <= 1 {
        return untouched(inner);
    }
    if non_empty[0].trim_start().starts_with(r"\begin{") {
        return untouched(inner);
    }
    if non_empty.iter().any(|l| is_prose_line(l)) {
        return untouched(inner);
    }

    let mut out = Vec::with_capacity(non_empty.len() + 2);
    out.push(r"\begin{gather}".to_string());
    for line in non_empty {
        // Whitespace before a pre-existing `\\` was removed by the trailing
        // trim above, so a plain suffix check cannot double-terminate.
        if line.ends_with(r"\\") {
            out.push(format!("& {line}"));
        } else {
            out.push(format!(r"& {line} \\"));
        }
    }
    out.push(r"\end{gather}".to_string());
    out
}

// ── Stage 4: Inline double-dollar fixer ──────────────────────────────────────

static RE_INLINE_DOUBLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\$(.+?)\$\$").unwrap());

/// Downgrade `$$...$$` that appears inside a line of surrounding text to
/// inline `$...$`.
///
/// Bare `$$` delimiter lines and lines that *are* one standalone display
/// expression (ignoring surrounding whitespace) pass through unchanged;
/// everything else has every embedded `$$...$$` occurrence converted. This
/// is the final safety net for display math the model emitted mid-sentence.
fn fix_inline_double_dollar(input: &str) -> String {
    input
        .split('\n')
        .map(|line| {
            let t = line.trim();
            if t == "$$" || single_line_display(t).is_some() {
                line.to_string()
            } else {
                RE_INLINE_DOUBLE.replace_all(line, "$$${1}$$").into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── Stage 1: bracket delimiters ──────────────────────────────────────

    #[test]
    fn inline_brackets_simple() {
        assert_eq!(normalize_latex_delimiters(r"\(x\)"), "$x$");
    }

    #[test]
    fn inline_brackets_preserve_inner_whitespace() {
        assert_eq!(normalize_latex_delimiters(r"\( x \)"), "$ x $");
    }

    #[test]
    fn inline_brackets_in_sentence() {
        assert_eq!(
            normalize_latex_delimiters(r"the value of \( x \) is positive"),
            "the value of $ x $ is positive"
        );
    }

    #[test]
    fn multiple_inline_brackets() {
        assert_eq!(
            normalize_latex_delimiters(r"\( a \) and \( b \)"),
            "$ a $ and $ b $"
        );
    }

    #[test]
    fn inline_brackets_with_latex_commands() {
        assert_eq!(
            normalize_latex_delimiters(r"where \( \alpha + \beta = \gamma \)"),
            r"where $ \alpha + \beta = \gamma $"
        );
    }

    #[test]
    fn display_brackets_simple() {
        assert_eq!(normalize_latex_delimiters(r"\[E = mc^2\]"), "$$E = mc^2$$");
    }

    #[test]
    fn display_brackets_multiline() {
        let src = "\\[\n(0) \\quad (\\forall x)\n\\]";
        assert_eq!(
            normalize_latex_delimiters(src),
            "$$\n(0) \\quad (\\forall x)\n$$"
        );
    }

    #[test]
    fn display_brackets_in_paragraph() {
        let src = "Consider the equation:\n\\[\nf(x) = x^2\n\\]\nwhich is quadratic.";
        let result = normalize_latex_delimiters(src);
        assert!(!result.contains("\\["));
        assert!(!result.contains("\\]"));
        assert!(result.contains("$$\nf(x) = x^2\n$$"));
    }

    #[test]
    fn mixed_inline_and_display_conversion_order_regression() {
        // Adjacent inline and display spans; the pinned order (display first,
        // inline second) must not let either span swallow the other, and an
        // inline span nested in a display span is converted independently.
        let src = r"\(a\)\[b\] and \[ \(x\) \]";
        assert_eq!(convert_bracket_delimiters(src), "$a$$$b$$ and $$ $x$ $$");
    }

    // ── Stage 2: merging ─────────────────────────────────────────────────

    #[test]
    fn two_consecutive_blocks_merge_into_gather() {
        assert_eq!(
            normalize_latex_delimiters("$$A$$\n$$B$$"),
            "$$\n\\begin{gather}\n& A \\\\\n& B \\\\\n\\end{gather}\n$$"
        );
    }

    #[test]
    fn three_consecutive_blocks_merge_in_order() {
        assert_eq!(
            normalize_latex_delimiters("$$A$$\n$$B$$\n$$C$$"),
            "$$\n\\begin{gather}\n& A \\\\\n& B \\\\\n& C \\\\\n\\end{gather}\n$$"
        );
    }

    #[test]
    fn lone_single_line_block_unchanged() {
        assert_eq!(normalize_latex_delimiters("$$E = mc^2$$"), "$$E = mc^2$$");
    }

    #[test]
    fn blank_line_prevents_merge() {
        assert_eq!(normalize_latex_delimiters("$$A$$\n\n$$B$$"), "$$A$$\n\n$$B$$");
    }

    #[test]
    fn merge_trims_captured_content() {
        assert_eq!(merge_display_runs("$$ A $$\n$$ B $$"), "$$\nA\nB\n$$");
    }

    #[test]
    fn merge_does_not_look_inside_multiline_blocks() {
        // The interior of an existing bare-$$ block passes through even if a
        // line happens to look like a single-line block.
        let src = "$$\n$$A$$\n$$";
        assert_eq!(merge_display_runs(src), src);
    }

    #[test]
    fn surrounding_text_preserved_around_merge() {
        let src = "for any $x$\n\n$$A$$\n$$B$$\n\nsome text";
        let result = normalize_latex_delimiters(src);
        assert!(result.starts_with("for any $x$\n"));
        assert!(result.ends_with("\nsome text"));
        assert!(!result.contains("$$A$$\n$$B$$"));
    }

    // ── Stage 3: line-breaking ───────────────────────────────────────────

    #[test]
    fn single_content_line_block_unchanged() {
        assert_eq!(
            normalize_latex_delimiters("$$\nE = mc^2\n$$"),
            "$$\nE = mc^2\n$$"
        );
    }

    #[test]
    fn two_line_block_gets_gather() {
        assert_eq!(
            normalize_latex_delimiters("$$\nA\nB\n$$"),
            "$$\n\\begin{gather}\n& A \\\\\n& B \\\\\n\\end{gather}\n$$"
        );
    }

    #[test]
    fn trailing_spaces_stripped_before_terminator() {
        assert_eq!(
            normalize_latex_delimiters("$$\nA   \nB   \n$$"),
            "$$\n\\begin{gather}\n& A \\\\\n& B \\\\\n\\end{gather}\n$$"
        );
    }

    #[test]
    fn already_terminated_lines_not_doubled() {
        assert_eq!(
            normalize_latex_delimiters("$$\nA \\\\\nB\n$$"),
            "$$\n\\begin{gather}\n& A \\\\\n& B \\\\\n\\end{gather}\n$$"
        );
    }

    #[test]
    fn whitespace_before_existing_terminator_tolerated() {
        assert_eq!(
            normalize_latex_delimiters("$$\nA \\\\   \nB\n$$"),
            "$$\n\\begin{gather}\n& A \\\\\n& B \\\\\n\\end{gather}\n$$"
        );
    }

    #[test]
    fn blank_interior_lines_dropped_from_gather_body() {
        assert_eq!(
            normalize_latex_delimiters("$$\nA\n\nB\n$$"),
            "$$\n\\begin{gather}\n& A \\\\\n& B \\\\\n\\end{gather}\n$$"
        );
    }

    #[test]
    fn explicit_environment_not_double_wrapped() {
        let src = "$$\n\\begin{align}\na &= b \\\\\nc &= d\n\\end{align}\n$$";
        assert_eq!(normalize_latex_delimiters(src), src);
    }

    #[test]
    fn prose_line_blocks_rewrite_entirely() {
        let src = "$$\nP'.x\nwhere $P'$ is given by\nQ.x\n$$";
        assert_eq!(normalize_latex_delimiters(src), src);
    }

    #[test]
    fn unpaired_opening_delimiter_passes_through() {
        let src = "$$\nA\nB";
        assert_eq!(normalize_latex_delimiters(src), src);
    }

    #[test]
    fn ewd_calculation_gets_gather() {
        // Multi-step proof block in the style the model produces for
        // handwritten derivations.
        let src = "$$\nP''.x \n= \\{(3)\\} \nP'.x \\lor (\\exists y: y \\prec x: \\neg P'.y) \n= \\{(1)\\} \nP'.x .\n$$";
        let result = normalize_latex_delimiters(src);
        let lines: Vec<&str> = result.split('\n').collect();
        assert_eq!(lines.first(), Some(&"$$"));
        assert_eq!(lines.last(), Some(&"$$"));
        assert_eq!(lines[1], "\\begin{gather}");
        assert_eq!(lines[lines.len() - 2], "\\end{gather}");
        for line in &lines[2..lines.len() - 2] {
            assert!(line.starts_with("& "), "missing alignment marker: {line:?}");
            assert!(line.ends_with("\\\\"), "missing terminator: {line:?}");
        }
    }

    // ── Prose heuristic ──────────────────────────────────────────────────

    #[test]
    fn prose_detection_plain_words() {
        assert!(is_prose_line("where $P'$ is given by"));
        assert!(is_prose_line("in other words the following holds"));
    }

    #[test]
    fn prose_detection_ignores_latex_commands() {
        assert!(!is_prose_line(r"P'.x \lor (\exists y: y \prec x: \neg P'.y)"));
        assert!(!is_prose_line(r"= \quad \{(3)\}"));
        assert!(!is_prose_line(r"\alpha + \beta = \gamma"));
    }

    #[test]
    fn prose_detection_ignores_text_spans() {
        assert!(!is_prose_line(r"x = 1 \text{for all natural numbers}"));
    }

    #[test]
    fn prose_detection_ignores_short_and_mixed_case_tokens() {
        // "is", "by" too short; "Px" mixed case; one long word is below threshold.
        assert!(!is_prose_line("Px is by x"));
        assert!(!is_prose_line("therefore $x$"));
    }

    // ── Stage 4: inline double-dollar ────────────────────────────────────

    #[test]
    fn embedded_double_dollar_downgraded_to_inline() {
        assert_eq!(
            normalize_latex_delimiters("The truth of $$(\\forall x: Px)$$ by induction."),
            "The truth of $(\\forall x: Px)$ by induction."
        );
    }

    #[test]
    fn standalone_display_line_untouched() {
        assert_eq!(
            normalize_latex_delimiters("$$\\forall x: Px$$"),
            "$$\\forall x: Px$$"
        );
    }

    #[test]
    fn multiple_embedded_occurrences_all_converted() {
        assert_eq!(
            fix_inline_double_dollar("both $$a$$ and $$b$$ hold"),
            "both $a$ and $b$ hold"
        );
    }

    #[test]
    fn bare_delimiter_line_untouched_by_inline_fixer() {
        assert_eq!(fix_inline_double_dollar("$$"), "$$");
        assert_eq!(fix_inline_double_dollar("  $$  "), "  $$  ");
    }

    #[test]
    fn display_line_with_leading_whitespace_untouched() {
        assert_eq!(fix_inline_double_dollar("  $$x = 1$$"), "  $$x = 1$$");
    }

    // ── No-op and degenerate inputs ──────────────────────────────────────

    #[test]
    fn already_dollar_formatted_text_unchanged() {
        let text = "the value of $x$ is positive";
        assert_eq!(normalize_latex_delimiters(text), text);
    }

    #[test]
    fn plain_prose_unchanged() {
        let text = "No math here at all.";
        assert_eq!(normalize_latex_delimiters(text), text);
    }

    #[test]
    fn empty_string_maps_to_empty_string() {
        assert_eq!(normalize_latex_delimiters(""), "");
    }

    #[test]
    fn unbalanced_delimiters_pass_through() {
        assert_eq!(normalize_latex_delimiters(r"\(x"), r"\(x");
        assert_eq!(normalize_latex_delimiters(r"x\]"), r"x\]");
        assert_eq!(normalize_latex_delimiters("$$x"), "$$x");
    }

    #[test]
    fn crlf_input_normalised_to_lf() {
        assert_eq!(
            normalize_latex_delimiters("$$A$$\r\n$$B$$"),
            "$$\n\\begin{gather}\n& A \\\\\n& B \\\\\n\\end{gather}\n$$"
        );
    }

    // ── Idempotence ──────────────────────────────────────────────────────

    fn assert_idempotent(src: &str) {
        let once = normalize_latex_delimiters(src);
        let twice = normalize_latex_delimiters(&once);
        assert_eq!(once, twice, "not idempotent for input: {src:?}");
    }

    #[test]
    fn idempotent_on_merged_runs() {
        assert_idempotent("$$A$$\n$$B$$\n$$C$$");
    }

    #[test]
    fn idempotent_on_multiline_blocks() {
        assert_idempotent("$$\nA\nB\nC\n$$");
    }

    #[test]
    fn idempotent_on_mixed_brackets() {
        assert_idempotent(r"Let \( x \) satisfy \[ x^2 = 4 \]");
    }

    #[test]
    fn idempotent_on_prose_guarded_block() {
        assert_idempotent("$$\nP'.x\nwhere $P'$ is given by\nQ.x\n$$");
    }

    #[test]
    fn idempotent_on_inline_fix() {
        assert_idempotent("The truth of $$(\\forall x: Px)$$ by induction.");
    }

    #[test]
    fn idempotent_on_realistic_derivation() {
        assert_idempotent(
            "for any $x$\n\n$$P''\\,.x$$\n$$= \\quad \\{(3)\\}$$\n$$P'.x \\lor (\\exists y: y < x: \\neg P'.y)$$\n$$= \\quad \\{(1)\\}$$\n$$P'.x.$$\n\nIn other words",
        );
    }
}

//! Declaration text extraction.
//!
//! Register declarations are read from one of two kinds of input:
//! - **Header** (`.h` or anything not Markdown): the whole file is scanned.
//! - **Literate** (`.md`): only fenced code blocks tagged `regmap` are
//!   scanned; surrounding prose is ignored.
//!
//! Every extracted line keeps its line number in the original file so that
//! diagnostics point at the right place.

use std::path::Path;

/// Info string that marks a Markdown fence as register declarations.
pub const LITERATE_TAG: &str = "regmap";

/// One extracted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Line text without its terminator.
    pub text: String,
    /// 1-indexed line number in the original file.
    pub original_line: usize,
}

/// Declaration text extracted from one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContent {
    /// Extracted lines in document order.
    pub lines: Vec<SourceLine>,
    /// Input path, for diagnostics.
    pub file_path: String,
}

/// Extracts declaration lines from `content` read from `file_path`.
#[must_use]
pub fn extract_source(file_path: &Path, content: &str) -> SourceContent {
    let lines = if is_literate_file(file_path) {
        extract_fenced(content)
    } else {
        content
            .lines()
            .enumerate()
            .map(|(idx, text)| SourceLine {
                text: text.to_string(),
                original_line: idx + 1,
            })
            .collect()
    };
    SourceContent {
        lines,
        file_path: file_path.to_string_lossy().to_string(),
    }
}

fn is_literate_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Collects the bodies of `regmap` fences. A fence closes only on a run of
/// backticks at least as long as the one that opened it.
fn extract_fenced(content: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    let mut open_fence: Option<usize> = None;

    for (idx, text) in content.lines().enumerate() {
        let fence = fence_length(text);
        match (open_fence, fence) {
            (Some(open), Some(len)) if len >= open => open_fence = None,
            (Some(_), _) => lines.push(SourceLine {
                text: text.to_string(),
                original_line: idx + 1,
            }),
            (None, Some(len)) => {
                let info = text.trim_start()[len..].trim();
                if info.split_whitespace().next() == Some(LITERATE_TAG) {
                    open_fence = Some(len);
                }
            }
            (None, None) => {}
        }
    }

    lines
}

/// Number of leading backticks when the line is a fence (three or more).
fn fence_length(line: &str) -> Option<usize> {
    let count = line.trim_start().chars().take_while(|&c| c == '`').count();
    (count >= 3).then_some(count)
}

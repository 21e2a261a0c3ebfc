//! Language-aware tokenization for the BM25 index (spec.md §4.3).
//!
//! The same tokenizer must run at index time and query time; `Tokenizer`
//! dispatches by script rather than attempting language detection, mirroring
//! the original's CJK/jieba vs. whitespace split (`app/rag/keyword_search.py`).
//! There is no bundled CJK segmenter crate in the teacher's or pack's
//! dependency set, so CJK text is split on a bigram-overlap scheme instead of
//! a true morphological segmentation (see DESIGN.md Open Question).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tokenizer {
    Latin,
    Cjk,
}

impl Tokenizer {
    /// Picks a tokenizer for `text` by sniffing for CJK code points.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(is_cjk) {
            Tokenizer::Cjk
        } else {
            Tokenizer::Latin
        }
    }

    pub fn tokenize(self, text: &str) -> Vec<String> {
        match self {
            Tokenizer::Latin => tokenize_latin(text),
            Tokenizer::Cjk => tokenize_cjk(text),
        }
    }
}

fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF   // CJK Unified Ideographs
        | 0x3040..=0x309F // Hiragana
        | 0x30A0..=0x30FF // Katakana
        | 0xAC00..=0xD7A3 // Hangul syllables
    )
}

/// Lowercase, split on non-alphanumeric boundaries, drop empty tokens.
fn tokenize_latin(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// CJK runs are split into overlapping bigrams (a cheap stand-in for proper
/// morphological segmentation); non-CJK runs within the same text fall back
/// to the Latin splitter so mixed-script catalog strings still tokenize.
fn tokenize_cjk(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut run: Vec<char> = Vec::new();
    let mut non_cjk_buf = String::new();

    let flush_run = |run: &mut Vec<char>, tokens: &mut Vec<String>| {
        if run.len() == 1 {
            tokens.push(run[0].to_string());
        } else {
            for window in run.windows(2) {
                tokens.push(window.iter().collect());
            }
        }
        run.clear();
    };
    let flush_non_cjk = |buf: &mut String, tokens: &mut Vec<String>| {
        tokens.extend(tokenize_latin(buf));
        buf.clear();
    };

    for c in text.chars() {
        if is_cjk(c) {
            if !non_cjk_buf.is_empty() {
                flush_non_cjk(&mut non_cjk_buf, &mut tokens);
            }
            run.push(c);
        } else {
            if !run.is_empty() {
                flush_run(&mut run, &mut tokens);
            }
            non_cjk_buf.push(c);
        }
    }
    if !run.is_empty() {
        flush_run(&mut run, &mut tokens);
    }
    if !non_cjk_buf.is_empty() {
        flush_non_cjk(&mut non_cjk_buf, &mut tokens);
    }
    tokens
}

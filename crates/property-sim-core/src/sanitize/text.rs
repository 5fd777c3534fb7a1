use unicode_normalization::UnicodeNormalization;
use unicode_properties::{GeneralCategoryGroup, UnicodeGeneralCategory};

/// Maximum length, in characters, of free-text label fields.
pub const MAX_LABEL_LEN: usize = 200;

/// Raw characters examined per output character allowed.
pub const RAW_LEN_FACTOR: usize = 8;

const SQL_KEYWORDS: [&str; 7] = [
    "DROP", "DELETE", "INSERT", "UPDATE", "UNION", "SELECT", "TABLE",
];

const DANGEROUS_PATTERNS: [&str; 5] = [
    "javascript:",
    "vbscript:",
    "eval(",
    "expression(",
    "<script",
];

const LABEL_PUNCTUATION: &str = " -_.,()/#&+・、。「」『』々〆〇ー";

/// Which characters survive sanitisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// Anything outside Unicode category C
    Any,
    /// Japanese scripts, ASCII alphanumerics and basic punctuation only
    Label,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scrub a hostile string into a display-safe label.
///
/// Applies NFKC, drops Unicode category C characters (including unassigned
/// code points), removes `<script>` blocks and other markup, script-URL
/// schemes, inline event handlers, `eval(` / `expression(`, and bare SQL
/// keyword tokens, then restricts the character set, trims, and clips to
/// `max_len` characters. Passes repeat until the output is stable so
/// removals cannot splice a new pattern together.
///
/// Input beyond `max_len * RAW_LEN_FACTOR` characters is discarded before any
/// scrubbing, so the work done is bounded by `max_len`, not by the caller.
pub fn sanitize_text(raw: &str, max_len: usize, charset: Charset) -> String {
    let budget = max_len.saturating_mul(RAW_LEN_FACTOR);
    let mut current: String = raw
        .chars()
        .take(budget)
        .nfkc()
        .filter(|c| !is_other_category(*c))
        .collect();

    loop {
        let next = scrub_pass(&current, charset);
        if next == current {
            break;
        }
        current = next;
    }

    let clipped: String = current.chars().take(max_len).collect();
    clipped.trim().to_string()
}

/// True for characters in Unicode general category C: controls, format
/// characters, surrogates, private use and unassigned code points.
pub fn is_other_category(c: char) -> bool {
    c.general_category_group() == GeneralCategoryGroup::Other
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

fn scrub_pass(input: &str, charset: Charset) -> String {
    let s = remove_script_blocks(input);
    let s = remove_tags(&s);
    let s = remove_event_handlers(&s);
    let s = remove_patterns(&s);
    let s = remove_sql_keywords(&s);
    let s = match charset {
        Charset::Any => s,
        Charset::Label => s.chars().filter(|c| is_label_char(*c)).collect(),
    };
    collapse_whitespace(&s)
}

/// Remove `<script ...> ... </script>` including the enclosed payload.
///
/// Single forward scan; a block spliced together by a removal is caught by
/// the next pass.
fn remove_script_blocks(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    while let Some(start) = find_ascii_ci(input, "<script", cursor) {
        out.push_str(&input[cursor..start]);
        cursor = match find_ascii_ci(input, "</script", start) {
            Some(close) => input[close..].find('>').map_or(input.len(), |gt| close + gt + 1),
            None => input[start..].find('>').map_or(input.len(), |gt| start + gt + 1),
        };
    }
    out.push_str(&input[cursor..]);
    out
}

/// Remove anything shaped like an HTML tag or comment.
fn remove_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let after = &rest[lt + 1..];
        let looks_like_tag = after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?');
        match (looks_like_tag, after.find('>')) {
            (true, Some(gt)) => rest = &after[gt + 1..],
            _ => rest = after,
        }
    }
    out.push_str(rest);
    out
}

/// Remove `on<letters>\s*=` inline event handler prefixes.
fn remove_event_handlers(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied = 0;
    let mut i = 0;

    while i + 2 < bytes.len() {
        let at_word_start = i == 0 || !bytes[i - 1].is_ascii_alphanumeric();
        if at_word_start
            && bytes[i].eq_ignore_ascii_case(&b'o')
            && bytes[i + 1].eq_ignore_ascii_case(&b'n')
        {
            let mut j = i + 2;
            while j < bytes.len() && bytes[j].is_ascii_alphabetic() {
                j += 1;
            }
            let mut k = j;
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if j > i + 2 && k < bytes.len() && bytes[k] == b'=' {
                out.push_str(&input[copied..i]);
                copied = k + 1;
                i = k + 1;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&input[copied..]);
    out
}

/// Remove every dangerous pattern in one forward scan.
fn remove_patterns(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let hit = DANGEROUS_PATTERNS.iter().find(|p| {
            let pat = p.as_bytes();
            bytes.len() - i >= pat.len() && bytes[i..i + pat.len()].eq_ignore_ascii_case(pat)
        });
        match hit {
            Some(pattern) => {
                out.push_str(&input[copied..i]);
                i += pattern.len();
                copied = i;
            }
            None => i += 1,
        }
    }
    out.push_str(&input[copied..]);
    out
}

/// Drop ASCII word tokens that are SQL verbs, case-insensitively.
fn remove_sql_keywords(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut word = String::new();

    let flush = |word: &mut String, out: &mut String| {
        let is_keyword = SQL_KEYWORDS
            .iter()
            .any(|kw| kw.eq_ignore_ascii_case(word.as_str()));
        if !is_keyword {
            out.push_str(word);
        }
        word.clear();
    };

    for c in input.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
        } else {
            flush(&mut word, &mut out);
            out.push(c);
        }
    }
    flush(&mut word, &mut out);
    out
}

fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_space = false;
    for c in input.chars() {
        if c.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Character classes
// ---------------------------------------------------------------------------

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || LABEL_PUNCTUATION.contains(c)
        || matches!(c,
            '\u{3040}'..='\u{309F}'     // Hiragana
            | '\u{30A0}'..='\u{30FF}'   // Katakana
            | '\u{31F0}'..='\u{31FF}'   // Katakana phonetic extensions
            | '\u{3400}'..='\u{4DBF}'   // CJK extension A
            | '\u{4E00}'..='\u{9FFF}'   // CJK unified ideographs
            | '\u{F900}'..='\u{FAFF}'   // CJK compatibility ideographs
        )
}

/// Byte offset of an ASCII `needle` in `haystack`, ignoring ASCII case.
fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.is_empty() || hay.len() < pat.len() || from > hay.len() - pat.len() {
        return None;
    }
    (from..=hay.len() - pat.len()).find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}

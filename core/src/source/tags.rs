//! Filename qualifier tags: `Name (USA) (Rev 1) [!]`.

/// First words that mark a pre-release or otherwise unusual dump.
const STATUS_WORDS: &[&str] = &[
    "alpha", "beta", "demo", "hack", "kiosk", "pirate", "preview", "promo", "proto",
    "prototype", "sample", "unl",
];

/// Contents of every top-level `(..)` and `[..]` group, trimmed, in order.
///
/// Nested groups stay inside their enclosing tag: `(Foo (Bar))` is `Foo (Bar)`.
pub fn filename_tags(stem: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut open: Vec<char> = Vec::new();
    let mut text = String::new();

    for c in stem.chars() {
        if let Some(end) = closer(c) {
            if !open.is_empty() {
                text.push(c);
            }
            open.push(end);
        } else if open.last() == Some(&c) {
            open.pop();
            if open.is_empty() {
                let tag = text.trim();
                if !tag.is_empty() {
                    tags.push(tag.to_string());
                }
                text.clear();
            } else {
                text.push(c);
            }
        } else if !open.is_empty() {
            text.push(c);
        }
    }
    tags
}

/// The stem with every tag group removed and whitespace collapsed.
///
/// Falls back to the trimmed stem if nothing would remain.
pub fn strip_tags(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len());
    let mut open: Vec<char> = Vec::new();

    for c in stem.chars() {
        if let Some(end) = closer(c) {
            open.push(end);
        } else if open.last() == Some(&c) {
            open.pop();
        } else if open.is_empty() {
            out.push(c);
        }
    }

    let stripped = out.split_whitespace().collect::<Vec<_>>().join(" ");
    if stripped.is_empty() {
        stem.trim().to_string()
    } else {
        stripped
    }
}

fn closer(open: char) -> Option<char> {
    match open {
        '(' => Some(')'),
        '[' => Some(']'),
        _ => None,
    }
}

/// Tags whose first word marks release status, such as `Beta 2` or `Proto`.
pub fn status_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter(|tag| {
            tag.split_whitespace()
                .next()
                .map(|word| word.to_ascii_lowercase())
                .is_some_and(|word| STATUS_WORDS.contains(&word.as_str()))
        })
        .cloned()
        .collect()
}

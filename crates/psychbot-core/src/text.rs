//! Text normalization shared by the classifiers.

/// Lowercase, drop apostrophes, turn every other non-alphanumeric character
/// into a space, and collapse runs of whitespace.
///
/// `"Self-Harm?"` becomes `"self harm"` and `"someone else's"` becomes
/// `"someone elses"`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars().flat_map(char::to_lowercase) {
        match ch {
            '\'' | '\u{2018}' | '\u{2019}' => {}
            c if c.is_alphanumeric() => out.push(c),
            _ => out.push(' '),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-word phrase containment on already-normalized text.
pub fn contains_phrase(normalized_text: &str, normalized_phrase: &str) -> bool {
    if normalized_phrase.is_empty() {
        return false;
    }
    let haystack = format!(" {normalized_text} ");
    let needle = format!(" {normalized_phrase} ");
    haystack.contains(&needle)
}

/// Join items as prose: `"A"`, `"A and B"`, `"A, B and C"`.
pub fn join_and<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [rest @ .., last] => {
            let head: Vec<&str> = rest.iter().map(AsRef::as_ref).collect();
            format!("{} and {}", head.join(", "), last.as_ref())
        }
    }
}

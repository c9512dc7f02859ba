//! Answer normalization for label-style answers.

/// Canonical comparison form of a multiple-choice answer.
///
/// Trims surrounding whitespace, drops every `.`, and uppercases the rest,
/// so `"a."`, `" A "` and `"A"` all compare equal. Applied identically to the
/// submitted answer and the stored correct answer.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|&c| c != '.')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Whether two label-style answers are equivalent after normalization.
pub fn answers_match(submitted: &str, expected: &str) -> bool {
    normalize_answer(submitted) == normalize_answer(expected)
}

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Normalize text for case- and diacritic-insensitive matching:
/// - canonical decomposition (NFD)
/// - combining marks removed
/// - lowercased, surrounding whitespace trimmed
///
/// Punctuation and inner whitespace are kept, so codes such as `J06.9`
/// still match literally.
pub fn normalize(input: &str) -> String {
    input
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Normalize and split on whitespace. Empty input yields no tokens.
pub fn tokenize(input: &str) -> Vec<String> {
    normalize(input)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Case-insensitive key used for code identity inside a version bucket.
pub(crate) fn code_key(code: &str) -> String {
    code.trim().to_lowercase()
}

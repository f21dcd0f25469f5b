use deunicode::deunicode;

/// Normalize `value` into a name accepted by the control plane.
///
/// Non-ASCII letters are transliterated first (`ç` gives `c`). The result
/// is lowercase, only holds `[a-z0-9-]`, never starts or ends with a hyphen
/// and never holds two hyphens in a row. Any run of other characters becomes
/// one hyphen.
pub fn slugify(value: &str) -> String {
    let ascii = deunicode(value);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    slug
}

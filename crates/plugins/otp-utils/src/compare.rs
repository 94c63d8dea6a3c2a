//! Candidate canonicalization and comparison.

/// Returns the canonical form of a candidate code, or `None` if it is blank.
///
/// Surrounding whitespace is dropped; the remaining text is kept verbatim
/// so that `"0482913"` never collapses into `"482913"`.
pub fn canonicalize(candidate: &str) -> Option<&str> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Constant-time string comparison to prevent timing attacks.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

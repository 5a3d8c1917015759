//! URL slug derivation for categories and products.
//!
//! Uniqueness (the `-1`, `-2`… suffix probing) lives in the services, since
//! it needs the store; this module is only the text transform.

/// Lowercase the input and collapse every non-alphanumeric run into a single
/// hyphen. May return an empty string for all-symbol input; callers fall back
/// to a fixed stem in that case.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Candidate for the nth collision: `base-n`.
pub fn suffixed(base: &str, counter: u32) -> String {
    format!("{}-{}", base, counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Electronics"), "electronics");
    }

    #[test]
    fn collapses_symbol_runs() {
        assert_eq!(slugify("Mens  T-Shirts & Polos"), "mens-t-shirts-polos");
        assert_eq!(slugify("--Edge--"), "edge");
    }

    #[test]
    fn keeps_digits() {
        assert_eq!(slugify("USB 3.0 Hub"), "usb-3-0-hub");
    }

    #[test]
    fn empty_for_symbols_only() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn collision_suffixes() {
        assert_eq!(suffixed("phones", 1), "phones-1");
        assert_eq!(suffixed("phones", 2), "phones-2");
    }
}

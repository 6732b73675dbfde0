// MIT License
// Copyright (c) 2024 Graham King

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static NOT_SLUG_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Lowercase ASCII slug: punctuation dropped, runs of spaces and hyphens
/// become a single hyphen. Accented letters lose their accents (NFKD), any
/// other non-ASCII character is dropped.
pub fn slugify(s: &str) -> String {
    let ascii: String = s.nfkd().filter(char::is_ascii).collect();
    let cleaned = NOT_SLUG_CHARS.replace_all(&ascii, "");
    let lowered = cleaned.trim().to_lowercase();
    SEPARATORS.replace_all(&lowered, "-").into_owned()
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn punctuation_is_dropped() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(
            slugify("I love cats, I love every kind of cat"),
            "i-love-cats-i-love-every-kind-of-cat"
        );
    }

    #[test]
    fn separators_collapse() {
        assert_eq!(slugify("  foo -- bar\tbaz "), "foo-bar-baz");
        assert_eq!(slugify("random tag title"), "random-tag-title");
    }

    #[test]
    fn underscores_and_digits_survive() {
        assert_eq!(slugify("snake_case 2"), "snake_case-2");
    }

    #[test]
    fn slugify_is_idempotent() {
        let once = slugify("Rust: the Good Parts (2nd ed.)");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn accents_are_folded() {
        assert_eq!(slugify("café au lait"), "cafe-au-lait");
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("Ångström über naïve"), "angstrom-uber-naive");
        // compatibility forms decompose too
        assert_eq!(slugify("ﬁle №1"), "file-no1");
    }

    #[test]
    fn other_non_ascii_is_dropped() {
        assert_eq!(slugify("日本 rust"), "rust");
        assert_eq!(slugify("日本"), "");
        assert_eq!(slugify(""), "");
    }
}

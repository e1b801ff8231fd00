//! File naming for generated assets.
//!
//! Every tool that turns user text into a file name goes through here, so an
//! expression produces the same stem whether it names an MP3, an image or a
//! text cache:
//!
//! - `"Le Manteau"` → `le_manteau`
//! - `"l'imperméable"` → `l_imperméable`
//! - `"sac / valise"` → `sac_valise`
//!
//! Accented letters are word characters and survive; everything else collapses
//! into single underscores.

/// Fallback stem for input that has no word characters at all.
const EMPTY_SLUG: &str = "item";

/// Lowercase `name` and collapse every run of non-word characters into `_`.
///
/// Leading and trailing underscores are dropped. Input with no word characters
/// yields `"item"`, so the result is always a usable file stem.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// True when `name` is a bare file name: non-empty, no path separators, no `..`.
///
/// Used to validate file names that arrive over HTTP before they are joined
/// onto a directory.
pub fn is_plain_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && name != "."
}

/// `<slug>.<ext>` for a user-supplied name.
pub fn output_filename(name: &str, extension: &str) -> String {
    format!("{}.{}", slugify(name), extension.trim_start_matches('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_lowercases_and_joins_words() {
        assert_eq!(slugify("Le Manteau"), "le_manteau");
    }

    #[test]
    fn slug_keeps_accents() {
        assert_eq!(slugify("l'imperméable"), "l_imperméable");
        assert_eq!(slugify("Ça va"), "ça_va");
    }

    #[test]
    fn slug_collapses_punctuation_runs() {
        assert_eq!(slugify("sac / valise"), "sac_valise");
        assert_eq!(slugify("  --hello!!  world--  "), "hello_world");
    }

    #[test]
    fn slug_keeps_digits() {
        assert_eq!(slugify("Chapter 2"), "chapter_2");
    }

    #[test]
    fn slug_of_symbols_only_falls_back() {
        assert_eq!(slugify("!!!"), "item");
        assert_eq!(slugify(""), "item");
    }

    #[test]
    fn plain_filename_accepts_simple_names() {
        assert!(is_plain_filename("recording_1700000000.wav"));
        assert!(is_plain_filename("le manteau.mp3"));
    }

    #[test]
    fn plain_filename_rejects_traversal() {
        assert!(!is_plain_filename("../secret.wav"));
        assert!(!is_plain_filename("a/b.wav"));
        assert!(!is_plain_filename("a\\b.wav"));
        assert!(!is_plain_filename(".."));
        assert!(!is_plain_filename(""));
    }

    #[test]
    fn output_filename_adds_extension() {
        assert_eq!(output_filename("Le Manteau", "mp3"), "le_manteau.mp3");
        assert_eq!(output_filename("Le Manteau", ".png"), "le_manteau.png");
    }
}

//! Header normalization: Cyrillic transliteration, slug canonicalization,
//! translit/skeleton derivation.

use std::sync::OnceLock;

use unicode_normalization::UnicodeNormalization;

/// Cyrillic-to-Latin transliteration table. Multi-character mappings (e.g.
/// `щ -> shch`) are why this is a lookup rather than a 1:1 `char` map.
fn transliteration_table() -> &'static std::collections::HashMap<char, &'static str> {
    static TABLE: OnceLock<std::collections::HashMap<char, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            ('а', "a"), ('б', "b"), ('в', "v"), ('г', "g"), ('ґ', "g"), ('д', "d"),
            ('е', "e"), ('ё', "e"), ('є', "ye"), ('ж', "zh"), ('з', "z"), ('и', "i"),
            ('і', "i"), ('ї', "yi"), ('й', "i"), ('к', "k"), ('л', "l"), ('м', "m"),
            ('н', "n"), ('о', "o"), ('п', "p"), ('р', "r"), ('с', "s"), ('т', "t"),
            ('у', "u"), ('ф', "f"), ('х', "h"), ('ц', "ts"), ('ч', "ch"), ('ш', "sh"),
            ('щ', "shch"), ('ъ', ""), ('ы', "y"), ('ь', ""), ('э', "e"), ('ю', "yu"),
            ('я', "ya"),
        ]
        .into_iter()
        .collect()
    })
}

fn transliterate(value: &str) -> String {
    let table = transliteration_table();
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match table.get(&c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

/// Lowercase → transliterate → strip combining marks (NFKD) → collapse
/// non-alphanumerics to single spaces → trim.
#[must_use]
pub fn canonical_slug(text: &str) -> String {
    let lowered = text.to_lowercase();
    let transliterated = transliterate(&lowered);
    let stripped: String = transliterated.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    let mut cleaned = String::with_capacity(stripped.len());
    let mut last_was_space = false;
    for ch in stripped.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch);
            last_was_space = false;
        } else if !last_was_space {
            cleaned.push(' ');
            last_was_space = true;
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

/// Strips spaces and vowels (`a,e,i,o,u,y`) from a slug, for coarse
/// typo-tolerant matching.
#[must_use]
pub fn skeleton(slug: &str) -> String {
    slug.chars().filter(|c| *c != ' ' && !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y')).collect()
}

/// The slug with internal spaces removed, used for exact-match-after-drop
/// comparisons distinct from the skeleton's vowel stripping.
#[must_use]
pub fn translit(slug: &str) -> String {
    slug.chars().filter(|c| *c != ' ').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transliterates_cyrillic_month_to_latin_slug() {
        assert_eq!(canonical_slug("місяць"), "misyats");
    }

    #[test]
    fn collapses_punctuation_and_whitespace() {
        assert_eq!(canonical_slug("  City__Name!! "), "city name");
    }

    #[test]
    fn skeleton_drops_vowels_and_spaces() {
        assert_eq!(skeleton("city name"), "ctynm");
    }

    #[test]
    fn translit_drops_only_spaces() {
        assert_eq!(translit("city name"), "cityname");
    }
}

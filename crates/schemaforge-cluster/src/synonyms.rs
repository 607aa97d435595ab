//! Default cross-language synonym sets and the slug -> canonical-slug map
//! built from them.

use std::collections::HashMap;

use crate::slug::canonical_slug;

/// Each inner slice is a synonym group; the first entry whose slug is
/// non-empty becomes that group's canonical slug.
pub const DEFAULT_SYNONYM_SETS: &[&[&str]] = &[
    &["month", "months", "mon", "mth", "місяць", "міс"],
    &["city", "city_name", "town", "місто"],
    &["age", "years", "yrs"],
];

/// Builds a `slug -> canonical_slug` map from synonym groups, skipping
/// tokens whose [`canonical_slug`] is empty.
#[must_use]
pub fn build_synonym_map(synonym_sets: &[&[&str]]) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    for group in synonym_sets {
        let mut canonical: Option<String> = None;
        for token in *group {
            let slug = canonical_slug(token);
            if slug.is_empty() {
                continue;
            }
            let canonical_slug_value = canonical.get_or_insert_with(|| slug.clone());
            mapping.insert(slug, canonical_slug_value.clone());
        }
    }
    mapping
}

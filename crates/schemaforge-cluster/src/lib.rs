//! C7: header clustering. Normalizes raw header text (transliteration,
//! slugging), links variants across files via synonym sets and
//! Ratcliff/Obershelp similarity, and synthesizes canonical clusters with
//! a confidence score and a review flag.

pub mod clusterizer;
pub mod gestalt;
pub mod schema_builder;
pub mod slug;
pub mod synonyms;
pub mod union_find;

pub use clusterizer::build;
pub use gestalt::ratio;
pub use schema_builder::bootstrap_schemas;
pub use slug::{canonical_slug, skeleton, translit};
pub use synonyms::{build_synonym_map, DEFAULT_SYNONYM_SETS};

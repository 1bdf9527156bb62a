//! Tag vocabulary records and the preset-overlay merge.
//!
//! The base vocabulary is parsed elsewhere and handed to us as an
//! ordered list of [`TagRecord`]s (already sorted by usage count).
//! Completion never reads the base list directly: it reads the merged
//! dictionary produced by [`TagDictionary::merge`], where preset
//! overlays replace same-named base tags.

use indexmap::IndexMap;
use serde::Deserialize;

/// Danbooru-style tag category. Stored as the numeric code the
/// vocabulary files use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "u8")]
pub enum TagCategory {
  General,
  Artist,
  Unused,
  Copyright,
  Character,
  Meta,
}

impl From<u8> for TagCategory {
  fn from(code: u8) -> Self {
    match code {
      1 => TagCategory::Artist,
      2 => TagCategory::Unused,
      3 => TagCategory::Copyright,
      4 => TagCategory::Character,
      5 => TagCategory::Meta,
      _ => TagCategory::General,
    }
  }
}

impl TagCategory {
  /// Short parenthesized label shown next to a candidate, or `None`
  /// for categories that render without one.
  pub fn label(self) -> Option<&'static str> {
    match self {
      TagCategory::Artist => Some("(artist)"),
      TagCategory::Copyright => Some("(copyright)"),
      TagCategory::Character => Some("(character)"),
      TagCategory::Meta => Some("(meta)"),
      TagCategory::General | TagCategory::Unused => None,
    }
  }
}

/// A single completable vocabulary entry.
///
/// Names are case-insensitive; the canonical storage form uses
/// underscores for spaces. `alias_of` being `Some` marks the record as
/// an alias whose target names another record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TagRecord {
  pub name:        String,
  pub category:    TagCategory,
  #[serde(rename = "count")]
  pub usage_count: u64,
  #[serde(default)]
  pub alias_of:    Option<String>,
}

impl TagRecord {
  pub fn is_alias(&self) -> bool {
    self.alias_of.is_some()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetKind {
  Character,
  Tag,
}

/// A preset overlay entry. `name` is normalized like any tag;
/// `source_name` preserves the original casing/punctuation because the
/// image endpoint is keyed by it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PresetRecord {
  pub name:        String,
  pub category:    TagCategory,
  #[serde(rename = "count")]
  pub usage_count: u64,
  pub kind:        PresetKind,
  pub source_name: String,
  #[serde(default)]
  pub has_image:   bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoraRecord {
  pub name:        String,
  pub file_path:   String,
  #[serde(default)]
  pub has_preview: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmbeddingRecord {
  pub name:        String,
  pub file_path:   String,
  #[serde(default)]
  pub has_preview: bool,
}

/// Canonical lookup form: lowercase, spaces become underscores.
pub fn normalize(name: &str) -> String {
  name.trim().to_lowercase().replace(' ', "_")
}

/// Display form: underscores become spaces.
pub fn display_form(name: &str) -> String {
  name.replace('_', " ")
}

/// One entry of the merged dictionary: either a base vocabulary tag or
/// the preset that replaced it.
#[derive(Debug, Clone, PartialEq)]
pub enum DictEntry {
  Tag(TagRecord),
  Preset(PresetRecord),
}

impl DictEntry {
  pub fn usage_count(&self) -> u64 {
    match self {
      DictEntry::Tag(tag) => tag.usage_count,
      DictEntry::Preset(preset) => preset.usage_count,
    }
  }

  pub fn is_preset(&self) -> bool {
    matches!(self, DictEntry::Preset(_))
  }

  pub fn alias_of(&self) -> Option<&str> {
    match self {
      DictEntry::Tag(tag) => tag.alias_of.as_deref(),
      DictEntry::Preset(_) => None,
    }
  }
}

/// The merged, order-preserving completion dictionary.
///
/// Built once after the sources load and immutable afterwards. Preset
/// overlays are applied tag presets first, character presets second,
/// so when both target the same key the character preset is the one
/// completion sees. Replacing a key keeps its original position, which
/// is what makes ranking ties deterministic.
#[derive(Debug, Default, Clone)]
pub struct TagDictionary {
  entries: IndexMap<String, DictEntry>,
}

impl TagDictionary {
  pub fn merge(
    base: &[TagRecord],
    tag_presets: &[PresetRecord],
    character_presets: &[PresetRecord],
  ) -> Self {
    let mut entries: IndexMap<String, DictEntry> = IndexMap::with_capacity(base.len());

    for tag in base {
      // Base-over-base collisions keep the first record; the
      // vocabulary arrives sorted by count so the first is the
      // heaviest.
      entries
        .entry(normalize(&tag.name))
        .or_insert_with(|| DictEntry::Tag(tag.clone()));
    }

    for preset in tag_presets.iter().chain(character_presets) {
      entries.insert(normalize(&preset.name), DictEntry::Preset(preset.clone()));
    }

    TagDictionary { entries }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn get(&self, normalized_key: &str) -> Option<&DictEntry> {
    self.entries.get(normalized_key)
  }

  /// Iterate `(normalized_key, entry)` in merge order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &DictEntry)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v))
  }
}

//! Candidate resolution: filter, alias suppression, ranking, cap.
//!
//! The resolver is a pure projection from a detected context plus the
//! loaded sources to the ranked list the dropdown renders. An empty
//! result means the caller must close the dropdown rather than render
//! an empty one.

use std::{
  cmp::Reverse,
  collections::HashSet,
  fmt,
};

use super::{
  context::{
    CompletionContext,
    ContextKind,
  },
  dictionary::{
    DictEntry,
    EmbeddingRecord,
    LoraRecord,
    PresetKind,
    TagCategory,
    TagDictionary,
    display_form,
    normalize,
  },
};

/// Hard cap on rendered candidates per query.
pub const MAX_CANDIDATES: usize = 10;

/// What kind of source a ranked candidate came from. The renderer and
/// the preview scheduler branch on this explicitly instead of probing
/// for optional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
  Tag,
  Alias,
  Preset(PresetKind),
  Lora,
  Embedding,
}

/// Identity of a preview image: which endpoint family serves it plus
/// the identifier that endpoint is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreviewKey {
  Character(String),
  Lora(String),
  Embedding(String),
}

impl fmt::Display for PreviewKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PreviewKey::Character(name) => write!(f, "character:{name}"),
      PreviewKey::Lora(name) => write!(f, "lora:{name}"),
      PreviewKey::Embedding(name) => write!(f, "embedding:{name}"),
    }
  }
}

/// Display projection of a dictionary/lora/embedding record, ready
/// for the dropdown.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
  /// Space-separated form shown in the dropdown row.
  pub display_text:     String,
  /// What commit actually splices in (the alias target for aliases).
  pub insert_value:     String,
  pub kind:             CandidateKind,
  /// Display form of the alias target, for `alias -> target` rows.
  pub alias_of_display: Option<String>,
  pub category:         Option<TagCategory>,
  pub usage_count:      u64,
  pub preview:          Option<PreviewKey>,
}

impl RankedCandidate {
  pub fn is_alias(&self) -> bool {
    self.kind == CandidateKind::Alias
  }

  pub fn is_preset(&self) -> bool {
    matches!(self.kind, CandidateKind::Preset(_))
  }
}

/// Preference snapshot the resolver consults. Mirrors the two durable
/// booleans plus the preset grouping toggle.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
  pub hide_aliases_with_main: bool,
  pub presets_first:          bool,
}

impl Default for ResolveOptions {
  fn default() -> Self {
    ResolveOptions {
      hide_aliases_with_main: true,
      presets_first:          true,
    }
  }
}

/// Resolve the ranked candidate set for a detected context.
pub fn resolve_candidates(
  context: &CompletionContext,
  dictionary: &TagDictionary,
  loras: &[LoraRecord],
  embeddings: &[EmbeddingRecord],
  options: ResolveOptions,
) -> Vec<RankedCandidate> {
  match context.kind {
    ContextKind::Lora => resolve_flat(&context.search_term, loras, |record| {
      RankedCandidate {
        display_text:     record.name.clone(),
        insert_value:     record.name.clone(),
        kind:             CandidateKind::Lora,
        alias_of_display: None,
        category:         None,
        usage_count:      0,
        preview:          record
          .has_preview
          .then(|| PreviewKey::Lora(record.name.clone())),
      }
    }),
    ContextKind::Embedding => resolve_flat(&context.search_term, embeddings, |record| {
      RankedCandidate {
        display_text:     record.name.clone(),
        insert_value:     record.name.clone(),
        kind:             CandidateKind::Embedding,
        alias_of_display: None,
        category:         None,
        usage_count:      0,
        preview:          record
          .has_preview
          .then(|| PreviewKey::Embedding(record.name.clone())),
      }
    }),
    ContextKind::Tag => resolve_tags(&context.search_term, dictionary, options),
  }
}

trait NamedRecord {
  fn name(&self) -> &str;
}

impl NamedRecord for LoraRecord {
  fn name(&self) -> &str {
    &self.name
  }
}

impl NamedRecord for EmbeddingRecord {
  fn name(&self) -> &str {
    &self.name
  }
}

/// Lora/embedding resolution: case-insensitive substring, empty term
/// matches everything, source order is the tiebreak (there is no
/// usage count to sort by).
fn resolve_flat<R: NamedRecord>(
  search_term: &str,
  records: &[R],
  project: impl Fn(&R) -> RankedCandidate,
) -> Vec<RankedCandidate> {
  let needle = search_term.to_lowercase();
  records
    .iter()
    .filter(|record| needle.is_empty() || record.name().to_lowercase().contains(&needle))
    .take(MAX_CANDIDATES)
    .map(|record| project(record))
    .collect()
}

fn resolve_tags(
  search_term: &str,
  dictionary: &TagDictionary,
  options: ResolveOptions,
) -> Vec<RankedCandidate> {
  let needle = normalize(search_term);

  let filtered: Vec<(&str, &DictEntry)> = dictionary
    .iter()
    .filter(|(key, _)| key.contains(needle.as_str()))
    .collect();

  // Normalized keys of the non-alias matches, for alias suppression.
  let main_keys: HashSet<&str> = filtered
    .iter()
    .filter(|(_, entry)| entry.alias_of().is_none())
    .map(|(key, _)| *key)
    .collect();

  let mut candidates: Vec<RankedCandidate> = filtered
    .iter()
    .filter(|(key, entry)| {
      let Some(target) = entry.alias_of() else {
        return true;
      };
      if !options.hide_aliases_with_main {
        return true;
      }
      let target_key = normalize(target);
      if !main_keys.contains(target_key.as_str()) {
        return true;
      }
      // The escape hatch: keep the alias only when the user is
      // specifically typing the alias spelling and the main tag does
      // not itself start with the term.
      key.starts_with(needle.as_str()) && !target_key.starts_with(needle.as_str())
    })
    .map(|(_, entry)| project_tag_entry(entry))
    .collect();

  // Stable sort: ties keep dictionary merge order.
  if options.presets_first {
    candidates.sort_by_key(|c| (!c.is_preset(), Reverse(c.usage_count)));
  } else {
    candidates.sort_by_key(|c| Reverse(c.usage_count));
  }

  candidates.truncate(MAX_CANDIDATES);
  candidates
}

fn project_tag_entry(entry: &DictEntry) -> RankedCandidate {
  match entry {
    DictEntry::Tag(tag) => {
      let display = display_form(&tag.name);
      match &tag.alias_of {
        Some(target) => {
          let target_display = display_form(target);
          RankedCandidate {
            display_text:     display,
            insert_value:     target_display.clone(),
            kind:             CandidateKind::Alias,
            alias_of_display: Some(target_display),
            category:         Some(tag.category),
            usage_count:      tag.usage_count,
            preview:          None,
          }
        },
        None => {
          RankedCandidate {
            display_text:     display.clone(),
            insert_value:     display,
            kind:             CandidateKind::Tag,
            alias_of_display: None,
            category:         Some(tag.category),
            usage_count:      tag.usage_count,
            preview:          None,
          }
        },
      }
    },
    DictEntry::Preset(preset) => {
      let display = display_form(&preset.name);
      // Only character presets have an image endpoint; the key is the
      // original source name, not the normalized tag.
      let preview = (preset.kind == PresetKind::Character && preset.has_image)
        .then(|| PreviewKey::Character(preset.source_name.clone()));
      RankedCandidate {
        display_text: display.clone(),
        insert_value: display,
        kind: CandidateKind::Preset(preset.kind),
        alias_of_display: None,
        category: Some(preset.category),
        usage_count: preset.usage_count,
        preview,
      }
    },
  }
}

#[cfg(test)]
mod test {
  use quickcheck::quickcheck;

  use super::*;
  use crate::core::dictionary::{
    PresetRecord,
    TagRecord,
  };

  fn tag(name: &str, count: u64) -> TagRecord {
    TagRecord {
      name:        name.to_string(),
      category:    TagCategory::General,
      usage_count: count,
      alias_of:    None,
    }
  }

  fn alias(name: &str, count: u64, target: &str) -> TagRecord {
    TagRecord {
      name:        name.to_string(),
      category:    TagCategory::General,
      usage_count: count,
      alias_of:    Some(target.to_string()),
    }
  }

  fn character_preset(name: &str, count: u64, has_image: bool) -> PresetRecord {
    PresetRecord {
      name: normalize(name),
      category: TagCategory::Character,
      usage_count: count,
      kind: PresetKind::Character,
      source_name: name.to_string(),
      has_image,
    }
  }

  fn tag_ctx(term: &str) -> CompletionContext {
    CompletionContext {
      kind:        ContextKind::Tag,
      search_term: term.to_string(),
      span_start:  0,
      span_end:    Some(term.chars().count()),
    }
  }

  fn resolve_dict(dict: &TagDictionary, term: &str, options: ResolveOptions) -> Vec<String> {
    resolve_candidates(&tag_ctx(term), dict, &[], &[], options)
      .into_iter()
      .map(|c| c.display_text)
      .collect()
  }

  #[test]
  fn usage_count_ranking() {
    let base = [tag("cat_ears", 50), tag("cat", 200), tag("black_cat", 10)];
    let dict = TagDictionary::merge(&base, &[], &[]);
    let options = ResolveOptions {
      presets_first: false,
      ..Default::default()
    };
    assert_eq!(resolve_dict(&dict, "cat", options), [
      "cat",
      "cat ears",
      "black cat"
    ]);
  }

  #[test]
  fn ranking_is_deterministic() {
    let base = [tag("cat_ears", 50), tag("cat", 200), tag("black_cat", 10)];
    let dict = TagDictionary::merge(&base, &[], &[]);
    let first = resolve_dict(&dict, "cat", ResolveOptions::default());
    for _ in 0..5 {
      assert_eq!(resolve_dict(&dict, "cat", ResolveOptions::default()), first);
    }
  }

  #[test]
  fn ties_keep_merge_order() {
    let base = [tag("cat_tail", 50), tag("cat_ears", 50), tag("catnip", 50)];
    let dict = TagDictionary::merge(&base, &[], &[]);
    assert_eq!(
      resolve_dict(&dict, "cat", ResolveOptions::default()),
      ["cat tail", "cat ears", "catnip"]
    );
  }

  #[test]
  fn alias_suppressed_when_main_matches_too() {
    let base = [tag("black_hair", 100), alias("blackh", 100, "black_hair")];
    let dict = TagDictionary::merge(&base, &[], &[]);
    let names = resolve_dict(&dict, "black", ResolveOptions::default());
    assert_eq!(names, ["black hair"]);
  }

  #[test]
  fn alias_kept_when_typing_the_alias_spelling() {
    let base = [tag("black_hair", 100), alias("blackh", 100, "black_hair")];
    let dict = TagDictionary::merge(&base, &[], &[]);
    // "blackh" is not a substring of "black_hair", so only the alias
    // matches; it must survive even with suppression on.
    let names = resolve_dict(&dict, "blackh", ResolveOptions::default());
    assert_eq!(names, ["blackh"]);
  }

  #[test]
  fn alias_escape_hatch_requires_main_not_to_start_with_term() {
    // Both the alias and the main tag start with the term, so the
    // escape hatch does not apply and the alias is dropped.
    let base = [tag("blackhole", 10), alias("blackh", 5, "blackhole")];
    let dict = TagDictionary::merge(&base, &[], &[]);
    let names = resolve_dict(&dict, "blackh", ResolveOptions::default());
    assert_eq!(names, ["blackhole"]);
  }

  #[test]
  fn alias_survives_when_suppression_is_off() {
    let base = [tag("black_hair", 100), alias("blackh", 100, "black_hair")];
    let dict = TagDictionary::merge(&base, &[], &[]);
    let options = ResolveOptions {
      hide_aliases_with_main: false,
      presets_first:          false,
    };
    let names = resolve_dict(&dict, "black", options);
    assert_eq!(names, ["black hair", "blackh"]);
  }

  #[test]
  fn alias_insert_value_is_the_target() {
    let base = [alias("blackh", 100, "black_hair")];
    let dict = TagDictionary::merge(&base, &[], &[]);
    let candidates = resolve_candidates(
      &tag_ctx("blackh"),
      &dict,
      &[],
      &[],
      ResolveOptions::default(),
    );
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].display_text, "blackh");
    assert_eq!(candidates[0].insert_value, "black hair");
    assert_eq!(
      candidates[0].alias_of_display.as_deref(),
      Some("black hair")
    );
    assert!(candidates[0].is_alias());
  }

  #[test]
  fn presets_sort_before_tags_when_enabled() {
    let base = [tag("miku_hatsune", 900), tag("miku_day", 800)];
    let presets = [character_preset("Miku", 5, true)];
    let dict = TagDictionary::merge(&base, &[], &presets);
    let names = resolve_dict(&dict, "miku", ResolveOptions::default());
    assert_eq!(names, ["miku", "miku hatsune", "miku day"]);

    let options = ResolveOptions {
      presets_first: false,
      ..Default::default()
    };
    let names = resolve_dict(&dict, "miku", options);
    assert_eq!(names, ["miku hatsune", "miku day", "miku"]);
  }

  #[test]
  fn character_preset_with_image_carries_a_preview_key() {
    let presets = [character_preset("Hatsune Miku", 5, true)];
    let dict = TagDictionary::merge(&[], &[], &presets);
    let candidates = resolve_candidates(
      &tag_ctx("miku"),
      &dict,
      &[],
      &[],
      ResolveOptions::default(),
    );
    assert_eq!(
      candidates[0].preview,
      Some(PreviewKey::Character("Hatsune Miku".to_string()))
    );

    let plain = [character_preset("No Image", 5, false)];
    let dict = TagDictionary::merge(&[], &[], &plain);
    let candidates = resolve_candidates(
      &tag_ctx("image"),
      &dict,
      &[],
      &[],
      ResolveOptions::default(),
    );
    assert_eq!(candidates[0].preview, None);
  }

  #[test]
  fn results_are_capped() {
    let base: Vec<TagRecord> = (0..40).map(|i| tag(&format!("cat_{i}"), i)).collect();
    let dict = TagDictionary::merge(&base, &[], &[]);
    let names = resolve_dict(&dict, "cat", ResolveOptions::default());
    assert_eq!(names.len(), MAX_CANDIDATES);
    // Highest counts first.
    assert_eq!(names[0], "cat 39");
  }

  #[test]
  fn search_with_spaces_matches_underscored_names() {
    let base = [tag("black_hair", 100)];
    let dict = TagDictionary::merge(&base, &[], &[]);
    let names = resolve_dict(&dict, "black ha", ResolveOptions::default());
    assert_eq!(names, ["black hair"]);
  }

  #[test]
  fn empty_lora_term_matches_everything_up_to_cap() {
    let loras: Vec<LoraRecord> = (0..15)
      .map(|i| {
        LoraRecord {
          name:        format!("lora_{i}"),
          file_path:   format!("loras/lora_{i}.safetensors"),
          has_preview: false,
        }
      })
      .collect();
    let ctx = CompletionContext {
      kind:        ContextKind::Lora,
      search_term: String::new(),
      span_start:  6,
      span_end:    None,
    };
    let candidates = resolve_candidates(
      &ctx,
      &TagDictionary::default(),
      &loras,
      &[],
      ResolveOptions::default(),
    );
    assert_eq!(candidates.len(), MAX_CANDIDATES);
    // Source order is preserved.
    assert_eq!(candidates[0].display_text, "lora_0");
  }

  #[test]
  fn lora_match_is_case_insensitive() {
    let loras = [LoraRecord {
      name:        "DetailTweaker".to_string(),
      file_path:   "loras/detail.safetensors".to_string(),
      has_preview: true,
    }];
    let ctx = CompletionContext {
      kind:        ContextKind::Lora,
      search_term: "detail".to_string(),
      span_start:  6,
      span_end:    None,
    };
    let candidates = resolve_candidates(
      &ctx,
      &TagDictionary::default(),
      &loras,
      &[],
      ResolveOptions::default(),
    );
    assert_eq!(candidates.len(), 1);
    assert_eq!(
      candidates[0].preview,
      Some(PreviewKey::Lora("DetailTweaker".to_string()))
    );
  }

  #[test]
  fn empty_sources_resolve_to_nothing() {
    let candidates = resolve_candidates(
      &tag_ctx("anything"),
      &TagDictionary::default(),
      &[],
      &[],
      ResolveOptions::default(),
    );
    assert!(candidates.is_empty());
  }

  quickcheck! {
    /// Every returned tag candidate's normalized key contains the
    /// normalized search term.
    fn tag_results_contain_the_term(names: Vec<String>, term: String) -> bool {
      let base: Vec<TagRecord> = names
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| tag(n, 1))
        .collect();
      let dict = TagDictionary::merge(&base, &[], &[]);
      let needle = normalize(&term);
      resolve_candidates(
        &tag_ctx(&term),
        &dict,
        &[],
        &[],
        ResolveOptions::default(),
      )
      .iter()
      .all(|c| normalize(&c.display_text).contains(needle.as_str()))
    }
  }
}

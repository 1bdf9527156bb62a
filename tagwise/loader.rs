//! Source loading and publication.
//!
//! All five source lists load concurrently; a missing or malformed
//! file degrades to an empty list with a warning instead of failing
//! the whole load. The merged result is published through an
//! [`ArcSwap`] so completion reads a consistent snapshot at all times,
//! including the empty one before the first load finishes.

use std::{
  collections::HashMap,
  path::{
    Path,
    PathBuf,
  },
  sync::Arc,
};

use arc_swap::ArcSwap;
use serde::{
  Deserialize,
  de::DeserializeOwned,
};
use thiserror::Error;

use crate::core::dictionary::{
  EmbeddingRecord,
  LoraRecord,
  PresetKind,
  PresetRecord,
  TagCategory,
  TagDictionary,
  TagRecord,
  normalize,
};

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("failed to read {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("failed to parse {path}: {source}")]
  Parse {
    path:   PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// One entry of the vocabulary export. Aliases ride along on the main
/// record and get expanded into standalone alias records on load.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVocabularyEntry {
  pub name:        String,
  pub category:    TagCategory,
  #[serde(rename = "count")]
  pub usage_count: u64,
  #[serde(default)]
  pub aliases:     Vec<String>,
}

/// One entry of a preset file. Category and usage count are not
/// stored here; they are inherited from the vocabulary when it knows
/// the name.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPreset {
  pub name:      String,
  #[serde(default)]
  pub has_image: bool,
}

/// Everything completion resolves against, as one immutable snapshot.
#[derive(Debug, Default)]
pub struct CompletionSources {
  pub dictionary: TagDictionary,
  pub loras:      Vec<LoraRecord>,
  pub embeddings: Vec<EmbeddingRecord>,
}

/// Swappable handle shared between the loader and every resolver call.
pub type SharedSources = Arc<ArcSwap<CompletionSources>>;

/// A handle that resolves to nothing until a load publishes into it.
pub fn empty_sources() -> SharedSources {
  Arc::new(ArcSwap::from_pointee(CompletionSources::default()))
}

/// Paths to the five source files. Any of them may be absent.
#[derive(Debug, Default, Clone)]
pub struct SourcePaths {
  pub vocabulary:        Option<PathBuf>,
  pub tag_presets:       Option<PathBuf>,
  pub character_presets: Option<PathBuf>,
  pub loras:             Option<PathBuf>,
  pub embeddings:        Option<PathBuf>,
}

/// Expand the raw vocabulary into completable records: skip unused
/// tags, flatten aliases into records of their own, and sort by usage
/// count so downstream first-wins collision handling keeps the
/// heaviest record.
pub fn prepare_vocabulary(raw: Vec<RawVocabularyEntry>) -> Vec<TagRecord> {
  let mut records = Vec::with_capacity(raw.len());
  for entry in raw {
    if entry.category == TagCategory::Unused {
      continue;
    }
    let main_key = normalize(&entry.name);
    for alias in &entry.aliases {
      records.push(TagRecord {
        name:        normalize(alias),
        category:    entry.category,
        usage_count: entry.usage_count,
        alias_of:    Some(main_key.clone()),
      });
    }
    records.push(TagRecord {
      name:        main_key,
      category:    entry.category,
      usage_count: entry.usage_count,
      alias_of:    None,
    });
  }
  // Stable, so same-count records keep file order.
  records.sort_by_key(|record| std::cmp::Reverse(record.usage_count));
  records
}

/// Turn raw preset names into overlay records, inheriting category and
/// usage count from the vocabulary where it knows the name. Unknown
/// names default per kind: character presets are characters, tag
/// presets are general tags, both at count zero.
pub fn prepare_presets(
  raw: Vec<RawPreset>,
  kind: PresetKind,
  vocabulary: &[TagRecord],
) -> Vec<PresetRecord> {
  let by_key: HashMap<&str, &TagRecord> = vocabulary
    .iter()
    .map(|record| (record.name.as_str(), record))
    .collect();

  raw
    .into_iter()
    .map(|preset| {
      let key = normalize(&preset.name);
      let (category, usage_count) = match by_key.get(key.as_str()) {
        Some(record) => (record.category, record.usage_count),
        None => {
          let category = match kind {
            PresetKind::Character => TagCategory::Character,
            PresetKind::Tag => TagCategory::General,
          };
          (category, 0)
        },
      };
      PresetRecord {
        name: key,
        category,
        usage_count,
        kind,
        source_name: preset.name,
        has_image: preset.has_image,
      }
    })
    .collect()
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
  let bytes = tokio::fs::read(path).await.map_err(|source| {
    LoadError::Io {
      path: path.to_owned(),
      source,
    }
  })?;
  serde_json::from_slice(&bytes).map_err(|source| {
    LoadError::Parse {
      path: path.to_owned(),
      source,
    }
  })
}

async fn load_list<T: DeserializeOwned>(path: Option<&PathBuf>, what: &str) -> Vec<T> {
  let Some(path) = path else {
    return Vec::new();
  };
  match read_json(path).await {
    Ok(list) => list,
    Err(err) => {
      log::warn!("skipping {what}: {err}");
      Vec::new()
    },
  }
}

/// Load every configured source file concurrently and build the
/// merged snapshot.
pub async fn load_sources(paths: &SourcePaths) -> CompletionSources {
  let (raw_vocabulary, raw_tag_presets, raw_character_presets, loras, embeddings) = tokio::join!(
    load_list::<RawVocabularyEntry>(paths.vocabulary.as_ref(), "vocabulary"),
    load_list::<RawPreset>(paths.tag_presets.as_ref(), "tag presets"),
    load_list::<RawPreset>(paths.character_presets.as_ref(), "character presets"),
    load_list::<LoraRecord>(paths.loras.as_ref(), "loras"),
    load_list::<EmbeddingRecord>(paths.embeddings.as_ref(), "embeddings"),
  );

  let vocabulary = prepare_vocabulary(raw_vocabulary);
  let tag_presets = prepare_presets(raw_tag_presets, PresetKind::Tag, &vocabulary);
  let character_presets =
    prepare_presets(raw_character_presets, PresetKind::Character, &vocabulary);

  log::info!(
    "loaded {} vocabulary records, {} tag presets, {} character presets, {} loras, {} embeddings",
    vocabulary.len(),
    tag_presets.len(),
    character_presets.len(),
    loras.len(),
    embeddings.len()
  );

  CompletionSources {
    dictionary: TagDictionary::merge(&vocabulary, &tag_presets, &character_presets),
    loras,
    embeddings,
  }
}

/// Load and atomically publish. Resolver calls racing this see either
/// the previous snapshot or the new one, never a half-built state.
pub async fn load_and_publish(shared: &SharedSources, paths: &SourcePaths) {
  let sources = load_sources(paths).await;
  shared.store(Arc::new(sources));
}

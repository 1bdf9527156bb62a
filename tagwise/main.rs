use std::path::PathBuf;

use anyhow::{
  Context,
  bail,
};
use clap::Parser;

use tagwise::{
  config::Preferences,
  core::{
    context::detect_context,
    insert::commit_candidate,
    resolver::{
      ResolveOptions,
      resolve_candidates,
    },
  },
  loader::{
    self,
    SourcePaths,
  },
};

/// Resolve completions for a prompt snippet and print them.
#[derive(Debug, Parser)]
#[command(name = "tagwise", version)]
struct Args {
  /// Prompt text with a `|` marking the cursor.
  prompt: String,

  /// Vocabulary JSON file.
  #[arg(long)]
  vocabulary: Option<PathBuf>,

  /// Tag preset JSON file.
  #[arg(long)]
  tag_presets: Option<PathBuf>,

  /// Character preset JSON file.
  #[arg(long)]
  character_presets: Option<PathBuf>,

  /// Lora list JSON file.
  #[arg(long)]
  loras: Option<PathBuf>,

  /// Embedding list JSON file.
  #[arg(long)]
  embeddings: Option<PathBuf>,

  /// Preferences TOML file.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Increase log verbosity (repeatable).
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn setup_logging(verbosity: u8) -> anyhow::Result<()> {
  let level = match verbosity {
    0 => log::LevelFilter::Warn,
    1 => log::LevelFilter::Info,
    2 => log::LevelFilter::Debug,
    _ => log::LevelFilter::Trace,
  };
  fern::Dispatch::new()
    .format(|out, message, record| {
      out.finish(format_args!(
        "{} [{}] {}: {}",
        chrono::Local::now().format("%H:%M:%S%.3f"),
        record.level(),
        record.target(),
        message
      ))
    })
    .level(level)
    .chain(std::io::stderr())
    .apply()?;
  Ok(())
}

/// Split the prompt at its `|` cursor marker, returning the text
/// without the marker and the cursor's character offset.
fn split_cursor(prompt: &str) -> anyhow::Result<(String, usize)> {
  let Some(cursor) = prompt.chars().position(|c| c == '|') else {
    bail!("prompt must contain a `|` cursor marker");
  };
  let text: String = prompt.chars().filter(|&c| c != '|').collect();
  Ok((text, cursor))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let args = Args::parse();
  setup_logging(args.verbose)?;

  let (text, cursor) = split_cursor(&args.prompt)?;

  let preferences = match &args.config {
    Some(path) => {
      Preferences::load(path).with_context(|| format!("loading {}", path.display()))?
    },
    None => Preferences::default(),
  };

  let shared = loader::empty_sources();
  let paths = SourcePaths {
    vocabulary:        args.vocabulary,
    tag_presets:       args.tag_presets,
    character_presets: args.character_presets,
    loras:             args.loras,
    embeddings:        args.embeddings,
  };
  loader::load_and_publish(&shared, &paths).await;
  let sources = shared.load();

  let Some(context) = detect_context(&text, cursor) else {
    println!("no completion context at the cursor");
    return Ok(());
  };
  println!(
    "{:?} completion for {:?} (span {}..{:?})",
    context.kind, context.search_term, context.span_start, context.span_end
  );

  let options = ResolveOptions {
    hide_aliases_with_main: preferences.hide_aliases_with_main,
    presets_first:          preferences.presets_first,
  };
  let candidates = resolve_candidates(
    &context,
    &sources.dictionary,
    &sources.loras,
    &sources.embeddings,
    options,
  );
  if candidates.is_empty() {
    println!("no candidates");
    return Ok(());
  }

  for (index, candidate) in candidates.iter().enumerate() {
    let mut line = format!("{:2}. {}", index + 1, candidate.display_text);
    if let Some(target) = &candidate.alias_of_display {
      line.push_str(&format!(" -> {target}"));
    }
    if let Some(label) = candidate.category.and_then(|c| c.label()) {
      line.push_str(&format!(" {label}"));
    }
    if candidate.usage_count > 0 {
      line.push_str(&format!("  [{}]", candidate.usage_count));
    }
    if let Some(preview) = &candidate.preview {
      line.push_str(&format!("  (preview {preview})"));
    }
    println!("{line}");
  }

  if let Some(insertion) = commit_candidate(
    &text,
    cursor,
    &context,
    &candidates[0].insert_value,
    preferences.insert_comma,
  ) {
    let mut shown: String = insertion.text.chars().take(insertion.cursor).collect();
    shown.push('|');
    shown.extend(insertion.text.chars().skip(insertion.cursor));
    println!("\ncommitting the top candidate yields: {shown}");
  }

  Ok(())
}

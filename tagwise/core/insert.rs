//! The insertion engine: committing a candidate into the text buffer.
//!
//! Each context kind has its own splice rule. The input offsets are
//! char offsets; conversion to byte indices happens inside the splice
//! helpers. A commit that cannot find its expected prefix token (the
//! text changed out from under a stale context) returns `None` and
//! the caller closes the dropdown - this path never panics.

use super::context::{
  CompletionContext,
  ContextKind,
  rfind_token,
};

/// Fixed suffix completing a lora reference at its default weight.
const LORA_SUFFIX: &str = ":1.0>";

const LORA_PREFIX: &str = "<lora:";
const EMBEDDING_PREFIX: &str = "embedding:";

/// Result of a committed completion: the rewritten buffer and the new
/// cursor (char offset). The caller is responsible for refocusing the
/// input element after applying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
  pub text:   String,
  pub cursor: usize,
}

/// Splice `insert_value` into `text` according to the context's
/// syntax rules.
pub fn commit_candidate(
  text: &str,
  cursor: usize,
  context: &CompletionContext,
  insert_value: &str,
  insert_comma: bool,
) -> Option<Insertion> {
  let chars: Vec<char> = text.chars().collect();
  let cursor = cursor.min(chars.len());

  match context.kind {
    ContextKind::Tag => Some(commit_tag(&chars, context, insert_value, insert_comma)),
    ContextKind::Lora => commit_lora(&chars, cursor, insert_value),
    ContextKind::Embedding => commit_embedding(&chars, cursor, insert_value, insert_comma),
  }
}

/// Replace the tag span with the escaped value. Parens are escaped so
/// the committed tag survives downstream weight-syntax parsing.
fn commit_tag(
  chars: &[char],
  context: &CompletionContext,
  insert_value: &str,
  insert_comma: bool,
) -> Insertion {
  let escaped = escape_parens(insert_value);
  let suffix = if insert_comma { ", " } else { "" };

  let start = context.span_start.min(chars.len());
  let end = context.span_end.unwrap_or(start).clamp(start, chars.len());

  let text = splice(chars, start, end, &format!("{escaped}{suffix}"));
  let cursor = start + escaped.chars().count() + suffix.len();
  Insertion { text, cursor }
}

/// Rewrite the `<lora:...>` reference around the cursor. No trailing
/// comma regardless of preference - lora tags are not comma-delimited.
fn commit_lora(chars: &[char], cursor: usize, insert_value: &str) -> Option<Insertion> {
  let prefix_end = rfind_token(&chars[..cursor], LORA_PREFIX, false)?;

  // If the reference is already closed, consume through the `>`;
  // otherwise replace only up to the cursor.
  let end = chars[cursor..]
    .iter()
    .position(|&c| c == '>')
    .map_or(cursor, |i| cursor + i + 1);

  let replacement = format!("{insert_value}{LORA_SUFFIX}");
  let text = splice(chars, prefix_end, end, &replacement);
  let cursor = prefix_end + insert_value.chars().count() + LORA_SUFFIX.len();
  Some(Insertion { text, cursor })
}

/// Rewrite the `embedding:...` reference: everything from just after
/// the prefix to the next comma (or end of text) is replaced.
fn commit_embedding(
  chars: &[char],
  cursor: usize,
  insert_value: &str,
  insert_comma: bool,
) -> Option<Insertion> {
  let prefix_end = rfind_token(&chars[..cursor], EMBEDDING_PREFIX, true)?;

  let end = chars[cursor..]
    .iter()
    .position(|&c| c == ',')
    .map_or(chars.len(), |i| cursor + i);

  let suffix = if insert_comma { ", " } else { "" };
  let text = splice(chars, prefix_end, end, &format!("{insert_value}{suffix}"));
  let cursor = prefix_end + insert_value.chars().count() + suffix.len();
  Some(Insertion { text, cursor })
}

fn escape_parens(value: &str) -> String {
  value.replace('(', "\\(").replace(')', "\\)")
}

/// Replace chars `[start, end)` with `replacement`.
fn splice(chars: &[char], start: usize, end: usize, replacement: &str) -> String {
  let mut out: String = chars[..start].iter().collect();
  out.push_str(replacement);
  out.extend(&chars[end..]);
  out
}

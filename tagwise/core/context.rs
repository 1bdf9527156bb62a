//! Completion-context detection.
//!
//! Pure functions from `(text, cursor)` to the syntax the user is
//! currently typing inside. No state, no surfaces: the caller decides
//! what to do with the result (usually: resolve candidates, or close
//! the dropdown on `None`).
//!
//! All offsets here are char offsets into `text`.

/// Which of the three completion syntaxes the cursor is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
  Tag,
  Lora,
  Embedding,
}

/// Ephemeral result of context detection, recomputed on every input
/// event.
///
/// `span_end` is `None` for lora/embedding contexts: their replacement
/// end is resolved at commit time by scanning forward from the live
/// cursor (for `>` or `,` respectively), because the text may change
/// between detection and commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionContext {
  pub kind:        ContextKind,
  pub search_term: String,
  pub span_start:  usize,
  pub span_end:    Option<usize>,
}

const LORA_PREFIX: &str = "<lora:";
const EMBEDDING_PREFIX: &str = "embedding:";

/// Minimum search length before a tag dropdown opens. Shorter terms
/// produce too much noise to be useful.
const MIN_TAG_SEARCH_LEN: usize = 2;

/// Classify the completion context at `cursor` (a char offset,
/// clamped to the text length). Returns `None` when no dropdown
/// should be open.
pub fn detect_context(text: &str, cursor: usize) -> Option<CompletionContext> {
  let chars: Vec<char> = text.chars().collect();
  let cursor = cursor.min(chars.len());
  let before = &chars[..cursor];

  if let Some(ctx) = detect_lora(before, cursor) {
    return Some(ctx);
  }
  if let Some(ctx) = detect_embedding(before, cursor) {
    return Some(ctx);
  }
  detect_tag(&chars, cursor)
}

/// `<lora:` followed by zero or more chars containing neither `:` nor
/// `>`, ending at the cursor. An empty search term is valid: typing
/// just `<lora:` opens the full list.
fn detect_lora(before: &[char], cursor: usize) -> Option<CompletionContext> {
  let token_end = rfind_token(before, LORA_PREFIX, false)?;
  let term: &[char] = &before[token_end..];
  if term.iter().any(|&c| c == ':' || c == '>') {
    return None;
  }
  Some(CompletionContext {
    kind:        ContextKind::Lora,
    search_term: term.iter().collect(),
    span_start:  cursor - term.len(),
    span_end:    None,
  })
}

/// Word-boundary `embedding:` followed by zero or more
/// non-whitespace, non-comma chars, ending at the cursor.
fn detect_embedding(before: &[char], cursor: usize) -> Option<CompletionContext> {
  let token_end = rfind_token(before, EMBEDDING_PREFIX, true)?;
  let token_start = token_end - EMBEDDING_PREFIX.len();
  if token_start > 0 && is_word_char(before[token_start - 1]) {
    return None;
  }
  let term: &[char] = &before[token_end..];
  if term.iter().any(|&c| c.is_whitespace() || c == ',') {
    return None;
  }
  Some(CompletionContext {
    kind:        ContextKind::Embedding,
    search_term: term.iter().collect(),
    span_start:  cursor - term.len(),
    span_end:    None,
  })
}

/// Plain tag context: the comma/newline-delimited slice around the
/// cursor. Terms shorter than two chars yield no context.
fn detect_tag(chars: &[char], cursor: usize) -> Option<CompletionContext> {
  // Nearest preceding delimiter; newlines delimit rows of tags just
  // like commas do.
  let mut start = chars[..cursor]
    .iter()
    .rposition(|&c| c == ',' || c == '\n')
    .map_or(0, |i| i + 1);
  while start < cursor && (chars[start] == ' ' || chars[start] == '\t') {
    start += 1;
  }

  let end = chars[cursor..]
    .iter()
    .position(|&c| c == ',')
    .map_or(chars.len(), |i| cursor + i);

  let raw: String = chars[start..end].iter().collect();
  let search_term = raw.trim().to_string();
  if search_term.chars().count() < MIN_TAG_SEARCH_LEN {
    return None;
  }

  Some(CompletionContext {
    kind:        ContextKind::Tag,
    search_term,
    span_start:  start,
    span_end:    Some(end),
  })
}

/// Last occurrence of `token` in `haystack`, returned as the char
/// offset just past it. `ignore_case` compares ASCII case-insensitively.
pub(crate) fn rfind_token(haystack: &[char], token: &str, ignore_case: bool) -> Option<usize> {
  let token: Vec<char> = token.chars().collect();
  if haystack.len() < token.len() {
    return None;
  }
  for start in (0..=haystack.len() - token.len()).rev() {
    let window = &haystack[start..start + token.len()];
    let hit = if ignore_case {
      window
        .iter()
        .zip(&token)
        .all(|(a, b)| a.eq_ignore_ascii_case(b))
    } else {
      window.iter().zip(&token).all(|(a, b)| a == b)
    };
    if hit {
      return Some(start + token.len());
    }
  }
  None
}

fn is_word_char(c: char) -> bool {
  c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod test {
  use quickcheck::quickcheck;

  use super::*;

  fn detect(text: &str, cursor: usize) -> Option<CompletionContext> {
    detect_context(text, cursor)
  }

  #[test]
  fn lora_prefix_opens_with_empty_term() {
    let ctx = detect("<lora:", 6).unwrap();
    assert_eq!(ctx.kind, ContextKind::Lora);
    assert_eq!(ctx.search_term, "");
    assert_eq!(ctx.span_start, 6);
    assert_eq!(ctx.span_end, None);
  }

  #[test]
  fn lora_with_partial_name() {
    let ctx = detect("masterpiece, <lora:det", 22).unwrap();
    assert_eq!(ctx.kind, ContextKind::Lora);
    assert_eq!(ctx.search_term, "det");
    assert_eq!(ctx.span_start, 19);
  }

  #[test]
  fn closed_lora_tag_is_not_a_lora_context() {
    // The `>` between the token and the cursor breaks the match; the
    // text then falls through to tag detection.
    let ctx = detect("<lora:detail:1.0> fla", 21).unwrap();
    assert_eq!(ctx.kind, ContextKind::Tag);
  }

  #[test]
  fn lora_weight_colon_breaks_the_match() {
    // Once the weight separator is typed the lora match fails and the
    // whole run is treated as an (unmatchable) tag term.
    let ctx = detect("<lora:detail:0", 14).unwrap();
    assert_eq!(ctx.kind, ContextKind::Tag);
  }

  #[test]
  fn embedding_prefix_opens_with_empty_term() {
    let ctx = detect("embedding:", 10).unwrap();
    assert_eq!(ctx.kind, ContextKind::Embedding);
    assert_eq!(ctx.search_term, "");
  }

  #[test]
  fn embedding_is_case_insensitive() {
    let ctx = detect("foo, Embedding:bad", 18).unwrap();
    assert_eq!(ctx.kind, ContextKind::Embedding);
    assert_eq!(ctx.search_term, "bad");
    assert_eq!(ctx.span_start, 15);
  }

  #[test]
  fn embedding_requires_word_boundary() {
    // "myembedding:" must not open an embedding dropdown.
    let ctx = detect("myembedding:ba", 14);
    assert!(ctx.is_none() || ctx.unwrap().kind != ContextKind::Embedding);
  }

  #[test]
  fn embedding_term_stops_at_whitespace() {
    let ctx = detect("embedding:bad hands", 19).unwrap();
    assert_ne!(ctx.kind, ContextKind::Embedding);
  }

  #[test]
  fn tag_span_between_commas() {
    //         0123456789
    let text = "a cat, bla, dog";
    let ctx = detect(text, 10).unwrap();
    assert_eq!(ctx.kind, ContextKind::Tag);
    assert_eq!(ctx.search_term, "bla");
    assert_eq!(ctx.span_start, 7);
    assert_eq!(ctx.span_end, Some(10));
  }

  #[test]
  fn tag_span_end_extends_past_cursor_to_next_comma() {
    let text = "foo, black hair, bar";
    // Cursor in the middle of "black hair".
    let ctx = detect(text, 10).unwrap();
    assert_eq!(ctx.search_term, "black hair");
    assert_eq!(ctx.span_start, 5);
    assert_eq!(ctx.span_end, Some(15));
  }

  #[test]
  fn newline_is_a_tag_delimiter() {
    let text = "first line\nblack";
    let ctx = detect(text, 16).unwrap();
    assert_eq!(ctx.search_term, "black");
    assert_eq!(ctx.span_start, 11);
  }

  #[test]
  fn leading_spaces_are_skipped() {
    let text = "foo,   bla";
    let ctx = detect(text, 10).unwrap();
    assert_eq!(ctx.span_start, 7);
    assert_eq!(ctx.search_term, "bla");
  }

  #[test]
  fn single_letter_tag_terms_do_not_open() {
    assert!(detect("foo, b", 6).is_none());
    assert!(detect("x", 1).is_none());
    assert!(detect("", 0).is_none());
  }

  #[test]
  fn two_letter_terms_do_open() {
    let ctx = detect("foo, bl", 7).unwrap();
    assert_eq!(ctx.search_term, "bl");
  }

  #[test]
  fn cursor_is_clamped_to_text_length() {
    let ctx = detect("black", 999).unwrap();
    assert_eq!(ctx.search_term, "black");
  }

  quickcheck! {
    /// Any text ending in `<lora:X` (X free of `:` and `>`) detects
    /// as a lora context with search term X.
    fn lora_suffix_always_detects(prefix: String, term: String) -> bool {
      let term: String = term
        .chars()
        .filter(|&c| c != ':' && c != '>')
        .collect();
      let text = format!("{prefix}<lora:{term}");
      let cursor = text.chars().count();
      match detect_context(&text, cursor) {
        Some(ctx) => ctx.kind == ContextKind::Lora && ctx.search_term == term,
        None => false,
      }
    }

    /// Tag detection never returns a term shorter than two chars and
    /// never panics on arbitrary cursors.
    fn tag_terms_respect_minimum_length(text: String, cursor: usize) -> bool {
      match detect_context(&text, cursor) {
        Some(ctx) if ctx.kind == ContextKind::Tag => {
          ctx.search_term.chars().count() >= 2
        },
        _ => true,
      }
    }
  }
}

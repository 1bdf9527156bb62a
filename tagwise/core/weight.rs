//! Weighted-tag adjustment: `(content:weight)` parsing and stepping.
//!
//! Operates on the current text selection. A selection that does not
//! parse as a weighted tag is not an error - it is treated as bare
//! content at implicit weight 1.0, so the first step always produces
//! a valid weighted form.

/// Weight bounds. Steps clamp into this range.
const MIN_WEIGHT: f64 = 0.1;
const MAX_WEIGHT: f64 = 2.0;
const WEIGHT_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightDirection {
  Increase,
  Decrease,
}

/// A selection parsed against the weighted-tag pattern
/// `^\(+content:weight\)+$`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWeight {
  pub content:      String,
  pub weight:       f64,
  /// Wrapping parens beyond the one pair the weight syntax itself
  /// needs. Preserved through reformatting.
  pub extra_parens: usize,
  pub is_weighted:  bool,
}

/// Result of one adjustment step: the rewritten buffer plus the new
/// selection covering exactly the reformatted text, so repeated steps
/// work without re-selecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightAdjustment {
  pub text:            String,
  pub selection_start: usize,
  pub selection_end:   usize,
}

/// Parse a selection. Anything that misses the pattern comes back as
/// unweighted trimmed content.
pub fn parse_weighted(text: &str) -> ParsedWeight {
  let unweighted = || {
    ParsedWeight {
      content:      text.trim().to_string(),
      weight:       1.0,
      extra_parens: 0,
      is_weighted:  false,
    }
  };

  let chars: Vec<char> = text.chars().collect();
  let leading = chars.iter().take_while(|&&c| c == '(').count();
  let trailing = chars.iter().rev().take_while(|&&c| c == ')').count();
  if leading == 0 || trailing == 0 || leading + trailing >= chars.len() {
    return unweighted();
  }

  let middle = &chars[leading..chars.len() - trailing];
  // The content part may not contain a closing paren.
  if middle.contains(&')') {
    return unweighted();
  }

  // Greedy content match: the weight separator is the last colon.
  let Some(colon) = middle.iter().rposition(|&c| c == ':') else {
    return unweighted();
  };
  let content: String = middle[..colon].iter().collect();
  let weight_str: String = middle[colon + 1..].iter().collect();
  if content.is_empty()
    || weight_str.is_empty()
    || !weight_str.chars().all(|c| c.is_ascii_digit() || c == '.')
  {
    return unweighted();
  }
  let Ok(weight) = weight_str.parse::<f64>() else {
    return unweighted();
  };

  ParsedWeight {
    content,
    weight,
    extra_parens: leading.saturating_sub(1),
    is_weighted: true,
  }
}

/// Format content at a weight, rounded to one decimal. Landing
/// exactly on 1.0 drops the annotation entirely; extra parens are
/// re-emitted either way.
pub fn format_weighted(content: &str, weight: f64, extra_parens: usize) -> String {
  let weight = (weight * 10.0).round() / 10.0;
  let wrap = |inner: String| {
    format!(
      "{}{}{}",
      "(".repeat(extra_parens),
      inner,
      ")".repeat(extra_parens)
    )
  };

  if weight == 1.0 {
    return wrap(content.to_string());
  }
  wrap(format!("({content}:{weight:.1})"))
}

/// Apply one ±0.1 step to the selection `[start, end)` (char
/// offsets). Returns `None` when there is no selection.
pub fn adjust_weight(
  text: &str,
  selection_start: usize,
  selection_end: usize,
  direction: WeightDirection,
) -> Option<WeightAdjustment> {
  if selection_start == selection_end {
    return None;
  }

  let chars: Vec<char> = text.chars().collect();
  let end = selection_end.min(chars.len());
  let start = selection_start.min(end);
  if start == end {
    return None;
  }

  let selected: String = chars[start..end].iter().collect();
  let parsed = parse_weighted(&selected);

  let stepped = match direction {
    WeightDirection::Increase => parsed.weight + WEIGHT_STEP,
    WeightDirection::Decrease => parsed.weight - WEIGHT_STEP,
  };
  let clamped = stepped.clamp(MIN_WEIGHT, MAX_WEIGHT);

  let replacement = format_weighted(&parsed.content, clamped, parsed.extra_parens);
  let mut out: String = chars[..start].iter().collect();
  out.push_str(&replacement);
  out.extend(&chars[end..]);

  Some(WeightAdjustment {
    text:            out,
    selection_start: start,
    selection_end:   start + replacement.chars().count(),
  })
}

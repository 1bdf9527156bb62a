//! Pure placement math for the shared preview surface.
//!
//! The scheduler only ever needs one computation: given the rect of
//! the hovered/highlighted candidate row and the preview's size, pick
//! a position that stays inside the viewport.

/// Gap between a candidate row and the preview surface.
const PREVIEW_GAP: f32 = 8.0;

/// The preview never renders above this offset from the viewport top.
const MIN_TOP: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
  pub x: f32,
  pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
  pub x:      f32,
  pub y:      f32,
  pub width:  f32,
  pub height: f32,
}

impl Rect {
  pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    Rect {
      x,
      y,
      width,
      height,
    }
  }

  pub fn right(&self) -> f32 {
    self.x + self.width
  }
}

/// Position a preview of `(width, height)` next to `anchor` inside a
/// `(viewport_width, viewport_height)` viewport.
///
/// Prefers the right side of the anchor; flips to the left side when
/// it would overflow the right edge; clamps to the viewport otherwise
/// and never goes above [`MIN_TOP`].
pub fn place_preview(
  anchor: &Rect,
  (width, height): (f32, f32),
  (viewport_width, viewport_height): (f32, f32),
) -> Point {
  let mut x = anchor.right() + PREVIEW_GAP;
  if x + width > viewport_width {
    x = anchor.x - PREVIEW_GAP - width;
  }
  x = x.clamp(0.0, (viewport_width - width).max(0.0));

  let mut y = anchor.y;
  if y + height > viewport_height {
    y = viewport_height - height;
  }
  y = y.max(MIN_TOP);

  Point { x, y }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn prefers_the_right_side() {
    let anchor = Rect::new(100.0, 200.0, 300.0, 20.0);
    let pos = place_preview(&anchor, (150.0, 150.0), (1920.0, 1080.0));
    assert_eq!(pos.x, 408.0);
    assert_eq!(pos.y, 200.0);
  }

  #[test]
  fn flips_left_on_right_overflow() {
    let anchor = Rect::new(1700.0, 200.0, 200.0, 20.0);
    let pos = place_preview(&anchor, (150.0, 150.0), (1920.0, 1080.0));
    // 1700 - 8 - 150
    assert_eq!(pos.x, 1542.0);
  }

  #[test]
  fn clamps_to_the_left_edge() {
    // Overflows right, and the flipped position would be negative:
    // clamp to the viewport instead of rendering off-screen.
    let anchor = Rect::new(10.0, 200.0, 300.0, 20.0);
    let pos = place_preview(&anchor, (400.0, 150.0), (320.0, 1080.0));
    assert_eq!(pos.x, 0.0);
  }

  #[test]
  fn clamps_to_the_bottom() {
    let anchor = Rect::new(100.0, 1050.0, 300.0, 20.0);
    let pos = place_preview(&anchor, (150.0, 200.0), (1920.0, 1080.0));
    assert_eq!(pos.y, 880.0);
  }

  #[test]
  fn respects_the_minimum_top_offset() {
    let anchor = Rect::new(100.0, 0.0, 300.0, 20.0);
    let pos = place_preview(&anchor, (150.0, 150.0), (1920.0, 1080.0));
    assert_eq!(pos.y, MIN_TOP);
  }
}

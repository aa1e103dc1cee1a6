use serde::{Deserialize, Serialize};
use timeline::{TimeScale, Units};

/// Screen-space pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_two_points(a: Point, b: Point) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center_y(&self) -> f64 {
        (self.top + self.bottom) * 0.5
    }

    pub fn contains_y(&self, y: f64) -> bool {
        y >= self.top && y <= self.bottom
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && self.contains_y(point.y)
    }

    /// Strict AABB overlap; touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }
}

/// Horizontal placement of the timeline content on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    #[serde(flatten)]
    pub scale: TimeScale,
    /// Horizontal scroll of the content, in screen pixels
    #[serde(default)]
    pub scroll_left: f64,
    /// Width of the side panel left of the content
    #[serde(default)]
    pub content_left: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: TimeScale::default(),
            scroll_left: 0.0,
            content_left: 0.0,
        }
    }
}

impl Viewport {
    pub fn new(pixels_per_second: f64) -> Self {
        Self {
            scale: TimeScale::new(pixels_per_second),
            ..Self::default()
        }
    }

    pub fn pixels_per_second(&self) -> f64 {
        self.scale.pixels_per_second
    }

    /// Pointer x to a distance along the content, in screen pixels.
    pub fn content_x(&self, screen_x: f64) -> f64 {
        screen_x - self.content_left + self.scroll_left
    }

    pub fn units_to_screen_x(&self, units: Units) -> f64 {
        self.content_left + self.scale.units_to_px(units) - self.scroll_left
    }

    pub fn seconds_to_screen_x(&self, seconds: f64) -> f64 {
        self.content_left + self.scale.seconds_to_px(seconds) - self.scroll_left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_requires_area_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(!a.intersects(&Rect::new(10.0, 0.0, 20.0, 10.0)));
        assert!(!a.intersects(&Rect::new(0.0, 11.0, 10.0, 20.0)));
    }

    #[test]
    fn test_from_two_points_normalizes() {
        let r = Rect::from_two_points(Point::new(30.0, 5.0), Point::new(10.0, 25.0));
        assert_eq!(r, Rect::new(10.0, 5.0, 30.0, 25.0));
        assert_eq!(r.center_y(), 15.0);
    }

    #[test]
    fn test_viewport_offsets() {
        let viewport = Viewport {
            scale: TimeScale::new(80.0),
            scroll_left: 40.0,
            content_left: 100.0,
        };
        // 2 units at 80 px/s are 4 screen pixels
        assert_eq!(viewport.units_to_screen_x(2.0), 64.0);
        assert_eq!(viewport.content_x(64.0), 4.0);
        assert_eq!(viewport.seconds_to_screen_x(1.0), 140.0);
    }
}

/// A point in screen coordinates (physical pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Point {
	pub x: i32,
	pub y: i32,
}

impl Point {
	#[inline]
	pub const fn new(x: i32, y: i32) -> Self {
		Self { x, y }
	}

	#[inline]
	pub const fn offset(self, dx: i32, dy: i32) -> Self {
		Self::new(self.x + dx, self.y + dy)
	}
}

impl std::fmt::Display for Point {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "({},{})", self.x, self.y)
	}
}

/// Axis-aligned screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Region {
	pub x: i32,
	pub y: i32,
	pub width: u32,
	pub height: u32,
}

impl Region {
	pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
		Self { x, y, width, height }
	}

	/// Build a region from its top-left and bottom-right corners.
	pub fn from_corners(top_left: Point, bottom_right: Point) -> Self {
		Self {
			x: top_left.x,
			y: top_left.y,
			width: (bottom_right.x - top_left.x).max(0) as u32,
			height: (bottom_right.y - top_left.y).max(0) as u32,
		}
	}

	pub fn top_left(&self) -> Point {
		Point::new(self.x, self.y)
	}
}

/// A template hit, translated back into screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
	pub center: Point,
	/// Match confidence in `0.0..=1.0`.
	pub score: f32,
}

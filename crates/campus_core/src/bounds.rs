//! Rectangular regions for hit testing

/// Absolute bounds of an element after layout
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    /// X position (absolute)
    pub x: f32,
    /// Y position (absolute)
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl Bounds {
    /// Create new bounds
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check whether a point lies inside these bounds (edges inclusive)
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_edges() {
        let b = Bounds::new(10.0, 10.0, 100.0, 40.0);
        assert!(b.contains(10.0, 10.0));
        assert!(b.contains(110.0, 50.0));
        assert!(b.contains(50.0, 30.0));
        assert!(!b.contains(9.9, 30.0));
        assert!(!b.contains(50.0, 50.1));
    }
}

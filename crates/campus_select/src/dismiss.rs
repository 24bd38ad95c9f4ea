//! Outside-interaction detection
//!
//! "Click outside to close" is a capability the host provides. The host
//! registers the regions a widget occupies (its input and, while open, its
//! panel) and asks the detector to classify each pointer-down. The widget never
//! installs a global listener.

use campus_core::{Bounds, PointerEvent, PointerKind};
use smallvec::SmallVec;

/// A region that counts as "inside" the widget
pub trait InteractionRegion {
    fn contains(&self, x: f32, y: f32) -> bool;
}

impl InteractionRegion for Bounds {
    fn contains(&self, x: f32, y: f32) -> bool {
        Bounds::contains(self, x, y)
    }
}

/// Where a pointer interaction landed relative to the widget
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    Inside,
    Outside,
}

/// Region-scoped detector for one widget
#[derive(Clone, Debug, Default)]
pub struct OutsideInteractionDetector {
    regions: SmallVec<[Bounds; 2]>,
}

impl OutsideInteractionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region that belongs to the widget
    pub fn register(&mut self, bounds: Bounds) {
        self.regions.push(bounds);
    }

    /// Classify a point
    ///
    /// With no regions registered, nothing counts as outside.
    pub fn classify(&self, x: f32, y: f32) -> Interaction {
        if self.regions.is_empty() || self.regions.iter().any(|r| r.contains(x, y)) {
            Interaction::Inside
        } else {
            Interaction::Outside
        }
    }

    /// Whether a pointer event is a pointer-down outside every region
    pub fn is_outside(&self, event: &PointerEvent) -> bool {
        event.kind == PointerKind::Down && self.classify(event.x, event.y) == Interaction::Outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let mut detector = OutsideInteractionDetector::new();
        detector.register(Bounds::new(0.0, 0.0, 200.0, 40.0));
        detector.register(Bounds::new(0.0, 44.0, 200.0, 160.0));

        assert_eq!(detector.classify(10.0, 10.0), Interaction::Inside);
        assert_eq!(detector.classify(10.0, 100.0), Interaction::Inside);
        assert_eq!(detector.classify(300.0, 10.0), Interaction::Outside);
    }

    #[test]
    fn test_only_pointer_down_counts() {
        let mut detector = OutsideInteractionDetector::new();
        detector.register(Bounds::new(0.0, 0.0, 100.0, 30.0));

        assert!(detector.is_outside(&PointerEvent::down(500.0, 500.0)));
        let moved = PointerEvent {
            kind: PointerKind::Moved,
            x: 500.0,
            y: 500.0,
        };
        assert!(!detector.is_outside(&moved));
    }

    #[test]
    fn test_empty_detector_never_dismisses() {
        let detector = OutsideInteractionDetector::new();
        assert!(!detector.is_outside(&PointerEvent::down(1.0, 1.0)));
    }
}

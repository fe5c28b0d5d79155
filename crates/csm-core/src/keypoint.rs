//! Ground-truth keypoint annotations.

use crate::{Pt2, Real};
use serde::{Deserialize, Serialize};

/// Annotated keypoint at integer pixel `(x, y)` with a visibility flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: usize,
    pub y: usize,
    pub visible: bool,
}

impl Keypoint {
    pub fn new(x: usize, y: usize, visible: bool) -> Self {
        Self { x, y, visible }
    }

    /// Convert dataset coordinates in `[-1, 1]` to pixel indices of a
    /// `width × height` image: `floor((size - 1) * (f + 1) / 2)`, clamped.
    pub fn from_normalized(x: Real, y: Real, visible: bool, width: usize, height: usize) -> Self {
        let to_px = |f: Real, size: usize| {
            let max = size.saturating_sub(1) as Real;
            (max * (f + 1.0) / 2.0).floor().clamp(0.0, max) as usize
        };
        Self {
            x: to_px(x, width),
            y: to_px(y, height),
            visible,
        }
    }

    #[inline]
    pub fn pixel(&self) -> Pt2 {
        Pt2::new(self.x as Real, self.y as Real)
    }
}

/// Keypoints of one image, indexed like the dataset's keypoint name list.
///
/// `None` marks a keypoint that has no recorded ground truth for this image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeypointAnnotation {
    pub keypoints: Vec<Option<Keypoint>>,
}

impl KeypointAnnotation {
    pub fn new(keypoints: Vec<Option<Keypoint>>) -> Self {
        Self { keypoints }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Annotation for keypoint `index`, if recorded.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Keypoint> {
        self.keypoints.get(index).and_then(Option::as_ref)
    }

    /// Number of recorded and visible keypoints.
    pub fn num_visible(&self) -> usize {
        self.keypoints.iter().flatten().filter(|k| k.visible).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_corners_map_to_pixel_range() {
        let a = Keypoint::from_normalized(-1.0, -1.0, true, 256, 128);
        assert_eq!((a.x, a.y), (0, 0));
        let b = Keypoint::from_normalized(1.0, 1.0, true, 256, 128);
        assert_eq!((b.x, b.y), (255, 127));
        let c = Keypoint::from_normalized(0.0, 0.0, false, 256, 256);
        assert_eq!((c.x, c.y), (127, 127));
        let d = Keypoint::from_normalized(3.0, -7.0, false, 10, 10);
        assert_eq!((d.x, d.y), (9, 0));
    }

    #[test]
    fn missing_entries_are_none() {
        let ann = KeypointAnnotation::new(vec![
            Some(Keypoint::new(1, 2, true)),
            None,
            Some(Keypoint::new(0, 0, false)),
        ]);
        assert!(ann.get(1).is_none());
        assert!(ann.get(5).is_none());
        assert_eq!(ann.num_visible(), 1);

        let json = serde_json::to_string(&ann).unwrap();
        let back: KeypointAnnotation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ann);
    }
}

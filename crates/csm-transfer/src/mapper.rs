//! Keypoint transfer between two images through their predicted UV maps.
//!
//! A keypoint of the source image is looked up in the source UV map, lifted
//! to the template surface, and matched against the lifted UV map of the
//! target image by exhaustive nearest-neighbor search over all pixels.
//! Pixels outside the target's object mask are penalized so they can only
//! win when the mask is empty.

use crate::TransferError;
use csm_core::{Keypoint, KeypointAnnotation, ObjectMask, Pt3, Real, UvMap, UvSurface};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Penalty used by the reference evaluation protocol.
pub const DEFAULT_PENALTY: Real = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    /// Added to the distance of every target pixel outside the mask.
    pub mask_penalty: Real,
    /// Added to the reported distance when the source keypoint is not visible.
    pub invisible_penalty: Real,
    /// Search keypoints with rayon.
    pub parallel: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            mask_penalty: DEFAULT_PENALTY,
            invisible_penalty: DEFAULT_PENALTY,
            parallel: true,
        }
    }
}

/// Everything the mapper needs from one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageObservation {
    pub uv: UvMap,
    pub mask: ObjectMask,
    pub keypoints: KeypointAnnotation,
}

impl ImageObservation {
    pub fn new(
        uv: UvMap,
        mask: ObjectMask,
        keypoints: KeypointAnnotation,
    ) -> Result<Self, TransferError> {
        let obs = Self {
            uv,
            mask,
            keypoints,
        };
        obs.validate()?;
        Ok(obs)
    }

    /// Check that the mask matches the UV map and that the map is not empty.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.uv.as_slice().is_empty() {
            return Err(TransferError::EmptyImage);
        }
        if self.mask.width() != self.uv.width() || self.mask.height() != self.uv.height() {
            return Err(TransferError::SizeMismatch {
                what: "object mask",
                width: self.uv.width(),
                height: self.uv.height(),
                actual_width: self.mask.width(),
                actual_height: self.mask.height(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.uv.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.uv.height()
    }

    fn check_bounds(&self, keypoint: usize, kp: &Keypoint) -> Result<(), TransferError> {
        if kp.x >= self.width() || kp.y >= self.height() {
            return Err(TransferError::KeypointOutOfBounds {
                keypoint,
                x: kp.x,
                y: kp.y,
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferDirection {
    AToB,
    BToA,
}

/// Best match of a 3D query point in a target image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelMatch {
    pub x: usize,
    pub y: usize,
    /// Euclidean 3D distance, plus the mask penalty if the pixel is masked out.
    pub distance: Real,
    pub masked: bool,
}

/// One transferred keypoint of one image pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub pair: usize,
    pub direction: TransferDirection,
    pub keypoint: usize,
    /// Transferred pixel `(x, y)` in the target image.
    pub transferred: [usize; 2],
    /// Euclidean pixel distance to the target's ground truth.
    pub pixel_error: Real,
    /// Keypoint visible in both images.
    pub visible: bool,
    /// Euclidean 3D distance of the match plus any mask or invisibility penalty.
    pub min_distance: Real,
    /// Larger side of the target image, in pixels.
    pub image_size: usize,
}

/// Exhaustive masked nearest-neighbor search on the template surface.
pub struct UvCorrespondenceMapper {
    surface: Box<dyn UvSurface>,
    options: TransferOptions,
}

impl std::fmt::Debug for UvCorrespondenceMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UvCorrespondenceMapper")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl UvCorrespondenceMapper {
    pub fn new(surface: Box<dyn UvSurface>, options: TransferOptions) -> Self {
        Self { surface, options }
    }

    #[inline]
    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    #[inline]
    pub fn surface(&self) -> &dyn UvSurface {
        self.surface.as_ref()
    }

    /// 3D point of every target pixel, row-major.
    pub fn candidate_cloud(&self, target: &ImageObservation) -> Vec<Pt3> {
        self.surface.uv_to_points(target.uv.as_slice())
    }

    /// Nearest candidate to `query`, preferring any pixel inside the mask.
    ///
    /// A masked-out pixel is only returned when no pixel lies inside the mask.
    /// Ties go to the lowest row-major index.
    pub fn nearest(&self, query: &Pt3, cloud: &[Pt3], mask: &ObjectMask) -> Option<PixelMatch> {
        let width = mask.width().max(1);
        let mut best: Option<(usize, bool, Real)> = None;
        for (idx, (p, &inside)) in cloud.iter().zip(mask.as_slice()).enumerate() {
            let d = (p - query).norm_squared();
            let masked = !inside;
            let better = match best {
                None => true,
                Some((_, bm, bd)) => (masked, d) < (bm, bd),
            };
            if better {
                best = Some((idx, masked, d));
            }
        }
        best.map(|(idx, masked, d)| PixelMatch {
            x: idx % width,
            y: idx / width,
            distance: if masked {
                d.sqrt() + self.options.mask_penalty
            } else {
                d.sqrt()
            },
            masked,
        })
    }

    /// Transfer a single keypoint from `source` to `target`.
    pub fn transfer_keypoint(
        &self,
        source: &ImageObservation,
        target: &ImageObservation,
        keypoint: usize,
    ) -> Result<TransferRecord, TransferError> {
        source.validate()?;
        target.validate()?;
        let cloud = self.candidate_cloud(target);
        self.transfer_with_cloud(source, target, &cloud, keypoint)
    }

    fn transfer_with_cloud(
        &self,
        source: &ImageObservation,
        target: &ImageObservation,
        cloud: &[Pt3],
        keypoint: usize,
    ) -> Result<TransferRecord, TransferError> {
        let src = source
            .keypoints
            .get(keypoint)
            .ok_or(TransferError::MissingAnnotation {
                keypoint,
                image: "source",
            })?;
        let gt = target
            .keypoints
            .get(keypoint)
            .ok_or(TransferError::MissingAnnotation {
                keypoint,
                image: "target",
            })?;
        source.check_bounds(keypoint, src)?;

        let query = self.surface.uv_to_point(&source.uv.at(src.x, src.y));
        let hit = self
            .nearest(&query, cloud, &target.mask)
            .ok_or(TransferError::EmptyImage)?;

        let mut min_distance = hit.distance;
        if !src.visible {
            min_distance += self.options.invisible_penalty;
        }
        let dx = hit.x as Real - gt.x as Real;
        let dy = hit.y as Real - gt.y as Real;
        Ok(TransferRecord {
            pair: 0,
            direction: TransferDirection::AToB,
            keypoint,
            transferred: [hit.x, hit.y],
            pixel_error: dx.hypot(dy),
            visible: src.visible && gt.visible,
            min_distance,
            image_size: target.width().max(target.height()),
        })
    }

    /// Transfer every keypoint annotated in both images.
    ///
    /// Keypoints missing from either annotation are skipped, as are source
    /// keypoints that are not visible and lie outside the image. Any other
    /// error aborts the transfer.
    pub fn transfer(
        &self,
        source: &ImageObservation,
        target: &ImageObservation,
        pair: usize,
        direction: TransferDirection,
    ) -> Result<Vec<TransferRecord>, TransferError> {
        source.validate()?;
        target.validate()?;
        let cloud = self.candidate_cloud(target);
        let num_keypoints = source.keypoints.len().max(target.keypoints.len());

        let run = |keypoint: usize| -> Result<Option<TransferRecord>, TransferError> {
            match self.transfer_with_cloud(source, target, &cloud, keypoint) {
                Ok(mut record) => {
                    record.pair = pair;
                    record.direction = direction;
                    Ok(Some(record))
                }
                Err(err @ TransferError::MissingAnnotation { .. }) => {
                    debug!("pair {pair} {direction:?}: skipping, {err}");
                    Ok(None)
                }
                Err(err @ TransferError::KeypointOutOfBounds { .. })
                    if source.keypoints.get(keypoint).is_some_and(|kp| !kp.visible) =>
                {
                    debug!("pair {pair} {direction:?}: skipping invisible keypoint, {err}");
                    Ok(None)
                }
                Err(err) => Err(err),
            }
        };
        let records: Vec<Option<TransferRecord>> = if self.options.parallel {
            (0..num_keypoints).into_par_iter().map(run).collect::<Result<_, _>>()?
        } else {
            (0..num_keypoints).map(run).collect::<Result<_, _>>()?
        };
        Ok(records.into_iter().flatten().collect())
    }

    /// Transfer in both directions, `A → B` records first.
    pub fn transfer_pair(
        &self,
        a: &ImageObservation,
        b: &ImageObservation,
        pair: usize,
    ) -> Result<Vec<TransferRecord>, TransferError> {
        let mut records = self.transfer(a, b, pair, TransferDirection::AToB)?;
        records.extend(self.transfer(b, a, pair, TransferDirection::BToA)?);
        Ok(records)
    }
}

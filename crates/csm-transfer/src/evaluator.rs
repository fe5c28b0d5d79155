//! Percentage of Correct Keypoints over accumulated transfer records.

use crate::TransferRecord;
use csm_core::Real;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized thresholds of the standard keypoint-transfer PCK curve.
pub const DEFAULT_THRESHOLDS: [Real; 13] = [
    1e-4, 1e-3, 2.5e-3, 5e-3, 7.5e-3, 1e-2, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 10.0,
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PckOptions {
    /// Distance thresholds as fractions of the image size.
    pub thresholds: Vec<Real>,
    /// Image size in pixels. When `None`, each record's target size is used.
    pub image_size: Option<Real>,
}

impl Default for PckOptions {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            image_size: None,
        }
    }
}

/// PCK table: keypoint name × threshold → accuracy.
///
/// An accuracy is `None` when no visible record exists for that keypoint;
/// it is never filled in with a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PckReport {
    pub thresholds: Vec<Real>,
    pub keypoint_names: Vec<String>,
    /// `[keypoint][threshold]`.
    pub per_keypoint: Vec<Vec<Option<Real>>>,
    pub overall: Vec<Option<Real>>,
    /// Visible records per keypoint (the PCK denominator).
    pub visible_counts: Vec<usize>,
    pub num_records: usize,
    pub num_visible: usize,
}

impl PckReport {
    /// Overall accuracy at `threshold`, if it is one of the evaluated thresholds.
    pub fn overall_at(&self, threshold: Real) -> Option<Real> {
        let i = self.thresholds.iter().position(|&t| t == threshold)?;
        self.overall[i]
    }
}

impl fmt::Display for PckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .keypoint_names
            .iter()
            .map(String::len)
            .chain(std::iter::once("overall".len()))
            .max()
            .unwrap_or(0);
        let cell = |v: &Option<Real>| match v {
            Some(a) => format!("{a:>8.3}"),
            None => format!("{:>8}", "-"),
        };

        write!(f, "{:<name_width$}", "keypoint")?;
        for t in &self.thresholds {
            write!(f, " {:>8}", format!("{t}"))?;
        }
        writeln!(f)?;
        for (name, row) in self.keypoint_names.iter().zip(&self.per_keypoint) {
            write!(f, "{name:<name_width$}")?;
            for v in row {
                write!(f, " {}", cell(v))?;
            }
            writeln!(f)?;
        }
        write!(f, "{:<name_width$}", "overall")?;
        for v in &self.overall {
            write!(f, " {}", cell(v))?;
        }
        writeln!(f)?;
        write!(
            f,
            "{} records, {} visible",
            self.num_records, self.num_visible
        )
    }
}

/// Append-only accumulator of transfer records.
#[derive(Debug, Clone, Default)]
pub struct TransferEvaluator {
    options: PckOptions,
    keypoint_names: Vec<String>,
    records: Vec<TransferRecord>,
}

impl TransferEvaluator {
    pub fn new(options: PckOptions, keypoint_names: Vec<String>) -> Self {
        Self {
            options,
            keypoint_names,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: TransferRecord) {
        self.records.push(record);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = TransferRecord>) {
        self.records.extend(records);
    }

    #[inline]
    pub fn records(&self) -> &[TransferRecord] {
        &self.records
    }

    #[inline]
    pub fn options(&self) -> &PckOptions {
        &self.options
    }

    pub fn into_records(self) -> Vec<TransferRecord> {
        self.records
    }

    fn name_of(&self, keypoint: usize) -> String {
        self.keypoint_names
            .get(keypoint)
            .cloned()
            .unwrap_or_else(|| format!("kp_{keypoint}"))
    }

    fn is_correct(&self, record: &TransferRecord, threshold: Real) -> bool {
        let size = self
            .options
            .image_size
            .unwrap_or(record.image_size as Real);
        record.pixel_error <= threshold * size
    }

    /// Compute the PCK table over every record accumulated so far.
    ///
    /// Records whose keypoint is not visible in both images are excluded from
    /// numerator and denominator alike.
    pub fn report(&self) -> PckReport {
        let num_keypoints = self
            .records
            .iter()
            .map(|r| r.keypoint + 1)
            .max()
            .unwrap_or(0)
            .max(self.keypoint_names.len());
        let thresholds = &self.options.thresholds;

        let mut correct = vec![vec![0usize; thresholds.len()]; num_keypoints];
        let mut visible_counts = vec![0usize; num_keypoints];
        for r in self.records.iter().filter(|r| r.visible) {
            visible_counts[r.keypoint] += 1;
            for (ti, &t) in thresholds.iter().enumerate() {
                if self.is_correct(r, t) {
                    correct[r.keypoint][ti] += 1;
                }
            }
        }

        let ratio = |hits: usize, total: usize| (total > 0).then(|| hits as Real / total as Real);
        let per_keypoint = correct
            .iter()
            .zip(&visible_counts)
            .map(|(row, &n)| row.iter().map(|&c| ratio(c, n)).collect())
            .collect();
        let num_visible: usize = visible_counts.iter().sum();
        let overall = (0..thresholds.len())
            .map(|ti| ratio(correct.iter().map(|row| row[ti]).sum(), num_visible))
            .collect();

        debug!(
            "PCK over {} records ({} visible, {} keypoints)",
            self.records.len(),
            num_visible,
            num_keypoints
        );
        PckReport {
            thresholds: thresholds.clone(),
            keypoint_names: (0..num_keypoints).map(|k| self.name_of(k)).collect(),
            per_keypoint,
            overall,
            visible_counts,
            num_records: self.records.len(),
            num_visible,
        }
    }
}

//! One-call pipelines over the CSM core.
//!
//! Each pipeline takes a serializable input and config and returns a
//! serializable report, so the same types back the command line tool and
//! any JSON-based integration:
//!
//! - [`run_articulation`]: deform an articulated template from encoder
//!   features (multi-hypothesis) or explicit local poses.
//! - [`run_transfer_evaluation`]: transfer keypoints across image pairs
//!   through their UV maps and report the PCK table.

mod articulate;
mod transfer_eval;

pub use articulate::*;
pub use transfer_eval::*;

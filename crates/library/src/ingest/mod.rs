//! Upload planning and persistence.
//!
//! [`plan_upload`] collects the compression, WebP and video decisions for an
//! incoming file without touching anything. [`persist`] stores the final
//! bytes and records them in the media index, keeping the two in step.

pub mod error;
mod persist;
mod plan;

pub use self::persist::persist;
pub use self::plan::{IngestPlan, plan_upload};

//! Media directory operations that span storage and the media index.
//!
//! - [`ingest`] plans and stores uploads.
//! - [`reconcile`] finds and cleans up files the index doesn't know about.

pub mod ingest;
pub mod reconcile;

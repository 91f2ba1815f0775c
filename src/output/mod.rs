//! Result reporting
//!
//! Two formats over the same aggregated statistics: a human-readable text
//! report and a machine-readable JSON document, selected by the output
//! configuration.

pub mod json;
pub mod text;

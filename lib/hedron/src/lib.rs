//! Descriptions of remotely supplied geometry data: immutable byte buffers, the views that
//! window into them, the element formats those views are read as, and the patches that tie
//! attributes together into drawable primitives.
//!
//! Nothing here interprets vertex data beyond bounds checking; see the `trellis` crate for
//! extraction and assembly.

pub mod format;
pub use format::{describe, Format, FormatError, FormatInfo, NumericKind};

mod data;
pub use data::*;

//! Cooling control module.
//!
//! Provides the temperature-to-duty speed curve of the controller.

mod curve;

pub use curve::compute_target;

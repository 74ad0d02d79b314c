//! Data model shared between the serialization pipeline and its HTTP surface.

pub mod model;
pub mod requests;

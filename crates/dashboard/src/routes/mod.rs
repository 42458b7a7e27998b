//! HTTP/JSON panels

pub mod predictions;
pub mod sensors;
pub mod status;

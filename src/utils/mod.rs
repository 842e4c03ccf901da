//! Small shared helpers: developer trace capture, JSON/BSON conversion, numeric casts.
pub mod devlog;
pub mod json;
pub mod num;

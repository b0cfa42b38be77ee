//! ABOUTME: Router component

pub mod glob;
pub mod router;

pub use glob::glob_match;
pub use router::route;

//! Data profiling primitives for checking a table before normalization.

mod missing;

pub use missing::{profile_missing, MissingProfile};

//!
//! Traits Module
//!
//! Extension points of the feedback pipeline.
//!
//! - [`comparator`]: decides whether two execution results count as the same behavior.
//! - [`feedback`]: turns a repair into learner-facing feedback items.

pub mod comparator;
pub mod feedback;

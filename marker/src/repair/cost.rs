//! Cost weighting.
//!
//! Token and statement costs come from the structural diff. Two composite edits are
//! priced here:
//! - replacing a whole statement by one of a different kind: one statement base plus
//!   the tree distance between the two statements;
//! - moving an unchanged statement within its block: a flat [`COST_REORDER`].

use program_model::Node;
use program_model::diff::tree_distance;

pub use program_model::diff::{COST_STATEMENT_BASE, COST_TOKEN};

pub const COST_REORDER: u32 = 2;

pub fn replace_statement(from: &Node, to: &Node) -> u32 {
    COST_STATEMENT_BASE + tree_distance(from, to)
}

/// Round a float to two decimal places.
#[inline]
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Share of `total` carried by `cost`, rounded to two decimals.
pub fn normalized(cost: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(f64::from(cost) / f64::from(total))
    }
}

/// True when a ceiling is set (non-zero) and `cost` is above it.
pub fn exceeds_ceiling(cost: u32, max_cost: u32) -> bool {
    max_cost > 0 && cost > max_cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use program_model::{Location, NodeKind};

    #[test]
    fn normalized_share_is_rounded() {
        assert_eq!(normalized(1, 3), 0.33);
        assert_eq!(normalized(5, 5), 1.0);
        assert_eq!(normalized(0, 0), 0.0);
    }

    #[test]
    fn zero_ceiling_means_unlimited() {
        assert!(!exceeds_ceiling(1_000, 0));
        assert!(exceeds_ceiling(11, 10));
        assert!(!exceeds_ceiling(10, 10));
    }

    #[test]
    fn statement_replacement_costs_more_than_nothing() {
        let l = Location::default();
        let a = Node::new(NodeKind::Break, l);
        let b = Node::new(NodeKind::Continue, l);
        assert_eq!(replace_statement(&a, &b), COST_STATEMENT_BASE + 1);
    }
}

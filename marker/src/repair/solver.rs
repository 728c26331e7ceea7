//! # Candidate Selection Solver
//!
//! A 0/1 optimization problem over candidate edits: one boolean per candidate, a
//! positive cost per candidate, and two constraint shapes:
//! - [`Constraint::AtMostOne`]: alternatives and conflicting edits;
//! - [`Constraint::AtLeastOne`]: cuts added after a selection failed the oracle.
//!
//! Solutions are ordered by `(cost, number of selected candidates, selected indices)`,
//! so the minimum is unique and candidates earlier in source order win ties.
//!
//! [`BranchAndBound`] is a depth-first search with a lower bound derived from the
//! unsatisfied `AtLeastOne` constraints. Each call is independent; nothing is kept
//! between solves.

use std::cmp::Ordering;
use std::time::Instant;
use thiserror::Error;

/// Nodes explored between two clock reads.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    AtMostOne(Vec<usize>),
    AtLeastOne(Vec<usize>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Problem {
    pub costs: Vec<u32>,
    pub constraints: Vec<Constraint>,
}

impl Problem {
    pub fn new(costs: Vec<u32>) -> Self {
        Self {
            costs,
            constraints: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    pub fn at_most_one(&mut self, vars: Vec<usize>) {
        self.constraints.push(Constraint::AtMostOne(vars));
    }

    pub fn at_least_one(&mut self, vars: Vec<usize>) {
        self.constraints.push(Constraint::AtLeastOne(vars));
    }

    /// Excludes `selected` and every subset of it.
    pub fn cut(&mut self, selected: &[usize]) {
        let outside = (0..self.len()).filter(|v| !selected.contains(v)).collect();
        self.at_least_one(outside);
    }

    pub fn is_satisfied_by(&self, selected: &[usize]) -> bool {
        self.constraints.iter().all(|c| match c {
            Constraint::AtMostOne(vars) => vars.iter().filter(|v| selected.contains(v)).count() <= 1,
            Constraint::AtLeastOne(vars) => vars.iter().any(|v| selected.contains(v)),
        })
    }

    pub fn assignment(&self, mut selected: Vec<usize>) -> Assignment {
        selected.sort_unstable();
        selected.dedup();
        let cost = selected.iter().filter_map(|&v| self.costs.get(v)).sum();
        Assignment { cost, selected }
    }
}

/// A set of selected candidates, indices ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub cost: u32,
    pub selected: Vec<usize>,
}

impl Ord for Assignment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .cmp(&other.cost)
            .then_with(|| self.selected.len().cmp(&other.selected.len()))
            .then_with(|| self.selected.cmp(&other.selected))
    }
}

impl PartialOrd for Assignment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// The minimum feasible assignment below the bound.
    Optimal(Assignment),
    /// No feasible assignment below the bound exists.
    Infeasible,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("deadline reached after {0} nodes")]
    Deadline(u64),
    #[error("node limit of {0} reached")]
    NodeLimit(u64),
}

pub trait Solver: Send {
    /// Finds the minimum assignment that satisfies every constraint and is strictly
    /// smaller than `bound` when one is given.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] when the search is cut short; the search is then
    /// inconclusive.
    fn solve(
        &self,
        problem: &Problem,
        bound: Option<&Assignment>,
        deadline: Instant,
    ) -> Result<SolveOutcome, SolverError>;
}

#[derive(Debug, Clone, Copy)]
pub struct BranchAndBound {
    max_nodes: u64,
}

impl BranchAndBound {
    pub fn new(max_nodes: u64) -> Self {
        Self {
            max_nodes: max_nodes.max(1),
        }
    }
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self::new(2_000_000)
    }
}

impl Solver for BranchAndBound {
    fn solve(
        &self,
        problem: &Problem,
        bound: Option<&Assignment>,
        deadline: Instant,
    ) -> Result<SolveOutcome, SolverError> {
        if Instant::now() >= deadline {
            return Err(SolverError::Deadline(0));
        }
        let mut search = Search::new(problem, bound.cloned(), self.max_nodes, deadline);
        search.descend(0)?;
        Ok(match search.best {
            Some(best) => SolveOutcome::Optimal(best),
            None => SolveOutcome::Infeasible,
        })
    }
}

struct Search<'a> {
    problem: &'a Problem,
    /// For each variable, the `AtMostOne` groups it belongs to.
    groups: Vec<Vec<usize>>,
    group_used: Vec<bool>,
    at_least: Vec<&'a [usize]>,
    chosen: Vec<bool>,
    selected: Vec<usize>,
    cost: u32,
    bound: Option<Assignment>,
    best: Option<Assignment>,
    nodes: u64,
    max_nodes: u64,
    deadline: Instant,
}

impl<'a> Search<'a> {
    fn new(
        problem: &'a Problem,
        bound: Option<Assignment>,
        max_nodes: u64,
        deadline: Instant,
    ) -> Self {
        let n = problem.len();
        let mut groups = vec![Vec::new(); n];
        let mut group_count = 0;
        let mut at_least = Vec::new();
        for c in &problem.constraints {
            match c {
                Constraint::AtMostOne(vars) => {
                    for &v in vars.iter().filter(|&&v| v < n) {
                        groups[v].push(group_count);
                    }
                    group_count += 1;
                }
                Constraint::AtLeastOne(vars) => at_least.push(vars.as_slice()),
            }
        }
        Self {
            problem,
            groups,
            group_used: vec![false; group_count],
            at_least,
            chosen: vec![false; n],
            selected: Vec::new(),
            cost: 0,
            bound,
            best: None,
            nodes: 0,
            max_nodes,
            deadline,
        }
    }

    fn can_take(&self, var: usize) -> bool {
        self.groups[var].iter().all(|&g| !self.group_used[g])
    }

    /// Cheapest completion cost still required by unsatisfied `AtLeastOne` constraints,
    /// or `None` when one of them can no longer be satisfied.
    fn lower_bound(&self, next: usize) -> Option<u32> {
        let mut lb = 0;
        for vars in &self.at_least {
            if vars.iter().any(|&v| v < self.chosen.len() && self.chosen[v]) {
                continue;
            }
            let cheapest = vars
                .iter()
                .filter(|&&v| v >= next && v < self.problem.len() && self.can_take(v))
                .map(|&v| self.problem.costs[v])
                .min()?;
            lb = lb.max(cheapest);
        }
        Some(lb)
    }

    /// The assignment a new solution has to beat.
    fn incumbent(&self) -> Option<&Assignment> {
        match (&self.best, &self.bound) {
            (Some(best), Some(bound)) => Some(if best < bound { best } else { bound }),
            (Some(best), None) => Some(best),
            (None, bound) => bound.as_ref(),
        }
    }

    fn descend(&mut self, var: usize) -> Result<(), SolverError> {
        self.nodes += 1;
        if self.nodes > self.max_nodes {
            return Err(SolverError::NodeLimit(self.max_nodes));
        }
        if self.nodes % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= self.deadline {
            return Err(SolverError::Deadline(self.nodes));
        }

        let Some(lb) = self.lower_bound(var) else {
            return Ok(());
        };
        if let Some(limit) = self.incumbent() {
            let optimistic = self.cost + lb;
            if optimistic > limit.cost
                || (optimistic == limit.cost && self.selected.len() > limit.selected.len())
            {
                return Ok(());
            }
        }

        if var == self.problem.len() {
            let found = Assignment {
                cost: self.cost,
                selected: self.selected.clone(),
            };
            if self.incumbent().is_none_or(|limit| found < *limit) {
                self.best = Some(found);
            }
            return Ok(());
        }

        if self.can_take(var) {
            self.take(var, true);
            let result = self.descend(var + 1);
            self.take(var, false);
            result?;
        }
        self.descend(var + 1)
    }

    fn take(&mut self, var: usize, on: bool) {
        self.chosen[var] = on;
        for &g in &self.groups[var] {
            self.group_used[g] = on;
        }
        if on {
            self.selected.push(var);
            self.cost += self.problem.costs[var];
        } else {
            self.selected.pop();
            self.cost -= self.problem.costs[var];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(10)
    }

    fn solve(problem: &Problem, bound: Option<&Assignment>) -> SolveOutcome {
        BranchAndBound::default().solve(problem, bound, later()).unwrap()
    }

    #[test]
    fn empty_selection_is_optimal_without_cuts() {
        let p = Problem::new(vec![3, 1, 2]);
        assert_eq!(
            solve(&p, None),
            SolveOutcome::Optimal(Assignment {
                cost: 0,
                selected: vec![]
            })
        );
    }

    #[test]
    fn cheapest_member_satisfies_at_least_one() {
        let mut p = Problem::new(vec![3, 1, 2]);
        p.at_least_one(vec![0, 1, 2]);
        assert_eq!(solve(&p, None), SolveOutcome::Optimal(p.assignment(vec![1])));
    }

    #[test]
    fn at_most_one_forces_the_other_combination() {
        let mut p = Problem::new(vec![1, 1, 5]);
        p.at_least_one(vec![0, 2]);
        p.at_least_one(vec![1, 2]);
        p.at_most_one(vec![0, 1]);
        assert_eq!(solve(&p, None), SolveOutcome::Optimal(p.assignment(vec![2])));
    }

    #[test]
    fn ties_prefer_fewer_edits_then_source_order() {
        let mut p = Problem::new(vec![1, 1, 2, 2]);
        p.at_least_one(vec![0, 2, 3]);
        p.at_least_one(vec![1, 2, 3]);
        // {0,1} costs 2 with two edits; {2} and {3} cost 2 with one edit.
        assert_eq!(solve(&p, None), SolveOutcome::Optimal(p.assignment(vec![2])));
    }

    #[test]
    fn bound_excludes_equal_or_worse_solutions() {
        let mut p = Problem::new(vec![2, 3]);
        p.at_least_one(vec![0, 1]);
        let best = p.assignment(vec![0]);
        assert_eq!(solve(&p, Some(&best)), SolveOutcome::Infeasible);
        let worse = p.assignment(vec![1]);
        assert_eq!(solve(&p, Some(&worse)), SolveOutcome::Optimal(best));
    }

    #[test]
    fn cuts_enumerate_in_cost_order() {
        let mut p = Problem::new(vec![1, 2, 4]);
        p.cut(&[]);
        let mut seen = Vec::new();
        while let SolveOutcome::Optimal(a) = solve(&p, None) {
            p.cut(&a.selected);
            seen.push(a.cost);
        }
        // {0}, {1}, {2}: every later set is a superset of an earlier one or crosses the cut.
        assert_eq!(seen.first(), Some(&1));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn unsatisfiable_constraints_are_infeasible() {
        let mut p = Problem::new(vec![1, 1]);
        p.at_least_one(vec![0]);
        p.at_least_one(vec![1]);
        p.at_most_one(vec![0, 1]);
        assert_eq!(solve(&p, None), SolveOutcome::Infeasible);
    }

    #[test]
    fn more_candidates_never_raise_the_optimum() {
        let mut base = Problem::new(vec![4, 6, 3]);
        base.at_least_one(vec![0, 1]);
        base.at_least_one(vec![1, 2]);
        base.at_most_one(vec![0, 2]);
        let SolveOutcome::Optimal(before) = solve(&base, None) else {
            panic!("base problem is feasible");
        };

        let mut extended = Problem::new(vec![4, 6, 3, 5]);
        extended.at_least_one(vec![0, 1, 3]);
        extended.at_least_one(vec![1, 2, 3]);
        extended.at_most_one(vec![0, 2]);
        let SolveOutcome::Optimal(after) = solve(&extended, None) else {
            panic!("extended problem is feasible");
        };
        assert!(after.cost <= before.cost);
        assert_eq!(before.cost, 6);
        assert_eq!(after.cost, 5);
    }

    #[test]
    fn node_limit_interrupts_search() {
        let mut p = Problem::new(vec![1; 20]);
        p.at_least_one((0..20).collect());
        let err = BranchAndBound::new(3).solve(&p, None, later()).unwrap_err();
        assert_eq!(err, SolverError::NodeLimit(3));
    }

    #[test]
    fn expired_deadline_fails_fast() {
        let p = Problem::new(vec![1]);
        let err = BranchAndBound::default()
            .solve(&p, None, Instant::now())
            .unwrap_err();
        assert!(matches!(err, SolverError::Deadline(_)));
    }
}

use rql_core::stmt::Solution;

/// Order in which the solutions of a select are planned.
///
/// Results only depend on it through the order of returned rows. Tests use
/// [`SolutionOrder::Sorted`] to get plans that do not depend on how the
/// solver enumerates types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SolutionOrder {
    /// Keep the order the solver produced
    #[default]
    Solver,

    /// Sort solutions by variable name, then type name
    Sorted,
}

impl SolutionOrder {
    pub(crate) fn apply(self, solutions: &mut [Solution]) {
        if self == SolutionOrder::Sorted {
            solutions.sort();
        }
    }
}

use super::Expr;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExprFunc {
    /// Upper-cased function name
    pub name: String,

    /// `COUNT(DISTINCT X)`
    pub distinct: bool,

    pub args: Vec<Expr>,
}

impl ExprFunc {
    pub fn is_aggregate(&self) -> bool {
        matches!(self.name.as_str(), "COUNT" | "SUM" | "MIN" | "MAX" | "AVG")
    }

    /// Aggregates that can be computed per source and merged afterwards.
    /// `COUNT(DISTINCT ..)` and `AVG` need the raw terms.
    pub fn is_decomposable(&self) -> bool {
        !self.distinct && matches!(self.name.as_str(), "COUNT" | "SUM" | "MIN" | "MAX")
    }

    /// The function merging partial results of this aggregate.
    pub fn merge_name(&self) -> &str {
        match self.name.as_str() {
            "COUNT" => "SUM",
            name => name,
        }
    }
}

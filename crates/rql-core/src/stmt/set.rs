use super::{Node, Relation, Solution};

/// `SET X nom "foo", X travaille Y WHERE ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Set {
    /// Assignments
    pub main_relations: Vec<Relation>,

    pub restriction: Option<Node>,

    pub solutions: Vec<Solution>,
}

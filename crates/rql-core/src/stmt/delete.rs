use super::{Node, Relation, Solution};

/// `DELETE Personne X, X travaille Y WHERE ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    /// Deleted entities: (entity type, variable)
    pub main_vars: Vec<(String, String)>,

    /// Deleted relations
    pub main_relations: Vec<Relation>,

    pub restriction: Option<Node>,

    pub solutions: Vec<Solution>,
}

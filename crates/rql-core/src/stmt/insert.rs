use super::{Node, Relation, Solution};

/// `INSERT Personne X, Societe S: X nom "x", X travaille S WHERE ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    /// New entities: (entity type, variable)
    pub main_vars: Vec<(String, String)>,

    /// Relations assigned on the new entities
    pub main_relations: Vec<Relation>,

    pub restriction: Option<Node>,

    pub solutions: Vec<Solution>,
}

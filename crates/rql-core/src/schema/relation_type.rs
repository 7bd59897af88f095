use super::{Cardinality, RelationPermissions};

/// An attribute or a relation between entity types.
#[derive(Debug, Clone)]
pub struct RelationType {
    pub name: String,

    /// Attributes are relations whose object is a value type.
    pub attribute: bool,

    /// Stored as a column of the subject table rather than in a relation
    /// table. Requires single cardinality on the subject side.
    pub inlined: bool,

    /// `X rel Y` implies `Y rel X`.
    pub symmetric: bool,

    /// Derived from other relations. Can not be written.
    pub computed: bool,

    pub definitions: Vec<RelationDef>,

    pub permissions: RelationPermissions,
}

#[derive(Debug, Clone)]
pub struct RelationDef {
    pub rtype: String,

    /// Subject entity type
    pub subject: String,

    /// Object entity type, or attribute type name for attributes
    pub object: String,

    pub cardinality: Cardinality,

    /// Full-text indexed attribute
    pub fulltext: bool,
}

impl RelationType {
    pub fn definition(&self, subject: &str, object: &str) -> Option<&RelationDef> {
        self.definitions
            .iter()
            .find(|def| def.subject == subject && def.object == object)
    }

    pub fn subject_types(&self) -> Vec<&str> {
        let mut ret: Vec<&str> = vec![];
        for def in &self.definitions {
            if !ret.contains(&def.subject.as_str()) {
                ret.push(&def.subject);
            }
        }
        ret
    }

    pub fn object_types(&self) -> Vec<&str> {
        let mut ret: Vec<&str> = vec![];
        for def in &self.definitions {
            if !ret.contains(&def.object.as_str()) {
                ret.push(&def.object);
            }
        }
        ret
    }
}

impl RelationDef {
    /// Attribute must be set on insert.
    pub fn is_required(&self) -> bool {
        self.cardinality.subject.is_required()
    }
}

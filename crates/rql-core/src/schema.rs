mod attr_type;
pub use attr_type::AttrType;

mod builder;
pub use builder::{Builder, EntityHandle, RelationHandle};

mod cardinality;
pub use cardinality::{Card, Cardinality};

mod entity_type;
pub use entity_type::EntityType;

mod permissions;
pub use permissions::{Action, Permissions, RelationPermissions, RqlExpression, Rule};

mod relation_type;
pub use relation_type::{RelationDef, RelationType};

use indexmap::IndexMap;

/// Relations with built-in meaning. They are never stored and can not be
/// assigned by write statements.
pub const PSEUDO_RELATIONS: &[&str] = &["eid", "has_text", "identity", "is", "is_instance_of"];

/// Entity type every principal is an instance of.
pub const USER_TYPE: &str = "CWUser";

/// Relation linking an entity to the users owning it.
pub const OWNED_BY: &str = "owned_by";

#[derive(Debug, Default)]
pub struct Schema {
    /// Entity types, in declaration order
    pub entities: IndexMap<String, EntityType>,

    /// Attributes and relations, in declaration order
    pub relations: IndexMap<String, RelationType>,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn entity(&self, name: &str) -> Option<&EntityType> {
        self.entities.get(name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationType> {
        self.relations.get(name)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn is_pseudo(rtype: &str) -> bool {
        PSEUDO_RELATIONS.contains(&rtype)
    }

    /// Returns true if `rtype` is an attribute of some entity type.
    pub fn is_attribute(&self, rtype: &str) -> bool {
        self.relation(rtype).map(|rel| rel.attribute).unwrap_or(false)
    }

    /// Definition of attribute `name` on entity type `etype`.
    pub fn attribute(&self, etype: &str, name: &str) -> Option<&RelationDef> {
        let rel = self.relation(name)?;
        if !rel.attribute {
            return None;
        }
        rel.definitions.iter().find(|def| def.subject == etype)
    }

    /// Attribute definitions of `etype`, in declaration order.
    pub fn attributes_of<'a>(&'a self, etype: &'a str) -> impl Iterator<Item = &'a RelationDef> + 'a {
        self.relations
            .values()
            .filter(|rel| rel.attribute)
            .flat_map(move |rel| rel.definitions.iter().filter(move |def| def.subject == etype))
    }

    /// Inlined relations whose subject is `etype`.
    pub fn inlined_of<'a>(&'a self, etype: &'a str) -> impl Iterator<Item = &'a RelationType> + 'a {
        self.relations
            .values()
            .filter(|rel| rel.inlined)
            .filter(move |rel| rel.definitions.iter().any(|def| def.subject == etype))
    }

    /// Entity types with at least one full-text indexed attribute.
    pub fn fulltext_entities(&self) -> Vec<&str> {
        self.entities
            .values()
            .filter(|entity| !entity.fulltext.is_empty())
            .map(|entity| entity.name.as_str())
            .collect()
    }

    /// Subject types `rtype` accepts given the object type, and vice versa.
    /// Pseudo relations are not described here.
    pub fn partner_types(&self, rtype: &str, ty: &str, subject_side: bool) -> Vec<&str> {
        let Some(rel) = self.relation(rtype) else {
            return vec![];
        };

        let mut ret: Vec<&str> = vec![];
        for def in &rel.definitions {
            let (this, other) = if subject_side {
                (&def.subject, &def.object)
            } else {
                (&def.object, &def.subject)
            };
            if this == ty && !ret.contains(&other.as_str()) {
                ret.push(other);
            }
        }
        ret
    }

    /// Returns true if `(subject, object)` is a valid type pair for `rtype`.
    pub fn has_definition(&self, rtype: &str, subject: &str, object: &str) -> bool {
        self.relation(rtype)
            .map(|rel| rel.definition(subject, object).is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        let mut b = Schema::builder();
        b.entity("Personne");
        b.entity("Societe");
        b.attribute("Personne", "nom", AttrType::String).required().fulltext();
        b.attribute("Societe", "nom", AttrType::String);
        b.relation("Personne", "travaille", "Societe");
        b.build().unwrap()
    }

    #[test]
    fn attribute_shared_between_types() {
        let schema = schema();
        assert!(schema.is_attribute("nom"));
        assert!(schema.attribute("Personne", "nom").unwrap().is_required());
        assert!(!schema.attribute("Societe", "nom").unwrap().is_required());
        assert!(schema.attribute("Personne", "travaille").is_none());
    }

    #[test]
    fn builder_adds_users_and_ownership() {
        let schema = schema();
        assert!(schema.entity(USER_TYPE).is_some());
        assert!(schema.has_definition(OWNED_BY, "Personne", USER_TYPE));
        assert!(schema.has_definition(OWNED_BY, "Societe", USER_TYPE));
        assert_eq!(schema.fulltext_entities(), vec!["Personne"]);
    }

    #[test]
    fn partner_types() {
        let schema = schema();
        assert_eq!(schema.partner_types("travaille", "Personne", true), vec!["Societe"]);
        assert_eq!(schema.partner_types("travaille", "Societe", false), vec!["Personne"]);
        assert!(schema.partner_types("travaille", "Societe", true).is_empty());
    }
}

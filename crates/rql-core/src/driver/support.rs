use indexmap::IndexSet;

/// What a source stores.
#[derive(Debug, Clone)]
pub struct Support {
    /// Supported entity types; `None` for every type.
    pub entities: Option<IndexSet<String>>,

    /// Supported non-attribute relations; `None` for every relation.
    pub relations: Option<IndexSet<String>>,

    /// The source maintains a full-text index.
    pub fulltext: bool,

    /// The source is the system source.
    pub system: bool,
}

impl Support {
    /// Support of a system source: everything.
    pub fn system() -> Self {
        Self {
            entities: None,
            relations: None,
            fulltext: true,
            system: true,
        }
    }

    /// Support of an external source restricted to the given entity types
    /// and relations.
    pub fn external<E, R>(entities: E, relations: R) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            entities: Some(entities.into_iter().map(Into::into).collect()),
            relations: Some(relations.into_iter().map(Into::into).collect()),
            fulltext: false,
            system: false,
        }
    }

    pub fn supports_entity(&self, etype: &str) -> bool {
        match &self.entities {
            Some(entities) => entities.contains(etype),
            None => true,
        }
    }

    pub fn supports_relation(&self, rtype: &str) -> bool {
        match &self.relations {
            Some(relations) => relations.contains(rtype),
            None => true,
        }
    }
}

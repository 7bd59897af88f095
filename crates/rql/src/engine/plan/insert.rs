use crate::engine::plan::{Step, Term};

use indexmap::IndexMap;
use rql_core::{
    stmt::{Args, Eid, Row, Value},
    Result,
};

/// Creates entities and relations, once per row of the child (once when
/// there is no child).
#[derive(Debug)]
pub(crate) struct Insert {
    /// New entities, in `INSERT` order
    pub(crate) entities: Vec<EntityDef>,

    pub(crate) relations: Vec<RelationDef>,
}

/// Placeholder for an entity created by the insert.
#[derive(Debug, Clone)]
pub(crate) struct EntityDef {
    pub(crate) var: String,

    pub(crate) etype: String,

    /// Attribute and inlined relation values
    pub(crate) attrs: IndexMap<String, Term>,
}

#[derive(Debug, Clone)]
pub(crate) struct RelationDef {
    pub(crate) subject: Term,
    pub(crate) rtype: String,
    pub(crate) object: Term,
}

/// Definitions with every fetched term replaced by its value.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Expansion {
    pub(crate) entities: Vec<NewEntity>,
    pub(crate) relations: Vec<NewRelation>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NewEntity {
    pub(crate) etype: String,
    pub(crate) attrs: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NewRelation {
    pub(crate) subject: Ref,
    pub(crate) rtype: String,
    pub(crate) object: Ref,
}

/// End of a new relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ref {
    Eid(Eid),

    /// Index in [`Expansion::entities`]
    New(usize),
}

impl Insert {
    /// Expands the definitions for each fetched row.
    pub(crate) fn substitute(&self, rows: &[Row], args: &Args) -> Result<Expansion> {
        let mut ret = Expansion::default();

        for row in rows {
            let base = ret.entities.len();

            for def in &self.entities {
                ret.entities.push(substitute_entity_def(def, row, args)?);
            }

            for def in &self.relations {
                let (Some(subject), Some(object)) = (
                    reference(&def.subject, base, row, args)?,
                    reference(&def.object, base, row, args)?,
                ) else {
                    // optional partner missing
                    continue;
                };
                ret.relations.push(NewRelation {
                    subject,
                    rtype: def.rtype.clone(),
                    object,
                });
            }
        }

        Ok(ret)
    }
}

/// Entity definition with its fetched attribute values.
pub(crate) fn substitute_entity_def(def: &EntityDef, row: &[Value], args: &Args) -> Result<NewEntity> {
    let mut attrs = IndexMap::with_capacity(def.attrs.len());
    for (name, term) in &def.attrs {
        attrs.insert(name.clone(), term.value(row, args)?);
    }
    Ok(NewEntity {
        etype: def.etype.clone(),
        attrs,
    })
}

fn reference(term: &Term, base: usize, row: &[Value], args: &Args) -> Result<Option<Ref>> {
    match term {
        Term::New(index) => Ok(Some(Ref::New(base + index))),
        term => match term.value(row, args)? {
            Value::Null => Ok(None),
            value => Ok(Some(Ref::Eid(value.to_eid()?))),
        },
    }
}

impl From<Insert> for Step {
    fn from(value: Insert) -> Self {
        Step::Insert(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn insert() -> Insert {
        // INSERT Personne X, Note N: X nom "x", N ecrit_par X, X travaille S, N para P
        //     WHERE S nom "Logilab", M para P
        Insert {
            entities: vec![
                EntityDef {
                    var: "X".to_string(),
                    etype: "Personne".to_string(),
                    attrs: IndexMap::from([("nom".to_string(), Term::Value(Value::from("x")))]),
                },
                EntityDef {
                    var: "N".to_string(),
                    etype: "Note".to_string(),
                    attrs: IndexMap::from([("para".to_string(), Term::Fetched(1))]),
                },
            ],
            relations: vec![
                RelationDef {
                    subject: Term::New(1),
                    rtype: "ecrit_par".to_string(),
                    object: Term::New(0),
                },
                RelationDef {
                    subject: Term::New(0),
                    rtype: "travaille".to_string(),
                    object: Term::Fetched(0),
                },
            ],
        }
    }

    #[test]
    fn one_expansion_per_row() {
        let rows = vec![
            vec![Value::I64(10), Value::from("a")],
            vec![Value::I64(11), Value::from("b")],
            vec![Value::I64(12), Value::from("c")],
        ];
        let expansion = insert().substitute(&rows, &Args::new()).unwrap();

        assert_eq!(expansion.entities.len(), 6);
        assert_eq!(expansion.relations.len(), 6);

        assert_eq!(expansion.entities[2].etype, "Personne");
        assert_eq!(expansion.entities[3].etype, "Note");
        assert_eq!(expansion.entities[5].attrs["para"], Value::from("c"));
        assert_eq!(
            expansion.relations[2],
            NewRelation {
                subject: Ref::New(3),
                rtype: "ecrit_par".to_string(),
                object: Ref::New(2),
            }
        );
        assert_eq!(expansion.relations[3].object, Ref::Eid(11));
    }

    #[test]
    fn no_rows_no_entities() {
        let expansion = insert().substitute(&[], &Args::new()).unwrap();
        assert_eq!(expansion, Expansion::default());
    }

    #[test]
    fn entity_def_with_args() {
        let def = EntityDef {
            var: "X".to_string(),
            etype: "Personne".to_string(),
            attrs: IndexMap::from([("nom".to_string(), Term::Arg("name".to_string()))]),
        };
        let args = Args::from([("name".to_string(), Value::from("bidule"))]);

        let entity = substitute_entity_def(&def, &[], &args).unwrap();
        assert_eq!(entity.attrs["nom"], Value::from("bidule"));

        assert!(substitute_entity_def(&def, &[], &Args::new()).is_err());
    }

    #[test]
    fn null_partner_skips_relation() {
        let rows = vec![vec![Value::Null, Value::from("a")]];
        let expansion = insert().substitute(&rows, &Args::new()).unwrap();
        assert_eq!(expansion.entities.len(), 2);
        assert_eq!(expansion.relations.len(), 1);
    }
}

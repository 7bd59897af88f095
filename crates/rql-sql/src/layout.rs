//! Naming of the tables and columns backing a schema.
//!
//! * `entities(eid, type, source)` records every entity and its owner.
//! * `cw_<EType>(cw_eid, cw_<attr>.., cw_<inlined relation>..)` holds one row
//!   per entity of a type.
//! * `<rtype>_relation(eid_from, eid_to)` holds non-inlined relations.
//! * `word(word_id, word)` / `appears(uid, word_id)` is the full-text index.
//!
//! Names are built from schema identifiers and never need quoting.

use crate::stmt::{ColumnDef, Statement, Type};

use rql_core::{
    schema::{AttrType, Schema},
    stmt::Value,
};

pub const ENTITIES: &str = "entities";
pub const EID: &str = "cw_eid";
pub const FROM: &str = "eid_from";
pub const TO: &str = "eid_to";
pub const WORD: &str = "word";
pub const APPEARS: &str = "appears";

pub fn entity_table(etype: &str) -> String {
    format!("cw_{etype}")
}

pub fn column(name: &str) -> String {
    format!("cw_{name}")
}

pub fn relation_table(rtype: &str) -> String {
    format!("{rtype}_relation")
}

/// Splits text into full-text index words: lower-cased runs of alphanumeric
/// characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();
    words.dedup();
    words
}

/// Statements creating the tables for `schema`, restricted to the entity
/// types and relations `owns` accepts.
pub fn create_schema(
    schema: &Schema,
    owns_entity: impl Fn(&str) -> bool,
    owns_relation: impl Fn(&str) -> bool,
) -> Vec<Statement> {
    let mut ret = vec![Statement::create_table(
        ENTITIES,
        vec![
            ColumnDef::primary_key("eid").auto_increment(),
            ColumnDef::new("type", Type::Text).not_null(),
            ColumnDef::new("source", Type::Text).not_null(),
        ],
    )];

    for etype in schema.entity_types().filter(|etype| owns_entity(etype)) {
        let mut columns = vec![ColumnDef::primary_key(EID)];

        for def in schema.attributes_of(etype) {
            let Some(ty) = AttrType::from_name(&def.object) else {
                continue;
            };
            let mut col = ColumnDef::new(column(&def.rtype), Type::from_attr(ty));
            if def.is_required() {
                col = col.not_null();
            }
            columns.push(col);
        }

        for rel in schema.inlined_of(etype) {
            columns.push(ColumnDef::new(column(&rel.name), Type::Integer));
        }

        ret.push(Statement::create_table(entity_table(etype), columns));
    }

    for rel in schema.relations.values() {
        if rel.attribute || rel.inlined || rel.computed || !owns_relation(&rel.name) {
            continue;
        }
        let table = relation_table(&rel.name);
        ret.push(Statement::create_table(
            &table,
            vec![
                ColumnDef::new(FROM, Type::Integer).not_null(),
                ColumnDef::new(TO, Type::Integer).not_null(),
            ],
        ));
        ret.push(Statement::create_index(
            format!("{table}_to_idx"),
            &table,
            vec![TO.to_string()],
        ));
    }

    ret.push(Statement::create_table(
        WORD,
        vec![
            ColumnDef::primary_key("word_id").auto_increment(),
            ColumnDef::new("word", Type::Text).not_null().unique(),
        ],
    ));
    ret.push(Statement::create_table(
        APPEARS,
        vec![
            ColumnDef::new("uid", Type::Integer).not_null(),
            ColumnDef::new("word_id", Type::Integer).not_null(),
        ],
    ));
    ret.push(Statement::create_index(
        "appears_word_idx",
        APPEARS,
        vec!["word_id".to_string()],
    ));

    ret
}

/// Attribute values as stored: booleans become integers where the backend
/// has no boolean type.
pub fn storage_value(value: Value) -> Value {
    match value {
        Value::Bool(b) => Value::I64(b as i64),
        value => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_text() {
        assert_eq!(
            tokenize("Hello, World! l'été 2024"),
            vec!["hello", "world", "l", "été", "2024"]
        );
        assert!(tokenize(" ,; ").is_empty());
    }

    #[test]
    fn naming() {
        assert_eq!(entity_table("Personne"), "cw_Personne");
        assert_eq!(column("nom"), "cw_nom");
        assert_eq!(relation_table("travaille"), "travaille_relation");
    }
}

use crate::{execute, select};

use indexmap::IndexMap;
use rql_core::{
    driver::{
        operation::{DeleteEntities, DeleteRelations, InsertEntity, InsertRelations, UpdateEntity},
        Response, Support,
    },
    schema::{RelationType, Schema},
    stmt::{Eid, Value},
    Error, Result,
};
use rql_sql::{layout, stmt::Filter, Statement};
use rusqlite::Connection;

pub(crate) fn insert_entity(
    connection: &Connection,
    schema: &Schema,
    op: InsertEntity,
) -> Result<Response> {
    let mut columns = vec![layout::EID.to_string()];
    let mut row = vec![Value::I64(op.eid)];
    for (name, value) in &op.attrs {
        columns.push(layout::column(name));
        row.push(layout::storage_value(value.clone()));
    }

    let count = execute(
        connection,
        &Statement::insert(layout::entity_table(&op.etype), &columns, vec![row]),
    )?;

    index_words(connection, schema, &op.etype, op.eid, &op.attrs)?;
    Ok(Response::count(count as u64))
}

pub(crate) fn update_entity(
    connection: &Connection,
    schema: &Schema,
    op: UpdateEntity,
) -> Result<Response> {
    if op.attrs.is_empty() {
        return Ok(Response::count(0));
    }

    let table = layout::entity_table(&op.etype);
    let count = execute(
        connection,
        &Statement::update(
            &table,
            op.attrs
                .iter()
                .map(|(name, value)| (layout::column(name), layout::storage_value(value.clone()))),
            vec![Filter::eq(layout::EID, op.eid)],
        ),
    )?;

    let Some(entity) = schema.entity(&op.etype) else {
        return Ok(Response::count(count as u64));
    };
    if !entity.fulltext.iter().any(|attr| op.attrs.contains_key(attr)) {
        return Ok(Response::count(count as u64));
    }

    // Reindex from the stored row: untouched indexed attributes keep their
    // words.
    let columns: Vec<String> = entity.fulltext.iter().map(|attr| layout::column(attr)).collect();
    let types = vec!["String"; columns.len()];
    let rows = select(
        connection,
        &Statement::select(&table, &columns, vec![Filter::eq(layout::EID, op.eid)]),
        &types,
    )?;
    let attrs: IndexMap<String, Value> = match rows.into_iter().next() {
        Some(row) => entity.fulltext.iter().cloned().zip(row).collect(),
        None => IndexMap::new(),
    };

    execute(
        connection,
        &Statement::delete(layout::APPEARS, vec![Filter::eq("uid", op.eid)]),
    )?;
    index_words(connection, schema, &op.etype, op.eid, &attrs)?;

    Ok(Response::count(count as u64))
}

pub(crate) fn insert_relations(
    connection: &Connection,
    schema: &Schema,
    support: &Support,
    op: InsertRelations,
) -> Result<Response> {
    let rel = relation(schema, &op.rtype)?;

    if rel.inlined {
        let mut count = 0;
        for (from, to) in &op.pairs {
            for subject in stored_subjects(rel, support) {
                count += execute(
                    connection,
                    &Statement::update(
                        layout::entity_table(subject),
                        [(layout::column(&rel.name), Value::I64(*to))],
                        vec![Filter::eq(layout::EID, *from)],
                    ),
                )?;
            }
        }
        return Ok(Response::count(count as u64));
    }

    let rows: Vec<Vec<Value>> = pairs(rel, &op.pairs)
        .map(|(from, to)| vec![Value::I64(from), Value::I64(to)])
        .collect();
    if rows.is_empty() {
        return Ok(Response::count(0));
    }

    let count = execute(
        connection,
        &Statement::insert(
            layout::relation_table(&rel.name),
            &[layout::FROM, layout::TO],
            rows,
        ),
    )?;
    Ok(Response::count(count as u64))
}

pub(crate) fn delete_relations(
    connection: &Connection,
    schema: &Schema,
    support: &Support,
    op: DeleteRelations,
) -> Result<Response> {
    let rel = relation(schema, &op.rtype)?;
    let mut count = 0;

    if rel.inlined {
        let column = layout::column(&rel.name);
        for (from, to) in &op.pairs {
            for subject in stored_subjects(rel, support) {
                count += execute(
                    connection,
                    &Statement::update(
                        layout::entity_table(subject),
                        [(column.clone(), Value::Null)],
                        vec![Filter::eq(layout::EID, *from), Filter::eq(&column, *to)],
                    ),
                )?;
            }
        }
        return Ok(Response::count(count as u64));
    }

    let table = layout::relation_table(&rel.name);
    for (from, to) in pairs(rel, &op.pairs) {
        count += execute(
            connection,
            &Statement::delete(
                &table,
                vec![Filter::eq(layout::FROM, from), Filter::eq(layout::TO, to)],
            ),
        )?;
    }
    Ok(Response::count(count as u64))
}

/// Deletes entity rows, every relation instance referencing them and their
/// full-text index entries.
pub(crate) fn delete_entities(
    connection: &Connection,
    schema: &Schema,
    support: &Support,
    op: DeleteEntities,
) -> Result<Response> {
    if op.entities.is_empty() {
        return Ok(Response::count(0));
    }

    let mut by_type: IndexMap<&str, Vec<Value>> = IndexMap::new();
    for (eid, etype) in &op.entities {
        by_type.entry(etype).or_default().push(Value::I64(*eid));
    }
    let eids: Vec<Value> = op.entities.iter().map(|(eid, _)| Value::I64(*eid)).collect();

    let mut count = 0;
    for (etype, eids) in by_type {
        if !support.supports_entity(etype) {
            continue;
        }
        count += execute(
            connection,
            &Statement::delete(
                layout::entity_table(etype),
                vec![Filter::any_of(layout::EID, eids)],
            ),
        )?;
    }

    for rel in schema.relations.values() {
        if rel.attribute || rel.computed || !support.supports_relation(&rel.name) {
            continue;
        }

        if rel.inlined {
            let column = layout::column(&rel.name);
            for subject in stored_subjects(rel, support) {
                execute(
                    connection,
                    &Statement::update(
                        layout::entity_table(subject),
                        [(column.clone(), Value::Null)],
                        vec![Filter::any_of(&column, eids.clone())],
                    ),
                )?;
            }
            continue;
        }

        let table = layout::relation_table(&rel.name);
        for column in [layout::FROM, layout::TO] {
            execute(
                connection,
                &Statement::delete(&table, vec![Filter::any_of(column, eids.clone())]),
            )?;
        }
    }

    execute(
        connection,
        &Statement::delete(layout::APPEARS, vec![Filter::any_of("uid", eids.clone())]),
    )?;
    execute(
        connection,
        &Statement::delete(layout::ENTITIES, vec![Filter::any_of("eid", eids)]),
    )?;

    Ok(Response::count(count as u64))
}

/// Adds the words of the full-text indexed attributes in `attrs` to the
/// index.
fn index_words(
    connection: &Connection,
    schema: &Schema,
    etype: &str,
    eid: Eid,
    attrs: &IndexMap<String, Value>,
) -> Result<()> {
    let Some(entity) = schema.entity(etype) else {
        return Ok(());
    };

    let mut words: Vec<String> = vec![];
    for attr in &entity.fulltext {
        let Some(text) = attrs.get(attr).and_then(Value::as_str) else {
            continue;
        };
        for word in layout::tokenize(text) {
            if !words.contains(&word) {
                words.push(word);
            }
        }
    }

    for word in words {
        let found = select(
            connection,
            &Statement::select(layout::WORD, &["word_id"], vec![Filter::eq("word", &word)]),
            &["Int"],
        )?;
        let word_id = match found.first().and_then(|row| row.first()) {
            Some(word_id) => word_id.clone(),
            None => {
                execute(
                    connection,
                    &Statement::insert(layout::WORD, &["word"], vec![vec![Value::from(word)]]),
                )?;
                Value::I64(connection.last_insert_rowid())
            }
        };

        execute(
            connection,
            &Statement::insert(
                layout::APPEARS,
                &["uid", "word_id"],
                vec![vec![Value::I64(eid), word_id]],
            ),
        )?;
    }

    Ok(())
}

fn relation<'a>(schema: &'a Schema, rtype: &str) -> Result<&'a RelationType> {
    schema
        .relation(rtype)
        .filter(|rel| !rel.attribute)
        .ok_or_else(|| Error::query(format!("unknown relation `{rtype}`")))
}

/// Subject types of an inlined relation whose tables the source holds.
fn stored_subjects<'a>(rel: &'a RelationType, support: &'a Support) -> impl Iterator<Item = &'a str> {
    rel.subject_types()
        .into_iter()
        .filter(move |etype| support.supports_entity(etype))
}

/// Stored rows for relation instances: both directions of a symmetric
/// relation.
fn pairs<'a>(rel: &RelationType, pairs: &'a [(Eid, Eid)]) -> impl Iterator<Item = (Eid, Eid)> + 'a {
    let symmetric = rel.symmetric;
    pairs.iter().flat_map(move |&(from, to)| {
        let reverse = (symmetric && from != to).then_some((to, from));
        std::iter::once((from, to)).chain(reverse)
    })
}

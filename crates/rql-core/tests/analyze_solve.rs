use rql_core::analyze::{self, KnownTypes};
use rql_core::schema::{AttrType, Schema};
use rql_core::stmt::{Solution, Statement};
use rql_core::parse;
use std_util::{assert_err, assert_ok};

fn schema() -> Schema {
    let mut b = Schema::builder();
    b.entity("Personne");
    b.entity("Societe");
    b.entity("Note");
    b.attribute("Personne", "nom", AttrType::String).required().fulltext();
    b.attribute("Personne", "age", AttrType::Int);
    b.attribute("Societe", "nom", AttrType::String).fulltext();
    b.attribute("Note", "type", AttrType::String);
    b.relation("Personne", "travaille", "Societe");
    b.relation("Note", "ecrit_par", "Personne")
        .cardinality("?*")
        .inlined();
    b.relation("Personne", "connait", "Personne").symmetric();
    b.build().unwrap()
}

fn solve(text: &str) -> rql_core::Result<Statement> {
    let schema = schema();
    let mut stmt = parse::parse(text)?;
    analyze::solve(&schema, &mut stmt, &KnownTypes::new())?;
    Ok(stmt)
}

fn solutions(text: &str) -> Vec<Solution> {
    let stmt = assert_ok!(solve(text));
    stmt.as_select().unwrap().selects[0].solutions.clone()
}

fn sol(pairs: &[(&str, &str)]) -> Solution {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

#[test]
fn relation_narrows_both_sides() {
    assert_eq!(
        solutions("Any X, Y WHERE X travaille Y"),
        vec![sol(&[("X", "Personne"), ("Y", "Societe")])]
    );
}

#[test]
fn shared_attribute_is_ambiguous() {
    assert_eq!(
        solutions("Any X WHERE X nom N"),
        vec![
            sol(&[("N", "String"), ("X", "Personne")]),
            sol(&[("N", "String"), ("X", "Societe")]),
        ]
    );
}

#[test]
fn is_restricts_type() {
    assert_eq!(
        solutions("Any X WHERE X is Societe, X nom 'Logilab'"),
        vec![sol(&[("X", "Societe")])]
    );
}

#[test]
fn or_branches_union_domains() {
    assert_eq!(
        solutions("Any X WHERE X age 12 OR X type 'todo'"),
        vec![sol(&[("X", "Personne")]), sol(&[("X", "Note")])]
    );
}

#[test]
fn full_text_types() {
    assert_eq!(
        solutions("Any X WHERE X has_text 'bla'"),
        vec![sol(&[("X", "Personne")]), sol(&[("X", "Societe")])]
    );
}

#[test]
fn known_eid_types() {
    let schema = schema();
    let mut stmt = parse::parse("Any X, Y WHERE X eid 12, X connait Y").unwrap();
    let mut known = KnownTypes::new();
    known.insert("X".to_string(), "Personne".to_string());
    analyze::solve(&schema, &mut stmt, &known).unwrap();

    assert_eq!(
        stmt.as_select().unwrap().selects[0].solutions,
        vec![sol(&[("X", "Personne"), ("Y", "Personne")])]
    );
}

#[test]
fn no_solution_is_a_type_error() {
    let err = assert_err!(solve("Any X WHERE X travaille Y, X is Societe"));
    assert!(err.is_type_resolution());
}

#[test]
fn unknown_relation_is_a_query_error() {
    let err = assert_err!(solve("Any X WHERE X vole Y"));
    assert!(err.is_query());
    assert_eq!(err.to_string(), "bad query: unknown relation `vole`");

    let err = assert_err!(solve("Any X WHERE X is Avion"));
    assert!(err.is_query());
}

#[test]
fn entity_relation_needs_an_eid() {
    let err = assert_err!(solve("Any X WHERE X nom N, X travaille 'a'"));
    assert!(err.is_query(), "{err}");

    let err = assert_err!(solve("Any X WHERE X travaille IN(12, 'a')"));
    assert!(err.is_query(), "{err}");

    assert_ok!(solve("Any X WHERE X travaille 12"));
    assert_ok!(solve("Any X WHERE X nom 'a'"));
}

#[test]
fn unbound_variable() {
    let err = assert_err!(solve("Any X, Y WHERE X nom 'a'"));
    assert_eq!(err.to_string(), "bad query: variable Y is not bound");
}

#[test]
fn insert_declares_types() {
    let stmt = assert_ok!(solve("INSERT Personne X: X travaille S WHERE S nom 'Logilab'"));
    let Statement::Insert(insert) = stmt else {
        panic!("expected insert")
    };
    assert_eq!(
        insert.solutions,
        vec![sol(&[("S", "Societe"), ("X", "Personne")])]
    );
}

#[test]
fn symmetric_relation_accepts_both_directions() {
    assert_eq!(
        solutions("Any X WHERE X connait Y, Y is Personne"),
        vec![sol(&[("X", "Personne"), ("Y", "Personne")])]
    );
}

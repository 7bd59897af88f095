use rql_core::analyze::{self, KnownTypes};
use rql_core::parse;
use rql_core::schema::{AttrType, Schema};
use rql_core::stmt::{ScopeKind, Select, Statement, VarKind};

fn schema() -> Schema {
    let mut b = Schema::builder();
    b.entity("Personne");
    b.entity("Societe");
    b.entity("Note");
    b.attribute("Personne", "nom", AttrType::String).fulltext();
    b.attribute("Societe", "nom", AttrType::String);
    b.relation("Personne", "travaille", "Societe");
    b.relation("Note", "ecrit_par", "Personne")
        .cardinality("?*")
        .inlined();
    b.relation("Personne", "connait", "Personne").symmetric();
    b.build().unwrap()
}

fn annotated(text: &str) -> Select {
    let schema = schema();
    let mut stmt = parse::parse(text).unwrap();
    analyze::solve(&schema, &mut stmt, &KnownTypes::new()).unwrap();
    let Statement::Select(mut union) = stmt else {
        panic!("expected a select")
    };
    let mut select = union.selects.remove(0);
    analyze::annotate(&schema, &mut select);
    select
}

#[test]
fn plain_relation_is_invariant() {
    let select = annotated("Any X WHERE X travaille S");
    assert!(select.vars["S"].invariant);
    assert!(select.vars["X"].invariant);
    assert!(select.vars["X"].selected);
    assert!(!select.vars["S"].selected);
}

#[test]
fn attribute_access_breaks_invariance() {
    let select = annotated("Any X, N WHERE X travaille S, X nom N");
    assert!(!select.vars["X"].invariant);
    assert!(select.vars["X"].attribute_access);
    assert_eq!(select.vars["N"].kind, VarKind::Attribute);
    assert!(select.vars["S"].invariant);
}

#[test]
fn negated_variable_scope() {
    let select = annotated("Any X WHERE X nom N, NOT X travaille S");

    assert_eq!(select.scopes.len(), 2);
    assert_eq!(select.scopes[1].kind, ScopeKind::Not);
    assert_eq!(select.scopes[1].parent, Some(0));

    let s = &select.vars["S"];
    assert_eq!(s.scope, 1);
    assert!(s.invariant);
    assert!(s.only_negated());

    assert_eq!(select.vars["X"].scope, 0);
    assert!(!select.vars["X"].only_negated());
}

#[test]
fn exists_opens_a_scope() {
    let select = annotated("Any X WHERE X nom N, EXISTS(X travaille S)");
    assert_eq!(select.scopes[1].kind, ScopeKind::Exists);
    assert_eq!(select.vars["S"].scope, 1);
    assert!(select.vars["S"].invariant);
}

#[test]
fn optional_side() {
    let select = annotated("Any X, S WHERE X nom N, X travaille S?");
    assert!(select.vars["S"].optional);
    assert!(!select.vars["S"].invariant);
    assert!(!select.vars["X"].optional);
}

#[test]
fn inlined_relation_subject_is_not_principal() {
    let select = annotated("Any N WHERE N ecrit_par P");
    assert!(select.vars["P"].invariant);
    assert!(!select.vars["N"].invariant);
}

#[test]
fn symmetric_and_or_are_never_principal() {
    let select = annotated("Any X WHERE X connait Y");
    assert!(!select.vars["Y"].invariant);

    let select = annotated("Any X WHERE X travaille S OR X connait S");
    assert!(select.vars.values().all(|info| !info.invariant));
}

#[test]
fn type_restriction_is_not_principal() {
    let select = annotated("Any S WHERE X travaille S, X is Personne");
    assert!(!select.vars["X"].invariant);
}

use tests::prelude::*;

use pretty_assertions::assert_eq;
use rql::Session;
use rql_core::{driver::operation::Search, stmt::Expr};
use std::collections::BTreeMap;

/// Personnes as `(nom, prenom)`, the first ones in the system source, the
/// others in the external one.
async fn personnes(test: &RqlTest, system: &[(&str, &str)], external: &[(&str, &str)]) {
    let mut session = test.admin();
    for (source, personnes) in [(None, system), (Some(EXTERN), external)] {
        assert_ok!(session.set_write_source(source));
        for (nom, prenom) in personnes {
            exec(
                &mut session,
                "INSERT Personne X: X nom %(nom)s, X prenom %(prenom)s",
                args([("nom", (*nom).into()), ("prenom", (*prenom).into())]),
            )
            .await;
        }
    }
    assert_ok!(session.commit().await);
}

/// Aggregates selected by the staging searches of a source.
fn staged_aggregates(searches: &[Search]) -> Vec<String> {
    let mut ret = vec![];
    for search in searches {
        for select in &search.union.selects {
            for expr in &select.selection {
                if let Expr::Func(func) = expr {
                    if func.is_aggregate() {
                        ret.push(func.name.clone());
                    }
                }
            }
        }
    }
    ret
}

async fn column(session: &mut Session, rql: &str) -> Vec<Value> {
    exec(session, rql, Args::new())
        .await
        .into_iter()
        .map(|row| row[0].clone())
        .collect()
}

#[tokio::test]
async fn sources_are_registered_in_order() {
    let test = RqlTest::multi().await;
    assert_eq!(test.repo.source_uris(), vec!["sqlite::memory:", EXTERN]);

    let mut session = test.admin();
    let err = assert_err!(session.set_write_source(Some("sqlite:nowhere")));
    assert!(!err.is_unauthorized());
}

#[tokio::test]
async fn inserts_go_to_the_write_source() {
    let mut test = RqlTest::multi().await;
    let mut session = test.admin();
    assert_ok!(session.set_write_source(Some(EXTERN)));

    let eid = insert(&mut session, "INSERT Personne X: X nom 'ext'", Args::new()).await;
    assert_ok!(session.commit().await);

    assert!(test.extern_log().has_insert_entity());
    assert!(!test.system_log().has_insert_entity());
    // the system source still allocates the eid
    assert!(test.system_log().names().contains(&"create_entity"));

    test.clear_logs();
    let rows = exec(
        &mut session,
        "Any N WHERE X eid %(x)s, X nom N",
        args([("x", Value::I64(eid))]),
    )
    .await;
    assert_eq!(rows, vec![vec![Value::from("ext")]]);
    assert!(test.extern_log().has_search());

    // types the external source does not store fall back to the system one
    assert_ok!(session.set_write_source(Some(EXTERN)));
    test.clear_logs();
    exec(
        &mut session,
        "INSERT Note N: N titre 'note'",
        Args::new(),
    )
    .await;
    assert!(test.system_log().has_insert_entity());
    assert!(!test.extern_log().has_insert_entity());
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn rows_of_every_source_are_returned() {
    let test = RqlTest::multi().await;
    personnes(&test, &[("a", "x"), ("c", "x")], &[("b", "x"), ("d", "x")]).await;
    let mut session = test.admin();

    let found = column(&mut session, "Any N WHERE X is Personne, X nom N").await;
    assert_eq_unordered!(found, ["a", "b", "c", "d"].map(Value::from));

    let found = column(
        &mut session,
        "Any N ORDERBY N LIMIT 3 WHERE X is Personne, X nom N",
    )
    .await;
    assert_eq!(found, ["a", "b", "c"].map(Value::from).to_vec());

    let found = column(
        &mut session,
        "Any N ORDERBY N DESC LIMIT 2 OFFSET 1 WHERE X is Personne, X nom N",
    )
    .await;
    assert_eq!(found, ["c", "b"].map(Value::from).to_vec());

    // limit without sort: a budget shared by the sources
    let found = column(&mut session, "Any X LIMIT 3 WHERE X is Personne").await;
    assert_eq!(found.len(), 3);

    let found = column(&mut session, "DISTINCT Any P WHERE X is Personne, X prenom P").await;
    assert_eq!(found, vec![Value::from("x")]);
}

#[tokio::test]
async fn aggregates_merge_partial_results() {
    let mut test = RqlTest::multi().await;
    personnes(
        &test,
        &[("a", "xx"), ("a", "yyyy"), ("b", "z")],
        &[("a", "w"), ("b", "vvv"), ("c", "uu")],
    )
    .await;
    let mut session = test.admin();

    test.clear_logs();
    let rows = exec(
        &mut session,
        "Any COUNT(X) WHERE X is Personne",
        Args::new(),
    )
    .await;
    assert_eq!(rows, vec![vec![Value::I64(6)]]);
    // each source counts its own rows
    assert_eq!(staged_aggregates(&test.extern_log().searches()), ["COUNT"]);

    let rows = exec(
        &mut session,
        "Any N, COUNT(X) GROUPBY N ORDERBY N WHERE X is Personne, X nom N",
        Args::new(),
    )
    .await;
    assert_eq!(
        rows,
        vec![
            vec![Value::from("a"), Value::I64(3)],
            vec![Value::from("b"), Value::I64(2)],
            vec![Value::from("c"), Value::I64(1)],
        ]
    );

    // the same aggregate computed over the rows of both sources
    let mut expected: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    let rows = exec(
        &mut session,
        "Any X, N, D WHERE X is Personne, X nom N, X prenom D",
        Args::new(),
    )
    .await;
    assert_eq!(rows.len(), 6);
    for row in rows {
        let eid = row[0].to_eid().unwrap();
        let nom = row[1].as_str().unwrap().to_string();
        let len = row[2].as_str().unwrap().len() as i64;
        let entry = expected.entry(nom).or_insert((eid, len));
        entry.0 = entry.0.max(eid);
        entry.1 = entry.1.min(len);
    }
    let expected: Vec<Vec<Value>> = expected
        .into_iter()
        .map(|(nom, (max, min))| vec![Value::I64(max + min), Value::from(nom)])
        .collect();

    test.clear_logs();
    let rows = exec(
        &mut session,
        "Any MAX(X)+MIN(LENGTH(D)), N GROUPBY N ORDERBY N WHERE X is Personne, X nom N, X prenom D",
        Args::new(),
    )
    .await;
    assert_eq!(rows, expected);
    assert_eq!(staged_aggregates(&test.extern_log().searches()), ["MAX", "MIN"]);
    assert_eq!(staged_aggregates(&test.system_log().searches()), ["MAX", "MIN"]);
}

#[tokio::test]
async fn relations_across_sources() {
    let mut test = RqlTest::multi().await;
    personnes(
        &test,
        &[("sys", "x"), ("sys2", "x")],
        &[("ext", "x"), ("ext2", "x"), ("ext3", "x")],
    )
    .await;

    let mut session = test.admin();
    exec(&mut session, "INSERT Societe S: S nom 'Logilab'", Args::new()).await;
    assert_ok!(session.set_write_source(Some(EXTERN)));
    exec(&mut session, "INSERT Societe S: S nom 'Ailleurs'", Args::new()).await;
    assert_ok!(session.set_write_source(None));
    exec(
        &mut session,
        "SET X travaille S WHERE X is Personne, X nom IN('sys', 'ext'), S nom 'Logilab'",
        Args::new(),
    )
    .await;
    // both ends external: stored by the external source
    exec(
        &mut session,
        "SET X travaille S WHERE X nom 'ext3', S nom 'Ailleurs'",
        Args::new(),
    )
    .await;
    assert_ok!(session.commit().await);

    let rows = exec(
        &mut session,
        "Any N, SN ORDERBY N WHERE X travaille S, X nom N, S nom SN",
        Args::new(),
    )
    .await;
    assert_eq!(
        rows,
        vec![
            vec![Value::from("ext"), Value::from("Logilab")],
            vec![Value::from("ext3"), Value::from("Ailleurs")],
            vec![Value::from("sys"), Value::from("Logilab")],
        ]
    );

    // checked against the relations of each source, rows kept by all
    test.clear_logs();
    let found = column(
        &mut session,
        "Any N WHERE X is Personne, X nom N, NOT X travaille S",
    )
    .await;
    assert_eq_unordered!(found, ["ext2", "sys2"].map(Value::from));
    assert!(test.extern_log().searches().iter().any(|search| {
        search.union.selects[0].to_string().contains("travaille")
    }));
}

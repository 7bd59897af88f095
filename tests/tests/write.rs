use tests::prelude::*;

use pretty_assertions::assert_eq;

async fn names(session: &mut rql::Session, rql: &str) -> Vec<Value> {
    exec(session, rql, Args::new())
        .await
        .into_iter()
        .map(|row| row[0].clone())
        .collect()
}

#[tokio::test]
async fn insert_with_relation_to_existing_entity() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    exec(&mut session, "INSERT Societe S: S nom 'Logilab'", Args::new()).await;
    let rows = exec(
        &mut session,
        "INSERT Personne X: X nom 'toto', X travaille S WHERE S is Societe, S nom 'Logilab'",
        Args::new(),
    )
    .await;
    assert_eq!(rows.len(), 1);

    let found = names(
        &mut session,
        "Any N WHERE X travaille S, X nom N, S nom 'Logilab'",
    )
    .await;
    assert_eq!(found, vec![Value::from("toto")]);
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn insert_inlined_relation() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    let societe = insert(&mut session, "INSERT Societe S: S nom 'Logilab'", Args::new()).await;
    exec(
        &mut session,
        "INSERT Personne X: X nom 'boss', X dirige S WHERE S eid %(s)s",
        args([("s", Value::I64(societe))]),
    )
    .await;

    let rows = exec(&mut session, "Any N, S WHERE X dirige S, X nom N", Args::new()).await;
    assert_eq!(rows, vec![vec![Value::from("boss"), Value::I64(societe)]]);
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn insert_related_new_entities() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    let rows = exec(
        &mut session,
        "INSERT Personne X, Personne Y: X nom 'a', Y nom 'b', X connait Y",
        Args::new(),
    )
    .await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 2);

    // stored both ways
    let found = names(
        &mut session,
        "Any N WHERE X nom 'b', X connait Y, Y nom N",
    )
    .await;
    assert_eq!(found, vec![Value::from("a")]);
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn insert_one_entity_per_restriction_row() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    for nom in ["a", "b"] {
        exec(
            &mut session,
            "INSERT Societe S: S nom %(nom)s",
            args([("nom", nom.into())]),
        )
        .await;
    }
    let rows = exec(
        &mut session,
        "INSERT Personne X: X nom N WHERE S is Societe, S nom N",
        Args::new(),
    )
    .await;
    assert_eq!(rows.len(), 2);

    let found = names(&mut session, "Any N ORDERBY N WHERE X is Personne, X nom N").await;
    assert_eq!(found, vec![Value::from("a"), Value::from("b")]);
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn invalid_inserts() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    let err = assert_err!(
        session
            .execute("INSERT Personne X: X nom 'a', X eid 12", Args::new(), false)
            .await
    );
    assert!(err.is_query(), "{err}");

    let err = assert_err!(
        session
            .execute("INSERT Personne X: X prenom 'a'", Args::new(), false)
            .await
    );
    assert!(err.is_validation(), "{err}");

    let err = assert_err!(
        session
            .execute("INSERT Personne X: X nom 'a', X age 'old'", Args::new(), false)
            .await
    );
    assert!(err.is_validation(), "{err}");

    let err = assert_err!(
        session
            .execute("INSERT Chose X: X nom 'a'", Args::new(), false)
            .await
    );
    assert!(!err.is_syntax(), "{err}");
    assert_ok!(session.rollback().await);
}

#[tokio::test]
async fn delete_relation_keeps_unrelated_rows() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    for (personne, societe) in [("a", "Logilab"), ("b", "Logilab"), ("c", "Other")] {
        exec(
            &mut session,
            "INSERT Personne X, Societe S: X nom %(p)s, S nom %(s)s, X travaille S",
            args([("p", personne.into()), ("s", societe.into())]),
        )
        .await;
    }

    exec(
        &mut session,
        "DELETE X travaille Y WHERE X is Personne, Y nom 'Logilab'",
        Args::new(),
    )
    .await;

    let rows = exec(
        &mut session,
        "Any N, SN WHERE X travaille S, X nom N, S nom SN",
        Args::new(),
    )
    .await;
    assert_eq!(rows, vec![vec![Value::from("c"), Value::from("Other")]]);

    // the entities survive
    let found = names(&mut session, "Any N ORDERBY N WHERE X is Personne, X nom N").await;
    assert_eq!(found.len(), 3);
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn delete_entities() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    for nom in ["a", "b"] {
        exec(
            &mut session,
            "INSERT Personne X, Societe S: X nom %(nom)s, S nom 'Logilab', X travaille S",
            args([("nom", nom.into())]),
        )
        .await;
    }

    let res = assert_ok!(
        session
            .execute("DELETE Personne X WHERE X nom 'a'", Args::new(), true)
            .await
    );
    assert_eq!(
        res.description,
        Some(Description::Uniform(vec!["Personne".to_string()]))
    );

    let found = names(&mut session, "Any N WHERE X is Personne, X nom N").await;
    assert_eq!(found, vec![Value::from("b")]);

    // relations of deleted entities go with them
    let rows = exec(&mut session, "Any X WHERE X travaille S", Args::new()).await;
    assert_eq!(rows.len(), 1);
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn set_attributes() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    let eid = insert(
        &mut session,
        "INSERT Personne X: X nom 'a', X age 30",
        Args::new(),
    )
    .await;
    exec(
        &mut session,
        "INSERT Personne X: X nom 'b', X age 50",
        Args::new(),
    )
    .await;

    exec(
        &mut session,
        "SET X prenom 'alice' WHERE X eid %(x)s",
        args([("x", Value::I64(eid))]),
    )
    .await;
    exec(&mut session, "SET X age A + 1 WHERE X is Personne, X age A", Args::new()).await;

    let rows = exec(
        &mut session,
        "Any N, P, A ORDERBY N WHERE X is Personne, X nom N, X prenom P?, X age A",
        Args::new(),
    )
    .await;
    assert_eq!(
        rows,
        vec![
            vec![Value::from("a"), Value::from("alice"), Value::I64(31)],
            vec![Value::from("b"), Value::Null, Value::I64(51)],
        ]
    );
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn set_relations() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    exec(&mut session, "INSERT Personne X: X nom 'a'", Args::new()).await;
    let societe = insert(&mut session, "INSERT Societe S: S nom 'Logilab'", Args::new()).await;

    exec(
        &mut session,
        "SET X travaille S, X dirige S WHERE X is Personne, X nom 'a', S eid %(s)s",
        args([("s", Value::I64(societe))]),
    )
    .await;

    let rows = exec(
        &mut session,
        "Any S, D WHERE X nom 'a', X travaille S, X dirige D",
        Args::new(),
    )
    .await;
    assert_eq!(rows, vec![vec![Value::I64(societe), Value::I64(societe)]]);
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn rollback_discards_writes() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    exec(&mut session, "INSERT Personne X: X nom 'gone'", Args::new()).await;
    assert!(session.in_transaction());
    assert_ok!(session.rollback().await);
    assert!(!session.in_transaction());

    let found = names(&mut session, "Any N WHERE X is Personne, X nom N").await;
    assert!(found.is_empty());
    assert!(!session.in_transaction());
}

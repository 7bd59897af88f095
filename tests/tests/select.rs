use tests::prelude::*;

use pretty_assertions::assert_eq;

async fn personnes(test: &RqlTest) {
    let mut session = test.admin();
    for (nom, age) in [("bidule", 30), ("chose", 40), ("machin", 40)] {
        exec(
            &mut session,
            "INSERT Personne X: X nom %(nom)s, X age %(age)s",
            args([("nom", nom.into()), ("age", Value::I64(age))]),
        )
        .await;
    }
    exec(&mut session, "INSERT Societe S: S nom 'Logilab'", Args::new()).await;
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn inserted_entity_is_selected() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    let eid = insert(&mut session, "INSERT Personne X: X nom 'bidule'", Args::new()).await;
    let rows = exec(&mut session, r#"Personne X WHERE X nom "bidule""#, Args::new()).await;
    assert_eq!(rows, vec![vec![Value::I64(eid)]]);

    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn uniform_description() {
    let test = RqlTest::single().await;
    personnes(&test).await;
    let mut session = test.admin();

    let res = assert_ok!(
        session
            .execute("Any X, N WHERE X is Personne, X nom N", Args::new(), true)
            .await
    );
    assert_eq!(res.len(), 3);
    assert_eq!(
        res.description,
        Some(Description::Uniform(vec![
            "Personne".to_string(),
            "String".to_string()
        ]))
    );
}

#[tokio::test]
async fn per_row_description() {
    let test = RqlTest::single().await;
    personnes(&test).await;
    let mut session = test.admin();

    let res = assert_ok!(
        session
            .execute(
                "Any X, N ORDERBY N WHERE X nom N, X nom IN('bidule', 'Logilab')",
                Args::new(),
                true
            )
            .await
    );
    let types = |ty: &str| vec![ty.to_string(), "String".to_string()];
    assert_eq!(
        res.description,
        Some(Description::PerRow(vec![types("Societe"), types("Personne")]))
    );
}

#[tokio::test]
async fn unknown_eid_gives_no_rows() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    let rows = exec(&mut session, "Any X WHERE X eid 987654", Args::new()).await;
    assert!(rows.is_empty());

    let err = assert_err!(
        session
            .execute("SET X nom 'a' WHERE X eid 987654", Args::new(), false)
            .await
    );
    assert!(err.is_unknown_eid(), "{err}");
    assert_ok!(session.rollback().await);
}

#[tokio::test]
async fn aggregates() {
    let test = RqlTest::single().await;
    personnes(&test).await;
    let mut session = test.admin();

    let rows = exec(&mut session, "Any COUNT(X) WHERE X is Personne", Args::new()).await;
    assert_eq!(rows, vec![vec![Value::I64(3)]]);

    let rows = exec(
        &mut session,
        "Any A, COUNT(X) GROUPBY A ORDERBY A WHERE X is Personne, X age A",
        Args::new(),
    )
    .await;
    assert_eq!(
        rows,
        vec![
            vec![Value::I64(30), Value::I64(1)],
            vec![Value::I64(40), Value::I64(2)],
        ]
    );

    let rows = exec(
        &mut session,
        "Any A GROUPBY A WHERE X is Personne, X age A HAVING COUNT(X) > 1",
        Args::new(),
    )
    .await;
    assert_eq!(rows, vec![vec![Value::I64(40)]]);
}

#[tokio::test]
async fn sort_limit_offset() {
    let test = RqlTest::single().await;
    personnes(&test).await;
    let mut session = test.admin();

    let rows = exec(
        &mut session,
        "Any N ORDERBY N DESC LIMIT 2 OFFSET 1 WHERE X is Personne, X nom N",
        Args::new(),
    )
    .await;
    assert_eq!(
        rows,
        vec![vec![Value::from("chose")], vec![Value::from("bidule")]]
    );
}

#[tokio::test]
async fn union_of_selects() {
    let test = RqlTest::single().await;
    personnes(&test).await;
    let mut session = test.admin();

    let rows = exec(
        &mut session,
        "(Any N WHERE X is Personne, X nom N) UNION (Any N WHERE X is Societe, X nom N)",
        Args::new(),
    )
    .await;
    assert_eq_unordered!(
        rows.into_iter().map(|row| row[0].clone()),
        ["bidule", "chose", "machin", "Logilab"].map(Value::from)
    );
}

#[tokio::test]
async fn union_keeps_every_row() {
    let mut test = RqlTest::single().await;
    personnes(&test).await;
    let mut session = test.admin();

    test.clear_logs();
    let rows = exec(
        &mut session,
        "(Any N WHERE X is Personne, X nom 'bidule', X nom N) \
         UNION (Any N WHERE X is Personne, X nom 'bidule', X nom N)",
        Args::new(),
    )
    .await;
    assert_eq!(rows, vec![vec![Value::from("bidule")]; 2]);

    // one query answers the whole union
    let searches = test.system_log().searches();
    assert_eq!(searches.len(), 1);
    assert_eq!(searches[0].union.selects.len(), 2);
}

#[tokio::test]
async fn optional_and_negated_relations() {
    let test = RqlTest::single().await;
    personnes(&test).await;
    let mut session = test.admin();

    exec(
        &mut session,
        "SET X travaille S WHERE X nom 'bidule', S is Societe",
        Args::new(),
    )
    .await;

    let rows = exec(
        &mut session,
        "Any N, SN ORDERBY N WHERE X is Personne, X nom N, X travaille S?, S nom SN",
        Args::new(),
    )
    .await;
    assert_eq!(
        rows,
        vec![
            vec![Value::from("bidule"), Value::from("Logilab")],
            vec![Value::from("chose"), Value::Null],
            vec![Value::from("machin"), Value::Null],
        ]
    );

    let rows = exec(
        &mut session,
        "Any N ORDERBY N WHERE X is Personne, X nom N, NOT X travaille S",
        Args::new(),
    )
    .await;
    assert_eq!(rows, vec![vec![Value::from("chose")], vec![Value::from("machin")]]);
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn optional_flag_only_adds_rows() {
    let test = RqlTest::single().await;
    personnes(&test).await;
    let mut session = test.admin();

    exec(
        &mut session,
        "SET X travaille S WHERE X nom 'bidule', S is Societe",
        Args::new(),
    )
    .await;
    exec(
        &mut session,
        "SET X dirige S WHERE X nom 'chose', S is Societe",
        Args::new(),
    )
    .await;

    for (mandatory, optional) in [
        (
            "Any X, S WHERE X is Personne, X travaille S",
            "Any X, S WHERE X is Personne, X travaille S?",
        ),
        (
            "Any X, S WHERE X is Personne, X dirige S",
            "Any X, S WHERE X is Personne, X dirige S?",
        ),
        (
            "Any N, SN WHERE X nom N, X travaille S, S nom SN",
            "Any N, SN WHERE X nom N, X travaille S?, S nom SN",
        ),
    ] {
        let some = exec(&mut session, mandatory, Args::new()).await;
        let all = exec(&mut session, optional, Args::new()).await;
        assert!(!some.is_empty(), "{mandatory}");
        assert!(some.len() <= all.len(), "{optional}");
        for row in &some {
            assert!(all.contains(row), "{row:?} missing from {optional}");
        }
    }

    // the inlined column of the other personnes is null
    let rows = exec(&mut session, "Any N WHERE X dirige S, X nom N", Args::new()).await;
    assert_eq!(rows, vec![vec![Value::from("chose")]]);
    assert_ok!(session.commit().await);
}

#[tokio::test]
async fn full_text_search() {
    let test = RqlTest::single().await;
    personnes(&test).await;
    let mut session = test.admin();

    let rows = exec(
        &mut session,
        r#"Any N WHERE X has_text "machin", X nom N"#,
        Args::new(),
    )
    .await;
    assert_eq!(rows, vec![vec![Value::from("machin")]]);
}

#[tokio::test]
async fn arguments_are_substituted() {
    let test = RqlTest::single().await;
    personnes(&test).await;
    let mut session = test.admin();

    let rows = exec(
        &mut session,
        "Any N ORDERBY N WHERE X is Personne, X nom N, X age %(age)s",
        args([("age", Value::I64(40))]),
    )
    .await;
    assert_eq!(rows, vec![vec![Value::from("chose")], vec![Value::from("machin")]]);
}

#[tokio::test]
async fn malformed_statements() {
    let test = RqlTest::single().await;
    let mut session = test.admin();

    let err = assert_err!(session.execute("Any X WHERE", Args::new(), false).await);
    assert!(err.is_syntax(), "{err}");

    let err = assert_err!(
        session
            .execute("Any X WHERE X nom N, X travaille 'a'", Args::new(), false)
            .await
    );
    assert!(err.is_query(), "{err}");
}

use tests::prelude::*;

use pretty_assertions::assert_eq;

#[tokio::test]
async fn spellings_share_generated_sql() {
    let mut test = RqlTest::single().await;
    let mut session = test.admin();
    exec(&mut session, "INSERT Personne X: X nom 'a'", Args::new()).await;
    assert_ok!(session.commit().await);
    test.clear_logs();

    let first = exec(&mut session, "Any N WHERE X is Personne, X nom N", Args::new()).await;
    let second = exec(
        &mut session,
        "Any N\n    WHERE X is Personne,\n          X nom N",
        Args::new(),
    )
    .await;
    assert_eq!(first, second);

    let searches = test.system_log().searches();
    assert_eq!(searches.len(), 2);
    assert!(searches[0].cache_key.is_some());
    assert_eq!(searches[0].cache_key, searches[1].cache_key);
}

#[tokio::test]
async fn arguments_do_not_change_the_key() {
    let mut test = RqlTest::single().await;
    let mut session = test.admin();
    for nom in ["a", "b"] {
        exec(
            &mut session,
            "INSERT Personne X: X nom %(nom)s",
            args([("nom", nom.into())]),
        )
        .await;
    }
    assert_ok!(session.commit().await);
    test.clear_logs();

    let mut found = vec![];
    for nom in ["a", "b"] {
        let rows = exec(
            &mut session,
            "Any X WHERE X is Personne, X nom %(nom)s",
            args([("nom", nom.into())]),
        )
        .await;
        assert_eq!(rows.len(), 1);
        found.push(rows[0][0].clone());
    }
    assert_ne!(found[0], found[1]);

    let searches = test.system_log().searches();
    assert_eq!(searches[0].cache_key, searches[1].cache_key);
}

#[tokio::test]
async fn disabled_cache_gives_the_same_rows() {
    let test = RqlTest::with_cache_capacity(0).await;
    let mut session = test.admin();
    exec(&mut session, "INSERT Personne X: X nom 'a'", Args::new()).await;
    assert_ok!(session.commit().await);

    for _ in 0..2 {
        let rows = exec(&mut session, "Any N WHERE X is Personne, X nom N", Args::new()).await;
        assert_eq!(rows, vec![vec![Value::from("a")]]);
    }
}

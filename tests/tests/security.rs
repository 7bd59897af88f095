use tests::prelude::*;

use pretty_assertions::assert_eq;
use rql::Session;

async fn note(admin: &mut Session, titre: &str, owner: i64) -> i64 {
    insert(
        admin,
        "INSERT Note N: N titre %(titre)s, N owned_by U WHERE U eid %(u)s",
        args([("titre", titre.into()), ("u", Value::I64(owner))]),
    )
    .await
}

fn eids(rows: Vec<Vec<Value>>) -> Vec<i64> {
    let mut eids: Vec<i64> = rows.iter().map(|row| row[0].to_eid().unwrap()).collect();
    eids.sort();
    eids
}

#[tokio::test]
async fn read_expression_filters_rows() {
    let test = RqlTest::single().await;
    let mut guest = test.user("guest", &["guests"]).await;
    let other = test.user("other", &["users"]).await;
    let mut admin = test.admin();

    let guest_eid = guest.principal().eid;
    let other_eid = other.principal().eid;
    let mine = [
        note(&mut admin, "bla one", guest_eid).await,
        note(&mut admin, "bla two", guest_eid).await,
    ];
    note(&mut admin, "bla three", other_eid).await;
    note(&mut admin, "nothing", guest_eid).await;
    assert_ok!(admin.commit().await);

    let rows = exec(&mut guest, r#"Any X WHERE X has_text "bla""#, Args::new()).await;
    let expected = exec(
        &mut admin,
        r#"Any X WHERE X has_text "bla", X owned_by U, U eid %(u)s"#,
        args([("u", Value::I64(guest_eid))]),
    )
    .await;

    assert_eq!(eids(rows), eids(expected));
    let mut mine = mine.to_vec();
    mine.sort();
    assert_eq!(eids(exec(&mut guest, "Any X WHERE X is Note", Args::new()).await), mine);
}

#[tokio::test]
async fn managers_read_everything() {
    let test = RqlTest::single().await;
    let guest = test.user("guest", &["guests"]).await;
    let mut admin = test.admin();

    note(&mut admin, "a", guest.principal().eid).await;
    let admin_eid = admin.principal().eid;
    note(&mut admin, "b", admin_eid).await;

    let rows = exec(&mut admin, "Any T WHERE X is Note, X titre T", Args::new()).await;
    assert_eq!(rows.len(), 2);
    assert_ok!(admin.commit().await);
}

#[tokio::test]
async fn unreadable_rows_are_not_an_error() {
    let test = RqlTest::single().await;
    let mut guest = test.user("guest", &["guests"]).await;
    let mut admin = test.admin();
    let admin_eid = admin.principal().eid;
    note(&mut admin, "secret", admin_eid).await;
    assert_ok!(admin.commit().await);

    let rows = exec(&mut guest, "Any T WHERE X is Note, X titre T", Args::new()).await;
    assert!(rows.is_empty());
}

#[tokio::test]
async fn guests_cannot_write() {
    let test = RqlTest::single().await;
    let mut guest = test.user("guest", &["guests"]).await;
    let mut admin = test.admin();
    exec(&mut admin, "INSERT Personne X: X nom 'a'", Args::new()).await;
    assert_ok!(admin.commit().await);

    let err = assert_err!(
        guest
            .execute("INSERT Personne X: X nom 'b'", Args::new(), false)
            .await
    );
    assert!(err.is_unauthorized(), "{err}");
    assert_ok!(guest.rollback().await);

    let err = assert_err!(
        guest
            .execute("SET X nom 'b' WHERE X is Personne", Args::new(), false)
            .await
    );
    assert!(err.is_unauthorized(), "{err}");
    assert_ok!(guest.rollback().await);

    let err = assert_err!(
        guest
            .execute("DELETE Personne X WHERE X nom 'a'", Args::new(), false)
            .await
    );
    assert!(err.is_unauthorized(), "{err}");
    assert_ok!(guest.rollback().await);
}

#[tokio::test]
async fn owners_update_their_entities() {
    let test = RqlTest::single().await;
    let mut user = test.user("user", &["users"]).await;
    let user_eid = user.principal().eid;

    let personne = insert(
        &mut user,
        "INSERT Personne X: X nom 'a', X owned_by U WHERE U eid %(u)s",
        args([("u", Value::I64(user_eid))]),
    )
    .await;
    exec(
        &mut user,
        "SET X nom 'b' WHERE X eid %(x)s",
        args([("x", Value::I64(personne))]),
    )
    .await;

    let rows = exec(
        &mut user,
        "Any N WHERE X eid %(x)s, X nom N",
        args([("x", Value::I64(personne))]),
    )
    .await;
    assert_eq!(rows, vec![vec![Value::from("b")]]);
    assert_ok!(user.commit().await);
}

#[tokio::test]
async fn users_see_the_notes_they_own() {
    let test = RqlTest::single().await;
    let mut user = test.user("user", &["users"]).await;
    let user_eid = user.principal().eid;

    let own = insert(
        &mut user,
        "INSERT Note N: N titre 'mine', N owned_by U WHERE U eid %(u)s",
        args([("u", Value::I64(user_eid))]),
    )
    .await;
    assert_ok!(user.commit().await);

    let mut admin = test.admin();
    let admin_eid = admin.principal().eid;
    note(&mut admin, "theirs", admin_eid).await;
    assert_ok!(admin.commit().await);

    let rows = exec(&mut user, "Any X, T WHERE X is Note, X titre T", Args::new()).await;
    assert_eq!(rows, vec![vec![Value::I64(own), Value::from("mine")]]);
}

use rql::{schema::AttrType, stmt::Value, Args, Repository, Schema, Support};
use rql_source_sqlite::Sqlite;
use std_util::{assert_err, assert_ok};

fn schema() -> Schema {
    let mut b = Schema::builder();
    b.entity("Personne");
    b.attribute("Personne", "nom", AttrType::String);
    assert_ok!(b.build())
}

fn external(uri: &str) -> Sqlite {
    assert_ok!(Sqlite::in_memory())
        .with_name(uri)
        .with_support(Support::external(["Personne"], Vec::<String>::new()))
}

#[tokio::test]
async fn schema_and_system_source_are_required() {
    let err = assert_err!(
        Repository::builder()
            .system_source(assert_ok!(Sqlite::in_memory()))
            .build()
            .await
    );
    assert!(err.to_string().contains("schema"), "{err}");

    let err = assert_err!(Repository::builder().schema(schema()).build().await);
    assert!(err.to_string().contains("system source"), "{err}");
}

#[tokio::test]
async fn system_source_must_support_everything() {
    let err = assert_err!(
        Repository::builder()
            .schema(schema())
            .system_source(external("sqlite:extern"))
            .build()
            .await
    );
    assert!(err.to_string().contains("sqlite:extern"), "{err}");

    let err = assert_err!(
        Repository::builder()
            .schema(schema())
            .system_source(assert_ok!(Sqlite::in_memory()))
            .source(assert_ok!(Sqlite::in_memory()).with_name("sqlite:other"))
            .build()
            .await
    );
    assert!(err.to_string().contains("sqlite:other"), "{err}");
}

#[tokio::test]
async fn source_uris_are_unique() {
    let err = assert_err!(
        Repository::builder()
            .schema(schema())
            .system_source(assert_ok!(Sqlite::in_memory()))
            .source(external("sqlite:extern"))
            .source(external("sqlite:extern"))
            .build()
            .await
    );
    assert!(err.to_string().contains("duplicate"), "{err}");
}

#[tokio::test]
async fn created_users_can_query() {
    let repo = assert_ok!(
        Repository::builder()
            .schema(schema())
            .system_source(assert_ok!(Sqlite::in_memory()))
            .build()
            .await
    );

    let principal = assert_ok!(repo.create_user("bob", ["users"]).await);
    assert_eq!(principal.login, "bob");
    assert!(principal.in_group("users"));

    let mut session = repo.session(principal.clone());
    let rows = assert_ok!(
        session
            .execute(
                "Any L WHERE U eid %(u)s, U login L",
                Args::from([("u".to_string(), Value::I64(principal.eid))]),
                false,
            )
            .await
    )
    .rows;
    assert_eq!(rows, vec![vec![Value::from("bob")]]);
}

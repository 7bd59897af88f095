use pretty_assertions::assert_eq;
use rql_core::{
    driver::operation::Transaction,
    schema::{AttrType, Schema},
};
use rql_sql::{
    layout,
    stmt::{ColumnDef, Filter, Statement, Type, Value},
    Param, Serializer,
};

fn serialize(serializer: Serializer, stmt: &Statement) -> (String, Vec<Param>) {
    let mut params: Vec<Param> = vec![];
    let sql = serializer.serialize(stmt, &mut params);
    (sql, params)
}

#[test]
fn create_table_per_flavor() {
    let stmt = Statement::create_table(
        "entities",
        vec![
            ColumnDef::primary_key("eid").auto_increment(),
            ColumnDef::new("type", Type::Text).not_null(),
        ],
    );

    assert_eq!(
        serialize(Serializer::sqlite(), &stmt).0,
        "CREATE TABLE entities (eid INTEGER PRIMARY KEY AUTOINCREMENT, type TEXT NOT NULL);"
    );
    assert_eq!(
        serialize(Serializer::postgresql(), &stmt).0,
        "CREATE TABLE entities (eid SERIAL PRIMARY KEY, type TEXT NOT NULL);"
    );
    assert_eq!(
        serialize(Serializer::mysql(), &stmt).0,
        "CREATE TABLE entities (eid INTEGER PRIMARY KEY AUTO_INCREMENT, type VARCHAR(255) NOT NULL);"
    );
}

#[test]
fn temporary_tables() {
    let create = Statement::create_temp_table(
        "table1",
        vec![
            ColumnDef::new("C0", Type::from_term_type("Personne")),
            ColumnDef::new("C1", Type::from_term_type("Float")),
        ],
    );
    assert_eq!(
        serialize(Serializer::sqlite(), &create).0,
        "CREATE TEMPORARY TABLE table1 (C0 INTEGER, C1 REAL);"
    );

    let drop = Statement::drop_table("table1");
    assert_eq!(serialize(Serializer::sqlite(), &drop).0, "DROP TABLE table1;");
    assert!(drop.is_ddl());
}

#[test]
fn insert_rows() {
    let stmt = Statement::insert(
        "table1",
        &["C0", "C1"],
        vec![
            vec![Value::from(1), Value::from("a")],
            vec![Value::from(2), Value::Null],
        ],
    );

    let (sql, params) = serialize(Serializer::sqlite(), &stmt);
    assert_eq!(sql, "INSERT INTO table1 (C0, C1) VALUES (?1, ?2), (?3, ?4);");
    assert_eq!(params.len(), 4);
    assert_eq!(params[1], Param::Value(Value::from("a")));

    let (sql, _) = serialize(Serializer::postgresql(), &stmt);
    assert_eq!(sql, "INSERT INTO table1 (C0, C1) VALUES ($1, $2), ($3, $4);");
}

#[test]
fn update_and_delete() {
    let update = Statement::update(
        "cw_Personne",
        [("cw_nom".to_string(), Value::from("toto"))],
        vec![Filter::eq("cw_eid", 12)],
    );
    assert_eq!(
        serialize(Serializer::mysql(), &update).0,
        "UPDATE cw_Personne SET cw_nom = ? WHERE cw_eid = ?;"
    );

    let delete = Statement::delete(
        "travaille_relation",
        vec![
            Filter::eq("eid_from", 1),
            Filter::any_of("eid_to", [Value::from(2), Value::from(3)]),
        ],
    );
    let (sql, params) = serialize(Serializer::sqlite(), &delete);
    assert_eq!(
        sql,
        "DELETE FROM travaille_relation WHERE eid_from = ?1 AND eid_to IN (?2, ?3);"
    );
    assert_eq!(params.len(), 3);

    let empty = Statement::delete("t", vec![Filter::any_of("eid", [])]);
    assert_eq!(serialize(Serializer::sqlite(), &empty).0, "DELETE FROM t WHERE 1 = 0;");
}

#[test]
fn select_rows() {
    let stmt = Statement::select(
        layout::ENTITIES,
        &["eid", "type", "source"],
        vec![Filter::any_of("eid", [Value::from(1), Value::from(2)])],
    );
    assert_eq!(
        serialize(Serializer::sqlite(), &stmt).0,
        "SELECT eid, type, source FROM entities WHERE eid IN (?1, ?2);"
    );
}

#[test]
fn transactions() {
    assert_eq!(Serializer::mysql().serialize_transaction(&Transaction::Start), "START TRANSACTION");
    assert_eq!(Serializer::sqlite().serialize_transaction(&Transaction::Start), "BEGIN");
    assert_eq!(Serializer::postgresql().serialize_transaction(&Transaction::Rollback), "ROLLBACK");
}

#[test]
fn schema_tables() {
    let mut b = Schema::builder();
    b.entity("Personne");
    b.entity("Note");
    b.attribute("Personne", "nom", AttrType::String).required();
    b.attribute("Personne", "age", AttrType::Int);
    b.relation("Note", "ecrit_par", "Personne")
        .cardinality("?*")
        .inlined();
    b.relation("Personne", "connait", "Personne");
    let schema = b.build().unwrap();

    let serializer = Serializer::sqlite();
    let sqls: Vec<String> = layout::create_schema(&schema, |_| true, |_| true)
        .iter()
        .map(|stmt| serialize(serializer, stmt).0)
        .collect();

    assert!(sqls.contains(
        &"CREATE TABLE cw_Personne (cw_eid INTEGER PRIMARY KEY, cw_nom TEXT NOT NULL, cw_age INTEGER);"
            .to_string()
    ));
    assert!(sqls.contains(
        &"CREATE TABLE cw_Note (cw_eid INTEGER PRIMARY KEY, cw_ecrit_par INTEGER);".to_string()
    ));
    assert!(sqls.contains(
        &"CREATE TABLE connait_relation (eid_from INTEGER NOT NULL, eid_to INTEGER NOT NULL);"
            .to_string()
    ));
    assert!(sqls.contains(
        &"CREATE INDEX connait_relation_to_idx ON connait_relation (eid_to);".to_string()
    ));
    assert!(!sqls.iter().any(|sql| sql.contains("ecrit_par_relation")));
    assert!(sqls.iter().any(|sql| sql.starts_with("CREATE TABLE word ")));
}

use tests::prelude::*;

use pretty_assertions::assert_eq;
use rql_core::driver::{operation::Transaction, Operation};

#[tokio::test]
async fn single_source_select_is_one_search() {
    let mut test = RqlTest::single().await;
    let mut session = test.admin();
    exec(&mut session, "INSERT Personne X: X nom 'a'", Args::new()).await;
    assert_ok!(session.commit().await);
    test.clear_logs();

    exec(&mut session, "Any N WHERE X is Personne, X nom N", Args::new()).await;
    assert_eq!(test.system_log().names(), vec!["search"]);
}

#[tokio::test]
async fn writes_run_in_a_transaction() {
    let mut test = RqlTest::single().await;
    let mut session = test.admin();

    exec(&mut session, "INSERT Personne X: X nom 'a'", Args::new()).await;
    assert_ok!(session.commit().await);

    let mut log = test.system_log();
    let (op, _) = log.pop().unwrap();
    assert!(matches!(op, Operation::Transaction(Transaction::Start)));

    let names = log.names();
    let create = names.iter().position(|name| *name == "create_entity").unwrap();
    let insert = names.iter().position(|name| *name == "insert_entity").unwrap();
    assert!(create < insert);
    assert_eq!(names.last(), Some(&"transaction"));
    assert!(log.any(|op| matches!(op, Operation::Transaction(Transaction::Commit))));

    // selects do not open a transaction
    test.clear_logs();
    exec(&mut session, "Any X WHERE X is Personne", Args::new()).await;
    assert!(!test
        .system_log()
        .any(|op| matches!(op, Operation::Transaction(_))));
}

#[tokio::test]
async fn merged_aggregates_stage_rows_in_the_system_source() {
    let mut test = RqlTest::multi().await;
    let mut session = test.admin();
    for source in [None, Some(EXTERN)] {
        assert_ok!(session.set_write_source(source));
        exec(&mut session, "INSERT Personne X: X nom 'a'", Args::new()).await;
    }
    assert_ok!(session.commit().await);
    test.clear_logs();

    let rows = exec(&mut session, "Any COUNT(X) WHERE X is Personne", Args::new()).await;
    assert_eq!(rows, vec![vec![Value::I64(2)]]);

    let system = test.system_log();
    assert!(system.has_temp_table());
    assert_eq!(
        system.count(|op| matches!(op, Operation::DropTempTable(_))),
        system.count(|op| matches!(op, Operation::CreateTempTable(_)))
    );
    assert!(test.extern_log().has_search());
    assert!(!test.extern_log().has_temp_table());
}

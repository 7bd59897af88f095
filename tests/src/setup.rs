use crate::{ExecLog, LoggingSource};

use rql::{
    schema::AttrType, sqlite::Sqlite, stmt::Row, Args, Principal, Repository, Schema, Session,
    SolutionOrder, Support,
};
use std_util::assert_ok;

/// URI of the external source of multi-source repositories
pub const EXTERN: &str = "sqlite:extern";

/// A repository over in-memory SQLite sources, with operation logs.
pub struct RqlTest {
    pub repo: Repository,

    system: ExecLog,

    external: Option<ExecLog>,

    admin: Principal,
}

/// Personnes, Societes and private Notes readable by managers and owners.
pub fn schema() -> Schema {
    let mut b = Schema::builder();
    b.entity("Personne");
    b.entity("Societe");
    b.entity("Note").read(["managers"]).read_expr("X owned_by U");

    b.attribute("Personne", "nom", AttrType::String)
        .required()
        .fulltext();
    b.attribute("Personne", "prenom", AttrType::String);
    b.attribute("Personne", "age", AttrType::Int);
    b.attribute("Societe", "nom", AttrType::String).fulltext();
    b.attribute("Note", "titre", AttrType::String).fulltext();

    b.relation("Personne", "travaille", "Societe");
    b.relation("Personne", "connait", "Personne").symmetric();
    b.relation("Personne", "dirige", "Societe")
        .cardinality("?*")
        .inlined();

    assert_ok!(b.build())
}

impl RqlTest {
    /// Everything stored in the system source.
    pub async fn single() -> RqlTest {
        RqlTest::setup(false, 64).await
    }

    /// Personnes, Societes and `travaille` also stored in [`EXTERN`].
    pub async fn multi() -> RqlTest {
        RqlTest::setup(true, 64).await
    }

    pub async fn with_cache_capacity(capacity: usize) -> RqlTest {
        RqlTest::setup(false, capacity).await
    }

    async fn setup(multi: bool, capacity: usize) -> RqlTest {
        crate::init_tracing();

        let system = LoggingSource::new(assert_ok!(Sqlite::in_memory()));
        let system_log = ExecLog::new(system.ops_log_handle());

        let mut builder = Repository::builder();
        builder
            .schema(schema())
            .system_source(system)
            .cache_capacity(capacity)
            .solution_order(SolutionOrder::Sorted);

        let external = if multi {
            let source = assert_ok!(Sqlite::in_memory())
                .with_name(EXTERN)
                .with_support(Support::external(["Personne", "Societe"], ["travaille"]));
            let source = LoggingSource::new(source);
            let log = ExecLog::new(source.ops_log_handle());
            builder.source(source);
            Some(log)
        } else {
            None
        };

        let repo = assert_ok!(builder.build().await);
        let admin = assert_ok!(repo.create_user("admin", ["managers"]).await);

        let mut test = RqlTest {
            repo,
            system: system_log,
            external,
            admin,
        };
        test.clear_logs();
        test
    }

    /// A session of the `admin` manager.
    pub fn admin(&self) -> Session {
        self.repo.session(self.admin.clone())
    }

    pub async fn user(&self, login: &str, groups: &[&str]) -> Session {
        let principal = assert_ok!(
            self.repo
                .create_user(login, groups.iter().map(|group| group.to_string()))
                .await
        );
        self.repo.session(principal)
    }

    /// Operations run by the system source.
    pub fn system_log(&self) -> ExecLog {
        self.system.clone()
    }

    /// Operations run by the external source.
    pub fn extern_log(&self) -> ExecLog {
        self.external.clone().expect("not a multi-source repository")
    }

    pub fn clear_logs(&mut self) {
        self.system.clear();
        if let Some(log) = &mut self.external {
            log.clear();
        }
    }
}

/// Runs `rql`, panicking on error.
pub async fn exec(session: &mut Session, rql: &str, args: Args) -> Vec<Row> {
    assert_ok!(session.execute(rql, args, false).await, "rql=`{rql}`").rows
}

/// Runs an `INSERT` creating one entity and returns its eid.
pub async fn insert(session: &mut Session, rql: &str, args: Args) -> i64 {
    let rows = exec(session, rql, args).await;
    assert_eq!(rows.len(), 1, "rql=`{rql}`");
    assert_ok!(rows[0][0].to_eid())
}

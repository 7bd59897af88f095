mod combine;
mod delete;
mod fetch;
mod insert;
mod update;

use crate::engine::{
    plan::{ExecutionPlan, Step, StepId},
    store::Store,
    Cx,
};

use async_recursion::async_recursion;
use rql_core::{
    driver::operation::{CreateTempTable, DropTempTable},
    err,
    stmt::Row,
    Result,
};

struct Exec<'a> {
    cx: &'a Cx<'a>,
    plan: &'a ExecutionPlan,
    store: Store<'a>,
}

impl Cx<'_> {
    /// Runs the plan and returns the rows of its roots, concatenated.
    ///
    /// Temporary tables are dropped whether execution succeeds or not.
    pub(crate) async fn exec_plan(&self, plan: &ExecutionPlan) -> Result<Vec<Row>> {
        let exec = Exec {
            cx: self,
            plan,
            store: Store::new(self),
        };

        let res = exec.run().await;
        let teardown = self.drop_temp_tables(plan).await;

        let rows = res?;
        teardown?;
        Ok(rows)
    }

    async fn drop_temp_tables(&self, plan: &ExecutionPlan) -> Result<()> {
        let mut ret = Ok(());

        for (name, table) in &plan.temp_tables {
            if !table.is_created() {
                continue;
            }

            let op = DropTempTable { name: name.clone() };
            if let Err(err) = self.engine.system().exec(op.into()).await {
                tracing::warn!(table = name, %err, "failed to drop temporary table");
                if ret.is_ok() {
                    ret = Err(err);
                }
            }
        }

        ret
    }
}

impl Exec<'_> {
    async fn run(mut self) -> Result<Vec<Row>> {
        let mut ret = vec![];
        for root in &self.plan.roots {
            ret.extend(self.exec_step(*root).await?);
        }

        self.store.commit().await?;
        Ok(ret)
    }

    #[async_recursion]
    async fn exec_step(&mut self, id: StepId) -> Result<Vec<Row>> {
        let plan = self.plan;
        let node = plan.node(id);

        let mut input = Vec::with_capacity(node.children.len());
        for child in &node.children {
            input.push(self.exec_step(*child).await?);
        }

        tracing::trace!(step = node.step.name(), id = id.0, "exec step");

        match &node.step {
            Step::OneFetch(action) => self.action_one_fetch(action).await,
            Step::Fetch(action) => self.action_fetch(action, input).await,
            Step::Aggr(action) => self.action_aggr(action).await,
            Step::Union(action) => Ok(self.action_union(action, input)),
            Step::Intersect(action) => Ok(self.action_intersect(action, input)),
            Step::UnionFetch(_) => Ok(vec![]),
            Step::Insert(action) => self.action_insert(action, input).await,
            // Rows of the sub-select, described by the step's terms
            Step::Relations(_) => Ok(input.into_iter().flatten().collect()),
            Step::Update(action) => self.action_update(action, input).await,
            Step::DeleteEntities(action) => self.action_delete_entities(action, input).await,
            Step::DeleteRelations(action) => self.action_delete_relations(action, input).await,
        }
    }

    /// Creates a temporary table on first use.
    async fn ensure_table(&self, name: &str) -> Result<()> {
        let Some(table) = self.plan.temp_tables.get(name) else {
            return Err(err!("unknown temporary table {name}"));
        };

        if table.mark_created() {
            let op = CreateTempTable {
                name: name.to_string(),
                columns: table.columns.clone(),
            };
            self.cx.engine.system().exec(op.into()).await?;
        }
        Ok(())
    }
}

use super::Exec;
use crate::engine::plan;

use rql_core::{
    driver::operation::{InsertRows, Search},
    err,
    stmt::Row,
    Result,
};

impl Exec<'_> {
    pub(super) async fn action_one_fetch(&mut self, action: &plan::OneFetch) -> Result<Vec<Row>> {
        let mut ret = vec![];
        for query in &action.queries {
            ret.extend(self.search(query).await?);
        }
        Ok(ret)
    }

    pub(super) async fn action_fetch(
        &mut self,
        action: &plan::Fetch,
        input: Vec<Vec<Row>>,
    ) -> Result<Vec<Row>> {
        self.ensure_table(&action.table).await?;

        for rows in input {
            self.stage(&action.table, rows).await?;
        }

        for query in &action.queries {
            let rows = self.search(query).await?;
            self.stage(&action.table, rows).await?;
        }

        Ok(vec![])
    }

    pub(super) async fn action_aggr(&mut self, action: &plan::Aggr) -> Result<Vec<Row>> {
        self.search(&action.query).await
    }

    async fn search(&self, query: &plan::Query) -> Result<Vec<Row>> {
        // Staged tables a fetch never filled are still read
        for table in query.var_map.tables() {
            self.ensure_table(table).await?;
        }

        let source = self.cx.engine.source(query.source);
        let op = Search {
            union: query.union.clone(),
            args: self.plan.args.clone(),
            var_map: query.var_map.clone(),
            cache_key: query.cache_key.clone(),
        };

        let rows = source
            .exec(op.into())
            .await
            .map_err(|e| e.context(err!("search on {} failed: {}", source.uri(), query.union)))?
            .rows
            .into_values();

        tracing::trace!(source = source.uri(), rows = rows.len(), "search");
        Ok(rows)
    }

    async fn stage(&self, table: &str, rows: Vec<Row>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let op = InsertRows {
            table: table.to_string(),
            rows,
        };
        self.cx.engine.system().exec(op.into()).await?;
        Ok(())
    }
}

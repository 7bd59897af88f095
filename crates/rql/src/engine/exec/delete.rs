use super::Exec;
use crate::engine::plan;

use indexmap::IndexSet;
use rql_core::{
    err,
    stmt::{Eid, Row, Value},
    Result,
};

impl Exec<'_> {
    pub(super) async fn action_delete_entities(
        &mut self,
        _action: &plan::DeleteEntities,
        input: Vec<Vec<Row>>,
    ) -> Result<Vec<Row>> {
        let mut eids: IndexSet<Eid> = IndexSet::new();
        for row in input.into_iter().flatten() {
            let [eid] = &row[..] else {
                return Err(err!("expected one eid per row, got {row:?}"));
            };
            eids.insert(eid.to_eid()?);
        }

        let ret = eids.iter().map(|eid| vec![Value::I64(*eid)]).collect();
        if !eids.is_empty() {
            self.store
                .prepare_delete_entities(eids.into_iter().collect())
                .await?;
        }
        Ok(ret)
    }

    pub(super) async fn action_delete_relations(
        &mut self,
        action: &plan::DeleteRelations,
        input: Vec<Vec<Row>>,
    ) -> Result<Vec<Row>> {
        let mut pairs: IndexSet<(Eid, Eid)> = IndexSet::new();
        for row in input.into_iter().flatten() {
            let [from, to] = &row[..] else {
                return Err(err!("expected an eid pair per row, got {row:?}"));
            };
            pairs.insert((from.to_eid()?, to.to_eid()?));
        }

        let ret = pairs
            .iter()
            .map(|(from, to)| vec![Value::I64(*from), Value::I64(*to)])
            .collect();
        if !pairs.is_empty() {
            self.store
                .prepare_delete_relations(&action.rtype, pairs.into_iter().collect())
                .await?;
        }
        Ok(ret)
    }
}

use super::Exec;
use crate::engine::plan::{self, Ref};

use rql_core::{
    stmt::{Eid, Row, Value},
    Result,
};

impl Exec<'_> {
    /// Inserts one copy of the definitions per fetched row. Returns the
    /// eids of each copy, in `INSERT` order.
    pub(super) async fn action_insert(
        &mut self,
        action: &plan::Insert,
        input: Vec<Vec<Row>>,
    ) -> Result<Vec<Row>> {
        let rows = match input.into_iter().next() {
            Some(rows) => rows,
            None => vec![vec![]],
        };

        let expansion = action.substitute(&rows, &self.plan.args)?;
        tracing::debug!(
            entities = expansion.entities.len(),
            relations = expansion.relations.len(),
            "insert"
        );

        let mut eids: Vec<Eid> = Vec::with_capacity(expansion.entities.len());
        for entity in expansion.entities {
            let eid = self
                .store
                .prepare_insert_entity(&entity.etype, entity.attrs)
                .await?;
            eids.push(eid);
        }

        for rel in &expansion.relations {
            let subject = resolve(rel.subject, &eids);
            let object = resolve(rel.object, &eids);
            self.store
                .prepare_insert_relation(subject, &rel.rtype, object)?;
        }

        let width = action.entities.len().max(1);
        Ok(eids
            .chunks(width)
            .map(|chunk| chunk.iter().map(|eid| Value::I64(*eid)).collect())
            .collect())
    }
}

fn resolve(reference: Ref, eids: &[Eid]) -> Eid {
    match reference {
        Ref::Eid(eid) => eid,
        Ref::New(index) => eids[index],
    }
}

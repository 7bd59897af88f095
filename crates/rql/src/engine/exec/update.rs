use super::Exec;
use crate::engine::plan::{self, AssignmentKind};

use indexmap::{IndexMap, IndexSet};
use rql_core::{
    stmt::{Eid, Row, Value},
    Result,
};

impl Exec<'_> {
    /// Applies the assignments for each fetched row. Returns the eids of the
    /// changed entities.
    pub(super) async fn action_update(
        &mut self,
        action: &plan::Update,
        input: Vec<Vec<Row>>,
    ) -> Result<Vec<Row>> {
        let rows = match input.into_iter().next() {
            Some(rows) => rows,
            None => vec![vec![]],
        };
        let plan = self.plan;
        let args = &plan.args;

        let mut subjects: IndexSet<Eid> = IndexSet::new();
        let mut changes: IndexMap<Eid, IndexMap<String, Value>> = IndexMap::new();

        for row in &rows {
            for assignment in &action.assignments {
                let subject = assignment.subject.eid(row, args)?;
                subjects.insert(subject);

                match assignment.kind {
                    AssignmentKind::Attribute | AssignmentKind::Inlined => {
                        let value = assignment.value.value(row, args)?;
                        changes
                            .entry(subject)
                            .or_default()
                            .insert(assignment.rtype.clone(), value);
                    }
                    AssignmentKind::Relation => {
                        let object = assignment.value.eid(row, args)?;
                        self.store
                            .prepare_insert_relation(subject, &assignment.rtype, object)?;
                    }
                }
            }
        }

        for (eid, attrs) in changes {
            let location = self.store.location(eid).await?;
            self.store
                .prepare_update_entity(&location.etype, eid, attrs)
                .await?;
        }

        Ok(subjects.into_iter().map(|eid| vec![Value::I64(eid)]).collect())
    }
}

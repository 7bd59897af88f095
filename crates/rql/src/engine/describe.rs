use crate::{
    engine::{plan::ResultTypes, Cx},
    Description,
};

use indexmap::IndexSet;
use rql_core::{
    schema::AttrType,
    stmt::{Eid, Row, Select},
    Result,
};

impl Cx<'_> {
    /// Types of the result columns.
    pub(crate) async fn describe(&self, result: &ResultTypes, rows: &[Row]) -> Result<Description> {
        match result {
            ResultTypes::Selects(selects) => self.describe_selects(selects, rows).await,
            ResultTypes::Uniform(types) => Ok(Description::Uniform(types.clone())),
            ResultTypes::Empty => Ok(Description::Uniform(vec![])),
        }
    }

    async fn describe_selects(&self, selects: &[Select], rows: &[Row]) -> Result<Description> {
        let schema = &self.engine.schema;

        // Candidate types of each column across selects and solutions
        let mut candidates: Vec<IndexSet<String>> = vec![];
        for select in selects {
            for solution in &select.solutions {
                for (i, expr) in select.selection.iter().enumerate() {
                    if candidates.len() <= i {
                        candidates.push(IndexSet::new());
                    }
                    candidates[i].insert(select.term_type(schema, solution, expr));
                }
            }
        }

        if candidates.iter().all(|types| types.len() == 1) {
            return Ok(Description::Uniform(
                candidates
                    .into_iter()
                    .filter_map(|types| types.into_iter().next())
                    .collect(),
            ));
        }

        // Ambiguous entity columns are resolved from the stored eids
        let mut eids: Vec<Eid> = vec![];
        for row in rows {
            for (value, types) in row.iter().zip(&candidates) {
                if types.len() > 1 && types.iter().any(|ty| schema.entity(ty).is_some()) {
                    if let Some(eid) = value.as_i64() {
                        eids.push(eid);
                    }
                }
            }
        }
        let info = self.engine.entity_info(eids).await?;

        let mut ret = Vec::with_capacity(rows.len());
        for row in rows {
            let mut types = Vec::with_capacity(row.len());
            for (i, value) in row.iter().enumerate() {
                let ty = match candidates.get(i) {
                    Some(column) if column.len() == 1 => column[0].clone(),
                    Some(column) => match value.as_i64().and_then(|eid| info.get(&eid)) {
                        Some(location) if column.contains(&location.etype) => location.etype.clone(),
                        _ if value.is_null() => column[0].clone(),
                        _ => AttrType::of_value(value).name().to_string(),
                    },
                    None => AttrType::of_value(value).name().to_string(),
                };
                types.push(ty);
            }
            ret.push(types);
        }

        Ok(Description::PerRow(ret))
    }
}

use super::Exec;
use crate::engine::plan;

use rql_core::stmt::Row;
use std::collections::HashSet;

impl Exec<'_> {
    pub(super) fn action_union(&self, action: &plan::Union, input: Vec<Vec<Row>>) -> Vec<Row> {
        union(action, input)
    }

    pub(super) fn action_intersect(&self, action: &plan::Intersect, input: Vec<Vec<Row>>) -> Vec<Row> {
        intersect(action, input)
    }
}

/// Concatenates the children's rows, applying the offset and limit left to
/// right.
fn union(action: &plan::Union, input: Vec<Vec<Row>>) -> Vec<Row> {
    let mut skip = action.offset;
    let mut ret = vec![];

    for row in input.into_iter().flatten() {
        if skip > 0 {
            skip -= 1;
            continue;
        }
        if action.limit.is_some_and(|limit| ret.len() as u64 >= limit) {
            break;
        }
        ret.push(row);
    }

    ret
}

/// Rows of the first child present in every other child, without
/// duplicates.
fn intersect(action: &plan::Intersect, input: Vec<Vec<Row>>) -> Vec<Row> {
    let mut children = input.into_iter();
    let Some(first) = children.next() else {
        return vec![];
    };
    let others: Vec<HashSet<Row>> = children.map(|rows| rows.into_iter().collect()).collect();

    let mut seen = HashSet::new();
    first
        .into_iter()
        .filter(|row| others.iter().all(|rows| rows.contains(row)))
        .filter(|row| seen.insert(row.clone()))
        .skip(action.offset as usize)
        .take(action.limit.map_or(usize::MAX, |limit| limit as usize))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rql_core::stmt::Value;

    fn rows(eids: &[i64]) -> Vec<Row> {
        eids.iter().map(|eid| vec![Value::I64(*eid)]).collect()
    }

    #[test]
    fn union_budget_is_shared() {
        let action = plan::Union {
            limit: Some(3),
            offset: 2,
        };
        let ret = union(&action, vec![rows(&[1, 2, 3]), rows(&[4, 5, 6])]);
        assert_eq!(ret, rows(&[3, 4, 5]));
    }

    #[test]
    fn union_keeps_duplicates() {
        let action = plan::Union {
            limit: None,
            offset: 0,
        };
        let ret = union(&action, vec![rows(&[1, 2]), rows(&[2, 3, 1])]);
        assert_eq!(ret, rows(&[1, 2, 2, 3, 1]));
    }

    #[test]
    fn intersect_rows() {
        let action = plan::Intersect {
            limit: None,
            offset: 0,
        };
        let ret = intersect(&action, vec![rows(&[1, 2, 3, 2]), rows(&[3, 2]), rows(&[2, 3, 4])]);
        assert_eq!(ret, rows(&[2, 3]));

        let action = plan::Intersect {
            limit: Some(1),
            offset: 1,
        };
        let ret = intersect(&action, vec![rows(&[1, 2, 3]), rows(&[1, 2, 3])]);
        assert_eq!(ret, rows(&[2]));
    }
}

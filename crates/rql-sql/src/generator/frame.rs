/// Tables and conditions of one `SELECT`, either a whole arm or a
/// subquery opened by `NOT`, `EXISTS` or an `OR` branch.
#[derive(Debug, Default)]
pub(super) struct Frame {
    items: Vec<FromItem>,
    conds: Vec<String>,
}

#[derive(Debug)]
struct FromItem {
    table: String,
    alias: String,

    /// Joined with `LEFT OUTER JOIN`
    left: bool,

    on: Vec<String>,
}

impl Frame {
    pub(super) fn push(&mut self, table: impl Into<String>, alias: impl Into<String>, left: bool) {
        self.items.push(FromItem {
            table: table.into(),
            alias: alias.into(),
            left,
            on: vec![],
        });
    }

    pub(super) fn contains(&self, alias: &str) -> bool {
        self.items.iter().any(|item| item.alias == alias)
    }

    pub(super) fn has_tables(&self) -> bool {
        !self.items.is_empty()
    }

    /// Adds a condition. Conditions on a left-joined table go to the `ON`
    /// clause of the last such table they reference.
    pub(super) fn add_cond(&mut self, sql: impl Into<String>, aliases: &[String]) {
        let sql = sql.into();
        let target = self
            .items
            .iter_mut()
            .rev()
            .find(|item| item.left && aliases.contains(&item.alias));

        match target {
            Some(item) => item.on.push(sql),
            None => self.conds.push(sql),
        }
    }

    pub(super) fn from_sql(&self) -> Option<String> {
        if self.items.is_empty() {
            return None;
        }

        let explicit = self.items.iter().any(|item| item.left);
        let mut out = String::new();

        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                out.push_str(match (item.left, explicit) {
                    (true, _) => " LEFT OUTER JOIN ",
                    (false, true) => " CROSS JOIN ",
                    (false, false) => ", ",
                });
            }

            out.push_str(&item.table);
            if item.alias != item.table {
                out.push_str(" AS ");
                out.push_str(&item.alias);
            }

            if item.left {
                if item.on.is_empty() {
                    out.push_str(" ON (1 = 1)");
                } else {
                    out.push_str(" ON (");
                    out.push_str(&item.on.join(" AND "));
                    out.push(')');
                }
            }
        }

        Some(out)
    }

    pub(super) fn where_sql(&self) -> Option<String> {
        if self.conds.is_empty() {
            None
        } else {
            Some(self.conds.join(" AND "))
        }
    }

    /// The frame as a boolean condition of its parent. `None` when it
    /// holds nothing.
    pub(super) fn condition_sql(&self) -> Option<String> {
        match (self.from_sql(), self.where_sql()) {
            (None, None) => None,
            (None, Some(cond)) if self.conds.len() == 1 => Some(cond),
            (None, Some(cond)) => Some(format!("({cond})")),
            (Some(from), None) => Some(format!("EXISTS(SELECT 1 FROM {from})")),
            (Some(from), Some(cond)) => Some(format!("EXISTS(SELECT 1 FROM {from} WHERE {cond})")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_join_collects_its_conditions() {
        let mut frame = Frame::default();
        frame.push("cw_Personne", "_X", false);
        frame.push("travaille_relation", "rel_travaille0", true);
        frame.push("cw_Societe", "_S", true);

        frame.add_cond(
            "rel_travaille0.eid_from = _X.cw_eid",
            &["rel_travaille0".to_string(), "_X".to_string()],
        );
        frame.add_cond(
            "rel_travaille0.eid_to = _S.cw_eid",
            &["rel_travaille0".to_string(), "_S".to_string()],
        );
        frame.add_cond("_X.cw_nom = ?1", &["_X".to_string()]);

        assert_eq!(
            frame.from_sql().unwrap(),
            "cw_Personne AS _X \
             LEFT OUTER JOIN travaille_relation AS rel_travaille0 ON (rel_travaille0.eid_from = _X.cw_eid) \
             LEFT OUTER JOIN cw_Societe AS _S ON (rel_travaille0.eid_to = _S.cw_eid)"
        );
        assert_eq!(frame.where_sql().unwrap(), "_X.cw_nom = ?1");
    }

    #[test]
    fn condition_without_tables() {
        let mut frame = Frame::default();
        assert_eq!(frame.condition_sql(), None);

        frame.add_cond("_X.cw_age > 3", &[]);
        assert_eq!(frame.condition_sql().unwrap(), "_X.cw_age > 3");

        frame.add_cond("_X.cw_age < 10", &[]);
        assert_eq!(
            frame.condition_sql().unwrap(),
            "(_X.cw_age > 3 AND _X.cw_age < 10)"
        );
    }
}

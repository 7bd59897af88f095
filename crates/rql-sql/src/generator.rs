//! Translation of analyzed RQL selects into SQL.
//!
//! Each select is split into arms, one per distinct assignment of types to
//! the variables that need an entity table. Arms are combined with
//! `UNION ALL`, as are the selects of a union; when the select aggregates, sorts or limits across several
//! arms they are wrapped in an outer query over the derived table `_T0`.

mod arm;
use arm::Arm;

mod expr;

mod frame;
use frame::Frame;

mod has_text;

mod relation;

use crate::serializer::{Flavor, Param, Params};

use rql_core::{
    driver::VarMap,
    schema::Schema,
    stmt::{Args, Select, Solution, Union},
    Error, Result,
};

/// Delimits parameter markers in SQL under construction. Markers are
/// numbered in textual order once the statement is complete.
const MARKER: char = '\u{1}';

/// SQL for a union, ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub sql: String,

    pub params: Vec<Param>,

    /// Type name of each selected column: an attribute type or, for entity
    /// columns, the entity type of the first solution.
    pub columns: Vec<String>,

    /// The SQL does not depend on argument values and may be reused.
    pub cacheable: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Generator<'a> {
    schema: &'a Schema,
    flavor: Flavor,
}

struct State<'a> {
    args: &'a Args,
    var_map: &'a VarMap,
    params: Vec<Param>,
    cacheable: bool,
}

impl<'a> Generator<'a> {
    pub fn new(schema: &'a Schema, flavor: Flavor) -> Generator<'a> {
        Generator { schema, flavor }
    }

    /// Generates the SQL for `union`. Variables and relations listed in
    /// `var_map` are read from staged tables instead of the entity tables.
    pub fn generate(&self, union: &Union, args: &Args, var_map: &VarMap) -> Result<Generated> {
        let mut state = State {
            args,
            var_map,
            params: vec![],
            cacheable: var_map.is_empty(),
        };

        let mut parts = vec![];
        for select in &union.selects {
            let sql = self.select(select, &mut state)?;

            if union.selects.len() > 1 && (select.has_limit() || !select.orderby.is_empty()) {
                parts.push(format!("SELECT * FROM ({sql}) AS _U{}", parts.len()));
            } else {
                parts.push(sql);
            }
        }

        let (sql, params) = self.number_params(&parts.join(" UNION ALL "), &state.params);
        tracing::trace!(%sql, params = params.len(), "generated sql");

        Ok(Generated {
            sql,
            params,
            columns: self.column_types(union),
            cacheable: state.cacheable,
        })
    }

    fn select(&self, select: &Select, state: &mut State<'_>) -> Result<String> {
        let arms = self.arms(select, state.var_map);
        if arms.is_empty() {
            return Err(Error::query("select has no solution"));
        }

        let wrap = arms.len() > 1
            && (select.has_aggregate()
                || !select.groupby.is_empty()
                || select.having.is_some()
                || !select.orderby.is_empty()
                || select.has_limit());

        if !wrap {
            let mut sqls = vec![];
            for solution in &arms {
                sqls.push(Arm::new(*self, select, solution, state).direct()?);
            }
            let sep = if select.distinct {
                " UNION "
            } else {
                " UNION ALL "
            };
            return Ok(sqls.join(sep));
        }

        let base = select.root_term_vars();
        let mut sqls = vec![];
        for solution in &arms {
            sqls.push(Arm::new(*self, select, solution, state).projection(&base)?);
        }
        Arm::new(*self, select, arms[0], state).outer(&base, &sqls.join(" UNION ALL "))
    }

    /// One representative solution per distinct typing of the variables
    /// backed by entity tables.
    fn arms<'s>(&self, select: &'s Select, var_map: &VarMap) -> Vec<&'s Solution> {
        let table_vars: Vec<&str> = select
            .vars
            .keys()
            .map(String::as_str)
            .filter(|var| self.needs_table(select, var_map, var))
            .collect();

        let mut seen = vec![];
        let mut ret = vec![];
        for solution in &select.solutions {
            let key = solution.project(&table_vars);
            if !seen.contains(&key) {
                seen.push(key);
                ret.push(solution);
            }
        }
        ret
    }

    /// Variables read from their entity table. Invariant variables are read
    /// from the relation binding them, except when an inlined relation needs
    /// the subject's row.
    fn needs_table(&self, select: &Select, var_map: &VarMap, var: &str) -> bool {
        let Some(info) = select.var(var) else {
            return false;
        };
        if !info.is_entity() || var_map.get(var).is_some() {
            return false;
        }
        !info.invariant
            || info.relations.iter().any(|rel_use| {
                rel_use.side == rql_core::stmt::Side::Subject
                    && self
                        .schema
                        .relation(&rel_use.rtype)
                        .map(|rel| rel.inlined)
                        .unwrap_or(false)
            })
    }

    fn column_types(&self, union: &Union) -> Vec<String> {
        let Some(select) = union.selects.first() else {
            return vec![];
        };
        let empty = Solution::new();
        let solution = select.solutions.first().unwrap_or(&empty);

        select
            .selection
            .iter()
            .map(|expr| select.term_type(self.schema, solution, expr))
            .collect()
    }

    fn number_params(&self, sql: &str, params: &[Param]) -> (String, Vec<Param>) {
        let mut out = String::with_capacity(sql.len());
        let mut ordered: Vec<Param> = vec![];

        // Markers come in pairs: odd parts hold parameter indices.
        for (i, part) in sql.split(MARKER).enumerate() {
            if i % 2 == 0 {
                out.push_str(part);
                continue;
            }
            let Some(param) = part.parse::<usize>().ok().and_then(|i| params.get(i)) else {
                continue;
            };
            let placeholder = Params::push(&mut ordered, param);
            self.flavor.placeholder(placeholder.0, &mut out);
        }

        (out, ordered)
    }
}

impl State<'_> {
    fn param(&mut self, param: Param) -> String {
        self.params.push(param);
        format!("{MARKER}{}{MARKER}", self.params.len() - 1)
    }
}

fn limit_sql(flavor: Flavor, limit: Option<u64>, offset: u64) -> String {
    match (limit, offset) {
        (None, 0) => String::new(),
        (Some(limit), 0) => format!(" LIMIT {limit}"),
        (Some(limit), offset) => format!(" LIMIT {limit} OFFSET {offset}"),
        (None, offset) => match flavor {
            Flavor::Sqlite => format!(" LIMIT -1 OFFSET {offset}"),
            Flavor::Mysql => format!(" LIMIT 18446744073709551615 OFFSET {offset}"),
            Flavor::Postgresql => format!(" OFFSET {offset}"),
        },
    }
}

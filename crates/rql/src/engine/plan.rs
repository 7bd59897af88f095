mod aggr;
pub(crate) use aggr::Aggr;

mod delete;
pub(crate) use delete::{DeleteEntities, DeleteRelations};

mod fetch;
pub(crate) use fetch::{Fetch, Query};

mod insert;
pub(crate) use insert::{EntityDef, Insert, Ref, RelationDef};

mod intersect;
pub(crate) use intersect::Intersect;

mod one_fetch;
pub(crate) use one_fetch::OneFetch;

mod relations;
pub(crate) use relations::{FetchedTerm, Relations, TermKind};

mod step;
pub(crate) use step::Step;

mod term;
pub(crate) use term::Term;

mod union;
pub(crate) use union::{Union, UnionFetch};

mod update;
pub(crate) use update::{Assignment, AssignmentKind, Update};

use indexmap::IndexMap;
use rql_core::{
    driver::operation::TempColumn,
    stmt::{self, Args},
};
use std::{
    fmt,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Suffix of the next temporary table name, shared by every plan of the
/// process.
static NEXT_TABLE: AtomicUsize = AtomicUsize::new(0);

/// Steps computing the result of one statement.
#[derive(Debug)]
pub(crate) struct ExecutionPlan {
    /// Step arena
    pub(crate) steps: Vec<StepNode>,

    /// Steps whose rows form the result, in order
    pub(crate) roots: Vec<StepId>,

    /// Temporary tables steps stage rows into
    pub(crate) temp_tables: IndexMap<String, TempTable>,

    pub(crate) args: Args,

    /// What the result columns hold
    pub(crate) result: ResultTypes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StepId(pub(crate) usize);

#[derive(Debug)]
pub(crate) struct StepNode {
    pub(crate) step: Step,

    /// Executed before the step, left to right
    pub(crate) children: Vec<StepId>,

    pub(crate) parent: Option<StepId>,
}

#[derive(Debug)]
pub(crate) struct TempTable {
    pub(crate) columns: Vec<TempColumn>,

    /// Set once the table exists on the system source
    pub(crate) created: AtomicBool,
}

/// Types of the result columns, used to describe results.
#[derive(Debug, Default)]
pub(crate) enum ResultTypes {
    /// Rows of these selects, in order
    Selects(Vec<stmt::Select>),

    /// Every row has these types
    Uniform(Vec<String>),

    #[default]
    Empty,
}

impl ExecutionPlan {
    pub(crate) fn new(args: Args) -> ExecutionPlan {
        ExecutionPlan {
            steps: vec![],
            roots: vec![],
            temp_tables: IndexMap::new(),
            args,
            result: ResultTypes::Empty,
        }
    }

    /// Adds a step executing after `children`.
    pub(crate) fn push(&mut self, step: impl Into<Step>, children: Vec<StepId>) -> StepId {
        let id = StepId(self.steps.len());
        for child in &children {
            self.steps[child.0].parent = Some(id);
        }
        self.steps.push(StepNode {
            step: step.into(),
            children,
            parent: None,
        });
        id
    }

    pub(crate) fn node(&self, id: StepId) -> &StepNode {
        &self.steps[id.0]
    }

    /// Registers a temporary table with a process-unique name.
    pub(crate) fn add_temp_table(&mut self, columns: Vec<TempColumn>) -> String {
        let name = format!("table{}", NEXT_TABLE.fetch_add(1, Ordering::Relaxed));
        self.temp_tables.insert(
            name.clone(),
            TempTable {
                columns,
                created: AtomicBool::new(false),
            },
        );
        name
    }

    fn fmt_step(&self, f: &mut fmt::Formatter<'_>, id: StepId) -> fmt::Result {
        let node = self.node(id);
        f.write_str(node.step.name())?;
        if !node.children.is_empty() {
            f.write_str("(")?;
            for (i, child) in node.children.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                self.fmt_step(f, *child)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Shape of the step tree, e.g. `Aggr(UnionFetch(Fetch, Fetch))`.
impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, root) in self.roots.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            self.fmt_step(f, *root)?;
        }
        Ok(())
    }
}

impl TempTable {
    /// Marks the table created. Returns `false` if it already was.
    pub(crate) fn mark_created(&self) -> bool {
        !self.created.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_created(&self) -> bool {
        self.created.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parents_and_shape() {
        let mut plan = ExecutionPlan::new(Args::new());
        let a = plan.push(UnionFetch, vec![]);
        let b = plan.push(UnionFetch, vec![]);
        let root = plan.push(
            Union {
                limit: None,
                offset: 0,
            },
            vec![a, b],
        );
        plan.roots.push(root);

        assert_eq!(plan.node(a).parent, Some(root));
        assert_eq!(plan.node(b).parent, Some(root));
        assert_eq!(plan.to_string(), "Union(UnionFetch, UnionFetch)");
    }

    #[test]
    fn temp_tables_are_unique() {
        let mut first = ExecutionPlan::new(Args::new());
        let mut second = ExecutionPlan::new(Args::new());
        let a = first.add_temp_table(vec![]);
        let b = second.add_temp_table(vec![]);
        assert_ne!(a, b);
        assert!(a.starts_with("table"));

        let table = &first.temp_tables[&a];
        assert!(table.mark_created());
        assert!(!table.mark_created());
        assert!(table.is_created());
    }
}

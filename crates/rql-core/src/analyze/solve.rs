use super::KnownTypes;
use crate::{
    schema::Schema,
    stmt::{Expr, Node, Relation, Select, Solution, Statement, Value},
    Error, Result,
};

use indexmap::IndexMap;

/// Computes the solutions of every select or of the write statement.
pub fn solve(schema: &Schema, stmt: &mut Statement, known: &KnownTypes) -> Result<()> {
    match stmt {
        Statement::Select(union) => {
            for select in &mut union.selects {
                solve_select(schema, select, known)?;
            }
        }
        Statement::Insert(insert) => {
            let tree = Constraint::write(&insert.main_relations, insert.restriction.as_ref());
            let vars = write_vars(&insert.main_vars, &tree);
            insert.solutions = Solver::new(schema, known).solve(&vars, &insert.main_vars, &tree)?;
        }
        Statement::Delete(delete) => {
            let tree = Constraint::write(&delete.main_relations, delete.restriction.as_ref());
            let vars = write_vars(&delete.main_vars, &tree);
            delete.solutions = Solver::new(schema, known).solve(&vars, &delete.main_vars, &tree)?;
        }
        Statement::Set(set) => {
            let tree = Constraint::write(&set.main_relations, set.restriction.as_ref());
            let vars = write_vars(&[], &tree);
            set.solutions = Solver::new(schema, known).solve(&vars, &[], &tree)?;
        }
    }
    Ok(())
}

/// Computes the solutions of one select.
pub fn solve_select(schema: &Schema, select: &mut Select, known: &KnownTypes) -> Result<()> {
    let tree = match &select.restriction {
        Some(node) => Constraint::from_node(node),
        None => Constraint::All(vec![]),
    };

    let vars = select.defined_vars();
    let mut bound = vec![];
    tree.vars(&mut bound);
    if let Some(var) = vars.iter().find(|var| !bound.contains(var)) {
        return Err(Error::query(format!("variable {var} is not bound")));
    }

    select.solutions = Solver::new(schema, known).solve(&vars, &[], &tree)?;
    Ok(())
}

fn write_vars(main_vars: &[(String, String)], tree: &Constraint<'_>) -> Vec<String> {
    let mut ret: Vec<String> = main_vars.iter().map(|(_, var)| var.clone()).collect();
    tree.vars(&mut ret);
    ret
}

/// Restriction tree reduced to what matters for typing: negation and
/// existential scopes do not change the types a relation admits.
#[derive(Debug)]
enum Constraint<'a> {
    All(Vec<Constraint<'a>>),
    Any(Vec<Constraint<'a>>),
    Rel(&'a Relation),
}

impl<'a> Constraint<'a> {
    fn from_node(node: &'a Node) -> Self {
        match node {
            Node::And(nodes) => Self::All(nodes.iter().map(Self::from_node).collect()),
            Node::Or(nodes) => Self::Any(nodes.iter().map(Self::from_node).collect()),
            Node::Not(_, inner) | Node::Exists(_, inner) => Self::from_node(inner),
            Node::Relation(rel) => Self::Rel(rel),
            Node::Compare(_) => Self::All(vec![]),
        }
    }

    fn write(main_relations: &'a [Relation], restriction: Option<&'a Node>) -> Self {
        let mut all: Vec<_> = main_relations.iter().map(Self::Rel).collect();
        all.extend(restriction.map(Self::from_node));
        Self::All(all)
    }

    fn vars(&self, out: &mut Vec<String>) {
        match self {
            Self::All(items) | Self::Any(items) => {
                for item in items {
                    item.vars(out);
                }
            }
            Self::Rel(rel) => {
                for var in rel.vars() {
                    if !out.contains(&var) {
                        out.push(var);
                    }
                }
            }
        }
    }

    fn relations(&self, out: &mut Vec<&'a Relation>) {
        match self {
            Self::All(items) | Self::Any(items) => {
                for item in items {
                    item.relations(out);
                }
            }
            Self::Rel(rel) => out.push(rel),
        }
    }
}

type Domains = IndexMap<String, Vec<String>>;

struct Solver<'a> {
    schema: &'a Schema,
    known: &'a KnownTypes,
}

impl<'a> Solver<'a> {
    fn new(schema: &'a Schema, known: &'a KnownTypes) -> Self {
        Self { schema, known }
    }

    fn solve(
        &self,
        vars: &[String],
        declared: &[(String, String)],
        tree: &Constraint<'_>,
    ) -> Result<Vec<Solution>> {
        let mut relations = vec![];
        tree.relations(&mut relations);

        for rel in &relations {
            self.check_relation(rel)?;
        }

        let mut domains = self.initial_domains(vars, declared, &relations)?;

        loop {
            let next = self.narrow(tree, &domains);
            if next == domains {
                break;
            }
            domains = next;
        }

        if let Some((var, _)) = domains.iter().find(|(_, types)| types.is_empty()) {
            return Err(Error::type_resolution(format!(
                "no possible type for variable {var}"
            )));
        }

        let mut solutions = vec![];
        let mut current = Solution::new();
        let order: Vec<&String> = domains.keys().collect();
        self.backtrack(tree, &domains, &order, &mut current, &mut solutions);

        if solutions.is_empty() {
            return Err(Error::type_resolution("no type assignment satisfies the query"));
        }

        Ok(solutions)
    }

    fn check_relation(&self, rel: &Relation) -> Result<()> {
        if !Schema::is_pseudo(&rel.rtype) && self.schema.relation(&rel.rtype).is_none() {
            return Err(Error::query(format!("unknown relation `{}`", rel.rtype)));
        }

        let links_entities = self
            .schema
            .relation(&rel.rtype)
            .is_some_and(|def| !def.attribute);

        let mut result = Ok(());
        rel.object.walk(&mut |expr| {
            if result.is_err() {
                return;
            }
            match expr {
                Expr::EType(etype) if self.schema.entity(etype).is_none() => {
                    result = Err(Error::query(format!("unknown entity type `{etype}`")));
                }
                // entities are designated by their eid
                Expr::Value(value)
                    if links_entities && !matches!(value, Value::I64(_) | Value::Null) =>
                {
                    result = Err(Error::query(format!(
                        "relation `{}` links entities, {value:?} is not an eid",
                        rel.rtype
                    )));
                }
                _ => {}
            }
        });
        result
    }

    fn initial_domains(
        &self,
        vars: &[String],
        declared: &[(String, String)],
        relations: &[&Relation],
    ) -> Result<Domains> {
        let entity_types: Vec<String> = self.schema.entity_types().map(str::to_string).collect();
        let mut domains = Domains::new();

        for var in vars {
            let attribute_types = relations
                .iter()
                .filter(|rel| rel.object_var() == Some(var.as_str()) && self.schema.is_attribute(&rel.rtype))
                .flat_map(|rel| self.schema.relation(&rel.rtype).into_iter())
                .flat_map(|rel| rel.object_types())
                .fold(Vec::<String>::new(), |mut acc, ty| {
                    if !acc.iter().any(|t| t == ty) {
                        acc.push(ty.to_string());
                    }
                    acc
                });

            let domain = if !attribute_types.is_empty() {
                attribute_types
            } else {
                entity_types.clone()
            };
            domains.insert(var.clone(), domain);
        }

        for (etype, var) in declared {
            if self.schema.entity(etype).is_none() {
                return Err(Error::query(format!("unknown entity type `{etype}`")));
            }
            restrict(&mut domains, var, |ty| ty == etype);
        }

        for (var, etype) in self.known {
            restrict(&mut domains, var, |ty| ty == etype);
        }

        Ok(domains)
    }

    fn narrow(&self, tree: &Constraint<'_>, domains: &Domains) -> Domains {
        match tree {
            Constraint::All(items) => {
                let mut domains = domains.clone();
                loop {
                    let before = domains.clone();
                    for item in items {
                        domains = self.narrow(item, &domains);
                    }
                    if before == domains {
                        break domains;
                    }
                }
            }
            Constraint::Any(items) => {
                let branches: Vec<Domains> =
                    items.iter().map(|item| self.narrow(item, domains)).collect();
                let mut ret = Domains::new();
                for (var, types) in domains {
                    let kept = types
                        .iter()
                        .filter(|ty| branches.iter().any(|b| b[var].contains(ty)))
                        .cloned()
                        .collect();
                    ret.insert(var.clone(), kept);
                }
                ret
            }
            Constraint::Rel(rel) => {
                let mut domains = domains.clone();
                self.narrow_relation(rel, &mut domains);
                domains
            }
        }
    }

    fn narrow_relation(&self, rel: &Relation, domains: &mut Domains) {
        let subject = rel.subject.as_str();
        let object = rel.object_var();

        match rel.rtype.as_str() {
            "is" | "is_instance_of" => {
                let types = etypes(&rel.object);
                restrict(domains, subject, |ty| types.iter().any(|t| t == ty));
            }
            "has_text" => {
                let fulltext = self.schema.fulltext_entities();
                restrict(domains, subject, |ty| fulltext.contains(&ty));
            }
            "identity" => {
                if let Some(object) = object {
                    let common: Vec<String> = domains[subject]
                        .iter()
                        .filter(|ty| domains[object].contains(ty))
                        .cloned()
                        .collect();
                    restrict(domains, subject, |ty| common.iter().any(|t| t == ty));
                    restrict(domains, object, |ty| common.iter().any(|t| t == ty));
                }
            }
            "eid" => {}
            rtype => {
                let subjects = domains[subject].clone();
                match object {
                    Some(object) => {
                        let objects = domains[object].clone();
                        restrict(domains, subject, |ty| {
                            objects.iter().any(|o| self.admits(rtype, ty, o))
                        });
                        restrict(domains, object, |ty| {
                            subjects.iter().any(|s| self.admits(rtype, s, ty))
                        });
                    }
                    None => {
                        let subject_types = self
                            .schema
                            .relation(rtype)
                            .map(|rel| rel.subject_types())
                            .unwrap_or_default();
                        restrict(domains, subject, |ty| subject_types.contains(&ty));
                    }
                }
            }
        }
    }

    fn admits(&self, rtype: &str, subject: &str, object: &str) -> bool {
        let Some(rel) = self.schema.relation(rtype) else {
            return false;
        };
        rel.definition(subject, object).is_some()
            || (rel.symmetric && rel.definition(object, subject).is_some())
    }

    fn backtrack(
        &self,
        tree: &Constraint<'_>,
        domains: &Domains,
        order: &[&String],
        current: &mut Solution,
        out: &mut Vec<Solution>,
    ) {
        let Some((var, rest)) = order.split_first() else {
            if self.consistent(tree, current) == Some(true) {
                out.push(current.clone());
            }
            return;
        };

        for ty in &domains[*var] {
            current.insert(var.as_str(), ty.as_str());
            if self.consistent(tree, current) != Some(false) {
                self.backtrack(tree, domains, rest, current, out);
            }
        }
        current.remove(var);
    }

    /// `None` when the answer depends on unassigned variables.
    fn consistent(&self, tree: &Constraint<'_>, solution: &Solution) -> Option<bool> {
        match tree {
            Constraint::All(items) => {
                let mut ret = Some(true);
                for item in items {
                    match self.consistent(item, solution) {
                        Some(false) => return Some(false),
                        None => ret = None,
                        Some(true) => {}
                    }
                }
                ret
            }
            Constraint::Any(items) => {
                if items.is_empty() {
                    return Some(true);
                }
                let mut ret = Some(false);
                for item in items {
                    match self.consistent(item, solution) {
                        Some(true) => return Some(true),
                        None => ret = None,
                        Some(false) => {}
                    }
                }
                ret
            }
            Constraint::Rel(rel) => self.relation_consistent(rel, solution),
        }
    }

    fn relation_consistent(&self, rel: &Relation, solution: &Solution) -> Option<bool> {
        let subject = solution.get(&rel.subject)?;

        Some(match rel.rtype.as_str() {
            "is" | "is_instance_of" => etypes(&rel.object).iter().any(|t| t == subject),
            "has_text" => self.schema.fulltext_entities().contains(&subject),
            "eid" => true,
            "identity" => match rel.object_var() {
                Some(object) => solution.get(object)? == subject,
                None => true,
            },
            rtype => match rel.object_var() {
                Some(object) => self.admits(rtype, subject, solution.get(object)?),
                None => self
                    .schema
                    .relation(rtype)
                    .map(|rel| rel.subject_types().contains(&subject))
                    .unwrap_or(false),
            },
        })
    }
}

fn restrict(domains: &mut Domains, var: &str, f: impl Fn(&str) -> bool) {
    if let Some(types) = domains.get_mut(var) {
        types.retain(|ty| f(ty));
    }
}

/// Entity types named by the object of an `is` relation.
fn etypes(object: &Expr) -> Vec<String> {
    let mut ret = vec![];
    object.walk(&mut |expr| {
        if let Expr::EType(etype) = expr {
            ret.push(etype.clone());
        }
    });
    ret
}

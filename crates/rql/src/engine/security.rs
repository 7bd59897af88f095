use crate::Principal;

use rql_core::{
    analyze::{self, KnownTypes},
    schema::{Action, RqlExpression, Schema},
    stmt::{Args, Expr, Node, Relation, ScopeId, Select, Solution, Value},
    Error, Result,
};

/// Argument holding the eid of the principal in inserted read checks.
pub(crate) const PRINCIPAL_ARG: &str = "__principal";

/// Inserts read permission checks into selects.
pub(crate) struct Rewriter<'a> {
    schema: &'a Schema,

    principal: &'a Principal,

    /// Suffix of the next fresh variable
    next_var: usize,
}

/// A select with its read checks.
#[derive(Debug)]
pub(crate) struct Rewritten {
    pub(crate) select: Select,

    /// Variables that lost types to dropped solutions or to the split, and
    /// the types they keep
    pub(crate) narrowed: Vec<(String, Vec<String>)>,
}

/// Read checks of one variable: any expression grants access.
type Check<'a> = (String, Vec<&'a RqlExpression>);

impl<'a> Rewriter<'a> {
    pub(crate) fn new(schema: &'a Schema, principal: &'a Principal) -> Rewriter<'a> {
        Rewriter {
            schema,
            principal,
            next_var: 0,
        }
    }

    /// Returns `select` restricted to what the principal may read, split in
    /// one select per distinct set of checks.
    pub(crate) fn rewrite(&mut self, select: Select, args: &mut Args) -> Result<Vec<Rewritten>> {
        if self.principal.is_internal() {
            return Ok(vec![Rewritten {
                select,
                narrowed: vec![],
            }]);
        }

        let schema = self.schema;
        let mut groups: Vec<(Vec<Check<'a>>, Vec<Solution>)> = vec![];
        let mut denied: Option<String> = None;

        'solutions: for solution in &select.solutions {
            let mut checks: Vec<Check<'a>> = vec![];

            for (var, ty) in solution.iter() {
                let Some(entity) = schema.entity(ty) else {
                    continue;
                };
                if entity
                    .permissions
                    .grants(Action::Read, &self.principal.groups)
                {
                    continue;
                }
                // Checks on a variable only used under NOT would invert it
                if select.var(var).is_some_and(|info| info.only_negated()) {
                    continue;
                }

                let exprs = entity.permissions.expressions(Action::Read);
                if exprs.is_empty() {
                    tracing::trace!(var, etype = ty, "solution dropped");
                    denied.get_or_insert_with(|| ty.to_string());
                    continue 'solutions;
                }
                checks.push((var.to_string(), exprs));
            }

            match groups.iter_mut().find(|(key, _)| *key == checks) {
                Some((_, solutions)) => solutions.push(solution.clone()),
                None => groups.push((checks, vec![solution.clone()])),
            }
        }

        let mut ret = vec![];
        for (checks, solutions) in groups {
            // Dropped solutions and splits both narrow variables
            let narrowed = narrowed_vars(schema, &select, &solutions);
            let subset = solutions.len() < select.solutions.len();

            let mut part = Select {
                solutions,
                ..select.clone()
            };

            let mut readable = true;
            for (var, exprs) in &checks {
                if !self.insert_check(&mut part, var, exprs, args)? {
                    readable = false;
                    break;
                }
            }
            if !readable {
                continue;
            }
            if subset || !checks.is_empty() {
                analyze::annotate(schema, &mut part);
            }

            ret.push(Rewritten {
                select: part,
                narrowed,
            });
        }

        if ret.is_empty() {
            let target = denied
                .or_else(|| {
                    select
                        .solutions
                        .first()
                        .and_then(|solution| solution.iter().find(|(_, ty)| schema.entity(ty).is_some()))
                        .map(|(_, ty)| ty.to_string())
                })
                .unwrap_or_default();
            return Err(Error::unauthorized(Action::Read.as_str(), target));
        }

        tracing::trace!(parts = ret.len(), "read checks inserted");
        Ok(ret)
    }

    /// Adds the checks of `var` at its scope. Returns `false` when no
    /// expression can hold for the select's solutions.
    fn insert_check(
        &mut self,
        select: &mut Select,
        var: &str,
        exprs: &[&RqlExpression],
        args: &mut Args,
    ) -> Result<bool> {
        let scope = select.var(var).map(|info| info.scope).unwrap_or(0);

        let mut alternatives: Vec<(Node, Vec<Vec<Solution>>)> = vec![];
        for expr in exprs {
            let Some(node) = self.instantiate(select, var, scope, expr, args) else {
                // Fully enforced by the select itself
                return Ok(true);
            };

            // Typing of the check for each solution of the select
            let mut typed = Vec::with_capacity(select.solutions.len());
            for solution in &select.solutions {
                match self.solve_check(&node, solution) {
                    Ok(solutions) => typed.push(solutions),
                    Err(err) if err.is_type_resolution() => {
                        tracing::trace!(expr = %expr.text, var, "expression can not hold");
                        break;
                    }
                    Err(err) => return Err(err),
                }
            }
            if typed.len() == select.solutions.len() {
                alternatives.push((node, typed));
            }
        }

        if alternatives.is_empty() {
            return Ok(false);
        }

        // Every solution of the select is extended with the types of every
        // alternative's variables.
        let mut solutions = vec![];
        for (i, solution) in select.solutions.iter().enumerate() {
            let mut extended = vec![solution.clone()];
            for (_, typed) in &alternatives {
                let mut next = vec![];
                for base in &extended {
                    for check in &typed[i] {
                        let mut merged = base.clone();
                        for (name, ty) in check.iter() {
                            merged.insert(name, ty);
                        }
                        if !next.contains(&merged) {
                            next.push(merged);
                        }
                    }
                }
                extended = next;
            }
            for solution in extended {
                if !solutions.contains(&solution) {
                    solutions.push(solution);
                }
            }
        }
        select.solutions = solutions;

        let check = Node::or(alternatives.into_iter().map(|(node, _)| Node::exists(node)));
        add_to_scope(select, scope, check);
        Ok(true)
    }

    /// Binds an expression to `var`: `X` becomes `var`, `U` the principal
    /// and other variables get fresh names.
    fn instantiate(
        &mut self,
        select: &Select,
        var: &str,
        scope: ScopeId,
        expr: &RqlExpression,
        args: &mut Args,
    ) -> Option<Node> {
        let mut node = expr.restriction.clone();
        let mut principal_var = None;

        for name in node.vars() {
            if name == "X" {
                continue;
            }
            let fresh = format!("_{name}{}", self.next_var);
            self.next_var += 1;
            node.rename_var(&name, &fresh);
            if name == "U" {
                principal_var = Some(fresh);
            }
        }
        node.rename_var("X", var);

        let mut node = self.reuse_relations(select, var, scope, principal_var.as_deref(), node)?;

        if let Some(principal_var) = principal_var {
            if node.vars().contains(&principal_var) {
                let bind = Relation::new(principal_var, "eid", Expr::arg(PRINCIPAL_ARG));
                node = Node::and([node, Node::Relation(bind)])?;
                args.insert(PRINCIPAL_ARG.to_string(), Value::I64(self.principal.eid));
            }
        }
        Some(node)
    }

    /// Replaces relations of the check already enforced by the select.
    ///
    /// `var rtype V` in the check matches `var rtype O` in the select when
    /// `var` has at most one partner: `V` is then `O`. The principal's
    /// variable is never replaced, its eid binding is the check.
    fn reuse_relations(
        &self,
        select: &Select,
        var: &str,
        scope: ScopeId,
        principal_var: Option<&str>,
        node: Node,
    ) -> Option<Node> {
        let Some(restriction) = &select.restriction else {
            return Some(node);
        };

        let mut present: Vec<&Relation> = vec![];
        restriction.for_each_relation(&mut |rel, cx| {
            if cx.scope == scope && !cx.negated && !cx.in_or && !rel.is_optional() {
                present.push(rel);
            }
        });

        let types = select.var_types(var);
        let mut renames: Vec<(String, String)> = vec![];

        for conjunct in node.conjuncts() {
            let Node::Relation(rel) = conjunct else {
                continue;
            };
            let Some(object) = rel.object_var() else {
                continue;
            };

            let (checked_is_subject, fresh) = if rel.subject == var && object.starts_with('_') {
                (true, object)
            } else if object == var && rel.subject.starts_with('_') {
                (false, rel.subject.as_str())
            } else {
                continue;
            };
            if Some(fresh) == principal_var {
                continue;
            }

            if !self.is_single(&rel.rtype, &types, checked_is_subject) {
                continue;
            }

            let existing = present.iter().find_map(|candidate| {
                if candidate.rtype != rel.rtype {
                    return None;
                }
                if checked_is_subject && candidate.subject == var {
                    candidate.object_var()
                } else if !checked_is_subject && candidate.object_var() == Some(var) {
                    Some(candidate.subject.as_str())
                } else {
                    None
                }
            });

            if let Some(existing) = existing {
                renames.push((fresh.to_string(), existing.to_string()));
            }
        }

        if renames.is_empty() {
            return Some(node);
        }

        let mut node = node;
        for (fresh, existing) in &renames {
            node.rename_var(fresh, existing);
        }

        // The select already holds the reused relations. An optional
        // relation of the check reuses a mandatory one of the select.
        node.retain(&mut |conjunct| {
            !matches!(conjunct, Node::Relation(rel) if present.iter().any(|p| same_link(p, rel)))
        })
    }

    /// Each entity of `types` has at most one partner through `rtype` on the
    /// given side.
    fn is_single(&self, rtype: &str, types: &[String], subject: bool) -> bool {
        let Some(rel) = self.schema.relation(rtype) else {
            return false;
        };
        let defs: Vec<_> = rel
            .definitions
            .iter()
            .filter(|def| {
                let ty = if subject { &def.subject } else { &def.object };
                types.contains(ty)
            })
            .collect();
        !defs.is_empty() && defs.iter().all(|def| def.cardinality.of_side(subject).is_single())
    }

    /// Solutions of the check alone, with the select's types for the
    /// variables they share.
    fn solve_check(&self, node: &Node, solution: &Solution) -> Result<Vec<Solution>> {
        let mut known = KnownTypes::new();
        for name in node.vars() {
            if let Some(ty) = solution.get(&name) {
                known.insert(name, ty.to_string());
            }
        }

        let selection = node.vars().into_iter().map(Expr::var).collect();
        let mut check = Select::new(selection, Some(node.clone()));
        analyze::solve_select(self.schema, &mut check, &known)?;
        Ok(check.solutions)
    }
}

fn same_link(a: &Relation, b: &Relation) -> bool {
    a.subject == b.subject && a.rtype == b.rtype && a.op == b.op && a.object == b.object
}

/// ANDs `check` into the scope `scope` of `select`.
pub(crate) fn add_to_scope(select: &mut Select, scope: ScopeId, check: Node) {
    if scope == 0 {
        select.add_restriction(check);
        return;
    }

    let mut check = Some(check);
    if let Some(restriction) = &mut select.restriction {
        add_to_node(restriction, scope, &mut check);
    }
    // Scope not found: checking at the root is stricter
    if let Some(check) = check {
        select.add_restriction(check);
    }
}

fn add_to_node(node: &mut Node, scope: ScopeId, check: &mut Option<Node>) {
    match node {
        Node::And(nodes) | Node::Or(nodes) => {
            for node in nodes {
                add_to_node(node, scope, check);
            }
        }
        Node::Not(id, inner) | Node::Exists(id, inner) => {
            if *id == scope {
                if let Some(check) = check.take() {
                    let current = std::mem::replace(&mut **inner, Node::And(vec![]));
                    **inner = Node::and([current, check]).unwrap_or(Node::And(vec![]));
                }
            } else {
                add_to_node(inner, scope, check);
            }
        }
        Node::Relation(_) | Node::Compare(_) => {}
    }
}

/// Entity variables whose types are a strict subset of the select's after
/// keeping only `solutions`.
fn narrowed_vars(schema: &Schema, select: &Select, solutions: &[Solution]) -> Vec<(String, Vec<String>)> {
    let mut ret = vec![];
    for name in select.vars.keys() {
        let all = select.var_types(name);
        if !all.iter().all(|ty| schema.entity(ty).is_some()) {
            continue;
        }
        let kept = Solution::types_of(solutions, name);
        if kept.len() < all.len() {
            ret.push((name.clone(), kept));
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use rql_core::{parse, schema::AttrType, stmt::Statement};

    fn schema() -> Schema {
        let mut b = Schema::builder();
        b.entity("Personne");
        b.entity("Note")
            .read(["managers"])
            .read_expr("X owned_by U");
        b.entity("Secret").read(["managers"]);
        b.entity("Affaire")
            .read(["managers"])
            .read_expr("X concerne P, P owned_by U");
        b.entity("Memo").read(["managers"]).read_expr("X auteur U");
        b.entity("Projet")
            .read(["managers"])
            .read_expr("X pilote P?, P owned_by U");
        b.attribute("Personne", "nom", AttrType::String);
        b.attribute("Note", "para", AttrType::String);
        b.relation("Note", "ecrit_par", "Personne").cardinality("?*");
        b.relation("Secret", "ecrit_par", "Personne").cardinality("?*");
        b.relation("Affaire", "concerne", "Personne").cardinality("?*");
        b.relation("Memo", "auteur", "CWUser").cardinality("?*");
        b.relation("Projet", "pilote", "Personne").cardinality("?*");
        b.build().unwrap()
    }

    fn select(schema: &Schema, rql: &str) -> Select {
        let Statement::Select(mut union) = parse::parse(rql).unwrap() else {
            panic!("not a select: {rql}");
        };
        let mut select = union.selects.remove(0);
        analyze::solve_select(schema, &mut select, &KnownTypes::new()).unwrap();
        analyze::annotate(schema, &mut select);
        select
    }

    fn guest() -> Principal {
        Principal::new(42, "anon", ["guests"])
    }

    #[test]
    fn granted_groups_leave_select_untouched() {
        let schema = schema();
        let principal = Principal::new(1, "admin", ["managers"]);
        let original = select(&schema, "Any X WHERE X is Note");

        let mut args = Args::new();
        let parts = Rewriter::new(&schema, &principal)
            .rewrite(original.clone(), &mut args)
            .unwrap();

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].select, original);
        assert!(args.is_empty());
    }

    #[test]
    fn expression_becomes_exists() {
        let schema = schema();
        let principal = guest();
        let mut args = Args::new();

        let parts = Rewriter::new(&schema, &principal)
            .rewrite(select(&schema, "Any X WHERE X is Note"), &mut args)
            .unwrap();

        assert_eq!(parts.len(), 1);
        assert_eq!(
            parts[0].select.to_string(),
            "Any X WHERE X is Note, EXISTS(X owned_by _U0, _U0 eid %(__principal)s)"
        );
        assert_eq!(args.get(PRINCIPAL_ARG), Some(&Value::I64(42)));
        assert_eq!(parts[0].select.solutions[0].get("_U0"), Some("CWUser"));
    }

    #[test]
    fn unreadable_types_are_dropped_and_narrowed() {
        let schema = schema();
        let principal = guest();
        let mut args = Args::new();

        let parts = Rewriter::new(&schema, &principal)
            .rewrite(select(&schema, "Any X WHERE X ecrit_par P"), &mut args)
            .unwrap();

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].narrowed, vec![("X".to_string(), vec!["Note".to_string()])]);
        assert!(parts[0]
            .select
            .solutions
            .iter()
            .all(|solution| solution.get("X") == Some("Note")));
    }

    #[test]
    fn nothing_readable() {
        let schema = schema();
        let principal = guest();
        let err = Rewriter::new(&schema, &principal)
            .rewrite(select(&schema, "Any X WHERE X is Secret"), &mut Args::new())
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn negated_variables_are_exempt() {
        let schema = schema();
        let principal = guest();
        let original = select(&schema, "Any P WHERE P is Personne, NOT S ecrit_par P");

        let parts = Rewriter::new(&schema, &principal)
            .rewrite(original.clone(), &mut Args::new())
            .unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].select.restriction, original.restriction);
    }

    #[test]
    fn split_per_check_group() {
        let schema = schema();
        let principal = guest();
        let mut args = Args::new();

        let parts = Rewriter::new(&schema, &principal)
            .rewrite(select(&schema, "Any X WHERE X is IN(Note, Affaire)"), &mut args)
            .unwrap();

        assert_eq!(parts.len(), 2);
        for part in &parts {
            assert_eq!(part.select.solutions.len(), 1);
            let ty = part.select.solutions[0].get("X").unwrap().to_string();
            assert_eq!(part.narrowed, vec![("X".to_string(), vec![ty])]);
        }
        assert!(parts
            .iter()
            .any(|part| part.select.to_string().contains("X concerne _P")));
    }

    #[test]
    fn single_partner_relation_is_reused() {
        let schema = schema();
        let principal = guest();
        let mut args = Args::new();

        let parts = Rewriter::new(&schema, &principal)
            .rewrite(
                select(&schema, "Any X, P WHERE X is Affaire, X concerne P, P nom 'x'"),
                &mut args,
            )
            .unwrap();

        assert_eq!(parts.len(), 1);
        let text = parts[0].select.to_string();
        assert!(text.contains("EXISTS(P owned_by _U"), "{text}");
        assert!(!text.contains("_P"), "{text}");
    }

    #[test]
    fn unchecked_part_of_a_split_is_narrowed() {
        let schema = schema();
        let principal = guest();

        let parts = Rewriter::new(&schema, &principal)
            .rewrite(select(&schema, "Any X WHERE X is IN(Personne, Note)"), &mut Args::new())
            .unwrap();

        assert_eq!(parts.len(), 2);
        let unchecked = parts
            .iter()
            .find(|part| !part.select.to_string().contains("EXISTS"))
            .unwrap();
        assert_eq!(
            unchecked.narrowed,
            vec![("X".to_string(), vec!["Personne".to_string()])]
        );
        assert!(unchecked
            .select
            .solutions
            .iter()
            .all(|solution| solution.get("X") == Some("Personne")));
    }

    #[test]
    fn principal_relation_is_never_reused() {
        let schema = schema();
        let principal = guest();
        let mut args = Args::new();

        let parts = Rewriter::new(&schema, &principal)
            .rewrite(
                select(&schema, "Any X, Q WHERE X is Memo, X auteur Q"),
                &mut args,
            )
            .unwrap();

        assert_eq!(parts.len(), 1);
        let text = parts[0].select.to_string();
        assert!(text.contains("EXISTS(X auteur _U"), "{text}");
        assert!(text.contains("eid %(__principal)s"), "{text}");
        assert_eq!(args.get(PRINCIPAL_ARG), Some(&Value::I64(42)));
    }

    #[test]
    fn optional_check_relation_reuses_mandatory_one() {
        let schema = schema();
        let principal = guest();

        let parts = Rewriter::new(&schema, &principal)
            .rewrite(
                select(&schema, "Any X, P WHERE X is Projet, X pilote P"),
                &mut Args::new(),
            )
            .unwrap();

        let text = parts[0].select.to_string();
        assert!(text.contains("EXISTS(P owned_by _U"), "{text}");
        assert!(!text.contains("_P"), "{text}");
    }

    #[test]
    fn optional_query_relation_is_not_reused() {
        let schema = schema();
        let principal = guest();

        let parts = Rewriter::new(&schema, &principal)
            .rewrite(
                select(&schema, "Any X, P WHERE X is Affaire, X concerne P?"),
                &mut Args::new(),
            )
            .unwrap();

        let text = parts[0].select.to_string();
        assert!(text.contains("EXISTS(X concerne _P"), "{text}");
    }
}

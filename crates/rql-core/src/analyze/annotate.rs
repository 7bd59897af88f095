use crate::{
    schema::Schema,
    stmt::{Node, RelationUse, ScopeId, ScopeInfo, ScopeKind, Select, Side, VarInfo, VarKind},
};

use indexmap::IndexMap;

/// Computes the scope tree and variable metadata of `select`.
///
/// Must run after solutions are computed: invariance depends on them.
pub fn annotate(schema: &Schema, select: &mut Select) {
    let mut scopes = vec![ScopeInfo::root()];
    if let Some(restriction) = &mut select.restriction {
        assign_scopes(restriction, 0, &mut scopes);
    }
    select.scopes = scopes;

    let mut vars: IndexMap<String, VarInfo> = IndexMap::new();
    let mut uses: IndexMap<String, Vec<ScopeId>> = IndexMap::new();

    for var in select.defined_vars() {
        vars.insert(var.clone(), VarInfo::new(var, VarKind::Entity));
    }

    if let Some(restriction) = &select.restriction {
        restriction.for_each_relation(&mut |rel, cx| {
            let attribute = schema.is_attribute(&rel.rtype);

            let mut relation_use = |var: &str, side: Side| {
                let Some(info) = vars.get_mut(var) else {
                    return;
                };
                info.relations.push(RelationUse {
                    rtype: rel.rtype.clone(),
                    side,
                    scope: cx.scope,
                    negated: cx.negated,
                    optional: rel.is_optional(),
                    in_or: cx.in_or,
                });
                if rel.optional_var() == Some(var) {
                    info.optional = true;
                }
                uses.entry(var.to_string()).or_default().push(cx.scope);
            };

            relation_use(&rel.subject, Side::Subject);
            if let Some(object) = rel.object_var() {
                relation_use(object, Side::Object);
            } else {
                // variables nested in the object, such as `X age A + 1`
                for var in rel.object.vars() {
                    relation_use(&var, Side::Object);
                }
            }

            if attribute {
                if let Some(info) = vars.get_mut(&rel.subject) {
                    info.attribute_access = true;
                }
                if let Some(object) = rel.object_var() {
                    if let Some(info) = vars.get_mut(object) {
                        info.kind = VarKind::Attribute;
                    }
                }
            }
        });

        // Variables of comparisons count as used in the enclosing scope
        collect_compare_uses(restriction, 0, &mut uses);
    }

    for var in select.root_term_vars() {
        uses.entry(var).or_default().push(0);
    }

    for expr in &select.selection {
        expr.for_each_var(&mut |name| {
            if let Some(info) = vars.get_mut(name) {
                info.selected = true;
            }
        });
    }

    for (name, info) in vars.iter_mut() {
        if let Some(scopes) = uses.get(name) {
            info.scope = common_scope(&select.scopes, scopes);
        }
    }

    let names: Vec<String> = vars.keys().cloned().collect();
    for name in names {
        let invariant = is_invariant(schema, select, &vars, &name);
        if let Some(info) = vars.get_mut(&name) {
            info.invariant = invariant;
        }
    }

    select.vars = vars;
}

fn assign_scopes(node: &mut Node, current: ScopeId, scopes: &mut Vec<ScopeInfo>) {
    match node {
        Node::And(nodes) | Node::Or(nodes) => {
            for node in nodes {
                assign_scopes(node, current, scopes);
            }
        }
        Node::Not(scope, inner) => {
            *scope = open_scope(scopes, current, ScopeKind::Not);
            assign_scopes(inner, *scope, scopes);
        }
        Node::Exists(scope, inner) => {
            *scope = open_scope(scopes, current, ScopeKind::Exists);
            assign_scopes(inner, *scope, scopes);
        }
        Node::Relation(_) | Node::Compare(_) => {}
    }
}

fn open_scope(scopes: &mut Vec<ScopeInfo>, parent: ScopeId, kind: ScopeKind) -> ScopeId {
    scopes.push(ScopeInfo {
        parent: Some(parent),
        kind,
    });
    scopes.len() - 1
}

fn collect_compare_uses(node: &Node, current: ScopeId, uses: &mut IndexMap<String, Vec<ScopeId>>) {
    match node {
        Node::And(nodes) | Node::Or(nodes) => {
            for node in nodes {
                collect_compare_uses(node, current, uses);
            }
        }
        Node::Not(scope, inner) | Node::Exists(scope, inner) => {
            collect_compare_uses(inner, *scope, uses)
        }
        Node::Compare(cmp) => {
            let mut push = |name: &str| uses.entry(name.to_string()).or_default().push(current);
            cmp.lhs.for_each_var(&mut push);
            cmp.rhs.for_each_var(&mut push);
        }
        Node::Relation(_) => {}
    }
}

/// Lowest common ancestor of `ids` in the scope tree.
fn common_scope(scopes: &[ScopeInfo], ids: &[ScopeId]) -> ScopeId {
    let path = |mut id: ScopeId| {
        let mut ret = vec![id];
        while let Some(parent) = scopes[id].parent {
            ret.push(parent);
            id = parent;
        }
        ret.reverse();
        ret
    };

    let mut common = match ids.first() {
        Some(id) => path(*id),
        None => return 0,
    };

    for id in &ids[1..] {
        let other = path(*id);
        let len = common
            .iter()
            .zip(other.iter())
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(len);
    }

    common.last().copied().unwrap_or(0)
}

/// A variable is invariant when a relation in its own scope binds it without
/// any type filtering: the schema admits no type for it, given its partner's
/// types, that the solutions do not already allow.
fn is_invariant(
    schema: &Schema,
    select: &Select,
    vars: &IndexMap<String, VarInfo>,
    name: &str,
) -> bool {
    let Some(info) = vars.get(name) else {
        return false;
    };

    if info.kind != VarKind::Entity || info.attribute_access {
        return false;
    }

    let mut principal = false;
    for relation_use in &info.relations {
        if relation_use.in_or {
            return false;
        }
        if matches!(
            relation_use.rtype.as_str(),
            "is" | "is_instance_of" | "identity"
        ) {
            return false;
        }
        // A relation negated above the variable's own scope never reaches
        // here: the scopes would differ.
        principal |= relation_use.scope == info.scope
            && !relation_use.optional
            && is_principal(schema, select, vars, name, relation_use);
    }

    // bound side of an outer join
    let Some(restriction) = &select.restriction else {
        return false;
    };
    for rel in restriction.relations() {
        if rel.bound_var() == Some(name) {
            return false;
        }
    }

    principal
}

fn is_principal(
    schema: &Schema,
    select: &Select,
    vars: &IndexMap<String, VarInfo>,
    name: &str,
    relation_use: &RelationUse,
) -> bool {
    let own_types = select.var_types(name);

    if relation_use.rtype == "has_text" {
        let fulltext = schema.fulltext_entities();
        return fulltext.iter().all(|ty| own_types.iter().any(|t| t == ty));
    }

    let Some(rel) = schema.relation(&relation_use.rtype) else {
        return false;
    };
    if rel.attribute || rel.symmetric || (rel.inlined && relation_use.side == Side::Subject) {
        return false;
    }

    // Partner of the relation: its types as solved.
    let partner = select.restriction.as_ref().and_then(|restriction| {
        restriction.relations().into_iter().find_map(|r| {
            if r.rtype != relation_use.rtype {
                return None;
            }
            match relation_use.side {
                Side::Subject if r.subject == name => r.object_var().map(str::to_string),
                Side::Object if r.object_var() == Some(name) => Some(r.subject.clone()),
                _ => None,
            }
        })
    });
    let Some(partner) = partner else {
        return false;
    };
    if !vars.contains_key(&partner) {
        return false;
    }
    let partner_types = select.var_types(&partner);

    let subject_side = relation_use.side == Side::Subject;
    rel.definitions
        .iter()
        .filter(|def| {
            let other = if subject_side { &def.object } else { &def.subject };
            partner_types.contains(other)
        })
        .all(|def| {
            let this = if subject_side { &def.subject } else { &def.object };
            own_types.contains(this)
        })
}

use super::{Compare, Relation, ScopeId};

/// Restriction tree of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),

    /// Negated sub-tree. Opens a new scope.
    Not(ScopeId, Box<Node>),

    /// `EXISTS(...)` sub-tree. Opens a new scope.
    Exists(ScopeId, Box<Node>),

    Relation(Relation),

    Compare(Compare),
}

impl Node {
    /// Builds a conjunction, flattening nested `And` nodes. Returns `None`
    /// when `nodes` is empty.
    pub fn and(nodes: impl IntoIterator<Item = Node>) -> Option<Node> {
        let mut operands = vec![];

        for node in nodes {
            match node {
                Node::And(inner) => operands.extend(inner),
                node => operands.push(node),
            }
        }

        match operands.len() {
            0 => None,
            1 => operands.pop(),
            _ => Some(Node::And(operands)),
        }
    }

    pub fn or(nodes: impl IntoIterator<Item = Node>) -> Node {
        let mut operands: Vec<_> = nodes.into_iter().collect();

        if operands.len() == 1 {
            operands.remove(0)
        } else {
            Node::Or(operands)
        }
    }

    pub fn exists(inner: Node) -> Node {
        Node::Exists(0, Box::new(inner))
    }

    pub fn not(inner: Node) -> Node {
        Node::Not(0, Box::new(inner))
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Node::Relation(rel) => Some(rel),
            _ => None,
        }
    }

    /// Calls `f` on every relation of the tree with the negation / OR context
    /// it appears in.
    pub fn for_each_relation<'a>(&'a self, f: &mut impl FnMut(&'a Relation, RelationCx)) {
        self.for_each_relation_cx(RelationCx::default(), f);
    }

    fn for_each_relation_cx<'a>(
        &'a self,
        cx: RelationCx,
        f: &mut impl FnMut(&'a Relation, RelationCx),
    ) {
        match self {
            Node::And(nodes) => {
                for node in nodes {
                    node.for_each_relation_cx(cx, f);
                }
            }
            Node::Or(nodes) => {
                for node in nodes {
                    node.for_each_relation_cx(RelationCx { in_or: true, ..cx }, f);
                }
            }
            Node::Not(scope, inner) => inner.for_each_relation_cx(
                RelationCx {
                    negated: true,
                    scope: *scope,
                    ..cx
                },
                f,
            ),
            Node::Exists(scope, inner) => inner.for_each_relation_cx(
                RelationCx {
                    scope: *scope,
                    ..cx
                },
                f,
            ),
            Node::Relation(rel) => f(rel, cx),
            Node::Compare(_) => {}
        }
    }

    pub fn relations(&self) -> Vec<&Relation> {
        let mut ret = vec![];
        self.for_each_relation(&mut |rel, _| ret.push(rel));
        ret
    }

    /// Calls `f` on every variable referenced by the tree.
    pub fn for_each_var(&self, f: &mut impl FnMut(&str)) {
        match self {
            Node::And(nodes) | Node::Or(nodes) => {
                for node in nodes {
                    node.for_each_var(f);
                }
            }
            Node::Not(_, inner) | Node::Exists(_, inner) => inner.for_each_var(f),
            Node::Relation(rel) => {
                f(&rel.subject);
                rel.object.for_each_var(f);
            }
            Node::Compare(cmp) => {
                cmp.lhs.for_each_var(f);
                cmp.rhs.for_each_var(f);
            }
        }
    }

    pub fn vars(&self) -> Vec<String> {
        let mut ret: Vec<String> = vec![];
        self.for_each_var(&mut |name| {
            if !ret.iter().any(|v| v == name) {
                ret.push(name.to_string());
            }
        });
        ret
    }

    pub fn rename_var(&mut self, from: &str, to: &str) {
        match self {
            Node::And(nodes) | Node::Or(nodes) => {
                for node in nodes {
                    node.rename_var(from, to);
                }
            }
            Node::Not(_, inner) | Node::Exists(_, inner) => inner.rename_var(from, to),
            Node::Relation(rel) => rel.rename_var(from, to),
            Node::Compare(cmp) => {
                cmp.lhs.rename_var(from, to);
                cmp.rhs.rename_var(from, to);
            }
        }
    }

    /// Removes the top-level conjuncts for which `f` returns `false`. Nested
    /// OR / NOT / EXISTS nodes are kept or dropped as a whole.
    pub fn retain(self, f: &mut impl FnMut(&Node) -> bool) -> Option<Node> {
        match self {
            Node::And(nodes) => Node::and(nodes.into_iter().filter(|node| f(node))),
            node if f(&node) => Some(node),
            _ => None,
        }
    }

    /// Top-level conjuncts of the tree.
    pub fn conjuncts(&self) -> &[Node] {
        match self {
            Node::And(nodes) => nodes,
            node => std::slice::from_ref(node),
        }
    }
}

/// Context in which a relation appears in a restriction tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationCx {
    /// Innermost scope
    pub scope: ScopeId,

    /// Under a `NOT`
    pub negated: bool,

    /// Under an `OR`
    pub in_or: bool,
}

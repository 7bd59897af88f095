use super::{CmpOp, Expr};

/// `subject rtype [op] object`, e.g. `X travaille Y` or `X nom "bidule"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    /// Subject variable
    pub subject: String,

    pub rtype: String,

    pub op: CmpOp,

    pub object: Expr,

    /// Which side of the relation may be missing (outer join)
    pub optional: Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Optional {
    #[default]
    None,

    /// `X? rel Y`: keep `Y` rows without a matching `X`
    Subject,

    /// `X rel Y?`: keep `X` rows without a matching `Y`
    Object,
}

impl Relation {
    pub fn new(subject: impl Into<String>, rtype: impl Into<String>, object: Expr) -> Self {
        Self {
            subject: subject.into(),
            rtype: rtype.into(),
            op: CmpOp::Eq,
            object,
            optional: Optional::None,
        }
    }

    pub fn object_var(&self) -> Option<&str> {
        self.object.as_var()
    }

    pub fn is_optional(&self) -> bool {
        self.optional != Optional::None
    }

    /// The variable which may be null when the relation is optional.
    pub fn optional_var(&self) -> Option<&str> {
        match self.optional {
            Optional::None => None,
            Optional::Subject => Some(&self.subject),
            Optional::Object => self.object_var(),
        }
    }

    /// The variable which must be bound when the relation is optional.
    pub fn bound_var(&self) -> Option<&str> {
        match self.optional {
            Optional::None => None,
            Optional::Subject => self.object_var(),
            Optional::Object => Some(&self.subject),
        }
    }

    pub fn vars(&self) -> Vec<String> {
        let mut ret = vec![self.subject.clone()];
        for var in self.object.vars() {
            if !ret.contains(&var) {
                ret.push(var);
            }
        }
        ret
    }

    pub fn references(&self, var: &str) -> bool {
        self.subject == var || self.object.vars().iter().any(|v| v == var)
    }

    pub fn rename_var(&mut self, from: &str, to: &str) {
        if self.subject == from {
            self.subject = to.to_string();
        }
        self.object.rename_var(from, to);
    }
}

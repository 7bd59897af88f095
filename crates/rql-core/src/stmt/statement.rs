use super::{Delete, Insert, Node, Relation, Select, Set, Union};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Select(Union),
    Insert(Insert),
    Delete(Delete),
    Set(Set),
}

impl Statement {
    pub fn is_select(&self) -> bool {
        matches!(self, Self::Select(_))
    }

    pub fn as_select(&self) -> Option<&Union> {
        match self {
            Self::Select(union) => Some(union),
            _ => None,
        }
    }

    /// Relations of the statement: main relations of writes followed by the
    /// relations of every restriction.
    pub fn relations(&self) -> Vec<&Relation> {
        let mut ret = vec![];
        match self {
            Self::Select(union) => {
                for select in &union.selects {
                    if let Some(restriction) = &select.restriction {
                        ret.extend(restriction.relations());
                    }
                }
            }
            Self::Insert(Insert {
                main_relations,
                restriction,
                ..
            })
            | Self::Delete(Delete {
                main_relations,
                restriction,
                ..
            })
            | Self::Set(Set {
                main_relations,
                restriction,
                ..
            }) => {
                ret.extend(main_relations.iter());
                if let Some(restriction) = restriction {
                    ret.extend(restriction.relations());
                }
            }
        }
        ret
    }

    pub fn restriction(&self) -> Option<&Node> {
        match self {
            Self::Select(_) => None,
            Self::Insert(stmt) => stmt.restriction.as_ref(),
            Self::Delete(stmt) => stmt.restriction.as_ref(),
            Self::Set(stmt) => stmt.restriction.as_ref(),
        }
    }
}

impl From<Select> for Statement {
    fn from(value: Select) -> Self {
        Self::Select(Union::single(value))
    }
}

impl From<Union> for Statement {
    fn from(value: Union) -> Self {
        Self::Select(value)
    }
}

impl From<Insert> for Statement {
    fn from(value: Insert) -> Self {
        Self::Insert(value)
    }
}

impl From<Delete> for Statement {
    fn from(value: Delete) -> Self {
        Self::Delete(value)
    }
}

impl From<Set> for Statement {
    fn from(value: Set) -> Self {
        Self::Set(value)
    }
}

use indexmap::IndexMap;

/// Location of variables and relations already staged in temporary tables.
///
/// Generated SQL reads a mapped variable from its column instead of joining
/// the entity tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarMap {
    pub vars: IndexMap<String, ColumnRef>,
    pub relations: Vec<StagedRelation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

/// Instances of `subject rtype object` staged as `(from, to)` columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedRelation {
    pub subject: String,
    pub rtype: String,
    pub object: String,
    pub table: String,
    pub from: String,
    pub to: String,
}

impl VarMap {
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.relations.is_empty()
    }

    pub fn insert(&mut self, var: impl Into<String>, table: impl Into<String>, column: impl Into<String>) {
        self.vars.insert(
            var.into(),
            ColumnRef {
                table: table.into(),
                column: column.into(),
            },
        );
    }

    pub fn get(&self, var: &str) -> Option<&ColumnRef> {
        self.vars.get(var)
    }

    pub fn relation(&self, subject: &str, rtype: &str, object: &str) -> Option<&StagedRelation> {
        self.relations
            .iter()
            .find(|rel| rel.subject == subject && rel.rtype == rtype && rel.object == object)
    }

    /// Temporary tables referenced by the map, in order of first use.
    pub fn tables(&self) -> Vec<&str> {
        let mut ret: Vec<&str> = vec![];
        let names = self
            .vars
            .values()
            .map(|column| column.table.as_str())
            .chain(self.relations.iter().map(|rel| rel.table.as_str()));
        for name in names {
            if !ret.contains(&name) {
                ret.push(name);
            }
        }
        ret
    }
}

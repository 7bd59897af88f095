use crate::engine::plan::{
    Aggr, DeleteEntities, DeleteRelations, Fetch, Insert, Intersect, OneFetch, Relations, Union,
    UnionFetch, Update,
};

use std::fmt;

pub(crate) enum Step {
    /// Run queries, concatenating their rows
    OneFetch(OneFetch),

    /// Stage query rows into a temporary table
    Fetch(Fetch),

    /// Run a query over staged rows on the system source
    Aggr(Aggr),

    /// Concatenate child rows under a shared limit
    Union(Union),

    /// Rows every child returned
    Intersect(Intersect),

    /// Group the children staging one temporary table
    UnionFetch(UnionFetch),

    /// Create entities and relations
    Insert(Insert),

    /// Rows of the sub-select feeding an insert
    Relations(Relations),

    /// Change attributes and add relations
    Update(Update),

    DeleteEntities(DeleteEntities),

    DeleteRelations(DeleteRelations),
}

impl Step {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::OneFetch(_) => "OneFetch",
            Self::Fetch(_) => "Fetch",
            Self::Aggr(_) => "Aggr",
            Self::Union(_) => "Union",
            Self::Intersect(_) => "Intersect",
            Self::UnionFetch(_) => "UnionFetch",
            Self::Insert(_) => "Insert",
            Self::Relations(_) => "Relations",
            Self::Update(_) => "Update",
            Self::DeleteEntities(_) => "DeleteEntities",
            Self::DeleteRelations(_) => "DeleteRelations",
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneFetch(s) => s.fmt(f),
            Self::Fetch(s) => s.fmt(f),
            Self::Aggr(s) => s.fmt(f),
            Self::Union(s) => s.fmt(f),
            Self::Intersect(s) => s.fmt(f),
            Self::UnionFetch(s) => s.fmt(f),
            Self::Insert(s) => s.fmt(f),
            Self::Relations(s) => s.fmt(f),
            Self::Update(s) => s.fmt(f),
            Self::DeleteEntities(s) => s.fmt(f),
            Self::DeleteRelations(s) => s.fmt(f),
        }
    }
}

use crate::engine::plan::Step;

#[derive(Debug)]
pub(crate) struct Intersect {
    pub(crate) limit: Option<u64>,
    pub(crate) offset: u64,
}

impl From<Intersect> for Step {
    fn from(value: Intersect) -> Self {
        Step::Intersect(value)
    }
}

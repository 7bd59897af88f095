use super::Select;

/// Ordered list of selects whose rows are concatenated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Union {
    pub selects: Vec<Select>,
}

impl Union {
    pub fn new(selects: Vec<Select>) -> Self {
        Self { selects }
    }

    pub fn single(select: Select) -> Self {
        Self {
            selects: vec![select],
        }
    }

    pub fn is_single(&self) -> bool {
        self.selects.len() == 1
    }
}

impl From<Select> for Union {
    fn from(select: Select) -> Self {
        Self::single(select)
    }
}

use std::collections::BTreeMap;

/// One admissible assignment of variables to types.
///
/// Entity variables map to entity type names, attribute variables to their
/// attribute type name (`String`, `Int`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Solution(BTreeMap<String, String>);

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: &str) -> Option<&str> {
        self.0.get(var).map(String::as_str)
    }

    pub fn insert(&mut self, var: impl Into<String>, ty: impl Into<String>) {
        self.0.insert(var.into(), ty.into());
    }

    pub fn remove(&mut self, var: &str) -> Option<String> {
        self.0.remove(var)
    }

    pub fn contains(&self, var: &str) -> bool {
        self.0.contains_key(var)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn vars(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Restricts the solution to the given variables.
    pub fn project<S: AsRef<str>>(&self, vars: &[S]) -> Solution {
        Solution(
            vars.iter()
                .filter_map(|var| {
                    let var = var.as_ref();
                    self.0.get(var).map(|ty| (var.to_string(), ty.clone()))
                })
                .collect(),
        )
    }

    pub fn rename_var(&mut self, from: &str, to: &str) {
        if let Some(ty) = self.0.remove(from) {
            self.0.insert(to.to_string(), ty);
        }
    }

    /// Ordered, deduplicated types of `var` across `solutions`.
    pub fn types_of(solutions: &[Solution], var: &str) -> Vec<String> {
        let mut ret: Vec<String> = vec![];
        for solution in solutions {
            if let Some(ty) = solution.get(var) {
                if !ret.iter().any(|t| t == ty) {
                    ret.push(ty.to_string());
                }
            }
        }
        ret
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Solution {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Solution(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl core::fmt::Display for Solution {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("{")?;
        for (i, (var, ty)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{var}: {ty}")?;
        }
        f.write_str("}")
    }
}

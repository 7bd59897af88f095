use super::Serializer;

/// SQL dialect of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Postgresql,
    Sqlite,
    Mysql,
}

impl Serializer {
    pub fn sqlite() -> Serializer {
        Serializer::new(Flavor::Sqlite)
    }

    pub fn postgresql() -> Serializer {
        Serializer::new(Flavor::Postgresql)
    }

    pub fn mysql() -> Serializer {
        Serializer::new(Flavor::Mysql)
    }
}

impl Flavor {
    /// Writes the placeholder for the `n`th parameter, counting from one.
    pub fn placeholder(self, n: usize, dst: &mut String) {
        use std::fmt::Write;

        // Writing to a `String` does not fail.
        let _ = match self {
            Flavor::Mysql => write!(dst, "?"),
            Flavor::Postgresql => write!(dst, "${n}"),
            Flavor::Sqlite => write!(dst, "?{n}"),
        };
    }
}

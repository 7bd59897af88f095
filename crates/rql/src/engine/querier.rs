use lru::LruCache;
use parking_lot::Mutex;
use rql_core::{
    analyze::{self, KnownTypes},
    parse,
    schema::Schema,
    stmt::Statement,
    Result,
};
use std::{num::NonZeroUsize, sync::Arc};

/// Key of an analyzed statement: its normalized text and the types known
/// for eid-bound variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub rql: String,

    /// Known types, sorted by variable
    pub types: Vec<(String, String)>,
}

impl CacheKey {
    pub(crate) fn new(rql: String, known: &KnownTypes) -> CacheKey {
        let mut types: Vec<(String, String)> = known
            .iter()
            .map(|(var, ty)| (var.clone(), ty.clone()))
            .collect();
        types.sort();
        CacheKey { rql, types }
    }
}

/// Parses and analyzes statements, keeping the results for reuse.
///
/// Cached statements are immutable; callers clone them before planning.
pub(crate) struct Querier {
    /// Parsed statements by normalized text
    parsed: Option<Mutex<LruCache<String, Arc<Statement>>>>,

    /// Solved and annotated statements
    solved: Option<Mutex<LruCache<CacheKey, Arc<Statement>>>>,
}

impl Querier {
    /// A `capacity` of zero disables caching.
    pub(crate) fn new(capacity: usize) -> Querier {
        Querier {
            parsed: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            solved: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    /// Returns the normalized text of `rql` with its parsed statement.
    pub(crate) fn parse(&self, rql: &str) -> Result<(String, Arc<Statement>)> {
        let normalized = normalize(rql);

        if let Some(cache) = &self.parsed {
            if let Some(stmt) = cache.lock().get(&normalized) {
                return Ok((normalized, stmt.clone()));
            }
        }

        // Error offsets refer to the text as written
        let stmt = Arc::new(parse::parse(rql)?);

        if let Some(cache) = &self.parsed {
            cache.lock().put(normalized.clone(), stmt.clone());
        }
        Ok((normalized, stmt))
    }

    /// Computes solutions and variable metadata of `parsed`.
    pub(crate) fn solve(
        &self,
        schema: &Schema,
        key: CacheKey,
        parsed: &Statement,
        known: &KnownTypes,
    ) -> Result<Arc<Statement>> {
        if let Some(cache) = &self.solved {
            if let Some(stmt) = cache.lock().get(&key) {
                tracing::trace!(rql = %key.rql, "statement cache hit");
                return Ok(stmt.clone());
            }
        }

        let mut stmt = parsed.clone();
        analyze::solve(schema, &mut stmt, known)?;
        if let Statement::Select(union) = &mut stmt {
            for select in &mut union.selects {
                analyze::annotate(schema, select);
            }
        }

        let stmt = Arc::new(stmt);
        if let Some(cache) = &self.solved {
            cache.lock().put(key, stmt.clone());
        }
        Ok(stmt)
    }

    #[cfg(test)]
    fn is_cached(&self, key: &CacheKey) -> bool {
        self.solved
            .as_ref()
            .map(|cache| cache.lock().contains(key))
            .unwrap_or(false)
    }
}

/// Collapses whitespace runs outside of quoted strings and trims the ends.
pub(crate) fn normalize(rql: &str) -> String {
    let mut ret = String::with_capacity(rql.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut space = false;

    for c in rql.trim().chars() {
        if let Some(q) = quote {
            ret.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        if c.is_whitespace() {
            space = true;
            continue;
        }
        if space {
            ret.push(' ');
            space = false;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
        }
        ret.push(c);
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use rql_core::schema::AttrType;

    fn schema() -> Schema {
        let mut builder = Schema::builder();
        builder.entity("Personne");
        builder.attribute("Personne", "nom", AttrType::String);
        builder.build().unwrap()
    }

    #[test]
    fn normalize_whitespace() {
        assert_eq!(
            normalize("  Any X\n  WHERE   X nom  'a  b'  "),
            "Any X WHERE X nom 'a  b'"
        );
        assert_eq!(normalize(r#"Any X WHERE X nom "a\"  b""#), r#"Any X WHERE X nom "a\"  b""#);
    }

    #[test]
    fn parse_is_shared_across_spellings() {
        let querier = Querier::new(8);
        let (a, first) = querier.parse("Any X WHERE X nom 'x'").unwrap();
        let (b, second) = querier.parse("Any X\n    WHERE X nom 'x'").unwrap();
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn solved_statements_are_keyed_by_known_types() {
        let schema = schema();
        let querier = Querier::new(8);
        let (rql, parsed) = querier.parse("Any N WHERE X nom N").unwrap();

        let key = CacheKey::new(rql.clone(), &KnownTypes::new());
        let first = querier.solve(&schema, key.clone(), &parsed, &KnownTypes::new()).unwrap();
        assert!(querier.is_cached(&key));

        let second = querier.solve(&schema, key, &parsed, &KnownTypes::new()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let mut known = KnownTypes::new();
        known.insert("X".to_string(), "Personne".to_string());
        assert!(!querier.is_cached(&CacheKey::new(rql, &known)));
    }

    #[test]
    fn zero_capacity_disables_cache() {
        let schema = schema();
        let querier = Querier::new(0);
        let (rql, parsed) = querier.parse("Any N WHERE X nom N").unwrap();
        let key = CacheKey::new(rql, &KnownTypes::new());
        let first = querier.solve(&schema, key.clone(), &parsed, &KnownTypes::new()).unwrap();
        let second = querier.solve(&schema, key.clone(), &parsed, &KnownTypes::new()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!querier.is_cached(&key));
    }
}

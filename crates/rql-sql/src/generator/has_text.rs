use super::{Arm, Frame};

use crate::{
    layout,
    serializer::{Flavor, Param},
};

use rql_core::{
    stmt::{Expr, Relation, Value},
    Error, Result,
};

impl Arm<'_, '_> {
    /// `X has_text "words"`, joining the full-text index.
    pub(super) fn has_text(&mut self, frame: &mut Frame, rel: &Relation) -> Result<()> {
        let query = match &rel.object {
            Expr::Value(value @ Value::String(_)) => Param::Value(value.clone()),
            Expr::Arg(name) => Param::Arg(name.clone()),
            _ => return Err(Error::query("has_text expects a string")),
        };

        match self.gen.flavor {
            Flavor::Sqlite => {
                // The index stores single words: one join per word of the
                // query, which therefore depends on the argument values.
                if matches!(query, Param::Arg(_)) {
                    self.state.cacheable = false;
                }
                let text = query.resolve(self.state.args)?;
                let words = layout::tokenize(text.as_str().unwrap_or_default());
                if words.is_empty() {
                    frame.add_cond("1 = 0", &[]);
                    return Ok(());
                }

                let mut first = None;
                for word in words {
                    let alias = self.appears(frame, &rel.subject);
                    let param = self.state.param(Param::Value(Value::String(word)));
                    frame.add_cond(
                        format!(
                            "{alias}.word_id IN (SELECT word_id FROM {} WHERE word = {param})",
                            layout::WORD
                        ),
                        &[alias.clone()],
                    );
                    first.get_or_insert(alias);
                }
                if let Some(alias) = first {
                    self.fulltext.insert(rel.subject.clone(), (alias, query));
                }
            }
            Flavor::Postgresql => {
                let alias = self.appears(frame, &rel.subject);
                let param = self.state.param(query.clone());
                frame.add_cond(
                    format!("{alias}.words @@ to_tsquery('default', {param})"),
                    &[alias.clone()],
                );
                self.fulltext.insert(rel.subject.clone(), (alias, query));
            }
            Flavor::Mysql => {
                let alias = self.appears(frame, &rel.subject);
                let param = self.state.param(query.clone());
                frame.add_cond(
                    format!("MATCH ({alias}.words) AGAINST ({param} IN BOOLEAN MODE)"),
                    &[alias.clone()],
                );
                self.fulltext.insert(rel.subject.clone(), (alias, query));
            }
        }
        Ok(())
    }

    fn appears(&mut self, frame: &mut Frame, var: &str) -> String {
        let alias = self.alias(layout::APPEARS);
        frame.push(layout::APPEARS, &alias, false);
        self.bind(frame, var, format!("{alias}.uid"), Some(alias.clone()));
        alias
    }

    /// `FTIRANK(X)`: relevance of the full-text match on `X`.
    pub(super) fn rank(&mut self, var: &str) -> String {
        let Some((alias, query)) = self.fulltext.get(var).cloned() else {
            return "1.0".to_string();
        };

        match self.gen.flavor {
            Flavor::Sqlite => "1.0".to_string(),
            Flavor::Postgresql => {
                let param = self.state.param(query);
                format!("ts_rank({alias}.words, to_tsquery('default', {param}))")
            }
            Flavor::Mysql => {
                let param = self.state.param(query);
                format!("MATCH ({alias}.words) AGAINST ({param})")
            }
        }
    }
}

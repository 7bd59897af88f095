use super::*;
use crate::{parse, Error, Result};

const DEFAULT_GROUPS: &[&str] = &["managers", "users", "guests"];
const OWNER_EXPRESSION: &str = "X owned_by U";

/// Declares a schema.
///
/// ```
/// use rql_core::schema::{AttrType, Schema};
///
/// let mut b = Schema::builder();
/// b.entity("Personne").read(["managers", "users"]).read_expr("X owned_by U");
/// b.attribute("Personne", "nom", AttrType::String).required().fulltext();
/// b.relation("Personne", "connait", "Personne").cardinality("**");
/// let schema = b.build().unwrap();
/// assert!(schema.entity("Personne").is_some());
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    entities: IndexMap<String, EntityDecl>,
    relations: Vec<RelationDecl>,
}

#[derive(Debug)]
struct EntityDecl {
    rules: Vec<(Action, RuleDecl)>,
}

#[derive(Debug)]
enum RuleDecl {
    Group(String),
    Expression(String),
}

#[derive(Debug)]
struct RelationDecl {
    subject: String,
    rtype: String,
    object: String,
    attribute: bool,
    cardinality: String,
    inlined: bool,
    symmetric: bool,
    computed: bool,
    fulltext: bool,
    add: Option<Vec<String>>,
    delete: Option<Vec<String>>,
}

/// Handle returned by [`Builder::entity`].
pub struct EntityHandle<'a> {
    decl: &'a mut EntityDecl,
}

/// Handle returned by [`Builder::attribute`] and [`Builder::relation`].
pub struct RelationHandle<'a> {
    decl: &'a mut RelationDecl,
}

impl Builder {
    /// Declares an entity type with default permissions: every group reads,
    /// managers and users add, managers and owners update and delete.
    pub fn entity(&mut self, name: &str) -> EntityHandle<'_> {
        let decl = self
            .entities
            .entry(name.to_string())
            .or_insert_with(EntityDecl::with_defaults);
        EntityHandle { decl }
    }

    pub fn attribute(&mut self, etype: &str, name: &str, ty: AttrType) -> RelationHandle<'_> {
        self.push_relation(etype, name, ty.name(), true, "?1")
    }

    pub fn relation(&mut self, subject: &str, rtype: &str, object: &str) -> RelationHandle<'_> {
        self.push_relation(subject, rtype, object, false, "**")
    }

    fn push_relation(
        &mut self,
        subject: &str,
        rtype: &str,
        object: &str,
        attribute: bool,
        cardinality: &str,
    ) -> RelationHandle<'_> {
        self.relations.push(RelationDecl {
            subject: subject.to_string(),
            rtype: rtype.to_string(),
            object: object.to_string(),
            attribute,
            cardinality: cardinality.to_string(),
            inlined: false,
            symmetric: false,
            computed: false,
            fulltext: false,
            add: None,
            delete: None,
        });
        let index = self.relations.len() - 1;
        RelationHandle {
            decl: &mut self.relations[index],
        }
    }

    pub fn build(&self) -> Result<Schema> {
        let mut schema = Schema::default();
        let mut entities: Vec<(&str, Option<&EntityDecl>)> = self
            .entities
            .iter()
            .map(|(name, decl)| (name.as_str(), Some(decl)))
            .collect();

        if !self.entities.contains_key(USER_TYPE) {
            entities.push((USER_TYPE, None));
        }

        for (name, decl) in entities {
            if AttrType::from_name(name).is_some() || Schema::is_pseudo(name) {
                return Err(Error::invalid_schema(format!(
                    "`{name}` is a reserved name"
                )));
            }

            let mut permissions = Permissions::default();
            match decl {
                Some(decl) => {
                    for (action, rule) in &decl.rules {
                        let rule = match rule {
                            RuleDecl::Group(group) => Rule::Group(group.clone()),
                            RuleDecl::Expression(text) => {
                                Rule::Expression(parse_expression(name, text)?)
                            }
                        };
                        permissions.rules_mut(*action).push(rule);
                    }
                }
                None => {
                    // users are managed by managers only
                    for group in DEFAULT_GROUPS {
                        permissions.read.push(Rule::Group(group.to_string()));
                    }
                    for action in [Action::Add, Action::Update, Action::Delete] {
                        permissions
                            .rules_mut(action)
                            .push(Rule::Group("managers".to_string()));
                    }
                }
            }

            schema.entities.insert(
                name.to_string(),
                EntityType {
                    name: name.to_string(),
                    permissions,
                    fulltext: vec![],
                },
            );
        }

        let login = RelationDecl::system(USER_TYPE, "login", AttrType::String.name(), true, "11");
        let owned_by: Vec<RelationDecl> = schema
            .entities
            .keys()
            .map(|etype| RelationDecl::system(etype, OWNED_BY, USER_TYPE, false, "**"))
            .collect();
        let mut decls: Vec<&RelationDecl> = self.relations.iter().collect();

        if !decls
            .iter()
            .any(|decl| decl.subject == USER_TYPE && decl.rtype == "login")
        {
            decls.push(&login);
        }
        if !decls.iter().any(|decl| decl.rtype == OWNED_BY) {
            decls.extend(owned_by.iter());
        }

        for decl in decls {
            self.add_relation(&mut schema, decl)?;
        }

        Ok(schema)
    }

    fn add_relation(&self, schema: &mut Schema, decl: &RelationDecl) -> Result<()> {
        if Schema::is_pseudo(&decl.rtype) {
            return Err(Error::invalid_schema(format!(
                "`{}` is a reserved relation",
                decl.rtype
            )));
        }

        if !schema.entities.contains_key(&decl.subject) {
            return Err(Error::invalid_schema(format!(
                "relation `{}` references unknown entity type `{}`",
                decl.rtype, decl.subject
            )));
        }

        if !decl.attribute && !schema.entities.contains_key(&decl.object) {
            return Err(Error::invalid_schema(format!(
                "relation `{}` references unknown entity type `{}`",
                decl.rtype, decl.object
            )));
        }

        let cardinality = Cardinality::parse(&decl.cardinality)?;

        if decl.inlined && (decl.attribute || !cardinality.subject.is_single()) {
            return Err(Error::invalid_schema(format!(
                "relation `{}` can not be inlined",
                decl.rtype
            )));
        }

        let rel = schema
            .relations
            .entry(decl.rtype.clone())
            .or_insert_with(|| RelationType {
                name: decl.rtype.clone(),
                attribute: decl.attribute,
                inlined: decl.inlined,
                symmetric: decl.symmetric,
                computed: decl.computed,
                definitions: vec![],
                permissions: RelationPermissions {
                    add: vec!["managers".to_string(), "users".to_string()],
                    delete: vec!["managers".to_string(), "users".to_string()],
                },
            });

        if rel.attribute != decl.attribute {
            return Err(Error::invalid_schema(format!(
                "`{}` is declared both as an attribute and as a relation",
                decl.rtype
            )));
        }

        if rel.definition(&decl.subject, &decl.object).is_some() {
            return Err(Error::invalid_schema(format!(
                "duplicate definition {} {} {}",
                decl.subject, decl.rtype, decl.object
            )));
        }

        rel.inlined |= decl.inlined;
        rel.symmetric |= decl.symmetric;
        rel.computed |= decl.computed;
        if let Some(add) = &decl.add {
            rel.permissions.add = add.clone();
        }
        if let Some(delete) = &decl.delete {
            rel.permissions.delete = delete.clone();
        }

        rel.definitions.push(RelationDef {
            rtype: decl.rtype.clone(),
            subject: decl.subject.clone(),
            object: decl.object.clone(),
            cardinality,
            fulltext: decl.fulltext,
        });

        if decl.fulltext {
            if let Some(entity) = schema.entities.get_mut(&decl.subject) {
                entity.fulltext.push(decl.rtype.clone());
            }
        }

        Ok(())
    }
}

fn parse_expression(etype: &str, text: &str) -> Result<RqlExpression> {
    let restriction = parse::parse_restriction(text)
        .map_err(|err| err.context(crate::err!("permission expression of {etype}")))?;

    let vars = restriction.vars();
    if !vars.iter().any(|var| var == "X") {
        return Err(Error::invalid_schema(format!(
            "permission expression `{text}` of {etype} does not reference X"
        )));
    }

    Ok(RqlExpression {
        text: text.to_string(),
        restriction,
    })
}

impl EntityDecl {
    fn with_defaults() -> Self {
        let mut rules = vec![];
        for group in DEFAULT_GROUPS {
            rules.push((Action::Read, RuleDecl::Group(group.to_string())));
        }
        for group in ["managers", "users"] {
            rules.push((Action::Add, RuleDecl::Group(group.to_string())));
        }
        for action in [Action::Update, Action::Delete] {
            rules.push((action, RuleDecl::Group("managers".to_string())));
            rules.push((action, RuleDecl::Expression(OWNER_EXPRESSION.to_string())));
        }
        Self { rules }
    }

    fn set(&mut self, action: Action, rules: Vec<RuleDecl>) {
        self.rules.retain(|(a, _)| *a != action);
        self.rules.extend(rules.into_iter().map(|rule| (action, rule)));
    }
}

impl RelationDecl {
    fn system(subject: &str, rtype: &str, object: &str, attribute: bool, card: &str) -> Self {
        Self {
            subject: subject.to_string(),
            rtype: rtype.to_string(),
            object: object.to_string(),
            attribute,
            cardinality: card.to_string(),
            inlined: false,
            symmetric: false,
            computed: false,
            fulltext: false,
            add: None,
            delete: None,
        }
    }
}

fn groups<I, S>(groups: I) -> Vec<RuleDecl>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    groups
        .into_iter()
        .map(|group| RuleDecl::Group(group.into()))
        .collect()
}

impl EntityHandle<'_> {
    /// Replaces the groups and expressions granted read access.
    pub fn read<I: IntoIterator<Item = S>, S: Into<String>>(self, g: I) -> Self {
        self.decl.set(Action::Read, groups(g));
        self
    }

    pub fn add<I: IntoIterator<Item = S>, S: Into<String>>(self, g: I) -> Self {
        self.decl.set(Action::Add, groups(g));
        self
    }

    pub fn update<I: IntoIterator<Item = S>, S: Into<String>>(self, g: I) -> Self {
        self.decl.set(Action::Update, groups(g));
        self
    }

    pub fn delete<I: IntoIterator<Item = S>, S: Into<String>>(self, g: I) -> Self {
        self.decl.set(Action::Delete, groups(g));
        self
    }

    /// Grants read access to entities matching `expr`.
    pub fn read_expr(self, expr: &str) -> Self {
        self.expr(Action::Read, expr)
    }

    pub fn add_expr(self, expr: &str) -> Self {
        self.expr(Action::Add, expr)
    }

    pub fn update_expr(self, expr: &str) -> Self {
        self.expr(Action::Update, expr)
    }

    pub fn delete_expr(self, expr: &str) -> Self {
        self.expr(Action::Delete, expr)
    }

    fn expr(self, action: Action, expr: &str) -> Self {
        self.decl
            .rules
            .push((action, RuleDecl::Expression(expr.to_string())));
        self
    }
}

impl RelationHandle<'_> {
    pub fn cardinality(self, card: &str) -> Self {
        self.decl.cardinality = card.to_string();
        self
    }

    /// Attribute must be given on insert.
    pub fn required(self) -> Self {
        self.decl.cardinality = "11".to_string();
        self
    }

    pub fn fulltext(self) -> Self {
        self.decl.fulltext = true;
        self
    }

    pub fn inlined(self) -> Self {
        self.decl.inlined = true;
        self
    }

    pub fn symmetric(self) -> Self {
        self.decl.symmetric = true;
        self
    }

    pub fn computed(self) -> Self {
        self.decl.computed = true;
        self
    }

    pub fn add_groups<I: IntoIterator<Item = S>, S: Into<String>>(self, g: I) -> Self {
        self.decl.add = Some(g.into_iter().map(Into::into).collect());
        self
    }

    pub fn delete_groups<I: IntoIterator<Item = S>, S: Into<String>>(self, g: I) -> Self {
        self.decl.delete = Some(g.into_iter().map(Into::into).collect());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_expression_is_parsed() {
        let mut b = Schema::builder();
        b.entity("Affaire").read(["managers"]).read_expr("X owned_by U");
        let schema = b.build().unwrap();

        let perms = &schema.entity("Affaire").unwrap().permissions;
        assert!(perms.grants(Action::Read, &["managers"]));
        assert!(!perms.grants(Action::Read, &["guests"]));
        assert_eq!(perms.expressions(Action::Read)[0].text, "X owned_by U");
    }

    #[test]
    fn inlined_requires_single_cardinality() {
        let mut b = Schema::builder();
        b.entity("Personne");
        b.entity("Societe");
        b.relation("Personne", "travaille", "Societe").inlined();
        let err = b.build().unwrap_err();
        assert!(err.is_invalid_schema());

        let mut b = Schema::builder();
        b.entity("Personne");
        b.entity("Societe");
        b.relation("Personne", "travaille", "Societe")
            .cardinality("?*")
            .inlined();
        assert!(b.build().unwrap().relation("travaille").unwrap().inlined);
    }

    #[test]
    fn unknown_entity_type() {
        let mut b = Schema::builder();
        b.entity("Personne");
        b.relation("Personne", "travaille", "Societe");
        assert!(b.build().unwrap_err().is_invalid_schema());
    }

    #[test]
    fn expression_must_reference_x() {
        let mut b = Schema::builder();
        b.entity("Personne").read_expr("U login \"admin\"");
        assert!(b.build().unwrap_err().is_invalid_schema());
    }
}

use crate::engine::{Cx, EntityLocation, SourceId};

use indexmap::IndexMap;
use rql_core::{
    driver::operation::{
        CreateEntity, DeleteEntities, DeleteRelations, InsertEntity, InsertRelations, UpdateEntity,
    },
    err,
    schema::{Action, AttrType, RelationType, RqlExpression, Schema},
    stmt::{Args, Eid, Value},
    Error, Result,
};
use std::collections::HashMap;

/// Applies the writes of one statement to the sources owning the data.
///
/// Entities are written as they are prepared. Relations are batched per
/// type until [`Store::flush`], so that relations between entities created
/// by the same statement can be routed once both ends exist.
pub(crate) struct Store<'a> {
    cx: &'a Cx<'a>,

    /// Known entity locations
    locations: HashMap<Eid, EntityLocation>,

    /// Relations waiting for the flush
    pending: IndexMap<String, Vec<(Eid, Eid)>>,

    /// New entities whose add permission depends on an expression
    deferred: Vec<(Eid, String)>,
}

impl<'a> Store<'a> {
    pub(crate) fn new(cx: &'a Cx<'a>) -> Store<'a> {
        Store {
            cx,
            locations: HashMap::new(),
            pending: IndexMap::new(),
            deferred: vec![],
        }
    }

    fn schema(&self) -> &'a Schema {
        &self.cx.engine.schema
    }

    /// Creates an entity in the source owning its type. Returns its eid.
    pub(crate) async fn prepare_insert_entity(
        &mut self,
        etype: &str,
        attrs: IndexMap<String, Value>,
    ) -> Result<Eid> {
        let schema = self.schema();
        let Some(entity) = schema.entity(etype) else {
            return Err(Error::query(format!("unknown entity type {etype}")));
        };

        self.validate(etype, &attrs, true)?;

        let deferred = if self.granted(Action::Add, etype) {
            false
        } else if !entity.permissions.expressions(Action::Add).is_empty() {
            true
        } else {
            return Err(Error::unauthorized(Action::Add.as_str(), etype));
        };

        for name in attrs.keys() {
            if let Some(rel) = schema.relation(name).filter(|rel| !rel.attribute) {
                self.check_relation(Action::Add, rel)?;
            }
        }

        let engine = self.cx.engine;
        let source = self.owner(etype)?;

        let allocated = engine
            .system()
            .exec(
                CreateEntity {
                    etype: etype.to_string(),
                    source: engine.source(source).uri().to_string(),
                }
                .into(),
            )
            .await?
            .rows
            .into_values();
        let eid = allocated
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| err!("system source allocated no eid for {etype}"))?
            .to_eid()?;

        engine
            .source(source)
            .exec(
                InsertEntity {
                    etype: etype.to_string(),
                    eid,
                    attrs,
                }
                .into(),
            )
            .await
            .map_err(|err| err.context(err!("inserting {etype} #{eid}")))?;

        tracing::debug!(eid, etype, source = engine.source(source).uri(), "entity inserted");

        self.locations.insert(
            eid,
            EntityLocation {
                etype: etype.to_string(),
                source,
            },
        );
        if deferred {
            self.deferred.push((eid, etype.to_string()));
        }
        Ok(eid)
    }

    /// Queues a relation for the next flush.
    pub(crate) fn prepare_insert_relation(&mut self, from: Eid, rtype: &str, to: Eid) -> Result<()> {
        let rel = writable_relation(self.schema(), rtype)?;
        self.check_relation(Action::Add, rel)?;
        self.pending
            .entry(rtype.to_string())
            .or_default()
            .push((from, to));
        Ok(())
    }

    pub(crate) async fn prepare_update_entity(
        &mut self,
        etype: &str,
        eid: Eid,
        attrs: IndexMap<String, Value>,
    ) -> Result<()> {
        if attrs.is_empty() {
            return Ok(());
        }

        let schema = self.schema();
        self.validate(etype, &attrs, false)?;
        for name in attrs.keys() {
            if let Some(rel) = schema.relation(name).filter(|rel| !rel.attribute) {
                self.check_relation(Action::Add, rel)?;
            }
        }
        self.check_entity(Action::Update, etype, eid).await?;

        let location = self.location(eid).await?;
        self.cx
            .engine
            .source(location.source)
            .exec(
                UpdateEntity {
                    etype: etype.to_string(),
                    eid,
                    attrs,
                }
                .into(),
            )
            .await
            .map_err(|err| err.context(err!("updating {etype} #{eid}")))?;

        tracing::debug!(eid, etype, "entity updated");
        Ok(())
    }

    /// Deletes entities with every relation referencing them.
    pub(crate) async fn prepare_delete_entities(&mut self, eids: Vec<Eid>) -> Result<()> {
        self.locate(eids.iter().copied()).await?;

        let mut by_source: IndexMap<SourceId, Vec<(Eid, String)>> = IndexMap::new();
        for eid in &eids {
            let location = self.location(*eid).await?;
            self.check_entity(Action::Delete, &location.etype, *eid).await?;
            by_source
                .entry(location.source)
                .or_default()
                .push((*eid, location.etype));
        }

        let engine = self.cx.engine;
        for (source, entities) in by_source {
            engine
                .source(source)
                .exec(
                    DeleteEntities {
                        entities: entities.clone(),
                    }
                    .into(),
                )
                .await?;

            // The system source records every entity and holds relations
            // crossing sources
            if !source.is_system() {
                engine.system().exec(DeleteEntities { entities }.into()).await?;
            }
        }

        for eid in &eids {
            self.locations.remove(eid);
        }
        for pairs in self.pending.values_mut() {
            pairs.retain(|(from, to)| !eids.contains(from) && !eids.contains(to));
        }

        tracing::debug!(count = eids.len(), "entities deleted");
        Ok(())
    }

    pub(crate) async fn prepare_delete_relations(&mut self, rtype: &str, pairs: Vec<(Eid, Eid)>) -> Result<()> {
        let rel = writable_relation(self.schema(), rtype)?;
        self.check_relation(Action::Delete, rel)?;

        for (source, pairs) in self.route(rel, pairs).await? {
            self.cx
                .engine
                .source(source)
                .exec(
                    DeleteRelations {
                        rtype: rtype.to_string(),
                        pairs,
                    }
                    .into(),
                )
                .await?;
        }
        Ok(())
    }

    /// Writes queued relations, then evaluates deferred add permissions.
    pub(crate) async fn flush(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        for (rtype, pairs) in pending {
            if pairs.is_empty() {
                continue;
            }
            let rel = writable_relation(self.schema(), &rtype)?;
            for (source, pairs) in self.route(rel, pairs).await? {
                tracing::debug!(rtype, count = pairs.len(), "relations inserted");
                self.cx
                    .engine
                    .source(source)
                    .exec(
                        InsertRelations {
                            rtype: rtype.clone(),
                            pairs,
                        }
                        .into(),
                    )
                    .await?;
            }
        }

        // Expressions may depend on relations of the new entities
        let deferred = std::mem::take(&mut self.deferred);
        for (eid, etype) in deferred {
            self.check_entity(Action::Add, &etype, eid).await?;
        }
        Ok(())
    }

    /// Flushes and releases the store.
    pub(crate) async fn commit(mut self) -> Result<()> {
        self.flush().await
    }

    pub(crate) async fn location(&mut self, eid: Eid) -> Result<EntityLocation> {
        self.locate([eid]).await?;
        self.locations
            .get(&eid)
            .cloned()
            .ok_or_else(|| Error::unknown_eid(eid))
    }

    /// Loads the location of the given eids. Fails on unknown eids.
    async fn locate(&mut self, eids: impl IntoIterator<Item = Eid>) -> Result<()> {
        let mut missing: Vec<Eid> = vec![];
        for eid in eids {
            if !self.locations.contains_key(&eid) && !missing.contains(&eid) {
                missing.push(eid);
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        let found = self.cx.engine.entity_info(missing.clone()).await?;
        for eid in missing {
            match found.get(&eid) {
                Some(location) => {
                    self.locations.insert(eid, location.clone());
                }
                None => return Err(Error::unknown_eid(eid)),
            }
        }
        Ok(())
    }

    /// Groups relation instances by the source storing them.
    async fn route(
        &mut self,
        rel: &RelationType,
        pairs: Vec<(Eid, Eid)>,
    ) -> Result<IndexMap<SourceId, Vec<(Eid, Eid)>>> {
        self.locate(pairs.iter().flat_map(|(from, to)| [*from, *to]))
            .await?;

        let mut ret: IndexMap<SourceId, Vec<(Eid, Eid)>> = IndexMap::new();
        for (from, to) in pairs {
            let source = match (self.locations.get(&from), self.locations.get(&to)) {
                (Some(subject), Some(object)) => self.relation_source(rel, subject, object)?,
                _ => return Err(Error::unknown_eid(if self.locations.contains_key(&from) { to } else { from })),
            };
            ret.entry(source).or_default().push((from, to));
        }
        Ok(ret)
    }

    /// Inlined relations live with their subject; relations between entities
    /// of one external source live there; everything else in the system
    /// source.
    fn relation_source(
        &self,
        rel: &RelationType,
        subject: &EntityLocation,
        object: &EntityLocation,
    ) -> Result<SourceId> {
        let engine = self.cx.engine;
        let supports = |id: SourceId| engine.source(id).support().supports_relation(&rel.name);

        if rel.inlined {
            if supports(subject.source) {
                return Ok(subject.source);
            }
        } else if subject.source == object.source && supports(subject.source) {
            return Ok(subject.source);
        } else if supports(SourceId::SYSTEM) {
            return Ok(SourceId::SYSTEM);
        }

        Err(Error::query(format!(
            "no source stores relation `{}` between {} and {}",
            rel.name, subject.etype, object.etype
        )))
    }

    /// Source new entities of `etype` are stored in.
    fn owner(&self, etype: &str) -> Result<SourceId> {
        let engine = self.cx.engine;
        let supports = |id: SourceId| engine.source(id).support().supports_entity(etype);

        if let Some(id) = self.cx.write_source.filter(|id| supports(*id)) {
            return Ok(id);
        }
        if supports(SourceId::SYSTEM) {
            return Ok(SourceId::SYSTEM);
        }
        engine
            .source_ids()
            .find(|id| supports(*id))
            .ok_or_else(|| Error::query(format!("no source stores entity type {etype}")))
    }

    fn granted(&self, action: Action, etype: &str) -> bool {
        let principal = self.cx.principal;
        principal.is_internal()
            || self
                .schema()
                .entity(etype)
                .is_some_and(|entity| entity.permissions.grants(action, &principal.groups))
    }

    async fn check_entity(&self, action: Action, etype: &str, eid: Eid) -> Result<()> {
        if self.granted(action, etype) {
            return Ok(());
        }

        if let Some(entity) = self.schema().entity(etype) {
            for expr in entity.permissions.expressions(action) {
                if self.satisfies(eid, expr).await? {
                    return Ok(());
                }
            }
        }

        Err(Error::unauthorized(action.as_str(), format!("{etype} #{eid}")))
    }

    fn check_relation(&self, action: Action, rel: &RelationType) -> Result<()> {
        let principal = self.cx.principal;
        if principal.is_internal() || rel.permissions.grants(action, &principal.groups) {
            Ok(())
        } else {
            Err(Error::unauthorized(action.as_str(), rel.name.clone()))
        }
    }

    /// Evaluates a permission expression for entity `eid` and the principal.
    async fn satisfies(&self, eid: Eid, expr: &RqlExpression) -> Result<bool> {
        let mut rql = format!("Any X WHERE X eid %(x)s, {}", expr.text);
        let mut args = Args::new();
        args.insert("x".to_string(), Value::I64(eid));

        if expr.restriction.vars().iter().any(|var| var == "U") {
            rql.push_str(", U eid %(u)s");
            args.insert("u".to_string(), Value::I64(self.cx.principal.eid));
        }

        match self.cx.internal_query(&rql, args).await {
            Ok(rows) => Ok(!rows.is_empty()),
            // The expression does not apply to the entity's type
            Err(err) if err.is_type_resolution() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn validate(&self, etype: &str, attrs: &IndexMap<String, Value>, insert: bool) -> Result<()> {
        let schema = self.schema();

        for (name, value) in attrs {
            if let Some(def) = schema.attribute(etype, name) {
                let ty = AttrType::from_name(&def.object).ok_or_else(|| {
                    Error::invalid_schema(format!("unknown attribute type {}", def.object))
                })?;
                if !ty.accepts(value) {
                    return Err(Error::validation(
                        etype,
                        name,
                        format!("expected {} value, got {value}", ty.name()),
                    ));
                }
                if value.is_null() && def.is_required() {
                    return Err(Error::validation(etype, name, "required attribute missing"));
                }
                continue;
            }

            let inlined = schema.relation(name).is_some_and(|rel| {
                rel.inlined && rel.definitions.iter().any(|def| def.subject == etype)
            });
            if !inlined {
                return Err(Error::validation(etype, name, "unknown attribute"));
            }
            if !value.is_null() && value.to_eid().is_err() {
                return Err(Error::validation(etype, name, format!("expected an eid, got {value}")));
            }
        }

        if insert {
            for def in schema.attributes_of(etype) {
                if def.is_required() && attrs.get(&def.rtype).map_or(true, Value::is_null) {
                    return Err(Error::validation(etype, &def.rtype, "required attribute missing"));
                }
            }
        }
        Ok(())
    }
}

/// The relation, when write statements may change it.
pub(crate) fn writable_relation<'a>(schema: &'a Schema, rtype: &str) -> Result<&'a RelationType> {
    if Schema::is_pseudo(rtype) {
        return Err(Error::query(format!("relation `{rtype}` is read-only")));
    }
    let Some(rel) = schema.relation(rtype) else {
        return Err(Error::query(format!("unknown relation `{rtype}`")));
    };
    if rel.attribute {
        return Err(Error::query(format!("`{rtype}` is an attribute, not a relation")));
    }
    if rel.computed {
        return Err(Error::query(format!("relation `{rtype}` is computed")));
    }
    Ok(rel)
}

use crate::{
    engine::{Engine, SourceId},
    Principal, ResultSet,
};

use rql_core::{driver::operation::Transaction, err, stmt::Args, Result};
use std::sync::Arc;

/// Runs statements on behalf of one principal.
///
/// The first write statement opens a transaction on every source. It stays
/// open until [`Session::commit`] or [`Session::rollback`].
pub struct Session {
    engine: Arc<Engine>,

    principal: Principal,

    /// Source new entities are stored in
    write_source: Option<SourceId>,

    in_transaction: bool,
}

impl Session {
    pub(crate) fn new(engine: Arc<Engine>, principal: Principal) -> Session {
        Session {
            engine,
            principal,
            write_source: None,
            in_transaction: false,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Stores entities inserted from now on in the source identified by
    /// `uri`, when it supports their type. `None` restores the default.
    pub fn set_write_source(&mut self, uri: Option<&str>) -> Result<()> {
        self.write_source = match uri {
            Some(uri) => Some(
                self.engine
                    .source_by_uri(uri)
                    .ok_or_else(|| err!("unknown source {uri}"))?,
            ),
            None => None,
        };
        Ok(())
    }

    /// Runs `rql` with `args` substituted for its `%(name)s` placeholders.
    ///
    /// When `describe` is set, the result carries the type of every cell.
    pub async fn execute(&mut self, rql: &str, args: Args, describe: bool) -> Result<ResultSet> {
        tracing::debug!(login = %self.principal.login, rql, "execute");

        if !self.in_transaction {
            let (_, parsed) = self.engine.querier.parse(rql)?;
            if !parsed.is_select() {
                self.engine.transaction(Transaction::Start).await?;
                self.in_transaction = true;
            }
        }

        self.engine
            .exec(&self.principal, self.write_source, rql, args, describe)
            .await
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.end(Transaction::Commit).await
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.end(Transaction::Rollback).await
    }

    async fn end(&mut self, op: Transaction) -> Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.engine.transaction(op).await
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.in_transaction {
            tracing::warn!(
                login = %self.principal.login,
                "session dropped with an open transaction"
            );
        }
    }
}

use crate::logging_source::SourceOp;
use rql_core::driver::{operation::Search, Operation, Response};
use std::sync::{Arc, Mutex};

/// A wrapper around the operations log of one source
#[derive(Clone)]
pub struct ExecLog {
    ops: Arc<Mutex<Vec<SourceOp>>>,
}

impl ExecLog {
    pub(crate) fn new(ops: Arc<Mutex<Vec<SourceOp>>>) -> Self {
        Self { ops }
    }

    pub fn len(&self) -> usize {
        self.ops.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().unwrap().is_empty()
    }

    /// Check if any operation matches the given predicate
    pub fn any<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Operation) -> bool,
    {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .any(|op| predicate(&op.operation))
    }

    /// Count operations matching the given predicate
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Operation) -> bool,
    {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter(|op| predicate(&op.operation))
            .count()
    }

    /// Names of the logged operations, in execution order
    pub fn names(&self) -> Vec<&'static str> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .map(|op| op.operation.name())
            .collect()
    }

    /// Logged searches, in execution order
    pub fn searches(&self) -> Vec<Search> {
        self.ops
            .lock()
            .unwrap()
            .iter()
            .filter_map(|op| match &op.operation {
                Operation::Search(search) => Some(search.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn has_search(&self) -> bool {
        self.any(|op| matches!(op, Operation::Search(_)))
    }

    pub fn has_temp_table(&self) -> bool {
        self.any(|op| matches!(op, Operation::CreateTempTable(_)))
    }

    pub fn has_insert_entity(&self) -> bool {
        self.any(|op| matches!(op, Operation::InsertEntity(_)))
    }

    pub fn clear(&mut self) {
        self.ops.lock().unwrap().clear();
    }

    /// Remove and return the first operation from the log
    pub fn pop(&mut self) -> Option<(Operation, Response)> {
        let mut ops = self.ops.lock().unwrap();
        if ops.is_empty() {
            None
        } else {
            let op = ops.remove(0);
            Some((op.operation, op.response))
        }
    }
}

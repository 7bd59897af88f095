use rql_core::{
    async_trait,
    driver::{Operation, Response, Rows, Source, Support},
    schema::Schema,
    Result,
};
use std::sync::{Arc, Mutex};

/// A source wrapper recording every operation for assertions
#[derive(Debug)]
pub struct LoggingSource {
    inner: Box<dyn Source>,

    /// Log of all operations executed through this source
    ops_log: Arc<Mutex<Vec<SourceOp>>>,
}

impl LoggingSource {
    pub fn new(source: impl Source) -> Self {
        Self {
            inner: Box::new(source),
            ops_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get a handle to access the operations log
    pub fn ops_log_handle(&self) -> Arc<Mutex<Vec<SourceOp>>> {
        self.ops_log.clone()
    }
}

#[derive(Debug)]
pub struct SourceOp {
    pub operation: Operation,
    pub response: Response,
}

#[async_trait]
impl Source for LoggingSource {
    fn uri(&self) -> &str {
        self.inner.uri()
    }

    fn support(&self) -> &Support {
        self.inner.support()
    }

    async fn register_schema(&mut self, schema: &Arc<Schema>) -> Result<()> {
        self.inner.register_schema(schema).await
    }

    async fn exec(&self, operation: Operation) -> Result<Response> {
        let logged = operation.clone();
        let response = self.inner.exec(operation).await?;

        self.ops_log
            .lock()
            .expect("Failed to acquire ops log lock")
            .push(SourceOp {
                operation: logged,
                response: duplicate_response(&response),
            });

        Ok(response)
    }
}

fn duplicate_response(response: &Response) -> Response {
    let rows = match &response.rows {
        Rows::Count(count) => Rows::Count(*count),
        Rows::Values(rows) => Rows::Values(rows.clone()),
    };
    Response { rows }
}

//! Read-only scripts.

use tracing::debug;

use flow_types::{Result, Value};

use super::Services;

pub struct Scripts<'a> {
    services: &'a Services,
}

impl<'a> Scripts<'a> {
    pub(crate) fn new(services: &'a Services) -> Self {
        Self { services }
    }

    /// Execute `code` read from `location`. File and name imports are
    /// resolved against the project first.
    pub fn execute(&self, code: &[u8], arguments: &[Value], location: &str) -> Result<Value> {
        let code = self.services.resolve_imports(code, location)?;
        debug!(file = location, arguments = arguments.len(), "executing script");
        self.services.gateway().execute_script(&code, arguments)
    }

    /// Execute the script file at `path`.
    pub fn execute_file(&self, path: &str, arguments: &[Value]) -> Result<Value> {
        let code = self.services.read_file(path)?;
        self.execute(&code, arguments, path)
    }
}

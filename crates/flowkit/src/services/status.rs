//! Network reachability.

use flow_types::Result;

use super::Services;

pub struct Status<'a> {
    services: &'a Services,
}

impl<'a> Status<'a> {
    pub(crate) fn new(services: &'a Services) -> Self {
        Self { services }
    }

    /// Ping the gateway of the selected network.
    pub fn ping(&self) -> Result<()> {
        self.services.gateway().ping()
    }

    pub fn network(&self) -> &str {
        self.services.network()
    }
}

//! Collection queries.

use flow_types::{Collection, Identifier, Result};

use super::Services;

pub struct Collections<'a> {
    services: &'a Services,
}

impl<'a> Collections<'a> {
    pub(crate) fn new(services: &'a Services) -> Self {
        Self { services }
    }

    pub fn get(&self, id: &str) -> Result<Collection> {
        let id = Identifier::from_hex(id.trim())?;
        self.services.gateway().get_collection(&id)
    }
}

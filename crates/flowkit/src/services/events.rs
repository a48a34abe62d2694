//! Event queries.

use tracing::debug;

use flow_types::{BlockEvents, Error, Result};

use super::Services;

/// Blocks searched when no range is given.
pub const DEFAULT_LAST_BLOCKS: u64 = 10;

pub struct Events<'a> {
    services: &'a Services,
}

impl<'a> Events<'a> {
    pub(crate) fn new(services: &'a Services) -> Self {
        Self { services }
    }

    /// Events of `event_type` in the inclusive height range.
    pub fn get(&self, event_type: &str, start: u64, end: u64) -> Result<Vec<BlockEvents>> {
        if end < start {
            return Err(Error::InvalidArgument(format!(
                "end height {} is before start height {}",
                end, start
            )));
        }
        debug!(event_type, start, end, "fetching events");
        self.services.gateway().get_events(event_type, start, end)
    }

    /// Events of `event_type` in the last `last` blocks up to the latest one.
    pub fn get_last(&self, event_type: &str, last: u64) -> Result<Vec<BlockEvents>> {
        let latest = self.services.gateway().get_latest_block()?.height;
        self.get(event_type, latest.saturating_sub(last), latest)
    }
}

//! Block queries.

use std::str::FromStr;

use flow_types::{Block, BlockEvents, Collection, Error, Identifier, Result};

use super::Services;

/// `latest`, a block height or a block id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockQuery {
    Latest,
    Height(u64),
    Id(Identifier),
}

impl FromStr for BlockQuery {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "latest" {
            return Ok(BlockQuery::Latest);
        }
        if let Ok(height) = s.parse::<u64>() {
            return Ok(BlockQuery::Height(height));
        }
        Identifier::from_hex(s).map(BlockQuery::Id).map_err(|_| {
            Error::InvalidArgument(format!("{:?} is not latest, a block height or a block id", s))
        })
    }
}

/// A block with the events and collections that were asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockWithDetails {
    pub block: Block,
    pub events: Vec<BlockEvents>,
    pub collections: Vec<Collection>,
}

pub struct Blocks<'a> {
    services: &'a Services,
}

impl<'a> Blocks<'a> {
    pub(crate) fn new(services: &'a Services) -> Self {
        Self { services }
    }

    pub fn block(&self, query: BlockQuery) -> Result<Block> {
        let gateway = self.services.gateway();
        match query {
            BlockQuery::Latest => gateway.get_latest_block(),
            BlockQuery::Height(height) => gateway.get_block_by_height(height),
            BlockQuery::Id(id) => gateway.get_block_by_id(&id),
        }
    }

    /// The block plus events of each type in `event_types` and, with
    /// `include_collections`, its collections.
    pub fn get(&self, query: BlockQuery, event_types: &[String], include_collections: bool) -> Result<BlockWithDetails> {
        let block = self.block(query)?;
        let gateway = self.services.gateway();

        let mut events = Vec::new();
        for event_type in event_types {
            events.extend(gateway.get_events(event_type, block.height, block.height)?);
        }

        let collections = if include_collections {
            block
                .collection_guarantees
                .iter()
                .map(|id| gateway.get_collection(id))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(BlockWithDetails {
            block,
            events,
            collections,
        })
    }
}

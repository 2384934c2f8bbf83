//! # Block Module
//!
//! Block identifiers, the block registry and block face handling.
//!
//! Blocks are referred to by a compact numeric [`BlockId`] inside chunks. Id `0` is
//! always air; every other id is handed out by the [`BlockRegistry`] in
//! registration order. Generators resolve the names they need once, when they are
//! constructed, so an unknown block name is a startup error rather than a
//! per-chunk failure.

use std::collections::HashMap;

use crate::{
    config::BlockConfig,
    error::{EngineError, Result},
};

pub mod block_side;

/// The underlying integer type used to represent blocks in chunk storage.
pub type BlockId = u16;

/// Id of the air block. Uninitialised voxels are air.
pub const AIR: BlockId = 0;

/// Built-in block table used when the configuration does not provide one.
///
/// Maps each block name to its transparency flag. Registration follows the
/// table order, so `stone` is id 1 and `water` is id 2.
pub static DEFAULT_BLOCKS: phf::OrderedMap<&'static str, bool> = phf::phf_ordered_map! {
    "stone" => false,
    "water" => true,
    "grass" => false,
    "dirt" => false,
    "sand" => false,
    "gravel" => false,
    "coal_ore" => false,
    "iron_ore" => false,
    "ice" => true,
};

/// Static properties of a registered block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockProperties {
    pub name: String,
    /// Transparent blocks go into the transparent sub-mesh and do not hide
    /// neighbouring faces
    pub transparent: bool,
}

/// Name to id mapping for every block the world can contain.
///
/// The registry is built once at startup and then shared read-only with the
/// generator pipeline and the renderer.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    blocks: Vec<BlockProperties>,
    name_to_id: HashMap<String, BlockId>,
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockRegistry {
    /// Creates a registry containing only air.
    pub fn new() -> Self {
        let mut name_to_id = HashMap::new();
        name_to_id.insert("air".to_string(), AIR);
        Self {
            blocks: vec![BlockProperties {
                name: "air".to_string(),
                transparent: true,
            }],
            name_to_id,
        }
    }

    /// Creates a registry from the built-in [`DEFAULT_BLOCKS`] table.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (name, transparent) in DEFAULT_BLOCKS.entries() {
            registry.register(name, *transparent);
        }
        registry
    }

    /// Creates a registry from a configured block table, or the built-in table if
    /// `blocks` is empty.
    pub fn from_config(blocks: &[BlockConfig]) -> Result<Self> {
        if blocks.is_empty() {
            return Ok(Self::with_defaults());
        }
        let mut registry = Self::new();
        for block in blocks {
            if registry.name_to_id.contains_key(&block.name) {
                return Err(EngineError::invalid_config(
                    "blocks",
                    format!("block {} is registered twice", block.name),
                ));
            }
            registry.register(&block.name, block.transparent);
        }
        Ok(registry)
    }

    /// Registers a block and returns its id.
    ///
    /// Registering a name twice returns the id it already has.
    pub fn register(&mut self, name: &str, transparent: bool) -> BlockId {
        if let Some(id) = self.name_to_id.get(name) {
            return *id;
        }
        let id = self.blocks.len() as BlockId;
        self.blocks.push(BlockProperties {
            name: name.to_string(),
            transparent,
        });
        self.name_to_id.insert(name.to_string(), id);
        id
    }

    /// Looks up the id registered for `name`.
    ///
    /// # Returns
    /// The id, or [`EngineError::UnknownBlock`] if nothing was registered under that name
    pub fn id_for_name(&self, name: &str) -> Result<BlockId> {
        self.name_to_id
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownBlock {
                name: name.to_string(),
            })
    }

    pub fn properties(&self, id: BlockId) -> Option<&BlockProperties> {
        self.blocks.get(id as usize)
    }

    /// Returns `true` for air, transparent blocks and ids the registry does not know.
    pub fn is_transparent(&self, id: BlockId) -> bool {
        self.blocks
            .get(id as usize)
            .map_or(true, |block| block.transparent)
    }

    /// Number of registered blocks, air included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_order() {
        let registry = BlockRegistry::with_defaults();
        assert_eq!(registry.id_for_name("air").unwrap(), AIR);
        assert_eq!(registry.id_for_name("stone").unwrap(), 1);
        assert_eq!(registry.id_for_name("water").unwrap(), 2);
        assert_eq!(registry.len(), DEFAULT_BLOCKS.len() + 1);
    }

    #[test]
    fn test_unknown_block_is_an_error() {
        let registry = BlockRegistry::with_defaults();
        match registry.id_for_name("unobtainium") {
            Err(EngineError::UnknownBlock { name }) => assert_eq!(name, "unobtainium"),
            other => panic!("expected UnknownBlock, got {:?}", other),
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = BlockRegistry::new();
        let first = registry.register("stone", false);
        let second = registry.register("stone", true);
        assert_eq!(first, second);
        assert!(!registry.is_transparent(first));
    }

    #[test]
    fn test_transparency() {
        let registry = BlockRegistry::with_defaults();
        assert!(registry.is_transparent(AIR));
        assert!(registry.is_transparent(registry.id_for_name("water").unwrap()));
        assert!(!registry.is_transparent(registry.id_for_name("stone").unwrap()));
    }

    #[test]
    fn test_config_rejects_duplicates() {
        let blocks = vec![
            BlockConfig {
                name: "stone".to_string(),
                transparent: false,
            },
            BlockConfig {
                name: "stone".to_string(),
                transparent: false,
            },
        ];
        assert!(BlockRegistry::from_config(&blocks).is_err());
    }
}

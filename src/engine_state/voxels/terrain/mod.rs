//! # Terrain Generation
//!
//! Turns a chunk key into voxel content. Generation is a pure function of the
//! world seed, the chunk key and the registries held by the pipeline.
//!
//! ## Architecture
//!
//! * **Maps**: [`MapFragment`] (height and biome per column) and [`CaveMap`]
//!   (packed solid/air per column) are computed first for the chunk footprint
//! * **Generators**: [`Generator`] implementations run in priority order against
//!   the chunk, reading the maps; [`TerrainGenerator`] lays the base strata and
//!   [`OreGenerator`] places ore veins afterwards
//! * **Biomes**: each column's biome supplies the [`SurfaceStructure`] invoked at
//!   every surface transition
//! * **Pipeline**: [`GeneratorPipeline`] ties all of the above together and is
//!   shared with the generation workers

pub mod biome;
pub mod biome_map;
pub mod cave_map;
pub mod generator;
pub mod ore_generator;
pub mod pipeline;
pub mod terrain_generator;

pub use biome::{Biome, BiomeId, BiomeRegistry, LayeredStructure, NoStructure, StructureLayer, SurfaceStructure};
pub use biome_map::{FlatMapGenerator, MapColumn, MapFragment, MapGenerator, NoiseMapGenerator};
pub use cave_map::{CaveCarver, CaveMap};
pub use generator::{GenerationInput, Generator};
pub use ore_generator::{OreGenerator, OreVein};
pub use pipeline::GeneratorPipeline;
pub use terrain_generator::TerrainGenerator;

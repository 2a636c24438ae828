pub mod config;
pub mod error;
pub mod features;
pub mod generator;
pub mod geology;
pub mod hydrology;
pub mod mixing;
pub mod noise;
pub mod seed;
pub mod structures;
pub mod topography;
pub mod vegetation;

pub use config::{
    Biome, DevelopmentLevel, ElevationZone, GenerationParams, HydrologyConfig, HydrologyType,
    Season, TacticalMapContext, TopographyConfig, VegetationConfig,
};
pub use error::GenerationError;
pub use generator::{TacticalMapGenerationResult, generate};
pub use mixing::{Compatibility, MapFeature, apply_mixing, compatibility, interaction};
pub use seed::MapSeed;

// src/vegetation.rs
//! Растительность: кроны и плотность леса
//!
//! Плотность деревьев завязана на влажность из гидрологии, уклон и сезон.
//! Порог для каждого тайла сравнивается с шумом, поэтому рост множителя
//! плотности никогда не уменьшает итоговое число деревьев.

use serde::{Deserialize, Serialize};

use crate::config::{TacticalMapContext, VegetationConfig};
use crate::error::GenerationError;
use crate::hydrology::HydrologyMap;
use crate::noise::NoiseField;
use crate::seed::{MapSeed, layer};
use crate::topography::TopographyMap;

/// Карта растительности
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VegetationMap {
    pub width: usize,
    pub height: usize,
    /// Есть ли дерево на тайле
    pub canopy: Vec<bool>,
    /// Непрерывная плотность растительности, [0, 1]
    pub tree_density: Vec<f32>,
    pub tree_count: usize,
}

/// Генерирует слой растительности
pub fn generate_vegetation(
    topography: &TopographyMap,
    hydrology: &HydrologyMap,
    context: &TacticalMapContext,
    config: &VegetationConfig,
    seed: MapSeed,
) -> Result<VegetationMap, GenerationError> {
    let width = topography.width;
    let height = topography.height;
    let base = context.biome.base_tree_density();
    let season_modifier = context.season.canopy_modifier();
    let canopy_noise = NoiseField::new(seed.noise_seed(layer::VEGETATION), 0.2);

    let mut tree_density = vec![0.0; width * height];
    let mut canopy = vec![false; width * height];
    let mut tree_count = 0;

    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            // В воде деревья не растут
            if hydrology.is_stream[i] {
                continue;
            }
            let moisture_response = (0.4 + hydrology.moisture[i]).min(1.2);
            let slope_penalty = 1.0 - (topography.slope[i] / 60.0).min(1.0);
            let density =
                (base * moisture_response * slope_penalty * season_modifier * config.density)
                    .clamp(0.0, 1.0);
            tree_density[i] = density;

            if canopy_noise.sample01(x as f32, y as f32) < density {
                canopy[i] = true;
                tree_count += 1;
            }
        }
    }

    Ok(VegetationMap {
        width,
        height,
        canopy,
        tree_density,
        tree_count,
    })
}

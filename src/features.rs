// src/features.rs
//! Точечные особенности: опасности, ресурсы, ориентиры
//!
//! Последний слой конвейера. Читает готовые карты и расставляет точки:
//! камнепады под осыпными склонами, провалы над воронками, родниковую воду,
//! каменные выходы, строевой лес, вершины и входы в пещеры.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::geology::{GeologyMap, TerrainFeature};
use crate::hydrology::HydrologyMap;
use crate::seed::{MapSeed, layer};
use crate::topography::TopographyMap;
use crate::vegetation::VegetationMap;

/// Потолок точек одной категории на карте
const CATEGORY_CAP: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointFeatureKind {
    RockfallHazard,
    SinkholeCollapse,
    SpringWater,
    StoneOutcrop,
    TimberStand,
    Summit,
    CaveMouth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointFeatureCategory {
    Hazard,
    Resource,
    Landmark,
}

impl PointFeatureKind {
    #[must_use]
    pub fn category(self) -> PointFeatureCategory {
        match self {
            PointFeatureKind::RockfallHazard | PointFeatureKind::SinkholeCollapse => {
                PointFeatureCategory::Hazard
            }
            PointFeatureKind::SpringWater
            | PointFeatureKind::StoneOutcrop
            | PointFeatureKind::TimberStand => PointFeatureCategory::Resource,
            PointFeatureKind::Summit | PointFeatureKind::CaveMouth => {
                PointFeatureCategory::Landmark
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointFeature {
    pub kind: PointFeatureKind,
    pub x: usize,
    pub y: usize,
}

/// Карта точечных особенностей
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureMap {
    pub width: usize,
    pub height: usize,
    pub points: Vec<PointFeature>,
}

impl FeatureMap {
    #[must_use]
    pub fn count_of(&self, category: PointFeatureCategory) -> usize {
        self.points
            .iter()
            .filter(|p| p.kind.category() == category)
            .count()
    }
}

/// Генерирует слой точечных особенностей
pub fn generate_features(
    geology: &GeologyMap,
    topography: &TopographyMap,
    hydrology: &HydrologyMap,
    vegetation: &VegetationMap,
    seed: MapSeed,
) -> Result<FeatureMap, GenerationError> {
    let width = topography.width;
    let height = topography.height;
    let mut rng = ChaCha8Rng::seed_from_u64(seed.layer_seed(layer::FEATURES));
    let mut points = Vec::new();

    // Опасности: камнепад на крутой осыпи, провал над воронкой
    let mut hazards = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let tile = &geology.tiles[i];
            if topography.slope[i] > 35.0 && tile.terrain_features.contains(&TerrainFeature::Talus)
            {
                hazards.push(PointFeature {
                    kind: PointFeatureKind::RockfallHazard,
                    x,
                    y,
                });
            } else if tile.terrain_features.contains(&TerrainFeature::Sinkhole) {
                hazards.push(PointFeature {
                    kind: PointFeatureKind::SinkholeCollapse,
                    x,
                    y,
                });
            }
        }
    }
    points.extend(cap_category(hazards, &mut rng));

    // Ресурсы: вода родников, каменные выходы, строевой лес
    let mut resources: Vec<PointFeature> = hydrology
        .springs
        .iter()
        .map(|&(x, y)| PointFeature {
            kind: PointFeatureKind::SpringWater,
            x,
            y,
        })
        .collect();
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            if geology.tiles[i]
                .terrain_features
                .iter()
                .any(|f| f.is_bare_rock())
            {
                resources.push(PointFeature {
                    kind: PointFeatureKind::StoneOutcrop,
                    x,
                    y,
                });
            } else if vegetation.tree_density[i] > 0.8 {
                resources.push(PointFeature {
                    kind: PointFeatureKind::TimberStand,
                    x,
                    y,
                });
            }
        }
    }
    points.extend(cap_category(resources, &mut rng));

    // Ориентиры: локальные вершины и входы в пещеры
    let mut landmarks = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            if is_local_summit(topography, x, y) {
                landmarks.push(PointFeature {
                    kind: PointFeatureKind::Summit,
                    x,
                    y,
                });
            } else if geology.tiles[i]
                .terrain_features
                .contains(&TerrainFeature::Cave)
            {
                landmarks.push(PointFeature {
                    kind: PointFeatureKind::CaveMouth,
                    x,
                    y,
                });
            }
        }
    }
    points.extend(cap_category(landmarks, &mut rng));

    Ok(FeatureMap {
        width,
        height,
        points,
    })
}

/// Все 8 соседей строго ниже
fn is_local_summit(topography: &TopographyMap, x: usize, y: usize) -> bool {
    let own = topography.elevation_at(x, y);
    let mut has_neighbor = false;
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0
                || nx >= topography.width as i32
                || ny < 0
                || ny >= topography.height as i32
            {
                continue;
            }
            has_neighbor = true;
            if topography.elevation_at(nx as usize, ny as usize) >= own {
                return false;
            }
        }
    }
    has_neighbor
}

/// Детерминированно прореживает кандидатов до потолка категории
fn cap_category(mut candidates: Vec<PointFeature>, rng: &mut ChaCha8Rng) -> Vec<PointFeature> {
    while candidates.len() > CATEGORY_CAP {
        let victim = rng.gen_range(0..candidates.len());
        candidates.remove(victim);
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Biome, HydrologyConfig, TacticalMapContext, TopographyConfig, VegetationConfig,
    };
    use crate::geology::generate_geology;
    use crate::hydrology::generate_hydrology;
    use crate::topography::generate_topography;
    use crate::vegetation::generate_vegetation;

    fn build(seed: u64) -> FeatureMap {
        let context = TacticalMapContext {
            biome: Biome::Mountain,
            ..TacticalMapContext::default()
        };
        let map_seed = MapSeed::from_u64(seed);
        let geology = generate_geology(30, 30, &context, map_seed).unwrap();
        let topography = generate_topography(
            &geology,
            &context,
            &TopographyConfig { ruggedness: 2.0 },
            map_seed,
        )
        .unwrap();
        let hydrology = generate_hydrology(
            &geology,
            &topography,
            &context,
            &HydrologyConfig::default(),
            map_seed,
        )
        .unwrap();
        let vegetation = generate_vegetation(
            &topography,
            &hydrology,
            &context,
            &VegetationConfig::default(),
            map_seed,
        )
        .unwrap();
        generate_features(&geology, &topography, &hydrology, &vegetation, map_seed).unwrap()
    }

    #[test]
    fn categories_respect_cap() {
        let map = build(71);
        assert!(map.count_of(PointFeatureCategory::Hazard) <= CATEGORY_CAP);
        assert!(map.count_of(PointFeatureCategory::Resource) <= CATEGORY_CAP);
        assert!(map.count_of(PointFeatureCategory::Landmark) <= CATEGORY_CAP);
    }

    #[test]
    fn deterministic() {
        let a = build(72);
        let b = build(72);
        assert_eq!(a.points, b.points);
    }

    #[test]
    fn points_lie_inside_grid() {
        let map = build(73);
        for p in &map.points {
            assert!(p.x < map.width);
            assert!(p.y < map.height);
        }
    }
}

// src/structures.rs
//! Постройки: поселения, здания и дороги
//!
//! Уровень освоенности задаёт бюджет поселений (дикая местность — ноль).
//! Площадки под поселения оцениваются по плоскости, близости воды и почве;
//! дороги прокладываются жадным спуском к цели по наименьшему уклону.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::TacticalMapContext;
use crate::error::GenerationError;
use crate::geology::GeologyMap;
use crate::hydrology::HydrologyMap;
use crate::seed::{MapSeed, layer};
use crate::topography::TopographyMap;

/// Что стоит на тайле
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StructureKind {
    #[default]
    None,
    Building,
    Road,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub x: usize,
    pub y: usize,
}

/// Карта построек
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureMap {
    pub width: usize,
    pub height: usize,
    pub kind: Vec<StructureKind>,
    pub settlements: Vec<Settlement>,
}

impl StructureMap {
    #[must_use]
    pub fn building_count(&self) -> usize {
        self.kind
            .iter()
            .filter(|&&k| k == StructureKind::Building)
            .count()
    }
}

/// Генерирует слой построек
pub fn generate_structures(
    geology: &GeologyMap,
    topography: &TopographyMap,
    hydrology: &HydrologyMap,
    context: &TacticalMapContext,
    seed: MapSeed,
) -> Result<StructureMap, GenerationError> {
    let width = topography.width;
    let height = topography.height;
    let mut kind = vec![StructureKind::None; width * height];

    let budget = context.development_level.settlement_budget();
    if budget == 0 {
        return Ok(StructureMap {
            width,
            height,
            kind,
            settlements: Vec::new(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed.layer_seed(layer::STRUCTURES));
    let settlements = pick_settlements(geology, topography, hydrology, budget, width, height);

    // Здания кучкуются вокруг поселения
    let per_settlement = context.development_level.buildings_per_settlement();
    for settlement in &settlements {
        let mut placed = 0;
        let mut attempts = 0;
        while placed < per_settlement && attempts < per_settlement * 8 {
            attempts += 1;
            let dx = rng.gen_range(-3i32..=3);
            let dy = rng.gen_range(-3i32..=3);
            let nx = settlement.x as i32 + dx;
            let ny = settlement.y as i32 + dy;
            if nx < 0 || nx >= width as i32 || ny < 0 || ny >= height as i32 {
                continue;
            }
            let i = (ny as usize) * width + nx as usize;
            if kind[i] != StructureKind::None
                || hydrology.is_stream[i]
                || topography.slope[i] > 15.0
            {
                continue;
            }
            kind[i] = StructureKind::Building;
            placed += 1;
        }
    }

    // Дороги между соседними по списку поселениями
    for pair in settlements.windows(2) {
        lay_road(&mut kind, topography, pair[0], pair[1]);
    }

    Ok(StructureMap {
        width,
        height,
        kind,
        settlements,
    })
}

/// Оценка площадок: плоско, сухо, есть почва, вода недалеко
fn pick_settlements(
    geology: &GeologyMap,
    topography: &TopographyMap,
    hydrology: &HydrologyMap,
    budget: usize,
    width: usize,
    height: usize,
) -> Vec<Settlement> {
    let mut scored: Vec<(f32, usize, usize)> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            if hydrology.is_stream[i] || topography.slope[i] > 10.0 {
                continue;
            }
            if geology.tiles[i].soil_depth < 1.0 {
                continue;
            }
            let flatness = 10.0 - topography.slope[i];
            let water_bonus = if near_water(hydrology, x, y, 4) { 5.0 } else { 0.0 };
            scored.push((flatness + water_bonus, x, y));
        }
    }
    // Стабильный порядок: счёт по убыванию, затем индекс тайла
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| (a.2 * width + a.1).cmp(&(b.2 * width + b.1)))
    });

    let min_separation = (width.min(height) / 4).max(3);
    let mut settlements: Vec<Settlement> = Vec::new();
    for (_, x, y) in scored {
        if settlements.len() >= budget {
            break;
        }
        let far_enough = settlements.iter().all(|s| {
            let dx = s.x.abs_diff(x);
            let dy = s.y.abs_diff(y);
            dx.max(dy) >= min_separation
        });
        if far_enough {
            settlements.push(Settlement { x, y });
        }
    }
    settlements
}

fn near_water(hydrology: &HydrologyMap, x: usize, y: usize, radius: i32) -> bool {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx >= 0
                && nx < hydrology.width as i32
                && ny >= 0
                && ny < hydrology.height as i32
                && hydrology.is_stream[(ny as usize) * hydrology.width + nx as usize]
            {
                return true;
            }
        }
    }
    false
}

/// Жадная дорога: каждый шаг строго приближает к цели, из подходящих
/// соседей берётся самый пологий
fn lay_road(
    kind: &mut [StructureKind],
    topography: &TopographyMap,
    from: Settlement,
    to: Settlement,
) {
    let width = topography.width;
    let (mut x, mut y) = (from.x as i32, from.y as i32);
    let target = (to.x as i32, to.y as i32);

    while (x, y) != target {
        let current_dist = (target.0 - x).abs().max((target.1 - y).abs());
        let mut best: Option<(f32, i32, i32)> = None;
        for dy in -1i32..=1 {
            for dx in -1i32..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0
                    || nx >= width as i32
                    || ny < 0
                    || ny >= topography.height as i32
                {
                    continue;
                }
                let dist = (target.0 - nx).abs().max((target.1 - ny).abs());
                if dist >= current_dist {
                    continue;
                }
                let slope = topography.slope[(ny as usize) * width + nx as usize];
                if best.is_none_or(|(s, _, _)| slope < s) {
                    best = Some((slope, nx, ny));
                }
            }
        }
        let Some((_, nx, ny)) = best else { break };
        x = nx;
        y = ny;
        let i = (y as usize) * width + x as usize;
        if kind[i] == StructureKind::None {
            kind[i] = StructureKind::Road;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        Biome, DevelopmentLevel, HydrologyConfig, TacticalMapContext, TopographyConfig,
    };
    use crate::geology::generate_geology;
    use crate::hydrology::generate_hydrology;
    use crate::topography::generate_topography;

    fn setup(
        development_level: DevelopmentLevel,
        seed: u64,
    ) -> (GeologyMap, TopographyMap, HydrologyMap, TacticalMapContext) {
        let context = TacticalMapContext {
            biome: Biome::Grassland,
            development_level,
            ..TacticalMapContext::default()
        };
        let map_seed = MapSeed::from_u64(seed);
        let geology = generate_geology(40, 40, &context, map_seed).unwrap();
        let topography = generate_topography(
            &geology,
            &context,
            &TopographyConfig { ruggedness: 0.5 },
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
        (geology, topography, hydrology, context)
    }

    #[test]
    fn wilderness_has_no_structures() {
        let (geology, topography, hydrology, context) = setup(DevelopmentLevel::Wilderness, 61);
        let map = generate_structures(
            &geology,
            &topography,
            &hydrology,
            &context,
            MapSeed::from_u64(61),
        )
        .unwrap();
        assert!(map.settlements.is_empty());
        assert!(map.kind.iter().all(|&k| k == StructureKind::None));
    }

    #[test]
    fn settled_map_respects_budget() {
        let (geology, topography, hydrology, context) = setup(DevelopmentLevel::Settled, 62);
        let map = generate_structures(
            &geology,
            &topography,
            &hydrology,
            &context,
            MapSeed::from_u64(62),
        )
        .unwrap();
        assert!(map.settlements.len() <= context.development_level.settlement_budget());
    }

    #[test]
    fn deterministic() {
        let (geology, topography, hydrology, context) = setup(DevelopmentLevel::Rural, 63);
        let seed = MapSeed::from_u64(63);
        let a = generate_structures(&geology, &topography, &hydrology, &context, seed).unwrap();
        let b = generate_structures(&geology, &topography, &hydrology, &context, seed).unwrap();
        assert_eq!(a.settlements, b.settlements);
        assert_eq!(a.kind, b.kind);
    }

    #[test]
    fn road_connects_two_settlements() {
        let topography = TopographyMap {
            width: 10,
            height: 10,
            elevation: vec![0.0; 100],
            slope: vec![0.0; 100],
        };
        let mut kind = vec![StructureKind::None; 100];
        lay_road(
            &mut kind,
            &topography,
            Settlement { x: 1, y: 1 },
            Settlement { x: 8, y: 8 },
        );
        let road_tiles = kind.iter().filter(|&&k| k == StructureKind::Road).count();
        assert!(road_tiles >= 7);
    }
}

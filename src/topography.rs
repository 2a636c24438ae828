// src/topography.rs
//! Рельеф: высоты и уклоны
//!
//! Высота каждого тайла — сумма трёх независимо посеянных шумовых слоёв:
//! - макро (очень низкая частота): на каком участке большого ландшафта
//!   лежит карта;
//! - тактический (холмы, гребни, западины): его вес растёт с изрезанностью;
//! - текстурный (мелкая форма конкретной породы).
//!
//! Поверх суммы — научная модель эрозии (восприимчивость по породе, уклону,
//! трещиноватости, климату и возрасту рельефа), скульптурные формы пород и
//! переменное сглаживание. Всё детерминировано по сиду.

use image::{ImageBuffer, Luma};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{TILE_SIZE_FT, TacticalMapContext, TopographyConfig};
use crate::error::GenerationError;
use crate::geology::{GeologicalFormation, GeologyMap, TerrainFeature};
use crate::noise::NoiseField;
use crate::seed::{MapSeed, layer};

/// Доля физического размера карты, отводимая под перепад высот
const RELIEF_RATIO: f32 = 0.15;
/// Доля рельефа, которую может снять эрозия
const EROSION_SCALE: f32 = 0.2;

/// Карта рельефа: высоты в футах (≥ 0) и уклоны в градусах [0, 90]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopographyMap {
    pub width: usize,
    pub height: usize,
    pub elevation: Vec<f32>,
    pub slope: Vec<f32>,
}

impl TopographyMap {
    #[must_use]
    pub fn elevation_at(&self, x: usize, y: usize) -> f32 {
        self.elevation[y * self.width + x]
    }

    #[must_use]
    pub fn slope_at(&self, x: usize, y: usize) -> f32 {
        self.slope[y * self.width + x]
    }

    #[must_use]
    pub fn min_elevation(&self) -> f32 {
        self.elevation.iter().fold(f32::INFINITY, |a, &b| a.min(b))
    }

    #[must_use]
    pub fn max_elevation(&self) -> f32 {
        self.elevation
            .iter()
            .fold(f32::NEG_INFINITY, |a, &b| a.max(b))
    }

    #[must_use]
    pub fn mean_slope(&self) -> f32 {
        self.slope.iter().sum::<f32>() / self.slope.len() as f32
    }

    pub fn save_as_png(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let max = self.max_elevation().max(1.0);
        let pixels: Vec<u8> = self
            .elevation
            .par_iter()
            .map(|&v| ((v / max).clamp(0.0, 1.0) * 255.0) as u8)
            .collect();
        let img: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_raw(self.width as u32, self.height as u32, pixels)
                .ok_or("Failed to create image buffer")?;
        img.save(path)?;
        Ok(())
    }
}

/// Генерирует слой рельефа поверх геологии
pub fn generate_topography(
    geology: &GeologyMap,
    context: &TacticalMapContext,
    config: &TopographyConfig,
    seed: MapSeed,
) -> Result<TopographyMap, GenerationError> {
    let width = geology.width;
    let height = geology.height;
    let rug = config.ruggedness;
    // Нормированная изрезанность: 0.5 → 0.0, 2.0 → 1.0
    let t = (rug - 0.5) / 1.5;

    // === 1. Три шумовых слоя ===
    let macro_field = NoiseField::fractal(seed.noise_seed(layer::TOPOGRAPHY), 1.0 / 750.0, 2, 0.6);

    let tactical_span = lerp(80.0, 20.0, t);
    let tactical_octaves = 1 + (3.0 * t).round() as i32;
    let tactical_field = NoiseField::fractal(
        seed.layer_seed(layer::TOPOGRAPHY).wrapping_add(1_000_000) as i32,
        1.0 / tactical_span,
        tactical_octaves,
        0.5,
    );

    let texture_field = NoiseField::fractal(
        seed.layer_seed(layer::TOPOGRAPHY).wrapping_add(2_000_000) as i32,
        0.25,
        2,
        0.5,
    );

    // Доли: с ростом изрезанности макрослой уступает тактическому
    let macro_weight = lerp(0.7, 0.3, t);
    let tactical_weight = lerp(0.15, 0.55, t);

    let relief = width.max(height) as f32
        * TILE_SIZE_FT
        * RELIEF_RATIO
        * context.elevation_zone.relief_multiplier()
        * (0.4 + 0.6 * rug);

    let mut elevation: Vec<f32> = (0..width * height)
        .into_par_iter()
        .map(|i| {
            let x = (i % width) as f32;
            let y = (i / width) as f32;
            let formation = geology.tiles[i].formation;
            let texture_weight = 0.15 * formation.texture_intensity() * rug;

            let combined = macro_field.sample(x, y) * macro_weight
                + tactical_field.sample(x, y) * tactical_weight
                + texture_field.sample(x, y) * texture_weight;

            ((combined + 1.0) * 0.5).clamp(0.0, 1.0) * relief
        })
        .collect();

    // === 2. Эрозия по восприимчивости ===
    let pre_slope = compute_slopes(&elevation, width, height);
    let susceptibility = erosion_susceptibility(geology, &pre_slope, context, rug);
    let erosion_noise = NoiseField::new(
        seed.layer_seed(layer::TOPOGRAPHY).wrapping_add(3_000_000) as i32,
        0.1,
    );
    for i in 0..elevation.len() {
        let x = (i % width) as f32;
        let y = (i / width) as f32;
        // Локальная вариация 0.7–1.3
        let variation = 0.7 + 0.6 * erosion_noise.sample01(x, y);
        let depth = susceptibility[i] * variation * relief * EROSION_SCALE;
        elevation[i] = (elevation[i] - depth).max(0.0);
    }

    // === 3. Скульптурные формы пород ===
    apply_geological_features(&mut elevation, geology, relief, seed);

    // === 4. Переменное сглаживание ===
    variable_smoothing(&mut elevation, &susceptibility, width, height, rug);

    // === 5. Финальный уклон ===
    let slope = compute_slopes(&elevation, width, height);

    Ok(TopographyMap {
        width,
        height,
        elevation,
        slope,
    })
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Восприимчивость к эрозии, [0, 1] на тайл
///
/// Веса: 30% мягкость породы, 20% уклон (с плато на крутых углах),
/// 20% трещиноватость, 15% климатическая влажность, 15% возраст рельефа
/// (низкая изрезанность = старый рельеф = эрозия работала дольше).
fn erosion_susceptibility(
    geology: &GeologyMap,
    slope: &[f32],
    context: &TacticalMapContext,
    ruggedness: f32,
) -> Vec<f32> {
    let wetness = context.hydrology_type.wetness();
    let age_term = ((2.0 - ruggedness) / 1.5).clamp(0.0, 1.0);

    geology
        .tiles
        .iter()
        .zip(slope)
        .map(|(tile, &s)| {
            let softness = 1.0 - tile.formation.erosion_resistance();
            let slope_factor = (s / 45.0).min(1.0);
            let fracture = (tile.fracture_intensity * 3.0).clamp(0.0, 1.0);
            (0.30 * softness
                + 0.20 * slope_factor
                + 0.20 * fracture
                + 0.15 * wetness
                + 0.15 * age_term)
                .clamp(0.0, 1.0)
        })
        .collect()
}

/// Скульптура, специфичная для породы, после общей эрозии.
/// Пороги 0.65 / 0.7 / 0.8 исторические, сохранены как есть.
fn apply_geological_features(
    elevation: &mut [f32],
    geology: &GeologyMap,
    relief: f32,
    seed: MapSeed,
) {
    let width = geology.width;
    let height = geology.height;
    let sculpt_noise = NoiseField::new(
        seed.layer_seed(layer::TOPOGRAPHY).wrapping_add(4_000_000) as i32,
        0.35,
    );
    let relief = relief.max(f32::EPSILON);
    let mut carved = elevation.to_vec();

    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let tile = &geology.tiles[i];
            let n01 = sculpt_noise.sample01(x as f32, y as f32);
            let elev01 = elevation[i] / relief;
            let fracture = (tile.fracture_intensity * 3.0).clamp(0.0, 1.0);

            match tile.formation {
                GeologicalFormation::Carbonate => {
                    // Борозды растворения
                    if n01 > 0.8 {
                        carved[i] -= relief * 0.02;
                    }
                    // Воронка: радиальное понижение в окрестности 5×5
                    if tile.terrain_features.contains(&TerrainFeature::Sinkhole) {
                        for dy in -2i32..=2 {
                            for dx in -2i32..=2 {
                                let nx = x as i32 + dx;
                                let ny = y as i32 + dy;
                                if nx < 0 || nx >= width as i32 || ny < 0 || ny >= height as i32 {
                                    continue;
                                }
                                let dist = ((dx * dx + dy * dy) as f32).sqrt();
                                let drop = relief * 0.05 * (1.0 - dist / 3.0).max(0.0);
                                carved[(ny as usize) * width + nx as usize] -= drop;
                            }
                        }
                    }
                }
                GeologicalFormation::Granitic => {
                    if elev01 > 0.7 && fracture > 0.65 {
                        // Острые иглы на трещиноватых вершинах
                        carved[i] += relief * 0.04 * n01;
                    } else if elev01 < 0.35 && fracture < 0.65 {
                        // Купольное сглаживание понизу
                        carved[i] = neighborhood_mean(elevation, width, height, x, y);
                    }
                }
                GeologicalFormation::Clastic => {
                    // Овражный бедленд на самых мягких пачках
                    if tile.formation.erosion_resistance() < 0.35 && n01 > 0.7 {
                        carved[i] -= relief * 0.03;
                    }
                }
                GeologicalFormation::Metamorphic => {
                    // Пилообразные гребни сланцеватости
                    if n01 > 0.65 {
                        carved[i] += relief * 0.015;
                    } else if n01 < 0.35 {
                        carved[i] -= relief * 0.015;
                    }
                }
                GeologicalFormation::Volcanic | GeologicalFormation::Evaporite => {}
            }
        }
    }

    for (dst, v) in elevation.iter_mut().zip(carved) {
        *dst = v.max(0.0);
    }
}

fn neighborhood_mean(elevation: &[f32], width: usize, height: usize, x: usize, y: usize) -> f32 {
    let mut sum = elevation[y * width + x];
    let mut count = 1.0;
    for &(dx, dy) in &[(0i32, 1i32), (1, 0), (0, -1), (-1, 0)] {
        let nx = x as i32 + dx;
        let ny = y as i32 + dy;
        if nx >= 0 && nx < width as i32 && ny >= 0 && ny < height as i32 {
            sum += elevation[(ny as usize) * width + nx as usize];
            count += 1.0;
        }
    }
    sum / count
}

/// Переменное сглаживание: число проходов на тайл пропорционально
/// восприимчивости к эрозии. Долины получают +1 проход, гребни −1.
/// При изрезанности ≥ 2.0 сглаживание выключено полностью.
fn variable_smoothing(
    elevation: &mut Vec<f32>,
    susceptibility: &[f32],
    width: usize,
    height: usize,
    ruggedness: f32,
) {
    let max_passes = (6.0 - 3.0 * ruggedness).round().max(0.0) as usize;
    if max_passes == 0 {
        return;
    }

    // Требуемые проходы считаются один раз, по исходной поверхности
    let mut required = vec![0usize; elevation.len()];
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let mut passes = (susceptibility[i] * max_passes as f32).floor() as isize;

            let (higher, lower, total) = neighbor_relation(elevation, width, height, x, y);
            let threshold = (total as f32 * 0.6).ceil() as usize;
            if higher >= threshold {
                passes += 1; // долина
            } else if lower >= threshold {
                passes -= 1; // гребень
            }
            required[i] = passes.max(0) as usize;
        }
    }

    // Двойная буферизация: проход читает только предыдущее состояние сетки.
    // Проход k трогает лишь тайлы, которым нужно не меньше k проходов.
    for pass in 1..=max_passes {
        let previous = elevation.clone();
        for y in 0..height {
            for x in 0..width {
                let i = y * width + x;
                if required[i] >= pass {
                    elevation[i] = box_blur_at(&previous, width, height, x, y);
                }
            }
        }
    }
}

/// Сколько из существующих 8 соседей выше/ниже данного тайла
fn neighbor_relation(
    elevation: &[f32],
    width: usize,
    height: usize,
    x: usize,
    y: usize,
) -> (usize, usize, usize) {
    let own = elevation[y * width + x];
    let mut higher = 0;
    let mut lower = 0;
    let mut total = 0;
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || nx >= width as i32 || ny < 0 || ny >= height as i32 {
                continue;
            }
            total += 1;
            let other = elevation[(ny as usize) * width + nx as usize];
            if other > own {
                higher += 1;
            } else if other < own {
                lower += 1;
            }
        }
    }
    (higher, lower, total)
}

fn box_blur_at(elevation: &[f32], width: usize, height: usize, x: usize, y: usize) -> f32 {
    let mut sum = 0.0;
    let mut count = 0.0;
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx >= 0 && nx < width as i32 && ny >= 0 && ny < height as i32 {
                sum += elevation[(ny as usize) * width + nx as usize];
                count += 1.0;
            }
        }
    }
    sum / count
}

/// Уклон в градусах: арктангенс модуля градиента по 4 ортогональным
/// соседям, шаг сетки 5 футов
fn compute_slopes(elevation: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut slope = vec![0.0; elevation.len()];
    for y in 0..height {
        for x in 0..width {
            let at = |xx: usize, yy: usize| elevation[yy * width + xx];
            let (left, right, span_x) = if x == 0 {
                (at(0, y), at(1, y), TILE_SIZE_FT)
            } else if x == width - 1 {
                (at(x - 1, y), at(x, y), TILE_SIZE_FT)
            } else {
                (at(x - 1, y), at(x + 1, y), 2.0 * TILE_SIZE_FT)
            };
            let (top, bottom, span_y) = if y == 0 {
                (at(x, 0), at(x, 1), TILE_SIZE_FT)
            } else if y == height - 1 {
                (at(x, y - 1), at(x, y), TILE_SIZE_FT)
            } else {
                (at(x, y - 1), at(x, y + 1), 2.0 * TILE_SIZE_FT)
            };
            let gx = (right - left) / span_x;
            let gy = (bottom - top) / span_y;
            slope[y * width + x] = (gx * gx + gy * gy).sqrt().atan().to_degrees();
        }
    }
    slope
}

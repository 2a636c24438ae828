// src/geology.rs
//! Геологический фундамент карты
//!
//! Первый слой конвейера. Выбирает формации под биом, рисует узор коренных
//! пород, выветривает их в поверхностные формы, считает глубину почвы и
//! запоминает зоны контакта формаций (там позже появятся родники).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{Biome, TacticalMapContext, validate_dimensions};
use crate::error::GenerationError;
use crate::noise::NoiseField;
use crate::seed::{MapSeed, layer};

/// Ориентация напластования: задаёт направленный член в узоре пород
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeddingOrientation {
    Horizontal,
    Vertical,
    Folded,
}

/// Порода-формация с полностью табличными свойствами
///
/// Поведение задаётся исчерпывающими `match`-таблицами, без динамической
/// диспетчеризации.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeologicalFormation {
    Carbonate,
    Volcanic,
    Granitic,
    Clastic,
    Metamorphic,
    Evaporite,
}

impl GeologicalFormation {
    /// Сопротивление эрозии, [0, 1]
    #[must_use]
    pub fn erosion_resistance(self) -> f32 {
        match self {
            GeologicalFormation::Granitic => 0.85,
            GeologicalFormation::Metamorphic => 0.75,
            GeologicalFormation::Volcanic => 0.70,
            GeologicalFormation::Carbonate => 0.45,
            GeologicalFormation::Clastic => 0.30,
            GeologicalFormation::Evaporite => 0.15,
        }
    }

    /// Среднее расстояние между трещинами, футы
    #[must_use]
    pub fn joint_spacing(self) -> f32 {
        match self {
            GeologicalFormation::Granitic => 8.0,
            GeologicalFormation::Evaporite => 6.0,
            GeologicalFormation::Clastic => 5.0,
            GeologicalFormation::Metamorphic => 4.0,
            GeologicalFormation::Carbonate => 3.0,
            GeologicalFormation::Volcanic => 2.0,
        }
    }

    /// Водопроницаемость, [0, 1]
    #[must_use]
    pub fn permeability(self) -> f32 {
        match self {
            GeologicalFormation::Carbonate => 0.8,
            GeologicalFormation::Evaporite => 0.7,
            GeologicalFormation::Clastic => 0.6,
            GeologicalFormation::Volcanic => 0.5,
            GeologicalFormation::Granitic => 0.2,
            GeologicalFormation::Metamorphic => 0.15,
        }
    }

    #[must_use]
    pub fn bedding(self) -> BeddingOrientation {
        match self {
            GeologicalFormation::Carbonate
            | GeologicalFormation::Clastic
            | GeologicalFormation::Evaporite => BeddingOrientation::Horizontal,
            GeologicalFormation::Granitic | GeologicalFormation::Volcanic => {
                BeddingOrientation::Vertical
            }
            GeologicalFormation::Metamorphic => BeddingOrientation::Folded,
        }
    }

    /// Может ли формация питать родники на контакте с водоупором
    #[must_use]
    pub fn can_host_springs(self) -> bool {
        self.permeability() >= 0.5
    }

    /// Базовая интенсивность текстурного шума рельефа:
    /// карст и столбчатый базальт дают самую резкую мелкую форму
    #[must_use]
    pub fn texture_intensity(self) -> f32 {
        match self {
            GeologicalFormation::Carbonate => 1.0,
            GeologicalFormation::Volcanic => 0.95,
            GeologicalFormation::Granitic => 0.70,
            GeologicalFormation::Metamorphic => 0.65,
            GeologicalFormation::Clastic => 0.50,
            GeologicalFormation::Evaporite => 0.30,
        }
    }

    /// Продукты выветривания данной породы
    #[must_use]
    pub fn weathering_products(self) -> &'static [TerrainFeature] {
        use TerrainFeature::*;
        match self {
            GeologicalFormation::Carbonate => &[Tower, Ledge, Sinkhole, Cave, Talus],
            GeologicalFormation::Volcanic => &[Column, Ledge, Cave, Talus],
            GeologicalFormation::Granitic => &[Dome, Corestone, GrusApron, Talus],
            GeologicalFormation::Clastic => &[Fin, Hoodoo, Ravine, Talus],
            GeologicalFormation::Metamorphic => &[Fin, Ledge, Ravine, Talus],
            GeologicalFormation::Evaporite => &[Hoodoo, Sinkhole, Cave],
        }
    }

    /// Цвет для отладочного превью
    #[must_use]
    pub fn to_rgb(self) -> [u8; 3] {
        match self {
            GeologicalFormation::Carbonate => [210, 200, 170],
            GeologicalFormation::Volcanic => [70, 60, 60],
            GeologicalFormation::Granitic => [180, 160, 160],
            GeologicalFormation::Clastic => [190, 150, 110],
            GeologicalFormation::Metamorphic => [130, 130, 150],
            GeologicalFormation::Evaporite => [230, 225, 200],
        }
    }
}

/// Полоса интенсивности выветривания, в которой появляется форма
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatheringBand {
    /// Крупная положительная форма (башня, купол, столб, гребень)
    MajorRelief,
    /// Средняя форма (глыба-ядро, худу, карниз)
    Intermediate,
    /// Отрицательная форма (воронка, пещера, промоина, грусовая ложбина)
    Depression,
    /// Осыпной шлейф
    Debris,
}

/// Поверхностная форма рельефа, продукт выветривания
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainFeature {
    Tower,
    Dome,
    Column,
    Fin,
    Corestone,
    Hoodoo,
    Ledge,
    Sinkhole,
    Cave,
    Ravine,
    Talus,
    /// Ложбина разложившегося гранита (грус)
    GrusApron,
}

impl TerrainFeature {
    #[must_use]
    pub fn band(self) -> WeatheringBand {
        use TerrainFeature::*;
        match self {
            Tower | Dome | Column | Fin => WeatheringBand::MajorRelief,
            Corestone | Hoodoo | Ledge => WeatheringBand::Intermediate,
            Sinkhole | Cave | Ravine | GrusApron => WeatheringBand::Depression,
            Talus => WeatheringBand::Debris,
        }
    }

    /// Голая скала: почва на таких формах практически отсутствует
    #[must_use]
    pub fn is_bare_rock(self) -> bool {
        matches!(self, TerrainFeature::Dome | TerrainFeature::Tower)
    }
}

/// Один тайл геологической карты
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeologyTile {
    pub formation: GeologicalFormation,
    /// Глубина почвы, футы
    pub soil_depth: f32,
    pub permeability: f32,
    pub terrain_features: Vec<TerrainFeature>,
    /// 1 / (расстояние между трещинами + 1)
    pub fracture_intensity: f32,
}

/// Геологическая карта: построчная сетка `height × width`, (0,0) — левый верх
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeologyMap {
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<GeologyTile>,
    pub primary: GeologicalFormation,
    pub secondary: Option<GeologicalFormation>,
    /// Точки контакта разных формаций (кандидаты на родники)
    pub transitions: Vec<(usize, usize)>,
}

impl GeologyMap {
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> &GeologyTile {
        &self.tiles[y * self.width + x]
    }

    pub fn save_as_png(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let pixels: Vec<u8> = self
            .tiles
            .iter()
            .flat_map(|t| t.formation.to_rgb())
            .collect();
        let img: image::ImageBuffer<image::Rgb<u8>, Vec<u8>> =
            image::ImageBuffer::from_raw(self.width as u32, self.height as u32, pixels)
                .ok_or("Failed to create image buffer")?;
        img.save(path)?;
        Ok(())
    }
}

/// Формации-кандидаты для биома
#[must_use]
pub fn formations_for_biome(biome: Biome) -> &'static [GeologicalFormation] {
    use GeologicalFormation::*;
    match biome {
        Biome::Forest => &[Granitic, Metamorphic, Clastic, Carbonate],
        Biome::Grassland => &[Clastic, Carbonate, Evaporite],
        Biome::Desert => &[Clastic, Evaporite, Volcanic, Carbonate],
        Biome::Mountain => &[Granitic, Metamorphic, Volcanic],
        Biome::Swamp => &[Clastic, Carbonate],
        Biome::Tundra => &[Metamorphic, Granitic, Clastic],
    }
}

/// Генерирует геологический слой
pub fn generate_geology(
    width: usize,
    height: usize,
    context: &TacticalMapContext,
    seed: MapSeed,
) -> Result<GeologyMap, GenerationError> {
    validate_dimensions(width, height)?;

    // 1. Выбор формаций: основная всегда, вторая с вероятностью 30%
    let candidates = formations_for_biome(context.biome);
    let mut rng = ChaCha8Rng::seed_from_u64(seed.layer_seed(layer::GEOLOGY));
    let primary_idx = rng.gen_range(0..candidates.len());
    let primary = candidates[primary_idx];
    let secondary = if rng.gen_bool(0.3) {
        Some(candidates[(primary_idx + 1) % candidates.len()])
    } else {
        None
    };

    let bedrock_noise = NoiseField::new(seed.noise_seed(layer::GEOLOGY), 0.02);
    let weathering_noise = NoiseField::new(
        seed.layer_seed(layer::GEOLOGY).wrapping_add(1_000_000) as i32,
        0.06,
    );
    let soil_noise = NoiseField::new(
        seed.layer_seed(layer::GEOLOGY).wrapping_add(2_000_000) as i32,
        0.08,
    );

    let mut tiles = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let formation = pick_formation(primary, secondary, &bedrock_noise, x, y);
            let terrain_features =
                weather_tile(formation, weathering_noise.sample(x as f32, y as f32));
            let soil_depth = soil_depth_for(
                soil_noise.sample01(x as f32, y as f32),
                &terrain_features,
            );
            tiles.push(GeologyTile {
                formation,
                soil_depth,
                permeability: formation.permeability(),
                terrain_features,
                fracture_intensity: 1.0 / (formation.joint_spacing() + 1.0),
            });
        }
    }

    // 5. Зоны контакта: тайл, у которого в 4-окрестности другая формация
    let mut transitions = Vec::new();
    for y in 0..height {
        for x in 0..width {
            let own = tiles[y * width + x].formation;
            let differs = [(0i32, 1i32), (1, 0), (0, -1), (-1, 0)].iter().any(|&(dx, dy)| {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                nx >= 0
                    && nx < width as i32
                    && ny >= 0
                    && ny < height as i32
                    && tiles[(ny as usize) * width + nx as usize].formation != own
            });
            if differs {
                transitions.push((x, y));
            }
        }
    }

    Ok(GeologyMap {
        width,
        height,
        tiles,
        primary,
        secondary,
        transitions,
    })
}

/// 2. Узор коренных пород: низкочастотный шум плюс направленный член
/// напластования против нулевого порога
fn pick_formation(
    primary: GeologicalFormation,
    secondary: Option<GeologicalFormation>,
    noise: &NoiseField,
    x: usize,
    y: usize,
) -> GeologicalFormation {
    let Some(secondary) = secondary else {
        return primary;
    };
    let bias = match primary.bedding() {
        BeddingOrientation::Horizontal => 0.0,
        BeddingOrientation::Vertical => (x as f32 * 0.3).sin() * 0.4,
        BeddingOrientation::Folded => (x as f32 * y as f32 * 0.01).sin() * 0.4,
    };
    if noise.sample(x as f32, y as f32) + bias >= 0.0 {
        primary
    } else {
        secondary
    }
}

/// 3. Выветривание: интенсивность в [-1, 1] выбирает полосу продуктов.
/// Пороги 0.7 / 0.4 / -0.5 / 0.2 исторические, менять нельзя.
fn weather_tile(formation: GeologicalFormation, intensity: f32) -> Vec<TerrainFeature> {
    let products = formation.weathering_products();
    let first_in_band = |band: WeatheringBand| products.iter().copied().find(|f| f.band() == band);

    let mut features = Vec::new();
    if intensity > 0.7 {
        if let Some(f) = first_in_band(WeatheringBand::MajorRelief) {
            features.push(f);
        }
    } else if intensity > 0.4 {
        if let Some(f) = first_in_band(WeatheringBand::Intermediate) {
            features.push(f);
        }
    }
    if intensity < -0.5 {
        if let Some(f) = first_in_band(WeatheringBand::Depression) {
            features.push(f);
        }
    }
    // Осыпь добавляется независимо от основной полосы
    if intensity > 0.2 {
        if let Some(f) = first_in_band(WeatheringBand::Debris) {
            features.push(f);
        }
    }
    features
}

/// 4. Глубина почвы: база 1–3 фута из шума, поправки от форм рельефа
fn soil_depth_for(noise01: f32, features: &[TerrainFeature]) -> f32 {
    let mut depth = 1.0 + noise01 * 2.0;
    if features.contains(&TerrainFeature::GrusApron) {
        depth += 3.0;
    }
    if features.contains(&TerrainFeature::Talus) {
        depth += 2.0;
    }
    if features.contains(&TerrainFeature::Sinkhole) {
        depth += 5.0;
    }
    if features.iter().any(|f| f.is_bare_rock()) {
        depth = 0.5;
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TacticalMapContext;

    fn forest_context() -> TacticalMapContext {
        TacticalMapContext {
            biome: Biome::Forest,
            ..TacticalMapContext::default()
        }
    }

    #[test]
    fn rejects_bad_dimensions() {
        let ctx = forest_context();
        let seed = MapSeed::from_u64(1);
        assert!(generate_geology(9, 30, &ctx, seed).is_err());
        assert!(generate_geology(30, 201, &ctx, seed).is_err());
    }

    #[test]
    fn grid_is_fully_populated() {
        let map = generate_geology(20, 15, &forest_context(), MapSeed::from_u64(42)).unwrap();
        assert_eq!(map.tiles.len(), 20 * 15);
        for tile in &map.tiles {
            assert!(tile.soil_depth > 0.0);
            assert!(tile.fracture_intensity > 0.0);
        }
    }

    #[test]
    fn deterministic_for_same_seed() {
        let ctx = forest_context();
        let a = generate_geology(25, 25, &ctx, MapSeed::from_u64(7)).unwrap();
        let b = generate_geology(25, 25, &ctx, MapSeed::from_u64(7)).unwrap();
        assert_eq!(a.primary, b.primary);
        assert_eq!(a.secondary, b.secondary);
        for (ta, tb) in a.tiles.iter().zip(&b.tiles) {
            assert_eq!(ta.formation, tb.formation);
            assert_eq!(ta.soil_depth, tb.soil_depth);
            assert_eq!(ta.terrain_features, tb.terrain_features);
        }
    }

    #[test]
    fn primary_formation_comes_from_biome_list() {
        for seed in 0..20u64 {
            let map =
                generate_geology(12, 12, &forest_context(), MapSeed::from_u64(seed)).unwrap();
            assert!(formations_for_biome(Biome::Forest).contains(&map.primary));
        }
    }

    #[test]
    fn bare_rock_forces_thin_soil() {
        let depth = soil_depth_for(0.9, &[TerrainFeature::Dome, TerrainFeature::Talus]);
        assert_eq!(depth, 0.5);
    }

    #[test]
    fn weathering_bands_respect_product_list() {
        // У эвапоритов нет крупной положительной формы: полоса > 0.7 пустует
        let high = weather_tile(GeologicalFormation::Evaporite, 0.9);
        assert!(high.iter().all(|f| f.band() != WeatheringBand::MajorRelief));

        let tower = weather_tile(GeologicalFormation::Carbonate, 0.9);
        assert!(tower.contains(&TerrainFeature::Tower));
        assert!(tower.contains(&TerrainFeature::Talus));

        let sink = weather_tile(GeologicalFormation::Carbonate, -0.8);
        assert_eq!(sink, vec![TerrainFeature::Sinkhole]);
    }

    #[test]
    fn transition_zones_only_with_secondary() {
        // Сиды без второй формации дают пустой список контактов
        for seed in 0..30u64 {
            let map =
                generate_geology(16, 16, &forest_context(), MapSeed::from_u64(seed)).unwrap();
            if map.secondary.is_none() {
                assert!(map.transitions.is_empty());
            }
        }
    }
}

// src/config.rs
//! Конфигурация генерации тактической карты
//!
//! Этот модуль определяет все параметры, управляющие процедурной генерацией:
//! - Контекст карты (биом, высотная зона, гидрология, освоенность, сезон)
//! - Настраиваемые множители слоёв (изрезанность, обилие воды, плотность растительности)
//! - Контрактные диапазоны значений и их валидацию
//!
//! Все структуры поддерживают сериализацию в TOML/JSON для удобной настройки
//! через конфигурационные файлы. Проверки диапазонов выполняются до запуска
//! конвейера: ядро генерации никогда не видит недопустимых значений.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::GenerationError;
use crate::seed::{MapSeed, layer};

/// Минимальная сторона карты в тайлах
pub const MIN_MAP_SIDE: usize = 10;
/// Максимальная сторона карты в тайлах
pub const MAX_MAP_SIDE: usize = 200;
/// Размер тайла в футах
pub const TILE_SIZE_FT: f32 = 5.0;

/// Проверяет контрактный диапазон размеров [10, 200]
pub fn validate_dimensions(width: usize, height: usize) -> Result<(), GenerationError> {
    if (MIN_MAP_SIDE..=MAX_MAP_SIDE).contains(&width)
        && (MIN_MAP_SIDE..=MAX_MAP_SIDE).contains(&height)
    {
        Ok(())
    } else {
        Err(GenerationError::InvalidDimensions { width, height })
    }
}

/// Биом карты
///
/// Определяет набор геологических формаций-кандидатов и базовую плотность
/// растительности.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Biome {
    #[default]
    Forest,
    Grassland,
    Desert,
    Mountain,
    Swamp,
    Tundra,
}

impl Biome {
    /// Базовая доля тайлов под деревьями до учёта влаги и множителей
    #[must_use]
    pub fn base_tree_density(self) -> f32 {
        match self {
            Biome::Forest => 0.65,
            Biome::Grassland => 0.12,
            Biome::Desert => 0.03,
            Biome::Mountain => 0.20,
            Biome::Swamp => 0.45,
            Biome::Tundra => 0.06,
        }
    }
}

/// Высотная зона: сколько вертикального рельефа достаётся карте
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ElevationZone {
    Lowland,
    #[default]
    Foothills,
    Highland,
    Alpine,
}

impl ElevationZone {
    /// Множитель перепада высот: низина 0.3 → высокогорье 1.0
    #[must_use]
    pub fn relief_multiplier(self) -> f32 {
        match self {
            ElevationZone::Lowland => 0.3,
            ElevationZone::Foothills => 0.55,
            ElevationZone::Highland => 0.75,
            ElevationZone::Alpine => 1.0,
        }
    }
}

/// Тип гидрологии: от безводной до заболоченной
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HydrologyType {
    Arid,
    Seasonal,
    #[default]
    Stream,
    River,
    Lake,
    Wetland,
}

impl HydrologyType {
    /// Климатическая влажность для модели эрозии и влаги почвы:
    /// аридный климат 0.3 → болото 1.0
    #[must_use]
    pub fn wetness(self) -> f32 {
        match self {
            HydrologyType::Arid => 0.3,
            HydrologyType::Seasonal => 0.5,
            HydrologyType::Stream => 0.65,
            HydrologyType::River => 0.8,
            HydrologyType::Lake => 0.85,
            HydrologyType::Wetland => 1.0,
        }
    }
}

/// Уровень освоенности территории
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DevelopmentLevel {
    #[default]
    Wilderness,
    Frontier,
    Rural,
    Settled,
}

impl DevelopmentLevel {
    /// Максимум поселений на карте
    #[must_use]
    pub fn settlement_budget(self) -> usize {
        match self {
            DevelopmentLevel::Wilderness => 0,
            DevelopmentLevel::Frontier => 1,
            DevelopmentLevel::Rural => 2,
            DevelopmentLevel::Settled => 4,
        }
    }

    /// Построек вокруг одного поселения
    #[must_use]
    pub fn buildings_per_settlement(self) -> usize {
        match self {
            DevelopmentLevel::Wilderness => 0,
            DevelopmentLevel::Frontier => 2,
            DevelopmentLevel::Rural => 4,
            DevelopmentLevel::Settled => 7,
        }
    }
}

/// Сезон: влияет на крону деревьев и глубину воды
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Season {
    Spring,
    #[default]
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Сезонный множитель плотности кроны
    #[must_use]
    pub fn canopy_modifier(self) -> f32 {
        match self {
            Season::Spring => 0.9,
            Season::Summer => 1.0,
            Season::Autumn => 0.8,
            Season::Winter => 0.6,
        }
    }

    /// Сезонный множитель глубины воды (весеннее половодье, зимняя межень)
    #[must_use]
    pub fn water_modifier(self) -> f32 {
        match self {
            Season::Spring => 1.2,
            Season::Summer => 1.0,
            Season::Autumn => 1.0,
            Season::Winter => 0.7,
        }
    }
}

/// Контекст генерируемой карты
///
/// Либо задаётся явно, либо детерминированно выводится из сида
/// ([`TacticalMapContext::derive`]). Неизменяемое значение.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TacticalMapContext {
    #[serde(default)]
    pub biome: Biome,
    #[serde(default)]
    pub elevation_zone: ElevationZone,
    #[serde(default)]
    pub hydrology_type: HydrologyType,
    #[serde(default)]
    pub development_level: DevelopmentLevel,
    #[serde(default)]
    pub season: Season,
}

impl TacticalMapContext {
    /// Детерминированно выводит контекст из сида
    #[must_use]
    pub fn derive(seed: MapSeed) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.layer_seed(layer::CONTEXT));
        let biome = match rng.gen_range(0..6) {
            0 => Biome::Forest,
            1 => Biome::Grassland,
            2 => Biome::Desert,
            3 => Biome::Mountain,
            4 => Biome::Swamp,
            _ => Biome::Tundra,
        };
        let elevation_zone = match rng.gen_range(0..4) {
            0 => ElevationZone::Lowland,
            1 => ElevationZone::Foothills,
            2 => ElevationZone::Highland,
            _ => ElevationZone::Alpine,
        };
        let hydrology_type = match rng.gen_range(0..6) {
            0 => HydrologyType::Arid,
            1 => HydrologyType::Seasonal,
            2 => HydrologyType::Stream,
            3 => HydrologyType::River,
            4 => HydrologyType::Lake,
            _ => HydrologyType::Wetland,
        };
        let development_level = match rng.gen_range(0..4) {
            0 => DevelopmentLevel::Wilderness,
            1 => DevelopmentLevel::Frontier,
            2 => DevelopmentLevel::Rural,
            _ => DevelopmentLevel::Settled,
        };
        let season = match rng.gen_range(0..4) {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Autumn,
            _ => Season::Winter,
        };
        Self {
            biome,
            elevation_zone,
            hydrology_type,
            development_level,
            season,
        }
    }
}

/// Настройки рельефа
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TopographyConfig {
    /// Изрезанность рельефа:
    /// - `0.5` → сглаженный старый рельеф, доминирует общий уклон,
    /// - `1.0` → нейтрально,
    /// - `2.0` → резкие тактические формы, сглаживание отключено.
    #[serde(default = "default_multiplier")]
    pub ruggedness: f32,
}

impl Default for TopographyConfig {
    fn default() -> Self {
        Self { ruggedness: 1.0 }
    }
}

impl TopographyConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        check_range("topography.ruggedness", self.ruggedness, 0.5, 2.0)
    }
}

/// Настройки гидрологии
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HydrologyConfig {
    /// Обилие воды: снижает пороги появления ручьёв и родников
    #[serde(default = "default_multiplier")]
    pub water_abundance: f32,
}

impl Default for HydrologyConfig {
    fn default() -> Self {
        Self {
            water_abundance: 1.0,
        }
    }
}

impl HydrologyConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        check_range("hydrology.water_abundance", self.water_abundance, 0.5, 2.0)
    }
}

/// Настройки растительности
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VegetationConfig {
    /// Плотность растительности (0.0 = голая карта, 2.0 = максимум)
    #[serde(default = "default_multiplier")]
    pub density: f32,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self { density: 1.0 }
    }
}

impl VegetationConfig {
    pub fn validate(&self) -> Result<(), GenerationError> {
        check_range("vegetation.density", self.density, 0.0, 2.0)
    }
}

fn default_multiplier() -> f32 {
    1.0
}

fn check_range(
    name: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<(), GenerationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(GenerationError::InvalidConfig {
            name,
            value,
            min,
            max,
        })
    }
}

/// Основные параметры генерации одной карты
///
/// Полная конфигурация запроса. Поддерживает загрузку из TOML-файлов.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Сид генератора (число или строка, детерминированная генерация)
    pub seed: MapSeed,

    /// Ширина карты в тайлах (по умолчанию 50)
    #[serde(default = "default_side")]
    pub width: usize,

    /// Высота карты в тайлах (по умолчанию 50)
    #[serde(default = "default_side")]
    pub height: usize,

    /// Контекст карты; если не задан — выводится из сида
    #[serde(default)]
    pub context: Option<TacticalMapContext>,

    /// Настройки рельефа
    #[serde(default)]
    pub topography: TopographyConfig,

    /// Настройки гидрологии
    #[serde(default)]
    pub hydrology: HydrologyConfig,

    /// Настройки растительности
    #[serde(default)]
    pub vegetation: VegetationConfig,
}

fn default_side() -> usize {
    50
}

impl GenerationParams {
    /// Загружает параметры из TOML-файла
    ///
    /// # Ошибки
    /// Возвращает ошибку, если файл не найден или содержит недопустимый формат.
    ///
    /// # Пример
    /// ```toml
    /// # map.toml
    /// seed = "forest-ambush"
    /// width = 40
    /// height = 30
    ///
    /// [context]
    /// biome = "Forest"
    /// hydrology_type = "Stream"
    /// ```
    pub fn from_toml_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        let params: Self = toml::from_str(&contents)?;
        Ok(params)
    }

    /// Проверяет размеры и все множители до запуска конвейера
    pub fn validate(&self) -> Result<(), GenerationError> {
        validate_dimensions(self.width, self.height)?;
        self.topography.validate()?;
        self.hydrology.validate()?;
        self.vegetation.validate()?;
        Ok(())
    }

    /// Контекст запроса: явный или выведенный из сида
    #[must_use]
    pub fn resolved_context(&self) -> TacticalMapContext {
        self.context
            .unwrap_or_else(|| TacticalMapContext::derive(self.seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_contract() {
        assert!(validate_dimensions(10, 200).is_ok());
        assert!(validate_dimensions(9, 50).is_err());
        assert!(validate_dimensions(50, 201).is_err());
    }

    #[test]
    fn config_ranges() {
        assert!(TopographyConfig { ruggedness: 0.5 }.validate().is_ok());
        assert!(TopographyConfig { ruggedness: 2.1 }.validate().is_err());
        assert!(
            HydrologyConfig {
                water_abundance: 0.4
            }
            .validate()
            .is_err()
        );
        assert!(VegetationConfig { density: 0.0 }.validate().is_ok());
        assert!(VegetationConfig { density: -0.1 }.validate().is_err());
    }

    #[test]
    fn derived_context_is_deterministic() {
        let seed = MapSeed::from_phrase("context-seed");
        assert_eq!(
            TacticalMapContext::derive(seed),
            TacticalMapContext::derive(seed)
        );
    }

    #[test]
    fn params_from_toml_defaults() {
        let params: GenerationParams = toml::from_str("seed = 7").unwrap();
        assert_eq!(params.width, 50);
        assert_eq!(params.topography.ruggedness, 1.0);
        assert!(params.context.is_none());
    }
}

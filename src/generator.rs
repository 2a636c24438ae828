// src/generator.rs
//! Оркестратор конвейера генерации
//!
//! Слои вызываются в строгом порядке: геология → рельеф → гидрология →
//! растительность → постройки → точечные особенности. Каждый следующий слой
//! получает полностью заполненные сетки предыдущих; отказ любого слоя
//! прерывает конвейер без частичного результата. Повторный вызов с теми же
//! аргументами обязан дать побитово идентичный результат.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{
    Biome, DevelopmentLevel, GenerationParams, HydrologyType, TacticalMapContext,
};
use crate::error::GenerationError;
use crate::features::{FeatureMap, generate_features};
use crate::geology::{GeologyMap, generate_geology};
use crate::hydrology::{HydrologyMap, generate_hydrology};
use crate::seed::MapSeed;
use crate::structures::{StructureMap, generate_structures};
use crate::topography::{TopographyMap, generate_topography};
use crate::vegetation::{VegetationMap, generate_vegetation};

/// Сводная статистика готовой карты
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapStatistics {
    pub min_elevation: f32,
    pub max_elevation: f32,
    pub mean_slope: f32,
    pub spring_count: usize,
    pub stream_tile_count: usize,
    pub water_coverage: f32,
    pub tree_count: usize,
}

/// Мягкое предупреждение пост-валидации; генерацию не прерывает
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationWarning {
    /// Запрошена проточная гидрология, но ни одного тайла ручья не вышло
    StreamsExpectedButAbsent { requested: HydrologyType },
    /// Лесной биом без единого дерева
    ForestWithoutTrees,
    /// Освоенная местность, но площадок под поселения не нашлось
    NoSettlementSites { requested: DevelopmentLevel },
}

/// Неизменяемый итог одного запроса генерации
///
/// Полностью сериализуем: пригоден для хранения по ключу
/// (сид + контекст + настройки) без приватных полей.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TacticalMapGenerationResult {
    pub width: usize,
    pub height: usize,
    pub seed: MapSeed,
    pub context: TacticalMapContext,
    pub params: GenerationParams,
    pub geology: GeologyMap,
    pub topography: TopographyMap,
    pub hydrology: HydrologyMap,
    pub vegetation: VegetationMap,
    pub structures: StructureMap,
    pub features: FeatureMap,
    pub statistics: MapStatistics,
    pub warnings: Vec<GenerationWarning>,
}

/// Запускает весь конвейер генерации
///
/// Валидация размеров и множителей выполняется до первого слоя; значения
/// вне контракта — ошибка вызывающей стороны, без повторных попыток.
pub fn generate(params: &GenerationParams) -> Result<TacticalMapGenerationResult, GenerationError> {
    params.validate()?;
    let seed = params.seed;
    let context = params.resolved_context();
    info!(
        "генерация {}×{}, сид {}, биом {:?}",
        params.width,
        params.height,
        seed.value(),
        context.biome
    );

    let geology = generate_geology(params.width, params.height, &context, seed)?;
    debug!(
        "геология: {:?} + {:?}, контактов {}",
        geology.primary,
        geology.secondary,
        geology.transitions.len()
    );

    let topography = generate_topography(&geology, &context, &params.topography, seed)?;
    debug!(
        "рельеф: {:.1}–{:.1} футов, средний уклон {:.1}°",
        topography.min_elevation(),
        topography.max_elevation(),
        topography.mean_slope()
    );

    let hydrology = generate_hydrology(&geology, &topography, &context, &params.hydrology, seed)?;
    debug!(
        "гидрология: {} тайлов ручьёв, {} родников",
        hydrology.stream_tile_count(),
        hydrology.springs.len()
    );

    let vegetation = generate_vegetation(&topography, &hydrology, &context, &params.vegetation, seed)?;
    debug!("растительность: {} деревьев", vegetation.tree_count);

    let structures = generate_structures(&geology, &topography, &hydrology, &context, seed)?;
    debug!(
        "постройки: {} поселений, {} зданий",
        structures.settlements.len(),
        structures.building_count()
    );

    let features = generate_features(&geology, &topography, &hydrology, &vegetation, seed)?;
    debug!("точечных особенностей: {}", features.points.len());

    let statistics = MapStatistics {
        min_elevation: topography.min_elevation(),
        max_elevation: topography.max_elevation(),
        mean_slope: topography.mean_slope(),
        spring_count: hydrology.springs.len(),
        stream_tile_count: hydrology.stream_tile_count(),
        water_coverage: hydrology.water_coverage(),
        tree_count: vegetation.tree_count,
    };

    let warnings = collect_warnings(&context, &statistics, &structures);
    info!("генерация завершена, предупреждений: {}", warnings.len());

    Ok(TacticalMapGenerationResult {
        width: params.width,
        height: params.height,
        seed,
        context,
        params: params.clone(),
        geology,
        topography,
        hydrology,
        vegetation,
        structures,
        features,
        statistics,
        warnings,
    })
}

fn collect_warnings(
    context: &TacticalMapContext,
    statistics: &MapStatistics,
    structures: &StructureMap,
) -> Vec<GenerationWarning> {
    let mut warnings = Vec::new();
    let flowing = matches!(
        context.hydrology_type,
        HydrologyType::Stream | HydrologyType::River | HydrologyType::Lake | HydrologyType::Wetland
    );
    if flowing && statistics.stream_tile_count == 0 {
        warnings.push(GenerationWarning::StreamsExpectedButAbsent {
            requested: context.hydrology_type,
        });
    }
    if context.biome == Biome::Forest && statistics.tree_count == 0 {
        warnings.push(GenerationWarning::ForestWithoutTrees);
    }
    if context.development_level != DevelopmentLevel::Wilderness && structures.settlements.is_empty()
    {
        warnings.push(GenerationWarning::NoSettlementSites {
            requested: context.development_level,
        });
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ElevationZone, Season, TopographyConfig};

    fn forest_params(seed: MapSeed) -> GenerationParams {
        GenerationParams {
            seed,
            width: 30,
            height: 30,
            context: Some(TacticalMapContext {
                biome: Biome::Forest,
                elevation_zone: ElevationZone::Foothills,
                hydrology_type: HydrologyType::Stream,
                development_level: DevelopmentLevel::Wilderness,
                season: Season::Summer,
            }),
            topography: TopographyConfig::default(),
            hydrology: crate::config::HydrologyConfig::default(),
            vegetation: crate::config::VegetationConfig::default(),
        }
    }

    #[test]
    fn invalid_dimensions_fail_before_generation() {
        let mut params = forest_params(MapSeed::from_u64(1));
        params.width = 5;
        assert!(matches!(
            generate(&params),
            Err(GenerationError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn invalid_config_fails_before_generation() {
        let mut params = forest_params(MapSeed::from_u64(1));
        params.topography.ruggedness = 3.0;
        assert!(matches!(
            generate(&params),
            Err(GenerationError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn statistics_are_consistent_with_layers() {
        let result = generate(&forest_params(MapSeed::from_u64(99))).unwrap();
        assert_eq!(result.statistics.tree_count, result.vegetation.tree_count);
        assert_eq!(
            result.statistics.stream_tile_count,
            result.hydrology.stream_tile_count()
        );
        assert!(result.statistics.max_elevation >= result.statistics.min_elevation);
    }

    #[test]
    fn result_round_trips_through_json() {
        let result = generate(&forest_params(MapSeed::from_u64(17))).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        let back: TacticalMapGenerationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.statistics, result.statistics);
        assert_eq!(back.topography.elevation, result.topography.elevation);
    }

    #[test]
    fn derived_context_used_when_absent() {
        let mut params = forest_params(MapSeed::from_u64(4));
        params.context = None;
        let a = generate(&params).unwrap();
        let b = generate(&params).unwrap();
        assert_eq!(a.context, b.context);
        assert_eq!(a.context, TacticalMapContext::derive(params.seed));
    }
}

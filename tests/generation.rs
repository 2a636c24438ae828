//! Сквозные свойства генерации: детерминизм, чувствительность к сиду,
//! монотонность множителей и контрактные границы.

use tacmapgen::config::{
    Biome, DevelopmentLevel, ElevationZone, GenerationParams, HydrologyConfig, HydrologyType,
    Season, TacticalMapContext, TopographyConfig, VegetationConfig,
};
use tacmapgen::error::GenerationError;
use tacmapgen::seed::MapSeed;
use tacmapgen::{generate, MapFeature};

fn scenario_params(seed: MapSeed) -> GenerationParams {
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
        hydrology: HydrologyConfig::default(),
        vegetation: VegetationConfig::default(),
    }
}

#[test]
fn determinism_scenario_bitwise_identical() {
    // Сид "determinism-test-1", 30×30, FOREST/FOOTHILLS/STREAM/WILDERNESS/SUMMER
    let params = scenario_params(MapSeed::from_phrase("determinism-test-1"));
    let a = generate(&params).unwrap();
    let b = generate(&params).unwrap();

    assert_eq!(a.statistics, b.statistics);
    assert_eq!(a.topography.elevation, b.topography.elevation);
    assert_eq!(a.topography.slope, b.topography.slope);
    assert_eq!(a.hydrology.is_stream, b.hydrology.is_stream);
    assert_eq!(a.hydrology.springs, b.hydrology.springs);
    assert_eq!(a.vegetation.tree_count, b.vegetation.tree_count);
}

#[test]
fn seed_sensitivity() {
    let a = generate(&scenario_params(MapSeed::from_phrase("seed-a"))).unwrap();
    let b = generate(&scenario_params(MapSeed::from_phrase("seed-b"))).unwrap();
    let differs = a
        .topography
        .elevation
        .iter()
        .zip(&b.topography.elevation)
        .any(|(x, y)| x != y);
    assert!(differs, "разные сиды обязаны давать разные карты");
}

#[test]
fn ruggedness_monotone_in_elevation_range() {
    let seed = MapSeed::from_phrase("ruggedness-check");
    let mut smooth = scenario_params(seed);
    smooth.topography.ruggedness = 0.5;
    let mut rough = scenario_params(seed);
    rough.topography.ruggedness = 2.0;

    let smooth_result = generate(&smooth).unwrap();
    let rough_result = generate(&rough).unwrap();
    let smooth_range =
        smooth_result.statistics.max_elevation - smooth_result.statistics.min_elevation;
    let rough_range = rough_result.statistics.max_elevation - rough_result.statistics.min_elevation;
    assert!(rough_range > smooth_range);
}

#[test]
fn water_abundance_monotone_in_stream_tiles() {
    let seed = MapSeed::from_phrase("abundance-check");
    let mut dry = scenario_params(seed);
    dry.hydrology.water_abundance = 0.5;
    let mut wet = scenario_params(seed);
    wet.hydrology.water_abundance = 2.0;

    let dry_result = generate(&dry).unwrap();
    let wet_result = generate(&wet).unwrap();
    assert!(wet_result.statistics.stream_tile_count >= dry_result.statistics.stream_tile_count);
}

#[test]
fn vegetation_density_monotone_in_tree_count() {
    let seed = MapSeed::from_phrase("density-check");
    let mut sparse = scenario_params(seed);
    sparse.vegetation.density = 0.5;
    let mut dense = scenario_params(seed);
    dense.vegetation.density = 2.0;

    let sparse_result = generate(&sparse).unwrap();
    let dense_result = generate(&dense).unwrap();
    assert!(dense_result.statistics.tree_count >= sparse_result.statistics.tree_count);
}

#[test]
fn elevation_and_slope_bounds_hold() {
    for phrase in ["bounds-1", "bounds-2", "bounds-3"] {
        let result = generate(&scenario_params(MapSeed::from_phrase(phrase))).unwrap();
        assert!(result.topography.elevation.iter().all(|&e| e >= 0.0));
        assert!(
            result
                .topography
                .slope
                .iter()
                .all(|&s| (0.0..=90.0).contains(&s))
        );
    }
}

#[test]
fn out_of_range_dimensions_always_rejected() {
    for (w, h) in [(9, 30), (30, 9), (201, 30), (30, 201), (0, 0)] {
        let mut params = scenario_params(MapSeed::from_u64(1));
        params.width = w;
        params.height = h;
        assert!(
            matches!(
                generate(&params),
                Err(GenerationError::InvalidDimensions { .. })
            ),
            "{w}×{h} должно отклоняться"
        );
    }
}

#[test]
fn grids_are_fully_populated() {
    let result = generate(&scenario_params(MapSeed::from_phrase("population"))).unwrap();
    let n = result.width * result.height;
    assert_eq!(result.geology.tiles.len(), n);
    assert_eq!(result.topography.elevation.len(), n);
    assert_eq!(result.topography.slope.len(), n);
    assert_eq!(result.hydrology.flow_direction.len(), n);
    assert_eq!(result.hydrology.moisture.len(), n);
    assert_eq!(result.vegetation.canopy.len(), n);
    assert_eq!(result.structures.kind.len(), n);
}

#[test]
fn mixing_probability_one_merges_all_compatible() {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tacmapgen::mixing::{FeatureBounds, FeatureKind, apply_mixing};

    let bounds = FeatureBounds {
        x: 0,
        y: 0,
        width: 10,
        height: 10,
    };
    let mountain = MapFeature {
        id: 1,
        kind: FeatureKind::Mountain,
        bounds,
        priority: 8,
        height_ft: 40.0,
    };
    let forest = MapFeature {
        id: 2,
        kind: FeatureKind::Forest,
        bounds,
        priority: 4,
        height_ft: 25.0,
    };

    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let tile = apply_mixing(&[mountain, forest], 1.0, &mut rng).unwrap();
    assert_eq!(tile.features, vec![1, 2]);
    assert_eq!(tile.terrain, FeatureKind::Forest);
    assert_eq!(tile.height_ft, 65.0);
    assert_eq!(tile.movement_cost, 3.0);
}

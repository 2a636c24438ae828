// src/mixing.rs
//! Совместимость и смешивание именованных особенностей карты
//!
//! Движок не зависит от тайловой сетки: он разрешает пересечение нескольких
//! дискретных особенностей (гора, лес, река, мост...) в одно состояние тайла.
//! Совместимость пар — чистая симметричная функция; всё, что не перечислено
//! в таблице, нейтрально; культурные особенности нейтральны ко всему.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Категория особенности
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureCategory {
    Relief,
    Natural,
    Artificial,
    Cultural,
}

/// Именованный тип особенности
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    Mountain,
    Hill,
    Cliff,
    Valley,
    Forest,
    River,
    Lake,
    Marsh,
    Building,
    Bridge,
    Road,
    Wall,
    Shrine,
    Ruins,
    Monument,
}

/// Все типы — для перебора в тестах и таблицах
pub const ALL_KINDS: [FeatureKind; 15] = [
    FeatureKind::Mountain,
    FeatureKind::Hill,
    FeatureKind::Cliff,
    FeatureKind::Valley,
    FeatureKind::Forest,
    FeatureKind::River,
    FeatureKind::Lake,
    FeatureKind::Marsh,
    FeatureKind::Building,
    FeatureKind::Bridge,
    FeatureKind::Road,
    FeatureKind::Wall,
    FeatureKind::Shrine,
    FeatureKind::Ruins,
    FeatureKind::Monument,
];

impl FeatureKind {
    #[must_use]
    pub fn category(self) -> FeatureCategory {
        use FeatureKind::*;
        match self {
            Mountain | Hill | Cliff | Valley => FeatureCategory::Relief,
            Forest | River | Lake | Marsh => FeatureCategory::Natural,
            Building | Bridge | Road | Wall => FeatureCategory::Artificial,
            Shrine | Ruins | Monument => FeatureCategory::Cultural,
        }
    }

    /// Базовая стоимость передвижения по тайлу с этой особенностью
    #[must_use]
    pub fn movement_cost(self) -> f32 {
        use FeatureKind::*;
        match self {
            Road => 0.5,
            Valley | Bridge | Shrine | Monument => 1.0,
            Hill | Ruins => 1.5,
            Forest => 2.0,
            Mountain => 2.5,
            Marsh => 3.0,
            River => 4.0,
            Cliff | Building => 5.0,
            Lake | Wall => 6.0,
        }
    }
}

/// Прямоугольные границы особенности в тайлах
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FeatureBounds {
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x
            && y >= self.y
            && x < self.x + self.width as i32
            && y < self.y + self.height as i32
    }
}

/// Дискретная именованная особенность карты
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapFeature {
    pub id: u32,
    pub kind: FeatureKind,
    pub bounds: FeatureBounds,
    pub priority: u8,
    /// Вклад особенности в высоту тайла, футы
    pub height_ft: f32,
}

/// Итог проверки пары особенностей
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compatibility {
    Incompatible,
    Neutral,
    Compatible,
    Synergistic,
}

/// Совместимость пары типов; симметрична по аргументам
#[must_use]
pub fn compatibility(a: FeatureKind, b: FeatureKind) -> Compatibility {
    if a.category() == FeatureCategory::Cultural || b.category() == FeatureCategory::Cultural {
        return Compatibility::Neutral;
    }
    pair_rule(a, b)
        .or_else(|| pair_rule(b, a))
        .unwrap_or(Compatibility::Neutral)
}

/// Табличная часть: перечислены только значимые комбинации
fn pair_rule(a: FeatureKind, b: FeatureKind) -> Option<Compatibility> {
    use Compatibility::*;
    use FeatureKind::*;
    match (a, b) {
        // Рельеф ↔ природа
        (Mountain, Forest) => Some(Synergistic),
        (Mountain, Lake) => Some(Compatible),
        (Mountain, Marsh) => Some(Incompatible),
        (Hill, Forest) => Some(Compatible),
        (Cliff, River) => Some(Compatible),
        (Valley, River) => Some(Synergistic),
        (Valley, Marsh) => Some(Compatible),
        // Рельеф ↔ постройки
        (Mountain, Building) => Some(Compatible),
        (Mountain, Road) => Some(Incompatible),
        (Hill, Building) => Some(Compatible),
        (Cliff, Road) => Some(Incompatible),
        (Valley, Road) => Some(Compatible),
        // Природа ↔ постройки
        (River, Bridge) => Some(Synergistic),
        (Lake, Bridge) => Some(Compatible),
        (Lake, Building) => Some(Incompatible),
        (River, Building) => Some(Incompatible),
        (Forest, Building) => Some(Compatible),
        (Forest, Road) => Some(Compatible),
        (Marsh, Road) => Some(Incompatible),
        _ => None,
    }
}

/// Кто из пары определяет аспект смешанного тайла
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dominance {
    Primary,
    Secondary,
}

/// Режим смешивания высот
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightBlend {
    Dominant,
    Add,
    Average,
    Max,
}

/// Поаспектное разрешение пары: кто диктует террейн, высоту, передвижение,
/// блокировку и внешний вид
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureInteraction {
    pub terrain: Dominance,
    pub height: Dominance,
    pub movement: Dominance,
    pub blocking: Dominance,
    pub visual: Dominance,
    pub height_blend: HeightBlend,
    /// Абсолютная стоимость передвижения, если комбинация её задаёт
    pub movement_cost: Option<f32>,
}

impl Default for FeatureInteraction {
    /// По умолчанию главная особенность доминирует во всех аспектах
    fn default() -> Self {
        Self {
            terrain: Dominance::Primary,
            height: Dominance::Primary,
            movement: Dominance::Primary,
            blocking: Dominance::Primary,
            visual: Dominance::Primary,
            height_blend: HeightBlend::Dominant,
            movement_cost: None,
        }
    }
}

/// Взаимодействие пары особенностей; именованные комбинации
/// переопределяют доминирование поаспектно
#[must_use]
pub fn interaction(primary: &MapFeature, secondary: &MapFeature) -> FeatureInteraction {
    use FeatureKind::*;
    let side = |kind: FeatureKind| {
        if primary.kind == kind {
            Dominance::Primary
        } else {
            Dominance::Secondary
        }
    };

    let kinds = (primary.kind, secondary.kind);
    let unordered_match = |a: FeatureKind, b: FeatureKind| kinds == (a, b) || kinds == (b, a);

    if unordered_match(Mountain, Forest) {
        // Лес одевает склон, гора задаёт высоту, кроны добавляются сверху
        return FeatureInteraction {
            terrain: side(Forest),
            height: side(Mountain),
            visual: side(Forest),
            height_blend: HeightBlend::Add,
            movement_cost: Some(3.0),
            ..FeatureInteraction::default()
        };
    }
    if unordered_match(River, Bridge) {
        return FeatureInteraction {
            terrain: side(Bridge),
            movement: side(Bridge),
            blocking: side(Bridge),
            height_blend: HeightBlend::Add,
            ..FeatureInteraction::default()
        };
    }
    if unordered_match(Lake, Bridge) {
        return FeatureInteraction {
            terrain: side(Bridge),
            movement: side(Bridge),
            height_blend: HeightBlend::Add,
            ..FeatureInteraction::default()
        };
    }
    if unordered_match(Valley, River) {
        return FeatureInteraction {
            terrain: side(River),
            movement: side(River),
            height_blend: HeightBlend::Average,
            ..FeatureInteraction::default()
        };
    }
    if unordered_match(Forest, Building) {
        // Просека: постройка вытесняет кроны на своём тайле
        return FeatureInteraction {
            terrain: side(Building),
            movement: side(Building),
            height_blend: HeightBlend::Max,
            ..FeatureInteraction::default()
        };
    }
    FeatureInteraction::default()
}

/// Состояние тайла после смешивания
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedTile {
    pub terrain: FeatureKind,
    pub height_ft: f32,
    pub movement_cost: f32,
    /// Идентификаторы вошедших особенностей, главная первой
    pub features: Vec<u32>,
}

/// Смешивает перекрывающие тайл особенности в одно состояние
///
/// Особенности сортируются по убыванию приоритета; самая приоритетная
/// всегда становится главной. Каждая следующая входит в тайл, только если
/// она не несовместима ни с одной уже принятой и бросок вероятности
/// прошёл против `mix_probability` (0 — кроме главной никто, 1 — все
/// совместимые). Несовместимые пропускаются без повторных попыток.
pub fn apply_mixing<R: Rng>(
    features: &[MapFeature],
    mix_probability: f32,
    rng: &mut R,
) -> Option<MixedTile> {
    let mut sorted: Vec<&MapFeature> = features.iter().collect();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
    let primary = *sorted.first()?;

    let mut accepted: Vec<&MapFeature> = vec![primary];
    let mut tile = MixedTile {
        terrain: primary.kind,
        height_ft: primary.height_ft,
        movement_cost: primary.kind.movement_cost(),
        features: vec![primary.id],
    };

    for &candidate in &sorted[1..] {
        let incompatible = accepted
            .iter()
            .any(|a| compatibility(a.kind, candidate.kind) == Compatibility::Incompatible);
        if incompatible {
            continue;
        }
        if !(rng.r#gen::<f32>() < mix_probability) {
            continue;
        }

        let inter = interaction(primary, candidate);
        if inter.terrain == Dominance::Secondary {
            tile.terrain = candidate.kind;
        }
        tile.height_ft = match inter.height_blend {
            HeightBlend::Dominant => match inter.height {
                Dominance::Primary => tile.height_ft,
                Dominance::Secondary => candidate.height_ft,
            },
            HeightBlend::Add => tile.height_ft + candidate.height_ft,
            HeightBlend::Average => (tile.height_ft + candidate.height_ft) / 2.0,
            HeightBlend::Max => tile.height_ft.max(candidate.height_ft),
        };
        tile.movement_cost = inter.movement_cost.unwrap_or(match inter.movement {
            Dominance::Primary => tile.movement_cost,
            Dominance::Secondary => candidate.kind.movement_cost(),
        });
        accepted.push(candidate);
        tile.features.push(candidate.id);
    }

    Some(tile)
}

/// Особенности, чьи границы накрывают тайл (x, y)
#[must_use]
pub fn features_at(features: &[MapFeature], x: i32, y: i32) -> Vec<MapFeature> {
    features
        .iter()
        .filter(|f| f.bounds.contains(x, y))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn feature(id: u32, kind: FeatureKind, priority: u8, height_ft: f32) -> MapFeature {
        MapFeature {
            id,
            kind,
            bounds: FeatureBounds {
                x: 0,
                y: 0,
                width: 10,
                height: 10,
            },
            priority,
            height_ft,
        }
    }

    #[test]
    fn compatibility_is_symmetric_for_all_pairs() {
        for &a in &ALL_KINDS {
            for &b in &ALL_KINDS {
                assert_eq!(compatibility(a, b), compatibility(b, a), "{a:?} / {b:?}");
            }
        }
    }

    #[test]
    fn cultural_is_neutral_with_everything() {
        for &other in &ALL_KINDS {
            assert_eq!(
                compatibility(FeatureKind::Shrine, other),
                Compatibility::Neutral
            );
        }
    }

    #[test]
    fn unlisted_pair_defaults_to_neutral() {
        assert_eq!(
            compatibility(FeatureKind::Hill, FeatureKind::Lake),
            Compatibility::Neutral
        );
    }

    #[test]
    fn single_feature_dominates_alone() {
        let forest = feature(1, FeatureKind::Forest, 4, 25.0);
        for probability in [0.0, 0.5, 1.0] {
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            let tile = apply_mixing(std::slice::from_ref(&forest), probability, &mut rng).unwrap();
            assert_eq!(tile.terrain, FeatureKind::Forest);
            assert_eq!(tile.height_ft, 25.0);
            assert_eq!(tile.features, vec![1]);
        }
    }

    #[test]
    fn zero_probability_keeps_only_primary() {
        let features = vec![
            feature(1, FeatureKind::Mountain, 8, 40.0),
            feature(2, FeatureKind::Forest, 4, 25.0),
            feature(3, FeatureKind::Hill, 2, 10.0),
        ];
        for seed in 0..50u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let tile = apply_mixing(&features, 0.0, &mut rng).unwrap();
            assert_eq!(tile.features, vec![1]);
        }
    }

    #[test]
    fn mountain_forest_interaction_override() {
        let mountain = feature(1, FeatureKind::Mountain, 8, 40.0);
        let forest = feature(2, FeatureKind::Forest, 4, 25.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let tile = apply_mixing(&[mountain.clone(), forest], 1.0, &mut rng).unwrap();

        // Главная — гора, но террейн отдан лесу, высоты складываются
        assert_eq!(tile.features[0], 1);
        assert_eq!(tile.terrain, FeatureKind::Forest);
        assert!(tile.height_ft > mountain.height_ft);
        assert_eq!(tile.movement_cost, 3.0);
    }

    #[test]
    fn incompatible_feature_is_skipped() {
        let features = vec![
            feature(1, FeatureKind::Lake, 9, 0.0),
            feature(2, FeatureKind::Building, 5, 15.0),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let tile = apply_mixing(&features, 1.0, &mut rng).unwrap();
        assert_eq!(tile.features, vec![1]);
        assert_eq!(tile.terrain, FeatureKind::Lake);
    }

    #[test]
    fn river_bridge_movement_goes_to_bridge() {
        let river = feature(1, FeatureKind::River, 7, 0.0);
        let bridge = feature(2, FeatureKind::Bridge, 5, 8.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let tile = apply_mixing(&[river, bridge], 1.0, &mut rng).unwrap();
        assert_eq!(tile.terrain, FeatureKind::Bridge);
        assert_eq!(tile.movement_cost, FeatureKind::Bridge.movement_cost());
    }

    #[test]
    fn bounds_filter() {
        let mut inside = feature(1, FeatureKind::Forest, 4, 25.0);
        inside.bounds = FeatureBounds {
            x: 0,
            y: 0,
            width: 5,
            height: 5,
        };
        let mut outside = feature(2, FeatureKind::Hill, 3, 10.0);
        outside.bounds = FeatureBounds {
            x: 20,
            y: 20,
            width: 5,
            height: 5,
        };
        let found = features_at(&[inside, outside], 2, 2);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[test]
    fn empty_feature_list_yields_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(apply_mixing(&[], 1.0, &mut rng).is_none());
    }
}

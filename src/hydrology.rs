// src/hydrology.rs
//! Гидрология: сток D8, аккумуляция, родники и ручьи
//!
//! Направление стока каждого тайла — сосед с самым крутым положительным
//! спуском из восьми (D8). Аккумуляция считается не квадратичным перебором
//! всей сетки на каждый тайл, а за O(n): граф стока — это DAG (спуск строго
//! положительный), поэтому достаточно одного топологического прохода.

use image::{ImageBuffer, Luma};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{HydrologyConfig, TacticalMapContext};
use crate::error::GenerationError;
use crate::geology::GeologyMap;
use crate::noise::NoiseField;
use crate::seed::{MapSeed, layer};
use crate::topography::TopographyMap;

/// Соседи D8; порядок важен: при равном спуске побеждает первый проверенный
const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const SQRT2: f32 = std::f32::consts::SQRT_2;

/// Тайл-сток: вода не уходит ни к одному соседу
pub const NO_FLOW: i8 = -1;

/// Доля площади карты, которую должен собрать тайл, чтобы стать ручьём
/// (до учёта множителя обилия воды)
const STREAM_AREA_FRACTION: f32 = 0.02;
/// Базовый порог вероятности родника
const SPRING_BASE_THRESHOLD: f32 = 0.85;

/// Отрезок ручья для отрисовки: ломаная по тайлам и ширина в футах
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSegment {
    pub path: Vec<(usize, usize)>,
    pub width_ft: f32,
}

/// Гидрологическая карта (все сетки построчные, `height × width`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydrologyMap {
    pub width: usize,
    pub height: usize,
    /// Индекс направления D8 (0–7) либо [`NO_FLOW`]
    pub flow_direction: Vec<i8>,
    /// Число тайлов, стекающих через данный (включая его самого)
    pub accumulation: Vec<u32>,
    pub is_stream: Vec<bool>,
    /// Порядок ручья 1–5, 0 вне ручьёв
    pub stream_order: Vec<u8>,
    /// Глубина воды, футы
    pub water_depth: Vec<f32>,
    /// Влажность почвы, [0, 1]
    pub moisture: Vec<f32>,
    pub springs: Vec<(usize, usize)>,
    pub segments: Vec<StreamSegment>,
}

impl HydrologyMap {
    #[must_use]
    pub fn stream_tile_count(&self) -> usize {
        self.is_stream.iter().filter(|&&s| s).count()
    }

    /// Доля тайлов, покрытых водой
    #[must_use]
    pub fn water_coverage(&self) -> f32 {
        self.stream_tile_count() as f32 / (self.width * self.height) as f32
    }

    pub fn save_as_png(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut img: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(self.width as u32, self.height as u32, Luma([0]));
        for y in 0..self.height {
            for x in 0..self.width {
                let order = self.stream_order[y * self.width + x];
                if order > 0 {
                    imageproc::drawing::draw_filled_circle_mut(
                        &mut img,
                        (x as i32, y as i32),
                        i32::from(order) / 2,
                        Luma([255u8]),
                    );
                }
            }
        }
        img.save(path)?;
        Ok(())
    }
}

#[derive(Debug, Error)]
#[error("граф стока содержит цикл, рельеф некорректен")]
struct FlowCycle;

/// Генерирует гидрологический слой
pub fn generate_hydrology(
    geology: &GeologyMap,
    topography: &TopographyMap,
    context: &TacticalMapContext,
    config: &HydrologyConfig,
    seed: MapSeed,
) -> Result<HydrologyMap, GenerationError> {
    let width = topography.width;
    let height = topography.height;
    let abundance = config.water_abundance;

    let flow_direction = compute_flow_directions(topography);
    let accumulation = compute_accumulation(&flow_direction, width, height)
        .map_err(|e| GenerationError::layer("hydrology", e))?;

    let springs = place_springs(geology, topography, abundance, seed);

    // Ручьи: аккумуляция выше порога, порядок — логарифм превышения
    let threshold = ((width * height) as f32 * STREAM_AREA_FRACTION / abundance).max(2.0);
    let mut is_stream = vec![false; width * height];
    let mut stream_order = vec![0u8; width * height];
    for i in 0..width * height {
        let acc = accumulation[i] as f32;
        if acc > threshold {
            is_stream[i] = true;
            let order = (acc / threshold).log2().floor() as u8 + 1;
            stream_order[i] = order.clamp(1, 5);
        }
    }

    let water_modifier = context.season.water_modifier();
    let water_depth: Vec<f32> = stream_order
        .iter()
        .map(|&o| f32::from(o) * 0.5 * water_modifier)
        .collect();

    let moisture = compute_moisture(&accumulation, &is_stream, &springs, context, width);

    let segments = extract_segments(&is_stream, &stream_order, &flow_direction, width, height);

    Ok(HydrologyMap {
        width,
        height,
        flow_direction,
        accumulation,
        is_stream,
        stream_order,
        water_depth,
        moisture,
        springs,
        segments,
    })
}

/// D8: самый крутой положительный спуск с учётом диагональной дистанции √2
fn compute_flow_directions(topography: &TopographyMap) -> Vec<i8> {
    let width = topography.width;
    let height = topography.height;
    let mut directions = vec![NO_FLOW; width * height];

    for y in 0..height {
        for x in 0..width {
            let own = topography.elevation[y * width + x];
            let mut best_gradient = 0.0;
            let mut best_dir = NO_FLOW;

            for (dir, &(dx, dy)) in DIRECTIONS.iter().enumerate() {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                if nx < 0 || nx >= width as i32 || ny < 0 || ny >= height as i32 {
                    continue;
                }
                let drop = own - topography.elevation[(ny as usize) * width + nx as usize];
                let distance = if dx != 0 && dy != 0 { SQRT2 } else { 1.0 };
                let gradient = drop / distance;
                if gradient > best_gradient {
                    best_gradient = gradient;
                    best_dir = dir as i8;
                }
            }
            directions[y * width + x] = best_dir;
        }
    }
    directions
}

/// Аккумуляция стока за один топологический проход по DAG направлений
fn compute_accumulation(
    flow_direction: &[i8],
    width: usize,
    height: usize,
) -> Result<Vec<u32>, FlowCycle> {
    let n = width * height;
    let mut graph: DiGraph<(), ()> = DiGraph::with_capacity(n, n);
    let nodes: Vec<NodeIndex> = (0..n).map(|_| graph.add_node(())).collect();

    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            let dir = flow_direction[i];
            if dir == NO_FLOW {
                continue;
            }
            let (dx, dy) = DIRECTIONS[dir as usize];
            let nx = (x as i32 + dx) as usize;
            let ny = (y as i32 + dy) as usize;
            graph.add_edge(nodes[i], nodes[ny * width + nx], ());
        }
    }

    // Спуск строго положительный, цикл невозможен; проверка на всякий случай
    let order = toposort(&graph, None).map_err(|_| FlowCycle)?;

    let mut accumulation = vec![1u32; n];
    for node in order {
        let i = node.index();
        let dir = flow_direction[i];
        if dir == NO_FLOW {
            continue;
        }
        let (dx, dy) = DIRECTIONS[dir as usize];
        let x = i % width;
        let y = i / width;
        let target = ((y as i32 + dy) as usize) * width + (x as i32 + dx) as usize;
        accumulation[target] += accumulation[i];
    }
    Ok(accumulation)
}

/// Родники: контакт проницаемой и водоупорной формаций, шум плюс бонус
/// за крутой склон, порог управляется обилием воды
fn place_springs(
    geology: &GeologyMap,
    topography: &TopographyMap,
    abundance: f32,
    seed: MapSeed,
) -> Vec<(usize, usize)> {
    let spring_noise = NoiseField::new(seed.noise_seed(layer::HYDROLOGY), 0.15);
    let threshold = SPRING_BASE_THRESHOLD / abundance;
    let slope_bonus = 0.1 * abundance;
    let width = geology.width;

    geology
        .transitions
        .iter()
        .copied()
        .filter(|&(x, y)| {
            let own = geology.tiles[y * width + x].formation;
            if !own.can_host_springs() {
                return false;
            }
            // Нужен водоупор по соседству
            let has_aquiclude = [(0i32, 1i32), (1, 0), (0, -1), (-1, 0)].iter().any(|&(dx, dy)| {
                let nx = x as i32 + dx;
                let ny = y as i32 + dy;
                nx >= 0
                    && nx < width as i32
                    && ny >= 0
                    && ny < geology.height as i32
                    && !geology.tiles[(ny as usize) * width + nx as usize]
                        .formation
                        .can_host_springs()
            });
            if !has_aquiclude {
                return false;
            }
            let mut probability = spring_noise.sample01(x as f32, y as f32);
            if topography.slope_at(x, y) > 15.0 {
                probability += slope_bonus;
            }
            probability > threshold
        })
        .collect()
}

fn compute_moisture(
    accumulation: &[u32],
    is_stream: &[bool],
    springs: &[(usize, usize)],
    context: &TacticalMapContext,
    width: usize,
) -> Vec<f32> {
    let wetness = context.hydrology_type.wetness();
    let max_acc = accumulation.iter().copied().max().unwrap_or(1).max(1) as f32;
    let mut moisture: Vec<f32> = accumulation
        .iter()
        .zip(is_stream)
        .map(|(&acc, &stream)| {
            let acc_term = (acc as f32).ln() / max_acc.ln().max(1.0);
            let stream_term = if stream { 0.2 } else { 0.0 };
            (wetness * 0.4 + acc_term * 0.4 + stream_term).clamp(0.0, 1.0)
        })
        .collect();
    for &(x, y) in springs {
        let i = y * width + x;
        moisture[i] = (moisture[i] + 0.2).min(1.0);
    }
    moisture
}

/// Вытягивает ломаные ручьёв: от каждого непосещённого тайла ручья идём по
/// направлению стока до выхода из ручья или уже посещённого тайла
fn extract_segments(
    is_stream: &[bool],
    stream_order: &[u8],
    flow_direction: &[i8],
    width: usize,
    height: usize,
) -> Vec<StreamSegment> {
    let mut visited = vec![false; width * height];
    let mut segments = Vec::new();

    for start in 0..width * height {
        if !is_stream[start] || visited[start] {
            continue;
        }
        let mut path = Vec::new();
        let mut max_order = 0u8;
        let mut current = start;
        loop {
            visited[current] = true;
            path.push((current % width, current / width));
            max_order = max_order.max(stream_order[current]);

            let dir = flow_direction[current];
            if dir == NO_FLOW {
                break;
            }
            let (dx, dy) = DIRECTIONS[dir as usize];
            let x = current % width;
            let y = current / width;
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || nx >= width as i32 || ny < 0 || ny >= height as i32 {
                break;
            }
            let next = (ny as usize) * width + nx as usize;
            if !is_stream[next] || visited[next] {
                break;
            }
            current = next;
        }
        segments.push(StreamSegment {
            path,
            width_ft: f32::from(max_order) * 2.0,
        });
    }
    segments
}

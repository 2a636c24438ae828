//! Обёртка над когерентным шумом
//!
//! Все слои берут шум отсюда, чтобы настройка `FastNoiseLite` (OpenSimplex2,
//! FBm) не расползалась по коду. Поле шума — чистая функция от (x, y):
//! после конструирования генератор не мутируется.

use fastnoise_lite::{FastNoiseLite, FractalType, NoiseType};

/// Когерентное шумовое поле, детерминированное по сиду
pub struct NoiseField {
    noise: FastNoiseLite,
}

impl NoiseField {
    /// Одно-октавный шум с заданной частотой
    #[must_use]
    pub fn new(seed: i32, frequency: f32) -> Self {
        let mut noise = FastNoiseLite::new();
        noise.set_seed(Some(seed));
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(frequency));
        Self { noise }
    }

    /// Фрактальный (FBm) шум: `octaves` октав с затуханием `persistence`
    #[must_use]
    pub fn fractal(seed: i32, frequency: f32, octaves: i32, persistence: f32) -> Self {
        let mut noise = FastNoiseLite::new();
        noise.set_seed(Some(seed));
        noise.set_noise_type(Some(NoiseType::OpenSimplex2));
        noise.set_frequency(Some(frequency));
        noise.set_fractal_type(Some(FractalType::FBm));
        noise.set_fractal_octaves(Some(octaves));
        noise.set_fractal_gain(Some(persistence));
        Self { noise }
    }

    /// Значение шума в точке, диапазон примерно [-1, 1]
    #[must_use]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        self.noise.get_noise_2d(x, y)
    }

    /// Значение шума, приведённое к [0, 1]
    #[must_use]
    pub fn sample01(&self, x: f32, y: f32) -> f32 {
        (self.noise.get_noise_2d(x, y) + 1.0) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_field() {
        let a = NoiseField::fractal(77, 0.05, 3, 0.5);
        let b = NoiseField::fractal(77, 0.05, 3, 0.5);
        for i in 0..50 {
            let x = i as f32 * 1.7;
            let y = i as f32 * 0.3;
            assert_eq!(a.sample(x, y), b.sample(x, y));
        }
    }

    #[test]
    fn different_seed_different_field() {
        let a = NoiseField::new(1, 0.05);
        let b = NoiseField::new(2, 0.05);
        let differs = (0..50).any(|i| {
            let x = i as f32 * 2.1;
            a.sample(x, 5.0) != b.sample(x, 5.0)
        });
        assert!(differs);
    }

    #[test]
    fn sample01_in_unit_range() {
        let field = NoiseField::fractal(9, 0.1, 4, 0.6);
        for i in 0..200 {
            let v = field.sample01(i as f32, (i * 3) as f32);
            assert!((0.0..=1.0).contains(&v));
        }
    }
}

//! Сид генерации и производные от него потоки случайности
//!
//! Один и тот же сид плюс одинаковые параметры обязаны давать побитово
//! идентичную карту. Поэтому:
//! - строковые сиды сворачиваются в u64 стабильным FNV-1a (не `DefaultHasher`,
//!   его результат не гарантирован между запусками);
//! - каждый слой получает собственный множитель, чтобы шумовые поля слоёв
//!   не коррелировали между собой;
//! - никакого fallback на системное время внутри ядра нет — отсутствие сида
//!   это забота вызывающего кода.

use serde::{Deserialize, Serialize};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Множители сида для слоёв (попарно различные, чтобы шумы не совпадали)
pub mod layer {
    pub const GEOLOGY: u64 = 2;
    pub const TOPOGRAPHY: u64 = 3;
    pub const HYDROLOGY: u64 = 5;
    pub const VEGETATION: u64 = 7;
    pub const STRUCTURES: u64 = 11;
    pub const FEATURES: u64 = 13;
    pub const CONTEXT: u64 = 17;
    pub const MIXING: u64 = 19;
}

/// Детерминированный сид карты
///
/// Создаётся из числа или произвольной строки ("лагерь-у-реки" — тоже сид).
/// В TOML принимает обе формы: `seed = 42` или `seed = "forest-42"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SeedRepr", into = "u64")]
pub struct MapSeed(u64);

impl MapSeed {
    #[must_use]
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Сворачивает строку в сид через FNV-1a
    #[must_use]
    pub fn from_phrase(phrase: &str) -> Self {
        let mut hash = FNV_OFFSET;
        for byte in phrase.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        Self(hash)
    }

    /// Стабильная числовая проекция сида
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    /// Сид для конкретного слоя (см. константы в [`layer`])
    #[must_use]
    pub fn layer_seed(self, multiplier: u64) -> u64 {
        self.0.wrapping_mul(multiplier)
    }

    /// Сид слоя в формате `FastNoiseLite` (усечение до i32 детерминировано)
    #[must_use]
    pub fn noise_seed(self, multiplier: u64) -> i32 {
        self.layer_seed(multiplier) as i32
    }
}

impl From<u64> for MapSeed {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<MapSeed> for u64 {
    fn from(seed: MapSeed) -> u64 {
        seed.value()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedRepr {
    Number(u64),
    Phrase(String),
}

impl From<SeedRepr> for MapSeed {
    fn from(repr: SeedRepr) -> Self {
        match repr {
            SeedRepr::Number(n) => MapSeed::from_u64(n),
            SeedRepr::Phrase(s) => MapSeed::from_phrase(&s),
        }
    }
}

//! Ошибки генерации
//!
//! Три категории:
//! - неверный вход (размеры, конфиг) — поднимается до запуска конвейера;
//! - отказ слоя — любая внутренняя ошибка оборачивается именем слоя,
//!   конвейер прерывается без частичного результата;
//! - мягкие предупреждения пост-валидации — не ошибки, прикладываются
//!   к результату (см. [`crate::generator::GenerationWarning`]).

use thiserror::Error;

use crate::config::{MAX_MAP_SIDE, MIN_MAP_SIDE};

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Размеры вне контрактного диапазона [10, 200]
    #[error(
        "недопустимые размеры карты {width}×{height}: обе стороны должны быть в диапазоне [{MIN_MAP_SIDE}, {MAX_MAP_SIDE}]"
    )]
    InvalidDimensions { width: usize, height: usize },

    /// Настроечный множитель вне контрактного диапазона
    #[error("параметр `{name}` = {value} вне диапазона [{min}, {max}]")]
    InvalidConfig {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    /// Отказ одного из слоёв конвейера; исходная причина сохраняется
    #[error("слой `{layer}` завершился с ошибкой: {source}")]
    LayerFailed {
        layer: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl GenerationError {
    /// Оборачивает произвольную ошибку слоя, сохраняя причину
    pub fn layer<E>(layer: &'static str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::LayerFailed {
            layer,
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_error_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "grid not populated");
        let err = GenerationError::layer("hydrology", cause);
        let text = err.to_string();
        assert!(text.contains("hydrology"));
        assert!(text.contains("grid not populated"));
    }
}

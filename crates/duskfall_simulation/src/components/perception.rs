//! Perception компоненты: параметры восприятия, last-known-position, quarry

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Параметры восприятия агента
///
/// Загружаются внешним setup кодом как static configuration.
/// `detection_half_angle_deg` используется только watcher-архетипом
/// (IsObservedBy: "на меня смотрят", не "я вижу") и может отличаться
/// от стандартного FOV.
#[derive(Component, Debug, Clone, Copy, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct PerceptionConfig {
    /// Дальность зрения (метры). Цель ровно на границе НЕ видима.
    pub sight_range: f32,
    /// Полуугол конуса зрения (градусы). Граница exclusive (анти-flicker).
    pub fov_half_angle_deg: f32,
    /// Высота глаз над позицией агента (метры)
    pub eye_height: f32,
    /// Полуугол "на меня смотрят" для watcher-архетипа (градусы)
    pub detection_half_angle_deg: f32,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            sight_range: 12.0,
            fov_half_angle_deg: 45.0,
            eye_height: 0.8, // eye-level как в LOS raycast'ах engine layer
            detection_half_angle_deg: 30.0,
        }
    }
}

/// Последняя подтверждённая позиция цели
///
/// Инвариант: Some всякий раз когда state ∈ {Search, Attack, Stunned,
/// Escalating}. Пишется только при успешном perception hit (или alert'ом
/// от другого агента), читается Search-навигацией.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct LastKnownTarget(pub Option<Vec3>);

/// Маркер: цель охоты (player)
///
/// Агенты опрашивают единственный Quarry entity. Отсутствие quarry —
/// documented failure mode: агенты деградируют до патруля, warning один раз.
#[derive(Component, Debug, Default, Reflect)]
#[reflect(Component)]
pub struct Quarry;

/// Resource: one-shot диагностика missing configuration
///
/// Условия (a) из error taxonomy репортим один раз, не каждый тик.
#[derive(Resource, Debug, Default)]
pub struct DiagnosticFlags {
    pub warned_missing_quarry: bool,
}

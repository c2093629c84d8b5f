//! Патрульные маршруты: WaypointPath (level-owned), PatrolAssignment

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Патрульный маршрут (компонент на path entity, принадлежит уровню)
///
/// Read-only shared: много агентов ссылаются на один path через
/// PatrolAssignment, никто не мутирует. Инвариант: non-empty когда агент
/// входит в Patrol; пустой path — documented failure mode (idle + warning).
#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaypointPath {
    pub points: Vec<Vec3>,
    pub looping: bool,
}

impl WaypointPath {
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points, looping: true }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Ближайшая точка маршрута к позиции (fallback для failed nav sample)
    pub fn nearest_point(&self, pos: Vec3) -> Option<Vec3> {
        self.points
            .iter()
            .copied()
            .min_by(|a, b| {
                a.distance_squared(pos)
                    .partial_cmp(&b.distance_squared(pos))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

/// Ссылка агента на патрульный маршрут (не владение)
#[derive(Component, Debug, Clone)]
pub struct PatrolAssignment {
    pub path: Entity,
    /// Warning про пустой маршрут выдаём один раз
    pub warned_empty: bool,
}

impl PatrolAssignment {
    pub fn new(path: Entity) -> Self {
        Self { path, warned_empty: false }
    }
}

//! Perception Module — line-of-sight тест агент→цель
//!
//! Чистая геометрия без side effects: distance gate → FOV gate → occlusion
//! probe. Физика/pathfinding живут во внешнем engine layer, поэтому probe
//! идёт по explicit StaticGeometry resource (AABB blockers), а не по
//! physics raycast.
//!
//! Правило occlusion как в engine-side LOS: видимость есть только если
//! первый hit вдоль probe — сама цель. Ничья (hit на равной дистанции) →
//! не видно (conservative, анти-flicker).

use bevy::prelude::*;

use crate::components::PerceptionConfig;

/// Результат perception-опроса (ephemeral, не персистится)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerceptionResult {
    pub visible: bool,
    /// Some только при visible — неподтверждённую позицию никто не читает
    pub target_position: Option<Vec3>,
}

impl PerceptionResult {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            target_position: None,
        }
    }

    pub fn seen(position: Vec3) -> Self {
        Self {
            visible: true,
            target_position: Some(position),
        }
    }
}

/// Solid blocker сцены (axis-aligned box)
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Slab-тест: дистанция до входа луча в box, если ближе max_dist
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<f32> {
        let inv = dir.recip();
        let t1 = (self.min - origin) * inv;
        let t2 = (self.max - origin) * inv;
        let t_enter = t1.min(t2).max_element().max(0.0);
        let t_exit = t1.max(t2).min_element();

        if t_enter <= t_exit && t_enter <= max_dist {
            Some(t_enter)
        } else {
            None
        }
    }
}

/// Статическая геометрия уровня (occlusion blockers)
///
/// Read-only, загружается внешним setup кодом вместе с waypoint данными.
#[derive(Resource, Debug, Clone, Default)]
pub struct StaticGeometry {
    pub obstacles: Vec<Aabb>,
}

impl StaticGeometry {
    pub fn new(obstacles: Vec<Aabb>) -> Self {
        Self { obstacles }
    }

    /// Ближайший hit вдоль луча (None = чисто)
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<f32> {
        self.obstacles
            .iter()
            .filter_map(|aabb| aabb.raycast(origin, dir, max_dist))
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// CanPerceive(observer, target) — может ли агент видеть цель
///
/// Контракт:
/// 1. distance ≥ sight_range → не видно (граница exclusive);
/// 2. угол forward↔(target − eye) ≥ FOV half-angle → не видно (exclusive);
/// 3. occlusion probe от eye к цели: любой hit на дистанции ≤ дистанции
///    до цели блокирует видимость (первый hit должен быть самой целью).
///
/// Без side effects — чистая функция состояния мира на момент вызова.
pub fn can_perceive(
    observer_pos: Vec3,
    observer_forward: Vec3,
    config: &PerceptionConfig,
    target: Vec3,
    geometry: &StaticGeometry,
) -> PerceptionResult {
    let eye = observer_pos + Vec3::Y * config.eye_height;
    let to_target = target - eye;
    let distance = to_target.length();

    if distance >= config.sight_range {
        return PerceptionResult::hidden();
    }

    // Цель вплотную — угол не определён, считаем видимой
    if distance <= f32::EPSILON {
        return PerceptionResult::seen(target);
    }

    let angle = observer_forward.angle_between(to_target);
    if angle >= config.fov_half_angle_deg.to_radians() {
        return PerceptionResult::hidden();
    }

    let dir = to_target / distance;
    if geometry.raycast(eye, dir, distance).is_some() {
        // Первый hit — не цель (ничья тоже блокирует)
        return PerceptionResult::hidden();
    }

    PerceptionResult::seen(target)
}

/// IsObservedBy(self, watcher) — смотрит ли watcher-цель на агента
///
/// Та же геометрия, но от forward вектора наблюдателя к self, с отдельным
/// detection half-angle ("на меня смотрят" ≠ "я вижу"). Использует
/// watcher-архетип для gate'а движения.
pub fn is_observed_by(
    self_pos: Vec3,
    watcher_pos: Vec3,
    watcher_forward: Vec3,
    config: &PerceptionConfig,
    geometry: &StaticGeometry,
) -> bool {
    let eye = watcher_pos + Vec3::Y * config.eye_height;
    let to_self = self_pos - eye;
    let distance = to_self.length();

    if distance >= config.sight_range {
        return false;
    }
    if distance <= f32::EPSILON {
        return true;
    }

    let angle = watcher_forward.angle_between(to_self);
    if angle >= config.detection_half_angle_deg.to_radians() {
        return false;
    }

    let dir = to_self / distance;
    geometry.raycast(eye, dir, distance).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PerceptionConfig {
        PerceptionConfig {
            sight_range: 10.0,
            fov_half_angle_deg: 45.0,
            eye_height: 0.0,
            detection_half_angle_deg: 30.0,
        }
    }

    #[test]
    fn test_visible_straight_ahead() {
        // Агент в (0,0,0) смотрит в +Z, цель в (0,0,5) — видно
        let result = can_perceive(
            Vec3::ZERO,
            Vec3::Z,
            &config(),
            Vec3::new(0.0, 0.0, 5.0),
            &StaticGeometry::default(),
        );
        assert!(result.visible);
        assert_eq!(result.target_position, Some(Vec3::new(0.0, 0.0, 5.0)));
    }

    #[test]
    fn test_not_visible_outside_fov() {
        // Цель в (10,0,0) — 90° от forward (+Z), вне конуса 45°
        let result = can_perceive(
            Vec3::ZERO,
            Vec3::Z,
            &config(),
            Vec3::new(10.0, 0.0, 0.0),
            &StaticGeometry::default(),
        );
        assert!(!result.visible);
        assert_eq!(result.target_position, None);
    }

    #[test]
    fn test_not_visible_beyond_range() {
        // За sight_range — не видно независимо от угла/occlusion
        let result = can_perceive(
            Vec3::ZERO,
            Vec3::Z,
            &config(),
            Vec3::new(0.0, 0.0, 15.0),
            &StaticGeometry::default(),
        );
        assert!(!result.visible);
    }

    #[test]
    fn test_range_boundary_exclusive() {
        // Ровно на границе sight_range — не видно (анти-flicker)
        let result = can_perceive(
            Vec3::ZERO,
            Vec3::Z,
            &config(),
            Vec3::new(0.0, 0.0, 10.0),
            &StaticGeometry::default(),
        );
        assert!(!result.visible);
    }

    #[test]
    fn test_fov_boundary_exclusive() {
        // Ровно на полуугле (90° конус, цель строго сбоку) — не видно
        let mut cfg = config();
        cfg.fov_half_angle_deg = 90.0;
        let result = can_perceive(
            Vec3::ZERO,
            Vec3::Z,
            &cfg,
            Vec3::new(5.0, 0.0, 0.0),
            &StaticGeometry::default(),
        );
        assert!(!result.visible);
    }

    #[test]
    fn test_occluded_by_wall() {
        // Стена строго между агентом и целью → не видно
        let wall = Aabb::from_center_half_extents(
            Vec3::new(0.0, 0.0, 2.5),
            Vec3::new(2.0, 2.0, 0.25),
        );
        let result = can_perceive(
            Vec3::ZERO,
            Vec3::Z,
            &config(),
            Vec3::new(0.0, 0.0, 5.0),
            &StaticGeometry::new(vec![wall]),
        );
        assert!(!result.visible);
    }

    #[test]
    fn test_wall_behind_target_does_not_block() {
        let wall = Aabb::from_center_half_extents(
            Vec3::new(0.0, 0.0, 8.0),
            Vec3::new(2.0, 2.0, 0.25),
        );
        let result = can_perceive(
            Vec3::ZERO,
            Vec3::Z,
            &config(),
            Vec3::new(0.0, 0.0, 5.0),
            &StaticGeometry::new(vec![wall]),
        );
        assert!(result.visible);
    }

    #[test]
    fn test_is_observed_by_within_detection_cone() {
        // Watcher смотрит в +Z, агент прямо перед ним → observed
        assert!(is_observed_by(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
            Vec3::Z,
            &config(),
            &StaticGeometry::default(),
        ));

        // Агент сбоку (90°) → не observed
        assert!(!is_observed_by(
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::ZERO,
            Vec3::Z,
            &config(),
            &StaticGeometry::default(),
        ));
    }

    #[test]
    fn test_is_observed_by_blocked_by_wall() {
        let wall = Aabb::from_center_half_extents(
            Vec3::new(0.0, 0.0, 2.5),
            Vec3::new(2.0, 2.0, 0.25),
        );
        assert!(!is_observed_by(
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
            Vec3::Z,
            &config(),
            &StaticGeometry::new(vec![wall]),
        ));
    }

    #[test]
    fn test_aabb_raycast_hit_distance() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 2.0), Vec3::new(1.0, 1.0, 3.0));
        let hit = aabb.raycast(Vec3::ZERO, Vec3::Z, 10.0);
        assert_eq!(hit, Some(2.0));

        // Мимо
        assert!(aabb.raycast(Vec3::new(5.0, 0.0, 0.0), Vec3::Z, 10.0).is_none());
        // Дальше max_dist
        assert!(aabb.raycast(Vec3::ZERO, Vec3::Z, 1.0).is_none());
    }
}

//! Navigation Adapter — seam к внешнему pathfinding
//!
//! Core выдаёт навигационные *цели* и читает обратно arrival/remaining
//! distance; внутренности pathfinding'а не наши. Трейт Navigator — граница:
//! engine layer подставляет свой navigation agent, headless симуляция и
//! тесты используют KinematicNavigator (прямолинейное движение без
//! обхода препятствий).

use bevy::prelude::*;

use crate::components::MovementSpeed;

/// Интерфейс навигационного агента (exclusively owned per agent)
pub trait Navigator: Send + Sync {
    /// Запросить движение к позиции
    fn request_move(&mut self, target: Vec3);

    /// Остановить движение (сбросить текущую цель)
    fn stop(&mut self);

    /// Путь ещё строится (remaining_distance пока недостоверен)
    fn is_path_pending(&self) -> bool;

    /// Остаток пути до цели (0.0 если цели нет)
    fn remaining_distance(&self, current: Vec3) -> f32;

    /// Мгновенная релокация в обход pathing'а
    fn warp(&mut self, transform: &mut Transform, position: Vec3);

    /// Ближайшая navigable точка возле позиции (None = рядом нет)
    fn sample_navigable_point_near(&self, position: Vec3, radius: f32) -> Option<Vec3>;

    /// Per-tick интеграция движения (вызывается drive_navigation)
    fn advance(&mut self, transform: &mut Transform, speed: f32, delta: f32);
}

/// Навигационный handle агента (boxed adapter instance)
#[derive(Component)]
pub struct NavHandle(pub Box<dyn Navigator>);

impl NavHandle {
    pub fn kinematic() -> Self {
        Self(Box::new(KinematicNavigator::default()))
    }

    pub fn kinematic_bounded(walkable: WalkableRect) -> Self {
        Self(Box::new(KinematicNavigator {
            walkable: Some(walkable),
            ..Default::default()
        }))
    }
}

/// Проходимая зона уровня в плоскости XZ (для sample-запросов)
#[derive(Debug, Clone, Copy)]
pub struct WalkableRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl WalkableRect {
    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.z >= self.min.y && p.z <= self.max.y
    }

    pub fn clamp(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y,
            p.z.clamp(self.min.y, self.max.y),
        )
    }
}

/// Headless-реализация: прямолинейное движение к цели
///
/// Path pending один тик после request_move (имитация расчёта пути),
/// затем advance двигает Transform по прямой. Малое смещение цели —
/// коррекция курса без пересчёта: преследование движущейся цели не должно
/// стоять в вечном pending. Без walkable bounds sample-запрос возвращает
/// позицию как есть.
pub struct KinematicNavigator {
    target: Option<Vec3>,
    pending: bool,
    pub walkable: Option<WalkableRect>,
}

/// Смещение цели, в пределах которого курс корректируется без пересчёта пути
const RETARGET_EPSILON: f32 = 0.5;

impl Default for KinematicNavigator {
    fn default() -> Self {
        Self {
            target: None,
            pending: false,
            walkable: None,
        }
    }
}

impl Navigator for KinematicNavigator {
    fn request_move(&mut self, target: Vec3) {
        match self.target {
            // Цель та же или сместилась чуть-чуть — правим курс, путь не пересчитываем
            Some(current) if current.distance(target) <= RETARGET_EPSILON => {
                self.target = Some(target);
            }
            _ => {
                self.target = Some(target);
                self.pending = true;
            }
        }
    }

    fn stop(&mut self) {
        self.target = None;
        self.pending = false;
    }

    fn is_path_pending(&self) -> bool {
        self.pending
    }

    fn remaining_distance(&self, current: Vec3) -> f32 {
        match self.target {
            // Пока путь строится remaining недостоверен — репортим "далеко"
            Some(_) if self.pending => f32::MAX,
            Some(target) => current.distance(target),
            None => 0.0,
        }
    }

    fn warp(&mut self, transform: &mut Transform, position: Vec3) {
        transform.translation = position;
        self.target = None;
        self.pending = false;
    }

    fn sample_navigable_point_near(&self, position: Vec3, radius: f32) -> Option<Vec3> {
        match self.walkable {
            None => Some(position),
            Some(rect) => {
                let clamped = rect.clamp(position);
                if clamped.distance(position) <= radius {
                    Some(clamped)
                } else {
                    None
                }
            }
        }
    }

    fn advance(&mut self, transform: &mut Transform, speed: f32, delta: f32) {
        if self.pending {
            // Один тик на "расчёт пути"
            self.pending = false;
            return;
        }
        let Some(target) = self.target else {
            return;
        };

        let to_target = target - transform.translation;
        let distance = to_target.length();
        let step = speed * delta;

        if distance <= step {
            transform.translation = target;
        } else {
            transform.translation += to_target / distance * step;
        }
    }
}

/// Повернуть агента лицом к точке (yaw-only, вокруг Y)
pub fn face_towards(transform: &mut Transform, point: Vec3) {
    let mut dir = point - transform.translation;
    dir.y = 0.0;
    if dir.length_squared() > 1e-6 {
        transform.look_to(dir.normalize(), Vec3::Y);
    }
}

/// Система: per-tick интеграция движения всех агентов
///
/// speed = base × multiplier (enrage бафф учитывается здесь)
pub fn drive_navigation(
    mut agents: Query<(&mut NavHandle, &MovementSpeed, &mut Transform)>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (mut nav, speed, mut transform) in agents.iter_mut() {
        nav.0.advance(&mut transform, speed.effective(), delta);
    }
}

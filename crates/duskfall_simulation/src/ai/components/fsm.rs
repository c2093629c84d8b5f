//! FSM components стандартного архетипа ("sentinel"): state, config,
//! escalation record, teleport history.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Ёмкость teleport history (bounded ring buffer)
pub const TELEPORT_HISTORY_CAP: usize = 5;

/// Sentinel FSM состояния (tagged union, per-state таймеры внутри вариантов)
///
/// Переходы считаются каждый тик из (текущее состояние, inputs) → новое
/// значение состояния; state не держит back-reference на агента.
#[derive(Component, Debug, Clone, PartialEq)]
pub enum SentinelState {
    /// Patrol — начальное состояние, обход waypoint'ов
    Patrol {
        /// Индекс текущего waypoint'а в маршруте
        waypoint: usize,
        /// Фактическая цель навигации (waypoint + случайный planar offset)
        nav_target: Option<Vec3>,
        /// Some = пауза на точке (look sweep)
        dwell: Option<Dwell>,
        /// Время с запроса точки (anti-deadlock: stuck → принудительный advance)
        travel_time: f32,
    },

    /// Attack — цель подтверждена, ranged-атаки по cooldown'у
    Attack {
        /// Непрерывное время с первого обнаружения (telegraph delay)
        spotted_for: f32,
        /// Остаток cooldown'а до следующего выстрела
        cooldown: f32,
    },

    /// Search — идём к last-known-position, затем look-around
    Search {
        /// Суммарное время поиска
        elapsed: f32,
        /// Some = look-around фаза на точке
        look_around: Option<Dwell>,
    },

    /// Stunned — только от внешнего "hit" события, не от perception
    Stunned {
        elapsed: f32,
        /// Позиция агрессора (разворачиваемся к нему)
        aggressor: Vec3,
    },

    /// Escalation subroutine: teleport burst → return-and-enrage
    Escalating { record: EscalationRecord },

    /// Терминальное состояние (смерть агента)
    Dead,
}

impl Default for SentinelState {
    fn default() -> Self {
        Self::Patrol {
            waypoint: 0,
            nav_target: None,
            dwell: None,
            travel_time: 0.0,
        }
    }
}

/// Пауза на точке с маятниковым look sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dwell {
    pub elapsed: f32,
    /// Yaw на момент входа в паузу (sweep качается вокруг него)
    pub base_yaw: f32,
}

impl Dwell {
    pub fn new(base_yaw: f32) -> Self {
        Self {
            elapsed: 0.0,
            base_yaw,
        }
    }
}

/// Фазы escalation subroutine
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationPhase {
    /// Телепорты к/за агрессора по фиксированному интервалу
    TeleportBurst,
    /// Опциональный loop mode: реплей записанных позиций (без новых расчётов)
    Replay { elapsed: f32, cursor: usize },
    /// Возврат на pre-stun позицию + enrage
    Return,
}

/// Состояние escalation subroutine (живёт внутри Escalating, дропается на выходе)
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationRecord {
    pub phase: EscalationPhase,
    /// Таймер до следующего телепорта/шага реплея
    pub interval_timer: f32,
    pub teleports_done: u32,
    /// Последние позиции телепортов (bounded, ≤ 5)
    pub history: TeleportHistory,
    /// Pre-stun позиция (Return релоцирует сюда)
    pub original_position: Vec3,
    pub aggressor: Vec3,
}

impl EscalationRecord {
    pub fn new(original_position: Vec3, aggressor: Vec3) -> Self {
        Self {
            phase: EscalationPhase::TeleportBurst,
            interval_timer: 0.0,
            teleports_done: 0,
            history: TeleportHistory::default(),
            original_position,
            aggressor,
        }
    }
}

/// Bounded ring buffer позиций телепортов (последние 5)
///
/// push поверх заполненного буфера перезаписывает самую старую позицию;
/// итерация — oldest → newest (порядок реплея).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeleportHistory {
    slots: Vec<Vec3>,
    head: usize,
}

impl TeleportHistory {
    pub fn push(&mut self, position: Vec3) {
        if self.slots.len() < TELEPORT_HISTORY_CAP {
            self.slots.push(position);
        } else {
            self.slots[self.head] = position;
            self.head = (self.head + 1) % TELEPORT_HISTORY_CAP;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// i-я позиция в порядке oldest → newest
    pub fn get(&self, i: usize) -> Option<Vec3> {
        if i >= self.slots.len() {
            return None;
        }
        Some(self.slots[(self.head + i) % self.slots.len()])
    }
}

/// Tuning-константы sentinel-архетипа
///
/// Всё — configuration constants, ничего не derived. Загружаются внешним
/// setup кодом как static configuration.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Пауза на waypoint'е (секунды)
    pub pause_duration: f32,
    /// Амплитуда look sweep (градусы от base yaw)
    pub look_angle_deg: f32,
    /// Скорость sweep-маятника (рад/сек аргумента синуса)
    pub sweep_speed: f32,
    /// Застряли дольше pause_duration + stuck_threshold → принудительный advance
    pub stuck_threshold: f32,
    /// Вероятность последовательного выбора следующего waypoint'а (~0.7)
    pub sequential_chance: f32,
    /// Радиус случайного planar offset у waypoint'а (анти-"хождение строем")
    pub waypoint_offset_radius: f32,
    /// Эпсилон прибытия (remaining distance ≤ eps = пришли)
    pub arrive_epsilon: f32,
    /// Дальность ranged-атаки
    pub attack_range: f32,
    /// Cooldown между выстрелами (сбрасывается каждым выстрелом)
    pub attack_cooldown: f32,
    /// "Telegraph" задержка перед первым выстрелом после обнаружения
    pub telegraph_delay: f32,
    pub attack_damage: u32,
    /// Максимальное суммарное время Search
    pub search_duration: f32,
    /// Длительность look-around фазы Search
    pub look_around_duration: f32,
    /// Время стана до входа в escalation
    pub stun_duration: f32,
    /// Задержка спавна "эскорта" после обнаружения
    pub escort_delay: f32,
    pub escort_count: u32,
    /// Радиус alert-рассылки при входе в Attack
    pub alert_radius: f32,
    /// Интервал телепортов в burst-фазе
    pub teleport_interval: f32,
    /// Число телепортов burst-фазы
    pub teleport_count: u32,
    /// Границы случайной дистанции телепорта (к/за агрессора)
    pub teleport_min_distance: f32,
    pub teleport_max_distance: f32,
    /// Радиус "столкновения" с агрессором (триггер replay loop)
    pub collision_radius: f32,
    /// Максимальная длительность replay loop
    pub replay_duration: f32,
    /// Множитель скорости после Return (сброс на следующем stun-цикле)
    pub enrage_speed_multiplier: f32,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            pause_duration: 2.0,
            look_angle_deg: 60.0,
            sweep_speed: 2.0,
            stuck_threshold: 4.0,
            sequential_chance: 0.7,
            waypoint_offset_radius: 0.75,
            arrive_epsilon: 0.35,
            attack_range: 9.0,
            attack_cooldown: 1.2,
            telegraph_delay: 0.6,
            attack_damage: 10,
            search_duration: 8.0,
            look_around_duration: 3.0,
            stun_duration: 2.0,
            escort_delay: 1.5,
            escort_count: 2,
            alert_radius: 15.0,
            teleport_interval: 0.5,
            teleport_count: 5,
            teleport_min_distance: 2.0,
            teleport_max_distance: 6.0,
            collision_radius: 1.0,
            replay_duration: 2.5,
            enrage_speed_multiplier: 2.0,
        }
    }
}

/// Отложенный спавн эскорта (deadline на агенте, проверяется каждый тик)
///
/// Явный timestamp вместо suspended-корутины: компонент вешается при входе
/// в Attack, system тикает remaining и шлёт EscortSpawned.
#[derive(Component, Debug, Clone)]
pub struct EscortCall {
    pub remaining: f32,
    pub position: Vec3,
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teleport_history_bounded() {
        let mut history = TeleportHistory::default();
        for i in 0..20 {
            history.push(Vec3::splat(i as f32));
            assert!(history.len() <= TELEPORT_HISTORY_CAP);
        }
        assert_eq!(history.len(), TELEPORT_HISTORY_CAP);
    }

    #[test]
    fn test_teleport_history_keeps_newest_in_order() {
        let mut history = TeleportHistory::default();
        for i in 0..7 {
            history.push(Vec3::splat(i as f32));
        }
        // Остались 2..=6, oldest → newest
        for (i, expected) in (2..7).enumerate() {
            assert_eq!(history.get(i), Some(Vec3::splat(expected as f32)));
        }
        assert_eq!(history.get(5), None);
    }

    #[test]
    fn test_sentinel_state_default_is_patrol() {
        assert!(matches!(
            SentinelState::default(),
            SentinelState::Patrol { waypoint: 0, .. }
        ));
    }

    #[test]
    fn test_escalation_record_new() {
        let record = EscalationRecord::new(Vec3::ONE, Vec3::ZERO);
        assert_eq!(record.phase, EscalationPhase::TeleportBurst);
        assert_eq!(record.teleports_done, 0);
        assert!(record.history.is_empty());
        assert_eq!(record.original_position, Vec3::ONE);
    }
}

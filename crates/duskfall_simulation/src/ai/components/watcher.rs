//! Watcher-архетип (reactive observer): движение gate'ится тем, смотрит ли
//! на него цель. Свои sub-состояния enrage/vanish/loop.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::fsm::TeleportHistory;

/// Состояния watcher-архетипа
///
/// В отличие от sentinel'а у watcher'а нет Patrol/Search: он либо крадётся
/// к цели пока на него не смотрят, либо (после удара) телепортируется.
#[derive(Component, Debug, Clone, PartialEq)]
pub enum WatcherState {
    /// Движется к цели только пока НЕ observed; замирает под взглядом
    Stalk,

    /// Enrage после удара: телепорты к цели по фиксированному интервалу
    Enraged {
        /// Таймер до следующего телепорта
        interval_timer: f32,
        /// Последние позиции телепортов (реплей для Loop)
        history: TeleportHistory,
    },

    /// Исчез: унесён далеко от цели, скрыт, реаппир за её спиной
    Vanish {
        hidden_for: f32,
        history: TeleportHistory,
    },

    /// Loop mode: реплей последних телепортов после столкновения с целью
    Loop {
        elapsed: f32,
        /// Таймер до следующего шага реплея
        step_timer: f32,
        cursor: usize,
        history: TeleportHistory,
    },

    /// Терминальное состояние
    Dead,
}

impl Default for WatcherState {
    fn default() -> Self {
        Self::Stalk
    }
}

/// Tuning-константы watcher-архетипа
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Интервал телепортов в Enraged
    pub teleport_interval: f32,
    /// Минимальная дистанция до цели после телепорта
    pub min_distance: f32,
    /// Вероятность уйти в Vanish на каждом телепорте
    pub vanish_chance: f32,
    /// Насколько далеко уносит при Vanish
    pub vanish_far_distance: f32,
    /// Задержка до реаппира
    pub vanish_delay: f32,
    /// Дистанция реаппира за спиной цели
    pub reappear_behind_distance: f32,
    /// Радиус "столкновения" с целью (триггер Loop)
    pub collision_radius: f32,
    /// Максимальная длительность Loop-реплея
    pub loop_duration: f32,
    /// Скорость easing'а distortion intensity (1/сек)
    pub distortion_ease_rate: f32,
    /// Секунды непрерывного наблюдения до intensity target = 1.0
    pub observation_ramp: f32,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            teleport_interval: 0.8,
            min_distance: 2.5,
            vanish_chance: 0.15,
            vanish_far_distance: 30.0,
            vanish_delay: 2.0,
            reappear_behind_distance: 3.0,
            collision_radius: 1.2,
            loop_duration: 2.0,
            distortion_ease_rate: 4.0,
            observation_ramp: 5.0,
        }
    }
}

/// Косметический distortion (external-effect state, другие системы не читают)
///
/// observed_time копится пока на watcher'а смотрят; intensity (0..1)
/// ease'ится к target каждый тик. Effects layer читает intensity.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Distortion {
    pub observed_time: f32,
    pub intensity: f32,
}

/// Маркер: watcher скрыт (Vanish). Effects layer гасит визуал.
#[derive(Component, Debug, Default)]
pub struct Hidden;

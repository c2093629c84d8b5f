//! Базовые компоненты агентов: Agent, Health, MovementSpeed

use bevy::prelude::*;

/// Враждебный агент — базовый компонент для всех hostile entities
///
/// `id` — stable ID для AgentRegistry (alert network ссылается на агентов
/// по id, не по глобальным scene-запросам).
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Agent {
    pub id: u32,
}

/// Здоровье агента
///
/// Инвариант: 0 ≤ current ≤ max
#[derive(Component, Debug, Clone, Copy, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.current = self.current.saturating_sub(amount);
    }
}

/// Скорость движения агента (метры/сек)
///
/// `multiplier` — временный бафф (enrage после escalation ставит 2.0).
/// Явное поле вместо runtime-патчинга скорости: баффы пишут и сбрасывают
/// его напрямую. Сброс происходит только на следующем stun-цикле.
#[derive(Component, Clone, Copy, Debug, Reflect)]
#[reflect(Component)]
pub struct MovementSpeed {
    pub base: f32,
    pub multiplier: f32,
}

impl Default for MovementSpeed {
    fn default() -> Self {
        Self {
            base: 2.0, // 2 m/s — базовая скорость ходьбы
            multiplier: 1.0,
        }
    }
}

impl MovementSpeed {
    pub fn new(base: f32) -> Self {
        Self { base, multiplier: 1.0 }
    }

    pub fn effective(&self) -> f32 {
        self.base * self.multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage() {
        let mut health = Health::new(100);
        assert_eq!(health.current, 100);

        health.take_damage(30);
        assert_eq!(health.current, 70);
        assert!(health.is_alive());

        health.take_damage(100); // Saturating sub
        assert_eq!(health.current, 0);
        assert!(!health.is_alive());
    }

    #[test]
    fn test_movement_speed_multiplier() {
        let mut speed = MovementSpeed::new(2.0);
        assert_eq!(speed.effective(), 2.0);

        speed.multiplier = 2.0; // enrage buff
        assert_eq!(speed.effective(), 4.0);

        speed.multiplier = 1.0; // сброс на следующем stun-цикле
        assert_eq!(speed.effective(), 2.0);
    }
}

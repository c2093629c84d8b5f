//! AI Events — входящие уведомления и fire-and-forget эффекты
//!
//! Входящее: AgentHit от damage/health системы (единственный триггер
//! Stunned/Enraged). Исходящие события — чистые нотификации для effects
//! layer (звук, VFX, спавны), состояние engine'а они не меняют.
//! AlertEvent — внутренний: пишется FSM'ом, потребляется alert network'ом
//! в том же тике.

use bevy::prelude::*;

/// Входящее: агента ударили (от damage системы)
///
/// Несёт позицию агрессора — sentinel уходит в Stunned, watcher в Enraged.
#[derive(Event, Debug, Clone)]
pub struct AgentHit {
    pub target: Entity,
    pub aggressor_position: Vec3,
    pub damage: u32,
}

/// Внутреннее: detection event для alert network
///
/// Создаётся при переходе в Attack из не-Attack состояния, потребляется
/// broadcast'ом синхронно в том же тике, никогда не хранится.
#[derive(Event, Debug, Clone)]
pub struct AlertEvent {
    pub source: Entity,
    pub last_known: Vec3,
    pub radius: f32,
}

/// Эффект: агент вошёл в Attack (spotted-sound cue)
#[derive(Event, Debug, Clone)]
pub struct AttackEngaged {
    pub agent: Entity,
    pub position: Vec3,
}

/// Эффект: ranged-атака (projectile спавнит внешний layer)
#[derive(Event, Debug, Clone)]
pub struct RangedAttackFired {
    pub agent: Entity,
    pub origin: Vec3,
    pub direction: Vec3,
    pub damage: u32,
}

/// Эффект: агент вошёл в Search (search-sound cue)
#[derive(Event, Debug, Clone)]
pub struct SearchStarted {
    pub agent: Entity,
    pub position: Vec3,
}

/// Эффект: агент умер (death-effect спавн)
#[derive(Event, Debug, Clone)]
pub struct AgentDied {
    pub agent: Entity,
    pub position: Vec3,
}

/// Эффект: телепорт (flicker/sound cue)
#[derive(Event, Debug, Clone)]
pub struct AgentTeleported {
    pub agent: Entity,
    pub from: Vec3,
    pub to: Vec3,
}

/// Эффект: спавн эскорта (отложенный после обнаружения)
#[derive(Event, Debug, Clone)]
pub struct EscortSpawned {
    pub position: Vec3,
    pub count: u32,
}

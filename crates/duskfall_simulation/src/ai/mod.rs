//! AI decision-making module
//!
//! Два архетипа: sentinel (Patrol/Attack/Search/Stunned + escalation) и
//! watcher (Stalk/Enraged/Vanish/Loop, движение gate'ится взглядом цели).
//! Alert network связывает sentinel'ов через AgentRegistry.

use bevy::prelude::*;

pub mod components;
pub mod events;
pub mod systems;

// Re-export основных типов
pub use components::{
    Distortion, EscalationPhase, EscalationRecord, EscortCall, Hidden, SentinelConfig,
    SentinelState, TeleportHistory, WatcherConfig, WatcherState, TELEPORT_HISTORY_CAP,
};
pub use events::{
    AgentDied, AgentHit, AgentTeleported, AlertEvent, AttackEngaged, EscortSpawned,
    RangedAttackFired, SearchStarted,
};
pub use systems::AgentRegistry;

use crate::components::DiagnosticFlags;
use crate::navigation::drive_navigation;
use crate::perception::StaticGeometry;

/// AI Plugin
///
/// Все системы в FixedUpdate, chained для детерминизма. Порядок:
/// 1. register_agents — новые агенты в реестр
/// 2. react_to_hits / handle_agent_death / process_escort_calls — внешние входы
/// 3. sentinel_fsm_transitions / watcher_fsm_transitions — решения
/// 4. broadcast_alerts — fan-out алертов этого тика
/// 5. movement_from_state / drive_navigation — ориентация и позиция
/// 6. update_distortion — косметика
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AgentHit>()
            .add_event::<AlertEvent>()
            .add_event::<AttackEngaged>()
            .add_event::<RangedAttackFired>()
            .add_event::<SearchStarted>()
            .add_event::<AgentDied>()
            .add_event::<AgentTeleported>()
            .add_event::<EscortSpawned>()
            .init_resource::<AgentRegistry>()
            .init_resource::<DiagnosticFlags>()
            .init_resource::<StaticGeometry>()
            .add_systems(
                FixedUpdate,
                (
                    systems::register_agents,
                    systems::react_to_hits,
                    systems::handle_agent_death,
                    systems::process_escort_calls,
                    systems::sentinel_fsm_transitions,
                    systems::watcher_fsm_transitions,
                    systems::broadcast_alerts,
                    systems::movement_from_state,
                    drive_navigation,
                    systems::update_distortion,
                )
                    .chain(), // Последовательное выполнение для детерминизма
            );
    }
}

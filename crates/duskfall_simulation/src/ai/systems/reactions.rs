//! Реакции на внешние события: удары, смерть, escort-дедлайны
//!
//! AgentHit — единственный вход damage-пайплайна в движок: sentinel уходит
//! в Stunned, watcher в Enraged. Смерть ловим по Changed<Health>, чтобы
//! внешние источники урона (не только AgentHit) тоже закрывали агента.

use bevy::prelude::*;

use crate::ai::components::{
    EscortCall, SentinelState, TeleportHistory, WatcherState,
};
use crate::ai::events::{AgentDied, AgentHit, EscortSpawned};
use crate::ai::systems::alert::AgentRegistry;
use crate::components::{Agent, Health, LastKnownTarget, MovementSpeed};
use crate::navigation::NavHandle;

/// Система: обработка AgentHit
///
/// Sentinel: любое прерываемое состояние → Stunned (не прерываемы сам
/// Stunned, Escalating и Dead). Enrage-скорость сбрасывается — новый
/// stun-цикл начинается с чистого листа. Watcher: Stalk → Enraged,
/// в остальных состояниях удар игнорируется.
pub fn react_to_hits(
    mut hits: EventReader<AgentHit>,
    mut health: Query<&mut Health>,
    mut sentinels: Query<(
        &mut SentinelState,
        &mut LastKnownTarget,
        &mut NavHandle,
        &mut MovementSpeed,
    )>,
    mut watchers: Query<&mut WatcherState>,
) {
    for hit in hits.read() {
        if let Ok(mut hp) = health.get_mut(hit.target) {
            hp.take_damage(hit.damage);
        }

        if let Ok((mut state, mut last_known, mut nav, mut speed)) =
            sentinels.get_mut(hit.target)
        {
            match state.as_ref() {
                SentinelState::Dead
                | SentinelState::Stunned { .. }
                | SentinelState::Escalating { .. } => {}
                _ => {
                    last_known.0 = Some(hit.aggressor_position);
                    speed.multiplier = 1.0;
                    nav.0.stop();
                    crate::logger::log(&format!("💫 {:?} hit → Stunned", hit.target));
                    *state = SentinelState::Stunned {
                        elapsed: 0.0,
                        aggressor: hit.aggressor_position,
                    };
                }
            }
            continue;
        }

        if let Ok(mut state) = watchers.get_mut(hit.target) {
            if *state == WatcherState::Stalk {
                crate::logger::log(&format!("😡 {:?} watcher hit → Enraged", hit.target));
                *state = WatcherState::Enraged {
                    interval_timer: 0.0,
                    history: TeleportHistory::default(),
                };
            }
        }
    }
}

/// Система: смерть агентов (Changed<Health>)
///
/// Терминальный переход: состояние → Dead, навигация стоп, отложенный
/// эскорт отменяется, запись из реестра удаляется.
pub fn handle_agent_death(
    mut commands: Commands,
    mut registry: ResMut<AgentRegistry>,
    mut agents: Query<
        (
            Entity,
            &Agent,
            &Health,
            &Transform,
            Option<&mut SentinelState>,
            Option<&mut WatcherState>,
            Option<&mut NavHandle>,
        ),
        Changed<Health>,
    >,
    mut deaths: EventWriter<AgentDied>,
) {
    for (entity, agent, hp, transform, sentinel, watcher, nav) in agents.iter_mut() {
        if hp.is_alive() {
            continue;
        }

        let already_dead = matches!(sentinel.as_deref(), Some(SentinelState::Dead))
            || matches!(watcher.as_deref(), Some(WatcherState::Dead));
        if already_dead {
            continue;
        }

        if let Some(mut state) = sentinel {
            *state = SentinelState::Dead;
        }
        if let Some(mut state) = watcher {
            *state = WatcherState::Dead;
        }
        if let Some(mut nav) = nav {
            nav.0.stop();
        }

        commands.entity(entity).remove::<EscortCall>();
        registry.remove(agent.id);
        deaths.write(AgentDied {
            agent: entity,
            position: transform.translation,
        });
        crate::logger::log(&format!("💀 agent {} погиб ({:?})", agent.id, entity));
    }
}

/// Система: тикает escort-дедлайны и шлёт EscortSpawned
///
/// Спавн самого эскорта — забота внешнего layer'а; движок только
/// сигнализирует позицию и количество.
pub fn process_escort_calls(
    mut commands: Commands,
    mut calls: Query<(Entity, &mut EscortCall)>,
    time: Res<Time<Fixed>>,
    mut escorts: EventWriter<EscortSpawned>,
) {
    let delta = time.delta_secs();
    for (entity, mut call) in calls.iter_mut() {
        call.remaining -= delta;
        if call.remaining <= 0.0 {
            escorts.write(EscortSpawned {
                position: call.position,
                count: call.count,
            });
            commands.entity(entity).remove::<EscortCall>();
            crate::logger::log(&format!(
                "🚨 escort call: {} подкреплений к {:?}",
                call.count, call.position
            ));
        }
    }
}

//! Alert network: fan-out обнаружения по соседним агентам
//!
//! Реестр агентов инжектится как ресурс — broadcast не сканирует мир.
//! AlertEvent пишется FSM'ом и потребляется здесь в том же тике; получатели
//! меняют состояние сейчас, но их FSM отреагирует на следующем тике
//! (латентность распространения — один тик).

use bevy::prelude::*;
use std::collections::HashMap;

use crate::ai::components::SentinelState;
use crate::ai::events::{AlertEvent, SearchStarted};
use crate::components::{Agent, LastKnownTarget};

/// Реестр живых агентов: stable id → Entity
///
/// Заполняется при спавне, чистится при смерти. Broadcast и внешние
/// команды ссылаются на агентов только через него.
#[derive(Resource, Debug, Default)]
pub struct AgentRegistry {
    agents: HashMap<u32, Entity>,
}

impl AgentRegistry {
    pub fn insert(&mut self, id: u32, entity: Entity) {
        if let Some(previous) = self.agents.insert(id, entity) {
            if previous != entity {
                crate::logger::log_warning(&format!(
                    "registry: id {} переиспользован ({:?} → {:?})",
                    id, previous, entity
                ));
            }
        }
    }

    pub fn remove(&mut self, id: u32) {
        self.agents.remove(&id);
    }

    pub fn get(&self, id: u32) -> Option<Entity> {
        self.agents.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.agents.values().copied()
    }
}

/// Система: регистрация новых агентов в реестре
pub fn register_agents(
    mut registry: ResMut<AgentRegistry>,
    spawned: Query<(Entity, &Agent), Added<Agent>>,
) {
    for (entity, agent) in spawned.iter() {
        registry.insert(agent.id, entity);
        crate::logger::log(&format!("📋 agent {} зарегистрирован ({:?})", agent.id, entity));
    }
}

/// Система: broadcast алертов по радиусу
///
/// Получатели: sentinel'ы в Patrol или Search. Attack не понижаем до
/// Search, Stunned/Escalating не прерываемы, Dead терминален. Алерт по
/// уже ищущему агенту перезапускает поиск (fresh Search, таймеры в ноль);
/// SearchStarted звучит только на Patrol → Search. Идемпотентно в пределах
/// тика: повторный broadcast оставляет получателя в том же fresh Search.
pub fn broadcast_alerts(
    mut alerts: EventReader<AlertEvent>,
    registry: Res<AgentRegistry>,
    mut recipients: Query<(&Transform, &mut SentinelState, &mut LastKnownTarget)>,
    mut searches: EventWriter<SearchStarted>,
) {
    for alert in alerts.read() {
        let Ok((source_transform, _, _)) = recipients.get(alert.source) else {
            continue;
        };
        let origin = source_transform.translation;

        for entity in registry.entities() {
            if entity == alert.source {
                continue;
            }
            let Ok((transform, mut state, mut last_known)) = recipients.get_mut(entity) else {
                continue; // watcher'ы и прочие вне sentinel-сети
            };
            if transform.translation.distance(origin) > alert.radius {
                continue;
            }

            match state.as_ref() {
                SentinelState::Patrol { .. } | SentinelState::Search { .. } => {
                    let from_patrol = matches!(state.as_ref(), SentinelState::Patrol { .. });
                    last_known.0 = Some(alert.last_known);
                    *state = SentinelState::Search {
                        elapsed: 0.0,
                        look_around: None,
                    };
                    if from_patrol {
                        searches.write(SearchStarted {
                            agent: entity,
                            position: transform.translation,
                        });
                        crate::logger::log(&format!("📢 {:?} alerted → Search", entity));
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_insert_remove() {
        let mut registry = AgentRegistry::default();
        registry.insert(1, Entity::PLACEHOLDER);
        assert_eq!(registry.get(1), Some(Entity::PLACEHOLDER));
        assert_eq!(registry.len(), 1);

        registry.remove(1);
        assert!(registry.is_empty());
        assert_eq!(registry.get(1), None);
    }
}

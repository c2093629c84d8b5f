//! Escalation subroutine: teleport burst → (опциональный replay) → return.
//!
//! Входит из Stunned по таймауту. Burst: телепорты к/за агрессора по
//! фиксированному интервалу, позиции пишутся в bounded ring buffer.
//! Столкновение с агрессором во время burst'а включает loop mode — реплей
//! записанных позиций без новых расчётов. Return: релокация на pre-stun
//! позицию, Attack с удвоенной скоростью (сброс только на следующем
//! stun-цикле).

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::ai::components::{EscalationPhase, EscalationRecord, SentinelConfig, SentinelState};
use crate::ai::events::AgentTeleported;
use crate::components::MovementSpeed;
use crate::navigation::{face_towards, Navigator};

/// Радиус snap-запроса к navigable точке возле raw-цели телепорта
const NAV_SNAP_RADIUS: f32 = 1.5;

/// Один тик escalation subroutine.
///
/// Возвращает Some(next) при выходе из сабрутины (Return → Attack),
/// None — остаёмся в Escalating с обновлённым record'ом.
#[allow(clippy::too_many_arguments)]
pub fn step_escalation(
    entity: Entity,
    record: &mut EscalationRecord,
    delta: f32,
    config: &SentinelConfig,
    fallback_point: Option<Vec3>,
    transform: &mut Transform,
    nav: &mut dyn Navigator,
    speed: &mut MovementSpeed,
    rng: &mut ChaCha8Rng,
    teleports: &mut Vec<AgentTeleported>,
) -> Option<SentinelState> {
    match record.phase.clone() {
        EscalationPhase::TeleportBurst => {
            // Столкновение с агрессором → bounded replay записанных позиций
            if transform.translation.distance(record.aggressor) <= config.collision_radius
                && !record.history.is_empty()
            {
                crate::logger::log(&format!("♻️ {:?} escalation: collision → replay loop", entity));
                record.phase = EscalationPhase::Replay {
                    elapsed: 0.0,
                    cursor: 0,
                };
                record.interval_timer = 0.0;
                return None;
            }

            record.interval_timer += delta;
            if record.interval_timer >= config.teleport_interval {
                record.interval_timer -= config.teleport_interval;

                let towards = (record.aggressor - transform.translation)
                    .try_normalize()
                    .unwrap_or(Vec3::X);
                let distance =
                    rng.gen_range(config.teleport_min_distance..=config.teleport_max_distance);
                let raw = transform.translation + towards * distance;

                // Navigation failure → fallback на ближайшую патрульную точку
                let destination = nav
                    .sample_navigable_point_near(raw, NAV_SNAP_RADIUS)
                    .or(fallback_point);

                if let Some(destination) = destination {
                    let from = transform.translation;
                    nav.warp(transform, destination);
                    face_towards(transform, record.aggressor);
                    record.history.push(destination);
                    teleports.push(AgentTeleported {
                        agent: entity,
                        from,
                        to: destination,
                    });
                } else {
                    // Валидной точки нет — итерацию засчитываем без релокации
                    crate::logger::log_warning(&format!(
                        "escalation: {:?} нет navigable точки для телепорта",
                        entity
                    ));
                }

                record.teleports_done += 1;
                if record.teleports_done >= config.teleport_count {
                    record.phase = EscalationPhase::Return;
                }
            }
            None
        }

        EscalationPhase::Replay { elapsed, cursor } => {
            let elapsed = elapsed + delta;
            if elapsed >= config.replay_duration || cursor >= record.history.len() {
                record.phase = EscalationPhase::Return;
                return None;
            }

            record.interval_timer += delta;
            let mut cursor = cursor;
            if record.interval_timer >= config.teleport_interval {
                record.interval_timer -= config.teleport_interval;
                if let Some(position) = record.history.get(cursor) {
                    let from = transform.translation;
                    nav.warp(transform, position);
                    face_towards(transform, record.aggressor);
                    teleports.push(AgentTeleported {
                        agent: entity,
                        from,
                        to: position,
                    });
                }
                cursor += 1;
            }

            record.phase = EscalationPhase::Replay { elapsed, cursor };
            None
        }

        EscalationPhase::Return => {
            // Релокация на pre-stun позицию + re-engage с enrage-скоростью
            let from = transform.translation;
            nav.warp(transform, record.original_position);
            face_towards(transform, record.aggressor);
            teleports.push(AgentTeleported {
                agent: entity,
                from,
                to: record.original_position,
            });
            speed.multiplier = config.enrage_speed_multiplier;
            crate::logger::log(&format!("⚔️ {:?} escalation: Return → Attack (enraged)", entity));
            Some(SentinelState::Attack {
                spotted_for: 0.0,
                cooldown: 0.0,
            })
        }
    }
}

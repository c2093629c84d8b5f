//! Watcher FSM (reactive observer): движение только вне взгляда цели,
//! enrage-телепорты после удара, vanish/reappear, loop-реплей.

use bevy::prelude::*;
use rand::Rng;

use crate::ai::components::{Distortion, Hidden, WatcherConfig, WatcherState};
use crate::ai::events::AgentTeleported;
use crate::components::{PerceptionConfig, Quarry};
use crate::navigation::{face_towards, NavHandle};
use crate::perception::{is_observed_by, StaticGeometry};
use crate::DeterministicRng;

/// Система: watcher FSM transitions
///
/// Stalk: idём к цели пока на нас не смотрят, под взглядом замираем.
/// Enraged (после удара): телепорты к цели по интервалу с min_distance,
/// на каждом телепорте шанс Vanish. Столкновение с целью → Loop (реплей
/// последних позиций).
#[allow(clippy::too_many_arguments)]
pub fn watcher_fsm_transitions(
    mut commands: Commands,
    mut watchers: Query<
        (
            Entity,
            &mut WatcherState,
            &mut NavHandle,
            &mut Transform,
            &WatcherConfig,
            &PerceptionConfig,
        ),
        Without<Quarry>,
    >,
    quarry: Query<&Transform, (With<Quarry>, Without<WatcherState>)>,
    geometry: Res<StaticGeometry>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
    mut teleports: EventWriter<AgentTeleported>,
) {
    let delta = time.delta_secs();
    let Some(quarry_transform) = quarry.iter().next() else {
        // Нет цели — все watcher'ы замирают (missing configuration,
        // warning выдаёт sentinel FSM)
        for (_, _, mut nav, _, _, _) in watchers.iter_mut() {
            nav.0.stop();
        }
        return;
    };
    let quarry_pos = quarry_transform.translation;
    let quarry_forward = *quarry_transform.forward();

    for (entity, mut state, mut nav, mut transform, config, perception) in watchers.iter_mut() {
        let pos = transform.translation;

        let new_state = match state.as_ref() {
            WatcherState::Dead => continue,

            WatcherState::Stalk => {
                let observed =
                    is_observed_by(pos, quarry_pos, quarry_forward, perception, &geometry);
                if observed {
                    // Под взглядом — замираем
                    nav.0.stop();
                } else {
                    nav.0.request_move(quarry_pos);
                }
                WatcherState::Stalk
            }

            WatcherState::Enraged {
                interval_timer,
                history,
            } => {
                nav.0.stop(); // в enrage двигаемся только телепортами

                // Столкновение с целью → loop-реплей записанных позиций
                if pos.distance(quarry_pos) <= config.collision_radius && !history.is_empty() {
                    crate::logger::log(&format!("♻️ {:?} watcher: collision → loop", entity));
                    WatcherState::Loop {
                        elapsed: 0.0,
                        step_timer: 0.0,
                        cursor: 0,
                        history: history.clone(),
                    }
                } else {
                    let mut interval_timer = interval_timer + delta;
                    let mut history = history.clone();

                    if interval_timer >= config.teleport_interval {
                        interval_timer -= config.teleport_interval;

                        if rng.rng.gen::<f32>() < config.vanish_chance {
                            // Vanish: унесло далеко от цели, скрыт
                            let away = (pos - quarry_pos).try_normalize().unwrap_or(Vec3::X);
                            let far = quarry_pos + away * config.vanish_far_distance;
                            let from = transform.translation;
                            nav.0.warp(&mut transform, far);
                            commands.entity(entity).insert(Hidden);
                            teleports.write(AgentTeleported {
                                agent: entity,
                                from,
                                to: far,
                            });
                            crate::logger::log(&format!("👻 {:?} watcher: Enraged → Vanish", entity));
                            *state = WatcherState::Vanish {
                                hidden_for: 0.0,
                                history,
                            };
                            continue;
                        }

                        let destination =
                            enraged_teleport_point(pos, quarry_pos, config, &mut rng.rng);
                        let snapped = nav
                            .0
                            .sample_navigable_point_near(destination, config.min_distance)
                            .unwrap_or(destination);
                        // Инвариант: после телепорта не ближе min_distance к цели
                        let snapped = enforce_min_distance(snapped, quarry_pos, config.min_distance);

                        let from = transform.translation;
                        nav.0.warp(&mut transform, snapped);
                        face_towards(&mut transform, quarry_pos);
                        history.push(snapped);
                        teleports.write(AgentTeleported {
                            agent: entity,
                            from,
                            to: snapped,
                        });
                    }

                    WatcherState::Enraged {
                        interval_timer,
                        history,
                    }
                }
            }

            WatcherState::Vanish {
                hidden_for,
                history,
            } => {
                let hidden_for = hidden_for + delta;
                if hidden_for >= config.vanish_delay {
                    // Реаппир за спиной цели
                    let behind = quarry_pos - quarry_forward * config.reappear_behind_distance;
                    let from = transform.translation;
                    nav.0.warp(&mut transform, behind);
                    face_towards(&mut transform, quarry_pos);
                    commands.entity(entity).remove::<Hidden>();
                    teleports.write(AgentTeleported {
                        agent: entity,
                        from,
                        to: behind,
                    });
                    crate::logger::log(&format!("👁️ {:?} watcher: Vanish → Enraged (reappear)", entity));
                    WatcherState::Enraged {
                        interval_timer: 0.0,
                        history: history.clone(),
                    }
                } else {
                    WatcherState::Vanish {
                        hidden_for,
                        history: history.clone(),
                    }
                }
            }

            WatcherState::Loop {
                elapsed,
                step_timer,
                cursor,
                history,
            } => {
                let elapsed = elapsed + delta;
                if elapsed >= config.loop_duration || *cursor >= history.len() {
                    WatcherState::Enraged {
                        interval_timer: 0.0,
                        history: history.clone(),
                    }
                } else {
                    let mut step_timer = step_timer + delta;
                    let mut cursor = *cursor;
                    if step_timer >= config.teleport_interval {
                        step_timer -= config.teleport_interval;
                        if let Some(position) = history.get(cursor) {
                            let from = transform.translation;
                            nav.0.warp(&mut transform, position);
                            face_towards(&mut transform, quarry_pos);
                            teleports.write(AgentTeleported {
                                agent: entity,
                                from,
                                to: position,
                            });
                        }
                        cursor += 1;
                    }
                    WatcherState::Loop {
                        elapsed,
                        step_timer,
                        cursor,
                        history: history.clone(),
                    }
                }
            }
        };

        if *state != new_state {
            *state = new_state;
        }
    }
}

/// Точка enrage-телепорта: к цели, но не ближе min_distance
fn enraged_teleport_point(
    pos: Vec3,
    quarry_pos: Vec3,
    config: &WatcherConfig,
    rng: &mut rand_chacha::ChaCha8Rng,
) -> Vec3 {
    let towards = (quarry_pos - pos).try_normalize().unwrap_or(Vec3::X);
    let gap = (pos.distance(quarry_pos) - config.min_distance).max(0.0);
    let step = rng.gen::<f32>() * gap;
    pos + towards * step
}

/// Отодвинуть точку от цели до min_distance если оказалась ближе
fn enforce_min_distance(point: Vec3, quarry_pos: Vec3, min_distance: f32) -> Vec3 {
    let offset = point - quarry_pos;
    let distance = offset.length();
    if distance >= min_distance {
        return point;
    }
    let dir = offset.try_normalize().unwrap_or(Vec3::X);
    quarry_pos + dir * min_distance
}

/// Система: distortion intensity (косметика для effects layer)
///
/// observed_time копится пока цель смотрит на watcher'а; intensity
/// ease'ится к target = clamp(observed_time / ramp) каждый тик.
pub fn update_distortion(
    mut watchers: Query<
        (&mut Distortion, &WatcherConfig, &PerceptionConfig, &Transform),
        (With<WatcherState>, Without<Quarry>),
    >,
    quarry: Query<&Transform, (With<Quarry>, Without<WatcherState>)>,
    geometry: Res<StaticGeometry>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    let Some(quarry_transform) = quarry.iter().next() else {
        return;
    };
    let quarry_pos = quarry_transform.translation;
    let quarry_forward = *quarry_transform.forward();

    for (mut distortion, config, perception, transform) in watchers.iter_mut() {
        if is_observed_by(
            transform.translation,
            quarry_pos,
            quarry_forward,
            perception,
            &geometry,
        ) {
            distortion.observed_time += delta;
        }

        let target = (distortion.observed_time / config.observation_ramp).clamp(0.0, 1.0);
        let ease = (config.distortion_ease_rate * delta).min(1.0);
        distortion.intensity += (target - distortion.intensity) * ease;
    }
}

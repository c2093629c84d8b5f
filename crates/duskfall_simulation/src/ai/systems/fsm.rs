//! Sentinel FSM transitions (Patrol / Attack / Search / Stunned / Escalating).
//!
//! Каждый тик: опрос perception → новое значение состояния из (старое
//! состояние, inputs). AlertEvent пишется здесь и потребляется alert
//! network'ом позже в том же тике (своя транзиция раньше broadcast'а).

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::ai::components::{Dwell, EscalationRecord, EscortCall, SentinelConfig, SentinelState};
use crate::ai::events::{AlertEvent, AttackEngaged, RangedAttackFired, SearchStarted};
use crate::ai::events::AgentTeleported;
use crate::ai::systems::escalation;
use crate::components::{
    DiagnosticFlags, LastKnownTarget, MovementSpeed, PatrolAssignment, PerceptionConfig, Quarry,
    WaypointPath,
};
use crate::navigation::NavHandle;
use crate::perception::{can_perceive, PerceptionResult, StaticGeometry};
use crate::DeterministicRng;

/// Yaw агента (вращение вокруг Y)
pub(crate) fn yaw_of(transform: &Transform) -> f32 {
    transform.rotation.to_euler(EulerRot::YXZ).0
}

/// Выбор следующего waypoint'а: последовательно с вероятностью
/// sequential_chance, иначе равномерно случайный *другой* индекс
pub fn choose_next_waypoint(
    len: usize,
    current: usize,
    sequential_chance: f32,
    rng: &mut ChaCha8Rng,
) -> usize {
    if len <= 1 {
        return 0;
    }
    if rng.gen::<f32>() < sequential_chance {
        return (current + 1) % len;
    }
    // Случайный из len-1 кандидатов, сдвиг мимо current
    let pick = rng.gen_range(0..len - 1);
    if pick >= current {
        pick + 1
    } else {
        pick
    }
}

/// Waypoint + случайный planar offset (анти-"хождение строем")
fn offset_waypoint(point: Vec3, radius: f32, rng: &mut ChaCha8Rng) -> Vec3 {
    let angle = rng.gen::<f32>() * std::f32::consts::TAU;
    let r = rng.gen::<f32>() * radius;
    point + Vec3::new(angle.cos() * r, 0.0, angle.sin() * r)
}

/// Индекс ближайшего waypoint'а (возврат из Search в Patrol)
fn nearest_waypoint_index(path: &WaypointPath, pos: Vec3) -> usize {
    let mut best = 0;
    let mut best_dist = f32::MAX;
    for (i, p) in path.points.iter().enumerate() {
        let d = p.distance_squared(pos);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Система: sentinel FSM transitions
///
/// Порядок приоритетов внутри состояния:
/// 1. Perception hit (Patrol/Search → Attack, с AlertEvent)
/// 2. Таймеры (dwell, search, stun, escalation)
/// 3. Навигационные запросы
#[allow(clippy::too_many_arguments)]
pub fn sentinel_fsm_transitions(
    mut commands: Commands,
    mut agents: Query<(
        Entity,
        &mut SentinelState,
        &mut LastKnownTarget,
        &mut NavHandle,
        &mut MovementSpeed,
        &mut Transform,
        &SentinelConfig,
        &PerceptionConfig,
        Option<&mut PatrolAssignment>,
    )>,
    paths: Query<&WaypointPath>,
    quarry: Query<&Transform, (With<Quarry>, Without<SentinelState>)>,
    geometry: Res<StaticGeometry>,
    mut rng: ResMut<DeterministicRng>,
    mut flags: ResMut<DiagnosticFlags>,
    time: Res<Time<Fixed>>,
    mut alerts: EventWriter<AlertEvent>,
    mut engaged: EventWriter<AttackEngaged>,
    mut searches: EventWriter<SearchStarted>,
    mut shots: EventWriter<RangedAttackFired>,
    mut teleports: EventWriter<AgentTeleported>,
) {
    let delta = time.delta_secs();
    let quarry_pos = quarry.iter().next().map(|t| t.translation);

    if quarry_pos.is_none() && !flags.warned_missing_quarry {
        crate::logger::log_warning("sentinel FSM: quarry не назначен — агенты деградируют до патруля");
        flags.warned_missing_quarry = true;
    }

    for (
        entity,
        mut state,
        mut last_known,
        mut nav,
        mut speed,
        mut transform,
        config,
        perception,
        mut assignment,
    ) in agents.iter_mut()
    {
        let pos = transform.translation;

        // Perception опрашиваем только в состояниях, которые на него реагируют
        let polled = matches!(
            state.as_ref(),
            SentinelState::Patrol { .. } | SentinelState::Attack { .. } | SentinelState::Search { .. }
        );
        let perceived = match (polled, quarry_pos) {
            (true, Some(qp)) => {
                can_perceive(pos, *transform.forward(), perception, qp, &geometry)
            }
            _ => PerceptionResult::hidden(),
        };

        let new_state = match state.as_ref() {
            SentinelState::Dead => continue,

            SentinelState::Patrol {
                waypoint,
                nav_target,
                dwell,
                travel_time,
            } => {
                if let (true, Some(target)) = (perceived.visible, perceived.target_position) {
                    // Обнаружение: Attack + alert + отложенный эскорт
                    last_known.0 = Some(target);
                    nav.0.stop();
                    alerts.write(AlertEvent {
                        source: entity,
                        last_known: target,
                        radius: config.alert_radius,
                    });
                    engaged.write(AttackEngaged {
                        agent: entity,
                        position: pos,
                    });
                    commands.entity(entity).insert(EscortCall {
                        remaining: config.escort_delay,
                        position: target,
                        count: config.escort_count,
                    });
                    crate::logger::log(&format!("⚔️ {:?} Patrol → Attack (spotted quarry)", entity));
                    SentinelState::Attack {
                        spotted_for: 0.0,
                        cooldown: 0.0,
                    }
                } else {
                    step_patrol(
                        entity,
                        *waypoint,
                        *nav_target,
                        *dwell,
                        *travel_time,
                        delta,
                        pos,
                        &transform,
                        config,
                        &mut *nav,
                        assignment.as_deref_mut(),
                        &paths,
                        &mut rng.rng,
                    )
                }
            }

            SentinelState::Attack {
                spotted_for,
                cooldown,
            } => {
                let mut cooldown = (cooldown - delta).max(0.0);

                if let (true, Some(target)) = (perceived.visible, perceived.target_position) {
                    last_known.0 = Some(target);
                    nav.0.stop(); // стоим и стреляем, facing в movement системе

                    let spotted_for = spotted_for + delta;
                    let distance = pos.distance(target);

                    if distance < config.attack_range
                        && spotted_for >= config.telegraph_delay
                        && cooldown <= 0.0
                    {
                        let origin = pos + Vec3::Y * perception.eye_height;
                        let direction = (target - origin).normalize_or_zero();
                        shots.write(RangedAttackFired {
                            agent: entity,
                            origin,
                            direction,
                            damage: config.attack_damage,
                        });
                        cooldown = config.attack_cooldown;
                    }

                    SentinelState::Attack {
                        spotted_for,
                        cooldown,
                    }
                } else if let Some(lk) = last_known.0 {
                    // Цель вне видимости: дожимаем last-known-position
                    if pos.distance(lk) <= config.arrive_epsilon {
                        nav.0.stop();
                        searches.write(SearchStarted {
                            agent: entity,
                            position: pos,
                        });
                        crate::logger::log(&format!("🔍 {:?} Attack → Search (quarry lost)", entity));
                        SentinelState::Search {
                            elapsed: 0.0,
                            look_around: None,
                        }
                    } else {
                        nav.0.request_move(lk);
                        SentinelState::Attack {
                            spotted_for: 0.0,
                            cooldown,
                        }
                    }
                } else {
                    // Инвариант нарушен извне — деградируем в патруль
                    crate::logger::log_warning(&format!(
                        "sentinel FSM: {:?} Attack без last-known-position",
                        entity
                    ));
                    nav.0.stop();
                    SentinelState::default()
                }
            }

            SentinelState::Search {
                elapsed,
                look_around,
            } => {
                if let (true, Some(target)) = (perceived.visible, perceived.target_position) {
                    // Re-acquire: обратно в Attack с повторным alert'ом
                    last_known.0 = Some(target);
                    nav.0.stop();
                    alerts.write(AlertEvent {
                        source: entity,
                        last_known: target,
                        radius: config.alert_radius,
                    });
                    engaged.write(AttackEngaged {
                        agent: entity,
                        position: pos,
                    });
                    crate::logger::log(&format!("⚔️ {:?} Search → Attack (re-acquired)", entity));
                    SentinelState::Attack {
                        spotted_for: 0.0,
                        cooldown: 0.0,
                    }
                } else {
                    let elapsed = elapsed + delta;

                    let give_up = elapsed > config.search_duration
                        || matches!(look_around, Some(d) if d.elapsed + delta >= config.look_around_duration);

                    if give_up {
                        nav.0.stop();
                        crate::logger::log(&format!("🚶 {:?} Search → Patrol", entity));
                        resume_patrol(pos, assignment.as_deref(), &paths)
                    } else {
                        match look_around {
                            Some(d) => SentinelState::Search {
                                elapsed,
                                look_around: Some(Dwell {
                                    elapsed: d.elapsed + delta,
                                    base_yaw: d.base_yaw,
                                }),
                            },
                            None => match last_known.0 {
                                Some(lk) => {
                                    nav.0.request_move(lk);
                                    let arrived = !nav.0.is_path_pending()
                                        && nav.0.remaining_distance(pos) <= config.arrive_epsilon;
                                    if arrived {
                                        nav.0.stop();
                                        SentinelState::Search {
                                            elapsed,
                                            look_around: Some(Dwell::new(yaw_of(&transform))),
                                        }
                                    } else {
                                        SentinelState::Search {
                                            elapsed,
                                            look_around: None,
                                        }
                                    }
                                }
                                None => resume_patrol(pos, assignment.as_deref(), &paths),
                            },
                        }
                    }
                }
            }

            SentinelState::Stunned { elapsed, aggressor } => {
                nav.0.stop();
                let elapsed = elapsed + delta;
                if elapsed >= config.stun_duration {
                    crate::logger::log(&format!("💫 {:?} Stunned → Escalating (teleport burst)", entity));
                    SentinelState::Escalating {
                        record: EscalationRecord::new(pos, *aggressor),
                    }
                } else {
                    SentinelState::Stunned {
                        elapsed,
                        aggressor: *aggressor,
                    }
                }
            }

            SentinelState::Escalating { record } => {
                let mut record = record.clone();
                let fallback = assignment
                    .as_deref()
                    .and_then(|a| paths.get(a.path).ok())
                    .and_then(|p| p.nearest_point(pos));

                let mut emitted = Vec::new();
                let outcome = escalation::step_escalation(
                    entity,
                    &mut record,
                    delta,
                    config,
                    fallback,
                    &mut *transform,
                    nav.0.as_mut(),
                    &mut *speed,
                    &mut rng.rng,
                    &mut emitted,
                );
                for event in emitted {
                    teleports.write(event);
                }
                match outcome {
                    Some(next) => {
                        // Return → Attack: агрессор становится last-known целью,
                        // re-engage объявляется сети как обычное обнаружение
                        last_known.0 = Some(record.aggressor);
                        alerts.write(AlertEvent {
                            source: entity,
                            last_known: record.aggressor,
                            radius: config.alert_radius,
                        });
                        engaged.write(AttackEngaged {
                            agent: entity,
                            position: transform.translation,
                        });
                        next
                    }
                    None => SentinelState::Escalating { record },
                }
            }
        };

        if *state != new_state {
            *state = new_state;
        }
    }
}

/// Шаг патруля (цель не обнаружена): навигация к waypoint'у, пауза со
/// sweep'ом, выбор следующей точки, anti-deadlock
#[allow(clippy::too_many_arguments)]
fn step_patrol(
    entity: Entity,
    waypoint: usize,
    nav_target: Option<Vec3>,
    dwell: Option<Dwell>,
    travel_time: f32,
    delta: f32,
    pos: Vec3,
    transform: &Transform,
    config: &SentinelConfig,
    nav: &mut NavHandle,
    assignment: Option<&mut PatrolAssignment>,
    paths: &Query<&WaypointPath>,
    rng: &mut ChaCha8Rng,
) -> SentinelState {
    let Some(assignment) = assignment else {
        // Нет маршрута — безопасный idle
        return SentinelState::Patrol {
            waypoint,
            nav_target,
            dwell,
            travel_time,
        };
    };

    let path = match paths.get(assignment.path) {
        Ok(p) if !p.is_empty() => p,
        _ => {
            // Missing configuration: деградация до idle, warning один раз
            if !assignment.warned_empty {
                crate::logger::log_warning(&format!(
                    "sentinel FSM: {:?} пустой/отсутствующий патрульный маршрут — idle",
                    entity
                ));
                assignment.warned_empty = true;
            }
            return SentinelState::Patrol {
                waypoint: 0,
                nav_target: None,
                dwell: None,
                travel_time: 0.0,
            };
        }
    };

    let waypoint = waypoint.min(path.len() - 1);

    match dwell {
        None => {
            // В пути к точке
            let target = match nav_target {
                Some(t) => t,
                None => {
                    let t = offset_waypoint(path.points[waypoint], config.waypoint_offset_radius, rng);
                    nav.0.request_move(t);
                    t
                }
            };

            let travel_time = travel_time + delta;
            let arrived =
                !nav.0.is_path_pending() && nav.0.remaining_distance(pos) <= config.arrive_epsilon;
            let stuck = travel_time > config.pause_duration + config.stuck_threshold;

            if arrived {
                nav.0.stop();
                SentinelState::Patrol {
                    waypoint,
                    nav_target: None,
                    dwell: Some(Dwell::new(yaw_of(transform))),
                    travel_time,
                }
            } else if stuck {
                // Anti-deadlock: принудительный advance без sweep'а
                crate::logger::log(&format!("sentinel FSM: {:?} stuck → forced advance", entity));
                advance_patrol(waypoint, path, config, nav, rng)
            } else {
                SentinelState::Patrol {
                    waypoint,
                    nav_target: Some(target),
                    dwell: None,
                    travel_time,
                }
            }
        }
        Some(d) => {
            let elapsed = d.elapsed + delta;
            if elapsed >= config.pause_duration {
                advance_patrol(waypoint, path, config, nav, rng)
            } else {
                SentinelState::Patrol {
                    waypoint,
                    nav_target: None,
                    dwell: Some(Dwell {
                        elapsed,
                        base_yaw: d.base_yaw,
                    }),
                    travel_time,
                }
            }
        }
    }
}

/// Переход к следующему waypoint'у (0.7 последовательный / 0.3 случайный другой)
fn advance_patrol(
    current: usize,
    path: &WaypointPath,
    config: &SentinelConfig,
    nav: &mut NavHandle,
    rng: &mut ChaCha8Rng,
) -> SentinelState {
    let next = choose_next_waypoint(path.len(), current, config.sequential_chance, rng);
    let target = offset_waypoint(path.points[next], config.waypoint_offset_radius, rng);
    nav.0.request_move(target);
    SentinelState::Patrol {
        waypoint: next,
        nav_target: Some(target),
        dwell: None,
        travel_time: 0.0,
    }
}

/// Возврат в Patrol с ближайшего waypoint'а (после Search)
fn resume_patrol(
    pos: Vec3,
    assignment: Option<&PatrolAssignment>,
    paths: &Query<&WaypointPath>,
) -> SentinelState {
    let waypoint = assignment
        .and_then(|a| paths.get(a.path).ok())
        .filter(|p| !p.is_empty())
        .map(|p| nearest_waypoint_index(p, pos))
        .unwrap_or(0);

    SentinelState::Patrol {
        waypoint,
        nav_target: None,
        dwell: None,
        travel_time: 0.0,
    }
}

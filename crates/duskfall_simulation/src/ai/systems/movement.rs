//! Ориентация агентов от состояния
//!
//! Позицию двигает drive_navigation; здесь только повороты: sweep головой
//! на dwell/look-around, слежение за целью в Attack, взгляд на агрессора
//! в Stunned. Телепорты ориентируют себя сами в момент warp'а.

use bevy::prelude::*;

use crate::ai::components::{SentinelConfig, SentinelState};
use crate::components::LastKnownTarget;
use crate::navigation::face_towards;

/// Система: ориентация sentinel'ов по текущему состоянию
pub fn movement_from_state(
    mut agents: Query<(
        &SentinelState,
        &LastKnownTarget,
        &SentinelConfig,
        &mut Transform,
    )>,
) {
    for (state, last_known, config, mut transform) in agents.iter_mut() {
        match state {
            SentinelState::Patrol {
                dwell: Some(dwell), ..
            } => {
                apply_sweep(&mut transform, dwell.base_yaw, dwell.elapsed, config);
            }

            SentinelState::Search {
                look_around: Some(dwell),
                ..
            } => {
                apply_sweep(&mut transform, dwell.base_yaw, dwell.elapsed, config);
            }

            SentinelState::Attack { .. } => {
                if let Some(target) = last_known.0 {
                    face_towards(&mut transform, target);
                }
            }

            SentinelState::Stunned { aggressor, .. } => {
                face_towards(&mut transform, *aggressor);
            }

            _ => {}
        }
    }
}

/// Синусоидальный sweep вокруг базового yaw (осмотр на месте)
fn apply_sweep(transform: &mut Transform, base_yaw: f32, elapsed: f32, config: &SentinelConfig) {
    let amplitude = config.look_angle_deg.to_radians();
    let yaw = base_yaw + (elapsed * config.sweep_speed).sin() * amplitude;
    transform.rotation = Quat::from_rotation_y(yaw);
}

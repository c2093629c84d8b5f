//! Headless симуляция DUSKFALL
//!
//! Маленькая сцена: патрульный маршрут, два sentinel'а, watcher и
//! неподвижная цель. 1000 тиков без рендера — smoke-тест детерминизма.

use bevy::prelude::*;
use duskfall_simulation::ai::{Distortion, SentinelConfig, SentinelState, WatcherConfig, WatcherState};
use duskfall_simulation::{
    create_headless_app, Agent, Health, LastKnownTarget, MovementSpeed, NavHandle,
    PatrolAssignment, PerceptionConfig, Quarry, WaypointPath,
};

fn main() {
    let seed = 42;
    println!("Starting DUSKFALL headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    spawn_demo_scene(app.world_mut());

    // Запускаем 1000 тиков симуляции
    for tick in 0..1000 {
        app.update();

        if tick % 100 == 0 {
            let entity_count = app.world().entities().len();
            println!("Tick {}: {} entities", tick, entity_count);
        }
    }

    println!("Simulation complete!");
}

fn spawn_demo_scene(world: &mut World) {
    let path = world
        .spawn(WaypointPath {
            points: vec![
                Vec3::new(-8.0, 0.0, -8.0),
                Vec3::new(8.0, 0.0, -8.0),
                Vec3::new(8.0, 0.0, 8.0),
                Vec3::new(-8.0, 0.0, 8.0),
            ],
            looping: true,
        })
        .id();

    // Цель (управляется извне; тут стоит на месте)
    world.spawn((
        Quarry,
        Transform::from_xyz(0.0, 0.0, 20.0).looking_to(Vec3::Z, Vec3::Y),
    ));

    for (id, start) in [(1u32, Vec3::new(-8.0, 0.0, -8.0)), (2, Vec3::new(8.0, 0.0, 8.0))] {
        world.spawn((
            Agent { id },
            Health::new(100),
            MovementSpeed::new(3.0),
            Transform::from_translation(start),
            NavHandle::kinematic(),
            SentinelState::default(),
            SentinelConfig::default(),
            PerceptionConfig::default(),
            LastKnownTarget::default(),
            PatrolAssignment::new(path),
        ));
    }

    world.spawn((
        Agent { id: 10 },
        Health::new(60),
        MovementSpeed::new(2.0),
        Transform::from_xyz(0.0, 0.0, -15.0),
        NavHandle::kinematic(),
        WatcherState::default(),
        WatcherConfig::default(),
        PerceptionConfig::default(),
        Distortion::default(),
    ));
}

//! Sentinel integration tests
//!
//! Headless App, FixedUpdate шагается вручную (детерминированные тики,
//! без wall-clock). Проверяем полный жизненный цикл: патруль →
//! обнаружение → alert → stun → escalation → re-engage → смерть.

use bevy::prelude::*;
use std::time::Duration;

use duskfall_simulation::ai::{
    AgentDied, AgentHit, AgentRegistry, AgentTeleported, AlertEvent, AttackEngaged,
    EscalationPhase, EscortSpawned, RangedAttackFired, SearchStarted, SentinelConfig,
    SentinelState,
};
use duskfall_simulation::{
    create_headless_app, Agent, Health, LastKnownTarget, MovementSpeed, NavHandle,
    PatrolAssignment, PerceptionConfig, Quarry, WaypointPath,
};

/// Один детерминированный simulation tick (1/60 s)
fn tick(app: &mut App) {
    let step = Duration::from_secs_f64(1.0 / 60.0);
    app.world_mut()
        .resource_mut::<Time<Fixed>>()
        .advance_by(step);
    app.world_mut().run_schedule(FixedUpdate);
}

fn tick_n(app: &mut App, n: usize) {
    for _ in 0..n {
        tick(app);
    }
}

fn spawn_sentinel(world: &mut World, id: u32, position: Vec3) -> Entity {
    world
        .spawn((
            Agent { id },
            Health::new(100),
            MovementSpeed::new(3.0),
            Transform::from_translation(position),
            NavHandle::kinematic(),
            SentinelState::default(),
            SentinelConfig::default(),
            PerceptionConfig::default(),
            LastKnownTarget::default(),
        ))
        .id()
}

fn sentinel_state(app: &App, entity: Entity) -> SentinelState {
    app.world().get::<SentinelState>(entity).unwrap().clone()
}

/// Patrol → Attack при видимой цели; стрельба после telegraph delay
#[test]
fn test_patrol_to_attack_and_fire() {
    let mut app = create_headless_app(42);

    // Цель прямо по курсу (default forward = -Z), в радиусе атаки
    app.world_mut()
        .spawn((Quarry, Transform::from_xyz(0.0, 0.0, -6.0)));
    let sentinel = spawn_sentinel(app.world_mut(), 1, Vec3::ZERO);

    tick(&mut app);
    assert!(matches!(
        sentinel_state(&app, sentinel),
        SentinelState::Attack { .. }
    ));
    assert_eq!(
        app.world().get::<LastKnownTarget>(sentinel).unwrap().0,
        Some(Vec3::new(0.0, 0.0, -6.0))
    );

    // Telegraph 0.6s + запас: хотя бы один выстрел
    tick_n(&mut app, 120);
    let shots = app.world().resource::<Events<RangedAttackFired>>();
    assert!(shots.len() >= 1, "ожидали выстрелы, получили {}", shots.len());

    // Эскорт вызван через escort_delay
    let escorts = app.world().resource::<Events<EscortSpawned>>();
    assert_eq!(escorts.len(), 1);
}

/// Alert network: второй sentinel в радиусе уходит в Search в тот же тик
#[test]
fn test_alert_propagates_to_patrolling_neighbour() {
    let mut app = create_headless_app(42);

    let quarry_pos = Vec3::new(0.0, 0.0, -6.0);
    app.world_mut()
        .spawn((Quarry, Transform::from_translation(quarry_pos)));

    let spotter = spawn_sentinel(app.world_mut(), 1, Vec3::ZERO);
    // Сосед в 5m (внутри alert_radius 15m), смотрит в +Z — цель не видит
    let neighbour = spawn_sentinel(app.world_mut(), 2, Vec3::new(5.0, 0.0, 0.0));
    app.world_mut()
        .get_mut::<Transform>(neighbour)
        .unwrap()
        .look_to(Vec3::Z, Vec3::Y);

    tick(&mut app);

    assert!(matches!(
        sentinel_state(&app, spotter),
        SentinelState::Attack { .. }
    ));
    assert!(matches!(
        sentinel_state(&app, neighbour),
        SentinelState::Search { .. }
    ));
    assert_eq!(
        app.world().get::<LastKnownTarget>(neighbour).unwrap().0,
        Some(quarry_pos)
    );
}

/// Алерт перезапускает уже идущий поиск (таймеры в ноль, без повторного cue)
#[test]
fn test_alert_restarts_active_search() {
    let mut app = create_headless_app(42);

    let quarry_pos = Vec3::new(0.0, 0.0, -6.0);
    app.world_mut()
        .spawn((Quarry, Transform::from_translation(quarry_pos)));

    let _spotter = spawn_sentinel(app.world_mut(), 1, Vec3::ZERO);
    // Получатель почти выдохся в поиске старой позиции
    let searcher = spawn_sentinel(app.world_mut(), 2, Vec3::new(5.0, 0.0, 0.0));
    app.world_mut().entity_mut(searcher).insert((
        SentinelState::Search {
            elapsed: 7.5,
            look_around: None,
        },
        LastKnownTarget(Some(Vec3::new(30.0, 0.0, 0.0))),
    ));
    app.world_mut()
        .get_mut::<Transform>(searcher)
        .unwrap()
        .look_to(Vec3::Z, Vec3::Y);

    tick(&mut app);

    // Fresh Search: elapsed сброшен, цель поиска — позиция из алерта
    match sentinel_state(&app, searcher) {
        SentinelState::Search { elapsed, .. } => assert_eq!(elapsed, 0.0),
        other => panic!("ожидали Search, получили {:?}", other),
    }
    assert_eq!(
        app.world().get::<LastKnownTarget>(searcher).unwrap().0,
        Some(quarry_pos)
    );
    // Cue только на Patrol → Search; рестарт поиска беззвучен
    assert_eq!(app.world().resource::<Events<SearchStarted>>().len(), 0);

    // Без рестарта поиск бы истёк (7.5s + 1.5s > 8s); теперь он свежий
    tick_n(&mut app, 90);
    assert!(matches!(
        sentinel_state(&app, searcher),
        SentinelState::Search { .. }
    ));
}

/// Двойной broadcast в один тик эквивалентен одиночному
#[test]
fn test_double_alert_same_tick_is_idempotent() {
    let mut app = create_headless_app(42);

    let source = spawn_sentinel(app.world_mut(), 1, Vec3::ZERO);
    let recipient = spawn_sentinel(app.world_mut(), 2, Vec3::new(5.0, 0.0, 0.0));

    let last_known = Vec3::new(0.0, 0.0, -6.0);
    for _ in 0..2 {
        app.world_mut().send_event(AlertEvent {
            source,
            last_known,
            radius: 15.0,
        });
    }
    tick(&mut app);

    assert_eq!(
        sentinel_state(&app, recipient),
        SentinelState::Search {
            elapsed: 0.0,
            look_around: None,
        }
    );
    assert_eq!(
        app.world().get::<LastKnownTarget>(recipient).unwrap().0,
        Some(last_known)
    );
    // Один cue, не два
    assert_eq!(app.world().resource::<Events<SearchStarted>>().len(), 1);
    // Источник алертом не трогаем
    assert!(matches!(
        sentinel_state(&app, source),
        SentinelState::Patrol { .. }
    ));
}

/// Sentinel вне радиуса алерта остаётся в патруле
#[test]
fn test_alert_respects_radius() {
    let mut app = create_headless_app(42);

    app.world_mut()
        .spawn((Quarry, Transform::from_xyz(0.0, 0.0, -6.0)));
    let _spotter = spawn_sentinel(app.world_mut(), 1, Vec3::ZERO);
    let far = spawn_sentinel(app.world_mut(), 2, Vec3::new(50.0, 0.0, 0.0));
    app.world_mut()
        .get_mut::<Transform>(far)
        .unwrap()
        .look_to(Vec3::Z, Vec3::Y);

    tick(&mut app);
    assert!(matches!(
        sentinel_state(&app, far),
        SentinelState::Patrol { .. }
    ));
}

/// Hit → Stunned → (2.0s) → Escalating с нулевым счётчиком телепортов
#[test]
fn test_stun_then_escalation_entry() {
    let mut app = create_headless_app(42);
    let sentinel = spawn_sentinel(app.world_mut(), 1, Vec3::ZERO);

    let aggressor = Vec3::new(100.0, 0.0, 0.0);
    app.world_mut().send_event(AgentHit {
        target: sentinel,
        aggressor_position: aggressor,
        damage: 10,
    });

    tick(&mut app);
    assert!(matches!(
        sentinel_state(&app, sentinel),
        SentinelState::Stunned { .. }
    ));

    // Повторный удар во время stun'а игнорируется (таймер не сбрасывается)
    app.world_mut().send_event(AgentHit {
        target: sentinel,
        aggressor_position: aggressor,
        damage: 10,
    });

    tick_n(&mut app, 125);
    match sentinel_state(&app, sentinel) {
        SentinelState::Escalating { record } => {
            assert_eq!(record.phase, EscalationPhase::TeleportBurst);
            assert_eq!(record.teleports_done, 0);
            assert_eq!(record.original_position, Vec3::ZERO);
        }
        other => panic!("ожидали Escalating, получили {:?}", other),
    }
}

/// Полный цикл эскалации: burst из 5 телепортов → возврат → Attack enraged
#[test]
fn test_escalation_burst_returns_enraged() {
    let mut app = create_headless_app(42);
    let sentinel = spawn_sentinel(app.world_mut(), 1, Vec3::ZERO);
    // Сосед в радиусе алерта: re-engage должен разбудить и его
    let neighbour = spawn_sentinel(app.world_mut(), 2, Vec3::new(5.0, 0.0, 0.0));

    app.world_mut().send_event(AgentHit {
        target: sentinel,
        aggressor_position: Vec3::new(100.0, 0.0, 0.0),
        damage: 10,
    });

    // stun 2.0s + burst 5×0.5s + запас
    let mut reached_attack = false;
    for _ in 0..400 {
        tick(&mut app);
        if matches!(sentinel_state(&app, sentinel), SentinelState::Attack { .. }) {
            reached_attack = true;
            break;
        }
    }
    assert!(reached_attack, "escalation так и не вышла в Attack");

    // Возврат на pre-stun позицию, enrage-скорость
    let transform = app.world().get::<Transform>(sentinel).unwrap();
    assert!(transform.translation.distance(Vec3::ZERO) < 1e-3);
    let speed = app.world().get::<MovementSpeed>(sentinel).unwrap();
    assert_eq!(speed.multiplier, 2.0);

    // 5 burst-телепортов + возврат
    let teleports = app.world().resource::<Events<AgentTeleported>>();
    assert_eq!(teleports.len(), 6);

    // Агрессор стал last-known целью
    assert_eq!(
        app.world().get::<LastKnownTarget>(sentinel).unwrap().0,
        Some(Vec3::new(100.0, 0.0, 0.0))
    );

    // Re-engage объявлен как обычное обнаружение: cue + алерт соседям
    assert_eq!(app.world().resource::<Events<AttackEngaged>>().len(), 1);
    assert_eq!(app.world().resource::<Events<AlertEvent>>().len(), 1);
    assert!(matches!(
        sentinel_state(&app, neighbour),
        SentinelState::Search { .. }
    ));
    assert_eq!(
        app.world().get::<LastKnownTarget>(neighbour).unwrap().0,
        Some(Vec3::new(100.0, 0.0, 0.0))
    );
}

/// Смертельный удар: Dead, реестр чистится, эскорт отменён
#[test]
fn test_lethal_hit_terminates_agent() {
    let mut app = create_headless_app(42);
    let sentinel = spawn_sentinel(app.world_mut(), 1, Vec3::ZERO);

    tick(&mut app); // регистрация
    assert_eq!(app.world().resource::<AgentRegistry>().len(), 1);

    app.world_mut().send_event(AgentHit {
        target: sentinel,
        aggressor_position: Vec3::X,
        damage: 200,
    });
    tick(&mut app);

    assert_eq!(sentinel_state(&app, sentinel), SentinelState::Dead);
    assert!(app.world().resource::<AgentRegistry>().is_empty());

    let deaths = app.world().resource::<Events<AgentDied>>();
    assert_eq!(deaths.len(), 1);

    // Dead терминален: дальнейшие удары ничего не меняют
    app.world_mut().send_event(AgentHit {
        target: sentinel,
        aggressor_position: Vec3::X,
        damage: 10,
    });
    tick_n(&mut app, 10);
    assert_eq!(sentinel_state(&app, sentinel), SentinelState::Dead);
}

/// Одноточечный маршрут и пустой маршрут не валят симуляцию
#[test]
fn test_degenerate_patrol_paths() {
    let mut app = create_headless_app(42);

    let single = app
        .world_mut()
        .spawn(WaypointPath::new(vec![Vec3::new(3.0, 0.0, 0.0)]))
        .id();
    let empty = app.world_mut().spawn(WaypointPath::default()).id();

    let a = spawn_sentinel(app.world_mut(), 1, Vec3::ZERO);
    app.world_mut()
        .entity_mut(a)
        .insert(PatrolAssignment::new(single));
    let b = spawn_sentinel(app.world_mut(), 2, Vec3::new(10.0, 0.0, 0.0));
    app.world_mut()
        .entity_mut(b)
        .insert(PatrolAssignment::new(empty));

    tick_n(&mut app, 600);

    // Без цели оба так и патрулируют (деградация, не паника)
    assert!(matches!(
        sentinel_state(&app, a),
        SentinelState::Patrol { .. }
    ));
    assert!(matches!(
        sentinel_state(&app, b),
        SentinelState::Patrol { .. }
    ));

    // Одноточечный маршрут: агент дошёл и остался у точки
    let pos = app.world().get::<Transform>(a).unwrap().translation;
    assert!(pos.distance(Vec3::new(3.0, 0.0, 0.0)) < 1.5);
}

/// Search затухает обратно в Patrol по таймауту
#[test]
fn test_search_times_out_to_patrol() {
    let mut app = create_headless_app(42);

    let quarry = app
        .world_mut()
        .spawn((Quarry, Transform::from_xyz(0.0, 0.0, -6.0)))
        .id();
    let sentinel = spawn_sentinel(app.world_mut(), 1, Vec3::ZERO);

    tick(&mut app);
    assert!(matches!(
        sentinel_state(&app, sentinel),
        SentinelState::Attack { .. }
    ));

    // Цель исчезает (teleport игрока далеко за спину)
    app.world_mut()
        .get_mut::<Transform>(quarry)
        .unwrap()
        .translation = Vec3::new(0.0, 0.0, 100.0);

    // Attack дожимает last-known, затем Search (8s) + look-around, затем Patrol
    let mut saw_search = false;
    let mut saw_patrol_again = false;
    for _ in 0..1200 {
        tick(&mut app);
        match sentinel_state(&app, sentinel) {
            SentinelState::Search { .. } => saw_search = true,
            SentinelState::Patrol { .. } if saw_search => {
                saw_patrol_again = true;
                break;
            }
            _ => {}
        }
    }
    assert!(saw_search, "Attack не перешёл в Search после потери цели");
    assert!(saw_patrol_again, "Search не вернулся в Patrol по таймауту");
}

//! Интеграционные тесты physics tick'а в headless App
//!
//! Полный SimulationPlugin поверх аналитической трассы: один `app.update()`
//! = один physics tick.

use bevy::prelude::*;
use tumble_simulation::hazards::{Bumper, MovingPlatform, Pendulum, Rotator, Trampoline, WindZone};
use tumble_simulation::physics::SolidId;
use tumble_simulation::{
    character_bundle, create_headless_app, CharacterBody, CollisionLayer, CourseGeometry, CourseSolid, GettingHit,
    GroundContactTracker, HitByOther, Landed, LocomotionConfig, LocomotionController, RagdollRecovered,
    RagdollStarted, RagdollTransitionManager,
};

/// Все события симуляции за прогон
#[derive(Resource, Default)]
struct Recorded {
    landed: Vec<Entity>,
    hits: Vec<(Entity, Entity)>,
    ragdoll_started: Vec<Entity>,
    recovered: Vec<Entity>,
}

fn record_events(
    mut recorded: ResMut<Recorded>,
    mut landed: EventReader<Landed>,
    mut hits: EventReader<HitByOther>,
    mut started: EventReader<RagdollStarted>,
    mut recovered: EventReader<RagdollRecovered>,
) {
    recorded.landed.extend(landed.read().map(|event| event.entity));
    recorded.hits.extend(hits.read().map(|event| (event.entity, event.other)));
    recorded.ragdoll_started.extend(started.read().map(|event| event.entity));
    recorded.recovered.extend(recovered.read().map(|event| event.entity));
}

fn app_with_course(course: CourseGeometry) -> App {
    let mut app = create_headless_app(7);
    app.insert_resource(course)
        .init_resource::<Recorded>()
        .add_systems(Update, record_events);
    app
}

fn spawn_character(app: &mut App, feet: Vec3) -> Entity {
    app.world_mut()
        .spawn(character_bundle(LocomotionConfig::player(), feet))
        .id()
}

fn run(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        app.update();
    }
}

fn controller_mut(app: &mut App, entity: Entity) -> Mut<'_, LocomotionController> {
    app.world_mut().get_mut::<LocomotionController>(entity).unwrap()
}

fn translation(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).unwrap().translation
}

fn body(app: &App, entity: Entity) -> CharacterBody {
    *app.world().get::<CharacterBody>(entity).unwrap()
}

fn is_grounded(app: &App, entity: Entity) -> bool {
    app.world().get::<GroundContactTracker>(entity).unwrap().is_grounded()
}

#[test]
fn test_spawn_lands_once_and_stays_grounded() {
    let mut app = app_with_course(CourseGeometry::flat_ground(20.0));
    let character = spawn_character(&mut app, Vec3::new(0.0, 0.3, 0.0));

    run(&mut app, 60);

    assert!(is_grounded(&app, character));
    assert_eq!(app.world().resource::<Recorded>().landed, vec![character], "один Landed на касание");
    let feet_y = translation(&app, character).y - 0.9;
    assert!(feet_y.abs() < 0.05, "стоит на полу: {}", feet_y);
}

#[test]
fn test_forward_input_accelerates_to_max_speed() {
    let mut app = app_with_course(CourseGeometry::flat_ground(50.0));
    let character = spawn_character(&mut app, Vec3::ZERO);
    run(&mut app, 10);

    controller_mut(&mut app, character).set_input(0.0, 1.0);
    run(&mut app, 120);

    let max_speed = LocomotionConfig::player().max_speed;
    let speed = body(&app, character).horizontal_velocity().length();
    assert!(speed > max_speed * 0.8, "разогнался: {}", speed);
    assert!(speed < max_speed + 1.0, "не выше предела: {}", speed);
    assert!(translation(&app, character).z < -5.0, "бежит в -Z");
    assert!(is_grounded(&app, character));
}

#[test]
fn test_release_input_brakes_to_stop() {
    let mut app = app_with_course(CourseGeometry::flat_ground(50.0));
    let character = spawn_character(&mut app, Vec3::ZERO);
    run(&mut app, 10);

    controller_mut(&mut app, character).set_input(0.0, 1.0);
    run(&mut app, 60);
    controller_mut(&mut app, character).set_input(0.0, 0.0);
    run(&mut app, 120);

    assert_eq!(body(&app, character).horizontal_velocity(), Vec3::ZERO, "snap к нулю");
}

#[test]
fn test_jump_leaves_ground_and_lands() {
    let mut app = app_with_course(CourseGeometry::flat_ground(20.0));
    let character = spawn_character(&mut app, Vec3::ZERO);
    run(&mut app, 20);

    let ground = app.world().get::<GroundContactTracker>(character).unwrap().clone();
    assert!(controller_mut(&mut app, character).jump(&ground));
    assert!(!controller_mut(&mut app, character).jump(&ground), "повторный jump до cooldown: no-op");

    let mut peak = 0.0f32;
    for _ in 0..40 {
        app.update();
        peak = peak.max(translation(&app, character).y);
    }
    assert!(peak > 0.9 + 1.0, "подпрыгнул: {}", peak);
    assert!(!is_grounded(&app, character));

    run(&mut app, 80);
    assert!(is_grounded(&app, character));
    let controller = app.world().get::<LocomotionController>(character).unwrap();
    assert!(!controller.jump_dive().has_jumped, "Landed сбросил has_jumped");
    assert!(controller.jump_dive().ready_to_jump);
    assert_eq!(app.world().resource::<Recorded>().landed.len(), 2, "спавн + приземление");
}

#[test]
fn test_getting_hit_ragdolls_then_recovers_upright() {
    let mut app = app_with_course(CourseGeometry::flat_ground(50.0));
    let character = spawn_character(&mut app, Vec3::ZERO);
    run(&mut app, 20);

    app.world_mut().send_event(GettingHit {
        entity: character,
        knockback: Vec3::new(4.0, 2.0, 0.0),
    });
    run(&mut app, 2);

    {
        let controller = app.world().get::<LocomotionController>(character).unwrap();
        assert!(controller.being_hit);
        assert!(!controller.can_move);
        assert!(!body(&app, character).rotation_locked);
    }
    assert_eq!(app.world().resource::<Recorded>().ragdoll_started, vec![character]);

    // settle 2 с + ожидание земли + выпрямление 0.25 с
    run(&mut app, 200);

    let controller = app.world().get::<LocomotionController>(character).unwrap();
    assert!(controller.can_move);
    assert!(!controller.is_incapacitated());
    assert_eq!(app.world().resource::<Recorded>().recovered, vec![character]);
    assert!(!app.world().get::<RagdollTransitionManager>(character).unwrap().is_ragdolling());

    let rotation = app.world().get::<Transform>(character).unwrap().rotation;
    assert!((rotation * Vec3::Y).dot(Vec3::Y) > 0.999, "выпрямился");
    assert!(body(&app, character).rotation_locked);
}

#[test]
fn test_fast_character_knocks_down_standing_one() {
    let mut app = app_with_course(CourseGeometry::flat_ground(50.0));
    let runner = spawn_character(&mut app, Vec3::new(0.0, 0.0, 2.0));
    let victim = spawn_character(&mut app, Vec3::new(0.0, 0.0, 0.0));
    run(&mut app, 20);

    app.world_mut()
        .get_mut::<CharacterBody>(runner)
        .unwrap()
        .linear_velocity = Vec3::new(0.0, 0.0, -10.0);
    run(&mut app, 20);

    let recorded = app.world().resource::<Recorded>();
    assert_eq!(recorded.hits, vec![(victim, runner)], "сбит только стоящий");
    assert!(recorded.ragdoll_started.contains(&victim));
    assert!(!recorded.ragdoll_started.contains(&runner));
}

#[test]
fn test_slow_contact_is_not_a_hit() {
    let mut app = app_with_course(CourseGeometry::flat_ground(50.0));
    let runner = spawn_character(&mut app, Vec3::new(0.0, 0.0, 1.5));
    let _victim = spawn_character(&mut app, Vec3::ZERO);
    run(&mut app, 20);

    controller_mut(&mut app, runner).set_input(0.0, 0.4);
    run(&mut app, 60);

    assert!(app.world().resource::<Recorded>().hits.is_empty());
}

#[test]
fn test_trampoline_bounces_on_landing() {
    let mut course = CourseGeometry::new();
    let pad = course.add(CourseSolid::cuboid(Vec3::new(0.0, -0.5, 0.0), Vec3::new(5.0, 0.5, 5.0)));
    let mut app = app_with_course(course);
    app.world_mut().spawn(Trampoline::new(pad));
    let character = spawn_character(&mut app, Vec3::new(0.0, 0.5, 0.0));

    let mut peak = 0.0f32;
    for _ in 0..90 {
        app.update();
        peak = peak.max(translation(&app, character).y);
    }

    assert!(peak > 4.0, "батут подбросил: {}", peak);
}

#[test]
fn test_bumper_knocks_down_on_contact() {
    let mut course = CourseGeometry::flat_ground(30.0);
    let bumper = course.add(CourseSolid::cuboid(Vec3::new(0.0, 1.0, -2.0), Vec3::new(1.0, 1.0, 0.3)));
    let mut app = app_with_course(course);
    app.world_mut().spawn(Bumper::new(bumper));
    let character = spawn_character(&mut app, Vec3::ZERO);
    run(&mut app, 10);

    controller_mut(&mut app, character).set_input(0.0, 1.0);
    run(&mut app, 60);

    assert_eq!(app.world().resource::<Recorded>().ragdoll_started, vec![character]);
    assert!(translation(&app, character).z > -1.5, "отброшен от бампера");
}

#[test]
fn test_wind_zone_lifts_character() {
    let mut course = CourseGeometry::flat_ground(20.0);
    let volume = course.add(
        CourseSolid::cuboid(Vec3::new(0.0, 5.0, 0.0), Vec3::new(2.0, 5.0, 2.0)).with_layer(CollisionLayer::Trigger),
    );
    let mut app = app_with_course(course);
    app.world_mut().spawn(WindZone::new(volume, 20.0));
    let character = spawn_character(&mut app, Vec3::ZERO);

    run(&mut app, 60);

    assert!(translation(&app, character).y > 2.0, "ветер поднял: {}", translation(&app, character).y);
}

#[test]
fn test_platform_carries_grounded_rider() {
    let mut course = CourseGeometry::new();
    let platform_origin = Vec3::new(0.0, -0.25, 0.0);
    let platform = course.add(CourseSolid::cuboid(platform_origin, Vec3::new(1.5, 0.25, 1.5)));
    let mut app = app_with_course(course);
    app.world_mut()
        .spawn(MovingPlatform::new(platform, platform_origin, Vec3::X, 2.0, 1.0));
    let rider = spawn_character(&mut app, Vec3::ZERO);

    run(&mut app, 90);

    let platform_x = solid_center(&app, platform).x;
    let rider_x = translation(&app, rider).x;
    assert!(platform_x > 1.0, "платформа уехала: {}", platform_x);
    assert!((rider_x - platform_x).abs() < 0.2, "rider {} vs platform {}", rider_x, platform_x);
    assert!(is_grounded(&app, rider));
}

#[test]
fn test_rotating_bar_sweeps_character_down() {
    let mut course = CourseGeometry::flat_ground(20.0);
    // Балка вдоль X у пола, крутится вокруг вертикали
    let bar = course.add(CourseSolid::cuboid(Vec3::new(0.0, 0.5, 0.0), Vec3::new(3.0, 0.3, 0.2)));
    let mut app = app_with_course(course);
    app.world_mut()
        .spawn((Rotator::sweeper(bar, std::f32::consts::FRAC_PI_2), Bumper::new(bar)));
    let character = spawn_character(&mut app, Vec3::new(0.0, 0.0, -2.0));

    run(&mut app, 20);
    assert!(app.world().resource::<Recorded>().ragdoll_started.is_empty(), "балка ещё не дошла");
    let turned = app.world().resource::<CourseGeometry>().get(bar).unwrap().rotation * Vec3::X;
    assert!(turned.z < -0.1, "балка повернулась: {:?}", turned);

    run(&mut app, 70);
    assert_eq!(app.world().resource::<Recorded>().ragdoll_started, vec![character]);
}

#[test]
fn test_pendulum_moves_solid_around_pivot() {
    let mut course = CourseGeometry::flat_ground(20.0);
    let pivot = Vec3::new(0.0, 6.0, 0.0);
    let arm = Vec3::new(0.0, -4.0, 0.0);
    let weight = course.add(CourseSolid::cuboid(pivot + arm, Vec3::new(0.5, 0.5, 0.5)));
    let mut app = app_with_course(course);
    app.world_mut()
        .spawn(Pendulum::new(weight, pivot, arm, std::f32::consts::FRAC_PI_4, 2.0));

    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    for _ in 0..240 {
        app.update();
        let center = solid_center(&app, weight);
        assert!(((center - pivot).length() - 4.0).abs() < 1e-3, "длина подвеса постоянна");
        min_x = min_x.min(center.x);
        max_x = max_x.max(center.x);
    }

    assert!(max_x > 2.5 && min_x < -2.5, "качается в обе стороны: {} .. {}", min_x, max_x);
}

fn solid_center(app: &App, solid: SolidId) -> Vec3 {
    app.world().resource::<CourseGeometry>().get(solid).unwrap().center
}

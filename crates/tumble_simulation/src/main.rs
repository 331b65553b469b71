//! Headless симуляция TUMBLE
//!
//! Трасса: старт → рампа → пропасть с качающейся платформой → финиш с вращающейся балкой.
//! Боты бегут по графу, лог показывает прыжки, падения и смену целей.

use bevy::prelude::*;
use std::sync::Arc;

use tumble_simulation::hazards::{Bumper, MovingPlatform, Rotator};
use tumble_simulation::{
    bot_bundle, create_headless_app, set_log_level, BotAgentConfig, CourseGeometry, CourseSolid, LogLevel,
    NavigationGraph,
};

const DEMO_GRAPH: &str = r#"{
    "nodes": [
        { "name": "start_a", "position": [-2.0, 0.0, 0.0], "start": true,
          "edges": [ { "to": "ramp_foot", "cost": 0.2 }, { "to": "side", "cost": 0.6 } ] },
        { "name": "start_b", "position": [2.0, 0.0, 0.0], "start": true,
          "edges": [ { "to": "ramp_foot", "cost": 0.1 } ] },
        { "name": "side", "position": [-4.0, 0.0, -6.0],
          "edges": [ { "to": "ramp_foot", "cost": 0.0 } ] },
        { "name": "ramp_foot", "position": [0.0, 0.0, -8.0],
          "edges": [ { "to": "ramp_top", "cost": 0.0 } ] },
        { "name": "ramp_top", "position": [0.0, 1.0, -14.0], "reach_radius": 1.0,
          "edges": [ { "to": "ledge", "cost": 0.0 } ] },
        { "name": "ledge", "position": [0.0, 1.0, -16.5],
          "edges": [ { "to": "far_side", "cost": 0.0, "action": "wait_jump" } ] },
        { "name": "far_side", "position": [0.0, 1.0, -19.5], "reach_radius": 1.0,
          "edges": [ { "to": "finish", "cost": 0.0 } ] },
        { "name": "finish", "position": [0.0, 1.0, -26.0], "reach_radius": 1.5 }
    ]
}"#;

fn build_course(world: &mut World) {
    let mut course = CourseGeometry::new();
    // Старт
    course.add(CourseSolid::cuboid(Vec3::new(0.0, -0.5, -4.0), Vec3::new(6.0, 0.5, 6.0)));
    // Рампа до высоты 1 м (поднимается к -Z)
    course.add(CourseSolid::ramp(Vec3::new(0.0, 0.0, -12.0), Vec3::new(3.0, 0.5, 2.2), -14.0));
    // Верхняя площадка до края
    course.add(CourseSolid::cuboid(Vec3::new(0.0, 0.5, -15.5), Vec3::new(3.0, 0.5, 1.5)));
    // Финишная площадка за пропастью
    course.add(CourseSolid::cuboid(Vec3::new(0.0, 0.5, -23.0), Vec3::new(3.0, 0.5, 4.5)));
    // Качающаяся платформа в пропасти + бампер на финише
    let platform = course.add(CourseSolid::cuboid(Vec3::new(0.0, 0.3, -18.0), Vec3::new(1.0, 0.2, 0.8)));
    let bumper = course.add(CourseSolid::cuboid(Vec3::new(2.0, 1.6, -22.0), Vec3::new(0.4, 0.6, 0.4)));
    // Балка у пола перед финишем: толкает, но не сбивает
    let sweeper = course.add(CourseSolid::cuboid(Vec3::new(0.0, 1.4, -24.5), Vec3::new(2.5, 0.2, 0.15)));

    world.insert_resource(course);
    world.spawn(MovingPlatform::new(
        platform,
        Vec3::new(0.0, 0.3, -18.0),
        Vec3::X,
        2.0,
        1.2,
    ));
    world.spawn(Bumper::new(bumper));
    world.spawn(Rotator::sweeper(sweeper, 1.0));
}

fn main() {
    let seed = 42;
    println!("Starting TUMBLE headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    set_log_level(LogLevel::Info);

    build_course(app.world_mut());

    let graph = match NavigationGraph::from_json(DEMO_GRAPH) {
        Ok(graph) => Arc::new(graph),
        Err(error) => {
            eprintln!("Demo graph is invalid: {}", error);
            return;
        }
    };

    let spawns = [
        (Vec3::new(-2.0, 0.0, 1.0), 0.3),
        (Vec3::new(0.0, 0.0, 1.0), 0.7),
        (Vec3::new(2.0, 0.0, 1.0), 1.0),
    ];
    let bots: Vec<Entity> = spawns
        .iter()
        .map(|(feet, intelligence)| {
            let config = BotAgentConfig::default().with_intelligence(*intelligence);
            app.world_mut().spawn(bot_bundle(graph.clone(), config, *feet)).id()
        })
        .collect();

    // 30 секунд по 60 тиков
    for tick in 0..1800 {
        app.update();

        if tick % 300 == 0 {
            for bot in &bots {
                if let Some(transform) = app.world().get::<Transform>(*bot) {
                    println!("Tick {}: {:?} at {:.2}", tick, bot, transform.translation);
                }
            }
        }
    }

    println!("Simulation complete!");
}

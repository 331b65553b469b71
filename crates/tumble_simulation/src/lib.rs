//! TUMBLE Simulation Core
//!
//! Физика гуманоида для party-платформера на Bevy 0.16:
//! locomotion через силы, grounding с гистерезисом, ragdoll с подъёмом,
//! боты на графе waypoint'ов.
//!
//! Два темпа:
//! - Update (frame tick): решения ботов, ввод игрока, анимация: только intent
//! - FixedUpdate (physics tick, 60Hz): окружение → ragdoll → locomotion → step → контакты
//!
//! Physics backend: параметр типа (`HeadlessBackend` по умолчанию, `RapierBackend`).

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::marker::PhantomData;
use std::time::Duration;

// Публичные модули
pub mod ai;
pub mod animation;
pub mod components;
pub mod config;
pub mod ground;
pub mod hazards;
pub mod locomotion;
pub mod logger;
pub mod navigation;
pub mod physics;
pub mod player;
pub mod ragdoll;
pub mod respawn;
pub mod spawn;

// Re-export базовых типов для удобства
pub use ai::{AIPlugin, BotAgentConfig, BotDecisionAgent, LocomotionIntentState};
pub use animation::{AnimationPlugin, AnimationSink, AnimatorParams};
pub use components::*;
pub use config::{ConfigError, SimulationSettings};
pub use ground::{GroundConfig, GroundContactTracker, GroundPlugin, HitByOther, Landed};
pub use hazards::HazardsPlugin;
pub use locomotion::{LocomotionConfig, LocomotionController, LocomotionPlugin};
pub use logger::{
    init_logger, log, log_error, log_info, log_warning, log_with_level, set_log_level, set_logger,
    set_logger_if_needed, LogLevel, LogPrinter, MemoryLogger,
};
pub use navigation::{EdgeAction, NavGraphError, NavigationGraph, NodeId};
pub use physics::{CourseGeometry, CourseSolid, HeadlessBackend, PhysicsQuery, PhysicsQueryBackend, RapierBackend};
pub use player::{PlayerControl, PlayerInputEvent, PlayerPlugin};
pub use ragdoll::{GettingHit, RagdollPlugin, RagdollRecovered, RagdollStarted, RagdollTransitionManager};
pub use respawn::{CharacterReset, RespawnPlugin};
pub use spawn::{bot_bundle, character_bundle, player_bundle};

/// Порядок систем симуляции
///
/// FixedUpdate: Sense → Environment → Ragdoll → Locomotion → PhysicsStep → Contacts → Ground → Reactions
/// Update: Decide → Animate
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Readback внешнего physics backend'а
    Sense,
    /// Платформы, ветер, respawn
    Environment,
    /// Фазы ragdoll / подъёма
    Ragdoll,
    /// Physics tick controller'ов (единственный писатель CharacterBody)
    Locomotion,
    /// Интеграция и коллизии
    PhysicsStep,
    /// Батуты, бамперы (читают ContactBuffer до очистки)
    Contacts,
    /// GroundContactTracker → Landed / HitByOther
    Ground,
    /// Подписчики событий тика
    Reactions,
    /// Frame tick: боты и игрок
    Decide,
    /// Frame tick: параметры анимации
    Animate,
}

/// Главный plugin симуляции (объединяет все подсистемы)
///
/// `SimulationSettings` берутся из мира, если хост вставил их до плагина.
pub struct SimulationPlugin<B: PhysicsQueryBackend = HeadlessBackend>(PhantomData<B>);

impl<B: PhysicsQueryBackend> Default for SimulationPlugin<B> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<B: PhysicsQueryBackend> Plugin for SimulationPlugin<B> {
    fn build(&self, app: &mut App) {
        let settings = app
            .world()
            .get_resource::<SimulationSettings>()
            .cloned()
            .unwrap_or_default();

        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::Sense,
                SimulationSet::Environment,
                SimulationSet::Ragdoll,
                SimulationSet::Locomotion,
                SimulationSet::PhysicsStep,
                SimulationSet::Contacts,
                SimulationSet::Ground,
                SimulationSet::Reactions,
            )
                .chain(),
        )
        .configure_sets(Update, (SimulationSet::Decide, SimulationSet::Animate).chain());

        app
            // Fixed timestep для physics tick
            .insert_resource(Time::<Fixed>::from_hz(settings.physics_hz))
            // Детерминистичный RNG (выбор рёбер ботами)
            .insert_resource(DeterministicRng::new(settings.seed))
            .insert_resource(settings)
            .register_type::<SimulationSettings>()
            .register_type::<CharacterBody>()
            .register_type::<ExternalForces>();

        app.add_plugins((
            GroundPlugin,
            LocomotionPlugin::<B>::default(),
            RagdollPlugin,
            AIPlugin::<B>::default(),
            PlayerPlugin,
            AnimationPlugin,
            HazardsPlugin,
            RespawnPlugin,
        ))
        .add_plugins(B::step_plugin());
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Каждый `app.update()` двигает время ровно на один physics tick, так что
/// FixedUpdate и Update идут 1:1 и прогон воспроизводим.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();

    let settings = SimulationSettings::default().with_seed(seed);
    let step = Duration::from_secs_f64(1.0 / settings.physics_hz);

    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(step))
        .insert_resource(settings)
        .insert_resource(CourseGeometry::default())
        .add_plugins(SimulationPlugin::<HeadlessBackend>::default());

    app
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    // Сериализуем в байты через Debug (простейший способ)
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}

//! World state and level loading
//!
//! The world is an explicit value: every entity, pool, the broad phase and
//! the checkpoint store live here and are passed by reference into each
//! phase of the tick. Several worlds can coexist.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{LevelError, SimError};
use crate::persistence::{CheckpointStore, MemoryStore};
use crate::settings::Settings;
use crate::sim::body::{Body, BodyKind, Limb, Owner, Rect};
use crate::sim::enemy::{Enemy, EnemyKind};
use crate::sim::level::{LevelData, LevelSource, Parsed, Placement, Tilemap};
use crate::sim::player::Player;
use crate::sim::pool::Pools;
use crate::sim::quadtree::Quadtree;
use crate::sim::text::TextManager;

/// Gameplay events raised during a tick, for audio/visual collaborators.
///
/// Cleared at the start of every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A foot touched down
    Step(Limb),
    /// Two-foot jump
    Jump,
    PlayerHurt { at: Vec2 },
    EnemyShot { kind: EnemyKind },
    EnemyCrushed { kind: EnemyKind },
    EnemyExploded { at: Vec2 },
    CheckpointReached { x: i32, y: i32 },
    ExitReached,
    /// A queued message took the display slot
    TextShown,
}

/// Counters reported in the exit summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub hits_taken: u32,
    pub enemies_killed: u32,
}

/// Progress towards the level exit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitState {
    #[default]
    NotReached,
    /// Touched this tick; the summary is pushed in the post pass
    Reached,
    /// Summary shown, run over
    Summarized,
}

/// A loaded level being simulated
#[derive(Debug, Clone)]
pub struct World<S = MemoryStore> {
    pub settings: Settings,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub player: Player,
    /// Live enemies; inert ones are dropped in the post pass
    pub enemies: Vec<Enemy>,
    pub pools: Pools,
    pub text: TextManager,
    pub stats: RunStats,
    pub(crate) world_size: Vec2,
    pub(crate) floors: Vec<Body>,
    /// Checkpoint and exit areas
    pub(crate) areas: Vec<Body>,
    pub(crate) exit: ExitState,
    pub(crate) quadtree: Quadtree,
    pub(crate) store: S,
    pub(crate) events: Vec<SimEvent>,
    pub(crate) camera_target: Vec2,
}

impl<S: CheckpointStore> World<S> {
    /// Build a world from a tilemap and a stream of placements.
    ///
    /// A saved checkpoint in `store` overrides the level's player spawn.
    pub fn load(
        source: &mut dyn LevelSource,
        tilemap: &Tilemap,
        store: S,
        settings: Settings,
    ) -> Result<Self, SimError> {
        let world_size = tilemap.world_size();
        let bounds = Rect {
            pos: Vec2::ZERO,
            size: world_size,
        }
        .grow(settings.world_margin);
        let quadtree = Quadtree::new(
            bounds,
            settings.quadtree.max_depth,
            settings.quadtree.max_per_node,
        );

        let floors = tilemap
            .floor_rects()?
            .into_iter()
            .enumerate()
            .map(|(i, rect)| Body::new(BodyKind::Floor, Owner::Floor(i as u32), rect).immovable())
            .collect();

        let mut world = Self {
            time_ticks: 0,
            player: Player::spawn(0.0, 0.0),
            enemies: Vec::new(),
            pools: Pools::new(&settings)?,
            text: TextManager::new(settings.text_char_delay),
            stats: RunStats::default(),
            world_size,
            floors,
            areas: Vec::new(),
            exit: ExitState::NotReached,
            quadtree,
            store,
            events: Vec::new(),
            camera_target: Vec2::ZERO,
            settings,
        };

        let mut spawned = false;
        loop {
            let placement = match source.next_record()? {
                Parsed::Record(placement) => placement,
                Parsed::Finished => break,
            };
            match placement {
                Placement::Area {
                    kind,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let kind = match kind.as_str() {
                        "checkpoint" => BodyKind::Checkpoint,
                        "exit" => BodyKind::Exit,
                        _ => return Err(LevelError::UnknownArea(kind).into()),
                    };
                    let rect = Rect::new(x as f32, y as f32, width as f32, height as f32);
                    world.add_area(kind, rect);
                }
                Placement::Entity {
                    kind,
                    x,
                    y,
                    width,
                    height,
                    properties,
                } => {
                    let (x, y) = (x as f32, y as f32);
                    match kind.as_str() {
                        "lil_tank" => {
                            world.spawn_enemy(EnemyKind::PatrolTank, x, y, height as f32);
                        }
                        "turret" => {
                            world.spawn_enemy(EnemyKind::Turret, x, y, height as f32);
                        }
                        "player" => {
                            let (px, py) = match world.store.respawn_point() {
                                Some((cx, cy)) => (cx as f32, cy as f32),
                                None => (x + 16.0, y - 32.0),
                            };
                            world.player = Player::spawn(px, py);
                            spawned = true;
                        }
                        "text" => {
                            let properties: Vec<(String, String)> =
                                properties.into_iter().map(|p| (p.key, p.value)).collect();
                            let rect = Rect::new(x, y, width as f32, height as f32);
                            world.text.add_trigger(rect, &properties)?;
                        }
                        _ => return Err(LevelError::UnknownEntity(kind).into()),
                    }
                }
            }
        }

        if !spawned {
            return Err(LevelError::MissingPlayer.into());
        }
        world.camera_target = world.player.camera_target();

        log::info!(
            "Loaded level {}x{}: {} floors, {} areas, {} enemies, {} text triggers",
            world_size.x,
            world_size.y,
            world.floors.len(),
            world.areas.len(),
            world.enemies.len(),
            world.text.triggers().len()
        );
        Ok(world)
    }

    /// Load from parsed JSON level data
    pub fn from_level(level: &LevelData, store: S, settings: Settings) -> Result<Self, SimError> {
        Self::load(&mut level.records(), &level.tilemap, store, settings)
    }

    /// Add a static floor rectangle
    pub fn add_floor(&mut self, rect: Rect) -> Owner {
        let owner = Owner::Floor(self.floors.len() as u32);
        self.floors.push(Body::new(BodyKind::Floor, owner, rect).immovable());
        owner
    }

    /// Add a checkpoint or exit area
    pub fn add_area(&mut self, kind: BodyKind, rect: Rect) -> Owner {
        let owner = Owner::Area(self.areas.len() as u32);
        self.areas.push(Body::new(kind, owner, rect).immovable());
        owner
    }

    /// Spawn an enemy standing on a placement at `(x, y)` of height `placement_h`
    pub fn spawn_enemy(&mut self, kind: EnemyKind, x: f32, y: f32, placement_h: f32) -> Owner {
        let index = self.enemies.len() as u32;
        self.enemies.push(Enemy::spawn(kind, index, x, y, placement_h));
        Owner::Enemy(index)
    }

    /// World size in pixels, from the tilemap
    pub fn world_size(&self) -> Vec2 {
        self.world_size
    }

    pub fn world_bounds(&self) -> Rect {
        Rect {
            pos: Vec2::ZERO,
            size: self.world_size,
        }
    }

    /// Root of the broad phase, also the out-of-world limit for pools
    pub fn broad_phase_bounds(&self) -> Rect {
        self.world_bounds().grow(self.settings.world_margin)
    }

    /// Viewport centred on the camera target
    pub fn view(&self) -> Rect {
        let size = self.settings.viewport;
        Rect {
            pos: self.camera_target - size * 0.5,
            size,
        }
    }

    /// Resolve an owner handle. Stale handles give `None`.
    pub fn body(&self, owner: Owner) -> Option<&Body> {
        match owner {
            Owner::Floor(i) => self.floors.get(i as usize),
            Owner::Player(limb) => Some(self.player.body(limb)),
            Owner::Enemy(i) => self.enemies.get(i as usize).map(|e| &e.body),
            Owner::Pooled(id, slot) => self.pools.get(id).get(slot).map(|e| &e.body),
            Owner::Trigger(i) => self.text.trigger(i).map(|t| &t.body),
            Owner::Area(i) => self.areas.get(i as usize),
        }
    }

    pub fn body_mut(&mut self, owner: Owner) -> Option<&mut Body> {
        match owner {
            Owner::Floor(i) => self.floors.get_mut(i as usize),
            Owner::Player(limb) => Some(self.player.body_mut(limb)),
            Owner::Enemy(i) => self.enemies.get_mut(i as usize).map(|e| &mut e.body),
            Owner::Pooled(id, slot) => self.pools.get_mut(id).get_mut(slot).map(|e| &mut e.body),
            Owner::Trigger(i) => self.text.trigger_mut(i).map(|t| &mut t.body),
            Owner::Area(i) => self.areas.get_mut(i as usize),
        }
    }

    /// Events raised by the last tick
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Where the camera should centre (lower torso)
    pub fn camera_target(&self) -> Vec2 {
        self.camera_target
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn exit_state(&self) -> ExitState {
        self.exit
    }

    pub fn floors(&self) -> &[Body] {
        &self.floors
    }

    pub fn areas(&self) -> &[Body] {
        &self.areas
    }

    /// Consume the world, handing back its store
    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{CHECKPOINT_X, CHECKPOINT_Y};
    use crate::sim::level::Property;

    fn entity(kind: &str, x: i32, y: i32) -> Placement {
        Placement::Entity {
            kind: kind.to_string(),
            x,
            y,
            width: 16,
            height: 16,
            properties: Vec::new(),
        }
    }

    fn level(placements: Vec<Placement>) -> LevelData {
        LevelData {
            tilemap: Tilemap::empty(40, 20).with_floor_run(19, 0, 40),
            placements,
        }
    }

    fn load(placements: Vec<Placement>) -> Result<World, SimError> {
        World::from_level(&level(placements), MemoryStore::new(), Settings::default())
    }

    #[test]
    fn test_load_spawns_everything() {
        let text = Placement::Entity {
            kind: "text".to_string(),
            x: 64,
            y: 152,
            width: 16,
            height: 16,
            properties: vec![
                Property { key: "string".into(), value: "HELLO".into() },
                Property { key: "repeat".into(), value: "false".into() },
                Property { key: "ttl".into(), value: "1000".into() },
            ],
        };
        let checkpoint = Placement::Area {
            kind: "checkpoint".to_string(),
            x: 100,
            y: 120,
            width: 8,
            height: 32,
        };
        let world = load(vec![
            entity("player", 16, 152),
            entity("lil_tank", 200, 152),
            text,
            checkpoint,
        ])
        .unwrap();

        assert_eq!(world.world_size(), Vec2::new(320.0, 160.0));
        assert_eq!(world.floors().len(), 1);
        assert_eq!(world.enemies.len(), 1);
        assert_eq!(world.areas().len(), 1);
        assert_eq!(world.areas()[0].kind, BodyKind::Checkpoint);
        assert_eq!(world.text.triggers().len(), 1);
        assert_eq!(world.player.body(Limb::UpperTorso).pos, Vec2::new(32.0, 120.0));
        assert_eq!(world.camera_target(), world.player.camera_target());
        assert_eq!(world.exit_state(), ExitState::NotReached);
    }

    #[test]
    fn test_saved_checkpoint_overrides_spawn() {
        let mut store = MemoryStore::new();
        store.write(CHECKPOINT_X, 120).unwrap();
        store.write(CHECKPOINT_Y, 80).unwrap();
        let data = level(vec![entity("player", 16, 152)]);
        let world = World::from_level(&data, store, Settings::default()).unwrap();
        assert_eq!(world.player.body(Limb::UpperTorso).pos, Vec2::new(120.0, 80.0));
    }

    #[test]
    fn test_load_errors() {
        let err = load(vec![entity("dragon", 0, 0)]).unwrap_err();
        assert!(matches!(
            err,
            SimError::Level(LevelError::UnknownEntity(ref kind)) if kind == "dragon"
        ));

        let area = Placement::Area {
            kind: "lava".to_string(),
            x: 0,
            y: 0,
            width: 8,
            height: 8,
        };
        let err = load(vec![area]).unwrap_err();
        assert!(matches!(err, SimError::Level(LevelError::UnknownArea(_))));

        let err = load(vec![entity("turret", 0, 0)]).unwrap_err();
        assert!(matches!(err, SimError::Level(LevelError::MissingPlayer)));

        let err = load(vec![entity("player", 16, 152), entity("text", 0, 0)]).unwrap_err();
        assert!(matches!(err, SimError::Level(LevelError::PropertyCount { found: 0, .. })));
    }

    #[test]
    fn test_owner_handles_resolve() {
        let mut world = load(vec![entity("player", 16, 152)]).unwrap();
        let enemy = world.spawn_enemy(EnemyKind::Turret, 80.0, 152.0, 8.0);
        let floor = world.add_floor(Rect::new(0.0, 0.0, 8.0, 8.0));

        assert_eq!(world.body(enemy).map(|b| b.kind), Some(BodyKind::Turret));
        assert_eq!(world.body(floor).map(|b| b.kind), Some(BodyKind::Floor));
        assert_eq!(world.body(Owner::Enemy(7)), None);

        let slot = world.pools.bullets.recycle().body.owner;
        assert_eq!(world.body(slot).map(|b| b.kind), Some(BodyKind::Bullet));
        let Owner::Pooled(_, index) = slot else {
            panic!("bullets are pooled");
        };
        world.pools.bullets.kill(index);
        assert_eq!(world.body(slot), None);
    }

    #[test]
    fn test_view_follows_camera() {
        let world = load(vec![entity("player", 16, 152)]).unwrap();
        let view = world.view();
        assert_eq!(view.size, world.settings.viewport);
        assert!((view.center() - world.camera_target()).length() < 1e-4);
        assert_eq!(world.broad_phase_bounds(), world.world_bounds().grow(WORLD_MARGIN));
    }
}

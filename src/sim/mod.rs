//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (enemies by index, pools by slot, pairs by owner)
//! - No rendering, audio or platform dependencies

pub mod body;
pub mod collision;
pub mod enemy;
pub mod level;
pub mod player;
pub mod pool;
pub mod quadtree;
pub mod state;
pub mod text;
pub mod tick;

pub use body::{Body, BodyKind, Contact, Limb, Owner, PoolId, Rect};
pub use collision::{Order, Response, classify};
pub use enemy::{Enemy, EnemyKind, HurtStage};
pub use level::{LevelData, LevelSource, Parsed, Placement, Property, Tilemap};
pub use player::{Player, Pose};
pub use pool::{Anim, CollisionQuality, Pool, PoolConfig, PoolEntry, Pools};
pub use quadtree::{QueryState, Quadtree};
pub use state::{ExitState, RunStats, SimEvent, World};
pub use text::{TextManager, TextTrigger, Typewriter};
pub use tick::{ButtonState, TickInput, exit_summary, tick};

//! Fixed timestep simulation tick
//!
//! One call advances the world by `dt` in a fixed phase order:
//! 1. Rebuild the broad phase around the floors
//! 2. Enemies update and collide
//! 3. Checkpoint and exit areas are indexed
//! 4. Particles, bullets and props update; bullets and props collide
//! 5. Player legs move, then every player body collides
//! 6. Text triggers collide
//! 7. Post pass: enemy transitions, jump trigger and torso, exit summary,
//!    text queue
//!
//! Collision handlers only raise flags on entities; the post pass consumes them.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;
use crate::persistence::CheckpointStore;
use crate::sim::body::{Limb, Owner, PoolId};
use crate::sim::state::{ExitState, RunStats, World};

/// Per-tick state of one button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ButtonState {
    #[default]
    Released,
    JustPressed,
    Held,
    JustReleased,
}

impl ButtonState {
    /// State for this tick given the raw pressed bit
    pub fn next(self, pressed: bool) -> Self {
        match (self.is_down(), pressed) {
            (false, true) => ButtonState::JustPressed,
            (true, true) => ButtonState::Held,
            (true, false) => ButtonState::JustReleased,
            (false, false) => ButtonState::Released,
        }
    }

    pub fn is_down(self) -> bool {
        matches!(self, ButtonState::JustPressed | ButtonState::Held)
    }
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub left_leg: ButtonState,
    pub right_leg: ButtonState,
}

impl TickInput {
    /// Follow-up input from the raw state of both buttons
    pub fn next(self, left: bool, right: bool) -> Self {
        Self {
            left_leg: self.left_leg.next(left),
            right_leg: self.right_leg.next(right),
        }
    }
}

/// Advance the world by one fixed timestep.
///
/// An error aborts the rest of the tick; the world is left as it was at the
/// failing step and the next tick starts from a fresh broad phase.
pub fn tick<S: CheckpointStore>(
    world: &mut World<S>,
    input: &TickInput,
    dt: f32,
) -> Result<(), SimError> {
    world.events.clear();
    world.time_ticks += 1;

    // Static geometry first
    let bounds = world.broad_phase_bounds();
    world.quadtree.reset(bounds);
    for floor in &world.floors {
        world.quadtree.insert(floor.owner, floor.rect());
    }

    for index in 0..world.enemies.len() {
        let query = world.enemies[index].pre_update(dt, &mut world.pools, &mut world.events);
        if query {
            world.collide_owner(Owner::Enemy(index as u32))?;
        }
    }

    for area in &mut world.areas {
        area.begin_frame();
        world.quadtree.insert(area.owner, area.rect());
    }

    // Particles are cosmetic and never indexed
    world.pools.particles.update(dt, &bounds);
    world.pools.bullets.update(dt, &bounds);
    world.collide_pool(PoolId::Bullets)?;
    world.pools.props.update(dt, &bounds);
    world.collide_pool(PoolId::Props)?;

    world.player.pre_update(input, dt);
    for limb in [Limb::LeftLeg, Limb::RightLeg, Limb::UpperTorso, Limb::LowerTorso] {
        world.collide_owner(Owner::Player(limb))?;
    }

    for index in 0..world.text.triggers().len() as u32 {
        if let Some(trigger) = world.text.trigger_mut(index) {
            trigger.body.begin_frame();
        }
        world.collide_owner(Owner::Trigger(index))?;
    }

    post_update(world, dt)
}

fn post_update<S: CheckpointStore>(world: &mut World<S>, dt: f32) -> Result<(), SimError> {
    for enemy in &mut world.enemies {
        enemy.post_update();
    }
    let before = world.enemies.len();
    world.enemies.retain(|enemy| !enemy.is_inert());
    if world.enemies.len() != before {
        for (index, enemy) in world.enemies.iter_mut().enumerate() {
            enemy.set_index(index as u32);
        }
        log::debug!("Removed {} inert enemies", before - world.enemies.len());
    }

    world.player.post_update(dt, &mut world.events);
    world.camera_target = world.player.camera_target();

    if world.exit == ExitState::Reached {
        // The run is over; the next attempt starts from the level spawn
        world.store.erase()?;
        world.text.push_text(exit_summary(&world.stats), EXIT_TEXT_TTL);
        world.exit = ExitState::Summarized;
        log::info!(
            "Run complete: {} hits taken, {} enemies killed",
            world.stats.hits_taken,
            world.stats.enemies_killed
        );
    }

    world.text.post_update(dt, &mut world.events);
    Ok(())
}

/// End-of-level message
pub fn exit_summary(stats: &RunStats) -> String {
    format!(
        "YOU GOT TO THE EXIT! YOU WERE HIT {:06} TIMES AND KILLED {:02} ENEMIES.\n\n\
         THANKS FOR PLAYING\n\nPRESS 'R' TO RESTART",
        stats.hits_taken.min(999_999),
        stats.enemies_killed.min(99)
    )
}

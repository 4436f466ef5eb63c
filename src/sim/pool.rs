//! Fixed-capacity recyclable pools for bullets, props and particles
//!
//! Slots live in a flat arena with a free list. Recycling prefers a free slot
//! and falls back to the oldest live one, so a full pool never refuses a
//! spawn. Recycled entries are overwritten wholesale; nothing from the
//! previous occupant survives.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;
use crate::settings::Settings;
use crate::sim::body::{Body, BodyKind, Owner, PoolId, Rect};

/// Animation a pooled entry plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Anim {
    #[default]
    Bullet,
    Pellet1,
    Pellet2,
    Explosion,
}

/// When a pooled entry takes part in collision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionQuality {
    Always,
    /// Only while inside the camera viewport
    OnScreen,
}

/// Defaults stamped onto every recycled entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolConfig {
    pub capacity: usize,
    pub kind: BodyKind,
    pub size: Vec2,
    pub offset: Vec2,
    pub vel: Vec2,
    pub accel: Vec2,
    pub anim: Anim,
    pub die_outside_world: bool,
    pub ttl: Option<f32>,
    pub quality: CollisionQuality,
}

impl PoolConfig {
    pub fn particles(capacity: usize) -> Self {
        Self {
            capacity,
            kind: BodyKind::Particle,
            size: Vec2::splat(8.0),
            offset: Vec2::ZERO,
            vel: Vec2::ZERO,
            accel: Vec2::ZERO,
            anim: Anim::Explosion,
            die_outside_world: true,
            ttl: Some(PARTICLE_TTL),
            quality: CollisionQuality::OnScreen,
        }
    }

    pub fn bullets(capacity: usize) -> Self {
        Self {
            capacity,
            kind: BodyKind::Bullet,
            size: Vec2::splat(4.0),
            offset: Vec2::splat(-2.0),
            anim: Anim::Bullet,
            ..Self::particles(capacity)
        }
    }

    pub fn props(capacity: usize) -> Self {
        Self {
            kind: BodyKind::Prop,
            accel: Vec2::new(0.0, GRAVITY),
            anim: Anim::Pellet1,
            ..Self::bullets(capacity)
        }
    }
}

/// One pooled object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolEntry {
    pub body: Body,
    pub anim: Anim,
    /// Seconds since the entry was recycled
    pub age: f32,
    alive: bool,
    serial: u64,
}

impl PoolEntry {
    fn fresh(config: &PoolConfig, owner: Owner, serial: u64) -> Self {
        let mut body = Body::new(config.kind, owner, Rect { pos: Vec2::ZERO, size: config.size })
            .with_offset(config.offset);
        body.vel = config.vel;
        body.accel = config.accel;
        Self {
            body,
            anim: config.anim,
            age: 0.0,
            alive: true,
            serial,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Place the entry and restamp its start-of-tick position
    pub fn place(&mut self, pos: Vec2) -> &mut Self {
        self.body.set_position(pos);
        self
    }

    pub fn with_velocity(&mut self, vel: Vec2) -> &mut Self {
        self.body.vel = vel;
        self
    }

    pub fn with_accel(&mut self, accel: Vec2) -> &mut Self {
        self.body.accel = accel;
        self
    }

    pub fn with_anim(&mut self, anim: Anim) -> &mut Self {
        self.anim = anim;
        self
    }
}

/// A recyclable arena of bodies
#[derive(Debug, Clone)]
pub struct Pool {
    id: PoolId,
    config: PoolConfig,
    entries: Vec<PoolEntry>,
    free: Vec<u32>,
    /// Live slots in spawn order; stale records are skipped lazily
    order: VecDeque<(u32, u64)>,
    next_serial: u64,
}

impl Pool {
    pub fn new(id: PoolId, config: PoolConfig) -> Result<Self, SimError> {
        if config.capacity == 0 {
            return Err(SimError::EmptyPool(id));
        }
        let entries = (0..config.capacity)
            .map(|slot| {
                let mut entry = PoolEntry::fresh(&config, Owner::Pooled(id, slot as u32), 0);
                entry.alive = false;
                entry
            })
            .collect();
        Ok(Self {
            id,
            config,
            entries,
            free: (0..config.capacity as u32).rev().collect(),
            order: VecDeque::with_capacity(config.capacity),
            next_serial: 1,
        })
    }

    pub fn id(&self) -> PoolId {
        self.id
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn live_count(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    /// Take a free slot (or the oldest live one) and reset it to the pool defaults
    pub fn recycle(&mut self) -> &mut PoolEntry {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => self.oldest_live(),
        };
        let serial = self.next_serial;
        self.next_serial += 1;
        self.order.push_back((slot, serial));

        let entry = &mut self.entries[slot as usize];
        *entry = PoolEntry::fresh(&self.config, Owner::Pooled(self.id, slot), serial);
        entry
    }

    /// Return a slot to the free list
    pub fn kill(&mut self, slot: u32) {
        let Some(entry) = self.entries.get_mut(slot as usize) else {
            return;
        };
        if !entry.alive {
            return;
        }
        entry.alive = false;
        self.free.push(slot);

        if self.order.len() > self.entries.len() * 2 {
            let entries = &self.entries;
            self.order.retain(|&(slot, serial)| {
                let entry = &entries[slot as usize];
                entry.alive && entry.serial == serial
            });
        }
    }

    pub fn get(&self, slot: u32) -> Option<&PoolEntry> {
        self.entries.get(slot as usize).filter(|entry| entry.alive)
    }

    pub fn get_mut(&mut self, slot: u32) -> Option<&mut PoolEntry> {
        self.entries.get_mut(slot as usize).filter(|entry| entry.alive)
    }

    /// Live entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = &PoolEntry> + '_ {
        self.entries.iter().filter(|entry| entry.alive)
    }

    /// Slots worth querying this tick
    pub fn collidable_slots(&self, view: &Rect) -> Vec<u32> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.alive)
            .filter(|(_, entry)| match self.config.quality {
                CollisionQuality::Always => true,
                CollisionQuality::OnScreen => entry.body.rect().overlaps(view),
            })
            .map(|(slot, _)| slot as u32)
            .collect()
    }

    /// Integrate every live entry, then retire expired or escaped ones
    pub fn update(&mut self, dt: f32, world: &Rect) {
        let mut dead = Vec::new();
        for (slot, entry) in self.entries.iter_mut().enumerate() {
            if !entry.alive {
                continue;
            }
            entry.body.update(dt);
            entry.age += dt;

            let expired = self.config.ttl.is_some_and(|ttl| entry.age > ttl);
            let escaped = self.config.die_outside_world && !entry.body.rect().overlaps(world);
            if expired || escaped {
                dead.push(slot as u32);
            }
        }
        for slot in dead {
            self.kill(slot);
        }
    }

    fn oldest_live(&mut self) -> u32 {
        while let Some((slot, serial)) = self.order.pop_front() {
            let entry = &self.entries[slot as usize];
            if entry.alive && entry.serial == serial {
                return slot;
            }
        }
        // Every live slot is recorded in `order`, so this only happens if the
        // pool somehow has neither free nor live slots.
        0
    }
}

/// The world's three pools
#[derive(Debug, Clone)]
pub struct Pools {
    pub particles: Pool,
    pub bullets: Pool,
    pub props: Pool,
}

impl Pools {
    pub fn new(settings: &Settings) -> Result<Self, SimError> {
        Ok(Self {
            particles: Pool::new(
                PoolId::Particles,
                PoolConfig::particles(settings.particle_capacity),
            )?,
            bullets: Pool::new(PoolId::Bullets, PoolConfig::bullets(settings.bullet_capacity))?,
            props: Pool::new(PoolId::Props, PoolConfig::props(settings.prop_capacity))?,
        })
    }

    pub fn get(&self, id: PoolId) -> &Pool {
        match id {
            PoolId::Particles => &self.particles,
            PoolId::Bullets => &self.bullets,
            PoolId::Props => &self.props,
        }
    }

    pub fn get_mut(&mut self, id: PoolId) -> &mut Pool {
        match id {
            PoolId::Particles => &mut self.particles,
            PoolId::Bullets => &mut self.bullets,
            PoolId::Props => &mut self.props,
        }
    }

    /// Spawn a single explosion particle at `pos`
    pub fn spawn_explosion(&mut self, pos: Vec2, vel: Vec2) {
        self.particles.recycle().place(pos).with_velocity(vel).with_anim(Anim::Explosion);
    }
}

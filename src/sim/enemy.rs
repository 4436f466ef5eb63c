//! Patrol tanks and turrets
//!
//! Enemies run a two-phase update: `pre_update` advances timers, fires
//! volleys, integrates and reports whether the body should be queried;
//! collision handlers only raise flags; `post_update` consumes them.
//!
//! Hurt lifecycle: `Active -> JustHurt -> Dying -> Inert`. Inert enemies are
//! dropped by the world at the end of the tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::body::{Body, BodyKind, Contact, Owner, Rect};
use crate::sim::pool::{Anim, Pools};
use crate::sim::state::SimEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Walks, turns at walls, stops to fire volleys
    PatrolTank,
    /// Stationary, fires straight up
    Turret,
}

impl EnemyKind {
    pub fn body_kind(self) -> BodyKind {
        match self {
            EnemyKind::PatrolTank => BodyKind::PatrolTank,
            EnemyKind::Turret => BodyKind::Turret,
        }
    }

    fn shot_interval(self) -> f32 {
        match self {
            EnemyKind::PatrolTank => TANK_SHOT_INTERVAL,
            EnemyKind::Turret => TURRET_SHOT_INTERVAL,
        }
    }

    fn volley(self) -> u32 {
        match self {
            EnemyKind::PatrolTank => TANK_VOLLEY,
            EnemyKind::Turret => TURRET_VOLLEY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HurtStage {
    Active,
    /// Stomped this tick; becomes `Dying` in the post pass
    JustHurt,
    /// Playing the death clip; not collided
    Dying,
    /// Done; removed at the end of the tick
    Inert,
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub body: Body,
    kind: EnemyKind,
    /// Counts down to the next shot or volley
    time_to_action: f32,
    shots_left: u32,
    /// Raised by a horizontal floor contact, consumed in `post_update`
    pending_flip: bool,
    facing_right: bool,
    stage: HurtStage,
    death_clock: f32,
    /// Downward speed of the stomp that hurt this enemy
    impact: Option<f32>,
}

impl Enemy {
    /// Spawn from a level placement whose top-left is `(x, y)` and whose
    /// height is `placement_h`; enemies stand on the placement's top edge.
    pub fn spawn(kind: EnemyKind, index: u32, x: f32, y: f32, placement_h: f32) -> Self {
        let y = y - placement_h;
        let owner = Owner::Enemy(index);
        let mut body = match kind {
            EnemyKind::PatrolTank => Body::new(kind.body_kind(), owner, Rect::new(x, y, 6.0, 8.0))
                .with_offset(Vec2::new(-5.0, -8.0)),
            EnemyKind::Turret => Body::new(kind.body_kind(), owner, Rect::new(x + 4.0, y, 8.0, 8.0))
                .with_offset(Vec2::new(-4.0, -8.0)),
        };
        body.accel = Vec2::new(0.0, GRAVITY);
        if kind == EnemyKind::PatrolTank {
            body.vel = Vec2::new(TANK_VX, 0.0);
        }

        Self {
            body,
            kind,
            time_to_action: kind.shot_interval(),
            shots_left: kind.volley(),
            pending_flip: false,
            facing_right: false,
            stage: HurtStage::Active,
            death_clock: 0.0,
            impact: None,
        }
    }

    pub fn kind(&self) -> EnemyKind {
        self.kind
    }

    pub fn stage(&self) -> HurtStage {
        self.stage
    }

    pub fn is_inert(&self) -> bool {
        self.stage == HurtStage::Inert
    }

    pub fn facing_right(&self) -> bool {
        self.facing_right
    }

    pub fn shots_left(&self) -> u32 {
        self.shots_left
    }

    pub fn time_to_action(&self) -> f32 {
        self.time_to_action
    }

    pub fn pending_flip(&self) -> bool {
        self.pending_flip
    }

    pub fn impact(&self) -> Option<f32> {
        self.impact
    }

    /// Re-point the body's owner handle after the enemy list was compacted
    pub(crate) fn set_index(&mut self, index: u32) {
        self.body.owner = Owner::Enemy(index);
    }

    /// Advance timers and motion. Returns `true` if the body should be
    /// queried against the broad phase this tick.
    pub fn pre_update(&mut self, dt: f32, pools: &mut Pools, events: &mut Vec<SimEvent>) -> bool {
        match self.stage {
            HurtStage::Inert => return false,
            HurtStage::Dying => {
                self.body.update(dt);
                self.death_clock += dt;
                if self.death_clock >= DEATH_FRAMES as f32 / DEATH_FPS {
                    self.explode(pools);
                    events.push(SimEvent::EnemyExploded { at: self.body.pos });
                    self.stage = HurtStage::Inert;
                }
                return false;
            }
            HurtStage::Active | HurtStage::JustHurt => {}
        }

        if self.time_to_action > 0.0 {
            self.time_to_action -= dt;
        } else {
            self.act(pools, events);
        }

        self.body.update(dt);
        true
    }

    /// Consume flags raised during collision
    pub fn post_update(&mut self) {
        match self.stage {
            HurtStage::Active if self.pending_flip => {
                self.facing_right = !self.facing_right;
                self.body.vel.x = -self.body.vel.x;
                self.pending_flip = false;
            }
            HurtStage::JustHurt => {
                self.body.vel = Vec2::ZERO;
                self.body.accel = Vec2::ZERO;
                self.death_clock = 0.0;
                self.stage = HurtStage::Dying;
            }
            _ => {}
        }
    }

    /// Register a stomp. Only an active enemy can be hurt; returns whether it was.
    pub fn hurt(&mut self, impact: f32) -> bool {
        if self.stage != HurtStage::Active {
            return false;
        }
        self.stage = HurtStage::JustHurt;
        self.impact = Some(impact);
        true
    }

    /// Resolve against a floor: landing stops the fall, a wall queues a turn
    pub fn collide_floor(&mut self, floor: &mut Body) {
        if !self.body.collide(floor) {
            return;
        }
        let hit = self.body.current_hit();
        if hit.intersects(Contact::DOWN) {
            self.body.vel.y = 0.0;
        }
        if hit.intersects(Contact::HORIZONTAL) {
            self.pending_flip = true;
        }
    }

    fn act(&mut self, pools: &mut Pools, events: &mut Vec<SimEvent>) {
        if self.shots_left == 0 {
            self.rest();
            return;
        }

        let pos = self.body.pos;
        match self.kind {
            EnemyKind::PatrolTank => {
                self.body.vel.x = 0.0;
                let (x, vx) = if self.facing_right {
                    (pos.x + 8.0, -TANK_VX)
                } else {
                    (pos.x - 4.0, TANK_VX)
                };
                let at = Vec2::new(x, pos.y - 1.0);
                pools
                    .bullets
                    .recycle()
                    .place(at)
                    .with_velocity(Vec2::new(vx, TANK_SHOT_VY))
                    .with_anim(Anim::Bullet);
                pools
                    .props
                    .recycle()
                    .place(at)
                    .with_velocity(Vec2::new(-vx, TANK_SHOT_VY))
                    .with_accel(Vec2::new(0.0, GRAVITY))
                    .with_anim(Anim::Pellet1);
            }
            EnemyKind::Turret => {
                let x = pos.x + 4.0;
                pools
                    .bullets
                    .recycle()
                    .place(Vec2::new(x, pos.y - 3.0))
                    .with_velocity(Vec2::new(0.0, TURRET_BULLET_VY))
                    .with_anim(Anim::Bullet);
                pools
                    .props
                    .recycle()
                    .place(Vec2::new(x, pos.y - 1.0))
                    .with_velocity(Vec2::new(TURRET_PELLET_VX, TURRET_PELLET_VY))
                    .with_accel(Vec2::new(0.0, GRAVITY))
                    .with_anim(Anim::Pellet1);
            }
        }

        self.time_to_action = self.kind.shot_interval();
        self.shots_left -= 1;
        events.push(SimEvent::EnemyShot { kind: self.kind });
    }

    /// Volley finished: tanks walk on, both kinds reload
    fn rest(&mut self) {
        match self.kind {
            EnemyKind::PatrolTank => {
                self.body.vel.x = if self.facing_right { -TANK_VX } else { TANK_VX };
                self.time_to_action = TANK_REST_TIME;
            }
            EnemyKind::Turret => self.time_to_action = TURRET_REST_TIME,
        }
        self.shots_left = self.kind.volley();
    }

    /// Eight explosion particles at 45 degree steps
    fn explode(&self, pools: &mut Pools) {
        for i in 0..8 {
            let angle = i as f32 * std::f32::consts::FRAC_PI_4;
            let vel = Vec2::from_angle(angle) * EXPLOSION_SPEED;
            pools.spawn_explosion(self.body.pos, vel);
        }
    }
}

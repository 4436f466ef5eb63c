//! Pairwise collision dispatch
//!
//! Every candidate pair from the broad phase is classified by the ordered
//! pair of its body kinds. Each table row names the response and which side
//! is the *subject* (the body the response is written for); a pair found in
//! the opposite order is swapped before the handler runs.
//!
//! Handlers re-check exact overlap where it matters, since an earlier pair
//! of the same query may already have moved one of the bodies.

use glam::Vec2;

use crate::consts::*;
use crate::error::SimError;
use crate::persistence::{CHECKPOINT_X, CHECKPOINT_Y, CheckpointStore};
use crate::settings::{BounceSettings, UnclassifiedPolicy};
use crate::sim::body::{Body, BodyKind, Contact, Owner, PoolId};
use crate::sim::player::limb_floor_response;
use crate::sim::state::{ExitState, SimEvent, World};

/// Damping of the prop-vs-prop exchange
const ELASTIC_DAMPING: f32 = 0.5;

/// Notice pushed when a checkpoint is saved
pub const CHECKPOINT_TEXT: &str = "               CHECKPOINT";

/// What to do with a classified pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Known pair that never needs handling
    Ignore,
    /// Leg lands on or walks into floor
    LimbFloor,
    /// Enemy against floor: stop falling, turn at walls
    EnemyFloor,
    /// Bullet or prop rebounds off floor
    Bounce,
    /// Two props exchange damped velocities
    Elastic,
    /// Enemy shoves a prop out of the way
    Push,
    /// Bullet hits any player part
    HurtPlayer,
    /// Leg crushes an enemy
    Stomp,
    /// Leg walks into a text trigger
    Dialog,
    /// Upper torso reaches a checkpoint
    Checkpoint,
    /// Any player part reaches the exit
    Exit,
}

/// Whether the pair matched its table row as found or reversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    AsIs,
    Swapped,
}

/// Classify an ordered pair of kinds.
///
/// Returns `None` for pairs with no table row (a content or coverage bug).
pub fn classify(first: BodyKind, second: BodyKind) -> Option<(Response, Order)> {
    if let Some(response) = subject_first(first, second) {
        return Some((response, Order::AsIs));
    }
    subject_first(second, first).map(|response| (response, Order::Swapped))
}

/// Table rows, written with the subject on the left
fn subject_first(subject: BodyKind, object: BodyKind) -> Option<Response> {
    use BodyKind::*;

    let response = match (subject, object) {
        (LeftLeg | RightLeg, Floor) => Response::LimbFloor,
        (LeftLeg | RightLeg, PatrolTank | Turret) => Response::Stomp,
        (UpperTorso | LowerTorso | LeftLeg | RightLeg, Bullet) => Response::HurtPlayer,
        (UpperTorso | LowerTorso | LeftLeg | RightLeg, Exit) => Response::Exit,
        (UpperTorso, Checkpoint) => Response::Checkpoint,
        (Text, LeftLeg | RightLeg) => Response::Dialog,
        (PatrolTank | Turret, Floor) => Response::EnemyFloor,
        (PatrolTank | Turret, Prop) => Response::Push,
        (Bullet | Prop, Floor) => Response::Bounce,
        (Prop, Prop) => Response::Elastic,

        // Player parts never touch each other
        (
            UpperTorso | LowerTorso | LeftLeg | RightLeg,
            UpperTorso | LowerTorso | LeftLeg | RightLeg,
        ) => Response::Ignore,
        // The torso floats on the legs
        (UpperTorso | LowerTorso, Floor | PatrolTank | Turret | Prop | Text) => Response::Ignore,
        (LowerTorso | LeftLeg | RightLeg, Checkpoint) => Response::Ignore,
        (LeftLeg | RightLeg, Prop) => Response::Ignore,
        (Floor, Floor | Text | Checkpoint | Exit) => Response::Ignore,
        (Bullet, PatrolTank | Turret | Bullet | Prop) => Response::Ignore,
        (Bullet, Text | Checkpoint | Exit) => Response::Ignore,
        (PatrolTank | Turret, PatrolTank | Turret | Text | Checkpoint | Exit) => Response::Ignore,
        (Prop, Text | Checkpoint | Exit) => Response::Ignore,
        (Text, Text | Checkpoint | Exit) => Response::Ignore,
        (Checkpoint, Checkpoint | Exit) | (Exit, Exit) => Response::Ignore,

        _ => return None,
    };
    Some(response)
}

impl<S: CheckpointStore> World<S> {
    /// Query one body against the broad phase and resolve every pair found
    pub fn collide_owner(&mut self, owner: Owner) -> Result<(), SimError> {
        let rect = self.body(owner).ok_or(SimError::MissingBody(owner))?.rect();
        self.quadtree.collide(owner, rect)?;
        self.drain_overlaps()
    }

    /// Query every collidable entry of a pool, in slot order
    pub fn collide_pool(&mut self, id: PoolId) -> Result<(), SimError> {
        let view = self.view();
        for slot in self.pools.get(id).collidable_slots(&view) {
            let owner = Owner::Pooled(id, slot);
            // Killed by an earlier pair of this pass
            let Some(rect) = self.body(owner).map(Body::rect) else {
                continue;
            };
            self.quadtree.collide(owner, rect)?;
            self.drain_overlaps()?;
        }
        Ok(())
    }

    fn drain_overlaps(&mut self) -> Result<(), SimError> {
        while let Some((first, second)) = self.quadtree.next_pair() {
            self.resolve(first, second)?;
        }
        Ok(())
    }

    /// Classify one pair and run its handler
    pub(crate) fn resolve(&mut self, first: Owner, second: Owner) -> Result<(), SimError> {
        let (Some(first_kind), Some(second_kind)) =
            (self.body(first).map(|b| b.kind), self.body(second).map(|b| b.kind))
        else {
            log::trace!("Skipping stale pair {first:?} / {second:?}");
            return Ok(());
        };

        let Some((response, order)) = classify(first_kind, second_kind) else {
            return self.unclassified(first_kind, first, second_kind, second);
        };
        let (subject, object) = match order {
            Order::AsIs => (first, second),
            Order::Swapped => (second, first),
        };

        match response {
            Response::Ignore => {}
            Response::LimbFloor => {
                self.with_pair(subject, object, limb_floor_response);
            }
            Response::EnemyFloor => self.enemy_floor(subject, object),
            Response::Bounce => {
                let bounce = self.settings.bounce;
                self.with_pair(subject, object, |item, floor| bounce_off(item, floor, &bounce));
            }
            Response::Elastic => {
                self.with_pair(subject, object, elastic);
            }
            Response::Push => {
                self.with_pair(subject, object, push);
            }
            Response::HurtPlayer => self.hurt_player(subject, object),
            Response::Stomp => self.stomp(subject, object),
            Response::Dialog => self.dialog(subject, object),
            Response::Checkpoint => self.checkpoint(subject, object)?,
            Response::Exit => self.reach_exit(subject, object),
        }
        Ok(())
    }

    fn unclassified(
        &self,
        first: BodyKind,
        first_owner: Owner,
        second: BodyKind,
        second_owner: Owner,
    ) -> Result<(), SimError> {
        match self.settings.unclassified_pair {
            UnclassifiedPolicy::Abort => {
                let error = SimError::UnclassifiedPair {
                    first,
                    first_owner,
                    second,
                    second_owner,
                };
                log::error!("{error}");
                Err(error)
            }
            UnclassifiedPolicy::Warn => {
                log::warn!("Ignoring unclassified collision {first:?} vs {second:?}");
                Ok(())
            }
        }
    }

    /// Run `f` on copies of both bodies and write them back
    fn with_pair<R>(
        &mut self,
        a: Owner,
        b: Owner,
        f: impl FnOnce(&mut Body, &mut Body) -> R,
    ) -> Option<R> {
        let mut first = *self.body(a)?;
        let mut second = *self.body(b)?;
        let result = f(&mut first, &mut second);
        self.put(first);
        self.put(second);
        Some(result)
    }

    fn put(&mut self, body: Body) {
        if let Some(slot) = self.body_mut(body.owner) {
            *slot = body;
        }
    }

    fn enemy_floor(&mut self, enemy: Owner, floor: Owner) {
        let Owner::Enemy(index) = enemy else {
            return;
        };
        let Some(mut floor) = self.body(floor).copied() else {
            return;
        };
        if let Some(enemy) = self.enemies.get_mut(index as usize) {
            enemy.collide_floor(&mut floor);
        }
        self.put(floor);
    }

    fn hurt_player(&mut self, part: Owner, bullet: Owner) {
        let Owner::Pooled(pool, slot) = bullet else {
            return;
        };
        let (Some(part_body), Some(bullet_body)) = (self.body(part), self.body(bullet)) else {
            return;
        };
        if !part_body.overlaps(bullet_body) {
            return;
        }
        let at = bullet_body.pos;

        self.pools.get_mut(pool).kill(slot);
        self.pools.spawn_explosion(at, Vec2::ZERO);
        self.stats.hits_taken += 1;
        self.events.push(SimEvent::PlayerHurt { at });
        log::debug!("Player hit at {at} ({} hits)", self.stats.hits_taken);
    }

    fn stomp(&mut self, leg: Owner, enemy: Owner) {
        let Owner::Enemy(index) = enemy else {
            return;
        };
        let Some(mut leg_body) = self.body(leg).copied() else {
            return;
        };
        let Some(target) = self.enemies.get_mut(index as usize) else {
            return;
        };
        if !leg_body.overlaps(&target.body) {
            return;
        }

        if target.hurt(leg_body.vel.y) {
            self.stats.enemies_killed += 1;
            self.events.push(SimEvent::EnemyCrushed { kind: target.kind() });
            log::debug!("Crushed {:?} #{index}", target.kind());
        }
        target.body.set_fixed();
        target.body.separate_vertical(&mut leg_body);
        target.body.set_movable();
        self.put(leg_body);
    }

    fn dialog(&mut self, trigger: Owner, leg: Owner) {
        let Owner::Trigger(index) = trigger else {
            return;
        };
        // A non-repeatable trigger parks itself on the first leg; the second
        // leg's pair of the same query must not fire it again.
        let overlapping = match (self.body(trigger), self.body(leg)) {
            (Some(t), Some(l)) => t.overlaps(l),
            _ => false,
        };
        if overlapping {
            self.text.push_trigger(index);
        }
    }

    fn checkpoint(&mut self, upper: Owner, area: Owner) -> Result<(), SimError> {
        let (Some(torso), Some(zone)) = (self.body(upper).copied(), self.body(area).copied()) else {
            return Ok(());
        };
        if !torso.overlaps(&zone) {
            return Ok(());
        }

        let x = torso.pos.x.floor() as i32;
        let y = torso.pos.y.floor() as i32 - 16;
        if let Some(zone) = self.body_mut(area) {
            zone.set_position(Vec2::splat(OFF_WORLD));
            zone.set_size(Vec2::splat(4.0));
        }
        self.store.write(CHECKPOINT_X, x)?;
        self.store.write(CHECKPOINT_Y, y)?;
        self.text.push_text(CHECKPOINT_TEXT, CHECKPOINT_TEXT_TTL);
        self.events.push(SimEvent::CheckpointReached { x, y });
        log::info!("Checkpoint saved at ({x}, {y})");
        Ok(())
    }

    fn reach_exit(&mut self, part: Owner, exit: Owner) {
        let overlapping = match (self.body(part), self.body(exit)) {
            (Some(p), Some(e)) => p.overlaps(e),
            _ => false,
        };
        if overlapping && self.exit == ExitState::NotReached {
            self.exit = ExitState::Reached;
            self.events.push(SimEvent::ExitReached);
            log::info!("Exit reached after {} ticks", self.time_ticks);
        }
    }
}

/// Rebound off a floor: vertical speed is reflected and damped, with a
/// minimum upward speed after landing; horizontal speed is scaled.
pub fn bounce_off(item: &mut Body, floor: &mut Body, bounce: &BounceSettings) {
    if !item.collide(floor) {
        return;
    }
    let hit = item.current_hit();
    if hit.intersects(Contact::DOWN) {
        item.vel.y = -(item.vel.y.abs() * bounce.vertical).max(bounce.min_speed);
        item.vel.x *= bounce.horizontal;
    } else if hit.intersects(Contact::UP) {
        item.vel.y = item.vel.y.abs() * bounce.vertical;
        item.vel.x *= bounce.horizontal;
    } else {
        item.vel.x = -item.vel.x * bounce.horizontal;
    }
}

/// Prop against prop. The lower one gives way while the other holds still;
/// horizontal speeds reflect, vertical speeds are exchanged, both damped.
pub fn elastic(first: &mut Body, second: &mut Body) {
    if first.pos.y > second.pos.y {
        second.set_fixed();
    } else {
        first.set_fixed();
    }
    let hit = first.collide(second);
    first.set_movable();
    second.set_movable();

    if hit {
        let (a, b) = (first.vel, second.vel);
        first.vel = Vec2::new(-a.x * ELASTIC_DAMPING, b.y * ELASTIC_DAMPING);
        second.vel = Vec2::new(-b.x * ELASTIC_DAMPING, a.y * ELASTIC_DAMPING);
    }
}

/// `pusher` holds its ground and shoves `other` out
pub fn push(pusher: &mut Body, other: &mut Body) {
    pusher.set_fixed();
    pusher.collide(other);
    pusher.set_movable();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::persistence::MemoryStore;
    use crate::settings::Settings;
    use crate::sim::body::{Limb, Rect};
    use crate::sim::level::{LevelData, Placement, Tilemap};

    const KINDS: [BodyKind; 12] = [
        BodyKind::UpperTorso,
        BodyKind::LowerTorso,
        BodyKind::LeftLeg,
        BodyKind::RightLeg,
        BodyKind::Floor,
        BodyKind::PatrolTank,
        BodyKind::Turret,
        BodyKind::Bullet,
        BodyKind::Prop,
        BodyKind::Text,
        BodyKind::Checkpoint,
        BodyKind::Exit,
    ];

    fn floor() -> Body {
        Body::new(BodyKind::Floor, Owner::Floor(0), Rect::new(0.0, 100.0, 200.0, 8.0)).immovable()
    }

    fn prop(slot: u32, rect: Rect) -> Body {
        Body::new(BodyKind::Prop, Owner::Pooled(PoolId::Props, slot), rect)
    }

    fn world(policy: UnclassifiedPolicy) -> World {
        let level = LevelData {
            tilemap: Tilemap::empty(40, 20).with_floor_run(19, 0, 40),
            placements: vec![Placement::Entity {
                kind: "player".to_string(),
                x: 16,
                y: 152,
                width: 16,
                height: 16,
                properties: Vec::new(),
            }],
        };
        World::from_level(&level, MemoryStore::new(), Settings::with_policy(policy)).unwrap()
    }

    #[test]
    fn test_classify_both_orders() {
        use BodyKind::*;
        assert_eq!(classify(LeftLeg, Floor), Some((Response::LimbFloor, Order::AsIs)));
        assert_eq!(classify(Floor, RightLeg), Some((Response::LimbFloor, Order::Swapped)));
        assert_eq!(classify(Bullet, LowerTorso), Some((Response::HurtPlayer, Order::Swapped)));
        assert_eq!(classify(Text, LeftLeg), Some((Response::Dialog, Order::AsIs)));
        assert_eq!(classify(Checkpoint, UpperTorso), Some((Response::Checkpoint, Order::Swapped)));
        assert_eq!(classify(Checkpoint, LowerTorso), Some((Response::Ignore, Order::Swapped)));
        assert_eq!(classify(Prop, Turret), Some((Response::Push, Order::Swapped)));
        assert_eq!(classify(Prop, Prop), Some((Response::Elastic, Order::AsIs)));
        assert_eq!(classify(Turret, PatrolTank), Some((Response::Ignore, Order::AsIs)));
    }

    #[test]
    fn test_table_covers_every_gameplay_pair() {
        for a in KINDS {
            for b in KINDS {
                assert!(classify(a, b).is_some(), "{a:?} vs {b:?} has no row");
            }
        }
        assert_eq!(classify(BodyKind::Particle, BodyKind::Floor), None);
        assert_eq!(classify(BodyKind::Bullet, BodyKind::Particle), None);
    }

    #[test]
    fn test_bounce_off_floor() {
        let mut floor = floor();
        let rect = Rect::new(50.0, 94.0, 4.0, 4.0);
        let mut bullet = Body::new(BodyKind::Bullet, Owner::Pooled(PoolId::Bullets, 0), rect);
        bullet.vel = Vec2::new(20.0, 240.0);
        bullet.update(SIM_DT);

        bounce_off(&mut bullet, &mut floor, &BounceSettings::default());
        assert_eq!(bullet.vel, Vec2::new(15.0, -120.0));
        assert!(bullet.pos.y + bullet.size.y <= 100.0 + 1e-4);

        // Slow landings still leave the floor
        let mut pellet = prop(0, Rect::new(50.0, 96.5, 4.0, 4.0));
        pellet.vel = Vec2::new(0.0, 2.0);
        bounce_off(&mut pellet, &mut floor, &BounceSettings::default());
        assert_eq!(pellet.vel.y, -4.0);
    }

    #[test]
    fn test_elastic_moves_only_the_lower_prop() {
        let mut upper = prop(0, Rect::new(10.0, 10.0, 4.0, 4.0));
        let mut lower = prop(1, Rect::new(11.0, 12.0, 4.0, 4.0));
        upper.vel = Vec2::new(10.0, 30.0);
        lower.vel = Vec2::new(-6.0, 8.0);

        elastic(&mut upper, &mut lower);
        assert_eq!(upper.pos, Vec2::new(10.0, 10.0));
        assert!((lower.pos.y - 14.0).abs() < 1e-4);
        assert_eq!(upper.vel, Vec2::new(-5.0, 4.0));
        assert_eq!(lower.vel, Vec2::new(3.0, 15.0));
        assert!(!upper.is_fixed() && !lower.is_fixed());
    }

    #[test]
    fn test_push_moves_only_the_other_body() {
        let rect = Rect::new(10.0, 10.0, 6.0, 8.0);
        let mut tank = Body::new(BodyKind::PatrolTank, Owner::Enemy(0), rect);
        let mut pellet = prop(0, Rect::new(7.0, 12.0, 4.0, 4.0));
        push(&mut tank, &mut pellet);
        assert_eq!(tank.pos, Vec2::new(10.0, 10.0));
        assert!((pellet.pos.x - 6.0).abs() < 1e-4);
        assert!(!tank.is_fixed());
    }

    #[test]
    fn test_bullet_hurts_player() {
        let mut world = world(UnclassifiedPolicy::Abort);
        let upper = Owner::Player(Limb::UpperTorso);
        let torso = world.player.body(Limb::UpperTorso).rect();
        world.collide_owner(upper).unwrap();

        let bullet = world.pools.bullets.recycle().place(torso.center()).body.owner;
        world.collide_owner(bullet).unwrap();

        assert_eq!(world.body(bullet), None);
        assert_eq!(world.stats.hits_taken, 1);
        assert_eq!(world.pools.particles.live_count(), 1);
        assert!(matches!(world.events()[0], SimEvent::PlayerHurt { .. }));
    }

    #[test]
    fn test_unclassified_pair_policy() {
        for policy in [UnclassifiedPolicy::Abort, UnclassifiedPolicy::Warn] {
            let mut world = world(policy);
            let spark = world.pools.particles.recycle().place(Vec2::new(100.0, 40.0)).body;
            world.quadtree.insert(spark.owner, spark.rect());

            let bullet = world.pools.bullets.recycle().place(Vec2::new(101.0, 41.0)).body.owner;
            let result = world.collide_owner(bullet);
            match policy {
                UnclassifiedPolicy::Abort => assert!(matches!(
                    result,
                    Err(SimError::UnclassifiedPair {
                        first: BodyKind::Bullet,
                        second: BodyKind::Particle,
                        ..
                    })
                )),
                UnclassifiedPolicy::Warn => {
                    assert!(result.is_ok());
                    assert!(world.body(bullet).is_some());
                }
            }
        }
    }

    #[test]
    fn test_checkpoint_saves_and_parks() {
        let mut world = world(UnclassifiedPolicy::Abort);
        let torso = world.player.body(Limb::UpperTorso).rect();
        let area = world.add_area(BodyKind::Checkpoint, torso.grow(2.0));
        world.quadtree.insert(area, torso.grow(2.0));

        world.collide_owner(Owner::Player(Limb::UpperTorso)).unwrap();
        let expected = (torso.pos.x.floor() as i32, torso.pos.y.floor() as i32 - 16);
        assert_eq!(world.store().respawn_point(), Some(expected));
        assert_eq!(world.store().write_count(), 2);
        assert_eq!(world.body(area).map(|b| b.pos), Some(Vec2::splat(OFF_WORLD)));
        assert_eq!(world.text.queue_len(), 1);
    }
}

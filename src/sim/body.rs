//! Axis-aligned bodies and pairwise separation
//!
//! Everything that takes part in collision is a [`Body`]: a box with its own
//! velocity and acceleration, a semantic [`BodyKind`] and an [`Owner`] handle
//! pointing back at the entity that owns it. Bodies never rotate.

use std::ops::{BitOr, BitOrAssign};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle (top-left position + size, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.pos
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.pos + self.size
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Strict overlap: touching edges do not count
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x < b_max.x && b_min.x < a_max.x && a_min.y < b_max.y && b_min.y < a_max.y
    }

    /// Grow the rectangle by `margin` on every side
    pub fn grow(&self, margin: f32) -> Rect {
        Rect {
            pos: self.pos - Vec2::splat(margin),
            size: self.size + Vec2::splat(margin * 2.0),
        }
    }

    /// Split into four equally sized quadrants (NW, NE, SW, SE)
    pub fn quadrants(&self) -> [Rect; 4] {
        let half = self.size * 0.5;
        let Vec2 { x, y } = self.pos;
        [
            Rect::new(x, y, half.x, half.y),
            Rect::new(x + half.x, y, half.x, half.y),
            Rect::new(x, y + half.y, half.x, half.y),
            Rect::new(x + half.x, y + half.y, half.x, half.y),
        ]
    }
}

/// Directions in which a body touched something
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Contact(pub u8);

impl Contact {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(1 << 0);
    pub const RIGHT: Self = Self(1 << 1);
    pub const UP: Self = Self(1 << 2);
    pub const DOWN: Self = Self(1 << 3);
    pub const HORIZONTAL: Self = Self(Self::LEFT.0 | Self::RIGHT.0);
    pub const VERTICAL: Self = Self(Self::UP.0 | Self::DOWN.0);

    /// All bits of `other` are set
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Any bit of `other` is set
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Contact {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Contact {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Gameplay role of a body; the collision table is keyed on ordered pairs of these
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    UpperTorso,
    LowerTorso,
    LeftLeg,
    RightLeg,
    Floor,
    PatrolTank,
    Turret,
    Bullet,
    Prop,
    /// Cosmetic only, never indexed
    Particle,
    Text,
    Checkpoint,
    Exit,
}

/// One of the player's four bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Limb {
    UpperTorso,
    LowerTorso,
    LeftLeg,
    RightLeg,
}

impl Limb {
    pub fn kind(self) -> BodyKind {
        match self {
            Limb::UpperTorso => BodyKind::UpperTorso,
            Limb::LowerTorso => BodyKind::LowerTorso,
            Limb::LeftLeg => BodyKind::LeftLeg,
            Limb::RightLeg => BodyKind::RightLeg,
        }
    }
}

/// Identity of a recyclable pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PoolId {
    Particles,
    Bullets,
    Props,
}

/// Weak back-reference from a body to the entity that owns it.
///
/// Handles are plain indices into the world's per-kind storage; they are
/// resolved with a match, never dereferenced blindly. A handle may go stale
/// (e.g. a pooled bullet recycled mid-pass), in which case lookups return
/// `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Owner {
    Floor(u32),
    Player(Limb),
    Enemy(u32),
    Pooled(PoolId, u32),
    Trigger(u32),
    Area(u32),
}

/// Axis chosen to separate two overlapping bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// A moving (or static) axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub pos: Vec2,
    pub size: Vec2,
    /// Render origin shift relative to `pos`
    pub offset: Vec2,
    pub vel: Vec2,
    pub accel: Vec2,
    pub kind: BodyKind,
    pub owner: Owner,
    immovable: bool,
    fixed: bool,
    last_pos: Vec2,
    contact: Contact,
    last_contact: Contact,
    hit: Contact,
}

impl Body {
    pub fn new(kind: BodyKind, owner: Owner, rect: Rect) -> Self {
        Self {
            pos: rect.pos,
            size: rect.size,
            offset: Vec2::ZERO,
            vel: Vec2::ZERO,
            accel: Vec2::ZERO,
            kind,
            owner,
            immovable: false,
            fixed: false,
            last_pos: rect.pos,
            contact: Contact::NONE,
            last_contact: Contact::NONE,
            hit: Contact::NONE,
        }
    }

    /// Static geometry: never moved by a separation
    pub fn immovable(mut self) -> Self {
        self.immovable = true;
        self
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        Rect {
            pos: self.pos,
            size: self.size,
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Teleport the body; the previous position follows so no sweep is implied
    pub fn set_position(&mut self, pos: Vec2) {
        self.pos = pos;
        self.last_pos = pos;
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    /// Roll contact flags over and remember where the tick started
    pub fn begin_frame(&mut self) {
        self.last_pos = self.pos;
        self.last_contact = self.contact;
        self.contact = Contact::NONE;
        self.hit = Contact::NONE;
    }

    /// Semi-implicit Euler step
    pub fn integrate(&mut self, dt: f32) {
        self.vel += self.accel * dt;
        self.pos += self.vel * dt;
    }

    pub fn update(&mut self, dt: f32) {
        self.begin_frame();
        self.integrate(dt);
    }

    /// Horizontal position after the next `integrate(dt)`
    #[inline]
    pub fn predicted_x(&self, dt: f32) -> f32 {
        self.pos.x + (self.vel.x + self.accel.x * dt) * dt
    }

    /// Contacts accumulated since the last `begin_frame`
    #[inline]
    pub fn contact(&self) -> Contact {
        self.contact
    }

    /// Contacts accumulated during the previous tick
    #[inline]
    pub fn last_contact(&self) -> Contact {
        self.last_contact
    }

    /// Contacts produced by the most recent pairwise resolution
    #[inline]
    pub fn current_hit(&self) -> Contact {
        self.hit
    }

    pub fn set_fixed(&mut self) {
        self.fixed = true;
    }

    pub fn set_movable(&mut self) {
        self.fixed = false;
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.fixed || self.immovable
    }

    #[inline]
    pub fn overlaps(&self, other: &Body) -> bool {
        self.rect().overlaps(&other.rect())
    }

    /// Separate two overlapping bodies along the axis they met on.
    ///
    /// Returns `true` if the bodies overlapped and were separated. Contact
    /// flags are recorded on both bodies.
    pub fn collide(&mut self, other: &mut Body) -> bool {
        self.hit = Contact::NONE;
        other.hit = Contact::NONE;
        if !self.overlaps(other) || (self.is_fixed() && other.is_fixed()) {
            return false;
        }
        match self.separation_axis(other) {
            Axis::Horizontal => self.separate_horizontal(other),
            Axis::Vertical => self.separate_vertical(other),
        }
    }

    /// Push apart along y only
    pub fn separate_vertical(&mut self, other: &mut Body) -> bool {
        if !self.overlaps(other) || (self.is_fixed() && other.is_fixed()) {
            return false;
        }
        let self_above = self.last_center().y <= other.last_center().y;
        let (depth, self_side, other_side) = if self_above {
            (self.pos.y + self.size.y - other.pos.y, Contact::DOWN, Contact::UP)
        } else {
            (other.pos.y + other.size.y - self.pos.y, Contact::UP, Contact::DOWN)
        };
        let push = if self_above { -depth } else { depth };
        self.push_apart(other, Vec2::new(0.0, push));
        self.record_hit(self_side);
        other.record_hit(other_side);
        true
    }

    /// Push apart along x only
    pub fn separate_horizontal(&mut self, other: &mut Body) -> bool {
        if !self.overlaps(other) || (self.is_fixed() && other.is_fixed()) {
            return false;
        }
        let self_left = self.last_center().x <= other.last_center().x;
        let (depth, self_side, other_side) = if self_left {
            (self.pos.x + self.size.x - other.pos.x, Contact::RIGHT, Contact::LEFT)
        } else {
            (other.pos.x + other.size.x - self.pos.x, Contact::LEFT, Contact::RIGHT)
        };
        let push = if self_left { -depth } else { depth };
        self.push_apart(other, Vec2::new(push, 0.0));
        self.record_hit(self_side);
        other.record_hit(other_side);
        true
    }

    fn last_center(&self) -> Vec2 {
        self.last_pos + self.size * 0.5
    }

    fn last_rect(&self) -> Rect {
        Rect {
            pos: self.last_pos,
            size: self.size,
        }
    }

    /// Bodies that already overlapped on one axis at the start of the tick
    /// met on the other one; otherwise the shallower penetration wins.
    fn separation_axis(&self, other: &Body) -> Axis {
        let (a, b) = (self.last_rect(), other.last_rect());
        let x_before = a.min().x < b.max().x && b.min().x < a.max().x;
        let y_before = a.min().y < b.max().y && b.min().y < a.max().y;
        match (x_before, y_before) {
            (true, false) => Axis::Vertical,
            (false, true) => Axis::Horizontal,
            _ => {
                let (a, b) = (self.rect(), other.rect());
                let pen_x = (a.max().x - b.min().x).min(b.max().x - a.min().x);
                let pen_y = (a.max().y - b.min().y).min(b.max().y - a.min().y);
                if pen_x < pen_y {
                    Axis::Horizontal
                } else {
                    Axis::Vertical
                }
            }
        }
    }

    /// Apply `delta` to self (or `-delta` to other), honouring fixed flags
    fn push_apart(&mut self, other: &mut Body, delta: Vec2) {
        match (self.is_fixed(), other.is_fixed()) {
            (false, true) => self.pos += delta,
            (true, false) => other.pos -= delta,
            _ => {
                self.pos += delta * 0.5;
                other.pos -= delta * 0.5;
            }
        }
    }

    fn record_hit(&mut self, side: Contact) {
        self.hit |= side;
        self.contact |= side;
    }
}

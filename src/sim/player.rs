//! Four-body player locomotion
//!
//! The player is two torso segments riding on two independently simulated
//! legs. Each leg has its own button:
//! - Press while grounded: push off forward and up
//! - Hold: the stride flattens and stretches (+10% vx, vy decays to zero)
//! - Release: the leg stops and drops
//! - Both feet landing within a short window: two-foot jump
//!
//! Only the legs are integrated. The torso is placed from the legs every tick
//! after collisions have settled.

use glam::Vec2;

use crate::consts::*;
use crate::sim::body::{Body, Contact, Limb, Owner, Rect};
use crate::sim::state::SimEvent;
use crate::sim::tick::{ButtonState, TickInput};

/// Per-leg timers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct LegTimers {
    /// How long the button has shaped the current stride
    raising: f32,
    /// Time since this foot last touched down
    since_step: f32,
}

/// Presentation joints derived from the bodies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub left_knee: Vec2,
    pub right_knee: Vec2,
    pub left_hip: Vec2,
    pub right_hip: Vec2,
}

#[derive(Debug, Clone)]
pub struct Player {
    upper: Body,
    lower: Body,
    left: Body,
    right: Body,
    left_timers: LegTimers,
    right_timers: LegTimers,
    /// Set by a jump (or at spawn), cleared once both feet are down
    airborne: bool,
}

impl Player {
    /// Spawn with the upper torso's top-left at `(x, y)`
    pub fn spawn(x: f32, y: f32) -> Self {
        let limb = |limb: Limb, dx: f32, dy: f32| {
            Body::new(
                limb.kind(),
                Owner::Player(limb),
                Rect::new(x + dx, y + dy, LIMB_WIDTH, LIMB_HEIGHT),
            )
        };
        let mut left = limb(Limb::LeftLeg, 4.0, 30.0);
        let mut right = limb(Limb::RightLeg, 1.0, 30.0);
        left.accel = Vec2::new(0.0, GRAVITY);
        right.accel = Vec2::new(0.0, GRAVITY);

        let timers = LegTimers {
            raising: 0.0,
            since_step: PLAYER_JUMP_WINDOW,
        };
        Self {
            upper: limb(Limb::UpperTorso, 0.0, 0.0),
            lower: limb(Limb::LowerTorso, 0.0, 13.0),
            left,
            right,
            left_timers: timers,
            right_timers: timers,
            airborne: true,
        }
    }

    pub fn body(&self, limb: Limb) -> &Body {
        match limb {
            Limb::UpperTorso => &self.upper,
            Limb::LowerTorso => &self.lower,
            Limb::LeftLeg => &self.left,
            Limb::RightLeg => &self.right,
        }
    }

    pub fn body_mut(&mut self, limb: Limb) -> &mut Body {
        match limb {
            Limb::UpperTorso => &mut self.upper,
            Limb::LowerTorso => &mut self.lower,
            Limb::LeftLeg => &mut self.left,
            Limb::RightLeg => &mut self.right,
        }
    }

    pub fn is_airborne(&self) -> bool {
        self.airborne
    }

    /// Horizontal distance between the legs
    pub fn leg_spread(&self) -> f32 {
        (self.left.pos.x - self.right.pos.x).abs()
    }

    /// Input, spread limit and leg integration. Runs before any query.
    pub fn pre_update(&mut self, input: &TickInput, dt: f32) {
        let airborne = self.airborne;
        move_leg(&mut self.left, input.left_leg, &mut self.left_timers.raising, airborne, dt);
        move_leg(&mut self.right, input.right_leg, &mut self.right_timers.raising, airborne, dt);

        if !airborne {
            self.limit_spread(dt);
        }

        self.upper.begin_frame();
        self.lower.begin_frame();
        self.left.update(dt);
        self.right.update(dt);

        if !airborne {
            self.drag_trailing_leg();
        }
    }

    /// Jump trigger and torso placement. Runs after every query of the tick.
    pub fn post_update(&mut self, dt: f32, events: &mut Vec<SimEvent>) {
        for limb in [Limb::LeftLeg, Limb::RightLeg] {
            let (body, timers) = match limb {
                Limb::LeftLeg => (&self.left, &mut self.left_timers),
                _ => (&self.right, &mut self.right_timers),
            };
            let touched_down = !body.last_contact().contains(Contact::DOWN)
                && body.contact().contains(Contact::DOWN);
            if touched_down {
                timers.since_step = 0.0;
                events.push(SimEvent::Step(limb));
            } else {
                timers.since_step += dt;
            }
        }

        let left_down = self.left.contact().contains(Contact::DOWN);
        let right_down = self.right.contact().contains(Contact::DOWN);
        if self.left_timers.since_step <= PLAYER_JUMP_WINDOW
            && self.right_timers.since_step <= PLAYER_JUMP_WINDOW
            && !self.airborne
        {
            let jump = Vec2::new(PLAYER_JUMP_VX, PLAYER_JUMP_VY);
            self.left.vel = jump;
            self.right.vel = jump;
            self.airborne = true;
            events.push(SimEvent::Jump);
        } else if left_down && right_down {
            self.airborne = false;
            self.left_timers.since_step = PLAYER_JUMP_WINDOW;
            self.right_timers.since_step = PLAYER_JUMP_WINDOW;
        }

        let anchor = torso_anchor(self.left.pos, self.right.pos, self.airborne, self.left.vel.y);
        self.upper.set_position(anchor - Vec2::new(0.0, 26.0));
        self.lower.set_position(anchor - Vec2::new(0.0, 13.0));
    }

    /// Point the camera should centre on
    pub fn camera_target(&self) -> Vec2 {
        self.lower.center()
    }

    pub fn pose(&self) -> Pose {
        let lower = self.lower.pos;
        let knee = |leg: Vec2| {
            (lower + Vec2::new(2.0, 13.0)) * 0.75 + (leg + Vec2::new(1.0, -4.0)) * 0.25
        };
        Pose {
            left_knee: knee(self.left.pos),
            right_knee: knee(self.right.pos),
            left_hip: lower + Vec2::new(4.0, 10.0),
            right_hip: lower + Vec2::new(0.0, 10.0),
        }
    }

    /// Stop the legs from drifting further apart than the maximum spread,
    /// judged on where they would be after this tick's integration.
    fn limit_spread(&mut self, dt: f32) {
        let lx = self.left.predicted_x(dt);
        let rx = self.right.predicted_x(dt);
        if (lx - rx).abs() <= PLAYER_MAX_LEG_DIST {
            return;
        }
        let (leader, trailer) = if lx > rx {
            (&mut self.left, &mut self.right)
        } else {
            (&mut self.right, &mut self.left)
        };
        if leader.vel.x > 0.0 {
            leader.vel.x = 0.0;
        }
        if trailer.vel.x < 0.0 {
            trailer.vel.x = 0.0;
        }
    }

    /// A spread already past the limit (a landing, a long push-off) is closed
    /// by pulling the rear foot up behind the front one.
    fn drag_trailing_leg(&mut self) {
        let (leader, trailer) = if self.left.pos.x > self.right.pos.x {
            (&self.left, &mut self.right)
        } else {
            (&self.right, &mut self.left)
        };
        let min_x = leader.pos.x - PLAYER_MAX_LEG_DIST;
        if trailer.pos.x < min_x {
            trailer.pos.x = min_x;
        }
    }
}

/// Apply one button to one leg
fn move_leg(leg: &mut Body, button: ButtonState, raising: &mut f32, airborne: bool, dt: f32) {
    match button {
        ButtonState::JustPressed => {
            if leg.contact().contains(Contact::DOWN) {
                leg.vel = Vec2::new(PLAYER_VX, PLAYER_VY);
            } else {
                // No charging in the air
                *raising = PLAYER_HOLD_TIME;
            }
            *raising += dt;
        }
        ButtonState::Held if *raising < PLAYER_HOLD_TIME => {
            leg.vel = charge_velocity(*raising);
            *raising += dt;
        }
        ButtonState::JustReleased if !airborne => {
            *raising = 0.0;
            leg.vel.x = 0.0;
            if leg.vel.y < 0.0 {
                leg.vel.y *= 0.25;
            }
        }
        ButtonState::Released | ButtonState::JustReleased => *raising = 0.0,
        ButtonState::Held => {}
    }
}

/// Stride velocity after holding for `t` seconds
pub fn charge_velocity(t: f32) -> Vec2 {
    let t = t.clamp(0.0, PLAYER_HOLD_TIME);
    Vec2::new(
        PLAYER_VX * (1.0 + 0.1 * t / PLAYER_HOLD_TIME),
        PLAYER_VY * 0.8 * (PLAYER_HOLD_TIME - t) / PLAYER_HOLD_TIME,
    )
}

/// Torso base point from the leg positions.
///
/// Centred between the legs from the leftmost one, resting on the lower leg,
/// squashed by the spread. In the air it bobs with the left leg's vertical
/// speed; on the ground it rises by a quarter of the legs' height difference.
pub fn torso_anchor(left: Vec2, right: Vec2, airborne: bool, left_vy: f32) -> Vec2 {
    let spread = (left.x - right.x).abs();
    let x = left.x.min(right.x) - 3.0 + spread / 2.0;
    let mut y = left.y.max(right.y) - 4.0 + spread / (PLAYER_MAX_LEG_DIST / 4.0);

    if airborne {
        if left_vy > 0.0 {
            y += 6.0 * (PLAYER_JUMP_VY + left_vy) / PLAYER_JUMP_VY;
        } else if left_vy < 0.0 {
            y += 6.0 * (PLAYER_JUMP_VY - left_vy) / PLAYER_JUMP_VY;
        }
    } else {
        y -= (left.y - right.y).abs() / 4.0;
    }

    Vec2::new(x, y)
}

/// Limb against floor: only a clean landing stops the leg
pub fn limb_floor_response(limb: &mut Body, floor: &mut Body) {
    if limb.collide(floor) && limb.current_hit() == Contact::DOWN {
        limb.vel = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::BodyKind;

    fn floor() -> Body {
        Body::new(BodyKind::Floor, Owner::Floor(0), Rect::new(-100.0, 100.0, 400.0, 8.0))
            .immovable()
    }

    /// A leg resting on the floor with DOWN in its current contacts
    fn grounded_leg(limb: Limb, x: f32) -> Body {
        let rect = Rect::new(x, 86.5, LIMB_WIDTH, LIMB_HEIGHT);
        let mut leg = Body::new(limb.kind(), Owner::Player(limb), rect);
        let mut floor = floor();
        limb_floor_response(&mut leg, &mut floor);
        leg
    }

    #[test]
    fn test_spawn_layout() {
        let player = Player::spawn(10.0, 20.0);
        assert_eq!(player.body(Limb::UpperTorso).pos, Vec2::new(10.0, 20.0));
        assert_eq!(player.body(Limb::LowerTorso).pos, Vec2::new(10.0, 33.0));
        assert_eq!(player.body(Limb::LeftLeg).pos, Vec2::new(14.0, 50.0));
        assert_eq!(player.body(Limb::RightLeg).pos, Vec2::new(11.0, 50.0));
        assert_eq!(player.body(Limb::LeftLeg).accel, Vec2::new(0.0, GRAVITY));
        assert!(player.is_airborne());
    }

    #[test]
    fn test_grounded_press_pushes_off() {
        let mut leg = grounded_leg(Limb::LeftLeg, 0.0);
        assert!(leg.contact().contains(Contact::DOWN));
        assert_eq!(leg.vel, Vec2::ZERO);

        let mut raising = 0.0;
        move_leg(&mut leg, ButtonState::JustPressed, &mut raising, false, SIM_DT);
        assert_eq!(leg.vel, Vec2::new(PLAYER_VX, PLAYER_VY));
        assert!((raising - SIM_DT).abs() < 1e-6);
    }

    #[test]
    fn test_charge_converges_to_asymptote() {
        let mut leg = grounded_leg(Limb::LeftLeg, 0.0);
        let mut raising = 0.0;
        move_leg(&mut leg, ButtonState::JustPressed, &mut raising, false, SIM_DT);

        let mut last = leg.vel;
        for _ in 0..120 {
            move_leg(&mut leg, ButtonState::Held, &mut raising, false, SIM_DT);
            assert!(leg.vel.x <= PLAYER_VX * 1.1 + 1e-4);
            assert!(leg.vel.y <= 0.0);
            last = leg.vel;
        }
        assert!(raising >= PLAYER_HOLD_TIME);
        assert!(last.x > PLAYER_VX * 1.09);
        assert!(last.y.abs() < 1.5);

        // The asymptote itself
        let limit = charge_velocity(10.0);
        assert!((limit.x - PLAYER_VX * 1.1).abs() < 1e-4);
        assert!(limit.y.abs() < 1e-6);
    }

    #[test]
    fn test_press_in_air_cannot_charge() {
        let rect = Rect::new(0.0, 0.0, 10.0, 14.0);
        let mut leg = Body::new(BodyKind::LeftLeg, Owner::Player(Limb::LeftLeg), rect);
        leg.vel = Vec2::new(5.0, 20.0);
        let mut raising = 0.0;
        move_leg(&mut leg, ButtonState::JustPressed, &mut raising, true, SIM_DT);
        move_leg(&mut leg, ButtonState::Held, &mut raising, true, SIM_DT);
        assert_eq!(leg.vel, Vec2::new(5.0, 20.0));
        assert!(raising > PLAYER_HOLD_TIME);
    }

    #[test]
    fn test_release_stops_and_drops() {
        let mut leg = grounded_leg(Limb::RightLeg, 0.0);
        leg.vel = Vec2::new(31.0, -40.0);
        let mut raising = 0.3;
        move_leg(&mut leg, ButtonState::JustReleased, &mut raising, false, SIM_DT);
        assert_eq!(leg.vel, Vec2::new(0.0, -10.0));
        assert_eq!(raising, 0.0);

        // While airborne a release only resets the timer
        leg.vel = Vec2::new(25.0, -40.0);
        raising = 0.3;
        move_leg(&mut leg, ButtonState::JustReleased, &mut raising, true, SIM_DT);
        assert_eq!(leg.vel, Vec2::new(25.0, -40.0));
        assert_eq!(raising, 0.0);
    }

    #[test]
    fn test_two_foot_landing_jumps() {
        let mut player = Player::spawn(0.0, 56.0);
        player.airborne = false;
        player.left_timers.since_step = 1.0;
        player.right_timers.since_step = 1.0;
        player.left = grounded_leg(Limb::LeftLeg, 4.0);
        player.right = grounded_leg(Limb::RightLeg, 1.0);

        let mut events = Vec::new();
        player.post_update(SIM_DT, &mut events);
        assert!(player.is_airborne());
        let jump = Vec2::new(PLAYER_JUMP_VX, PLAYER_JUMP_VY);
        assert_eq!(player.body(Limb::LeftLeg).vel, jump);
        assert_eq!(player.body(Limb::RightLeg).vel, jump);
        assert!(events.contains(&SimEvent::Jump));
        assert!(events.contains(&SimEvent::Step(Limb::LeftLeg)));
    }

    #[test]
    fn test_landing_from_jump_clears_airborne() {
        let mut player = Player::spawn(0.0, 56.0);
        assert!(player.is_airborne());
        player.left = grounded_leg(Limb::LeftLeg, 4.0);
        player.right = grounded_leg(Limb::RightLeg, 1.0);

        let mut events = Vec::new();
        player.post_update(SIM_DT, &mut events);
        assert!(!player.is_airborne());
        assert!(!events.contains(&SimEvent::Jump));
        assert_eq!(player.left_timers.since_step, PLAYER_JUMP_WINDOW);

        // Standing still afterwards never jumps
        for _ in 0..10 {
            player.left.begin_frame();
            player.right.begin_frame();
            let mut floor = floor();
            player.left.pos.y += 0.1;
            player.right.pos.y += 0.1;
            limb_floor_response(&mut player.left, &mut floor);
            limb_floor_response(&mut player.right, &mut floor);
            player.post_update(SIM_DT, &mut events);
        }
        assert!(!player.is_airborne());
        assert!(!events.contains(&SimEvent::Jump));
    }

    #[test]
    fn test_spread_limit_stops_diverging_legs() {
        let mut player = Player::spawn(0.0, 56.0);
        player.airborne = false;
        player.left.pos.x = 30.0;
        player.right.pos.x = 10.0;
        player.left.vel.x = 300.0;
        player.right.vel.x = -30.0;
        player.limit_spread(SIM_DT);
        assert_eq!(player.left.vel.x, 0.0);
        assert_eq!(player.right.vel.x, 0.0);

        // Converging legs are left alone
        player.left.vel.x = -300.0;
        player.right.vel.x = 30.0;
        player.limit_spread(SIM_DT);
        assert_eq!(player.left.vel.x, -300.0);
    }

    #[test]
    fn test_grounded_spread_over_limit_is_closed() {
        let mut player = Player::spawn(0.0, 56.0);
        player.airborne = false;
        player.left = grounded_leg(Limb::LeftLeg, 60.0);
        player.right = grounded_leg(Limb::RightLeg, 10.0);
        assert!(player.leg_spread() > PLAYER_MAX_LEG_DIST);

        player.pre_update(&TickInput::default(), SIM_DT);
        assert!(player.leg_spread() <= PLAYER_MAX_LEG_DIST + 1e-4);
        // The front foot stays planted
        assert_eq!(player.body(Limb::LeftLeg).pos.x, 60.0);

        // In the air the legs are left alone
        let mut player = Player::spawn(0.0, 56.0);
        player.left.pos.x = 60.0;
        player.pre_update(&TickInput::default(), SIM_DT);
        assert!(player.leg_spread() > PLAYER_MAX_LEG_DIST);
    }

    #[test]
    fn test_torso_anchor() {
        let anchor = torso_anchor(Vec2::new(10.0, 50.0), Vec2::new(20.0, 50.0), false, 0.0);
        assert!((anchor.x - 12.0).abs() < 1e-5);
        assert!((anchor.y - (46.0 + 10.0 / 5.5)).abs() < 1e-4);

        // In the air the torso sags most at the apex of the jump
        let feet = Vec2::new(10.0, 50.0);
        let take_off = torso_anchor(feet, feet, true, PLAYER_JUMP_VY);
        assert!((take_off.y - 46.0).abs() < 1e-4);
        let rising = torso_anchor(feet, feet, true, -40.0);
        assert!((rising.y - 49.0).abs() < 1e-4);
        let falling = torso_anchor(feet, feet, true, 40.0);
        assert!((falling.y - 49.0).abs() < 1e-4);
    }

    #[test]
    fn test_pose_knees_blend_hip_and_foot() {
        let player = Player::spawn(0.0, 0.0);
        let pose = player.pose();
        // lower torso (0, 13), left leg (4, 30)
        let expected = Vec2::new(2.0, 26.0) * 0.75 + Vec2::new(5.0, 26.0) * 0.25;
        assert!((pose.left_knee - expected).length() < 1e-5);
        assert_eq!(pose.left_hip, Vec2::new(4.0, 23.0));
    }
}

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::surface::{SurfaceSet, WorldFrame};
use super::vec2::Vector2;

pub const MAX_HEALTH: u32 = 100;
pub const MAX_JUMPS: u8 = 2;

/// Tuning for a single body. Speeds are units per second, deceleration units per second².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    pub start: Vector2,
    pub speed: f32,
    pub decel_speed: f32,
    pub gravity: f32,
    pub width: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            start: Vector2::new(0.0, 0.0),
            speed: 400.0,
            decel_speed: 1200.0,
            gravity: 900.0,
            width: 50.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandingReport {
    pub surface_index: usize,
    pub damage: u32,
}

/// The one moving body: horizontal momentum with friction, gravity, a double jump and
/// one-way landings on platform tops.
#[derive(Debug, Clone)]
pub struct Body {
    position: Vector2,
    movement: Vector2,
    speed: f32,
    decel_speed: f32,
    gravity: f32,
    width: f32,
    current_x_speed: f32,
    current_y_speed: f32,
    decelerating: bool,
    jumps: u8,
    health: u32,
}

impl Body {
    pub fn new(config: BodyConfig) -> Self {
        Self {
            position: config.start,
            movement: Vector2::new(0.0, 1.0),
            speed: config.speed,
            decel_speed: config.decel_speed,
            gravity: config.gravity,
            width: config.width,
            current_x_speed: 0.0,
            current_y_speed: 0.0,
            decelerating: false,
            jumps: 0,
            health: MAX_HEALTH,
        }
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    pub fn reset_health(&mut self) {
        self.health = MAX_HEALTH;
    }

    pub fn jump_count(&self) -> u8 {
        self.jumps
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    /// Signed velocity: x follows the facing direction, positive y is upward.
    pub fn velocity(&self) -> Vector2 {
        Vector2::new(self.movement.x * self.current_x_speed, self.current_y_speed)
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn set_decel_speed(&mut self, decel_speed: f32) {
        self.decel_speed = decel_speed;
    }

    /// Advances one tick. Returns the landing, if this tick resolved onto a surface.
    pub fn update(
        &mut self,
        delta_seconds: f32,
        surfaces: &mut SurfaceSet,
        frame: &WorldFrame,
    ) -> Option<LandingReport> {
        let direction = self.movement.normalize();
        let displacement = Vector2::new(
            direction.x * delta_seconds * self.current_x_speed,
            direction.y * delta_seconds * self.current_y_speed,
        );
        let mut next = self.position + displacement;
        next.y = next.y.max(0.0);

        let mut landing = None;
        // Exact on purpose: a tolerance band here would ground every slow descent.
        if next.y == self.position.y {
            self.stop_moving_y();
        } else if next.y < self.position.y {
            let foot_x = next.x + self.width * 0.5;
            if let Some(contact) = surfaces.resting_on(foot_x, next.y, frame) {
                next.y = contact.top;
                let damage = surfaces.take_damage(contact.index);
                self.take_damage(damage);
                self.stop_moving_y();
                landing = Some(LandingReport {
                    surface_index: contact.index,
                    damage,
                });
            }
        }

        if next.x < self.position.x {
            next.x = next.x.max(0.0);
        } else if next.x > self.position.x {
            next.x = next.x.min(frame.board_width - self.width);
        }

        self.clamp_y_speed(self.current_y_speed - self.gravity * delta_seconds);
        if self.decelerating {
            self.clamp_x_speed(self.current_x_speed - self.decel_speed * delta_seconds);
        }

        self.position = next;
        landing
    }

    /// Ground jump plus one air jump. Returns false when both are spent.
    pub fn jump(&mut self) -> bool {
        if self.jumps >= MAX_JUMPS {
            return false;
        }
        self.clamp_y_speed(self.current_y_speed + self.gravity);
        self.movement.y = 1.0;
        self.jumps += 1;
        true
    }

    pub fn move_left(&mut self) {
        self.decelerating = false;
        self.clamp_x_speed(self.current_x_speed + self.speed);
        self.movement.x = -1.0;
    }

    pub fn move_right(&mut self) {
        self.decelerating = false;
        self.clamp_x_speed(self.current_x_speed + self.speed);
        self.movement.x = 1.0;
    }

    /// Lets friction bring horizontal speed down over the next updates.
    pub fn stop_moving(&mut self) {
        self.decelerating = true;
    }

    fn stop_moving_y(&mut self) {
        self.jumps = 0;
        self.clamp_y_speed(0.0);
    }

    fn take_damage(&mut self, damage: u32) {
        if damage == 0 {
            return;
        }
        self.health = self.health.saturating_sub(damage);
        debug!(damage, health = self.health, "body_damaged");
    }

    fn clamp_y_speed(&mut self, speed: f32) {
        self.current_y_speed = speed.clamp(-self.gravity, self.gravity);
    }

    fn clamp_x_speed(&mut self, speed: f32) {
        self.current_x_speed = speed.clamp(0.0, self.speed);
    }
}

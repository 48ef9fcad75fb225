//! Entity motion
//!
//! Entities travel along one axis of the play-field from the spawn edge
//! toward the player's boundary. Patterns add a lateral offset or scale the
//! approach speed. Coordinates are percentages of the play-field.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityTemplate, Pattern, PowerUp};
use super::state::Session;

/// Approach axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

/// Lane geometry shared by every entity of a game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayField {
    pub axis: Axis,
    /// Primary coordinate where entities appear
    pub spawn_at: f32,
    /// Primary coordinate of the player's boundary
    pub boundary: f32,
    /// Lateral spawn range
    pub lateral_min: f32,
    pub lateral_max: f32,
}

impl PlayField {
    /// +1 when the boundary lies above the spawn edge on the axis, -1 otherwise
    pub fn direction(&self) -> f32 {
        (self.boundary - self.spawn_at).signum()
    }

    pub fn primary(&self, pos: Vec2) -> f32 {
        match self.axis {
            Axis::X => pos.x,
            Axis::Y => pos.y,
        }
    }

    pub fn lateral(&self, pos: Vec2) -> f32 {
        match self.axis {
            Axis::X => pos.y,
            Axis::Y => pos.x,
        }
    }

    pub fn compose(&self, primary: f32, lateral: f32) -> Vec2 {
        match self.axis {
            Axis::X => Vec2::new(primary, lateral),
            Axis::Y => Vec2::new(lateral, primary),
        }
    }

    /// Fraction of the lane travelled (0 at spawn, 1 at the boundary)
    pub fn progress(&self, pos: Vec2) -> f32 {
        let lane = (self.boundary - self.spawn_at).abs();
        if lane <= f32::EPSILON {
            return 1.0;
        }
        ((self.primary(pos) - self.spawn_at).abs() / lane).clamp(0.0, 1.0)
    }

    /// True once the position has reached or passed the boundary
    pub fn crossed(&self, pos: Vec2) -> bool {
        let p = self.primary(pos);
        if self.direction() >= 0.0 {
            p >= self.boundary
        } else {
            p <= self.boundary
        }
    }
}

/// Lateral offset of an oscillating pattern at the given motion age
fn lateral_offset(pattern: Pattern, age: f32) -> f32 {
    match pattern {
        Pattern::Zigzag {
            amplitude,
            frequency,
        } => {
            // Triangle wave starting at zero
            let phase = (age * frequency + 0.25).fract();
            amplitude * (1.0 - 4.0 * (phase - 0.5).abs())
        }
        Pattern::Sine {
            amplitude,
            frequency,
        } => amplitude * (std::f32::consts::TAU * frequency * age).sin(),
        Pattern::Straight | Pattern::Accelerate { .. } => 0.0,
    }
}

/// Effective approach speed at the current position
fn effective_speed(template: &EntityTemplate, field: &PlayField, pos: Vec2) -> f32 {
    match template.pattern {
        Pattern::Accelerate { factor } => template.speed * (1.0 + factor * field.progress(pos)),
        _ => template.speed,
    }
}

/// Advance one entity by `dt` seconds of (already slow-motion scaled) time
pub fn advance_entity(entity: &mut Entity, template: &EntityTemplate, field: &PlayField, dt: f32) {
    let speed = effective_speed(template, field, entity.position);
    let primary = field.primary(entity.position) + field.direction() * speed * dt;

    entity.motion_age += dt;
    let lateral = (field.lateral(entity.base_position)
        + lateral_offset(template.pattern, entity.motion_age))
    .clamp(0.0, 100.0);

    entity.position = field.compose(primary, lateral);
}

/// Power-ups always drift straight toward the boundary
pub fn advance_power_up(power_up: &mut PowerUp, field: &PlayField, dt: f32) {
    let primary = field.primary(power_up.position) + field.direction() * power_up.speed * dt;
    power_up.position = field.compose(primary, field.lateral(power_up.base_position));
}

/// Speed scale from the global slow motion modifier
pub fn speed_scale(session: &Session) -> f32 {
    if session.slow_motion_remaining_ms > 0 {
        session.tuning.slow_motion.factor
    } else {
        1.0
    }
}

/// Move every entity and power-up by `dt_ms` of session time
pub fn move_all(session: &mut Session, dt_ms: u64) {
    let dt = dt_ms as f32 / 1000.0 * speed_scale(session);
    let field = session.tuning.field;

    for entity in &mut session.entities {
        let template = &session.tuning.catalog[entity.kind];
        advance_entity(entity, template, &field, dt);
    }
    for power_up in &mut session.power_ups {
        advance_power_up(power_up, &field, dt);
    }
}

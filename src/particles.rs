//! Sparks thrown off by destroyed clusters. They drift, shrink through three
//! stages and are dropped once their clock passes three decay periods.

use crate::board::Occupancy;
use rand::Rng;

/// Particle clock steps per second of simulated time.
pub const PARTICLE_STEPS_PER_SEC: f32 = 60.0;

/// Decay period per unit of speed, in particle steps.
const DECAY_PER_SPEED: f32 = 250.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    /// Steps lived so far.
    pub t: f32,
    /// Length of one visual stage, in steps.
    pub decay: f32,
    /// 0 = full size, 1 = shrinking, 2 = fading.
    pub visual_stage: u8,
    /// Colour of the piece this spark came from.
    pub family: Occupancy,
}

impl Particle {
    /// `unit_dx`/`unit_dy` are direction signs; each is damped by a random factor in [0, 0.5).
    pub fn new<R: Rng + ?Sized>(
        x: f32,
        y: f32,
        unit_dx: f32,
        unit_dy: f32,
        family: Occupancy,
        rng: &mut R,
    ) -> Self {
        let dx = unit_dx * damping(rng);
        let dy = unit_dy * damping(rng);
        Self::with_velocity(x, y, dx, dy, family)
    }

    /// Particle with an exact velocity (no random damping).
    pub fn with_velocity(x: f32, y: f32, dx: f32, dy: f32, family: Occupancy) -> Self {
        Self {
            x,
            y,
            dx,
            dy,
            t: 0.0,
            decay: (dx.abs() + dy.abs()) * DECAY_PER_SPEED,
            visual_stage: 0,
            family,
        }
    }

    /// Advances by `steps`; returns false once the particle has expired.
    fn step(&mut self, steps: f32) -> bool {
        self.t += steps;
        self.x += self.dx * steps;
        self.y += self.dy * steps;
        if self.t > self.decay * 3.0 {
            self.visual_stage = 2;
            return false;
        }
        if self.t > self.decay * 2.0 {
            self.visual_stage = 2;
        } else if self.t > self.decay {
            self.visual_stage = 1;
        }
        true
    }
}

fn damping<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.random_range(0..10u8) as f32 / 20.0
}

/// Owns every live particle.
#[derive(Debug, Clone, Default)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
}

impl ParticleSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<R: Rng + ?Sized>(
        &mut self,
        x: f32,
        y: f32,
        unit_dx: f32,
        unit_dy: f32,
        family: Occupancy,
        rng: &mut R,
    ) {
        self.particles
            .push(Particle::new(x, y, unit_dx, unit_dy, family, rng));
    }

    #[cfg(test)]
    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    pub fn advance(&mut self, dt: f32) {
        self.advance_steps(dt * PARTICLE_STEPS_PER_SEC);
    }

    pub fn advance_steps(&mut self, steps: f32) {
        self.particles.retain_mut(|p| p.step(steps));
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

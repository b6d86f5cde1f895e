use glam::Vec2;

use crate::action::Action;

/// Movement keys held this frame.
///
/// Opposing keys do not cancel: W wins over S and D wins over A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveKeys {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveKeys {
    /// Focus velocity on the ground plane (x, z) in world units per second.
    pub fn velocity(&self, speed: f32) -> Vec2 {
        let dz = if self.forward {
            -speed
        } else if self.back {
            speed
        } else {
            0.0
        };
        let dx = if self.right {
            speed
        } else if self.left {
            -speed
        } else {
            0.0
        };
        Vec2::new(dx, dz)
    }

    /// Movement over `dt` seconds as an action.
    pub fn action(&self, speed: f32, dt: f32) -> Action {
        let v = self.velocity(speed) * dt;
        if v == Vec2::ZERO {
            Action::Noop
        } else {
            Action::Move { dx: v.x, dz: v.y }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_keys_do_not_move() {
        assert_eq!(MoveKeys::default().velocity(500.0), Vec2::ZERO);
        assert_eq!(MoveKeys::default().action(500.0, 0.016), Action::Noop);
    }

    #[test]
    fn forward_is_negative_z() {
        let keys = MoveKeys {
            forward: true,
            ..Default::default()
        };
        assert_eq!(keys.velocity(500.0), Vec2::new(0.0, -500.0));
    }

    #[test]
    fn forward_beats_back_and_right_beats_left() {
        let keys = MoveKeys {
            forward: true,
            back: true,
            left: true,
            right: true,
        };
        assert_eq!(keys.velocity(10.0), Vec2::new(10.0, -10.0));
    }

    #[test]
    fn action_scales_by_frame_time() {
        let keys = MoveKeys {
            back: true,
            left: true,
            ..Default::default()
        };
        assert_eq!(keys.action(500.0, 0.5), Action::Move { dx: -250.0, dz: 250.0 });
    }
}

use crate::config::JoystickConfig;
use crate::rating::PointerEvent;

/// Raw readings of the two directional axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSample {
    pub horizontal: i32,
    pub vertical: i32,
}

impl AxisSample {
    /// Both axes at rest.
    pub fn centred(joystick: &JoystickConfig) -> Self {
        Self {
            horizontal: joystick.centre,
            vertical: joystick.centre,
        }
    }
}

/// A transition of the momentary select button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// Turns polled button levels into press/release transitions.
#[derive(Debug, Default, Clone)]
pub struct ButtonTracker {
    held: bool,
}

impl ButtonTracker {
    pub fn sample(&mut self, pressed: bool) -> Option<ButtonEdge> {
        let edge = match (self.held, pressed) {
            (false, true) => Some(ButtonEdge::Pressed),
            (true, false) => Some(ButtonEdge::Released),
            _ => None,
        };
        self.held = pressed;
        edge
    }
}

/// One poll of every input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFrame {
    pub axes: AxisSample,
    pub select: Option<ButtonEdge>,
    pub pointer: Option<PointerEvent>,
}

impl InputFrame {
    pub fn idle(joystick: &JoystickConfig) -> Self {
        Self {
            axes: AxisSample::centred(joystick),
            select: None,
            pointer: None,
        }
    }

    pub fn pressed(&self) -> bool {
        self.select == Some(ButtonEdge::Pressed)
    }
}

impl JoystickConfig {
    /// Pixel delta for a raw axis reading, `None` inside the dead zone.
    pub fn deflection(&self, raw: i32) -> Option<i32> {
        let offset = raw - self.centre;
        if offset.abs() > self.dead_zone {
            Some(offset / self.steps_per_pixel)
        } else {
            None
        }
    }

    /// Signed direction of a reading: -1, 0 or 1.
    pub fn direction(&self, raw: i32) -> i32 {
        if raw > self.centre + self.dead_zone {
            1
        } else if raw < self.centre - self.dead_zone {
            -1
        } else {
            0
        }
    }
}

//! Centering policy: maps an object center against the frame center and a
//! pixel tolerance to a corrective pan/tilt direction.
//!
//! Convention used across every backend: a [`Direction`] names where the
//! object sits relative to the frame center in screen space (y grows
//! downward), i.e. the direction the camera must move to re-center it. An
//! object right of center beyond tolerance yields `Right`; an object below
//! center yields `Down`.

use crate::frame::Point;

/// Horizontal component of a correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizontal {
    Left,
    Right,
}

/// Vertical component of a correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vertical {
    Up,
    Down,
}

/// The closed set of nine centering corrections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Centered,
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    fn compose(vertical: Option<Vertical>, horizontal: Option<Horizontal>) -> Self {
        use Direction::*;
        match (vertical, horizontal) {
            (None, None) => Centered,
            (Some(Vertical::Up), None) => Up,
            (Some(Vertical::Down), None) => Down,
            (None, Some(Horizontal::Left)) => Left,
            (None, Some(Horizontal::Right)) => Right,
            (Some(Vertical::Up), Some(Horizontal::Left)) => UpLeft,
            (Some(Vertical::Up), Some(Horizontal::Right)) => UpRight,
            (Some(Vertical::Down), Some(Horizontal::Left)) => DownLeft,
            (Some(Vertical::Down), Some(Horizontal::Right)) => DownRight,
        }
    }

    /// Horizontal component, if the object is off-center on that axis.
    pub fn horizontal(self) -> Option<Horizontal> {
        use Direction::*;
        match self {
            Left | UpLeft | DownLeft => Some(Horizontal::Left),
            Right | UpRight | DownRight => Some(Horizontal::Right),
            _ => None,
        }
    }

    /// Vertical component, if the object is off-center on that axis.
    pub fn vertical(self) -> Option<Vertical> {
        use Direction::*;
        match self {
            Up | UpLeft | UpRight => Some(Vertical::Up),
            Down | DownLeft | DownRight => Some(Vertical::Down),
            _ => None,
        }
    }

    /// Single-byte wire encoding for the serial protocol.
    pub fn serial_code(self) -> u8 {
        use Direction::*;
        match self {
            Centered => b'0',
            Up => b'1',
            Down => b'2',
            Left => b'3',
            Right => b'4',
            UpLeft => b'5',
            UpRight => b'6',
            DownLeft => b'7',
            DownRight => b'8',
        }
    }
}

/// Decide the correction for one detected object.
///
/// Boundary displacements equal to `offset` count as off-center, so ties
/// favor correction over declaring the object centered.
pub fn decide(object: Point, center: Point, offset: u32) -> Direction {
    let dy = i64::from(object.y) - i64::from(center.y);
    let dx = i64::from(object.x) - i64::from(center.x);
    let offset = i64::from(offset);

    let vertical = if dy >= offset {
        Some(Vertical::Down)
    } else if dy <= -offset {
        Some(Vertical::Up)
    } else {
        None
    };

    let horizontal = if dx >= offset {
        Some(Horizontal::Right)
    } else if dx <= -offset {
        Some(Horizontal::Left)
    } else {
        None
    };

    Direction::compose(vertical, horizontal)
}

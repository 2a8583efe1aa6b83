//! Mapping from raw input events to move directions.

use crate::engine::Direction;

/// Direction for a keyboard event code (`KeyboardEvent.code` naming).
///
/// Arrow keys and WASD are recognised; everything else maps to `None`.
pub fn direction_for_key(code: &str) -> Option<Direction> {
    match code {
        "ArrowUp" | "KeyW" => Some(Direction::Up),
        "ArrowDown" | "KeyS" => Some(Direction::Down),
        "ArrowLeft" | "KeyA" => Some(Direction::Left),
        "ArrowRight" | "KeyD" => Some(Direction::Right),
        _ => None,
    }
}

/// Direction for a swipe with screen-space deltas (positive `dy` points down).
///
/// The dominant axis wins; a tie goes to the vertical axis. A zero-length
/// swipe is not a move.
pub fn direction_for_swipe(dx: f32, dy: f32) -> Option<Direction> {
    if !dx.is_finite() || !dy.is_finite() || (dx == 0.0 && dy == 0.0) {
        return None;
    }
    let dir = if dx.abs() > dy.abs() {
        if dx > 0.0 { Direction::Right } else { Direction::Left }
    } else if dy > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    };
    Some(dir)
}

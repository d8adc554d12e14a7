//! Slide animation between the hidden offset (`-height`) and the docked
//! position (`0`).
//!
//! Step size is proportional to the remaining distance and scaled by speed,
//! so the overlay eases into place. The path never overshoots: the last
//! intermediate step stops short of the destination and the caller snaps the
//! window there with a final move.

use anyhow::Result;
use tracing::debug;

use crate::display::{DisplayService, FocusTarget, WindowId};

/// Fastest speed setting and divisor of the step formula.
pub const MAX_SPEED: u32 = 10;

/// Direction of travel. `Up` hides the overlay, `Down` reveals it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Resting y coordinate at the end of travel in this direction.
    pub fn destination(self, height: u32) -> i32 {
        match self {
            Direction::Down => 0,
            Direction::Up => -(height as i32),
        }
    }
}

/// Pixels to move for one frame given the remaining distance.
pub fn step_increment(distance: i32, speed: u32) -> i32 {
    let speed = speed.clamp(1, MAX_SPEED) as i32;
    let max = MAX_SPEED as i32;
    ((distance.abs() / max) / (max + 1 - speed)).max(1)
}

/// Intermediate positions of an eased slide from `start` toward `dest`.
///
/// The final snap to `dest` is not part of the path.
#[derive(Debug, Clone)]
pub struct SlidePath {
    current: i32,
    dest: i32,
    speed: u32,
}

impl SlidePath {
    pub fn new(start: i32, dest: i32, speed: u32) -> Self {
        Self {
            current: start,
            dest,
            speed,
        }
    }
}

impl Iterator for SlidePath {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        let remaining = self.dest - self.current;
        if remaining == 0 {
            return None;
        }
        let inc = step_increment(remaining, self.speed);
        if inc >= remaining.abs() {
            return None;
        }
        self.current += inc * remaining.signum();
        Some(self.current)
    }
}

/// One commanded slide of the overlay window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slide {
    pub direction: Direction,
    /// Jump straight to the destination with no intermediate frames.
    pub quick: bool,
    /// Where keyboard focus goes before the window starts moving.
    pub focus: FocusTarget,
}

/// Animate `window` to the destination of `slide.direction` and return the
/// number of position changes issued.
///
/// Revealing raises the window before and after moving; hiding lowers it at
/// the end so a parked overlay never covers other windows.
pub fn run_slide<D>(
    display: &D,
    window: WindowId,
    height: u32,
    speed: u32,
    slide: Slide,
) -> Result<usize>
where
    D: DisplayService + ?Sized,
{
    let dest = slide.direction.destination(height);
    display.set_input_focus(slide.focus)?;

    let start = display.window_y(window)?;
    debug!(
        from = start,
        to = dest,
        quick = slide.quick,
        "sliding overlay"
    );

    if slide.direction == Direction::Down {
        display.raise_window(window)?;
    }

    let mut moves = 0;
    if !slide.quick {
        for y in SlidePath::new(start, dest, speed) {
            display.move_window(window, 0, y)?;
            display.sync()?;
            moves += 1;
        }
    }

    display.move_window(window, 0, dest)?;
    moves += 1;

    match slide.direction {
        Direction::Down => display.raise_window(window)?,
        Direction::Up => display.lower_window(window)?,
    }
    display.flush()?;
    Ok(moves)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_len(start: i32, dest: i32, speed: u32) -> usize {
        SlidePath::new(start, dest, speed).count()
    }

    #[test]
    fn step_increment_has_floor_of_one() {
        assert_eq!(step_increment(0, 1), 1);
        assert_eq!(step_increment(5, 10), 1);
        assert_eq!(step_increment(-9, 10), 1);
    }

    #[test]
    fn step_increment_grows_with_speed() {
        // 157 / 10 = 15; speed 1 divides by 10, speed 10 by 1.
        assert_eq!(step_increment(157, 1), 1);
        assert_eq!(step_increment(157, 7), 3);
        assert_eq!(step_increment(157, 10), 15);
        assert_eq!(step_increment(-157, 10), 15);
    }

    #[test]
    fn out_of_range_speed_is_clamped() {
        assert_eq!(step_increment(157, 0), step_increment(157, 1));
        assert_eq!(step_increment(157, 42), step_increment(157, 10));
    }

    #[test]
    fn path_never_reaches_or_passes_destination() {
        for speed in 1..=MAX_SPEED {
            for height in 1..=300 {
                for y in SlidePath::new(-height, 0, speed) {
                    assert!(y > -height && y < 0, "reveal step {y} out of range");
                }
                for y in SlidePath::new(0, -height, speed) {
                    assert!(y < 0 && y > -height, "hide step {y} out of range");
                }
            }
        }
    }

    #[test]
    fn path_is_monotonic_toward_destination() {
        let steps: Vec<i32> = SlidePath::new(-400, 0, 6).collect();
        assert!(steps.windows(2).all(|w| w[0] < w[1]));
        let steps: Vec<i32> = SlidePath::new(0, -400, 6).collect();
        assert!(steps.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn path_is_finite_for_every_speed_and_height() {
        for speed in 1..=MAX_SPEED {
            for height in 1..=2000 {
                assert!(path_len(-height, 0, speed) < height as usize);
                assert!(path_len(0, -height, speed) < height as usize);
            }
        }
    }

    #[test]
    fn faster_speed_never_takes_more_steps() {
        for height in 1..=1000 {
            let mut previous = usize::MAX;
            for speed in 1..=MAX_SPEED {
                let steps = path_len(-height, 0, speed);
                assert!(
                    steps <= previous,
                    "height {height}: speed {speed} took {steps} steps, slower took {previous}"
                );
                previous = steps;
            }
        }
    }

    #[test]
    fn path_from_destination_is_empty() {
        assert_eq!(path_len(0, 0, 5), 0);
        assert_eq!(path_len(-150, -150, 5), 0);
    }

    #[test]
    fn one_pixel_away_snaps_without_intermediate_steps() {
        assert_eq!(path_len(-1, 0, 10), 0);
        assert_eq!(path_len(-149, -150, 1), 0);
    }

    #[test]
    fn reveal_at_speed_eight_eases_in() {
        let steps: Vec<i32> = SlidePath::new(-150, 0, 8).collect();
        // 150 / 10 / 3 = 5 pixels for the first frame, shrinking near the top.
        assert_eq!(steps.first(), Some(&-145));
        assert_eq!(steps.last(), Some(&-1));
        let increments: Vec<i32> = std::iter::once(-150)
            .chain(steps.iter().copied())
            .collect::<Vec<_>>()
            .windows(2)
            .map(|w| w[1] - w[0])
            .collect();
        assert!(increments.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn direction_destinations() {
        assert_eq!(Direction::Down.destination(150), 0);
        assert_eq!(Direction::Up.destination(150), -150);
        assert_eq!(Direction::Up.reversed(), Direction::Down);
        assert_eq!(Direction::Down.reversed(), Direction::Up);
    }
}

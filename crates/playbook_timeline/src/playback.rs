// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback clock.
//!
//! The clock owns the time cursor and a single scheduled frame. The host drives
//! it by handing back the [`FrameTicket`] of the last scheduled frame together
//! with the current time; each accepted frame schedules the next one under a
//! fresh ticket. Cancelling drops the scheduled frame, so any ticket still held
//! by the host is stale and ignored.

use crate::keyframe::Tick;
use std::time::Instant;

/// Handle of a scheduled frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameTicket(u64);

/// Result of running one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The ticket was not the scheduled frame; nothing happened
    Stale,
    /// The cursor advanced and the next frame is scheduled
    Advanced(FrameTicket),
    /// The cursor stopped on a recording boundary
    ReachedBoundary(Tick),
    /// The cursor stopped at the end of the timeline
    ReachedEnd,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledFrame {
    ticket: FrameTicket,
    /// Time of the previous frame; `None` until the first frame runs
    last_frame: Option<Instant>,
}

/// Real-time cursor over a fixed-length timeline
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Current position, possibly between ticks
    tick: f64,
    /// Last tick of the timeline
    total_ticks: Tick,
    /// Ticks per second
    frame_rate: u32,
    /// Whether playback was requested
    playing: bool,
    /// Pending frame
    scheduled: Option<ScheduledFrame>,
    next_ticket: u64,
}

impl PlaybackClock {
    /// Create a paused clock at tick 0
    pub fn new(frame_rate: u32, total_ticks: Tick) -> Self {
        Self {
            tick: 0.0,
            total_ticks: total_ticks.max(0),
            frame_rate: frame_rate.max(1),
            playing: false,
            scheduled: None,
            next_ticket: 1,
        }
    }

    /// Current cursor position
    pub fn tick(&self) -> f64 {
        self.tick
    }

    /// Cursor rounded to the nearest tick
    pub fn current_frame(&self) -> Tick {
        self.tick.round() as Tick
    }

    /// Last tick of the timeline
    pub fn total_ticks(&self) -> Tick {
        self.total_ticks
    }

    /// Ticks per second
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Move the cursor, clamped to the timeline
    pub fn set_tick(&mut self, tick: f64) {
        self.tick = if tick.is_nan() {
            0.0
        } else {
            tick.clamp(0.0, self.total_ticks as f64)
        };
    }

    /// Whether playback was requested
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Request playback
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stop requesting playback. The scheduled frame is left to the caller.
    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Schedule the frame loop if it is not already running
    pub fn start(&mut self) -> FrameTicket {
        if let Some(frame) = self.scheduled {
            return frame.ticket;
        }
        let ticket = self.issue_ticket();
        self.scheduled = Some(ScheduledFrame {
            ticket,
            last_frame: None,
        });
        ticket
    }

    /// Drop the scheduled frame
    pub fn cancel(&mut self) {
        self.scheduled = None;
    }

    /// Ticket of the scheduled frame
    pub fn pending_frame(&self) -> Option<FrameTicket> {
        self.scheduled.map(|f| f.ticket)
    }

    /// Run the frame `ticket` at time `now`.
    ///
    /// `boundary` is the tick the cursor must not pass, if any. Reaching it or
    /// the end of the timeline unschedules the loop.
    pub fn advance(&mut self, ticket: FrameTicket, now: Instant, boundary: Option<Tick>) -> FrameOutcome {
        let last_frame = match self.scheduled {
            Some(frame) if frame.ticket == ticket => frame.last_frame,
            _ => return FrameOutcome::Stale,
        };

        let elapsed = last_frame
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        let next = self.tick + self.seconds_to_ticks(elapsed);

        if let Some(boundary) = boundary.filter(|&b| next >= b as f64) {
            self.tick = boundary as f64;
            self.scheduled = None;
            return FrameOutcome::ReachedBoundary(boundary);
        }
        if next >= self.total_ticks as f64 {
            self.tick = self.total_ticks as f64;
            self.playing = false;
            self.scheduled = None;
            return FrameOutcome::ReachedEnd;
        }

        self.tick = next;
        let ticket = self.issue_ticket();
        self.scheduled = Some(ScheduledFrame {
            ticket,
            last_frame: Some(now),
        });
        FrameOutcome::Advanced(ticket)
    }

    /// Convert seconds to ticks
    pub fn seconds_to_ticks(&self, seconds: f64) -> f64 {
        seconds * self.frame_rate as f64
    }

    /// Convert ticks to seconds
    pub fn ticks_to_seconds(&self, ticks: f64) -> f64 {
        ticks / self.frame_rate as f64
    }

    fn issue_ticket(&mut self) -> FrameTicket {
        let ticket = FrameTicket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_set_tick_clamps() {
        let mut clock = PlaybackClock::new(30, 100);
        clock.set_tick(-5.0);
        assert_eq!(clock.tick(), 0.0);
        clock.set_tick(250.0);
        assert_eq!(clock.tick(), 100.0);
        clock.set_tick(12.4);
        assert_eq!(clock.current_frame(), 12);
    }

    #[test]
    fn test_advance_uses_elapsed_time() {
        let mut clock = PlaybackClock::new(10, 100);
        let t0 = Instant::now();
        let first = clock.start();

        // First frame only records the timestamp.
        let FrameOutcome::Advanced(second) = clock.advance(first, t0, None) else {
            panic!("expected the loop to continue");
        };
        assert_eq!(clock.tick(), 0.0);

        let outcome = clock.advance(second, t0 + ms(500), None);
        assert!(matches!(outcome, FrameOutcome::Advanced(_)));
        assert!((clock.tick() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let mut clock = PlaybackClock::new(10, 100);
        let t0 = Instant::now();
        let first = clock.start();
        let FrameOutcome::Advanced(second) = clock.advance(first, t0, None) else {
            panic!("expected the loop to continue");
        };

        assert_eq!(clock.advance(first, t0 + ms(100), None), FrameOutcome::Stale);
        clock.cancel();
        assert_eq!(clock.advance(second, t0 + ms(100), None), FrameOutcome::Stale);
        assert_eq!(clock.tick(), 0.0);
        assert_eq!(clock.pending_frame(), None);
    }

    #[test]
    fn test_boundary_stops_loop() {
        let mut clock = PlaybackClock::new(10, 100);
        let t0 = Instant::now();
        let first = clock.start();
        let FrameOutcome::Advanced(second) = clock.advance(first, t0, Some(3)) else {
            panic!("expected the loop to continue");
        };

        assert_eq!(
            clock.advance(second, t0 + ms(1000), Some(3)),
            FrameOutcome::ReachedBoundary(3)
        );
        assert_eq!(clock.tick(), 3.0);
        assert_eq!(clock.pending_frame(), None);
    }

    #[test]
    fn test_end_stops_playing() {
        let mut clock = PlaybackClock::new(10, 20);
        clock.play();
        let t0 = Instant::now();
        let first = clock.start();
        let FrameOutcome::Advanced(second) = clock.advance(first, t0, None) else {
            panic!("expected the loop to continue");
        };

        assert_eq!(clock.advance(second, t0 + ms(5000), None), FrameOutcome::ReachedEnd);
        assert_eq!(clock.tick(), 20.0);
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut clock = PlaybackClock::new(30, 100);
        let a = clock.start();
        let b = clock.start();
        assert_eq!(a, b);
        assert!((clock.ticks_to_seconds(clock.seconds_to_ticks(2.0)) - 2.0).abs() < 1e-9);
    }
}

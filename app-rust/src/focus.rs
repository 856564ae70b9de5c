use crate::{HistoryKind, StudyResult, UserSession};
use chrono::{Datelike, Local};
use std::collections::BTreeMap;

pub const FOCUS_SECONDS: u32 = 25 * 60;
pub const BREAK_SECONDS: u32 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    Focus,
    Break,
}

impl FocusMode {
    #[must_use]
    pub fn duration_seconds(self) -> u32 {
        match self {
            Self::Focus => FOCUS_SECONDS,
            Self::Break => BREAK_SECONDS,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Focus => Self::Break,
            Self::Break => Self::Focus,
        }
    }
}

/// Emitted when a countdown reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEvent {
    FocusCompleted,
    BreakCompleted,
}

impl FocusEvent {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::FocusCompleted => "Focus completed! Take a break.",
            Self::BreakCompleted => "Break over! Back to work.",
        }
    }
}

/// Pomodoro countdown. Finishing a block switches to the other mode and
/// pauses until toggled again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    mode: FocusMode,
    remaining: u32,
    active: bool,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self {
            mode: FocusMode::Focus,
            remaining: FOCUS_SECONDS,
            active: false,
        }
    }
}

impl FocusTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(&self) -> FocusMode {
        self.mode
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn toggle(&mut self) {
        self.active = !self.active;
    }

    /// Stop and rewind the current mode.
    pub fn reset(&mut self) {
        self.active = false;
        self.remaining = self.mode.duration_seconds();
    }

    /// Let `seconds` pass. Has no effect while paused.
    pub fn tick(&mut self, seconds: u32) -> Option<FocusEvent> {
        if !self.active {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(seconds);
        if self.remaining > 0 {
            return None;
        }

        let event = match self.mode {
            FocusMode::Focus => FocusEvent::FocusCompleted,
            FocusMode::Break => FocusEvent::BreakCompleted,
        };
        self.active = false;
        self.mode = self.mode.next();
        self.remaining = self.mode.duration_seconds();
        Some(event)
    }

    /// Elapsed share of the current block, 0.0 to 100.0.
    #[must_use]
    pub fn progress(&self) -> f64 {
        let total = f64::from(self.mode.duration_seconds());
        (total - f64::from(self.remaining)) / total * 100.0
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn display(&self) -> String {
        format_clock(self.remaining)
    }
}

#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

pub struct FocusService<'a> {
    session: &'a UserSession,
}

impl<'a> FocusService<'a> {
    pub(crate) fn new(session: &'a UserSession) -> Self {
        Self { session }
    }

    /// Credit a completed focus block: one more session, its length as
    /// study time, and a history entry.
    pub async fn credit_focus_block(&self, minutes: u32) -> StudyResult<()> {
        let hours = f64::from(minutes) / 60.0;
        self.session
            .analytics()
            .log_focus_session(hours, Local::now().weekday())
            .await?;
        self.session
            .history()
            .add(
                HistoryKind::Focus,
                "Completed focus session",
                BTreeMap::from([("duration".to_string(), format!("{minutes} min"))]),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_timer_does_not_move() {
        let mut timer = FocusTimer::new();
        assert_eq!(timer.tick(60), None);
        assert_eq!(timer.display(), "25:00");
    }

    #[test]
    fn focus_completion_switches_to_paused_break() {
        let mut timer = FocusTimer::new();
        timer.toggle();

        assert_eq!(timer.tick(FOCUS_SECONDS - 1), None);
        assert_eq!(timer.display(), "00:01");
        assert_eq!(timer.tick(1), Some(FocusEvent::FocusCompleted));

        assert_eq!(timer.mode(), FocusMode::Break);
        assert_eq!(timer.remaining_seconds(), BREAK_SECONDS);
        assert!(!timer.is_active());

        timer.toggle();
        assert_eq!(timer.tick(BREAK_SECONDS + 30), Some(FocusEvent::BreakCompleted));
        assert_eq!(timer.mode(), FocusMode::Focus);
        assert_eq!(timer.display(), "25:00");
    }

    #[test]
    fn progress_and_reset() {
        let mut timer = FocusTimer::new();
        timer.toggle();
        timer.tick(FOCUS_SECONDS / 4);
        assert!((timer.progress() - 25.0).abs() < f64::EPSILON);

        timer.reset();
        assert!(!timer.is_active());
        assert_eq!(timer.remaining_seconds(), FOCUS_SECONDS);
        assert!(timer.progress().abs() < f64::EPSILON);
    }

    #[test]
    fn clock_is_zero_padded() {
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(0), "00:00");
    }
}

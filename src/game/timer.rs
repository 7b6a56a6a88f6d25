use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Waiting for the first correct answer
    Armed,
    /// Someone answered, others get the answer window
    Grace,
    Closed,
}

/// Deadline keeper for a single round
#[derive(Debug)]
pub struct RoundTimer {
    state: TimerState,
    deadline: Instant,
    window: Duration,
}

impl RoundTimer {
    pub fn arm(timeout: Duration, window: Duration) -> Self {
        Self {
            state: TimerState::Armed,
            deadline: Instant::now() + timeout,
            window,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_closed(&self) -> bool {
        self.state == TimerState::Closed
    }

    /// Whether an answer received at `at` still counts
    pub fn accepts(&self, at: Instant) -> bool {
        !self.is_closed() && at <= self.deadline
    }

    /// First accepted answer starts the grace window. A zero window closes
    /// the round on the spot. Returns true on the armed to grace transition.
    pub fn on_accepted(&mut self, at: Instant) -> bool {
        if self.state != TimerState::Armed {
            return false;
        }
        if self.window.is_zero() {
            self.state = TimerState::Closed;
        } else {
            self.state = TimerState::Grace;
            self.deadline = at + self.window;
        }
        true
    }

    /// Close the round if its deadline has passed
    pub fn expire(&mut self, now: Instant) -> bool {
        if !self.is_closed() && now >= self.deadline {
            self.state = TimerState::Closed;
            return true;
        }
        false
    }

    pub fn close(&mut self) {
        self.state = TimerState::Closed;
    }
}

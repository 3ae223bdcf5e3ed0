use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle = 0,
    Fetching = 1,
    Closed = 2,
}

impl StreamState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => StreamState::Idle,
            1 => StreamState::Fetching,
            _ => StreamState::Closed,
        }
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamState::Idle => "idle",
            StreamState::Fetching => "fetching",
            StreamState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Scheduling state of an iteration session.
///
/// `Idle -> Fetching -> Idle` is the normal fetch cycle, and `Idle | Fetching
/// -> Closed` is cancellation. `Closed` is absorbing. Every transition is a
/// single compare-and-swap.
#[derive(Debug)]
pub struct SessionState {
    raw: AtomicU8,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            raw: AtomicU8::new(StreamState::Idle as u8),
        }
    }

    pub fn load(&self) -> StreamState {
        StreamState::from_u8(self.raw.load(Ordering::SeqCst))
    }

    pub fn is_closed(&self) -> bool {
        self.load() == StreamState::Closed
    }

    /// `Idle -> Fetching`. Returns false when a fetch already runs or the
    /// session is closed.
    pub fn try_start_fetch(&self) -> bool {
        self.transition(StreamState::Idle, StreamState::Fetching)
    }

    /// `Fetching -> Idle`. Returns false when the session was closed in the
    /// meantime.
    pub fn finish_fetch(&self) -> bool {
        self.transition(StreamState::Fetching, StreamState::Idle)
    }

    /// Moves any open state to `Closed` and returns the state it replaced, or
    /// `None` if the session was already closed.
    pub fn try_close(&self) -> Option<StreamState> {
        let mut current = self.raw.load(Ordering::SeqCst);
        loop {
            if StreamState::from_u8(current) == StreamState::Closed {
                return None;
            }
            match self.raw.compare_exchange(
                current,
                StreamState::Closed as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(previous) => return Some(StreamState::from_u8(previous)),
                Err(actual) => current = actual,
            }
        }
    }

    fn transition(&self, from: StreamState, to: StreamState) -> bool {
        self.raw
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fetch_cycle() {
        let state = SessionState::new();
        assert!(state.try_start_fetch());
        assert!(!state.try_start_fetch());
        assert_eq!(state.load(), StreamState::Fetching);
        assert!(state.finish_fetch());
        assert!(!state.finish_fetch());
        assert_eq!(state.load(), StreamState::Idle);
    }

    #[test]
    fn closed_is_absorbing() {
        let state = SessionState::new();
        assert!(state.try_start_fetch());
        assert_eq!(state.try_close(), Some(StreamState::Fetching));
        assert_eq!(state.try_close(), None);
        assert!(!state.finish_fetch());
        assert!(!state.try_start_fetch());
        assert!(state.is_closed());
    }

    #[test]
    fn concurrent_starts_admit_one() {
        let state = Arc::new(SessionState::new());
        let winners: usize = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || state.try_start_fetch())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
    }
}

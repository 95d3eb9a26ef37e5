use std::sync::{Condvar, Mutex};

/// A counting wakeup signal for the matchmaker thread.
///
/// Grounded on `exchange.c`'s `matchmaker_sem`: `post` is called by every
/// operation that might create a new crossing opportunity (post, cancel,
/// shutdown); the worker blocks in `wait` until at least one post has arrived,
/// then drains all pending posts at once since it always runs the match loop to
/// quiescence on each wake.
pub struct MatchSignal {
    pending: Mutex<u64>,
    cv: Condvar,
}

impl MatchSignal {
    pub fn new() -> MatchSignal {
        MatchSignal {
            pending: Mutex::new(0),
            cv: Condvar::new(),
        }
    }

    pub fn post(&self) {
        let mut pending = self.pending.lock().unwrap();
        *pending += 1;
        self.cv.notify_one();
    }

    /// Block until at least one post has arrived since the last wait, then
    /// consume all of them.
    pub fn wait(&self) {
        let mut pending = self.pending.lock().unwrap();
        while *pending == 0 {
            pending = self.cv.wait(pending).unwrap();
        }
        *pending = 0;
    }
}

impl Default for MatchSignal {
    fn default() -> MatchSignal {
        MatchSignal::new()
    }
}

//! Game session state machine
//!
//! The session is the single source of truth for run status, course size and
//! the generation seed. Status only changes through `start`, `finish` and
//! `restart`; every other component observes it through listeners.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GameStatus {
    /// Player parked at the start, waiting for the first input
    #[default]
    Ready,
    /// Clock running
    Playing,
    /// Finish line crossed, clock stopped
    Ending,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Ready => "ready",
            GameStatus::Playing => "playing",
            GameStatus::Ending => "ending",
        }
    }
}

/// Identifies a registered status listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

type StatusListener = Box<dyn FnMut(GameStatus)>;

/// PCG stream used for drawing replacement seeds
const RESEED_STREAM: u64 = 0x5eed;

pub struct GameSession {
    status: GameStatus,
    segment_count: u32,
    seed: u64,
    start_time: f64,
    end_time: f64,
    reseed_rng: Pcg32,
    listeners: Vec<(ListenerId, StatusListener)>,
    next_listener: u32,
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("status", &self.status)
            .field("segment_count", &self.segment_count)
            .field("seed", &self.seed)
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl GameSession {
    /// Create a session in `Ready`. The seed also seeds the stream that
    /// later restarts draw from, so a whole play-through is reproducible.
    pub fn new(segment_count: u32, seed: u64) -> Self {
        Self {
            status: GameStatus::Ready,
            segment_count,
            seed,
            start_time: 0.0,
            end_time: 0.0,
            reseed_rng: Pcg32::new(seed, RESEED_STREAM),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn segment_count(&self) -> u32 {
        self.segment_count
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Session clock for display. Zero before the run starts, frozen once it ends.
    pub fn elapsed(&self, now: f64) -> f64 {
        match self.status {
            GameStatus::Ready => 0.0,
            GameStatus::Playing => (now - self.start_time).max(0.0),
            GameStatus::Ending => (self.end_time - self.start_time).max(0.0),
        }
    }

    /// Ready -> Playing. Returns false (and changes nothing) from any other status.
    pub fn start(&mut self, now: f64) -> bool {
        if self.status != GameStatus::Ready {
            return false;
        }
        self.start_time = now;
        self.transition(GameStatus::Playing);
        true
    }

    /// Playing -> Ending. Returns false from any other status.
    pub fn finish(&mut self, now: f64) -> bool {
        if self.status != GameStatus::Playing {
            return false;
        }
        self.end_time = now;
        self.transition(GameStatus::Ending);
        true
    }

    /// Playing/Ending -> Ready with a fresh seed. Returns false while already Ready.
    pub fn restart(&mut self) -> bool {
        if self.status == GameStatus::Ready {
            return false;
        }
        let previous = self.seed;
        let mut seed = self.reseed_rng.random::<u64>();
        while seed == previous {
            seed = self.reseed_rng.random::<u64>();
        }
        self.seed = seed;
        self.transition(GameStatus::Ready);
        true
    }

    /// Register a listener for status changes. Listeners run in registration
    /// order, after the new status is stored, and only see the new value.
    pub fn subscribe(&mut self, listener: impl FnMut(GameStatus) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn transition(&mut self, to: GameStatus) {
        let from = self.status;
        self.status = to;
        log::info!(
            "Session {} -> {} (segments={}, seed={:#x})",
            from.as_str(),
            to.as_str(),
            self.segment_count,
            self.seed
        );
        for (_, listener) in self.listeners.iter_mut() {
            listener(to);
        }
    }
}

/// Queue of status changes, filled by a session listener and drained by the
/// frame scheduler at well-defined points in the frame.
#[derive(Debug, Clone, Default)]
pub struct StatusInbox {
    queue: Rc<RefCell<VecDeque<GameStatus>>>,
}

impl StatusInbox {
    /// Create an inbox and register it on the session
    pub fn attach(session: &mut GameSession) -> (Self, ListenerId) {
        let inbox = Self::default();
        let queue = Rc::clone(&inbox.queue);
        let id = session.subscribe(move |status| queue.borrow_mut().push_back(status));
        (inbox, id)
    }

    /// Take every queued change, oldest first
    pub fn drain(&self) -> Vec<GameStatus> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_full_cycle() {
        let mut session = GameSession::new(5, 42);
        assert_eq!(session.status(), GameStatus::Ready);

        assert!(session.start(1.0));
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(session.start_time(), 1.0);

        assert!(session.finish(4.5));
        assert_eq!(session.status(), GameStatus::Ending);
        assert_eq!(session.end_time(), 4.5);
        assert!((session.elapsed(100.0) - 3.5).abs() < 1e-9);

        let seed = session.seed();
        assert!(session.restart());
        assert_eq!(session.status(), GameStatus::Ready);
        assert_ne!(session.seed(), seed);
        assert_eq!(session.segment_count(), 5);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let mut session = GameSession::new(3, 7);
        assert!(!session.finish(1.0));
        assert!(!session.restart());
        assert_eq!(session.seed(), 7);
        assert_eq!(session.status(), GameStatus::Ready);

        session.start(2.0);
        assert!(!session.start(3.0));
        assert_eq!(session.start_time(), 2.0);

        session.finish(5.0);
        assert!(!session.finish(6.0));
        assert!(!session.start(6.0));
        assert_eq!(session.end_time(), 5.0);
    }

    #[test]
    fn test_fall_restart_from_playing() {
        let mut session = GameSession::new(3, 7);
        session.start(0.0);
        assert!(session.restart());
        assert_eq!(session.status(), GameStatus::Ready);
        assert_eq!(session.elapsed(10.0), 0.0);
    }

    #[test]
    fn test_elapsed_while_playing() {
        let mut session = GameSession::new(3, 7);
        session.start(2.0);
        assert!((session.elapsed(3.25) - 1.25).abs() < 1e-9);
    }

    #[test]
    fn test_listeners_see_transitions_in_order() {
        let mut session = GameSession::new(3, 1);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&seen);
        let second = Rc::clone(&seen);
        session.subscribe(move |s| first.borrow_mut().push(("a", s)));
        session.subscribe(move |s| second.borrow_mut().push(("b", s)));

        session.start(0.0);
        session.start(0.0); // no-op, no notification
        session.restart();

        assert_eq!(
            *seen.borrow(),
            vec![
                ("a", GameStatus::Playing),
                ("b", GameStatus::Playing),
                ("a", GameStatus::Ready),
                ("b", GameStatus::Ready),
            ]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let mut session = GameSession::new(3, 1);
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let id = session.subscribe(move |_| *c.borrow_mut() += 1);

        session.start(0.0);
        assert!(session.unsubscribe(id));
        assert!(!session.unsubscribe(id));
        session.finish(1.0);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_inbox_drains_once() {
        let mut session = GameSession::new(3, 1);
        let (inbox, _) = StatusInbox::attach(&mut session);
        session.start(0.0);
        session.restart();
        assert_eq!(inbox.drain(), vec![GameStatus::Playing, GameStatus::Ready]);
        assert!(inbox.is_empty());
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn test_reseed_sequence_is_reproducible() {
        let mut a = GameSession::new(4, 99);
        let mut b = GameSession::new(4, 99);
        for _ in 0..5 {
            a.start(0.0);
            a.restart();
            b.start(0.0);
            b.restart();
            assert_eq!(a.seed(), b.seed());
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Start,
        Finish,
        Restart,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Start), Just(Op::Finish), Just(Op::Restart)]
    }

    proptest! {
        #[test]
        fn prop_transitions_respect_guards(seed in any::<u64>(), ops in prop::collection::vec(op(), 0..64)) {
            let mut session = GameSession::new(5, seed);
            for (i, op) in ops.into_iter().enumerate() {
                let before = session.status();
                let before_seed = session.seed();
                let now = i as f64;
                let applied = match op {
                    Op::Start => session.start(now),
                    Op::Finish => session.finish(now),
                    Op::Restart => session.restart(),
                };
                let expected = match (op, before) {
                    (Op::Start, GameStatus::Ready) => Some(GameStatus::Playing),
                    (Op::Finish, GameStatus::Playing) => Some(GameStatus::Ending),
                    (Op::Restart, GameStatus::Playing | GameStatus::Ending) => Some(GameStatus::Ready),
                    _ => None,
                };
                prop_assert_eq!(applied, expected.is_some());
                prop_assert_eq!(session.status(), expected.unwrap_or(before));
                if matches!(op, Op::Restart) && applied {
                    prop_assert_ne!(session.seed(), before_seed);
                } else {
                    prop_assert_eq!(session.seed(), before_seed);
                }
                prop_assert_eq!(session.segment_count(), 5);
            }
        }
    }
}

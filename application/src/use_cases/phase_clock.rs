//! Phase clock use case
//!
//! Tracks which session phase is live and how long it has left, mirrors the
//! authoritative remote clock on (re)entry, and persists every change so a
//! restart resumes mid-countdown.

use crate::ports::session_service::SessionService;
use crate::ports::state_store::SessionStateStore;
use crate::timer::TimerHandle;
use chrono::Utc;
use huddle_domain::{
    ClockSource, ClockState, Phase, PhaseDurations, PhaseTransition, Session, SessionId, reconcile,
};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted by the running countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Tick { phase: Phase, remaining_seconds: u64 },
    PhaseComplete(PhaseTransition),
}

struct ClockCore<T: SessionStateStore> {
    store: Arc<T>,
    session: Mutex<Session>,
}

impl<T: SessionStateStore> ClockCore<T> {
    fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut session);
        persist(self.store.as_ref(), &session);
        result
    }
}

fn persist<T: SessionStateStore + ?Sized>(store: &T, session: &Session) {
    if let Err(e) = store.save(session.id(), &session.snapshot()) {
        warn!("Could not persist phase for session {}: {}", session.id(), e);
    }
}

/// The session's phase clock
///
/// Cloning is cheap and shares the same underlying clock.
pub struct PhaseClock<T: SessionStateStore + 'static> {
    core: Arc<ClockCore<T>>,
    restored: ClockState,
}

impl<T: SessionStateStore + 'static> Clone for PhaseClock<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            restored: self.restored,
        }
    }
}

impl<T: SessionStateStore + 'static> PhaseClock<T> {
    /// Enter (or re-enter) a session.
    ///
    /// If the store was last running a different session, that session's
    /// snapshot is discarded first so its countdown cannot leak into this
    /// one. The phase is then reconciled: remote when reachable, else the
    /// local snapshot for this session, else `prep` at full duration.
    pub async fn enter<S: SessionService + ?Sized>(
        service: &S,
        store: Arc<T>,
        session_id: SessionId,
        durations: PhaseDurations,
    ) -> Self {
        match store.active_session() {
            Ok(Some(previous)) if previous != session_id => {
                info!(
                    "New session {} detected, discarding state of {}",
                    session_id, previous
                );
                if let Err(e) = store.clear(&previous) {
                    warn!("Could not clear state of session {}: {}", previous, e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Could not read active session: {}", e),
        }
        if let Err(e) = store.set_active_session(&session_id) {
            warn!("Could not record active session {}: {}", session_id, e);
        }

        let local = store.load(&session_id).unwrap_or_else(|e| {
            warn!("Ignoring unreadable local state for {}: {}", session_id, e);
            None
        });

        let remote = match service.get_phase(&session_id).await {
            Ok(remote) => Some(remote),
            Err(e) => {
                warn!("Phase service unreachable, using local state: {}", e);
                None
            }
        };

        let state = reconcile(remote.as_ref(), local.as_ref(), Utc::now(), &durations);
        info!(
            "Session {} at {} with {}s remaining (source: {:?})",
            session_id, state.phase, state.remaining_seconds, state.source
        );

        let session = Session::from_clock(session_id, state, durations);
        persist(store.as_ref(), &session);

        Self {
            core: Arc::new(ClockCore {
                store,
                session: Mutex::new(session),
            }),
            restored: state,
        }
    }

    /// Clock state right after reconciliation
    pub fn restored(&self) -> ClockState {
        self.restored
    }

    pub fn restored_from(&self) -> ClockSource {
        self.restored.source
    }

    pub fn session_id(&self) -> SessionId {
        self.core
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .id()
            .clone()
    }

    pub fn phase(&self) -> Phase {
        self.core
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase()
    }

    pub fn time_remaining(&self) -> u64 {
        self.core
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .time_remaining()
    }

    /// One second of local countdown; persisted
    pub fn tick(&self) -> Option<PhaseTransition> {
        self.core.with_session(|s| s.tick())
    }

    /// Explicit forward transition; persisted
    pub fn advance_to(&self, phase: Phase) -> Option<PhaseTransition> {
        self.core.with_session(|s| s.advance_to(phase))
    }

    /// Session finished: drop the local snapshot
    pub fn finish(&self) {
        let session_id = self.session_id();
        if let Err(e) = self.core.store.clear(&session_id) {
            warn!("Could not clear state of session {}: {}", session_id, e);
        }
    }

    /// Start the 1-second local countdown.
    ///
    /// Stops on its own once an untimed phase is reached. Cancelling the
    /// returned handle only pauses the local display; the remote clock keeps
    /// running.
    pub fn start(&self, events: mpsc::UnboundedSender<ClockEvent>) -> TimerHandle {
        let clock = self.clone();
        TimerHandle::every("phase-countdown", Duration::from_secs(1), move || {
            let transition = clock.tick();
            let phase = clock.phase();
            let remaining = clock.time_remaining();
            let events = events.clone();
            async move {
                if let Some(transition) = transition {
                    debug!("Phase complete: {} -> {}", transition.from, transition.to);
                    if events.send(ClockEvent::PhaseComplete(transition)).is_err() {
                        return ControlFlow::Break(());
                    }
                }
                if !phase.is_timed() {
                    return ControlFlow::Break(());
                }
                let tick = ClockEvent::Tick {
                    phase,
                    remaining_seconds: remaining,
                };
                if events.send(tick).is_err() {
                    return ControlFlow::Break(());
                }
                ControlFlow::Continue(())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::state_store::MemoryStateStore;
    use crate::use_cases::test_support::ScriptedService;
    use huddle_domain::{PersistedPhase, RemotePhase};

    fn offline() -> ScriptedService {
        ScriptedService::offline()
    }

    fn durations() -> PhaseDurations {
        PhaseDurations {
            prep_seconds: 3,
            discussion_seconds: 120,
        }
    }

    fn sess(s: &str) -> SessionId {
        SessionId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_restart_resumes_persisted_discussion() {
        let store = Arc::new(MemoryStateStore::new());
        store.set_active_session(&sess("X")).unwrap();
        store
            .save(&sess("X"), &PersistedPhase::new(Phase::Discussion, 42))
            .unwrap();

        let clock = PhaseClock::enter(&offline(), Arc::clone(&store), sess("X"), durations()).await;

        assert_eq!(clock.phase(), Phase::Discussion);
        assert_eq!(clock.time_remaining(), 42);
        assert_eq!(clock.restored_from(), ClockSource::Local);
    }

    #[tokio::test]
    async fn test_new_session_resets_to_prep_without_leaking_time() {
        let store = Arc::new(MemoryStateStore::new());
        store.set_active_session(&sess("X")).unwrap();
        store
            .save(&sess("X"), &PersistedPhase::new(Phase::Discussion, 42))
            .unwrap();

        let clock = PhaseClock::enter(&offline(), Arc::clone(&store), sess("Y"), durations()).await;

        assert_eq!(clock.phase(), Phase::Prep);
        assert_eq!(clock.time_remaining(), 3);
        assert_eq!(store.load(&sess("X")).unwrap(), None);
        assert_eq!(store.active_session().unwrap(), Some(sess("Y")));
        assert_eq!(
            store.load(&sess("Y")).unwrap(),
            Some(PersistedPhase::new(Phase::Prep, 3))
        );
    }

    #[tokio::test]
    async fn test_remote_phase_wins_when_reachable() {
        let store = Arc::new(MemoryStateStore::new());
        store.set_active_session(&sess("X")).unwrap();
        store
            .save(&sess("X"), &PersistedPhase::new(Phase::Prep, 2))
            .unwrap();
        let service = ScriptedService {
            phase: Some(RemotePhase::new(
                Phase::Discussion,
                Some(Utc::now() + chrono::Duration::seconds(600)),
            )),
            ..ScriptedService::default()
        };

        let clock = PhaseClock::enter(&service, Arc::clone(&store), sess("X"), durations()).await;

        assert_eq!(clock.phase(), Phase::Discussion);
        assert!((599..=600).contains(&clock.time_remaining()));
        assert_eq!(clock.restored_from(), ClockSource::Remote);
    }

    #[tokio::test]
    async fn test_every_tick_is_persisted() {
        let store = Arc::new(MemoryStateStore::new());
        let clock = PhaseClock::enter(&offline(), Arc::clone(&store), sess("X"), durations()).await;

        clock.tick();
        assert_eq!(
            store.load(&sess("X")).unwrap(),
            Some(PersistedPhase::new(Phase::Prep, 2))
        );

        clock.tick();
        let transition = clock.tick().unwrap();
        assert_eq!(transition.to, Phase::Discussion);
        assert_eq!(
            store.load(&sess("X")).unwrap(),
            Some(PersistedPhase::new(Phase::Discussion, 120))
        );
    }

    #[tokio::test]
    async fn test_finish_clears_snapshot() {
        let store = Arc::new(MemoryStateStore::new());
        let clock = PhaseClock::enter(&offline(), Arc::clone(&store), sess("X"), durations()).await;
        clock.advance_to(Phase::Done);
        clock.finish();
        assert_eq!(store.load(&sess("X")).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_emits_ticks_and_phase_complete() {
        let store = Arc::new(MemoryStateStore::new());
        let clock = PhaseClock::enter(&offline(), Arc::clone(&store), sess("X"), durations()).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = clock.start(tx);

        assert_eq!(
            rx.recv().await,
            Some(ClockEvent::Tick {
                phase: Phase::Prep,
                remaining_seconds: 2
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(ClockEvent::Tick {
                phase: Phase::Prep,
                remaining_seconds: 1
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(ClockEvent::PhaseComplete(PhaseTransition {
                from: Phase::Prep,
                to: Phase::Discussion
            }))
        );
        assert_eq!(
            rx.recv().await,
            Some(ClockEvent::Tick {
                phase: Phase::Discussion,
                remaining_seconds: 120
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_countdown_stops_local_ticks() {
        let store = Arc::new(MemoryStateStore::new());
        let clock = PhaseClock::enter(&offline(), Arc::clone(&store), sess("X"), durations()).await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = clock.start(tx);

        rx.recv().await;
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(clock.time_remaining(), 2);
    }
}

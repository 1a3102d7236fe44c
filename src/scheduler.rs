//! Click-rate scheduling engine.
//!
//! Turns a target clicks-per-second value into a set of parallel periodic
//! emitter tasks. A single timer only fires reliably up to a few dozen
//! hertz, so higher rates are sharded across just enough emitters that no
//! single one exceeds [`EMITTER_MAX_RATE`]. All emitters funnel through
//! one exclusive lock around the actuator, and a tick that loses the lock
//! is dropped rather than queued, so the aggregate rate is a soft target.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::actuator::{Actuator, ClickMode, MouseButton};
use crate::error::{RapidClickError, Result};

/// Lowest accepted click rate, in clicks per second.
pub const RATE_MIN: u32 = 1;
/// Highest accepted click rate, in clicks per second.
pub const RATE_MAX: u32 = 1000;
/// Highest rate a single emitter runs at; anything above is split across
/// additional emitters.
pub const EMITTER_MAX_RATE: u32 = 50;

/// Actuator handle shared by every emitter of a session.
pub type SharedActuator = Arc<Mutex<Box<dyn Actuator>>>;

/// Wrap an actuator for use by a [`ClickScheduler`].
pub fn shared_actuator(actuator: impl Actuator + 'static) -> SharedActuator {
    let boxed: Box<dyn Actuator> = Box::new(actuator);
    Arc::new(Mutex::new(boxed))
}

/// Per-emitter rate assignment for a target aggregate rate.
///
/// `shares()[i]` is emitter `i`'s clicks-per-second share. Shares sum to
/// the target rate exactly; the first `rate % emitters` entries carry one
/// extra click per second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerPlan {
    shares: Vec<u32>,
}

impl TimerPlan {
    /// Split `rate` across just enough emitters that none exceeds
    /// [`EMITTER_MAX_RATE`].
    pub fn for_rate(rate: u32) -> Result<Self> {
        if !(RATE_MIN..=RATE_MAX).contains(&rate) {
            return Err(RapidClickError::invalid_rate(rate, RATE_MIN, RATE_MAX));
        }

        let emitters = rate.div_ceil(EMITTER_MAX_RATE);
        let base = rate / emitters;
        let remainder = rate % emitters;
        let shares = (0..emitters)
            .map(|i| if i < remainder { base + 1 } else { base })
            .collect();

        Ok(Self { shares })
    }

    /// Number of emitter tasks the plan spawns.
    pub fn emitter_count(&self) -> usize {
        self.shares.len()
    }

    /// Per-emitter clicks-per-second shares.
    pub fn shares(&self) -> &[u32] {
        &self.shares
    }

    /// Tick period for one emitter share.
    pub fn period(share: u32) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(share))
    }
}

/// A running set of emitter tasks plus the signal that ends them.
struct ClickSession {
    live: watch::Sender<bool>,
    emitters: Vec<JoinHandle<()>>,
    rate: u32,
}

enum State {
    Idle,
    Running(ClickSession),
}

/// Owns the emitter tasks for at most one active clicking session.
///
/// All mutation goes through `&mut self`, so a scheduler is driven from a
/// single control task. Dropping a running scheduler ends its emitters
/// without waiting for them; use [`ClickScheduler::stop`] for the
/// nothing-runs-after-return guarantee.
pub struct ClickScheduler {
    actuator: SharedActuator,
    state: State,
    total_clicks: Arc<AtomicU64>,
}

impl ClickScheduler {
    pub fn new(actuator: SharedActuator) -> Self {
        Self {
            actuator,
            state: State::Idle,
            total_clicks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start a session at `rate` clicks per second.
    ///
    /// The rate, button and mode are captured now; later changes apply
    /// from the next start. Returns [`RapidClickError::AlreadyRunning`]
    /// while a session is active and [`RapidClickError::InvalidRate`] for
    /// an out-of-range rate.
    pub fn start(&mut self, rate: u32, button: MouseButton, mode: ClickMode) -> Result<()> {
        if self.is_running() {
            return Err(RapidClickError::AlreadyRunning);
        }

        let plan = TimerPlan::for_rate(rate)?;
        let (live, _) = watch::channel(true);
        let mut emitters = Vec::with_capacity(plan.emitter_count());
        for (index, share) in plan.shares().iter().copied().enumerate() {
            emitters.push(tokio::spawn(run_emitter(
                index,
                share,
                button,
                mode,
                Arc::clone(&self.actuator),
                live.subscribe(),
                Arc::clone(&self.total_clicks),
            )));
        }

        info!(
            "clicking started: {} cps ({} {}) across {} emitters",
            rate,
            mode,
            button,
            emitters.len()
        );
        self.state = State::Running(ClickSession { live, emitters, rate });
        Ok(())
    }

    /// Stop the active session, if any.
    ///
    /// Resolves only after every emitter task has finished, so no click is
    /// issued after this returns. Stopping an idle scheduler is a no-op.
    pub async fn stop(&mut self) {
        let State::Running(session) = std::mem::replace(&mut self.state, State::Idle) else {
            debug!("stop requested while idle");
            return;
        };

        let _ = session.live.send(false);
        for handle in session.emitters {
            if let Err(e) = handle.await {
                warn!("emitter task ended abnormally: {}", e);
            }
        }
        info!(
            "clicking stopped: {} cps session, {} clicks issued in total",
            session.rate,
            self.clicks_issued()
        );
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// Emitters in the active session; zero while idle.
    pub fn emitter_count(&self) -> usize {
        match &self.state {
            State::Running(session) => session.emitters.len(),
            State::Idle => 0,
        }
    }

    /// Rate of the active session, if one is running.
    pub fn active_rate(&self) -> Option<u32> {
        match &self.state {
            State::Running(session) => Some(session.rate),
            State::Idle => None,
        }
    }

    /// Clicks issued since this scheduler was created.
    pub fn clicks_issued(&self) -> u64 {
        self.total_clicks.load(Ordering::Relaxed)
    }
}

/// Body of one emitter task: tick at the share's period and click while
/// the session is live. A tick that finds the actuator lock held is
/// dropped so pairs never interleave and never queue up.
async fn run_emitter(
    index: usize,
    share: u32,
    button: MouseButton,
    mode: ClickMode,
    actuator: SharedActuator,
    mut live: watch::Receiver<bool>,
    clicks: Arc<AtomicU64>,
) {
    let period = TimerPlan::period(share);
    let mut ticker = tokio::time::interval(period);
    // Missed ticks stay missed; the next tick lands on the original grid.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!("emitter {} running at {} cps ({:?} period)", index, share, period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !*live.borrow() {
                    break;
                }
                if let Some(mut guard) = actuator.try_lock() {
                    guard.click(button, mode);
                    clicks.fetch_add(1, Ordering::Relaxed);
                }
            }
            changed = live.changed() => {
                if changed.is_err() || !*live.borrow() {
                    break;
                }
            }
        }
    }
    debug!("emitter {} stopped", index);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingActuator {
        ticks: Arc<AtomicU64>,
        pairs: Arc<AtomicU64>,
    }

    impl Actuator for CountingActuator {
        fn click(&mut self, _button: MouseButton, mode: ClickMode) {
            self.ticks.fetch_add(1, Ordering::Relaxed);
            self.pairs.fetch_add(u64::from(mode.pairs()), Ordering::Relaxed);
        }
    }

    fn counting() -> (Arc<AtomicU64>, Arc<AtomicU64>, SharedActuator) {
        let ticks = Arc::new(AtomicU64::new(0));
        let pairs = Arc::new(AtomicU64::new(0));
        let actuator = shared_actuator(CountingActuator {
            ticks: Arc::clone(&ticks),
            pairs: Arc::clone(&pairs),
        });
        (ticks, pairs, actuator)
    }

    #[test]
    fn test_plan_shares_sum_to_rate() {
        for rate in RATE_MIN..=RATE_MAX {
            let plan = TimerPlan::for_rate(rate).unwrap();
            assert_eq!(plan.shares().iter().sum::<u32>(), rate, "rate {rate}");
            assert!(
                plan.shares().iter().all(|share| (1..=EMITTER_MAX_RATE).contains(share)),
                "rate {rate} produced a share outside 1..=50: {:?}",
                plan.shares()
            );
        }
    }

    #[test]
    fn test_plan_emitter_counts() {
        for (rate, expected) in [
            (1, 1),
            (10, 1),
            (49, 1),
            (50, 1),
            (51, 2),
            (100, 2),
            (150, 3),
            (999, 20),
            (1000, 20),
        ] {
            let plan = TimerPlan::for_rate(rate).unwrap();
            assert_eq!(plan.emitter_count(), expected, "rate {rate}");
        }
    }

    #[test]
    fn test_plan_remainder_goes_to_first_emitters() {
        let plan = TimerPlan::for_rate(151).unwrap();
        assert_eq!(plan.shares(), &[38, 38, 38, 37][..]);

        let plan = TimerPlan::for_rate(150).unwrap();
        assert_eq!(plan.shares(), &[50, 50, 50][..]);
    }

    #[test]
    fn test_plan_rejects_out_of_range_rates() {
        assert!(matches!(
            TimerPlan::for_rate(0),
            Err(RapidClickError::InvalidRate { rate: 0, .. })
        ));
        assert!(matches!(
            TimerPlan::for_rate(1001),
            Err(RapidClickError::InvalidRate { rate: 1001, .. })
        ));
    }

    #[test]
    fn test_period_for_share() {
        assert_eq!(TimerPlan::period(50), Duration::from_millis(20));
        assert_eq!(TimerPlan::period(1), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_start_while_running_is_rejected() {
        let (_ticks, _pairs, actuator) = counting();
        let mut scheduler = ClickScheduler::new(actuator);

        scheduler
            .start(100, MouseButton::Primary, ClickMode::Single)
            .unwrap();
        assert!(scheduler.is_running());
        assert_eq!(scheduler.emitter_count(), 2);
        assert_eq!(scheduler.active_rate(), Some(100));

        let again = scheduler.start(500, MouseButton::Primary, ClickMode::Single);
        assert!(matches!(again, Err(RapidClickError::AlreadyRunning)));
        assert!(scheduler.is_running());
        assert_eq!(scheduler.emitter_count(), 2);
        assert_eq!(scheduler.active_rate(), Some(100));

        scheduler.stop().await;
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.emitter_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_rate_is_rejected() {
        let (_ticks, _pairs, actuator) = counting();
        let mut scheduler = ClickScheduler::new(actuator);

        let result = scheduler.start(0, MouseButton::Primary, ClickMode::Single);
        assert!(matches!(result, Err(RapidClickError::InvalidRate { .. })));
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_final() {
        let (ticks, _pairs, actuator) = counting();
        let mut scheduler = ClickScheduler::new(actuator);

        // Stopping while idle is a no-op.
        scheduler.stop().await;
        assert!(!scheduler.is_running());

        scheduler
            .start(50, MouseButton::Primary, ClickMode::Single)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.stop().await;
        assert!(!scheduler.is_running());

        let frozen = ticks.load(Ordering::Relaxed);
        assert!(frozen > 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(ticks.load(Ordering::Relaxed), frozen);

        scheduler.stop().await;
        assert_eq!(ticks.load(Ordering::Relaxed), frozen);
    }

    #[tokio::test]
    async fn test_double_mode_issues_two_pairs_per_tick() {
        let (ticks, pairs, actuator) = counting();
        let mut scheduler = ClickScheduler::new(actuator);

        scheduler
            .start(20, MouseButton::Primary, ClickMode::Double)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        scheduler.stop().await;

        let ticks = ticks.load(Ordering::Relaxed);
        assert!(ticks > 0);
        assert_eq!(pairs.load(Ordering::Relaxed), ticks * 2);
    }

    #[tokio::test]
    async fn test_single_mode_issues_one_pair_per_tick() {
        let (ticks, pairs, actuator) = counting();
        let mut scheduler = ClickScheduler::new(actuator);

        scheduler
            .start(20, MouseButton::Secondary, ClickMode::Single)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        scheduler.stop().await;

        assert_eq!(pairs.load(Ordering::Relaxed), ticks.load(Ordering::Relaxed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_contended_ticks_are_dropped_not_queued() {
        let (ticks, _pairs, actuator) = counting();
        let mut scheduler = ClickScheduler::new(Arc::clone(&actuator));

        scheduler
            .start(100, MouseButton::Primary, ClickMode::Single)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        // While the test holds the actuator lock every tick must be
        // dropped: the count stays frozen.
        let frozen = {
            let _guard = actuator.lock();
            let at_lock = ticks.load(Ordering::Relaxed);
            tokio::time::sleep(Duration::from_millis(120)).await;
            assert_eq!(ticks.load(Ordering::Relaxed), at_lock);
            at_lock
        };

        // After release the rate resumes with no catch-up burst for the
        // ~12 ticks dropped during the hold.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let resumed = ticks.load(Ordering::Relaxed) - frozen;
        assert!(resumed <= 10, "expected no burst after contention, got {resumed}");

        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_dropping_a_running_scheduler_ends_emitters() {
        let (ticks, _pairs, actuator) = counting();
        let mut scheduler = ClickScheduler::new(actuator);

        scheduler
            .start(50, MouseButton::Primary, ClickMode::Single)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(scheduler);

        // Emitters observe the closed channel on their next wakeup.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = ticks.load(Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ticks.load(Ordering::Relaxed), settled);
    }
}

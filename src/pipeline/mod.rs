//! The effect pipeline.
//!
//! The pipeline turns cast requests into effects. Each cast moves through
//!
//! ```text
//! Queued -> Resolving -> Executing -> Completed | Cancelled | Failed
//! ```
//!
//! - **Queued**: permission, session, cooldown and cost are checked. Any
//!   failure ends the cast as `Failed` with nothing deducted.
//! - **Resolving**: cost is deducted, the cooldown starts, and leading
//!   steps whose condition is false are skipped.
//! - **Executing**: steps run in chain order. A delay suspends the cast
//!   until the scheduler hands it back on a later [`tick`](EffectPipeline::tick).
//!
//! ## Tick-loop contract
//!
//! The pipeline owns caster sessions and calls the capability handle, so
//! every mutating operation takes a [`Tick`] token. Cancellation is
//! cooperative: it is recorded immediately and applied at the start of the
//! next tick, before any continuation resumes.
//!
//! ## Isolation
//!
//! Each cast has its own record, cursor and RNG stream. A cast that fails
//! or is cancelled never touches another cast's state.

mod cast;
mod executor;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

pub use cast::{
    CancelReason, CastContext, CastFailure, CastHandle, CastReport, CastRequest, CastState,
    CastTarget, OutcomeKind, SkipReason, StepOutcome,
};

use crate::adapter::WarnOnce;
use crate::capability::CapabilityHandle;
use crate::core::{CastId, CasterId, PipelineConfig, SpellRng, Tick};
use crate::effects::CustomEvaluator;
use crate::error::CastRejection;
use crate::scheduler::{TaskScheduler, TickQueue};
use crate::session::CasterState;

use executor::{CastRecord, Progress, StepEnv};

/// Drives casts against a borrowed capability handle.
pub struct EffectPipeline<'c, S: TaskScheduler = TickQueue> {
    capabilities: &'c CapabilityHandle,
    config: PipelineConfig,
    scheduler: S,
    rng: SpellRng,
    sessions: FxHashMap<CasterId, CasterState>,
    casts: FxHashMap<CastId, CastRecord>,
    pending_cancels: Vec<(CastId, CancelReason)>,
    warn_once: WarnOnce,
    eval_custom: Option<Box<CustomEvaluator<'c>>>,
    next_id: u64,
}

impl<'c> EffectPipeline<'c, TickQueue> {
    /// Create a pipeline with the default tick queue.
    pub fn new(capabilities: &'c CapabilityHandle, config: PipelineConfig) -> Self {
        Self::with_scheduler(capabilities, config, TickQueue::new())
    }
}

impl<'c, S: TaskScheduler> EffectPipeline<'c, S> {
    /// Create a pipeline with a custom scheduler.
    pub fn with_scheduler(capabilities: &'c CapabilityHandle, config: PipelineConfig, scheduler: S) -> Self {
        let rng = SpellRng::new(config.rng_seed);
        Self {
            capabilities,
            config,
            scheduler,
            rng,
            sessions: FxHashMap::default(),
            casts: FxHashMap::default(),
            pending_cancels: Vec::new(),
            warn_once: WarnOnce::new(),
            eval_custom: None,
            next_id: 0,
        }
    }

    /// Add an evaluator for [`StepCondition::Custom`](crate::effects::StepCondition::Custom).
    #[must_use]
    pub fn with_custom_conditions(mut self, eval: impl Fn(&str, &CastContext) -> bool + 'c) -> Self {
        self.eval_custom = Some(Box::new(eval));
        self
    }

    /// The handle this pipeline realizes effects through.
    #[must_use]
    pub fn capabilities(&self) -> &'c CapabilityHandle {
        self.capabilities
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // === Sessions ===

    /// Start a caster's session with its authoritative starting state.
    ///
    /// Replaces any existing session for the caster and returns it.
    pub fn open_session(&mut self, _tick: &Tick, caster: CasterId, state: CasterState) -> Option<CasterState> {
        debug!(%caster, "session opened");
        self.sessions.insert(caster, state)
    }

    /// End a caster's session, cancelling its in-flight casts.
    ///
    /// Returns the final state for persistence.
    pub fn close_session(&mut self, _tick: &Tick, caster: CasterId) -> Option<CasterState> {
        let ids = self.in_flight_ids(caster);
        for id in ids {
            self.apply_cancel(id, CancelReason::SessionClosed);
        }
        let state = self.sessions.remove(&caster);
        if state.is_some() {
            debug!(%caster, "session closed");
        }
        state
    }

    #[must_use]
    pub fn session(&self, caster: CasterId) -> Option<&CasterState> {
        self.sessions.get(&caster)
    }

    pub fn session_mut(&mut self, _tick: &Tick, caster: CasterId) -> Option<&mut CasterState> {
        self.sessions.get_mut(&caster)
    }

    // === Casts ===

    /// Accept a cast and run it until it finishes or first suspends.
    ///
    /// Never blocks. The returned handle stays valid until the cast is
    /// [reaped](Self::reap).
    pub fn request_cast(&mut self, tick: &Tick, request: CastRequest) -> CastHandle {
        self.next_id += 1;
        let id = CastId(self.next_id);
        let now = tick.now();

        let context = CastContext {
            id,
            caster: request.caster,
            spell: request.spell,
            chain: request.chain,
            target: request.target,
            power: request.power,
            cost: request.cost,
            accepted_at: now,
        };
        let mut record = CastRecord::new(context, self.rng.for_cast(id));
        debug!(cast = %id, caster = %record.context.caster, spell = %record.context.spell, "cast queued");

        match self.admit(&record.context, request.permitted, request.cooldown_ticks, now) {
            Err(rejection) => {
                info!(cast = %id, caster = %record.context.caster, "cast rejected: {rejection}");
                record.state = CastState::Failed(CastFailure::Rejected(rejection));
            }
            Ok(()) => {
                record.state = CastState::Resolving;
                debug!(cast = %id, "cast resolving");
                let caster = record.context.caster;
                executor::select_first_eligible(&mut record, &self.env(tick, caster));

                record.state = CastState::Executing;
                debug!(cast = %id, "cast executing");
                self.drive(tick, &mut record);
            }
        }

        self.casts.insert(id, record);
        CastHandle::new(id)
    }

    /// Queued-state checks, then the Resolving deductions.
    fn admit(&mut self, context: &CastContext, permitted: bool, cooldown_ticks: u64, now: u64) -> Result<(), CastRejection> {
        if !permitted {
            return Err(CastRejection::NotPermitted);
        }
        let session = self
            .sessions
            .get_mut(&context.caster)
            .ok_or(CastRejection::NoSession(context.caster))?;
        session.check_cooldown(context.spell, now)?;
        session.check_cost(&context.cost)?;

        session.deduct(&context.cost);
        session.cooldowns_mut().start(context.spell, now, cooldown_ticks);
        Ok(())
    }

    /// Request cancellation. Takes effect at the start of the next tick.
    ///
    /// Returns `false` if the cast is unknown or already terminal.
    pub fn cancel(&mut self, _tick: &Tick, handle: CastHandle) -> bool {
        self.request_cancel(handle.id(), CancelReason::Requested)
    }

    /// Cancel every in-flight cast of a caster removed from the world.
    ///
    /// Returns how many casts were signalled.
    pub fn cancel_caster(&mut self, _tick: &Tick, caster: CasterId) -> usize {
        self.in_flight_ids(caster)
            .into_iter()
            .filter(|id| self.request_cancel(*id, CancelReason::CasterRemoved))
            .count()
    }

    fn request_cancel(&mut self, id: CastId, reason: CancelReason) -> bool {
        let live = self.casts.get(&id).is_some_and(|r| !r.state.is_terminal());
        if !live || self.pending_cancels.iter().any(|(pending, _)| *pending == id) {
            return false;
        }
        debug!(cast = %id, ?reason, "cancellation requested");
        self.pending_cancels.push((id, reason));
        true
    }

    fn apply_cancel(&mut self, id: CastId, reason: CancelReason) {
        if let Some(record) = self.casts.get_mut(&id) {
            if !record.state.is_terminal() {
                record.state = CastState::Cancelled(reason);
                self.scheduler.discard(id);
                debug!(cast = %id, ?reason, "cast cancelled");
            }
        }
    }

    /// Advance the pipeline to `tick`.
    ///
    /// In order: resource regeneration, pending cancellations, due
    /// continuations, then the abandonment watchdog. Returns the number of
    /// continuations resumed.
    pub fn tick(&mut self, tick: &Tick) -> usize {
        let now = tick.now();
        self.regenerate(now);

        for (id, reason) in std::mem::take(&mut self.pending_cancels) {
            self.apply_cancel(id, reason);
        }

        let mut resumed = 0;
        for id in self.scheduler.due(now) {
            let Some(mut record) = self.casts.remove(&id) else {
                continue;
            };
            if record.state == CastState::Executing {
                debug!(cast = %id, "cast resumed");
                self.drive(tick, &mut record);
                resumed += 1;
            }
            self.casts.insert(id, record);
        }

        self.reap_abandoned(now);
        resumed
    }

    fn regenerate(&mut self, now: u64) {
        for (resource, rule) in &self.config.regen {
            if !rule.fires_at(now) {
                continue;
            }
            for state in self.sessions.values_mut() {
                if let Some(pool) = state.pool_mut(resource) {
                    pool.restore(rule.amount);
                }
            }
        }
        for state in self.sessions.values_mut() {
            state.cooldowns_mut().prune(now);
        }
    }

    fn reap_abandoned(&mut self, now: u64) {
        let default_limit = self.config.abandon_after_ticks;
        let stale: Vec<(CastId, u64)> = self
            .casts
            .iter()
            .filter(|(_, r)| r.state == CastState::Executing)
            .filter_map(|(id, r)| {
                let limit = r.context.chain.abandon_after_ticks.unwrap_or(default_limit);
                let idle = now.saturating_sub(r.last_progress);
                (idle > limit).then_some((*id, idle))
            })
            .collect();

        for (id, idle_ticks) in stale {
            info!(cast = %id, idle_ticks, "cast abandoned");
            self.apply_cancel(id, CancelReason::Abandoned { idle_ticks });
        }
    }

    /// Run a cast's executor and apply where it stopped.
    fn drive(&mut self, tick: &Tick, record: &mut CastRecord) {
        let id = record.context.id;
        let caster = record.context.caster;
        let progress = executor::run(record, &self.env(tick, caster));
        match progress {
            Progress::Suspended(due) => {
                debug!(cast = %id, due, "cast suspended");
                self.scheduler.schedule(due, id);
            }
            Progress::Completed => {
                debug!(cast = %id, steps = record.outcomes.len(), "cast completed");
                record.state = CastState::Completed;
            }
            Progress::Failed(failure) => {
                record.state = CastState::Failed(CastFailure::Chain(failure));
            }
        }
    }

    fn env<'e>(&'e self, tick: &'e Tick, caster: CasterId) -> StepEnv<'e> {
        StepEnv {
            tick,
            capabilities: self.capabilities,
            caster: self.sessions.get(&caster),
            warn_once: &self.warn_once,
            eval_custom: self.eval_custom.as_deref(),
            max_sub_chain_depth: self.config.max_sub_chain_depth,
        }
    }

    fn in_flight_ids(&self, caster: CasterId) -> Vec<CastId> {
        let mut ids: Vec<CastId> = self
            .casts
            .iter()
            .filter(|(_, r)| r.context.caster == caster && !r.state.is_terminal())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    // === Observation ===

    #[must_use]
    pub fn state(&self, handle: CastHandle) -> Option<&CastState> {
        self.casts.get(&handle.id()).map(|r| &r.state)
    }

    /// Per-step outcomes so far, in execution order.
    #[must_use]
    pub fn outcome(&self, handle: CastHandle) -> Option<&[StepOutcome]> {
        self.casts.get(&handle.id()).map(|r| r.outcomes.as_slice())
    }

    #[must_use]
    pub fn context(&self, handle: CastHandle) -> Option<&CastContext> {
        self.casts.get(&handle.id()).map(|r| &r.context)
    }

    /// Casts not yet in a terminal state.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.casts.values().filter(|r| !r.state.is_terminal()).count()
    }

    /// Pending scheduler wake-ups.
    #[must_use]
    pub fn pending_wakeups(&self) -> usize {
        self.scheduler.pending()
    }

    /// Remove terminal casts and return their reports, oldest first.
    pub fn reap(&mut self) -> Vec<CastReport> {
        let mut done: Vec<CastId> = self
            .casts
            .iter()
            .filter(|(_, r)| r.state.is_terminal())
            .map(|(id, _)| *id)
            .collect();
        done.sort_unstable();

        done.into_iter()
            .filter_map(|id| self.casts.remove(&id))
            .map(|r| CastReport {
                context: r.context,
                state: r.state,
                outcomes: r.outcomes,
                rng: r.rng.state(),
            })
            .collect()
    }
}

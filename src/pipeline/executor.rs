//! Step execution.
//!
//! A cast's position in its chain is a [`Cursor`]: a stack of frames, one
//! per chain being walked (the root chain plus any sub-chains entered). The
//! executor advances the cursor until the chain ends, a delay suspends it,
//! or a mandatory step fails.
//!
//! Each step passes its gates in a fixed order: delay, condition, chance.
//! The cursor remembers which gates the current step already passed, so a
//! resumed cast neither waits twice nor evaluates a condition twice.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::adapter::WarnOnce;
use crate::capability::CapabilityHandle;
use crate::core::{Location, SpellRng, Tick};
use crate::effects::{
    Anchor, ChainStep, ConditionContext, ConditionEvaluator, CustomEvaluator, EffectChain,
    EffectDescriptor, StepPath, DEFAULT_LINE_SPACING,
};
use crate::error::{CapabilityError, ChainFailure};
use crate::session::CasterState;

use super::cast::{CastContext, CastState, CastTarget, OutcomeKind, SkipReason, StepOutcome};

struct Frame {
    chain: Arc<EffectChain>,
    next: usize,
    prefix: StepPath,
}

/// Position of a cast within its chain.
pub(crate) struct Cursor {
    frames: SmallVec<[Frame; 2]>,
    delay_served: bool,
    condition_passed: bool,
}

impl Cursor {
    pub(crate) fn new(chain: Arc<EffectChain>) -> Self {
        let mut cursor = Self {
            frames: SmallVec::new(),
            delay_served: false,
            condition_passed: false,
        };
        cursor.frames.push(Frame {
            chain,
            next: 0,
            prefix: StepPath::empty(),
        });
        cursor.settle();
        cursor
    }

    /// The step under the cursor, with its chain and path.
    fn current(&self) -> Option<(Arc<EffectChain>, usize, StepPath)> {
        let frame = self.frames.last()?;
        Some((
            Arc::clone(&frame.chain),
            frame.next,
            frame.prefix.child(frame.next),
        ))
    }

    /// Move past the current step.
    fn advance(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.next += 1;
        }
        self.delay_served = false;
        self.condition_passed = false;
        self.settle();
    }

    /// Move past the current step into `chain`.
    fn enter(&mut self, chain: Arc<EffectChain>, path: StepPath) {
        if let Some(frame) = self.frames.last_mut() {
            frame.next += 1;
        }
        self.delay_served = false;
        self.condition_passed = false;
        self.frames.push(Frame {
            chain,
            next: 0,
            prefix: path,
        });
        self.settle();
    }

    /// Pop exhausted frames.
    fn settle(&mut self) {
        while self
            .frames
            .last()
            .is_some_and(|frame| frame.next >= frame.chain.len())
        {
            self.frames.pop();
        }
    }

    /// Number of sub-chains currently entered.
    fn nesting(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Everything the pipeline tracks for one cast.
pub(crate) struct CastRecord {
    pub(crate) context: CastContext,
    pub(crate) state: CastState,
    pub(crate) cursor: Cursor,
    pub(crate) rng: SpellRng,
    pub(crate) outcomes: Vec<StepOutcome>,
    /// Tick of the last step processed or the acceptance tick.
    pub(crate) last_progress: u64,
}

impl CastRecord {
    pub(crate) fn new(context: CastContext, rng: SpellRng) -> Self {
        let cursor = Cursor::new(Arc::clone(&context.chain));
        let last_progress = context.accepted_at;
        Self {
            context,
            state: CastState::Queued,
            cursor,
            rng,
            outcomes: Vec::new(),
            last_progress,
        }
    }

    fn record(&mut self, path: StepPath, kind: OutcomeKind) {
        self.outcomes.push(StepOutcome { path, kind });
    }
}

/// Borrowed view of the pipeline a step may use.
pub(crate) struct StepEnv<'e> {
    pub(crate) tick: &'e Tick,
    pub(crate) capabilities: &'e CapabilityHandle,
    pub(crate) caster: Option<&'e CasterState>,
    pub(crate) warn_once: &'e WarnOnce,
    pub(crate) eval_custom: Option<&'e CustomEvaluator<'e>>,
    pub(crate) max_sub_chain_depth: usize,
}

impl StepEnv<'_> {
    fn condition_holds(&self, step: &ChainStep, cast: &CastContext) -> bool {
        let ctx = ConditionContext {
            tick: self.tick,
            cast,
            caster: self.caster,
            capabilities: self.capabilities,
            eval_custom: self.eval_custom,
        };
        ConditionEvaluator::evaluate(&step.condition, &ctx)
    }
}

/// Where a run of the executor stopped.
#[derive(Debug, PartialEq)]
pub(crate) enum Progress {
    /// Waiting for a delay; resume at this tick.
    Suspended(u64),
    Completed,
    Failed(ChainFailure),
}

/// Skip leading steps whose condition is false, stopping at the first
/// eligible step or the first delay.
pub(crate) fn select_first_eligible(record: &mut CastRecord, env: &StepEnv) {
    while let Some((chain, index, path)) = record.cursor.current() {
        let Some(step) = chain.step(index) else {
            record.cursor.advance();
            continue;
        };
        if step.delay_ticks > 0 {
            return;
        }
        if env.condition_holds(step, &record.context) {
            record.cursor.condition_passed = true;
            return;
        }
        debug!(cast = %record.context.id, step = %path, "condition false, skipping");
        record.record(path, OutcomeKind::Skipped(SkipReason::ConditionFalse));
        record.cursor.advance();
    }
}

/// Run steps until the chain ends, suspends, or fails.
pub(crate) fn run(record: &mut CastRecord, env: &StepEnv) -> Progress {
    let now = env.tick.now();
    record.last_progress = now;

    while let Some((chain, index, path)) = record.cursor.current() {
        let Some(step) = chain.step(index) else {
            record.cursor.advance();
            continue;
        };

        if step.delay_ticks > 0 && !record.cursor.delay_served {
            record.cursor.delay_served = true;
            return Progress::Suspended(now.saturating_add(step.delay_ticks));
        }

        if !record.cursor.condition_passed {
            if !env.condition_holds(step, &record.context) {
                debug!(cast = %record.context.id, step = %path, "condition false, skipping");
                record.record(path, OutcomeKind::Skipped(SkipReason::ConditionFalse));
                record.cursor.advance();
                continue;
            }
            record.cursor.condition_passed = true;
        }

        if !record.rng.roll(step.chance) {
            debug!(cast = %record.context.id, step = %path, chance = step.chance, "chance roll failed");
            record.record(path, OutcomeKind::Skipped(SkipReason::ChanceFailed));
            record.cursor.advance();
            continue;
        }

        match realize(step, &record.context, env) {
            Ok(Realized::Done) => {
                record.record(path, OutcomeKind::Executed);
                record.cursor.advance();
            }
            Ok(Realized::Enter(sub)) => {
                if record.cursor.nesting() >= env.max_sub_chain_depth {
                    let failure = ChainFailure::SubChainTooDeep {
                        step: path,
                        limit: env.max_sub_chain_depth,
                    };
                    warn!(cast = %record.context.id, "{failure}");
                    return Progress::Failed(failure);
                }
                record.record(path.clone(), OutcomeKind::Executed);
                record.cursor.enter(sub, path);
            }
            Err(StepError::OutOfRange) => {
                debug!(cast = %record.context.id, step = %path, "line target out of range");
                record.record(path, OutcomeKind::Skipped(SkipReason::OutOfRange));
                record.cursor.advance();
            }
            Err(StepError::Unavailable(err)) => {
                env.warn_once.warn(
                    format!("{}:{}", chain.name, err.operation()),
                    format_args!("chain {:?}: {err}", chain.name),
                );
                if step.mandatory {
                    let failure = ChainFailure::MandatoryStepUnavailable {
                        step: path,
                        source: err,
                    };
                    warn!(cast = %record.context.id, "{failure}");
                    return Progress::Failed(failure);
                }
                record.record(
                    path,
                    OutcomeKind::Skipped(SkipReason::CapabilityUnavailable(err.operation())),
                );
                record.cursor.advance();
            }
            Err(StepError::NoAnchor(what)) => {
                if step.mandatory {
                    let failure = ChainFailure::MandatoryStepUnrealizable {
                        step: path,
                        reason: format!("no {what}"),
                    };
                    warn!(cast = %record.context.id, "{failure}");
                    return Progress::Failed(failure);
                }
                debug!(cast = %record.context.id, step = %path, "no {what}, skipping");
                record.record(path, OutcomeKind::Skipped(SkipReason::NoAnchor));
                record.cursor.advance();
            }
        }
    }

    Progress::Completed
}

enum Realized {
    Done,
    Enter(Arc<EffectChain>),
}

enum StepError {
    Unavailable(CapabilityError),
    NoAnchor(&'static str),
    OutOfRange,
}

impl From<CapabilityError> for StepError {
    fn from(err: CapabilityError) -> Self {
        Self::Unavailable(err)
    }
}

fn realize(step: &ChainStep, cast: &CastContext, env: &StepEnv) -> Result<Realized, StepError> {
    let caps = env.capabilities;
    let tick = env.tick;

    match &step.descriptor {
        EffectDescriptor::Particle { kind, params } => {
            let at = anchor_location(step, cast, env)?;
            caps.render_effect(tick, &at, kind, &params.scaled(cast.power))?;
        }

        EffectDescriptor::Line {
            kind,
            params,
            spacing,
            max_distance_sq,
        } => {
            let from = step
                .offsets
                .apply(&caps.entity_location(tick, cast.caster.entity())?);
            let to = target_location(cast, env)?;
            let dist_sq = from
                .distance_squared(&to)
                .filter(|d| d <= max_distance_sq)
                .ok_or(StepError::OutOfRange)?;

            let spacing = if *spacing > 0.0 { *spacing } else { DEFAULT_LINE_SPACING };
            let dist = dist_sq.sqrt();
            let points = ((dist / spacing).ceil() as usize).saturating_sub(1);
            let dir = to.position.sub(from.position).normalize();
            let params = params.scaled(cast.power);
            for i in 1..=points {
                let at = from.translated(dir.scale(spacing * i as f64));
                caps.render_effect(tick, &at, kind, &params)?;
            }
        }

        EffectDescriptor::Sound(sound) => {
            let at = anchor_location(step, cast, env)?;
            caps.play_sound(tick, &at, sound)?;
        }

        EffectDescriptor::BlockChange(state) => {
            let at = anchor_location(step, cast, env)?;
            caps.mutate_block_state(tick, &at.world, at.block(), state)?;
        }

        EffectDescriptor::Packet(payload) => {
            let recipient = match (&step.anchor, &cast.target) {
                (Anchor::Caster, _) => cast.caster.entity(),
                (Anchor::Target, CastTarget::Entity(entity)) => *entity,
                _ => return Err(StepError::NoAnchor("packet recipient")),
            };
            caps.send_targeted_packet_effect(tick, recipient, payload)?;
        }

        EffectDescriptor::SubChain(chain) => return Ok(Realized::Enter(Arc::clone(chain))),
    }

    Ok(Realized::Done)
}

/// The step's anchor at execution time, offsets applied.
fn anchor_location(step: &ChainStep, cast: &CastContext, env: &StepEnv) -> Result<Location, StepError> {
    let base = match &step.anchor {
        Anchor::Caster => env
            .capabilities
            .entity_location(env.tick, cast.caster.entity())?,
        Anchor::Target => target_location(cast, env)?,
        Anchor::Fixed(location) => location.clone(),
    };
    Ok(step.offsets.apply(&base))
}

fn target_location(cast: &CastContext, env: &StepEnv) -> Result<Location, StepError> {
    match &cast.target {
        CastTarget::Entity(entity) => Ok(env.capabilities.entity_location(env.tick, *entity)?),
        CastTarget::Location(location) => Ok(location.clone()),
        CastTarget::None => Err(StepError::NoAnchor("target")),
    }
}

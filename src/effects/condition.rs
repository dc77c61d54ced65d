//! Step conditions.
//!
//! Conditions are plain data from configuration. The pipeline evaluates a
//! step's condition exactly once, when the step is reached. Conditions that
//! need a host read go through the capability handle; if the read is
//! unavailable the condition is false.

use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityHandle, EntityField};
use crate::core::{EntityId, ResourceKey, Tick};
use crate::pipeline::{CastContext, CastTarget};
use crate::session::CasterState;

/// Whose entity a condition reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    Caster,
    Target,
}

/// A predicate gating a step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum StepCondition {
    #[default]
    Always,
    Never,

    /// The cast has a target (entity or location).
    HasTarget,

    /// The cast targets an entity.
    TargetIsEntity,

    /// The cast's power modifier is at least this much.
    PowerAtLeast(f32),

    /// The caster's pool currently holds at least `amount`.
    ResourceAtLeast { resource: ResourceKey, amount: i64 },

    /// An internal entity field is at least `min`.
    EntityFieldAtLeast {
        subject: Subject,
        field: EntityField,
        min: f64,
    },

    /// Evaluated by the host-supplied custom evaluator.
    Custom(String),

    All(Vec<StepCondition>),
    Any(Vec<StepCondition>),
    Not(Box<StepCondition>),
}

impl StepCondition {
    /// Create a custom condition.
    pub fn custom(key: impl Into<String>) -> Self {
        Self::Custom(key.into())
    }

    /// Create an AND condition.
    pub fn all(conditions: impl IntoIterator<Item = StepCondition>) -> Self {
        Self::All(conditions.into_iter().collect())
    }

    /// Create an OR condition.
    pub fn any(conditions: impl IntoIterator<Item = StepCondition>) -> Self {
        Self::Any(conditions.into_iter().collect())
    }

    /// Negate this condition.
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// Host-supplied evaluator for [`StepCondition::Custom`] keys.
pub type CustomEvaluator<'a> = dyn Fn(&str, &CastContext) -> bool + 'a;

/// Everything a condition may look at.
pub struct ConditionContext<'a> {
    pub tick: &'a Tick,
    pub cast: &'a CastContext,
    pub caster: Option<&'a CasterState>,
    pub capabilities: &'a CapabilityHandle,
    pub eval_custom: Option<&'a CustomEvaluator<'a>>,
}

/// Evaluator for step conditions.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Check if a condition holds.
    pub fn evaluate(condition: &StepCondition, ctx: &ConditionContext) -> bool {
        match condition {
            StepCondition::Always => true,

            StepCondition::Never => false,

            StepCondition::HasTarget => !matches!(ctx.cast.target, CastTarget::None),

            StepCondition::TargetIsEntity => matches!(ctx.cast.target, CastTarget::Entity(_)),

            StepCondition::PowerAtLeast(min) => ctx.cast.power >= *min,

            StepCondition::ResourceAtLeast { resource, amount } => ctx
                .caster
                .and_then(|state| state.pool(resource))
                .is_some_and(|pool| pool.current() >= *amount),

            StepCondition::EntityFieldAtLeast {
                subject,
                field,
                min,
            } => {
                let Some(entity) = Self::subject_entity(*subject, ctx.cast) else {
                    return false;
                };
                ctx.capabilities
                    .read_entity_internal_field(ctx.tick, entity, *field)
                    .ok()
                    .and_then(|value| value.as_f64())
                    .is_some_and(|value| value >= *min)
            }

            StepCondition::Custom(key) => match ctx.eval_custom {
                Some(eval) => eval(key, ctx.cast),
                // No evaluator provided, custom conditions fail
                None => false,
            },

            StepCondition::All(conditions) => conditions.iter().all(|c| Self::evaluate(c, ctx)),

            StepCondition::Any(conditions) => conditions.iter().any(|c| Self::evaluate(c, ctx)),

            StepCondition::Not(inner) => !Self::evaluate(inner, ctx),
        }
    }

    fn subject_entity(subject: Subject, cast: &CastContext) -> Option<EntityId> {
        match subject {
            Subject::Caster => Some(cast.caster.entity()),
            Subject::Target => match cast.target {
                CastTarget::Entity(entity) => Some(entity),
                _ => None,
            },
        }
    }
}

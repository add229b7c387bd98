//! `IsChangedInstance` as a scalar function for an embedding query engine.
//!
//! The preferred surface is [`ChangedInstanceFn`], an explicit handle bound
//! to one summary. Query surfaces that resolve functions by name go through
//! a [`ScalarFunctionRegistry`]: it holds the registered summaries and
//! dispatches each call to the one named by its first argument.
//! Registrations are reference counted and released by guards.

use crate::{
    error::InternalError,
    index::ChangeIndex,
    summary::ChangeSummary,
    types::{ClassId, InstanceId},
    value::ChangeValue,
};
use std::{cell::RefCell, collections::BTreeMap};

pub const IS_CHANGED_INSTANCE: &str = "IsChangedInstance";

///
/// ChangedInstancePredicate
///
/// Anything that can answer the point predicate, identified by a
/// process-unique summary id.
///

pub trait ChangedInstancePredicate {
    fn summary_id(&self) -> u64;

    fn is_changed_instance(
        &self,
        class_id: ClassId,
        instance_id: InstanceId,
    ) -> Result<bool, InternalError>;
}

impl<I: ChangeIndex> ChangedInstancePredicate for ChangeSummary<'_, I> {
    fn summary_id(&self) -> u64 {
        self.id()
    }

    fn is_changed_instance(
        &self,
        class_id: ClassId,
        instance_id: InstanceId,
    ) -> Result<bool, InternalError> {
        Self::is_changed_instance(self, class_id, instance_id)
    }
}

///
/// ChangedInstanceFn
///
/// `IsChangedInstance(summary, class id, instance id)` bound to one summary.
///

#[derive(Clone, Copy)]
pub struct ChangedInstanceFn<'s> {
    summary: &'s dyn ChangedInstancePredicate,
}

impl<'s> ChangedInstanceFn<'s> {
    #[must_use]
    pub const fn new(summary: &'s dyn ChangedInstancePredicate) -> Self {
        Self { summary }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        IS_CHANGED_INSTANCE
    }

    /// Typed evaluation.
    pub fn evaluate(&self, class_id: ClassId, instance_id: InstanceId) -> Result<bool, InternalError> {
        self.summary.is_changed_instance(class_id, instance_id)
    }

    /// Evaluate from raw scalar arguments.
    ///
    /// The first argument must be the id of the summary this handle is
    /// bound to.
    pub fn call(&self, args: &[ChangeValue]) -> Result<bool, InternalError> {
        let call = ChangedInstanceCall::parse(args)?;
        if call.summary_id != self.summary.summary_id() {
            return Err(InternalError::summary_invariant(format!(
                "{IS_CHANGED_INSTANCE} bound to summary {} was called for summary {}",
                self.summary.summary_id(),
                call.summary_id
            )));
        }

        self.evaluate(call.class_id, call.instance_id)
    }

    /// Make the bound summary answer by name through `registry` for the
    /// lifetime of the guard.
    pub fn register<'r>(
        &self,
        registry: &'r ScalarFunctionRegistry<'s>,
    ) -> RegistrationGuard<'r, 's> {
        registry.register(self.summary)
    }
}

///
/// ChangedInstanceCall
///
/// Validated arguments of one `IsChangedInstance` call.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct ChangedInstanceCall {
    summary_id: u64,
    class_id: ClassId,
    instance_id: InstanceId,
}

impl ChangedInstanceCall {
    /// Exactly three non-null, non-negative integer ids are accepted.
    fn parse(args: &[ChangeValue]) -> Result<Self, InternalError> {
        let [summary, class_id, instance_id] = args else {
            return Err(InternalError::summary_unsupported(format!(
                "{IS_CHANGED_INSTANCE} expects 3 arguments, got {}",
                args.len()
            )));
        };

        Ok(Self {
            summary_id: id_argument(summary, 1)?,
            class_id: ClassId::new(id_argument(class_id, 2)?),
            instance_id: InstanceId::new(id_argument(instance_id, 3)?),
        })
    }
}

fn id_argument(value: &ChangeValue, position: usize) -> Result<u64, InternalError> {
    match value {
        ChangeValue::Null => Err(InternalError::summary_unsupported(format!(
            "{IS_CHANGED_INSTANCE}: argument {position} must not be NULL"
        ))),
        ChangeValue::Integer(raw) => u64::try_from(*raw).map_err(|_| {
            InternalError::summary_unsupported(format!(
                "{IS_CHANGED_INSTANCE}: argument {position} must not be negative"
            ))
        }),
        ChangeValue::ClassId(id) => Ok(id.get()),
        ChangeValue::InstanceId(id) => Ok(id.get()),
        other => Err(InternalError::summary_unsupported(format!(
            "{IS_CHANGED_INSTANCE}: argument {position} must be an integer id, got {}",
            other.type_name()
        ))),
    }
}

///
/// ScalarFunctionRegistry
///
/// Function names and the summaries they can be evaluated against, each
/// with a count of live registrations.
///

#[derive(Default)]
pub struct ScalarFunctionRegistry<'s> {
    state: RefCell<Registrations<'s>>,
}

#[derive(Default)]
struct Registrations<'s> {
    names: BTreeMap<&'static str, usize>,
    summaries: BTreeMap<u64, (&'s dyn ChangedInstancePredicate, usize)>,
}

impl<'s> ScalarFunctionRegistry<'s> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one registration of `IsChangedInstance` for `summary`; it is
    /// released when the guard drops.
    pub fn register(&self, summary: &'s dyn ChangedInstancePredicate) -> RegistrationGuard<'_, 's> {
        let summary_id = summary.summary_id();
        let mut state = self.state.borrow_mut();

        *state.names.entry(IS_CHANGED_INSTANCE).or_default() += 1;
        state.summaries.entry(summary_id).or_insert((summary, 0)).1 += 1;

        RegistrationGuard {
            registry: self,
            name: IS_CHANGED_INSTANCE,
            summary_id,
        }
    }

    /// Evaluate the function `name` from raw scalar arguments, dispatching
    /// to the summary named by the first argument.
    pub fn call(&self, name: &str, args: &[ChangeValue]) -> Result<bool, InternalError> {
        if name != IS_CHANGED_INSTANCE || !self.is_registered(name) {
            return Err(InternalError::summary_not_found(format!(
                "scalar function '{name}' is not registered"
            )));
        }

        let call = ChangedInstanceCall::parse(args)?;
        let summary = self
            .state
            .borrow()
            .summaries
            .get(&call.summary_id)
            .map(|(summary, _)| *summary)
            .ok_or_else(|| {
                InternalError::summary_not_found(format!(
                    "{name}: no change summary {} is registered",
                    call.summary_id
                ))
            })?;

        summary.is_changed_instance(call.class_id, call.instance_id)
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.ref_count(name) > 0
    }

    #[must_use]
    pub fn ref_count(&self, name: &str) -> usize {
        self.state.borrow().names.get(name).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn is_summary_registered(&self, summary_id: u64) -> bool {
        self.state.borrow().summaries.contains_key(&summary_id)
    }

    fn release(&self, name: &'static str, summary_id: u64) {
        let mut state = self.state.borrow_mut();

        if let Some(count) = state.names.get_mut(name) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.names.remove(name);
            }
        }
        if let Some((_, count)) = state.summaries.get_mut(&summary_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.summaries.remove(&summary_id);
            }
        }
    }
}

///
/// RegistrationGuard
///

#[must_use = "the registration is released when the guard is dropped"]
pub struct RegistrationGuard<'r, 's> {
    registry: &'r ScalarFunctionRegistry<'s>,
    name: &'static str,
    summary_id: u64,
}

impl RegistrationGuard<'_, '_> {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn summary_id(&self) -> u64 {
        self.summary_id
    }
}

impl Drop for RegistrationGuard<'_, '_> {
    fn drop(&mut self) {
        self.registry.release(self.name, self.summary_id);
    }
}

// ============================================================================
// piglet - Reason
// Immutable causal records passed to mount and update hooks
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::types::{AttributeChange, StateChange};

/// What kind of event triggered a hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReasonName {
    /// The element was inserted into the live tree
    Connected,
    /// Explicit mount
    Mount,
    /// Mount propagated from the parent
    ParentMount,
    /// A batch of attribute mutations
    AttributeChange,
    /// A batch of state-cell notifications
    StateChange,
    /// An update propagated from the parent
    ParentUpdate,
    /// Hot reload of the component's module
    Reload,
}

impl ReasonName {
    pub fn as_str(self) -> &'static str {
        match self {
            ReasonName::Connected => "connected",
            ReasonName::Mount => "mount",
            ReasonName::ParentMount => "parentMount",
            ReasonName::AttributeChange => "attributeChange",
            ReasonName::StateChange => "stateChange",
            ReasonName::ParentUpdate => "parentUpdate",
            ReasonName::Reload => "reload",
        }
    }
}

impl fmt::Display for ReasonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch carried by an update reason.
#[derive(Clone, Debug, Default)]
pub enum ReasonData {
    #[default]
    None,
    Attributes(Vec<AttributeChange>),
    State(Vec<StateChange>),
}

/// Why a hook ran. Propagated reasons keep the reason that caused them.
#[derive(Clone, Debug)]
pub struct Reason {
    name: ReasonName,
    data: ReasonData,
    original: Option<Rc<Reason>>,
}

impl Reason {
    pub fn new(name: ReasonName) -> Self {
        Self {
            name,
            data: ReasonData::None,
            original: None,
        }
    }

    pub fn connected() -> Self {
        Self::new(ReasonName::Connected)
    }

    pub fn mount() -> Self {
        Self::new(ReasonName::Mount)
    }

    pub fn reload() -> Self {
        Self::new(ReasonName::Reload)
    }

    pub fn attribute_change(changes: Vec<AttributeChange>) -> Self {
        Self {
            name: ReasonName::AttributeChange,
            data: ReasonData::Attributes(changes),
            original: None,
        }
    }

    pub fn state_change(changes: Vec<StateChange>) -> Self {
        Self {
            name: ReasonName::StateChange,
            data: ReasonData::State(changes),
            original: None,
        }
    }

    /// A reason of kind `name` caused by `cause`.
    pub fn caused(name: ReasonName, cause: &Reason) -> Self {
        Self {
            name,
            data: ReasonData::None,
            original: Some(Rc::new(cause.clone())),
        }
    }

    pub fn name(&self) -> ReasonName {
        self.name
    }

    pub fn data(&self) -> &ReasonData {
        &self.data
    }

    pub fn original(&self) -> Option<&Reason> {
        self.original.as_deref()
    }

    /// The first reason in the causal chain.
    pub fn origin(&self) -> &Reason {
        let mut current = self;
        while let Some(next) = current.original() {
            current = next;
        }
        current
    }

    /// Names along the causal chain, newest first.
    pub fn chain(&self) -> Vec<ReasonName> {
        let mut names = vec![self.name];
        let mut current = self;
        while let Some(next) = current.original() {
            names.push(next.name);
            current = next;
        }
        names
    }

    pub fn attribute_changes(&self) -> &[AttributeChange] {
        match &self.data {
            ReasonData::Attributes(changes) => changes,
            _ => &[],
        }
    }

    pub fn state_changes(&self) -> &[StateChange] {
        match &self.data {
            ReasonData::State(changes) => changes,
            _ => &[],
        }
    }

    /// Number of change records carried directly by this reason.
    pub fn len(&self) -> usize {
        self.attribute_changes().len() + self.state_changes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.chain().into_iter().map(ReasonName::as_str).collect();
        f.write_str(&names.join(" <- "))
    }
}

use super::ComponentState;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle state of each named component. Clones share the same table, so
/// the viewer's health report sees the transitions the app makes.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    states: Arc<RwLock<BTreeMap<String, ComponentState>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a component as stopped unless it is already known
    pub fn register(&self, component: &str) {
        self.states
            .write()
            .entry(component.to_string())
            .or_insert(ComponentState::Stopped);
    }

    /// Record a transition, returning the previous state
    pub fn set(&self, component: &str, state: ComponentState) -> Option<ComponentState> {
        let previous = self.states.write().insert(component.to_string(), state);
        if previous != Some(state) {
            debug!(
                "Component '{}' state changed: {:?} -> {:?}",
                component, previous, state
            );
        }
        previous
    }

    pub fn get(&self, component: &str) -> Option<ComponentState> {
        self.states.read().get(component).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<String, ComponentState> {
        self.states.read().clone()
    }

    pub fn any_failed(&self) -> bool {
        self.states
            .read()
            .values()
            .any(|state| *state == ComponentState::Failed)
    }
}

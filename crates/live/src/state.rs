use serde_json::{Map, Value};
use turnweave_core::{CanonicalEvent, EventKind};

/// Fold state changes in arrival order.
///
/// Deltas overwrite key by key; an object snapshot replaces everything
/// accumulated so far. `None` until the first state change is seen.
pub fn fold_state<'a>(
    events: impl IntoIterator<Item = &'a CanonicalEvent>,
) -> Option<Map<String, Value>> {
    let mut state: Option<Map<String, Value>> = None;
    for event in events {
        match &event.kind {
            EventKind::StateDelta { delta } => {
                let current = state.get_or_insert_with(Map::new);
                for (key, value) in delta {
                    current.insert(key.clone(), value.clone());
                }
            }
            EventKind::StateSnapshot { snapshot } => match snapshot {
                Value::Object(map) => state = Some(map.clone()),
                _ => tracing::trace!("ignoring non-object state snapshot"),
            },
            _ => {}
        }
    }
    state
}

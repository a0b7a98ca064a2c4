use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::EventId;
use super::lifecycle::LifecycleState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("event {0} is not part of the working set")]
    UnknownEvent(EventId),
    #[error("linking {event} under {parent} would create a cycle")]
    Cycle { event: EventId, parent: EventId },
}

#[derive(Debug, Clone)]
struct Node {
    event_id: EventId,
    event_date: NaiveDate,
    state: LifecycleState,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// One vacancy in a chain listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainEntry {
    pub event_id: EventId,
    pub event_date: NaiveDate,
    pub state: LifecycleState,
    pub parent_event_id: Option<EventId>,
    /// 0 for the root.
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainView {
    pub root: EventId,
    /// Root first, then every descendant by event date.
    pub entries: Vec<ChainEntry>,
}

/// Arena of vacancy events linked by the vacancy each one backfilled.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionForest {
    nodes: Vec<Node>,
    index: HashMap<EventId, usize>,
}

impl SubstitutionForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a forest from stored links. Links that point at unknown events
    /// or would close a cycle are skipped and logged.
    pub fn from_links(
        events: impl IntoIterator<Item = (EventId, NaiveDate, LifecycleState)>,
        links: impl IntoIterator<Item = (EventId, EventId)>,
    ) -> Self {
        let mut forest = Self::new();
        for (event_id, event_date, state) in events {
            forest.insert(event_id, event_date, state);
        }
        for (event, parent) in links {
            if let Err(error) = forest.set_parent(event, Some(parent)) {
                tracing::warn!(%event, %parent, %error, "skipping stored parent link");
            }
        }
        forest
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, event: EventId) -> bool {
        self.index.contains_key(&event)
    }

    /// Adds an event, or refreshes the date and state of a known one.
    pub fn insert(&mut self, event_id: EventId, event_date: NaiveDate, state: LifecycleState) {
        if let Some(&slot) = self.index.get(&event_id) {
            let node = &mut self.nodes[slot];
            node.event_date = event_date;
            node.state = state;
            return;
        }
        self.index.insert(event_id, self.nodes.len());
        self.nodes.push(Node {
            event_id,
            event_date,
            state,
            parent: None,
            children: Vec::new(),
        });
    }

    fn slot(&self, event: EventId) -> Result<usize, ChainError> {
        self.index
            .get(&event)
            .copied()
            .ok_or(ChainError::UnknownEvent(event))
    }

    pub fn parent_of(&self, event: EventId) -> Option<EventId> {
        let slot = self.index.get(&event)?;
        self.nodes[*slot]
            .parent
            .map(|parent| self.nodes[parent].event_id)
    }

    /// Ancestors of `event`, nearest first. Never walks more steps than there
    /// are nodes.
    pub fn ancestors(&self, event: EventId) -> Result<Vec<EventId>, ChainError> {
        let mut current = self.nodes[self.slot(event)?].parent;
        let mut walked = Vec::new();
        while let Some(slot) = current {
            if walked.len() >= self.nodes.len() {
                break;
            }
            walked.push(self.nodes[slot].event_id);
            current = self.nodes[slot].parent;
        }
        Ok(walked)
    }

    /// Links `event` under `parent`, or detaches it when `parent` is `None`.
    /// The forest is untouched when an error is returned.
    pub fn set_parent(&mut self, event: EventId, parent: Option<EventId>) -> Result<(), ChainError> {
        let child = self.slot(event)?;
        let Some(parent) = parent else {
            self.detach(child);
            return Ok(());
        };
        let parent_slot = self.slot(parent)?;

        if parent == event || self.ancestors(parent)?.contains(&event) {
            return Err(ChainError::Cycle { event, parent });
        }
        if self.nodes[child].parent == Some(parent_slot) {
            return Ok(());
        }

        self.detach(child);
        self.nodes[child].parent = Some(parent_slot);
        self.nodes[parent_slot].children.push(child);
        Ok(())
    }

    fn detach(&mut self, child: usize) {
        if let Some(previous) = self.nodes[child].parent.take() {
            self.nodes[previous].children.retain(|slot| *slot != child);
        }
    }

    fn entry(&self, slot: usize, depth: usize) -> ChainEntry {
        let node = &self.nodes[slot];
        ChainEntry {
            event_id: node.event_id,
            event_date: node.event_date,
            state: node.state,
            parent_event_id: node.parent.map(|parent| self.nodes[parent].event_id),
            depth,
        }
    }

    pub fn chain(&self, root: EventId) -> Result<ChainView, ChainError> {
        let root_slot = self.slot(root)?;

        let mut descendants = Vec::new();
        let mut stack: Vec<(usize, usize)> = self.nodes[root_slot]
            .children
            .iter()
            .map(|child| (*child, 1))
            .collect();
        while let Some((slot, depth)) = stack.pop() {
            if descendants.len() >= self.nodes.len() {
                break;
            }
            descendants.push(self.entry(slot, depth));
            stack.extend(self.nodes[slot].children.iter().map(|child| (*child, depth + 1)));
        }
        descendants.sort_by(|left, right| {
            left.event_date
                .cmp(&right.event_date)
                .then_with(|| left.event_id.cmp(&right.event_id))
        });

        let mut entries = Vec::with_capacity(descendants.len() + 1);
        entries.push(self.entry(root_slot, 0));
        entries.extend(descendants);
        Ok(ChainView { root, entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).expect("valid date")
    }

    fn forest() -> SubstitutionForest {
        SubstitutionForest::from_links(
            [
                (EventId(1), date(1), LifecycleState::Filled),
                (EventId(2), date(9), LifecycleState::Filled),
                (EventId(3), date(5), LifecycleState::Open),
                (EventId(4), date(12), LifecycleState::PendingResponse),
            ],
            [(EventId(2), EventId(1)), (EventId(3), EventId(1)), (EventId(4), EventId(2))],
        )
    }

    #[test]
    fn chain_lists_descendants_by_date() {
        let view = forest().chain(EventId(1)).expect("root exists");
        let order: Vec<i64> = view.entries.iter().map(|entry| entry.event_id.0).collect();
        assert_eq!(order, vec![1, 3, 2, 4]);
        assert_eq!(view.entries[3].depth, 2);
        assert_eq!(view.entries[1].state, LifecycleState::Open);
    }

    #[test]
    fn cycle_is_rejected_and_forest_unchanged() {
        let mut forest = forest();
        let before = forest.chain(EventId(1)).expect("root exists");

        let error = forest
            .set_parent(EventId(1), Some(EventId(4)))
            .expect_err("cycle rejected");
        assert_eq!(
            error,
            ChainError::Cycle {
                event: EventId(1),
                parent: EventId(4)
            }
        );
        assert_eq!(forest.chain(EventId(1)).expect("root exists"), before);
        assert!(forest.set_parent(EventId(2), Some(EventId(2))).is_err());
    }

    #[test]
    fn relinking_same_parent_does_not_duplicate() {
        let mut forest = forest();
        forest
            .set_parent(EventId(3), Some(EventId(1)))
            .expect("same parent is a no-op");
        let view = forest.chain(EventId(1)).expect("root exists");
        assert_eq!(view.entries.len(), 4);
    }

    #[test]
    fn moving_and_detaching_children() {
        let mut forest = forest();
        forest
            .set_parent(EventId(4), Some(EventId(3)))
            .expect("re-parent accepted");
        assert_eq!(forest.parent_of(EventId(4)), Some(EventId(3)));
        forest.set_parent(EventId(3), None).expect("detach accepted");

        let view = forest.chain(EventId(1)).expect("root exists");
        let order: Vec<i64> = view.entries.iter().map(|entry| entry.event_id.0).collect();
        assert_eq!(order, vec![1, 2]);
        assert_eq!(
            forest.set_parent(EventId(99), None),
            Err(ChainError::UnknownEvent(EventId(99)))
        );
    }
}

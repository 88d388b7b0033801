//! In-memory card surface.
//!
//! [`SurfaceLog`] implements [`CardSurface`] by recording every call as a
//! [`SurfaceEvent`] and keeping the resulting per-card view state (current
//! source, loading flag, dot row). The `simulate` command prints it; tests
//! assert on it.

use crate::carousel::{Assignment, CardId, CardSurface};
use crate::variant::ImageSource;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SurfaceEvent {
    Loading {
        card: CardId,
        loading: bool,
    },
    Source {
        card: CardId,
        assignment: Assignment,
        source: ImageSource,
    },
    Dots {
        card: CardId,
        count: usize,
        active: usize,
    },
    ActiveDot {
        card: CardId,
        active: usize,
    },
}

/// View state of one card as the surface last left it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardView {
    pub source: Option<ImageSource>,
    pub loading: bool,
    /// One flag per dot; `None` until the dot row exists.
    pub dots: Option<Vec<bool>>,
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceLog {
    events: Vec<SurfaceEvent>,
    views: BTreeMap<CardId, CardView>,
}

impl SurfaceLog {
    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    pub fn view(&self, card: &str) -> Option<&CardView> {
        self.views.get(&CardId::from(card))
    }

    pub fn last_source(&self, card: &str) -> Option<&ImageSource> {
        self.view(card)?.source.as_ref()
    }

    pub fn dot_count(&self, card: &str) -> Option<usize> {
        self.view(card)?.dots.as_ref().map(Vec::len)
    }

    /// Index of the active dot, if exactly one dot is active.
    pub fn active_dot(&self, card: &str) -> Option<usize> {
        let dots = self.view(card)?.dots.as_ref()?;
        let mut active = dots.iter().enumerate().filter(|(_, on)| **on);
        match (active.next(), active.next()) {
            (Some((i, _)), None) => Some(i),
            _ => None,
        }
    }

    fn view_mut(&mut self, card: &CardId) -> &mut CardView {
        self.views.entry(card.clone()).or_default()
    }
}

impl CardSurface for SurfaceLog {
    fn set_loading(&mut self, card: &CardId, loading: bool) {
        self.view_mut(card).loading = loading;
        self.events.push(SurfaceEvent::Loading {
            card: card.clone(),
            loading,
        });
    }

    fn set_source(&mut self, card: &CardId, assignment: Assignment, source: &ImageSource) {
        self.view_mut(card).source = Some(source.clone());
        self.events.push(SurfaceEvent::Source {
            card: card.clone(),
            assignment,
            source: source.clone(),
        });
    }

    fn ensure_dots(&mut self, card: &CardId, count: usize, active: usize) {
        let view = self.view_mut(card);
        if view.dots.is_some() {
            return;
        }
        view.dots = Some((0..count).map(|i| i == active).collect());
        self.events.push(SurfaceEvent::Dots {
            card: card.clone(),
            count,
            active,
        });
    }

    fn set_active_dot(&mut self, card: &CardId, active: usize) {
        if let Some(dots) = self.view_mut(card).dots.as_mut() {
            for (i, dot) in dots.iter_mut().enumerate() {
                *dot = i == active;
            }
        }
        self.events.push(SurfaceEvent::ActiveDot {
            card: card.clone(),
            active,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> CardId {
        CardId::from("card-1")
    }

    #[test]
    fn ensure_dots_is_idempotent() {
        let mut log = SurfaceLog::default();
        log.ensure_dots(&id(), 3, 0);
        log.ensure_dots(&id(), 3, 0);
        assert_eq!(log.dot_count("card-1"), Some(3));
        assert_eq!(log.events().len(), 1);
    }

    #[test]
    fn set_active_dot_leaves_exactly_one_active() {
        let mut log = SurfaceLog::default();
        log.ensure_dots(&id(), 4, 0);
        for active in [1, 3, 3, 0] {
            log.set_active_dot(&id(), active);
            assert_eq!(log.active_dot("card-1"), Some(active));
        }
    }

    #[test]
    fn unknown_card_has_no_view() {
        let log = SurfaceLog::default();
        assert_eq!(log.view("nope"), None);
        assert_eq!(log.active_dot("nope"), None);
    }

    #[test]
    fn events_serialize_with_tag() {
        let mut log = SurfaceLog::default();
        log.set_loading(&id(), true);
        let json = serde_json::to_string(log.events()).unwrap();
        assert_eq!(json, r#"[{"event":"loading","card":"card-1","loading":true}]"#);
    }
}

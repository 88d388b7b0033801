//! Per-card image carousel.
//!
//! Each product card holds an ordered list of base image URLs and shows one
//! of them at a time. Clicking the image area advances to the next image:
//!
//! ```text
//! images = [A, B, C], index 0
//!   cycle → index 1: loading on, show sized(B), dot 1 active, prefetch C
//!   cycle → index 2: loading on, show sized(C), dot 2 active, prefetch A
//!   cycle → index 0: ...
//! ```
//!
//! The [`Card`] record is the source of truth; what the user sees is driven
//! through the [`CardSurface`] trait. The surface reports back when the image
//! it was given finished loading (or failed), which clears the loading flag
//! via [`Card::settle`].
//!
//! Cards with fewer than two images never cycle and never get dots.

use crate::prefetch::{PrefetchOutcome, PrefetchScheduler};
use crate::variant::{ImageSource, VariantSettings, strip_size_params};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable card identifier, `card-<8 hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CardId(String);

impl CardId {
    /// Derive an identifier from a product title and its base images, so the
    /// same product keeps its id when the catalog is reordered.
    pub fn derive(title: &str, images: &[String]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        for image in images {
            hasher.update(b"\0");
            hasher.update(image.as_bytes());
        }
        let digest = format!("{:x}", hasher.finalize());
        Self(format!("card-{}", &digest[..8]))
    }

    /// Same id with a numeric suffix, used when two cards derive the same id.
    pub fn with_suffix(&self, n: usize) -> Self {
        Self(format!("{}-{}", self.0, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifies one source assignment on a card's image surface. Load
/// notifications carry it back so stale ones can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Assignment(pub u64);

/// How an image surface assignment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded,
    Failed,
}

/// The rendering side of a card: image element, loading state, dot row.
pub trait CardSurface {
    /// Toggle the loading indicator on the card's image area.
    fn set_loading(&mut self, card: &CardId, loading: bool);

    /// Point the card's image at a new source. The surface must eventually
    /// report exactly one load or error for this assignment.
    fn set_source(&mut self, card: &CardId, assignment: Assignment, source: &ImageSource);

    /// Create the dot row with `count` dots, `active` highlighted.
    fn ensure_dots(&mut self, card: &CardId, count: usize, active: usize);

    /// Highlight dot `active` and clear every other one.
    fn set_active_dot(&mut self, card: &CardId, active: usize);
}

/// Everything a single `cycle` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleStep {
    pub index: usize,
    pub assignment: Option<Assignment>,
    pub lookahead: Option<(usize, PrefetchOutcome)>,
}

/// Carousel state for one product card.
#[derive(Debug, Clone)]
pub struct Card {
    id: CardId,
    images: Vec<String>,
    current_index: usize,
    dots_rendered: bool,
    loading: bool,
    assignments: u64,
    pending: Option<Assignment>,
}

impl Card {
    /// Build a card from raw image URLs and a previously stored index.
    ///
    /// URLs are normalized; ones that normalize to nothing are dropped.
    /// `stored_index` refers to a position in `images` as given and is
    /// translated to the surviving list. An index that is out of range or
    /// names a dropped entry falls back to 0.
    pub fn new<I, S>(id: CardId, images: I, stored_index: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept = Vec::new();
        let mut current_index = 0;
        for (position, url) in images.into_iter().enumerate() {
            let base = strip_size_params(url.as_ref());
            if base.is_empty() {
                continue;
            }
            if position == stored_index {
                current_index = kept.len();
            }
            kept.push(base);
        }
        let images = kept;
        Self {
            id,
            images,
            current_index,
            dots_rendered: false,
            loading: false,
            assignments: 0,
            pending: None,
        }
    }

    pub fn id(&self) -> &CardId {
        &self.id
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_image(&self) -> Option<&str> {
        self.images.get(self.current_index).map(String::as_str)
    }

    pub fn dots_rendered(&self) -> bool {
        self.dots_rendered
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Images other than the one currently shown, in order.
    pub fn hidden_images(&self) -> impl Iterator<Item = &str> {
        self.images
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != self.current_index)
            .map(|(_, u)| u.as_str())
    }

    /// Create the dot row once. Skipped for cards with fewer than two images;
    /// repeated calls do nothing. Returns whether dots were created.
    pub fn add_image_dots(&mut self, surface: &mut impl CardSurface) -> bool {
        if self.images.len() < 2 || self.dots_rendered {
            return false;
        }
        surface.ensure_dots(&self.id, self.images.len(), self.current_index);
        self.dots_rendered = true;
        true
    }

    /// Apply the current image to the surface without touching the index.
    pub fn show_current(
        &mut self,
        surface: &mut impl CardSurface,
        variants: &VariantSettings,
    ) -> Option<Assignment> {
        let source = ImageSource::for_base(self.current_image()?, variants)?;
        let assignment = self.next_assignment();
        surface.set_source(&self.id, assignment, &source);
        Some(assignment)
    }

    /// Advance to the next image, wrapping around.
    ///
    /// Returns `None`, with no side effects, for cards with fewer than two
    /// images.
    pub fn cycle(
        &mut self,
        surface: &mut impl CardSurface,
        scheduler: &mut PrefetchScheduler,
        variants: &VariantSettings,
    ) -> Option<CycleStep> {
        let count = self.images.len();
        if count < 2 {
            return None;
        }
        let next = (self.current_index + 1) % count;
        self.current_index = next;

        self.loading = true;
        surface.set_loading(&self.id, true);

        let assignment = self.show_current(surface, variants);

        if self.dots_rendered {
            surface.set_active_dot(&self.id, next);
        }

        let after = (next + 1) % count;
        let lookahead = self
            .images
            .get(after)
            .map(|url| (after, scheduler.schedule(url)));

        tracing::trace!(card = %self.id, index = next, "carousel cycled");
        Some(CycleStep {
            index: next,
            assignment,
            lookahead,
        })
    }

    /// Consume a load/error notification for `assignment`. Clears the
    /// loading flag if it belongs to the latest assignment; stale or repeated
    /// notifications are ignored. Returns whether the flag was cleared.
    pub fn settle(
        &mut self,
        surface: &mut impl CardSurface,
        assignment: Assignment,
        outcome: LoadOutcome,
    ) -> bool {
        if self.pending != Some(assignment) {
            tracing::trace!(card = %self.id, ?assignment, "stale image notification");
            return false;
        }
        self.pending = None;
        if outcome == LoadOutcome::Failed {
            tracing::debug!(card = %self.id, ?assignment, "card image failed to load");
        }
        if !self.loading {
            return false;
        }
        self.loading = false;
        surface.set_loading(&self.id, false);
        true
    }

    fn next_assignment(&mut self) -> Assignment {
        self.assignments += 1;
        let assignment = Assignment(self.assignments);
        self.pending = Some(assignment);
        assignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::prefetch::{HostCapabilities, ProbeJournal};
    use crate::runtime::EventLoop;
    use crate::surface::{SurfaceEvent, SurfaceLog};
    use std::rc::Rc;

    struct Rig {
        host: EventLoop,
        journal: Rc<ProbeJournal>,
        scheduler: PrefetchScheduler,
        surface: SurfaceLog,
        variants: VariantSettings,
    }

    fn rig() -> Rig {
        let host = EventLoop::new();
        let journal = Rc::new(ProbeJournal::new());
        let scheduler = PrefetchScheduler::for_host(
            &host,
            HostCapabilities::default(),
            journal.clone(),
            &GridConfig::default(),
        );
        Rig {
            host,
            journal,
            scheduler,
            surface: SurfaceLog::default(),
            variants: VariantSettings::default(),
        }
    }

    fn abc() -> Card {
        Card::new(
            CardId::from("card-abc"),
            ["https://x/a?w=600&h=600", "https://x/b", "https://x/c?q=1"],
            0,
        )
    }

    #[test]
    fn new_normalizes_and_drops_empty_urls() {
        let card = Card::new(CardId::from("c"), ["https://x/a?w=1", "", "?h=2"], 0);
        assert_eq!(card.images(), ["https://x/a"]);
    }

    #[test]
    fn stored_index_counts_dropped_entries() {
        let card = Card::new(CardId::from("c"), ["", "https://x/a", "https://x/b"], 1);
        assert_eq!(card.images(), ["https://x/a", "https://x/b"]);
        assert_eq!(card.current_image(), Some("https://x/a"));

        let card = Card::new(CardId::from("c"), ["https://x/a", "?w=5", "https://x/b"], 2);
        assert_eq!(card.current_index(), 1);

        let card = Card::new(CardId::from("c"), ["https://x/a", "", "https://x/b"], 1);
        assert_eq!(card.current_index(), 0);
    }

    #[test]
    fn stored_index_out_of_range_falls_back_to_zero() {
        let card = Card::new(CardId::from("c"), ["a", "b"], 5);
        assert_eq!(card.current_index(), 0);
        let card = Card::new(CardId::from("c"), ["a", "b"], 1);
        assert_eq!(card.current_index(), 1);
    }

    #[test]
    fn three_cycles_walk_and_wrap() {
        let mut r = rig();
        let mut card = abc();
        card.add_image_dots(&mut r.surface);

        let step = card.cycle(&mut r.surface, &mut r.scheduler, &r.variants).unwrap();
        assert_eq!(step.index, 1);
        assert_eq!(step.lookahead, Some((2, PrefetchOutcome::Scheduled)));
        assert_eq!(r.surface.last_source("card-abc").unwrap().src, "https://x/b?w=320&h=320");
        assert_eq!(r.surface.active_dot("card-abc"), Some(1));
        assert!(r.scheduler.cache().contains("https://x/c?q=1"));

        let step = card.cycle(&mut r.surface, &mut r.scheduler, &r.variants).unwrap();
        assert_eq!(step.index, 2);
        assert_eq!(step.lookahead, Some((0, PrefetchOutcome::Scheduled)));
        assert_eq!(
            r.surface.last_source("card-abc").unwrap().src,
            "https://x/c?q=1&w=320&h=320"
        );
        assert_eq!(r.surface.active_dot("card-abc"), Some(2));
        assert!(r.scheduler.cache().contains("https://x/a"));

        let step = card.cycle(&mut r.surface, &mut r.scheduler, &r.variants).unwrap();
        assert_eq!(step.index, 0);
        assert_eq!(step.lookahead, Some((1, PrefetchOutcome::Scheduled)));
        assert_eq!(card.current_index(), 0);
        assert_eq!(r.surface.active_dot("card-abc"), Some(0));

        r.host.run_to_completion();
        assert_eq!(r.journal.count(), 3);
    }

    #[test]
    fn cycle_emits_loading_before_source() {
        let mut r = rig();
        let mut card = abc();
        card.cycle(&mut r.surface, &mut r.scheduler, &r.variants);
        assert!(card.is_loading());
        assert!(matches!(
            r.surface.events(),
            [
                SurfaceEvent::Loading { loading: true, .. },
                SurfaceEvent::Source { .. }
            ]
        ));
    }

    #[test]
    fn single_and_empty_cards_do_not_cycle() {
        let mut r = rig();
        for mut card in [
            Card::new(CardId::from("one"), ["https://x/a"], 0),
            Card::new(CardId::from("none"), Vec::<String>::new(), 0),
        ] {
            assert_eq!(card.cycle(&mut r.surface, &mut r.scheduler, &r.variants), None);
            assert_eq!(card.current_index(), 0);
            assert!(!card.is_loading());
        }
        assert!(r.surface.events().is_empty());
        assert!(r.scheduler.cache().is_empty());
    }

    #[test]
    fn dots_created_once() {
        let mut r = rig();
        let mut card = abc();
        assert!(card.add_image_dots(&mut r.surface));
        assert!(!card.add_image_dots(&mut r.surface));
        assert_eq!(r.surface.dot_count("card-abc"), Some(3));
        assert_eq!(r.surface.events().len(), 1);
        assert!(card.dots_rendered());
    }

    #[test]
    fn dots_skipped_for_single_image() {
        let mut r = rig();
        let mut card = Card::new(CardId::from("one"), ["https://x/a"], 0);
        assert!(!card.add_image_dots(&mut r.surface));
        assert!(!card.dots_rendered());
        assert_eq!(r.surface.dot_count("one"), None);
    }

    #[test]
    fn dots_start_at_stored_index() {
        let mut r = rig();
        let mut card = Card::new(CardId::from("c"), ["a", "b", "c"], 2);
        card.add_image_dots(&mut r.surface);
        assert_eq!(r.surface.active_dot("c"), Some(2));
    }

    #[test]
    fn settle_clears_loading_once() {
        let mut r = rig();
        let mut card = abc();
        let step = card.cycle(&mut r.surface, &mut r.scheduler, &r.variants).unwrap();
        let assignment = step.assignment.unwrap();

        assert!(card.settle(&mut r.surface, assignment, LoadOutcome::Loaded));
        assert!(!card.is_loading());
        assert!(!card.settle(&mut r.surface, assignment, LoadOutcome::Loaded));
    }

    #[test]
    fn stale_notification_is_ignored() {
        let mut r = rig();
        let mut card = abc();
        let first = card
            .cycle(&mut r.surface, &mut r.scheduler, &r.variants)
            .and_then(|s| s.assignment)
            .unwrap();
        let second = card
            .cycle(&mut r.surface, &mut r.scheduler, &r.variants)
            .and_then(|s| s.assignment)
            .unwrap();

        assert!(!card.settle(&mut r.surface, first, LoadOutcome::Loaded));
        assert!(card.is_loading());
        assert!(card.settle(&mut r.surface, second, LoadOutcome::Failed));
        assert!(!card.is_loading());
    }

    #[test]
    fn hidden_images_skip_current() {
        let card = Card::new(CardId::from("c"), ["a", "b", "c"], 1);
        assert_eq!(card.hidden_images().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn card_id_is_stable_and_content_addressed() {
        let images = vec!["https://x/a".to_string()];
        let a = CardId::derive("Watch", &images);
        assert_eq!(a, CardId::derive("Watch", &images));
        assert_ne!(a, CardId::derive("Headphones", &images));
        assert!(a.as_str().starts_with("card-"));
        assert_eq!(a.as_str().len(), "card-".len() + 8);
        assert_eq!(a.with_suffix(2).as_str(), format!("{a}-2"));
    }
}

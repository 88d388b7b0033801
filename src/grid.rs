//! The product grid: every card on the page plus page-level state.
//!
//! Cards are kept in an in-memory map keyed by [`CardId`], in display order.
//! The grid owns the [`PrefetchScheduler`] (and with it the dedup cache) and
//! the [`CardSurface`] that renders the cards.
//!
//! Page lifecycle:
//!
//! 1. [`Grid::insert`] every catalog product (initial markup, no side effects).
//! 2. [`Grid::setup`] once: dot rows, current image of each card, and a
//!    prefetch of every image not currently shown.
//! 3. Events: [`Grid::click_image`], [`Grid::image_settled`],
//!    [`Grid::toggle_cart`], [`Grid::search`], [`Grid::toggle_theme`],
//!    [`Grid::add_card`].

use crate::carousel::{Assignment, Card, CardId, CardSurface, CycleStep, LoadOutcome};
use crate::catalog::Product;
use crate::prefetch::PrefetchScheduler;
use crate::variant::{VariantSettings, strip_size_params};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("no card with id {0}")]
    UnknownCard(CardId),
}

/// Color theme of the page. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One card on the page: carousel state plus product details.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub card: Card,
    pub title: String,
    pub description: String,
    pub price: String,
    pub in_cart: bool,
    /// Hidden by the current search.
    pub hidden: bool,
}

impl ProductCard {
    pub fn id(&self) -> &CardId {
        self.card.id()
    }

    /// Label of the cart button.
    pub fn cart_label(&self) -> &'static str {
        if self.in_cart { "Added" } else { "Add to Cart" }
    }
}

/// Result of applying a search query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchOutcome {
    pub matches: usize,
    /// Whether the "no results" status is shown.
    pub show_message: bool,
    pub message: String,
}

const NO_RESULTS: &str = "No results. Try a different search.";

pub struct Grid<S> {
    order: Vec<CardId>,
    cards: HashMap<CardId, ProductCard>,
    surface: S,
    scheduler: PrefetchScheduler,
    variants: VariantSettings,
    query: String,
    theme: Theme,
}

impl<S: CardSurface> Grid<S> {
    pub fn new(surface: S, scheduler: PrefetchScheduler, variants: VariantSettings) -> Self {
        Self {
            order: Vec::new(),
            cards: HashMap::new(),
            surface,
            scheduler,
            variants,
            query: String::new(),
            theme: Theme::default(),
        }
    }

    /// Add a product as part of the initial page, without side effects.
    pub fn insert(&mut self, product: &Product) -> CardId {
        let urls = product.image_urls();
        let base: Vec<String> = urls
            .iter()
            .map(|u| strip_size_params(u))
            .filter(|u| !u.is_empty())
            .collect();
        let id = self.allocate_id(&product.title, &base);
        let card = ProductCard {
            card: Card::new(id.clone(), &urls, product.image_index),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price.clone(),
            in_cart: false,
            hidden: false,
        };
        self.order.push(id.clone());
        self.cards.insert(id.clone(), card);
        id
    }

    /// Initial page setup: dot rows, current image of each card, and one
    /// prefetch per image not currently shown.
    pub fn setup(&mut self) {
        for id in &self.order {
            if let Some(entry) = self.cards.get_mut(id) {
                entry.card.add_image_dots(&mut self.surface);
            }
        }
        for id in &self.order {
            let Some(entry) = self.cards.get_mut(id) else {
                continue;
            };
            entry.card.show_current(&mut self.surface, &self.variants);
            for url in entry.card.hidden_images() {
                self.scheduler.schedule(url);
            }
        }
        tracing::debug!(
            cards = self.order.len(),
            prefetched = self.scheduler.cache().len(),
            "grid setup complete"
        );
    }

    /// Add a card after setup: dots, current image, prefetch of all its
    /// images, and the active search re-applied.
    pub fn add_card(&mut self, product: &Product) -> CardId {
        let id = self.insert(product);
        if let Some(entry) = self.cards.get_mut(&id) {
            entry.card.add_image_dots(&mut self.surface);
            entry.card.show_current(&mut self.surface, &self.variants);
            for url in entry.card.images() {
                self.scheduler.schedule(url);
            }
        }
        let query = self.query.clone();
        self.search(&query);
        id
    }

    /// A click on a card's image area.
    pub fn click_image(&mut self, id: &CardId) -> Result<Option<CycleStep>, GridError> {
        let entry = self
            .cards
            .get_mut(id)
            .ok_or_else(|| GridError::UnknownCard(id.clone()))?;
        Ok(entry
            .card
            .cycle(&mut self.surface, &mut self.scheduler, &self.variants))
    }

    /// Load/error notification from a card's image surface.
    pub fn image_settled(
        &mut self,
        id: &CardId,
        assignment: Assignment,
        outcome: LoadOutcome,
    ) -> Result<bool, GridError> {
        let entry = self
            .cards
            .get_mut(id)
            .ok_or_else(|| GridError::UnknownCard(id.clone()))?;
        Ok(entry.card.settle(&mut self.surface, assignment, outcome))
    }

    /// Flip a card's cart state; returns the new state.
    pub fn toggle_cart(&mut self, id: &CardId) -> Result<bool, GridError> {
        let entry = self
            .cards
            .get_mut(id)
            .ok_or_else(|| GridError::UnknownCard(id.clone()))?;
        entry.in_cart = !entry.in_cart;
        Ok(entry.in_cart)
    }

    /// Filter cards by a case-insensitive title substring.
    ///
    /// The query is trimmed; an empty query shows every card.
    pub fn search(&mut self, query: &str) -> SearchOutcome {
        self.query = query.to_string();
        let trimmed = query.trim();
        let needle = trimmed.to_lowercase();
        let mut matches = 0;
        for entry in self.cards.values_mut() {
            let matched = needle.is_empty() || entry.title.to_lowercase().contains(&needle);
            entry.hidden = !matched;
            if matched {
                matches += 1;
            }
        }
        let show_message = !needle.is_empty() && matches == 0;
        let message = if show_message {
            format!("No products match “{trimmed}”. Try a different search.")
        } else {
            NO_RESULTS.to_string()
        };
        SearchOutcome {
            matches,
            show_message,
            message,
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Cards in display order.
    pub fn cards(&self) -> impl Iterator<Item = &ProductCard> {
        self.order.iter().filter_map(|id| self.cards.get(id))
    }

    pub fn card(&self, id: &CardId) -> Option<&ProductCard> {
        self.cards.get(id)
    }

    /// Card id at a 1-based display position.
    pub fn id_at(&self, position: usize) -> Option<&CardId> {
        position.checked_sub(1).and_then(|i| self.order.get(i))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn scheduler(&self) -> &PrefetchScheduler {
        &self.scheduler
    }

    pub fn variants(&self) -> &VariantSettings {
        &self.variants
    }

    fn allocate_id(&self, title: &str, images: &[String]) -> CardId {
        let base = CardId::derive(title, images);
        if !self.cards.contains_key(&base) {
            return base;
        }
        (2..)
            .map(|n| base.with_suffix(n))
            .find(|candidate| !self.cards.contains_key(candidate))
            .unwrap_or(base)
    }
}

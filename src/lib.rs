//! # Product Grid
//!
//! A product grid where each card may carry several images. Clicking a
//! card's image cycles through them; the image after the one shown is warmed
//! in the background so the next click finds it in the browser cache.
//!
//! # Architecture: Responsive Image Pipeline
//!
//! The core is three layers, leaf first:
//!
//! ```text
//! 1. Variant     image URL  →  base URL, sized URL, srcset   (pure string work)
//! 2. Prefetch    base URL   →  deferred low-priority probe   (dedup cache + Defer)
//! 3. Carousel    click      →  next image shown, lookahead   (per-card state machine)
//! ```
//!
//! Around it, the [`grid`] keeps every card in an in-memory map keyed by
//! [`carousel::CardId`] and handles search, cart and theme. Rendered HTML is
//! a derived view of that store, produced by [`render`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`variant`] | Strips `w`/`h` params, builds sized URLs and responsive candidate sets |
//! | [`runtime`] | Single-threaded event loop with a host-driven clock, idle queue and timers |
//! | [`prefetch`] | Deduplicating, deferred, best-effort image warmer |
//! | [`carousel`] | Per-card carousel state, dot indicators, load notifications |
//! | [`surface`] | In-memory [`carousel::CardSurface`] that records what was shown |
//! | [`grid`] | Card store, page setup, search, cart and theme |
//! | [`catalog`] | Products loaded from a TOML or JSON catalog file |
//! | [`render`] | Static HTML page for the grid using Maud |
//! | [`config`] | `grid.toml` loading, validation, merging, and CSS generation |
//! | [`output`] | CLI output formatting for variants and simulated sessions |
//!
//! # Design Decisions
//!
//! ## Explicit Time
//!
//! Nothing in the crate reads a wall clock. Deferred work goes to the
//! [`runtime::EventLoop`], and the host decides when the loop is idle and how
//! far time moves. A session of clicks and idle periods therefore replays the
//! same way every time, which is what the `simulate` command and the tests
//! rely on.
//!
//! ## One Defer Capability
//!
//! Hosts differ in whether they offer idle callbacks. The difference is
//! settled once at startup by [`prefetch::select_defer`]; the scheduler only
//! ever sees a [`prefetch::Defer`].
//!
//! ## Dedup Before Defer
//!
//! A base URL enters the prefetch cache when it is scheduled, not when its
//! probe runs. Two cards sharing an image, or a click racing page setup,
//! produce a single probe.

pub mod carousel;
pub mod catalog;
pub mod config;
pub mod grid;
pub mod output;
pub mod prefetch;
pub mod render;
pub mod runtime;
pub mod surface;
pub mod variant;

#[cfg(test)]
pub(crate) mod test_helpers;

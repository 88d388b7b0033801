//! CLI output formatting.
//!
//! # Card-First Display
//!
//! Every card is shown by its positional index and title, with the card id
//! and URLs as indented context lines. A simulated session reads as a story
//! about the cards the user touched, not as a dump of surface calls.
//!
//! # Output Format
//!
//! ## Variants
//!
//! ```text
//! Base: https://x/img?q=75
//! Display: https://x/img?q=75&w=320&h=320
//! Variants
//!     320w https://x/img?q=75&w=320&h=320
//!     480w https://x/img?q=75&w=480&h=480
//! Sizes: (min-width: 1024px) 360px, (min-width: 768px) 45vw, 92vw
//! ```
//!
//! ## Simulate
//!
//! ```text
//! Cards
//! 001 Minimal Watch (3 images)
//!     Id: card-1f0c9a2e
//!     Showing: 002 https://x/b?w=320&h=320
//!
//! Clicks
//! 001 Minimal Watch → image 002 of 3
//!     Lookahead: 003 deduplicated
//!
//! Prefetch (idle)
//!     001 https://x/b
//!         src: https://x/b?w=320&h=320
//!         priority: low
//!
//! Probes: 2 issued, 3 cached
//! ```
//!
//! # Architecture
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::carousel::{CardSurface, CycleStep};
use crate::grid::{Grid, ProductCard, SearchOutcome};
use crate::prefetch::{FetchPriority, PrefetchOutcome, ProbeRequest};
use crate::surface::SurfaceEvent;
use crate::variant::{ImageSource, VariantSettings, strip_size_params};
use serde::Serialize;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format a card header: positional index + title + image count.
///
/// ```text
/// 001 Minimal Watch (3 images)
/// 002 Desk Lamp (1 image)
/// ```
fn card_header(position: usize, title: &str, images: usize) -> String {
    let noun = if images == 1 { "image" } else { "images" };
    format!("{} {} ({} {})", format_index(position), title, images, noun)
}

fn outcome_label(outcome: PrefetchOutcome) -> &'static str {
    match outcome {
        PrefetchOutcome::Scheduled => "scheduled",
        PrefetchOutcome::Deduplicated => "deduplicated",
        PrefetchOutcome::Ignored => "ignored",
        PrefetchOutcome::FailedSilently => "not deferred",
    }
}

// ============================================================================
// Variants
// ============================================================================

/// Format the variants derived from one image URL.
pub fn format_variants(url: &str, settings: &VariantSettings) -> Vec<String> {
    let base = strip_size_params(url);
    if base.is_empty() {
        return vec!["Base: (empty)".to_string(), "No variants".to_string()];
    }

    let mut lines = vec![format!("Base: {}", base)];
    if let Some(source) = ImageSource::for_base(&base, settings) {
        lines.push(format!("Display: {}", source.src));
    }
    lines.push("Variants".to_string());
    for candidate in settings.candidates(&base).iter() {
        lines.push(format!("{}{}w {}", indent(1), candidate.width, candidate.url));
    }
    lines.push(format!("Sizes: {}", settings.sizes));
    lines
}

pub fn print_variants(url: &str, settings: &VariantSettings) {
    for line in format_variants(url, settings) {
        println!("{}", line);
    }
}

// ============================================================================
// Grid state
// ============================================================================

fn format_card(position: usize, card: &ProductCard, variants: &VariantSettings) -> Vec<String> {
    let carousel = &card.card;
    let mut header = card_header(position, &card.title, carousel.images().len());
    if card.hidden {
        header.push_str(" [hidden]");
    }
    if card.in_cart {
        header.push_str(" [in cart]");
    }

    let mut lines = vec![header, format!("{}Id: {}", indent(1), card.id())];
    if let Some(source) = carousel
        .current_image()
        .and_then(|url| ImageSource::for_base(url, variants))
    {
        lines.push(format!(
            "{}Showing: {} {}",
            indent(1),
            format_index(carousel.current_index() + 1),
            source.src
        ));
    }
    lines
}

/// Format every card in display order.
pub fn format_grid<S: CardSurface>(grid: &Grid<S>) -> Vec<String> {
    let mut lines = vec!["Cards".to_string()];
    if grid.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, card) in grid.cards().enumerate() {
        lines.extend(format_card(i + 1, card, grid.variants()));
    }
    lines
}

// ============================================================================
// Session events
// ============================================================================

/// One click of a simulated session.
#[derive(Debug, Clone, Serialize)]
pub struct ClickReport {
    pub position: usize,
    pub title: String,
    pub images: usize,
    pub step: Option<CycleStep>,
}

/// Format one click.
///
/// ```text
/// 001 Minimal Watch → image 002 of 3
///     Lookahead: 003 scheduled
/// 002 Desk Lamp (single image, unchanged)
/// ```
pub fn format_click(click: &ClickReport) -> Vec<String> {
    let Some(step) = &click.step else {
        return vec![format!(
            "{} {} (single image, unchanged)",
            format_index(click.position),
            click.title
        )];
    };
    let mut lines = vec![format!(
        "{} {} \u{2192} image {} of {}",
        format_index(click.position),
        click.title,
        format_index(step.index + 1),
        click.images
    )];
    if let Some((index, outcome)) = step.lookahead {
        lines.push(format!(
            "{}Lookahead: {} {}",
            indent(1),
            format_index(index + 1),
            outcome_label(outcome)
        ));
    }
    lines
}

/// Format a single surface event as one line.
pub fn format_surface_event(event: &SurfaceEvent) -> String {
    match event {
        SurfaceEvent::Loading { card, loading } => {
            format!("{} loading {}", card, if *loading { "on" } else { "off" })
        }
        SurfaceEvent::Source {
            card,
            assignment,
            source,
        } => format!("{} source #{} {}", card, assignment.0, source.src),
        SurfaceEvent::Dots {
            card,
            count,
            active,
        } => format!("{} dots {} (active {})", card, count, format_index(active + 1)),
        SurfaceEvent::ActiveDot { card, active } => {
            format!("{} active dot {}", card, format_index(active + 1))
        }
    }
}

/// Format issued probe requests under the name of the defer strategy.
pub fn format_probe_requests(defer: &str, requests: &[ProbeRequest]) -> Vec<String> {
    let mut lines = vec![format!("Prefetch ({})", defer)];
    if requests.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, request) in requests.iter().enumerate() {
        lines.push(format!("{}{} {}", indent(1), format_index(i + 1), request.base_url));
        lines.push(format!("{}src: {}", indent(2), request.src));
        let priority = match request.fetch_priority {
            Some(FetchPriority::Low) => "low",
            None => "default",
        };
        lines.push(format!("{}priority: {}", indent(2), priority));
    }
    lines
}

/// Format the result of a search.
///
/// ```text
/// Search "watch": 1 match
/// Search "sofa": 0 matches
///     No products match “sofa”. Try a different search.
/// ```
pub fn format_search(query: &str, outcome: &SearchOutcome) -> Vec<String> {
    let noun = if outcome.matches == 1 { "match" } else { "matches" };
    let mut lines = vec![format!(
        "Search \"{}\": {} {}",
        query.trim(),
        outcome.matches,
        noun
    )];
    if outcome.show_message {
        lines.push(format!("{}{}", indent(1), outcome.message));
    }
    lines
}

// ============================================================================
// Session report
// ============================================================================

/// Everything a simulated session produced, in the order it happened.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub defer: String,
    pub clicks: Vec<ClickReport>,
    pub search: Option<(String, SearchOutcome)>,
    pub surface: Vec<SurfaceEvent>,
    pub probes: Vec<ProbeRequest>,
    pub cached: usize,
}

/// Format a full session: grid state, clicks, search, probes and totals.
///
/// Surface events are only listed when `verbose` is set.
pub fn format_session<S: CardSurface>(
    grid: &Grid<S>,
    report: &SessionReport,
    verbose: bool,
) -> Vec<String> {
    let mut lines = format_grid(grid);

    if !report.clicks.is_empty() {
        lines.push(String::new());
        lines.push("Clicks".to_string());
        for click in &report.clicks {
            lines.extend(format_click(click));
        }
    }

    if let Some((query, outcome)) = &report.search {
        lines.push(String::new());
        lines.extend(format_search(query, outcome));
    }

    if verbose {
        lines.push(String::new());
        lines.push("Surface".to_string());
        for event in &report.surface {
            lines.push(format!("{}{}", indent(1), format_surface_event(event)));
        }
    }

    lines.push(String::new());
    lines.extend(format_probe_requests(&report.defer, &report.probes));
    lines.push(String::new());
    lines.push(format!(
        "Probes: {} issued, {} cached",
        report.probes.len(),
        report.cached
    ));
    lines
}

pub fn print_session<S: CardSurface>(grid: &Grid<S>, report: &SessionReport, verbose: bool) {
    for line in format_session(grid, report, verbose) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carousel::{Assignment, CardId};
    use crate::test_helpers::{product, test_grid};

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads_to_three() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn card_header_singular_and_plural() {
        assert_eq!(card_header(1, "Lamp", 1), "001 Lamp (1 image)");
        assert_eq!(card_header(2, "Watch", 3), "002 Watch (3 images)");
    }

    // =========================================================================
    // Variants
    // =========================================================================

    #[test]
    fn variants_list_every_breakpoint() {
        let lines = format_variants("https://x/img?w=100&h=100&q=75", &VariantSettings::default());
        assert_eq!(lines[0], "Base: https://x/img?q=75");
        assert_eq!(lines[1], "Display: https://x/img?q=75&w=320&h=320");
        assert_eq!(lines[2], "Variants");
        assert_eq!(lines[3], "    320w https://x/img?q=75&w=320&h=320");
        assert_eq!(lines[8], "    1200w https://x/img?q=75&w=1200&h=1200");
        assert!(lines[9].starts_with("Sizes: "));
    }

    #[test]
    fn variants_of_empty_url() {
        let lines = format_variants("?w=1", &VariantSettings::default());
        assert_eq!(lines, vec!["Base: (empty)", "No variants"]);
    }

    // =========================================================================
    // Grid and session
    // =========================================================================

    #[test]
    fn grid_lists_cards_with_state_markers() {
        let (mut grid, _, _) = test_grid();
        let id = grid.insert(&product("Watch", &["https://x/a", "https://x/b"]));
        grid.insert(&product("Lamp", &["https://x/c"]));
        grid.toggle_cart(&id).unwrap();
        grid.search("watch");

        let lines = format_grid(&grid);
        assert_eq!(lines[0], "Cards");
        assert_eq!(lines[1], "001 Watch (2 images) [in cart]");
        assert_eq!(lines[2], format!("    Id: {id}"));
        assert_eq!(lines[3], "    Showing: 001 https://x/a?w=320&h=320");
        assert_eq!(lines[4], "002 Lamp (1 image) [hidden]");
    }

    #[test]
    fn empty_grid() {
        let (grid, _, _) = test_grid();
        assert_eq!(format_grid(&grid), vec!["Cards", "    (none)"]);
    }

    #[test]
    fn click_with_lookahead() {
        let click = ClickReport {
            position: 1,
            title: "Watch".to_string(),
            images: 3,
            step: Some(CycleStep {
                index: 1,
                assignment: Some(Assignment(4)),
                lookahead: Some((2, PrefetchOutcome::Deduplicated)),
            }),
        };
        assert_eq!(
            format_click(&click),
            vec!["001 Watch \u{2192} image 002 of 3", "    Lookahead: 003 deduplicated"]
        );
    }

    #[test]
    fn click_on_single_image_card() {
        let click = ClickReport {
            position: 2,
            title: "Lamp".to_string(),
            images: 1,
            step: None,
        };
        assert_eq!(format_click(&click), vec!["002 Lamp (single image, unchanged)"]);
    }

    #[test]
    fn surface_event_lines() {
        let card = CardId::from("card-00000000");
        assert_eq!(
            format_surface_event(&SurfaceEvent::Loading {
                card: card.clone(),
                loading: true
            }),
            "card-00000000 loading on"
        );
        assert_eq!(
            format_surface_event(&SurfaceEvent::Dots {
                card: card.clone(),
                count: 3,
                active: 0
            }),
            "card-00000000 dots 3 (active 001)"
        );
        assert_eq!(
            format_surface_event(&SurfaceEvent::ActiveDot { card, active: 2 }),
            "card-00000000 active dot 003"
        );
    }

    #[test]
    fn probe_requests_show_priority() {
        let settings = VariantSettings::default();
        let requests = vec![
            ProbeRequest::new("https://x/a", &settings, Some(FetchPriority::Low)),
            ProbeRequest::new("https://x/b", &settings, None),
        ];
        let lines = format_probe_requests("idle", &requests);
        assert_eq!(lines[0], "Prefetch (idle)");
        assert_eq!(lines[1], "    001 https://x/a");
        assert_eq!(lines[2], "        src: https://x/a?w=320&h=320");
        assert_eq!(lines[3], "        priority: low");
        assert_eq!(lines[6], "        priority: default");
    }

    #[test]
    fn search_lines() {
        let (mut grid, _, _) = test_grid();
        grid.insert(&product("Watch", &["https://x/a"]));
        let outcome = grid.search(" sofa ");
        assert_eq!(
            format_search(" sofa ", &outcome),
            vec![
                "Search \"sofa\": 0 matches",
                "    No products match “sofa”. Try a different search."
            ]
        );
        let outcome = grid.search("watch");
        assert_eq!(format_search("watch", &outcome), vec!["Search \"watch\": 1 match"]);
    }

    #[test]
    fn session_ends_with_totals() {
        let (mut grid, host, journal) = test_grid();
        grid.insert(&product("Watch", &["https://x/a", "https://x/b"]));
        grid.setup();
        host.run_to_completion();

        let report = SessionReport {
            defer: grid.scheduler().defer_name().to_string(),
            clicks: Vec::new(),
            search: None,
            surface: grid.surface().events().to_vec(),
            probes: journal.requests(),
            cached: grid.scheduler().cache().len(),
        };
        let quiet = format_session(&grid, &report, false);
        assert_eq!(quiet.last().unwrap(), "Probes: 1 issued, 1 cached");
        assert!(!quiet.contains(&"Surface".to_string()));

        let verbose = format_session(&grid, &report, true);
        assert!(verbose.contains(&"Surface".to_string()));
    }
}

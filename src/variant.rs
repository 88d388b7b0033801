//! Responsive image URL variants.
//!
//! Product images are served by an on-the-fly resizing CDN that reads the
//! requested crop from `w` and `h` query parameters. Every URL that enters the
//! grid is first reduced to its *base* form (no sizing parameters) so the same
//! image always maps to the same key, no matter how many times a size has
//! already been injected into it:
//!
//! ```text
//! https://x/img?w=100&h=100&q=75   →  https://x/img?q=75              (base)
//!                                  →  https://x/img?q=75&w=320&h=320  (sized)
//! ```
//!
//! From a base URL we derive:
//!
//! - a **sized variant**: a square crop at one pixel size,
//! - a **candidate set**: one sized variant per breakpoint width, rendered
//!   as a `srcset` attribute so the browser can pick a resolution,
//! - an [`ImageSource`]: the full set of attributes handed to a card's
//!   image surface (`src`, `srcset`, `sizes`).
//!
//! Everything here is a pure function of its inputs and never fails: an empty
//! or unusable URL simply produces empty output.

use crate::config::GridConfig;
use serde::Serialize;

/// Breakpoint widths offered in every candidate set, ascending.
pub const BREAKPOINT_WIDTHS: [u32; 6] = [320, 480, 640, 800, 960, 1200];

/// Pixel size used for the `src` of a card image.
pub const DEFAULT_DISPLAY_SIZE: u32 = 320;

/// `sizes` attribute matching the grid's column layout.
pub const DEFAULT_SIZES: &str = "(min-width: 1024px) 360px, (min-width: 768px) 45vw, 92vw";

/// Remove every `w`/`h` sizing parameter from an image URL.
///
/// Parameters are recognised as `?w=<digits>`, `&w=<digits>`, `?h=<digits>`
/// and `&h=<digits>` anywhere in the string. After removal the separators are
/// repaired: `?&` becomes `?`, runs of `&` collapse to one, and trailing `?`
/// or `&` characters are dropped. The whole pass repeats until nothing
/// changes, which makes the function idempotent for any input.
///
/// - `"https://x/img?w=100&h=100&q=75"` → `"https://x/img?q=75"`
/// - `"https://x/img?w=320"` → `"https://x/img"`
/// - `""` → `""`
pub fn strip_size_params(url: &str) -> String {
    let mut current = url.to_string();
    loop {
        let next = repair_separators(&remove_size_params(&current));
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Build a square crop variant: `w=<size>&h=<size>` appended to the base URL.
///
/// Returns an empty string when `base_url` normalizes to nothing.
pub fn build_sized_url(base_url: &str, size: u32) -> String {
    let cleaned = strip_size_params(base_url);
    if cleaned.is_empty() {
        return String::new();
    }
    let joiner = if cleaned.contains('?') { '&' } else { '?' };
    format!("{cleaned}{joiner}w={size}&h={size}")
}

/// Build the candidate set over [`BREAKPOINT_WIDTHS`].
pub fn build_responsive_candidate_set(base_url: &str) -> CandidateSet {
    CandidateSet::with_widths(base_url, &BREAKPOINT_WIDTHS)
}

/// Drop `[?&](w|h)=<digits>` occurrences.
///
/// A `?` separator is kept so the query string does not lose its start;
/// the follow-up repair turns the resulting `?&` into `?`.
fn remove_size_params(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut out = String::with_capacity(url.len());
    let mut skip_to = 0;
    for (i, c) in url.char_indices() {
        if i < skip_to {
            continue;
        }
        if matches!(c, '?' | '&')
            && let Some(end) = size_param_end(bytes, i + 1)
        {
            if c == '?' {
                out.push('?');
            }
            skip_to = end;
            continue;
        }
        out.push(c);
    }
    out
}

/// If `bytes[start..]` begins with `w=<digits>` or `h=<digits>`, return the
/// index just past the digits.
fn size_param_end(bytes: &[u8], start: usize) -> Option<usize> {
    match bytes.get(start..start + 2) {
        Some([b'w' | b'h', b'=']) => {}
        _ => return None,
    }
    let digits = bytes[start + 2..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    (digits > 0).then_some(start + 2 + digits)
}

fn repair_separators(url: &str) -> String {
    let mut out = url.replace("?&", "?");
    while out.contains("&&") {
        out = out.replace("&&", "&");
    }
    while out.ends_with(['?', '&']) {
        out.pop();
    }
    out
}

/// One entry of a candidate set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub width: u32,
}

/// Ordered `(sized URL, width)` pairs, one per breakpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
}

impl CandidateSet {
    /// Build a candidate set over an explicit breakpoint list, preserving its
    /// order. An empty base URL yields an empty set.
    pub fn with_widths(base_url: &str, widths: &[u32]) -> Self {
        let base = strip_size_params(base_url);
        if base.is_empty() {
            return Self::default();
        }
        let candidates = widths
            .iter()
            .map(|&width| Candidate {
                url: build_sized_url(&base, width),
                width,
            })
            .collect();
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn widths(&self) -> Vec<u32> {
        self.candidates.iter().map(|c| c.width).collect()
    }

    /// The candidate with the smallest width.
    pub fn smallest(&self) -> Option<&Candidate> {
        self.candidates.iter().min_by_key(|c| c.width)
    }

    /// Render as a `srcset` attribute value: `"<url> 320w, <url> 480w, ..."`.
    pub fn to_srcset(&self) -> String {
        self.candidates
            .iter()
            .map(|c| format!("{} {}w", c.url, c.width))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Breakpoints, display size and `sizes` attribute used to derive variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSettings {
    pub breakpoints: Vec<u32>,
    pub display_size: u32,
    pub sizes: String,
}

impl VariantSettings {
    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            breakpoints: config.images.breakpoints.clone(),
            display_size: config.images.display_size,
            sizes: config.images.sizes.clone(),
        }
    }

    pub fn candidates(&self, base_url: &str) -> CandidateSet {
        CandidateSet::with_widths(base_url, &self.breakpoints)
    }
}

impl Default for VariantSettings {
    fn default() -> Self {
        Self {
            breakpoints: BREAKPOINT_WIDTHS.to_vec(),
            display_size: DEFAULT_DISPLAY_SIZE,
            sizes: DEFAULT_SIZES.to_string(),
        }
    }
}

/// Attributes applied to a card's `<img>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSource {
    pub src: String,
    pub srcset: String,
    pub sizes: String,
}

impl ImageSource {
    /// Derive the display attributes for a base URL, or `None` if it
    /// normalizes to nothing.
    pub fn for_base(base_url: &str, settings: &VariantSettings) -> Option<Self> {
        let base = strip_size_params(base_url);
        if base.is_empty() {
            return None;
        }
        let src = build_sized_url(&base, settings.display_size);
        Some(Self {
            srcset: settings.candidates(&base).to_srcset(),
            sizes: settings.sizes.clone(),
            src: if src.is_empty() { base } else { src },
        })
    }
}

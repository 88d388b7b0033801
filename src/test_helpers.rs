//! Shared test utilities for the product-grid test suite.
//!
//! Provides product builders, a fully wired grid on a fresh event loop, and
//! probes with scripted behavior.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (mut grid, host, journal) = test_grid();
//! let id = grid.insert(&product("Watch", &["https://x/a", "https://x/b"]));
//! grid.setup();
//! host.run_to_completion();
//! assert_eq!(journal.count(), 1);
//! ```

use std::cell::Cell;
use std::rc::Rc;

use crate::catalog::Product;
use crate::config::GridConfig;
use crate::grid::Grid;
use crate::prefetch::{
    HostCapabilities, ImageProbe, PrefetchScheduler, ProbeError, ProbeJournal, ProbeRequest,
};
use crate::runtime::EventLoop;
use crate::surface::SurfaceLog;
use crate::variant::VariantSettings;

/// A product with the given title and image URLs, everything else blank.
pub fn product(title: &str, images: &[&str]) -> Product {
    Product {
        title: title.to_string(),
        description: String::new(),
        price: String::new(),
        images: Some(images.iter().map(|s| s.to_string()).collect()),
        image: None,
        image_index: 0,
    }
}

/// A grid with default config on an idle-capable host, recording surface
/// calls and probe requests.
pub fn test_grid() -> (Grid<SurfaceLog>, EventLoop, Rc<ProbeJournal>) {
    let host = EventLoop::new();
    let journal = Rc::new(ProbeJournal::new());
    let config = GridConfig::default();
    let scheduler =
        PrefetchScheduler::for_host(&host, HostCapabilities::default(), journal.clone(), &config);
    let grid = Grid::new(
        SurfaceLog::default(),
        scheduler,
        VariantSettings::from_config(&config),
    );
    (grid, host, journal)
}

/// Probe that rejects every request, counting attempts.
#[derive(Debug, Default)]
pub struct FailingProbe {
    attempts: Cell<usize>,
}

impl FailingProbe {
    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }
}

impl ImageProbe for FailingProbe {
    fn load(&self, _request: &ProbeRequest) -> Result<(), ProbeError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(ProbeError::Unsupported("fetchPriority".to_string()))
    }
}

/// Loader that panics on every request, counting attempts.
#[derive(Debug, Default)]
pub struct PanickingLoader {
    attempts: Cell<usize>,
}

impl PanickingLoader {
    pub fn attempts(&self) -> usize {
        self.attempts.get()
    }
}

impl ImageProbe for PanickingLoader {
    fn load(&self, request: &ProbeRequest) -> Result<(), ProbeError> {
        self.attempts.set(self.attempts.get() + 1);
        panic!("loader crashed on {}", request.src);
    }
}

use clap::{Parser, Subcommand, ValueEnum};
use product_grid::carousel::{CardId, LoadOutcome};
use product_grid::catalog::{self, Catalog, Product};
use product_grid::config::{self, GridConfig};
use product_grid::grid::{Grid, Theme};
use product_grid::output::{self, ClickReport, SessionReport};
use product_grid::prefetch::{HostCapabilities, PrefetchScheduler, ProbeJournal};
use product_grid::render;
use product_grid::runtime::EventLoop;
use product_grid::surface::SurfaceLog;
use product_grid::variant::VariantSettings;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "product-grid")]
#[command(about = "Product grid with multi-image cards and idle-time image prefetching")]
#[command(long_about = "\
Product grid with multi-image cards and idle-time image prefetching

Each card shows one image at a time; clicking the image area cycles to the
next one. Images are served as responsive variants of a base URL, and the
image after the one shown is warmed in the background at low priority.

Catalog structure (TOML, or JSON with the same shape):

  [[products]]
  title = \"Minimal Watch\"
  description = \"Brushed steel, *sapphire* glass.\"   # markdown
  price = \"$129.00\"
  images = [\"https://cdn/a.jpg\", \"https://cdn/b.jpg?w=600&h=600\"]
  image_index = 0                                    # optional

Config is read from grid.toml next to the catalog (all keys optional).
Run 'product-grid gen-config' to generate a documented grid.toml.

Logging goes to stderr; set RUST_LOG=product_grid=debug to see every
prefetch decision.")]
#[command(version)]
struct Cli {
    /// Directory holding grid.toml (defaults to the catalog's directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that build a grid from a catalog.
#[derive(clap::Args, Clone)]
struct CatalogArgs {
    /// Catalog file (.toml or .json)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Append the built-in sample product after setup
    #[arg(long)]
    add_sample: bool,

    /// Filter cards by title before output
    #[arg(long)]
    search: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Render the catalog as a static HTML page
    Render {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Output file
        #[arg(long, default_value = "dist/index.html")]
        output: PathBuf,

        /// Color theme of the page
        #[arg(long, value_enum, default_value = "light")]
        theme: ThemeArg,

        /// Page title
        #[arg(long, default_value = "Products")]
        title: String,
    },
    /// Print the responsive variants derived from an image URL
    Variants {
        /// Image URL, with or without w/h params
        url: String,
    },
    /// Replay a session of clicks and print what was shown and prefetched
    Simulate {
        #[command(flatten)]
        catalog: CatalogArgs,

        /// Card to click: 1-based position or card id (repeatable)
        #[arg(long = "click")]
        clicks: Vec<String>,

        /// Host has no idle callbacks; defer with a fixed delay instead
        #[arg(long)]
        no_idle_callback: bool,

        /// Host does not accept fetch priority hints
        #[arg(long)]
        no_fetch_priority: bool,

        /// Also list every surface call
        #[arg(long, short)]
        verbose: bool,

        /// Print the session report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock grid.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Render {
            catalog,
            output,
            theme,
            title,
        } => {
            let config = load_config(cli.config_dir.as_deref(), catalog.catalog.as_deref())?;
            let host = EventLoop::new();
            let journal = Rc::new(ProbeJournal::new());
            let mut grid = build_grid(&host, HostCapabilities::default(), journal, &config);
            populate(&mut grid, &catalog)?;
            grid.set_theme(theme.into());

            let html = render::render_page(&grid, &config, &title).into_string();
            if let Some(parent) = output.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&output, html)?;
            println!("Rendered {} cards \u{2192} {}", grid.len(), output.display());
        }
        Command::Variants { url } => {
            let config = load_config(cli.config_dir.as_deref(), None)?;
            output::print_variants(&url, &VariantSettings::from_config(&config));
        }
        Command::Simulate {
            catalog,
            clicks,
            no_idle_callback,
            no_fetch_priority,
            verbose,
            json,
        } => {
            let config = load_config(cli.config_dir.as_deref(), catalog.catalog.as_deref())?;
            let caps = HostCapabilities {
                idle_callback: !no_idle_callback,
                fetch_priority: !no_fetch_priority,
            };
            let host = EventLoop::new();
            let journal = Rc::new(ProbeJournal::new());
            let mut grid = build_grid(&host, caps, journal.clone(), &config);
            let search = populate(&mut grid, &catalog)?;

            let mut reports = Vec::new();
            for target in &clicks {
                let id = resolve_card(&grid, target)?;
                let step = grid.click_image(&id)?;
                if let Some(assignment) = step.as_ref().and_then(|s| s.assignment) {
                    grid.image_settled(&id, assignment, LoadOutcome::Loaded)?;
                }
                let position = grid
                    .cards()
                    .position(|c| c.id() == &id)
                    .map_or(0, |i| i + 1);
                let (title, images) = grid
                    .card(&id)
                    .map(|c| (c.title.clone(), c.card.images().len()))
                    .unwrap_or_default();
                reports.push(ClickReport {
                    position,
                    title,
                    images,
                    step,
                });
            }
            let ran = host.run_to_completion();
            tracing::debug!(tasks = ran, "event loop drained");

            let report = SessionReport {
                defer: grid.scheduler().defer_name().to_string(),
                clicks: reports,
                search,
                surface: grid.surface().events().to_vec(),
                probes: journal.requests(),
                cached: grid.scheduler().cache().len(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_session(&grid, &report, verbose);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the default `warn`.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load `grid.toml` from the explicit config dir, else the catalog's dir,
/// else the working directory.
fn load_config(
    config_dir: Option<&Path>,
    catalog: Option<&Path>,
) -> Result<GridConfig, config::ConfigError> {
    let dir = config_dir
        .map(Path::to_path_buf)
        .or_else(|| {
            catalog
                .and_then(Path::parent)
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| PathBuf::from("."));
    config::load_config(&dir)
}

fn build_grid(
    host: &EventLoop,
    caps: HostCapabilities,
    journal: Rc<ProbeJournal>,
    config: &GridConfig,
) -> Grid<SurfaceLog> {
    let scheduler = PrefetchScheduler::for_host(host, caps, journal, config);
    Grid::new(
        SurfaceLog::default(),
        scheduler,
        VariantSettings::from_config(config),
    )
}

/// Insert the catalog, run page setup, then apply `--add-sample` and
/// `--search`. Returns the search outcome if a query was given.
fn populate(
    grid: &mut Grid<SurfaceLog>,
    args: &CatalogArgs,
) -> Result<Option<(String, product_grid::grid::SearchOutcome)>, catalog::CatalogError> {
    let catalog = match &args.catalog {
        Some(path) => catalog::load_catalog(path)?,
        None => Catalog::default(),
    };
    for product in &catalog.products {
        grid.insert(product);
    }
    grid.setup();
    if args.add_sample {
        grid.add_card(&Product::sample());
    }
    Ok(args
        .search
        .as_ref()
        .map(|query| (query.clone(), grid.search(query))))
}

/// Resolve a `--click` target: a 1-based position or a card id.
fn resolve_card(grid: &Grid<SurfaceLog>, target: &str) -> Result<CardId, String> {
    if let Ok(position) = target.parse::<usize>() {
        return grid
            .id_at(position)
            .cloned()
            .ok_or_else(|| format!("no card at position {position} ({} cards)", grid.len()));
    }
    let id = CardId::from(target);
    if grid.card(&id).is_some() {
        Ok(id)
    } else {
        Err(format!("no card with id {target}"))
    }
}

//! Static HTML rendering of the grid.
//!
//! The page is a derived view of the card store: every attribute that the
//! carousel would otherwise keep on DOM elements (current image, dot state,
//! cart state, search visibility) is read from the [`Grid`] at render time.
//!
//! ## Card markup
//!
//! ```text
//! article.product-card  data-card-id  data-title  data-hidden
//! ├── div.card-image-wrap[.is-loading]
//! │   ├── img.card-image  src  srcset  sizes  loading=lazy
//! │   └── div.card-image-dots        (only for cards with 2+ images)
//! │       └── span.card-image-dot[.card-image-dot--active] × N
//! └── div.card-body
//!     ├── h2.card-title
//!     ├── div.card-description       (markdown)
//!     ├── p.card-price
//!     └── button.btn-add-cart[.added]
//! ```
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating;
//! all interpolation is escaped except the rendered markdown.

use crate::carousel::CardSurface;
use crate::config::{self, GridConfig};
use crate::grid::{Grid, ProductCard};
use crate::variant::{ImageSource, VariantSettings};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};

const CSS_STATIC: &str = include_str!("../static/grid.css");

/// Render the full page for the current grid state.
pub fn render_page<S: CardSurface>(grid: &Grid<S>, config: &GridConfig, title: &str) -> Markup {
    let css = format!(
        "{}\n\n{}",
        config::generate_color_css(&config.colors),
        CSS_STATIC
    );
    let search = grid.query().trim();
    let visible = grid.cards().filter(|c| !c.hidden).count();
    let show_no_results = !search.is_empty() && visible == 0;

    html! {
        (DOCTYPE)
        html lang="en" data-theme=(grid.theme().as_str()) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(css)) }
            }
            body {
                header.site-header {
                    h1 { (title) }
                    input id="search" type="search" placeholder="Search products" value=(grid.query());
                    button id="theme-toggle" type="button" { "Toggle theme" }
                }
                main.product-grid id="product-grid" role="list" {
                    @for card in grid.cards() {
                        (render_card(card, grid.variants()))
                    }
                    div.no-results-message id="no-results-message" role="status" aria-live="polite" hidden[!show_no_results] {
                        @if show_no_results {
                            "No products match “" (search) "”. Try a different search."
                        } @else {
                            "No results. Try a different search."
                        }
                    }
                }
            }
        }
    }
}

/// Render one product card.
pub fn render_card(card: &ProductCard, variants: &VariantSettings) -> Markup {
    let carousel = &card.card;
    let source = carousel
        .current_image()
        .and_then(|url| ImageSource::for_base(url, variants));
    let count = carousel.images().len();
    let active = carousel.current_index();

    html! {
        article.product-card.added-to-cart[card.in_cart]
            data-card-id=(card.id())
            data-title=(card.title)
            data-hidden=(if card.hidden { "true" } else { "false" })
            role="listitem" {
            div.card-image-wrap.is-loading[carousel.is_loading()] {
                @if let Some(source) = &source {
                    img.card-image src=(source.src) srcset=(source.srcset) sizes=(source.sizes)
                        alt="" width="600" height="600" loading="lazy" decoding="async";
                }
                @if count >= 2 {
                    div.card-image-dots aria-hidden="true" {
                        @for i in 0..count {
                            span.card-image-dot."card-image-dot--active"[i == active] {}
                        }
                    }
                }
            }
            div.card-body {
                h2.card-title { (card.title) }
                @if !card.description.is_empty() {
                    div.card-description { (PreEscaped(markdown_to_html(&card.description))) }
                }
                @if !card.price.is_empty() {
                    p.card-price { (card.price) }
                }
                button.btn-add-cart.added[card.in_cart] type="button" { (card.cart_label()) }
            }
        }
    }
}

fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new(markdown);
    let mut out = String::new();
    md_html::push_html(&mut out, parser);
    out
}

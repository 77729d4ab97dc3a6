//! Scraping of the target news site.
//!
//! Every stage is driven by declarative, ordered tables of CSS selectors and
//! URL patterns (see [`cafef`]) evaluated against a parsed DOM:
//!
//! | Stage | Module | Input | Output |
//! |-------|--------|-------|--------|
//! | Listing | [`listing`] | listing page HTML | ordered, deduplicated [`ArticleCandidate`](crate::models::ArticleCandidate)s |
//! | Classification | [`classify`] | candidate URL | article page or not, with an optional live probe |
//! | Extraction | [`content`] | article page HTML | title + body HTML |
//!
//! The tables are compiled once into a [`Site`] bound to the configured
//! target domain, and shared by all three stages.

pub mod cafef;
pub mod classify;
pub mod content;
pub mod listing;
pub mod site;

pub use site::{Site, SiteProfile};

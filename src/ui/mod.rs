//! Terminal rendering collaborator.
//!
//! [`transcript::Transcript`] implements [`crate::core::router::RenderSink`]
//! and writes everything as plain lines to any `Write`:
//! - [`widget`] lays a resolved tree out at a given width, handing chart
//!   nodes to a [`chart::ChartPlotter`] once their width is fixed.
//! - [`markdown`] turns narrative text into styled lines.
//! - [`theme`] and [`wrap`] hold the styling and width policy both share.

pub mod chart;
pub mod markdown;
pub mod theme;
pub mod transcript;
pub mod widget;
pub mod wrap;

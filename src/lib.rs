//! A terminal client for servers that speak the A2UI chat protocol.
//!
//! A reply is either narrative text streamed in small deltas, or a widget
//! surface: a flat list of components plus a data model that the client
//! resolves into a tree and draws. The crate is organized in layers:
//! - [`api`] holds the serde wire types.
//! - [`core`] owns the protocol: frame parsing, the data store, component
//!   decoding, tree resolution, action dispatch, message routing and the
//!   HTTP transport. Nothing in it knows about terminals.
//! - [`ui`] is the terminal rendering collaborator behind
//!   [`core::router::RenderSink`].
//! - [`cli`] parses arguments and runs one-shot or interactive sessions.
//!
//! The binary (`src/main.rs`) only calls [`cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;

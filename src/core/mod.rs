pub mod action;
pub mod chat_stream;
pub mod component;
pub mod config;
pub mod data_store;
pub mod frame_parser;
pub mod resolver;
pub mod router;
pub mod session;
pub mod surface;

//! Scene Bridge -- exposes a host application's runtime scene graph to
//! external automation clients over a WebSocket message channel.
//!
//! Clients send JSON frames `{"id", "method", "params"}`; the bridge routes
//! each request to a registered tool, executes it (funneling host mutations
//! through the main-thread gate), and answers with `{"id", "result"}` or
//! `{"id", "error"}`.
//!
//! Architecture:
//! - `bridge::protocol` -- wire types and the frame codec
//! - `bridge::tool`     -- the Tool contract and error taxonomy
//! - `bridge::registry` -- name -> tool lookup, built once at startup
//! - `bridge::gate`     -- main-thread execution gate for host mutations
//! - `bridge::dispatch` -- per-frame request dispatcher
//! - `bridge::server`   -- WebSocket accept loop and connection manager
//! - `host`             -- in-memory reference scene graph
//! - `tools`            -- bundled scene tools built on the gate

pub mod bridge;
pub mod config;
pub mod host;
pub mod logging;
pub mod tools;

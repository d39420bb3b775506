//! The message bridge core: codec, tool contract, registry, main-thread
//! gate, dispatcher, and the WebSocket connection manager.
//!
//! Data flow for one request:
//! connection read loop -> `protocol::decode` -> `Dispatcher::dispatch_frame`
//! (registry lookup -> tool execute, async tools typically via the gate) ->
//! `protocol::encode` -> connection manager -> originating connection.

pub mod dispatch;
pub mod gate;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod tool;

pub use dispatch::Dispatcher;
pub use gate::{gate, GateError, GateRunner, MainThreadGate};
pub use protocol::{Envelope, Request, Response};
pub use registry::{ToolDescriptor, ToolRegistry};
pub use server::{BridgeServer, BridgeStats, ConnectionManager};
pub use tool::{Completion, Tool, ToolError, ToolResult};

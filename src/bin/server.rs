//! Standalone bridge server binary.
//!
//! Owns the reference scene graph on a dedicated host thread (the gate
//! runner), registers the bundled tools, and serves WebSocket clients until
//! interrupted.
//!
//! Environment variables: see `scene_bridge::config`.

use std::sync::Arc;
use std::thread;

use anyhow::Context;
use tracing::info;

use scene_bridge::bridge::dispatch::Dispatcher;
use scene_bridge::bridge::gate;
use scene_bridge::bridge::registry::ToolRegistry;
use scene_bridge::bridge::server::{BridgeServer, ConnectionManager};
use scene_bridge::config::BridgeConfig;
use scene_bridge::host::SceneGraph;
use scene_bridge::logging;
use scene_bridge::tools;
use scene_bridge::tools::status::StatusTool;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = BridgeConfig::from_env();

    // The gate runner thread is the single owner of host state; every
    // host-mutating tool funnels through it.
    let (gate, runner) = gate::gate(SceneGraph::new("Untitled"));
    thread::spawn(move || runner.run());

    let (manager, stats_rx) = ConnectionManager::new();

    let mut registry = ToolRegistry::new();
    tools::register_scene_tools(&mut registry, gate);
    registry.register(Arc::new(StatusTool::new(stats_rx)));
    let tool_count = registry.len();

    let mut dispatcher = Dispatcher::new(Arc::new(registry));
    if let Some(timeout) = config.request_timeout() {
        dispatcher = dispatcher.with_timeout(timeout);
    }

    let server = BridgeServer::bind(&config, dispatcher, manager)
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.bind_address, config.port))?;
    info!(
        "Scene bridge ready on ws://{} ({} tools)",
        server.local_addr(),
        tool_count
    );

    tokio::select! {
        result = server.run() => result.context("Server accept loop failed")?,
        _ = tokio::signal::ctrl_c() => info!("Interrupt received, shutting down"),
    }
    Ok(())
}

//! Bundled tools.
//!
//! - `scene`  -- scene-graph manipulation over the main-thread gate
//! - `status` -- bridge diagnostics (sync, no host access)

pub mod scene;
pub mod status;

use std::sync::Arc;

use crate::bridge::gate::MainThreadGate;
use crate::bridge::registry::ToolRegistry;
use crate::host::SceneGraph;

/// Register the default scene tool set against a gate handle.
pub fn register_scene_tools(registry: &mut ToolRegistry, gate: MainThreadGate<SceneGraph>) {
    registry.register(Arc::new(scene::CreateSceneTool::new(gate.clone())));
    registry.register(Arc::new(scene::CreateObjectTool::new(gate.clone())));
    registry.register(Arc::new(scene::GetObjectTool::new(gate.clone())));
    registry.register(Arc::new(scene::UpdateObjectTool::new(gate.clone())));
    registry.register(Arc::new(scene::AddComponentTool::new(gate.clone())));
    registry.register(Arc::new(scene::UpdateComponentTool::new(gate.clone())));
    registry.register(Arc::new(scene::SelectObjectTool::new(gate.clone())));
    registry.register(Arc::new(scene::GetSceneInfoTool::new(gate)));
}

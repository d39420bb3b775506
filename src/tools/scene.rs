//! Scene-graph tools.
//!
//! Every tool here mutates or reads host state, so each one is async and
//! funnels its body through the main-thread gate; the completion resolves
//! when the host context has run the closure. Parameter validation follows
//! the shared taxonomy: missing parameter -> validation_error, missing
//! target -> not_found, host rejection -> an operation-specific kind.

use serde_json::{json, Map, Value};

use crate::bridge::gate::MainThreadGate;
use crate::bridge::protocol::Envelope;
use crate::bridge::tool::{optional_bool, optional_str, require_str, Completion, Tool, ToolError, ToolResult};
use crate::host::{SceneError, SceneGraph};

// ---------------------------------------------------------------------------
// Shared plumbing
// ---------------------------------------------------------------------------

/// Run `job` on the gate and resolve `completion` with its outcome. A gate
/// failure (runner gone, job panicked) resolves as an internal error rather
/// than leaving the caller hanging.
fn spawn_on_gate<F>(gate: &MainThreadGate<SceneGraph>, completion: Completion, job: F)
where
    F: FnOnce(&mut SceneGraph) -> ToolResult + Send + 'static,
{
    let pending = gate.run_on_main(job);
    tokio::spawn(async move {
        let result = match pending.await {
            Ok(result) => result,
            Err(e) => Err(ToolError::internal(e.to_string())),
        };
        let _ = completion.send(result);
    });
}

/// Resolve the object a request targets: numeric `id` first, then `object`
/// or `name` looked up by name.
fn resolve_target(scene: &SceneGraph, params: &Value) -> Result<u64, ToolError> {
    if let Some(id) = params.get("id").and_then(Value::as_u64) {
        if scene.contains(id) {
            return Ok(id);
        }
        return Err(ToolError::not_found(format!("Object not found: #{}", id)));
    }
    for field in ["object", "name"] {
        if let Some(name) = params.get(field).and_then(Value::as_str) {
            return scene
                .find_by_name(name)
                .ok_or_else(|| ToolError::not_found(format!("Object not found: {}", name)));
        }
    }
    Err(ToolError::validation(
        "Required parameter 'name' or 'id' is missing",
    ))
}

/// Map a host failure onto the wire taxonomy: not-found stays not_found,
/// anything else carries the operation-specific kind.
fn host_error(kind: &str, e: SceneError) -> ToolError {
    match e {
        SceneError::ObjectNotFound(_) | SceneError::ComponentNotFound { .. } => {
            ToolError::not_found(e.to_string())
        }
        SceneError::Invalid(message) => ToolError::operation(kind, message),
    }
}

/// Merge an `{x, y, z}` object (partial, per-axis) or a three-number array
/// over the current axis values.
fn merge_axes(field: &str, value: &Value, current: [f64; 3]) -> Result<[f64; 3], ToolError> {
    let bad_axis = |axis: &str| {
        ToolError::validation(format!("Parameter '{}.{}' must be a number", field, axis))
    };
    match value {
        Value::Object(map) => {
            let mut out = current;
            for (i, axis) in ["x", "y", "z"].iter().enumerate() {
                if let Some(v) = map.get(*axis) {
                    out[i] = v.as_f64().ok_or_else(|| bad_axis(axis))?;
                }
            }
            Ok(out)
        }
        Value::Array(items) if items.len() == 3 => {
            let mut out = [0.0; 3];
            for (slot, item) in out.iter_mut().zip(items) {
                *slot = item.as_f64().ok_or_else(|| {
                    ToolError::validation(format!(
                        "Parameter '{}' must contain only numbers",
                        field
                    ))
                })?;
            }
            Ok(out)
        }
        _ => Err(ToolError::validation(format!(
            "Parameter '{}' must be an {{x,y,z}} object or a three-number array",
            field
        ))),
    }
}

fn properties_map(params: &Value, field: &str) -> Result<Map<String, Value>, ToolError> {
    match params.get(field) {
        None => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(ToolError::validation(format!(
            "Parameter '{}' must be an object",
            field
        ))),
    }
}

/// Primitive shapes an object can be created as.
const PRIMITIVES: &[&str] = &["cube", "sphere", "capsule", "cylinder", "plane", "quad"];

// ---------------------------------------------------------------------------
// scene.create_scene
// ---------------------------------------------------------------------------

pub struct CreateSceneTool {
    gate: MainThreadGate<SceneGraph>,
}

impl CreateSceneTool {
    pub fn new(gate: MainThreadGate<SceneGraph>) -> Self {
        Self { gate }
    }
}

impl Tool for CreateSceneTool {
    fn name(&self) -> &str {
        "scene.create_scene"
    }
    fn description(&self) -> &str {
        "Replaces the current scene with a fresh, empty one"
    }
    fn is_async(&self) -> bool {
        true
    }
    fn execute_async(&self, params: Value, completion: Completion) {
        let name = optional_str(&params, "name").unwrap_or_else(|| "NewScene".into());
        spawn_on_gate(&self.gate, completion, move |scene| {
            scene.reset(&name);
            Ok(Envelope::with_data(
                format!("Scene '{}' created", name),
                json!({ "sceneName": name }),
            ))
        });
    }
}

// ---------------------------------------------------------------------------
// scene.create_object
// ---------------------------------------------------------------------------

pub struct CreateObjectTool {
    gate: MainThreadGate<SceneGraph>,
}

impl CreateObjectTool {
    pub fn new(gate: MainThreadGate<SceneGraph>) -> Self {
        Self { gate }
    }
}

impl Tool for CreateObjectTool {
    fn name(&self) -> &str {
        "scene.create_object"
    }
    fn description(&self) -> &str {
        "Creates an object, optionally primitive-shaped, parented, or at a hierarchical path"
    }
    fn is_async(&self) -> bool {
        true
    }
    fn execute_async(&self, params: Value, completion: Completion) {
        let name = optional_str(&params, "name").unwrap_or_else(|| "Object".into());
        let path = optional_str(&params, "path");
        let parent = optional_str(&params, "parent");
        let primitive = optional_str(&params, "primitive").map(|p| p.to_lowercase());

        if let Some(ref p) = primitive {
            if !PRIMITIVES.contains(&p.as_str()) {
                let _ = completion.send(Err(ToolError::validation(format!(
                    "Unknown primitive '{}'; expected one of {}",
                    p,
                    PRIMITIVES.join(", ")
                ))));
                return;
            }
        }

        spawn_on_gate(&self.gate, completion, move |scene| {
            let id = match path {
                // Hierarchical creation: missing intermediate objects are
                // created along the way.
                Some(path) => scene
                    .find_or_create_path(&path)
                    .map_err(|e| host_error("creation_error", e))?,
                None => {
                    let parent_id = match parent {
                        Some(parent_name) => Some(scene.find_by_name(&parent_name).ok_or_else(
                            || ToolError::not_found(format!("Object not found: {}", parent_name)),
                        )?),
                        None => None,
                    };
                    scene
                        .create_object(&name, parent_id)
                        .map_err(|e| host_error("creation_error", e))?
                }
            };
            if let Some(shape) = primitive {
                let mut props = Map::new();
                props.insert("primitive".into(), json!(shape));
                scene
                    .add_component(id, "Mesh", props)
                    .map_err(|e| host_error("creation_error", e))?;
            }
            let created = scene.object(id).map_err(|e| host_error("creation_error", e))?;
            Ok(Envelope::with_data(
                format!("Created object '{}'", created.name),
                json!({ "objectId": id, "name": created.name }),
            ))
        });
    }
}

// ---------------------------------------------------------------------------
// scene.get_object
// ---------------------------------------------------------------------------

pub struct GetObjectTool {
    gate: MainThreadGate<SceneGraph>,
}

impl GetObjectTool {
    pub fn new(gate: MainThreadGate<SceneGraph>) -> Self {
        Self { gate }
    }
}

impl Tool for GetObjectTool {
    fn name(&self) -> &str {
        "scene.get_object"
    }
    fn description(&self) -> &str {
        "Returns full info for one object: transform, components, children"
    }
    fn is_async(&self) -> bool {
        true
    }
    fn execute_async(&self, params: Value, completion: Completion) {
        spawn_on_gate(&self.gate, completion, move |scene| {
            let id = resolve_target(scene, &params)?;
            let info = scene.object_info(id).map_err(|e| host_error("query_error", e))?;
            let name = info["name"].as_str().unwrap_or_default().to_string();
            Ok(Envelope::with_data(
                format!("Retrieved object '{}'", name),
                info,
            ))
        });
    }
}

// ---------------------------------------------------------------------------
// scene.update_object
// ---------------------------------------------------------------------------

pub struct UpdateObjectTool {
    gate: MainThreadGate<SceneGraph>,
}

impl UpdateObjectTool {
    pub fn new(gate: MainThreadGate<SceneGraph>) -> Self {
        Self { gate }
    }
}

impl Tool for UpdateObjectTool {
    fn name(&self) -> &str {
        "scene.update_object"
    }
    fn description(&self) -> &str {
        "Applies partial updates to an object: rename, activate, reparent, transform"
    }
    fn is_async(&self) -> bool {
        true
    }
    fn execute_async(&self, params: Value, completion: Completion) {
        spawn_on_gate(&self.gate, completion, move |scene| {
            let id = resolve_target(scene, &params)?;

            if let Some(new_name) = optional_str(&params, "newName") {
                scene
                    .rename(id, &new_name)
                    .map_err(|e| host_error("update_error", e))?;
            }
            if let Some(active) = optional_bool(&params, "active") {
                scene
                    .set_active(id, active)
                    .map_err(|e| host_error("update_error", e))?;
            }
            if let Some(parent_value) = params.get("parent") {
                let new_parent = match parent_value {
                    Value::Null => None,
                    Value::String(parent_name) => {
                        Some(scene.find_by_name(parent_name).ok_or_else(|| {
                            ToolError::not_found(format!("Object not found: {}", parent_name))
                        })?)
                    }
                    _ => {
                        return Err(ToolError::validation(
                            "Parameter 'parent' must be an object name or null",
                        ))
                    }
                };
                scene
                    .reparent(id, new_parent)
                    .map_err(|e| host_error("update_error", e))?;
            }

            let current = scene.object(id).map_err(|e| host_error("update_error", e))?;
            let mut transform = current.transform.clone();
            let mut transform_changed = false;
            if let Some(value) = params.get("position") {
                transform.position = merge_axes("position", value, transform.position)?;
                transform_changed = true;
            }
            if let Some(value) = params.get("rotation") {
                transform.rotation = merge_axes("rotation", value, transform.rotation)?;
                transform_changed = true;
            }
            if let Some(value) = params.get("scale") {
                transform.scale = merge_axes("scale", value, transform.scale)?;
                transform_changed = true;
            }
            if transform_changed {
                scene
                    .set_transform(id, transform)
                    .map_err(|e| host_error("update_error", e))?;
            }

            let info = scene.object_info(id).map_err(|e| host_error("update_error", e))?;
            let name = info["name"].as_str().unwrap_or_default().to_string();
            Ok(Envelope::with_data(
                format!("Updated object '{}'", name),
                info,
            ))
        });
    }
}

// ---------------------------------------------------------------------------
// scene.add_component
// ---------------------------------------------------------------------------

pub struct AddComponentTool {
    gate: MainThreadGate<SceneGraph>,
}

impl AddComponentTool {
    pub fn new(gate: MainThreadGate<SceneGraph>) -> Self {
        Self { gate }
    }
}

impl Tool for AddComponentTool {
    fn name(&self) -> &str {
        "scene.add_component"
    }
    fn description(&self) -> &str {
        "Attaches a typed component, with optional initial properties"
    }
    fn is_async(&self) -> bool {
        true
    }
    fn execute_async(&self, params: Value, completion: Completion) {
        let type_name = match require_str(&params, "type") {
            Ok(t) => t,
            Err(e) => {
                let _ = completion.send(Err(e));
                return;
            }
        };
        let properties = match properties_map(&params, "properties") {
            Ok(p) => p,
            Err(e) => {
                let _ = completion.send(Err(e));
                return;
            }
        };
        spawn_on_gate(&self.gate, completion, move |scene| {
            let id = resolve_target(scene, &params)?;
            scene
                .add_component(id, &type_name, properties)
                .map_err(|e| host_error("component_error", e))?;
            let name = scene.object(id).map_err(|e| host_error("component_error", e))?.name.clone();
            Ok(Envelope::with_data(
                format!("Added component '{}' to '{}'", type_name, name),
                json!({ "objectId": id, "type": type_name }),
            ))
        });
    }
}

// ---------------------------------------------------------------------------
// scene.update_component
// ---------------------------------------------------------------------------

pub struct UpdateComponentTool {
    gate: MainThreadGate<SceneGraph>,
}

impl UpdateComponentTool {
    pub fn new(gate: MainThreadGate<SceneGraph>) -> Self {
        Self { gate }
    }
}

impl Tool for UpdateComponentTool {
    fn name(&self) -> &str {
        "scene.update_component"
    }
    fn description(&self) -> &str {
        "Merges properties into an existing component on an object"
    }
    fn is_async(&self) -> bool {
        true
    }
    fn execute_async(&self, params: Value, completion: Completion) {
        let type_name = match require_str(&params, "type") {
            Ok(t) => t,
            Err(e) => {
                let _ = completion.send(Err(e));
                return;
            }
        };
        let properties = match params.get("properties") {
            Some(Value::Object(map)) => map.clone(),
            _ => {
                let _ = completion.send(Err(ToolError::validation(
                    "Required parameter 'properties' is missing or not an object",
                )));
                return;
            }
        };
        spawn_on_gate(&self.gate, completion, move |scene| {
            let id = resolve_target(scene, &params)?;
            scene
                .update_component(id, &type_name, properties)
                .map_err(|e| host_error("component_error", e))?;
            Ok(Envelope::with_data(
                format!("Updated component '{}'", type_name),
                json!({ "objectId": id, "type": type_name }),
            ))
        });
    }
}

// ---------------------------------------------------------------------------
// scene.select_object
// ---------------------------------------------------------------------------

pub struct SelectObjectTool {
    gate: MainThreadGate<SceneGraph>,
}

impl SelectObjectTool {
    pub fn new(gate: MainThreadGate<SceneGraph>) -> Self {
        Self { gate }
    }
}

impl Tool for SelectObjectTool {
    fn name(&self) -> &str {
        "scene.select_object"
    }
    fn description(&self) -> &str {
        "Sets the active selection to the given object"
    }
    fn is_async(&self) -> bool {
        true
    }
    fn execute_async(&self, params: Value, completion: Completion) {
        spawn_on_gate(&self.gate, completion, move |scene| {
            let id = resolve_target(scene, &params)?;
            scene.select(id).map_err(|e| host_error("selection_error", e))?;
            let name = scene.object(id).map_err(|e| host_error("selection_error", e))?.name.clone();
            Ok(Envelope::with_data(
                format!("Selected object '{}'", name),
                json!({ "objectId": id, "name": name }),
            ))
        });
    }
}

// ---------------------------------------------------------------------------
// scene.get_scene_info
// ---------------------------------------------------------------------------

pub struct GetSceneInfoTool {
    gate: MainThreadGate<SceneGraph>,
}

impl GetSceneInfoTool {
    pub fn new(gate: MainThreadGate<SceneGraph>) -> Self {
        Self { gate }
    }
}

impl Tool for GetSceneInfoTool {
    fn name(&self) -> &str {
        "scene.get_scene_info"
    }
    fn description(&self) -> &str {
        "Returns the scene name, dirty flag, and root object summaries"
    }
    fn is_async(&self) -> bool {
        true
    }
    fn execute_async(&self, _params: Value, completion: Completion) {
        spawn_on_gate(&self.gate, completion, move |scene| {
            let info = scene.scene_info();
            Ok(Envelope::with_data(
                format!("Scene info for '{}'", scene.scene_name()),
                info,
            ))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::gate;
    use crate::host::Transform;
    use tokio::sync::oneshot;

    /// Run one tool invocation against a fresh scene and return the result.
    async fn invoke<T: Tool>(tool_factory: impl FnOnce(MainThreadGate<SceneGraph>) -> T, seed: impl FnOnce(&mut SceneGraph), params: Value) -> ToolResult {
        let (gate, mut runner) = gate::gate(SceneGraph::new("Main"));
        seed(runner.host_mut());
        tokio::spawn(runner.run_async());
        let tool = tool_factory(gate);
        let (tx, rx) = oneshot::channel();
        tool.execute_async(params, tx);
        rx.await.expect("completion dropped")
    }

    #[tokio::test]
    async fn create_object_defaults_name() {
        let result = invoke(CreateObjectTool::new, |_| {}, json!({})).await.unwrap();
        assert!(result.success);
        assert_eq!(result.data.unwrap()["name"], "Object");
    }

    #[tokio::test]
    async fn create_object_under_missing_parent_is_not_found() {
        let err = invoke(
            CreateObjectTool::new,
            |_| {},
            json!({"name": "Child", "parent": "Ghost"}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "not_found");
        assert!(err.to_string().contains("Ghost"));
    }

    #[tokio::test]
    async fn create_object_rejects_unknown_primitive() {
        let err = invoke(
            CreateObjectTool::new,
            |_| {},
            json!({"name": "Blob", "primitive": "dodecahedron"}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn create_object_with_primitive_attaches_mesh() {
        let result = invoke(
            CreateObjectTool::new,
            |_| {},
            json!({"name": "Ball", "primitive": "Sphere"}),
        )
        .await
        .unwrap();
        assert!(result.success);
        assert!(result.message.contains("Ball"));
    }

    #[tokio::test]
    async fn create_object_at_path_builds_hierarchy() {
        let result = invoke(
            CreateObjectTool::new,
            |_| {},
            json!({"path": "Canvas/Panel/Button"}),
        )
        .await
        .unwrap();
        assert_eq!(result.data.unwrap()["name"], "Button");
    }

    #[tokio::test]
    async fn get_object_requires_a_target() {
        let err = invoke(GetObjectTool::new, |_| {}, json!({})).await.unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn get_object_reports_missing_target() {
        let err = invoke(GetObjectTool::new, |_| {}, json!({"name": "Nobody"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn update_object_merges_partial_position() {
        let result = invoke(
            UpdateObjectTool::new,
            |scene| {
                let id = scene.create_object("Player", None).unwrap();
                scene
                    .set_transform(
                        id,
                        Transform {
                            position: [1.0, 2.0, 3.0],
                            ..Default::default()
                        },
                    )
                    .unwrap();
            },
            json!({"name": "Player", "position": {"y": 9.0}}),
        )
        .await
        .unwrap();
        let data = result.data.unwrap();
        assert_eq!(data["transform"]["position"], json!([1.0, 9.0, 3.0]));
    }

    #[tokio::test]
    async fn update_object_renames_and_reparents() {
        let result = invoke(
            UpdateObjectTool::new,
            |scene| {
                scene.create_object("Root", None).unwrap();
                scene.create_object("Player", None).unwrap();
            },
            json!({"name": "Player", "newName": "Hero", "parent": "Root"}),
        )
        .await
        .unwrap();
        let data = result.data.unwrap();
        assert_eq!(data["name"], "Hero");
        assert_eq!(data["parent"], 1);
    }

    #[tokio::test]
    async fn update_object_rejects_bad_axes() {
        let err = invoke(
            UpdateObjectTool::new,
            |scene| {
                scene.create_object("Player", None).unwrap();
            },
            json!({"name": "Player", "scale": "big"}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
    }

    #[tokio::test]
    async fn add_component_requires_type() {
        let err = invoke(
            AddComponentTool::new,
            |scene| {
                scene.create_object("Cube", None).unwrap();
            },
            json!({"object": "Cube"}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "validation_error");
        assert!(err.to_string().contains("'type'"));
    }

    #[tokio::test]
    async fn update_component_on_missing_component_is_not_found() {
        let err = invoke(
            UpdateComponentTool::new,
            |scene| {
                scene.create_object("Cube", None).unwrap();
            },
            json!({"object": "Cube", "type": "Rigidbody", "properties": {"mass": 2}}),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn add_then_update_component_round_trip() {
        let (gate, runner) = gate::gate(SceneGraph::new("Main"));
        tokio::spawn(runner.run_async());

        let add = AddComponentTool::new(gate.clone());
        let (tx, rx) = oneshot::channel();
        add.execute_async(
            json!({"object": "Lamp", "type": "Light", "properties": {"intensity": 1.0}}),
            tx,
        );
        // Object does not exist yet.
        assert_eq!(rx.await.unwrap().unwrap_err().kind(), "not_found");

        let create = CreateObjectTool::new(gate.clone());
        let (tx, rx) = oneshot::channel();
        create.execute_async(json!({"name": "Lamp"}), tx);
        rx.await.unwrap().unwrap();

        let (tx, rx) = oneshot::channel();
        add.execute_async(
            json!({"object": "Lamp", "type": "Light", "properties": {"intensity": 1.0}}),
            tx,
        );
        rx.await.unwrap().unwrap();

        let update = UpdateComponentTool::new(gate.clone());
        let (tx, rx) = oneshot::channel();
        update.execute_async(
            json!({"object": "Lamp", "type": "Light", "properties": {"intensity": 0.25}}),
            tx,
        );
        let result = rx.await.unwrap().unwrap();
        assert!(result.success);

        let get = GetObjectTool::new(gate);
        let (tx, rx) = oneshot::channel();
        get.execute_async(json!({"name": "Lamp"}), tx);
        let info = rx.await.unwrap().unwrap().data.unwrap();
        assert_eq!(info["components"][0]["properties"]["intensity"], json!(0.25));
    }

    #[tokio::test]
    async fn select_object_updates_selection() {
        let result = invoke(
            SelectObjectTool::new,
            |scene| {
                scene.create_object("Camera", None).unwrap();
            },
            json!({"name": "Camera"}),
        )
        .await
        .unwrap();
        assert_eq!(result.data.unwrap()["name"], "Camera");
    }

    #[tokio::test]
    async fn create_scene_resets_state() {
        let result = invoke(
            CreateSceneTool::new,
            |scene| {
                scene.create_object("Leftover", None).unwrap();
            },
            json!({"name": "Fresh"}),
        )
        .await
        .unwrap();
        assert_eq!(result.data.unwrap()["sceneName"], "Fresh");
    }
}

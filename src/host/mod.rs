//! In-memory reference scene graph.
//!
//! The bridge core is host-agnostic; this module is the host it ships with:
//! a single active scene holding a hierarchy of named objects, each with a
//! transform and a list of typed components. The bundled scene tools mutate
//! it exclusively through the main-thread gate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Host-level failures, mapped onto the wire taxonomy by the tools.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("Object not found: {0}")]
    ObjectNotFound(String),
    #[error("Component '{component}' not found on '{object}'")]
    ComponentNotFound { object: String, component: String },
    #[error("{0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

/// A typed component attached to an object, carrying free-form properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub type_name: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: u64,
    pub name: String,
    pub parent: Option<u64>,
    pub children: Vec<u64>,
    pub active: bool,
    pub transform: Transform,
    pub components: Vec<Component>,
}

impl SceneObject {
    fn new(id: u64, name: impl Into<String>, parent: Option<u64>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            children: Vec::new(),
            active: true,
            transform: Transform::default(),
            components: Vec::new(),
        }
    }
}

/// The active scene: an object table plus root ordering, a selection, and a
/// dirty flag set by every mutation.
#[derive(Debug)]
pub struct SceneGraph {
    scene_name: String,
    next_id: u64,
    objects: HashMap<u64, SceneObject>,
    roots: Vec<u64>,
    selection: Option<u64>,
    dirty: bool,
}

impl SceneGraph {
    pub fn new(scene_name: impl Into<String>) -> Self {
        Self {
            scene_name: scene_name.into(),
            next_id: 1,
            objects: HashMap::new(),
            roots: Vec::new(),
            selection: None,
            dirty: false,
        }
    }

    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn selection(&self) -> Option<u64> {
        self.selection
    }

    pub fn contains(&self, id: u64) -> bool {
        self.objects.contains_key(&id)
    }

    // -----------------------------------------------------------------------
    // Scene lifecycle
    // -----------------------------------------------------------------------

    /// Replace the current scene with an empty one.
    pub fn reset(&mut self, scene_name: impl Into<String>) {
        self.scene_name = scene_name.into();
        self.objects.clear();
        self.roots.clear();
        self.selection = None;
        self.dirty = false;
    }

    // -----------------------------------------------------------------------
    // Object creation and lookup
    // -----------------------------------------------------------------------

    /// Create an object, optionally under a parent.
    pub fn create_object(
        &mut self,
        name: &str,
        parent: Option<u64>,
    ) -> Result<u64, SceneError> {
        if name.is_empty() {
            return Err(SceneError::Invalid("Object name cannot be empty".into()));
        }
        if let Some(parent_id) = parent {
            if !self.objects.contains_key(&parent_id) {
                return Err(SceneError::ObjectNotFound(format!("#{}", parent_id)));
            }
        }
        let id = self.allocate_id();
        self.objects.insert(id, SceneObject::new(id, name, parent));
        match parent {
            Some(parent_id) => {
                if let Some(p) = self.objects.get_mut(&parent_id) {
                    p.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.dirty = true;
        Ok(id)
    }

    /// Walk a `/`-separated path, creating missing segments along the way.
    /// Returns the id of the final segment's object.
    pub fn find_or_create_path(&mut self, path: &str) -> Result<u64, SceneError> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(SceneError::Invalid(
                "Object path cannot be empty or consist only of slashes".into(),
            ));
        }
        let mut current: Option<u64> = None;
        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(SceneError::Invalid(format!(
                    "Invalid path '{}': empty segment",
                    path
                )));
            }
            let existing = match current {
                None => self
                    .roots
                    .iter()
                    .copied()
                    .find(|id| self.objects.get(id).is_some_and(|o| o.name == segment)),
                Some(parent_id) => self
                    .objects
                    .get(&parent_id)
                    .map(|p| p.children.clone())
                    .unwrap_or_default()
                    .into_iter()
                    .find(|id| self.objects.get(id).is_some_and(|o| o.name == segment)),
            };
            let id = match existing {
                Some(id) => id,
                None => self.create_object(segment, current)?,
            };
            current = Some(id);
        }
        // The loop always runs at least once for a non-empty path.
        current.ok_or_else(|| SceneError::Invalid(format!("Invalid path '{}'", path)))
    }

    /// First object with the given name, roots first, then insertion order.
    pub fn find_by_name(&self, name: &str) -> Option<u64> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.objects.get(id).is_some_and(|o| o.name == name))
            .or_else(|| {
                let mut ids: Vec<u64> = self
                    .objects
                    .values()
                    .filter(|o| o.name == name)
                    .map(|o| o.id)
                    .collect();
                ids.sort_unstable();
                ids.first().copied()
            })
    }

    pub fn object(&self, id: u64) -> Result<&SceneObject, SceneError> {
        self.objects
            .get(&id)
            .ok_or_else(|| SceneError::ObjectNotFound(format!("#{}", id)))
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    pub fn rename(&mut self, id: u64, new_name: &str) -> Result<(), SceneError> {
        if new_name.is_empty() {
            return Err(SceneError::Invalid("Object name cannot be empty".into()));
        }
        let object = self.object_mut(id)?;
        object.name = new_name.to_string();
        self.dirty = true;
        Ok(())
    }

    pub fn set_active(&mut self, id: u64, active: bool) -> Result<(), SceneError> {
        self.object_mut(id)?.active = active;
        self.dirty = true;
        Ok(())
    }

    pub fn set_transform(&mut self, id: u64, transform: Transform) -> Result<(), SceneError> {
        self.object_mut(id)?.transform = transform;
        self.dirty = true;
        Ok(())
    }

    /// Reparent an object. `None` makes it a root. Rejects cycles.
    pub fn reparent(&mut self, id: u64, new_parent: Option<u64>) -> Result<(), SceneError> {
        self.object(id)?;
        if let Some(parent_id) = new_parent {
            self.object(parent_id)?;
            if parent_id == id || self.is_descendant(parent_id, id) {
                return Err(SceneError::Invalid(format!(
                    "Cannot parent '{}' under its own descendant",
                    self.objects[&id].name
                )));
            }
        }

        // Detach from the old location.
        let old_parent = self.objects[&id].parent;
        match old_parent {
            Some(old) => {
                if let Some(p) = self.objects.get_mut(&old) {
                    p.children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }

        // Attach to the new one.
        match new_parent {
            Some(parent_id) => {
                if let Some(p) = self.objects.get_mut(&parent_id) {
                    p.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        if let Some(o) = self.objects.get_mut(&id) {
            o.parent = new_parent;
        }
        self.dirty = true;
        Ok(())
    }

    pub fn add_component(
        &mut self,
        id: u64,
        type_name: &str,
        properties: Map<String, Value>,
    ) -> Result<(), SceneError> {
        if type_name.is_empty() {
            return Err(SceneError::Invalid("Component type cannot be empty".into()));
        }
        let object = self.object_mut(id)?;
        object.components.push(Component {
            type_name: type_name.to_string(),
            properties,
        });
        self.dirty = true;
        Ok(())
    }

    /// Merge properties into the first component of the given type.
    pub fn update_component(
        &mut self,
        id: u64,
        type_name: &str,
        properties: Map<String, Value>,
    ) -> Result<(), SceneError> {
        let name = self.object(id)?.name.clone();
        let object = self.object_mut(id)?;
        let component = object
            .components
            .iter_mut()
            .find(|c| c.type_name == type_name)
            .ok_or_else(|| SceneError::ComponentNotFound {
                object: name,
                component: type_name.to_string(),
            })?;
        for (key, value) in properties {
            component.properties.insert(key, value);
        }
        self.dirty = true;
        Ok(())
    }

    pub fn select(&mut self, id: u64) -> Result<(), SceneError> {
        self.object(id)?;
        self.selection = Some(id);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Full info for one object, children rendered as name references.
    pub fn object_info(&self, id: u64) -> Result<Value, SceneError> {
        let object = self.object(id)?;
        let children: Vec<&str> = object
            .children
            .iter()
            .filter_map(|c| self.objects.get(c).map(|o| o.name.as_str()))
            .collect();
        Ok(json!({
            "objectId": object.id,
            "name": object.name,
            "active": object.active,
            "parent": object.parent,
            "children": children,
            "transform": object.transform,
            "components": object.components,
        }))
    }

    /// Scene-level summary with root object entries.
    pub fn scene_info(&self) -> Value {
        let roots: Vec<Value> = self
            .roots
            .iter()
            .filter_map(|id| self.objects.get(id))
            .map(|o| {
                json!({
                    "objectId": o.id,
                    "name": o.name,
                    "active": o.active,
                    "childCount": o.children.len(),
                })
            })
            .collect();
        json!({
            "sceneName": self.scene_name,
            "dirty": self.dirty,
            "objectCount": self.objects.len(),
            "rootObjects": roots,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn object_mut(&mut self, id: u64) -> Result<&mut SceneObject, SceneError> {
        self.objects
            .get_mut(&id)
            .ok_or_else(|| SceneError::ObjectNotFound(format!("#{}", id)))
    }

    /// True if `candidate` sits somewhere below `ancestor`.
    fn is_descendant(&self, candidate: u64, ancestor: u64) -> bool {
        let mut stack = vec![ancestor];
        while let Some(id) = stack.pop() {
            if let Some(object) = self.objects.get(&id) {
                for child in &object.children {
                    if *child == candidate {
                        return true;
                    }
                    stack.push(*child);
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_find_objects() {
        let mut scene = SceneGraph::new("Main");
        let id = scene.create_object("Player", None).unwrap();
        assert_eq!(scene.find_by_name("Player"), Some(id));
        assert!(scene.is_dirty());
        assert_eq!(scene.object_count(), 1);
    }

    #[test]
    fn create_under_missing_parent_fails() {
        let mut scene = SceneGraph::new("Main");
        let err = scene.create_object("Child", Some(99)).unwrap_err();
        assert!(matches!(err, SceneError::ObjectNotFound(_)));
    }

    #[test]
    fn path_creation_reuses_existing_segments() {
        let mut scene = SceneGraph::new("Main");
        let button = scene.find_or_create_path("Canvas/Panel/Button").unwrap();
        assert_eq!(scene.object_count(), 3);

        // Re-walking the same path creates nothing new.
        let again = scene.find_or_create_path("Canvas/Panel/Button").unwrap();
        assert_eq!(button, again);
        assert_eq!(scene.object_count(), 3);

        // A sibling only adds the leaf.
        scene.find_or_create_path("Canvas/Panel/Label").unwrap();
        assert_eq!(scene.object_count(), 4);
    }

    #[test]
    fn path_rejects_empty_and_slash_only() {
        let mut scene = SceneGraph::new("Main");
        assert!(scene.find_or_create_path("").is_err());
        assert!(scene.find_or_create_path("///").is_err());
        assert!(scene.find_or_create_path("a//b").is_err());
    }

    #[test]
    fn reparent_moves_between_roots_and_children() {
        let mut scene = SceneGraph::new("Main");
        let parent = scene.create_object("Parent", None).unwrap();
        let child = scene.create_object("Child", None).unwrap();

        scene.reparent(child, Some(parent)).unwrap();
        assert_eq!(scene.object(child).unwrap().parent, Some(parent));
        assert_eq!(scene.object(parent).unwrap().children, vec![child]);

        scene.reparent(child, None).unwrap();
        assert_eq!(scene.object(child).unwrap().parent, None);
        assert!(scene.object(parent).unwrap().children.is_empty());
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut scene = SceneGraph::new("Main");
        let a = scene.create_object("A", None).unwrap();
        let b = scene.create_object("B", Some(a)).unwrap();
        let c = scene.create_object("C", Some(b)).unwrap();

        assert!(scene.reparent(a, Some(c)).is_err());
        assert!(scene.reparent(a, Some(a)).is_err());
    }

    #[test]
    fn component_update_merges_properties() {
        let mut scene = SceneGraph::new("Main");
        let id = scene.create_object("Light", None).unwrap();

        let mut props = Map::new();
        props.insert("intensity".into(), json!(1.0));
        scene.add_component(id, "Light", props).unwrap();

        let mut update = Map::new();
        update.insert("intensity".into(), json!(0.5));
        update.insert("color".into(), json!("#ffffff"));
        scene.update_component(id, "Light", update).unwrap();

        let object = scene.object(id).unwrap();
        assert_eq!(object.components[0].properties["intensity"], json!(0.5));
        assert_eq!(object.components[0].properties["color"], json!("#ffffff"));
    }

    #[test]
    fn update_missing_component_reports_both_names() {
        let mut scene = SceneGraph::new("Main");
        let id = scene.create_object("Cube", None).unwrap();
        let err = scene.update_component(id, "Rigidbody", Map::new()).unwrap_err();
        assert_eq!(
            err,
            SceneError::ComponentNotFound {
                object: "Cube".into(),
                component: "Rigidbody".into(),
            }
        );
    }

    #[test]
    fn reset_clears_everything() {
        let mut scene = SceneGraph::new("Main");
        let id = scene.create_object("Player", None).unwrap();
        scene.select(id).unwrap();

        scene.reset("Fresh");
        assert_eq!(scene.scene_name(), "Fresh");
        assert_eq!(scene.object_count(), 0);
        assert_eq!(scene.selection(), None);
        assert!(!scene.is_dirty());
    }

    #[test]
    fn scene_info_lists_roots_only() {
        let mut scene = SceneGraph::new("Main");
        let parent = scene.create_object("Parent", None).unwrap();
        scene.create_object("Child", Some(parent)).unwrap();

        let info = scene.scene_info();
        assert_eq!(info["sceneName"], "Main");
        assert_eq!(info["objectCount"], 2);
        assert_eq!(info["rootObjects"].as_array().unwrap().len(), 1);
        assert_eq!(info["rootObjects"][0]["childCount"], 1);
    }
}

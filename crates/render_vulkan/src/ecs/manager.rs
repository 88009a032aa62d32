//! Name-keyed game object registry

use std::collections::HashMap;

use crate::ecs::GameObject;
use crate::render::vulkan::VulkanResult;
use crate::render::DrawContext;

/// Game objects by name, updated and rendered in registration order
#[derive(Default)]
pub struct GameObjectManager {
    objects: HashMap<String, GameObject>,
    order: Vec<String>,
}

impl GameObjectManager {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `object` under its name, returning the cleaned-up object it replaced
    pub fn register(&mut self, object: GameObject) -> Option<GameObject> {
        let name = object.name().to_string();
        let previous = self.objects.insert(name.clone(), object);

        match previous {
            Some(mut previous) => {
                log::warn!("Game object '{name}' was already registered and has been replaced");
                previous.cleanup();
                Some(previous)
            }
            None => {
                log::debug!("Registered game object '{name}'");
                self.order.push(name);
                None
            }
        }
    }

    /// Remove and clean up `name`
    pub fn unregister(&mut self, name: &str) -> Option<GameObject> {
        let mut object = self.objects.remove(name)?;
        object.cleanup();
        self.order.retain(|existing| existing != name);
        Some(object)
    }

    /// Object named `name`
    pub fn get(&self, name: &str) -> Option<&GameObject> {
        self.objects.get(name)
    }

    /// Mutable object named `name`
    pub fn get_mut(&mut self, name: &str) -> Option<&mut GameObject> {
        self.objects.get_mut(name)
    }

    /// Names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of registered objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the scene is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Update every object
    pub fn update(&mut self, delta_time: f32) {
        for name in &self.order {
            if let Some(object) = self.objects.get_mut(name) {
                object.update(delta_time);
            }
        }
    }

    /// Render every object into the open render pass
    pub fn render(&mut self, ctx: &DrawContext) -> VulkanResult<()> {
        for name in &self.order {
            if let Some(object) = self.objects.get_mut(name) {
                object.render(ctx)?;
            }
        }
        Ok(())
    }

    /// Clean up and remove every object
    pub fn cleanup(&mut self) {
        for name in self.order.drain(..) {
            if let Some(mut object) = self.objects.remove(&name) {
                object.cleanup();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Component, Transform};
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;
    use std::any::Any;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Drift;

    impl Component for Drift {
        fn update(&mut self, transform: &mut Transform, delta_time: f32) {
            transform.translate(Vec3::new(delta_time, 0.0, 0.0));
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct CleanupCounter(Rc<Cell<u32>>);

    impl Component for CleanupCounter {
        fn cleanup(&mut self) {
            self.0.set(self.0.get() + 1);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn counted(name: &str, counter: &Rc<Cell<u32>>) -> GameObject {
        let mut object = GameObject::new(name);
        object.add_component(CleanupCounter(Rc::clone(counter)));
        object
    }

    #[test]
    fn test_register_and_lookup() {
        let mut scene = GameObjectManager::new();
        assert!(scene.register(GameObject::new("b")).is_none());
        assert!(scene.register(GameObject::new("a")).is_none());

        assert_eq!(scene.len(), 2);
        assert!(scene.get("a").is_some());
        assert!(scene.get("missing").is_none());
        assert_eq!(scene.names().collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_register_same_name_replaces() {
        let counter = Rc::new(Cell::new(0));
        let mut scene = GameObjectManager::new();
        scene.register(counted("gameObject", &counter));

        let previous = scene.register(GameObject::new("gameObject"));

        assert!(previous.is_some());
        assert_eq!(counter.get(), 1);
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.names().count(), 1);
    }

    #[test]
    fn test_update_reaches_every_object() {
        let mut scene = GameObjectManager::new();
        for name in ["a", "b"] {
            let mut object = GameObject::new(name);
            object.add_component(Drift);
            scene.register(object);
        }

        scene.update(0.25);

        for name in ["a", "b"] {
            assert_relative_eq!(scene.get(name).unwrap().transform().position().x, 0.25);
        }
    }

    #[test]
    fn test_unregister_cleans_up() {
        let counter = Rc::new(Cell::new(0));
        let mut scene = GameObjectManager::new();
        scene.register(counted("gameObject", &counter));

        assert!(scene.unregister("gameObject").is_some());
        assert!(scene.unregister("gameObject").is_none());
        assert_eq!(counter.get(), 1);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_cleanup_empties_scene() {
        let counter = Rc::new(Cell::new(0));
        let mut scene = GameObjectManager::new();
        scene.register(counted("a", &counter));
        scene.register(counted("b", &counter));

        scene.cleanup();

        assert_eq!(counter.get(), 2);
        assert!(scene.is_empty());
        assert_eq!(scene.names().count(), 0);
    }
}

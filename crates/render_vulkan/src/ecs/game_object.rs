//! Game objects

use std::any::TypeId;
use std::collections::HashMap;

use crate::ecs::{Component, Transform};
use crate::render::vulkan::VulkanResult;
use crate::render::DrawContext;

/// Named transform with at most one component per type
pub struct GameObject {
    name: String,
    transform: Transform,
    components: HashMap<TypeId, Box<dyn Component>>,
    order: Vec<TypeId>,
}

impl GameObject {
    /// Create an object at the origin with no components
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            components: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Object name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Object transform
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable object transform
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Initialize and attach `component`, replacing any component of the same type
    pub fn add_component<C: Component>(&mut self, mut component: C) {
        component.initialize(&mut self.transform);

        let id = TypeId::of::<C>();
        if let Some(mut previous) = self.components.insert(id, Box::new(component)) {
            log::warn!(
                "Game object '{}' already had a {}; replacing it",
                self.name,
                std::any::type_name::<C>()
            );
            previous.cleanup();
        } else {
            self.order.push(id);
        }
    }

    /// Component of type `C`
    pub fn get_component<C: Component>(&self) -> Option<&C> {
        self.components
            .get(&TypeId::of::<C>())
            .and_then(|component| component.as_any().downcast_ref::<C>())
    }

    /// Mutable component of type `C`
    pub fn get_component_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components
            .get_mut(&TypeId::of::<C>())
            .and_then(|component| component.as_any_mut().downcast_mut::<C>())
    }

    /// Whether a component of type `C` is attached
    pub fn has_component<C: Component>(&self) -> bool {
        self.components.contains_key(&TypeId::of::<C>())
    }

    /// Clean up and detach the component of type `C`; false if there was none
    pub fn remove_component<C: Component>(&mut self) -> bool {
        let id = TypeId::of::<C>();
        let Some(mut component) = self.components.remove(&id) else {
            return false;
        };
        component.cleanup();
        self.order.retain(|&existing| existing != id);
        true
    }

    /// Number of attached components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Update components in the order they were added
    pub fn update(&mut self, delta_time: f32) {
        for id in &self.order {
            if let Some(component) = self.components.get_mut(id) {
                component.update(&mut self.transform, delta_time);
            }
        }
    }

    /// Render components in the order they were added
    pub fn render(&mut self, ctx: &DrawContext) -> VulkanResult<()> {
        for id in &self.order {
            if let Some(component) = self.components.get_mut(id) {
                component.render(ctx, &mut self.transform)?;
            }
        }
        Ok(())
    }

    /// Clean up and detach every component
    pub fn cleanup(&mut self) {
        for id in self.order.drain(..) {
            if let Some(mut component) = self.components.remove(&id) {
                component.cleanup();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;
    use std::any::Any;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Spinner {
        degrees_per_second: f32,
        log: Log,
    }

    impl Component for Spinner {
        fn initialize(&mut self, _transform: &mut Transform) {
            self.log.borrow_mut().push("spinner:init".to_string());
        }

        fn update(&mut self, transform: &mut Transform, delta_time: f32) {
            transform.rotate(Vec3::new(0.0, 0.0, self.degrees_per_second * delta_time));
            self.log.borrow_mut().push("spinner:update".to_string());
        }

        fn cleanup(&mut self) {
            self.log.borrow_mut().push("spinner:cleanup".to_string());
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct Tag(&'static str, Log);

    impl Component for Tag {
        fn update(&mut self, _transform: &mut Transform, _delta_time: f32) {
            self.1.borrow_mut().push(format!("tag:{}", self.0));
        }

        fn cleanup(&mut self) {
            self.1.borrow_mut().push("tag:cleanup".to_string());
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn spinner(log: &Log) -> Spinner {
        Spinner {
            degrees_per_second: 10.0,
            log: Rc::clone(log),
        }
    }

    #[test]
    fn test_add_initializes_and_get_downcasts() {
        let log = Log::default();
        let mut object = GameObject::new("gameObject");

        object.add_component(spinner(&log));

        assert!(object.has_component::<Spinner>());
        assert!(!object.has_component::<Tag>());
        assert_relative_eq!(object.get_component::<Spinner>().unwrap().degrees_per_second, 10.0);
        assert_eq!(*log.borrow(), vec!["spinner:init"]);

        object.get_component_mut::<Spinner>().unwrap().degrees_per_second = 20.0;
        assert_relative_eq!(object.get_component::<Spinner>().unwrap().degrees_per_second, 20.0);
    }

    #[test]
    fn test_update_runs_in_insertion_order_with_shared_transform() {
        let log = Log::default();
        let mut object = GameObject::new("gameObject");
        object.add_component(Tag("first", Rc::clone(&log)));
        object.add_component(spinner(&log));
        log.borrow_mut().clear();

        object.update(0.5);

        assert_eq!(*log.borrow(), vec!["tag:first", "spinner:update"]);
        assert_relative_eq!(object.transform().rotation().z, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_adding_same_type_replaces_and_cleans_up() {
        let log = Log::default();
        let mut object = GameObject::new("gameObject");
        object.add_component(Tag("old", Rc::clone(&log)));
        object.add_component(Tag("new", Rc::clone(&log)));
        log.borrow_mut().clear();

        object.update(0.0);

        assert_eq!(object.component_count(), 1);
        assert_eq!(*log.borrow(), vec!["tag:new"]);
    }

    #[test]
    fn test_remove_component() {
        let log = Log::default();
        let mut object = GameObject::new("gameObject");
        object.add_component(spinner(&log));

        assert!(object.remove_component::<Spinner>());
        assert!(!object.remove_component::<Spinner>());
        assert!(object.get_component::<Spinner>().is_none());
        assert_eq!(log.borrow().last().map(String::as_str), Some("spinner:cleanup"));

        log.borrow_mut().clear();
        object.update(1.0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_cleanup_detaches_everything() {
        let log = Log::default();
        let mut object = GameObject::new("gameObject");
        object.add_component(spinner(&log));
        object.add_component(Tag("t", Rc::clone(&log)));
        log.borrow_mut().clear();

        object.cleanup();

        assert_eq!(object.component_count(), 0);
        assert_eq!(*log.borrow(), vec!["spinner:cleanup", "tag:cleanup"]);
    }
}

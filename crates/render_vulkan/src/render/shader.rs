//! Shader programs and the name-keyed shader registry
//!
//! A shader is a vertex/fragment SPIR-V pair stored as
//! `<asset_root>/<domain>/<local_path>Vertex.spv` and `...Fragment.spv`,
//! compiled into a graphics pipeline against the swapchain render pass.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ash::vk;

use crate::render::vertex::Vertex;
use crate::render::vulkan::{
    DescriptorSetLayout, DescriptorSetLayoutBuilder, GraphicsPipeline, ShaderModule, VulkanContext, VulkanResult,
};

/// Locations of a shader's two SPIR-V binaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    /// Vertex stage binary
    pub vertex_shader_path: PathBuf,
    /// Fragment stage binary
    pub fragment_shader_path: PathBuf,
}

impl ShaderPaths {
    /// Paths for the shader at `local_path` within `domain`
    pub fn resolve(asset_root: &Path, domain: &str, local_path: &str) -> Self {
        let base = asset_root.join(domain);
        Self {
            vertex_shader_path: base.join(format!("{local_path}Vertex.spv")),
            fragment_shader_path: base.join(format!("{local_path}Fragment.spv")),
        }
    }
}

/// A compiled graphics pipeline with its descriptor set layout
///
/// Expects a uniform buffer at set 0, binding 0, read by the vertex stage.
pub struct Shader {
    pipeline: GraphicsPipeline,
    descriptor_set_layout: DescriptorSetLayout,
}

impl Shader {
    /// Load both binaries and build the pipeline for `render_pass`
    pub fn load(context: &VulkanContext, render_pass: vk::RenderPass, paths: &ShaderPaths) -> VulkanResult<Self> {
        let device = context.device();

        let vertex_module = ShaderModule::from_file(device, &paths.vertex_shader_path)?;
        let fragment_module = ShaderModule::from_file(device, &paths.fragment_shader_path)?;

        let descriptor_set_layout = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
            .build(device)?;

        let pipeline = GraphicsPipeline::new(
            device,
            render_pass,
            &vertex_module,
            &fragment_module,
            &[Vertex::binding_description()],
            &Vertex::attribute_descriptions(),
            &[descriptor_set_layout.handle()],
        )?;

        log::info!(
            "Loaded shader {} / {}",
            paths.vertex_shader_path.display(),
            paths.fragment_shader_path.display()
        );

        Ok(Self {
            pipeline,
            descriptor_set_layout,
        })
    }

    /// Pipeline handle
    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline.handle()
    }

    /// Pipeline layout handle
    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline.layout()
    }

    /// Layout of the per-object descriptor set
    pub fn descriptor_set_layout(&self) -> &DescriptorSetLayout {
        &self.descriptor_set_layout
    }
}

/// Shaders registered under a name, shared with the components drawing with them
pub struct ShaderManager<S = Shader> {
    shaders: HashMap<String, Rc<S>>,
}

impl<S> Default for ShaderManager<S> {
    fn default() -> Self {
        Self {
            shaders: HashMap::new(),
        }
    }
}

impl<S> ShaderManager<S> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `shader` as `name`, returning the shader it replaced
    pub fn register(&mut self, name: impl Into<String>, shader: S) -> Option<Rc<S>> {
        let name = name.into();
        let previous = self.shaders.insert(name.clone(), Rc::new(shader));
        if previous.is_some() {
            log::warn!("Shader '{name}' was already registered and has been replaced");
        } else {
            log::debug!("Registered shader '{name}'");
        }
        previous
    }

    /// Remove `name`; components holding it keep it alive until they drop
    pub fn unregister(&mut self, name: &str) -> Option<Rc<S>> {
        let removed = self.shaders.remove(name);
        if removed.is_none() {
            log::warn!("Shader '{name}' is not registered");
        }
        removed
    }

    /// Shared handle to `name`
    pub fn get(&self, name: &str) -> Option<Rc<S>> {
        self.shaders.get(name).cloned()
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }

    /// Number of registered shaders
    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Drop every registration
    pub fn cleanup(&mut self) {
        if !self.shaders.is_empty() {
            log::debug!("Releasing {} shaders", self.shaders.len());
        }
        self.shaders.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_paths_follow_domain_layout() {
        let paths = ShaderPaths::resolve(Path::new("Assets"), "RenderVulkan", "Shader/Default");

        assert_eq!(
            paths.vertex_shader_path,
            Path::new("Assets").join("RenderVulkan").join("Shader/DefaultVertex.spv")
        );
        assert_eq!(
            paths.fragment_shader_path,
            Path::new("Assets").join("RenderVulkan").join("Shader/DefaultFragment.spv")
        );
    }

    #[test]
    fn test_register_and_get() {
        let mut manager: ShaderManager<String> = ShaderManager::new();
        assert!(manager.is_empty());

        assert!(manager.register("default", "pipeline".to_string()).is_none());

        assert!(manager.contains("default"));
        assert_eq!(manager.get("default").as_deref().map(String::as_str), Some("pipeline"));
        assert!(manager.get("missing").is_none());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut manager: ShaderManager<String> = ShaderManager::new();
        manager.register("default", "first".to_string());

        let previous = manager.register("default", "second".to_string());

        assert_eq!(previous.as_deref().map(String::as_str), Some("first"));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get("default").as_deref().map(String::as_str), Some("second"));
    }

    #[test]
    fn test_unregister_keeps_shared_handles_alive() {
        let mut manager: ShaderManager<String> = ShaderManager::new();
        manager.register("default", "pipeline".to_string());
        let held = manager.get("default").unwrap();

        let removed = manager.unregister("default").unwrap();

        assert!(!manager.contains("default"));
        assert_eq!(Rc::strong_count(&held), 2);
        drop(removed);
        assert_eq!(held.as_str(), "pipeline");
        assert!(manager.unregister("default").is_none());
    }

    #[test]
    fn test_cleanup_empties_registry() {
        let mut manager: ShaderManager<String> = ShaderManager::new();
        manager.register("a", "1".to_string());
        manager.register("b", "2".to_string());

        manager.cleanup();

        assert!(manager.is_empty());
    }
}

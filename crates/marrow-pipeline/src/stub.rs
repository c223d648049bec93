//! In-memory scene provider
//!
//! A small hand-built scene graph implementing [`SceneProvider`],
//! backing the pass tests. Transforms can be static or keyed per
//! integer frame.

use std::cell::Cell;
use std::collections::HashMap;

use marrow_core::{Error, Result, Vec3};
use smallvec::SmallVec;

use crate::provider::{
    Capability, NodeId, PolyVertex, Polygon, SceneProvider, ShaderId, SkinBinding, Transform,
};

/// One node of the stub graph
#[derive(Debug, Clone)]
pub struct StubNode {
    pub name: String,
    pub capability: Capability,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub selected: bool,
    pub local: Transform,
    pub world: Transform,
    pub world_scale: Vec3,
    /// Local transform per integer frame; empty means static
    pub local_track: Vec<Transform>,
    /// World transform per integer frame; empty means static
    pub world_track: Vec<Transform>,
}

/// Geometry attached to a mesh node
#[derive(Debug, Clone, Default)]
pub struct StubMesh {
    pub points: Vec<Vec3>,
    pub polygons: Vec<Polygon>,
    /// Indices into the scene shader table, in slot order
    pub shaders: Vec<usize>,
    pub binding: Option<SkinBinding>,
    /// Make the shader-list query fail, to exercise the fallback
    pub fail_shader_query: bool,
}

/// One shader of the stub scene
#[derive(Debug, Clone)]
pub struct StubShader {
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub two_sided: bool,
    pub texture_size: (u32, u32),
    /// Make name/flag/size queries fail, to exercise fallbacks
    pub fail_queries: bool,
}

/// Hand-built scene graph
pub struct StubScene {
    nodes: Vec<StubNode>,
    meshes: HashMap<usize, StubMesh>,
    shaders: Vec<StubShader>,
    frame_range: (f64, f64),
    frame_rate: Option<f32>,
    time: Cell<f64>,
}

impl Default for StubScene {
    fn default() -> Self {
        Self::new()
    }
}

impl StubScene {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            meshes: HashMap::new(),
            shaders: Vec::new(),
            frame_range: (0.0, 0.0),
            frame_rate: None,
            time: Cell::new(0.0),
        }
    }

    /// Append a node; returns its index
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        capability: Capability,
        parent: Option<usize>,
    ) -> usize {
        let idx = self.nodes.len();
        if let Some(p) = parent {
            self.nodes[p].children.push(idx);
        }
        self.nodes.push(StubNode {
            name: name.into(),
            capability,
            parent,
            children: Vec::new(),
            selected: false,
            local: Transform::IDENTITY,
            world: Transform::IDENTITY,
            world_scale: Vec3::ONE,
            local_track: Vec::new(),
            world_track: Vec::new(),
        });
        idx
    }

    pub fn node_mut(&mut self, idx: usize) -> &mut StubNode {
        &mut self.nodes[idx]
    }

    /// Append a shader; returns its index
    pub fn add_shader(&mut self, name: impl Into<String>) -> usize {
        self.shaders.push(StubShader {
            name: name.into(),
            attributes: HashMap::new(),
            two_sided: false,
            texture_size: (512, 512),
            fail_queries: false,
        });
        self.shaders.len() - 1
    }

    pub fn shader_mut(&mut self, idx: usize) -> &mut StubShader {
        &mut self.shaders[idx]
    }

    /// Attach geometry to a node
    pub fn set_mesh(&mut self, node: usize, mesh: StubMesh) {
        self.meshes.insert(node, mesh);
    }

    pub fn mesh_mut(&mut self, node: usize) -> &mut StubMesh {
        self.meshes.entry(node).or_default()
    }

    pub fn set_frame_range(&mut self, start: f64, end: f64) {
        self.frame_range = (start, end);
    }

    pub fn set_frame_rate(&mut self, rate: f32) {
        self.frame_rate = Some(rate);
    }

    /// Build a triangle polygon
    pub fn triangle(
        points: [usize; 3],
        uvs: [(f32, f32); 3],
        shader_slot: Option<usize>,
    ) -> Polygon {
        let vertices: SmallVec<[PolyVertex; 4]> = points
            .iter()
            .zip(uvs.iter())
            .map(|(&point, &(u, v))| PolyVertex { point, u, v })
            .collect();
        Polygon { vertices, shader_slot, smoothing_group: Some(0) }
    }

    fn node(&self, id: NodeId) -> &StubNode {
        &self.nodes[id.0 as usize]
    }

    fn sample(track: &[Transform], fallback: Transform, time: f64) -> Transform {
        if track.is_empty() {
            return fallback;
        }
        let idx = (time.max(0.0) as usize).min(track.len() - 1);
        track[idx]
    }

    fn shader(&self, id: ShaderId) -> Result<&StubShader> {
        let shader = self
            .shaders
            .get(id.0 as usize)
            .ok_or_else(|| Error::provider_query("<shader>", "unknown shader handle"))?;
        if shader.fail_queries {
            return Err(Error::provider_query(&shader.name, "query failure injected"));
        }
        Ok(shader)
    }
}

impl SceneProvider for StubScene {
    fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| NodeId(i as u64))
            .collect()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).children.iter().map(|&c| NodeId(c as u64)).collect()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent.map(|p| NodeId(p as u64))
    }

    fn name(&self, node: NodeId) -> String {
        self.node(node).name.clone()
    }

    fn capability(&self, node: NodeId) -> Capability {
        self.node(node).capability
    }

    fn is_selected(&self, node: NodeId) -> bool {
        self.node(node).selected
    }

    fn depends_on(&self, node: NodeId, root: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == root {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn frame_range(&self) -> (f64, f64) {
        self.frame_range
    }

    fn frame_rate(&self) -> Option<f32> {
        self.frame_rate
    }

    fn set_time(&self, frame: f64) {
        self.time.set(frame);
    }

    fn local_transform(&self, node: NodeId) -> Result<Transform> {
        let n = self.node(node);
        Ok(Self::sample(&n.local_track, n.local, self.time.get()))
    }

    fn world_transform(&self, node: NodeId) -> Result<Transform> {
        let n = self.node(node);
        Ok(Self::sample(&n.world_track, n.world, self.time.get()))
    }

    fn world_scale(&self, node: NodeId) -> Result<Vec3> {
        Ok(self.node(node).world_scale)
    }

    fn mesh_points(&self, node: NodeId) -> Result<Vec<Vec3>> {
        self.meshes
            .get(&(node.0 as usize))
            .map(|m| m.points.clone())
            .ok_or_else(|| Error::provider_query(self.name(node), "node has no mesh"))
    }

    fn mesh_polygons(&self, node: NodeId) -> Result<Vec<Polygon>> {
        self.meshes
            .get(&(node.0 as usize))
            .map(|m| m.polygons.clone())
            .ok_or_else(|| Error::provider_query(self.name(node), "node has no mesh"))
    }

    fn mesh_shaders(&self, node: NodeId) -> Result<Vec<ShaderId>> {
        let mesh = self
            .meshes
            .get(&(node.0 as usize))
            .ok_or_else(|| Error::provider_query(self.name(node), "node has no mesh"))?;
        if mesh.fail_shader_query {
            return Err(Error::provider_query(self.name(node), "query failure injected"));
        }
        Ok(mesh.shaders.iter().map(|&s| ShaderId(s as u64)).collect())
    }

    fn skin_binding(&self, node: NodeId) -> Result<Option<SkinBinding>> {
        Ok(self.meshes.get(&(node.0 as usize)).and_then(|m| m.binding.clone()))
    }

    fn shader_name(&self, shader: ShaderId) -> Result<String> {
        Ok(self.shader(shader)?.name.clone())
    }

    fn shader_attribute(&self, shader: ShaderId, attribute: &str) -> Option<String> {
        self.shader(shader).ok()?.attributes.get(attribute).cloned()
    }

    fn shader_two_sided(&self, shader: ShaderId) -> Result<bool> {
        Ok(self.shader(shader)?.two_sided)
    }

    fn texture_size(&self, shader: ShaderId) -> Result<(u32, u32)> {
        Ok(self.shader(shader)?.texture_size)
    }
}

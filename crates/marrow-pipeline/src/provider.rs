//! The scene-provider seam
//!
//! Every pass reads the host scene exclusively through [`SceneProvider`].
//! A DCC plugin implements this trait over its native API; the pipeline
//! itself never sees host types. Node and shader handles are opaque and
//! only need stable identity for the duration of one export pass.

use marrow_core::{Quat, Result, Vec3};
use smallvec::SmallVec;

/// Opaque, pass-stable node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// Opaque, pass-stable shader handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u64);

/// Node kind, computed once per node at tree-build time
///
/// Closed on purpose: later stages switch on this enum and never consult
/// provider-specific type information again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Carries digestible geometry
    Mesh,
    /// Skeleton joint candidate
    Joint,
    /// Plain transform / group node
    Transform,
    /// Anything else; skipped by the tree but traversed through
    Other,
}

/// A sampled rigid transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };
}

/// One polygon vertex as the provider reports it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolyVertex {
    /// Index into the mesh point list
    pub point: usize,
    pub u: f32,
    pub v: f32,
}

/// One polygon, any vertex count >= 3
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Vertices in provider winding order; most polygons are tris or quads
    pub vertices: SmallVec<[PolyVertex; 4]>,
    /// Index into the mesh shader list, when assigned
    pub shader_slot: Option<usize>,
    /// Smoothing group index, when known
    pub smoothing_group: Option<u32>,
}

/// Smooth-skin deformer data for one mesh
#[derive(Debug, Clone, PartialEq)]
pub struct SkinBinding {
    /// Influence objects in deformer slot order
    pub influence_objects: Vec<NodeId>,
    /// Per point: (influence slot, weight) pairs; zero weights may appear
    pub point_weights: Vec<Vec<(usize, f32)>>,
}

/// Read-only access to the host scene
///
/// Transform queries sample at the scene time last set with
/// [`SceneProvider::set_time`]. Implementations may use interior
/// mutability for the time cursor; the pipeline never mutates anything
/// else.
pub trait SceneProvider {
    /// Top-level nodes in scene order
    fn roots(&self) -> Vec<NodeId>;

    /// Children of a node in scene order
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Direct parent, when any
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Display name
    fn name(&self, node: NodeId) -> String;

    /// Node kind
    fn capability(&self, node: NodeId) -> Capability;

    /// Selection state at flatten time
    fn is_selected(&self, node: NodeId) -> bool;

    /// Whether `node` is reachable from `root` through the provider's
    /// native dependency relation; drives hinted skeleton membership
    fn depends_on(&self, node: NodeId, root: NodeId) -> bool;

    /// Animation range in frames (start, end)
    fn frame_range(&self) -> (f64, f64);

    /// Native playback rate in frames per second, when the scene has one
    fn frame_rate(&self) -> Option<f32>;

    /// Move the scene time cursor, in frames
    fn set_time(&self, frame: f64);

    /// Transform relative to the parent, at the current time
    fn local_transform(&self, node: NodeId) -> Result<Transform>;

    /// Transform in world space, at the current time
    fn world_transform(&self, node: NodeId) -> Result<Transform>;

    /// Non-animated world-space scale of a node
    fn world_scale(&self, node: NodeId) -> Result<Vec3>;

    /// Mesh points in world space at the current time
    fn mesh_points(&self, node: NodeId) -> Result<Vec<Vec3>>;

    /// Mesh polygons with UVs and shader slots
    fn mesh_polygons(&self, node: NodeId) -> Result<Vec<Polygon>>;

    /// Shaders assigned to a mesh, in slot order
    fn mesh_shaders(&self, node: NodeId) -> Result<Vec<ShaderId>>;

    /// Smooth-skin deformer attached to a mesh, if any
    fn skin_binding(&self, node: NodeId) -> Result<Option<SkinBinding>>;

    /// Shader display name
    fn shader_name(&self, shader: ShaderId) -> Result<String>;

    /// A string attribute on a shader, when present
    fn shader_attribute(&self, shader: ShaderId, attribute: &str) -> Option<String>;

    /// Whether the shader renders two-sided
    fn shader_two_sided(&self, shader: ShaderId) -> Result<bool>;

    /// Texture dimensions of the shader's base map
    fn texture_size(&self, shader: ShaderId) -> Result<(u32, u32)>;
}

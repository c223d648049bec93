//! Mesh digestion: points, wedges, triangles and bone influences
//!
//! Polygons are fan-triangulated, UVs are V-flipped, and winding is
//! corrected by swapping wedge slots 1 and 2 of every triangle. Wedges
//! are deduplicated with an exact-match quadratic forward pass; its
//! first-seen output order and remap semantics are what make material
//! slot assignment deterministic, so it stays quadratic on purpose.

use marrow_core::{Error, ExportConfig, Result};
use marrow_format::{Face, Point, RawInfluence, Wedge};
use tracing::{debug, warn};

use crate::provider::{SceneProvider, ShaderId};
use crate::skeleton::Skeleton;
use crate::tree::SceneTree;

/// Shader handles in first-seen order across all digested meshes
///
/// Wedge material indices point into this list; the material pass
/// resolves the handles into export materials after assembly.
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    shaders: Vec<ShaderId>,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Global material slot for a shader, allocating on first sight
    pub fn index_of(&mut self, shader: ShaderId) -> Result<usize> {
        // linear scan keeps first-seen order without an extra map
        if let Some(i) = self.shaders.iter().position(|&s| s == shader) {
            return Ok(i);
        }
        if self.shaders.len() >= 256 {
            return Err(Error::structural("more than 256 distinct materials"));
        }
        self.shaders.push(shader);
        Ok(self.shaders.len() - 1)
    }

    pub fn shaders(&self) -> &[ShaderId] {
        &self.shaders
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

/// One mesh's digested geometry, indices still local
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalSkin {
    pub points: Vec<Point>,
    pub wedges: Vec<Wedge>,
    pub faces: Vec<Face>,
    pub influences: Vec<RawInfluence>,
}

/// Digests one mesh node into a [`LocalSkin`]
pub struct MeshDigester<'a> {
    config: &'a ExportConfig,
}

impl<'a> MeshDigester<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Digest the mesh at `mesh_index`; `smooth` selects deformer
    /// weights over rigid single-bone binding
    pub fn digest(
        &self,
        provider: &dyn SceneProvider,
        tree: &SceneTree,
        mesh_index: usize,
        skeleton: &Skeleton,
        smooth: bool,
        registry: &mut MaterialRegistry,
    ) -> Result<LocalSkin> {
        let node = &tree.nodes[mesh_index];
        let id = node.id;

        let raw_points = provider.mesh_points(id)?;
        if raw_points.len() > u16::MAX as usize {
            return Err(Error::structural(format!(
                "mesh '{}' has {} points, wedge references are 16-bit",
                node.name,
                raw_points.len()
            )));
        }
        let points: Vec<Point> = raw_points
            .iter()
            .map(|&p| Point { position: p.scaled(self.config.point_scale) })
            .collect();

        // Per-mesh shader slots resolved to global material indices.
        // A failed query degrades to the synthetic slot 0 material
        // rather than losing the geometry.
        let slot_to_material: Vec<usize> = match provider.mesh_shaders(id) {
            Ok(shaders) => {
                let mut slots = Vec::with_capacity(shaders.len());
                for shader in shaders {
                    slots.push(registry.index_of(shader)?);
                }
                slots
            }
            Err(e) => {
                warn!(mesh = %node.name, error = %e, "Shader query failed, using material 0");
                Vec::new()
            }
        };

        let mut wedges: Vec<Wedge> = Vec::new();
        let mut faces: Vec<Face> = Vec::new();

        for polygon in provider.mesh_polygons(id)? {
            let material = polygon
                .shader_slot
                .and_then(|s| slot_to_material.get(s).copied())
                .unwrap_or(0) as u8;
            let smoothing = polygon.smoothing_group.map_or(1, |g| 1u32 << (g & 31));

            // Fan triangulation from vertex 0; degenerate polygons
            // yield no triangles.
            let n = polygon.vertices.len();
            for t in 1..n.saturating_sub(1) {
                let corners = [polygon.vertices[0], polygon.vertices[t], polygon.vertices[t + 1]];

                let base = wedges.len();
                if base + 3 > u16::MAX as usize {
                    return Err(Error::structural(format!(
                        "mesh '{}' exceeds the 16-bit wedge limit",
                        node.name
                    )));
                }
                for corner in corners {
                    if corner.point >= points.len() {
                        return Err(Error::structural(format!(
                            "mesh '{}' polygon references point {} of {}",
                            node.name,
                            corner.point,
                            points.len()
                        )));
                    }
                    wedges.push(Wedge {
                        point_index: corner.point as u16,
                        u: corner.u,
                        v: 1.0 - corner.v,
                        material_index: material,
                    });
                }

                // winding flip: slots 1 and 2 swap
                faces.push(Face {
                    wedge_index: [base as u16, (base + 2) as u16, (base + 1) as u16],
                    material_index: material,
                    aux_material: 0,
                    smoothing_groups: smoothing,
                });
            }
        }

        let (wedges, remap) = dedup_wedges(&wedges);
        for face in &mut faces {
            for w in &mut face.wedge_index {
                *w = remap[*w as usize];
            }
        }

        let influences = if smooth {
            self.smooth_influences(provider, tree, mesh_index, skeleton, points.len())?
        } else {
            rigid_influences(tree, mesh_index, points.len())
        };

        debug!(
            mesh = %node.name,
            points = points.len(),
            wedges = wedges.len(),
            faces = faces.len(),
            influences = influences.len(),
            "Digested mesh"
        );

        Ok(LocalSkin { points, wedges, faces, influences })
    }

    fn smooth_influences(
        &self,
        provider: &dyn SceneProvider,
        tree: &SceneTree,
        mesh_index: usize,
        _skeleton: &Skeleton,
        point_count: usize,
    ) -> Result<Vec<RawInfluence>> {
        let node = &tree.nodes[mesh_index];
        let binding = provider.skin_binding(node.id)?.ok_or_else(|| {
            Error::provider_query(&node.name, "smooth digestion without a deformer")
        })?;

        // Influence objects resolve by tree identity; anything outside
        // the digested skeleton falls back to bone 0.
        let slot_to_bone: Vec<usize> = binding
            .influence_objects
            .iter()
            .map(|&obj| {
                tree.index_of(obj)
                    .and_then(|i| tree.nodes[i].bone_index)
                    .unwrap_or_else(|| {
                        warn!(mesh = %node.name, "Influence object outside skeleton, using bone 0");
                        0
                    })
            })
            .collect();

        let mut influences = Vec::new();
        for (point, weights) in binding.point_weights.iter().enumerate().take(point_count) {
            for &(slot, weight) in weights {
                if weight == 0.0 {
                    continue;
                }
                let bone = slot_to_bone.get(slot).copied().unwrap_or(0);
                influences.push(RawInfluence {
                    weight,
                    point_index: point as i32,
                    bone_index: bone as i32,
                });
            }
        }
        Ok(influences)
    }
}

/// Rigid binding: every point binds 100% to the nearest exportable
/// ancestor bone
fn rigid_influences(tree: &SceneTree, mesh_index: usize, point_count: usize) -> Vec<RawInfluence> {
    let bone = rigid_bind_bone(tree, mesh_index);
    (0..point_count)
        .map(|p| RawInfluence {
            weight: 1.0,
            point_index: p as i32,
            bone_index: bone as i32,
        })
        .collect()
}

/// Walk the parent chain to the nearest node that is in the skeleton and
/// not tagged noexport; bone 0 when the walk runs out
pub fn rigid_bind_bone(tree: &SceneTree, mesh_index: usize) -> usize {
    let mut cursor = Some(mesh_index);
    while let Some(i) = cursor {
        let node = &tree.nodes[i];
        if node.in_skeleton && !node.no_export {
            return node.bone_index.unwrap_or(0);
        }
        cursor = node.parent_index;
    }
    0
}

/// Exact-match wedge deduplication
///
/// Forward pass: each unflagged wedge claims the next output slot, then
/// flags every later equal wedge onto that slot. Survivors keep
/// first-seen order. Two wedges are equal iff point index, material
/// index, U and V all match bitwise.
pub fn dedup_wedges(wedges: &[Wedge]) -> (Vec<Wedge>, Vec<u16>) {
    let mut survivors: Vec<Wedge> = Vec::new();
    let mut remap = vec![0u16; wedges.len()];
    let mut flagged = vec![false; wedges.len()];

    for i in 0..wedges.len() {
        if flagged[i] {
            continue;
        }
        let slot = survivors.len() as u16;
        survivors.push(wedges[i]);
        remap[i] = slot;

        for j in (i + 1)..wedges.len() {
            if !flagged[j] && same_wedge(&wedges[i], &wedges[j]) {
                flagged[j] = true;
                remap[j] = slot;
            }
        }
    }
    (survivors, remap)
}

fn same_wedge(a: &Wedge, b: &Wedge) -> bool {
    a.point_index == b.point_index
        && a.material_index == b.material_index
        && a.u == b.u
        && a.v == b.v
}

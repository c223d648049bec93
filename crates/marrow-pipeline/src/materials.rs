//! Material collection and name-tag driven ordering
//!
//! Material names carry an informal tag grammar: a `skin<N>` tag pins
//! the material to slot N, and various substrings force render flags.
//! Tagged materials sort ahead of untagged ones, after which wedge
//! material indices are rewritten through the resulting permutation.

use marrow_core::{Error, ExportConfig, MaterialFlagSource, Result};
use marrow_format::records::{poly_flags, Material};
use tracing::{debug, info, warn};

use crate::mesh::{LocalSkin, MaterialRegistry};
use crate::provider::SceneProvider;

/// Shader attribute consulted for an explicit export name
const NAME_OVERRIDE_ATTRIBUTE: &str = "exportMaterialName";

const DEFAULT_TEXTURE_SIZE: (u32, u32) = (256, 256);
const DEFAULT_LOD_BIAS: i32 = 5;
const DEFAULT_LOD_STYLE: i32 = 0;

/// Final material table plus the texture sizes permuted alongside it
#[derive(Debug, Clone, Default)]
pub struct MaterialSet {
    pub materials: Vec<Material>,
    pub texture_sizes: Vec<(u32, u32)>,
}

/// Builds the material table from the registry's first-seen shader
/// order, then applies tag-driven reordering
pub struct MaterialCollector<'a> {
    config: &'a ExportConfig,
}

impl<'a> MaterialCollector<'a> {
    pub fn new(config: &'a ExportConfig) -> Self {
        Self { config }
    }

    /// Collect one material per registry entry and reorder by skin
    /// tags, rewriting `skin`'s wedge material indices to match
    pub fn collect(
        &self,
        provider: &dyn SceneProvider,
        registry: &MaterialRegistry,
        skin: &mut LocalSkin,
    ) -> Result<MaterialSet> {
        let mut materials: Vec<Material> = Vec::new();
        let mut texture_sizes: Vec<(u32, u32)> = Vec::new();

        for (i, &shader) in registry.shaders().iter().enumerate() {
            let name = match provider.shader_attribute(shader, NAME_OVERRIDE_ATTRIBUTE) {
                Some(n) => n,
                None => match provider.shader_name(shader) {
                    Ok(n) => n,
                    Err(e) => {
                        warn!(slot = i, error = %e, "Shader name query failed");
                        format!("unknown_material_{i}")
                    }
                },
            };

            let (texture_index, aux_flags) = match find_value_tag(&name, "skin", 2) {
                Some(value) => (value, 1),
                None => (0, 0),
            };
            let lod_bias = find_value_tag(&name, "lodbias", 2).unwrap_or(DEFAULT_LOD_BIAS);
            let lod_style = find_value_tag(&name, "lodstyle", 2).unwrap_or(DEFAULT_LOD_STYLE);

            let flags = match self.config.material_flag_source {
                MaterialFlagSource::Structural => match provider.shader_two_sided(shader) {
                    Ok(true) => poly_flags::NORMAL | poly_flags::TWO_SIDED,
                    Ok(false) => poly_flags::NORMAL,
                    Err(e) => {
                        warn!(material = %name, error = %e, "Sidedness query failed");
                        poly_flags::NORMAL
                    }
                },
                MaterialFlagSource::NameBased => flags_from_name(&name),
            };

            let size = match provider.texture_size(shader) {
                Ok(size) => size,
                Err(e) => {
                    debug!(material = %name, error = %e, "No texture size, using default");
                    DEFAULT_TEXTURE_SIZE
                }
            };

            materials.push(Material {
                name,
                texture_index,
                poly_flags: flags,
                aux_material: 0,
                aux_flags,
                lod_bias,
                lod_style,
            });
            texture_sizes.push(size);
        }

        // Geometry always references material 0; cover the gap when no
        // shader was ever resolved.
        if materials.is_empty() && !skin.wedges.is_empty() {
            warn!("No shaders resolved, emitting a synthetic material");
            materials.push(Material {
                name: "unknown_material".to_string(),
                texture_index: 0,
                poly_flags: poly_flags::NORMAL,
                aux_material: 0,
                aux_flags: 0,
                lod_bias: DEFAULT_LOD_BIAS,
                lod_style: DEFAULT_LOD_STYLE,
            });
            texture_sizes.push(DEFAULT_TEXTURE_SIZE);
        }

        if materials.iter().any(|m| m.aux_flags != 0) {
            reorder(&mut materials, &mut texture_sizes, skin);
        }

        info!(materials = materials.len(), "Collected materials");
        Ok(MaterialSet { materials, texture_sizes })
    }
}

/// Sort tagged materials ahead of untagged ones, tagged portion by
/// ascending tag value, and rewrite wedge material indices through
/// the permutation
fn reorder(materials: &mut Vec<Material>, texture_sizes: &mut [(u32, u32)], skin: &mut LocalSkin) {
    for (i, material) in materials.iter_mut().enumerate() {
        material.aux_material = i as i32;
    }

    // stable sort: untagged materials keep their first-seen order
    let mut order: Vec<usize> = (0..materials.len()).collect();
    order.sort_by(|&a, &b| {
        let (ma, mb) = (&materials[a], &materials[b]);
        let tagged = (mb.aux_flags != 0).cmp(&(ma.aux_flags != 0));
        tagged.then_with(|| {
            if ma.aux_flags != 0 && mb.aux_flags != 0 {
                ma.texture_index.cmp(&mb.texture_index)
            } else {
                std::cmp::Ordering::Equal
            }
        })
    });

    let sorted_sizes: Vec<(u32, u32)> = order.iter().map(|&i| texture_sizes[i]).collect();
    texture_sizes.copy_from_slice(&sorted_sizes);
    let sorted: Vec<Material> = order.iter().map(|&i| materials[i].clone()).collect();
    *materials = sorted;

    let mut remap = [0u8; 256];
    for (new_index, material) in materials.iter().enumerate() {
        remap[material.aux_material as usize] = new_index as u8;
    }
    for wedge in &mut skin.wedges {
        if (wedge.material_index as usize) < materials.len() {
            wedge.material_index = remap[wedge.material_index as usize];
        }
    }
    debug!(?order, "Reordered materials by skin tag");
}

/// Case-insensitive substring test
pub fn check_substring(name: &str, pattern: &str) -> bool {
    name.to_ascii_lowercase().contains(pattern)
}

/// Parse the integer following `tag` in `name`, up to `max_digits`
/// digits; `"wall_skin02"` with tag `"skin"` yields 2
pub fn find_value_tag(name: &str, tag: &str, max_digits: usize) -> Option<i32> {
    let lower = name.to_ascii_lowercase();
    let start = lower.find(tag)? + tag.len();
    let digits: String = lower[start..]
        .chars()
        .take(max_digits)
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Derive render flags from tag substrings in the material name
pub fn flags_from_name(name: &str) -> u32 {
    let mut two_sided = false;
    let mut translucent = false;
    let mut weapon = false;
    let mut unlit = false;
    let mut environment = false;
    let mut no_smooth = false;
    let mut modulate = false;
    let mut masked = false;
    let mut flat = false;
    let mut alpha = false;

    if check_substring(name, "twosid") {
        two_sided = true;
    }
    if check_substring(name, "doublesid") {
        two_sided = true;
    }
    if check_substring(name, "weapon") {
        weapon = true;
    }
    if check_substring(name, "modul") {
        modulate = true;
    }
    if check_substring(name, "mask") {
        masked = true;
    }
    if check_substring(name, "flat") {
        flat = true;
    }
    if check_substring(name, "envir") || check_substring(name, "mirro") {
        environment = true;
    }
    if check_substring(name, "nosmo") {
        no_smooth = true;
    }
    if check_substring(name, "unlit") || check_substring(name, "bright") {
        unlit = true;
    }
    if check_substring(name, "trans") {
        translucent = true;
    }
    if check_substring(name, "opaque") {
        translucent = false;
    }
    if check_substring(name, "alph") {
        alpha = true;
    }

    let mut flags = poly_flags::NORMAL;
    if two_sided {
        flags |= poly_flags::TWO_SIDED;
    }
    if translucent {
        flags |= poly_flags::TRANSLUCENT;
    }
    if masked {
        flags |= poly_flags::MASKED;
    }
    if modulate {
        flags |= poly_flags::MODULATE;
    }
    if unlit {
        flags |= poly_flags::UNLIT;
    }
    if flat {
        flags |= poly_flags::FLAT;
    }
    if environment {
        flags |= poly_flags::ENVIRONMENT;
    }
    if no_smooth {
        flags |= poly_flags::NO_SMOOTH;
    }
    if alpha {
        flags |= poly_flags::ALPHA;
    }
    // a weapon placeholder discards every other flag
    if weapon {
        flags = poly_flags::PLACEHOLDER;
    }
    flags
}

//! 3D entity geometry from model tables (`.TBL`).
//!
//! A table carries a `MAP:` section with model names, a `DAT:` section with
//! the geometry and an optional `APP:` section with per-model hit boxes.
//! Model and clip records are located through pairs of u16 words that
//! combine into a 20-bit offset, see [`split_offset`].
//!
//! Inside a model every table offset is relative to the model's
//! `base_offset`, rebased onto the byte after the model's component list.
//! Meshes share vertex pools: consecutive meshes naming the same
//! `(vertex count, vertex offset)` pair reuse one pool, and each new pool is
//! appended to the model's flat vertex array. Face vertex indices are local
//! to their pool and are shifted by the pool's start when decoded.

use std::io::{Cursor, Read, Seek};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::error::{DecodeError, Result};
use crate::reader::LittleEndianReader;
use crate::tagged::{self, DataTag};

pub const EF_UNBOUNDED: u8 = 0x20;
pub const SPRITE_FACE_TYPE: u16 = 2;
const VERTEX_LIST_END: u8 = 0xff;
const BOOM: &str = "boom";

/// Header bytes before the component list: flags, type, terrain, scale,
/// animation count and offset, component count, base offset and two
/// opaque bytes.
const MODEL_HEADER_WIDTH: u64 = 14;
const BOUNDING_BOX_WIDTH: u64 = 12;

pub fn split_offset(lower: u16, upper: u16) -> u64 {
    (u64::from(upper) << 4) + u64::from(lower & 0xf)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [i16; 3],
    pub max: [i16; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacePolygon {
    pub palette: u8,
    pub color: [u8; 4],
    pub group: u8,
    /// Indices into [`Model::vertices`].
    pub vertices: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceOption {
    pub face_type: u16,
    pub edge_count: u16,
    pub polygons: Vec<FacePolygon>,
}

impl FaceOption {
    pub fn is_sprite(&self) -> bool {
        self.face_type == SPRITE_FACE_TYPE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub face_options: Vec<FaceOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Component {
    pub meshes: Vec<Mesh>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    pub entity_flags: u8,
    pub entity_type: u8,
    pub terrain_type: u8,
    pub scale: u8,
    pub anim_count: u16,
    pub anim_offset: u16,
    pub sprite: Option<u16>,
    pub bounds: Option<BoundingBox>,
    pub vertices: Vec<[i16; 3]>,
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelClip {
    pub x_radius: u16,
    pub y_radius: u16,
    pub flags: u16,
    pub texture_coords: Vec<(i8, i8)>,
    pub other_coords: Vec<(i16, i16)>,
}

fn read_split_offsets<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    count: usize,
) -> Result<Vec<u64>> {
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        let lower = r.read_u16()?;
        let upper = r.read_u16()?;
        offsets.push(split_offset(lower, upper));
    }
    Ok(offsets)
}

/// Decode a `MAP:` payload into model names.
pub fn decode_model_names(map: &[u8]) -> Result<Vec<String>> {
    let mut r = LittleEndianReader::new(Cursor::new(map));
    r.skip(2)?;
    let count = r.read_u16()?;
    let mut offsets = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        offsets.push(r.read_u16()?);
    }
    r.skip(2)?;
    let data_start = r.position()?;

    let mut names = Vec::with_capacity(offsets.len());
    for offset in offsets {
        r.seek_to(data_start + u64::from(offset))?;
        names.push(r.read_c_string()?);
    }
    Ok(names)
}

/// Decode an `APP:` payload: one clip per model, located by split offsets.
pub fn decode_model_clips(app: &[u8], count: usize) -> Result<Vec<ModelClip>> {
    let mut r = LittleEndianReader::new(Cursor::new(app));
    let offsets = read_split_offsets(&mut r, count)?;

    let mut clips = Vec::with_capacity(count);
    for offset in offsets {
        r.seek_to(offset)?;
        let x_radius = r.read_u16()?;
        let y_radius = r.read_u16()?;
        let more = r.read_u16()? > 0;
        let flags = r.read_u16()?;

        let mut texture_coords = Vec::new();
        let mut other_coords = Vec::new();
        if more {
            r.skip(2)?;
            let n = r.read_u16()?;
            r.skip(2)?;
            for _ in 0..n {
                let u = r.read_i8()?;
                let v = r.read_i8()?;
                let x = r.read_i16()?;
                let y = r.read_i16()?;
                texture_coords.push((u, v));
                other_coords.push((x, y));
            }
        }
        debug!(x_radius, y_radius, flags, extra = texture_coords.len(), "model clip");
        clips.push(ModelClip {
            x_radius,
            y_radius,
            flags,
            texture_coords,
            other_coords,
        });
    }
    Ok(clips)
}

struct MeshEntry {
    vertex_transform: u32,
    face_count: u16,
    face_offset: u16,
}

struct FaceEntry {
    face_type: u16,
    edge_count: u16,
    edge_offset: u16,
}

/// Resolves model-relative offsets to positions in the `DAT:` payload.
struct Rebase {
    origin: u64,
    base_offset: u16,
    model_offset: u64,
}

impl Rebase {
    fn at(&self, relative: u16) -> Result<u64> {
        (self.origin + u64::from(relative))
            .checked_sub(u64::from(self.base_offset))
            .ok_or_else(|| {
                DecodeError::invariant(
                    self.model_offset,
                    format!(
                        "offset 0x{relative:x} lies before base offset 0x{:x}",
                        self.base_offset
                    ),
                )
            })
    }
}

/// Decode a `DAT:` payload into one model per name.
pub fn decode_models(dat: &[u8], names: &[String]) -> Result<Vec<Model>> {
    let mut r = LittleEndianReader::new(Cursor::new(dat));
    let offsets = read_split_offsets(&mut r, names.len())?;

    let mut models: Vec<Model> = Vec::with_capacity(names.len());
    for (name, &offset) in names.iter().zip(&offsets) {
        r.seek_to(offset)?;
        let entity_flags = r.read_u8()?;
        let entity_type = r.read_u8()?;
        let terrain_type = r.read_u8()?;
        let scale = r.read_u8()?;
        let anim_count = r.read_u16()?;
        let anim_offset = r.read_u16()?;

        if name == BOOM {
            // Alias of the previous model; keeps table indices aligned.
            let previous = models.last().cloned().ok_or_else(|| {
                DecodeError::invariant(offset, "\"boom\" model has no predecessor to alias")
            })?;
            models.push(previous);
            continue;
        }

        let mut model = Model {
            name: name.clone(),
            entity_flags,
            entity_type,
            terrain_type,
            scale,
            anim_count,
            anim_offset,
            sprite: None,
            bounds: None,
            vertices: Vec::new(),
            components: Vec::new(),
        };
        decode_geometry(&mut r, offset, &mut model)?;
        trace!(
            name = %model.name,
            vertices = model.vertices.len(),
            components = model.components.len(),
            "model"
        );
        models.push(model);
    }
    Ok(models)
}

fn decode_geometry<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    offset: u64,
    model: &mut Model,
) -> Result<()> {
    let component_count = r.read_u16()?;
    let base_offset = r.read_u16()?;
    r.skip(2)?;

    let bounded = model.entity_flags & EF_UNBOUNDED == 0;
    if bounded {
        model.bounds = Some(BoundingBox {
            min: r.read_i16_vec3()?,
            max: r.read_i16_vec3()?,
        });
    }

    let mut mesh_tables = Vec::with_capacity(usize::from(component_count));
    for _ in 0..component_count {
        r.skip(2)?;
        let mesh_count = r.read_u16()?;
        let mesh_offset = r.read_u16()?;
        mesh_tables.push((mesh_count, mesh_offset));
    }

    let rebase = Rebase {
        origin: offset + MODEL_HEADER_WIDTH + if bounded { BOUNDING_BOX_WIDTH } else { 0 },
        base_offset,
        model_offset: offset,
    };

    // Pools in first-seen order with their start index in the flat array.
    let mut pools: Vec<(u8, u16)> = Vec::new();
    let mut pool_starts: Vec<u32> = Vec::new();
    let mut components: Vec<Vec<MeshEntry>> = Vec::with_capacity(mesh_tables.len());
    for &(mesh_count, mesh_offset) in &mesh_tables {
        r.seek_to(rebase.at(mesh_offset)?)?;
        let mut meshes = Vec::with_capacity(usize::from(mesh_count));
        for _ in 0..mesh_count {
            r.skip(3)?;
            let vertex_count = r.read_u8()?;
            let vertex_offset = r.read_u16()?;
            let face_count = r.read_u16()?;
            let face_offset = r.read_u16()?;
            r.skip(4)?;

            let pool = (vertex_count, vertex_offset);
            match pools.last() {
                Some(&last) if last == pool => {}
                Some(&(last_count, _)) => {
                    let start = pool_starts.last().copied().unwrap_or(0) + u32::from(last_count);
                    pools.push(pool);
                    pool_starts.push(start);
                }
                None => {
                    pools.push(pool);
                    pool_starts.push(0);
                }
            }

            meshes.push(MeshEntry {
                vertex_transform: pool_starts.last().copied().unwrap_or(0),
                face_count,
                face_offset,
            });
        }
        components.push(meshes);
    }

    for &(vertex_count, vertex_offset) in &pools {
        r.seek_to(rebase.at(vertex_offset)?)?;
        for _ in 0..vertex_count {
            model.vertices.push(r.read_i16_vec3()?);
        }
    }

    for meshes in &components {
        let mut component = Component::default();
        for entry in meshes {
            component
                .meshes
                .push(decode_mesh(r, &rebase, entry, &mut model.sprite)?);
        }
        model.components.push(component);
    }
    Ok(())
}

fn decode_mesh<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    rebase: &Rebase,
    entry: &MeshEntry,
    sprite: &mut Option<u16>,
) -> Result<Mesh> {
    r.seek_to(rebase.at(entry.face_offset)?)?;
    let mut faces = Vec::with_capacity(usize::from(entry.face_count));
    for _ in 0..entry.face_count {
        let face_type = r.read_u16()?;
        let edge_count = r.read_u16()?;
        let edge_offset = r.read_u16()?;
        r.skip(2)?;
        if face_type == SPRITE_FACE_TYPE {
            *sprite = Some(edge_count);
        }
        faces.push(FaceEntry {
            face_type,
            edge_count,
            edge_offset,
        });
    }

    let mut mesh = Mesh {
        face_options: Vec::with_capacity(faces.len()),
    };
    for face in &faces {
        let mut option = FaceOption {
            face_type: face.face_type,
            edge_count: face.edge_count,
            polygons: Vec::new(),
        };
        if face.face_type != SPRITE_FACE_TYPE {
            let mut edge_pos = rebase.at(face.edge_offset)?;
            for _ in 0..face.edge_count {
                r.seek_to(edge_pos)?;
                let palette = r.read_u8()?;
                let color = r.read_array::<4>()?;
                let group = r.read_u8()?;
                let list_offset = r.read_u16()?;
                edge_pos = r.position()?;

                r.seek_to(rebase.at(list_offset)?)?;
                let vertices = decode_vertex_list(r, entry.vertex_transform)?;
                option.polygons.push(FacePolygon {
                    palette,
                    color,
                    group,
                    vertices,
                });
            }
        }
        mesh.face_options.push(option);
    }
    Ok(mesh)
}

/// Read vertex indices up to, not including, the 0xFF terminator.
pub fn decode_vertex_list<R: Read + Seek>(
    r: &mut LittleEndianReader<R>,
    transform: u32,
) -> Result<Vec<u32>> {
    let mut indices = Vec::new();
    loop {
        let index = r.read_u8()?;
        if index == VERTEX_LIST_END {
            return Ok(indices);
        }
        indices.push(u32::from(index) + transform);
    }
}

/// Decoded `.TBL` model table.
#[derive(Debug, Clone)]
pub struct ModelTable {
    names: Vec<String>,
    models: Vec<Model>,
    app: Option<Vec<u8>>,
}

impl ModelTable {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let map = tagged::require_section(bytes, DataTag::Map)?;
        let dat = tagged::require_section(bytes, DataTag::Dat)?;
        let names = decode_model_names(map)?;
        info!(count = names.len(), names = ?names, "loading models");
        let models = decode_models(dat, &names)?;
        let app = tagged::find_section(bytes, DataTag::App).map(<[u8]>::to_vec);
        Ok(Self { names, models, app })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn into_models(self) -> Vec<Model> {
        self.models
    }

    /// Hit-box clips, decoded on demand. A table without `APP:` has none.
    pub fn clips(&self) -> Result<Vec<ModelClip>> {
        match &self.app {
            Some(app) => decode_model_clips(app, self.names.len()),
            None => Ok(Vec::new()),
        }
    }
}

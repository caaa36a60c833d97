//! Brain models: contiguous index ranges mapped to surface vertices or
//! volume voxels, one range per structure and model type.

use super::MatchResult;
use crate::compact_lookup::CompactLookup;
use crate::error::{invalid, parse_err, Result};
use crate::structure::Structure;
use crate::util::{join_indices, parse_int, read_index_array};
use crate::volume_space::VolumeSpace;
use crate::xml::element::{XmlElement, XmlWriter};
use std::collections::BTreeMap;

/// Whether a model covers surface vertices or volume voxels.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum ModelType {
    /// Vertices of a surface
    Surface,
    /// Voxels of the volume space
    Voxels,
}

impl ModelType {
    fn cifti_name(self) -> &'static str {
        match self {
            ModelType::Surface => "CIFTI_MODEL_TYPE_SURFACE",
            ModelType::Voxels => "CIFTI_MODEL_TYPE_VOXELS",
        }
    }

    fn from_cifti_name(name: &str) -> Option<ModelType> {
        match name {
            "CIFTI_MODEL_TYPE_SURFACE" => Some(ModelType::Surface),
            "CIFTI_MODEL_TYPE_VOXELS" => Some(ModelType::Voxels),
            _ => None,
        }
    }
}

/// What a single index of a brain models map refers to.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum IndexInfo {
    /// A surface vertex
    Surface {
        /// Structure of the surface
        structure: Structure,
        /// Vertex number
        node: i64,
    },
    /// A voxel
    Voxel {
        /// Structure of the volume model
        structure: Structure,
        /// Voxel index triple
        ijk: [i64; 3],
    },
}

impl IndexInfo {
    /// Structure of the model the index belongs to.
    pub fn structure(&self) -> Structure {
        match *self {
            IndexInfo::Surface { structure, .. } | IndexInfo::Voxel { structure, .. } => structure,
        }
    }

    /// Type of the model the index belongs to.
    pub fn model_type(&self) -> ModelType {
        match self {
            IndexInfo::Surface { .. } => ModelType::Surface,
            IndexInfo::Voxel { .. } => ModelType::Voxels,
        }
    }
}

/// Summary of one model.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ModelInfo {
    /// Structure of the model
    pub structure: Structure,
    /// Surface or voxels
    pub model_type: ModelType,
    /// First index of the model
    pub index_start: i64,
    /// Number of indices in the model
    pub index_count: i64,
}

/// One vertex of a surface model and its index.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SurfaceMap {
    /// Index along the mapped dimension
    pub cifti_index: i64,
    /// Vertex number
    pub surface_node: i64,
}

/// One voxel of a volume model and its index.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct VolumeMap {
    /// Index along the mapped dimension
    pub cifti_index: i64,
    /// Voxel index triple
    pub ijk: [i64; 3],
}

#[derive(Debug, Clone)]
struct BrainModel {
    structure: Structure,
    model_type: ModelType,
    start: i64,
    end: i64,
    surface_number_of_nodes: i64,
    node_indices: Vec<i64>,
    voxel_indices: Vec<i64>,
    node_to_index: Vec<i64>,
}

impl PartialEq for BrainModel {
    fn eq(&self, other: &Self) -> bool {
        if self.structure != other.structure
            || self.model_type != other.model_type
            || self.start != other.start
            || self.end != other.end
        {
            return false;
        }
        match self.model_type {
            ModelType::Surface => {
                self.surface_number_of_nodes == other.surface_number_of_nodes
                    && self.node_indices == other.node_indices
            }
            ModelType::Voxels => self.voxel_indices == other.voxel_indices,
        }
    }
}

impl BrainModel {
    fn new_surface(structure: Structure, num_nodes: i64, node_list: &[i64], start: i64) -> Result<BrainModel> {
        if num_nodes < 1 {
            return invalid("surface must have at least 1 vertex");
        }
        if node_list.is_empty() {
            return invalid("vertex list must have nonzero length");
        }
        let mut node_to_index = vec![-1i64; num_nodes as usize];
        for (i, &node) in node_list.iter().enumerate() {
            if node < 0 {
                return invalid("vertex list contains negative index");
            }
            if node >= num_nodes {
                return invalid("vertex list contains an index that doesn't exist in the surface");
            }
            let slot = &mut node_to_index[node as usize];
            if *slot != -1 {
                return invalid("vertex list contains reused index");
            }
            *slot = start + i as i64;
        }
        Ok(BrainModel {
            structure,
            model_type: ModelType::Surface,
            start,
            end: start + node_list.len() as i64,
            surface_number_of_nodes: num_nodes,
            node_indices: node_list.to_vec(),
            voxel_indices: Vec::new(),
            node_to_index,
        })
    }

    fn voxels(&self) -> impl Iterator<Item = [i64; 3]> + '_ {
        self.voxel_indices.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }
}

/// Mapping from indices to surface vertices and volume voxels.
///
/// Models are kept sorted by index range and their ranges are contiguous,
/// so the length of the map is the end of the last model.
#[derive(Debug, Clone, Default)]
pub struct BrainModelsMap {
    models: Vec<BrainModel>,
    volume_space: Option<VolumeSpace>,
    ignore_volume_space: bool,
    voxel_lookup: CompactLookup<(i64, Structure)>,
    surface_used: BTreeMap<Structure, usize>,
    volume_used: BTreeMap<Structure, usize>,
}

impl PartialEq for BrainModelsMap {
    fn eq(&self, other: &Self) -> bool {
        self.volume_space == other.volume_space && self.models == other.models
    }
}

impl BrainModelsMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all models and the volume space.
    pub fn clear(&mut self) {
        *self = BrainModelsMap::default();
    }

    fn next_start(&self) -> i64 {
        self.models.last().map_or(0, |m| m.end)
    }

    /// Number of indices covered by all models.
    pub fn get_length(&self) -> i64 {
        self.next_start()
    }

    /// Suppress bounds checking of voxels against the volume space, used while
    /// reading CIFTI-1 where the space is declared outside the mapping.
    pub(crate) fn set_ignore_volume_space(&mut self, ignore: bool) {
        self.ignore_volume_space = ignore;
    }

    /// Append a surface model using the vertices in `node_list`, in order.
    pub fn add_surface_model(&mut self, num_nodes: i64, structure: Structure, node_list: &[i64]) -> Result<()> {
        if self.surface_used.contains_key(&structure) {
            return invalid("surface structures cannot be repeated in a brain models map");
        }
        let model = BrainModel::new_surface(structure, num_nodes, node_list, self.next_start())?;
        self.models.push(model);
        let _ = self.surface_used.insert(structure, self.models.len() - 1);
        Ok(())
    }

    /// Append a surface model using every vertex whose ROI value is positive,
    /// or all vertices when no ROI is given.
    pub fn add_surface_model_roi(&mut self, num_nodes: i64, structure: Structure, roi: Option<&[f32]>) -> Result<()> {
        let nodes: Vec<i64> = match roi {
            None => (0..num_nodes).collect(),
            Some(roi) => {
                if (roi.len() as i64) < num_nodes {
                    return invalid("roi must have a value for every vertex of the surface");
                }
                (0..num_nodes).filter(|&i| roi[i as usize] > 0.0).collect()
            }
        };
        self.add_surface_model(num_nodes, structure, &nodes)
    }

    /// Append a volume model from a flat list of voxel index triples.
    ///
    /// Every voxel is checked before anything changes: on error the map is
    /// left as it was.
    pub fn add_volume_model(&mut self, structure: Structure, ijk_list: &[i64]) -> Result<()> {
        if self.volume_used.contains_key(&structure) {
            return invalid("volume structures cannot be repeated in a brain models map");
        }
        if ijk_list.is_empty() {
            return invalid("voxel list must have nonzero length");
        }
        if ijk_list.len() % 3 != 0 {
            return invalid("voxel list must have a length that is a multiple of 3");
        }
        let dims = if self.ignore_volume_space {
            None
        } else {
            match &self.volume_space {
                Some(space) => Some(space.dims()),
                None => return invalid("you must set the volume space before adding volume models"),
            }
        };
        let next_start = self.next_start();
        let mut lookup = self.voxel_lookup.clone();
        for (index, ijk) in ijk_list.chunks_exact(3).enumerate() {
            if ijk[0] < 0 || ijk[1] < 0 || ijk[2] < 0 {
                return invalid("found negative index in voxel list");
            }
            if let Some(dims) = dims {
                if ijk[0] >= dims[0] || ijk[1] >= dims[1] || ijk[2] >= dims[2] {
                    return invalid(format!(
                        "found invalid index triple in voxel list: ({}, {}, {})",
                        ijk[0], ijk[1], ijk[2]
                    ));
                }
            }
            let key = [ijk[0], ijk[1], ijk[2]];
            if lookup.contains(key) {
                return invalid("volume models may not reuse voxels, either internally or from other structures");
            }
            let _ = lookup.insert(key, (next_start + index as i64, structure));
        }
        self.voxel_lookup = lookup;
        self.models.push(BrainModel {
            structure,
            model_type: ModelType::Voxels,
            start: next_start,
            end: next_start + (ijk_list.len() / 3) as i64,
            surface_number_of_nodes: 0,
            node_indices: Vec::new(),
            voxel_indices: ijk_list.to_vec(),
            node_to_index: Vec::new(),
        });
        let _ = self.volume_used.insert(structure, self.models.len() - 1);
        Ok(())
    }

    /// Bind a volume space. Fails, leaving the map unchanged, if an existing
    /// voxel lies outside of it.
    pub fn set_volume_space(&mut self, space: VolumeSpace) -> Result<()> {
        for &which in self.volume_used.values() {
            for [i, j, k] in self.models[which].voxels() {
                if !space.index_valid(i, j, k) {
                    return invalid("invalid voxel found for volume space");
                }
            }
        }
        self.ignore_volume_space = false;
        self.volume_space = Some(space);
        Ok(())
    }

    /// The bound volume space.
    pub fn get_volume_space(&self) -> Result<&VolumeSpace> {
        match &self.volume_space {
            Some(space) => Ok(space),
            None => invalid("volume space requested when no volume space exists"),
        }
    }

    /// Whether a volume space is bound.
    pub fn has_volume_space(&self) -> bool {
        self.volume_space.is_some()
    }

    /// Whether any volume model exists.
    pub fn has_volume_data(&self) -> bool {
        !self.volume_used.is_empty()
    }

    /// Whether a volume model exists for the structure.
    pub fn has_volume_data_for(&self, structure: Structure) -> bool {
        self.volume_used.contains_key(&structure)
    }

    /// Whether a surface model exists for the structure.
    pub fn has_surface_data(&self, structure: Structure) -> bool {
        self.surface_used.contains_key(&structure)
    }

    /// Index of a vertex, or -1 if it is not mapped.
    pub fn get_index_for_node(&self, node: i64, structure: Structure) -> i64 {
        let model = match self.surface_used.get(&structure) {
            Some(&which) => &self.models[which],
            None => return -1,
        };
        if node < 0 || node >= model.surface_number_of_nodes {
            return -1;
        }
        model.node_to_index[node as usize]
    }

    /// Index and structure of a voxel, if it is mapped.
    pub fn get_index_for_voxel(&self, ijk: [i64; 3]) -> Option<(i64, Structure)> {
        self.voxel_lookup.get(ijk).copied()
    }

    /// What an index refers to, found by bisection over the model ranges.
    pub fn get_info_for_index(&self, index: i64) -> Result<IndexInfo> {
        if index < 0 || index >= self.get_length() {
            return invalid(format!("index {} is out of range for brain models map", index));
        }
        let which = self.models.partition_point(|m| m.end <= index);
        let model = &self.models[which];
        let offset = (index - model.start) as usize;
        Ok(match model.model_type {
            ModelType::Surface => IndexInfo::Surface {
                structure: model.structure,
                node: model.node_indices[offset],
            },
            ModelType::Voxels => {
                let v = &model.voxel_indices[3 * offset..3 * offset + 3];
                IndexInfo::Voxel {
                    structure: model.structure,
                    ijk: [v[0], v[1], v[2]],
                }
            }
        })
    }

    /// Summary of every model, in index order.
    pub fn get_model_info(&self) -> Vec<ModelInfo> {
        self.models
            .iter()
            .map(|m| ModelInfo {
                structure: m.structure,
                model_type: m.model_type,
                index_start: m.start,
                index_count: m.end - m.start,
            })
            .collect()
    }

    /// Vertices of a surface model, in index order.
    pub fn get_node_list(&self, structure: Structure) -> Result<&[i64]> {
        match self.surface_used.get(&structure) {
            Some(&which) => Ok(&self.models[which].node_indices),
            None => invalid(format!("node list requested for nonexistent structure {}", structure)),
        }
    }

    /// Vertices of a surface model paired with their indices.
    pub fn get_surface_map(&self, structure: Structure) -> Result<Vec<SurfaceMap>> {
        let model = match self.surface_used.get(&structure) {
            Some(&which) => &self.models[which],
            None => return invalid(format!("surface map requested for nonexistent structure {}", structure)),
        };
        Ok(model
            .node_indices
            .iter()
            .enumerate()
            .map(|(i, &node)| SurfaceMap {
                cifti_index: model.start + i as i64,
                surface_node: node,
            })
            .collect())
    }

    /// Number of vertices of a surface, or -1 if there is no such model.
    pub fn get_surface_number_of_nodes(&self, structure: Structure) -> i64 {
        self.surface_used
            .get(&structure)
            .map_or(-1, |&which| self.models[which].surface_number_of_nodes)
    }

    /// Structures with surface models, in index order.
    pub fn get_surface_structure_list(&self) -> Vec<Structure> {
        self.structures_of_type(ModelType::Surface)
    }

    /// Structures with volume models, in index order.
    pub fn get_volume_structure_list(&self) -> Vec<Structure> {
        self.structures_of_type(ModelType::Voxels)
    }

    fn structures_of_type(&self, model_type: ModelType) -> Vec<Structure> {
        self.models
            .iter()
            .filter(|m| m.model_type == model_type)
            .map(|m| m.structure)
            .collect()
    }

    fn volume_map_of(model: &BrainModel) -> impl Iterator<Item = VolumeMap> + '_ {
        model.voxels().enumerate().map(move |(i, ijk)| VolumeMap {
            cifti_index: model.start + i as i64,
            ijk,
        })
    }

    /// Every voxel of every volume model paired with its index.
    pub fn get_full_volume_map(&self) -> Vec<VolumeMap> {
        self.models
            .iter()
            .filter(|m| m.model_type == ModelType::Voxels)
            .flat_map(Self::volume_map_of)
            .collect()
    }

    /// Voxels of one volume model paired with their indices.
    pub fn get_volume_structure_map(&self, structure: Structure) -> Result<Vec<VolumeMap>> {
        match self.volume_used.get(&structure) {
            Some(&which) => Ok(Self::volume_map_of(&self.models[which]).collect()),
            None => invalid(format!("volume map requested for nonexistent structure {}", structure)),
        }
    }

    /// Flat voxel index list of one volume model.
    pub fn get_voxel_list(&self, structure: Structure) -> Result<&[i64]> {
        match self.volume_used.get(&structure) {
            Some(&which) => Ok(&self.models[which].voxel_indices),
            None => invalid(format!("voxel list requested for nonexistent structure {}", structure)),
        }
    }

    pub(crate) fn approximate_match(&self, rhs: &BrainModelsMap) -> std::result::Result<(), String> {
        if self.volume_space.is_some() != rhs.volume_space.is_some() {
            return Err("one of the mappings has no volume data".to_string());
        }
        if self.volume_space != rhs.volume_space {
            return Err("mappings have a different volume space".to_string());
        }
        if self.models != rhs.models {
            return Err("mappings include different brainordinates".to_string());
        }
        Ok(())
    }

    /// Compare the models of two maps: `Equal` when they hold the same
    /// models, `Subset` when every model here is also in `rhs` but `rhs`
    /// has more, `No` otherwise.
    pub fn test_match(&self, rhs: &BrainModelsMap) -> MatchResult {
        if let Some(space) = &self.volume_space {
            match &rhs.volume_space {
                Some(other) if other == space => {}
                _ => return MatchResult::No,
            }
        }
        if !self.models.iter().all(|m| rhs.models.contains(m)) {
            return MatchResult::No;
        }
        if self.models.len() == rhs.models.len() {
            MatchResult::Equal
        } else {
            MatchResult::Subset
        }
    }

    pub(crate) fn read_xml1(elem: &XmlElement) -> Result<BrainModelsMap> {
        let mut parsed = Vec::new();
        for child in &elem.children {
            if child.name != "BrainModel" {
                return parse_err(format!("unexpected element in brain models map: {}", child.name));
            }
            parsed.push(ParsedModel::read(child, false)?);
        }
        let mut ret = BrainModelsMap::new();
        // the volume space lives outside the mapping in CIFTI-1
        ret.ignore_volume_space = true;
        ret.add_parsed(parsed)?;
        ret.ignore_volume_space = false;
        Ok(ret)
    }

    pub(crate) fn read_xml2(elem: &XmlElement) -> Result<BrainModelsMap> {
        let mut ret = BrainModelsMap::new();
        let mut parsed = Vec::new();
        for child in &elem.children {
            match child.name.as_str() {
                "BrainModel" => parsed.push(ParsedModel::read(child, true)?),
                "Volume" => {
                    if ret.volume_space.is_some() {
                        return parse_err("Volume specified more than once in Brain Models mapping type");
                    }
                    ret.volume_space = Some(VolumeSpace::read_cifti_xml2(child)?);
                }
                other => return parse_err(format!("unexpected element in brain models map: {}", other)),
            }
        }
        ret.add_parsed(parsed)?;
        Ok(ret)
    }

    fn add_parsed(&mut self, mut parsed: Vec<ParsedModel>) -> Result<()> {
        parsed.sort_by_key(|m| m.offset);
        let mut cur_offset = 0;
        for (i, model) in parsed.iter().enumerate() {
            if model.offset != cur_offset {
                if model.offset < cur_offset {
                    return parse_err(format!("models overlap at index {}, model {}", model.offset, i));
                }
                return parse_err(format!("index {} is not assigned to any model", cur_offset));
            }
            cur_offset += model.count;
        }
        for model in parsed {
            match model.model_type {
                ModelType::Surface => {
                    self.add_surface_model(model.surface_number_of_nodes, model.structure, &model.indices)?
                }
                ModelType::Voxels => self.add_volume_model(model.structure, &model.indices)?,
            }
        }
        Ok(())
    }

    pub(crate) fn write_xml1(&self, xml: &mut XmlWriter) -> Result<()> {
        self.write_models(xml, "SurfaceNumberOfNodes", "NodeIndices")
    }

    pub(crate) fn write_xml2(&self, xml: &mut XmlWriter) -> Result<()> {
        if self.has_volume_data() {
            if let Some(space) = &self.volume_space {
                space.write_cifti_xml2(xml)?;
            }
        }
        self.write_models(xml, "SurfaceNumberOfVertices", "VertexIndices")
    }

    fn write_models(&self, xml: &mut XmlWriter, num_nodes_attr: &str, nodes_elem: &str) -> Result<()> {
        for model in &self.models {
            let offset = model.start.to_string();
            let count = (model.end - model.start).to_string();
            let structure = model.structure.to_cifti_name();
            let num_nodes = model.surface_number_of_nodes.to_string();
            let mut attrs = vec![
                ("IndexOffset", offset.as_str()),
                ("IndexCount", count.as_str()),
                ("BrainStructure", structure.as_str()),
                ("ModelType", model.model_type.cifti_name()),
            ];
            match model.model_type {
                ModelType::Surface => {
                    attrs.push((num_nodes_attr, num_nodes.as_str()));
                    xml.start("BrainModel", &attrs)?;
                    xml.text_element(nodes_elem, &[], &join_indices(&model.node_indices))?;
                }
                ModelType::Voxels => {
                    xml.start("BrainModel", &attrs)?;
                    let text: String = model
                        .voxels()
                        .map(|[i, j, k]| format!("{} {} {}\n", i, j, k))
                        .collect();
                    xml.text_element("VoxelIndicesIJK", &[], &text)?;
                }
            }
            xml.end("BrainModel")?;
        }
        Ok(())
    }
}

struct ParsedModel {
    model_type: ModelType,
    structure: Structure,
    offset: i64,
    count: i64,
    surface_number_of_nodes: i64,
    indices: Vec<i64>,
}

fn model_attr<'a>(elem: &'a XmlElement, name: &str) -> Result<&'a str> {
    match elem.attr(name) {
        Some(v) => Ok(v),
        None => parse_err(format!("BrainModel missing required attribute {}", name)),
    }
}

impl ParsedModel {
    fn read(elem: &XmlElement, cifti2: bool) -> Result<ParsedModel> {
        let required = |name| model_attr(elem, name);
        let value = required("ModelType")?;
        let model_type = match ModelType::from_cifti_name(value) {
            Some(t) => t,
            None => return parse_err(format!("invalid value for ModelType: {}", value)),
        };
        let value = required("BrainStructure")?;
        let structure = match Structure::from_cifti_name(value) {
            Some(s) => s,
            None => return parse_err(format!("invalid value for BrainStructure: {}", value)),
        };
        let offset = match parse_int(required("IndexOffset")?, "IndexOffset") {
            Ok(v) if v >= 0 => v,
            _ => return parse_err("IndexOffset must be a non-negative integer"),
        };
        let count = match parse_int(required("IndexCount")?, "IndexCount") {
            Ok(v) if v >= 1 => v,
            _ => return parse_err("IndexCount must be a positive integer"),
        };
        let mut children = elem.children.iter();
        let first = children.next();
        if let Some(extra) = children.next() {
            return parse_err(format!("unexpected second element in BrainModel: {}", extra.name));
        }
        let mut ret = ParsedModel {
            model_type,
            structure,
            offset,
            count,
            surface_number_of_nodes: 0,
            indices: Vec::new(),
        };
        match model_type {
            ModelType::Surface => {
                let (num_attr, nodes_elem) = if cifti2 {
                    ("SurfaceNumberOfVertices", "VertexIndices")
                } else {
                    ("SurfaceNumberOfNodes", "NodeIndices")
                };
                ret.surface_number_of_nodes = match parse_int(required(num_attr)?, num_attr) {
                    Ok(v) if v >= 1 => v,
                    _ => return parse_err(format!("{} must be a positive integer", num_attr)),
                };
                ret.indices = match first {
                    // CIFTI-1 allows leaving out the node list when it is 0..count
                    None if !cifti2 => (0..count).collect(),
                    None => return parse_err("BrainModel requires a child element"),
                    Some(child) if child.name == nodes_elem => read_index_array(&child.text)?,
                    Some(child) => {
                        return parse_err(format!(
                            "unexpected element in BrainModel of SURFACE type: {}",
                            child.name
                        ))
                    }
                };
                if ret.indices.len() as i64 != count {
                    return parse_err("number of vertex indices does not match IndexCount");
                }
            }
            ModelType::Voxels => {
                let child = match first {
                    Some(c) => c,
                    None => return parse_err("BrainModel requires a child element"),
                };
                if child.name != "VoxelIndicesIJK" {
                    return parse_err(format!(
                        "unexpected element in BrainModel of VOXELS type: {}",
                        child.name
                    ));
                }
                ret.indices = read_index_array(&child.text)?;
                if ret.indices.len() % 3 != 0 {
                    return parse_err("number of voxel indices is not a multiple of 3");
                }
                if ret.indices.len() as i64 != count * 3 {
                    return parse_err("number of voxel indices does not match IndexCount");
                }
            }
        }
        Ok(ret)
    }
}

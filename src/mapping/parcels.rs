//! Parcels: named, non-overlapping groups of surface vertices and voxels.

use crate::compact_lookup::CompactLookup;
use crate::error::{invalid, parse_err, Result};
use crate::structure::Structure;
use crate::util::{join_indices, parse_int, read_index_array};
use crate::volume_space::VolumeSpace;
use crate::xml::element::{XmlElement, XmlWriter};
use log::trace;
use std::collections::{BTreeMap, BTreeSet};

/// A named set of vertices, per surface structure, and voxels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parcel {
    /// Name of the parcel, unique within a map
    pub name: String,
    /// Vertices used on each surface
    pub surface_nodes: BTreeMap<Structure, BTreeSet<i64>>,
    /// Voxel index triples
    pub voxel_indices: BTreeSet<[i64; 3]>,
}

impl Parcel {
    /// Create an empty parcel.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Parcel {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Like `==`, but ignoring the names. On mismatch, the error explains
    /// what differs.
    pub fn approximate_match(&self, rhs: &Parcel) -> std::result::Result<(), String> {
        let describe = |what: &str| {
            if self.name == rhs.name {
                format!("parcel '{}' uses different {} than parcel in other map", self.name, what)
            } else {
                format!(
                    "parcel '{}' uses different {} than same-index parcel '{}' in other map",
                    self.name, what, rhs.name
                )
            }
        };
        if self.voxel_indices != rhs.voxel_indices {
            return Err(describe("voxels"));
        }
        if self.surface_nodes != rhs.surface_nodes {
            return Err(describe("surface vertices"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct SurfaceInfo {
    num_nodes: i64,
    lookup: Vec<i64>,
}

/// Mapping from indices to parcels.
#[derive(Debug, Clone, Default)]
pub struct ParcelsMap {
    parcels: Vec<Parcel>,
    surfaces: BTreeMap<Structure, SurfaceInfo>,
    volume_space: Option<VolumeSpace>,
    ignore_volume_space: bool,
    voxel_lookup: CompactLookup<i64>,
}

impl PartialEq for ParcelsMap {
    fn eq(&self, other: &Self) -> bool {
        self.volume_space == other.volume_space
            && self.surfaces.len() == other.surfaces.len()
            && self
                .surfaces
                .iter()
                .zip(other.surfaces.iter())
                .all(|((s1, i1), (s2, i2))| s1 == s2 && i1.num_nodes == i2.num_nodes)
            && self.parcels == other.parcels
    }
}

impl ParcelsMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all parcels, surfaces and the volume space.
    pub fn clear(&mut self) {
        *self = ParcelsMap::default();
    }

    /// Number of parcels.
    pub fn get_length(&self) -> i64 {
        self.parcels.len() as i64
    }

    /// Register a surface so that parcels can use its vertices.
    pub fn add_surface(&mut self, num_nodes: i64, structure: Structure) -> Result<()> {
        if self.surfaces.contains_key(&structure) {
            return invalid("parcel surface structures may not be used more than once");
        }
        if num_nodes < 1 {
            return invalid("parcel surfaces must have at least 1 vertex");
        }
        let _ = self.surfaces.insert(
            structure,
            SurfaceInfo {
                num_nodes,
                lookup: vec![-1; num_nodes as usize],
            },
        );
        Ok(())
    }

    /// Bind a volume space. Fails, leaving the map unchanged, if a parcel
    /// has a voxel outside of it.
    pub fn set_volume_space(&mut self, space: VolumeSpace) -> Result<()> {
        let dims = space.dims();
        for parcel in &self.parcels {
            for ijk in &parcel.voxel_indices {
                if ijk[0] >= dims[0] || ijk[1] >= dims[1] || ijk[2] >= dims[2] {
                    return invalid("parcels may not contain voxel indices outside the volume space");
                }
            }
        }
        self.ignore_volume_space = false;
        self.volume_space = Some(space);
        Ok(())
    }

    /// Append a parcel. Everything is validated before any lookup is
    /// touched, so a failed call leaves the map unchanged.
    pub fn add_parcel(&mut self, parcel: Parcel) -> Result<()> {
        let this_parcel = self.parcels.len() as i64;
        if self.parcels.iter().any(|p| p.name == parcel.name) {
            return invalid(format!("cannot add parcel with duplicate name '{}'", parcel.name));
        }
        let mut voxel_lookup = None;
        if !parcel.voxel_indices.is_empty() {
            let dims = if self.ignore_volume_space {
                None
            } else {
                match &self.volume_space {
                    Some(space) => Some(space.dims()),
                    None => return invalid("you must set the volume space before adding parcels that use voxels"),
                }
            };
            let mut lookup = self.voxel_lookup.clone();
            for &ijk in &parcel.voxel_indices {
                if ijk[0] < 0 || ijk[1] < 0 || ijk[2] < 0 {
                    return invalid("found negative index triple in voxel list");
                }
                if let Some(dims) = dims {
                    if ijk[0] >= dims[0] || ijk[1] >= dims[1] || ijk[2] >= dims[2] {
                        return invalid("found invalid index triple in voxel list");
                    }
                }
                if lookup.insert(ijk, this_parcel).is_some() {
                    return invalid("parcels may not overlap in voxels");
                }
            }
            voxel_lookup = Some(lookup);
        }
        for (structure, nodes) in &parcel.surface_nodes {
            let info = match self.surfaces.get(structure) {
                Some(info) => info,
                None => return invalid("you must set surfaces before adding parcels that use them"),
            };
            if nodes.is_empty() {
                return invalid("parcels may not include empty node lists");
            }
            for &node in nodes {
                if node < 0 {
                    return invalid("found negative vertex in parcel");
                }
                if node >= info.num_nodes {
                    return invalid("found invalid vertex in parcel");
                }
                if info.lookup[node as usize] != -1 {
                    return invalid("parcels may not overlap in vertices");
                }
            }
        }
        if let Some(lookup) = voxel_lookup {
            self.voxel_lookup = lookup;
        }
        for (structure, nodes) in &parcel.surface_nodes {
            if let Some(info) = self.surfaces.get_mut(structure) {
                for &node in nodes {
                    info.lookup[node as usize] = this_parcel;
                }
            }
        }
        self.parcels.push(parcel);
        Ok(())
    }

    /// Parcel containing a vertex, or -1.
    pub fn get_index_for_node(&self, node: i64, structure: Structure) -> i64 {
        match self.surfaces.get(&structure) {
            Some(info) if node >= 0 && node < info.num_nodes => info.lookup[node as usize],
            _ => -1,
        }
    }

    /// Parcel containing a voxel, or -1.
    pub fn get_index_for_voxel(&self, ijk: [i64; 3]) -> i64 {
        self.voxel_lookup.get(ijk).copied().unwrap_or(-1)
    }

    /// Resolve a 1-based parcel number or an exact parcel name. Text that
    /// parses as an integer is never tried as a name. Returns -1 if nothing
    /// matches.
    pub fn get_index_from_number_or_name(&self, number_or_name: &str) -> i64 {
        match number_or_name.parse::<i64>() {
            Ok(number) => {
                let index = number - 1;
                if index < 0 || index >= self.get_length() {
                    -1
                } else {
                    index
                }
            }
            Err(_) => self
                .parcels
                .iter()
                .position(|p| p.name == number_or_name)
                .map_or(-1, |i| i as i64),
        }
    }

    /// Name of the parcel at an index.
    pub fn get_index_name(&self, index: i64) -> Result<&str> {
        self.get_parcel(index).map(|p| p.name.as_str())
    }

    /// The parcel at an index.
    pub fn get_parcel(&self, index: i64) -> Result<&Parcel> {
        if index < 0 || index >= self.get_length() {
            return invalid(format!("parcel index {} is out of range", index));
        }
        Ok(&self.parcels[index as usize])
    }

    /// All parcels in index order.
    pub fn get_parcels(&self) -> &[Parcel] {
        &self.parcels
    }

    /// Registered surface structures.
    pub fn get_parcel_surface_structures(&self) -> Vec<Structure> {
        self.surfaces.keys().copied().collect()
    }

    /// Whether the surface is registered.
    pub fn has_surface(&self, structure: Structure) -> bool {
        self.surfaces.contains_key(&structure)
    }

    /// Whether any parcel uses vertices of the surface.
    pub fn has_surface_data(&self, structure: Structure) -> bool {
        self.surfaces.contains_key(&structure)
            && self.parcels.iter().any(|p| {
                p.surface_nodes
                    .get(&structure)
                    .map_or(false, |nodes| !nodes.is_empty())
            })
    }

    /// Number of vertices of a registered surface, or -1.
    pub fn get_surface_number_of_nodes(&self, structure: Structure) -> i64 {
        self.surfaces.get(&structure).map_or(-1, |info| info.num_nodes)
    }

    /// Whether any parcel uses voxels.
    pub fn has_volume_data(&self) -> bool {
        self.parcels.iter().any(|p| !p.voxel_indices.is_empty())
    }

    /// Whether a volume space is bound.
    pub fn has_volume_space(&self) -> bool {
        self.volume_space.is_some()
    }

    /// The bound volume space.
    pub fn get_volume_space(&self) -> Result<&VolumeSpace> {
        match &self.volume_space {
            Some(space) => Ok(space),
            None => invalid("volume space requested when no volume space exists"),
        }
    }

    pub(crate) fn approximate_match(&self, rhs: &ParcelsMap) -> std::result::Result<(), String> {
        if self.volume_space.is_some() != rhs.volume_space.is_some() {
            return Err("one of the mappings has no volume data".to_string());
        }
        if self.volume_space != rhs.volume_space {
            return Err("mappings have a different volume space".to_string());
        }
        if self.surfaces.len() != rhs.surfaces.len() {
            return Err("mappings have a different number of surfaces used".to_string());
        }
        for (structure, info) in &self.surfaces {
            match rhs.surfaces.get(structure) {
                None => return Err(format!("{} surface expected but not found", structure)),
                Some(other) if other.num_nodes != info.num_nodes => {
                    return Err(format!("different number of vertices for surface {}", structure))
                }
                Some(_) => {}
            }
        }
        if self.parcels.len() != rhs.parcels.len() {
            return Err("different number of parcels".to_string());
        }
        for (mine, theirs) in self.parcels.iter().zip(&rhs.parcels) {
            mine.approximate_match(theirs)?;
        }
        Ok(())
    }

    pub(crate) fn read_xml1(elem: &XmlElement) -> Result<ParcelsMap> {
        trace!("parsing nonstandard parcels mapping type in cifti-1");
        Self::read_xml(elem, false)
    }

    pub(crate) fn read_xml2(elem: &XmlElement) -> Result<ParcelsMap> {
        Self::read_xml(elem, true)
    }

    fn read_xml(elem: &XmlElement, cifti2: bool) -> Result<ParcelsMap> {
        let num_attr = if cifti2 {
            "SurfaceNumberOfVertices"
        } else {
            "SurfaceNumberOfNodes"
        };
        let mut ret = ParcelsMap::new();
        // CIFTI-1 declares the volume space outside the mapping
        ret.ignore_volume_space = !cifti2;
        let mut parcels = Vec::new();
        for child in &elem.children {
            match child.name.as_str() {
                "Surface" => {
                    let value = match child.attr("BrainStructure") {
                        Some(v) => v,
                        None => return parse_err("Surface element missing required attribute BrainStructure"),
                    };
                    let structure = match Structure::from_cifti_name(value) {
                        Some(s) => s,
                        None => return parse_err(format!("invalid value for BrainStructure: {}", value)),
                    };
                    let value = match child.attr(num_attr) {
                        Some(v) => v,
                        None => {
                            return parse_err(format!(
                                "Surface element missing required attribute {}",
                                num_attr
                            ))
                        }
                    };
                    let num_nodes = match parse_int(value, num_attr) {
                        Ok(n) if n >= 1 => n,
                        _ => return parse_err(format!("invalid value for {}: {}", num_attr, value)),
                    };
                    if let Some(inner) = child.children.first() {
                        return parse_err(format!("unexpected element inside Surface: {}", inner.name));
                    }
                    ret.add_surface(num_nodes, structure)?;
                }
                "Parcel" => parcels.push(read_parcel(child, cifti2)?),
                "Volume" if cifti2 => {
                    if ret.volume_space.is_some() {
                        return parse_err("Volume specified more than once in Parcels mapping type");
                    }
                    ret.volume_space = Some(VolumeSpace::read_cifti_xml2(child)?);
                }
                other => return parse_err(format!("unexpected element in parcels map: {}", other)),
            }
        }
        for parcel in parcels {
            ret.add_parcel(parcel)?;
        }
        ret.ignore_volume_space = false;
        Ok(ret)
    }

    pub(crate) fn write_xml1(&self, xml: &mut XmlWriter) -> Result<()> {
        trace!("writing nonstandard parcels mapping type in cifti-1");
        self.write_xml(xml, false)
    }

    pub(crate) fn write_xml2(&self, xml: &mut XmlWriter) -> Result<()> {
        if self.has_volume_data() {
            if let Some(space) = &self.volume_space {
                space.write_cifti_xml2(xml)?;
            }
        }
        self.write_xml(xml, true)
    }

    fn write_xml(&self, xml: &mut XmlWriter, cifti2: bool) -> Result<()> {
        let (num_attr, nodes_elem) = if cifti2 {
            ("SurfaceNumberOfVertices", "Vertices")
        } else {
            ("SurfaceNumberOfNodes", "Nodes")
        };
        for (structure, info) in &self.surfaces {
            let name = structure.to_cifti_name();
            let num_nodes = info.num_nodes.to_string();
            xml.empty("Surface", &[("BrainStructure", &name), (num_attr, &num_nodes)])?;
        }
        for parcel in &self.parcels {
            xml.start("Parcel", &[("Name", &parcel.name)])?;
            if !parcel.voxel_indices.is_empty() {
                let text: String = parcel
                    .voxel_indices
                    .iter()
                    .map(|ijk| format!("{} {} {}\n", ijk[0], ijk[1], ijk[2]))
                    .collect();
                xml.text_element("VoxelIndicesIJK", &[], &text)?;
            }
            for (structure, nodes) in &parcel.surface_nodes {
                if !nodes.is_empty() {
                    let name = structure.to_cifti_name();
                    xml.text_element(nodes_elem, &[("BrainStructure", &name)], &join_indices(nodes))?;
                }
            }
            xml.end("Parcel")?;
        }
        Ok(())
    }
}

fn read_parcel(elem: &XmlElement, cifti2: bool) -> Result<Parcel> {
    let nodes_elem = if cifti2 { "Vertices" } else { "Nodes" };
    let mut ret = match elem.attr("Name") {
        Some(name) => Parcel::new(name),
        None => return parse_err("Parcel element missing required attribute Name"),
    };
    let mut have_voxels = false;
    for child in &elem.children {
        if child.name == nodes_elem {
            let value = match child.attr("BrainStructure") {
                Some(v) => v,
                None => {
                    return parse_err(format!(
                        "{} element missing required attribute BrainStructure",
                        nodes_elem
                    ))
                }
            };
            let structure = match Structure::from_cifti_name(value) {
                Some(s) => s,
                None => return parse_err(format!("unrecognized value for BrainStructure: {}", value)),
            };
            if ret.surface_nodes.contains_key(&structure) {
                return parse_err(format!(
                    "{} elements may not reuse a BrainStructure within a Parcel",
                    nodes_elem
                ));
            }
            let mut set = BTreeSet::new();
            for node in read_index_array(&child.text)? {
                if !set.insert(node) {
                    return parse_err(format!("{} elements may not reuse indices", nodes_elem));
                }
            }
            let _ = ret.surface_nodes.insert(structure, set);
        } else if child.name == "VoxelIndicesIJK" {
            if have_voxels {
                return parse_err("VoxelIndicesIJK may only appear once in a Parcel");
            }
            let array = read_index_array(&child.text)?;
            if array.len() % 3 != 0 {
                return parse_err("number of indices in VoxelIndicesIJK must be a multiple of 3");
            }
            for v in array.chunks_exact(3) {
                if !ret.voxel_indices.insert([v[0], v[1], v[2]]) {
                    return parse_err("VoxelIndicesIJK elements may not reuse voxels");
                }
            }
            have_voxels = true;
        } else {
            return parse_err(format!("unexpected element in Parcel: {}", child.name));
        }
    }
    Ok(ret)
}

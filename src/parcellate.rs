//! Folding a dense brain models dimension into parcels taken from a label
//! file.
//!
//! The numeric payload of a CIFTI file is accessed through the [`MatrixData`]
//! trait, which exposes the two-dimensional matrix one row or column at a
//! time. Rows run along dimension 1 of the XML ([`ALONG_COLUMN`]), and each
//! row has one value per index of dimension 0 ([`ALONG_ROW`]).
//! [`InMemoryMatrix`] is a plain row-major implementation.
//!
//! [`parcellate_mapping`] derives a [`ParcelsMap`] from the first map of a
//! dense label file, and [`parcellate`] uses it to reduce every parcel of a
//! dense input matrix to a single value per row or column.
//!
//! [`MatrixData`]: ./trait.MatrixData.html
//! [`InMemoryMatrix`]: ./struct.InMemoryMatrix.html
//! [`ParcelsMap`]: ../mapping/parcels/struct.ParcelsMap.html
//! [`parcellate_mapping`]: ./fn.parcellate_mapping.html
//! [`parcellate`]: ./fn.parcellate.html
//! [`ALONG_ROW`]: ../xml/constant.ALONG_ROW.html
//! [`ALONG_COLUMN`]: ../xml/constant.ALONG_COLUMN.html

use crate::error::{CiftiError, Result};
use crate::mapping::{BrainModelsMap, IndexType, Parcel, ParcelsMap, ScalarsMap};
use crate::reduction::{
    reduce, reduce_exclude_dev, reduce_only_numeric, reduce_weighted, reduce_weighted_exclude_dev,
    reduce_weighted_only_numeric, ReductionMethod,
};
use crate::structure::Structure;
use crate::xml::{CiftiXml, ALONG_COLUMN, ALONG_ROW};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Row and column access to the numeric payload of a two-dimensional
/// CIFTI file.
pub trait MatrixData {
    /// `[row length, number of rows]`, the same order as the XML dimensions.
    fn dimensions(&self) -> [usize; 2];

    /// Copy a row into `out`, which must be exactly one row long.
    fn get_row(&self, out: &mut [f32], row: usize) -> Result<()>;

    /// Overwrite a row with `data`, which must be exactly one row long.
    fn set_row(&mut self, data: &[f32], row: usize) -> Result<()>;

    /// Copy a column into `out`, which must have one value per row.
    fn get_column(&self, out: &mut [f32], column: usize) -> Result<()>;
}

/// A matrix held in memory in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryMatrix {
    row_length: usize,
    num_rows: usize,
    data: Vec<f32>,
}

impl InMemoryMatrix {
    /// A zero-filled matrix.
    pub fn new(row_length: usize, num_rows: usize) -> Self {
        InMemoryMatrix {
            row_length,
            num_rows,
            data: vec![0.0; row_length * num_rows],
        }
    }

    /// Wrap row-major values. Fails if `data` does not hold exactly
    /// `row_length * num_rows` values.
    pub fn from_vec(row_length: usize, num_rows: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != row_length * num_rows {
            return Err(CiftiError::Invalid(format!(
                "matrix of {} rows of length {} cannot hold {} values",
                num_rows,
                row_length,
                data.len()
            )));
        }
        Ok(InMemoryMatrix {
            row_length,
            num_rows,
            data,
        })
    }

    /// Borrow a row.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.num_rows {
            return None;
        }
        let start = row * self.row_length;
        Some(&self.data[start..start + self.row_length])
    }

    /// Value at a row and column.
    pub fn get(&self, row: usize, column: usize) -> Option<f32> {
        if column >= self.row_length {
            return None;
        }
        self.row(row).map(|r| r[column])
    }

    /// All values, row-major.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Take the values out, row-major.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    fn check_row(&self, len: usize, row: usize) -> Result<()> {
        if row >= self.num_rows {
            return Err(CiftiError::Invalid(format!(
                "row {} is out of range for a matrix with {} rows",
                row, self.num_rows
            )));
        }
        if len != self.row_length {
            return Err(CiftiError::Invalid(format!(
                "row buffer of length {} does not match row length {}",
                len, self.row_length
            )));
        }
        Ok(())
    }
}

impl MatrixData for InMemoryMatrix {
    fn dimensions(&self) -> [usize; 2] {
        [self.row_length, self.num_rows]
    }

    fn get_row(&self, out: &mut [f32], row: usize) -> Result<()> {
        self.check_row(out.len(), row)?;
        let start = row * self.row_length;
        out.copy_from_slice(&self.data[start..start + self.row_length]);
        Ok(())
    }

    fn set_row(&mut self, data: &[f32], row: usize) -> Result<()> {
        self.check_row(data.len(), row)?;
        let start = row * self.row_length;
        self.data[start..start + self.row_length].copy_from_slice(data);
        Ok(())
    }

    fn get_column(&self, out: &mut [f32], column: usize) -> Result<()> {
        if column >= self.row_length {
            return Err(CiftiError::Invalid(format!(
                "column {} is out of range for rows of length {}",
                column, self.row_length
            )));
        }
        if out.len() != self.num_rows {
            return Err(CiftiError::Invalid(format!(
                "column buffer of length {} does not match {} rows",
                out.len(),
                self.num_rows
            )));
        }
        for (row, value) in out.iter_mut().enumerate() {
            *value = self.data[row * self.row_length + column];
        }
        Ok(())
    }
}

#[cfg(feature = "ndarray_matrix")]
mod ndarray_impl {
    use super::InMemoryMatrix;
    use ndarray::Array2;

    impl InMemoryMatrix {
        /// Copy into an array of shape `[rows, row length]`.
        pub fn to_ndarray(&self) -> Array2<f32> {
            Array2::from_shape_fn((self.num_rows, self.row_length), |(r, c)| {
                self.data[r * self.row_length + c]
            })
        }
    }

    impl From<Array2<f32>> for InMemoryMatrix {
        fn from(array: Array2<f32>) -> Self {
            let (num_rows, row_length) = array.dim();
            InMemoryMatrix {
                row_length,
                num_rows,
                data: array.iter().copied().collect(),
            }
        }
    }
}

/// Parcels derived from a label file, and where each dense index ends up.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelMapping {
    /// The parcels, in ascending order of their label keys
    pub parcels: ParcelsMap,
    /// Parcel of each index of the dense mapping, -1 for none
    pub index_to_parcel: Vec<i64>,
    /// Number of brainordinates whose label key is not in the label table
    pub dropped: usize,
}

fn algorithm<T, S: Into<String>>(msg: S) -> Result<T> {
    Err(CiftiError::Algorithm(msg.into()))
}

fn label_key(value: f32) -> i32 {
    (value + 0.5).floor() as i32
}

fn check_surface_nodes(label_map: &BrainModelsMap, dense_map: &BrainModelsMap, structure: Structure) -> Result<()> {
    if label_map.get_surface_number_of_nodes(structure) != dense_map.get_surface_number_of_nodes(structure) {
        return algorithm(format!(
            "mismatch in number of surface vertices between input and dlabel for structure {}",
            structure
        ));
    }
    Ok(())
}

/// Build the parcels of `dense_map` from the first label map of a dense
/// label file.
///
/// Every label key found on a brainordinate shared by both files becomes a
/// parcel named after its label. Brainordinates carrying the unassigned key,
/// or missing from the label file, belong to no parcel. Keys absent from the
/// label table are dropped and counted.
///
/// With `include_empty`, every label of the table except the unassigned one
/// becomes a parcel, and the parcels cover the brainordinates of the label
/// file regardless of whether `dense_map` has them.
pub fn parcellate_mapping<D: MatrixData>(
    label_xml: &CiftiXml,
    label_data: &D,
    dense_map: &BrainModelsMap,
    include_empty: bool,
) -> Result<ParcelMapping> {
    if label_xml.get_number_of_dimensions() != 2
        || label_xml.get_mapping_type(ALONG_ROW)? != IndexType::Labels
        || label_xml.get_mapping_type(ALONG_COLUMN)? != IndexType::BrainModels
    {
        return algorithm("parcellate mapping requires a cifti dlabel file as input");
    }
    let label_dense = label_xml.get_brain_models_map(ALONG_COLUMN)?;
    let mut parcels = ParcelsMap::new();
    if dense_map.has_volume_data() && label_dense.has_volume_data() {
        let space = dense_map.get_volume_space()?;
        if !space.matches(label_dense.get_volume_space()?) {
            return algorithm("parcellate mapping requires matching volume space between dlabel and dense mapping");
        }
        parcels.set_volume_space(space.clone())?;
    } else if include_empty && label_dense.has_volume_data() {
        parcels.set_volume_space(label_dense.get_volume_space()?.clone())?;
    }

    let mut table = label_xml
        .get_labels_map(ALONG_ROW)?
        .get_map_label_table(0)?
        .clone();
    let unused_key = table.get_unassigned_label_key();
    let mut label_values = vec![0.0; label_dense.get_length() as usize];
    label_data.get_column(&mut label_values, 0)?;

    let mut index_to_parcel = vec![-1i64; dense_map.get_length() as usize];
    let mut dropped = 0;

    if include_empty {
        let mut key_to_parcel = BTreeMap::new();
        let mut parcel_list = Vec::new();
        for key in table.keys().filter(|&k| k != unused_key) {
            let _ = key_to_parcel.insert(key, parcel_list.len());
            let name = table.get_label(key).map(|l| l.name.clone()).unwrap_or_default();
            parcel_list.push(Parcel::new(name));
        }
        for structure in label_dense.get_surface_structure_list() {
            if dense_map.has_surface_data(structure) {
                check_surface_nodes(label_dense, dense_map, structure)?;
            }
            parcels.add_surface(label_dense.get_surface_number_of_nodes(structure), structure)?;
            for entry in label_dense.get_surface_map(structure)? {
                let key = label_key(label_values[entry.cifti_index as usize]);
                match key_to_parcel.get(&key) {
                    Some(&which) => {
                        let _ = parcel_list[which]
                            .surface_nodes
                            .entry(structure)
                            .or_default()
                            .insert(entry.surface_node);
                        let dense_index = dense_map.get_index_for_node(entry.surface_node, structure);
                        if dense_index != -1 {
                            index_to_parcel[dense_index as usize] = which as i64;
                        }
                    }
                    None if key != unused_key => dropped += 1,
                    None => {}
                }
            }
        }
        for entry in label_dense.get_full_volume_map() {
            let key = label_key(label_values[entry.cifti_index as usize]);
            match key_to_parcel.get(&key) {
                Some(&which) => {
                    let _ = parcel_list[which].voxel_indices.insert(entry.ijk);
                    if let Some((dense_index, _)) = dense_map.get_index_for_voxel(entry.ijk) {
                        index_to_parcel[dense_index as usize] = which as i64;
                    }
                }
                None if key != unused_key => dropped += 1,
                None => {}
            }
        }
        for parcel in parcel_list {
            parcels.add_parcel(parcel)?;
        }
    } else {
        // key -> (parcel, id in first-seen order)
        let mut used_keys: BTreeMap<i32, (Parcel, i64)> = BTreeMap::new();
        let mut assign = |key: i32, index: i64, add: &mut dyn FnMut(&mut Parcel)| {
            if key == unused_key {
                return;
            }
            let id = match used_keys.get_mut(&key) {
                Some((parcel, id)) => {
                    add(parcel);
                    *id
                }
                None => match table.get_label(key) {
                    Some(label) => {
                        let id = used_keys.len() as i64;
                        let mut parcel = Parcel::new(label.name.clone());
                        add(&mut parcel);
                        let _ = used_keys.insert(key, (parcel, id));
                        id
                    }
                    None => {
                        dropped += 1;
                        -1
                    }
                },
            };
            index_to_parcel[index as usize] = id;
        };
        for structure in dense_map.get_surface_structure_list() {
            if !label_dense.has_surface_data(structure) {
                continue;
            }
            check_surface_nodes(label_dense, dense_map, structure)?;
            parcels.add_surface(dense_map.get_surface_number_of_nodes(structure), structure)?;
            for entry in dense_map.get_surface_map(structure)? {
                let label_index = label_dense.get_index_for_node(entry.surface_node, structure);
                if label_index == -1 {
                    continue;
                }
                let key = label_key(label_values[label_index as usize]);
                assign(key, entry.cifti_index, &mut |p: &mut Parcel| {
                    let _ = p.surface_nodes.entry(structure).or_default().insert(entry.surface_node);
                });
            }
        }
        for entry in dense_map.get_full_volume_map() {
            if let Some((label_index, _)) = label_dense.get_index_for_voxel(entry.ijk) {
                let key = label_key(label_values[label_index as usize]);
                assign(key, entry.cifti_index, &mut |p: &mut Parcel| {
                    let _ = p.voxel_indices.insert(entry.ijk);
                });
            }
        }
        drop(assign);

        let mut remap = vec![-1i64; used_keys.len()];
        for (rank, (_, (parcel, id))) in used_keys.into_iter().enumerate() {
            remap[id as usize] = rank as i64;
            parcels.add_parcel(parcel)?;
        }
        for p in index_to_parcel.iter_mut().filter(|p| **p != -1) {
            *p = remap[*p as usize];
        }
    }

    if dropped > 0 {
        warn!(
            "{} brainordinates have label keys that are not in the label table, they were left out of all parcels",
            dropped
        );
    }
    Ok(ParcelMapping {
        parcels,
        index_to_parcel,
        dropped,
    })
}

/// Options of [`parcellate`](./fn.parcellate.html).
#[derive(Debug, Clone, PartialEq)]
pub struct ParcellateOptions {
    /// How the values of a parcel are reduced
    pub method: ReductionMethod,
    /// Exclude values further than this many standard deviations below and
    /// above the mean. Only used when both numbers are positive.
    pub exclude_outliers: Option<(f32, f32)>,
    /// Ignore NaN and infinite values
    pub only_numeric: bool,
    /// Keep parcels which have no brainordinates in the input
    pub include_empty: bool,
    /// Value of empty parcels in non-label data
    pub fill_value: f32,
    /// One weight per index of the parcellated dimension
    pub weights: Option<Vec<f32>>,
    /// Also produce a mask of the parcels that are not empty
    pub empty_mask: bool,
}

impl Default for ParcellateOptions {
    fn default() -> Self {
        ParcellateOptions {
            method: ReductionMethod::Mean,
            exclude_outliers: None,
            only_numeric: false,
            include_empty: false,
            fill_value: 0.0,
            weights: None,
            empty_mask: false,
        }
    }
}

impl ParcellateOptions {
    /// Mean of every parcel, empty parcels left out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reduction method.
    pub fn method(mut self, method: ReductionMethod) -> Self {
        self.method = method;
        self
    }

    /// Exclude outliers by standard deviations below and above the mean.
    pub fn exclude_outliers(mut self, below: f32, above: f32) -> Self {
        self.exclude_outliers = Some((below, above));
        self
    }

    /// Set whether non-numeric values are ignored.
    pub fn only_numeric(mut self, only_numeric: bool) -> Self {
        self.only_numeric = only_numeric;
        self
    }

    /// Set whether empty parcels are kept.
    pub fn include_empty(mut self, include_empty: bool) -> Self {
        self.include_empty = include_empty;
        self
    }

    /// Set the value of empty parcels.
    pub fn fill_value(mut self, fill_value: f32) -> Self {
        self.fill_value = fill_value;
        self
    }

    /// Weight every index of the parcellated dimension.
    pub fn weights(mut self, weights: Vec<f32>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Set whether a mask of non-empty parcels is produced.
    pub fn empty_mask(mut self, empty_mask: bool) -> Self {
        self.empty_mask = empty_mask;
        self
    }

    fn excluded_devs(&self) -> Option<(f32, f32)> {
        self.exclude_outliers.filter(|&(below, above)| below > 0.0 && above > 0.0)
    }

    fn reduce(&self, values: &[f32], weights: Option<&[f32]>) -> Result<f32> {
        match (weights, self.excluded_devs()) {
            (Some(w), Some((below, above))) => reduce_weighted_exclude_dev(values, w, self.method, below, above),
            (Some(w), None) if self.only_numeric => reduce_weighted_only_numeric(values, w, self.method),
            (Some(w), None) => reduce_weighted(values, w, self.method),
            (None, Some((below, above))) => reduce_exclude_dev(values, self.method, below, above),
            (None, None) if self.only_numeric => reduce_only_numeric(values, self.method),
            (None, None) => reduce(values, self.method),
        }
    }

    fn can_reduce(&self, count: i64) -> bool {
        count > 0 && (self.method != ReductionMethod::SampStdev || count > 1)
    }
}

/// Result of [`parcellate`](./fn.parcellate.html).
#[derive(Debug, Clone, PartialEq)]
pub struct ParcellateOutput {
    /// The input XML with the parcellated dimension replaced by parcels
    pub xml: CiftiXml,
    /// The reduced values
    pub data: InMemoryMatrix,
    /// Number of input indices in each parcel
    pub parcel_counts: Vec<i64>,
    /// Number of brainordinates left out for having unknown label keys
    pub dropped: usize,
    /// One column, 1 for parcels that have input indices and 0 for the
    /// others. Only produced on request.
    pub empty_mask: Option<(CiftiXml, InMemoryMatrix)>,
}

fn unassigned_key(xml: &CiftiXml, label_dir: usize, map: usize) -> Result<f32> {
    let mut table = xml.get_labels_map(label_dir)?.get_map_label_table(map as i64)?;
    Ok(table.get_unassigned_label_key() as f32)
}

fn empty_mask(parcels: &ParcelsMap, counts: &[i64]) -> Result<(CiftiXml, InMemoryMatrix)> {
    let mut xml = CiftiXml::with_dimensions(2);
    xml.set_map(ALONG_COLUMN, parcels.clone())?;
    let mut names = ScalarsMap::new(1);
    names.set_map_name(0, "parcel not empty")?;
    xml.set_map(ALONG_ROW, names)?;
    let values = counts.iter().map(|&c| if c == 0 { 0.0 } else { 1.0 }).collect();
    let data = InMemoryMatrix::from_vec(1, counts.len(), values)?;
    Ok((xml, data))
}

/// Reduce the brain models dimension `direction` of the input into the
/// parcels of a dense label file.
///
/// Along [`ALONG_ROW`](../xml/constant.ALONG_ROW.html), every output row
/// holds one value per parcel. Along
/// [`ALONG_COLUMN`](../xml/constant.ALONG_COLUMN.html), there is one output
/// row per parcel. If the input itself holds label data, values are rounded
/// to integers and empty parcels take the unassigned key of the relevant
/// label table.
pub fn parcellate<D, L>(
    input_xml: &CiftiXml,
    input_data: &D,
    label_xml: &CiftiXml,
    label_data: &L,
    direction: usize,
    options: &ParcellateOptions,
) -> Result<ParcellateOutput>
where
    D: MatrixData,
    L: MatrixData,
{
    let dims = input_xml.get_dimensions()?;
    if direction >= dims.len() {
        return algorithm("specified direction doesn't exist in input file");
    }
    if dims.len() != 2 {
        return algorithm("only two-dimensional input files can be parcellated");
    }
    if input_xml.get_mapping_type(direction)? != IndexType::BrainModels {
        return algorithm("input cifti file does not have brain models mapping type in specified direction");
    }
    if label_xml.get_number_of_dimensions() != 2
        || label_xml.get_mapping_type(ALONG_ROW)? != IndexType::Labels
        || label_xml.get_mapping_type(ALONG_COLUMN)? != IndexType::BrainModels
    {
        return algorithm("input cifti label file has the wrong mapping types");
    }
    let [row_length, num_rows] = input_data.dimensions();
    if row_length as i64 != dims[ALONG_ROW] || num_rows as i64 != dims[ALONG_COLUMN] {
        return algorithm("input data dimensions do not match its cifti XML");
    }
    let input_dense = input_xml.get_brain_models_map(direction)?;
    let label_dense = label_xml.get_brain_models_map(ALONG_COLUMN)?;
    if input_dense.has_volume_data()
        && label_dense.has_volume_data()
        && !input_dense.get_volume_space()?.matches(label_dense.get_volume_space()?)
    {
        return algorithm("input cifti files must have the same volume space");
    }
    if let Some(weights) = &options.weights {
        if !options.method.supports_weights() {
            return algorithm(format!("{} reduction does not support weights", options.method));
        }
        if weights.len() as i64 != dims[direction] {
            return algorithm("weights must have one value per index of the parcellated dimension");
        }
    }

    let mapping = parcellate_mapping(label_xml, label_data, input_dense, options.include_empty)?;
    let num_parcels = mapping.parcels.get_length() as usize;
    if num_parcels < 1 {
        return algorithm("no parcels found, output file would be empty, aborting");
    }
    let mut out_xml = input_xml.clone();
    out_xml.set_map(direction, mapping.parcels.clone())?;

    let mut parcel_counts = vec![0i64; num_parcels];
    for &p in mapping.index_to_parcel.iter().filter(|&&p| p != -1) {
        parcel_counts[p as usize] += 1;
    }
    let parcel_weights: Option<Vec<Vec<f32>>> = options.weights.as_ref().map(|weights| {
        let mut ret = vec![Vec::new(); num_parcels];
        for (i, &p) in mapping.index_to_parcel.iter().enumerate() {
            if p != -1 {
                ret[p as usize].push(weights[i]);
            }
        }
        ret
    });
    let weights_of = |parcel: usize| parcel_weights.as_ref().map(|w| w[parcel].as_slice());

    let label_dir = (0..dims.len()).find(|&i| input_xml.get_mapping_type(i).ok() == Some(IndexType::Labels));
    if label_dir.is_some() && options.method != ReductionMethod::Mode {
        warn!("{} reduction requested while parcellating label data", options.method);
    }
    let prepare = |value: f32| {
        if label_dir.is_some() {
            (value + 0.5).floor()
        } else {
            value
        }
    };

    let mut scratch_row = vec![0.0f32; row_length];
    let data = if direction == ALONG_ROW {
        debug!("parcellating {} rows into {} columns", num_rows, num_parcels);
        let mut out = InMemoryMatrix::new(num_parcels, num_rows);
        let mut out_row = vec![0.0f32; num_parcels];
        let mut parcel_data: Vec<Vec<f32>> = parcel_counts.iter().map(|&c| Vec::with_capacity(c as usize)).collect();
        for row in 0..num_rows {
            for values in &mut parcel_data {
                values.clear();
            }
            input_data.get_row(&mut scratch_row, row)?;
            for (j, &value) in scratch_row.iter().enumerate() {
                let p = mapping.index_to_parcel[j];
                if p != -1 {
                    parcel_data[p as usize].push(prepare(value));
                }
            }
            for (j, out_value) in out_row.iter_mut().enumerate() {
                *out_value = if options.can_reduce(parcel_counts[j]) {
                    options.reduce(&parcel_data[j], weights_of(j))?
                } else if let Some(label_dir) = label_dir {
                    unassigned_key(&out_xml, label_dir, row)?
                } else {
                    options.fill_value
                };
            }
            out.set_row(&out_row, row)?;
        }
        out
    } else {
        debug!("parcellating {} rows into {} rows", num_rows, num_parcels);
        let mut out = InMemoryMatrix::new(row_length, num_parcels);
        let mut out_row = vec![0.0f32; row_length];
        let mut parcel_data: Vec<Vec<Vec<f32>>> = parcel_counts
            .iter()
            .map(|&c| vec![Vec::with_capacity(c as usize); row_length])
            .collect();
        for row in 0..num_rows {
            let p = mapping.index_to_parcel[row];
            if p == -1 {
                continue;
            }
            input_data.get_row(&mut scratch_row, row)?;
            for (column, &value) in parcel_data[p as usize].iter_mut().zip(&scratch_row) {
                column.push(prepare(value));
            }
        }
        for (i, columns) in parcel_data.iter().enumerate() {
            for (j, out_value) in out_row.iter_mut().enumerate() {
                *out_value = if options.can_reduce(parcel_counts[i]) {
                    options.reduce(&columns[j], weights_of(i))?
                } else if let Some(label_dir) = label_dir {
                    unassigned_key(&out_xml, label_dir, j)?
                } else {
                    options.fill_value
                };
            }
            out.set_row(&out_row, i)?;
        }
        out
    };

    let empty_mask = if options.empty_mask {
        Some(empty_mask(&mapping.parcels, &parcel_counts)?)
    } else {
        None
    };
    Ok(ParcellateOutput {
        xml: out_xml,
        data,
        parcel_counts,
        dropped: mapping.dropped,
        empty_mask,
    })
}

/// Mean of every parcel, with parcels that have no input indices left out.
pub fn parcellate_simple<D, L>(
    input_xml: &CiftiXml,
    input_data: &D,
    label_xml: &CiftiXml,
    label_data: &L,
    direction: usize,
) -> Result<ParcellateOutput>
where
    D: MatrixData,
    L: MatrixData,
{
    parcellate(
        input_xml,
        input_data,
        label_xml,
        label_data,
        direction,
        &ParcellateOptions::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{LabelsMap, SeriesMap};
    use crate::volume_space::VolumeSpace;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    const SFORM: [[f32; 4]; 3] = [[2.0, 0.0, 0.0, -10.0], [0.0, 2.0, 0.0, -10.0], [0.0, 0.0, 2.0, -10.0]];

    /// Four vertices on the left cortex, two voxels in the left thalamus.
    fn dense() -> BrainModelsMap {
        let mut map = BrainModelsMap::new();
        map.add_surface_model(4, Structure::CortexLeft, &[0, 1, 2, 3]).unwrap();
        map.set_volume_space(VolumeSpace::new([4, 4, 4], &SFORM)).unwrap();
        map.add_volume_model(Structure::ThalamusLeft, &[1, 1, 1, 2, 2, 2]).unwrap();
        map
    }

    /// Vertices 0 and 1 and voxel (2,2,2) are "A" (5), vertex 2 is "B" (7),
    /// vertex 3 is unassigned, voxel (1,1,1) has key 9 which is not in the
    /// table. "C" (3) is used nowhere.
    fn dlabel() -> (CiftiXml, InMemoryMatrix) {
        let labels = LabelsMap::new(1);
        {
            let mut table = labels.get_map_label_table(0).unwrap();
            table.set_label(5, "A", 1.0, 0.0, 0.0, 1.0);
            table.set_label(7, "B", 0.0, 1.0, 0.0, 1.0);
            table.set_label(3, "C", 0.0, 0.0, 1.0, 1.0);
        }
        let mut xml = CiftiXml::with_dimensions(2);
        xml.set_map(ALONG_ROW, labels).unwrap();
        xml.set_map(ALONG_COLUMN, dense()).unwrap();
        let data = InMemoryMatrix::from_vec(1, 6, vec![5.0, 4.8, 7.0, 0.0, 9.0, 5.0]).unwrap();
        (xml, data)
    }

    fn input(direction: usize) -> (CiftiXml, InMemoryMatrix) {
        let mut xml = CiftiXml::with_dimensions(2);
        xml.set_map(direction, dense()).unwrap();
        xml.set_map(1 - direction, SeriesMap::new(2)).unwrap();
        let values: Vec<f32> = (0..12).map(|x| x as f32).collect();
        let data = if direction == ALONG_ROW {
            InMemoryMatrix::from_vec(6, 2, values).unwrap()
        } else {
            InMemoryMatrix::from_vec(2, 6, values).unwrap()
        };
        (xml, data)
    }

    #[test]
    fn matrix_access() {
        let mut m = InMemoryMatrix::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.dimensions(), [3, 2]);
        let mut column = [0.0; 2];
        m.get_column(&mut column, 1).unwrap();
        assert_eq!(column, [2.0, 5.0]);
        m.set_row(&[7.0, 8.0, 9.0], 0).unwrap();
        assert_eq!(m.row(0).unwrap(), &[7.0, 8.0, 9.0]);
        assert_eq!(m.get(1, 2), Some(6.0));
        assert_eq!(m.get(2, 0), None);
        assert!(m.set_row(&[1.0], 1).is_err());
        assert!(m.get_column(&mut column, 3).is_err());
        assert!(InMemoryMatrix::from_vec(2, 2, vec![0.0; 3]).is_err());
    }

    #[cfg(feature = "ndarray_matrix")]
    #[test]
    fn ndarray_conversion() {
        let m = InMemoryMatrix::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let array = m.to_ndarray();
        assert_eq!(array.dim(), (2, 3));
        assert_eq!(array[[1, 0]], 4.0);
        assert_eq!(InMemoryMatrix::from(array), m);
    }

    #[test]
    fn mapping_in_key_order() {
        let (label_xml, label_data) = dlabel();
        let mapping = parcellate_mapping(&label_xml, &label_data, &dense(), false).unwrap();
        let names: Vec<_> = mapping.parcels.get_parcels().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(mapping.index_to_parcel, vec![0, 0, 1, -1, -1, 0]);
        assert_eq!(mapping.dropped, 1);
        let a = mapping.parcels.get_parcel(0).unwrap();
        assert_eq!(a.surface_nodes[&Structure::CortexLeft].len(), 2);
        assert!(a.voxel_indices.contains(&[2, 2, 2]));
        assert!(mapping.parcels.has_volume_space());
    }

    #[test]
    fn mapping_with_empty_parcels() {
        let (label_xml, label_data) = dlabel();
        let mut sparse = BrainModelsMap::new();
        sparse.add_surface_model(4, Structure::CortexLeft, &[2, 3]).unwrap();
        let mapping = parcellate_mapping(&label_xml, &label_data, &sparse, true).unwrap();
        let names: Vec<_> = mapping.parcels.get_parcels().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        assert_eq!(mapping.index_to_parcel, vec![2, -1]);
        // voxels come from the label file, so its volume space is used
        assert!(mapping.parcels.has_volume_data());
        assert_eq!(mapping.parcels.get_index_for_voxel([2, 2, 2]), 1);
        assert_eq!(mapping.dropped, 1);
    }

    #[test]
    fn mapping_rejects_vertex_count_mismatch() {
        let (label_xml, label_data) = dlabel();
        let mut other = BrainModelsMap::new();
        other.add_surface_model(5, Structure::CortexLeft, &[0]).unwrap();
        match parcellate_mapping(&label_xml, &label_data, &other, false) {
            Err(CiftiError::Algorithm(msg)) => assert!(msg.contains("CORTEX_LEFT")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn mapping_requires_dlabel() {
        let (xml, data) = input(ALONG_ROW);
        assert!(parcellate_mapping(&xml, &data, &dense(), false).is_err());
    }

    #[test]
    fn along_row_means() {
        let (xml, data) = input(ALONG_ROW);
        let (label_xml, label_data) = dlabel();
        let out = parcellate_simple(&xml, &data, &label_xml, &label_data, ALONG_ROW).unwrap();
        assert_eq!(out.xml.get_mapping_type(ALONG_ROW).unwrap(), IndexType::Parcels);
        assert_eq!(out.xml.get_mapping_type(ALONG_COLUMN).unwrap(), IndexType::Series);
        assert_eq!(out.parcel_counts, vec![3, 1]);
        assert_eq!(out.dropped, 1);
        assert_eq!(out.data.dimensions(), [2, 2]);
        // "A" holds columns 0, 1 and 5
        assert_relative_eq!(out.data.get(0, 0).unwrap(), 2.0);
        assert_relative_eq!(out.data.get(0, 1).unwrap(), 2.0);
        assert_relative_eq!(out.data.get(1, 0).unwrap(), 8.0);
        assert_relative_eq!(out.data.get(1, 1).unwrap(), 8.0);
        assert!(out.empty_mask.is_none());
    }

    #[test]
    fn along_column_reduces_rows() {
        let (xml, data) = input(ALONG_COLUMN);
        let (label_xml, label_data) = dlabel();
        let options = ParcellateOptions::new().method(ReductionMethod::Max);
        let out = parcellate(&xml, &data, &label_xml, &label_data, ALONG_COLUMN, &options).unwrap();
        assert_eq!(out.data.dimensions(), [2, 2]);
        // rows 0, 1 and 5 are "A"
        assert_eq!(out.data.row(0).unwrap(), &[10.0, 11.0]);
        assert_eq!(out.data.row(1).unwrap(), &[4.0, 5.0]);
    }

    #[test]
    fn empty_parcels_get_fill_value_and_mask() {
        let (xml, data) = input(ALONG_ROW);
        let (label_xml, label_data) = dlabel();
        let options = ParcellateOptions::new()
            .include_empty(true)
            .fill_value(-1.0)
            .empty_mask(true);
        let out = parcellate(&xml, &data, &label_xml, &label_data, ALONG_ROW, &options).unwrap();
        assert_eq!(out.parcel_counts, vec![0, 3, 1]);
        assert_eq!(out.data.row(1).unwrap(), &[-1.0, 8.0, 8.0]);
        let (mask_xml, mask) = out.empty_mask.unwrap();
        assert_eq!(
            mask_xml.get_scalars_map(ALONG_ROW).unwrap().get_map_name(0).unwrap(),
            "parcel not empty"
        );
        assert_eq!(mask.as_slice(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn label_input_fills_with_unassigned_key() {
        let (label_xml, label_data) = dlabel();
        let mut xml = CiftiXml::with_dimensions(2);
        xml.set_map(ALONG_ROW, dense()).unwrap();
        let labels = LabelsMap::new(1);
        let unassigned = {
            let mut table = labels.get_map_label_table(0).unwrap();
            let _ = table.add_label("x", 1.0, 1.0, 1.0, 1.0);
            table.get_unassigned_label_key()
        };
        xml.set_map(ALONG_COLUMN, labels).unwrap();
        let data = InMemoryMatrix::from_vec(6, 1, vec![1.2, 1.0, 0.9, 0.0, 0.0, 2.0]).unwrap();
        let options = ParcellateOptions::new()
            .method(ReductionMethod::Mode)
            .include_empty(true);
        let out = parcellate(&xml, &data, &label_xml, &label_data, ALONG_ROW, &options).unwrap();
        assert_eq!(out.data.row(0).unwrap(), &[unassigned as f32, 1.0, 1.0]);
    }

    #[test]
    fn weighted_mean() {
        let (xml, data) = input(ALONG_ROW);
        let (label_xml, label_data) = dlabel();
        let options = ParcellateOptions::new().weights(vec![1.0, 0.0, 1.0, 1.0, 1.0, 0.0]);
        let out = parcellate(&xml, &data, &label_xml, &label_data, ALONG_ROW, &options).unwrap();
        assert_relative_eq!(out.data.get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(out.data.get(1, 1).unwrap(), 8.0);

        let bad = ParcellateOptions::new().method(ReductionMethod::Max).weights(vec![1.0; 6]);
        assert!(parcellate(&xml, &data, &label_xml, &label_data, ALONG_ROW, &bad).is_err());
        let short = ParcellateOptions::new().weights(vec![1.0; 2]);
        assert!(parcellate(&xml, &data, &label_xml, &label_data, ALONG_ROW, &short).is_err());
    }

    #[test]
    fn precondition_failures() {
        let (xml, data) = input(ALONG_ROW);
        let (label_xml, label_data) = dlabel();
        assert!(parcellate_simple(&xml, &data, &label_xml, &label_data, 2).is_err());
        // dimension 1 is a series
        let err = parcellate_simple(&xml, &data, &label_xml, &label_data, ALONG_COLUMN).unwrap_err();
        assert_eq!(
            err.to_string(),
            "input cifti file does not have brain models mapping type in specified direction"
        );
        assert!(parcellate_simple(&xml, &data, &xml, &data, ALONG_ROW).is_err());
        let wrong_shape = InMemoryMatrix::new(5, 2);
        assert!(parcellate_simple(&xml, &wrong_shape, &label_xml, &label_data, ALONG_ROW).is_err());
    }

    #[test]
    fn all_unassigned_is_empty() {
        let (xml, data) = input(ALONG_ROW);
        let (label_xml, _) = dlabel();
        let unassigned = InMemoryMatrix::new(1, 6);
        let err = parcellate_simple(&xml, &data, &label_xml, &unassigned, ALONG_ROW).unwrap_err();
        assert_eq!(err.to_string(), "no parcels found, output file would be empty, aborting");
    }
}

//! Affine volume spaces: voxel dimensions plus the sform mapping voxel
//! indices to millimeter coordinates.
//!
//! The sform is kept as a row-major 4x4 matrix whose last row is always
//! `0 0 0 1`. Its inverse is recomputed eagerly by every setter.

use crate::error::{parse_err, CiftiError, Result};
use crate::util::fmt_float;
use crate::xml::element::{XmlElement, XmlWriter};
use log::debug;
use nalgebra::{Matrix4, Vector3};

/// Type alias for a 4x4 affine matrix.
pub type Affine4 = Matrix4<f32>;

/// Ratio by which a single sform element may differ in `VolumeSpace::matches`.
const TOLER_RATIO: f32 = 0.999;

/// Direction of increasing index along one voxel axis.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, FromPrimitive)]
pub enum OrientationType {
    /// Increasing index goes to the right
    LeftToRight = 0,
    /// Increasing index goes anterior
    PosteriorToAnterior = 1,
    /// Increasing index goes superior
    InferiorToSuperior = 2,
    /// Increasing index goes to the left
    RightToLeft = 4,
    /// Increasing index goes posterior
    AnteriorToPosterior = 5,
    /// Increasing index goes inferior
    SuperiorToInferior = 6,
}

impl OrientationType {
    fn from_axis(axis: usize, negative: bool) -> OrientationType {
        match (axis, negative) {
            (0, false) => OrientationType::LeftToRight,
            (0, true) => OrientationType::RightToLeft,
            (1, false) => OrientationType::PosteriorToAnterior,
            (1, true) => OrientationType::AnteriorToPosterior,
            (_, false) => OrientationType::InferiorToSuperior,
            (_, true) => OrientationType::SuperiorToInferior,
        }
    }
}

/// Orientation, spacing and origin of each voxel axis of a plumb space.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct PlumbInfo {
    /// Orientation of the i, j and k axes
    pub orientation: [OrientationType; 3],
    /// Signed voxel spacing along each axis
    pub spacing: [f32; 3],
    /// Coordinate of the first voxel along each axis
    pub origin: [f32; 3],
}

/// Dimensions and affine transform of a voxel grid.
#[derive(Debug, Clone)]
pub struct VolumeSpace {
    dims: [i64; 3],
    sform: [[f32; 4]; 4],
    inverse: [[f32; 4]; 4],
}

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

impl Default for VolumeSpace {
    fn default() -> Self {
        VolumeSpace {
            dims: [0, 0, 0],
            sform: IDENTITY,
            inverse: IDENTITY,
        }
    }
}

impl PartialEq for VolumeSpace {
    /// Exact comparison of dimensions and the first three sform rows.
    fn eq(&self, other: &Self) -> bool {
        self.dims == other.dims && self.sform[..3] == other.sform[..3]
    }
}

impl VolumeSpace {
    /// Create a volume space from dimensions and the first three rows
    /// of an sform, or a full 4x4 matrix.
    pub fn new(dims: [i64; 3], sform: &[[f32; 4]]) -> Self {
        let mut ret = VolumeSpace::default();
        ret.set_space(dims, sform);
        ret
    }

    /// Replace dimensions and sform. Only the first three rows of `sform`
    /// are used, the fourth is forced to `0 0 0 1`.
    pub fn set_space(&mut self, dims: [i64; 3], sform: &[[f32; 4]]) {
        self.dims = dims;
        self.sform = IDENTITY;
        for (row, src) in self.sform.iter_mut().zip(sform.iter()).take(3) {
            *row = *src;
        }
        self.compute_inverse();
    }

    fn compute_inverse(&mut self) {
        let m = Matrix4::<f64>::from_fn(|i, j| f64::from(self.sform[i][j]));
        // a singular transform has no inverse, leave zeros in that case
        let inv = m.try_inverse().unwrap_or_else(Matrix4::zeros);
        for i in 0..4 {
            for j in 0..4 {
                self.inverse[i][j] = inv[(i, j)] as f32;
            }
        }
    }

    /// Voxel dimensions.
    pub fn dims(&self) -> [i64; 3] {
        self.dims
    }

    /// The sform as a row-major 4x4 array.
    pub fn sform(&self) -> &[[f32; 4]; 4] {
        &self.sform
    }

    /// The cached inverse of the sform.
    pub fn inverse(&self) -> &[[f32; 4]; 4] {
        &self.inverse
    }

    /// The sform as an nalgebra matrix.
    pub fn affine(&self) -> Affine4 {
        Affine4::from_fn(|i, j| self.sform[i][j])
    }

    /// Apply the sform to a (possibly fractional) voxel index.
    pub fn index_to_space(&self, index: [f32; 3]) -> [f32; 3] {
        let s = &self.sform;
        let mut out = [0.0; 3];
        for (r, o) in out.iter_mut().enumerate() {
            *o = index[0] * s[r][0] + index[1] * s[r][1] + index[2] * s[r][2] + s[r][3];
        }
        out
    }

    /// Apply the sform to an integer voxel index.
    pub fn voxel_to_space(&self, ijk: [i64; 3]) -> [f32; 3] {
        self.index_to_space([ijk[0] as f32, ijk[1] as f32, ijk[2] as f32])
    }

    /// Apply the inverse transform to a coordinate.
    pub fn space_to_index(&self, coord: [f32; 3]) -> [f32; 3] {
        let v = &self.inverse;
        let mut out = [0.0; 3];
        for (r, o) in out.iter_mut().enumerate() {
            *o = coord[0] * v[r][0] + coord[1] * v[r][1] + coord[2] * v[r][2] + v[r][3];
        }
        out
    }

    /// The voxel whose center is nearest to the given coordinate.
    pub fn enclosing_voxel(&self, coord: [f32; 3]) -> [i64; 3] {
        let idx = self.space_to_index(coord);
        [
            (0.5 + idx[0]).floor() as i64,
            (0.5 + idx[1]).floor() as i64,
            (0.5 + idx[2]).floor() as i64,
        ]
    }

    /// Whether the index triple lies inside the dimensions.
    pub fn index_valid(&self, i: i64, j: i64, k: i64) -> bool {
        i >= 0 && i < self.dims[0] && j >= 0 && j < self.dims[1] && k >= 0 && k < self.dims[2]
    }

    /// Same dimensions and nearly the same sform.
    ///
    /// Every element of the first three sform rows must agree within a ratio
    /// of 0.999, and an element that is zero in one space must be zero in the other.
    pub fn matches(&self, other: &VolumeSpace) -> bool {
        if self.dims != other.dims {
            return false;
        }
        for i in 0..3 {
            for j in 0..4 {
                let left = self.sform[i][j];
                let right = other.sform[i][j];
                if left != right
                    && (left == 0.0
                        || right == 0.0
                        || left / right < TOLER_RATIO
                        || right / left < TOLER_RATIO)
                {
                    return false;
                }
            }
        }
        true
    }

    /// Spacing vectors of the i, j and k axes, and the origin.
    pub fn spacing_vectors(&self) -> [Vector3<f32>; 4] {
        let s = &self.sform;
        let col = |c: usize| Vector3::new(s[0][c], s[1][c], s[2][c]);
        [col(0), col(1), col(2), col(3)]
    }

    /// Volume of a single voxel.
    pub fn voxel_volume(&self) -> f32 {
        let [i, j, k, _] = self.spacing_vectors();
        i.dot(&j.cross(&k)).abs()
    }

    /// Whether every voxel axis is aligned with exactly one spatial axis.
    pub fn is_plumb(&self) -> bool {
        let mut axis_used = [false; 3];
        let mut index_used = [false; 3];
        for i in 0..3 {
            for j in 0..3 {
                if self.sform[i][j] != 0.0 {
                    if axis_used[i] || index_used[j] {
                        return false;
                    }
                    axis_used[i] = true;
                    index_used[j] = true;
                }
            }
        }
        true
    }

    /// Decompose a plumb space into orientation, spacing and origin per axis.
    pub fn get_orient_and_spacing_for_plumb(&self) -> Result<PlumbInfo> {
        if !self.is_plumb() {
            return Err(CiftiError::NotPlumb);
        }
        let mut info = PlumbInfo {
            orientation: [
                OrientationType::LeftToRight,
                OrientationType::PosteriorToAnterior,
                OrientationType::InferiorToSuperior,
            ],
            spacing: [0.0; 3],
            origin: [0.0; 3],
        };
        for i in 0..3 {
            for j in 0..3 {
                let value = self.sform[i][j];
                if value != 0.0 {
                    info.spacing[j] = value;
                    info.origin[j] = self.sform[i][3];
                    info.orientation[j] = OrientationType::from_axis(i, value < 0.0);
                }
            }
        }
        Ok(info)
    }

    /// Dominant orientation of each voxel axis, valid for oblique spaces too.
    pub fn get_orientation(&self) -> [OrientationType; 3] {
        let vecs = self.spacing_vectors();
        const PERMUTATIONS: [[usize; 3]; 6] = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        // a zero spacing vector falls back to the first permutation
        let mut best = PERMUTATIONS[0];
        let mut best_val = -1.0f32;
        for perm in PERMUTATIONS.iter() {
            let val = (vecs[0][perm[0]] * vecs[1][perm[1]] * vecs[2][perm[2]]).abs();
            if val > best_val {
                best_val = val;
                best = *perm;
            }
        }
        let mut out = [OrientationType::LeftToRight; 3];
        for (axis, o) in out.iter_mut().enumerate() {
            let negative = vecs[axis][best[axis]] < 0.0;
            *o = OrientationType::from_axis(best[axis], negative);
        }
        out
    }

    /// Read a `<Volume>` element in CIFTI-1 form.
    pub(crate) fn read_cifti_xml1(elem: &XmlElement) -> Result<VolumeSpace> {
        let dims = read_volume_dims(elem)?;
        let trans = single_transform_child(elem)?;
        let mult = match trans.attr("UnitsXYZ") {
            None => {
                return parse_err(
                    "missing UnitsXYZ attribute in TransformationMatrixVoxelIndicesIJKtoXYZ",
                )
            }
            Some("NIFTI_UNITS_MM") => 1.0,
            Some("NIFTI_UNITS_MICRON") => 0.001,
            Some(other) => {
                return parse_err(format!(
                    "unrecognized value for UnitsXYZ in TransformationMatrixVoxelIndicesIJKtoXYZ: {}",
                    other
                ))
            }
        };
        let mut sform = read_matrix_text(&trans.text)?;
        if sform[3] != [0.0, 0.0, 0.0, 1.0] {
            // older writers got this wrong, tolerate it
            debug!("last row of matrix in TransformationMatrixVoxelIndicesIJKtoXYZ is not 0 0 0 1");
        }
        scale_rows(&mut sform, mult);
        Ok(VolumeSpace::new(dims, &sform))
    }

    /// Read a `<Volume>` element in CIFTI-2 form.
    pub(crate) fn read_cifti_xml2(elem: &XmlElement) -> Result<VolumeSpace> {
        let dims = read_volume_dims(elem)?;
        let trans = single_transform_child(elem)?;
        let exponent: i32 = match trans.attr("MeterExponent") {
            None => {
                return parse_err(
                    "missing MeterExponent attribute in TransformationMatrixVoxelIndicesIJKtoXYZ",
                )
            }
            Some(text) => text.trim().parse().or_else(|_| {
                parse_err(format!(
                    "noninteger value for MeterExponent in TransformationMatrixVoxelIndicesIJKtoXYZ: {}",
                    text
                ))
            })?,
        };
        let mut sform = read_matrix_text(&trans.text)?;
        if sform[3] != [0.0, 0.0, 0.0, 1.0] {
            return parse_err(
                "last row of matrix in TransformationMatrixVoxelIndicesIJKtoXYZ must be 0 0 0 1",
            );
        }
        // internal units are millimeters
        scale_rows(&mut sform, 10.0f32.powi(exponent + 3));
        Ok(VolumeSpace::new(dims, &sform))
    }

    /// Write a `<Volume>` element in CIFTI-1 form, always in millimeters.
    pub(crate) fn write_cifti_xml1(&self, xml: &mut XmlWriter) -> Result<()> {
        let dims = self.dims_string();
        xml.start("Volume", &[("VolumeDimensions", &dims)])?;
        xml.text_element(
            "TransformationMatrixVoxelIndicesIJKtoXYZ",
            &[
                ("DataSpace", "NIFTI_XFORM_UNKNOWN"),
                ("TransformedSpace", "NIFTI_XFORM_UNKNOWN"),
                ("UnitsXYZ", "NIFTI_UNITS_MM"),
            ],
            &self.matrix_text(1.0),
        )?;
        xml.end("Volume")
    }

    /// Write a `<Volume>` element in CIFTI-2 form, choosing a meter exponent
    /// that is a multiple of 3 and puts the smallest spacing in [0.05, 50).
    pub(crate) fn write_cifti_xml2(&self, xml: &mut XmlWriter) -> Result<()> {
        let dims = self.dims_string();
        let [i, j, k, _] = self.spacing_vectors();
        let min_length = i.norm().min(j.norm()).min(k.norm());
        let exponent = if min_length != 0.0 {
            3 * ((min_length.log10() - 50.0f32.log10()) / 3.0).floor() as i32
        } else {
            -3
        };
        let multiplier = 10.0f32.powi(-3 - exponent);
        let exponent = exponent.to_string();
        xml.start("Volume", &[("VolumeDimensions", &dims)])?;
        xml.text_element(
            "TransformationMatrixVoxelIndicesIJKtoXYZ",
            &[("MeterExponent", &exponent)],
            &self.matrix_text(multiplier),
        )?;
        xml.end("Volume")
    }

    fn dims_string(&self) -> String {
        format!("{},{},{}", self.dims[0], self.dims[1], self.dims[2])
    }

    fn matrix_text(&self, multiplier: f32) -> String {
        let mut text = String::new();
        for row in self.sform.iter().take(3) {
            text.push('\n');
            for value in row {
                text.push_str(&fmt_float(value * multiplier));
                text.push(' ');
            }
        }
        text.push('\n');
        text.push_str("0.0000000 0.0000000 0.0000000 1.0000000");
        text
    }
}

fn read_volume_dims(elem: &XmlElement) -> Result<[i64; 3]> {
    let text = match elem.attr("VolumeDimensions") {
        Some(t) => t,
        None => return parse_err("Volume element missing VolumeDimensions attribute"),
    };
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != 3 {
        return parse_err("VolumeDimensions attribute of Volume must contain exactly two commas");
    }
    let mut dims = [0i64; 3];
    for (d, part) in dims.iter_mut().zip(parts) {
        *d = part.trim().parse().or_else(|_| {
            parse_err(format!(
                "noninteger found in VolumeDimensions attribute of Volume: {}",
                part
            ))
        })?;
        if *d < 1 {
            return parse_err(format!(
                "found bad value in VolumeDimensions attribute of Volume: {}",
                part
            ));
        }
    }
    Ok(dims)
}

fn single_transform_child(elem: &XmlElement) -> Result<&XmlElement> {
    let trans = match elem.children.first() {
        Some(c) => c,
        None => {
            return parse_err("failed to find TransformationMatrixVoxelIndicesIJKtoXYZ element in Volume")
        }
    };
    if trans.name != "TransformationMatrixVoxelIndicesIJKtoXYZ" {
        return parse_err(format!("unexpected element in Volume: {}", trans.name));
    }
    if let Some(extra) = elem.children.get(1) {
        return parse_err(format!("unexpected element in Volume: {}", extra.name));
    }
    Ok(trans)
}

fn read_matrix_text(text: &str) -> Result<[[f32; 4]; 4]> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() != 16 {
        return parse_err("text content of TransformationMatrixVoxelIndicesIJKtoXYZ must have exactly 16 numbers separated by whitespace");
    }
    let mut out = [[0.0f32; 4]; 4];
    for (n, token) in tokens.iter().enumerate() {
        out[n / 4][n % 4] = token.parse().or_else(|_| {
            parse_err(format!(
                "non-number in text of TransformationMatrixVoxelIndicesIJKtoXYZ: {}",
                token
            ))
        })?;
    }
    Ok(out)
}

fn scale_rows(sform: &mut [[f32; 4]; 4], mult: f32) {
    for row in sform.iter_mut().take(3) {
        for v in row.iter_mut() {
            *v *= mult;
        }
    }
}

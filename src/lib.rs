//! Rust implementation of the CIFTI index mappings.
//!
//! A CIFTI file is a NIfTI-2 matrix whose dimensions are described by an XML
//! document. Each dimension has a mapping which gives meaning to its
//! indices: surface vertices and voxels ([`BrainModelsMap`]), named parcels
//! ([`ParcelsMap`]), regularly sampled series ([`SeriesMap`]), named scalar
//! maps ([`ScalarsMap`]) or label maps ([`LabelsMap`]).
//!
//! [`CiftiXml`] holds the mappings of every dimension and reads and writes
//! both the CIFTI-1 and the CIFTI-2 flavours of the XML. The [`parcellate`]
//! module reduces a dense dimension into the parcels of a label file.
//!
//! # Example
//!
//! ```no_run
//! use cifti::{CiftiXml, CiftiVersion, ALONG_COLUMN};
//! # use cifti::error::Result;
//! # fn run() -> Result<()> {
//! let xml = CiftiXml::from_file("data.dscalar.xml")?;
//! let dense = xml.get_brain_models_map(ALONG_COLUMN)?;
//! println!("{} brainordinates", dense.get_length());
//! xml.write_file("out.xml", CiftiVersion::V2_0)?;
//! # Ok(())
//! # }
//! ```
//!
//! [`BrainModelsMap`]: ./mapping/brain_models/struct.BrainModelsMap.html
//! [`ParcelsMap`]: ./mapping/parcels/struct.ParcelsMap.html
//! [`SeriesMap`]: ./mapping/series/struct.SeriesMap.html
//! [`ScalarsMap`]: ./mapping/scalars/struct.ScalarsMap.html
//! [`LabelsMap`]: ./mapping/labels/struct.LabelsMap.html
//! [`CiftiXml`]: ./xml/struct.CiftiXml.html
//! [`parcellate`]: ./parcellate/index.html
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, trivial_casts, unused_results)]

#[macro_use] extern crate quick_error;
#[macro_use] extern crate num_derive;

pub mod compact_lookup;
pub mod error;
pub mod label_table;
pub mod mapping;
pub mod metadata;
pub mod palette;
pub mod parcellate;
pub mod reduction;
pub mod structure;
pub mod volume_space;
pub mod xml;
mod util;

pub use error::{CiftiError, Result};
pub use label_table::{Label, LabelTable};
pub use mapping::{
    BrainModelsMap, IndexType, LabelsMap, MappingType, MatchResult, Parcel, ParcelsMap, ScalarsMap, SeriesMap,
    SeriesUnit,
};
pub use metadata::MetaData;
pub use palette::PaletteColorMapping;
pub use parcellate::{parcellate, parcellate_mapping, InMemoryMatrix, MatrixData, ParcellateOptions};
pub use reduction::ReductionMethod;
pub use structure::Structure;
pub use volume_space::VolumeSpace;
pub use xml::{CiftiVersion, CiftiXml, ALONG_COLUMN, ALONG_ROW};

use cifti::{BrainModelsMap, CiftiXml, InMemoryMatrix, LabelsMap, Structure, VolumeSpace, ALONG_COLUMN, ALONG_ROW};

/// 2mm isotropic voxels, origin at (-10, -10, -10).
#[allow(dead_code)]
pub const SFORM: [[f32; 4]; 3] = [
    [2.0, 0.0, 0.0, -10.0],
    [0.0, 2.0, 0.0, -10.0],
    [0.0, 0.0, 2.0, -10.0],
];

/// The 10x10x10 volume space used by the test maps.
#[allow(dead_code)]
pub fn volume_space() -> VolumeSpace {
    VolumeSpace::new([10, 10, 10], &SFORM)
}

/// Known layout:
/// indices 0..4 are vertices 0..4 of the left cortex,
/// indices 4..6 are vertices 4 and 0 of the right cortex (6 vertices),
/// indices 6..9 are voxels of the left thalamus.
#[allow(dead_code)]
pub fn dense_map() -> BrainModelsMap {
    let mut map = BrainModelsMap::new();
    map.add_surface_model(4, Structure::CortexLeft, &[0, 1, 2, 3])
        .unwrap();
    map.add_surface_model(6, Structure::CortexRight, &[4, 0])
        .unwrap();
    map.set_volume_space(volume_space()).unwrap();
    map.add_volume_model(Structure::ThalamusLeft, &[1, 2, 3, 4, 5, 6, 9, 9, 9])
        .unwrap();
    map
}

/// Surface-only dense label file over 4 vertices of the left cortex.
/// Vertices 0 and 1 are "A" (key 5), vertex 2 is "B" (key 7) and vertex 3
/// is unassigned.
#[allow(dead_code)]
pub fn surface_dlabel(keys: [f32; 4]) -> (CiftiXml, InMemoryMatrix) {
    let mut dense = BrainModelsMap::new();
    dense
        .add_surface_model(4, Structure::CortexLeft, &[0, 1, 2, 3])
        .unwrap();
    let labels = LabelsMap::new(1);
    labels.get_map_label_table(0)
        .unwrap()
        .set_label(5, "A", 1.0, 0.0, 0.0, 1.0);
    labels.get_map_label_table(0)
        .unwrap()
        .set_label(7, "B", 0.0, 0.0, 1.0, 1.0);
    let mut xml = CiftiXml::with_dimensions(2);
    xml.set_map(ALONG_ROW, labels).unwrap();
    xml.set_map(ALONG_COLUMN, dense).unwrap();
    let data = InMemoryMatrix::from_vec(1, 4, keys.to_vec()).unwrap();
    (xml, data)
}

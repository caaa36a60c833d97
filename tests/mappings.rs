mod util;

use cifti::mapping::brain_models::IndexInfo;
use cifti::{BrainModelsMap, MappingType, Parcel, ParcelsMap, Structure, VolumeSpace};
use pretty_assertions::assert_eq;
use util::{dense_map, volume_space, SFORM};

#[test]
fn brain_models_lookups_are_bijective() {
    let map = dense_map();
    assert_eq!(map.get_length(), 9);
    for index in 0..map.get_length() {
        match map.get_info_for_index(index).unwrap() {
            IndexInfo::Surface { structure, node } => {
                assert_eq!(map.get_index_for_node(node, structure), index);
            }
            IndexInfo::Voxel { structure, ijk } => {
                assert_eq!(map.get_index_for_voxel(ijk), Some((index, structure)));
            }
        }
    }
    assert!(map.get_info_for_index(9).is_err());

    let mut seen = vec![false; map.get_length() as usize];
    for structure in map.get_surface_structure_list() {
        for entry in map.get_surface_map(structure).unwrap() {
            assert!(!seen[entry.cifti_index as usize]);
            seen[entry.cifti_index as usize] = true;
        }
    }
    for entry in map.get_full_volume_map() {
        assert!(!seen[entry.cifti_index as usize]);
        seen[entry.cifti_index as usize] = true;
    }
    assert!(seen.into_iter().all(|s| s));
}

#[test]
fn failed_model_insertion_changes_nothing() {
    let mut map = dense_map();
    let before = map.clone();

    // vertex out of range
    assert!(map
        .add_surface_model(3, Structure::Cerebellum, &[0, 3])
        .is_err());
    // repeated vertex
    assert!(map
        .add_surface_model(3, Structure::Cerebellum, &[1, 1])
        .is_err());
    // repeated structure
    assert!(map
        .add_surface_model(4, Structure::CortexLeft, &[0])
        .is_err());
    // the last voxel is already used by the thalamus
    assert!(map
        .add_volume_model(Structure::ThalamusRight, &[0, 0, 0, 1, 1, 1, 9, 9, 9])
        .is_err());
    // outside of the volume space
    assert!(map
        .add_volume_model(Structure::ThalamusRight, &[0, 0, 0, 10, 0, 0])
        .is_err());

    assert_eq!(map, before);
    assert_eq!(map.get_index_for_voxel([0, 0, 0]), None);
    assert!(!map.has_surface_data(Structure::Cerebellum));

    map.add_volume_model(Structure::ThalamusRight, &[0, 0, 0])
        .unwrap();
    assert_eq!(map.get_index_for_voxel([0, 0, 0]), Some((9, Structure::ThalamusRight)));
}

#[test]
fn volume_space_binds_before_voxels() {
    let mut map = BrainModelsMap::new();
    assert!(map.add_volume_model(Structure::BrainStem, &[1, 1, 1]).is_err());
    assert!(!map.has_volume_space());
    map.set_volume_space(volume_space()).unwrap();
    map.add_volume_model(Structure::BrainStem, &[1, 1, 1, 8, 8, 8])
        .unwrap();

    // a smaller space would leave a voxel outside, so the old one stays
    let small = VolumeSpace::new([5, 5, 5], &SFORM);
    assert!(map.set_volume_space(small).is_err());
    assert_eq!(map.get_volume_space().unwrap(), &volume_space());
    assert!(map.has_volume_data_for(Structure::BrainStem));
}

#[test]
fn parcels_do_not_overlap() {
    let mut parcels = ParcelsMap::new();
    parcels.add_surface(10, Structure::CortexLeft).unwrap();
    parcels.set_volume_space(volume_space()).unwrap();

    let mut a = Parcel::new("A");
    a.surface_nodes
        .entry(Structure::CortexLeft)
        .or_default()
        .extend(vec![1, 2, 3]);
    a.voxel_indices.insert([0, 0, 1]);
    parcels.add_parcel(a).unwrap();
    let before = parcels.clone();

    // overlaps A on vertex 3
    let mut b = Parcel::new("B");
    b.surface_nodes
        .entry(Structure::CortexLeft)
        .or_default()
        .extend(vec![3, 4]);
    assert!(parcels.add_parcel(b).is_err());

    // overlaps A on a voxel
    let mut c = Parcel::new("C");
    c.voxel_indices.insert([5, 5, 5]);
    c.voxel_indices.insert([0, 0, 1]);
    assert!(parcels.add_parcel(c).is_err());

    // unknown surface
    let mut d = Parcel::new("D");
    d.surface_nodes
        .entry(Structure::CortexRight)
        .or_default()
        .insert(0);
    assert!(parcels.add_parcel(d).is_err());

    // duplicate name
    assert!(parcels.add_parcel(Parcel::new("A")).is_err());

    assert_eq!(parcels, before);
    assert_eq!(parcels.get_index_for_node(4, Structure::CortexLeft), -1);
    assert_eq!(parcels.get_index_for_voxel([5, 5, 5]), -1);
    assert_eq!(parcels.get_index_for_node(2, Structure::CortexLeft), 0);
    assert_eq!(parcels.get_index_from_number_or_name("A"), 0);
    assert_eq!(parcels.get_index_from_number_or_name("1"), 0);
}

#[test]
fn mapping_types_match_by_kind() {
    let dense = MappingType::from(dense_map());
    let mut shuffled = BrainModelsMap::new();
    shuffled
        .add_surface_model(6, Structure::CortexRight, &[4, 0])
        .unwrap();
    let shuffled = MappingType::from(shuffled);
    assert!(dense.approximate_match(&dense.clone()).is_ok());
    assert!(dense.approximate_match(&shuffled).is_err());
    assert!(dense
        .approximate_match(&MappingType::from(ParcelsMap::new()))
        .is_err());
}

use ob2_oxide::prelude::*;

// Two stacked quads: vertices 0..4 are the lower body (label 0), vertices
// 4..6 the upper (label 1). Faces carry labels and an alpha section.
fn humanoid_bytes() -> Vec<u8> {
    let mut data = vec![
        0, 1, 3, 1, 3, 1, // vertex flags
        1, 1, 1, 1, // face orientations
        0, 0, 1, 1, // face labels
        0, 0, 0, 0, 1, 1, // vertex labels
        0, 0, 0, 0, // face alphas
        64, 65, 65, 63, 65, 65, 63, 65, 65, 63, 65, 65, // face index deltas
        0, 31, 0, 31, 0, 40, 0, 40, // face colors
        74, 54, 74, 54, 74, // x deltas
        114, 114, // y deltas
    ];
    data.extend_from_slice(&[0, 6, 0, 4, 0, 0, 0, 1, 1, 1, 0, 5, 0, 2, 0, 0, 0, 12]);
    data
}

fn humanoid_registry() -> SkeletonRegistry {
    let skeleton = Skeleton::new(
        vec![
            TransformKind::Pivot,
            TransformKind::Translate,
            TransformKind::Translate,
            TransformKind::FaceAlpha,
        ],
        vec![vec![0, 1], vec![0], vec![1], vec![1]],
    );
    let mut registry = SkeletonRegistry::new();
    registry.insert(1, skeleton);
    registry
}

// Group 1 translates the lower body by +3 on x.
fn shuffle_clip_bytes() -> Vec<u8> {
    vec![
        0, 0, 0, 1, 4, // head: reserved, skeleton 1, 4 groups
        0, 1, 0, 0, // flags
        67, // +3
        0, // delay
        0, 5, 0, 4, 0, 1, 0, 1, // trailer
    ]
}

#[test]
fn mesh_decode_encode_is_byte_identical_for_unedited_files() {
    let bytes = humanoid_bytes();
    let mesh = decode::mesh::decode(&bytes).unwrap();

    assert_eq!(mesh.vertex_count, 6);
    assert_eq!(mesh.face_count, 4);
    assert_eq!(mesh.vertex_x, vec![0, 10, 0, 10, 0, 10]);
    assert_eq!(mesh.vertex_y, vec![0, 0, 50, 50, 100, 100]);
    assert_eq!(mesh.face_color, vec![31, 31, 40, 40]);
    assert_eq!(mesh.face_alpha, Some(vec![0, 0, 0, 0]));

    assert_eq!(encode::mesh::encode(&mesh).unwrap(), bytes);
}

#[test]
fn relabeled_mesh_still_roundtrips_after_grouping() {
    let mut mesh = decode::mesh::decode(&humanoid_bytes()).unwrap();
    mesh.build_label_groups();
    assert!(mesh.vertex_labels().is_grouped());

    // grouping is destructive on the raw arrays, but the encoder flattens
    // the groups back to the same label bytes
    assert_eq!(encode::mesh::encode(&mesh).unwrap(), humanoid_bytes());
}

#[test]
fn clip_roundtrips_against_its_skeleton() {
    let registry = humanoid_registry();
    let clip = decode::clip::decode(3, &shuffle_clip_bytes(), &registry).unwrap();

    assert_eq!(clip.skeleton, 1);
    assert_eq!(clip.ops().len(), 2, "pivot reset + translate");
    assert_eq!(clip.ops()[0].group, 0);
    assert_eq!((clip.ops()[1].group, clip.ops()[1].x), (1, 3));

    let bytes = encode::clip::encode(&clip, &registry).unwrap();
    let again = decode::clip::decode(3, &bytes, &registry).unwrap();
    assert_eq!(again.ops(), clip.ops());
}

#[test]
fn posing_moves_only_the_labeled_body_half() {
    let registry = humanoid_registry();
    let mut mesh = decode::mesh::decode(&humanoid_bytes()).unwrap();
    mesh.build_label_groups();

    let clip = decode::clip::decode(3, &shuffle_clip_bytes(), &registry).unwrap();
    pose::apply(&mut mesh, &clip, &registry).unwrap();

    assert_eq!(mesh.vertex_x, vec![3, 13, 3, 13, 0, 10]);
    assert_eq!(mesh.vertex_y, vec![0, 0, 50, 50, 100, 100]);

    mesh.reset_to_original();
    assert_eq!(mesh.vertex_x, vec![0, 10, 0, 10, 0, 10]);
}

#[test]
fn assembled_parts_pose_and_export_with_edits() {
    let registry = humanoid_registry();
    let parts = vec![
        decode::mesh::decode(&humanoid_bytes()).unwrap(),
        decode::mesh::decode(&humanoid_bytes()).unwrap(),
    ];

    let mut assembly = Assembly::merge(parts);
    assert_eq!(assembly.combined().vertex_count, 6, "identical parts dedup");
    assert_eq!(assembly.combined().face_count, 8);

    assembly.combined_mut().build_label_groups();
    let clip = decode::clip::decode(3, &shuffle_clip_bytes(), &registry).unwrap();
    pose::apply(assembly.combined_mut(), &clip, &registry).unwrap();
    assert_eq!(assembly.combined().vertex_x[0], 3);
    assert_eq!(assembly.combined().vertex_x[4], 0, "upper body untouched");

    // a live edit lands in both parts, and the parts re-export with it
    assert!(assembly.update_vertex(5, 99, 100, 0));
    for bytes in assembly.export_parts().unwrap() {
        let part = decode::mesh::decode(&bytes).unwrap();
        assert_eq!((part.vertex_x[5], part.vertex_y[5]), (99, 100));
    }
    assert!(!assembly.update_vertex(6, 0, 0, 0));
}

use approx::assert_relative_eq;
use nalgebra::{Matrix4, Point3};
use quickcheck_macros::quickcheck;

use trellis::{
    extract::{extract, reformat_color},
    hedron::{
        AttributeDescriptor, BufferStore, BufferView, Format, Geometry, IndexDescriptor,
        InstanceSet, Patch, ResourceId, Semantic, Topology,
    },
    BoundingSphere, Error, GeometryAssembler,
};

const BUFFER: ResourceId = ResourceId::new(0, 0);
const VERTICES: ResourceId = ResourceId::new(1, 0);
const INSTANCES: ResourceId = ResourceId::new(2, 0);
const INDICES: ResourceId = ResourceId::new(3, 0);

fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Three interleaved vertices: position then normal, 24 bytes apiece.
fn interleaved() -> Vec<u8> {
    floats(&[
        0.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
        2.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
        1.0, 3.0, 0.0, 0.0, 0.0, 1.0,
    ])
}

fn store(vertices: Vec<u8>, instances: Option<Vec<u8>>) -> BufferStore {
    let mut store = BufferStore::new();
    let vertex_len = vertices.len();
    let mut bytes = vertices;
    let instance_len = instances.as_ref().map_or(0, Vec::len);
    bytes.extend(instances.unwrap_or_default());
    store.insert_buffer(BUFFER, bytes).unwrap();
    store
        .insert_view(VERTICES, BufferView::new(BUFFER, 0, vertex_len, 24))
        .unwrap();
    store
        .insert_view(
            INSTANCES,
            BufferView::new(BUFFER, vertex_len, instance_len, 0),
        )
        .unwrap();
    store
}

fn triangle() -> Patch {
    Patch::new(3, Topology::Triangles, ResourceId::default())
        .with_attribute(AttributeDescriptor::new(
            VERTICES,
            Semantic::Position,
            Format::Vec3,
        ))
        .with_attribute(
            AttributeDescriptor::new(VERTICES, Semantic::Normal, Format::Vec3).with_offset(12),
        )
}

#[test]
fn packed_positions_are_copied_verbatim() {
    let source = floats(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let mut store = BufferStore::new();
    store.insert_buffer(BUFFER, source.clone()).unwrap();
    let view = BufferView::new(BUFFER, 0, source.len(), 0);
    let attr = AttributeDescriptor::new(VERTICES, Semantic::Position, Format::Vec3);
    let raw = store.buffer(&BUFFER).unwrap();
    assert_eq!(extract(raw, &view, &attr, 2).unwrap(), source);
}

#[test]
fn interleaved_positions_drop_normals() {
    let store = store(interleaved(), None);
    let view = store.view(&VERTICES).unwrap();
    let raw = store.source(view).unwrap();
    let attr = AttributeDescriptor::new(VERTICES, Semantic::Position, Format::Vec3);
    assert_eq!(
        extract(raw, view, &attr, 3).unwrap(),
        floats(&[0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 1.0, 3.0, 0.0])
    );
}

#[test]
fn red_becomes_opaque_red() {
    assert_eq!(
        reformat_color(&floats(&[1.0, 0.0, 0.0]), Format::Vec3).unwrap(),
        vec![255, 0, 0, 255]
    );
}

#[test]
fn bounding_sphere_of_two_points() {
    let sphere = BoundingSphere::from_points(
        &[Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)],
        &Matrix4::identity(),
    )
    .unwrap();
    assert_relative_eq!(sphere.center, Point3::new(1.0, 0.0, 0.0));
    assert_relative_eq!(sphere.radius, 1.0);
}

#[test]
fn missing_semantics_are_synthesized() {
    let store = store(interleaved(), None);
    let bundle = GeometryAssembler::new(&store)
        .assemble_patch(BUFFER, 0, &triangle(), None, &Matrix4::identity())
        .unwrap();

    let color = bundle.attribute(Semantic::Color).unwrap();
    assert!(color.synthesized);
    assert_eq!(color.format, Format::U8Vec4);
    assert_eq!(color.bytes, [255u8; 4].repeat(3));

    let texture = bundle.attribute(Semantic::Texture).unwrap();
    assert_eq!(texture.len(), 3);
    assert_eq!(bundle.normalization_factor, 4294967295.0);

    let normal = bundle.attribute(Semantic::Normal).unwrap();
    assert!(!normal.synthesized);
    assert_eq!(normal.bytes, floats(&[0.0, 0.0, 1.0]).repeat(3));

    assert!(bundle.index.synthesized);
    assert_eq!(bundle.index.count, 3);
    assert_eq!(bundle.instance_count(), 0);
    assert_relative_eq!(bundle.bounding_sphere.center, Point3::new(1.0, 1.0, 0.0));
}

#[test]
fn instances_bound_the_sphere() {
    let mut blocks = vec![0u8; 128];
    blocks[..12].copy_from_slice(&floats(&[10.0, 0.0, 0.0]));
    blocks[64..76].copy_from_slice(&floats(&[-10.0, 0.0, 0.0]));
    let store = store(interleaved(), Some(blocks));

    let set = InstanceSet { view: INSTANCES };
    let bundle = GeometryAssembler::new(&store)
        .assemble_patch(BUFFER, 0, &triangle(), Some(&set), &Matrix4::identity())
        .unwrap();
    assert_eq!(bundle.instance_count(), 2);
    assert_relative_eq!(bundle.bounding_sphere.center, Point3::origin());
    assert_relative_eq!(bundle.bounding_sphere.radius, 10.0);
}

#[test]
fn ragged_instances_fail() {
    let store = store(interleaved(), Some(vec![0; 100]));
    let set = InstanceSet { view: INSTANCES };
    assert!(matches!(
        GeometryAssembler::new(&store).assemble_patch(
            BUFFER,
            0,
            &triangle(),
            Some(&set),
            &Matrix4::identity()
        ),
        Err(Error::MalformedInstanceBuffer(100))
    ));
}

#[test]
fn overdeclared_vertices_are_clamped() {
    let store = store(interleaved(), None);
    let mut patch = triangle();
    patch.vertex_count = 6;
    let bundle = GeometryAssembler::new(&store)
        .assemble_patch(BUFFER, 0, &patch, None, &Matrix4::identity())
        .unwrap();
    assert_eq!(bundle.vertex_count, 3);
    for semantic in [
        Semantic::Position,
        Semantic::Normal,
        Semantic::Color,
        Semantic::Texture,
    ] {
        assert_eq!(bundle.attribute(semantic).unwrap().len(), 3, "{semantic:?}");
    }
    assert_eq!(bundle.index.count, 3);
    assert_eq!(
        bundle.index.bytes,
        [0u32, 1, 2].iter().flat_map(|i| i.to_le_bytes()).collect::<Vec<_>>()
    );
}

#[test]
fn stray_index_fails_patch() {
    let mut store = store(interleaved(), None);
    let index_buffer = ResourceId::new(1, 0);
    let indices: Vec<u8> = [0u16, 1, 5].iter().flat_map(|i| i.to_le_bytes()).collect();
    store.insert_buffer(index_buffer, indices).unwrap();
    store
        .insert_view(INDICES, BufferView::new(index_buffer, 0, 6, 0))
        .unwrap();
    let patch = triangle().with_indices(IndexDescriptor::new(INDICES, Format::U16, 3));
    assert!(matches!(
        GeometryAssembler::new(&store).assemble_patch(
            BUFFER,
            0,
            &patch,
            None,
            &Matrix4::identity()
        ),
        Err(Error::IndexOutOfBounds {
            index: 5,
            vertex_count: 3
        })
    ));
}

#[test]
fn failed_patch_spares_siblings() {
    let store = store(interleaved(), None);
    let broken = Patch::new(3, Topology::Triangles, ResourceId::default()).with_attribute(
        AttributeDescriptor::new(ResourceId::new(99, 0), Semantic::Position, Format::Vec3),
    );
    let geometry = Geometry::new(vec![broken, triangle()]);
    let results =
        GeometryAssembler::new(&store).assemble(BUFFER, &geometry, None, &Matrix4::identity());
    assert!(results[0].is_err());
    assert_eq!(results[1].as_ref().unwrap().patch, 1);
}

/// Packed extraction returns every complete element the view holds, and nothing else.
#[quickcheck]
fn packed_extraction_is_exact(data: Vec<u8>, count: u8) -> bool {
    let mut store = BufferStore::new();
    store.insert_buffer(BUFFER, data.clone()).unwrap();
    let view = BufferView::new(BUFFER, 0, data.len(), 0);
    let attr = AttributeDescriptor::new(VERTICES, Semantic::Texture, Format::U16Vec2);
    let raw = store.buffer(&BUFFER).unwrap();
    let out = extract(raw, &view, &attr, count as usize).unwrap();
    let expected = (data.len() / 4).min(count as usize) * 4;
    out.len() == expected && out[..] == data[..expected]
}

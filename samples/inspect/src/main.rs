use clap::Parser;
use nalgebra::{Matrix4, UnitQuaternion, Vector3};

use hedron::{
    AttributeDescriptor, BufferView, Format, Geometry, IndexDescriptor, InstanceSet, Patch,
    ResourceId, Semantic, Topology,
};
use trellis::{
    resource::{BufferRecord, EntityRecord, LightKind, LightRecord, MaterialRecord, RenderRep},
    transform::{compose, to_protocol},
    Client, DrawItem, Message, RenderContext, Resource, ResourceKind,
};

mod cli;
mod mapped;

use cli::Cli;
use mapped::MappedFile;

const VERTICES: ResourceId = ResourceId::new(0, 0);
const REMOTE: ResourceId = ResourceId::new(1, 0);

const POSITION_VIEW: ResourceId = ResourceId::new(0, 0);
const INDEX_VIEW: ResourceId = ResourceId::new(1, 0);
const INSTANCE_VIEW: ResourceId = ResourceId::new(2, 0);
const REMOTE_VIEW: ResourceId = ResourceId::new(3, 0);

const MESH: ResourceId = ResourceId::new(0, 0);
const REMOTE_MESH: ResourceId = ResourceId::new(1, 0);
const MATERIAL: ResourceId = ResourceId::new(0, 0);
const LIGHT: ResourceId = ResourceId::new(0, 0);
const ENTITY: ResourceId = ResourceId::new(0, 0);
const REMOTE_ENTITY: ResourceId = ResourceId::new(1, 0);

#[derive(Debug, thiserror::Error)]
enum InspectError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Client(#[from] trellis::Error),
    #[error("buffer file holds {0} bytes, which isn't a whole number of VEC3 positions")]
    RaggedPositions(usize),
}

fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// A unit quad in the XY plane, as four positions followed by six `u16` indices.
fn quad() -> (Vec<u8>, Patch) {
    let mut bytes = floats(&[
        -0.5, -0.5, 0.0, //
        0.5, -0.5, 0.0, //
        0.5, 0.5, 0.0, //
        -0.5, 0.5, 0.0,
    ]);
    bytes.extend([0u16, 1, 2, 0, 2, 3].iter().flat_map(|i| i.to_le_bytes()));
    let patch = Patch::new(4, Topology::Triangles, MATERIAL)
        .with_attribute(AttributeDescriptor::new(
            POSITION_VIEW,
            Semantic::Position,
            Format::Vec3,
        ))
        .with_indices(IndexDescriptor::new(INDEX_VIEW, Format::U16, 6));
    (bytes, patch)
}

/// `count` instance blocks laid out along X, each white with identity rotation and unit scale.
fn instance_blocks(count: u32) -> Vec<u8> {
    (0..count)
        .flat_map(|i| {
            floats(&[
                i as f32 * 1.5, 0.0, 0.0, // position
                1.0, 1.0, 1.0, 1.0, // color
                0.0, 0.0, 0.0, 1.0, // rotation
                1.0, 1.0, 1.0, // scale
                0.0, 0.0,
            ])
        })
        .collect()
}

fn create(id: ResourceId, resource: Resource) -> Message {
    Message::Create { id, resource }
}

/// Messages describing the main entity: its buffers, geometry, material, and light.
fn main_entity(cli: &Cli) -> Result<Vec<Message>, InspectError> {
    let (mut bytes, patch, index_len) = match &cli.buffer {
        Some(path) => {
            let file = MappedFile::open(path)?;
            let width = Format::Vec3.byte_width();
            if file.len() % width != 0 {
                return Err(InspectError::RaggedPositions(file.len()));
            }
            let patch = Patch::new(file.len() / width, Topology::Points, MATERIAL).with_attribute(
                AttributeDescriptor::new(POSITION_VIEW, Semantic::Position, Format::Vec3),
            );
            (file.to_vec(), patch, 0)
        }
        None => {
            let (bytes, patch) = quad();
            (bytes, patch, 12)
        }
    };
    let position_len = bytes.len() - index_len;
    let instance_offset = bytes.len();
    let blocks = instance_blocks(cli.instances);
    let instance_len = blocks.len();
    bytes.extend(blocks);

    let instances = (cli.instances > 0).then_some(InstanceSet {
        view: INSTANCE_VIEW,
    });
    let transform = compose(&cli.translation, &UnitQuaternion::identity(), &cli.scale);

    let mut messages = vec![
        create(VERTICES, Resource::Buffer(BufferRecord::inline(bytes))),
        create(
            POSITION_VIEW,
            Resource::BufferView(BufferView::new(VERTICES, 0, position_len, 0)),
        ),
    ];
    if index_len > 0 {
        messages.push(create(
            INDEX_VIEW,
            Resource::BufferView(BufferView::new(VERTICES, position_len, index_len, 0)),
        ));
    }
    if instances.is_some() {
        messages.push(create(
            INSTANCE_VIEW,
            Resource::BufferView(BufferView::new(VERTICES, instance_offset, instance_len, 0)),
        ));
    }
    messages.extend([
        create(MESH, Resource::Geometry(Geometry::new(vec![patch]))),
        create(
            MATERIAL,
            Resource::Material(MaterialRecord {
                name: Some("white".to_owned()),
                ..Default::default()
            }),
        ),
        create(
            LIGHT,
            Resource::Light(LightRecord {
                name: Some("key".to_owned()),
                color: [1.0; 4],
                intensity: 2.0,
                kind: LightKind::Point { range: 10.0 },
            }),
        ),
        create(
            ENTITY,
            Resource::Entity(EntityRecord {
                name: Some("main".to_owned()),
                parent: None,
                transform: Some(to_protocol(&transform)),
                render: Some(RenderRep {
                    mesh: MESH,
                    instances,
                }),
                lights: vec![LIGHT],
            }),
        ),
    ]);
    Ok(messages)
}

/// Messages describing a point cloud of `vertices` positions fetched from `uri`.
fn remote_entity(uri: &str, vertices: usize) -> Vec<Message> {
    let size = vertices * Format::Vec3.byte_width();
    let patch = Patch::new(vertices, Topology::Points, MATERIAL).with_attribute(
        AttributeDescriptor::new(REMOTE_VIEW, Semantic::Position, Format::Vec3),
    );
    vec![
        create(REMOTE, Resource::Buffer(BufferRecord::uri(uri, size))),
        create(
            REMOTE_VIEW,
            Resource::BufferView(BufferView::new(REMOTE, 0, size, 0)),
        ),
        create(REMOTE_MESH, Resource::Geometry(Geometry::new(vec![patch]))),
        create(
            REMOTE_ENTITY,
            Resource::Entity(EntityRecord {
                name: Some("remote".to_owned()),
                parent: Some(ENTITY),
                render: Some(RenderRep {
                    mesh: REMOTE_MESH,
                    instances: None,
                }),
                ..Default::default()
            }),
        ),
    ]
}

fn summarize(item: &DrawItem<'_>) {
    let bundle = item.bundle;
    let vertex_bytes: usize = bundle.attributes.values().map(|a| a.bytes.len()).sum();
    tracing::info!(
        entity = %item.entity,
        geometry = %bundle.geometry,
        patch = bundle.patch,
        topology = ?bundle.topology,
        vertices = bundle.vertex_count,
        vertex_bytes,
        indices = bundle.index.count,
        index_width = bundle.index.element_width(),
        synthesized_indices = bundle.index.synthesized,
        instances = bundle.instance_count(),
        center = ?bundle.bounding_sphere.center,
        radius = bundle.bounding_sphere.radius,
        attention = item.attention,
        "draw"
    );
}

fn run(cli: Cli) -> Result<(), InspectError> {
    let mut client = Client::new();

    let mut messages = main_entity(&cli)?;
    if let Some(uri) = &cli.uri {
        messages.extend(remote_entity(uri, cli.uri_vertices));
    }
    for message in messages {
        client.handle(message)?;
    }

    let camera = compose(
        &Vector3::new(0.0, 0.0, -5.0),
        &UnitQuaternion::identity(),
        &Vector3::repeat(1.0),
    );
    let cx = RenderContext::new(Matrix4::identity(), camera, Some(ENTITY));
    for frame in 0..cli.frames {
        let span = tracing::info_span!("frame", frame);
        let _guard = span.enter();
        let items = client.frame(&cx);
        tracing::info!(items = items.len(), "frame ready");
        for item in &items {
            summarize(item);
        }
        if let Some(light) = client.state().scene().light(&LIGHT) {
            tracing::info!(position = ?light.world_position, direction = ?light.direction, "light");
        }
        if client.state().is_pending(ResourceKind::Buffer, REMOTE) {
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
    }

    for ((kind, id), error) in client.state().failed_fetches() {
        tracing::warn!(%kind, %id, %error, "fetch failed");
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    cli.initialize_tracing();
    tracing::debug!(?cli);

    if let Err(e) = run(cli) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use nalgebra::Matrix4;
use url::Url;

use trellis::{
    fetch::{FetchError, Fetcher},
    hedron::{
        AttributeDescriptor, BufferView, Format, Geometry, InstanceSet, Patch, ResourceId,
        Semantic, Topology,
    },
    resource::{
        BufferRecord, EntityRecord, EntityUpdate, LightKind, LightRecord, RenderRep,
    },
    transform::to_protocol,
    Client, Error, Message, RenderContext, Resource, ResourceKind, Update,
};

const BUFFER: ResourceId = ResourceId::new(0, 0);
const VIEW: ResourceId = ResourceId::new(0, 0);
const GEOMETRY: ResourceId = ResourceId::new(0, 0);
const ENTITY: ResourceId = ResourceId::new(0, 0);
const CHILD: ResourceId = ResourceId::new(1, 0);
const LIGHT: ResourceId = ResourceId::new(0, 0);

fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn triangle_bytes() -> Vec<u8> {
    floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
}

fn create(id: ResourceId, resource: Resource) -> Message {
    Message::Create { id, resource }
}

/// A buffer, view, and single-triangle geometry.
fn geometry_messages(buffer: BufferRecord) -> Vec<Message> {
    vec![
        create(BUFFER, Resource::Buffer(buffer)),
        create(VIEW, Resource::BufferView(BufferView::new(BUFFER, 0, 36, 0))),
        create(
            GEOMETRY,
            Resource::Geometry(Geometry::new(vec![Patch::new(
                3,
                Topology::Triangles,
                ResourceId::default(),
            )
            .with_attribute(AttributeDescriptor::new(
                VIEW,
                Semantic::Position,
                Format::Vec3,
            ))])),
        ),
    ]
}

fn entity(parent: Option<ResourceId>, x: f32) -> EntityRecord {
    let mut transform = Matrix4::identity();
    transform[(3, 0)] = x;
    EntityRecord {
        name: Some("triangle".to_owned()),
        parent,
        transform: Some(to_protocol(&transform)),
        render: Some(RenderRep {
            mesh: GEOMETRY,
            instances: None,
        }),
        lights: vec![LIGHT],
    }
}

fn light() -> LightRecord {
    LightRecord {
        name: None,
        color: [1.0; 4],
        intensity: 1.0,
        kind: LightKind::Point { range: 5.0 },
    }
}

fn frame(client: &mut Client) -> usize {
    let cx = RenderContext::new(Matrix4::identity(), Matrix4::identity(), None);
    client.frame(&cx).len()
}

#[test]
fn entity_lifecycle() {
    let mut client = Client::new();
    for message in geometry_messages(BufferRecord::inline(triangle_bytes())) {
        client.handle(message).unwrap();
    }
    client.handle(create(LIGHT, Resource::Light(light()))).unwrap();
    client
        .handle(create(ENTITY, Resource::Entity(entity(None, 1.0))))
        .unwrap();
    client
        .handle(create(
            CHILD,
            Resource::Entity(EntityRecord {
                lights: Vec::new(),
                ..entity(Some(ENTITY), 2.0)
            }),
        ))
        .unwrap();

    // nothing happens until the frame drains the queue
    assert!(client.state().scene().is_empty());
    assert_eq!(frame(&mut client), 2);

    let scene = client.state().scene();
    assert_eq!(scene.world_transform(&CHILD).unwrap()[(3, 0)], 3.0);
    assert_eq!(scene.light(&LIGHT).unwrap().world_position.x, 1.0);
    let bundle = &scene.node(&CHILD).unwrap().patches[0];
    assert!((bundle.bounding_sphere.center.x - 3.333_333).abs() < 1e-5);

    // moving the parent moves the child's bounds and the parent's light
    let mut moved = Matrix4::identity();
    moved[(3, 0)] = 5.0;
    client
        .handle(Message::update(
            ENTITY,
            Update::Entity(EntityUpdate {
                transform: Some(to_protocol(&moved)),
                ..Default::default()
            }),
        ))
        .unwrap();
    frame(&mut client);
    let scene = client.state().scene();
    assert_eq!(scene.world_transform(&CHILD).unwrap()[(3, 0)], 7.0);
    let center = scene.node(&CHILD).unwrap().patches[0].bounding_sphere.center;
    assert!((center.x - 7.333_333).abs() < 1e-5);
    assert_eq!(scene.light(&LIGHT).unwrap().world_position.x, 5.0);
    assert_eq!(client.state().entity(&ENTITY).unwrap().trs.translation.x, 5.0);

    client
        .handle(Message::Remove {
            kind: ResourceKind::Entity,
            id: ENTITY,
        })
        .unwrap();
    assert_eq!(frame(&mut client), 0);
    let scene = client.state().scene();
    assert!(scene.is_empty());
    assert!(scene.light(&LIGHT).is_none());
}

#[test]
fn removing_parent_drops_descendants() {
    let mut client = Client::new();
    for message in geometry_messages(BufferRecord::inline(triangle_bytes())) {
        client.handle(message).unwrap();
    }
    client.handle(create(LIGHT, Resource::Light(light()))).unwrap();
    client
        .handle(create(
            ENTITY,
            Resource::Entity(EntityRecord {
                lights: Vec::new(),
                ..entity(None, 1.0)
            }),
        ))
        .unwrap();
    client
        .handle(create(CHILD, Resource::Entity(entity(Some(ENTITY), 2.0))))
        .unwrap();
    assert_eq!(frame(&mut client), 2);
    assert!(client.state().scene().light(&LIGHT).is_some());

    client
        .handle(Message::Remove {
            kind: ResourceKind::Entity,
            id: ENTITY,
        })
        .unwrap();
    assert_eq!(frame(&mut client), 0);
    let scene = client.state().scene();
    assert!(scene.node(&CHILD).is_err());
    assert!(scene.light(&LIGHT).is_none());
    assert!(client.state().entity(&CHILD).is_err());
}

#[test]
fn immutable_and_mismatched() {
    let mut client = Client::new();
    for message in geometry_messages(BufferRecord::inline(triangle_bytes())) {
        client.handle(message).unwrap();
    }
    assert!(matches!(
        client.handle(Message::Update {
            kind: ResourceKind::Geometry,
            id: GEOMETRY,
            update: Update::Material(Default::default()),
        }),
        Err(Error::Immutable(ResourceKind::Geometry))
    ));
    client
        .handle(create(ENTITY, Resource::Entity(EntityRecord::default())))
        .unwrap();
    assert!(matches!(
        client.handle(Message::Update {
            kind: ResourceKind::Entity,
            id: ENTITY,
            update: Update::Material(Default::default()),
        }),
        Err(Error::KindMismatch {
            expected: ResourceKind::Entity,
            actual: ResourceKind::Material
        })
    ));
    assert!(matches!(
        client.handle(Message::update(
            ResourceId::new(7, 0),
            Update::Material(Default::default())
        )),
        Err(Error::UnknownResource { .. })
    ));
    assert!(matches!(
        client.handle(create(BUFFER, Resource::Buffer(BufferRecord::inline(vec![1])))),
        Err(Error::Buffer(_))
    ));
    assert!(matches!(
        client.handle(create(
            ResourceId::new(5, 0),
            Resource::Buffer(BufferRecord {
                name: None,
                size: 0,
                source: None
            })
        )),
        Err(Error::MissingBufferSource(_))
    ));
}

/// Serves canned bytes, or fails, for any URI.
struct Canned(Option<Vec<u8>>);

impl Fetcher for Canned {
    fn fetch(&self, uri: &Url) -> Result<Vec<u8>, FetchError> {
        self.0
            .clone()
            .ok_or_else(|| FetchError::UnsupportedUriScheme(uri.scheme().to_owned()))
    }
}

/// Drain frames until `done` holds, giving background fetches time to land.
fn frames_until(client: &mut Client, done: impl Fn(&Client) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        frame(client);
        if done(client) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn fetched_buffer_arrives_through_queue() {
    let mut client = Client::with_fetcher(Arc::new(Canned(Some(triangle_bytes()))));
    for message in geometry_messages(BufferRecord::uri("https://example.com/triangle.bin", 36)) {
        client.handle(message).unwrap();
    }
    client
        .handle(create(ENTITY, Resource::Entity(EntityRecord {
            lights: Vec::new(),
            ..entity(None, 0.0)
        })))
        .unwrap();
    assert!(client.state().is_pending(ResourceKind::Buffer, BUFFER));

    assert!(frames_until(&mut client, |c| c.state().store().contains_buffer(&BUFFER)));
    // the arrival re-renders the entity that was waiting on it
    assert!(frames_until(&mut client, |c| {
        !c.state().scene().node(&ENTITY).unwrap().patches.is_empty()
    }));
}

#[test]
fn failed_fetch_is_recorded() {
    let mut client = Client::with_fetcher(Arc::new(Canned(None)));
    for message in geometry_messages(BufferRecord::uri("https://example.com/missing.bin", 36)) {
        client.handle(message).unwrap();
    }
    client
        .handle(create(ENTITY, Resource::Entity(EntityRecord {
            lights: Vec::new(),
            ..entity(None, 0.0)
        })))
        .unwrap();
    assert!(frames_until(&mut client, |c| c.state().failed_fetches().count() == 1));
    assert!(client.state().scene().node(&ENTITY).unwrap().patches.is_empty());
    assert!(!client.state().store().contains_buffer(&BUFFER));
}

#[test]
fn instanced_entity_records_positions() {
    let mut client = Client::new();
    let mut bytes = triangle_bytes();
    let mut block = vec![0u8; 64];
    block[..12].copy_from_slice(&floats(&[4.0, 5.0, 6.0]));
    bytes.extend(block);
    let mut messages = geometry_messages(BufferRecord::inline(bytes));
    messages.push(create(
        ResourceId::new(1, 0),
        Resource::BufferView(BufferView::new(BUFFER, 36, 64, 0)),
    ));
    for message in messages {
        client.handle(message).unwrap();
    }
    client
        .handle(create(ENTITY, Resource::Entity(EntityRecord {
            render: Some(RenderRep {
                mesh: GEOMETRY,
                instances: Some(InstanceSet {
                    view: ResourceId::new(1, 0),
                }),
            }),
            lights: Vec::new(),
            ..entity(None, 0.0)
        })))
        .unwrap();
    assert_eq!(frame(&mut client), 1);
    let entity = client.state().entity(&ENTITY).unwrap();
    assert_eq!(entity.instance_count, 1);
    assert_eq!(entity.instance_positions[0].y, 5.0);
}

#[test]
fn tasks_run_in_order_despite_failures() {
    let mut client = Client::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let tasks = client.tasks();
    for i in 0..3 {
        let log = log.clone();
        tasks.push(move |_| {
            log.lock().unwrap().push(i);
            if i == 1 {
                Err(Error::EmptyPointSet)
            } else {
                Ok(())
            }
        });
    }
    assert_eq!(client.drain(), 3);
    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    assert!(client.is_idle());
}

#[cfg(feature = "images")]
#[test]
fn image_waits_for_its_buffer() {
    use trellis::resource::{ImageRecord, ImageSource};

    let mut png = std::io::Cursor::new(Vec::new());
    image::RgbaImage::new(2, 2)
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .unwrap();
    let png = png.into_inner();
    let size = png.len();

    let mut client = Client::with_fetcher(Arc::new(Canned(Some(png))));
    let image = ResourceId::new(0, 0);
    client
        .handle(create(
            image,
            Resource::Image(ImageRecord {
                name: None,
                source: ImageSource::Buffer(BUFFER),
            }),
        ))
        .unwrap();
    assert!(client.state().image(&image).unwrap().is_none());

    client
        .handle(create(
            BUFFER,
            Resource::Buffer(BufferRecord::uri("https://example.com/texture.png", size)),
        ))
        .unwrap();
    assert!(frames_until(&mut client, |c| {
        c.state().image(&image).is_ok_and(|decoded| decoded.is_some())
    }));
    let decoded = client.state().image(&image).unwrap().unwrap();
    assert_eq!((decoded.width, decoded.height, decoded.components), (2, 2, 4));
}

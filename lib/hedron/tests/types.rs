use hedron::{BufferError, BufferStore, BufferView, Format, ResourceId};
use quickcheck_macros::quickcheck;

/// Every registered format round-trips through its wire tag.
#[test]
fn format_tags() {
    for format in Format::ALL {
        assert_eq!(format.tag().parse::<Format>().unwrap(), format);
        assert_eq!(format.to_string(), format.tag());
    }
    assert!(Format::U16.is_index());
    assert!(!Format::Vec3.is_index());
}

/// A window either lies entirely within its view and buffer, or the slice fails.
#[quickcheck]
fn slice_never_overreads(len: u8, offset: u8, view_len: u8, extra: u8, want: u8) -> bool {
    let mut store = BufferStore::new();
    let id = ResourceId::new(1, 0);
    store.insert_buffer(id, vec![7u8; len as usize]).unwrap();
    let view = BufferView::new(id, offset as usize, view_len as usize, 0);

    let in_view = extra as usize + want as usize <= view_len as usize;
    let in_buffer = offset as usize + extra as usize + want as usize <= len as usize;
    match store.slice(&view, extra as usize, want as usize) {
        Ok(bytes) => in_view && in_buffer && bytes.len() == want as usize,
        Err(BufferError::OutOfRange { .. }) => !(in_view && in_buffer),
        Err(_) => false,
    }
}

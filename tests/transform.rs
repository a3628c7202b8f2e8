use approx::{assert_relative_eq, relative_eq};
use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use quickcheck_macros::quickcheck;

use trellis::{
    transform::{compose, decompose},
    Error,
};

#[test]
fn translation_only() {
    let m = compose(
        &Vector3::new(1.0, 2.0, 3.0),
        &UnitQuaternion::identity(),
        &Vector3::new(1.0, 1.0, 1.0),
    );
    let trs = decompose(&m).unwrap();
    assert_relative_eq!(trs.translation, Vector3::new(1.0, 2.0, 3.0), epsilon = 1e-5);
    assert_relative_eq!(trs.rotation, UnitQuaternion::identity(), epsilon = 1e-5);
    assert_relative_eq!(trs.scale, Vector3::new(1.0, 1.0, 1.0), epsilon = 1e-5);
}

#[test]
fn flattened_axis() {
    let m = compose(
        &Vector3::zeros(),
        &UnitQuaternion::identity(),
        &Vector3::new(1.0, 1.0, 0.0),
    );
    assert!(matches!(decompose(&m), Err(Error::DegenerateScale(2))));
    assert!(matches!(
        decompose(&Matrix4::zeros()),
        Err(Error::DegenerateScale(0))
    ));
}

/// Map an arbitrary integer onto `[lo, hi]`.
fn unit(v: i16, lo: f32, hi: f32) -> f32 {
    lo + (v as f32 - i16::MIN as f32) / (u16::MAX as f32) * (hi - lo)
}

/// Any scale/rotation/translation survives a compose → decompose → compose trip.
#[quickcheck]
fn shear_free_round_trip(t: (i16, i16, i16), r: (i16, i16, i16), s: (i16, i16, i16)) -> bool {
    let translation = Vector3::new(
        unit(t.0, -100.0, 100.0),
        unit(t.1, -100.0, 100.0),
        unit(t.2, -100.0, 100.0),
    );
    let rotation = UnitQuaternion::from_euler_angles(
        unit(r.0, -3.0, 3.0),
        unit(r.1, -1.5, 1.5),
        unit(r.2, -3.0, 3.0),
    );
    let scale = Vector3::new(unit(s.0, 0.1, 10.0), unit(s.1, 0.1, 10.0), unit(s.2, 0.1, 10.0));

    let m = compose(&translation, &rotation, &scale);
    let Ok(trs) = decompose(&m) else {
        return false;
    };
    relative_eq!(trs.to_matrix(), m, epsilon = 1e-3)
        && relative_eq!(trs.scale, scale, epsilon = 1e-3)
        && relative_eq!(trs.translation, translation, epsilon = 1e-3)
}

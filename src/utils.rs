use crate::types::{Axis, Channel, Position, Quaternion};
use cgmath::{Deg, One, Rotation3};

/// Rotation of `degrees` around a single coordinate axis.
pub(crate) fn __axis_rotation(axis: Axis, degrees: f64) -> Quaternion {
    let angle = Deg(degrees);
    match axis {
        Axis::X => Quaternion::from_angle_x(angle),
        Axis::Y => Quaternion::from_angle_y(angle),
        Axis::Z => Quaternion::from_angle_z(angle),
    }
}

/// Compose the rotation channels of a joint in the order they were declared.
/// `Zrotation Xrotation Yrotation` with values (z, x, y) gives `Rz * Rx * Ry`.
/// Translation channels are skipped.
pub(crate) fn __channels_to_quat(channels: &[Channel], values: &[f64]) -> Quaternion {
    channels
        .iter()
        .zip(values)
        .filter(|(channel, _)| channel.is_rotation())
        .fold(Quaternion::one(), |rotation, (channel, &value)| {
            rotation * __axis_rotation(channel.axis(), value)
        })
}

/// Start from `offset` and replace every axis driven by a translation channel.
pub(crate) fn __channels_to_translation(offset: Position, channels: &[Channel], values: &[f64]) -> Position {
    let mut translation = offset;
    for (channel, &value) in channels.iter().zip(values) {
        match channel {
            Channel::Xposition => translation.x = value,
            Channel::Yposition => translation.y = value,
            Channel::Zposition => translation.z = value,
            _ => {}
        }
    }
    translation
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Rotation, Vector3};

    fn assert_close(a: Position, b: Position) {
        assert!((a - b).magnitude() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn yaw_turns_x_into_minus_z() {
        let q = __axis_rotation(Axis::Y, 90.0);
        assert_close(q.rotate_vector(Vector3::unit_x()), -Vector3::unit_z());
    }

    #[test]
    fn rotation_order_follows_declaration() {
        let v = Vector3::new(1.0, 2.0, 3.0);

        let zxy = __channels_to_quat(
            &[Channel::Zrotation, Channel::Xrotation, Channel::Yrotation],
            &[30.0, 45.0, 60.0],
        );
        let expected = __axis_rotation(Axis::Z, 30.0) * __axis_rotation(Axis::X, 45.0) * __axis_rotation(Axis::Y, 60.0);
        assert_close(zxy.rotate_vector(v), expected.rotate_vector(v));

        let xyz = __channels_to_quat(
            &[Channel::Xrotation, Channel::Yrotation, Channel::Zrotation],
            &[45.0, 60.0, 30.0],
        );
        // same angles, different order, different result
        assert!((zxy.rotate_vector(v) - xyz.rotate_vector(v)).magnitude() > 1e-3);
    }

    #[test]
    fn translation_channels_override_offset_axes() {
        let offset = Vector3::new(10.0, 20.0, 30.0);
        let channels = [Channel::Zposition, Channel::Yrotation, Channel::Xposition];
        let translation = __channels_to_translation(offset, &channels, &[-3.0, 90.0, 1.0]);
        assert_eq!(translation, Vector3::new(1.0, 20.0, -3.0));
    }

    #[test]
    fn position_channels_do_not_rotate() {
        let q = __channels_to_quat(&[Channel::Xposition, Channel::Yposition], &[5.0, 6.0]);
        assert_eq!(q, Quaternion::one());
    }
}

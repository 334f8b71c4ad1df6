use cgmath::{Matrix4, One, Quaternion as CgQuaternion, Rotation, Vector3, Zero};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Mul, Range};
use std::str::FromStr;

/////////////////////////////////////////////////////////////////////////////////////////////////

pub type Index = usize;
pub type Quaternion = CgQuaternion<f64>;
pub type Position = Vector3<f64>;
pub type Depth = usize;

/// Rigid pose of a joint: a rotation followed by a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Position,
    pub rotation: Quaternion,
}

impl Transform {
    pub fn identity() -> Self {
        Transform {
            translation: Position::zero(),
            rotation: Quaternion::one(),
        }
    }

    pub fn new(translation: Position, rotation: Quaternion) -> Self {
        Transform {
            translation,
            rotation,
        }
    }

    /// `self * child`: express `child` (given relative to `self`) in the frame `self` lives in.
    pub fn compose(&self, child: &Transform) -> Transform {
        Transform {
            translation: self.rotation.rotate_vector(child.translation) + self.translation,
            rotation: self.rotation * child.rotation,
        }
    }

    /// 4x4 homogeneous matrix (translation * rotation).
    pub fn to_matrix(&self) -> Matrix4<f64> {
        Matrix4::from_translation(self.translation) * Matrix4::from(self.rotation)
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.compose(&rhs)
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One animated degree of freedom of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Xposition,
    Yposition,
    Zposition,
    Xrotation,
    Yrotation,
    Zrotation,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Xposition,
        Channel::Yposition,
        Channel::Zposition,
        Channel::Xrotation,
        Channel::Yrotation,
        Channel::Zrotation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Xposition => "Xposition",
            Channel::Yposition => "Yposition",
            Channel::Zposition => "Zposition",
            Channel::Xrotation => "Xrotation",
            Channel::Yrotation => "Yrotation",
            Channel::Zrotation => "Zrotation",
        }
    }

    pub fn axis(self) -> Axis {
        match self {
            Channel::Xposition | Channel::Xrotation => Axis::X,
            Channel::Yposition | Channel::Yrotation => Axis::Y,
            Channel::Zposition | Channel::Zrotation => Axis::Z,
        }
    }

    pub fn is_translation(self) -> bool {
        matches!(
            self,
            Channel::Xposition | Channel::Yposition | Channel::Zposition
        )
    }

    pub fn is_rotation(self) -> bool {
        !self.is_translation()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a token is not one of the six channel names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChannelName(pub String);

impl FromStr for Channel {
    type Err = UnknownChannelName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|channel| channel.name() == s)
            .ok_or_else(|| UnknownChannelName(s.to_string()))
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    pub index: Index,
    /// Non-owning back-reference into the skeleton arena. `None` only for the root.
    pub parent: Option<Index>,
    pub offset: Position,
    pub channels: Vec<Channel>,
    pub children: Vec<Index>,
    pub is_end_site: bool,
}

impl Joint {
    pub(crate) fn new(name: String, index: Index, parent: Option<Index>, is_end_site: bool) -> Self {
        Joint {
            name,
            index,
            parent,
            offset: Position::zero(),
            channels: Vec::new(),
            children: Vec::new(),
            is_end_site,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// One column of a motion row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    pub joint: Index,
    pub channel: Channel,
}

/// Flattened, parse-order concatenation of every joint's channels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelLayout {
    entries: Vec<LayoutEntry>,
    // per joint, the columns it owns
    ranges: Vec<Range<usize>>,
}

impl ChannelLayout {
    fn from_joints(joints: &[Joint]) -> Self {
        let mut entries = Vec::new();
        let mut ranges = Vec::with_capacity(joints.len());
        for joint in joints {
            let start = entries.len();
            entries.extend(joint.channels.iter().map(|&channel| LayoutEntry {
                joint: joint.index,
                channel,
            }));
            ranges.push(start..entries.len());
        }
        ChannelLayout { entries, ranges }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    /// Column range owned by `joint` inside a motion row.
    ///
    /// # Panics
    ///
    /// Panics if `joint` is not an index of the skeleton the layout was built from.
    pub fn range(&self, joint: Index) -> Range<usize> {
        self.ranges[joint].clone()
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// Rooted joint tree stored as an arena in parse (pre-order) order, so every
/// parent index is smaller than the indices of its children.
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    joints: Vec<Joint>,
    layout: ChannelLayout,
    by_name: HashMap<String, Index>,
}

impl Skeleton {
    /// Expects `joints` in parse order with the root at index 0.
    pub(crate) fn from_joints(joints: Vec<Joint>) -> Self {
        let layout = ChannelLayout::from_joints(&joints);
        let by_name = joints
            .iter()
            .map(|joint| (joint.name.clone(), joint.index))
            .collect();
        Skeleton {
            joints,
            layout,
            by_name,
        }
    }

    pub fn root(&self) -> &Joint {
        &self.joints[0]
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, index: Index) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn joint_index(&self, name: &str) -> Option<Index> {
        self.by_name.get(name).copied()
    }

    pub fn joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joint_index(name).map(|index| &self.joints[index])
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn channel_layout(&self) -> &ChannelLayout {
        &self.layout
    }

    pub fn channel_count(&self) -> usize {
        self.layout.len()
    }

    /// Number of ancestors of `index` (0 for the root), `None` for an unknown index.
    pub fn depth(&self, index: Index) -> Option<Depth> {
        self.path_to_root(index).map(|path| path.len() - 1)
    }

    /// Indices from `index` up to and including the root, `None` for an unknown index.
    pub fn path_to_root(&self, index: Index) -> Option<Vec<Index>> {
        let mut path = vec![index];
        let mut current = self.joint(index)?.parent;
        while let Some(parent) = current {
            path.push(parent);
            current = self.joints[parent].parent;
        }
        Some(path)
    }

    /// Returns the kinematic chains of the skeleton like \[\[0,1,2,3\],\[4,5,6,7,8\],\[9,10,11\]\].
    /// A chain continues as long as the next joint in parse order is a child of the previous one,
    /// so these are usually the spine, the legs and the arms.
    pub fn kinematic_chains(&self) -> Vec<Vec<Index>> {
        let mut chains: Vec<Vec<Index>> = Vec::new();
        let mut chain: Vec<Index> = Vec::new();
        for joint in self.joints.iter() {
            if let Some(&last) = chain.last() {
                if joint.parent != Some(last) {
                    chains.push(std::mem::take(&mut chain));
                }
            }
            chain.push(joint.index);
        }
        if !chain.is_empty() {
            chains.push(chain);
        }
        chains
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// The MOTION section: `frame_count` rows of `channel_count` values, stored flat.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionStream {
    frame_time: f64,
    frame_count: usize,
    channel_count: usize,
    values: Vec<f64>,
}

impl MotionStream {
    pub(crate) fn new(
        frame_time: f64,
        frame_count: usize,
        channel_count: usize,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(values.len(), frame_count * channel_count);
        MotionStream {
            frame_time,
            frame_count,
            channel_count,
            values,
        }
    }

    pub fn frame_time(&self) -> f64 {
        self.frame_time
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Frames per second, rounded to the nearest integer.
    pub fn fps(&self) -> u32 {
        (1.0 / self.frame_time).round() as u32
    }

    /// Time of `frame` in seconds, relative to the first frame.
    pub fn timestamp(&self, frame: usize) -> f64 {
        frame as f64 * self.frame_time
    }

    pub fn frame(&self, frame: usize) -> Option<&[f64]> {
        if frame >= self.frame_count {
            return None;
        }
        let start = frame * self.channel_count;
        Some(&self.values[start..start + self.channel_count])
    }

    pub fn frames(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        // rows may be empty, chunks_exact rejects a zero chunk size
        (0..self.frame_count).map(move |frame| {
            let start = frame * self.channel_count;
            &self.values[start..start + self.channel_count]
        })
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A parsed .bvh document.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    pub skeleton: Skeleton,
    pub motion: MotionStream,
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub local: Transform,
    pub global: Transform,
}

/// Transforms of every joint for one frame, indexed like `Skeleton::joints`.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePose {
    pub frame: usize,
    pub joints: Vec<JointPose>,
}

impl FramePose {
    pub fn joint(&self, index: Index) -> Option<&JointPose> {
        self.joints.get(index)
    }

    pub fn joint_by_name(&self, skeleton: &Skeleton, name: &str) -> Option<&JointPose> {
        skeleton
            .joint_index(name)
            .and_then(|index| self.joints.get(index))
    }
}

/// Resolved poses of every frame of a motion stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Animation {
    pub poses: Vec<FramePose>,
}

impl Animation {
    pub fn frame_count(&self) -> usize {
        self.poses.len()
    }

    pub fn pose(&self, frame: usize) -> Option<&FramePose> {
        self.poses.get(frame)
    }

    pub fn transform(&self, frame: usize, joint: Index) -> Option<&JointPose> {
        self.pose(frame).and_then(|pose| pose.joint(joint))
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_skeleton() -> Skeleton {
        //    0
        //   / \
        //  1   3
        //  |   |
        //  2   4
        let mut joints = vec![
            Joint::new("Hips".into(), 0, None, false),
            Joint::new("LeftUpLeg".into(), 1, Some(0), false),
            Joint::new("LeftUpLeg_End".into(), 2, Some(1), true),
            Joint::new("Spine".into(), 3, Some(0), false),
            Joint::new("Spine_End".into(), 4, Some(3), true),
        ];
        joints[0].children = vec![1, 3];
        joints[1].children = vec![2];
        joints[3].children = vec![4];
        joints[0].channels = vec![Channel::Xposition, Channel::Zrotation];
        joints[1].channels = vec![Channel::Yrotation];
        joints[3].channels = vec![Channel::Xrotation, Channel::Yrotation];
        Skeleton::from_joints(joints)
    }

    #[test]
    fn compose_agrees_with_matrix_product() {
        use cgmath::{Deg, Rotation3};

        let parent = Transform::new(Position::new(1.0, 2.0, 3.0), Quaternion::from_angle_y(Deg(90.0)));
        let child = Transform::new(Position::new(0.0, 0.0, 2.0), Quaternion::from_angle_x(Deg(30.0)));
        let composed = (parent * child).to_matrix();
        let product = parent.to_matrix() * child.to_matrix();
        for column in 0..4 {
            for row in 0..4 {
                assert!((composed[column][row] - product[column][row]).abs() < 1e-12);
            }
        }
        assert_eq!(Transform::identity() * child, child);
    }

    #[test]
    fn channel_names_round_trip_through_from_str() {
        for channel in Channel::ALL {
            assert_eq!(channel.name().parse::<Channel>(), Ok(channel));
        }
        assert_eq!(
            "Wrotation".parse::<Channel>(),
            Err(UnknownChannelName("Wrotation".into()))
        );
    }

    #[test]
    fn layout_ranges_follow_parse_order() {
        let skeleton = chain_skeleton();
        let layout = skeleton.channel_layout();
        assert_eq!(layout.len(), 5);
        assert_eq!(layout.range(0), 0..2);
        assert_eq!(layout.range(1), 2..3);
        assert_eq!(layout.range(2), 3..3);
        assert_eq!(layout.range(3), 3..5);
        assert_eq!(layout.range(4), 5..5);
        assert_eq!(
            layout.entries()[3],
            LayoutEntry {
                joint: 3,
                channel: Channel::Xrotation
            }
        );
    }

    #[test]
    fn depth_and_path_to_root() {
        let skeleton = chain_skeleton();
        assert_eq!(skeleton.depth(0), Some(0));
        assert_eq!(skeleton.depth(4), Some(2));
        assert_eq!(skeleton.path_to_root(4), Some(vec![4, 3, 0]));
        assert_eq!(skeleton.depth(5), None);
        assert_eq!(skeleton.path_to_root(42), None);
        assert_eq!(skeleton.joint_index("Spine"), Some(3));
        assert!(skeleton.joint_by_name("Head").is_none());
    }

    #[test]
    fn kinematic_chains_split_on_branches() {
        let skeleton = chain_skeleton();
        assert_eq!(skeleton.kinematic_chains(), vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn motion_stream_row_access() {
        let stream = MotionStream::new(0.5, 2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(stream.frame(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(stream.frame(2), None);
        assert_eq!(stream.frames().count(), 2);
        assert_eq!(stream.fps(), 2);
        assert_eq!(stream.timestamp(3), 1.5);
    }

    #[test]
    fn motion_stream_without_channels_still_has_rows() {
        let stream = MotionStream::new(0.1, 3, 0, Vec::new());
        assert_eq!(stream.frames().count(), 3);
        assert_eq!(stream.frame(2), Some(&[][..]));
    }
}

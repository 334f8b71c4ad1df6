//! Serializable view of a resolved animation, one nested record per joint.

use crate::types::*;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamMetadata {
    pub frame_count: usize,
    pub frame_time: f64,
    pub fps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformRecord {
    pub translation: [f64; 3],
    /// Quaternion as `[x, y, z, w]`.
    pub rotation: [f64; 4],
}

impl From<&Transform> for TransformRecord {
    fn from(transform: &Transform) -> Self {
        let q = transform.rotation;
        TransformRecord {
            translation: transform.translation.into(),
            rotation: [q.v.x, q.v.y, q.v.z, q.s],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub local: TransformRecord,
    pub global: TransformRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JointRecord {
    pub name: String,
    pub offset: [f64; 3],
    pub channels: Vec<&'static str>,
    pub frames: Vec<FrameRecord>,
    pub children: Vec<JointRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub metadata: StreamMetadata,
    pub root: JointRecord,
}

impl ExportDocument {
    pub fn new(skeleton: &Skeleton, motion: &MotionStream, animation: &Animation) -> Self {
        ExportDocument {
            metadata: StreamMetadata {
                frame_count: motion.frame_count(),
                frame_time: motion.frame_time(),
                fps: motion.fps(),
            },
            root: joint_record(skeleton, animation, skeleton.root().index),
        }
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_json_writer<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }
}

fn joint_record(skeleton: &Skeleton, animation: &Animation, index: Index) -> JointRecord {
    let joint = &skeleton.joints()[index];
    JointRecord {
        name: joint.name.clone(),
        offset: joint.offset.into(),
        channels: joint.channels.iter().map(|channel| channel.name()).collect(),
        frames: animation
            .poses
            .iter()
            .filter_map(|pose| pose.joint(index))
            .map(|pose| FrameRecord {
                local: (&pose.local).into(),
                global: (&pose.global).into(),
            })
            .collect(),
        children: joint
            .children
            .iter()
            .map(|&child| joint_record(skeleton, animation, child))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::load_bvh_from_string;

    const ARM: &str = "\
ROOT Shoulder
{
    OFFSET 0 0 0
    CHANNELS 1 Zrotation
    End Site
    {
        OFFSET 1 0 0
    }
}
MOTION
Frames: 1
Frame Time: 0.04
0
";

    #[test]
    fn nests_children_and_frames() {
        let bvh = load_bvh_from_string(ARM).unwrap();
        let animation = bvh.resolve().unwrap();
        let document = ExportDocument::new(&bvh.skeleton, &bvh.motion, &animation);

        assert_eq!(
            document.metadata,
            StreamMetadata {
                frame_count: 1,
                frame_time: 0.04,
                fps: 25
            }
        );
        assert_eq!(document.root.name, "Shoulder");
        assert_eq!(document.root.channels, vec!["Zrotation"]);
        assert_eq!(document.root.frames.len(), 1);
        assert_eq!(document.root.frames[0].global.rotation, [0.0, 0.0, 0.0, 1.0]);

        let end = &document.root.children[0];
        assert_eq!(end.name, "Shoulder_End");
        assert!(end.channels.is_empty());
        assert_eq!(end.frames[0].global.translation, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn serializes_to_json() {
        let bvh = load_bvh_from_string(ARM).unwrap();
        let animation = bvh.resolve().unwrap();
        let json = ExportDocument::new(&bvh.skeleton, &bvh.motion, &animation)
            .to_json_string()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["frame_count"], 1);
        assert_eq!(value["root"]["children"][0]["name"], "Shoulder_End");
        assert_eq!(value["root"]["children"][0]["offset"][0], 1.0);
    }
}

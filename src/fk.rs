//! Forward kinematics: turn motion rows into local and global joint transforms.

use crate::error::ResolveError;
use crate::types::*;
use crate::utils;
use cgmath::One;
use serde::Deserialize;

/// Knobs for resolving a whole motion stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Resolve frames on the rayon thread pool. Ignored without the `parallel` feature.
    pub parallel: bool,
    /// Smallest batch of frames handed to a single task.
    pub min_frames_per_task: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            parallel: true,
            min_frames_per_task: 64,
        }
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Local transform of `joint` for one frame, `values` being its slice of the motion row.
pub fn local_transform(joint: &Joint, values: &[f64]) -> Transform {
    assert_eq!(
        values.len(),
        joint.channels.len(),
        "joint `{}` got {} channel values for {} channels",
        joint.name,
        values.len(),
        joint.channels.len()
    );
    Transform::new(
        utils::__channels_to_translation(joint.offset, &joint.channels, values),
        utils::__channels_to_quat(&joint.channels, values),
    )
}

/// Resolve every joint for a single motion row.
pub fn resolve_frame(skeleton: &Skeleton, frame: usize, row: &[f64]) -> Result<FramePose, ResolveError> {
    let layout = skeleton.channel_layout();
    if row.len() != layout.len() {
        return Err(ResolveError::ChannelLayoutMismatch {
            frame,
            expected: layout.len(),
            found: row.len(),
        });
    }

    let mut joints: Vec<JointPose> = Vec::with_capacity(skeleton.len());
    // the arena is in pre-order, so a parent is always resolved before its children
    for joint in skeleton.joints() {
        let local = local_transform(joint, &row[layout.range(joint.index)]);
        let global = match joint.parent {
            Some(parent) => joints[parent].global * local,
            None => local,
        };
        joints.push(JointPose { local, global });
    }
    Ok(FramePose { frame, joints })
}

/// Resolve every frame of `motion` sequentially.
pub fn resolve(skeleton: &Skeleton, motion: &MotionStream) -> Result<Animation, ResolveError> {
    resolve_with(
        skeleton,
        motion,
        &ResolveOptions {
            parallel: false,
            ..ResolveOptions::default()
        },
    )
}

/// Resolve every frame of `motion`. Parallel and sequential runs give identical results.
pub fn resolve_with(
    skeleton: &Skeleton,
    motion: &MotionStream,
    options: &ResolveOptions,
) -> Result<Animation, ResolveError> {
    if motion.channel_count() != skeleton.channel_count() {
        return Err(ResolveError::ChannelLayoutMismatch {
            frame: 0,
            expected: skeleton.channel_count(),
            found: motion.channel_count(),
        });
    }
    tracing::debug!(
        frames = motion.frame_count(),
        joints = skeleton.len(),
        parallel = options.parallel,
        "resolving motion"
    );

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        if options.parallel {
            let rows: Vec<&[f64]> = motion.frames().collect();
            let poses = rows
                .par_iter()
                .with_min_len(options.min_frames_per_task.max(1))
                .enumerate()
                .map(|(frame, row)| resolve_frame(skeleton, frame, row))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Animation { poses });
        }
    }

    let poses = motion
        .frames()
        .enumerate()
        .map(|(frame, row)| resolve_frame(skeleton, frame, row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Animation { poses })
}

/// Bind pose of the skeleton: static offsets only, no channel values applied.
pub fn rest_pose(skeleton: &Skeleton) -> FramePose {
    let mut joints: Vec<JointPose> = Vec::with_capacity(skeleton.len());
    for joint in skeleton.joints() {
        let local = Transform::new(joint.offset, Quaternion::one());
        let global = match joint.parent {
            Some(parent) => joints[parent].global * local,
            None => local,
        };
        joints.push(JointPose { local, global });
    }
    FramePose { frame: 0, joints }
}

impl Bvh {
    pub fn resolve(&self) -> Result<Animation, ResolveError> {
        resolve(&self.skeleton, &self.motion)
    }

    pub fn resolve_with(&self, options: &ResolveOptions) -> Result<Animation, ResolveError> {
        resolve_with(&self.skeleton, &self.motion, options)
    }

    pub fn rest_pose(&self) -> FramePose {
        rest_pose(&self.skeleton)
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

//! Parse .bvh (Biovision Hierarchy) motion capture files and resolve the world-space
//! transform of every joint in every frame.
//!
//! ```no_run
//! use bvh_fk::parse::load_bvh_from_file;
//!
//! let bvh = load_bvh_from_file("./walk.bvh")?;
//! let animation = bvh.resolve()?;
//! let hips = bvh.skeleton.joint_index("Hips").unwrap();
//! println!("{:?}", animation.transform(0, hips).unwrap().global.translation);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod export;
pub mod fk;
pub mod parse;
pub mod scan;
pub mod types;
mod utils;

pub use error::{BvhError, ResolveError, Result};
pub use fk::{rest_pose, resolve, resolve_frame, resolve_with, ResolveOptions};
pub use parse::{load_bvh_from_file, load_bvh_from_string, parse_bvh};
pub use types::{Animation, Bvh, Channel, FramePose, Joint, JointPose, MotionStream, Skeleton, Transform};

use crate::error::{BvhError, Result};
use crate::scan::{Line, Scanner};
use crate::types::*;
use cgmath::Vector3;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

static RE_END_SITE: OnceLock<Regex> = OnceLock::new();
static RE_FRAMES: OnceLock<Regex> = OnceLock::new();
static RE_FRAME_TIME: OnceLock<Regex> = OnceLock::new();

fn __regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("hard-coded pattern"))
}

fn __parse_number(line: &Line, token: &str) -> Result<f64> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(BvhError::NumericParseError {
            line: line.number,
            token: token.to_string(),
        }),
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// A joint whose body is still being read.
struct OpenJoint {
    index: Index,
    opened: bool,
    has_offset: bool,
    has_channels: bool,
}

#[derive(Default)]
struct HierarchyBuilder {
    joints: Vec<Joint>,
    stack: Vec<OpenJoint>,
    names: HashSet<String>,
}

impl HierarchyBuilder {
    fn push_joint(&mut self, line: &Line, name: String, is_end_site: bool) -> Result<()> {
        if !self.names.insert(name.clone()) {
            return Err(BvhError::DuplicateJointName {
                line: line.number,
                name,
            });
        }
        let index = self.joints.len();
        let parent = self.stack.last().map(|open| open.index);

        //// If joint has a parent, add this joint to its parent's children
        if let Some(parent) = parent {
            self.joints[parent].children.push(index);
        }
        tracing::trace!(joint = %name, index, ?parent, "joint");
        self.joints.push(Joint::new(name, index, parent, is_end_site));
        self.stack.push(OpenJoint {
            index,
            opened: false,
            has_offset: false,
            has_channels: false,
        });
        Ok(())
    }

    /// The joint whose body the line belongs to; its `{` must already be read.
    fn body(&mut self, line: &Line) -> Result<&mut OpenJoint> {
        match self.stack.last_mut() {
            Some(open) if open.opened => Ok(open),
            Some(_) => Err(BvhError::UnmatchedBrace {
                line: line.number,
                reason: "expected `{` after joint header",
            }),
            None => Err(BvhError::UnexpectedLine {
                line: line.number,
                found: line.text.to_string(),
            }),
        }
    }

    fn consume(&mut self, line: &Line) -> Result<()> {
        match line.keyword() {
            "JOINT" => {
                self.body(line)?;
                let name = __joint_name(line)?;
                self.push_joint(line, name, false)
            }
            "{" => match self.stack.last_mut() {
                Some(open) if !open.opened => {
                    open.opened = true;
                    Ok(())
                }
                _ => Err(BvhError::UnmatchedBrace {
                    line: line.number,
                    reason: "opening brace without a joint header",
                }),
            },
            "}" => {
                let open = self.body(line)?;
                let (index, has_offset, has_channels) = (open.index, open.has_offset, open.has_channels);
                let joint = &self.joints[index];
                let missing = if !has_offset {
                    Some("OFFSET")
                } else if !has_channels && !joint.is_end_site {
                    Some("CHANNELS")
                } else {
                    None
                };
                if let Some(keyword) = missing {
                    return Err(BvhError::MissingDeclaration {
                        line: line.number,
                        joint: joint.name.clone(),
                        keyword,
                    });
                }
                self.stack.pop();
                Ok(())
            }
            "OFFSET" => self.read_offset(line),
            "CHANNELS" => self.read_channels(line),
            "MOTION" => Err(BvhError::UnmatchedBrace {
                line: line.number,
                reason: "MOTION reached before every joint was closed",
            }),
            _ if __regex(&RE_END_SITE, r"(?i)^end\s+site$").is_match(line.text) => {
                let parent = self.body(line)?.index;
                let name = format!("{}_End", self.joints[parent].name);
                self.push_joint(line, name, true)
            }
            _ => Err(BvhError::UnexpectedLine {
                line: line.number,
                found: line.text.to_string(),
            }),
        }
    }

    fn read_offset(&mut self, line: &Line) -> Result<()> {
        let open = self.body(line)?;
        if open.has_offset {
            return Err(BvhError::UnexpectedLine {
                line: line.number,
                found: line.text.to_string(),
            });
        }
        open.has_offset = true;
        let index = open.index;

        let args = line.args();
        if args.len() != 3 {
            return Err(BvhError::MalformedOffset {
                line: line.number,
                expected: 3,
                found: args.len(),
            });
        }
        let offset = Vector3::new(
            __parse_number(line, args[0])?,
            __parse_number(line, args[1])?,
            __parse_number(line, args[2])?,
        );
        self.joints[index].offset = offset;
        Ok(())
    }

    fn read_channels(&mut self, line: &Line) -> Result<()> {
        let open = self.body(line)?;
        if open.has_channels {
            return Err(BvhError::UnexpectedLine {
                line: line.number,
                found: line.text.to_string(),
            });
        }
        open.has_channels = true;
        let index = open.index;
        if self.joints[index].is_end_site {
            // end sites never consume motion values
            return Err(BvhError::UnexpectedLine {
                line: line.number,
                found: line.text.to_string(),
            });
        }

        let (count, names) = match line.args().split_first() {
            Some((count, names)) => (*count, names),
            None => {
                return Err(BvhError::ChannelCountMismatch {
                    line: line.number,
                    declared: 0,
                    found: 0,
                })
            }
        };
        let declared = count
            .parse::<usize>()
            .map_err(|_| BvhError::NumericParseError {
                line: line.number,
                token: count.to_string(),
            })?;
        if names.len() != declared {
            return Err(BvhError::ChannelCountMismatch {
                line: line.number,
                declared,
                found: names.len(),
            });
        }

        let channels = names
            .iter()
            .map(|name| {
                name.parse::<Channel>()
                    .map_err(|err| BvhError::UnknownChannel {
                        line: line.number,
                        name: err.0,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        self.joints[index].channels = channels;
        Ok(())
    }
}

fn __joint_name(line: &Line) -> Result<String> {
    let args = line.args();
    let name = args
        .first()
        .ok_or(BvhError::MissingJointName { line: line.number })?;
    if args.len() > 1 {
        tracing::warn!(line = line.number, "ignoring tokens after joint name `{}`", name);
    }
    Ok(name.to_string())
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Parse the HIERARCHY section, from the optional `HIERARCHY` header down to the brace closing
/// the root. Leaves the scanner on the line after it, which must be `MOTION` or the end of input.
pub fn parse_hierarchy(scanner: &mut Scanner) -> Result<Skeleton> {
    let last_line = scanner.last_line_number();
    let mut builder = HierarchyBuilder::default();

    //// Find the root
    loop {
        let line = scanner.next_line().ok_or(BvhError::EmptyHierarchy)?;
        match line.keyword() {
            "HIERARCHY" if line.tokens.len() == 1 => continue,
            "MOTION" => return Err(BvhError::EmptyHierarchy),
            "ROOT" => {
                let name = __joint_name(line)?;
                builder.push_joint(line, name, false)?;
                break;
            }
            _ => {
                return Err(BvhError::MissingRoot {
                    line: line.number,
                    found: line.text.to_string(),
                })
            }
        }
    }

    //// Read until the root is closed
    while !builder.stack.is_empty() {
        match scanner.next_line() {
            Some(line) => builder.consume(line)?,
            None => {
                return Err(BvhError::UnmatchedBrace {
                    line: last_line,
                    reason: "end of input before every joint was closed",
                })
            }
        }
    }

    if let Some(line) = scanner.peek() {
        match line.keyword() {
            "MOTION" => {}
            "}" => {
                return Err(BvhError::UnmatchedBrace {
                    line: line.number,
                    reason: "closing brace without an open joint",
                })
            }
            _ => {
                return Err(BvhError::UnexpectedLine {
                    line: line.number,
                    found: line.text.to_string(),
                })
            }
        }
    }

    let skeleton = Skeleton::from_joints(builder.joints);
    tracing::debug!(
        joints = skeleton.len(),
        channels = skeleton.channel_count(),
        "parsed hierarchy"
    );
    Ok(skeleton)
}

/// Parse the MOTION section. Every row must hold exactly `channel_count` values.
pub fn parse_motion(scanner: &mut Scanner, channel_count: usize) -> Result<MotionStream> {
    let last_line = scanner.last_line_number();

    match scanner.next_line() {
        Some(line) if line.tokens == ["MOTION"] => {}
        _ => return Err(BvhError::MissingMotionSection),
    }

    //// Parse number of frames
    let frame_count = {
        let line = scanner.next_line().ok_or(BvhError::MissingFrameHeader {
            line: last_line,
            expected: "Frames:",
        })?;
        let captures = __regex(&RE_FRAMES, r"^Frames:\s*(\S+)$")
            .captures(line.text)
            .ok_or(BvhError::MissingFrameHeader {
                line: line.number,
                expected: "Frames:",
            })?;
        let token = &captures[1];
        token
            .parse::<usize>()
            .map_err(|_| BvhError::NumericParseError {
                line: line.number,
                token: token.to_string(),
            })?
    };

    //// Parse frame time
    let (frame_time, header_line) = {
        let line = scanner.next_line().ok_or(BvhError::MissingFrameHeader {
            line: last_line,
            expected: "Frame Time:",
        })?;
        let captures = __regex(&RE_FRAME_TIME, r"^Frame\s+Time:\s*(\S+)$")
            .captures(line.text)
            .ok_or(BvhError::MissingFrameHeader {
                line: line.number,
                expected: "Frame Time:",
            })?;
        let token = &captures[1];
        let value = token
            .parse::<f64>()
            .map_err(|_| BvhError::NumericParseError {
                line: line.number,
                token: token.to_string(),
            })?;
        if !(value.is_finite() && value > 0.0) {
            return Err(BvhError::NonPositiveFrameTime {
                line: line.number,
                value,
            });
        }
        (value, line.number)
    };

    //// Parse motion rows. A skeleton without channels has blank rows, so only the physical lines are counted.
    if channel_count == 0 {
        let available = scanner.lines_after(header_line);
        if available < frame_count {
            return Err(BvhError::FrameCountMismatch {
                declared: frame_count,
                found: available,
            });
        }
    }
    let expected_rows = if channel_count == 0 { 0 } else { frame_count };
    let mut values = Vec::with_capacity(expected_rows.min(scanner.remaining()) * channel_count);
    for row in 0..expected_rows {
        let line = scanner.next_line().ok_or(BvhError::FrameCountMismatch {
            declared: frame_count,
            found: row,
        })?;
        if line.tokens.len() != channel_count {
            return Err(BvhError::RowWidthMismatch {
                line: line.number,
                expected: channel_count,
                found: line.tokens.len(),
            });
        }
        for token in line.tokens.iter() {
            values.push(__parse_number(line, token)?);
        }
    }

    if scanner.remaining() > 0 {
        return Err(BvhError::FrameCountMismatch {
            declared: frame_count,
            found: expected_rows + scanner.remaining(),
        });
    }

    tracing::debug!(frame_count, frame_time, channel_count, "parsed motion");
    Ok(MotionStream::new(frame_time, frame_count, channel_count, values))
}

//////////////////////////////////////////////////////////////// PUBLIC ///////////////////////////////////////////////////////////////////////////////////

/// Parse a whole .bvh document.
pub fn parse_bvh(text: &str) -> Result<Bvh> {
    let mut scanner = Scanner::new(text);
    let skeleton = parse_hierarchy(&mut scanner)?;
    let motion = parse_motion(&mut scanner, skeleton.channel_count())?;
    tracing::info!(
        joints = skeleton.len(),
        channels = skeleton.channel_count(),
        frames = motion.frame_count(),
        "loaded bvh"
    );
    Ok(Bvh { skeleton, motion })
}

/// load a bvh file from a file path
pub fn load_bvh_from_file(file_path: impl AsRef<Path>) -> Result<Bvh> {
    let contents = std::fs::read_to_string(file_path.as_ref())?;
    parse_bvh(&contents)
}

/// load a bvh file from a string
pub fn load_bvh_from_string(bvh_string: &str) -> Result<Bvh> {
    parse_bvh(bvh_string)
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

use thiserror::Error;

/// Errors produced while reading or parsing a .bvh document.
///
/// Every variant that points at the input carries the 1-based line number.
#[derive(Error, Debug)]
pub enum BvhError {
    #[error("failed to read bvh file: {0}")]
    Io(#[from] std::io::Error),

    //// Hierarchy section
    #[error("hierarchy section is empty")]
    EmptyHierarchy,

    #[error("line {line}: expected ROOT, found `{found}`")]
    MissingRoot { line: usize, found: String },

    #[error("line {line}: unmatched brace ({reason})")]
    UnmatchedBrace { line: usize, reason: &'static str },

    #[error("line {line}: OFFSET expects {expected} values, found {found}")]
    MalformedOffset {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: unknown channel `{name}`")]
    UnknownChannel { line: usize, name: String },

    #[error("line {line}: CHANNELS declares {declared} channels but lists {found}")]
    ChannelCountMismatch {
        line: usize,
        declared: usize,
        found: usize,
    },

    #[error("line {line}: joint name `{name}` is already used")]
    DuplicateJointName { line: usize, name: String },

    #[error("line {line}: joint has no name")]
    MissingJointName { line: usize },

    #[error("line {line}: joint `{joint}` closed without {keyword}")]
    MissingDeclaration {
        line: usize,
        joint: String,
        keyword: &'static str,
    },

    #[error("line {line}: unexpected `{found}`")]
    UnexpectedLine { line: usize, found: String },

    //// Motion section
    #[error("MOTION section not found")]
    MissingMotionSection,

    #[error("line {line}: expected `{expected}` header")]
    MissingFrameHeader { line: usize, expected: &'static str },

    #[error("{declared} frames declared but {found} rows present")]
    FrameCountMismatch { declared: usize, found: usize },

    #[error("line {line}: motion row has {found} values, skeleton has {expected} channels")]
    RowWidthMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: frame time must be finite and positive, got {value}")]
    NonPositiveFrameTime { line: usize, value: f64 },

    #[error("line {line}: `{token}` is not a valid number")]
    NumericParseError { line: usize, token: String },
}

/// Consistency faults raised by the forward kinematics resolver.
///
/// These never come from a malformed file: a stream produced by the parser
/// always matches the skeleton it was parsed against.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("frame {frame}: row has {found} values but the channel layout has {expected}")]
    ChannelLayoutMismatch {
        frame: usize,
        expected: usize,
        found: usize,
    },
}

pub type Result<T, E = BvhError> = std::result::Result<T, E>;

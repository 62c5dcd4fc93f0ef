//! Persisted-state errors.
//!
//! Only corrupt input and writer failures surface here. Recoverable stream
//! conditions (unknown record kinds, duplicate skeleton records) are logged
//! and counted in the load summary instead.

/// Result type alias for load operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Result type alias for framing operations
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Framing error while writing or reading a state stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// Payload of a record could not be decoded
    #[error("Decode error in record kind {kind}: {message}")]
    Decode {
        /// Record kind being decoded
        kind: u16,
        /// Decoder message
        message: String,
    },

    /// Stream does not start with the expected magic
    #[error("Bad magic: {0:?}")]
    BadMagic([u8; 4]),

    /// Stream written by an incompatible version
    #[error("Unsupported stream version {0}")]
    UnsupportedVersion(u16),

    /// Frame length above the limit
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    /// Stream ended before the footer or inside a frame
    #[error("Truncated stream: {0}")]
    Truncated(String),

    /// Bytes follow the footer
    #[error("Trailing bytes after the footer")]
    TrailingBytes,

    /// Footer record count differs from the records read
    #[error("Footer announces {expected} records but {actual} were read")]
    RecordCountMismatch {
        /// Count stored in the footer
        expected: u64,
        /// Records actually read
        actual: u64,
    },
}

impl StreamError {
    /// Every framing error aborts the operation.
    pub fn is_fatal(&self) -> bool {
        true
    }
}

/// Inconsistent persisted state.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Framing error
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Pose graph or options record absent before the first payload
    #[error("Missing skeleton record: {0}")]
    MissingSkeleton(&'static str),

    /// A trajectory id appears twice in the pose graph record
    #[error("Duplicate trajectory id {0} in pose graph")]
    DuplicateTrajectoryId(i32),

    /// No options entry for a serialized trajectory id
    #[error("No trajectory builder options for trajectory {0}")]
    MissingOptions(i32),

    /// A record references a trajectory the pose graph record does not list
    #[error("{context} references unknown trajectory {trajectory_id}")]
    UnmappedTrajectoryId {
        /// Record or field holding the reference
        context: &'static str,
        /// Serialized trajectory id
        trajectory_id: i32,
    },

    /// A submap or node id appears twice in the pose graph record
    #[error("Duplicate id in pose graph: {0}")]
    DuplicateId(String),

    /// A constraint names a submap or node the pose graph record does not list
    #[error("Constraint references unknown {0}")]
    UnknownConstraintEndpoint(String),

    /// Submap payload without a pose in the pose graph record
    #[error("No pose for submap payload ({trajectory_id}, {submap_index})")]
    MissingSubmapPose {
        /// Serialized trajectory id
        trajectory_id: i32,
        /// Submap index
        submap_index: i32,
    },

    /// Node payload without a pose in the pose graph record
    #[error("No pose for node payload ({trajectory_id}, {node_index})")]
    MissingNodePose {
        /// Serialized trajectory id
        trajectory_id: i32,
        /// Node index
        node_index: i32,
    },

    /// Pose graph lists a submap or node whose payload never arrived
    #[error("Missing payload for {0}")]
    MissingPayload(String),

    /// Same submap or node payload twice
    #[error("Duplicate payload for {0}")]
    DuplicatePayload(String),

    /// Malformed landmark pose file
    #[error("Landmark file line {line}: {message}")]
    LandmarkFile {
        /// 1-based line number
        line: usize,
        /// What is wrong with it
        message: String,
    },
}

impl LoadError {
    /// Every load error means corrupt input and stops the whole load.
    pub fn is_fatal(&self) -> bool {
        match self {
            LoadError::Stream(e) => e.is_fatal(),
            _ => true,
        }
    }
}

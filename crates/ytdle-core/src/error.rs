//! Module for the Error type this library uses

/// Coarse-grained classification of a failed download attempt, derived from
/// matching substrings in a Fetcher's stderr/stdout output.
///
/// Variants are checked in a fixed priority order by [`classify`] so that a
/// message matching more than one pattern (e.g. a network error that also
/// mentions "unavailable") resolves deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Requested format/quality is not offered by the extractor for this URL
	FormatNotAvailable,
	/// The video/URL itself does not exist or was removed
	VideoNotFound,
	/// Login/age/members-only gate rejected the request
	Authentication,
	/// Timed out, connection reset, DNS failure, or similar transport issue
	Network,
	/// Output path could not be created or written to
	Filesystem,
	/// The operation was cancelled cooperatively, not a real failure
	Cancelled,
	/// The configured transcoder binary could not be located
	TranscoderMissing,
	/// The transcoder ran but exited unsuccessfully
	Conversion,
	/// The provider throttled or rate-limited the request
	RateLimit,
	/// Playlist enumeration itself failed (distinct from a single entry failing)
	Playlist,
	/// Metadata extraction (title, thumbnail, etc.) failed independently of the media itself
	MetadataExtraction,
	/// Did not match any of the above patterns
	Unknown,
}

/// Classifies a Fetcher error message into an [`ErrorKind`] by case-insensitive
/// substring matching, in the priority order the variants are declared in.
///
/// Grounded on the original `classify_error` table: the order matters because
/// some providers emit messages that would otherwise match more than one
/// bucket (e.g. a geo-block message that also contains "unavailable").
#[must_use]
pub fn classify(message: &str) -> ErrorKind {
	let lower = message.to_lowercase();

	let matchers: &[(ErrorKind, &[&str])] = &[
		(
			ErrorKind::FormatNotAvailable,
			&["requested format is not available", "no video formats found", "format not available"],
		),
		(
			ErrorKind::VideoNotFound,
			&["video unavailable", "video has been removed", "this video is not available", "404"],
		),
		(
			ErrorKind::Authentication,
			&["sign in", "private video", "members-only", "age-restricted", "login required"],
		),
		(
			ErrorKind::Network,
			&["network", "timed out", "timeout", "connection reset", "temporary failure in name resolution", "unable to download webpage"],
		),
		(ErrorKind::Filesystem, &["no space left", "permission denied", "read-only file system", "errno"]),
		(ErrorKind::Cancelled, &["user cancelled", "cancelled by user"]),
		(ErrorKind::TranscoderMissing, &["ffmpeg not found", "ffmpeg is not installed"]),
		(ErrorKind::Conversion, &["postprocessing", "conversion failed", "error running ffmpeg"]),
		(ErrorKind::RateLimit, &["429", "too many requests", "rate-limit", "rate limit"]),
		(ErrorKind::Playlist, &["playlist"]),
		(ErrorKind::MetadataExtraction, &["unable to extract", "failed to extract"]),
	];

	for (kind, needles) in matchers {
		if needles.iter().any(|needle| lower.contains(needle)) {
			return *kind;
		}
	}

	return ErrorKind::Unknown;
}

/// Error type for "ytdle", implements all Error types that could happen in this lib
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// Wrapper Variant for [`std::io::Error`]
	#[error("IoError: {0}")]
	IoError(#[from] std::io::Error),
	/// Wrapper Variant for [`std::string::FromUtf8Error`]
	#[error("FromStringUTF8Error: {0}")]
	FromStringUTF8Error(#[from] std::string::FromUtf8Error),
	/// Variant for when a spawned command was not successfull
	#[error("CommandNotSuccessfull: {0}")]
	CommandNotSuccesfull(String),
	/// Variant for Other messages
	#[error("Other: {0}")]
	Other(String),
	/// Variant for a Unexpected Process Exit (like when the fetcher fails to spawn)
	#[error("UnexpectedProcessExit: {0}")]
	UnexpectedProcessExit(String),
	/// Variant for a diesel Connection Error (sql i/o)
	#[error("SQLConnectionError: {0}")]
	SQLConnectionError(#[from] diesel::ConnectionError),
	/// Variant for a diesel SQL Operation Error
	#[error("SQLOperationError: {0}")]
	SQLOperationError(#[from] diesel::result::Error),
	/// Variant for a diesel migration error (embedded migrations failed to apply)
	#[error("SQLMigrationError: {0}")]
	SQLMigrationError(String),
	/// Variant for serde-json Errors (legacy history import)
	#[error("SerdeJSONError: {0}")]
	SerdeJSONError(#[from] serde_json::Error),
	/// Variant for a download attempt that failed with a classified [`ErrorKind`]
	#[error("{0:?}: {1}")]
	Classified(ErrorKind, String),
	/// Variant raised from inside a progress callback to unwind the current
	/// download cooperatively after a cancel request
	#[error("Cancelled")]
	Cancelled,
	/// Variant raised from inside a progress callback to unwind only the
	/// current item after a skip-current request, leaving the batch running
	#[error("SkipCurrent")]
	SkipCurrent,
}

impl Error {
	pub fn other<M>(msg: M) -> Self
	where
		M: Into<String>,
	{
		return Self::Other(msg.into());
	}

	/// Builds a [`Error::Classified`] from a raw message, running it through
	/// [`classify`] first.
	pub fn classified<M>(msg: M) -> Self
	where
		M: Into<String>,
	{
		let msg = msg.into();
		let kind = classify(&msg);
		return Self::Classified(kind, msg);
	}

	/// Returns the [`ErrorKind`] this error maps to, for errors that carry one.
	#[must_use]
	pub fn kind(&self) -> Option<ErrorKind> {
		return match self {
			Self::Classified(kind, _) => Some(*kind),
			Self::Cancelled => Some(ErrorKind::Cancelled),
			_ => None,
		};
	}
}

// this is custom, some errors like "std::io::Error" do not implement "PartialEq", but some inner type may do
impl PartialEq for Error {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::IoError(l0), Self::IoError(r0)) => return l0.kind() == r0.kind(),
			(Self::FromStringUTF8Error(l0), Self::FromStringUTF8Error(r0)) => return l0 == r0,
			(Self::CommandNotSuccesfull(l0), Self::CommandNotSuccesfull(r0)) => return l0 == r0,
			(Self::Other(l0), Self::Other(r0)) => return l0 == r0,
			(Self::SQLConnectionError(l0), Self::SQLConnectionError(r0)) => return l0 == r0,
			(Self::SQLOperationError(l0), Self::SQLOperationError(r0)) => return l0 == r0,
			(Self::SQLMigrationError(l0), Self::SQLMigrationError(r0)) => return l0 == r0,
			(Self::Classified(lk, lm), Self::Classified(rk, rm)) => return lk == rk && lm == rm,
			(Self::Cancelled, Self::Cancelled) => return true,
			(Self::SkipCurrent, Self::SkipCurrent) => return true,
			// Always return "false" for a serde_json::Error
			(Self::SerdeJSONError(_l0), Self::SerdeJSONError(_r0)) => return false,
			// Always return "false" for a Unexpected Process Exit
			(Self::UnexpectedProcessExit(_l0), Self::UnexpectedProcessExit(_r0)) => return false,
			(_, _) => return false,
		}
	}
}

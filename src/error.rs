use crate::ErrorBox;

#[derive(Debug)]
pub enum Error {
	/// A generator tried to add a source with an unusable hint name.
	InvalidHintName { hint: String, reason: &'static str },
	/// A generator added two sources whose hint names only differ by case
	/// (or not at all).
	DuplicateHintName(String),
	/// Returned by [`CancellationToken::check`] once the driver has given up
	/// waiting on a generator.
	///
	/// [`CancellationToken::check`]: crate::generator::context::CancellationToken::check
	Cancelled,
	/// Two generators registered under the same name.
	DuplicateGenerator(String),
	/// No input file has the given name.
	UnknownSource(String),
	Process {
		source: Option<ErrorBox>,
		ctx: String,
	},
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Process {
				source: Some(s), ..
			} => Some(s.as_ref()),
			_ => None,
		}
	}
}

impl std::fmt::Display for Error {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidHintName { hint, reason } => {
				write!(f, "invalid hint name `{hint}`: {reason}")
			}
			Self::DuplicateHintName(hint) => {
				write!(f, "a source with hint name `{hint}` was already added")
			}
			Self::Cancelled => write!(f, "operation was cancelled"),
			Self::DuplicateGenerator(name) => {
				write!(f, "a generator named `{name}` is already registered")
			}
			Self::UnknownSource(name) => write!(f, "no input file named `{name}`"),
			Self::Process { source, ctx } => match source {
				Some(s) => {
					write!(f, "{ctx}: {s}")
				}
				None => {
					write!(f, "{ctx}")
				}
			},
		}
	}
}

impl From<serde_json::Error> for Error {
	fn from(value: serde_json::Error) -> Self {
		Self::Process {
			source: Some(Box::new(value)),
			ctx: "failed to decode configuration".to_string(),
		}
	}
}

impl From<rayon::ThreadPoolBuildError> for Error {
	fn from(value: rayon::ThreadPoolBuildError) -> Self {
		Self::Process {
			source: Some(Box::new(value)),
			ctx: "failed to build the generator thread pool".to_string(),
		}
	}
}

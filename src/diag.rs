//! Diagnostics raised by parsing, symbol completion, and generator execution.

use std::sync::Arc;

use rowan::TextRange;
use serde::Serialize;

/// Stable identifiers for every diagnostic this crate can raise.
pub mod code {
	// Syntax //////////////////////////////////////////////////////////////////
	pub const SYNTAX: &str = "SG0001";
	// Declaration /////////////////////////////////////////////////////////////
	pub const DUPLICATE_TYPE: &str = "SG0101";
	pub const DUPLICATE_PARAMETER: &str = "SG0102";
	// Attributes //////////////////////////////////////////////////////////////
	pub const BAD_ATTRIBUTE_ARGS: &str = "SG0201";
	pub const DUPLICATE_ATTRIBUTE: &str = "SG0202";
	pub const ATTRIBUTE_TARGET: &str = "SG0203";
	pub const BAD_LITERAL: &str = "SG0204";
	// Parameters //////////////////////////////////////////////////////////////
	pub const DEFAULT_CONVERSION: &str = "SG0301";
	pub const DEFAULT_ON_BYREF: &str = "SG0302";
	pub const DEFAULT_ON_PARAMS: &str = "SG0303";
	pub const DEFAULT_TWICE: &str = "SG0304";
	pub const PARAMS_NOT_ARRAY: &str = "SG0305";
	pub const CALLER_INFO_NO_DEFAULT: &str = "SG0306";
	pub const CALLER_INFO_TYPE: &str = "SG0307";
	pub const CALLER_INFO_OVERRIDDEN: &str = "SG0308";
	// Generators //////////////////////////////////////////////////////////////
	pub const GENERATOR_FAULT: &str = "SG0401";
	pub const GENERATOR_INIT_FAULT: &str = "SG0402";
	pub const GENERATOR_TIMEOUT: &str = "SG0403";
	pub const GENERATOR_BUSY: &str = "SG0404";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
	Hidden,
	Info,
	Warning,
	Error,
}

impl std::fmt::Display for Severity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Hidden => write!(f, "hidden"),
			Self::Info => write!(f, "info"),
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
		}
	}
}

/// What raised a [`Diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DiagSource {
	Syntax,
	/// Carries the symbol's qualified display name, e.g. `T.M(x)`.
	Symbol(Arc<str>),
	/// Carries the generator's registered name.
	Generator(Arc<str>),
	/// The generator driver itself.
	Driver,
}

/// A span in a named file of a [`Compilation`](crate::Compilation).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
	pub file: Arc<str>,
	pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
	pub code: &'static str,
	pub severity: Severity,
	pub message: String,
	pub source: DiagSource,
	pub location: Option<Location>,
}

impl Diagnostic {
	#[must_use]
	pub fn new(code: &'static str, severity: Severity, message: impl Into<String>) -> Self {
		Self {
			code,
			severity,
			message: message.into(),
			source: DiagSource::Driver,
			location: None,
		}
	}

	#[must_use]
	pub fn error(code: &'static str, message: impl Into<String>) -> Self {
		Self::new(code, Severity::Error, message)
	}

	#[must_use]
	pub fn warning(code: &'static str, message: impl Into<String>) -> Self {
		Self::new(code, Severity::Warning, message)
	}

	#[must_use]
	pub fn at(mut self, location: Location) -> Self {
		self.location = Some(location);
		self
	}

	#[must_use]
	pub fn from_source(mut self, source: DiagSource) -> Self {
		self.source = source;
		self
	}

	#[must_use]
	pub fn is_error(&self) -> bool {
		self.severity == Severity::Error
	}

	#[must_use]
	pub fn generator(&self) -> Option<&str> {
		match &self.source {
			DiagSource::Generator(name) => Some(name),
			_ => None,
		}
	}
}

impl std::fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if let Some(loc) = &self.location {
			write!(
				f,
				"{}@{}..{}: ",
				loc.file,
				u32::from(loc.range.start()),
				u32::from(loc.range.end())
			)?;
		}

		write!(f, "{}[{}]: {}", self.severity, self.code, self.message)
	}
}

#[cfg(test)]
mod test {
	use rowan::TextSize;

	use super::*;

	#[test]
	fn display() {
		let diag = Diagnostic::error(code::SYNTAX, "expected `;`").at(Location {
			file: Arc::from("a.decl"),
			range: TextRange::new(TextSize::from(3), TextSize::from(4)),
		});

		assert_eq!(diag.to_string(), "a.decl@3..4: error[SG0001]: expected `;`");
		assert!(diag.is_error());
		assert_eq!(diag.generator(), None);

		let diag = Diagnostic::warning(code::GENERATOR_BUSY, "busy")
			.from_source(DiagSource::Generator(Arc::from("gen")));
		assert_eq!(diag.generator(), Some("gen"));
		assert_eq!(diag.to_string(), "warning[SG0404]: busy");
	}
}

//! What a [`SourceGenerator`](super::SourceGenerator) sees while it runs.

use std::sync::{
	atomic::{self, AtomicBool},
	Arc,
};

use parking_lot::Mutex;

use crate::{
	diag::{DiagSource, Diagnostic},
	Compilation, Error, FxIndexSet,
};

/// Cooperative cancellation. Generators which run for a long time should
/// [check](Self::check) this periodically.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.0.load(atomic::Ordering::Acquire)
	}

	pub fn cancel(&self) {
		self.0.store(true, atomic::Ordering::Release);
	}

	/// Returns [`Error::Cancelled`] if the token has been cancelled, so that
	/// generators can bail out with `?`.
	pub fn check(&self) -> Result<(), Error> {
		if self.is_cancelled() {
			Err(Error::Cancelled)
		} else {
			Ok(())
		}
	}
}

/// When a generator's cached output may be reused instead of executing it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RerunPolicy {
	/// Re-execute whenever any input file changes.
	#[default]
	AnyInputChange,
	/// Re-execute only when one of these input files changes, appears, or
	/// disappears.
	WatchedFiles(FxIndexSet<Arc<str>>),
}

impl RerunPolicy {
	/// The part of `compilation` this policy cares about.
	#[must_use]
	pub(crate) fn fingerprint(&self, compilation: &Compilation) -> u64 {
		match self {
			Self::AnyInputChange => compilation.fingerprint(),
			Self::WatchedFiles(names) => {
				compilation.fingerprint_of(names.iter().map(|n| n.as_ref()))
			}
		}
	}
}

/// Passed to [`SourceGenerator::initialize`](super::SourceGenerator::initialize).
#[derive(Debug)]
pub struct InitializationContext {
	generator: Arc<str>,
	policy: RerunPolicy,
}

impl InitializationContext {
	#[must_use]
	pub(crate) fn new(generator: Arc<str>) -> Self {
		Self {
			generator,
			policy: RerunPolicy::default(),
		}
	}

	#[must_use]
	pub fn generator(&self) -> &str {
		&self.generator
	}

	/// Restricts re-execution to passes where `file` (or any other file named
	/// by a previous call) changed.
	pub fn run_when_changed(&mut self, file: impl Into<Arc<str>>) {
		match &mut self.policy {
			RerunPolicy::WatchedFiles(names) => {
				names.insert(file.into());
			}
			policy @ RerunPolicy::AnyInputChange => {
				let mut names = FxIndexSet::default();
				names.insert(file.into());
				*policy = RerunPolicy::WatchedFiles(names);
			}
		}
	}

	/// Undoes any calls to [`Self::run_when_changed`].
	pub fn run_on_any_change(&mut self) {
		self.policy = RerunPolicy::AnyInputChange;
	}

	#[must_use]
	pub(crate) fn into_policy(self) -> RerunPolicy {
		self.policy
	}
}

/// One file added by a generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
	/// Always ends in `.decl`.
	pub hint_name: String,
	pub text: Arc<str>,
}

/// Everything one execution produced, in the order it was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOutput {
	pub sources: Vec<GeneratedSource>,
	pub diagnostics: Vec<Diagnostic>,
}

/// Passed to [`SourceGenerator::execute`](super::SourceGenerator::execute).
///
/// Only lives as long as the execution; the driver freezes what was added
/// to it as soon as `execute` returns.
#[derive(Debug)]
pub struct ExecutionContext {
	generator: Arc<str>,
	compilation: Compilation,
	cancellation: CancellationToken,
	sink: Mutex<GeneratorOutput>,
}

impl ExecutionContext {
	#[must_use]
	pub(crate) fn new(
		generator: Arc<str>,
		compilation: Compilation,
		cancellation: CancellationToken,
	) -> Self {
		Self {
			generator,
			compilation,
			cancellation,
			sink: Mutex::new(GeneratorOutput::default()),
		}
	}

	#[must_use]
	pub fn generator(&self) -> &str {
		&self.generator
	}

	/// The input files of this pass. Output from other generators is never
	/// visible here.
	#[must_use]
	pub fn compilation(&self) -> &Compilation {
		&self.compilation
	}

	#[must_use]
	pub fn cancellation(&self) -> &CancellationToken {
		&self.cancellation
	}

	/// `hint` gets a `.decl` extension if it lacks one.
	///
	/// Fails if `hint` is empty, contains a character which is invalid in a
	/// file path, or matches (ignoring ASCII case) a previously added hint.
	pub fn add_source(&self, hint: &str, text: impl Into<Arc<str>>) -> Result<(), Error> {
		let hint_name = validate_hint(hint)?;
		let mut sink = self.sink.lock();

		if sink
			.sources
			.iter()
			.any(|s| s.hint_name.eq_ignore_ascii_case(&hint_name))
		{
			return Err(Error::DuplicateHintName(hint_name));
		}

		sink.sources.push(GeneratedSource {
			hint_name,
			text: text.into(),
		});

		Ok(())
	}

	/// The diagnostic's source is always overwritten with this generator's name.
	pub fn report_diagnostic(&self, diag: Diagnostic) {
		let diag = diag.from_source(DiagSource::Generator(self.generator.clone()));
		self.sink.lock().diagnostics.push(diag);
	}

	#[must_use]
	pub(crate) fn into_output(self) -> GeneratorOutput {
		self.sink.into_inner()
	}
}

const EXTENSION: &str = ".decl";

fn validate_hint(hint: &str) -> Result<String, Error> {
	let invalid = |reason| Error::InvalidHintName {
		hint: hint.to_string(),
		reason,
	};

	if hint.trim().is_empty() {
		return Err(invalid("must not be empty"));
	}

	if hint
		.chars()
		.any(|c| c.is_control() || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
	{
		return Err(invalid("contains a character which is invalid in a file path"));
	}

	if hint.ends_with(EXTENSION) {
		Ok(hint.to_string())
	} else {
		Ok(format!("{hint}{EXTENSION}"))
	}
}

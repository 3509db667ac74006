//! Source generators: plugins which read a [`Compilation`] and contribute new
//! source files to it before symbols are bound.
//!
//! [`Compilation`]: crate::Compilation

pub mod context;
pub mod driver;

use crate::UnitResult;

use self::context::{ExecutionContext, InitializationContext};

/// Implementors must be stateless across executions, or at least must not
/// depend on execution order; the driver may run several generators at once,
/// and may skip an execution entirely if its inputs have not changed.
pub trait SourceGenerator: Send + Sync {
	/// Must be unique among the generators registered with one driver.
	/// Also used as the directory component of generated file names.
	fn name(&self) -> &str;

	/// Called at most once, before the first call to [`Self::execute`].
	///
	/// Runs under the same timeout as `execute`. A generator whose
	/// initialization panics or times out is disabled until it is removed and
	/// registered again.
	fn initialize(&self, _: &mut InitializationContext) {}

	/// Returning `Err` or panicking discards everything this execution added
	/// and reports one error diagnostic for it.
	fn execute(&self, ctx: &ExecutionContext) -> UnitResult;
}

/// A [`SourceGenerator`] made from a name and a closure.
pub struct FnGenerator<F> {
	name: String,
	func: F,
}

impl<F> SourceGenerator for FnGenerator<F>
where
	F: Fn(&ExecutionContext) -> UnitResult + Send + Sync,
{
	fn name(&self) -> &str {
		&self.name
	}

	fn execute(&self, ctx: &ExecutionContext) -> UnitResult {
		(self.func)(ctx)
	}
}

impl<F> std::fmt::Debug for FnGenerator<F> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FnGenerator")
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

#[must_use]
pub fn from_fn<F>(name: impl Into<String>, func: F) -> FnGenerator<F>
where
	F: Fn(&ExecutionContext) -> UnitResult + Send + Sync,
{
	FnGenerator {
		name: name.into(),
		func,
	}
}

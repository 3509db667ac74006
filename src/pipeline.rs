//! [`Pipeline`]: keeps a set of inputs, runs generators over them when they
//! change, and binds symbols over the result.

use std::{sync::Arc, time::Instant};

use tracing::{debug, trace};

use crate::{
	generator::driver::PassResult, Compilation, Config, Diagnostic, Error, GeneratorDriver,
	SourceGenerator, SymbolTable,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
	/// No generator pass has run yet.
	Initial,
	/// The latest pass produced a snapshot whose symbols may not be bound yet.
	Generated,
	/// The latest snapshot's symbols have been requested.
	Bound,
}

/// Passes never mutate an earlier [`Compilation`] or [`SymbolTable`]; anything
/// handed out by this type remains valid for as long as it is referenced.
#[derive(Debug)]
pub struct Pipeline {
	driver: GeneratorDriver,
	/// Never contains generated files.
	input: Compilation,
	phase: Phase,
	current: Option<PassResult>,
	/// Set when inputs or generators change after a pass.
	stale: bool,
}

impl Pipeline {
	pub fn new(input: Compilation, config: Config) -> Result<Self, Error> {
		Ok(Self {
			driver: GeneratorDriver::new(config)?,
			input: input.without_generated(),
			phase: Phase::Initial,
			current: None,
			stale: false,
		})
	}

	#[must_use]
	pub fn phase(&self) -> Phase {
		self.phase
	}

	#[must_use]
	pub fn input(&self) -> &Compilation {
		&self.input
	}

	#[must_use]
	pub fn driver(&self) -> &GeneratorDriver {
		&self.driver
	}

	#[must_use]
	pub fn needs_pass(&self) -> bool {
		self.stale || self.current.is_none()
	}

	// Invalidation ////////////////////////////////////////////////////////////

	pub fn add_generator(&mut self, generator: Arc<dyn SourceGenerator>) -> Result<(), Error> {
		self.driver.add_generator(generator)?;
		self.invalidate();
		Ok(())
	}

	/// Returns `false` if no generator has this name.
	pub fn remove_generator(&mut self, name: &str) -> bool {
		let removed = self.driver.remove_generator(name);

		if removed {
			self.invalidate();
		}

		removed
	}

	/// Does nothing if `input` has the same files as the current input.
	pub fn set_input(&mut self, input: Compilation) {
		if input.fingerprint() == self.input.fingerprint() {
			trace!("Input unchanged; keeping the current pass.");
			return;
		}

		self.input = input.without_generated();
		self.invalidate();
	}

	pub fn update_source(&mut self, name: &str, text: impl Into<Arc<str>>) {
		let next = self.input.with_source(name, text);
		self.set_input(next);
	}

	pub fn remove_source(&mut self, name: &str) -> Result<(), Error> {
		let next = self.input.without_source(name)?;
		self.set_input(next);
		Ok(())
	}

	fn invalidate(&mut self) {
		self.stale = true;

		if self.phase == Phase::Bound {
			self.phase = Phase::Generated;
		}
	}

	// Passes //////////////////////////////////////////////////////////////////

	/// Runs the generator driver if inputs or generators changed since the
	/// last pass, or if there has never been one.
	pub fn run(&mut self) -> &PassResult {
		let pass = match self.current.take() {
			Some(pass) if !self.stale => pass,
			_ => {
				let start_time = Instant::now();
				let pass = self.driver.run_generators(&self.input);

				debug!(
					"Generator pass produced {} files and {} diagnostics in {}ms.",
					pass.compilation.generated().len(),
					pass.diagnostics.len(),
					start_time.elapsed().as_millis()
				);

				self.phase = Phase::Generated;
				pass
			}
		};

		self.stale = false;
		self.current.insert(pass)
	}

	/// Runs a pass if needed, then binds the resulting snapshot.
	#[must_use]
	pub fn bind(&mut self) -> Arc<SymbolTable> {
		let table = self.run().compilation.symbols();
		self.phase = Phase::Bound;
		table
	}

	/// The snapshot from the latest pass, even if it is now stale.
	#[must_use]
	pub fn snapshot(&self) -> Option<&Compilation> {
		self.current.as_ref().map(|pass| &pass.compilation)
	}

	/// Generator diagnostics from the latest pass, followed by the latest
	/// snapshot's own (parse errors, then anything from binding).
	#[must_use]
	pub fn diagnostics(&self) -> Vec<Diagnostic> {
		match &self.current {
			Some(pass) => {
				let mut ret = pass.diagnostics.to_vec();
				ret.extend(pass.compilation.diagnostics());
				ret
			}
			None => self.input.diagnostics(),
		}
	}
}

#[cfg(test)]
mod test {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::generator::from_fn;

	#[test]
	fn phases() {
		crate::setup::logging();

		let runs = Arc::new(AtomicUsize::new(0));
		let r = runs.clone();

		let input = Compilation::new([("a.decl", "type A { }")]);
		let mut pipeline = Pipeline::new(input, Config::default()).unwrap();
		assert_eq!(pipeline.phase(), Phase::Initial);
		assert!(pipeline.needs_pass());

		pipeline
			.add_generator(Arc::new(from_fn("echo", move |ctx| {
				r.fetch_add(1, Ordering::SeqCst);

				for file in ctx.compilation().inputs() {
					let hint = file.name().replace(".decl", "_echo");
					ctx.add_source(&hint, format!("type {} {{ }}", hint.to_uppercase()))?;
				}

				Ok(())
			})))
			.unwrap();

		let _ = pipeline.run();
		assert_eq!(pipeline.phase(), Phase::Generated);
		assert!(!pipeline.needs_pass());

		let table = pipeline.bind();
		assert_eq!(pipeline.phase(), Phase::Bound);
		assert!(table.lookup_type("A_ECHO").is_some());
		assert_eq!(runs.load(Ordering::SeqCst), 1);

		// Same text: nothing to do.
		pipeline.update_source("a.decl", "type A { }");
		assert!(!pipeline.needs_pass());
		assert_eq!(pipeline.phase(), Phase::Bound);

		let old = pipeline.snapshot().unwrap().clone();
		pipeline.update_source("b.decl", "type B { }");
		assert!(pipeline.needs_pass());
		assert_eq!(pipeline.phase(), Phase::Generated);

		let table2 = pipeline.bind();
		assert_eq!(runs.load(Ordering::SeqCst), 2);
		assert!(table2.lookup_type("B_ECHO").is_some());

		// The old snapshot and its symbols are untouched.
		assert!(old.symbols().lookup_type("B_ECHO").is_none());
		assert!(Arc::ptr_eq(&old.symbols(), &table));

		assert!(pipeline.remove_generator("echo"));
		let table3 = pipeline.bind();
		assert!(table3.lookup_type("A_ECHO").is_none());
		assert!(table3.lookup_type("B").is_some());

		assert!(pipeline.remove_source("nope.decl").is_err());
		pipeline.remove_source("b.decl").unwrap();
		assert!(pipeline.bind().lookup_type("B").is_none());
	}

	#[test]
	fn diagnostics_before_first_pass() {
		let pipeline = Pipeline::new(Compilation::new([("a.decl", "type")]), Config::default())
			.unwrap();

		assert!(pipeline.snapshot().is_none());
		assert!(!pipeline.diagnostics().is_empty());
	}
}

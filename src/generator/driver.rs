//! [`GeneratorDriver`]: runs every registered generator over a snapshot and
//! merges what they produce into a new one.

use std::{
	panic::{self, AssertUnwindSafe},
	sync::{Arc, OnceLock, Weak},
	time::{Duration, Instant},
};

use crossbeam::channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::{
	compilation::{Origin, SourceFile},
	diag::{code, DiagSource, Diagnostic},
	setup::Config,
	Compilation, Error,
};

use super::{
	context::{
		CancellationToken, ExecutionContext, GeneratorOutput, InitializationContext, RerunPolicy,
	},
	SourceGenerator,
};

/// What happened to one generator during one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
	Executed,
	/// Inputs were unchanged, so the previous output was reused.
	Cached,
	/// `execute` returned `Err` or panicked.
	Faulted,
	TimedOut,
	/// An execution from an earlier pass had still not finished.
	Busy,
	/// `initialize` panicked or timed out, so this generator never executes.
	InitFailed,
}

#[derive(Debug, Clone)]
pub struct GeneratorRunResult {
	pub generator: Arc<str>,
	pub status: RunStatus,
	/// Empty unless `status` is [`RunStatus::Executed`] or [`RunStatus::Cached`],
	/// except for the diagnostics explaining why.
	pub output: Arc<GeneratorOutput>,
	/// Parsed from `output.sources`, in the same order.
	pub files: Arc<[Arc<SourceFile>]>,
	/// Zero for anything which did not execute.
	pub elapsed: Duration,
}

/// The outcome of [`GeneratorDriver::run_generators`].
#[derive(Debug, Clone)]
pub struct PassResult {
	/// The pass' input files plus every generated file.
	pub compilation: Compilation,
	/// Reported by generators or raised on their behalf, in registration order.
	pub diagnostics: Arc<[Diagnostic]>,
	/// In registration order.
	pub results: Vec<GeneratorRunResult>,
}

impl PassResult {
	#[must_use]
	pub fn result_of(&self, generator: &str) -> Option<&GeneratorRunResult> {
		self.results.iter().find(|r| r.generator.as_ref() == generator)
	}
}

pub struct GeneratorDriver {
	config: Config,
	pool: rayon::ThreadPool,
	entries: Vec<Entry>,
	/// Execution guards keyed by generator instance address. A guard lives as
	/// long as an entry or an execution holds it, so removing a generator and
	/// adding it again cannot start a second concurrent execution.
	guards: FxHashMap<usize, Weak<Mutex<()>>>,
}

struct Entry {
	name: Arc<str>,
	generator: Arc<dyn SourceGenerator>,
	init: OnceLock<Result<RerunPolicy, Diagnostic>>,
	cache: Mutex<Option<CachedRun>>,
	/// Held by an execution for as long as it runs, which may outlast the
	/// pass that started it, or even this entry.
	exec_guard: Arc<Mutex<()>>,
}

#[derive(Debug)]
struct CachedRun {
	fingerprint: u64,
	status: RunStatus,
	output: Arc<GeneratorOutput>,
	files: Arc<[Arc<SourceFile>]>,
}

enum Plan {
	Done(GeneratorRunResult),
	Pending(Job),
}

struct Job {
	launch: Launch,
	receiver: Receiver<(JobOutcome, Duration)>,
	cancellation: CancellationToken,
	fingerprint: u64,
}

type Work = Box<dyn FnOnce() + Send>;

/// Work submitted to the driver pool. If no pool worker has picked it up by
/// the end of its horizon (every worker is held by an execution that outlived
/// its pass), it moves to a dedicated thread. Whoever takes it first runs it.
struct Launch {
	work: Arc<Mutex<Option<Work>>>,
	started: Receiver<Instant>,
	submitted: Instant,
	thread_name: String,
}

enum JobOutcome {
	Done(GeneratorOutput, Vec<Arc<SourceFile>>),
	Faulted(String),
	Busy,
}

impl GeneratorDriver {
	pub fn new(config: Config) -> Result<Self, Error> {
		let pool = rayon::ThreadPoolBuilder::new()
			.thread_name(|i| format!("symgen-gen{i}"))
			.num_threads(config.worker_threads)
			.build()?;

		Ok(Self {
			config,
			pool,
			entries: vec![],
			guards: FxHashMap::default(),
		})
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Generators run and merge in the order they were added.
	pub fn add_generator(&mut self, generator: Arc<dyn SourceGenerator>) -> Result<(), Error> {
		let name: Arc<str> = Arc::from(generator.name());

		if self.entries.iter().any(|e| e.name == name) {
			return Err(Error::DuplicateGenerator(name.to_string()));
		}

		self.guards.retain(|_, guard| guard.strong_count() > 0);
		let key = Arc::as_ptr(&generator).cast::<()>() as usize;

		let exec_guard = match self.guards.get(&key).and_then(Weak::upgrade) {
			Some(guard) => guard,
			None => {
				let guard = Arc::new(Mutex::new(()));
				self.guards.insert(key, Arc::downgrade(&guard));
				guard
			}
		};

		self.entries.push(Entry {
			name,
			generator,
			init: OnceLock::new(),
			cache: Mutex::new(None),
			exec_guard,
		});

		Ok(())
	}

	/// Also discards the generator's cached output.
	/// Returns `false` if no generator has this name.
	pub fn remove_generator(&mut self, name: &str) -> bool {
		let before = self.entries.len();
		self.entries.retain(|e| e.name.as_ref() != name);
		self.entries.len() != before
	}

	pub fn generators(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|e| e.name.as_ref())
	}

	/// Generators see only the input files of `compilation`; anything
	/// generated by an earlier pass is replaced.
	#[must_use]
	pub fn run_generators(&self, compilation: &Compilation) -> PassResult {
		let start_time = Instant::now();
		let input = compilation.without_generated();
		let mut plans = Vec::with_capacity(self.entries.len());

		for entry in &self.entries {
			let plan = self.plan(entry, &input);

			if self.config.parallel_generators {
				plans.push(plan);
			} else {
				plans.push(Plan::Done(self.resolve(entry, plan)));
			}
		}

		let results: Vec<GeneratorRunResult> = self
			.entries
			.iter()
			.zip(plans)
			.map(|(entry, plan)| self.resolve(entry, plan))
			.collect();

		let mut diagnostics = vec![];
		let mut generated = vec![];

		for result in &results {
			diagnostics.extend(result.output.diagnostics.iter().cloned());
			generated.extend(result.files.iter().cloned());
		}

		debug!(
			"Ran {} generators over {} inputs in {}ms; {} files generated.",
			results.len(),
			input.inputs().len(),
			start_time.elapsed().as_millis(),
			generated.len()
		);

		PassResult {
			compilation: input.with_generated(generated),
			diagnostics: diagnostics.into(),
			results,
		}
	}

	#[must_use]
	fn plan(&self, entry: &Entry, input: &Compilation) -> Plan {
		let policy = match self.initialize(entry) {
			Ok(policy) => policy,
			Err(diag) => {
				return Plan::Done(entry.result(
					RunStatus::InitFailed,
					GeneratorOutput {
						sources: vec![],
						diagnostics: vec![diag.clone()],
					},
					vec![],
					Duration::ZERO,
				));
			}
		};

		let fingerprint = policy.fingerprint(input);

		if let Some(cached) = entry
			.cache
			.lock()
			.as_ref()
			.filter(|c| c.fingerprint == fingerprint)
		{
			trace!(
				"Reusing cached output of generator `{}` ({:?}).",
				entry.name,
				cached.status
			);

			return Plan::Done(GeneratorRunResult {
				generator: entry.name.clone(),
				status: RunStatus::Cached,
				output: cached.output.clone(),
				files: cached.files.clone(),
				elapsed: Duration::ZERO,
			});
		}

		let (sender, receiver) = crossbeam::channel::bounded(1);
		let cancellation = CancellationToken::default();
		let ctx = ExecutionContext::new(entry.name.clone(), input.clone(), cancellation.clone());
		let generator = entry.generator.clone();
		let exec_guard = entry.exec_guard.clone();

		let launch = self.launch(format!("symgen-{}", entry.name), move || {
			let start_time = Instant::now();

			let outcome = match exec_guard.try_lock() {
				None => JobOutcome::Busy,
				Some(_guard) => {
					let result = panic::catch_unwind(AssertUnwindSafe(|| generator.execute(&ctx)));

					match result {
						Ok(Ok(())) => {
							let name = ctx.generator().to_string();
							let output = ctx.into_output();
							let files = parse_output(&name, &output);
							JobOutcome::Done(output, files)
						}
						Ok(Err(err)) => JobOutcome::Faulted(err.to_string()),
						Err(payload) => JobOutcome::Faulted(panic_message(payload.as_ref())),
					}
				}
			};

			// The driver may have stopped waiting.
			let _ = sender.send((outcome, start_time.elapsed()));
		});

		Plan::Pending(Job {
			launch,
			receiver,
			cancellation,
			fingerprint,
		})
	}

	/// Blocks until the job finishes, or until the timeout passes after it
	/// started executing.
	#[must_use]
	fn resolve(&self, entry: &Entry, plan: Plan) -> GeneratorRunResult {
		let job = match plan {
			Plan::Done(result) => return result,
			Plan::Pending(job) => job,
		};

		let timeout = self.config.generator_timeout();

		let received = match job.launch.wait_start(timeout) {
			Some(start_time) => job.receiver.recv_deadline(start_time + timeout),
			None => Err(RecvTimeoutError::Disconnected),
		};

		match received {
			Ok((JobOutcome::Done(output, files), elapsed)) => {
				debug!(
					"Generator `{}` produced {} sources in {}ms.",
					entry.name,
					output.sources.len(),
					elapsed.as_millis()
				);

				entry.store(job.fingerprint, RunStatus::Executed, output, files, elapsed)
			}
			Ok((JobOutcome::Faulted(msg), elapsed)) => {
				warn!("Generator `{}` failed: {msg}", entry.name);

				let diag = entry.diag(
					Diagnostic::error(
						code::GENERATOR_FAULT,
						format!("generator `{}` failed: {msg}", entry.name),
					),
				);

				entry.store(
					job.fingerprint,
					RunStatus::Faulted,
					GeneratorOutput {
						sources: vec![],
						diagnostics: vec![diag],
					},
					vec![],
					elapsed,
				)
			}
			Ok((JobOutcome::Busy, _)) => {
				warn!(
					"Generator `{}` is still running from an earlier pass; skipping it.",
					entry.name
				);

				let diag = entry.diag(Diagnostic::warning(
					code::GENERATOR_BUSY,
					format!(
						"generator `{}` was skipped; an earlier execution has not finished",
						entry.name
					),
				));

				entry.result(
					RunStatus::Busy,
					GeneratorOutput {
						sources: vec![],
						diagnostics: vec![diag],
					},
					vec![],
					Duration::ZERO,
				)
			}
			Err(RecvTimeoutError::Timeout) => {
				job.cancellation.cancel();

				warn!(
					"Generator `{}` timed out after {}ms; cancelled.",
					entry.name, self.config.generator_timeout_ms
				);

				let diag = entry.diag(Diagnostic::error(
					code::GENERATOR_TIMEOUT,
					format!(
						"generator `{}` did not finish within {}ms and was cancelled",
						entry.name, self.config.generator_timeout_ms
					),
				));

				entry.result(
					RunStatus::TimedOut,
					GeneratorOutput {
						sources: vec![],
						diagnostics: vec![diag],
					},
					vec![],
					self.config.generator_timeout(),
				)
			}
			Err(RecvTimeoutError::Disconnected) => {
				let diag = entry.diag(Diagnostic::error(
					code::GENERATOR_FAULT,
					format!("generator `{}` stopped without a result", entry.name),
				));

				entry.result(
					RunStatus::Faulted,
					GeneratorOutput {
						sources: vec![],
						diagnostics: vec![diag],
					},
					vec![],
					Duration::ZERO,
				)
			}
		}
	}

	/// Runs `initialize` if it has never run, under the same timeout as
	/// `execute`.
	fn initialize<'e>(&self, entry: &'e Entry) -> Result<RerunPolicy, &'e Diagnostic> {
		let init = entry.init.get_or_init(|| {
			let (sender, receiver) = crossbeam::channel::bounded(1);
			let generator = entry.generator.clone();
			let name = entry.name.clone();

			let launch = self.launch(format!("symgen-{}-init", entry.name), move || {
				let mut ctx = InitializationContext::new(name);
				let result = panic::catch_unwind(AssertUnwindSafe(|| generator.initialize(&mut ctx)));

				let _ = sender.send(match result {
					Ok(()) => Ok(ctx.into_policy()),
					Err(payload) => Err(panic_message(payload.as_ref())),
				});
			});

			let timeout = self.config.generator_timeout();

			let received = match launch.wait_start(timeout) {
				Some(start_time) => receiver.recv_deadline(start_time + timeout),
				None => Err(RecvTimeoutError::Disconnected),
			};

			let msg = match received {
				Ok(Ok(policy)) => return Ok(policy),
				Ok(Err(msg)) => msg,
				Err(RecvTimeoutError::Timeout) => {
					format!("did not finish within {}ms", self.config.generator_timeout_ms)
				}
				Err(RecvTimeoutError::Disconnected) => "stopped without a result".to_string(),
			};

			warn!("Generator `{}` failed to initialize: {msg}", entry.name);

			Err(entry.diag(Diagnostic::error(
				code::GENERATOR_INIT_FAULT,
				format!("generator `{}` failed to initialize: {msg}", entry.name),
			)))
		});

		init.as_ref().map(RerunPolicy::clone)
	}

	#[must_use]
	fn launch(&self, thread_name: String, work: impl FnOnce() + Send + 'static) -> Launch {
		let (started_tx, started) = crossbeam::channel::bounded(1);

		let work: Work = Box::new(move || {
			let _ = started_tx.send(Instant::now());
			work();
		});

		let slot = Arc::new(Mutex::new(Some(work)));
		let pooled = slot.clone();

		self.pool.spawn(move || {
			let work = pooled.lock().take();

			if let Some(work) = work {
				work();
			}
		});

		Launch {
			work: slot,
			started,
			submitted: Instant::now(),
			thread_name,
		}
	}
}

impl Launch {
	/// Returns when the work started running, or `None` if it never will.
	#[must_use]
	fn wait_start(&self, horizon: Duration) -> Option<Instant> {
		match self.started.recv_deadline(self.submitted + horizon) {
			Ok(start_time) => return Some(start_time),
			Err(RecvTimeoutError::Disconnected) => return None,
			Err(RecvTimeoutError::Timeout) => {}
		}

		// A pool worker may have taken it in the meantime.
		let work = self.work.lock().take();

		if let Some(work) = work {
			debug!(
				"No driver pool worker is free; running `{}` on its own thread.",
				self.thread_name
			);

			let spawned = std::thread::Builder::new()
				.name(self.thread_name.clone())
				.spawn(work);

			if let Err(err) = spawned {
				warn!("Failed to spawn thread `{}`: {err}", self.thread_name);
				return None;
			}
		}

		self.started.recv().ok()
	}
}

impl Entry {
	#[must_use]
	fn diag(&self, diag: Diagnostic) -> Diagnostic {
		diag.from_source(DiagSource::Generator(self.name.clone()))
	}

	#[must_use]
	fn result(
		&self,
		status: RunStatus,
		output: GeneratorOutput,
		files: Vec<Arc<SourceFile>>,
		elapsed: Duration,
	) -> GeneratorRunResult {
		GeneratorRunResult {
			generator: self.name.clone(),
			status,
			output: Arc::new(output),
			files: files.into(),
			elapsed,
		}
	}

	/// Like [`Self::result`] but also caches the outcome against `fingerprint`.
	#[must_use]
	fn store(
		&self,
		fingerprint: u64,
		status: RunStatus,
		output: GeneratorOutput,
		files: Vec<Arc<SourceFile>>,
		elapsed: Duration,
	) -> GeneratorRunResult {
		let result = self.result(status, output, files, elapsed);

		*self.cache.lock() = Some(CachedRun {
			fingerprint,
			status,
			output: result.output.clone(),
			files: result.files.clone(),
		});

		result
	}
}

#[must_use]
fn parse_output(generator: &str, output: &GeneratorOutput) -> Vec<Arc<SourceFile>> {
	let origin = Origin::Generated {
		generator: Arc::from(generator),
	};

	output
		.sources
		.iter()
		.map(|src| {
			Arc::new(SourceFile::new(
				format!("{generator}/{}", src.hint_name),
				src.text.clone(),
				origin.clone(),
			))
		})
		.collect()
}

#[must_use]
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"panicked with a non-string payload".to_string()
	}
}

impl std::fmt::Debug for GeneratorDriver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GeneratorDriver")
			.field("config", &self.config)
			.field("generators", &self.generators().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}

impl std::fmt::Debug for Entry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Entry")
			.field("name", &self.name)
			.field("cache", &self.cache)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod test {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::generator::from_fn;

	fn driver() -> GeneratorDriver {
		crate::setup::logging();

		GeneratorDriver::new(Config {
			worker_threads: 4,
			..Config::default()
		})
		.unwrap()
	}

	#[test]
	fn merge_order() {
		let mut driver = driver();

		driver
			.add_generator(Arc::new(from_fn("first", |ctx| {
				ctx.add_source("one", "type One { }")?;
				ctx.add_source("two", "type Two { }")?;
				Ok(())
			})))
			.unwrap();

		driver
			.add_generator(Arc::new(from_fn("second", |ctx| {
				std::thread::sleep(Duration::from_millis(20));
				ctx.add_source("three", "type Three { }")?;
				Ok(())
			})))
			.unwrap();

		assert!(matches!(
			driver.add_generator(Arc::new(from_fn("first", |_| Ok(())))),
			Err(Error::DuplicateGenerator(_))
		));

		let input = Compilation::new([("in.decl", "type In { }")]);
		let pass = driver.run_generators(&input);

		let names: Vec<_> = pass
			.compilation
			.files()
			.iter()
			.map(|f| f.name().to_string())
			.collect();

		assert_eq!(
			names,
			[
				"in.decl",
				"first/one.decl",
				"first/two.decl",
				"second/three.decl"
			]
		);

		assert!(pass.diagnostics.is_empty());
		assert!(pass
			.results
			.iter()
			.all(|r| r.status == RunStatus::Executed));
		assert_eq!(
			pass.compilation.generated()[2].origin(),
			&Origin::Generated {
				generator: Arc::from("second")
			}
		);
	}

	#[test]
	fn faults_are_isolated() {
		let mut driver = driver();

		driver
			.add_generator(Arc::new(from_fn("errs", |ctx| {
				ctx.add_source("lost", "type Lost { }")?;
				Err("no good".into())
			})))
			.unwrap();

		driver
			.add_generator(Arc::new(from_fn("panics", |_| panic!("oh no"))))
			.unwrap();

		driver
			.add_generator(Arc::new(from_fn("fine", |ctx| {
				ctx.add_source("kept", "type Kept { }")?;
				Ok(())
			})))
			.unwrap();

		let pass = driver.run_generators(&Compilation::empty());
		assert_eq!(pass.compilation.generated().len(), 1);
		assert_eq!(pass.diagnostics.len(), 2);

		assert_eq!(pass.diagnostics[0].generator(), Some("errs"));
		assert!(pass.diagnostics[0].message.contains("no good"));
		assert_eq!(pass.diagnostics[1].generator(), Some("panics"));
		assert!(pass.diagnostics[1].message.contains("oh no"));
		assert!(pass
			.diagnostics
			.iter()
			.all(|d| d.code == code::GENERATOR_FAULT && d.is_error()));

		assert_eq!(pass.result_of("errs").unwrap().status, RunStatus::Faulted);
		assert_eq!(pass.result_of("fine").unwrap().status, RunStatus::Executed);
	}

	#[test]
	fn initialize_once() {
		struct Counting(AtomicUsize);

		impl SourceGenerator for Counting {
			fn name(&self) -> &str {
				"counting"
			}

			fn initialize(&self, _: &mut InitializationContext) {
				self.0.fetch_add(1, Ordering::SeqCst);
			}

			fn execute(&self, ctx: &ExecutionContext) -> crate::UnitResult {
				ctx.add_source("c", "type C { }")?;
				Ok(())
			}
		}

		struct BadInit;

		impl SourceGenerator for BadInit {
			fn name(&self) -> &str {
				"bad-init"
			}

			fn initialize(&self, _: &mut InitializationContext) {
				panic!("cannot start");
			}

			fn execute(&self, _: &ExecutionContext) -> crate::UnitResult {
				unreachable!()
			}
		}

		let counting = Arc::new(Counting(AtomicUsize::new(0)));
		let mut driver = driver();
		driver.add_generator(counting.clone()).unwrap();
		driver.add_generator(Arc::new(BadInit)).unwrap();

		let input = Compilation::new([("a.decl", "type A { }")]);

		for text in ["type A { }", "type A2 { }", "type A3 { }"] {
			let pass = driver.run_generators(&input.with_source("a.decl", text));
			assert_eq!(pass.result_of("bad-init").unwrap().status, RunStatus::InitFailed);
			assert_eq!(pass.diagnostics.len(), 1);
			assert_eq!(pass.diagnostics[0].code, code::GENERATOR_INIT_FAULT);
		}

		assert_eq!(counting.0.load(Ordering::SeqCst), 1);

		// Removal drops cached state; re-adding starts from scratch.
		assert!(driver.remove_generator("counting"));
		assert!(!driver.remove_generator("counting"));
		driver.add_generator(counting.clone()).unwrap();
		let _ = driver.run_generators(&input);
		assert_eq!(counting.0.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn stuck_worker_does_not_starve_others() {
		crate::setup::logging();

		let (release_tx, release_rx) = crossbeam::channel::bounded::<()>(0);

		let mut driver = GeneratorDriver::new(Config {
			worker_threads: 1,
			generator_timeout_ms: 50,
			..Config::default()
		})
		.unwrap();

		// Ignores its cancellation token.
		driver
			.add_generator(Arc::new(from_fn("stuck", move |_| {
				let _ = release_rx.recv();
				Ok(())
			})))
			.unwrap();

		driver
			.add_generator(Arc::new(from_fn("good", |ctx| {
				ctx.add_source("good", "type Good { }")?;
				Ok(())
			})))
			.unwrap();

		let input = Compilation::new([("a.decl", "type A { }")]);
		let expected = [RunStatus::TimedOut, RunStatus::Busy, RunStatus::Busy];

		for (i, stuck_status) in expected.into_iter().enumerate() {
			let pass = driver.run_generators(&input.with_source("a.decl", format!("type A{i} {{ }}")));
			assert_eq!(pass.result_of("stuck").unwrap().status, stuck_status);
			assert_eq!(pass.result_of("good").unwrap().status, RunStatus::Executed);
			assert_eq!(pass.compilation.generated().len(), 1);
			assert_eq!(
				pass.compilation.generated()[0].name().as_ref(),
				"good/good.decl"
			);
		}

		drop(release_tx);
	}

	#[test]
	fn initialize_timeout() {
		struct Hangs(Receiver<()>);

		impl SourceGenerator for Hangs {
			fn name(&self) -> &str {
				"hangs"
			}

			fn initialize(&self, _: &mut InitializationContext) {
				let _ = self.0.recv();
			}

			fn execute(&self, _: &ExecutionContext) -> crate::UnitResult {
				unreachable!()
			}
		}

		crate::setup::logging();

		let (release_tx, release_rx) = crossbeam::channel::bounded::<()>(0);

		let mut driver = GeneratorDriver::new(Config {
			worker_threads: 2,
			generator_timeout_ms: 50,
			..Config::default()
		})
		.unwrap();

		driver.add_generator(Arc::new(Hangs(release_rx))).unwrap();

		driver
			.add_generator(Arc::new(from_fn("fine", |ctx| {
				ctx.add_source("fine", "type Fine { }")?;
				Ok(())
			})))
			.unwrap();

		let first = driver.run_generators(&Compilation::empty());
		assert_eq!(first.result_of("hangs").unwrap().status, RunStatus::InitFailed);
		assert_eq!(first.result_of("fine").unwrap().status, RunStatus::Executed);
		assert_eq!(first.diagnostics.len(), 1);
		assert_eq!(first.diagnostics[0].code, code::GENERATOR_INIT_FAULT);
		assert!(first.diagnostics[0].message.contains("50ms"));

		// The failure is remembered; initialization is not retried.
		let second = driver.run_generators(&Compilation::empty());
		assert_eq!(second.result_of("hangs").unwrap().status, RunStatus::InitFailed);
		assert_eq!(second.diagnostics, first.diagnostics);

		drop(release_tx);
	}

	#[test]
	fn sequential() {
		let mut driver = GeneratorDriver::new(Config {
			parallel_generators: false,
			worker_threads: 1,
			..Config::default()
		})
		.unwrap();

		let order = Arc::new(Mutex::new(vec![]));

		for name in ["a", "b", "c"] {
			let order = order.clone();

			driver
				.add_generator(Arc::new(from_fn(name, move |ctx| {
					order.lock().push(ctx.generator().to_string());
					Ok(())
				})))
				.unwrap();
		}

		let _ = driver.run_generators(&Compilation::empty());
		assert_eq!(*order.lock(), ["a", "b", "c"]);
	}
}

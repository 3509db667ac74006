//! [`Compilation`] snapshots and the [`SourceFile`]s they are made of.

use std::{
	hash::{Hash, Hasher},
	sync::{Arc, OnceLock},
	time::Instant,
};

use rayon::prelude::*;
use rowan::{ast::AstNode, GreenNode};
use rustc_hash::FxHasher;
use tracing::{debug, trace};

use crate::{
	diag::{self, DiagSource, Diagnostic, Location},
	lines::{LineCol, LineIndex},
	sym::{bind, SymbolTable},
	syntax::{self, ast},
	Error,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
	Input,
	Generated { generator: Arc<str> },
}

/// One parsed file. Immutable, and shared between every snapshot containing it.
#[derive(Debug)]
pub struct SourceFile {
	name: Arc<str>,
	text: Arc<str>,
	origin: Origin,
	green: GreenNode,
	lines: LineIndex,
	diags: Vec<Diagnostic>,
}

impl SourceFile {
	#[must_use]
	pub fn new(name: impl Into<Arc<str>>, text: impl Into<Arc<str>>, origin: Origin) -> Self {
		let name = name.into();
		let text = text.into();
		let parse = syntax::parse(&text);

		let diags = parse
			.errors
			.into_iter()
			.map(|err| {
				Diagnostic::error(diag::code::SYNTAX, err.message)
					.from_source(DiagSource::Syntax)
					.at(Location {
						file: name.clone(),
						range: err.range,
					})
			})
			.collect();

		Self {
			lines: LineIndex::new(&text),
			name,
			text,
			origin,
			green: parse.green,
			diags,
		}
	}

	#[must_use]
	pub fn name(&self) -> &Arc<str> {
		&self.name
	}

	#[must_use]
	pub fn text(&self) -> &Arc<str> {
		&self.text
	}

	#[must_use]
	pub fn origin(&self) -> &Origin {
		&self.origin
	}

	#[must_use]
	pub fn is_generated(&self) -> bool {
		matches!(self.origin, Origin::Generated { .. })
	}

	#[must_use]
	pub fn green(&self) -> &GreenNode {
		&self.green
	}

	#[must_use]
	pub fn root(&self) -> ast::Root {
		let node = syntax::SyntaxNode::new_root(self.green.clone());

		match ast::Root::cast(node) {
			Some(root) => root,
			None => unreachable!("parser always produces a root node"),
		}
	}

	#[must_use]
	pub fn lines(&self) -> &LineIndex {
		&self.lines
	}

	/// Parse errors.
	#[must_use]
	pub fn diagnostics(&self) -> &[Diagnostic] {
		&self.diags
	}

	fn hash_contents(&self, state: &mut FxHasher) {
		self.name.hash(state);
		self.text.hash(state);
	}
}

/// An immutable combination of input files and the files generators produced
/// from them during one pass.
///
/// Cheap to clone. Every snapshot owns its own [`SymbolTable`], bound lazily
/// on first request; deriving a new snapshot never touches an old one.
#[derive(Debug, Clone)]
pub struct Compilation(Arc<Snapshot>);

#[derive(Debug)]
struct Snapshot {
	/// Inputs first, then generated files in generator registration order.
	files: Vec<Arc<SourceFile>>,
	input_count: usize,
	fingerprint: u64,
	symbols: OnceLock<Arc<SymbolTable>>,
}

impl Compilation {
	/// Inputs are `(name, text)` pairs. Parsing happens in parallel.
	#[must_use]
	pub fn new<N, T>(inputs: impl IntoIterator<Item = (N, T)>) -> Self
	where
		N: Into<Arc<str>>,
		T: Into<Arc<str>>,
	{
		let inputs: Vec<(Arc<str>, Arc<str>)> = inputs
			.into_iter()
			.map(|(n, t)| (n.into(), t.into()))
			.collect();

		let files = inputs
			.into_par_iter()
			.map(|(name, text)| Arc::new(SourceFile::new(name, text, Origin::Input)))
			.collect();

		Self::from_inputs(files)
	}

	#[must_use]
	pub fn empty() -> Self {
		Self::from_inputs(vec![])
	}

	#[must_use]
	fn from_inputs(files: Vec<Arc<SourceFile>>) -> Self {
		Self::assemble(files, vec![])
	}

	#[must_use]
	fn assemble(inputs: Vec<Arc<SourceFile>>, generated: Vec<Arc<SourceFile>>) -> Self {
		debug_assert!(inputs.iter().all(|f| !f.is_generated()));
		debug_assert!(generated.iter().all(|f| f.is_generated()));

		let mut hasher = FxHasher::default();

		for file in &inputs {
			file.hash_contents(&mut hasher);
		}

		let input_count = inputs.len();
		let mut files = inputs;
		files.extend(generated);

		Self(Arc::new(Snapshot {
			files,
			input_count,
			fingerprint: hasher.finish(),
			symbols: OnceLock::new(),
		}))
	}

	// Derivation //////////////////////////////////////////////////////////////

	/// A new snapshot with this one's inputs and `generated` in place of any
	/// files generated previously.
	#[must_use]
	pub fn with_generated(&self, generated: Vec<Arc<SourceFile>>) -> Self {
		Self::assemble(self.inputs().to_vec(), generated)
	}

	/// A new snapshot with only this one's inputs.
	#[must_use]
	pub fn without_generated(&self) -> Self {
		if self.generated().is_empty() {
			return self.clone();
		}

		Self::assemble(self.inputs().to_vec(), vec![])
	}

	/// Adds an input file, or replaces the text of the one with the same name.
	#[must_use]
	pub fn with_source(&self, name: impl Into<Arc<str>>, text: impl Into<Arc<str>>) -> Self {
		let file = Arc::new(SourceFile::new(name, text, Origin::Input));
		let mut inputs = self.inputs().to_vec();

		match inputs.iter_mut().find(|f| f.name == file.name) {
			Some(slot) => *slot = file,
			None => inputs.push(file),
		}

		Self::assemble(inputs, vec![])
	}

	pub fn without_source(&self, name: &str) -> Result<Self, Error> {
		let mut inputs = self.inputs().to_vec();
		let before = inputs.len();
		inputs.retain(|f| f.name.as_ref() != name);

		if inputs.len() == before {
			return Err(Error::UnknownSource(name.to_string()));
		}

		Ok(Self::assemble(inputs, vec![]))
	}

	// Queries /////////////////////////////////////////////////////////////////

	#[must_use]
	pub fn files(&self) -> &[Arc<SourceFile>] {
		&self.0.files
	}

	#[must_use]
	pub fn inputs(&self) -> &[Arc<SourceFile>] {
		&self.0.files[..self.0.input_count]
	}

	#[must_use]
	pub fn generated(&self) -> &[Arc<SourceFile>] {
		&self.0.files[self.0.input_count..]
	}

	#[must_use]
	pub fn file(&self, name: &str) -> Option<&Arc<SourceFile>> {
		self.0.files.iter().find(|f| f.name.as_ref() == name)
	}

	/// A hash of every input file's name and text. Stable across processes.
	#[must_use]
	pub fn fingerprint(&self) -> u64 {
		self.0.fingerprint
	}

	/// Like [`Self::fingerprint`], but only over inputs named in `names`.
	/// Names of files which do not exist still contribute, so that a watched
	/// file appearing or disappearing changes the result.
	#[must_use]
	pub fn fingerprint_of<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> u64 {
		let mut hasher = FxHasher::default();

		for name in names {
			name.hash(&mut hasher);

			match self.inputs().iter().find(|f| f.name.as_ref() == name) {
				Some(file) => file.text.hash(&mut hasher),
				None => 0_u8.hash(&mut hasher),
			}
		}

		hasher.finish()
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}

	#[must_use]
	pub fn line_col(&self, location: &Location) -> Option<(LineCol, LineCol)> {
		self.file(&location.file)?.lines.span(location.range)
	}

	// Symbols /////////////////////////////////////////////////////////////////

	/// Binds this snapshot's symbols if that has not happened yet.
	///
	/// Concurrent first callers may each bind; one table is published and
	/// the others are discarded.
	#[must_use]
	pub fn symbols(&self) -> Arc<SymbolTable> {
		if let Some(table) = self.0.symbols.get() {
			return table.clone();
		}

		let start_time = Instant::now();
		let table = Arc::new(bind::bind(self.files()));

		debug!(
			"Bound {} symbols from {} files in {}ms.",
			table.len(),
			self.0.files.len(),
			start_time.elapsed().as_millis()
		);

		if self.0.symbols.set(table).is_err() {
			trace!("Discarding a symbol table which lost a binding race.");
		}

		match self.0.symbols.get() {
			Some(table) => table.clone(),
			None => unreachable!(),
		}
	}

	#[must_use]
	pub fn is_bound(&self) -> bool {
		self.0.symbols.get().is_some()
	}

	/// Parse errors, then binding errors, then errors from any symbol facts
	/// which have been completed so far.
	#[must_use]
	pub fn diagnostics(&self) -> Vec<Diagnostic> {
		let mut ret: Vec<Diagnostic> = self
			.files()
			.iter()
			.flat_map(|f| f.diags.iter().cloned())
			.collect();

		if let Some(table) = self.0.symbols.get() {
			ret.extend(table.diagnostics());
		}

		ret
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn snapshots_are_independent() {
		let first = Compilation::new([("a.decl", "type A { }"), ("b.decl", "type B { }")]);
		let second = first.with_source("a.decl", "type A2 { }");

		assert_eq!(first.inputs().len(), 2);
		assert_eq!(second.inputs().len(), 2);
		assert_eq!(first.file("a.decl").unwrap().text().as_ref(), "type A { }");
		assert_eq!(second.file("a.decl").unwrap().text().as_ref(), "type A2 { }");
		assert_ne!(first.fingerprint(), second.fingerprint());

		// Unchanged files are shared.
		assert!(Arc::ptr_eq(
			first.file("b.decl").unwrap(),
			second.file("b.decl").unwrap()
		));

		let first_syms = first.symbols();
		let second_syms = second.symbols();
		assert!(first_syms.lookup_type("A").is_some());
		assert!(second_syms.lookup_type("A").is_none());
		assert!(Arc::ptr_eq(&first_syms, &first.symbols()));
	}

	#[test]
	fn fingerprints() {
		let a = Compilation::new([("a.decl", "type A { }")]);
		let b = Compilation::new([("a.decl", "type A { }")]);
		assert_eq!(a.fingerprint(), b.fingerprint());
		assert_eq!(a.fingerprint_of(["a.decl"]), b.fingerprint_of(["a.decl"]));

		let c = a.with_source("z.decl", "type Z { }");
		assert_ne!(a.fingerprint(), c.fingerprint());
		assert_eq!(a.fingerprint_of(["a.decl"]), c.fingerprint_of(["a.decl"]));
		assert_ne!(a.fingerprint_of(["z.decl"]), c.fingerprint_of(["z.decl"]));

		assert!(a.without_source("nope.decl").is_err());
		assert!(c.without_source("z.decl").unwrap().inputs().len() == 1);
	}

	#[test]
	fn syntax_diagnostics() {
		let comp = Compilation::new([("bad.decl", "type { }")]);
		let diags = comp.diagnostics();
		assert_eq!(diags.len(), 1);
		assert_eq!(diags[0].code, diag::code::SYNTAX);
		assert_eq!(diags[0].location.as_ref().unwrap().file.as_ref(), "bad.decl");
	}
}

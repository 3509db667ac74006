//! Symbols: types, methods, and parameters declared by a [`Compilation`].
//!
//! A [`SymbolTable`] is bound eagerly from syntax, but only the facts needed to
//! build the symbol graph (names, ordinals, shapes) are computed at that point.
//! Everything else (attribute bags, default values, and so on) is completed on
//! demand, under the rules laid out in [`completion`].
//!
//! [`Compilation`]: crate::Compilation

pub mod attrs;
pub(crate) mod bind;
pub mod completion;
pub mod param;

use std::sync::{Arc, OnceLock};

use rayon::prelude::*;
use rowan::{ast::AstNode, GreenNode, TextRange, TextSize};
use serde::Serialize;

use crate::{
	diag::{Diagnostic, Location},
	syntax::{self, ast, SyntaxNode},
	FxIndexMap,
};

use self::{
	attrs::{AttributeTarget, AttributesBag},
	completion::{CompletionPart, CompletionState},
	param::Parameter,
};

/// An index into a [`SymbolTable`]. Only meaningful for the table which made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymIx(pub(crate) u32);

impl SymIx {
	#[must_use]
	fn index(self) -> usize {
		self.0 as usize
	}
}

/// A lazily-computed fact, along with whatever diagnostics computing it raised.
///
/// The two are published together, so a computation which loses a completion
/// race takes its diagnostics with it.
#[derive(Debug, PartialEq)]
pub(crate) struct Completed<T> {
	pub(crate) value: T,
	pub(crate) diags: Box<[Diagnostic]>,
}

impl<T> Completed<T> {
	#[must_use]
	pub(crate) fn new(value: T, diags: Vec<Diagnostic>) -> Self {
		Self {
			value,
			diags: diags.into_boxed_slice(),
		}
	}
}

/// A thread-safe handle to the declaring syntax of a symbol.
///
/// Holds an immutable green subtree, and the offset of that subtree in its
/// file, so that the syntax can be re-rooted on whatever thread needs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxRef {
	file: Arc<str>,
	green: GreenNode,
	offset: TextSize,
}

impl SyntaxRef {
	#[must_use]
	pub(crate) fn new(file: Arc<str>, node: &SyntaxNode) -> Self {
		Self {
			file,
			green: node.green().into_owned(),
			offset: node.text_range().start(),
		}
	}

	#[must_use]
	pub fn file(&self) -> &Arc<str> {
		&self.file
	}

	/// Note that ranges of the returned node's descendants begin at zero.
	#[must_use]
	pub fn node(&self) -> SyntaxNode {
		SyntaxNode::new_root(self.green.clone())
	}

	/// In file coordinates.
	#[must_use]
	pub fn range(&self) -> TextRange {
		TextRange::at(self.offset, self.green.text_len())
	}

	#[must_use]
	pub fn offset(&self) -> TextSize {
		self.offset
	}

	/// Converts a range from [`Self::node`] into a file location.
	#[must_use]
	pub fn location(&self, local: TextRange) -> Location {
		Location {
			file: self.file.clone(),
			range: syntax::rebase(local, self.offset),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolKind {
	Type,
	Method,
	Parameter,
}

/// The lazily-bound attribute list of a type or method.
#[derive(Debug)]
pub(crate) struct DeclAttrs {
	/// `None` if the declaration has no attributes.
	syntax: Option<SyntaxRef>,
	target: AttributeTarget,
	display: Arc<str>,
	bag: OnceLock<Completed<AttributesBag>>,
}

impl DeclAttrs {
	#[must_use]
	pub(crate) fn new(syntax: Option<SyntaxRef>, target: AttributeTarget, display: Arc<str>) -> Self {
		Self {
			syntax,
			target,
			display,
			bag: OnceLock::new(),
		}
	}

	#[must_use]
	fn get(&self, state: &CompletionState) -> &AttributesBag {
		let Some(syntax) = &self.syntax else {
			state.note_part_complete(CompletionPart::ATTRIBUTES);
			return AttributesBag::empty();
		};

		let completed = state.ensure_complete(CompletionPart::ATTRIBUTES, &self.bag, || {
			let node = syntax.node();
			let mut diags = vec![];

			let attrs: Vec<ast::Attribute> = match self.target {
				AttributeTarget::Type => ast::TypeDecl::cast(node)
					.map(|decl| decl.attributes().collect())
					.unwrap_or_default(),
				AttributeTarget::Method => ast::MethodDecl::cast(node)
					.map(|decl| decl.attributes().collect())
					.unwrap_or_default(),
				AttributeTarget::Parameter => unreachable!(),
			};

			let bag = attrs::bind_attributes(
				attrs.into_iter(),
				self.target,
				syntax.file(),
				syntax.offset(),
				&self.display,
				&mut diags,
			);

			Completed::new(bag, diags)
		});

		&completed.value
	}

	fn diagnostics(&self) -> &[Diagnostic] {
		match self.bag.get() {
			Some(completed) => &completed.diags,
			None => &[],
		}
	}
}

#[derive(Debug)]
pub struct TypeSymbol {
	pub(crate) name: Arc<str>,
	pub(crate) ordinal: u32,
	pub(crate) type_params: Box<[Arc<str>]>,
	pub(crate) locations: Box<[Location]>,
	pub(crate) members: Box<[SymIx]>,
	pub(crate) attrs: DeclAttrs,
	pub(crate) state: CompletionState,
}

impl TypeSymbol {
	#[must_use]
	pub fn name(&self) -> &Arc<str> {
		&self.name
	}

	/// Position among the types declared by the same file.
	#[must_use]
	pub fn ordinal(&self) -> u32 {
		self.ordinal
	}

	#[must_use]
	pub fn type_params(&self) -> &[Arc<str>] {
		&self.type_params
	}

	#[must_use]
	pub fn locations(&self) -> &[Location] {
		&self.locations
	}

	/// Methods, in declaration order.
	#[must_use]
	pub fn members(&self) -> &[SymIx] {
		&self.members
	}

	#[must_use]
	pub fn attributes(&self) -> &AttributesBag {
		self.attrs.get(&self.state)
	}

	#[must_use]
	pub fn completion(&self) -> &CompletionState {
		&self.state
	}
}

#[derive(Debug)]
pub struct MethodSymbol {
	pub(crate) owner: SymIx,
	pub(crate) name: Arc<str>,
	pub(crate) ordinal: u32,
	pub(crate) type_params: Box<[Arc<str>]>,
	pub(crate) locations: Box<[Location]>,
	pub(crate) params: Box<[SymIx]>,
	pub(crate) attrs: DeclAttrs,
	pub(crate) state: CompletionState,
}

impl MethodSymbol {
	#[must_use]
	pub fn owner(&self) -> SymIx {
		self.owner
	}

	#[must_use]
	pub fn name(&self) -> &Arc<str> {
		&self.name
	}

	#[must_use]
	pub fn ordinal(&self) -> u32 {
		self.ordinal
	}

	#[must_use]
	pub fn type_params(&self) -> &[Arc<str>] {
		&self.type_params
	}

	#[must_use]
	pub fn locations(&self) -> &[Location] {
		&self.locations
	}

	#[must_use]
	pub fn params(&self) -> &[SymIx] {
		&self.params
	}

	#[must_use]
	pub fn attributes(&self) -> &AttributesBag {
		self.attrs.get(&self.state)
	}

	#[must_use]
	pub fn completion(&self) -> &CompletionState {
		&self.state
	}
}

#[derive(Debug)]
pub enum Symbol {
	Type(TypeSymbol),
	Method(MethodSymbol),
	Parameter(Parameter),
}

impl Symbol {
	#[must_use]
	pub fn name(&self) -> &Arc<str> {
		match self {
			Self::Type(t) => &t.name,
			Self::Method(m) => &m.name,
			Self::Parameter(p) => p.name(),
		}
	}

	#[must_use]
	pub fn kind(&self) -> SymbolKind {
		match self {
			Self::Type(_) => SymbolKind::Type,
			Self::Method(_) => SymbolKind::Method,
			Self::Parameter(_) => SymbolKind::Parameter,
		}
	}

	/// `None` for types, which belong directly to the compilation.
	#[must_use]
	pub fn owner(&self) -> Option<SymIx> {
		match self {
			Self::Type(_) => None,
			Self::Method(m) => Some(m.owner),
			Self::Parameter(p) => Some(p.owner()),
		}
	}

	#[must_use]
	pub fn ordinal(&self) -> u32 {
		match self {
			Self::Type(t) => t.ordinal,
			Self::Method(m) => m.ordinal,
			Self::Parameter(p) => p.ordinal(),
		}
	}

	#[must_use]
	pub fn locations(&self) -> &[Location] {
		match self {
			Self::Type(t) => &t.locations,
			Self::Method(m) => &m.locations,
			Self::Parameter(p) => p.locations(),
		}
	}

	#[must_use]
	pub fn completion(&self) -> &CompletionState {
		match self {
			Self::Type(t) => &t.state,
			Self::Method(m) => &m.state,
			Self::Parameter(p) => p.completion(),
		}
	}

	#[must_use]
	pub fn attributes(&self) -> &AttributesBag {
		match self {
			Self::Type(t) => t.attributes(),
			Self::Method(m) => m.attributes(),
			Self::Parameter(p) => p.attributes(),
		}
	}

	/// Diagnostics from every fact completed so far.
	#[must_use]
	pub fn diagnostics(&self) -> Vec<Diagnostic> {
		match self {
			Self::Type(t) => t.attrs.diagnostics().to_vec(),
			Self::Method(m) => m.attrs.diagnostics().to_vec(),
			Self::Parameter(p) => p.diagnostics(),
		}
	}

	/// Forces every lazily-computed fact.
	pub fn complete_all(&self) {
		match self {
			Self::Type(t) => {
				let _ = t.attributes();
			}
			Self::Method(m) => {
				let _ = m.attributes();
			}
			Self::Parameter(p) => p.complete_all(),
		}
	}

	#[must_use]
	pub fn as_type(&self) -> Option<&TypeSymbol> {
		match self {
			Self::Type(t) => Some(t),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_method(&self) -> Option<&MethodSymbol> {
		match self {
			Self::Method(m) => Some(m),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_parameter(&self) -> Option<&Parameter> {
		match self {
			Self::Parameter(p) => Some(p),
			_ => None,
		}
	}
}

/// What a navigate-to search needs to know about one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredSymbolInfo {
	pub name: Arc<str>,
	pub kind: SymbolKind,
	pub container: Option<Arc<str>>,
	pub parameter_count: usize,
	pub type_parameter_count: usize,
	pub file: Arc<str>,
	pub is_nested_type: bool,
}

/// Every symbol declared by one snapshot.
///
/// Symbols are stored in declaration order: each type is followed by its
/// methods, each of which is followed by its parameters.
#[derive(Debug, Default)]
pub struct SymbolTable {
	pub(crate) symbols: Vec<Symbol>,
	/// Only the first declaration of each name is reachable by name.
	pub(crate) types: FxIndexMap<Arc<str>, SymIx>,
	/// Raised during binding, as opposed to during completion.
	pub(crate) diags: Vec<Diagnostic>,
}

impl SymbolTable {
	#[must_use]
	pub fn len(&self) -> usize {
		self.symbols.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.symbols.is_empty()
	}

	/// # Panics
	///
	/// If `ix` did not come from this table.
	#[must_use]
	pub fn symbol(&self, ix: SymIx) -> &Symbol {
		&self.symbols[ix.index()]
	}

	#[must_use]
	pub fn get(&self, ix: SymIx) -> Option<&Symbol> {
		self.symbols.get(ix.index())
	}

	pub fn iter(&self) -> impl Iterator<Item = (SymIx, &Symbol)> {
		self.symbols
			.iter()
			.enumerate()
			.map(|(i, sym)| (SymIx(i as u32), sym))
	}

	/// In declaration order. Shadowed duplicates are not included.
	pub fn types(&self) -> impl Iterator<Item = &TypeSymbol> {
		self.types
			.values()
			.filter_map(|ix| self.symbol(*ix).as_type())
	}

	#[must_use]
	pub fn type_ix(&self, name: &str) -> Option<SymIx> {
		self.types.get(name).copied()
	}

	#[must_use]
	pub fn lookup_type(&self, name: &str) -> Option<&TypeSymbol> {
		self.type_ix(name)
			.and_then(|ix| self.symbol(ix).as_type())
	}

	pub fn methods_of<'t>(&'t self, ty: &'t TypeSymbol) -> impl Iterator<Item = &'t MethodSymbol> {
		ty.members
			.iter()
			.filter_map(|ix| self.symbol(*ix).as_method())
	}

	pub fn parameters_of<'t>(
		&'t self,
		method: &'t MethodSymbol,
	) -> impl Iterator<Item = &'t Parameter> {
		method
			.params
			.iter()
			.filter_map(|ix| self.symbol(*ix).as_parameter())
	}

	/// If the method is overloaded, the first declared overload is returned.
	#[must_use]
	pub fn find_method(&self, ty: &str, method: &str) -> Option<&MethodSymbol> {
		let ty = self.lookup_type(ty)?;
		self.methods_of(ty).find(|m| m.name.as_ref() == method)
	}

	#[must_use]
	pub fn find_parameter(&self, ty: &str, method: &str, param: &str) -> Option<&Parameter> {
		let method = self.find_method(ty, method)?;
		self.parameters_of(method)
			.find(|p| p.name().as_ref() == param)
	}

	#[must_use]
	pub fn owner_of(&self, ix: SymIx) -> Option<&Symbol> {
		self.symbol(ix).owner().map(|o| self.symbol(o))
	}

	/// e.g. `T`, `T.M`, `T.M(x)`.
	#[must_use]
	pub fn qualified_name(&self, ix: SymIx) -> String {
		let sym = self.symbol(ix);

		match sym {
			Symbol::Type(t) => t.name.to_string(),
			Symbol::Method(m) => format!("{}.{}", self.symbol(m.owner).name(), m.name),
			Symbol::Parameter(p) => {
				format!("{}({})", self.qualified_name(p.owner()), p.name())
			}
		}
	}

	/// Types and methods, in declaration order. Parameters are not navigable.
	#[must_use]
	pub fn declared_symbols(&self) -> Vec<DeclaredSymbolInfo> {
		let mut ret = vec![];

		for sym in &self.symbols {
			match sym {
				Symbol::Type(t) => ret.push(DeclaredSymbolInfo {
					name: t.name.clone(),
					kind: SymbolKind::Type,
					container: None,
					parameter_count: 0,
					type_parameter_count: t.type_params.len(),
					file: file_of(&t.locations),
					is_nested_type: false,
				}),
				Symbol::Method(m) => ret.push(DeclaredSymbolInfo {
					name: m.name.clone(),
					kind: SymbolKind::Method,
					container: Some(self.symbol(m.owner).name().clone()),
					parameter_count: m.params.len(),
					type_parameter_count: m.type_params.len(),
					file: file_of(&m.locations),
					is_nested_type: false,
				}),
				Symbol::Parameter(_) => {}
			}
		}

		ret
	}

	/// Forces every lazily-computed fact of every symbol, in parallel.
	pub fn complete_all(&self) {
		self.symbols.par_iter().for_each(Symbol::complete_all);
	}

	/// Binding diagnostics, then those of every completed fact, in symbol order.
	///
	/// Facts which have not been completed yet contribute nothing; call
	/// [`Self::complete_all`] first for a full report.
	#[must_use]
	pub fn diagnostics(&self) -> Vec<Diagnostic> {
		let mut ret = self.diags.clone();

		for sym in &self.symbols {
			ret.extend(sym.diagnostics());
		}

		ret
	}
}

#[must_use]
fn file_of(locations: &[Location]) -> Arc<str> {
	locations
		.first()
		.map_or_else(|| Arc::from(""), |loc| loc.file.clone())
}

#[cfg(test)]
mod test {
	use indoc::indoc;

	use super::*;
	use crate::{diag::code, Compilation};

	#[test]
	fn graph() {
		const SOURCE: &str = indoc! {r#"
			type A<T> {
				fn M(int x, string y);
				fn N();
			}

			[Obsolete]
			type B {
				fn M<U>(ref long z);
			}
		"#};

		let comp = Compilation::new([("a.decl", SOURCE)]);
		let table = comp.symbols();
		assert_eq!(table.len(), 8);

		let a = table.lookup_type("A").unwrap();
		assert_eq!(a.type_params().len(), 1);
		assert_eq!(table.methods_of(a).count(), 2);
		assert!(a.completion().has_complete(CompletionPart::MEMBERS));

		let m = table.find_method("A", "M").unwrap();
		let names: Vec<_> = table.parameters_of(m).map(|p| p.name().to_string()).collect();
		assert_eq!(names, ["x", "y"]);
		assert_eq!(table.symbol(m.owner()).name().as_ref(), "A");

		let (z_ix, _) = table
			.iter()
			.find(|(_, sym)| sym.name().as_ref() == "z")
			.unwrap();
		assert_eq!(table.qualified_name(z_ix), "B.M(z)");
		assert_eq!(table.owner_of(z_ix).unwrap().name().as_ref(), "M");

		let b = table.lookup_type("B").unwrap();
		assert!(!b.completion().has_complete(CompletionPart::ATTRIBUTES));
		assert_eq!(b.attributes().attributes().len(), 1);
		assert!(b.completion().is_fully_complete());
	}

	#[test]
	fn declared_symbols() {
		let comp = Compilation::new([("a.decl", "type A<T, U> { fn M<V>(int x, int y); }")]);
		let infos = comp.symbols().declared_symbols();
		assert_eq!(infos.len(), 2);

		assert_eq!(infos[0].kind, SymbolKind::Type);
		assert_eq!(infos[0].type_parameter_count, 2);
		assert_eq!(infos[0].file.as_ref(), "a.decl");

		assert_eq!(infos[1].container.as_deref(), Some("A"));
		assert_eq!(infos[1].parameter_count, 2);
		assert_eq!(infos[1].type_parameter_count, 1);

		let json = serde_json::to_value(&infos[1]).unwrap();
		assert_eq!(json["parameterCount"], 2);
		assert_eq!(json["isNestedType"], false);
	}

	#[test]
	fn lazy_diagnostics() {
		let comp = Compilation::new([("a.decl", "type A { fn M([Optional(1)] int x); }")]);
		let table = comp.symbols();

		// Nothing has been completed yet.
		assert!(table.diagnostics().is_empty());

		table.complete_all();
		let diags = table.diagnostics();
		assert_eq!(diags.len(), 1);
		assert_eq!(diags[0].code, code::BAD_ATTRIBUTE_ARGS);

		// Completing again publishes nothing new.
		table.complete_all();
		assert_eq!(table.diagnostics(), diags);
	}
}

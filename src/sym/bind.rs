//! Building a [`SymbolTable`] from the syntax of every file in a snapshot.
//!
//! Files are walked in parallel, each producing thread-safe declaration data;
//! indices are then assigned sequentially, in file order, so that the same
//! files always produce the same table.

use std::sync::Arc;

use rayon::prelude::*;
use rowan::ast::AstNode;

use crate::{
	compilation::SourceFile,
	diag::{code, DiagSource, Diagnostic, Location},
	syntax::{ast, Syn, SyntaxToken},
	FxIndexSet,
};

use super::{
	attrs::AttributeTarget,
	completion::{CompletionPart, CompletionState},
	param::{ParamCaps, ParamDecl, ParamType, Parameter, RefKind},
	DeclAttrs, MethodSymbol, SymIx, Symbol, SymbolTable, SyntaxRef, TypeSymbol,
};

#[derive(Debug)]
struct TypeDecl {
	name: Arc<str>,
	ordinal: u32,
	location: Location,
	type_params: Box<[Arc<str>]>,
	attrs: Option<SyntaxRef>,
	methods: Vec<MethodDecl>,
}

#[derive(Debug)]
struct MethodDecl {
	name: Arc<str>,
	ordinal: u32,
	location: Location,
	type_params: Box<[Arc<str>]>,
	attrs: Option<SyntaxRef>,
	params: Vec<ParamDecl>,
}

#[must_use]
pub(crate) fn bind(files: &[Arc<SourceFile>]) -> SymbolTable {
	let per_file: Vec<(Vec<TypeDecl>, Vec<Diagnostic>)> =
		files.par_iter().map(|file| collect_file(file)).collect();

	let mut table = SymbolTable::default();

	for (types, diags) in per_file {
		table.diags.extend(diags);

		for ty in types {
			add_type(&mut table, ty);
		}
	}

	table
}

fn add_type(table: &mut SymbolTable, ty: TypeDecl) {
	let type_ix = SymIx(table.symbols.len() as u32);

	if table.types.contains_key(&ty.name) {
		table.diags.push(
			Diagnostic::error(
				code::DUPLICATE_TYPE,
				format!("type `{}` is declared more than once", ty.name),
			)
			.at(ty.location.clone())
			.from_source(DiagSource::Symbol(ty.name.clone())),
		);
	} else {
		table.types.insert(ty.name.clone(), type_ix);
	}

	// Each method is followed by its parameters.
	let mut members = Vec::with_capacity(ty.methods.len());
	let mut next = type_ix.0 + 1;

	for method in &ty.methods {
		members.push(SymIx(next));
		next += 1 + method.params.len() as u32;
	}

	let state = CompletionState::new(CompletionPart::TYPE_SYMBOL);
	state.note_part_complete(CompletionPart::MEMBERS);

	table.symbols.push(Symbol::Type(TypeSymbol {
		attrs: DeclAttrs::new(ty.attrs, AttributeTarget::Type, ty.name.clone()),
		name: ty.name,
		ordinal: ty.ordinal,
		type_params: ty.type_params,
		locations: Box::new([ty.location]),
		members: members.into_boxed_slice(),
		state,
	}));

	for method in ty.methods {
		let method_ix = SymIx(table.symbols.len() as u32);
		let display: Arc<str> = Arc::from(format!("{}.{}", table.symbol(type_ix).name(), method.name));

		let params = (0..method.params.len())
			.map(|i| SymIx(method_ix.0 + 1 + i as u32))
			.collect();

		let state = CompletionState::new(CompletionPart::METHOD_SYMBOL);
		state.note_part_complete(CompletionPart::TYPE | CompletionPart::MEMBERS);

		table.symbols.push(Symbol::Method(MethodSymbol {
			owner: type_ix,
			name: method.name,
			ordinal: method.ordinal,
			type_params: method.type_params,
			locations: Box::new([method.location]),
			params,
			attrs: DeclAttrs::new(method.attrs, AttributeTarget::Method, display),
			state,
		}));

		for param in method.params {
			table
				.symbols
				.push(Symbol::Parameter(Parameter::new(method_ix, param)));
		}
	}
}

// Per-file collection /////////////////////////////////////////////////////////

#[must_use]
fn collect_file(file: &SourceFile) -> (Vec<TypeDecl>, Vec<Diagnostic>) {
	let file_name = file.name();
	let mut types = vec![];
	let mut diags = vec![];

	// Declarations with no name have already been reported by the parser.
	for decl in file.root().types() {
		let Some(name) = decl.name() else {
			continue;
		};

		let name: Arc<str> = Arc::from(name.text());

		let attrs = decl
			.attributes()
			.next()
			.is_some()
			.then(|| SyntaxRef::new(file_name.clone(), decl.syntax()));

		let mut methods = vec![];

		for method in decl.methods() {
			let Some(m_name) = method.name() else {
				continue;
			};

			let m_name: Arc<str> = Arc::from(m_name.text());

			methods.push(MethodDecl {
				params: collect_params(file_name, &name, &m_name, &method, &mut diags),
				location: location_of(file_name, &method.name()),
				name: m_name,
				ordinal: methods.len() as u32,
				type_params: type_params(method.generics()),
				attrs: method
					.attributes()
					.next()
					.is_some()
					.then(|| SyntaxRef::new(file_name.clone(), method.syntax())),
			});
		}

		types.push(TypeDecl {
			location: location_of(file_name, &decl.name()),
			ordinal: types.len() as u32,
			type_params: type_params(decl.generics()),
			name,
			attrs,
			methods,
		});
	}

	(types, diags)
}

#[must_use]
fn collect_params(
	file_name: &Arc<str>,
	type_name: &str,
	method_name: &str,
	method: &ast::MethodDecl,
	diags: &mut Vec<Diagnostic>,
) -> Vec<ParamDecl> {
	let Some(list) = method.param_list() else {
		return vec![];
	};

	let mut ret = vec![];
	let mut seen = FxIndexSet::default();

	for param in list.params() {
		let (Some(name_tok), Some(type_ref)) = (param.name(), param.type_ref()) else {
			continue;
		};

		let Some(type_name_tok) = type_ref.name() else {
			continue;
		};

		let name: Arc<str> = Arc::from(name_tok.text());
		let location = Location {
			file: file_name.clone(),
			range: name_tok.text_range(),
		};
		let display: Arc<str> = Arc::from(format!("{type_name}.{method_name}({name})"));

		let mut caps = ParamCaps::empty();

		if name.as_ref() == "_" {
			caps.insert(ParamCaps::IS_DISCARD);
		} else if !seen.insert(name.clone()) {
			diags.push(
				Diagnostic::error(
					code::DUPLICATE_PARAMETER,
					format!("parameter `{name}` is declared more than once"),
				)
				.at(location.clone())
				.from_source(DiagSource::Symbol(display.clone())),
			);
		}

		if param.attributes().next().is_some() {
			caps.insert(ParamCaps::HAS_ATTRIBUTES);
		}

		if param.default_value().is_some() {
			caps.insert(ParamCaps::HAS_DEFAULT_SYNTAX);
		}

		let ref_kind = match param.modifier().map(|t| t.kind()) {
			Some(Syn::KwRef) => RefKind::Ref,
			Some(Syn::KwOut) => RefKind::Out,
			Some(Syn::KwIn) => RefKind::In,
			Some(Syn::KwParams) => {
				caps.insert(ParamCaps::IS_PARAMS);
				RefKind::None
			}
			_ => RefKind::None,
		};

		ret.push(ParamDecl {
			ordinal: ret.len() as u32,
			name,
			ty: ParamType::new(
				type_name_tok.text(),
				type_ref.is_array(),
				type_ref.is_nullable(),
			),
			ref_kind,
			caps,
			location,
			syntax: SyntaxRef::new(file_name.clone(), param.syntax()),
			display,
		});
	}

	ret
}

#[must_use]
fn type_params(generics: Option<ast::GenericList>) -> Box<[Arc<str>]> {
	generics
		.map(|g| g.names().map(|t| Arc::from(t.text())).collect())
		.unwrap_or_default()
}

#[must_use]
fn location_of(file_name: &Arc<str>, token: &Option<SyntaxToken>) -> Location {
	Location {
		file: file_name.clone(),
		range: token
			.as_ref()
			.map(|t| t.text_range())
			.unwrap_or_default(),
	}
}

#[cfg(test)]
mod test {
	use indoc::indoc;

	use super::*;
	use crate::Compilation;

	#[test]
	fn duplicates() {
		let comp = Compilation::new([
			("a.decl", "type A { fn M(int x, int x, int _, int _); }"),
			("b.decl", "type A { fn N(); }"),
		]);

		let table = comp.symbols();
		let codes: Vec<_> = table.diagnostics().iter().map(|d| d.code).collect();
		assert_eq!(codes, [code::DUPLICATE_PARAMETER, code::DUPLICATE_TYPE]);

		// The first declaration wins the name; the second is still bound.
		let a = table.lookup_type("A").unwrap();
		assert_eq!(a.locations()[0].file.as_ref(), "a.decl");
		assert_eq!(table.types().count(), 1);
		assert!(table.iter().any(|(_, sym)| sym.name().as_ref() == "N"));

		let m = table.find_method("A", "M").unwrap();
		let discards = table.parameters_of(m).filter(|p| p.is_discard()).count();
		assert_eq!(discards, 2);
	}

	#[test]
	fn shapes() {
		const SOURCE: &str = indoc! {r#"
			type T {
				fn M(int a, ref int b, out int c, in int d, params int[] e, [Optional] int f, int g = 1);
			}
		"#};

		let comp = Compilation::new([("t.decl", SOURCE)]);
		let table = comp.symbols();
		let m = table.find_method("T", "M").unwrap();
		let params: Vec<_> = table.parameters_of(m).collect();

		let ref_kinds: Vec<_> = params.iter().map(|p| p.ref_kind()).collect();
		assert_eq!(
			ref_kinds,
			[
				RefKind::None,
				RefKind::Ref,
				RefKind::Out,
				RefKind::In,
				RefKind::None,
				RefKind::None,
				RefKind::None
			]
		);

		let simple: Vec<_> = params.iter().map(|p| p.is_simple()).collect();
		assert_eq!(simple, [true, true, true, true, false, false, false]);

		for (i, p) in params.iter().enumerate() {
			assert_eq!(p.ordinal() as usize, i);
		}

		// Locations point at the name.
		let b = params[1];
		let range = b.locations()[0].range;
		assert_eq!(&SOURCE[range], "b");
	}

	#[test]
	fn deterministic() {
		let files: Vec<_> = (0..32)
			.map(|i| (format!("f{i}.decl"), format!("type T{i} {{ fn M(int x); }}")))
			.collect();

		let first = Compilation::new(files.clone()).symbols();
		let second = Compilation::new(files).symbols();

		let names = |t: &SymbolTable| -> Vec<String> {
			t.iter().map(|(ix, _)| t.qualified_name(ix)).collect()
		};

		assert_eq!(names(&first), names(&second));
		assert_eq!(first.types().next().unwrap().name().as_ref(), "T0");
	}
}

//! [`Parameter`] symbols.
//!
//! Most parameters in real code are plain `int x`; these are bound as the
//! simple variant, which has nothing to compute lazily and so is born with
//! every completion part done. Anything with attributes, a default value, or
//! a `params` modifier gets the complex variant, which keeps its syntax and
//! one memo slot per derived fact.

use std::sync::{Arc, OnceLock};

use rowan::ast::AstNode;
use serde::Serialize;

use crate::{
	diag::{code, DiagSource, Diagnostic, Location},
	syntax::ast,
};

use super::{
	attrs::{
		self, AttributeTarget, AttributesBag, CallerInfo, ConstantValue, FlowAnalysisAnnotations,
		MarshalInfo,
	},
	completion::{CompletionPart, CompletionState},
	Completed, SymIx, SyntaxRef,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamType {
	pub name: Arc<str>,
	pub is_array: bool,
	pub is_nullable: bool,
}

/// The types constant folding knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialType {
	Int,
	Long,
	Double,
	Bool,
	String,
	Object,
	Other,
}

impl ParamType {
	#[must_use]
	pub fn new(name: impl Into<Arc<str>>, is_array: bool, is_nullable: bool) -> Self {
		Self {
			name: name.into(),
			is_array,
			is_nullable,
		}
	}

	/// Of the element type, if this is an array.
	#[must_use]
	pub fn special(&self) -> SpecialType {
		match self.name.as_ref() {
			"int" => SpecialType::Int,
			"long" => SpecialType::Long,
			"double" => SpecialType::Double,
			"bool" => SpecialType::Bool,
			"string" => SpecialType::String,
			"object" => SpecialType::Object,
			_ => SpecialType::Other,
		}
	}

	/// The numeric types and `bool` are value types; all others are references.
	#[must_use]
	pub fn admits_null(&self) -> bool {
		self.is_array
			|| self.is_nullable
			|| !matches!(
				self.special(),
				SpecialType::Int | SpecialType::Long | SpecialType::Double | SpecialType::Bool
			)
	}
}

impl std::fmt::Display for ParamType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.name)?;

		if self.is_array {
			write!(f, "[]")?;
		}

		if self.is_nullable {
			write!(f, "?")?;
		}

		Ok(())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum RefKind {
	#[default]
	None,
	Ref,
	Out,
	In,
}

bitflags::bitflags! {
	/// Shape facts known from syntax alone, at binding time.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct ParamCaps: u8 {
		const HAS_ATTRIBUTES = 1 << 0;
		const HAS_DEFAULT_SYNTAX = 1 << 1;
		/// The `params` keyword was written; see [`Parameter::is_params`].
		const IS_PARAMS = 1 << 2;
		const IS_DISCARD = 1 << 3;
	}
}

impl ParamCaps {
	/// Whether a parameter with these capabilities needs the complex variant.
	#[must_use]
	pub fn needs_complex(self) -> bool {
		self.intersects(Self::HAS_ATTRIBUTES | Self::HAS_DEFAULT_SYNTAX | Self::IS_PARAMS)
	}
}

/// A modifier carried by a parameter's reference type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CustomModifier {
	pub name: &'static str,
	pub required: bool,
}

/// Everything binding learns about a parameter, before an owner is known.
#[derive(Debug)]
pub(crate) struct ParamDecl {
	pub(crate) ordinal: u32,
	pub(crate) name: Arc<str>,
	pub(crate) ty: ParamType,
	pub(crate) ref_kind: RefKind,
	pub(crate) caps: ParamCaps,
	pub(crate) location: Location,
	pub(crate) syntax: SyntaxRef,
	/// Qualified, e.g. `T.M(x)`.
	pub(crate) display: Arc<str>,
}

#[derive(Debug)]
pub struct Parameter {
	owner: SymIx,
	ordinal: u32,
	name: Arc<str>,
	ty: ParamType,
	ref_kind: RefKind,
	caps: ParamCaps,
	locations: Box<[Location]>,
	state: CompletionState,
	variant: Variant,
}

#[derive(Debug)]
enum Variant {
	Simple,
	Complex(Box<ComplexParam>),
}

#[derive(Debug)]
struct ComplexParam {
	syntax: SyntaxRef,
	display: Arc<str>,
	attrs: OnceLock<Completed<AttributesBag>>,
	default: OnceLock<Completed<DefaultValueData>>,
	modifiers: OnceLock<Completed<ParamModifiers>>,
	flow: OnceLock<FlowFacts>,
	marshalling: OnceLock<Option<MarshalInfo>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct DefaultValueData {
	/// From `= value` syntax.
	syntax: Option<ConstantValue>,
	/// From `[DefaultParameterValue(value)]`.
	attribute: Option<ConstantValue>,
	/// With overridden and invalid attributes removed.
	caller: CallerInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ParamModifiers {
	is_params: bool,
	ref_custom_modifiers: Vec<CustomModifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct FlowFacts {
	annotations: FlowAnalysisAnnotations,
	not_null_if_not_null: Vec<String>,
}

static NO_FLOW_FACTS: FlowFacts = FlowFacts {
	annotations: FlowAnalysisAnnotations::empty(),
	not_null_if_not_null: Vec::new(),
};

impl Parameter {
	#[must_use]
	pub(crate) fn new(owner: SymIx, decl: ParamDecl) -> Self {
		let (state, variant) = if decl.caps.needs_complex() {
			let state = CompletionState::new(CompletionPart::PARAMETER_SYMBOL);
			state.note_part_complete(CompletionPart::TYPE);

			let complex = ComplexParam {
				syntax: decl.syntax,
				display: decl.display,
				attrs: OnceLock::new(),
				default: OnceLock::new(),
				modifiers: OnceLock::new(),
				flow: OnceLock::new(),
				marshalling: OnceLock::new(),
			};

			(state, Variant::Complex(Box::new(complex)))
		} else {
			(
				CompletionState::completed(CompletionPart::PARAMETER_SYMBOL),
				Variant::Simple,
			)
		};

		Self {
			owner,
			ordinal: decl.ordinal,
			name: decl.name,
			ty: decl.ty,
			ref_kind: decl.ref_kind,
			caps: decl.caps,
			locations: Box::new([decl.location]),
			state,
			variant,
		}
	}

	// Immediate facts /////////////////////////////////////////////////////////

	/// The declaring method.
	#[must_use]
	pub fn owner(&self) -> SymIx {
		self.owner
	}

	/// Position in the declaring method's parameter list, from 0.
	#[must_use]
	pub fn ordinal(&self) -> u32 {
		self.ordinal
	}

	#[must_use]
	pub fn name(&self) -> &Arc<str> {
		&self.name
	}

	#[must_use]
	pub fn ty(&self) -> &ParamType {
		&self.ty
	}

	#[must_use]
	pub fn ref_kind(&self) -> RefKind {
		self.ref_kind
	}

	/// Declared as `_`.
	#[must_use]
	pub fn is_discard(&self) -> bool {
		self.caps.contains(ParamCaps::IS_DISCARD)
	}

	/// Always `false`; the declaration language has no extension methods, so
	/// no parameter can be a `this` receiver.
	#[must_use]
	pub fn is_extension_method_this(&self) -> bool {
		false
	}

	#[must_use]
	pub fn caps(&self) -> ParamCaps {
		self.caps
	}

	#[must_use]
	pub fn locations(&self) -> &[Location] {
		&self.locations
	}

	#[must_use]
	pub fn completion(&self) -> &CompletionState {
		&self.state
	}

	#[must_use]
	pub fn is_simple(&self) -> bool {
		matches!(self.variant, Variant::Simple)
	}

	#[must_use]
	pub fn has_default_argument_syntax(&self) -> bool {
		self.caps.contains(ParamCaps::HAS_DEFAULT_SYNTAX)
	}

	/// `None` for the simple variant, which does not keep its syntax.
	#[must_use]
	pub fn syntax_reference(&self) -> Option<&SyntaxRef> {
		match &self.variant {
			Variant::Simple => None,
			Variant::Complex(c) => Some(&c.syntax),
		}
	}

	// Attributes //////////////////////////////////////////////////////////////

	#[must_use]
	pub fn attributes(&self) -> &AttributesBag {
		let Variant::Complex(c) = &self.variant else {
			self.state.note_part_complete(CompletionPart::ATTRIBUTES);
			return AttributesBag::empty();
		};

		let completed = self
			.state
			.ensure_complete(CompletionPart::ATTRIBUTES, &c.attrs, || {
				let mut diags = vec![];

				let bag = match c.node() {
					Some(node) => attrs::bind_attributes(
						node.attributes(),
						AttributeTarget::Parameter,
						c.syntax.file(),
						c.syntax.offset(),
						&c.display,
						&mut diags,
					),
					None => AttributesBag::empty().clone(),
				};

				Completed::new(bag, diags)
			});

		&completed.value
	}

	#[must_use]
	pub fn has_optional_attribute(&self) -> bool {
		match &self.variant {
			Variant::Simple => false,
			Variant::Complex(_) => self.attributes().param_data().optional,
		}
	}

	/// Whether callers may omit this argument.
	#[must_use]
	pub fn is_metadata_optional(&self) -> bool {
		self.has_default_argument_syntax() || self.has_optional_attribute()
	}

	#[must_use]
	pub fn is_idispatch_constant(&self) -> bool {
		match &self.variant {
			Variant::Simple => false,
			Variant::Complex(_) => self.attributes().param_data().idispatch_constant,
		}
	}

	#[must_use]
	pub fn is_iunknown_constant(&self) -> bool {
		match &self.variant {
			Variant::Simple => false,
			Variant::Complex(_) => self.attributes().param_data().iunknown_constant,
		}
	}

	// Default values //////////////////////////////////////////////////////////

	fn default_data(&self) -> Option<&DefaultValueData> {
		let Variant::Complex(c) = &self.variant else {
			return None;
		};

		let completed = self
			.state
			.ensure_complete(CompletionPart::DEFAULT_VALUE, &c.default, || {
				self.compute_default(c)
			});

		Some(&completed.value)
	}

	/// From either `= value` syntax or a `DefaultParameterValue` attribute.
	#[must_use]
	pub fn explicit_default_value(&self) -> Option<&ConstantValue> {
		let data = self.default_data()?;
		data.syntax.as_ref().or(data.attribute.as_ref())
	}

	#[must_use]
	pub fn default_value_from_attributes(&self) -> Option<&ConstantValue> {
		self.default_data()?.attribute.as_ref()
	}

	#[must_use]
	pub fn has_default_value(&self) -> bool {
		self.explicit_default_value().is_some()
	}

	#[must_use]
	fn caller_info(&self) -> CallerInfo {
		self.default_data().map_or(CallerInfo::empty(), |d| d.caller)
	}

	#[must_use]
	pub fn is_caller_file_path(&self) -> bool {
		self.caller_info().contains(CallerInfo::FILE_PATH)
	}

	#[must_use]
	pub fn is_caller_line_number(&self) -> bool {
		self.caller_info().contains(CallerInfo::LINE_NUMBER)
	}

	#[must_use]
	pub fn is_caller_member_name(&self) -> bool {
		self.caller_info().contains(CallerInfo::MEMBER_NAME)
	}

	// Modifiers ///////////////////////////////////////////////////////////////

	fn modifiers(&self) -> Option<&ParamModifiers> {
		let Variant::Complex(c) = &self.variant else {
			return None;
		};

		let completed = self
			.state
			.ensure_complete(CompletionPart::MODIFIERS, &c.modifiers, || {
				self.compute_modifiers(c)
			});

		Some(&completed.value)
	}

	/// `false` if `params` was written on a non-array type.
	#[must_use]
	pub fn is_params(&self) -> bool {
		self.modifiers().is_some_and(|m| m.is_params)
	}

	#[must_use]
	pub fn ref_custom_modifiers(&self) -> &[CustomModifier] {
		match self.modifiers() {
			Some(m) => &m.ref_custom_modifiers,
			None => &[],
		}
	}

	// Flow analysis and marshalling ///////////////////////////////////////////

	fn flow(&self) -> &FlowFacts {
		let Variant::Complex(c) = &self.variant else {
			return &NO_FLOW_FACTS;
		};

		self.state
			.ensure_complete(CompletionPart::FLOW_ANALYSIS, &c.flow, || {
				let data = self.attributes().param_data();

				FlowFacts {
					annotations: data.flow,
					not_null_if_not_null: data.not_null_if_not_null.clone(),
				}
			})
	}

	#[must_use]
	pub fn flow_analysis_annotations(&self) -> FlowAnalysisAnnotations {
		self.flow().annotations
	}

	/// Names of parameters whose non-nullness implies this one's.
	#[must_use]
	pub fn not_null_if_parameter_not_null(&self) -> &[String] {
		&self.flow().not_null_if_not_null
	}

	#[must_use]
	pub fn marshalling_information(&self) -> Option<&MarshalInfo> {
		let Variant::Complex(c) = &self.variant else {
			return None;
		};

		self.state
			.ensure_complete(CompletionPart::MARSHALLING, &c.marshalling, || {
				self.attributes().param_data().marshalling.clone()
			})
			.as_ref()
	}

	// Aggregates //////////////////////////////////////////////////////////////

	pub fn complete_all(&self) {
		let _ = self.attributes();
		let _ = self.default_data();
		let _ = self.modifiers();
		let _ = self.flow();
		let _ = self.marshalling_information();
	}

	/// Diagnostics from every fact completed so far.
	#[must_use]
	pub fn diagnostics(&self) -> Vec<Diagnostic> {
		let Variant::Complex(c) = &self.variant else {
			return vec![];
		};

		let mut ret = vec![];

		if let Some(attrs) = c.attrs.get() {
			ret.extend(attrs.diags.iter().cloned());
		}

		if let Some(default) = c.default.get() {
			ret.extend(default.diags.iter().cloned());
		}

		if let Some(modifiers) = c.modifiers.get() {
			ret.extend(modifiers.diags.iter().cloned());
		}

		ret
	}

	/// Completes every fact, then summarizes them.
	#[must_use]
	pub fn facts(&self) -> ParameterFacts {
		ParameterFacts {
			name: self.name.clone(),
			ordinal: self.ordinal,
			ty: self.ty.to_string(),
			ref_kind: self.ref_kind,
			is_discard: self.is_discard(),
			is_params: self.is_params(),
			is_optional: self.is_metadata_optional(),
			default_value: self.explicit_default_value().map(ToString::to_string),
			caller_file_path: self.is_caller_file_path(),
			caller_line_number: self.is_caller_line_number(),
			caller_member_name: self.is_caller_member_name(),
			marshalling: self.marshalling_information().cloned(),
			flow_annotations: self
				.flow_analysis_annotations()
				.iter_names()
				.map(|(name, _)| name)
				.collect(),
			ref_custom_modifiers: self.ref_custom_modifiers().to_vec(),
			attributes: self
				.attributes()
				.attributes()
				.iter()
				.map(|a| a.name.clone())
				.collect(),
		}
	}
}

/// A serializable summary of one parameter, for editor hovers and the like.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterFacts {
	pub name: Arc<str>,
	pub ordinal: u32,
	#[serde(rename = "type")]
	pub ty: String,
	pub ref_kind: RefKind,
	pub is_discard: bool,
	pub is_params: bool,
	pub is_optional: bool,
	pub default_value: Option<String>,
	pub caller_file_path: bool,
	pub caller_line_number: bool,
	pub caller_member_name: bool,
	pub marshalling: Option<MarshalInfo>,
	pub flow_annotations: Vec<&'static str>,
	pub ref_custom_modifiers: Vec<CustomModifier>,
	pub attributes: Vec<String>,
}

// Lazy computations ///////////////////////////////////////////////////////////

impl ComplexParam {
	#[must_use]
	fn node(&self) -> Option<ast::Param> {
		ast::Param::cast(self.syntax.node())
	}

	#[must_use]
	fn diag(&self, diag: Diagnostic, location: Location) -> Diagnostic {
		diag.at(location)
			.from_source(DiagSource::Symbol(self.display.clone()))
	}
}

impl Parameter {
	#[must_use]
	fn compute_default(&self, c: &ComplexParam) -> Completed<DefaultValueData> {
		let mut diags = vec![];
		let mut data = DefaultValueData::default();
		let here = self.locations[0].clone();

		// `= value` /////////////////////////////////////////////////////////////

		let default_syntax = c.node().and_then(|node| node.default_value());

		if let Some(default) = &default_syntax {
			let location = c.syntax.location(default.syntax().text_range());
			let token = default.literal().and_then(|lit| lit.token());

			// A missing literal has already been reported by the parser.
			if let Some(token) = token {
				match ConstantValue::from_token(&token) {
					Ok(value) => match value.convert_to(&self.ty) {
						Ok(v) => data.syntax = Some(v),
						Err(msg) => diags.push(c.diag(
							Diagnostic::error(code::DEFAULT_CONVERSION, msg),
							location.clone(),
						)),
					},
					Err(msg) => diags.push(c.diag(
						Diagnostic::error(code::BAD_LITERAL, msg),
						location.clone(),
					)),
				}
			}

			if matches!(self.ref_kind, RefKind::Ref | RefKind::Out) {
				diags.push(c.diag(
					Diagnostic::error(
						code::DEFAULT_ON_BYREF,
						"a `ref` or `out` parameter cannot have a default value",
					),
					location.clone(),
				));

				data.syntax = None;
			}

			if self.caps.contains(ParamCaps::IS_PARAMS) {
				diags.push(c.diag(
					Diagnostic::error(
						code::DEFAULT_ON_PARAMS,
						"a `params` parameter cannot have a default value",
					),
					location,
				));

				data.syntax = None;
			}
		}

		// `[DefaultParameterValue(value)]` //////////////////////////////////////

		let wk = self.attributes().param_data();

		if let Some((value, location)) = &wk.default_value {
			if default_syntax.is_some() {
				diags.push(c.diag(
					Diagnostic::error(
						code::DEFAULT_TWICE,
						"cannot specify a default value both with `=` and `DefaultParameterValue`",
					),
					location.clone(),
				));
			} else {
				match value.convert_to(&self.ty) {
					Ok(v) => data.attribute = Some(v),
					Err(msg) => diags.push(c.diag(
						Diagnostic::error(code::DEFAULT_CONVERSION, msg),
						location.clone(),
					)),
				}
			}
		}

		// Caller info ///////////////////////////////////////////////////////////

		let mut caller = wk.caller;

		if !caller.is_empty() && default_syntax.is_none() {
			diags.push(c.diag(
				Diagnostic::error(
					code::CALLER_INFO_NO_DEFAULT,
					"caller info attributes may only be applied to parameters with default values",
				),
				here.clone(),
			));

			caller = CallerInfo::empty();
		}

		let takes_int = ConstantValue::Int(0).convert_to(&self.ty).is_ok();
		let takes_string = ConstantValue::String(String::new())
			.convert_to(&self.ty)
			.is_ok();

		for (flag, ok, attr_name) in [
			(CallerInfo::LINE_NUMBER, takes_int, "CallerLineNumber"),
			(CallerInfo::FILE_PATH, takes_string, "CallerFilePath"),
			(CallerInfo::MEMBER_NAME, takes_string, "CallerMemberName"),
		] {
			if caller.contains(flag) && !ok {
				diags.push(c.diag(
					Diagnostic::error(
						code::CALLER_INFO_TYPE,
						format!("`{attr_name}` cannot be applied to a parameter of type `{}`", self.ty),
					),
					here.clone(),
				));

				caller.remove(flag);
			}
		}

		// Line numbers win over file paths, which win over member names.
		for (winner, loser, loser_name) in [
			(CallerInfo::LINE_NUMBER, CallerInfo::FILE_PATH, "CallerFilePath"),
			(CallerInfo::LINE_NUMBER, CallerInfo::MEMBER_NAME, "CallerMemberName"),
			(CallerInfo::FILE_PATH, CallerInfo::MEMBER_NAME, "CallerMemberName"),
		] {
			if caller.contains(winner | loser) {
				diags.push(c.diag(
					Diagnostic::warning(
						code::CALLER_INFO_OVERRIDDEN,
						format!("`{loser_name}` has no effect; it is overridden by another caller info attribute"),
					),
					here.clone(),
				));

				caller.remove(loser);
			}
		}

		data.caller = caller;
		Completed::new(data, diags)
	}

	#[must_use]
	fn compute_modifiers(&self, c: &ComplexParam) -> Completed<ParamModifiers> {
		let mut diags = vec![];
		let mut is_params = self.caps.contains(ParamCaps::IS_PARAMS);

		if is_params && !self.ty.is_array {
			diags.push(c.diag(
				Diagnostic::error(
					code::PARAMS_NOT_ARRAY,
					format!("a `params` parameter must be an array, not `{}`", self.ty),
				),
				self.locations[0].clone(),
			));

			is_params = false;
		}

		let ref_custom_modifiers = match self.ref_kind {
			RefKind::In => vec![CustomModifier {
				name: "InAttribute",
				required: true,
			}],
			_ => vec![],
		};

		Completed::new(
			ParamModifiers {
				is_params,
				ref_custom_modifiers,
			},
			diags,
		)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{sym::attrs::UnmanagedKind, Compilation};

	fn with_param<R>(method: &str, param: &str, f: impl FnOnce(&Parameter) -> R) -> R {
		let comp = Compilation::new([("a.decl", format!("type T {{ {method} }}"))]);
		assert!(comp.diagnostics().is_empty(), "{:#?}", comp.diagnostics());
		let table = comp.symbols();
		let p = table.find_parameter("T", "M", param).unwrap();
		f(p)
	}

	#[test]
	fn simple() {
		with_param("fn M(int x);", "x", |p| {
			assert!(p.is_simple());
			assert!(p.completion().is_fully_complete());
			assert_eq!(p.ordinal(), 0);
			assert_eq!(p.ref_kind(), RefKind::None);
			assert!(!p.is_discard());
			assert!(!p.is_extension_method_this());
			assert!(!p.is_params());
			assert_eq!(p.explicit_default_value(), None);
			assert!(p.ref_custom_modifiers().is_empty());
			assert!(!p.has_optional_attribute());
			assert_eq!(p.marshalling_information(), None);
			assert!(p.syntax_reference().is_none());
			assert!(p.attributes().is_empty());
			assert!(p.diagnostics().is_empty());
		});
	}

	#[test]
	fn lazy_parts() {
		with_param("fn M([MarshalAs(I4)] int x);", "x", |p| {
			assert!(!p.is_simple());
			assert_eq!(
				p.completion().completed_parts(),
				CompletionPart::TYPE,
				"only the type is known up front"
			);

			assert!(!p.is_extension_method_this());
			assert_eq!(p.completion().completed_parts(), CompletionPart::TYPE);

			assert_eq!(
				p.marshalling_information().map(|m| &m.kind),
				Some(&UnmanagedKind::I4)
			);

			// Marshalling reads the attribute bag.
			assert!(p.completion().has_complete(CompletionPart::ATTRIBUTES));
			assert!(p.completion().has_complete(CompletionPart::MARSHALLING));
			assert!(!p.completion().has_complete(CompletionPart::DEFAULT_VALUE));

			p.complete_all();
			assert!(p.completion().is_fully_complete());
		});
	}

	#[test]
	fn defaults() {
		with_param(r#"fn M(string? s = "hi");"#, "s", |p| {
			assert!(p.has_default_argument_syntax());
			assert!(p.is_metadata_optional());
			assert_eq!(
				p.explicit_default_value(),
				Some(&ConstantValue::String("hi".to_string()))
			);
			assert_eq!(p.default_value_from_attributes(), None);
		});

		with_param("fn M([DefaultParameterValue(5)] long n);", "n", |p| {
			assert!(!p.has_default_argument_syntax());
			assert!(!p.is_metadata_optional());
			assert_eq!(p.explicit_default_value(), Some(&ConstantValue::Long(5)));
			assert_eq!(p.default_value_from_attributes(), Some(&ConstantValue::Long(5)));
		});

		with_param("fn M([Optional] int n);", "n", |p| {
			assert!(p.has_optional_attribute());
			assert!(p.is_metadata_optional());
			assert!(!p.has_default_value());
		});
	}

	#[test]
	fn modifiers() {
		with_param("fn M(params int[] rest);", "rest", |p| {
			assert!(p.is_params());
			assert!(p.ref_custom_modifiers().is_empty());
		});

		with_param("fn M([NotNull] in string s);", "s", |p| {
			assert_eq!(p.ref_kind(), RefKind::In);
			assert_eq!(p.ref_custom_modifiers().len(), 1);
			assert!(p.ref_custom_modifiers()[0].required);
			assert_eq!(
				p.flow_analysis_annotations(),
				FlowAnalysisAnnotations::NOT_NULL
			);
		});
	}

	#[test]
	fn caller_info() {
		with_param(
			r#"fn M([CallerLineNumber] [CallerMemberName] int line = 0);"#,
			"line",
			|p| {
				assert!(p.is_caller_line_number());
				// Wrong type, then overridden anyway.
				assert!(!p.is_caller_member_name());

				let codes: Vec<_> = p.diagnostics().iter().map(|d| d.code).collect();
				assert_eq!(codes, [code::CALLER_INFO_TYPE]);
			},
		);

		with_param(
			r#"fn M([CallerFilePath] [CallerMemberName] string? s = null);"#,
			"s",
			|p| {
				assert!(p.is_caller_file_path());
				assert!(!p.is_caller_member_name());

				let diags = p.diagnostics();
				assert_eq!(diags.len(), 1);
				assert_eq!(diags[0].code, code::CALLER_INFO_OVERRIDDEN);
				assert!(!diags[0].is_error());
			},
		);
	}

	#[test]
	fn malformed() {
		let source = r#"type T {
			fn A(int x = "no");
			fn B(ref int x = 1);
			fn C(params int[] x = null);
			fn D(params int x);
			fn E([DefaultParameterValue(1)] int x = 2);
			fn F([CallerFilePath] string x);
		}"#;

		let comp = Compilation::new([("a.decl", source)]);
		let table = comp.symbols();

		let check = |method: &str, expected: &[&str]| {
			let p = table.find_parameter("T", method, "x").unwrap();
			p.complete_all();
			let codes: Vec<_> = p.diagnostics().iter().map(|d| d.code).collect();
			assert_eq!(codes, expected, "method `{method}`");
			assert!(p
				.diagnostics()
				.iter()
				.all(|d| d.source == DiagSource::Symbol(Arc::from(format!("T.{method}(x)")))));
			p
		};

		let a = check("A", &[code::DEFAULT_CONVERSION]);
		assert!(!a.has_default_value());

		let b = check("B", &[code::DEFAULT_ON_BYREF]);
		assert!(!b.has_default_value());

		let c = check("C", &[code::DEFAULT_ON_PARAMS]);
		assert!(c.is_params());

		let d = check("D", &[code::PARAMS_NOT_ARRAY]);
		assert!(!d.is_params());

		let e = check("E", &[code::DEFAULT_TWICE]);
		assert_eq!(e.explicit_default_value(), Some(&ConstantValue::Int(2)));

		let f = check("F", &[code::CALLER_INFO_NO_DEFAULT]);
		assert!(!f.is_caller_file_path());
	}

	#[test]
	fn facts() {
		with_param(r#"fn M([AllowNull] [MaybeNull] string? s = null);"#, "s", |p| {
			let facts = p.facts();
			assert!(p.completion().is_fully_complete());
			assert_eq!(facts.ty, "string?");
			assert_eq!(facts.default_value.as_deref(), Some("null"));
			assert_eq!(facts.flow_annotations, ["ALLOW_NULL", "MAYBE_NULL"]);

			let json = serde_json::to_value(&facts).unwrap();
			assert_eq!(json["type"], "string?");
			assert_eq!(json["refKind"], "None");
			assert_eq!(json["isOptional"], true);
		});
	}
}

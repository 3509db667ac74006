//! Attribute data, constant values, and decoding of well-known attributes.

use std::sync::Arc;

use rowan::{ast::AstNode, TextSize};
use serde::Serialize;

use crate::{
	diag::{code, DiagSource, Diagnostic, Location},
	syntax::{self, ast, Syn, SyntaxToken},
	FxIndexSet,
};

use super::param::{ParamType, SpecialType};

/// A compile-time constant, as written in a default value or attribute argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstantValue {
	Null,
	Bool(bool),
	Int(i32),
	Long(i64),
	Double(f64),
	String(String),
	/// A bare identifier, e.g. the `LPStr` in `[MarshalAs(LPStr)]`.
	Name(String),
}

impl ConstantValue {
	/// Returns `Err` with a message if the literal's text is malformed.
	pub(crate) fn from_token(token: &SyntaxToken) -> Result<Self, String> {
		let text = token.text();

		match token.kind() {
			Syn::KwNull => Ok(Self::Null),
			Syn::KwTrue => Ok(Self::Bool(true)),
			Syn::KwFalse => Ok(Self::Bool(false)),
			Syn::Ident => Ok(Self::Name(text.to_string())),
			Syn::IntLit => match text.parse::<i64>() {
				Ok(i) => Ok(i32::try_from(i).map_or(Self::Long(i), Self::Int)),
				Err(_) => Err(format!("integer literal `{text}` is out of range")),
			},
			Syn::FloatLit => text
				.parse::<f64>()
				.map(Self::Double)
				.map_err(|_| format!("malformed floating-point literal `{text}`")),
			Syn::StringLit => unescape(&text[1..(text.len() - 1)]).map(Self::String),
			other => Err(format!("expected a literal, found {}", other.describe())),
		}
	}

	/// Converts this constant to `ty`, as a default value would be.
	pub(crate) fn convert_to(&self, ty: &ParamType) -> Result<Self, String> {
		let fail = || Err(format!("cannot convert `{self}` to `{ty}`"));

		if ty.is_array {
			return match self {
				Self::Null => Ok(Self::Null),
				_ => fail(),
			};
		}

		match (self, ty.special()) {
			(Self::Null, _) if ty.admits_null() => Ok(Self::Null),
			(Self::Int(i), SpecialType::Int) => Ok(Self::Int(*i)),
			(Self::Int(i), SpecialType::Long) => Ok(Self::Long(i64::from(*i))),
			(Self::Long(l), SpecialType::Long) => Ok(Self::Long(*l)),
			(Self::Int(i), SpecialType::Double) => Ok(Self::Double(f64::from(*i))),
			(Self::Double(d), SpecialType::Double) => Ok(Self::Double(*d)),
			(Self::Bool(b), SpecialType::Bool) => Ok(Self::Bool(*b)),
			(Self::String(s), SpecialType::String | SpecialType::Object) => {
				Ok(Self::String(s.clone()))
			}
			(Self::Int(_) | Self::Long(_) | Self::Double(_) | Self::Bool(_), SpecialType::Object) => {
				Ok(self.clone())
			}
			_ => fail(),
		}
	}
}

impl std::fmt::Display for ConstantValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Null => write!(f, "null"),
			Self::Bool(b) => write!(f, "{b}"),
			Self::Int(i) => write!(f, "{i}"),
			Self::Long(l) => write!(f, "{l}"),
			Self::Double(d) => write!(f, "{d:?}"),
			Self::String(s) => write!(f, "{s:?}"),
			Self::Name(n) => write!(f, "{n}"),
		}
	}
}

fn unescape(inner: &str) -> Result<String, String> {
	let mut ret = String::with_capacity(inner.len());
	let mut chars = inner.chars();

	while let Some(c) = chars.next() {
		if c != '\\' {
			ret.push(c);
			continue;
		}

		match chars.next() {
			Some('n') => ret.push('\n'),
			Some('t') => ret.push('\t'),
			Some('\\') => ret.push('\\'),
			Some('"') => ret.push('"'),
			Some('0') => ret.push('\0'),
			Some(other) => return Err(format!("unknown escape sequence `\\{other}`")),
			None => return Err("string ends with a lone `\\`".to_string()),
		}
	}

	Ok(ret)
}

// Well-known attributes ///////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WellKnownAttribute {
	Optional,
	DefaultParameterValue,
	MarshalAs,
	CallerFilePath,
	CallerLineNumber,
	CallerMemberName,
	AllowNull,
	DisallowNull,
	MaybeNull,
	NotNull,
	NotNullIfNotNull,
	IDispatchConstant,
	IUnknownConstant,
}

impl WellKnownAttribute {
	/// Accepts names with or without an `Attribute` suffix.
	#[must_use]
	pub fn from_name(name: &str) -> Option<Self> {
		let name = name.strip_suffix("Attribute").unwrap_or(name);

		Some(match name {
			"Optional" => Self::Optional,
			"DefaultParameterValue" => Self::DefaultParameterValue,
			"MarshalAs" => Self::MarshalAs,
			"CallerFilePath" => Self::CallerFilePath,
			"CallerLineNumber" => Self::CallerLineNumber,
			"CallerMemberName" => Self::CallerMemberName,
			"AllowNull" => Self::AllowNull,
			"DisallowNull" => Self::DisallowNull,
			"MaybeNull" => Self::MaybeNull,
			"NotNull" => Self::NotNull,
			"NotNullIfNotNull" => Self::NotNullIfNotNull,
			"IDispatchConstant" => Self::IDispatchConstant,
			"IUnknownConstant" => Self::IUnknownConstant,
			_ => return None,
		})
	}

	#[must_use]
	fn arity(self) -> usize {
		match self {
			Self::DefaultParameterValue | Self::MarshalAs | Self::NotNullIfNotNull => 1,
			_ => 0,
		}
	}

	/// `NotNullIfNotNull` may be applied once per referenced parameter.
	#[must_use]
	fn allows_multiple(self) -> bool {
		matches!(self, Self::NotNullIfNotNull)
	}
}

/// What kind of declaration an attribute list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttributeTarget {
	Type,
	Method,
	Parameter,
}

bitflags::bitflags! {
	/// Nullable-analysis annotations on a parameter.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct FlowAnalysisAnnotations: u8 {
		const ALLOW_NULL = 1 << 0;
		const DISALLOW_NULL = 1 << 1;
		const MAYBE_NULL = 1 << 2;
		const NOT_NULL = 1 << 3;
	}
}

bitflags::bitflags! {
	/// Caller-info attributes present on a parameter.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct CallerInfo: u8 {
		const FILE_PATH = 1 << 0;
		const LINE_NUMBER = 1 << 1;
		const MEMBER_NAME = 1 << 2;
	}
}

/// How a parameter is marshalled to unmanaged code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum UnmanagedKind {
	Bool,
	I4,
	I8,
	R8,
	LPStr,
	LPWStr,
	Interface,
	/// Given numerically.
	Raw(i32),
}

impl UnmanagedKind {
	fn decode(value: &ConstantValue) -> Option<Self> {
		Some(match value {
			ConstantValue::Int(i) if *i >= 0 => Self::Raw(*i),
			ConstantValue::Name(n) => match n.as_str() {
				"Bool" => Self::Bool,
				"I4" => Self::I4,
				"I8" => Self::I8,
				"R8" => Self::R8,
				"LPStr" => Self::LPStr,
				"LPWStr" => Self::LPWStr,
				"Interface" => Self::Interface,
				_ => return None,
			},
			_ => return None,
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MarshalInfo {
	pub kind: UnmanagedKind,
}

/// Facts decoded from well-known attributes on a parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct WellKnownParamData {
	pub optional: bool,
	pub default_value: Option<(ConstantValue, Location)>,
	pub marshalling: Option<MarshalInfo>,
	pub caller: CallerInfo,
	pub flow: FlowAnalysisAnnotations,
	pub not_null_if_not_null: Vec<String>,
	pub idispatch_constant: bool,
	pub iunknown_constant: bool,
}

impl WellKnownParamData {
	const EMPTY: Self = Self {
		optional: false,
		default_value: None,
		marshalling: None,
		caller: CallerInfo::empty(),
		flow: FlowAnalysisAnnotations::empty(),
		not_null_if_not_null: Vec::new(),
		idispatch_constant: false,
		iunknown_constant: false,
	};
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeData {
	pub name: String,
	pub args: Vec<ConstantValue>,
	pub location: Location,
	/// `None` for attributes this crate knows nothing about,
	/// or well-known attributes whose arguments were malformed.
	pub well_known: Option<WellKnownAttribute>,
}

/// Every attribute applied to one declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributesBag {
	attrs: Vec<AttributeData>,
	param: WellKnownParamData,
}

static EMPTY_BAG: AttributesBag = AttributesBag {
	attrs: Vec::new(),
	param: WellKnownParamData::EMPTY,
};

impl AttributesBag {
	#[must_use]
	pub fn empty() -> &'static Self {
		&EMPTY_BAG
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.attrs.is_empty()
	}

	#[must_use]
	pub fn attributes(&self) -> &[AttributeData] {
		&self.attrs
	}

	#[must_use]
	pub fn has(&self, attr: WellKnownAttribute) -> bool {
		self.attrs.iter().any(|a| a.well_known == Some(attr))
	}

	/// Always empty unless this bag belongs to a parameter.
	#[must_use]
	pub fn param_data(&self) -> &WellKnownParamData {
		&self.param
	}
}

/// Binds the attribute list of one declaration.
///
/// `offset` rebases the ranges of `attrs`' nodes, which belong to a re-rooted
/// subtree, into file coordinates.
pub(crate) fn bind_attributes(
	attrs: impl Iterator<Item = ast::Attribute>,
	target: AttributeTarget,
	file: &Arc<str>,
	offset: TextSize,
	owner: &Arc<str>,
	diags: &mut Vec<Diagnostic>,
) -> AttributesBag {
	let mut bag = AttributesBag {
		attrs: vec![],
		param: WellKnownParamData::EMPTY,
	};

	let mut seen = FxIndexSet::default();

	for attr in attrs {
		let location = Location {
			file: file.clone(),
			range: syntax::rebase(attr.syntax().text_range(), offset),
		};

		let raise = |diags: &mut Vec<Diagnostic>, diag: Diagnostic| {
			diags.push(
				diag.at(location.clone())
					.from_source(DiagSource::Symbol(owner.clone())),
			);
		};

		// A missing name was already reported by the parser.
		let Some(name) = attr.name().map(|t| t.text().to_string()) else {
			continue;
		};

		let mut args = vec![];
		let mut malformed = attr.has_malformed_args();

		for lit in attr.args() {
			let Some(token) = lit.token() else {
				malformed = true;
				continue;
			};

			match ConstantValue::from_token(&token) {
				Ok(v) => args.push(v),
				Err(msg) => {
					raise(diags, Diagnostic::error(code::BAD_LITERAL, msg));
					malformed = true;
				}
			}
		}

		let mut well_known = WellKnownAttribute::from_name(&name);

		if let Some(wk) = well_known {
			if malformed {
				well_known = None;
			} else if args.len() != wk.arity() {
				raise(
					diags,
					Diagnostic::error(
						code::BAD_ATTRIBUTE_ARGS,
						format!(
							"`{name}` takes {} argument(s), but {} were given",
							wk.arity(),
							args.len()
						),
					),
				);

				well_known = None;
			} else if target != AttributeTarget::Parameter {
				raise(
					diags,
					Diagnostic::warning(
						code::ATTRIBUTE_TARGET,
						format!("`{name}` is only valid on parameters and will be ignored"),
					),
				);

				well_known = None;
			} else if !seen.insert(wk) && !wk.allows_multiple() {
				raise(
					diags,
					Diagnostic::error(
						code::DUPLICATE_ATTRIBUTE,
						format!("duplicate `{name}` attribute"),
					),
				);

				well_known = None;
			}
		}

		if let Some(wk) = well_known {
			if !decode_param_attribute(&mut bag.param, wk, &args, &location) {
				raise(
					diags,
					Diagnostic::error(
						code::BAD_ATTRIBUTE_ARGS,
						format!("invalid argument to `{name}`"),
					),
				);

				well_known = None;
			}
		}

		bag.attrs.push(AttributeData {
			name,
			args,
			location,
			well_known,
		});
	}

	bag
}

/// Returns `false` if the arguments do not make sense for `wk`.
fn decode_param_attribute(
	data: &mut WellKnownParamData,
	wk: WellKnownAttribute,
	args: &[ConstantValue],
	location: &Location,
) -> bool {
	match wk {
		WellKnownAttribute::Optional => data.optional = true,
		WellKnownAttribute::DefaultParameterValue => {
			data.default_value = Some((args[0].clone(), location.clone()));
		}
		WellKnownAttribute::MarshalAs => match UnmanagedKind::decode(&args[0]) {
			Some(kind) => data.marshalling = Some(MarshalInfo { kind }),
			None => return false,
		},
		WellKnownAttribute::CallerFilePath => data.caller |= CallerInfo::FILE_PATH,
		WellKnownAttribute::CallerLineNumber => data.caller |= CallerInfo::LINE_NUMBER,
		WellKnownAttribute::CallerMemberName => data.caller |= CallerInfo::MEMBER_NAME,
		WellKnownAttribute::AllowNull => data.flow |= FlowAnalysisAnnotations::ALLOW_NULL,
		WellKnownAttribute::DisallowNull => data.flow |= FlowAnalysisAnnotations::DISALLOW_NULL,
		WellKnownAttribute::MaybeNull => data.flow |= FlowAnalysisAnnotations::MAYBE_NULL,
		WellKnownAttribute::NotNull => data.flow |= FlowAnalysisAnnotations::NOT_NULL,
		WellKnownAttribute::NotNullIfNotNull => match &args[0] {
			ConstantValue::String(s) => data.not_null_if_not_null.push(s.clone()),
			_ => return false,
		},
		WellKnownAttribute::IDispatchConstant => data.idispatch_constant = true,
		WellKnownAttribute::IUnknownConstant => data.iunknown_constant = true,
	}

	true
}

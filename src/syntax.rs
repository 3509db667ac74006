//! A deliberately small declaration language, parsed into lossless [`rowan`] trees.
//!
//! ```text
//! [Serializable]
//! type Point<T> {
//!     fn Move(int dx, [Optional] int dy, params int[] rest);
//!     fn Scale(ref double factor, string label = "none");
//! }
//! ```
//!
//! Only declarations exist; there are no bodies or expressions beyond literals.

pub mod ast;
mod lex;
mod parse;

use rowan::{TextRange, TextSize};

pub use self::parse::{parse, Parse, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum Syn {
	// Tokens //////////////////////////////////////////////////////////////////
	Whitespace,
	Comment,
	Ident,
	IntLit,
	FloatLit,
	StringLit,
	KwType,
	KwFn,
	KwRef,
	KwOut,
	KwIn,
	KwParams,
	KwTrue,
	KwFalse,
	KwNull,
	LBrace,
	RBrace,
	LParen,
	RParen,
	LBracket,
	RBracket,
	LAngle,
	RAngle,
	Comma,
	Semicolon,
	Eq,
	Question,
	Unknown,
	// Nodes ///////////////////////////////////////////////////////////////////
	Root,
	TypeDecl,
	MethodDecl,
	GenericList,
	ParamList,
	Param,
	Attribute,
	AttrArgs,
	TypeRef,
	DefaultValue,
	Literal,
	Error,
	#[doc(hidden)]
	__Last,
}

impl Syn {
	#[must_use]
	pub fn is_trivia(self) -> bool {
		matches!(self, Self::Whitespace | Self::Comment)
	}

	#[must_use]
	pub fn is_ref_kind_keyword(self) -> bool {
		matches!(self, Self::KwRef | Self::KwOut | Self::KwIn | Self::KwParams)
	}

	/// For parse error messages.
	#[must_use]
	pub fn describe(self) -> &'static str {
		match self {
			Self::Ident => "an identifier",
			Self::IntLit | Self::FloatLit | Self::StringLit => "a literal",
			Self::KwType => "`type`",
			Self::KwFn => "`fn`",
			Self::LBrace => "`{`",
			Self::RBrace => "`}`",
			Self::LParen => "`(`",
			Self::RParen => "`)`",
			Self::LBracket => "`[`",
			Self::RBracket => "`]`",
			Self::LAngle => "`<`",
			Self::RAngle => "`>`",
			Self::Comma => "`,`",
			Self::Semicolon => "`;`",
			Self::Eq => "`=`",
			Self::Question => "`?`",
			_ => "a token",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lang {}

impl rowan::Language for Lang {
	type Kind = Syn;

	fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
		assert!(raw.0 < Syn::__Last as u16);
		// SAFETY: `Syn` is `repr(u16)` and the assertion above
		// keeps `raw` within its discriminant range.
		unsafe { std::mem::transmute::<u16, Syn>(raw.0) }
	}

	fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
		rowan::SyntaxKind(kind as u16)
	}
}

pub type SyntaxNode = rowan::SyntaxNode<Lang>;
pub type SyntaxToken = rowan::SyntaxToken<Lang>;

/// Shifts a range taken from a re-rooted subtree back into file coordinates.
#[must_use]
pub(crate) fn rebase(range: TextRange, offset: TextSize) -> TextRange {
	TextRange::new(range.start() + offset, range.end() + offset)
}

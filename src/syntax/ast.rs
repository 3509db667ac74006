//! Typed wrappers over [`SyntaxNode`]s.

use rowan::ast::AstNode;

use super::{Lang, Syn, SyntaxNode, SyntaxToken};

macro_rules! ast_node {
	($name:ident, $kind:ident) => {
		#[derive(Debug, Clone, PartialEq, Eq, Hash)]
		pub struct $name(SyntaxNode);

		impl AstNode for $name {
			type Language = Lang;

			fn can_cast(kind: Syn) -> bool {
				kind == Syn::$kind
			}

			fn cast(node: SyntaxNode) -> Option<Self> {
				Self::can_cast(node.kind()).then(|| Self(node))
			}

			fn syntax(&self) -> &SyntaxNode {
				&self.0
			}
		}
	};
}

ast_node!(Root, Root);
ast_node!(TypeDecl, TypeDecl);
ast_node!(MethodDecl, MethodDecl);
ast_node!(GenericList, GenericList);
ast_node!(ParamList, ParamList);
ast_node!(Param, Param);
ast_node!(Attribute, Attribute);
ast_node!(TypeRef, TypeRef);
ast_node!(DefaultValue, DefaultValue);
ast_node!(Literal, Literal);

#[must_use]
fn token(node: &SyntaxNode, kind: Syn) -> Option<SyntaxToken> {
	node.children_with_tokens()
		.filter_map(|elem| elem.into_token())
		.find(|t| t.kind() == kind)
}

fn attributes(node: &SyntaxNode) -> impl Iterator<Item = Attribute> {
	node.children().filter_map(Attribute::cast)
}

impl Root {
	pub fn types(&self) -> impl Iterator<Item = TypeDecl> {
		self.0.children().filter_map(TypeDecl::cast)
	}
}

impl TypeDecl {
	pub fn attributes(&self) -> impl Iterator<Item = Attribute> {
		attributes(&self.0)
	}

	#[must_use]
	pub fn name(&self) -> Option<SyntaxToken> {
		token(&self.0, Syn::Ident)
	}

	#[must_use]
	pub fn generics(&self) -> Option<GenericList> {
		self.0.children().find_map(GenericList::cast)
	}

	pub fn methods(&self) -> impl Iterator<Item = MethodDecl> {
		self.0.children().filter_map(MethodDecl::cast)
	}
}

impl MethodDecl {
	pub fn attributes(&self) -> impl Iterator<Item = Attribute> {
		attributes(&self.0)
	}

	#[must_use]
	pub fn name(&self) -> Option<SyntaxToken> {
		token(&self.0, Syn::Ident)
	}

	#[must_use]
	pub fn generics(&self) -> Option<GenericList> {
		self.0.children().find_map(GenericList::cast)
	}

	#[must_use]
	pub fn param_list(&self) -> Option<ParamList> {
		self.0.children().find_map(ParamList::cast)
	}
}

impl GenericList {
	pub fn names(&self) -> impl Iterator<Item = SyntaxToken> {
		self.0
			.children_with_tokens()
			.filter_map(|elem| elem.into_token())
			.filter(|t| t.kind() == Syn::Ident)
	}
}

impl ParamList {
	pub fn params(&self) -> impl Iterator<Item = Param> {
		self.0.children().filter_map(Param::cast)
	}
}

impl Param {
	pub fn attributes(&self) -> impl Iterator<Item = Attribute> {
		attributes(&self.0)
	}

	/// `ref`, `out`, `in`, or `params`.
	#[must_use]
	pub fn modifier(&self) -> Option<SyntaxToken> {
		self.0
			.children_with_tokens()
			.filter_map(|elem| elem.into_token())
			.find(|t| t.kind().is_ref_kind_keyword())
	}

	#[must_use]
	pub fn type_ref(&self) -> Option<TypeRef> {
		self.0.children().find_map(TypeRef::cast)
	}

	#[must_use]
	pub fn name(&self) -> Option<SyntaxToken> {
		token(&self.0, Syn::Ident)
	}

	#[must_use]
	pub fn default_value(&self) -> Option<DefaultValue> {
		self.0.children().find_map(DefaultValue::cast)
	}
}

impl Attribute {
	#[must_use]
	pub fn name(&self) -> Option<SyntaxToken> {
		token(&self.0, Syn::Ident)
	}

	/// Empty if the attribute has no parenthesized argument list.
	pub fn args(&self) -> impl Iterator<Item = Literal> {
		self.0
			.children()
			.filter(|n| n.kind() == Syn::AttrArgs)
			.flat_map(|args| args.children().filter_map(Literal::cast))
	}

	/// Whether the argument list, if any, contains an error.
	#[must_use]
	pub fn has_malformed_args(&self) -> bool {
		self.0
			.children()
			.filter(|n| n.kind() == Syn::AttrArgs)
			.any(|args| args.children().any(|n| n.kind() == Syn::Error))
	}
}

impl TypeRef {
	#[must_use]
	pub fn name(&self) -> Option<SyntaxToken> {
		token(&self.0, Syn::Ident)
	}

	#[must_use]
	pub fn is_array(&self) -> bool {
		token(&self.0, Syn::LBracket).is_some()
	}

	#[must_use]
	pub fn is_nullable(&self) -> bool {
		token(&self.0, Syn::Question).is_some()
	}
}

impl DefaultValue {
	#[must_use]
	pub fn literal(&self) -> Option<Literal> {
		self.0.children().find_map(Literal::cast)
	}
}

impl Literal {
	#[must_use]
	pub fn token(&self) -> Option<SyntaxToken> {
		self.0
			.children_with_tokens()
			.filter_map(|elem| elem.into_token())
			.find(|t| !t.kind().is_trivia())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::syntax::parse;

	#[test]
	fn accessors() {
		let parse = parse(r#"type T<A, B> { [Obsolete] fn M<C>(in int[]? x = null, [MarshalAs(LPStr)] string s); }"#);
		assert!(parse.errors.is_empty(), "{:#?}", parse.errors);

		let root = Root::cast(parse.syntax()).unwrap();
		let ty = root.types().next().unwrap();
		assert_eq!(ty.name().unwrap().text(), "T");
		assert_eq!(ty.generics().unwrap().names().count(), 2);

		let method = ty.methods().next().unwrap();
		assert_eq!(method.name().unwrap().text(), "M");
		assert_eq!(method.attributes().count(), 1);
		assert_eq!(method.generics().unwrap().names().count(), 1);

		let params: Vec<_> = method.param_list().unwrap().params().collect();
		assert_eq!(params.len(), 2);

		let x = &params[0];
		assert_eq!(x.modifier().unwrap().kind(), Syn::KwIn);
		assert_eq!(x.name().unwrap().text(), "x");
		let ty_ref = x.type_ref().unwrap();
		assert!(ty_ref.is_array() && ty_ref.is_nullable());
		assert_eq!(
			x.default_value()
				.unwrap()
				.literal()
				.unwrap()
				.token()
				.unwrap()
				.kind(),
			Syn::KwNull
		);

		let s = &params[1];
		let attr = s.attributes().next().unwrap();
		assert_eq!(attr.name().unwrap().text(), "MarshalAs");
		assert_eq!(attr.args().count(), 1);
		assert!(!attr.has_malformed_args());
		assert_eq!(s.name().unwrap().text(), "s");
	}
}

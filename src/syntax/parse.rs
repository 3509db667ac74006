use rowan::{GreenNode, GreenNodeBuilder, Language, TextRange, TextSize};

use super::{
	lex::{self, Token},
	Lang, Syn, SyntaxNode,
};

/// The result of [`parse`]. The tree is always produced, even on errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
	pub green: GreenNode,
	pub errors: Vec<ParseError>,
}

impl Parse {
	#[must_use]
	pub fn syntax(&self) -> SyntaxNode {
		SyntaxNode::new_root(self.green.clone())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
	pub range: TextRange,
	pub message: String,
}

#[must_use]
pub fn parse(text: &str) -> Parse {
	let mut parser = Parser {
		tokens: lex::lex(text),
		pos: 0,
		offset: TextSize::from(0),
		builder: GreenNodeBuilder::new(),
		errors: vec![],
	};

	parser.root();

	Parse {
		green: parser.builder.finish(),
		errors: parser.errors,
	}
}

struct Parser<'s> {
	tokens: Vec<Token<'s>>,
	pos: usize,
	offset: TextSize,
	builder: GreenNodeBuilder<'static>,
	errors: Vec<ParseError>,
}

// Grammar /////////////////////////////////////////////////////////////////////

impl Parser<'_> {
	fn root(&mut self) {
		self.start(Syn::Root);

		while let Some(kind) = self.peek() {
			match kind {
				Syn::KwType | Syn::LBracket => self.type_decl(),
				_ => self.error_bump("expected a type declaration"),
			}
		}

		self.eat_trivia();
		self.finish();
	}

	fn type_decl(&mut self) {
		self.start(Syn::TypeDecl);
		self.attributes();
		self.expect(Syn::KwType);
		self.expect(Syn::Ident);

		if self.at(Syn::LAngle) {
			self.generic_list();
		}

		if self.expect(Syn::LBrace) {
			loop {
				match self.peek() {
					Some(Syn::RBrace) => {
						self.bump();
						break;
					}
					Some(Syn::KwFn | Syn::LBracket) => self.method_decl(),
					// Likely a missing `}`; let the root pick this up.
					Some(Syn::KwType) | None => {
						self.error("expected `}`");
						break;
					}
					Some(_) => self.error_bump("expected a method declaration or `}`"),
				}
			}
		}

		self.finish();
	}

	fn method_decl(&mut self) {
		self.start(Syn::MethodDecl);
		self.attributes();
		self.expect(Syn::KwFn);
		self.expect(Syn::Ident);

		if self.at(Syn::LAngle) {
			self.generic_list();
		}

		self.param_list();
		self.expect(Syn::Semicolon);
		self.finish();
	}

	fn generic_list(&mut self) {
		self.start(Syn::GenericList);
		self.bump();

		loop {
			self.expect(Syn::Ident);

			if self.at(Syn::Comma) {
				self.bump();
			} else {
				break;
			}
		}

		self.expect(Syn::RAngle);
		self.finish();
	}

	fn param_list(&mut self) {
		self.start(Syn::ParamList);

		if !self.expect(Syn::LParen) {
			self.finish();
			return;
		}

		while !matches!(self.peek(), Some(Syn::RParen) | None) {
			let before = self.pos;
			self.param();

			if self.at(Syn::Comma) {
				self.bump();
			} else if self.pos == before {
				self.error_bump("expected a parameter");
			} else if !self.at(Syn::RParen) {
				break;
			}
		}

		self.expect(Syn::RParen);
		self.finish();
	}

	fn param(&mut self) {
		self.start(Syn::Param);
		self.attributes();

		if self.peek().is_some_and(Syn::is_ref_kind_keyword) {
			self.bump();

			if self.peek().is_some_and(Syn::is_ref_kind_keyword) {
				self.error_bump("a parameter can only have one of `ref`, `out`, `in`, `params`");
			}
		}

		if self.at(Syn::Ident) {
			self.type_ref();
			self.expect(Syn::Ident);

			if self.at(Syn::Eq) {
				self.start(Syn::DefaultValue);
				self.bump();
				self.literal();
				self.finish();
			}
		} else {
			self.error("expected a parameter type");
		}

		self.finish();
	}

	fn type_ref(&mut self) {
		self.start(Syn::TypeRef);
		self.bump();

		if self.at(Syn::LBracket) {
			self.bump();
			self.expect(Syn::RBracket);
		}

		if self.at(Syn::Question) {
			self.bump();
		}

		self.finish();
	}

	fn attributes(&mut self) {
		while self.at(Syn::LBracket) {
			self.start(Syn::Attribute);
			self.bump();
			self.expect(Syn::Ident);

			if self.at(Syn::LParen) {
				self.start(Syn::AttrArgs);
				self.bump();

				while !matches!(self.peek(), Some(Syn::RParen | Syn::RBracket) | None) {
					self.literal();

					if self.at(Syn::Comma) {
						self.bump();
					} else {
						break;
					}
				}

				self.expect(Syn::RParen);
				self.finish();
			}

			self.expect(Syn::RBracket);
			self.finish();
		}
	}

	fn literal(&mut self) {
		match self.peek() {
			Some(
				Syn::IntLit
				| Syn::FloatLit
				| Syn::StringLit
				| Syn::KwTrue
				| Syn::KwFalse
				| Syn::KwNull
				| Syn::Ident,
			) => {
				self.start(Syn::Literal);
				self.bump();
				self.finish();
			}
			Some(Syn::Unknown) => self.error_bump("expected a literal"),
			_ => self.error("expected a literal"),
		}
	}
}

// Machinery ///////////////////////////////////////////////////////////////////

impl Parser<'_> {
	/// The kind of the next non-trivia token, if any.
	#[must_use]
	fn peek(&mut self) -> Option<Syn> {
		self.eat_trivia();
		self.tokens.get(self.pos).map(|t| t.kind)
	}

	#[must_use]
	fn at(&mut self, kind: Syn) -> bool {
		self.peek() == Some(kind)
	}

	fn expect(&mut self, kind: Syn) -> bool {
		if self.at(kind) {
			self.bump();
			true
		} else {
			self.error(&format!("expected {}", kind.describe()));
			false
		}
	}

	fn eat_trivia(&mut self) {
		while self
			.tokens
			.get(self.pos)
			.is_some_and(|t| t.kind.is_trivia())
		{
			self.bump_raw();
		}
	}

	fn bump(&mut self) {
		self.eat_trivia();
		self.bump_raw();
	}

	fn bump_raw(&mut self) {
		let Some(token) = self.tokens.get(self.pos).copied() else {
			return;
		};

		self.builder.token(Lang::kind_to_raw(token.kind), token.text);
		self.offset += TextSize::of(token.text);
		self.pos += 1;
	}

	fn error(&mut self, message: &str) {
		let range = match self.tokens.get(self.pos) {
			Some(t) => TextRange::at(self.offset, TextSize::of(t.text)),
			None => TextRange::empty(self.offset),
		};

		self.errors.push(ParseError {
			range,
			message: message.to_string(),
		});
	}

	/// Wraps the next token in an error node so the parser always makes progress.
	fn error_bump(&mut self, message: &str) {
		self.error(message);
		self.start(Syn::Error);
		self.bump();
		self.finish();
	}

	fn start(&mut self, kind: Syn) {
		self.builder.start_node(Lang::kind_to_raw(kind));
	}

	fn finish(&mut self) {
		self.builder.finish_node();
	}
}

#[cfg(test)]
mod test {
	use indoc::indoc;

	use super::*;

	#[test]
	fn well_formed() {
		const SOURCE: &str = indoc! {r#"
			// A comment.
			[Serializable]
			type Point<T> {
				fn Move(int dx, [Optional] int dy, params int[] rest);
				fn Scale(ref double factor, string? label = "none");
			}
		"#};

		let parse = parse(SOURCE);
		assert!(parse.errors.is_empty(), "{:#?}", parse.errors);

		let root = parse.syntax();
		assert_eq!(root.kind(), Syn::Root);
		assert_eq!(root.text().to_string(), SOURCE);

		let ty = root.children().next().unwrap();
		assert_eq!(ty.kind(), Syn::TypeDecl);

		let methods = ty
			.children()
			.filter(|n| n.kind() == Syn::MethodDecl)
			.count();
		assert_eq!(methods, 2);
	}

	#[test]
	fn recovery() {
		const SOURCE: &str = "type A { fn M(int x int y); $ } type B { fn N(); }";
		let parse = parse(SOURCE);

		assert_eq!(parse.syntax().text().to_string(), SOURCE);
		assert!(!parse.errors.is_empty());

		let types = parse
			.syntax()
			.children()
			.filter(|n| n.kind() == Syn::TypeDecl)
			.count();
		assert_eq!(types, 2);
	}

	#[test]
	fn unclosed() {
		let parse = parse("type A { fn M(");
		assert!(parse.errors.iter().any(|e| e.message == "expected `)`"));
		assert!(parse.errors.iter().any(|e| e.message == "expected `}`"));
	}
}

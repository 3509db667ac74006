use super::Syn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Token<'s> {
	pub(super) kind: Syn,
	pub(super) text: &'s str,
}

#[must_use]
pub(super) fn lex(text: &str) -> Vec<Token<'_>> {
	let mut ret = vec![];
	let mut rest = text;

	while let Some(c) = rest.chars().next() {
		let (kind, len) = next_token(c, rest);
		let (tok, tail) = rest.split_at(len);
		ret.push(Token { kind, text: tok });
		rest = tail;
	}

	ret
}

fn next_token(c: char, rest: &str) -> (Syn, usize) {
	let punct = |kind| (kind, c.len_utf8());

	match c {
		c if c.is_whitespace() => (Syn::Whitespace, take_while(rest, char::is_whitespace)),
		'/' if rest.starts_with("//") => (
			Syn::Comment,
			rest.find('\n').unwrap_or(rest.len()),
		),
		'a'..='z' | 'A'..='Z' | '_' => {
			let len = take_while(rest, |c| c.is_ascii_alphanumeric() || c == '_');
			(keyword(&rest[..len]).unwrap_or(Syn::Ident), len)
		}
		'0'..='9' => number(rest, 0),
		'-' if rest[1..].starts_with(|c: char| c.is_ascii_digit()) => number(rest, 1),
		'"' => string(rest),
		'{' => punct(Syn::LBrace),
		'}' => punct(Syn::RBrace),
		'(' => punct(Syn::LParen),
		')' => punct(Syn::RParen),
		'[' => punct(Syn::LBracket),
		']' => punct(Syn::RBracket),
		'<' => punct(Syn::LAngle),
		'>' => punct(Syn::RAngle),
		',' => punct(Syn::Comma),
		';' => punct(Syn::Semicolon),
		'=' => punct(Syn::Eq),
		'?' => punct(Syn::Question),
		_ => punct(Syn::Unknown),
	}
}

#[must_use]
fn keyword(text: &str) -> Option<Syn> {
	Some(match text {
		"type" => Syn::KwType,
		"fn" => Syn::KwFn,
		"ref" => Syn::KwRef,
		"out" => Syn::KwOut,
		"in" => Syn::KwIn,
		"params" => Syn::KwParams,
		"true" => Syn::KwTrue,
		"false" => Syn::KwFalse,
		"null" => Syn::KwNull,
		_ => return None,
	})
}

/// `start` skips a leading minus sign.
fn number(rest: &str, start: usize) -> (Syn, usize) {
	let int_len = start + take_while(&rest[start..], |c| c.is_ascii_digit());
	let tail = &rest[int_len..];

	if tail.starts_with('.') && tail[1..].starts_with(|c: char| c.is_ascii_digit()) {
		let frac_len = take_while(&tail[1..], |c| c.is_ascii_digit());
		(Syn::FloatLit, int_len + 1 + frac_len)
	} else {
		(Syn::IntLit, int_len)
	}
}

/// An unterminated string becomes [`Syn::Unknown`] up to the end of its line.
fn string(rest: &str) -> (Syn, usize) {
	let mut escaped = false;

	for (i, c) in rest.char_indices().skip(1) {
		match c {
			'\n' => return (Syn::Unknown, i),
			'\\' if !escaped => escaped = true,
			'"' if !escaped => return (Syn::StringLit, i + 1),
			_ => escaped = false,
		}
	}

	(Syn::Unknown, rest.len())
}

fn take_while(text: &str, pred: impl Fn(char) -> bool) -> usize {
	text.find(|c: char| !pred(c)).unwrap_or(text.len())
}

#[cfg(test)]
mod test {
	use super::*;

	fn kinds(text: &str) -> Vec<Syn> {
		lex(text)
			.into_iter()
			.filter(|t| !t.kind.is_trivia())
			.map(|t| t.kind)
			.collect()
	}

	#[test]
	fn smoke() {
		assert_eq!(
			kinds("fn M(ref int x = -3) // trailing"),
			[
				Syn::KwFn,
				Syn::Ident,
				Syn::LParen,
				Syn::KwRef,
				Syn::Ident,
				Syn::Ident,
				Syn::Eq,
				Syn::IntLit,
				Syn::RParen,
			]
		);

		assert_eq!(
			kinds(r#"1.5 "a\"b" "open"#),
			[Syn::FloatLit, Syn::StringLit, Syn::Unknown]
		);
	}

	#[test]
	fn lossless() {
		let text = "type  T { fn M(int x); } // é\n$";
		let joined: String = lex(text).into_iter().map(|t| t.text).collect();
		assert_eq!(joined, text);
	}
}

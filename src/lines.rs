//! Mapping flat text offsets to `(line, column)` pairs for diagnostic output.

use rowan::{TextRange, TextSize};

/// `(line, column)` information in the native, UTF-8 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
	/// Zero-based.
	pub line: u32,
	/// Zero-based UTF-8 offset.
	pub col: u32,
}

impl std::fmt::Display for LineCol {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}:{}", self.line + 1, self.col + 1)
	}
}

/// Maps flat [`TextSize`] offsets to/from `(line, column)` representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
	/// Offset the beginning of each line (except the first, which always has offset 0).
	newlines: Box<[TextSize]>,
	/// The length of the entire text.
	len: TextSize,
}

impl LineIndex {
	#[must_use]
	pub fn new(text: &str) -> Self {
		let newlines = text
			.match_indices('\n')
			.map(|(i, _)| TextSize::from((i + 1) as u32))
			.collect();

		Self {
			newlines,
			len: TextSize::of(text),
		}
	}

	/// Returns `None` if the `offset` extends past the end of the text.
	#[must_use]
	pub fn try_line_col(&self, offset: TextSize) -> Option<LineCol> {
		if offset > self.len {
			return None;
		}

		let line = self.newlines.partition_point(|&it| it <= offset);
		let start = self.start_offset(line)?;

		Some(LineCol {
			line: line as u32,
			col: (offset - start).into(),
		})
	}

	/// Transforms the `LineCol` into a `TextSize`.
	#[must_use]
	pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
		let ret = self.start_offset(line_col.line as usize)? + TextSize::from(line_col.col);
		(ret <= self.len).then_some(ret)
	}

	#[must_use]
	pub fn line_count(&self) -> usize {
		self.newlines.len() + 1
	}

	/// The start and end of the line-column span covering `range`.
	#[must_use]
	pub fn span(&self, range: TextRange) -> Option<(LineCol, LineCol)> {
		Some((
			self.try_line_col(range.start())?,
			self.try_line_col(range.end())?,
		))
	}

	fn start_offset(&self, line: usize) -> Option<TextSize> {
		match line.checked_sub(1) {
			None => Some(TextSize::from(0)),
			Some(it) => self.newlines.get(it).copied(),
		}
	}
}

//! [`CompletionState`]: which of a symbol's lazily-computed facts are known.
//!
//! Completion never blocks on another thread. Two threads asking for the same
//! incomplete fact may both compute it; whichever publishes first wins and the
//! other's result (diagnostics included) is dropped. This requires fact
//! computations to be pure, which [`CompletionState::ensure_complete`] checks.

use std::{fmt::Debug, sync::OnceLock};

use crossbeam::{atomic::AtomicCell, utils::Backoff};
use tracing::trace;

bitflags::bitflags! {
	/// Categories of lazily-computed symbol facts.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct CompletionPart: u32 {
		const ATTRIBUTES = 1 << 0;
		const TYPE = 1 << 1;
		const DEFAULT_VALUE = 1 << 2;
		const MODIFIERS = 1 << 3;
		const FLOW_ANALYSIS = 1 << 4;
		const MARSHALLING = 1 << 5;
		const MEMBERS = 1 << 6;

		const TYPE_SYMBOL = Self::ATTRIBUTES.bits() | Self::MEMBERS.bits();
		const METHOD_SYMBOL = Self::ATTRIBUTES.bits() | Self::TYPE.bits() | Self::MEMBERS.bits();
		const PARAMETER_SYMBOL = Self::ATTRIBUTES.bits()
			| Self::TYPE.bits()
			| Self::DEFAULT_VALUE.bits()
			| Self::MODIFIERS.bits()
			| Self::FLOW_ANALYSIS.bits()
			| Self::MARSHALLING.bits();
	}
}

/// A monotonic set of completed [`CompletionPart`]s, owned by one symbol.
#[derive(Debug)]
pub struct CompletionState {
	done: AtomicCell<u32>,
	/// The parts meaningful to the owning symbol's kind.
	relevant: CompletionPart,
}

impl CompletionState {
	#[must_use]
	pub fn new(relevant: CompletionPart) -> Self {
		Self {
			done: AtomicCell::new(0),
			relevant,
		}
	}

	/// A state with every relevant part already complete.
	#[must_use]
	pub fn completed(relevant: CompletionPart) -> Self {
		Self {
			done: AtomicCell::new(relevant.bits()),
			relevant,
		}
	}

	#[must_use]
	pub fn relevant(&self) -> CompletionPart {
		self.relevant
	}

	#[must_use]
	pub fn completed_parts(&self) -> CompletionPart {
		CompletionPart::from_bits_retain(self.done.load())
	}

	/// Non-blocking.
	#[must_use]
	pub fn has_complete(&self, part: CompletionPart) -> bool {
		self.completed_parts().contains(part)
	}

	#[must_use]
	pub fn incomplete(&self) -> CompletionPart {
		self.relevant - self.completed_parts()
	}

	#[must_use]
	pub fn incomplete_count(&self) -> u32 {
		self.incomplete().bits().count_ones()
	}

	#[must_use]
	pub fn is_fully_complete(&self) -> bool {
		self.incomplete().is_empty()
	}

	/// Returns `true` if this call is the one which completed `part`.
	///
	/// # Panics
	///
	/// If `part` is not relevant to the owning symbol's kind.
	pub fn note_part_complete(&self, part: CompletionPart) -> bool {
		assert!(
			self.relevant.contains(part),
			"completion part {part:?} is not relevant to this symbol (relevant: {:?})",
			self.relevant
		);

		let backoff = Backoff::new();
		let mut current = self.done.load();

		loop {
			let next = current | part.bits();

			if next == current {
				return false;
			}

			match self.done.compare_exchange(current, next) {
				Ok(_) => return true,
				Err(actual) => {
					current = actual;
					backoff.spin();
				}
			}
		}
	}

	/// Returns the fact in `slot`, computing it with `compute` first if needed,
	/// and marks `part` complete.
	///
	/// `compute` runs with no lock held, so it may freely query other facts of
	/// this or any other symbol. If another thread publishes first, this
	/// thread's result is discarded.
	///
	/// # Panics
	///
	/// If a discarded result differs from the published one, since that means
	/// `compute` is not referentially transparent.
	pub fn ensure_complete<'s, T, F>(
		&self,
		part: CompletionPart,
		slot: &'s OnceLock<T>,
		compute: F,
	) -> &'s T
	where
		T: PartialEq + Debug,
		F: FnOnce() -> T,
	{
		if let Some(v) = slot.get() {
			// The publisher may not have noted the part yet.
			self.note_part_complete(part);
			return v;
		}

		let computed = compute();

		if let Err(loser) = slot.set(computed) {
			let winner = match slot.get() {
				Some(w) => w,
				None => unreachable!(),
			};

			assert!(
				loser == *winner,
				"impure computation for {part:?}: published {winner:?}, then computed {loser:?}"
			);

			trace!("Discarding a result for {part:?} which lost a completion race.");
		}

		self.note_part_complete(part);

		match slot.get() {
			Some(v) => v,
			None => unreachable!(),
		}
	}
}

const _STATIC_ASSERT_COMPLETION_LOCKFREE: () = {
	assert!(AtomicCell::<u32>::is_lock_free());
};

#[cfg(test)]
mod test {
	use std::sync::{
		atomic::{AtomicUsize, Ordering},
		Barrier,
	};

	use super::*;

	#[test]
	fn monotonic() {
		let state = CompletionState::new(CompletionPart::PARAMETER_SYMBOL);
		assert_eq!(state.incomplete_count(), 6);
		assert!(!state.has_complete(CompletionPart::ATTRIBUTES));

		assert!(state.note_part_complete(CompletionPart::ATTRIBUTES));
		assert!(!state.note_part_complete(CompletionPart::ATTRIBUTES));
		assert!(state.has_complete(CompletionPart::ATTRIBUTES));
		assert_eq!(state.incomplete_count(), 5);

		state.note_part_complete(CompletionPart::PARAMETER_SYMBOL);
		assert!(state.is_fully_complete());
		assert!(state.has_complete(CompletionPart::ATTRIBUTES));
	}

	#[test]
	fn completed_at_construction() {
		let state = CompletionState::completed(CompletionPart::PARAMETER_SYMBOL);
		assert!(state.is_fully_complete());
		assert!(!state.note_part_complete(CompletionPart::DEFAULT_VALUE));
	}

	#[test]
	#[should_panic]
	fn irrelevant_part() {
		let state = CompletionState::new(CompletionPart::TYPE_SYMBOL);
		state.note_part_complete(CompletionPart::MARSHALLING);
	}

	#[test]
	fn idempotent() {
		let state = CompletionState::new(CompletionPart::PARAMETER_SYMBOL);
		let slot = OnceLock::new();
		let calls = AtomicUsize::new(0);

		let compute = || {
			calls.fetch_add(1, Ordering::SeqCst);
			vec![1, 2, 3]
		};

		let first = state.ensure_complete(CompletionPart::DEFAULT_VALUE, &slot, compute);
		let second = state.ensure_complete(CompletionPart::DEFAULT_VALUE, &slot, compute);

		assert!(std::ptr::eq(first, second));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(state.has_complete(CompletionPart::DEFAULT_VALUE));
	}

	#[test]
	fn race_and_discard() {
		const THREADS: usize = 8;

		let state = CompletionState::new(CompletionPart::PARAMETER_SYMBOL);
		let slot = OnceLock::<(u64, Vec<String>)>::new();
		let calls = AtomicUsize::new(0);
		let barrier = Barrier::new(THREADS);

		let results: Vec<&(u64, Vec<String>)> = std::thread::scope(|s| {
			let handles: Vec<_> = (0..THREADS)
				.map(|_| {
					s.spawn(|| {
						barrier.wait();

						state.ensure_complete(CompletionPart::ATTRIBUTES, &slot, || {
							calls.fetch_add(1, Ordering::SeqCst);
							std::thread::yield_now();
							(42, vec!["one diagnostic".to_string()])
						})
					})
				})
				.collect();

			handles.into_iter().map(|h| h.join().unwrap()).collect()
		});

		// Everyone observed the same published value.
		assert!(results.windows(2).all(|w| std::ptr::eq(w[0], w[1])));
		assert_eq!(slot.get().unwrap().1.len(), 1);
		assert!(calls.load(Ordering::SeqCst) >= 1);
		assert!(state.has_complete(CompletionPart::ATTRIBUTES));
	}

	#[test]
	fn loser_reads_winner() {
		let state = CompletionState::new(CompletionPart::PARAMETER_SYMBOL);
		let slot = OnceLock::new();

		// A competitor publishes while this computation is in flight.
		let ret = state.ensure_complete(CompletionPart::MODIFIERS, &slot, || {
			slot.set(String::from("same")).unwrap();
			String::from("same")
		});

		assert!(std::ptr::eq(ret, slot.get().unwrap()));
		assert!(state.has_complete(CompletionPart::MODIFIERS));
	}

	#[test]
	#[should_panic(expected = "impure computation")]
	fn impure_loser() {
		let state = CompletionState::new(CompletionPart::PARAMETER_SYMBOL);
		let slot = OnceLock::new();

		let _ = state.ensure_complete(CompletionPart::DEFAULT_VALUE, &slot, || {
			slot.set(1).unwrap();
			2
		});
	}
}

//! Logging initialization and user configuration.

use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::{
	fmt::writer::BoxMakeWriter, prelude::__tracing_subscriber_SubscriberExt,
	util::SubscriberInitExt,
};

use crate::Error;

/// Installs a global `tracing` subscriber writing to stderr.
///
/// Calling this more than once is harmless; only the first call has an effect.
pub fn logging() {
	/// Like [`tracing_subscriber::fmt::time::Uptime`] but with
	/// hour/minute/second formatting for better clarity.
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	struct Uptime(std::time::Instant);

	impl Default for Uptime {
		fn default() -> Self {
			Self(std::time::Instant::now())
		}
	}

	impl tracing_subscriber::fmt::time::FormatTime for Uptime {
		fn format_time(
			&self,
			w: &mut tracing_subscriber::fmt::format::Writer<'_>,
		) -> std::fmt::Result {
			let elapsed = self.0.elapsed();
			let secs = elapsed.as_secs() % 60;
			let mins = (elapsed.as_secs() / 60) % 60;
			let hours = elapsed.as_secs() / 3600;
			write!(w, "{hours:02}:{mins:02}:{secs:02}")
		}
	}

	let layer_stderr = tracing_subscriber::fmt::Layer::default()
		.with_timer(Uptime::default())
		.with_ansi(false)
		.with_writer(BoxMakeWriter::new(std::io::stderr));
	let collector = tracing_subscriber::registry().with(layer_stderr);
	let _ = collector.try_init();
}

/// Tunables for the [generator driver](crate::GeneratorDriver).
///
/// Usually read from the `"symgen"` section of a JSON document;
/// see [`Config::from_json`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
	/// How long the driver waits on one generator's `execute` call before
	/// cancelling it and reporting it as failed.
	pub generator_timeout_ms: u64,
	/// If `false`, generators run one after another.
	pub parallel_generators: bool,
	/// Size of the generator thread pool. Zero lets `rayon` decide.
	pub worker_threads: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			generator_timeout_ms: 10_000,
			parallel_generators: true,
			worker_threads: 0,
		}
	}
}

impl Config {
	pub const SECTION: &'static str = "symgen";

	/// Missing fields (or a missing section) take their default values.
	pub fn from_json(text: &str) -> Result<Self, Error> {
		let value = serde_json::from_str::<serde_json::Value>(text)?;

		let Some(obj) = value.as_object() else {
			return Err(Error::Process {
				source: None,
				ctx: "configuration must be a JSON object".to_string(),
			});
		};

		let Some(section) = obj.get(Self::SECTION) else {
			return Ok(Self::default());
		};

		Ok(serde_json::from_value(section.clone())?)
	}

	#[must_use]
	pub fn generator_timeout(&self) -> Duration {
		Duration::from_millis(self.generator_timeout_ms)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn config_sections() {
		let cfg = Config::from_json(r#"{ "symgen": { "generatorTimeoutMs": 250 } }"#).unwrap();
		assert_eq!(cfg.generator_timeout(), Duration::from_millis(250));
		assert!(cfg.parallel_generators);
		assert_eq!(cfg.worker_threads, 0);

		let cfg = Config::from_json(r#"{ "other": 1 }"#).unwrap();
		assert_eq!(cfg, Config::default());

		assert!(Config::from_json("[]").is_err());
		assert!(Config::from_json(r#"{ "symgen": { "workerThreads": "many" } }"#).is_err());
	}
}

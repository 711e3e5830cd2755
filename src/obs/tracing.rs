// crates.io
use tracing::{Instrument, Span, instrument::Instrumented};
// self
use crate::{_prelude::*, obs::Phase};

/// Span wrapper used by every harness phase.
#[derive(Clone, Debug)]
pub struct PhaseSpan {
	span: Span,
}
impl PhaseSpan {
	/// Creates a new span tagged with the provided phase + stage.
	pub fn new(phase: Phase, stage: &'static str) -> Self {
		Self { span: tracing::info_span!("authz_conformance.phase", phase = phase.as_str(), stage) }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

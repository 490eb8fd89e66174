use tracing::{Span, field};

use super::TraceId;

/// Create a root span for one unit of work (an input line, a batch).
pub fn root_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "root",
        name = %name,
        trace_id = %trace_id.as_str(),
        product_id = field::Empty
    )
}

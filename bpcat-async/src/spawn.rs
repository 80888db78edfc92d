/// Spawns a task on a [`crate::TaskPool`] with an optional tracing span.
///
/// ```text
/// bpcat_async::spawn!(pool, "cla_egress", async { ... })
/// bpcat_async::spawn!(pool, "cla_egress", (channel = %name), async { ... })
/// ```
#[macro_export]
macro_rules! spawn {
    ($pool:expr, $name:literal, async $($rest:tt)*) => {{
        let task = async $($rest)*;
        let span = tracing::trace_span!(parent: None, $name);
        span.follows_from(tracing::Span::current());
        $pool.spawn(tracing::Instrument::instrument(task, span))
    }};

    ($pool:expr, $name:literal, ($($field:tt)*), async $($rest:tt)*) => {{
        let task = async $($rest)*;
        let span = tracing::trace_span!(parent: None, $name, $($field)*);
        span.follows_from(tracing::Span::current());
        $pool.spawn(tracing::Instrument::instrument(task, span))
    }};
}

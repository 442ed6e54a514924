//! Span helpers for provider calls.

/// Create a span for one adapter operation
#[macro_export]
macro_rules! invocation_span {
    ($provider:expr, $model:expr, $operation:expr) => {
        tracing::info_span!(
            "model_invocation",
            provider = %$provider,
            model = %$model,
            operation = $operation
        )
    };
}

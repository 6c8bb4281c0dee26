use act_zero::ActorError;
use std::fmt;
use tracing::error;
use tracing_error::SpanTrace;

/// Error returned from provider actor methods.
///
/// Non-fatal errors are reported to the caller and the actor keeps serving; fatal errors stop
/// the actor, after which every call on its address fails.
#[derive(Debug, thiserror::Error)]
pub struct Error {
    source: ErrorKind,
    span_trace: SpanTrace,
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error(transparent)]
    Fatal(anyhow::Error),
    #[error(transparent)]
    NonFatal(#[from] anyhow::Error),
}

impl Error {
    pub fn fatal(source: anyhow::Error) -> Self {
        Self {
            source: ErrorKind::Fatal(source),
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(&self.source, ErrorKind::Fatal(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.source, fmt)
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(source: E) -> Self {
        Self {
            source: ErrorKind::from(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

/// Logs an actor method failure and decides whether the actor has to stop.
pub fn handle_error(error: ActorError) -> bool {
    let (error, stop_actor, span_trace) = match error.downcast_ref::<Error>() {
        Some(e) => (format!("{:?}", e.source), e.is_fatal(), Some(&e.span_trace)),
        None => (format!("{:?}", error), false, None),
    };

    error!(
        %stop_actor,
        "ActorError: {} SpanTrace: {}",
        error,
        span_trace
            .map(|st| format!("{}", st))
            .unwrap_or_else(|| String::from("None"))
    );

    stop_actor
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_non_fatal_errors_keep_the_actor_alive() {
        let error: ActorError = Box::new(Error::from(anyhow!("connection refused")));

        assert!(!handle_error(error));
    }

    #[test]
    fn test_fatal_errors_stop_the_actor() {
        let error: ActorError = Box::new(Error::fatal(anyhow!("missing directory")));

        assert!(handle_error(error));
    }

    #[test]
    fn test_foreign_errors_are_non_fatal() {
        let error: ActorError = "plain error".into();

        assert!(!handle_error(error));
    }
}

use std::fmt;
use thiserror::Error;


/// Ошибки конфигурации пула. Возвращаются до того, как пул принял хоть одну задачу.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigurationError {
    #[error("concurrency must be a positive integer, but got {0}")]
    NonPositiveConcurrency(i64),

    #[error("concurrency {0} does not fit into usize")]
    ConcurrencyOverflow(i64),

    #[error("{channel} capacity must be at least 1")]
    ZeroCapacity { channel: &'static str },

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("failed to spawn dispatcher thread: {0}")]
    ThreadSpawn(String),
}

impl From<std::convert::Infallible> for ConfigurationError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Значение не реализует Job и не может быть передано следующей стадии.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("failed to cast {from} to a job of type {to}")]
pub struct InvalidJobConversion {
    pub from: &'static str,
    pub to: &'static str,
}

impl InvalidJobConversion {
    pub fn new<F: ?Sized, T: ?Sized>() -> Self {
        Self {
            from: std::any::type_name::<F>(),
            to: std::any::type_name::<T>(),
        }
    }
}

/// Паника внутри `Job::execute`, перехваченная воркером.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("job panicked in worker {worker} of pool `{pool}`: {message}")]
pub struct ExecutionFault {
    pub pool: String,
    pub worker: usize,
    pub message: String,
}

/// Пул больше не принимает задачи. Задача возвращается вызывающему.
pub struct SubmitError<J>(pub J);

impl<J> SubmitError<J> {
    pub fn into_inner(self) -> J {
        self.0
    }
}

impl<J> fmt::Debug for SubmitError<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitError").finish_non_exhaustive()
    }
}

impl<J> fmt::Display for SubmitError<J> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("submission channel is closed")
    }
}

impl<J> std::error::Error for SubmitError<J> {}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidJobConversion(#[from] InvalidJobConversion),

    #[error("downstream pool stopped accepting jobs")]
    DownstreamClosed,

    #[error("connector task failed: {0}")]
    Join(String),
}

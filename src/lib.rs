//! Эластичный пул воркеров и конвейеры из таких пулов
//!
//! # Features
//! - Ленивый рост числа воркеров до заданной границы
//! - Закрытие потока результатов только после завершения всех воркеров
//! - Перехват паник задач с типизированной ошибкой в потоке результатов
//! - Соединение пулов в конвейер через `connect`
//! - Метрики и мониторинг

pub mod errors;
pub mod handle;
pub mod job;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod result;
mod worker;

pub use errors::{ConfigurationError, ExecutionFault, InvalidJobConversion, PipelineError, SubmitError};
pub use handle::{ResultStream, Submitter};
pub use job::{as_job, boxed, job_fn, AsJob, BoxedJob, DynJob, ExecutionResult, Job};
pub use pipeline::{connect, ConnectHandle};
pub use pool::{create_pool, ConcurrencyBound, Config, Pool, PoolObserver};
pub use result::JobResult;

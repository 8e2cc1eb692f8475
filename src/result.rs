use super::errors::ExecutionFault;

/// Элемент потока результатов: результат задачи либо перехваченная паника.
pub type JobResult<T> = Result<T, ExecutionFault>;

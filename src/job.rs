//! Контракт задачи и преобразование значений в задачи
//!
//! Пул ничего не знает о содержимом задачи: ему нужен только `execute`.
//! Для стадий, которые не знают тип задач заранее, есть динамический вариант
//! [`BoxedJob`], результатом которого является непрозрачный [`ExecutionResult`].

use super::errors::InvalidJobConversion;
use std::any::Any;


/// Всё, что умеет выполниться и вернуть результат.
pub trait Job: Send + 'static {
    type Output: Send + 'static;

    fn execute(self) -> Self::Output;
}

/// Задача из замыкания, см. [`job_fn`].
pub struct FnJob<F>(F);

#[inline]
pub fn job_fn<F, R>(f: F) -> FnJob<F>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    FnJob(f)
}

impl<F, R> Job for FnJob<F>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    type Output = R;

    #[inline(always)]
    fn execute(self) -> R {
        (self.0)()
    }
}


/// Непрозрачный результат динамической задачи.
pub type ExecutionResult = Box<dyn Any + Send>;

/// Object-safe форма [`Job`]. Реализована для любой задачи с `'static` результатом.
pub trait DynJob: Send + 'static {
    fn execute_boxed(self: Box<Self>) -> ExecutionResult;
}

impl<J> DynJob for J
where
    J: Job,
    J::Output: Any,
{
    fn execute_boxed(self: Box<Self>) -> ExecutionResult {
        Box::new((*self).execute())
    }
}

pub type BoxedJob = Box<dyn DynJob>;

impl Job for BoxedJob {
    type Output = ExecutionResult;

    fn execute(self) -> ExecutionResult {
        <dyn DynJob as DynJob>::execute_boxed(self)
    }
}

#[inline]
pub fn boxed<J>(job: J) -> BoxedJob
where
    J: Job,
    J::Output: Any,
{
    Box::new(job)
}


/// Попытка интерпретировать значение как задачу типа `J`.
///
/// Любая задача тривиально является сама собой. [`ExecutionResult`] становится
/// [`BoxedJob`] только если внутри лежит `BoxedJob`. Для своих типов реализуйте
/// трейт вручную.
pub trait AsJob<J: Job>: Sized {
    fn as_job(self) -> Result<J, InvalidJobConversion>;
}

impl<J: Job> AsJob<J> for J {
    #[inline(always)]
    fn as_job(self) -> Result<J, InvalidJobConversion> {
        Ok(self)
    }
}

impl AsJob<BoxedJob> for ExecutionResult {
    fn as_job(self) -> Result<BoxedJob, InvalidJobConversion> {
        self.downcast::<BoxedJob>()
            .map(|job| *job)
            .map_err(|_| InvalidJobConversion::new::<ExecutionResult, BoxedJob>())
    }
}

#[inline]
pub fn as_job<J, V>(value: V) -> Result<J, InvalidJobConversion>
where
    J: Job,
    V: AsJob<J>,
{
    value.as_job()
}

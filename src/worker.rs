use super::{
    errors::ExecutionFault,
    job::Job,
    model::WorkerExit,
    pool::PoolObserver,
    result::JobResult,
};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use crossbeam::channel::{Receiver, Sender};
use tokio::sync::mpsc;


/// Воркер пула. Живёт до закрытия внутренней очереди диспетчера.
pub(crate) struct Worker<J: Job> {
    id: usize,
    pool: Arc<str>,
    queue: Receiver<J>,
    results: mpsc::Sender<JobResult<J::Output>>,
    done: Sender<WorkerExit>,
    observer: PoolObserver,
}

impl<J: Job> Worker<J> {

    pub(crate) fn new(
        id: usize,
        pool: Arc<str>,
        queue: Receiver<J>,
        results: mpsc::Sender<JobResult<J::Output>>,
        done: Sender<WorkerExit>,
        observer: PoolObserver,
    ) -> Self {
        Self {
            id,
            pool,
            queue,
            results,
            done,
            observer,
        }
    }

    /// Забирает задачи, пока очередь не закрыта и не пуста. Сигнал завершения
    /// отправляется ровно один раз, после того как отпущен sender результатов.
    pub(crate) fn run(self) {
        let Self { id, pool, queue, results, done, observer } = self;
        tracing::trace!(pool = %pool, worker = id, "worker started");

        let mut executed = 0;
        let mut consumer_gone = false;

        while let Ok(job) = queue.recv() {
            observer.worker_busy();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.execute()));
            observer.worker_idle();
            executed += 1;

            let result = match outcome {
                Ok(output) => {
                    observer.job_completed();
                    Ok(output)
                }
                Err(payload) => {
                    observer.job_failed();
                    let fault = ExecutionFault {
                        pool: pool.to_string(),
                        worker: id,
                        message: panic_message(&*payload),
                    };
                    tracing::error!(pool = %pool, worker = id, error = %fault, "job panicked");
                    Err(fault)
                }
            };

            // Блокирующая публикация: без читателя воркер стоит, а за ним и диспетчер
            if !consumer_gone && results.blocking_send(result).is_err() {
                tracing::warn!(pool = %pool, worker = id, "result stream dropped, discarding results");
                consumer_gone = true;
            }
        }

        drop(results);
        tracing::trace!(pool = %pool, worker = id, executed, "worker stopped");

        if done.send(WorkerExit { worker: id, executed }).is_err() {
            tracing::error!(pool = %pool, worker = id, "failed to signal completion");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

use super::{
    errors::SubmitError,
    job::Job,
    pool::PoolObserver,
    result::JobResult,
};
use std::{
    pin::Pin,
    task::{Context, Poll},
};
use futures::Stream;
use tokio::sync::mpsc;


/// Входной конец пула. Закрытие (drop последнего клона) означает "задач больше не будет".
pub struct Submitter<J> {
    sender: mpsc::Sender<J>,
    observer: PoolObserver,
}

impl<J> Clone for Submitter<J> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            observer: self.observer.clone(),
        }
    }
}

impl<J: Job> Submitter<J> {

    pub(crate) fn new(sender: mpsc::Sender<J>, observer: PoolObserver) -> Self {
        Self {
            sender,
            observer,
        }
    }

    /// Отправить задачу. Ждёт, пока диспетчер заберёт её из канала.
    pub async fn submit(&self, job: J) -> Result<(), SubmitError<J>> {
        self.observer.job_submitted();
        self.sender.send(job).await.map_err(|err| {
            self.observer.submit_rejected();
            SubmitError(err.0)
        })
    }

    /// Блокирующий вариант `submit` для синхронного кода вне async контекста
    pub fn blocking_submit(&self, job: J) -> Result<(), SubmitError<J>> {
        self.observer.job_submitted();
        self.sender.blocking_send(job).map_err(|err| {
            self.observer.submit_rejected();
            SubmitError(err.0)
        })
    }

    /// Отправить все задачи по порядку, вернуть их количество
    pub async fn submit_all<I>(&self, jobs: I) -> Result<usize, SubmitError<J>>
    where
        I: IntoIterator<Item = J>,
    {
        let mut sent = 0;
        for job in jobs {
            self.submit(job).await?;
            sent += 1;
        }
        Ok(sent)
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Отпускает только этот клон. Поток задач закрывается, когда отпущены
    /// все клоны `Submitter`.
    #[inline]
    pub fn close(self) {
        drop(self);
    }

    #[inline]
    pub fn observer(&self) -> PoolObserver {
        self.observer.clone()
    }
}


/// Выходной конец пула. Закрывается сам, когда пул полностью завершился.
pub struct ResultStream<T> {
    receiver: mpsc::Receiver<JobResult<T>>,
    observer: PoolObserver,
}

impl<T> ResultStream<T> {

    pub(crate) fn new(receiver: mpsc::Receiver<JobResult<T>>, observer: PoolObserver) -> Self {
        Self {
            receiver,
            observer,
        }
    }

    #[inline(always)]
    pub async fn recv(&mut self) -> Option<JobResult<T>> {
        self.receiver.recv().await
    }

    #[inline]
    pub fn blocking_recv(&mut self) -> Option<JobResult<T>> {
        self.receiver.blocking_recv()
    }

    /// Вычитать поток до закрытия
    pub async fn drain(mut self) -> Vec<JobResult<T>> {
        let mut results = Vec::new();
        while let Some(result) = self.receiver.recv().await {
            results.push(result);
        }
        results
    }

    #[inline]
    pub fn observer(&self) -> PoolObserver {
        self.observer.clone()
    }
}

impl<T> Stream for ResultStream<T> {
    type Item = JobResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

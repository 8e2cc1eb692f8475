//! Соединение стадий: результаты одного пула становятся задачами следующего
//!
//! `stage1 -> connect -> stage2 -> connect -> ... -> stageN`

use super::{
    errors::{ConfigurationError, PipelineError},
    handle::{ResultStream, Submitter},
    job::{AsJob, Job},
    model::ConnectSummary,
    pool::{Config, Pool},
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};


/// Handle на задачу коннектора
pub struct ConnectHandle {
    inner: tokio::task::JoinHandle<Result<ConnectSummary, PipelineError>>,
}

impl ConnectHandle {
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl Future for ConnectHandle {
    type Output = Result<ConnectSummary, PipelineError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll(cx) {
            Poll::Ready(Ok(res)) => Poll::Ready(res),
            Poll::Ready(Err(join_err)) => Poll::Ready(Err(PipelineError::Join(join_err.to_string()))),
            Poll::Pending => Poll::Pending,
        }
    }
}


/// Запускает задачу, которая переливает результаты `upstream` в `downstream`.
///
/// Каждый успешный результат преобразуется через [`AsJob`]. Когда `upstream`
/// закрывается, `downstream` тоже закрывается. Ошибка преобразования
/// останавливает коннектор, и следующая стадия больше ничего не получает.
/// Перехваченные паники предыдущей стадии пропускаются и считаются.
///
/// Вызывать внутри tokio runtime.
pub fn connect<R, J>(mut upstream: ResultStream<R>, downstream: Submitter<J>) -> ConnectHandle
where
    R: AsJob<J> + Send + 'static,
    J: Job,
{
    let inner = tokio::spawn(async move {
        let mut summary = ConnectSummary::default();

        while let Some(result) = upstream.recv().await {
            let value = match result {
                Ok(value) => value,
                Err(fault) => {
                    tracing::warn!(error = %fault, "skipping faulted result");
                    summary.faults_skipped += 1;
                    continue;
                }
            };

            let job = match value.as_job() {
                Ok(job) => job,
                Err(err) => {
                    tracing::error!(error = %err, forwarded = summary.forwarded, "connector aborted");
                    return Err(PipelineError::from(err));
                }
            };

            if downstream.submit(job).await.is_err() {
                tracing::error!(forwarded = summary.forwarded, "downstream closed, connector aborted");
                return Err(PipelineError::DownstreamClosed);
            }
            summary.forwarded += 1;
        }

        drop(downstream);
        tracing::debug!(
            forwarded = summary.forwarded,
            faults_skipped = summary.faults_skipped,
            "upstream closed, downstream closed"
        );
        Ok(summary)
    });

    ConnectHandle { inner }
}

impl<R: Send + 'static> ResultStream<R> {
    /// Создать следующую стадию и подключить к ней этот поток
    pub fn pipe_into<J>(
        self,
        config: Config,
    ) -> Result<(ConnectHandle, ResultStream<J::Output>), ConfigurationError>
    where
        R: AsJob<J>,
        J: Job,
    {
        let (submitter, results) = Pool::<J>::with_config(config)?.split();
        Ok((connect(self, submitter), results))
    }
}

use super::{
    errors::{ConfigurationError, ExecutionFault},
    handle::{
        ResultStream,
        Submitter,
    },
    job::Job,
    model::{
        PoolMetrics,
        WorkerExit,
    },
    result::JobResult,
    worker::Worker,
};
use std::{
    io,
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use tokio::{
    sync::mpsc,
    time::Duration,
};
use tokio_util::sync::CancellationToken;


pub const ENV_CONCURRENCY: &str = "ELASTIC_POOL_CONCURRENCY";
pub const ENV_SUBMISSION_CAPACITY: &str = "ELASTIC_POOL_SUBMISSION_CAPACITY";
pub const ENV_RESULT_CAPACITY: &str = "ELASTIC_POOL_RESULT_CAPACITY";
pub const ENV_NAME: &str = "ELASTIC_POOL_NAME";


/// Верхняя граница числа воркеров одного пула. Всегда >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConcurrencyBound(NonZeroUsize);

impl ConcurrencyBound {
    pub fn new(concurrency: usize) -> Result<Self, ConfigurationError> {
        NonZeroUsize::new(concurrency)
            .map(Self)
            .ok_or(ConfigurationError::NonPositiveConcurrency(0))
    }

    pub fn cpus() -> Self {
        Self(NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN))
    }

    #[inline(always)]
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl TryFrom<usize> for ConcurrencyBound {
    type Error = ConfigurationError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for ConcurrencyBound {
    type Error = ConfigurationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(ConfigurationError::NonPositiveConcurrency(value));
        }
        let value = usize::try_from(value)
            .map_err(|_| ConfigurationError::ConcurrencyOverflow(value))?;
        Self::new(value)
    }
}

impl TryFrom<i32> for ConcurrencyBound {
    type Error = ConfigurationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}


/// Конфигурация пула
#[derive(Debug, Clone)]
pub struct Config {
    pub name: String,
    pub concurrency: usize,
    pub submission_capacity: usize,
    pub result_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "pool".to_string(),
            concurrency: ConcurrencyBound::cpus().get(),
            submission_capacity: 1,
            result_capacity: 1,
        }
    }
}

impl Config {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Default::default()
        }
    }

    pub fn cpu_bound() -> Self {
        Self::default()
    }

    pub fn io_bound() -> Self {
        Self {
            concurrency: ConcurrencyBound::cpus().get() * 2, // задачи в основном ждут
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn validate(&self) -> Result<ConcurrencyBound, ConfigurationError> {
        if self.submission_capacity == 0 {
            return Err(ConfigurationError::ZeroCapacity { channel: "submission" });
        }
        if self.result_capacity == 0 {
            return Err(ConfigurationError::ZeroCapacity { channel: "result" });
        }
        ConcurrencyBound::new(self.concurrency)
    }

    /// Значения по умолчанию, перекрытые переменными окружения `ELASTIC_POOL_*`
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let mut config = Self::default();

        if let Some(raw) = env_value(ENV_CONCURRENCY) {
            let parsed = raw.parse::<i64>().map_err(|_| ConfigurationError::InvalidEnv {
                key: ENV_CONCURRENCY,
                value: raw.clone(),
            })?;
            config.concurrency = ConcurrencyBound::try_from(parsed)?.get();
        }
        if let Some(capacity) = env_capacity(ENV_SUBMISSION_CAPACITY)? {
            config.submission_capacity = capacity;
        }
        if let Some(capacity) = env_capacity(ENV_RESULT_CAPACITY)? {
            config.result_capacity = capacity;
        }
        if let Some(name) = env_value(ENV_NAME) {
            config.name = name;
        }

        config.validate()?;
        Ok(config)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn env_capacity(key: &'static str) -> Result<Option<usize>, ConfigurationError> {
    match env_value(key) {
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigurationError::InvalidEnv { key, value: raw }),
        None => Ok(None),
    }
}


struct PoolStats {
    concurrency: usize,
    spawned_workers: AtomicUsize,
    busy_workers: AtomicUsize,
    submitted_jobs: AtomicUsize,
    completed_jobs: AtomicUsize,
    failed_jobs: AtomicUsize,
}

/// Счётчики пула только для наблюдения. Диспетчер на них не опирается.
#[derive(Clone)]
pub struct PoolObserver {
    stats: Arc<PoolStats>,
}

impl PoolObserver {
    fn new(concurrency: usize) -> Self {
        Self {
            stats: Arc::new(PoolStats {
                concurrency,
                spawned_workers: AtomicUsize::new(0),
                busy_workers: AtomicUsize::new(0),
                submitted_jobs: AtomicUsize::new(0),
                completed_jobs: AtomicUsize::new(0),
                failed_jobs: AtomicUsize::new(0),
            }),
        }
    }

    #[inline(always)]
    pub(crate) fn job_submitted(&self) {
        self.stats.submitted_jobs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn submit_rejected(&self) {
        self.stats.submitted_jobs.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline(always)]
    fn worker_spawned(&self) {
        self.stats.spawned_workers.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn worker_busy(&self) {
        self.stats.busy_workers.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn worker_idle(&self) {
        self.stats.busy_workers.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn job_completed(&self) {
        self.stats.completed_jobs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub(crate) fn job_failed(&self) {
        self.stats.failed_jobs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            concurrency: self.stats.concurrency,
            spawned_workers: self.stats.spawned_workers.load(Ordering::Relaxed),
            busy_workers: self.stats.busy_workers.load(Ordering::Relaxed),
            submitted_jobs: self.stats.submitted_jobs.load(Ordering::Relaxed),
            completed_jobs: self.stats.completed_jobs.load(Ordering::Relaxed),
            failed_jobs: self.stats.failed_jobs.load(Ordering::Relaxed),
        }
    }

    /// Мониторинг метрик с callback
    /// ВАЖНО: вызовите token.cancel() для остановки мониторинга
    pub fn start_monitoring<F>(&self, interval: Duration, callback: F) -> CancellationToken
    where
        F: Fn(PoolMetrics) + Send + 'static,
    {
        let observer = self.clone();
        let token = CancellationToken::new();
        let token_clone = token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        callback(observer.metrics());
                    }
                    _ = token_clone.cancelled() => {
                        break;
                    }
                }
            }
        });

        token
    }

    pub fn stop_monitoring(token: CancellationToken) {
        token.cancel();
    }
}


/// Пул с ленивым ростом числа воркеров до `concurrency`
pub struct Pool<J: Job> {
    submitter: Submitter<J>,
    results: ResultStream<J::Output>,
}

impl<J: Job> Pool<J> {
    pub fn new<C>(concurrency: C) -> Result<Self, ConfigurationError>
    where
        C: TryInto<ConcurrencyBound>,
        ConfigurationError: From<C::Error>,
    {
        let bound: ConcurrencyBound = concurrency.try_into()?;
        Self::with_config(Config::new(bound.get()))
    }

    /// Создаёт пул и запускает диспетчер в отдельном потоке.
    /// Ни одного воркера до первой задачи.
    pub fn with_config(config: Config) -> Result<Self, ConfigurationError> {
        let bound = config.validate()?;

        let (submit_tx, submit_rx) = mpsc::channel::<J>(config.submission_capacity);
        let (result_tx, result_rx) = mpsc::channel::<JobResult<J::Output>>(config.result_capacity);
        let observer = PoolObserver::new(bound.get());

        let dispatcher = Dispatcher {
            name: Arc::from(config.name.as_str()),
            bound,
            submissions: submit_rx,
            results: result_tx,
            observer: observer.clone(),
        };

        thread::Builder::new()
            .name(format!("{}-dispatcher", config.name))
            .spawn(move || dispatcher.run())
            .map_err(|err| ConfigurationError::ThreadSpawn(err.to_string()))?;
        tracing::info!(pool = %config.name, concurrency = bound.get(), "pool created");

        Ok(Self {
            submitter: Submitter::new(submit_tx, observer.clone()),
            results: ResultStream::new(result_rx, observer),
        })
    }

    #[inline]
    pub fn split(self) -> (Submitter<J>, ResultStream<J::Output>) {
        (self.submitter, self.results)
    }

    #[inline]
    pub fn submitter(&self) -> Submitter<J> {
        self.submitter.clone()
    }

    #[inline]
    pub fn observer(&self) -> PoolObserver {
        self.submitter.observer()
    }
}

/// Создать пул и сразу разделить его на вход и выход
pub fn create_pool<J, C>(
    concurrency: C,
) -> Result<(Submitter<J>, ResultStream<J::Output>), ConfigurationError>
where
    J: Job,
    C: TryInto<ConcurrencyBound>,
    ConfigurationError: From<C::Error>,
{
    Pool::new(concurrency).map(Pool::split)
}


struct Dispatcher<J: Job> {
    name: Arc<str>,
    bound: ConcurrencyBound,
    submissions: mpsc::Receiver<J>,
    results: mpsc::Sender<JobResult<J::Output>>,
    observer: PoolObserver,
}

impl<J: Job> Dispatcher<J> {

    fn run(mut self) {
        // Нулевая ёмкость: try_send проходит только если воркер уже ждёт в recv
        let (queue_tx, queue_rx) = channel::bounded::<J>(0);
        let (done_tx, done_rx) = channel::unbounded::<WorkerExit>();
        let mut spawned = 0;

        while let Some(job) = self.submissions.blocking_recv() {
            let job = match queue_tx.try_send(job) {
                Ok(()) => continue,
                Err(TrySendError::Full(job)) | Err(TrySendError::Disconnected(job)) => job,
            };

            if spawned < self.bound.get() {
                match self.spawn_worker(spawned, &queue_rx, &done_tx) {
                    Ok(()) => spawned += 1,
                    Err(err) if spawned == 0 => {
                        // Отдать задачу некому: отвечаем ошибкой вместо вечного ожидания
                        tracing::error!(pool = %self.name, error = %err, "no worker thread available");
                        self.reject(job, err.to_string());
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(pool = %self.name, spawned, error = %err, "worker spawn failed, reusing existing workers");
                    }
                }
            }

            // queue_rx живёт здесь же, поэтому канал не может быть отключён
            if queue_tx.send(job).is_err() {
                break;
            }
        }

        tracing::debug!(pool = %self.name, spawned, "submissions closed, draining workers");
        drop(queue_tx);
        drop(queue_rx);
        drop(done_tx);

        let mut executed = 0;
        for _ in 0..spawned {
            match done_rx.recv() {
                Ok(exit) => {
                    tracing::trace!(pool = %self.name, worker = exit.worker, executed = exit.executed, "worker finished");
                    executed += exit.executed;
                }
                Err(_) => {
                    tracing::warn!(pool = %self.name, "worker exited without completion signal");
                    break;
                }
            }
        }

        tracing::info!(pool = %self.name, workers = spawned, executed, "pool finished");
        drop(self.results);
    }

    fn spawn_worker(
        &self,
        id: usize,
        queue: &Receiver<J>,
        done: &Sender<WorkerExit>,
    ) -> io::Result<()> {
        let worker = Worker::new(
            id,
            self.name.clone(),
            queue.clone(),
            self.results.clone(),
            done.clone(),
            self.observer.clone(),
        );
        thread::Builder::new()
            .name(format!("{}-worker-{}", self.name, id))
            .spawn(move || worker.run())?;
        self.observer.worker_spawned();
        tracing::debug!(pool = %self.name, worker = id, bound = self.bound.get(), "worker spawned");
        Ok(())
    }

    fn reject(&self, job: J, reason: String) {
        drop(job);
        self.observer.job_failed();
        let fault = ExecutionFault {
            pool: self.name.to_string(),
            worker: 0,
            message: format!("failed to spawn worker thread: {}", reason),
        };
        let _ = self.results.blocking_send(Err(fault));
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_rejects_non_positive() {
        assert_eq!(
            ConcurrencyBound::try_from(0_i64),
            Err(ConfigurationError::NonPositiveConcurrency(0))
        );
        assert_eq!(
            ConcurrencyBound::try_from(-1),
            Err(ConfigurationError::NonPositiveConcurrency(-1))
        );
        assert_eq!(ConcurrencyBound::try_from(3_usize).map(ConcurrencyBound::get), Ok(3));
    }

    #[test]
    fn config_rejects_zero_capacity() {
        let config = Config {
            result_capacity: 0,
            ..Config::new(2)
        };
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::ZeroCapacity { channel: "result" })
        );
    }

    #[test]
    fn presets_are_valid() {
        assert!(Config::cpu_bound().validate().is_ok());
        assert!(Config::io_bound().concurrency >= Config::cpu_bound().concurrency);
    }

    fn seven() -> u8 {
        7
    }

    #[test]
    fn works_without_runtime() {
        let (jobs, mut results) = create_pool::<crate::job::FnJob<fn() -> u8>, _>(2).unwrap();
        let producer = thread::spawn(move || {
            for _ in 0..3 {
                jobs.blocking_submit(crate::job::job_fn(seven as fn() -> u8)).unwrap();
            }
        });

        let mut received = Vec::new();
        while let Some(result) = results.blocking_recv() {
            received.push(result.unwrap());
        }
        producer.join().unwrap();
        assert_eq!(received, vec![7, 7, 7]);
    }

    #[test]
    fn env_overrides() {
        std::env::set_var(ENV_CONCURRENCY, "3");
        std::env::set_var(ENV_NAME, "stage-a");
        let config = Config::from_env().unwrap();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.name, "stage-a");

        std::env::set_var(ENV_CONCURRENCY, "-2");
        assert_eq!(
            Config::from_env().err(),
            Some(ConfigurationError::NonPositiveConcurrency(-2))
        );

        std::env::set_var(ENV_CONCURRENCY, "many");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigurationError::InvalidEnv { key: ENV_CONCURRENCY, .. })
        ));

        std::env::remove_var(ENV_CONCURRENCY);
        std::env::remove_var(ENV_NAME);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolMetrics {
    pub concurrency: usize,
    pub spawned_workers: usize,
    pub busy_workers: usize,
    pub submitted_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
}

impl PoolMetrics {
    /// Доля занятых воркеров среди запущенных
    pub fn utilization(&self) -> f64 {
        if self.spawned_workers == 0 {
            return 0.0;
        }
        self.busy_workers as f64 / self.spawned_workers as f64
    }

    pub fn pending_jobs(&self) -> usize {
        self.submitted_jobs
            .saturating_sub(self.completed_jobs + self.failed_jobs)
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_jobs + self.failed_jobs;
        if total == 0 {
            return 1.0;
        }
        self.completed_jobs as f64 / total as f64
    }
}



/// Итог работы коннектора между двумя стадиями
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectSummary {
    pub forwarded: usize,
    pub faults_skipped: usize,
}

impl ConnectSummary {
    pub fn received(&self) -> usize {
        self.forwarded + self.faults_skipped
    }
}


/// Сигнал завершения, который каждый воркер отправляет ровно один раз
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub worker: usize,
    pub executed: usize,
}

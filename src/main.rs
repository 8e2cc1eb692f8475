use elastic_pool::{boxed, connect, BoxedJob, Config, Job, Pool};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};


/// Задача первой стадии: порождает задачу для второй
struct Tagged {
    id: u32,
    executed: Arc<AtomicBool>,
}

impl Job for Tagged {
    type Output = BoxedJob;

    fn execute(self) -> BoxedJob {
        thread::sleep(Duration::from_micros(50));
        self.executed.store(true, Ordering::Release);
        boxed(Describe(format!("a job created from another job with ID:{}", self.id)))
    }
}

struct Describe(String);

impl Job for Describe {
    type Output = String;

    fn execute(self) -> String {
        thread::sleep(Duration::from_micros(50));
        format!("{} is finished", self.0)
    }
}


#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "elastic_pool=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "falling back to default config");
        Config::new(4)
    });
    let concurrency = config.concurrency;

    let now = Instant::now();
    let flags: Vec<_> = (11..=14)
        .map(|id| (id, Arc::new(AtomicBool::new(false))))
        .collect();

    let (jobs_in, results_out) = Pool::<BoxedJob>::with_config(config.clone().named("stage-1"))
        .expect("valid stage-1 config")
        .split();
    let (jobs_in2, mut results_out2) = Pool::<BoxedJob>::with_config(config.named("stage-2"))
        .expect("valid stage-2 config")
        .split();

    let jobs: Vec<BoxedJob> = flags
        .iter()
        .map(|(id, executed)| boxed(Tagged { id: *id, executed: executed.clone() }))
        .collect();
    tokio::spawn(async move {
        if let Err(err) = jobs_in.submit_all(jobs).await {
            tracing::error!(error = %err, "stage-1 rejected a job");
        }
    });

    let connector = connect(results_out, jobs_in2);

    while let Some(result) = results_out2.recv().await {
        match result {
            Ok(value) => match value.downcast::<String>() {
                Ok(text) => println!("{}", text),
                Err(_) => println!("<non-string result>"),
            },
            Err(fault) => println!("fault: {}", fault),
        }
    }

    match connector.await {
        Ok(summary) => tracing::info!(forwarded = summary.forwarded, "pipeline drained"),
        Err(err) => tracing::error!(error = %err, "pipeline failed"),
    }

    println!("time taken: {:?} concurrency: {}", now.elapsed(), concurrency);
    for (id, executed) in &flags {
        println!("{{ID: {} Executed: {}}}", id, executed.load(Ordering::Acquire));
    }
}

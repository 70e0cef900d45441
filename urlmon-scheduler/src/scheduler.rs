//! Due-check scan: a fixed-period tick that reads the monitor set fresh,
//! computes which monitors are overdue, and fans probes out with a bounded
//! concurrency cap. Each completed probe appends exactly one health check.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as Interval, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use urlmon_core::{
    config::SchedulerConfig,
    models::Monitor,
    store::MonitorStore,
    Error, Result,
};

use crate::probe::Prober;

pub struct MonitorScheduler {
    store: MonitorStore,
    prober: Prober,
    scheduler: JobScheduler,
    tick_seconds: u64,
    probe_permits: Arc<Semaphore>,
}

impl MonitorScheduler {
    pub async fn new(store: MonitorStore, config: &SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| Error::scheduler(e.to_string()))?;

        Ok(Self {
            store,
            prober: Prober::new(Duration::from_secs(config.probe_timeout_seconds)),
            scheduler,
            tick_seconds: config.tick_seconds,
            probe_permits: Arc::new(Semaphore::new(config.max_concurrent_probes)),
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        info!("Starting due-check scheduler ({}s tick)", self.tick_seconds);

        let store = self.store.clone();
        let prober = self.prober.clone();
        let permits = self.probe_permits.clone();
        let cron_expression = format!("0/{} * * * * *", self.tick_seconds);

        let job = Job::new_async(cron_expression.as_str(), move |_uuid, _l| {
            let store = store.clone();
            let prober = prober.clone();
            let permits = permits.clone();

            Box::pin(async move {
                if let Err(e) = run_tick(&store, &prober, permits).await {
                    error!("Due-check tick failed: {}", e);
                }
            })
        })
        .map_err(|e| Error::scheduler(e.to_string()))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| Error::scheduler(e.to_string()))?;
        self.scheduler
            .start()
            .await
            .map_err(|e| Error::scheduler(e.to_string()))?;

        info!("Due-check scheduler started");
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping due-check scheduler");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| Error::scheduler(e.to_string()))?;
        info!("Due-check scheduler stopped");
        Ok(())
    }
}

/// A monitor is due once a full interval has passed since its last check,
/// counting from creation when it has never been checked.
pub fn is_due(
    now: DateTime<Utc>,
    created_at: DateTime<Utc>,
    last_checked_at: Option<DateTime<Utc>>,
    interval_minutes: i64,
) -> bool {
    let reference = last_checked_at.unwrap_or(created_at);
    now - reference >= Interval::minutes(interval_minutes)
}

/// One scan-and-dispatch pass. The due set is computed from the monitor set
/// as of the start of the tick, so a monitor is probed at most once per tick.
/// A store failure for one monitor skips that monitor only; the next tick
/// retries it.
pub async fn run_tick(
    store: &MonitorStore,
    prober: &Prober,
    permits: Arc<Semaphore>,
) -> Result<()> {
    let monitors = store.list_active_monitors().await?;
    let now = Utc::now();

    let mut due = Vec::new();
    for monitor in monitors {
        match store.last_checked_at(monitor.id).await {
            Ok(last) => {
                if is_due(now, monitor.created_at, last, monitor.check_interval) {
                    due.push(monitor);
                }
            }
            Err(e) => {
                error!(
                    "Skipping monitor {} this tick, last-check lookup failed: {}",
                    monitor.id, e
                );
            }
        }
    }

    if due.is_empty() {
        return Ok(());
    }
    info!("Dispatching {} due probe(s)", due.len());

    let mut probes = JoinSet::new();
    for monitor in due {
        let store = store.clone();
        let prober = prober.clone();
        let permits = permits.clone();

        probes.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| Error::scheduler(e.to_string()))?;
            check_monitor(&store, &prober, &monitor).await
        });
    }

    while let Some(joined) = probes.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Monitor check failed: {}", e),
            Err(e) => error!("Probe task panicked: {}", e),
        }
    }

    Ok(())
}

async fn check_monitor(store: &MonitorStore, prober: &Prober, monitor: &Monitor) -> Result<()> {
    let outcome = prober.probe(&monitor.url).await;

    let check = store
        .append_health_check(
            monitor.id,
            outcome.status_code,
            outcome.latency_ms,
            outcome.is_up,
            outcome.error.as_deref(),
            Utc::now(),
        )
        .await?;

    if check.is_up {
        info!(
            "Monitor {} up, status {:?}, {:.1}ms",
            monitor.id, check.status_code, check.latency
        );
    } else {
        warn!(
            "Monitor {} down, status {:?}, error {:?}",
            monitor.id, check.status_code, check.error_message
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tokio::net::TcpListener;
    use urlmon_core::db::{create_memory_pool, run_migrations, DatabasePool};

    #[test]
    fn fresh_monitor_waits_a_full_interval() {
        let created = Utc::now();

        assert!(!is_due(created, created, None, 5));
        assert!(!is_due(created + Interval::minutes(4), created, None, 5));
        assert!(is_due(created + Interval::minutes(5), created, None, 5));
    }

    #[test]
    fn checked_monitor_counts_from_last_check() {
        let created = Utc::now();
        let last = created + Interval::minutes(10);

        assert!(!is_due(
            last + Interval::minutes(14),
            created,
            Some(last),
            15
        ));
        assert!(is_due(last + Interval::minutes(15), created, Some(last), 15));
    }

    async fn serve_ok() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/", get(|| async { "ok" }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    async fn test_store() -> (MonitorStore, DatabasePool) {
        let pool = create_memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        (MonitorStore::new(pool.clone()), pool)
    }

    async fn backdate_creation(pool: &DatabasePool, monitor_id: i64, minutes: i64) {
        sqlx::query("UPDATE monitors SET created_at = ? WHERE id = ?")
            .bind(Utc::now() - Interval::minutes(minutes))
            .bind(monitor_id)
            .execute(pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn tick_probes_exactly_the_due_monitors() {
        let (store, pool) = test_store().await;
        let url = serve_ok().await;
        let prober = Prober::new(Duration::from_secs(5));
        let permits = Arc::new(Semaphore::new(4));

        // Due: created 10 minutes ago, interval 5, never checked.
        let due = store.create_monitor(&url, 5).await.unwrap();
        backdate_creation(&pool, due.id, 10).await;

        // Not due: just created.
        let fresh = store.create_monitor(&url, 5).await.unwrap();

        // Deactivated monitors never run, overdue or not.
        let disabled = store.create_monitor(&url, 5).await.unwrap();
        backdate_creation(&pool, disabled.id, 10).await;
        store.deactivate_monitor(disabled.id).await.unwrap();

        run_tick(&store, &prober, permits.clone()).await.unwrap();

        let checks = store.list_health_checks(due.id, None).await.unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status_code, Some(200));
        assert!(checks[0].is_up);

        assert!(store.list_health_checks(fresh.id, None).await.unwrap().is_empty());
        assert!(store
            .list_health_checks(disabled.id, None)
            .await
            .unwrap()
            .is_empty());

        // The fresh check resets the interval, so an immediate second tick
        // finds nothing due.
        run_tick(&store, &prober, permits).await.unwrap();
        assert_eq!(store.list_health_checks(due.id, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn tick_records_transport_faults_as_failed_checks() {
        let (store, pool) = test_store().await;
        let prober = Prober::new(Duration::from_secs(2));
        let permits = Arc::new(Semaphore::new(4));

        // Nothing listens on this port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let monitor = store
            .create_monitor(&format!("http://{}/", addr), 5)
            .await
            .unwrap();
        backdate_creation(&pool, monitor.id, 10).await;

        run_tick(&store, &prober, permits).await.unwrap();

        let checks = store.list_health_checks(monitor.id, None).await.unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status_code, None);
        assert!(!checks[0].is_up);
        assert!(checks[0].error_message.is_some());
    }

    #[tokio::test]
    async fn fanout_is_bounded_but_covers_all_due_monitors() {
        let (store, pool) = test_store().await;
        let url = serve_ok().await;
        let prober = Prober::new(Duration::from_secs(5));
        let permits = Arc::new(Semaphore::new(2));

        let mut ids = Vec::new();
        for _ in 0..6 {
            let monitor = store.create_monitor(&url, 5).await.unwrap();
            backdate_creation(&pool, monitor.id, 10).await;
            ids.push(monitor.id);
        }

        run_tick(&store, &prober, permits).await.unwrap();

        for id in ids {
            assert_eq!(store.list_health_checks(id, None).await.unwrap().len(), 1);
        }
    }
}

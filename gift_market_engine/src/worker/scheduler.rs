use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use log::*;
use tokio::{sync::watch, task::JoinHandle};

use crate::worker::{
    errors::SchedulerError,
    observer::{LogObserver, SchedulerObserver},
    task::{Task, TaskContext},
};

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs a fixed set of [`Task`]s on their own intervals.
///
/// On [`Scheduler::start`], every task runs once, one after the other, in the order given. Each task then rests for
/// its interval, measured from the end of its last run, and runs again, until shutdown. Tasks with a zero interval
/// run only the once.
pub struct Scheduler {
    tasks: Vec<Arc<dyn Task>>,
    observer: Arc<dyn SchedulerObserver>,
    shutdown_timeout: Duration,
}

impl Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self.tasks.iter().map(|t| t.display_name()).collect::<Vec<String>>();
        write!(f, "Scheduler ({})", names.join(", "))
    }
}

impl Scheduler {
    pub fn new(tasks: Vec<Arc<dyn Task>>) -> Self {
        Self { tasks, observer: Arc::new(LogObserver), shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT }
    }

    pub fn with_observer<O: SchedulerObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Spawns the scheduler onto the current tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let runner = Runner { observer: self.observer, in_flight: Arc::clone(&in_flight), shutdown: shutdown_rx };
        info!("👷️ Starting scheduler with {} tasks", self.tasks.len());
        let driver = tokio::spawn(runner.drive(self.tasks));
        SchedulerHandle { shutdown: shutdown_tx, driver: Some(driver), in_flight, timeout: self.shutdown_timeout }
    }
}

/// Controls a running [`Scheduler`].
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    driver: Option<JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
    timeout: Duration,
}

impl Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SchedulerHandle (in flight: {})", self.in_flight())
    }
}

impl SchedulerHandle {
    /// Number of task runs currently executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// True once every task has retired, e.g. when all tasks run only once.
    pub fn is_finished(&self) -> bool {
        self.driver.as_ref().map_or(true, |d| d.is_finished())
    }

    /// Stops scheduling new runs, wakes resting tasks and waits for in-flight runs to finish.
    ///
    /// If they have not finished within the shutdown timeout, they are abandoned and
    /// [`SchedulerError::ShutdownTimeout`] is returned.
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        self.shutdown.send_replace(true);
        let Some(mut driver) = self.driver.take() else {
            return Ok(());
        };
        info!("👷️ Scheduler shutting down. {} task run(s) in flight", self.in_flight());
        match tokio::time::timeout(self.timeout, &mut driver).await {
            Ok(Ok(())) => {
                info!("👷️ Scheduler stopped");
                Ok(())
            },
            Ok(Err(e)) => Err(SchedulerError::Panicked(e.to_string())),
            Err(_) => {
                driver.abort();
                let in_flight = self.in_flight();
                error!("👷️ Scheduler did not stop within {:?}. Abandoning {in_flight} run(s)", self.timeout);
                Err(SchedulerError::ShutdownTimeout(self.timeout, in_flight))
            },
        }
    }
}

#[derive(Clone)]
struct Runner {
    observer: Arc<dyn SchedulerObserver>,
    in_flight: Arc<AtomicUsize>,
    shutdown: watch::Receiver<bool>,
}

/// Keeps the in-flight count right even if a run panics.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Runner {
    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn drive(self, tasks: Vec<Arc<dyn Task>>) {
        for task in &tasks {
            if self.is_shutting_down() {
                break;
            }
            self.run_once(task.as_ref()).await;
        }
        let mut loops = Vec::with_capacity(tasks.len());
        for task in tasks {
            if task.interval().is_zero() || self.is_shutting_down() {
                self.observer.task_retired(&task.display_name());
                continue;
            }
            let runner = self.clone();
            loops.push(tokio::spawn(runner.repeat(task)));
        }
        for handle in loops {
            if let Err(e) = handle.await {
                error!("👷️ A task loop ended abnormally. {e}");
            }
        }
    }

    async fn repeat(mut self, task: Arc<dyn Task>) {
        let name = task.display_name();
        let interval = task.interval();
        loop {
            if self.is_shutting_down() {
                break;
            }
            trace!("👷️ {name} resting for {interval:?}");
            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                },
            }
            if self.is_shutting_down() {
                break;
            }
            self.run_once(task.as_ref()).await;
        }
        self.observer.task_retired(&name);
    }

    async fn run_once(&self, task: &dyn Task) {
        let name = task.display_name();
        let _guard = InFlight::enter(&self.in_flight);
        self.observer.task_started(&name);
        let started = Instant::now();
        let ctx = TaskContext::new(self.shutdown.clone());
        match task.run(&ctx).await {
            Ok(()) => self.observer.task_succeeded(&name, started.elapsed()),
            Err(e) => self.observer.task_failed(&name, &e),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::worker::errors::JobError;

    #[derive(Clone)]
    struct TestTask {
        name: &'static str,
        interval: Duration,
        work: Duration,
        fail: bool,
        runs: Arc<AtomicUsize>,
        journal: Arc<Mutex<Vec<String>>>,
    }

    impl TestTask {
        fn new(name: &'static str, interval: Duration, journal: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                interval,
                work: Duration::ZERO,
                fail: false,
                runs: Arc::new(AtomicUsize::new(0)),
                journal: Arc::clone(journal),
            }
        }

        fn runs(&self) -> usize {
            self.runs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Task for TestTask {
        fn display_name(&self) -> String {
            self.name.to_string()
        }

        fn interval(&self) -> Duration {
            self.interval
        }

        async fn run(&self, _ctx: &TaskContext) -> Result<(), JobError> {
            self.journal.lock().unwrap().push(format!("{}:start", self.name));
            if !self.work.is_zero() {
                tokio::time::sleep(self.work).await;
            }
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.journal.lock().unwrap().push(format!("{}:end", self.name));
            if self.fail {
                Err(JobError::Other("boom".into()))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default, Clone)]
    struct RecordingObserver {
        failures: Arc<AtomicUsize>,
    }

    impl SchedulerObserver for RecordingObserver {
        fn task_failed(&self, _name: &str, _error: &JobError) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn wait_for<F: Fn() -> bool>(condition: F) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Condition was not met in time");
    }

    fn journal() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn long_interval_tasks_run_once_then_shut_down_cleanly() {
        let journal = journal();
        let hourly = TestTask::new("hourly", Duration::from_secs(3600), &journal);
        let twice_daily = TestTask::new("twice_daily", Duration::from_secs(12 * 3600), &journal);
        let tasks: Vec<Arc<dyn Task>> = vec![Arc::new(hourly.clone()), Arc::new(twice_daily.clone())];
        let mut handle = Scheduler::new(tasks).start();
        wait_for(|| hourly.runs() == 1 && twice_daily.runs() == 1).await;
        handle.shutdown().await.expect("Clean shutdown");
        assert_eq!(hourly.runs(), 1);
        assert_eq!(twice_daily.runs(), 1);
        assert_eq!(handle.in_flight(), 0);
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn startup_runs_are_sequential_and_in_order() {
        let journal = journal();
        let mut first = TestTask::new("first", Duration::from_secs(3600), &journal);
        first.work = Duration::from_millis(50);
        let second = TestTask::new("second", Duration::from_secs(3600), &journal);
        let third = TestTask::new("third", Duration::from_secs(3600), &journal);
        let tasks: Vec<Arc<dyn Task>> = vec![Arc::new(first), Arc::new(second), Arc::new(third.clone())];
        let mut handle = Scheduler::new(tasks).start();
        wait_for(|| third.runs() == 1).await;
        handle.shutdown().await.unwrap();
        let entries = journal.lock().unwrap().clone();
        assert_eq!(entries, vec![
            "first:start",
            "first:end",
            "second:start",
            "second:end",
            "third:start",
            "third:end"
        ]);
    }

    #[tokio::test]
    async fn short_intervals_rearm() {
        let journal = journal();
        let task = TestTask::new("frequent", Duration::from_millis(20), &journal);
        let mut handle = Scheduler::new(vec![Arc::new(task.clone())]).start();
        wait_for(|| task.runs() >= 3).await;
        handle.shutdown().await.unwrap();
        let runs = task.runs();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(task.runs(), runs, "No runs after shutdown");
    }

    #[tokio::test]
    async fn zero_interval_runs_once() {
        let journal = journal();
        let task = TestTask::new("once", Duration::ZERO, &journal);
        let mut handle = Scheduler::new(vec![Arc::new(task.clone())]).start();
        wait_for(|| handle.is_finished()).await;
        assert_eq!(task.runs(), 1);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn failures_are_reported_and_do_not_stop_the_scheduler() {
        let journal = journal();
        let mut task = TestTask::new("flaky", Duration::from_millis(20), &journal);
        task.fail = true;
        let observer = RecordingObserver::default();
        let failures = Arc::clone(&observer.failures);
        let mut handle = Scheduler::new(vec![Arc::new(task.clone())]).with_observer(observer).start();
        wait_for(|| failures.load(Ordering::SeqCst) >= 3).await;
        assert!(task.runs() >= 3);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn slow_runs_time_out_shutdown() {
        let journal = journal();
        let mut task = TestTask::new("slow", Duration::from_secs(3600), &journal);
        task.work = Duration::from_secs(10);
        let mut handle =
            Scheduler::new(vec![Arc::new(task)]).with_shutdown_timeout(Duration::from_millis(100)).start();
        wait_for(|| handle.in_flight() == 1).await;
        let err = handle.shutdown().await.unwrap_err();
        assert!(matches!(err, SchedulerError::ShutdownTimeout(_, 1)));
    }
}

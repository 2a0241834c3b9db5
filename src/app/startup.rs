//! Application startup
//!
//! Parses arguments, starts logging, loads hub settings and the fixture,
//! runs one lifecycle command against the in-memory adapters and prints the
//! resulting scans.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::app::cli::args::{Args, Command};
use crate::app::cli::display;
use crate::app::error::AppError;
use crate::config::HubSettings;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::{init_logging, level_for_verbosity, LogFormat};
use crate::core::styles::StyleRole;
use crate::notifications::api::{
    global_notifier, BusNotifier, Event, EventFilter, EventReceiver, SystemEvent, SystemEventType,
};
use crate::scan::api::{
    Fixture, LifecycleManager, LifecyclePorts, MemoryResults, MemoryScanStore, MemoryTaskQueue,
    ScanFilter, ScanId, TaskId,
};

/// Run the CLI; returns the process exit code
pub fn startup() -> i32 {
    let args = Args::parse_styled();
    let color = args.use_color();

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| level_for_verbosity(args.verbosity()).to_string());
    let format = LogFormat::from_str(&args.log_format).unwrap_or_default();
    if let Err(e) = init_logging(&level, format, args.log_file.as_deref(), color) {
        eprintln!("Cannot start logging: {e}");
        return 2;
    }
    log::debug!("scanhub {} starting", crate::core::version::long_version());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("FATAL: cannot start async runtime: {}", e);
            return 1;
        }
    };

    match runtime.block_on(run(&args, color)) {
        Ok(()) => 0,
        Err(e) => {
            log_error_with_context(&e, &format!("Running {}", args.command.name()));
            1
        }
    }
}

/// Adapters loaded from a fixture plus a manager driving them
pub struct Session {
    pub manager: LifecycleManager,
    pub store: Arc<MemoryScanStore>,
    pub tasks: Arc<MemoryTaskQueue>,
    pub results: Arc<MemoryResults>,
}

impl Session {
    pub fn new(fixture: Fixture, settings: HubSettings, notifier: BusNotifier) -> Result<Self, AppError> {
        let (store, tasks, results) = fixture.into_adapters()?;
        let store = Arc::new(store);
        let tasks = Arc::new(tasks);
        let results = Arc::new(results);
        let manager = LifecycleManager::new(LifecyclePorts {
            store: store.clone(),
            query: store.clone(),
            tasks: tasks.clone(),
            notifier: Arc::new(notifier),
            results: results.clone(),
            config: Arc::new(settings),
        });
        Ok(Self {
            manager,
            store,
            tasks,
            results,
        })
    }

    pub fn snapshot(&self) -> Fixture {
        Fixture::capture(&self.store, &self.tasks, &self.results)
    }
}

pub async fn load_fixture(path: &Path) -> Result<Fixture, AppError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Fixture {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    serde_json::from_str(&contents).map_err(|e| AppError::Fixture {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

pub async fn save_fixture(path: &Path, fixture: &Fixture) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(fixture).map_err(|e| AppError::Fixture {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tokio::fs::write(path, json + "\n")
        .await
        .map_err(|e| AppError::Fixture {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Apply `command` to the session; returns a line summarising the result
pub async fn execute(
    session: &Session,
    command: &Command,
    color: bool,
) -> Result<Option<String>, AppError> {
    let manager = &session.manager;
    let outcome = match command {
        Command::Show { .. } => return Ok(None),
        Command::Overdue { scan } => {
            let timeliness = manager
                .waived_on_time(ScanId(*scan), chrono::Utc::now())
                .await?;
            return Ok(Some(format!(
                "{} waiver deadline: {}",
                ScanId(*scan),
                display::timeliness_label(timeliness, color)
            )));
        }
        Command::Resubmit { base, .. } => {
            let scan_id = scan_of(command)?;
            let created = manager.resubmit(scan_id, base.map(ScanId)).await?;
            return Ok(Some(format!("{} resubmitted as {}", scan_id, created.id)));
        }
        Command::Queue { .. } => manager.on_queued(scan_of(command)?).await?,
        Command::Start { .. } => manager.on_started(scan_of(command)?).await?,
        Command::Finish { .. } => {
            manager
                .on_task_finished(scan_of(command)?, task_of(command)?)
                .await?
        }
        Command::Fail { .. } => {
            manager
                .on_task_failed_or_canceled(scan_of(command)?, task_of(command)?)
                .await?
        }
        Command::Cancel { .. } => manager.on_cancel_requested(scan_of(command)?).await?,
        Command::Waive { .. } => manager.on_waiver_submitted(scan_of(command)?).await?,
        Command::Invalidate { .. } => manager.on_waiver_invalidated(scan_of(command)?).await?,
    };

    let mut summary = format!("{} is {}", outcome.scan.id, outcome.scan.state);
    if outcome.changed.len() > 1 {
        let others: Vec<String> = outcome.changed.iter().map(|id| id.to_string()).collect();
        summary.push_str(&format!(" (changed: {})", others.join(", ")));
    }
    if let Some(enabled) = outcome.enabled {
        summary.push_str(&format!(", {enabled} enabled"));
    }
    Ok(Some(summary))
}

fn scan_of(command: &Command) -> Result<ScanId, AppError> {
    command.scan_id().ok_or(AppError::MissingScan)
}

fn task_of(command: &Command) -> Result<TaskId, AppError> {
    command.task_id().ok_or(AppError::MissingTask)
}

async fn run(args: &Args, color: bool) -> Result<(), AppError> {
    let settings = HubSettings::discover(args.config_file.as_deref()).await?;
    let fixture = load_fixture(&args.fixture).await?;
    log::debug!(
        "Loaded {} scans and {} tasks from {}",
        fixture.scans.len(),
        fixture.tasks.len(),
        args.fixture.display()
    );

    let notifier = global_notifier();
    let notices = notifier.manager().lock().await.subscribe(
        "cli".to_string(),
        EventFilter::StateOnly,
        "app:startup".to_string(),
    );

    announce(&notifier, SystemEvent::new(SystemEventType::Startup)).await;
    let session = Session::new(fixture, settings, notifier.clone())?;
    let saves = session.store.save_count();
    let summary = execute(&session, &args.command, color).await;
    let done = format!("{} finished", args.command.name());
    announce(&notifier, SystemEvent::with_message(SystemEventType::Shutdown, done)).await;
    print_notices(notices, color);

    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => {
            // side-channel failures leave earlier state changes in place
            if args.write && session.store.save_count() > saves {
                log::warn!(
                    "{} failed after changing state, keeping the changes",
                    args.command.name()
                );
                write_fixture(&args.fixture, &session).await?;
            }
            return Err(e);
        }
    };

    let filter = match &args.command {
        Command::Show { release, enabled } => {
            let mut filter = ScanFilter::new();
            if let Some(release) = release {
                filter = filter.by_release(release.clone());
            }
            if *enabled {
                filter = filter.enabled_only();
            }
            filter
        }
        _ => ScanFilter::new(),
    };
    let scans = session.manager.scans(&filter).await?;
    display::print_scans(&scans, color);
    if let Some(line) = summary {
        println!("{line}");
    }

    if args.write && args.command.mutates() {
        write_fixture(&args.fixture, &session).await?;
    }
    Ok(())
}

async fn write_fixture(path: &Path, session: &Session) -> Result<(), AppError> {
    save_fixture(path, &session.snapshot()).await?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

async fn announce(notifier: &BusNotifier, event: SystemEvent) {
    if let Err(e) = notifier
        .manager()
        .lock()
        .await
        .publish(Event::System(event))
        .await
    {
        log::warn!("System notice not delivered: {}", e);
    }
}

fn print_notices(mut notices: EventReceiver, color: bool) {
    while let Some(event) = notices.try_recv() {
        if let Event::State(notice) = event {
            let role = StyleRole::for_state(notice.state);
            println!(
                "notice: {} {} {}",
                notice.scan_id,
                role.paint(&notice.state_name(), color),
                notice.class
            );
        }
    }
}

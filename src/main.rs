use rankbot::config::Settings;
use rankbot::core::{events::Event, handlers::Bot};
use rankbot::messaging::client::initialize_messaging;
use rankbot::scheduler::{JobProcess, Scheduler};
use rankbot::valorant::client::HenrikDev;

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = Settings::new()?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(settings.get_trace_level())
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let api = HenrikDev::new(
        &settings.valorant_base_url,
        settings.api_timeout(),
        settings.valorant_api_key.clone(),
    )?;
    let bot = Bot::from_settings(&settings, Arc::new(api));

    // Capacity of 64 should be more than plenty to handle all the messages
    let (tx, rx) = mpsc::channel::<Event>(64);
    let tx = Arc::new(tx);

    let sched = Scheduler::new(bot.clone(), tx.clone()).await?;

    let mut jobs = vec![JobProcess::RefreshAutoLeaderboards(
        &settings.auto_update_schedule,
    )];
    if settings.resume_pending_retries {
        // only ran once, at startup.
        jobs.push(JobProcess::ResumePendingRetries);
    }
    for job in jobs {
        sched.add_job(job).await?;
    }

    info!("Starting scheduler.");
    sched.start().await?;

    info!("Initializing messaging engine.");
    initialize_messaging(&settings, bot.clone(), tx, rx).await?;

    info!("Stopping retry loops.");
    bot.retries.shutdown().await;

    Ok(())
}

use tokio_cron_scheduler::{Job, JobScheduler};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tracing::{error, info};

use crate::core::{events::Event, handlers::Bot};
use crate::error::{BotError, BotResult};

pub struct Scheduler {
    scheduler: JobScheduler,
    bot: Bot,
    sender: Arc<Sender<Event>>, // communication to messaging service
}

pub enum JobProcess<'schedule> {
    ResumePendingRetries,
    RefreshAutoLeaderboards(&'schedule str),
}

impl Scheduler {
    pub async fn new(bot: Bot, sender: Arc<Sender<Event>>) -> BotResult<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Scheduler {
            scheduler,
            bot,
            sender,
        })
    }

    pub async fn add_job(&self, job_process: JobProcess<'_>) -> BotResult<uuid::Uuid> {
        let job = match job_process {
            JobProcess::ResumePendingRetries => resume_pending_retries_job(self.bot.clone())?,
            JobProcess::RefreshAutoLeaderboards(schedule) => {
                refresh_auto_leaderboards_job(schedule, self.bot.clone(), self.sender.clone())?
            }
        };
        Ok(self.scheduler.add(job).await?)
    }

    pub async fn start(&self) -> BotResult<()> {
        Ok(self.scheduler.start().await?)
    }
}

//////////////////
// Jobs definition
//////////////////

fn resume_pending_retries_job(bot: Bot) -> BotResult<Job> {
    let job = Job::new_one_shot_async(Duration::from_secs(0), move |_uuid, _l| {
        let bot = bot.clone();
        Box::pin(async move {
            let resumed = bot.retries.resume_pending().await;
            info!("{resumed} retry loops resumed from persisted queues");
        })
    })?;
    Ok(job)
}

fn refresh_auto_leaderboards_job(
    schedule: &str,
    bot: Bot,
    sender: Arc<Sender<Event>>,
) -> BotResult<Job> {
    let job = Job::new_async(schedule, move |uuid, mut l| {
        let bot = bot.clone();
        let sender = sender.clone();
        Box::pin(async move {
            let events = bot.refresh_auto_leaderboards().await;
            info!("Refreshed {} auto-updated leaderboards", events.len());

            for event in events {
                if let Err(e) = sender.send(event).await {
                    let error =
                        BotError::ChannelSend(format!("Could not send message to MPSC channel. {e}"));
                    error!("{error}");
                };
            }

            // Query the next execution time for this job
            let next_tick = l.next_tick_for_job(uuid).await;
            match next_tick {
                Ok(Some(ts)) => info!("Next leaderboard refresh at {:?}", ts),
                _ => error!("Could not get next tick for leaderboard refresh job"),
            }
        })
    })?;
    Ok(job)
}

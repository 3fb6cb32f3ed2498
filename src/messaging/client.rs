use crate::{
    config::Settings,
    core::{
        commands::Command,
        events::{CommandContext, Event, Reply},
        handlers::Bot,
    },
    error::{BotError, BotResult},
};
use http::StatusCode;
use slack_morphism::{
    api::{SlackApiChatDeleteRequest, SlackApiChatPostMessageRequest, SlackApiChatUpdateRequest},
    events::{SlackEventCallbackBody, SlackPushEventCallback},
    hyper_tokio::{SlackClientHyperConnector, SlackHyperClient},
    listener::{SlackClientEventsListenerEnvironment, SlackClientEventsUserState},
    SlackApiToken, SlackApiTokenValue, SlackChannelId, SlackClient, SlackClientSocketModeConfig,
    SlackClientSocketModeListener, SlackMessageContent, SlackSocketModeListenerCallbacks, SlackTs,
};
use std::sync::Arc;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{error, info, warn};

// Slack error code when editing or deleting a message that is gone
const MESSAGE_NOT_FOUND: &str = "message_not_found";

async fn push_events_socket_mode_function(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let guild = event.team_id.0.clone();
    // Only watch Message events for now.
    if let SlackEventCallbackBody::Message(message) = event.event {
        if message.sender.bot_id.is_some() {
            // Abort if message from bot
            return Ok(());
        }
        if let (Some(content), Some(channel_id)) = (message.content, message.origin.channel) {
            if let Some(text) = content.text {
                if !Command::is_command(&text) {
                    return Ok(());
                }
                info!("Received command in channel id {channel_id}");

                let context = CommandContext {
                    guild,
                    channel: channel_id.0,
                    user: message.sender.user.map(|user| user.0),
                    // to respond in thread
                    ts: message.origin.ts.0,
                };

                // Upstream lookups are slow, hand the command over to the dispatcher.
                let sender = states
                    .read()
                    .await
                    .get_user_state::<Arc<Sender<Event>>>()
                    .cloned();
                match sender {
                    Some(sender) => sender
                        .send(Event::CommandReceived(context, Command::build_from(&text)))
                        .await
                        .map_err(|e| {
                            BotError::ChannelSend(format!(
                                "Could not send message to MPSC channel. {e}"
                            ))
                        })?,
                    None => error!("No event sender registered in listener state"),
                }
            };
        }
    }
    Ok(())
}

fn error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> StatusCode {
    let error = BotError::Slack(err.to_string());
    error!("{error}");

    // This return value should be OK if we want to return successful ack to the Slack server using Web-sockets
    // https://api.slack.com/apis/connections/socket-implement#acknowledge
    // so that Slack knows whether to retry
    StatusCode::OK
}

pub async fn client_with_socket_mode(
    client: Arc<SlackHyperClient>,
    app_token: SlackApiToken,
    sender: Arc<Sender<Event>>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let socket_mode_callbacks =
        SlackSocketModeListenerCallbacks::new().with_push_events(push_events_socket_mode_function);

    let listener_environment = Arc::new(
        SlackClientEventsListenerEnvironment::new(client.clone())
            .with_error_handler(error_handler)
            .with_user_state(sender),
    );

    let socket_mode_listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        listener_environment.clone(),
        socket_mode_callbacks,
    );

    socket_mode_listener.listen_for(&app_token).await?;

    socket_mode_listener.serve().await;

    Ok(())
}

#[derive(Clone)]
struct Messenger {
    client: Arc<SlackHyperClient>,
    token: SlackApiToken,
}

impl Messenger {
    /// Posts `text` and returns the message timestamp.
    async fn post(&self, channel: &str, text: String, thread: Option<&str>) -> BotResult<String> {
        let session = self.client.open_session(&self.token);
        let mut request = SlackApiChatPostMessageRequest::new(
            SlackChannelId(channel.to_string()),
            SlackMessageContent::new().with_text(text),
        );
        if let Some(ts) = thread {
            request = request.with_thread_ts(SlackTs(ts.to_string()));
        }
        let response = session
            .chat_post_message(&request)
            .await
            .map_err(|e| BotError::Slack(e.to_string()))?;
        Ok(response.ts.0)
    }

    async fn update(&self, channel: &str, ts: &str, text: String) -> BotResult<()> {
        let session = self.client.open_session(&self.token);
        let request = SlackApiChatUpdateRequest::new(
            SlackChannelId(channel.to_string()),
            SlackMessageContent::new().with_text(text),
            SlackTs(ts.to_string()),
        );
        session
            .chat_update(&request)
            .await
            .map_err(|e| BotError::Slack(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, channel: &str, ts: &str) -> BotResult<()> {
        let session = self.client.open_session(&self.token);
        let request =
            SlackApiChatDeleteRequest::new(SlackChannelId(channel.to_string()), SlackTs(ts.to_string()));
        session
            .chat_delete(&request)
            .await
            .map_err(|e| BotError::Slack(e.to_string()))?;
        Ok(())
    }
}

fn is_message_not_found(error: &BotError) -> bool {
    matches!(error, BotError::Slack(message) if message.contains(MESSAGE_NOT_FOUND))
}

async fn deliver(
    bot: &Bot,
    messenger: &Messenger,
    context: &CommandContext,
    reply: Reply,
) -> BotResult<()> {
    let text = reply.render()?;
    match reply {
        Reply::AutoLeaderboard(board) => {
            // Top level message, it is edited in place on every refresh
            let ts = messenger.post(&context.channel, text, None).await?;
            bot.enable_auto_update(&context.guild, &context.channel, &ts, board.region)
                .await?;
        }
        Reply::DeleteLeaderboard {
            channel,
            message_id,
        } => {
            match messenger.delete(&channel, &message_id).await {
                Err(e) if !is_message_not_found(&e) => return Err(e),
                _ => {}
            }
            bot.disable_auto_update(&context.guild).await?;
            messenger
                .post(&context.channel, text, Some(&context.ts))
                .await?;
        }
        _ => {
            messenger
                .post(&context.channel, text, Some(&context.ts))
                .await?;
        }
    }
    Ok(())
}

async fn handle_event(bot: Bot, messenger: Messenger, event: Event) {
    match event {
        Event::CommandReceived(context, command) => {
            let reply = match command {
                Ok(command) => bot.execute(&context, command).await,
                Err(e) => Reply::Usage(e),
            };
            if let Err(e) = deliver(&bot, &messenger, &context, reply).await {
                error!("Could not answer command in channel {}. {e}", context.channel);
            }
        }
        Event::LeaderboardRefreshed {
            guild,
            channel,
            message_id,
            board,
        } => {
            let text = match Reply::AutoLeaderboard(board).render() {
                Ok(text) => text,
                Err(e) => {
                    error!("{e}");
                    return;
                }
            };
            match messenger.update(&channel, &message_id, text).await {
                Ok(()) => info!("Leaderboard message updated for guild {guild}"),
                Err(e) if is_message_not_found(&e) => {
                    warn!("Leaderboard message of guild {guild} is gone, disabling auto-update");
                    if let Err(e) = bot.disable_auto_update(&guild).await {
                        error!("{e}");
                    }
                }
                Err(e) => error!("Could not update leaderboard of guild {guild}. {e}"),
            }
        }
    }
}

pub async fn initialize_messaging(
    settings: &Settings,
    bot: Bot,
    sender: Arc<Sender<Event>>,
    mut rx: Receiver<Event>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let client = Arc::new(SlackClient::new(SlackClientHyperConnector::new()));

    let token_value: SlackApiTokenValue = settings.slack_token.clone().into();
    let messenger = Messenger {
        client: client.clone(),
        token: SlackApiToken::new(token_value),
    };

    // Command replies and scheduled refreshes.
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tokio::spawn(handle_event(bot.clone(), messenger.clone(), event));
        }
    });

    // Handle messages from users
    let app_token_value: SlackApiTokenValue = settings.slack_app_token.clone().into();
    client_with_socket_mode(client, SlackApiToken::new(app_token_value), sender).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_missing_message() {
        assert!(is_message_not_found(&BotError::Slack(
            "Slack API error: message_not_found".to_string()
        )));
        assert!(!is_message_not_found(&BotError::Slack(
            "Slack API error: channel_not_found".to_string()
        )));
        assert!(!is_message_not_found(&BotError::Timeout));
    }
}

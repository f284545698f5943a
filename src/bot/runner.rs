/*!
 * Long-polling loop of the chat bot.
 */

use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info};

use crate::errors::ProviderError;
use crate::providers::telegram::{TelegramClient, Update};

use super::handlers::{BotHandlers, BotReply};

/// Pause after a failed poll before polling again
const POLL_ERROR_PAUSE: Duration = Duration::from_secs(5);

/// Polls for updates and delivers the handlers' replies
pub struct BotRunner {
    client: TelegramClient,
    handlers: BotHandlers,
}

impl BotRunner {
    pub fn new(client: TelegramClient, handlers: BotHandlers) -> Self {
        Self { client, handlers }
    }

    /// Poll until interrupted with Ctrl-C
    pub async fn run(&self) -> Result<()> {
        info!("Bot started, press Ctrl-C to stop");
        let mut offset = 0i64;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Bot stopped");
                    return Ok(());
                }
                polled = self.client.get_updates(offset) => {
                    match polled {
                        Ok(updates) => {
                            for update in updates {
                                offset = offset.max(update.update_id + 1);
                                self.process(&update).await;
                            }
                        }
                        Err(e) => {
                            error!("Polling failed: {}", e);
                            tokio::time::sleep(POLL_ERROR_PAUSE).await;
                        }
                    }
                }
            }
        }
    }

    /// Handle one update and deliver its replies, logging failures
    pub async fn process(&self, update: &Update) {
        let replies = match self.handlers.handle_update(update).await {
            Ok(replies) => replies,
            Err(e) => {
                error!("Update {} could not be handled: {:#}", update.update_id, e);
                return;
            }
        };

        for reply in replies {
            if let Err(e) = self.deliver(&reply).await {
                error!("Reply to update {} failed: {}", update.update_id, e);
            }
        }
    }

    async fn deliver(&self, reply: &BotReply) -> Result<(), ProviderError> {
        debug!("Delivering {:?}", reply);
        match reply {
            BotReply::Send { chat_id, text, markup } => {
                self.client.send_message(*chat_id, text, markup.as_ref()).await.map(|_| ())
            }
            BotReply::EditMarkup { chat_id, message_id, markup } => {
                self.client.edit_message_reply_markup(*chat_id, *message_id, markup).await
            }
            BotReply::AnswerCallback { callback_id } => self.client.answer_callback_query(callback_id).await,
        }
    }
}

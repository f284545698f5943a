/*!
 * Update handlers of the presentation layer.
 *
 * Handlers only read from the repository. They turn an update into the
 * replies to send, leaving the delivery to the runner.
 */

use anyhow::Result;
use log::{debug, warn};

use crate::database::Repository;
use crate::providers::telegram::{CallbackQuery, InlineKeyboardMarkup, Message, Update};
use crate::text_separator::extract_text_units;

use super::callbacks::CallbackAction;
use super::keyboard;

pub const MODULE_PROMPT: &str = "Select a module:";
pub const NO_MODULES: &str = "No modules available yet.";
pub const SLIDE_NOT_FOUND: &str = "Slide not found.";
pub const EMPTY_SLIDE: &str = "This slide has no text.";

/// Reply produced for an update
#[derive(Debug, Clone, PartialEq)]
pub enum BotReply {
    /// New message in a chat
    Send {
        chat_id: i64,
        text: String,
        markup: Option<InlineKeyboardMarkup>,
    },
    /// Replace the keyboard of an existing message
    EditMarkup {
        chat_id: i64,
        message_id: i64,
        markup: InlineKeyboardMarkup,
    },
    /// Acknowledge a button press
    AnswerCallback { callback_id: String },
}

/// Read-only handlers over the repository
#[derive(Clone)]
pub struct BotHandlers {
    repository: Repository,
    page_size: usize,
}

impl BotHandlers {
    pub fn new(repository: Repository, page_size: usize) -> Self {
        Self {
            repository,
            page_size: page_size.max(1),
        }
    }

    /// Replies for one update; updates of other kinds produce none
    pub async fn handle_update(&self, update: &Update) -> Result<Vec<BotReply>> {
        if let Some(query) = &update.callback_query {
            return self.handle_callback(query).await;
        }
        if let Some(message) = &update.message {
            return self.handle_message(message).await;
        }
        Ok(Vec::new())
    }

    /// Commands; only `/start` is understood
    pub async fn handle_message(&self, message: &Message) -> Result<Vec<BotReply>> {
        let Some(command) = message.text.as_deref().and_then(command_name) else {
            return Ok(Vec::new());
        };

        if command != "start" {
            debug!("Ignoring command /{}", command);
            return Ok(Vec::new());
        }

        let modules = self.repository.list_modules().await?;
        let reply = if modules.is_empty() {
            BotReply::Send {
                chat_id: message.chat.id,
                text: NO_MODULES.to_string(),
                markup: None,
            }
        } else {
            BotReply::Send {
                chat_id: message.chat.id,
                text: MODULE_PROMPT.to_string(),
                markup: Some(keyboard::modules_keyboard(&modules)),
            }
        };

        Ok(vec![reply])
    }

    /// Button presses; every query is acknowledged first
    pub async fn handle_callback(&self, query: &CallbackQuery) -> Result<Vec<BotReply>> {
        let mut replies = vec![BotReply::AnswerCallback {
            callback_id: query.id.clone(),
        }];

        let Some(message) = &query.message else {
            return Ok(replies);
        };
        let action = match query.data.as_deref().map(str::parse::<CallbackAction>) {
            Some(Ok(action)) => action,
            Some(Err(e)) => {
                warn!("{}", e);
                return Ok(replies);
            }
            None => return Ok(replies),
        };

        let chat_id = message.chat.id;
        let message_id = message.message_id;

        match action {
            CallbackAction::SelectModule(module_id) => {
                let markup = self.slides_markup(module_id, 1).await?;
                replies.push(BotReply::EditMarkup { chat_id, message_id, markup });
            }
            CallbackAction::ModulePage { module_id, page } => {
                let markup = self.slides_markup(module_id, page).await?;
                replies.push(BotReply::EditMarkup { chat_id, message_id, markup });
            }
            CallbackAction::ListModules => {
                let modules = self.repository.list_modules().await?;
                replies.push(BotReply::EditMarkup {
                    chat_id,
                    message_id,
                    markup: keyboard::modules_keyboard(&modules),
                });
            }
            CallbackAction::SelectSlide(slide_id) => {
                replies.push(BotReply::Send {
                    chat_id,
                    text: self.slide_text(slide_id).await?,
                    markup: None,
                });
            }
            CallbackAction::Noop => {}
        }

        Ok(replies)
    }

    /// Slides keyboard for one page, clamped to the last page
    pub async fn slides_markup(&self, module_id: i64, page: usize) -> Result<InlineKeyboardMarkup> {
        let count = self.repository.count_slides_for_module(module_id).await?;
        let pages = keyboard::total_pages(count, self.page_size);
        let page = page.clamp(1, pages);

        let slides = self
            .repository
            .list_slides_for_module_page(module_id, page, self.page_size)
            .await?;

        Ok(keyboard::slides_keyboard(module_id, &slides, page, pages))
    }

    /// Text shown for a slide: formatted content, else the stripped raw text
    pub async fn slide_text(&self, slide_id: i64) -> Result<String> {
        let Some(slide) = self.repository.get_slide(slide_id).await? else {
            return Ok(SLIDE_NOT_FOUND.to_string());
        };

        let body = match slide.formatted_content.as_deref() {
            Some(formatted) if !formatted.trim().is_empty() => formatted.trim().to_string(),
            _ => extract_text_units(&slide.content).join(" "),
        };
        let body = if body.is_empty() { EMPTY_SLIDE.to_string() } else { body };

        Ok(format!("{}\n\n{}", slide.name, body))
    }
}

/// Command name of a message text, without the slash and bot mention
fn command_name(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    let name = command.split('@').next().unwrap_or(command);
    (!name.is_empty()).then_some(name)
}

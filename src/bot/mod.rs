/*!
 * Chat bot presentation layer.
 *
 * `/start` lists the modules, a module button lists its slides page by
 * page and a slide button shows the slide's text. Nothing here writes to
 * the database.
 */

pub mod callbacks;
pub mod handlers;
pub mod keyboard;
pub mod runner;

pub use callbacks::CallbackAction;
pub use handlers::{BotHandlers, BotReply};
pub use runner::BotRunner;

/*!
 * Inline keyboard rendering.
 *
 * Pure functions from records to keyboards, one button per row, with a
 * pagination row under paged slide lists.
 */

use crate::database::{ModuleRecord, SlideRecord};
use crate::providers::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

use super::callbacks::CallbackAction;

/// Label of the button returning to the module list
pub const BACK_LABEL: &str = "« Modules";

/// Number of pages needed for `count` items, at least one
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

/// One button per module
pub fn modules_keyboard(modules: &[ModuleRecord]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: modules
            .iter()
            .map(|module| {
                vec![InlineKeyboardButton::new(
                    module.name.clone(),
                    CallbackAction::SelectModule(module.id).to_string(),
                )]
            })
            .collect(),
    }
}

/// One page of a module's slides
///
/// Slide buttons come first, then the pagination row when there is more
/// than one page, then the back button.
pub fn slides_keyboard(
    module_id: i64,
    slides: &[SlideRecord],
    current_page: usize,
    total_pages: usize,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = slides
        .iter()
        .map(|slide| {
            vec![InlineKeyboardButton::new(
                slide.name.clone(),
                CallbackAction::SelectSlide(slide.id).to_string(),
            )]
        })
        .collect();

    if total_pages > 1 {
        rows.push(pagination_row(module_id, current_page, total_pages));
    }
    rows.push(vec![InlineKeyboardButton::new(
        BACK_LABEL,
        CallbackAction::ListModules.to_string(),
    )]);

    InlineKeyboardMarkup { inline_keyboard: rows }
}

/// `«1 ‹ p-1 • p • p+1 › N»` with the outer buttons shown only when they lead somewhere
pub fn pagination_row(module_id: i64, current_page: usize, total_pages: usize) -> Vec<InlineKeyboardButton> {
    let page_button = |label: String, page: usize| {
        InlineKeyboardButton::new(label, CallbackAction::ModulePage { module_id, page }.to_string())
    };

    let mut row = Vec::with_capacity(5);
    if current_page > 1 {
        row.push(page_button("«1".to_string(), 1));
        row.push(page_button(format!("‹ {}", current_page - 1), current_page - 1));
    }

    row.push(InlineKeyboardButton::new(
        format!("• {} •", current_page),
        CallbackAction::Noop.to_string(),
    ));

    if current_page < total_pages {
        row.push(page_button(format!("{} ›", current_page + 1), current_page + 1));
        row.push(page_button(format!("{}»", total_pages), total_pages));
    }

    row
}

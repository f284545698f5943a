use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};

// @module: Callback payloads carried by inline keyboard buttons

/// Action encoded in a button's callback data
///
/// Encoded as colon separated fields with a `module` or `slide` prefix,
/// e.g. `module:page:3:2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Show the first page of a module's slides
    SelectModule(i64),
    /// Show one page of a module's slides
    ModulePage { module_id: i64, page: usize },
    /// Show a slide's text
    SelectSlide(i64),
    /// Return to the module list
    ListModules,
    /// Button without an action (current page marker)
    Noop,
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::SelectModule(id) => write!(f, "module:select:{}", id),
            CallbackAction::ModulePage { module_id, page } => write!(f, "module:page:{}:{}", module_id, page),
            CallbackAction::SelectSlide(id) => write!(f, "slide:select:{}", id),
            CallbackAction::ListModules => write!(f, "modules:list"),
            CallbackAction::Noop => write!(f, "noop"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let number = |index: usize| -> Result<i64> {
            parts
                .get(index)
                .ok_or_else(|| anyhow!("Missing field {} in callback data: {}", index, s))?
                .parse::<i64>()
                .map_err(|e| anyhow!("Invalid number in callback data {}: {}", s, e))
        };

        match parts.as_slice() {
            ["module", "select", _] => Ok(CallbackAction::SelectModule(number(2)?)),
            ["module", "page", _, _] => {
                let page = number(3)?;
                if page < 1 {
                    return Err(anyhow!("Invalid page in callback data: {}", s));
                }
                Ok(CallbackAction::ModulePage {
                    module_id: number(2)?,
                    page: page as usize,
                })
            }
            ["slide", "select", _] => Ok(CallbackAction::SelectSlide(number(2)?)),
            ["modules", "list"] => Ok(CallbackAction::ListModules),
            ["noop"] => Ok(CallbackAction::Noop),
            _ => Err(anyhow!("Unknown callback data: {}", s)),
        }
    }
}

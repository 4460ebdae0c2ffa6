//! # Element layer
//!
//! Resolves prefixed selectors, waits for element state and performs interactions.
//!
//! ## Selector prefixes
//! - `id:X` resolves to `#X`
//! - `name:X` resolves to `[name="X"]`
//! - `css:X` and bare strings pass through unchanged
//! - `input:X` tries `input[name="X"]`, then `input#X`
//!
//! ## Module layout
//! - `selector`: parsing and resolution strategies
//! - `finder`: state waits on the tokio clock
//! - `interactor`: wait-then-act helpers bound to a page
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use stepwright::element::{ElementInteractor, WaitTimeouts};
//! use stepwright::session::PageContext;
//!
//! # async fn example(page: Arc<dyn PageContext>) -> Result<(), stepwright::Error> {
//! let elements = ElementInteractor::new(page, WaitTimeouts::default());
//! elements.fill("id:user-name", "standard_user").await?;
//! elements.click("id:login-button").await?;
//! elements.wait_for_url("*/inventory.html", None).await?;
//! # Ok(())
//! # }
//! ```

pub mod selector;
pub mod finder;
pub mod interactor;

#[cfg(test)]
mod tests;

pub use selector::{resolve, ResolutionStrategy, Selector, SelectorPrefix};
pub use finder::{url_matches, ElementFinder, ElementState};
pub use interactor::{ElementInteractor, WaitTimeouts};

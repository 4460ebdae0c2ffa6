//! Browser context implementation
//!
//! One isolated browsing context inside an engine instance, and the pages created in it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::cdp::traits::CdpBrowser;
use crate::session::page::PageContextImpl;
use crate::session::traits::{BrowserContext, PageContext, PageOptions};
use crate::Error;

/// Browser context implementation
#[derive(Debug)]
pub struct BrowserContextImpl {
    id: String,
    cdp_browser: Arc<dyn CdpBrowser>,
    pages: RwLock<HashMap<String, Arc<dyn PageContext>>>,
    is_active: AtomicBool,
}

impl BrowserContextImpl {
    /// Create a fresh isolated context on the engine
    pub async fn create(cdp_browser: Arc<dyn CdpBrowser>) -> Result<Self, Error> {
        let id = cdp_browser.create_context().await?;

        Ok(Self {
            id,
            cdp_browser,
            pages: RwLock::new(HashMap::new()),
            is_active: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl BrowserContext for BrowserContextImpl {
    fn id(&self) -> &str {
        &self.id
    }

    async fn create_page(&self, options: PageOptions) -> Result<Arc<dyn PageContext>, Error> {
        if !self.is_active() {
            return Err(Error::context_not_found(&self.id));
        }

        let ws_url = self
            .cdp_browser
            .create_target(&options.default_url, Some(&self.id))
            .await?;
        let cdp_client = self.cdp_browser.create_client(&ws_url).await?;

        let target_id = ws_url.rsplit('/').next().unwrap_or("unknown").to_string();

        let page: Arc<dyn PageContext> = Arc::new(PageContextImpl::new(
            target_id.clone(),
            self.id.clone(),
            cdp_client,
        ));

        self.pages
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .insert(target_id, Arc::clone(&page));

        Ok(page)
    }

    async fn pages(&self) -> Result<Vec<Arc<dyn PageContext>>, Error> {
        if !self.is_active() {
            return Err(Error::context_not_found(&self.id));
        }

        let pages = self
            .pages
            .read()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?;
        Ok(pages.values().cloned().collect())
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            warn!("BrowserContext::close: Context {} is already closed", self.id);
            return Ok(());
        }

        info!("BrowserContext::close: Disposing context {}", self.id);

        // Disposing the context closes its targets in the engine
        self.pages
            .write()
            .map_err(|e| Error::internal(format!("Lock error: {}", e)))?
            .clear();

        self.cdp_browser.dispose_context(&self.id).await
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::mock::MockCdpBrowser;

    #[tokio::test]
    async fn test_context_creation() {
        let cdp_browser = Arc::new(MockCdpBrowser::new());
        let context = BrowserContextImpl::create(cdp_browser.clone()).await.unwrap();

        assert!(context.is_active());
        assert!(context.id().starts_with("CTX-"));
        assert_eq!(cdp_browser.log().count("Target.createBrowserContext"), 1);
    }

    #[tokio::test]
    async fn test_create_pages() {
        let cdp_browser = Arc::new(MockCdpBrowser::new());
        let context = BrowserContextImpl::create(cdp_browser).await.unwrap();

        let page = context.create_page(PageOptions::default()).await.unwrap();
        context.create_page(PageOptions::default()).await.unwrap();

        assert_eq!(page.context_id(), context.id());
        assert_eq!(context.pages().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let cdp_browser = Arc::new(MockCdpBrowser::new());
        let context = BrowserContextImpl::create(cdp_browser.clone()).await.unwrap();

        context.close().await.unwrap();
        context.close().await.unwrap();

        assert!(!context.is_active());
        assert_eq!(cdp_browser.log().count("Target.disposeBrowserContext"), 1);
        assert!(matches!(
            context.create_page(PageOptions::default()).await,
            Err(Error::ContextNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_dispose_still_deactivates() {
        let cdp_browser = Arc::new(MockCdpBrowser::new());
        cdp_browser.log().fail_method("Target.disposeBrowserContext");
        let context = BrowserContextImpl::create(cdp_browser).await.unwrap();

        assert!(context.close().await.is_err());
        assert!(!context.is_active());
    }
}

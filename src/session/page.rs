//! Page context implementation
//!
//! Manages page lifecycle and operations.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cdp::traits::{CdpClient, CdpConnection, EvaluationResult};
use crate::session::element::ElementRefImpl;
use crate::session::scripts::LOCATION_HREF;
use crate::session::traits::{ElementRef, PageContext, ScreenshotOptions};
use crate::Error;

/// Page context implementation
#[derive(Debug)]
pub struct PageContextImpl {
    id: String,
    context_id: String,
    cdp_client: Arc<dyn CdpClient>,
    is_active: AtomicBool,
}

impl PageContextImpl {
    /// Create a new page context
    ///
    /// # Arguments
    /// * `id` - Target ID of the page
    /// * `context_id` - Browser context the page was created in
    /// * `cdp_client` - Client connected to the page target
    pub fn new(id: String, context_id: String, cdp_client: Arc<dyn CdpClient>) -> Self {
        Self {
            id,
            context_id,
            cdp_client,
            is_active: AtomicBool::new(true),
        }
    }

    fn ensure_active(&self) -> Result<(), Error> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::page_not_found(&self.id))
        }
    }
}

#[async_trait]
impl PageContext for PageContextImpl {
    fn id(&self) -> &str {
        &self.id
    }

    fn context_id(&self) -> &str {
        &self.context_id
    }

    async fn navigate(&self, url: &str) -> Result<(), Error> {
        self.ensure_active()?;
        let result = self.cdp_client.navigate(url).await?;
        debug!("Page {} navigated to {} (loader {:?})", self.id, result.url, result.loader_id);
        Ok(())
    }

    async fn url(&self) -> Result<String, Error> {
        self.ensure_active()?;
        match self.cdp_client.evaluate(LOCATION_HREF, false).await? {
            EvaluationResult::String(url) => Ok(url),
            other => Err(Error::cdp(format!("Unexpected location: {:?}", other))),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<EvaluationResult, Error> {
        self.ensure_active()?;
        self.cdp_client.evaluate(script, true).await
    }

    async fn screenshot(&self, options: ScreenshotOptions) -> Result<Vec<u8>, Error> {
        self.ensure_active()?;
        self.cdp_client.screenshot(options.format, options.clip).await
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), Error> {
        self.ensure_active()?;

        self.cdp_client
            .call_method(
                "Emulation.setDeviceMetricsOverride",
                serde_json::json!({
                    "width": width,
                    "height": height,
                    "deviceScaleFactor": 1,
                    "mobile": false,
                }),
            )
            .await?;

        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            warn!("PageContext::close: Page {} is already inactive", self.id);
            return Ok(());
        }

        info!("PageContext::close: Closing page {}", self.id);

        // The page is marked inactive even if the browser refuses
        let close_result = self
            .cdp_client
            .call_method("Page.close", serde_json::json!({}))
            .await;

        if let Err(e) = self.cdp_client.connection().close().await {
            debug!("PageContext::close: Failed to close page connection: {}", e);
        }

        close_result.map(|_| ())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }

    fn element(&self, selector: &str) -> Arc<dyn ElementRef> {
        Arc::new(ElementRefImpl::new(
            self.id.clone(),
            selector.to_string(),
            Arc::clone(&self.cdp_client),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::mock::{CallLog, MockCdpClient};

    fn page(log: &CallLog) -> PageContextImpl {
        PageContextImpl::new(
            "TARGET1".to_string(),
            "CTX1".to_string(),
            Arc::new(MockCdpClient::with_log(log.clone())),
        )
    }

    #[tokio::test]
    async fn test_page_creation() {
        let page = page(&CallLog::new());
        assert!(page.is_active());
        assert_eq!(page.context_id(), "CTX1");
    }

    #[tokio::test]
    async fn test_page_navigate_and_url() {
        let page = page(&CallLog::new());
        page.navigate("https://example.com/").await.unwrap();
        assert_eq!(page.url().await.unwrap(), "https://example.com/");
    }

    #[tokio::test]
    async fn test_set_viewport() {
        let log = CallLog::new();
        let page = page(&log);
        page.set_viewport(1366, 768).await.unwrap();
        assert_eq!(log.count("Emulation.setDeviceMetricsOverride"), 1);
    }

    #[tokio::test]
    async fn test_page_screenshot() {
        let page = page(&CallLog::new());
        let png = page.screenshot(ScreenshotOptions::default()).await.unwrap();
        assert_eq!(&png[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[tokio::test]
    async fn test_page_close_is_idempotent() {
        let log = CallLog::new();
        let page = page(&log);

        page.close().await.unwrap();
        page.close().await.unwrap();

        assert!(!page.is_active());
        assert_eq!(log.count("Page.close"), 1);
        assert!(matches!(page.url().await, Err(Error::PageNotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_close_still_deactivates() {
        let log = CallLog::new();
        log.fail_method("Page.close");
        let page = page(&log);

        assert!(page.close().await.is_err());
        assert!(!page.is_active());
    }
}

//! Element layer tests against the mock DOM

use std::sync::Arc;
use tokio::time::{Duration, Instant};

use super::finder::{ElementFinder, ElementState};
use super::interactor::{ElementInteractor, WaitTimeouts};
use super::selector::{ResolutionStrategy, SelectorPrefix};
use crate::session::mock::{MockNode, MockPage};
use crate::Error;

const WAIT: Duration = Duration::from_millis(10_000);

fn interactor(page: &Arc<MockPage>) -> ElementInteractor {
    ElementInteractor::new(page.clone(), WaitTimeouts::default())
}

#[tokio::test(start_paused = true)]
async fn test_input_primary_candidate_wins() {
    let page = Arc::new(MockPage::new("about:blank").with_element(r#"input[name="email"]"#, MockNode::visible()));
    let finder = ElementFinder::new(page.clone());

    let css = finder
        .wait_for("input:email", ElementState::Visible, WAIT)
        .await
        .unwrap();

    assert_eq!(css, r#"input[name="email"]"#);
    assert_eq!(page.probe_count("input#email"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_input_falls_back_to_id_once() {
    let page = Arc::new(MockPage::new("about:blank").with_element("input#email", MockNode::visible()));
    let finder = ElementFinder::new(page.clone());
    let started = Instant::now();

    let css = finder
        .wait_for("input:email", ElementState::Visible, WAIT)
        .await
        .unwrap();

    assert_eq!(css, "input#email");
    assert!(started.elapsed() >= WAIT);
    assert_eq!(page.probe_count("input#email"), 1);
    assert_eq!(
        page.probed_selectors(),
        vec!["input#email".to_string(), r#"input[name="email"]"#.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_input_both_candidates_time_out() {
    let page = Arc::new(MockPage::new("about:blank"));
    let finder = ElementFinder::new(page.clone());
    let started = Instant::now();

    let err = finder
        .wait_for("input:email", ElementState::Visible, WAIT)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    let message = err.to_string();
    assert!(message.contains("input:email"), "{}", message);
    assert!(message.contains("visible"), "{}", message);
    assert!(started.elapsed() >= WAIT * 2);
    assert_eq!(page.probed_selectors().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_other_prefixes_wait_once() {
    let page = Arc::new(MockPage::new("about:blank").with_element("input#missing", MockNode::visible()));
    let finder = ElementFinder::new(page.clone());

    let result = finder.wait_for("id:missing", ElementState::Attached, WAIT).await;

    assert!(matches!(result, Err(Error::Timeout(_))));
    assert_eq!(page.probed_selectors(), vec!["#missing".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_css_surfaces_as_timeout() {
    let page = Arc::new(MockPage::new("about:blank"));
    let finder = ElementFinder::new(page);

    let result = finder.wait_for("css:##nope", ElementState::Visible, WAIT).await;

    assert!(matches!(result, Err(Error::Timeout(_))));
}

#[tokio::test(start_paused = true)]
async fn test_custom_strategy_adds_fallback() {
    let page = Arc::new(MockPage::new("about:blank").with_element(r#"[data-test="login"]"#, MockNode::visible()));
    let strategy = ResolutionStrategy::default()
        .with_templates(SelectorPrefix::Id, &["#{value}", r#"[data-test="{attr}"]"#]);
    let finder = ElementFinder::new(page).with_strategy(strategy);

    let css = finder
        .wait_for("id:login", ElementState::Visible, Duration::from_millis(500))
        .await
        .unwrap();

    assert_eq!(css, r#"[data-test="login"]"#);
}

#[tokio::test(start_paused = true)]
async fn test_waits_for_late_element() {
    let page = Arc::new(MockPage::new("about:blank").with_element(
        "#spinner-done",
        MockNode::visible().appearing_after(Duration::from_millis(1_500)),
    ));
    let elements = interactor(&page);

    elements.click("id:spinner-done").await.unwrap();

    assert_eq!(page.actions(), vec!["click #spinner-done"]);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_hidden() {
    let page = Arc::new(MockPage::new("about:blank").with_element(
        ".loading",
        MockNode::visible().vanishing_after(Duration::from_millis(800)),
    ));
    let elements = interactor(&page);
    let started = Instant::now();

    assert_eq!(elements.wait_for_hidden(".loading").await.unwrap(), ".loading");
    assert!(started.elapsed() >= Duration::from_millis(800));
}

#[tokio::test(start_paused = true)]
async fn test_hidden_element_is_attached_but_not_clickable() {
    let page = Arc::new(MockPage::new("about:blank").with_element("#ghost", MockNode::hidden()));
    let elements = interactor(&page);

    assert_eq!(elements.wait_for_element("id:ghost").await.unwrap(), "#ghost");

    let result = elements.click("id:ghost").await;
    assert!(matches!(result, Err(Error::Timeout(_))));
    assert!(page.actions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_interactions_act_on_resolved_selector() {
    let page = Arc::new(
        MockPage::new("about:blank")
            .with_element("#user-name", MockNode::visible())
            .with_element(r#"input[name="remember"]"#, MockNode::visible())
            .with_element(r#"[name="sort"]"#, MockNode::visible().with_options(&["az", "za"]))
            .with_element(".card", MockNode::visible().with_bbox(0.0, 0.0, 50.0, 50.0))
            .with_element(".cart", MockNode::visible().with_bbox(200.0, 100.0, 40.0, 20.0)),
    );
    let elements = interactor(&page);

    elements.fill("id:user-name", "standard_user").await.unwrap();
    elements.type_text("id:user-name", "!").await.unwrap();
    elements.press("id:user-name", "Enter").await.unwrap();
    elements.check("input:remember").await.unwrap();
    elements.select_option("name:sort", "za").await.unwrap();
    elements.drag_and_drop(".card", ".cart").await.unwrap();
    elements.double_click("css:.card").await.unwrap();

    assert_eq!(page.value("#user-name").as_deref(), Some("standard_user!"));
    assert_eq!(page.is_checked(r#"input[name="remember"]"#), Some(true));
    assert_eq!(page.value(r#"[name="sort"]"#).as_deref(), Some("za"));
    assert_eq!(
        page.actions(),
        vec![
            "fill #user-name standard_user",
            "type #user-name !",
            "press #user-name Enter",
            r#"check input[name="remember"]"#,
            r#"select [name="sort"] za"#,
            "drag .card to (220, 110)",
            "dblclick .card",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_select_unknown_option_fails() {
    let page = Arc::new(MockPage::new("about:blank").with_element("#sort", MockNode::visible().with_options(&["az"])));
    let elements = interactor(&page);

    let result = elements.select_option("id:sort", "price").await;
    assert!(matches!(result, Err(Error::ScriptExecutionFailed(_))));
}

#[tokio::test(start_paused = true)]
async fn test_text_and_screenshots() {
    let page = Arc::new(MockPage::new("about:blank").with_element(".title", MockNode::visible().with_text("Products")));
    let elements = interactor(&page);

    assert_eq!(elements.text(".title").await.unwrap(), "Products");
    assert_eq!(&elements.screenshot_element(".title").await.unwrap()[..4], &[0x89, 0x50, 0x4E, 0x47]);
    assert!(!elements.screenshot_page().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_boolean_checks_use_check_timeout() {
    let page = Arc::new(
        MockPage::new("about:blank")
            .with_element("#on", MockNode::visible())
            .with_element("#off", MockNode::visible().disabled())
            .with_element("#hidden", MockNode::hidden()),
    );
    let elements = interactor(&page);

    assert!(elements.is_present("id:on").await.unwrap());
    assert!(elements.is_enabled("id:on").await.unwrap());
    assert!(!elements.is_enabled("id:off").await.unwrap());

    let started = Instant::now();
    assert!(!elements.is_visible("id:hidden").await.unwrap());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(5_000));
    assert!(elapsed < WAIT);

    assert!(!elements.is_present("id:absent").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_url() {
    let page = Arc::new(MockPage::new("https://shop.test/"));
    let elements = interactor(&page);

    elements.navigate("https://shop.test/inventory.html").await.unwrap();
    assert_eq!(
        elements.wait_for_url("*/inventory.html", None).await.unwrap(),
        "https://shop.test/inventory.html"
    );

    let started = Instant::now();
    let result = elements.wait_for_url("https://shop.test/cart.html", None).await;
    assert!(matches!(result, Err(Error::Timeout(_))));
    assert!(started.elapsed() >= Duration::from_millis(5_000));
}

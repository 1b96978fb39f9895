//! In-memory browser driver.
//!
//! A small document/window model that implements [`BrowserSession`] without a
//! real browser. The hub binary uses it as its default driver and the tests use
//! it to script page loads, popups, alerts and script results.
//!
//! # Model
//! - Pages are registered by URL; opening an unknown URL yields an empty page
//! - Each window shows one page; window 0 is the main window
//! - After `open`, the next `load_steps` ready-state reads report `loading`
//! - Anchors with a `target` attribute open a popup when clicked

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

use super::{
    BrowserError, BrowserFactory, BrowserResult, BrowserSession, ElementHandle, Locator,
    OptionLocator, ReadyState, WindowInfo, BLANK_LOCATION,
};

/// An `<option>` inside a memory `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOption {
    pub label: String,
    pub value: String,
    pub id: Option<String>,
    pub selected: bool,
}

/// A single element in a memory page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryElement {
    pub tag: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub classes: Vec<String>,
    pub text: String,
    pub value: String,
    pub attributes: HashMap<String, String>,
    pub options: Vec<MemoryOption>,
    /// Number of clicks received.
    pub clicks: usize,
}

impl MemoryElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_option(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(MemoryOption {
            label: label.into(),
            value: value.into(),
            id: None,
            selected: false,
        });
        self
    }

    fn attribute(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "name" => self.name.clone(),
            "class" if !self.classes.is_empty() => Some(self.classes.join(" ")),
            "value" => Some(self.value.clone()),
            _ => self.attributes.get(name).cloned(),
        }
    }
}

/// A page that can be loaded into a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryPage {
    pub url: String,
    pub title: String,
    pub elements: Vec<MemoryElement>,
}

impl MemoryPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_element(mut self, element: MemoryElement) -> Self {
        self.elements.push(element);
        self
    }

    fn find(&self, locator: &Locator) -> BrowserResult<Option<usize>> {
        let by_id = |v: &str| self.elements.iter().position(|e| e.id.as_deref() == Some(v));
        let by_name = |v: &str| self.elements.iter().position(|e| e.name.as_deref() == Some(v));

        let index = match locator {
            Locator::Id(v) => by_id(v),
            Locator::Name(v) => by_name(v),
            Locator::Identifier(v) => by_id(v).or_else(|| by_name(v)),
            Locator::Link(v) => self
                .elements
                .iter()
                .position(|e| e.tag == "a" && e.text.trim() == v.as_str()),
            Locator::Css(selector) => {
                let selector = selector.trim();
                if let Some(id) = selector.strip_prefix('#') {
                    by_id(id)
                } else if let Some(class) = selector.strip_prefix('.') {
                    self.elements.iter().position(|e| e.classes.iter().any(|c| c == class))
                } else if !selector.is_empty() && selector.chars().all(|c| c.is_ascii_alphanumeric()) {
                    let tag = selector.to_lowercase();
                    self.elements.iter().position(|e| e.tag == tag)
                } else {
                    return Err(BrowserError::Unsupported(format!("css selector `{}`", selector)));
                }
            }
            Locator::XPath(_) => {
                return Err(BrowserError::Unsupported("xpath locators".into()));
            }
        };
        Ok(index)
    }
}

#[derive(Debug)]
struct MemoryWindow {
    handle: String,
    name: String,
    page: MemoryPage,
}

impl MemoryWindow {
    fn info(&self) -> WindowInfo {
        WindowInfo {
            handle: self.handle.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Debug)]
struct BrowserState {
    pages: HashMap<String, MemoryPage>,
    windows: Vec<MemoryWindow>,
    current: usize,
    ready: VecDeque<BrowserResult<ReadyState>>,
    load_steps: usize,
    scripts: HashMap<String, VecDeque<BrowserResult<Value>>>,
    alert: Option<String>,
    closed: bool,
    next_window: usize,
    window_list_failures: usize,
}

impl BrowserState {
    fn check_open(&self) -> BrowserResult<()> {
        if self.closed {
            return Err(BrowserError::Closed);
        }
        Ok(())
    }

    /// Like `check_open`, but document interaction is also blocked by a modal alert.
    fn check_interactive(&self) -> BrowserResult<()> {
        self.check_open()?;
        match &self.alert {
            Some(message) => Err(BrowserError::UnexpectedAlert(message.clone())),
            None => Ok(()),
        }
    }

    fn window(&self) -> &MemoryWindow {
        &self.windows[self.current]
    }

    fn load(&self, url: &str) -> MemoryPage {
        self.pages.get(url).cloned().unwrap_or_else(|| MemoryPage::new(url))
    }

    fn navigate(&mut self, window: usize, url: String) {
        let page = self.load(&url);
        self.windows[window].page = page;
        for _ in 0..self.load_steps {
            self.ready.push_back(Ok(ReadyState::Loading));
        }
    }

    fn push_window(&mut self, name: &str, location: &str) -> String {
        let handle = format!("window-{}", self.next_window);
        self.next_window += 1;
        let page = self.load(location);
        self.windows.push(MemoryWindow {
            handle: handle.clone(),
            name: name.to_string(),
            page,
        });
        handle
    }

    fn window_index(&self, target: &str) -> BrowserResult<usize> {
        self.windows
            .iter()
            .position(|w| w.info().answers_to(target))
            .ok_or_else(|| BrowserError::NoSuchWindow(target.to_string()))
    }

    fn element_mut(&mut self, element: &ElementHandle) -> BrowserResult<&mut MemoryElement> {
        let stale = || BrowserError::NoSuchElement(format!("stale element reference {}", element.0));
        let (window, index) = element.0.rsplit_once('/').ok_or_else(stale)?;
        let index: usize = index.parse().map_err(|_| stale())?;
        let current = &mut self.windows[self.current];
        if current.handle != window {
            return Err(stale());
        }
        current.page.elements.get_mut(index).ok_or_else(stale)
    }
}

fn normalize_url(raw: &str) -> String {
    Url::parse(raw).map(|u| u.to_string()).unwrap_or_else(|_| raw.to_string())
}

fn resolve_url(current: &str, target: &str) -> BrowserResult<String> {
    match Url::parse(target) {
        Ok(url) => Ok(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(current)
            .and_then(|base| base.join(target))
            .map(|url| url.to_string())
            .map_err(|e| {
                BrowserError::InvalidArgument(format!("cannot resolve `{}` against `{}`: {}", target, current, e))
            }),
        Err(e) => Err(BrowserError::InvalidArgument(format!("invalid url `{}`: {}", target, e))),
    }
}

/// In-memory [`BrowserSession`].
#[derive(Debug)]
pub struct MemoryBrowser {
    state: Mutex<BrowserState>,
}

impl Default for MemoryBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBrowser {
    pub fn new() -> Self {
        let main = MemoryWindow {
            handle: "window-0".to_string(),
            name: String::new(),
            page: MemoryPage::new(BLANK_LOCATION),
        };
        Self {
            state: Mutex::new(BrowserState {
                pages: HashMap::new(),
                windows: vec![main],
                current: 0,
                ready: VecDeque::new(),
                load_steps: 0,
                scripts: HashMap::new(),
                alert: None,
                closed: false,
                next_window: 1,
                window_list_failures: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().expect("memory browser state poisoned")
    }

    /// Register a page template.
    pub fn with_page(self, page: MemoryPage) -> Self {
        self.add_page(page);
        self
    }

    /// Number of `loading` ready-state reads after each navigation.
    pub fn with_load_steps(self, steps: usize) -> Self {
        self.state().load_steps = steps;
        self
    }

    pub fn add_page(&self, mut page: MemoryPage) {
        page.url = normalize_url(&page.url);
        self.state().pages.insert(page.url.clone(), page);
    }

    /// Script results for `expression`, consumed in order; the last one repeats.
    pub fn script_results(&self, expression: &str, results: Vec<BrowserResult<Value>>) {
        self.state()
            .scripts
            .insert(expression.to_string(), results.into_iter().collect());
    }

    /// Ready-state reads to serve before falling back to `complete`.
    pub fn queue_ready_states(&self, states: Vec<BrowserResult<ReadyState>>) {
        self.state().ready.extend(states);
    }

    /// Make the next `count` window listings fail as if a window were mid-navigation.
    pub fn fail_window_lists(&self, count: usize) {
        self.state().window_list_failures = count;
    }

    /// Open a new top-level window and return its handle.
    pub fn open_window(&self, name: &str, location: &str) -> String {
        self.state().push_window(name, &normalize_url(location))
    }

    pub fn navigate_window(&self, target: &str, url: &str) -> BrowserResult<()> {
        let mut state = self.state();
        let index = state.window_index(target)?;
        let current = state.windows[index].page.url.clone();
        let url = resolve_url(&current, url)?;
        state.navigate(index, url);
        Ok(())
    }

    pub fn raise_alert(&self, message: &str) {
        self.state().alert = Some(message.to_string());
    }

    pub fn dismiss_alert(&self) -> Option<String> {
        self.state().alert.take()
    }

    /// Snapshot of an element of the current window, looked up by id.
    pub fn element(&self, id: &str) -> Option<MemoryElement> {
        let state = self.state();
        state
            .window()
            .page
            .elements
            .iter()
            .find(|e| e.id.as_deref() == Some(id))
            .cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl BrowserSession for MemoryBrowser {
    async fn open(&self, url: &str) -> BrowserResult<()> {
        let mut state = self.state();
        state.check_interactive()?;
        let url = resolve_url(&state.window().page.url, url)?;
        let current = state.current;
        state.navigate(current, url);
        Ok(())
    }

    async fn current_url(&self) -> BrowserResult<String> {
        let state = self.state();
        state.check_open()?;
        Ok(state.window().page.url.clone())
    }

    async fn title(&self) -> BrowserResult<String> {
        let state = self.state();
        state.check_interactive()?;
        Ok(state.window().page.title.clone())
    }

    async fn ready_state(&self) -> BrowserResult<ReadyState> {
        let mut state = self.state();
        state.check_open()?;
        state.ready.pop_front().unwrap_or(Ok(ReadyState::Complete))
    }

    async fn evaluate(&self, script: &str) -> BrowserResult<Value> {
        let mut state = self.state();
        state.check_interactive()?;
        let script = script.trim();

        if let Some(results) = state.scripts.get_mut(script) {
            let next = if results.len() > 1 {
                results.pop_front()
            } else {
                results.front().cloned()
            };
            if let Some(result) = next {
                return result;
            }
        }

        match script {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "document.title" => Ok(Value::String(state.window().page.title.clone())),
            "window.location.href" | "document.location.href" | "location.href" => {
                Ok(Value::String(state.window().page.url.clone()))
            }
            "document.readyState" => {
                let ready = state.ready.pop_front().unwrap_or(Ok(ReadyState::Complete))?;
                Ok(Value::String(ready.as_str().to_string()))
            }
            other => Err(BrowserError::Script(format!("cannot evaluate `{}`", other))),
        }
    }

    async fn find_element(&self, locator: &Locator) -> BrowserResult<ElementHandle> {
        let state = self.state();
        state.check_interactive()?;
        let window = state.window();
        match window.page.find(locator)? {
            Some(index) => Ok(ElementHandle(format!("{}/{}", window.handle, index))),
            None => Err(BrowserError::NoSuchElement(locator.to_string())),
        }
    }

    async fn click(&self, element: &ElementHandle) -> BrowserResult<()> {
        let mut state = self.state();
        state.check_interactive()?;
        let el = state.element_mut(element)?;
        el.clicks += 1;

        if el.tag != "a" {
            return Ok(());
        }
        let Some(href) = el.attributes.get("href").cloned() else {
            return Ok(());
        };
        let target = el.attributes.get("target").cloned();

        let url = resolve_url(&state.window().page.url, &href)?;
        match target.as_deref() {
            None | Some("") | Some("_self") => {
                let current = state.current;
                state.navigate(current, url);
            }
            Some(name) => {
                let name = if name == "_blank" { "" } else { name };
                state.push_window(name, &url);
            }
        }
        Ok(())
    }

    async fn set_value(&self, element: &ElementHandle, value: &str) -> BrowserResult<()> {
        let mut state = self.state();
        state.check_interactive()?;
        let el = state.element_mut(element)?;
        if el.tag == "select" {
            return Err(BrowserError::InvalidArgument("cannot type into a select".into()));
        }
        el.value = value.to_string();
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> BrowserResult<String> {
        let mut state = self.state();
        state.check_interactive()?;
        Ok(state.element_mut(element)?.text.trim().to_string())
    }

    async fn value(&self, element: &ElementHandle) -> BrowserResult<String> {
        let mut state = self.state();
        state.check_interactive()?;
        Ok(state.element_mut(element)?.value.clone())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> BrowserResult<Option<String>> {
        let mut state = self.state();
        state.check_interactive()?;
        Ok(state.element_mut(element)?.attribute(name))
    }

    async fn select_option(&self, element: &ElementHandle, option: &OptionLocator) -> BrowserResult<()> {
        let mut state = self.state();
        state.check_interactive()?;
        let el = state.element_mut(element)?;
        if el.tag != "select" {
            return Err(BrowserError::InvalidArgument(format!("element {} is not a select", element.0)));
        }

        let index = match option {
            OptionLocator::Label(v) => el.options.iter().position(|o| &o.label == v),
            OptionLocator::Value(v) => el.options.iter().position(|o| &o.value == v),
            OptionLocator::Id(v) => el.options.iter().position(|o| o.id.as_ref() == Some(v)),
            OptionLocator::Index(i) => (*i < el.options.len()).then_some(*i),
        }
        .ok_or_else(|| BrowserError::NoSuchOption(option.to_string()))?;

        for (i, o) in el.options.iter_mut().enumerate() {
            o.selected = i == index;
        }
        el.value = el.options[index].value.clone();
        Ok(())
    }

    async fn windows(&self) -> BrowserResult<Vec<WindowInfo>> {
        let mut state = self.state();
        state.check_open()?;
        if state.window_list_failures > 0 {
            state.window_list_failures -= 1;
            return Err(BrowserError::NavigationInProgress);
        }
        Ok(state.windows.iter().map(MemoryWindow::info).collect())
    }

    async fn window_location(&self, handle: &str) -> BrowserResult<String> {
        let state = self.state();
        state.check_open()?;
        let index = state.window_index(handle)?;
        Ok(state.windows[index].page.url.clone())
    }

    async fn select_window(&self, target: Option<&str>) -> BrowserResult<()> {
        let mut state = self.state();
        state.check_open()?;
        let index = match target {
            None => 0,
            Some(target) => state.window_index(target)?,
        };
        state.current = index;
        Ok(())
    }

    async fn close(&self) -> BrowserResult<()> {
        self.state().closed = true;
        Ok(())
    }
}

/// Launches [`MemoryBrowser`] sessions preloaded with a fixed set of pages.
#[derive(Debug, Clone)]
pub struct MemoryBrowserFactory {
    start_url: String,
    pages: Vec<MemoryPage>,
    load_steps: usize,
}

impl MemoryBrowserFactory {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            pages: Vec::new(),
            load_steps: 0,
        }
    }

    pub fn with_page(mut self, page: MemoryPage) -> Self {
        self.pages.push(page);
        self
    }

    pub fn with_load_steps(mut self, steps: usize) -> Self {
        self.load_steps = steps;
        self
    }
}

#[async_trait]
impl BrowserFactory for MemoryBrowserFactory {
    async fn launch(&self, _capabilities: &Value) -> BrowserResult<Arc<dyn BrowserSession>> {
        let browser = MemoryBrowser::new().with_load_steps(self.load_steps);
        for page in &self.pages {
            browser.add_page(page.clone());
        }
        if self.start_url != BLANK_LOCATION {
            browser.open(&self.start_url).await?;
        }
        Ok(Arc::new(browser))
    }
}

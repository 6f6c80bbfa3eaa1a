//! Scripted transport and shell doubles shared by unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use futures::channel::oneshot;
use serde_json::Value;

use crate::error::TransportError;
use crate::navigator::ShellHost;
use crate::transport::{CommandTransport, PageFetcher};

enum Reply<T> {
    Ready(Result<T, TransportError>),
    Held(oneshot::Receiver<Result<T, TransportError>>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> Result<T, TransportError> {
        match self {
            Self::Ready(result) => result,
            Self::Held(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(TransportError::Network("reply dropped".to_string()))),
        }
    }
}

/// Replies are queued per command (or per page path) and consumed in order.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    commands: RefCell<HashMap<String, VecDeque<Reply<Value>>>>,
    pages: RefCell<HashMap<String, VecDeque<Reply<String>>>>,
    calls: RefCell<Vec<(String, Value)>>,
    page_calls: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn reply(&self, command: &str, body: Value) {
        self.push_command(command, Reply::Ready(Ok(body)));
    }

    pub(crate) fn fail(&self, command: &str, error: TransportError) {
        self.push_command(command, Reply::Ready(Err(error)));
    }

    pub(crate) fn hold(&self, command: &str) -> oneshot::Sender<Result<Value, TransportError>> {
        let (sender, receiver) = oneshot::channel();
        self.push_command(command, Reply::Held(receiver));
        sender
    }

    pub(crate) fn page(&self, path: &str, html: &str) {
        self.push_page(path, Reply::Ready(Ok(html.to_string())));
    }

    pub(crate) fn fail_page(&self, path: &str, error: TransportError) {
        self.push_page(path, Reply::Ready(Err(error)));
    }

    pub(crate) fn hold_page(&self, path: &str) -> oneshot::Sender<Result<String, TransportError>> {
        let (sender, receiver) = oneshot::channel();
        self.push_page(path, Reply::Held(receiver));
        sender
    }

    pub(crate) fn calls(&self) -> Vec<(String, Value)> {
        self.calls.borrow().clone()
    }

    pub(crate) fn page_calls(&self) -> Vec<String> {
        self.page_calls.borrow().clone()
    }

    fn push_command(&self, command: &str, reply: Reply<Value>) {
        self.commands
            .borrow_mut()
            .entry(command.to_string())
            .or_default()
            .push_back(reply);
    }

    fn push_page(&self, path: &str, reply: Reply<String>) {
        self.pages
            .borrow_mut()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }
}

#[async_trait(?Send)]
impl CommandTransport for ScriptedTransport {
    async fn call(&self, command: &str, payload: &Value) -> Result<Value, TransportError> {
        self.calls
            .borrow_mut()
            .push((command.to_string(), payload.clone()));
        let reply = self
            .commands
            .borrow_mut()
            .get_mut(command)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(reply) => reply.resolve().await,
            None => Err(TransportError::Network(format!("no scripted reply for {command}"))),
        }
    }
}

#[async_trait(?Send)]
impl PageFetcher for ScriptedTransport {
    async fn fetch_page(&self, page: &str) -> Result<String, TransportError> {
        self.page_calls.borrow_mut().push(page.to_string());
        let reply = self
            .pages
            .borrow_mut()
            .get_mut(page)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(reply) => reply.resolve().await,
            None => Err(TransportError::Status { status: 404 }),
        }
    }
}

/// Records every DOM side effect as a string event.
#[derive(Default)]
pub(crate) struct RecordingHost {
    pub(crate) events: RefCell<Vec<String>>,
    pub(crate) content: RefCell<String>,
    pub(crate) scroll_y: RefCell<f64>,
}

impl RecordingHost {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    fn record(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }
}

impl ShellHost for RecordingHost {
    fn update_active_menu(&self, page: &str) {
        self.record(format!("menu:{page}"));
    }

    fn unbind_scroll(&self) {
        self.record("unbind_scroll");
    }

    fn replace_content(&self, html: &str) {
        html.clone_into(&mut self.content.borrow_mut());
        self.record("replace_content");
    }

    fn content_title(&self) -> Option<String> {
        let content = self.content.borrow();
        let start = content.find("<title>")? + "<title>".len();
        let end = content[start..].find("</title>")? + start;
        Some(content[start..end].to_string())
    }

    fn close_modals(&self) {
        self.record("close_modals");
    }

    fn refresh_tooltips(&self) {
        self.record("refresh_tooltips");
    }

    fn init_filetree(&self) {
        self.record("init_filetree");
    }

    fn scroll_y(&self) -> f64 {
        *self.scroll_y.borrow()
    }

    fn scroll_to(&self, y: f64) {
        *self.scroll_y.borrow_mut() = y;
        self.record(format!("scroll_to:{y}"));
    }

    fn reload(&self) {
        self.record("reload");
    }
}

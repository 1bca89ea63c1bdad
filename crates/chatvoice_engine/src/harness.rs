use chat_logging::chat_debug;
use ego_tree::NodeId;

use crate::dom::{DomError, LiveDocument};

/// URL that always resolves to the first configured platform.
pub const CHAT_TEST_URL: &str = "chrome-extension://chatvoice/chat-test.html";

pub const MAX_MESSAGE_COUNT: usize = 20;

const MESSAGE_TAG: &str = "yt-live-chat-text-message-renderer";

const PAGE_SKELETON: &str = r#"<!DOCTYPE html>
<html>
<head><title>Chat test</title></head>
<body>
<div id="chat"><div id="items"></div></div>
</body>
</html>"#;

/// A local page shaped like a YouTube live chat, fed programmatically.
pub struct ChatTestPage {
    doc: LiveDocument,
    container: NodeId,
    counter: u64,
    retention: usize,
}

impl ChatTestPage {
    pub fn new() -> Result<Self, DomError> {
        Self::with_retention(MAX_MESSAGE_COUNT)
    }

    /// Page that keeps at most `retention` messages.
    pub fn with_retention(retention: usize) -> Result<Self, DomError> {
        let doc = LiveDocument::parse(PAGE_SKELETON);
        let container = doc
            .query_selector("#items")?
            .ok_or(DomError::UnknownNode(doc.root()))?;
        Ok(Self {
            doc,
            container,
            counter: 0,
            retention: retention.max(1),
        })
    }

    pub fn document(&self) -> &LiveDocument {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut LiveDocument {
        &mut self.doc
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Appends one message and drops the oldest beyond the retention limit.
    /// Blank messages and messages without a name are ignored.
    pub fn add_message(&mut self, name: &str, body: &str) -> Result<Option<NodeId>, DomError> {
        if name.is_empty() || body.trim().is_empty() {
            return Ok(None);
        }
        self.counter += 1;
        let fragment = format!(
            r#"<{MESSAGE_TAG} id="{id}"><yt-live-chat-author-chip id="author-name">{name}</yt-live-chat-author-chip><yt-formatted-string id="message">{body}</yt-formatted-string></{MESSAGE_TAG}>"#,
            id = self.counter,
            name = escape_html(name),
            body = escape_html(body),
        );
        let added = self.doc.append_html(self.container, &fragment)?;

        let messages = self.doc.query_selector_all(MESSAGE_TAG)?;
        if messages.len() > self.retention {
            for old in &messages[..messages.len() - self.retention] {
                self.doc.remove(*old)?;
            }
        }
        chat_debug!("Message added: {} {}", name, body);
        Ok(added.first().copied())
    }

    pub fn clear_messages(&mut self) -> Result<(), DomError> {
        self.doc.clear_children(self.container)?;
        self.counter = 0;
        Ok(())
    }

    pub fn message_count(&self) -> usize {
        self.doc.child_count(self.container)
    }

    /// Delivers pending changes to the observers.
    pub fn flush(&mut self) -> usize {
        self.doc.flush()
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

//! Render request scheduling.
//!
//! At most one render is in flight and at most one request waits behind it. A request
//! arriving while a render is running replaces whatever was waiting.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderTicket {
    /// The page is rendered by this request.
    Started { page: u32 },
    /// A render was already running; the page waits in the pending slot.
    Deferred {
        page: u32,
        superseded: Option<u32>,
    },
    /// No document is loaded.
    NoDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderState {
    current_page: u32,
    rendering: bool,
    pending: Option<u32>,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            current_page: 1,
            rendering: false,
            pending: None,
        }
    }
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    pub fn pending(&self) -> Option<u32> {
        self.pending
    }

    /// Record a request for `page`.
    pub fn request(&mut self, page: u32) -> RenderTicket {
        if self.rendering {
            let superseded = self.pending.replace(page);
            return RenderTicket::Deferred { page, superseded };
        }

        self.rendering = true;
        self.current_page = page;
        RenderTicket::Started { page }
    }

    /// Mark the in-flight render finished. Returns the pending page, which becomes the
    /// new in-flight render.
    pub fn finish(&mut self) -> Option<u32> {
        self.rendering = false;
        let next = self.pending.take()?;
        self.rendering = true;
        self.current_page = next;
        Some(next)
    }
}

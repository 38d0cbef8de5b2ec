//! Request lifecycle hooks.
//!
//! ```text
//! parse ──> after-parse hooks ──> dispatch ──> before-send hooks ──> write ──> after-send hooks
//!                 │                               ^
//!                 └──────── Flow::Stop ───────────┘
//! ```

use crate::{Request, Response};

/// Result of an after-parse hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Run the next hook, then dispatch the request.
    #[default]
    Continue,
    /// Skip the remaining after-parse hooks and the dispatch. The response
    /// as it stands is still sent, with the send hooks applied.
    Stop,
}

pub(crate) type AfterParse = Box<dyn Fn(&Request, &mut Response) -> Flow + Send + Sync>;
pub(crate) type BeforeSend = Box<dyn Fn(Option<&Request>, &mut Response) + Send + Sync>;
pub(crate) type AfterSend = Box<dyn Fn(Option<&Request>, &Response) + Send + Sync>;

/// Hooks of the three phases, each run in registration order.
///
/// The send phases receive `None` instead of a request when the request
/// could not be parsed.
#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) after_parse: Vec<AfterParse>,
    pub(crate) before_send: Vec<BeforeSend>,
    pub(crate) after_send: Vec<AfterSend>,
}

impl Hooks {
    #[inline]
    pub(crate) fn after_parse(&self, req: &Request, resp: &mut Response) -> Flow {
        for hook in &self.after_parse {
            if hook(req, resp) == Flow::Stop {
                return Flow::Stop;
            }
        }

        Flow::Continue
    }

    #[inline]
    pub(crate) fn before_send(&self, req: Option<&Request>, resp: &mut Response) {
        self.before_send.iter().for_each(|hook| hook(req, resp));
    }

    #[inline]
    pub(crate) fn after_send(&self, req: Option<&Request>, resp: &Response) {
        self.after_send.iter().for_each(|hook| hook(req, resp));
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("after_parse", &self.after_parse.len())
            .field("before_send", &self.before_send.len())
            .field("after_send", &self.after_send.len())
            .finish()
    }
}

//! Ordered first-match-wins line dispatch.

use super::messages::MessageKind;

/// A handler bound to one message kind. Returning `false` declines the line,
/// letting later bindings see it.
pub type Action<C> = fn(&mut C, &[&str]) -> bool;

/// A line decoder built from (kind, action) bindings.
///
/// Bindings are tried in registration order. The first kind whose pattern
/// matches has its action invoked with the captured fields; the action's
/// return value decides whether the line counts as handled. Actions take an
/// explicit context instead of capturing environment, so one table can be
/// built ahead of a read loop and reused for every line.
pub struct Dispatcher<C> {
    bindings: Vec<(&'static MessageKind, Action<C>)>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Dispatcher<C> {
    pub fn new() -> Self {
        Self { bindings: Vec::new() }
    }

    /// Append a binding. Registration order is evaluation order.
    #[must_use]
    pub fn on(mut self, kind: &'static MessageKind, action: Action<C>) -> Self {
        self.bindings.push((kind, action));
        self
    }

    /// Decode one line against the table. Returns whether any binding
    /// handled it; an unmatched line is not an error.
    pub fn dispatch(&self, ctx: &mut C, line: &str) -> bool {
        for (kind, action) in &self.bindings {
            if let Some(fields) = kind.parse(line)
                && action(ctx, &fields)
            {
                return true;
            }
        }
        false
    }
}

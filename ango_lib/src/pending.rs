use std::collections::{hash_map::Entry, HashMap};

use ango_idl::Procedure;
use tokio::sync::oneshot;

use crate::error::CallError;
use crate::messages::CallbackId;
use crate::values::Values;

pub(crate) type Reply = oneshot::Sender<Result<Values, CallError>>;

pub(crate) struct PendingCall {
    /// Its return list decodes the response.
    pub procedure: Procedure,
    pub reply: Reply,
}

/// Outbound two-way calls on one connection that are waiting for a response.
pub(crate) struct PendingCalls {
    awaiting: HashMap<CallbackId, PendingCall>,
    next_callback_id: CallbackId,
}
impl PendingCalls {
    pub(crate) fn new() -> Self {
        PendingCalls {
            awaiting: HashMap::new(),
            next_callback_id: CallbackId(1),
        }
    }

    /// Add a call to the collection, and return its callback ID.
    #[must_use]
    pub(crate) fn register(&mut self, call: PendingCall) -> CallbackId {
        // Keep trying new callback IDs until one is available. Ids only
        // repeat after wrapping around, and only calls that are still
        // waiting occupy one.
        loop {
            match self.awaiting.entry(self.next_callback_id) {
                Entry::Vacant(entry) => {
                    entry.insert(call);
                    let curr_callback_id = self.next_callback_id;
                    self.next_callback_id.increment();
                    return curr_callback_id;
                }
                Entry::Occupied(_) => {
                    self.next_callback_id.increment();
                }
            }
        }
    }

    /// Removes and returns the call waiting on `callback_id`, if any.
    pub(crate) fn take(&mut self, callback_id: CallbackId) -> Option<PendingCall> {
        self.awaiting.remove(&callback_id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.awaiting.len()
    }
}

#[cfg(test)]
mod tests {
    use ango_idl::parse_str;

    use super::*;

    fn pending_call() -> (PendingCall, oneshot::Receiver<Result<Values, CallError>>) {
        let service = parse_str("name x\nserver get()(n int)").unwrap();
        let (reply, rx) = oneshot::channel();
        let call = PendingCall {
            procedure: service.server_procedures["get"].clone(),
            reply,
        };
        (call, rx)
    }

    #[test]
    fn ids_are_unique_while_waiting() {
        let mut pending = PendingCalls::new();
        let first = pending.register(pending_call().0);
        let second = pending.register(pending_call().0);
        assert_eq!(CallbackId(1), first);
        assert_eq!(CallbackId(2), second);

        assert!(pending.take(first).is_some());
        assert!(pending.take(first).is_none());
        assert_eq!(1, pending.len());
    }

    #[test]
    fn wrapping_skips_occupied_ids() {
        let mut pending = PendingCalls::new();
        let first = pending.register(pending_call().0);
        pending.next_callback_id = CallbackId(u64::MAX);
        assert_eq!(CallbackId(u64::MAX), pending.register(pending_call().0));
        // 0 is skipped and 1 is still taken by `first`.
        assert_eq!(CallbackId(2), pending.register(pending_call().0));
        assert!(pending.take(first).is_some());
    }
}

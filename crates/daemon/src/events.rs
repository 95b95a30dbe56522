//! Inbound event classification.

use backchannel_common::InboundEvent;

/// Why an event was rejected before any route work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Carries a message subtype (edit, deletion, join, ...).
    Subtype,
    /// Authored by a bot, including ourselves.
    BotMessage,
    /// Not a direct-message channel.
    NotDirectMessage,
    /// No thread reference at all.
    NoThread,
    /// The thread reference is the event's own timestamp: a thread root,
    /// not a reply.
    NotReply,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subtype => "subtype",
            Self::BotMessage => "bot_message",
            Self::NotDirectMessage => "not_direct_message",
            Self::NoThread => "no_thread",
            Self::NotReply => "not_reply",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reject events that cannot be a user's threaded reply. `None` means the
/// event proceeds to route resolution.
pub fn classify(event: &InboundEvent) -> Option<SkipReason> {
    if event.subtype.is_some() {
        return Some(SkipReason::Subtype);
    }
    if event.bot_id.is_some() {
        return Some(SkipReason::BotMessage);
    }
    if let Some(kind) = &event.channel_type
        && kind != "im"
    {
        return Some(SkipReason::NotDirectMessage);
    }
    let Some(thread_ts) = &event.thread_ts else {
        return Some(SkipReason::NoThread);
    };
    if *thread_ts == event.ts {
        return Some(SkipReason::NotReply);
    }
    None
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn reply_event() -> InboundEvent {
        InboundEvent {
            channel: "D123".into(),
            channel_type: Some("im".into()),
            ts: "1700000001.000000".into(),
            thread_ts: Some("1700000000.000000".into()),
            text: "go ahead".into(),
            user: Some("U123".into()),
            bot_id: None,
            subtype: None,
        }
    }

    #[test]
    fn plain_threaded_reply_passes() {
        assert_eq!(classify(&reply_event()), None);
    }

    #[test]
    fn subtype_is_rejected() {
        let mut event = reply_event();
        event.subtype = Some("message_changed".into());
        assert_eq!(classify(&event), Some(SkipReason::Subtype));
        assert_eq!(classify(&event).unwrap().as_str(), "subtype");
    }

    #[test]
    fn bot_message_is_rejected() {
        let mut event = reply_event();
        event.bot_id = Some("B999".into());
        assert_eq!(classify(&event), Some(SkipReason::BotMessage));
    }

    #[test]
    fn non_dm_channel_is_rejected() {
        let mut event = reply_event();
        event.channel_type = Some("channel".into());
        assert_eq!(classify(&event), Some(SkipReason::NotDirectMessage));
    }

    #[test]
    fn absent_channel_type_is_not_rejected() {
        let mut event = reply_event();
        event.channel_type = None;
        assert_eq!(classify(&event), None);
    }

    #[test]
    fn unthreaded_message_is_rejected() {
        let mut event = reply_event();
        event.thread_ts = None;
        assert_eq!(classify(&event), Some(SkipReason::NoThread));
    }

    #[test]
    fn thread_root_is_not_a_reply() {
        let mut event = reply_event();
        event.thread_ts = Some(event.ts.clone());
        assert_eq!(classify(&event), Some(SkipReason::NotReply));
    }

    #[test]
    fn subtype_wins_over_other_reasons() {
        let mut event = reply_event();
        event.subtype = Some("message_deleted".into());
        event.bot_id = Some("B999".into());
        event.thread_ts = None;
        assert_eq!(classify(&event), Some(SkipReason::Subtype));
    }
}

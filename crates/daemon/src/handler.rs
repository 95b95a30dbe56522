//! Per-event handling chain.
//!
//! Each inbound event gets a correlation id threaded through every log
//! line, so one event's end-to-end trace can be reconstructed from
//! interleaved daemon logs. Within a chain the steps are strictly
//! sequential and the resume subprocess blocks the chain until it exits;
//! other events' chains are unaffected.

use std::{path::Path, sync::Arc, time::Instant};

use {
    async_trait::async_trait,
    backchannel_common::{InboundEvent, InboundSink, ThreadMessenger},
    backchannel_resume::ResumeRunner,
    backchannel_routes::RouteStore,
    tracing::{debug, error, info, warn},
    uuid::Uuid,
};

use crate::{
    events::classify,
    messages::{
        ROUTE_NOT_RECOGNIZED_MESSAGE, RESUME_FAILED_MESSAGE, build_reply_received_message,
        build_resume_failed_message, format_error_head,
    },
};

/// Event router over its three seams: the route ledger, the messaging
/// platform, and the resume executor.
pub struct Handler {
    routes: Arc<RouteStore>,
    messenger: Arc<dyn ThreadMessenger>,
    runner: Arc<dyn ResumeRunner>,
}

impl Handler {
    pub fn new(
        routes: Arc<RouteStore>,
        messenger: Arc<dyn ThreadMessenger>,
        runner: Arc<dyn ResumeRunner>,
    ) -> Self {
        Self {
            routes,
            messenger,
            runner,
        }
    }

    /// Run one event through the chain. All failures are logged and scoped
    /// to this event; nothing propagates to the dispatch loop.
    pub async fn handle_event(&self, event: InboundEvent) {
        let correlation_id = Uuid::new_v4();
        let started = Instant::now();

        if let Some(reason) = classify(&event) {
            debug!(%correlation_id, reason = %reason, "event skipped");
            return;
        }
        // classify() guarantees a thread reference past this point.
        let Some(thread_ts) = event.thread_ts.clone() else {
            return;
        };

        let text = event.text.trim();
        if text.is_empty() {
            debug!(%correlation_id, "empty body, skipping");
            return;
        }

        let route = match self.routes.find(&event.channel, &thread_ts).await {
            Ok(route) => route,
            Err(e) => {
                error!(%correlation_id, error = %e, "route lookup failed");
                return;
            },
        };
        let Some(route) = route else {
            warn!(
                %correlation_id,
                channel = %event.channel,
                thread_ts = %thread_ts,
                "no route for thread"
            );
            self.reply(
                &correlation_id,
                &event.channel,
                &thread_ts,
                ROUTE_NOT_RECOGNIZED_MESSAGE,
                "route-miss notice",
            )
            .await;
            return;
        };

        info!(
            %correlation_id,
            tool = %route.tool,
            session_id = %route.session_id,
            cwd = %route.cwd,
            input_len = text.len(),
            "dispatching reply as resume"
        );
        let ack = build_reply_received_message(route.tool, &route.session_id, &route.cwd);
        self.reply(&correlation_id, &event.channel, &thread_ts, &ack, "ack")
            .await;

        let cwd = if route.cwd.is_empty() {
            None
        } else {
            Some(Path::new(route.cwd.as_str()))
        };
        let result = match self
            .runner
            .resume(route.tool, &route.session_id, text, cwd)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                error!(%correlation_id, tool = %route.tool, error = %e, "resume spawn failed");
                self.reply(
                    &correlation_id,
                    &event.channel,
                    &thread_ts,
                    RESUME_FAILED_MESSAGE,
                    "spawn failure notice",
                )
                .await;
                return;
            },
        };

        info!(
            %correlation_id,
            tool = %route.tool,
            exit_code = ?result.exit_code,
            signal = ?result.signal,
            stdout_len = result.stdout_len,
            stderr_len = result.stderr_len,
            stdout_head = %format_error_head(&result.stdout_head),
            stderr_head = %format_error_head(&result.stderr_head),
            "resume finished"
        );

        if !result.success() {
            let failure = build_resume_failed_message(&result);
            self.reply(
                &correlation_id,
                &event.channel,
                &thread_ts,
                &failure,
                "failure notice",
            )
            .await;
        }

        info!(
            %correlation_id,
            duration_ms = started.elapsed().as_millis() as u64,
            "event handled"
        );
    }

    async fn reply(
        &self,
        correlation_id: &Uuid,
        channel: &str,
        thread_ts: &str,
        text: &str,
        label: &'static str,
    ) {
        if let Err(e) = self
            .messenger
            .post_thread_reply(channel, thread_ts, text)
            .await
        {
            error!(%correlation_id, label, error = %e, "thread reply failed");
        }
    }
}

#[async_trait]
impl InboundSink for Handler {
    async fn dispatch(&self, event: InboundEvent) {
        self.handle_event(event).await;
    }
}

//! C6: the event loop (`main_thread`). Single consumer of the event queue;
//! routes each event by kind per spec §4.6.

use tokio::sync::mpsc;
use tracing::trace;

use crate::collaborators::{PpgCollaborator, WspCollaborator};
use crate::event::{Event, FetchInvoke, WspReply};
use crate::fetch::{self, FetchContext};
use crate::push;

/// Everything the event loop needs beyond the event itself: the WSP
/// collaborator, the optional PPG collaborator (absent iff push support
/// isn't configured), and the fetch pipeline's own context.
pub struct EventLoopContext<'a> {
    pub wsp: &'a dyn WspCollaborator,
    pub ppg: Option<&'a dyn PpgCollaborator>,
    pub fetch_ctx: &'a FetchContext<'a>,
}

/// Run the loop until the queue is closed (producer count reaches zero and
/// the channel drains), i.e. until `events.recv()` returns `None`.
pub async fn run(mut events: mpsc::Receiver<Event>, ctx: EventLoopContext<'_>) {
    while let Some(event) = events.recv().await {
        handle_event(event, &ctx).await;
    }
}

pub async fn handle_event(event: Event, ctx: &EventLoopContext<'_>) {
    match event {
        Event::MethodInvokeInd(invoke) => {
            ctx.wsp
                .session_dispatch_event(WspReply::MethodInvokeRes {
                    server_transaction_id: invoke.server_transaction_id,
                    session_id: invoke.session_id,
                })
                .await;
            fetch::start_fetch(FetchInvoke::Session(invoke), ctx.fetch_ctx).await;
        }
        Event::UnitMethodInvokeInd(invoke) => {
            fetch::start_fetch(FetchInvoke::Unit(invoke), ctx.fetch_ctx).await;
        }
        Event::ConnectInd(connect) => {
            let has_push_session = ctx
                .ppg
                .is_some_and(|ppg| ppg.have_push_session_for(&connect.addr_tuple));
            if has_push_session {
                push::indicate_push_connection(&connect, ctx.ppg.unwrap()).await;
            } else {
                ctx.wsp
                    .session_dispatch_event(WspReply::ConnectRes {
                        session_id: connect.session_id,
                        // No PPG path: accept client proposals, let WSP apply
                        // its own defaults (spec §4.8 capability policy).
                        negotiated_capabilities: Vec::new(),
                    })
                    .await;
            }
        }
        Event::DisconnectInd(disconnect) => {
            let has_push_session = ctx
                .ppg
                .is_some_and(|ppg| ppg.have_push_session_for(&disconnect.addr_tuple));
            if has_push_session {
                push::indicate_push_disconnect(&disconnect, ctx.ppg.unwrap()).await;
            }
        }
        Event::SuspendInd(suspend) => {
            let has_push_session = ctx
                .ppg
                .is_some_and(|ppg| ppg.have_push_session_for_sid(suspend.session_id));
            if has_push_session {
                push::indicate_push_suspend(&suspend, ctx.ppg.unwrap()).await;
            }
        }
        Event::ResumeInd(resume) => {
            let has_push_session = ctx
                .ppg
                .is_some_and(|ppg| ppg.have_push_session_for(&resume.addr_tuple));
            if has_push_session {
                push::indicate_push_resume(&resume, ctx.ppg.unwrap()).await;
            } else {
                ctx.wsp
                    .session_dispatch_event(WspReply::ResumeRes {
                        session_id: resume.session_id,
                        server_headers: None,
                    })
                    .await;
            }
        }
        Event::MethodResultCnf(_) => {
            trace!("S_MethodResult_Cnf: no-op");
        }
        Event::ConfirmedPushCnf(confirmed) => {
            if let Some(ppg) = ctx.ppg {
                push::confirm_push(&confirmed, ppg).await;
            }
        }
        Event::MethodAbortInd(_) => {
            // TODO: cancel the in-flight fetch correlated with
            // server_transaction_id once the HttpCaller exposes a
            // cancellation handle (spec §9 open question).
        }
        Event::PushAbortInd(abort) => {
            if let Some(ppg) = ctx.ppg {
                push::indicate_push_abort(&abort, ppg).await;
            }
        }
        Event::PomConnectRes(response) => {
            push::response_push_connection(&response, ctx.wsp).await;
        }
    }
}

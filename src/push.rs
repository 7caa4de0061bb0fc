//! C8: the push OTA adapter. Translates WSP push-related session primitives
//! into Push Proxy Gateway events and back.
//!
//! Grounded on the original's `indicate_push_connection`/
//! `indicate_push_disconnect`/`confirm_push`/`indicate_push_abort`/
//! `indicate_push_suspend`/`indicate_push_resume`/`response_push_connection`.

use tracing::warn;

use crate::collaborators::{PpgCollaborator, WspCollaborator};
use crate::event::{
    ConfirmedPushCnf, ConnectInd, DisconnectInd, PomConnectRes, PpgEvent, PushAbortInd, ResumeInd,
    SuspendInd, WspReply,
};
use crate::headers;

/// `S_Connect_Ind` with an open push session: build and dispatch `Pom_Connect_Ind`.
pub async fn indicate_push_connection(connect: &ConnectInd, ppg: &dyn PpgCollaborator) {
    let accept_application = headers::check_application_headers(&connect.client_headers);
    let bearer_indication = match headers::decode_bearer_indication(&connect.client_headers) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!(error = %err, "dropping bearer-indication header");
            None
        }
    };
    let (_, push_headers) = headers::split_header_list(
        connect.client_headers.clone(),
        "Accept-Application",
    );
    let (_, push_headers) = headers::split_header_list(push_headers, "Bearer-Indication");

    ppg.ppg_dispatch_event(PpgEvent::PomConnectInd {
        addr_tuple: connect.addr_tuple.clone(),
        requested_capabilities: connect.requested_capabilities.clone(),
        accept_application,
        bearer_indication,
        push_headers,
        session_id: connect.session_id,
    })
    .await;
}

/// `S_Disconnect_Ind` with a push session: dispatch `Pom_Disconnect_Ind`.
pub async fn indicate_push_disconnect(disconnect: &DisconnectInd, ppg: &dyn PpgCollaborator) {
    ppg.ppg_dispatch_event(PpgEvent::PomDisconnectInd {
        reason_code: disconnect.reason_code,
        error_headers: disconnect.error_headers.clone(),
        error_body: disconnect.error_body.clone(),
        session_handle: disconnect.session_id,
    })
    .await;
}

/// `S_ConfirmedPush_Cnf`: dispatch `Po_ConfirmedPush_Cnf`.
pub async fn confirm_push(confirmed: &ConfirmedPushCnf, ppg: &dyn PpgCollaborator) {
    ppg.ppg_dispatch_event(PpgEvent::PoConfirmedPushCnf {
        server_push_id: confirmed.server_push_id,
        session_handle: confirmed.session_id,
    })
    .await;
}

/// `S_PushAbort_Ind`: dispatch `Po_PushAbort_Ind`.
pub async fn indicate_push_abort(abort: &PushAbortInd, ppg: &dyn PpgCollaborator) {
    ppg.ppg_dispatch_event(PpgEvent::PoPushAbortInd {
        push_id: abort.push_id,
        reason: abort.reason,
        session_handle: abort.session_id,
    })
    .await;
}

/// `S_Suspend_Ind` with a push session: dispatch `Pom_Suspend_Ind`.
pub async fn indicate_push_suspend(suspend: &SuspendInd, ppg: &dyn PpgCollaborator) {
    ppg.ppg_dispatch_event(PpgEvent::PomSuspendInd {
        reason: suspend.reason,
        session_id: suspend.session_id,
    })
    .await;
}

/// `S_Resume_Ind` with a push session: dispatch `Pom_Resume_Ind`.
pub async fn indicate_push_resume(resume: &ResumeInd, ppg: &dyn PpgCollaborator) {
    let bearer_indication = match headers::decode_bearer_indication(&resume.client_headers) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!(error = %err, "dropping bearer-indication header");
            None
        }
    };
    let (_, client_headers) =
        headers::split_header_list(resume.client_headers.clone(), "Bearer-Indication");

    ppg.ppg_dispatch_event(PpgEvent::PomResumeInd {
        addr_tuple: resume.addr_tuple.clone(),
        bearer_indication,
        client_headers,
        session_id: resume.session_id,
    })
    .await;
}

/// `Pom_Connect_Res`: build and dispatch `S_Connect_Res` toward WSP.
pub async fn response_push_connection(response: &PomConnectRes, wsp: &dyn WspCollaborator) {
    wsp.session_dispatch_event(WspReply::ConnectRes {
        session_id: response.session_id,
        negotiated_capabilities: response.negotiated_capabilities.clone(),
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::tests::{RecordingPpg, RecordingWsp};
    use crate::event::AddrTuple;

    #[tokio::test]
    async fn connect_without_accept_application_defaults_to_wml_ua() {
        let ppg = RecordingPpg::default();
        let connect = ConnectInd {
            session_id: 5,
            addr_tuple: AddrTuple::default(),
            client_headers: Vec::new(),
            requested_capabilities: vec!["1.2".to_string()],
        };

        indicate_push_connection(&connect, &ppg).await;

        let events = ppg.events.lock().unwrap();
        match &events[0] {
            PpgEvent::PomConnectInd {
                accept_application,
                bearer_indication,
                ..
            } => {
                assert_eq!(accept_application, &vec!["wml ua".to_string()]);
                assert!(bearer_indication.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn connect_strips_push_headers_from_remainder() {
        let ppg = RecordingPpg::default();
        let connect = ConnectInd {
            session_id: 5,
            addr_tuple: AddrTuple::default(),
            client_headers: vec![
                ("Accept-Application".to_string(), "0".to_string()),
                ("Bearer-Indication".to_string(), "9".to_string()),
                ("X-Custom".to_string(), "keep".to_string()),
            ],
            requested_capabilities: Vec::new(),
        };

        indicate_push_connection(&connect, &ppg).await;

        match &ppg.events.lock().unwrap()[0] {
            PpgEvent::PomConnectInd {
                bearer_indication,
                push_headers,
                ..
            } => {
                assert_eq!(bearer_indication.as_deref(), Some("http"));
                assert_eq!(
                    push_headers,
                    &vec![("X-Custom".to_string(), "keep".to_string())]
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn response_push_connection_dispatches_connect_res() {
        let wsp = RecordingWsp::default();
        let response = PomConnectRes {
            session_id: 3,
            negotiated_capabilities: vec!["1.2".to_string()],
        };

        response_push_connection(&response, &wsp).await;

        match &wsp.session_replies.lock().unwrap()[0] {
            WspReply::ConnectRes {
                session_id,
                negotiated_capabilities,
            } => {
                assert_eq!(*session_id, 3);
                assert_eq!(negotiated_capabilities, &vec!["1.2".to_string()]);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}

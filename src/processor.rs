//! Processor Tasks - event and API request processing
//!
//! Two loops share the global `HfpHost` behind its mutex: the event
//! processor consumes one inbound event at a time (telephony notifications,
//! result-code lines, lifecycle changes) and the request processor serves
//! client API calls. Every side effect the engines decide on is forwarded
//! through the action channel for the transport/audio/observer glue to
//! perform; nothing here touches hardware.
//!
//! # Usage
//!
//! Spawn [`run`] as an Embassy task:
//!
//! ```rust,no_run
//! use handsfree::processor;
//!
//! async fn hfp_task() {
//!     processor::run().await;
//! }
//! ```
//!
//! # Architecture
//!
//! * **Event Processor**: drains the event channel, drives both engines,
//!   fans resulting actions out and resolves pending client requests
//! * **Request Processor**: validates API requests, issues the matching
//!   engine operation, and answers immediately when no peer round trip is
//!   needed

use crate::{
    ACTION_CHANNEL, Action, EVENT_CHANNEL, HfpError, HfpEvent, HfpHost, REQUEST_CHANNEL,
    RESPONSE_CHANNEL, Request, Response,
    constants::MAX_ACTIONS,
    hf::{HfAction, HfError},
    hfp_host, status,
};
use heapless::Vec;

async fn event_processor() -> ! {
    let receiver = EVENT_CHANNEL.receiver();

    loop {
        let event = receiver.receive().await;
        defmt::debug!("[PROCESSOR] event: {:?}", defmt::Debug2Format(&event));

        let (actions, response) = match hfp_host().await {
            Ok(mut host) => {
                let raw = process_event(&mut host, event);
                split_client_results(&mut host, raw)
            }
            Err(e) => {
                defmt::error!("[PROCESSOR] HfpHost not initialized: {}", e);
                (Vec::new(), None)
            }
        };

        if let Some(response) = response {
            RESPONSE_CHANNEL.sender().send(response).await;
        }
        for action in actions {
            ACTION_CHANNEL.sender().send(action).await;
        }
    }
}

/// Drive the engines for one inbound event
fn process_event(host: &mut HfpHost, event: HfpEvent) -> Vec<Action, MAX_ACTIONS> {
    let mut actions = Vec::new();

    match event {
        HfpEvent::CallList(lines) => {
            collect_ag(&mut actions, host.ag.handle_call_list(&lines));
        }
        HfpEvent::Battery(percent) => {
            collect_ag(&mut actions, host.ag.handle_battery(percent));
        }
        HfpEvent::Signal { bars, max_bars } => {
            collect_ag(&mut actions, host.ag.handle_signal(bars, max_bars));
        }
        HfpEvent::Registration { state, operator } => {
            collect_ag(
                &mut actions,
                host.ag.handle_registration(&state, operator.as_deref()),
            );
        }
        HfpEvent::Roaming(roaming) => {
            collect_ag(&mut actions, host.ag.handle_roaming(roaming));
        }
        HfpEvent::CallVolume(volume) => {
            collect_ag(&mut actions, host.ag.handle_volume_changed(volume));
        }
        HfpEvent::SubscriberNumber(number) => {
            collect_ag(&mut actions, host.ag.send_subscriber_number(number.as_deref()));
        }
        HfpEvent::AtCommand { at_type, command, arguments } => {
            collect_ag(
                &mut actions,
                host.ag.handle_at_command(at_type, &command, &arguments),
            );
        }
        HfpEvent::PeerConnected(address) => {
            host.ag.device_connected(address);
        }
        HfpEvent::PeerDisconnected(address) => {
            host.ag.device_disconnected(address);
        }
        HfpEvent::ResultCode { adapter, device, line } => {
            for action in host.hf.handle_result_code(adapter, device, &line) {
                actions.push(Action::Hf(action)).ok();
            }
        }
        HfpEvent::DeviceConnected { adapter, device } => {
            match host.hf.device_connected(adapter, device) {
                Ok(()) => {
                    actions.push(Action::Hf(HfAction::NotifyObservers)).ok();
                }
                Err(e) => defmt::warn!("[PROCESSOR] device connect failed: {}", e),
            }
        }
        HfpEvent::DeviceDisconnected { adapter, device } => {
            match host.hf.device_disconnected(adapter, device) {
                Ok(()) => {
                    actions.push(Action::Hf(HfAction::NotifyObservers)).ok();
                }
                Err(e) => defmt::warn!("[PROCESSOR] device disconnect failed: {}", e),
            }
        }
        HfpEvent::AdapterRemoved(adapter) => match host.hf.adapter_removed(adapter) {
            Ok(()) => {
                actions.push(Action::Hf(HfAction::NotifyObservers)).ok();
            }
            Err(e) => defmt::warn!("[PROCESSOR] adapter removal failed: {}", e),
        },
        HfpEvent::ScoState { adapter, device, connected } => {
            match host.hf.update_sco(adapter, device, connected) {
                Ok(true) => {
                    actions.push(Action::Hf(HfAction::NotifyObservers)).ok();
                }
                Ok(false) => {}
                Err(e) => defmt::warn!("[PROCESSOR] SCO update failed: {}", e),
            }
        }
    }

    actions
}

fn collect_ag(
    actions: &mut Vec<Action, MAX_ACTIONS>,
    produced: Vec<crate::ag::AgAction, MAX_ACTIONS>,
) {
    for action in produced {
        actions.push(Action::Ag(action)).ok();
    }
}

/// Separate client-request results from actions bound for the glue layer
///
/// A command result only answers the response channel while a client is
/// actually waiting; result codes for engine-issued commands are dropped
/// here.
fn split_client_results(
    host: &mut HfpHost,
    raw: Vec<Action, MAX_ACTIONS>,
) -> (Vec<Action, MAX_ACTIONS>, Option<Response>) {
    let mut outbound = Vec::new();
    let mut response = None;

    for action in raw {
        if let Action::Hf(HfAction::RespondClient { success, .. }) = action {
            if host.client_waiting {
                host.client_waiting = false;
                response = Some(if success {
                    Response::Complete
                } else {
                    Response::Error(HfpError::Rejected)
                });
            } else {
                defmt::debug!("[PROCESSOR] dropping unsolicited command result");
            }
        } else {
            outbound.push(action).ok();
        }
    }

    (outbound, response)
}

async fn request_processor() -> ! {
    let receiver = REQUEST_CHANNEL.receiver();
    let sender = RESPONSE_CHANNEL.sender();

    loop {
        let request = receiver.receive().await;
        defmt::debug!(
            "[PROCESSOR] API request: {:?}",
            defmt::Debug2Format(&request)
        );

        let (actions, immediate) = match hfp_host().await {
            Ok(mut host) => process_request(&mut host, request),
            Err(e) => {
                defmt::error!("[PROCESSOR] HfpHost not initialized: {}", e);
                (Vec::new(), Some(Response::Error(HfpError::Internal)))
            }
        };

        if let Some(response) = immediate {
            sender.send(response).await;
        }
        for action in actions {
            ACTION_CHANNEL.sender().send(action).await;
        }
    }
}

fn process_request(
    host: &mut HfpHost,
    request: Request,
) -> (Vec<Action, MAX_ACTIONS>, Option<Response>) {
    match request {
        Request::GetStatus => {
            let snapshots = status::device_snapshots(host.hf.registry());
            (Vec::new(), Some(Response::Status(snapshots)))
        }
        Request::AnswerCall(device) => command_result(host, |hf| hf.answer_call(device)),
        Request::TerminateCall(device) => command_result(host, |hf| hf.terminate_call(device)),
        Request::Dial(device, number) => command_result(host, |hf| hf.dial(device, &number)),
        Request::ReleaseHeldCalls(device) => {
            command_result(host, |hf| hf.release_held_calls(device))
        }
        Request::ReleaseActiveCalls(device) => {
            command_result(host, |hf| hf.release_active_calls(device))
        }
        Request::HoldActiveCalls(device) => {
            command_result(host, |hf| hf.hold_active_calls(device))
        }
        Request::MergeCalls(device) => command_result(host, |hf| hf.merge_calls(device)),
        Request::SetVolume(device, gain) => command_result(host, |hf| hf.set_volume(device, gain)),
        Request::SetVoiceRecognition(device, enable) => {
            command_result(host, |hf| hf.set_voice_recognition(device, enable))
        }
    }
}

/// Turn an engine command operation into channel traffic
///
/// A failed operation answers immediately; an issued command leaves the
/// client waiting for the peer's acknowledgement; an empty action list means
/// nothing needed sending and the request already holds.
fn command_result(
    host: &mut HfpHost,
    op: impl FnOnce(&mut crate::hf::HfEngine) -> Result<Vec<HfAction, MAX_ACTIONS>, HfError>,
) -> (Vec<Action, MAX_ACTIONS>, Option<Response>) {
    match op(&mut host.hf) {
        Err(e) => (Vec::new(), Some(Response::Error(e.into()))),
        Ok(produced) if produced.is_empty() => (Vec::new(), Some(Response::Complete)),
        Ok(produced) => {
            host.client_waiting = true;
            let mut actions = Vec::new();
            for action in produced {
                actions.push(Action::Hf(action)).ok();
            }
            (actions, None)
        }
    }
}

/// Run the HFP host processor tasks
///
/// # Panics
///
/// Panics if host initialization fails, i.e. if [`crate::init_hfp_host`]
/// was already called.
pub async fn run() {
    crate::init_hfp_host()
        .await
        .expect("Failed to initialize HFP host");

    embassy_futures::select::select(event_processor(), request_processor()).await;
}

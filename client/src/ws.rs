use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket, Window};

use defectlog_shared::{ClientMessage, ServerMessage};

use crate::net::websocket_url;

#[derive(Debug)]
pub enum WsEvent {
    Open,
    Close,
    Error,
    Message(ServerMessage),
}

pub struct WsSender {
    socket: WebSocket,
}

impl WsSender {
    pub fn is_open(&self) -> bool {
        self.socket.ready_state() == WebSocket::OPEN
    }

    /// Returns false when the message could not be handed to the socket.
    pub fn send(&self, message: &ClientMessage) -> bool {
        if !self.is_open() {
            return false;
        }
        match bincode::encode_to_vec(message, bincode::config::standard()) {
            Ok(payload) => self.socket.send_with_u8_array(&payload).is_ok(),
            Err(error) => {
                web_sys::console::error_1(&format!("WS encode error: {error}").into());
                false
            }
        }
    }
}

fn navigator_field(window: &Window, field: &str) -> Option<JsValue> {
    let navigator = Reflect::get(window.as_ref(), &JsValue::from_str("navigator")).ok()?;
    Reflect::get(&navigator, &JsValue::from_str(field)).ok()
}

// Mobile Safari can leave a fresh socket stuck in CONNECTING until some
// other request goes out.
fn should_kick_safari_ws(window: &Window) -> bool {
    let ua = navigator_field(window, "userAgent")
        .and_then(|value| value.as_string())
        .unwrap_or_default();
    let is_safari = ua.contains("Safari")
        && !ua.contains("Chrome")
        && !ua.contains("CriOS")
        && !ua.contains("FxiOS")
        && !ua.contains("Edg");
    let touch = navigator_field(window, "maxTouchPoints")
        .and_then(|value| value.as_f64())
        .unwrap_or(0.0)
        > 1.0;
    is_safari && touch
}

fn ping_url() -> String {
    let now = js_sys::Date::now() as u64;
    format!("/ping?t={now}")
}

fn decode_event(event: &MessageEvent) -> Option<ServerMessage> {
    if let Ok(buffer) = event.data().dyn_into::<js_sys::ArrayBuffer>() {
        let bytes = Uint8Array::new(&buffer).to_vec();
        return match bincode::decode_from_slice::<ServerMessage, _>(
            &bytes,
            bincode::config::standard(),
        ) {
            Ok((message, _)) => Some(message),
            Err(error) => {
                web_sys::console::error_1(
                    &format!("WS message bincode parse error: {error}").into(),
                );
                None
            }
        };
    }
    if let Some(text) = event.data().as_string() {
        return match serde_json::from_str::<ServerMessage>(&text) {
            Ok(message) => Some(message),
            Err(error) => {
                web_sys::console::error_1(
                    &format!("WS message JSON parse error: {error}").into(),
                );
                None
            }
        };
    }
    web_sys::console::error_2(
        &"WS message data is not a string or arraybuffer".into(),
        &event.data(),
    );
    None
}

type EventSink = Rc<RefCell<dyn FnMut(WsEvent)>>;

fn emit(sink: &EventSink, event: WsEvent) {
    sink.borrow_mut()(event);
}

pub fn connect_ws(
    window: &Window,
    on_event: impl 'static + FnMut(WsEvent),
) -> Result<Rc<WsSender>, JsValue> {
    let ws_url = websocket_url(window)?;
    let socket = WebSocket::new(&ws_url)?;
    let _ = Reflect::set(
        socket.as_ref(),
        &JsValue::from_str("binaryType"),
        &JsValue::from_str("arraybuffer"),
    );

    let sender = Rc::new(WsSender {
        socket: socket.clone(),
    });

    let on_event: EventSink = Rc::new(RefCell::new(on_event));

    let onopen = {
        let on_event = on_event.clone();
        Closure::<dyn FnMut(Event)>::new(move |_| emit(&on_event, WsEvent::Open))
    };
    socket.set_onopen(Some(onopen.as_ref().unchecked_ref()));
    onopen.forget();

    let onclose = {
        let on_event = on_event.clone();
        Closure::<dyn FnMut(CloseEvent)>::new(move |_| emit(&on_event, WsEvent::Close))
    };
    socket.set_onclose(Some(onclose.as_ref().unchecked_ref()));
    onclose.forget();

    let onerror = {
        let on_event = on_event.clone();
        Closure::<dyn FnMut(Event)>::new(move |_| emit(&on_event, WsEvent::Error))
    };
    socket.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    onerror.forget();

    let onmessage = {
        let on_event = on_event.clone();
        Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            if let Some(message) = decode_event(&event) {
                emit(&on_event, WsEvent::Message(message));
            }
        })
    };
    socket.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    onmessage.forget();

    if should_kick_safari_ws(window) {
        for delay_ms in [250, 6000] {
            let socket = socket.clone();
            let window_cb = window.clone();
            let onkick = Closure::<dyn FnMut()>::new(move || {
                if socket.ready_state() == WebSocket::CONNECTING {
                    let _ = window_cb.fetch_with_str(&ping_url());
                }
            });
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
                onkick.as_ref().unchecked_ref(),
                delay_ms,
            );
            onkick.forget();
        }
    }

    Ok(sender)
}

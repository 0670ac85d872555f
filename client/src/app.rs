use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Event, HtmlButtonElement, HtmlCanvasElement,
    HtmlElement, HtmlInputElement, KeyboardEvent, PointerEvent,
};

use defectlog_shared::{ClientMessage, PickerInput, ServerMessage, Transition};

use crate::dom::{event_to_point, get_element, set_status};
use crate::form::SessionForm;
use crate::net::debug_enabled;
use crate::prompts::{choice_from_event, is_backdrop_event, render_choices, Prompts};
use crate::state::{State, DIAGRAM_KEY};
use crate::ws::{connect_ws, WsEvent};

fn document_ready_state(document: &Document) -> Option<String> {
    Reflect::get(document.as_ref(), &JsValue::from_str("readyState"))
        .ok()?
        .as_string()
}

fn server_message_kind(message: &ServerMessage) -> &'static str {
    match message {
        ServerMessage::Welcome { .. } => "welcome",
        ServerMessage::Logged { .. } => "defect:logged",
        ServerMessage::Rejected { .. } => "defect:rejected",
        ServerMessage::Failed { .. } => "defect:failed",
        ServerMessage::Count { .. } => "count",
    }
}

/// Page elements around the canvas.
struct Ui {
    document: Document,
    prompts: Prompts,
    location_choices: HtmlElement,
    defect_choices: HtmlElement,
    total: Element,
    clicks: Element,
    last_click: Element,
    message: Element,
    debug: bool,
}

impl Ui {
    fn show_message(&self, kind: &str, text: &str) {
        let _ = self.message.set_attribute("data-kind", kind);
        self.message.set_text_content(Some(text));
    }

    fn show_total(&self, total: u64) {
        self.total.set_text_content(Some(&total.to_string()));
    }

    fn render_vocabulary(&self, state: &State) {
        render_choices(&self.document, &self.location_choices, &state.layout().options);
        render_choices(&self.document, &self.defect_choices, &state.layout().defect_types);
    }

    fn refresh(&self, state: &mut State, transition: &Transition) {
        if self.debug {
            web_sys::console::log_1(&format!("diagram transition={transition:?}").into());
        }
        state.redraw();
        let step = state.current_step();
        self.prompts.show(step, state.typed_cavity());
        let clicks = state.bridge.widget(DIAGRAM_KEY).clicks();
        self.clicks.set_text_content(Some(&clicks.to_string()));
        if let Some(result) = state.bridge.render_diagram(DIAGRAM_KEY) {
            self.last_click.set_text_content(Some(&result.summary()));
        }
    }
}

fn dispatch(state: &Rc<RefCell<State>>, ui: &Ui, input: PickerInput) {
    let mut state = state.borrow_mut();
    let transition = state.bridge.dispatch(DIAGRAM_KEY, input);
    if transition != Transition::Ignored {
        ui.refresh(&mut state, &transition);
    }
}

fn handle_server_message(state: &Rc<RefCell<State>>, ui: &Ui, form: &SessionForm, message: ServerMessage) {
    if ui.debug {
        web_sys::console::log_1(&format!("WS recv kind={}", server_message_kind(&message)).into());
    }
    match message {
        ServerMessage::Welcome {
            layout,
            part_numbers,
            defaults,
            total,
        } => {
            let mut state = state.borrow_mut();
            if let Err(err) = state.set_layout(layout) {
                web_sys::console::error_1(&format!("Ignoring server layout: {err}").into());
            }
            state.total = total;
            ui.render_vocabulary(&state);
            if let Err(err) = form.apply(&ui.document, &part_numbers, &defaults) {
                web_sys::console::error_1(&err);
            }
            ui.show_total(state.total);
            ui.refresh(&mut state, &Transition::Reset);
        }
        ServerMessage::Logged { id, total } => {
            let mut state = state.borrow_mut();
            state.total = total;
            ui.show_total(state.total);
            ui.show_message("success", &format!("Defect logged successfully! ID: {id}"));
        }
        ServerMessage::Rejected { reason } => ui.show_message("warning", &reason),
        ServerMessage::Failed { message } => ui.show_message("error", &message),
        ServerMessage::Count { total } => {
            let mut state = state.borrow_mut();
            state.total = total;
            ui.show_total(state.total);
        }
    }
}

#[wasm_bindgen(start)]
pub fn run() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let started = Rc::new(Cell::new(false));

    if document_ready_state(&document).as_deref() == Some("complete") {
        started.set(true);
        return start_app();
    }

    let onload_started = started.clone();
    let onload = Closure::<dyn FnMut(Event)>::new(move |_| {
        if onload_started.replace(true) {
            return;
        }
        if let Err(err) = start_app() {
            web_sys::console::error_1(&err);
        }
    });
    window.add_event_listener_with_callback("load", onload.as_ref().unchecked_ref())?;
    onload.forget();

    Ok(())
}

fn start_app() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;
    let debug = debug_enabled(&window);

    let canvas: HtmlCanvasElement = get_element(&document, "diagram")?;
    let ctx = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("Missing canvas context"))?
        .dyn_into::<CanvasRenderingContext2d>()?;

    let status_el = get_element::<Element>(&document, "status")?;
    let status_text = get_element::<Element>(&document, "statusText")?;
    let cavity_input: HtmlInputElement = get_element(&document, "cavity-input")?;
    let cavity_ok: HtmlButtonElement = get_element(&document, "cavity-ok")?;
    let back_button: HtmlButtonElement = get_element(&document, "back")?;
    let reset_button: HtmlButtonElement = get_element(&document, "reset")?;

    let ui = Rc::new(Ui {
        document: document.clone(),
        prompts: Prompts {
            location_modal: get_element(&document, "location-modal")?,
            defect_modal: get_element(&document, "defect-modal")?,
            cavity_modal: get_element(&document, "cavity-modal")?,
            hint: get_element(&document, "prompt")?,
        },
        location_choices: get_element(&document, "location-choices")?,
        defect_choices: get_element(&document, "defect-choices")?,
        total: get_element(&document, "total-count")?,
        clicks: get_element(&document, "click-count")?,
        last_click: get_element(&document, "last-click")?,
        message: get_element(&document, "message")?,
        debug,
    });
    let form = Rc::new(SessionForm::bind(&document)?);
    let state = Rc::new(RefCell::new(State::new(canvas.clone(), ctx)));

    ui.render_vocabulary(&state.borrow());
    ui.refresh(&mut state.borrow_mut(), &Transition::Reset);
    set_status(&status_el, &status_text, "connecting", "Connecting...");

    let sender = {
        let state = state.clone();
        let ui = ui.clone();
        let form = form.clone();
        connect_ws(&window, move |event| match event {
            WsEvent::Open => set_status(&status_el, &status_text, "open", "Connected"),
            WsEvent::Close => set_status(&status_el, &status_text, "closed", "Offline"),
            WsEvent::Error => set_status(&status_el, &status_text, "closed", "Connection error"),
            WsEvent::Message(message) => handle_server_message(&state, &ui, &form, message),
        })?
    };

    {
        let ui = ui.clone();
        let form = form.clone();
        let sender = sender.clone();
        state
            .borrow_mut()
            .bridge
            .subscribe(move |_key, click| {
                let session = form.read();
                if let Err(err) = session.validate() {
                    ui.show_message("warning", &err.to_string());
                    return;
                }
                let message = ClientMessage::LogDefect {
                    session,
                    click: click.clone(),
                };
                if sender.send(&message) {
                    ui.show_message("pending", "Logging defect...");
                } else {
                    ui.show_message("error", "Not connected; the defect was not logged");
                }
            });
    }

    {
        let state = state.clone();
        let ui = ui.clone();
        let canvas_cb = canvas.clone();
        let ondown = Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
            event.prevent_default();
            let Some(point) = event_to_point(&canvas_cb, &event) else {
                return;
            };
            if ui.debug {
                web_sys::console::log_1(
                    &format!("pointer x={:.1} y={:.1}", point.x, point.y).into(),
                );
            }
            dispatch(&state, &ui, PickerInput::Click(point));
        });
        canvas.add_event_listener_with_callback("pointerdown", ondown.as_ref().unchecked_ref())?;
        ondown.forget();
    }

    for (container, is_defect) in [
        (ui.location_choices.clone(), false),
        (ui.defect_choices.clone(), true),
    ] {
        let state = state.clone();
        let ui = ui.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            let Some(value) = choice_from_event(&event) else {
                return;
            };
            let input = if is_defect {
                PickerInput::Defect(value)
            } else {
                PickerInput::Location(value)
            };
            dispatch(&state, &ui, input);
        });
        container.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    let submit_cavity = {
        let state = state.clone();
        let ui = ui.clone();
        let cavity_input = cavity_input.clone();
        Rc::new(move || {
            let value = cavity_input.value();
            if value.trim().is_empty() {
                return;
            }
            cavity_input.set_value("");
            dispatch(&state, &ui, PickerInput::Cavity(value));
        })
    };
    {
        let submit_cavity = submit_cavity.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| submit_cavity());
        cavity_ok.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }
    {
        let onkeydown = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
            if event.key() == "Enter" {
                event.prevent_default();
                submit_cavity();
            }
        });
        cavity_input
            .add_event_listener_with_callback("keydown", onkeydown.as_ref().unchecked_ref())?;
        onkeydown.forget();
    }

    for modal in [
        ui.prompts.location_modal.clone(),
        ui.prompts.defect_modal.clone(),
        ui.prompts.cavity_modal.clone(),
    ] {
        let state = state.clone();
        let ui = ui.clone();
        let backdrop = modal.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            if is_backdrop_event(&event, &backdrop) {
                dispatch(&state, &ui, PickerInput::Back);
            }
        });
        modal.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    for (button, input) in [
        (back_button, PickerInput::Back),
        (reset_button, PickerInput::Reset),
    ] {
        let state = state.clone();
        let ui = ui.clone();
        let onclick = Closure::<dyn FnMut(Event)>::new(move |_| {
            dispatch(&state, &ui, input.clone());
        });
        button.add_event_listener_with_callback("click", onclick.as_ref().unchecked_ref())?;
        onclick.forget();
    }

    {
        let state = state.clone();
        let ui = ui.clone();
        let onkeydown = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
            if event.key() != "Escape" {
                return;
            }
            if state.borrow_mut().is_idle() {
                return;
            }
            dispatch(&state, &ui, PickerInput::Back);
        });
        document.add_event_listener_with_callback("keydown", onkeydown.as_ref().unchecked_ref())?;
        onkeydown.forget();
    }

    {
        // Rows may have been logged from another tab.
        let sender = sender.clone();
        let onfocus = Closure::<dyn FnMut(Event)>::new(move |_| {
            sender.send(&ClientMessage::CountRequest);
        });
        window.add_event_listener_with_callback("focus", onfocus.as_ref().unchecked_ref())?;
        onfocus.forget();
    }

    if debug {
        web_sys::console::log_1(&"Defect diagram started with debug logging".into());
    }
    Ok(())
}

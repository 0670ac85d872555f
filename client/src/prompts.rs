use wasm_bindgen::JsCast;
use web_sys::{Document, Element, Event, HtmlButtonElement, HtmlElement};

use defectlog_shared::Step;

use crate::dom::set_hidden;

/// Fills `container` with one button per choice, tagged with `data-value`.
pub fn render_choices(document: &Document, container: &HtmlElement, choices: &[String]) {
    container.set_inner_html("");
    for choice in choices {
        let Ok(element) = document.create_element("button") else {
            continue;
        };
        let Ok(button) = element.dyn_into::<HtmlButtonElement>() else {
            continue;
        };
        let _ = button.set_attribute("type", "button");
        let _ = button.set_attribute("class", "choice");
        let _ = button.set_attribute("data-value", choice);
        button.set_text_content(Some(choice));
        let _ = container.append_child(&button);
    }
}

pub fn choice_from_event(event: &Event) -> Option<String> {
    let mut current = event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok());
    while let Some(element) = current {
        if let Some(value) = element.get_attribute("data-value") {
            return Some(value);
        }
        current = element.parent_element();
    }
    None
}

/// True when the event landed on the modal backdrop itself.
pub fn is_backdrop_event(event: &Event, backdrop: &Element) -> bool {
    event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .is_some_and(|element| &element == backdrop)
}

pub struct Prompts {
    pub location_modal: Element,
    pub defect_modal: Element,
    pub cavity_modal: Element,
    pub hint: Element,
}

impl Prompts {
    /// Shows the modal the step needs, if any. A layout with cavity regions
    /// takes the cavity from the diagram rather than from the text prompt.
    pub fn show(&self, step: Step, typed_cavity: bool) {
        set_hidden(&self.location_modal, step != Step::Location);
        set_hidden(&self.defect_modal, step != Step::Defect);
        set_hidden(&self.cavity_modal, !(step == Step::Cavity && typed_cavity));
        self.hint.set_text_content(Some(step.prompt()));
    }
}

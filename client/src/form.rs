use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlInputElement, HtmlOptionElement, HtmlSelectElement, HtmlTextAreaElement};

use defectlog_shared::SessionContext;

use crate::dom::get_element;

/// The session inputs on the page. Values persist across logged defects;
/// only a page reload returns them to the defaults.
pub struct SessionForm {
    date: HtmlInputElement,
    part_number: HtmlSelectElement,
    batch_number: HtmlInputElement,
    date_code: HtmlInputElement,
    notes: HtmlTextAreaElement,
}

impl SessionForm {
    pub fn bind(document: &Document) -> Result<Self, JsValue> {
        Ok(Self {
            date: get_element(document, "inspection-date")?,
            part_number: get_element(document, "part-number")?,
            batch_number: get_element(document, "batch-number")?,
            date_code: get_element(document, "date-code")?,
            notes: get_element(document, "notes")?,
        })
    }

    /// Replaces the part list and applies `defaults` to fields still empty.
    pub fn apply(
        &self,
        document: &Document,
        part_numbers: &[String],
        defaults: &SessionContext,
    ) -> Result<(), JsValue> {
        let selected = self.part_number.value();
        self.part_number.set_inner_html("");
        for part in std::iter::once("").chain(part_numbers.iter().map(String::as_str)) {
            let option = document
                .create_element("option")?
                .dyn_into::<HtmlOptionElement>()?;
            option.set_value(part);
            option.set_text(part);
            self.part_number.append_child(&option)?;
        }
        let current = if selected.is_empty() {
            defaults.part_number.as_str()
        } else {
            selected.as_str()
        };
        if part_numbers.iter().any(|part| part == current) {
            self.part_number.set_value(current);
        }

        fill_if_empty(&self.date, &defaults.inspection_date);
        fill_if_empty(&self.batch_number, &defaults.batch_number);
        fill_if_empty(&self.date_code, &defaults.date_code);
        if self.notes.value().is_empty() {
            self.notes.set_value(&defaults.notes);
        }
        Ok(())
    }

    pub fn read(&self) -> SessionContext {
        SessionContext {
            inspection_date: self.date.value(),
            part_number: self.part_number.value(),
            batch_number: self.batch_number.value(),
            date_code: self.date_code.value(),
            notes: self.notes.value(),
        }
    }
}

fn fill_if_empty(input: &HtmlInputElement, value: &str) {
    if input.value().is_empty() {
        input.set_value(value);
    }
}

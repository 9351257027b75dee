//! HTML form representation.

use crate::control::{ControlKind, FormControl};
use common::names::{ENCODED_URL, VIEW_STATE};
use common::{FacesError, FacesResult};

/// A form and its controls, in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtmlForm {
    /// Form client id.
    pub id: String,
    /// Declared `action` attribute.
    pub action: String,
    controls: Vec<FormControl>,
}

impl HtmlForm {
    pub fn new(id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: action.into(),
            controls: Vec::new(),
        }
    }

    /// Add a control, builder style.
    pub fn with_control(mut self, control: FormControl) -> Self {
        self.controls.push(control);
        self
    }

    /// Add the view state hidden field.
    pub fn with_view_state(self, value: impl Into<String>) -> Self {
        self.with_control(FormControl::hidden(VIEW_STATE, value).with_id(VIEW_STATE))
    }

    pub fn push(&mut self, control: FormControl) {
        self.controls.push(control);
    }

    pub fn controls(&self) -> &[FormControl] {
        &self.controls
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Find a control by id, falling back to its name.
    pub fn control(&self, identifier: &str) -> Option<&FormControl> {
        self.controls
            .iter()
            .find(|c| c.id.as_deref() == Some(identifier))
            .or_else(|| self.controls.iter().find(|c| c.name == identifier))
    }

    /// Value of the first control with the given name.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.controls
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// The view state token, if the form carries one.
    pub fn view_state(&self) -> Option<&str> {
        self.field_value(VIEW_STATE)
    }

    /// Value of the encoded URL hidden field, if present.
    pub fn encoded_url(&self) -> Option<&str> {
        self.field_value(ENCODED_URL)
    }

    /// Where a request for this form goes: the encoded URL field wins over the action.
    pub fn target_url(&self) -> FacesResult<&str> {
        let target = self.encoded_url().unwrap_or(self.action.as_str());
        if target.is_empty() {
            return Err(FacesError::form(format!("form '{}' has no action", self.id)));
        }
        Ok(target)
    }

    /// Whether any enabled file control holds a file.
    pub fn has_files(&self) -> bool {
        self.controls
            .iter()
            .any(|c| c.kind == ControlKind::File && !c.disabled && c.file.is_some())
    }
}

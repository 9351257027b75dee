//! Form controls.

use crate::client_id;

/// Kind of a form control, mirroring the `type` of an input element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Hidden,
    Password,
    TextArea,
    Checkbox,
    Radio,
    Select,
    SelectMultiple,
    Submit,
    Button,
    Reset,
    Image,
    File,
}

impl ControlKind {
    /// Map an input `type` attribute to a control kind.
    ///
    /// Unknown types fall back to [`ControlKind::Text`], as browsers do.
    pub fn from_type_attr(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "hidden" => ControlKind::Hidden,
            "password" => ControlKind::Password,
            "textarea" => ControlKind::TextArea,
            "checkbox" => ControlKind::Checkbox,
            "radio" => ControlKind::Radio,
            "select-one" | "select" => ControlKind::Select,
            "select-multiple" => ControlKind::SelectMultiple,
            "submit" => ControlKind::Submit,
            "button" => ControlKind::Button,
            "reset" => ControlKind::Reset,
            "image" => ControlKind::Image,
            "file" => ControlKind::File,
            _ => ControlKind::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlKind::Text => "text",
            ControlKind::Hidden => "hidden",
            ControlKind::Password => "password",
            ControlKind::TextArea => "textarea",
            ControlKind::Checkbox => "checkbox",
            ControlKind::Radio => "radio",
            ControlKind::Select => "select-one",
            ControlKind::SelectMultiple => "select-multiple",
            ControlKind::Submit => "submit",
            ControlKind::Button => "button",
            ControlKind::Reset => "reset",
            ControlKind::Image => "image",
            ControlKind::File => "file",
        }
    }

    /// Buttons only take part in a submit when they issued it.
    pub fn is_button(&self) -> bool {
        matches!(
            self,
            ControlKind::Submit | ControlKind::Button | ControlKind::Reset | ControlKind::Image
        )
    }

    pub fn is_checkable(&self) -> bool {
        matches!(self, ControlKind::Checkbox | ControlKind::Radio)
    }
}

/// A file selected in a file control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl FilePart {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

/// A single control of a form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormControl {
    /// Client id (`id` attribute).
    pub id: Option<String>,
    /// Submit name (`name` attribute).
    pub name: String,
    /// Control kind.
    pub kind: ControlKind,
    /// Current value.
    pub value: String,
    /// Selected option values for multi-selects.
    pub selected: Vec<String>,
    /// Checked state for checkboxes and radios.
    pub checked: bool,
    /// Disabled controls never submit.
    pub disabled: bool,
    /// Selected file for file controls.
    pub file: Option<FilePart>,
}

impl FormControl {
    pub fn new(kind: ControlKind, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind,
            value: value.into(),
            selected: Vec::new(),
            checked: false,
            disabled: false,
            file: None,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ControlKind::Text, name, value)
    }

    pub fn hidden(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ControlKind::Hidden, name, value)
    }

    pub fn checkbox(name: impl Into<String>, value: impl Into<String>, checked: bool) -> Self {
        Self {
            checked,
            ..Self::new(ControlKind::Checkbox, name, value)
        }
    }

    pub fn radio(name: impl Into<String>, value: impl Into<String>, checked: bool) -> Self {
        Self {
            checked,
            ..Self::new(ControlKind::Radio, name, value)
        }
    }

    pub fn submit(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ControlKind::Submit, name, value)
    }

    pub fn button(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ControlKind::Button, name, value)
    }

    pub fn select_multiple(name: impl Into<String>, selected: Vec<String>) -> Self {
        Self {
            selected,
            ..Self::new(ControlKind::SelectMultiple, name, "")
        }
    }

    pub fn file(name: impl Into<String>, file: FilePart) -> Self {
        Self {
            value: file.file_name.clone(),
            file: Some(file),
            ..Self::new(ControlKind::File, name, "")
        }
    }

    /// Set the client id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Mark the control disabled.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// The id when present, the name otherwise.
    pub fn identifier(&self) -> &str {
        match &self.id {
            Some(id) if !id.is_empty() => id,
            _ => &self.name,
        }
    }

    /// Whether the control contributes to a regular form submit.
    pub fn is_successful(&self) -> bool {
        if self.disabled || self.name.is_empty() || self.kind.is_button() {
            return false;
        }
        if self.kind.is_checkable() {
            return self.checked;
        }
        true
    }

    /// Name/value entries this control submits, files excluded.
    pub fn entries(&self) -> Vec<(String, String)> {
        match self.kind {
            ControlKind::SelectMultiple => self
                .selected
                .iter()
                .map(|v| (self.name.clone(), v.clone()))
                .collect(),
            ControlKind::File => Vec::new(),
            _ => vec![(self.name.clone(), self.value.clone())],
        }
    }

    /// Whether a partial id selects this control, directly or through a naming container.
    pub fn matches_partial_id(&self, partial_id: &str) -> bool {
        if let Some(id) = &self.id {
            if client_id::is_within(id, partial_id) {
                return true;
            }
        }
        client_id::is_within(&self.name, partial_id)
    }
}

//! Building request payloads from forms.

use common::names::VIEW_STATE;
use common::FacesResult;
use dom::{ControlKind, FormControl, HtmlForm};
use networking::FormDataPayload;

/// Turns forms into payloads. Requests reach the form only through this trait.
pub trait FormDataEncoder: Send + Sync {
    /// Serialize the whole form.
    fn view_state(&self, form: &HtmlForm) -> FacesResult<FormDataPayload>;

    /// Serialize only the controls selected by `partial_ids`, plus the view state.
    fn encode_submittable_fields(
        &self,
        form: &HtmlForm,
        partial_ids: &[String],
    ) -> FacesResult<FormDataPayload>;

    /// Add the control that issued the request, unless the payload already has it.
    fn append_issuing_item(&self, source: &FormControl, payload: &mut FormDataPayload);
}

/// Encoder working on the [`dom`] form model.
#[derive(Clone, Copy, Debug, Default)]
pub struct DomFormData;

impl DomFormData {
    fn append_control(control: &FormControl, payload: &mut FormDataPayload) {
        if control.kind == ControlKind::File {
            if let (false, Some(file)) = (control.disabled, &control.file) {
                payload.append_file(
                    control.name.clone(),
                    file.file_name.clone(),
                    file.content_type.clone(),
                    file.data.clone(),
                );
            }
            return;
        }
        if control.is_successful() {
            for (name, value) in control.entries() {
                payload.append(name, value);
            }
        }
    }
}

impl FormDataEncoder for DomFormData {
    fn view_state(&self, form: &HtmlForm) -> FacesResult<FormDataPayload> {
        let mut payload = FormDataPayload::new();
        for control in form.controls() {
            Self::append_control(control, &mut payload);
        }
        Ok(payload)
    }

    fn encode_submittable_fields(
        &self,
        form: &HtmlForm,
        partial_ids: &[String],
    ) -> FacesResult<FormDataPayload> {
        let whole_form = partial_ids.iter().any(|id| *id == form.id);
        let mut payload = FormDataPayload::new();

        for control in form.controls() {
            let selected = whole_form || partial_ids.iter().any(|id| control.matches_partial_id(id));
            if selected {
                Self::append_control(control, &mut payload);
            }
        }

        if !payload.has_key(VIEW_STATE) {
            if let Some(view_state) = form.view_state() {
                payload.append(VIEW_STATE, view_state);
            }
        }

        tracing::trace!(
            form = %form.id,
            ids = ?partial_ids,
            entries = payload.len(),
            "Encoded partial submit"
        );
        Ok(payload)
    }

    fn append_issuing_item(&self, source: &FormControl, payload: &mut FormDataPayload) {
        let identifier = source.identifier();
        if identifier.is_empty() || payload.has_key(identifier) || source.disabled {
            return;
        }
        if source.kind.is_checkable() {
            if !source.checked {
                return;
            }
            let value = if source.value.is_empty() { "true" } else { source.value.as_str() };
            payload.append(identifier, value);
            return;
        }
        payload.append(identifier, source.value.clone());
    }
}

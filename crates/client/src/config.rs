//! Submit configuration.

use ajax::{AjaxMethod, OverflowPolicy, QueueConfig, RequestConfig, RequestContext};
use dom::{FormControl, HtmlForm};
use networking::ClientConfig;
use std::sync::Arc;
use std::time::Duration;

/// Limit on a silent exchange when no request timeout is set.
pub(crate) const EXCHANGE_LIMIT: Duration = Duration::from_secs(30);

/// Everything needed to submit one form, possibly several times.
#[derive(Clone, Debug)]
pub struct SubmitConfig {
    /// Form action URL.
    pub action: String,
    /// Form id, also the naming container of its fields.
    pub form_id: String,
    /// Field name/value pairs, in submit order.
    pub fields: Vec<(String, String)>,
    /// View state token.
    pub view_state: Option<String>,
    /// Ids to submit instead of the whole form.
    pub partial_ids: Vec<String>,
    /// Issuing control, submitted as `name=value`.
    pub source: Option<(String, String)>,
    /// Client ids to re-render.
    pub render: Vec<String>,
    pub method: AjaxMethod,
    pub multipart: bool,
    /// Per-request timeout in milliseconds; 0 disables it.
    pub timeout_ms: u64,
    pub queue_size: Option<usize>,
    pub overflow: OverflowPolicy,
    /// Number of identical requests to enqueue.
    pub repeat: usize,
    pub user_agent: Option<String>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            action: String::new(),
            form_id: "form".to_string(),
            fields: Vec::new(),
            view_state: None,
            partial_ids: Vec::new(),
            source: None,
            render: Vec::new(),
            method: AjaxMethod::Post,
            multipart: false,
            timeout_ms: 0,
            queue_size: None,
            overflow: OverflowPolicy::RejectNewest,
            repeat: 1,
            user_agent: None,
        }
    }
}

impl SubmitConfig {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// The form as a page would hold it.
    pub fn build_form(&self) -> HtmlForm {
        let mut form = HtmlForm::new(self.form_id.clone(), self.action.clone());
        for (name, value) in &self.fields {
            form.push(FormControl::text(name.clone(), value.clone()).with_id(name.clone()));
        }
        if let Some((name, value)) = &self.source {
            form.push(FormControl::submit(name.clone(), value.clone()).with_id(name.clone()));
        }
        match &self.view_state {
            Some(view_state) => form.with_view_state(view_state.clone()),
            None => form,
        }
    }

    /// Request context for `form`, with partial parameters when a source is set.
    pub fn context(&self, form: Arc<HtmlForm>) -> RequestContext {
        let mut context = RequestContext::new(form);
        if let Some((name, value)) = &self.source {
            let execute = if self.partial_ids.is_empty() {
                self.form_id.clone()
            } else {
                self.partial_ids.join(" ")
            };
            context = context
                .with_source(FormControl::submit(name.clone(), value.clone()).with_id(name.clone()))
                .with_partial_params(name, &execute, &self.render.join(" "));
        }
        context
    }

    pub fn request_config(&self) -> RequestConfig {
        let mut config = RequestConfig::new()
            .with_method(self.method)
            .with_timeout_ms(self.timeout_ms)
            .with_partial_ids(self.partial_ids.clone());
        if self.multipart {
            config = config.multipart();
        }
        config
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            max_size: self.queue_size,
            overflow: self.overflow,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default();
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        if self.timeout_ms == 0 {
            config.timeout = Some(EXCHANGE_LIMIT);
        }
        config
    }
}

/// Parse a `name=value` field argument. The value may be empty.
pub fn parse_field(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, _)) if name.is_empty() => Err(format!("field '{}' has an empty name", arg)),
        Some((name, value)) => Ok((name.to_string(), value.to_string())),
        None => Err(format!("field '{}' is not of the form name=value", arg)),
    }
}

//! View-model for one CRUD screen: dialog state machine, form, paginator,
//! debounced search and toasts, all driven through a single store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{domain::Resource, protocol::ListQuery};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    catalog::ScreenConfig,
    error::StoreError,
    form::{FieldIssue, Form},
    notify::{spawn_error_relay, Notifier},
    search::SearchDebouncer,
    store::{DeletePolicy, ResourceSnapshot, ResourceStore},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode<Id> {
    Closed,
    Create,
    Edit { id: Id },
    ConfirmDelete { id: Id },
}

impl<Id> DialogMode<Id> {
    pub fn is_form_open(&self) -> bool {
        matches!(self, Self::Create | Self::Edit { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved,
    Invalid(Vec<FieldIssue>),
    Failed(String),
    NotOpen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Failed(String),
    NotConfirming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentificationCheck {
    Available,
    AlreadyRegistered,
    Skipped,
    Failed,
}

/// The filter state a refresh re-applies: term, page, size and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub term: String,
    pub page: u32,
    pub page_size: u32,
    pub kind: Option<String>,
}

impl ViewQuery {
    fn to_list_query(&self) -> ListQuery {
        ListQuery::page(self.page, self.page_size)
            .with_term(&self.term)
            .with_kind(self.kind.as_deref())
    }
}

fn lock_view(view: &Mutex<ViewQuery>) -> MutexGuard<'_, ViewQuery> {
    view.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct CrudScreen<T: Resource> {
    config: ScreenConfig,
    store: Arc<ResourceStore<T>>,
    notifier: Notifier,
    form: Form,
    mode: DialogMode<T::Id>,
    view: Arc<Mutex<ViewQuery>>,
    search: SearchDebouncer,
    error_relay: JoinHandle<()>,
}

impl<T: Resource> CrudScreen<T> {
    /// Must be called inside a tokio runtime: the search debouncer and the
    /// error relay are spawned here and live until the screen is dropped.
    pub fn new(store: Arc<ResourceStore<T>>, notifier: Notifier, config: ScreenConfig) -> Self {
        let view = Arc::new(Mutex::new(ViewQuery {
            term: String::new(),
            page: 1,
            page_size: store.default_page_size(),
            kind: None,
        }));

        let search = {
            let store = Arc::clone(&store);
            let view = Arc::clone(&view);
            SearchDebouncer::spawn(config.search_debounce, move |term: String| {
                let query = {
                    let mut view = lock_view(&view);
                    view.term = term;
                    view.page = 1;
                    view.to_list_query()
                };
                let store = Arc::clone(&store);
                async move {
                    // Failures reach the user through the error relay.
                    let _ = store.fetch(query).await;
                }
            })
        };

        let error_relay = spawn_error_relay(store.subscribe(), notifier.clone(), config.title);
        let form = Form::new(config.form.clone());

        Self {
            config,
            store,
            notifier,
            form,
            mode: DialogMode::Closed,
            view,
            search,
            error_relay,
        }
    }

    pub fn title(&self) -> &str {
        self.config.title
    }

    pub fn store(&self) -> &Arc<ResourceStore<T>> {
        &self.store
    }

    pub fn snapshot(&self) -> ResourceSnapshot<T> {
        self.store.snapshot()
    }

    pub fn mode(&self) -> DialogMode<T::Id> {
        self.mode
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut Form {
        &mut self.form
    }

    pub fn view(&self) -> ViewQuery {
        lock_view(&self.view).clone()
    }

    pub async fn load(&mut self) {
        self.refresh().await;
    }

    /// Re-runs the current term/page/size/type against the store.
    pub async fn refresh(&mut self) {
        let query = lock_view(&self.view).to_list_query();
        let _ = self.store.fetch(query).await;
    }

    pub fn on_search_input(&self, term: impl Into<String>) {
        self.search.push(term);
    }

    pub async fn change_page(&mut self, page: u32, page_size: u32) {
        {
            let mut view = lock_view(&self.view);
            view.page = page.max(1);
            view.page_size = page_size.max(1);
        }
        self.refresh().await;
    }

    pub async fn set_type_filter(&mut self, kind: Option<String>) {
        {
            let mut view = lock_view(&self.view);
            view.kind = kind;
            view.page = 1;
        }
        self.refresh().await;
    }

    pub fn open_create(&mut self) {
        self.form.reset();
        self.form.set_identity_enabled(true);
        self.mode = DialogMode::Create;
    }

    pub fn open_edit(&mut self, entity: &T) {
        self.form.reset();
        match serde_json::to_value(entity) {
            Ok(record) => self.form.patch(&record),
            Err(err) => debug!(resource = T::PATH, error = %err, "could not serialize record for edit"),
        }
        self.form.set_identity_enabled(false);
        self.mode = DialogMode::Edit { id: entity.id() };
    }

    pub fn close_dialog(&mut self) {
        self.form.reset();
        self.mode = DialogMode::Closed;
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        let editing = match self.mode {
            DialogMode::Create => None,
            DialogMode::Edit { id } => Some(id),
            DialogMode::Closed | DialogMode::ConfirmDelete { .. } => return SubmitOutcome::NotOpen,
        };

        let issues = self.form.validate();
        if !issues.is_empty() {
            self.form.mark_all_touched();
            self.notifier
                .error("Please review the form", self.describe_issues(&issues));
            return SubmitOutcome::Invalid(issues);
        }

        let payload = self.form.payload();
        let result = match editing {
            None => self.store.create(&payload).await,
            Some(id) => self.store.update(id, &payload).await,
        };

        match result {
            Ok(_) => {
                let verb = if editing.is_some() { "updated" } else { "created" };
                info!(resource = T::PATH, verb, "record saved");
                self.form.reset();
                self.mode = DialogMode::Closed;
                self.notifier
                    .success("Saved", format!("The {} was {verb} successfully.", T::LABEL));
                self.refresh().await;
                SubmitOutcome::Saved
            }
            Err(err) => {
                self.notify_failure("Could not save", &err);
                SubmitOutcome::Failed(err.user_message().to_string())
            }
        }
    }

    pub fn confirm_delete(&mut self, entity: &T) {
        self.mode = DialogMode::ConfirmDelete { id: entity.id() };
    }

    pub fn cancel_delete(&mut self) {
        if matches!(self.mode, DialogMode::ConfirmDelete { .. }) {
            self.mode = DialogMode::Closed;
        }
    }

    /// Closes the dialog whatever the outcome.
    pub async fn delete_confirmed(&mut self) -> DeleteOutcome {
        let DialogMode::ConfirmDelete { id } = self.mode else {
            return DeleteOutcome::NotConfirming;
        };
        self.mode = DialogMode::Closed;

        let outcome = match self.store.delete(id).await {
            Ok(()) => {
                info!(resource = T::PATH, %id, "record deleted");
                self.notifier
                    .success("Deleted", format!("The {} was deleted.", T::LABEL));
                DeleteOutcome::Deleted
            }
            Err(err) => {
                self.notify_failure("Could not delete", &err);
                DeleteOutcome::Failed(err.user_message().to_string())
            }
        };

        if self.store.delete_policy() == DeletePolicy::Refetch {
            self.refresh().await;
        }
        outcome
    }

    /// Duplicate check for the configured identity field. Flags the field
    /// when a different record already uses the value.
    pub async fn check_identification(&mut self) -> IdentificationCheck {
        let Some(field) = self.config.lookup_field else {
            return IdentificationCheck::Skipped;
        };
        let value = self.form.value(field).unwrap_or_default().trim().to_string();
        if value.is_empty() || !self.form.is_enabled(field) {
            self.form.clear_warning(field);
            return IdentificationCheck::Skipped;
        }

        let editing = match self.mode {
            DialogMode::Edit { id } => Some(id),
            _ => None,
        };

        match self.store.lookup_by_identification(&value).await {
            Ok(Some(existing)) if Some(existing.id()) != editing => {
                let label = self.store.catalog().label(field).to_string();
                let warning = format!("{label} {value} is already registered");
                self.form.set_warning(field, warning.clone());
                self.notifier.warn("Already registered", warning);
                IdentificationCheck::AlreadyRegistered
            }
            Ok(_) => {
                self.form.clear_warning(field);
                IdentificationCheck::Available
            }
            Err(err) => {
                self.notify_failure("Could not verify identification", &err);
                IdentificationCheck::Failed
            }
        }
    }

    /// Explicit teardown; dropping the screen has the same effect.
    pub fn teardown(self) {}

    fn notify_failure(&self, summary: &str, err: &StoreError) {
        self.notifier.error(summary, err.user_message());
    }

    fn describe_issues(&self, issues: &[FieldIssue]) -> String {
        let catalog = self.store.catalog();
        let mut fields: Vec<&str> = Vec::new();
        for issue in issues {
            let label = catalog.label(issue.field);
            if !fields.contains(&label) {
                fields.push(label);
            }
        }
        format!("Check the following fields: {}", fields.join(", "))
    }
}

impl<T: Resource> Drop for CrudScreen<T> {
    fn drop(&mut self) {
        self.search.shutdown();
        self.error_relay.abort();
    }
}

#[cfg(test)]
#[path = "tests/screen_tests.rs"]
mod tests;

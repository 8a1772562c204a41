use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;
use shared::{
    domain::Resource,
    protocol::{Envelope, ListQuery, Pagination},
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    error::{StoreError, TransportError},
    messages::MessageCatalog,
    state::RequestState,
    transport::{ApiRequest, ApiTransport, Method},
};

const STORE_EVENT_CAPACITY: usize = 256;

/// What a successful delete does to the locally held items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Splice the entry out, but only after a 2xx `statusCode`.
    RemoveLocally,
    /// Leave items alone; the screen re-runs its query.
    Refetch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Search,
    Create,
    Update,
    Delete,
    Lookup,
}

impl Operation {
    pub fn is_fetch(self) -> bool {
        matches!(self, Self::List | Self::Search)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    LoadingChanged(bool),
    ItemsReplaced {
        count: usize,
        pagination: Pagination,
    },
    ItemRemoved {
        id: String,
    },
    ErrorRaised {
        operation: Operation,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot<T> {
    pub items: Vec<T>,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub pagination: Pagination,
}

struct StoreInner<T> {
    request: RequestState,
    items: Vec<T>,
    latest_ticket: u64,
    last_query: Option<ListQuery>,
}

/// Remote state of one entity collection.
///
/// Every operation raises `is_loading` on entry and lowers it on every exit
/// path, including cancellation of the returned future. Only the newest
/// list/search response may touch `items`; older ones are discarded.
pub struct ResourceStore<T: Resource> {
    transport: Arc<dyn ApiTransport>,
    catalog: Arc<MessageCatalog>,
    delete_policy: DeletePolicy,
    default_page_size: u32,
    inner: Mutex<StoreInner<T>>,
    events: broadcast::Sender<StoreEvent>,
}

struct LoadingGuard<'a, T: Resource> {
    store: &'a ResourceStore<T>,
}

impl<'a, T: Resource> LoadingGuard<'a, T> {
    fn begin(store: &'a ResourceStore<T>) -> Self {
        let changed = {
            let mut inner = store.lock();
            inner.request.clear_error();
            inner.request.set_loading(true)
        };
        if changed {
            store.emit(StoreEvent::LoadingChanged(true));
        }
        Self { store }
    }
}

impl<T: Resource> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        let changed = self.store.lock().request.set_loading(false);
        if changed {
            self.store.emit(StoreEvent::LoadingChanged(false));
        }
    }
}

impl<T: Resource> ResourceStore<T> {
    pub fn new(transport: Arc<dyn ApiTransport>, catalog: Arc<MessageCatalog>) -> Self {
        let (events, _) = broadcast::channel(STORE_EVENT_CAPACITY);
        Self {
            transport,
            catalog,
            delete_policy: DeletePolicy::Refetch,
            default_page_size: Pagination::default().page_size,
            inner: Mutex::new(StoreInner {
                request: RequestState::default(),
                items: Vec::new(),
                latest_ticket: 0,
                last_query: None,
            }),
            events,
        }
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn with_default_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = page_size.max(1);
        self
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    pub fn catalog(&self) -> &MessageCatalog {
        &self.catalog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> ResourceSnapshot<T> {
        let inner = self.lock();
        ResourceSnapshot {
            items: inner.items.clone(),
            is_loading: inner.request.is_loading(),
            error_message: inner.request.error_message().map(str::to_string),
            pagination: inner.request.pagination(),
        }
    }

    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().request.is_loading()
    }

    pub fn error_message(&self) -> Option<String> {
        self.lock().request.error_message().map(str::to_string)
    }

    pub fn pagination(&self) -> Pagination {
        self.lock().request.pagination()
    }

    pub fn find(&self, id: T::Id) -> Option<T> {
        self.lock().items.iter().find(|item| item.id() == id).cloned()
    }

    pub fn last_query(&self) -> Option<ListQuery> {
        self.lock().last_query.clone()
    }

    pub async fn list(
        &self,
        page: u32,
        page_size: u32,
        kind: Option<&str>,
    ) -> Result<(), StoreError> {
        self.fetch(ListQuery::page(page, page_size).with_kind(kind))
            .await
    }

    /// Blank terms never reach `/search`; they list instead.
    pub async fn search(
        &self,
        term: &str,
        page: u32,
        page_size: u32,
        kind: Option<&str>,
    ) -> Result<(), StoreError> {
        self.fetch(
            ListQuery::page(page, page_size)
                .with_term(term)
                .with_kind(kind),
        )
        .await
    }

    pub async fn refresh(&self) -> Result<(), StoreError> {
        let query = self
            .last_query()
            .unwrap_or_else(|| ListQuery::page(1, self.default_page_size));
        self.fetch(query).await
    }

    pub async fn fetch(&self, query: ListQuery) -> Result<(), StoreError> {
        let (operation, endpoint) = if query.is_search() {
            (Operation::Search, "search")
        } else {
            (Operation::List, "enabled")
        };
        let request = ApiRequest::get([T::PATH, endpoint]).with_query(query.to_pairs());

        let _loading = LoadingGuard::begin(self);
        let ticket = {
            let mut inner = self.lock();
            inner.latest_ticket += 1;
            inner.last_query = Some(query.clone());
            inner.latest_ticket
        };
        debug!(
            resource = T::PATH,
            ?operation,
            page = query.page,
            limit = query.limit,
            term = query.term.as_deref().unwrap_or(""),
            "fetching resource page"
        );

        let outcome = match self.exchange(request).await {
            Ok(envelope) => decode_page::<T>(envelope).map_err(|source| self.decode_error(source)),
            Err(err) => Err(err),
        };

        let mut inner = self.lock();
        if inner.latest_ticket != ticket {
            debug!(
                resource = T::PATH,
                ticket,
                latest = inner.latest_ticket,
                "discarding superseded response"
            );
            return outcome.map(|_| ());
        }

        match outcome {
            Ok((items, pagination)) => {
                inner.items = items;
                if let Some(pagination) = pagination {
                    inner.request.set_pagination(pagination);
                }
                let event = StoreEvent::ItemsReplaced {
                    count: inner.items.len(),
                    pagination: inner.request.pagination(),
                };
                drop(inner);
                self.emit(event);
                Ok(())
            }
            Err(err) => {
                let event = raise_error(&mut inner, operation, &err);
                drop(inner);
                self.report(operation, &err, event);
                Err(err)
            }
        }
    }

    /// Does not touch `items`; callers refresh to observe the new record.
    pub async fn create<P>(&self, payload: &P) -> Result<Option<T>, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.mutate(
            Operation::Create,
            ApiRequest::new(Method::Post, [T::PATH]),
            payload,
        )
        .await
    }

    pub async fn update<P>(&self, id: T::Id, payload: &P) -> Result<Option<T>, StoreError>
    where
        P: Serialize + ?Sized,
    {
        self.mutate(
            Operation::Update,
            ApiRequest::new(Method::Put, [T::PATH.to_string(), id.to_string()]),
            payload,
        )
        .await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), StoreError> {
        let _loading = LoadingGuard::begin(self);
        let request = ApiRequest::new(Method::Delete, [T::PATH.to_string(), id.to_string()]);

        match self.exchange(request).await {
            Ok(_) => {
                if self.delete_policy == DeletePolicy::RemoveLocally {
                    let removed = {
                        let mut inner = self.lock();
                        let before = inner.items.len();
                        inner.items.retain(|item| item.id() != id);
                        before != inner.items.len()
                    };
                    if removed {
                        self.emit(StoreEvent::ItemRemoved { id: id.to_string() });
                    }
                }
                Ok(())
            }
            Err(err) => {
                let event = raise_error(&mut self.lock(), Operation::Delete, &err);
                self.report(Operation::Delete, &err, event);
                Err(err)
            }
        }
    }

    /// Read-only duplicate check. A 404 means "not registered" and is not an
    /// error.
    pub async fn lookup_by_identification(&self, value: &str) -> Result<Option<T>, StoreError> {
        let _loading = LoadingGuard::begin(self);
        let request = ApiRequest::get([T::PATH, "identification", value.trim()]);

        let outcome = match self.exchange(request).await {
            Ok(envelope) => decode_optional::<T>(envelope.data)
                .map_err(|source| self.decode_error(source)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        };

        outcome.map_err(|err| {
            let event = raise_error(&mut self.lock(), Operation::Lookup, &err);
            self.report(Operation::Lookup, &err, event);
            err
        })
    }

    /// Encoding runs inside the loading cycle so a payload that cannot be
    /// serialized fails like any other mutation.
    async fn mutate<P>(
        &self,
        operation: Operation,
        request: ApiRequest,
        payload: &P,
    ) -> Result<Option<T>, StoreError>
    where
        P: Serialize + ?Sized,
    {
        let _loading = LoadingGuard::begin(self);

        let outcome = match self.encode(payload) {
            Ok(body) => {
                let request = request.with_body(body);
                debug!(resource = T::PATH, ?operation, path = %request.path(), "sending mutation");
                match self.exchange(request).await {
                    // A record that does not decode is not worth failing a
                    // write that the server accepted.
                    Ok(envelope) => Ok(decode_optional::<T>(envelope.data).ok().flatten()),
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        };

        outcome.map_err(|err| {
            let event = raise_error(&mut self.lock(), operation, &err);
            self.report(operation, &err, event);
            err
        })
    }

    async fn exchange(&self, request: ApiRequest) -> Result<Envelope<Value>, StoreError> {
        let envelope = self.transport.send(request).await.map_err(|source| {
            StoreError::Transport {
                message: self.catalog.transport_message(&source),
                source,
            }
        })?;

        if let Some(failure) = envelope.failure() {
            return Err(StoreError::Domain {
                status_code: failure.status_code,
                message: self.catalog.domain_message(&failure),
            });
        }
        Ok(envelope)
    }

    fn encode<P>(&self, payload: &P) -> Result<Value, StoreError>
    where
        P: Serialize + ?Sized,
    {
        serde_json::to_value(payload).map_err(|err| {
            let source = TransportError::Encode(err.to_string());
            StoreError::Transport {
                message: self.catalog.transport_message(&source),
                source,
            }
        })
    }

    fn decode_error(&self, source: serde_json::Error) -> StoreError {
        let source = TransportError::Decode(source.to_string());
        StoreError::Transport {
            message: self.catalog.transport_message(&source),
            source,
        }
    }

    fn report(&self, operation: Operation, err: &StoreError, event: Option<StoreEvent>) {
        warn!(
            resource = T::PATH,
            ?operation,
            kind = ?err.kind(),
            error = %err,
            "resource operation failed"
        );
        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine; the state itself is the source of truth.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn raise_error<T>(
    inner: &mut StoreInner<T>,
    operation: Operation,
    err: &StoreError,
) -> Option<StoreEvent> {
    let message = err.user_message().to_string();
    inner
        .request
        .set_error(message.clone())
        .then_some(StoreEvent::ErrorRaised { operation, message })
}

type Page<T> = (Vec<T>, Option<Pagination>);

fn decode_page<T: Resource>(envelope: Envelope<Value>) -> Result<Page<T>, serde_json::Error> {
    let items = match envelope.data {
        None | Some(Value::Null) => Vec::new(),
        Some(data) => serde_json::from_value(data)?,
    };
    Ok((items, envelope.pagination))
}

fn decode_optional<T: Resource>(data: Option<Value>) -> Result<Option<T>, serde_json::Error> {
    match data {
        None | Some(Value::Null) => Ok(None),
        Some(data) => serde_json::from_value(data).map(Some),
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;

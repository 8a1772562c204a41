use shared::protocol::Pagination;

/// Loading, error and pagination bookkeeping shared by every resource store.
///
/// Stores embed one of these next to their items rather than inheriting the
/// behaviour, and drive it through the four setters below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestState {
    in_flight: usize,
    error_message: Option<String>,
    pagination: Pagination,
}

impl RequestState {
    /// Loading nests: overlapping requests keep the flag raised until the
    /// last one settles. Returns true when `is_loading` flipped.
    pub fn set_loading(&mut self, loading: bool) -> bool {
        let was_loading = self.is_loading();
        if loading {
            self.in_flight += 1;
        } else {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        was_loading != self.is_loading()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Returns true when the error went from absent to present.
    pub fn set_error(&mut self, message: impl Into<String>) -> bool {
        let raised = self.error_message.is_none();
        self.error_message = Some(message.into());
        raised
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn set_pagination(&mut self, pagination: Pagination) {
        self.pagination = pagination;
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }
}

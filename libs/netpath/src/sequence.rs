//! Request sequencing for views whose selection can change mid flight.
//!
//! Every fetch takes a [`Ticket`] from the view's [`Slot`]. When the response
//! arrives the slot only accepts it if no newer request was issued and the
//! selection it was issued for is still current.

/// Identifies one issued request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket<K> {
    seq: u64,
    key: K,
}

impl<K> Ticket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug)]
pub struct Slot<K, T> {
    key: Option<K>,
    seq: u64,
    loading: bool,
    data: Option<T>,
}

impl<K, T> Default for Slot<K, T> {
    fn default() -> Self {
        Self {
            key: None,
            seq: 0,
            loading: false,
            data: None,
        }
    }
}

impl<K: Clone + PartialEq, T> Slot<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request for `key`, superseding any request still in flight.
    pub fn begin(&mut self, key: K) -> Ticket<K> {
        self.seq += 1;
        if self.key.as_ref() != Some(&key) {
            self.data = None;
        }
        self.key = Some(key.clone());
        self.loading = true;
        Ticket { seq: self.seq, key }
    }

    /// Stores `data` if `ticket` is the latest request; returns whether it was
    /// accepted.
    pub fn resolve(&mut self, ticket: &Ticket<K>, data: T) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.data = Some(data);
        self.loading = false;
        true
    }

    pub fn is_current(&self, ticket: &Ticket<K>) -> bool {
        ticket.seq == self.seq && self.key.as_ref() == Some(&ticket.key)
    }

    /// Drops the response for `ticket`. The loading flag is cleared when no
    /// newer request is still in flight.
    pub fn abandon(&mut self, ticket: &Ticket<K>) {
        if ticket.seq == self.seq {
            self.loading = false;
        }
    }

    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }
}

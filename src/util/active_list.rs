//! Index-based intrusive list over a fixed set of slots.
//!
//! [`ActiveList`] tracks which priority classes currently have demand. Every
//! slot id is known up front (one per priority), so links live in a `Vec`
//! indexed by id rather than in a general associative container.
//!
//! # Design
//!
//! - O(1) `push_back`, `remove`, and membership checks
//! - A persistent round-robin cursor that survives removals: removing the
//!   slot under the cursor moves the cursor to that slot's successor
//! - `None` as a cursor position means "end of list"; advancing from the end
//!   wraps to the first member

/// Links for one slot.
#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<usize>,
    next: Option<usize>,
    linked: bool,
}

/// Doubly linked membership list over slot ids `0..slots`.
#[derive(Debug, Clone)]
pub struct ActiveList {
    links: Vec<Link>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    cursor: Option<usize>,
}

impl ActiveList {
    /// Creates an empty list able to hold slot ids `0..slots`.
    #[must_use]
    pub fn with_slots(slots: usize) -> Self {
        Self {
            links: vec![Link::default(); slots],
            head: None,
            tail: None,
            len: 0,
            cursor: None,
        }
    }

    /// Number of linked slots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no slot is linked.
    #[cfg(test)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if `id` is linked.
    #[must_use]
    pub fn contains(&self, id: usize) -> bool {
        self.links.get(id).is_some_and(|link| link.linked)
    }

    /// Successor of a linked slot, or `None` at the end.
    #[must_use]
    pub fn next(&self, id: usize) -> Option<usize> {
        self.links.get(id).and_then(|link| link.next)
    }

    /// Links `id` at the tail. Returns false if it was already linked.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    pub fn push_back(&mut self, id: usize) -> bool {
        assert!(id < self.links.len(), "slot {id} out of range");
        if self.links[id].linked {
            return false;
        }
        self.links[id] = Link {
            prev: self.tail,
            next: None,
            linked: true,
        };
        match self.tail {
            Some(tail) => self.links[tail].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        true
    }

    /// Unlinks `id` and returns its former successor.
    ///
    /// If the cursor was on `id` it moves to the successor. Returns `None`
    /// without changes if `id` was not linked.
    pub fn remove(&mut self, id: usize) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        let Link { prev, next, .. } = self.links[id];
        match prev {
            Some(prev) => self.links[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.links[next].prev = prev,
            None => self.tail = prev,
        }
        self.links[id] = Link::default();
        self.len -= 1;
        if self.cursor == Some(id) {
            self.cursor = next;
        }
        next
    }

    /// Unlinks every slot and parks the cursor at the end.
    pub fn clear(&mut self) {
        for link in &mut self.links {
            *link = Link::default();
        }
        self.head = None;
        self.tail = None;
        self.len = 0;
        self.cursor = None;
    }

    /// Current cursor position; `None` is the end of the list.
    #[cfg(test)]
    #[must_use]
    pub const fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Returns the cursor slot, wrapping from the end to the first member.
    ///
    /// Leaves the cursor on the returned slot. Returns `None` only if the list
    /// is empty.
    pub fn wrap_cursor(&mut self) -> Option<usize> {
        if self.cursor.is_none() {
            self.cursor = self.head;
        }
        self.cursor
    }

    /// Moves the cursor one step forward; past the tail it becomes the end.
    pub fn advance_cursor(&mut self) {
        self.cursor = self.cursor.and_then(|id| self.next(id));
    }

    /// Iterates linked slots from head to tail.
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.head, move |&id| self.next(id))
    }
}

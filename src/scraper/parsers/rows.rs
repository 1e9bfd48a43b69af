//! State machine for tables that alternate an identity row with a detail row.

/// Where the walk over an alternating table stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowState {
    /// No horse in context; detail rows are ignored
    AwaitingIdentity,
    /// Detail rows belong to this key
    AwaitingDetail(String),
}

/// What happens after a detail row is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterDetail {
    /// Further detail rows keep appending to the same horse
    Stay,
    /// One detail row per identity row
    Reset,
}

#[derive(Debug, Clone)]
pub struct AlternatingRows {
    state: RowState,
    after_detail: AfterDetail,
}

impl AlternatingRows {
    pub fn new(after_detail: AfterDetail) -> Self {
        Self {
            state: RowState::AwaitingIdentity,
            after_detail,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &RowState {
        &self.state
    }

    /// An identity row was read. A row without a usable key drops the context.
    pub fn identity(&mut self, key: Option<String>) {
        self.state = match key {
            Some(k) => RowState::AwaitingDetail(k),
            None => RowState::AwaitingIdentity,
        };
    }

    /// A detail row was read; returns the key it belongs to, if any.
    pub fn detail(&mut self) -> Option<String> {
        let RowState::AwaitingDetail(key) = &self.state else {
            return None;
        };
        let key = key.clone();
        if self.after_detail == AfterDetail::Reset {
            self.state = RowState::AwaitingIdentity;
        }
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_without_identity_is_ignored() {
        let mut rows = AlternatingRows::new(AfterDetail::Stay);
        assert_eq!(rows.detail(), None);
        assert_eq!(rows.state(), &RowState::AwaitingIdentity);
    }

    #[test]
    fn test_stay_keeps_context() {
        let mut rows = AlternatingRows::new(AfterDetail::Stay);
        rows.identity(Some("3".to_string()));
        assert_eq!(rows.detail().as_deref(), Some("3"));
        assert_eq!(rows.detail().as_deref(), Some("3"));
    }

    #[test]
    fn test_reset_consumes_context() {
        let mut rows = AlternatingRows::new(AfterDetail::Reset);
        rows.identity(Some("3".to_string()));
        assert_eq!(rows.detail().as_deref(), Some("3"));
        assert_eq!(rows.detail(), None);
        assert_eq!(rows.state(), &RowState::AwaitingIdentity);
    }

    #[test]
    fn test_keyless_identity_drops_context() {
        let mut rows = AlternatingRows::new(AfterDetail::Stay);
        rows.identity(Some("1".to_string()));
        rows.identity(None);
        assert_eq!(rows.detail(), None);
    }
}

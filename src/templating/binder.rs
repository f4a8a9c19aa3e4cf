use std::collections::HashMap;

use crate::matcher::ArgMatcher;
use crate::value::MockId;

/// Matchers gathered for one recorded call, keyed by parameter name.
#[derive(Debug, Default)]
pub(crate) struct TokenData {
    pub(crate) matchers: HashMap<String, Vec<ArgMatcher>>,
    /// Accumulator length after the last vararg element of the current parameter.
    pub(crate) vararg_cursor: usize,
}

#[derive(Debug)]
struct Binding {
    token: u64,
    receiver: MockId,
    data: TokenData,
}

/// Maps the tokens of in-flight recorded calls to their matcher data.
#[derive(Debug, Default)]
pub(crate) struct TokenBinder {
    bindings: Vec<Binding>,
}

impl TokenBinder {
    /// Register `token` for `receiver`. Rebinding an existing token is a no-op.
    pub(crate) fn bind(&mut self, token: u64, receiver: &MockId) {
        if self.bindings.iter().any(|b| b.token == token) {
            return;
        }
        self.bindings.push(Binding {
            token,
            receiver: receiver.clone(),
            data: TokenData::default(),
        });
    }

    pub(crate) fn data_mut(&mut self, token: u64) -> Option<&mut TokenData> {
        self.bindings
            .iter_mut()
            .find(|b| b.token == token)
            .map(|b| &mut b.data)
    }

    /// Remove and return the data of the newest call bound to `receiver`.
    ///
    /// Calls nested in argument position complete before their enclosing call, so
    /// the newest binding is the one being saved.
    pub(crate) fn take_latest(&mut self, receiver: &MockId) -> Option<TokenData> {
        let index = self.bindings.iter().rposition(|b| &b.receiver == receiver)?;
        Some(self.bindings.remove(index).data)
    }

    pub(crate) fn clear(&mut self) {
        self.bindings.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }
}

use std::collections::HashMap;
use std::sync::Arc;

/// Dense string ↔ code mapping for one categorical column.
///
/// Codes are assigned in first-seen order starting at 0 and are never reused.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    values: Vec<Arc<str>>,
    codes: HashMap<Arc<str>, u32>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code for `value`, assigning the next free code if it is unseen.
    pub fn encode(&mut self, value: &str) -> u32 {
        if let Some(code) = self.codes.get(value) {
            return *code;
        }

        let code = self.values.len() as u32;
        let value: Arc<str> = Arc::from(value);
        self.values.push(value.clone());
        self.codes.insert(value, code);
        code
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        self.values.get(code as usize).map(|s| s.as_ref())
    }

    /// Look up an existing code without assigning one.
    pub fn lookup(&self, value: &str) -> Option<u32> {
        self.codes.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(code, value)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Arc<str>)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(code, value)| (code as u32, value))
    }

    pub fn size_bytes(&self) -> usize {
        self.values.iter().map(|s| s.len()).sum()
    }
}

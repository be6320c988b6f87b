use std::collections::BTreeMap;

use tw_value::Value;

/// The single globals frame shared by every thread in a state.
///
/// Per §3 Invariant 5, globals have no active iterator stack and no wait descriptor — they are
/// strictly a name-to-value map, which is why this is a newtype rather than reusing [`Frame`].
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Globals(BTreeMap<String, Value>);

impl Globals {
    pub fn new(vars: BTreeMap<String, Value>) -> Self {
        Self(vars)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.0
    }
}

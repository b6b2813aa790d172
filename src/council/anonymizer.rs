//! Opaque labels for Stage-1 answers.
//!
//! Labels are handed out in the order the answers are given, which the
//! pipeline fixes to the configured council order. Completion order never
//! reaches this module, so a label says nothing about which backend was fast.

use std::collections::BTreeMap;

use super::types::{AnonymizedAnswer, Response};

/// Bijection between labels and the models that answered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMapping {
    label_to_model: BTreeMap<String, String>,
    model_to_label: BTreeMap<String, String>,
    order: Vec<String>,
}

impl LabelMapping {
    fn insert(&mut self, label: String, model: String) {
        self.label_to_model.insert(label.clone(), model.clone());
        self.model_to_label.insert(model, label.clone());
        self.order.push(label);
    }

    pub fn model_for(&self, label: &str) -> Option<&str> {
        self.label_to_model.get(label).map(String::as_str)
    }

    pub fn label_for(&self, model: &str) -> Option<&str> {
        self.model_to_label.get(model).map(String::as_str)
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.label_to_model.contains_key(label)
    }

    /// (label, model) pairs in label order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order
            .iter()
            .map(move |l| (l.as_str(), self.label_to_model[l].as_str()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Spreadsheet-style letters: A..Z, AA, AB, ...
pub fn label_for_index(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Label every successful response; failed ones are skipped.
pub fn anonymize<'a, I>(responses: I) -> (LabelMapping, Vec<AnonymizedAnswer>)
where
    I: IntoIterator<Item = &'a Response>,
{
    let mut mapping = LabelMapping::default();
    let mut answers = Vec::new();

    for response in responses.into_iter().filter(|r| r.success) {
        if mapping.label_for(&response.model).is_some() {
            tracing::warn!("Ignoring second answer from {}", response.model);
            continue;
        }
        let label = label_for_index(mapping.len());
        mapping.insert(label.clone(), response.model.clone());
        answers.push(AnonymizedAnswer {
            label,
            text: response.text.clone(),
        });
    }

    (mapping, answers)
}

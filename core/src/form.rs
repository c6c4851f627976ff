//! Form access as an explicit capability.
//!
//! # Design
//! The client never reaches for a global document. Whatever hosts the form
//! (a browser bridge, a TUI, a test) implements `FormBinding`, and the client
//! receives it through a `FormHandle`. The handle is shared and lockable
//! because the error display schedules a deferred hide that must reach the
//! same form after the call that created it has returned.

use std::sync::{Arc, Mutex, PoisonError};

/// The inline error element the client creates next to the CEP input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorElement {
    pub id: String,
    pub class: String,
    pub text: String,
    pub visible: bool,
}

impl ErrorElement {
    pub fn new(id: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            text: String::new(),
            visible: false,
        }
    }
}

/// Operations the client needs from a form.
pub trait FormBinding {
    /// Current value of the input `id`, or `None` if there is no such input.
    fn get_field(&self, id: &str) -> Option<String>;

    /// Overwrite the value of input `id`. Returns false if it does not exist.
    fn set_field(&mut self, id: &str, value: &str) -> bool;

    /// Insert `element` directly after the element `anchor_id`. Returns false
    /// if the anchor does not exist.
    fn insert_after(&mut self, anchor_id: &str, element: ErrorElement) -> bool;

    /// Previously inserted error element `id`.
    fn element_mut(&mut self, id: &str) -> Option<&mut ErrorElement>;
}

/// Shared handle to a form.
#[derive(Debug, Default)]
pub struct FormHandle<F> {
    inner: Arc<Mutex<F>>,
}

impl<F> Clone for FormHandle<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: FormBinding> FormHandle<F> {
    pub fn new(form: F) -> Self {
        Self {
            inner: Arc::new(Mutex::new(form)),
        }
    }

    /// Run `f` with exclusive access to the form. A poisoned lock is
    /// recovered: form state is plain data and stays usable after a panic.
    pub fn with<R>(&self, f: impl FnOnce(&mut F) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Input { id: String, value: String },
    Error(ErrorElement),
}

impl Node {
    fn id(&self) -> &str {
        match self {
            Node::Input { id, .. } => id,
            Node::Error(el) => &el.id,
        }
    }
}

/// In-memory form that keeps document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryForm {
    nodes: Vec<Node>,
}

impl MemoryForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// A form with one empty input per id, in order.
    pub fn with_inputs<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut form = Self::new();
        for id in ids {
            form.add_input(id);
        }
        form
    }

    pub fn add_input(&mut self, id: impl Into<String>) {
        self.nodes.push(Node::Input {
            id: id.into(),
            value: String::new(),
        });
    }

    pub fn element(&self, id: &str) -> Option<&ErrorElement> {
        self.nodes.iter().find_map(|node| match node {
            Node::Error(el) if el.id == id => Some(el),
            _ => None,
        })
    }

    /// Element ids in document order.
    pub fn ids(&self) -> Vec<&str> {
        self.nodes.iter().map(Node::id).collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id() == id)
    }
}

impl FormBinding for MemoryForm {
    fn get_field(&self, id: &str) -> Option<String> {
        self.nodes.iter().find_map(|node| match node {
            Node::Input { id: node_id, value } if node_id.as_str() == id => Some(value.clone()),
            _ => None,
        })
    }

    fn set_field(&mut self, id: &str, new_value: &str) -> bool {
        for node in &mut self.nodes {
            if let Node::Input { id: node_id, value } = node {
                if node_id.as_str() == id {
                    *value = new_value.to_string();
                    return true;
                }
            }
        }
        false
    }

    fn insert_after(&mut self, anchor_id: &str, element: ErrorElement) -> bool {
        match self.position(anchor_id) {
            Some(at) => {
                self.nodes.insert(at + 1, Node::Error(element));
                true
            }
            None => false,
        }
    }

    fn element_mut(&mut self, id: &str) -> Option<&mut ErrorElement> {
        self.nodes.iter_mut().find_map(|node| match node {
            Node::Error(el) if el.id == id => Some(el),
            _ => None,
        })
    }
}

//! The parser session: a stack of cursors driven by tag, attribute and text
//! events.
//!
//! Every open element has one [`Cursor`] on the stack. Its attachment state
//! decides where the element's object ends up:
//!
//! - `Open`: the cursor owns a new object which is merged into the nearest
//!   owning ancestor (or the root) when the element closes. When the template
//!   declares a disambiguation key, the key is read from the closed object at
//!   that point.
//! - `Detached`: the cursor owns an object that is never attached (the
//!   `cursor` policy).
//! - `Transparent`: the `none` policy; the cursor has no object and its
//!   attributes and text land in the nearest owning ancestor.
//!
//! Lifecycle hooks and constructor overrides are dispatched to a [`Target`].

use {
    crate::{
        error::SaxError,
        node::{Merge, Node, Origin, TEXT_LABEL},
        template::{normalize, Attach, Template},
    },
    tracing::trace,
};

/// Receives the hooks named by templates while a document is mapped.
///
/// Both methods fail with [`SaxError::UnknownHook`] unless overridden, so a
/// template naming a hook the target does not know aborts the parse.
pub trait Target {
    type Error: From<SaxError>;

    /// Builds the object for an element whose template names a constructor.
    /// `Ok(None)` falls back to the template's container.
    fn construct(&mut self, hook: &str, tag: &str) -> Result<Option<Node>, Self::Error> {
        Err(SaxError::UnknownHook {
            hook: hook.to_string(),
            tag: tag.to_string(),
        }
        .into())
    }

    /// Called once the closing tag of an element with a `before_close` hook is reached.
    fn before_close(&mut self, hook: &str, closed: &Closed<'_>) -> Result<(), Self::Error> {
        Err(SaxError::UnknownHook {
            hook: hook.to_string(),
            tag: closed.tag.to_string(),
        }
        .into())
    }
}

/// A target without hooks; the result is the generic graph alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct Graph;

impl Target for Graph {
    type Error = SaxError;
}

/// View of an element as its closing tag is processed.
#[derive(Debug)]
pub struct Closed<'a> {
    pub tag: &'a str,
    /// Nesting depth of the element; the document element is 1.
    pub depth: usize,
    /// The element's object, or the enclosing object for `none` elements.
    pub node: &'a Node,
    pub parent_tag: Option<&'a str>,
}

#[derive(Debug)]
enum State {
    Open {
        node: Node,
        attach: Attach,
        label: String,
        delimiter: Option<String>,
    },
    Detached {
        node: Node,
    },
    Transparent,
}

impl State {
    fn node(&self) -> Option<&Node> {
        match self {
            State::Open { node, .. } | State::Detached { node } => Some(node),
            State::Transparent => None,
        }
    }

    fn node_mut(&mut self) -> Option<&mut Node> {
        match self {
            State::Open { node, .. } | State::Detached { node } => Some(node),
            State::Transparent => None,
        }
    }
}

#[derive(Debug)]
struct Cursor<'t> {
    tag: String,
    /// Template matched for this element.
    local: &'t Template,
    /// Template consulted for children; the parent's model for `none` elements.
    model: &'t Template,
    state: State,
}

/// Output of a completed parse.
#[derive(Debug)]
pub struct Parsed<T> {
    pub root: Node,
    pub target: T,
}

/// One parse invocation.
#[derive(Debug)]
pub struct Session<'t, T: Target> {
    template: &'t Template,
    root: Node,
    stack: Vec<Cursor<'t>>,
    target: T,
}

impl<'t, T: Target> Session<'t, T> {
    pub fn new(template: &'t Template, target: T) -> Self {
        Self {
            template,
            root: template.container().allocate(),
            stack: Vec::new(),
            target,
        }
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The root object built so far. Only meaningful for diagnostics until
    /// [`Session::finish`] succeeds.
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Templates in effect for the innermost open element: (local, model).
    fn schemas(&self) -> (&'t Template, &'t Template) {
        self.stack
            .last()
            .map(|cursor| (cursor.local, cursor.model))
            .unwrap_or((self.template, self.template))
    }

    /// The object of the nearest cursor that owns one, else the root.
    fn owner_mut(&mut self) -> &mut Node {
        match self.stack.iter_mut().rev().find_map(|c| c.state.node_mut()) {
            Some(node) => node,
            None => &mut self.root,
        }
    }

    pub fn start_element(&mut self, tag: &str) -> Result<(), T::Error> {
        let tag = normalize(tag);
        let (_, parent) = self.schemas();
        let local = parent.element(&tag).unwrap_or_else(|| {
            trace!(tag = %tag, "no schema declared, using permissive default");
            Template::permissive()
        });
        let attach = local
            .attach()
            .or(parent.attach_elements())
            .cloned()
            .unwrap_or_default();

        let (model, state) = match attach {
            Attach::Ignore => (parent, State::Transparent),
            Attach::Cursor => (
                local,
                State::Detached {
                    node: self.allocate(local, &tag)?,
                },
            ),
            attach => (
                local,
                State::Open {
                    node: self.allocate(local, &tag)?,
                    attach,
                    label: local.as_name().map(str::to_string).unwrap_or_else(|| tag.clone()),
                    delimiter: local.delimiter().map(str::to_string),
                },
            ),
        };

        self.stack.push(Cursor {
            tag,
            local,
            model,
            state,
        });
        Ok(())
    }

    fn allocate(&mut self, local: &Template, tag: &str) -> Result<Node, T::Error> {
        if let Some(hook) = local.construct() {
            if let Some(node) = self.target.construct(hook, tag)? {
                return Ok(node);
            }
        }
        Ok(local.container().allocate())
    }

    /// Merges an attribute of the innermost open element.
    pub fn attribute(&mut self, name: &str, value: &str) {
        self.assign(&normalize(name), value);
    }

    /// Merges a chunk of text content of the innermost open element.
    /// Whitespace-only chunks are dropped.
    pub fn text(&mut self, value: &str) {
        if value.trim().is_empty() {
            return;
        }
        self.assign(TEXT_LABEL, value);
    }

    fn assign(&mut self, name: &str, value: &str) {
        let (local, model) = self.schemas();
        let schema = local.attribute(name);
        let attach = schema
            .and_then(Template::attach)
            .or(model.attach_attributes())
            .cloned()
            .unwrap_or_default();
        if attach.is_detached() {
            return;
        }
        let label = schema
            .and_then(Template::as_name)
            .unwrap_or(name)
            .to_string();
        let publish = local.publishes(&attach);

        let owner = self.owner_mut();
        owner.merge(Node::Text(value.to_string()), &label, None, &attach, Origin::Attribute);
        if publish {
            owner.publish(&label);
        }
    }

    pub fn end_element(&mut self, tag: &str) -> Result<(), T::Error> {
        let tag = normalize(tag);
        let open = self.stack.last().map(|c| c.tag.as_str());
        match open {
            None => return Err(SaxError::UnexpectedClose { tag }.into()),
            Some(open) if open != tag => {
                return Err(SaxError::TagMismatch {
                    expected: open.to_string(),
                    found: tag,
                }
                .into())
            }
            Some(_) => {}
        }
        let Some(cursor) = self.stack.pop() else {
            return Err(SaxError::UnexpectedClose { tag }.into());
        };

        if let Some(hook) = cursor.local.before_close() {
            let node = match cursor.state.node() {
                Some(node) => node,
                None => self
                    .stack
                    .iter()
                    .rev()
                    .find_map(|c| c.state.node())
                    .unwrap_or(&self.root),
            };
            let closed = Closed {
                tag: &cursor.tag,
                depth: self.stack.len() + 1,
                node,
                parent_tag: self.stack.last().map(|c| c.tag.as_str()),
            };
            trace!(hook, tag = %cursor.tag, "before_close");
            self.target.before_close(hook, &closed)?;
        }

        if let State::Open {
            node,
            attach,
            label,
            delimiter,
        } = cursor.state
        {
            let key = delimiter.map(|attr| node.attribute(&attr).unwrap_or_default().to_lowercase());
            let publish = cursor.local.publishes(&attach);
            let owner = self.owner_mut();
            owner.merge(node, &label, key.as_deref(), &attach, Origin::Element);
            if publish {
                owner.publish(&label);
            }
        }
        Ok(())
    }

    /// Ends the parse, returning the root object and the target.
    pub fn finish(self) -> Result<Parsed<T>, T::Error> {
        if let Some(open) = self.stack.last() {
            return Err(SaxError::UnclosedElement {
                tag: open.tag.clone(),
            }
            .into());
        }
        Ok(Parsed {
            root: self.root,
            target: self.target,
        })
    }
}

//! The tagged containers a parse builds, and the merge primitive that
//! attaches values into them.

use {
    crate::template::{Attach, ContainerKind},
    indexmap::IndexMap,
    serde::{Serialize, Serializer},
    std::collections::BTreeSet,
};

/// Label under which element text is merged.
pub const TEXT_LABEL: &str = "text";

/// Pool used by a shared attachment that does not name one.
pub const DEFAULT_POOL: &str = "attributes";

/// What produced the value being merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Element,
    Attribute,
}

/// A value in the result graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    List(ListNode),
    Keyed(KeyedNode),
}

/// Slots that sit beside a container's regular contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slots {
    private: IndexMap<String, Node>,
    pools: IndexMap<String, KeyedNode>,
    published: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListNode {
    items: Vec<Node>,
    slots: Slots,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedNode {
    entries: IndexMap<String, Node>,
    slots: Slots,
    opaque: bool,
}

/// Attaching a value into a container.
pub trait Merge {
    /// Merges `value` under `label`. With a `key`, the value lands in a
    /// nested keyed map under that key instead of accumulating by label.
    fn merge(&mut self, value: Node, label: &str, key: Option<&str>, attach: &Attach, origin: Origin);
}

impl ContainerKind {
    pub fn allocate(self) -> Node {
        match self {
            ContainerKind::Keyed => Node::Keyed(KeyedNode::default()),
            ContainerKind::List => Node::List(ListNode::default()),
            ContainerKind::Object => Node::Keyed(KeyedNode {
                opaque: true,
                ..KeyedNode::default()
            }),
        }
    }
}

/// Inserts under `label`, concatenating text and promoting collisions to a list.
fn accumulate(entries: &mut IndexMap<String, Node>, label: String, value: Node) {
    let is_text = label == TEXT_LABEL;
    let Some(existing) = entries.get_mut(&label) else {
        entries.insert(label, value);
        return;
    };
    match (existing, value) {
        (Node::Text(text), Node::Text(more)) if is_text => text.push_str(&more),
        (existing, value) => existing.push(value),
    }
}

/// Merges into the keyed map found (or created) under `label`, at `key`.
fn accumulate_delimited(entries: &mut IndexMap<String, Node>, label: String, key: &str, value: Node) {
    let nested = entries
        .entry(label)
        .or_insert_with(|| Node::Keyed(KeyedNode::default()));
    match nested {
        Node::Keyed(map) => map.absorb_at(key, value),
        other => other.push(value),
    }
}

impl Slots {
    fn merge(&mut self, value: Node, label: String, key: Option<&str>, attach: &Attach) {
        match attach {
            Attach::Private => match key {
                Some(key) => accumulate_delimited(&mut self.private, label, key, value),
                None => accumulate(&mut self.private, label, value),
            },
            Attach::Shared(pool) => {
                let pool = pool.as_deref().unwrap_or(DEFAULT_POOL).to_string();
                self.pools
                    .entry(pool)
                    .or_default()
                    .merge(value, &label, key, &Attach::Default, Origin::Attribute);
            }
            _ => {}
        }
    }

    fn lookup(&self, name: &str) -> Option<&Node> {
        if !self.published.contains(name) {
            return None;
        }
        self.private
            .get(name)
            .or_else(|| self.pools.values().find_map(|pool| pool.entries.get(name)))
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.pools
            .values()
            .find_map(|pool| pool.entries.get(name))
            .or_else(|| self.private.get(name))
            .and_then(Node::as_text)
    }

    pub fn private(&self, name: &str) -> Option<&Node> {
        self.private.get(&name.to_lowercase())
    }

    pub fn pool(&self, name: &str) -> Option<&KeyedNode> {
        self.pools.get(&name.to_lowercase())
    }
}

impl Merge for ListNode {
    fn merge(&mut self, value: Node, label: &str, key: Option<&str>, attach: &Attach, origin: Origin) {
        let label = label.to_lowercase();
        match attach {
            Attach::Private | Attach::Shared(_) => self.slots.merge(value, label, key, attach),
            Attach::Default if origin == Origin::Attribute => {
                self.slots.merge(value, label, key, &Attach::Shared(None))
            }
            Attach::Default => self.items.push(value),
            Attach::Cursor | Attach::Ignore => {}
        }
    }
}

impl Merge for KeyedNode {
    fn merge(&mut self, value: Node, label: &str, key: Option<&str>, attach: &Attach, _origin: Origin) {
        let label = label.to_lowercase();
        match attach {
            Attach::Private | Attach::Shared(_) => self.slots.merge(value, label, key, attach),
            Attach::Default if self.opaque => self.slots.merge(value, label, key, &Attach::Private),
            Attach::Default => match key {
                Some(key) => accumulate_delimited(&mut self.entries, label, key, value),
                None => accumulate(&mut self.entries, label, value),
            },
            Attach::Cursor | Attach::Ignore => {}
        }
    }
}

impl Merge for Node {
    fn merge(&mut self, value: Node, label: &str, key: Option<&str>, attach: &Attach, origin: Origin) {
        match self {
            Node::List(list) => list.merge(value, label, key, attach, origin),
            Node::Keyed(map) => map.merge(value, label, key, attach, origin),
            Node::Text(text) => {
                let appends = label.eq_ignore_ascii_case(TEXT_LABEL)
                    && key.is_none()
                    && *attach == Attach::Default;
                if let (true, Node::Text(more)) = (appends, &value) {
                    text.push_str(more);
                    return;
                }
                let mut promoted = KeyedNode::default();
                promoted
                    .entries
                    .insert(TEXT_LABEL.to_string(), Node::Text(std::mem::take(text)));
                promoted.merge(value, label, key, attach, origin);
                *self = Node::Keyed(promoted);
            }
        }
    }
}

impl KeyedNode {
    /// Merges `value` into this map at `key`: maps merge into maps, lists
    /// grow, and any other collision becomes a list.
    fn absorb_at(&mut self, key: &str, value: Node) {
        let key = key.to_lowercase();
        match self.entries.get_mut(&key) {
            None => {
                self.entries.insert(key, value);
            }
            Some(existing) => match (existing, value) {
                (Node::Keyed(existing), Node::Keyed(incoming)) => {
                    existing.entries.extend(incoming.entries);
                }
                (existing, value) => existing.push(value),
            },
        }
    }

    /// Case-insensitive lookup over entries, then published slots.
    pub fn get(&self, name: &str) -> Option<&Node> {
        let name = name.to_lowercase();
        self.entries
            .get(&name)
            .or_else(|| self.slots.lookup(&name))
    }

    /// Text value of an attribute, looking in entries, pools, then private slots.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.entries
            .get(&name)
            .and_then(Node::as_text)
            .or_else(|| self.slots.attribute(&name))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Creates a map with one entry.
    pub fn with(label: &str, value: Node) -> Self {
        let mut map = KeyedNode::default();
        map.entries.insert(label.to_lowercase(), value);
        map
    }
}

impl ListNode {
    pub fn items(&self) -> &[Node] {
        &self.items
    }

    pub fn slots(&self) -> &Slots {
        &self.slots
    }
}

impl Node {
    /// Appends to a list, or turns `self` into a list of `[self, value]`.
    pub fn push(&mut self, value: Node) {
        if let Node::List(list) = self {
            list.items.push(value);
            return;
        }
        let previous = std::mem::replace(self, Node::List(ListNode::default()));
        if let Node::List(list) = self {
            list.items.push(previous);
            list.items.push(value);
        }
    }

    /// Makes a private or pooled label readable through `get`.
    pub fn publish(&mut self, label: &str) {
        let slots = match self {
            Node::List(list) => &mut list.slots,
            Node::Keyed(map) => &mut map.slots,
            Node::Text(_) => return,
        };
        slots.published.insert(label.to_lowercase());
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_keyed(&self) -> Option<&KeyedNode> {
        match self {
            Node::Keyed(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListNode> {
        match self {
            Node::List(list) => Some(list),
            _ => None,
        }
    }

    /// Keyed lookup; `None` for lists and text.
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.as_keyed().and_then(|map| map.get(name))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            Node::Keyed(map) => map.attribute(name),
            Node::List(list) => list.slots.attribute(&name.to_lowercase()),
            Node::Text(_) => None,
        }
    }

    /// Element text: the node itself when it is text, else its `text` entry.
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            Node::Keyed(map) => map.entries.get(TEXT_LABEL).and_then(Node::as_text),
            Node::List(_) => None,
        }
    }

    /// Iterates a one-or-many value: the items of a list, or the node itself.
    pub fn items(&self) -> impl Iterator<Item = &Node> {
        let (many, one) = match self {
            Node::List(list) => (list.items.as_slice(), None),
            other => (&[][..], Some(other)),
        };
        many.iter().chain(one)
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Text(text) => serializer.serialize_str(text),
            Node::List(list) => serializer.collect_seq(list.items.iter()),
            Node::Keyed(map) => serializer.collect_map(map.entries.iter()),
        }
    }
}

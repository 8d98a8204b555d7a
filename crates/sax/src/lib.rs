//! Template-driven streaming XML mapper.
//!
//! A [`Template`] tree describes, per tag, which container to allocate and
//! how it attaches to its parent. A [`Session`] consumes tag, attribute and
//! text events, keeping one cursor per open element, and builds a [`Node`]
//! graph while dispatching lifecycle hooks to a [`Target`]. [`parse`] drives a
//! session from `quick-xml`.
//!
//! ```rust
//! use filemaker_sax::{parse, Graph, Template};
//!
//! let template = Template::from_json("people", r#"{
//!     "elements": [ { "name": "people", "attach": "none" },
//!                   { "name": "person", "delimiter": "id" } ]
//! }"#)?;
//! let parsed = parse(br#"<people><person id="7" name="Ann"/></people>"#, &template, Graph)?;
//! let ann = parsed.root.get("person").and_then(|p| p.get("7")).unwrap();
//! assert_eq!(ann.attribute("name"), Some("Ann"));
//! # Ok::<(), filemaker_sax::SaxError>(())
//! ```

mod error;
mod node;
mod reader;
mod registry;
mod session;
mod template;

pub use {
    error::{SaxError, SaxResult},
    node::{KeyedNode, ListNode, Merge, Node, Origin, Slots, DEFAULT_POOL, TEXT_LABEL},
    reader::{parse, parse_reader},
    registry::TemplateRegistry,
    session::{Closed, Graph, Parsed, Session, Target},
    template::{normalize, Accessor, Attach, ContainerKind, Template},
};

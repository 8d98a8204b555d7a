use filemaker_sax::{parse, Closed, Graph, Node, SaxError, Target, Template, TemplateRegistry};
use pretty_assertions::assert_eq;

const CATALOG: &str = r#"{
    "elements": [
        {
            "name": "catalog",
            "attach": "cursor",
            "attach_attributes": "shared",
            "create_accessors": ["shared"],
            "elements": [
                { "name": "meta", "attach": "none" },
                { "name": "entry", "attach": "cursor", "before_close": "entry",
                  "elements": [
                      { "name": "tag", "as_name": "tags" },
                      { "name": "note", "attach": "_notes" }
                  ] }
            ]
        }
    ]
}"#;

const DOCUMENT: &str = r#"<?xml version="1.0"?>
<!DOCTYPE catalog PUBLIC "-//EXAMPLE//DTD catalog//EN" "catalog.dtd">
<catalog version="2" xmlns="urn:example">
  <meta generated-by="hand"/>
  <entry id="1" title="Fish &amp; Chips">
    <tag>food</tag>
    <tag>uk</tag>
    <note lang="en"><![CDATA[<crispy>]]> &#38; hot</note>
  </entry>
  <entry id="2" title="Plain"/>
  <unmodeled x="y"><inner>kept</inner></unmodeled>
</catalog>"#;

#[derive(Default)]
struct Entries {
    seen: Vec<(String, String, usize, Option<String>)>,
}

impl Target for Entries {
    type Error = SaxError;

    fn before_close(&mut self, hook: &str, closed: &Closed<'_>) -> Result<(), SaxError> {
        assert_eq!(hook, "entry");
        let node = closed.node;
        let note = node
            .as_keyed()
            .and_then(|map| map.slots().pool("notes"))
            .and_then(|pool| pool.get("note"))
            .and_then(Node::text)
            .map(str::to_string);
        self.seen.push((
            node.attribute("id").unwrap_or_default().to_string(),
            node.attribute("title").unwrap_or_default().to_string(),
            node.get("tags").map(|t| t.items().count()).unwrap_or(0),
            note,
        ));
        Ok(())
    }
}

fn catalog() -> Template {
    Template::from_json("catalog", CATALOG).unwrap()
}

#[test]
fn hooks_receive_typed_views_of_each_entry() -> anyhow::Result<()> {
    let template = catalog();
    let parsed = parse(DOCUMENT.as_bytes(), &template, Entries::default())?;

    assert_eq!(
        parsed.target.seen,
        vec![
            (
                "1".to_string(),
                "Fish & Chips".to_string(),
                2,
                Some("<crispy> & hot".to_string())
            ),
            ("2".to_string(), "Plain".to_string(), 0, None),
        ]
    );
    Ok(())
}

#[test]
fn cursor_elements_leave_only_unmodeled_data_at_root() -> anyhow::Result<()> {
    let template = catalog();
    let parsed = parse(DOCUMENT.as_bytes(), &template, Entries::default())?;

    let doctype = parsed.root.get("doctype").expect("doctype element");
    assert!(doctype.attribute("value").unwrap().starts_with("catalog PUBLIC"));
    assert!(parsed.root.get("catalog").is_none());
    assert!(parsed.root.get("entry").is_none());
    Ok(())
}

#[test]
fn unknown_tags_fall_back_to_generic_maps() -> anyhow::Result<()> {
    let parsed = parse(DOCUMENT.as_bytes(), &Template::default(), Graph)?;

    let catalog = parsed.root.get("catalog").unwrap();
    assert_eq!(catalog.attribute("version"), Some("2"));
    assert_eq!(catalog.get("meta").and_then(|m| m.attribute("generated_by")), Some("hand"));
    let entries: Vec<_> = catalog.get("entry").unwrap().items().collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(
        catalog.get("unmodeled").and_then(|u| u.get("inner")).and_then(Node::text),
        Some("kept")
    );
    Ok(())
}

#[test]
fn parsing_twice_yields_equal_graphs() -> anyhow::Result<()> {
    let template = catalog();
    let first = parse(DOCUMENT.as_bytes(), &template, Entries::default())?;
    let second = parse(DOCUMENT.as_bytes(), &template, Entries::default())?;
    assert_eq!(first.root, second.root);
    assert_eq!(first.target.seen, second.target.seen);

    let generic_a = parse(DOCUMENT.as_bytes(), &Template::default(), Graph)?;
    let generic_b = parse(DOCUMENT.as_bytes(), &Template::default(), Graph)?;
    assert_eq!(generic_a.root, generic_b.root);
    Ok(())
}

#[test]
fn registry_templates_drive_parses() -> anyhow::Result<()> {
    let registry = TemplateRegistry::new();
    registry.register("catalog", CATALOG);
    let template = registry.get("catalog")?;
    let parsed = parse(DOCUMENT.as_bytes(), &template, Entries::default())?;
    assert_eq!(parsed.target.seen.len(), 2);
    Ok(())
}

#[test]
fn hook_errors_abort_the_parse() {
    let template = Template::from_json(
        "strict",
        r#"{ "elements": [ { "name": "catalog", "attach": "cursor", "elements": [
            { "name": "entry", "before_close": "missing" } ] } ] }"#,
    )
    .unwrap();
    let err = parse(DOCUMENT.as_bytes(), &template, Graph).unwrap_err();
    assert!(matches!(err, SaxError::UnknownHook { hook, tag } if hook == "missing" && tag == "entry"));
}

use {
    chrono::{NaiveDate, NaiveDateTime},
    filemaker_client::{
        metadata::{FieldStyle, LayoutMetaBuilder},
        names::NameListBuilder,
        Error, ErrorKind, FieldMapping, Grammar, Resultset, ResultsetBuilder, Value,
    },
    indexmap::IndexMap,
    pretty_assertions::assert_eq,
    rust_decimal::Decimal,
    std::str::FromStr,
    url::Url,
};

const CONTACTS: &str = include_str!("fixtures/contacts.xml");
const NO_RECORDS: &str = include_str!("fixtures/no_records.xml");
const LAYOUT: &str = include_str!("fixtures/layout.xml");
const NAMES: &str = include_str!("fixtures/names.xml");

fn mapping() -> FieldMapping {
    FieldMapping::new(&IndexMap::from([(
        "Name First".to_string(),
        "first".to_string(),
    )]))
}

fn parse(body: &str, ignore_bad_data: bool) -> filemaker_client::Result<Resultset> {
    let template = Grammar::FmResultset.template()?;
    let builder = ResultsetBuilder::new(mapping(), false, ignore_bad_data);
    Ok(filemaker_sax::parse(body.as_bytes(), &template, builder)?
        .target
        .finish())
}

#[test]
fn records_match_the_found_set() -> anyhow::Result<()> {
    let resultset = parse(CONTACTS, true)?;

    assert_eq!(resultset.len(), resultset.foundset_count());
    assert_eq!(resultset.total_count(), 3);
    assert_eq!(*resultset.meta().fetch_size(), 2);
    assert_eq!(resultset.schema().database().as_deref(), Some("Contacts"));
    assert_eq!(
        resultset.field_names(),
        vec!["Name First", "Born", "Salary", "Modified", "Phone", "Photo"]
    );
    Ok(())
}

#[test]
fn values_are_typed_by_field_definitions() -> anyhow::Result<()> {
    let resultset = parse(CONTACTS, true)?;
    let bill = &resultset[0];

    assert_eq!(bill.record_id(), Some("1"));
    assert_eq!(bill.mod_id(), Some("7"));
    assert_eq!(bill.get("FIRST")?, &Value::from("Bill"));
    assert_eq!(
        bill.get("born")?,
        &Value::Date(NaiveDate::from_ymd_opt(1970, 1, 31).unwrap())
    );
    assert_eq!(bill.get("salary")?, &Value::Number(Decimal::from_str("1234.5")?));
    assert_eq!(
        bill.get("modified")?,
        &Value::Timestamp(NaiveDateTime::parse_from_str("2017-02-01 13:45:00", "%Y-%m-%d %H:%M:%S")?)
    );
    assert_eq!(
        bill.get("phone")?,
        &Value::Repeating(vec![Value::from("555-0100"), Value::from("555-0199")])
    );

    let base = Url::parse("https://fm.example/")?;
    let photo = bill.get("photo")?.container_url(&base).unwrap();
    assert_eq!(photo.path(), "/fmi/xml/cnt/photo.jpg");
    assert!(photo.query().unwrap().contains("-recid=1"));

    assert!(matches!(bill.get("nickname"), Err(Error::FieldNotFound { .. })));
    Ok(())
}

#[test]
fn portals_are_keyed_by_table() -> anyhow::Result<()> {
    let resultset = parse(CONTACTS, true)?;

    let orders = resultset[0].portal("orders").unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].record_id(), Some("10"));
    assert_eq!(orders[0].get("item")?, &Value::from("Widget"));
    assert_eq!(orders[1].get("amount")?, &Value::from(5i64));
    assert!(orders[0].layout().is_none());

    let empty = resultset[1].portal("Orders").unwrap();
    assert!(empty.is_empty());
    Ok(())
}

#[test]
fn bad_data_is_nulled_only_when_ignored() -> anyhow::Result<()> {
    let lenient = parse(CONTACTS, true)?;
    let will = &lenient[1];
    assert_eq!(will.get("salary")?, &Value::Null);
    assert_eq!(will.get("born")?, &Value::Null);
    assert_eq!(
        will.get("phone")?,
        &Value::Repeating(vec![Value::Null, Value::Null])
    );

    let err = parse(CONTACTS, false).unwrap_err();
    assert!(matches!(err, Error::Coercion { ref field, .. } if field == "Salary"));
    assert_eq!(err.kind(), Some(ErrorKind::NumberValidation));
    Ok(())
}

#[test]
fn parsing_twice_yields_equal_records() -> anyhow::Result<()> {
    let first = parse(CONTACTS, true)?;
    let second = parse(CONTACTS, true)?;
    assert_eq!(first.records(), second.records());
    assert_eq!(first.meta(), second.meta());
    Ok(())
}

#[test]
fn records_serialize_with_ids_and_portals() -> anyhow::Result<()> {
    let resultset = parse(CONTACTS, true)?;
    let json = serde_json::to_value(&resultset)?;

    assert_eq!(json[0]["-recid"], "1");
    assert_eq!(json[0]["first"], "Bill");
    assert_eq!(json[0]["orders"][1]["item"], "Gadget");
    assert_eq!(json[1]["born"], serde_json::Value::Null);
    Ok(())
}

#[test]
fn no_records_found_keeps_the_schema() -> anyhow::Result<()> {
    let resultset = parse(NO_RECORDS, false)?;
    assert!(resultset.is_empty());
    assert_eq!(resultset.foundset_count(), 0);
    assert!(resultset.schema().knows("first"));
    Ok(())
}

#[test]
fn layout_metadata_lists_controls_and_value_lists() -> anyhow::Result<()> {
    let template = Grammar::FmpXmlLayout.template()?;
    let meta = filemaker_sax::parse(
        LAYOUT.as_bytes(),
        &template,
        LayoutMetaBuilder::new(mapping(), false),
    )?
    .target
    .finish();

    assert_eq!(meta.layout().as_deref(), Some("Web"));
    assert_eq!(meta.field_names(), vec!["Name First", "Status", "Notes", "Badge"]);
    assert_eq!(meta.field_control("first").unwrap()[0].style(), &FieldStyle::EditBox);

    let status = meta.field_control("Status").unwrap();
    assert_eq!(status.len(), 2);
    assert_eq!(status[1].style(), &FieldStyle::RadioButtonSet);
    let items = status[0].value_list(&meta).unwrap();
    assert_eq!(items[0].value(), "active");
    assert_eq!(items[0].display(), "Active customer");
    assert_eq!(items[1].value_list_name(), "Statuses");

    assert_eq!(
        meta.field_control("badge").unwrap()[0].style(),
        &FieldStyle::Other("HOLOGRAM".into())
    );
    assert!(meta.field_control("notes").unwrap()[0].value_list_name().is_none());
    assert!(meta.value_list("statuses").is_some());
    Ok(())
}

#[test]
fn name_lists_take_the_first_column() -> anyhow::Result<()> {
    let template = Grammar::FmpXmlResult.template()?;
    let names = filemaker_sax::parse(NAMES.as_bytes(), &template, NameListBuilder::new(false))?
        .target
        .finish();
    assert_eq!(names, vec!["Contacts", "Inventory"]);
    Ok(())
}

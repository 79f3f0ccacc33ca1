use serde_json::{Value, json};
use sheetmap::{
    CellValue, ColumnSpec, FieldPath, GridAddress, GridSchema, GridSink, GridSource, RecordEvent,
    RecordReader, RecordWriter, SchemaDefinition,
};
use sheetmap_grid::{MemorySheet, WindowedSink};

fn path(text: &str) -> FieldPath {
    FieldPath::parse(text).unwrap()
}

fn address_schema() -> GridSchema {
    GridSchema::new(
        vec![
            ColumnSpec::new(FieldPath::from_segments(["id"])),
            ColumnSpec::new(FieldPath::from_segments(["address", "city"])),
            ColumnSpec::new(FieldPath::from_segments(["address", "zip"])),
        ],
        GridAddress::new(0, 0),
    )
}

fn write_all(schema: &GridSchema, records: &[Value]) -> MemorySheet {
    let mut writer = RecordWriter::new(MemorySheet::new("Data"), schema);
    writer.write_header().unwrap();
    for record in records {
        writer.write_record(record).unwrap();
    }
    writer.finish().unwrap()
}

fn read_all(schema: &GridSchema, sheet: MemorySheet) -> Vec<Value> {
    let mut reader = RecordReader::new(sheet, schema).unwrap();
    reader.records().collect::<Result<_, _>>().unwrap()
}

#[test]
fn scenario_write_then_read_back() {
    let schema = address_schema();
    let record = json!({"id": 7, "address": {"city": "Lyon", "zip": "69000"}});
    let mut sheet = write_all(&schema, std::slice::from_ref(&record));

    assert_eq!(sheet.get(GridAddress::new(1, 0)), Some(&CellValue::Int(7)));
    assert_eq!(sheet.get(GridAddress::new(1, 1)), Some(&CellValue::from("Lyon")));
    assert_eq!(sheet.get(GridAddress::new(1, 2)), Some(&CellValue::from("69000")));
    assert_eq!(
        sheet.cell_at(GridAddress::new(0, 1)).unwrap(),
        Some(CellValue::from("address.city"))
    );
    assert!(sheet.has_row(1));
    assert!(!sheet.has_row(2));

    assert_eq!(read_all(&schema, sheet), vec![record]);
}

#[test]
fn round_trip_preserves_nested_records() {
    let schema = GridSchema::builder(GridAddress::new(3, 2))
        .column("id")
        .column("customer.name")
        .column("customer.contact.email")
        .column("customer.contact.phone")
        .column("items[0].sku")
        .column("items[0].qty")
        .column("items[1].sku")
        .column("items[1].qty")
        .column("paid")
        .column("total")
        .build()
        .unwrap();
    let records = vec![
        json!({
            "id": 1,
            "customer": {"name": "Ada", "contact": {"email": "ada@example.com", "phone": "555"}},
            "items": [{"sku": "A-1", "qty": 2}, {"sku": "B-9", "qty": 1}],
            "paid": true,
            "total": 12.5
        }),
        json!({
            "id": 2,
            "customer": {"name": "Grace", "contact": {"email": "grace@example.com"}},
            "items": [{"sku": "C-3", "qty": 10}],
            "paid": false,
            "total": 99.0
        }),
    ];
    let sheet = write_all(&schema, &records);
    assert_eq!(read_all(&schema, sheet), records);
}

#[test]
fn reader_events_feed_a_writer_unchanged() {
    let schema = address_schema();
    let source = write_all(
        &schema,
        &[
            json!({"id": 1, "address": {"city": "Lyon"}}),
            json!({"id": 2, "address": {"zip": "75001"}}),
        ],
    );

    let reader = RecordReader::new(source, &schema).unwrap();
    let mut writer = RecordWriter::new(MemorySheet::new("Copy"), &schema);
    for event in reader {
        writer.write_event(event.unwrap()).unwrap();
    }
    let copy = writer.finish().unwrap();
    assert_eq!(copy.get(GridAddress::new(2, 2)), Some(&CellValue::from("75001")));
    assert_eq!(copy.get(GridAddress::new(2, 1)), None);
    assert_eq!(copy.row_count(), 3);
}

#[test]
fn windowed_sink_never_sees_more_than_one_open_row() {
    let schema = address_schema();
    let sink = WindowedSink::with_window(MemorySheet::new("Out"), 3);
    let mut writer = RecordWriter::new(sink, &schema);
    assert_eq!(writer.sink().row_window(), Some(3));

    for id in 0..20i64 {
        let record = json!({"id": id, "address": {"city": format!("c{id}")}});
        for event in sheetmap::tree::record_events(&record).unwrap() {
            let ends = event == RecordEvent::EndRecord;
            writer.write_event(event).unwrap();
            assert!(writer.pending_rows() <= 1);
            if ends {
                assert_eq!(writer.pending_rows(), 0);
            }
        }
        assert!(writer.sink().buffered_rows() <= 3);
    }
    let sink = writer.finish().unwrap();
    assert_eq!(sink.flushed_rows(), 20);
    let sheet = sink.into_inner().unwrap();
    assert_eq!(sheet.get(GridAddress::new(20, 1)), Some(&CellValue::from("c19")));
    assert_eq!(read_all(&schema, sheet).len(), 20);
}

#[test]
fn empty_schema_matches_nothing() {
    let schema = GridSchema::new(Vec::new(), GridAddress::ORIGIN);
    assert!(schema.find_column(GridAddress::new(1, 0)).is_none());
    assert!(schema.columns_matching(&path("x")).is_empty());
    assert!(schema.columns_matching(&FieldPath::root()).is_empty());

    let sheet = MemorySheet::from_rows("S", vec![vec![Some(CellValue::Int(1))]; 3]);
    let records = read_all(&schema, sheet);
    assert_eq!(records, vec![json!({}), json!({})]);
}

#[test]
fn prefix_matching_and_first_declared_wins() {
    let schema = GridSchema::new(
        vec![
            ColumnSpec::new(path("x.y")),
            ColumnSpec::new(path("k")),
            ColumnSpec::new(path("k")),
        ],
        GridAddress::new(0, 5),
    );
    let hits = schema.columns_matching(&FieldPath::from_segments(["x"]));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path(), &path("x.y"));
    assert!(schema.columns_matching(&FieldPath::from_segments(["z"])).is_empty());
    assert_eq!(schema.column_index_of(&path("k")), Some(6));
    assert!(schema.validate().is_err());
}

#[test]
fn yaml_definition_drives_typed_round_trip() {
    let def = SchemaDefinition::from_yaml_str(
        r#"
origin: A1
columns:
  - path: sku
  - path: shipped
    type: date
    format: "%d/%m/%Y"
  - path: qty
    type: integer
"#,
    )
    .unwrap();
    let schema = def.build().unwrap();

    let mut writer = RecordWriter::new(MemorySheet::new("Orders"), &schema);
    writer
        .write_record(&json!({"sku": "A-1", "shipped": "03/02/2024", "qty": "4"}))
        .unwrap();
    let sheet = writer.finish().unwrap();
    assert_eq!(
        sheet.get(GridAddress::new(1, 1)),
        Some(&CellValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 2, 3).unwrap()))
    );
    assert_eq!(sheet.get(GridAddress::new(1, 2)), Some(&CellValue::Int(4)));

    let records = read_all(&schema, sheet);
    assert_eq!(
        records,
        vec![json!({"sku": "A-1", "shipped": "2024-02-03", "qty": 4})]
    );
}

#[test]
fn blank_strings_survive_with_default_features() {
    let schema = GridSchema::builder(GridAddress::ORIGIN)
        .column("id")
        .column("note")
        .column("tags[0]")
        .build()
        .unwrap();
    let records = vec![
        json!({"id": 1, "note": ""}),
        json!({"id": 2, "note": "   ", "tags": [""]}),
    ];
    let sheet = write_all(&schema, &records);
    assert_eq!(read_all(&schema, sheet), records);
}

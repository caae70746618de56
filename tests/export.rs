use ifc_reader::export::{export_csv, export_json};
use ifc_reader::parser::parse_ifc_str;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

const OFFICE: &str = include_str!("fixtures/office.ifc");

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ifc-reader-{}-{name}", std::process::id()))
}

#[test]
fn json_export_carries_the_whole_result() {
    let result = parse_ifc_str(OFFICE).unwrap();
    let path = temp_path("office.json");

    export_json(&result, &path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(json["header"]["file_name"], "office.ifc");
    assert_eq!(json["spatial_structure"]["name"], "Office Project");
    assert_eq!(json["spatial_structure"]["kind"], "Project");
    assert_eq!(json["elements"].as_array().unwrap().len(), 4);

    let wall = &json["elements"][0];
    assert_eq!(wall["id"], "#10");
    assert_eq!(wall["container"], "#4");
    assert_eq!(wall["discipline"], "Structural");
    assert_eq!(wall["properties"]["FireRating"], "2HR");
    assert_eq!(wall["geometry"]["shape"]["kind"], "box");
    assert!(json["errors"].as_array().unwrap().is_empty());
}

#[test]
fn json_export_reports_errors_by_kind() {
    let content = OFFICE.replacen("DATA;\n", "DATA;\n#7=IFCWALL;\n", 1);
    let result = parse_ifc_str(&content).unwrap();
    let path = temp_path("errors.json");

    export_json(&result, &path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();

    let error = &json["errors"][0];
    assert_eq!(error["kind"], "instance_parsing_failed");
    assert_eq!(error["text"], "#7=IFCWALL;");
    assert_eq!(error["cause"]["kind"], "invalid_instance_format");
}

#[test]
fn csv_export_writes_one_row_per_element() {
    let result = parse_ifc_str(OFFICE).unwrap();
    let path = temp_path("office.csv");

    export_csv(&result, &path).unwrap();
    let csv = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(
        lines[0],
        "GUID,Id,Type,Name,Discipline,X,Y,Z,Container,Properties"
    );
    assert_eq!(
        lines[1],
        "3cUkl32yn9qRSPvBJVyWw5,#10,IFCWALL,\"Wall, north\",Structural,12,1,0,#4,3"
    );
    assert_eq!(
        lines[3],
        "3cUkl32yn9qRSPvBJVyWw7,#12,IFCPIPESEGMENT,Supply Pipe,Mechanical,,,,#4,0"
    );
}

#[test]
fn export_to_missing_directory_fails() {
    let result = parse_ifc_str(OFFICE).unwrap();
    let path = temp_path("missing-dir").join("out.json");

    assert!(export_json(&result, &path).is_err());
}

//! Property-based tests for best-effort parsing
//!
//! Malformed DATA lines must each cost exactly one recorded error and never
//! disturb what the rest of the file yields. Without an IFCPROJECT the parse
//! fails no matter what else the file contains. Reparsing gives equal results
//! apart from a header timestamp the file does not carry.

use ifc_reader::error::ParsingError;
use ifc_reader::parser::parse_ifc_str;
use proptest::prelude::*;

const OFFICE: &str = include_str!("fixtures/office.ifc");

/// Generate DATA lines that cannot decode into an instance
fn malformed_line_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        // No leading '#'
        "[a-z][a-z0-9 =(),]{0,20}",
        // No numeric id
        "#[a-z]{1,6}=IFCWALL\\(\\);",
        // Type name is not an IFC entity
        "#[0-9]{1,4}=[a-z]{1,8}\\(\\);",
        // No parameter list
        "#[0-9]{1,4}=IFCWALL;",
        // Id out of range
        "#[1-9][0-9]{20}=IFCWALL\\(\\);",
    ]
}

fn with_data_lines(content: &str, lines: &[String]) -> String {
    let mut injected = String::from("DATA;\n");
    for line in lines {
        injected.push_str(line);
        injected.push('\n');
    }
    content.replacen("DATA;\n", &injected, 1)
}

#[cfg(test)]
mod proptest_tests {
    use super::*;

    proptest! {
        #[test]
        fn each_malformed_line_is_one_error(
            lines in prop::collection::vec(malformed_line_strategy(), 0..12)
        ) {
            let baseline = parse_ifc_str(OFFICE).unwrap();
            let result = parse_ifc_str(&with_data_lines(OFFICE, &lines)).unwrap();

            prop_assert_eq!(result.errors.len(), lines.len());
            for (error, line) in result.errors.iter().zip(&lines) {
                match error {
                    ParsingError::InstanceParsingFailed { text, .. } => {
                        prop_assert_eq!(text, line.trim());
                    }
                    other => prop_assert!(false, "unexpected error: {other:?}"),
                }
            }
            prop_assert_eq!(result.elements, baseline.elements);
            prop_assert_eq!(result.spatial_structure, baseline.spatial_structure);
        }

        #[test]
        fn missing_project_is_always_fatal(
            lines in prop::collection::vec(malformed_line_strategy(), 0..6)
        ) {
            let without_project = OFFICE.replace("=IFCPROJECT(", "=IFCPROJECTLIBRARY(");
            let result = parse_ifc_str(&with_data_lines(&without_project, &lines));

            prop_assert_eq!(result, Err(ParsingError::MissingProject));
        }

        #[test]
        fn reparsing_gives_equal_results(
            lines in prop::collection::vec(malformed_line_strategy(), 0..6),
            drop_file_name in any::<bool>(),
        ) {
            let base = if drop_file_name {
                OFFICE.replace("FILE_NAME(", "FILE_NAMES(")
            } else {
                OFFICE.to_string()
            };
            let content = with_data_lines(&base, &lines);
            let first = parse_ifc_str(&content).unwrap();
            let second = parse_ifc_str(&content).unwrap();

            // the header timestamp falls back to the parse time
            if !drop_file_name {
                prop_assert_eq!(&first.header, &second.header);
            }
            prop_assert_eq!(first.elements, second.elements);
            prop_assert_eq!(first.spatial_structure, second.spatial_structure);
            prop_assert_eq!(first.property_sets, second.property_sets);
            prop_assert_eq!(first.errors, second.errors);
        }

        #[test]
        fn nested_lists_of_any_depth_decode(levels in 0usize..4000) {
            let line = format!(
                "#14=IFCWALL('n',$,'Nested',{}{},$);",
                "(".repeat(levels),
                ")".repeat(levels)
            );
            let result = parse_ifc_str(&with_data_lines(OFFICE, &[line])).unwrap();

            prop_assert!(result.errors.is_empty());
            prop_assert_eq!(result.elements.len(), 5);
        }

        #[test]
        fn arbitrary_input_never_panics(content in "\\PC{0,200}") {
            match parse_ifc_str(&content) {
                Ok(_) | Err(ParsingError::MissingProject) => {}
                Err(other) => prop_assert!(false, "unexpected fatal error: {other:?}"),
            }
        }
    }
}

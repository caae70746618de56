use std::path::Path;

use crate::error::{ParseError, ParsingError};
use crate::model::ParsingResult;
use crate::parser::elements::extract_elements;
use crate::parser::header::read_header;
use crate::parser::properties::PropertyIndex;
use crate::parser::spatial::build_spatial_hierarchy;
use crate::parser::step::{decode_instances, split_sections};

/// Limits and switches for a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Deepest spatial tree level that may still receive children.
    pub max_hierarchy_depth: usize,
    /// Longest placement chain followed before giving up on an element.
    pub max_placement_depth: usize,
    /// Read a coarse shape from each element's representation.
    pub extract_shapes: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_hierarchy_depth: 32,
            max_placement_depth: 64,
            extract_shapes: true,
        }
    }
}

/// Best-effort IFC reader.
///
/// Holds only options, so one parser can be shared across threads; every
/// parse builds and owns its own instance table.
#[derive(Debug, Clone, Default)]
pub struct IfcParser {
    options: ParserOptions,
}

impl IfcParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: ParserOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Reads and parses an IFC file.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::FileRead`] if the file cannot be read and
    /// [`ParseError::Fatal`] if it has no IFCPROJECT.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsingResult, ParseError> {
        let bytes = std::fs::read(&path).map_err(|source| ParseError::FileRead {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.as_ref().display(), bytes = bytes.len(), "reading IFC file");

        self.parse_bytes(&bytes).map_err(ParseError::from)
    }

    /// Parses IFC content from raw bytes. Invalid UTF-8 is replaced, since
    /// some producers still write ISO 8859-1.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsingResult, ParsingError> {
        self.parse_str(&String::from_utf8_lossy(bytes))
    }

    /// Parses IFC content.
    ///
    /// # Errors
    ///
    /// Returns [`ParsingError::MissingProject`] if the DATA section has no
    /// IFCPROJECT. Every other problem is recorded in
    /// [`ParsingResult::errors`].
    pub fn parse_str(&self, content: &str) -> Result<ParsingResult, ParsingError> {
        let sections = split_sections(content);
        let header = read_header(&sections.header);

        let (table, mut errors) = decode_instances(&sections.data);
        tracing::debug!(
            lines = sections.data.len(),
            instances = table.len(),
            malformed = errors.len(),
            "decoded DATA section"
        );

        let spatial_structure = build_spatial_hierarchy(&table, self.options.max_hierarchy_depth)
            .inspect_err(|_| tracing::error!("no IFCPROJECT instance, aborting parse"))?;

        let properties = PropertyIndex::build(&table);
        let (elements, element_errors) = extract_elements(&table, &properties, &self.options);
        errors.extend(element_errors);

        tracing::info!(
            elements = elements.len(),
            property_sets = properties.sets.len(),
            errors = errors.len(),
            "parsed IFC content"
        );

        Ok(ParsingResult {
            header,
            elements,
            spatial_structure,
            property_sets: properties.sets,
            errors,
        })
    }
}

/// Parses an IFC file with default options.
///
/// # Example
///
/// ```no_run
/// use ifc_reader::parser::parse_ifc_file;
///
/// let result = parse_ifc_file("model.ifc")?;
/// for element in &result.elements {
///     println!("{} {} ({})", element.type_name, element.name, element.discipline);
/// }
/// # Ok::<(), ifc_reader::error::ParseError>(())
/// ```
pub fn parse_ifc_file<P: AsRef<Path>>(path: P) -> Result<ParsingResult, ParseError> {
    IfcParser::new().parse_file(path)
}

/// Parses IFC content with default options.
pub fn parse_ifc_str(content: &str) -> Result<ParsingResult, ParsingError> {
    IfcParser::new().parse_str(content)
}

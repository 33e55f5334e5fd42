use crate::document::{json_string_len, Document, DocumentId, SourceDocument};
use crate::error::MeasureError;
use crate::measure::catalog::PathCatalog;
use crate::measure::types::{MalformedPolicy, MeasureConfig, Measurement, StructuralType};
use crate::path::AttributePath;
use std::collections::HashSet;

/// Everything measuring one document produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasureOutcome {
    pub measurements: Vec<Measurement>,
    pub errors: Vec<MeasureError>,
}

/// The recursive core: turns one document into one measurement per path
///
/// Present paths are emitted in pre-order (container before its children,
/// children in key or index order), followed by an `absent` row for every
/// catalogued path the document lacks.
#[derive(Debug, Clone, Copy)]
pub struct StructuralMeasurer<'c> {
    catalog: &'c PathCatalog,
    config: MeasureConfig,
}

/// Serialized size and field count of a measured value
#[derive(Debug, Clone, Copy)]
struct Footprint {
    size: u64,
    fields: u64,
}

impl<'c> StructuralMeasurer<'c> {
    pub fn new(catalog: &'c PathCatalog, config: MeasureConfig) -> Self {
        StructuralMeasurer { catalog, config }
    }

    /// Measure a document, failing on the first malformed value unless the
    /// policy allows skipping it.
    ///
    /// Values skipped under `MalformedPolicy::SkipValue` are not reported
    /// here; use `measure_outcome` to see them.
    pub fn measure(&self, document: &SourceDocument) -> Result<Vec<Measurement>, MeasureError> {
        let outcome = self.measure_outcome(document);
        match (self.config.on_malformed, outcome.errors.into_iter().next()) {
            (MalformedPolicy::SkipDocument, Some(error)) => Err(error),
            _ => Ok(outcome.measurements),
        }
    }

    /// Measure a document, returning rows and any malformed values found
    pub fn measure_outcome(&self, document: &SourceDocument) -> MeasureOutcome {
        let mut walk = Walk {
            document_id: &document.id,
            policy: self.config.on_malformed,
            rows: Vec::with_capacity(self.catalog.len()),
            errors: Vec::new(),
        };

        if let Err(error) = walk.visit(&document.body, AttributePath::root()) {
            return MeasureOutcome {
                measurements: Vec::new(),
                errors: vec![error],
            };
        }

        let Walk {
            mut rows, errors, ..
        } = walk;

        let present: HashSet<&AttributePath> = rows.iter().map(|m| &m.attribute_path).collect();
        let absent: Vec<Measurement> = self
            .catalog
            .iter()
            .filter(|(path, _)| !present.contains(path))
            .map(|(path, _)| Measurement::absent(document.id.clone(), path.clone()))
            .collect();
        rows.extend(absent);

        MeasureOutcome {
            measurements: rows,
            errors,
        }
    }
}

/// State of one pre-order walk over a document
struct Walk<'d> {
    document_id: &'d DocumentId,
    policy: MalformedPolicy,
    rows: Vec<Measurement>,
    errors: Vec<MeasureError>,
}

impl Walk<'_> {
    /// Measure `value` and everything below it.
    ///
    /// Returns `Ok(None)` when the value was skipped as malformed; its parent
    /// then treats it as missing.
    fn visit(&mut self, value: &Document, path: AttributePath) -> Result<Option<Footprint>, MeasureError> {
        match value {
            Document::Opaque { type_name } => self.reject(MeasureError::MalformedDocument {
                document_id: self.document_id.clone(),
                path,
                type_name: type_name.clone(),
            }),
            Document::Scalar(scalar) => {
                let footprint = Footprint {
                    size: scalar.serialized_len() as u64,
                    fields: 0,
                };
                self.emit(path, StructuralType::Scalar, footprint);
                Ok(Some(footprint))
            }
            Document::Sequence(items) => {
                let slot = self.reserve(&path, StructuralType::Sequence);
                let mut footprint = Footprint { size: 2, fields: 0 };
                let mut measured = 0;

                for (index, item) in items.iter().enumerate() {
                    let Some(child) = self.visit(item, path.child_index(index))? else {
                        continue;
                    };
                    if measured > 0 {
                        footprint.size += 1;
                    }
                    footprint.size += child.size;
                    footprint.fields += 1 + child.fields;
                    measured += 1;
                }

                self.fill(slot, footprint);
                Ok(Some(footprint))
            }
            Document::Mapping(members) => {
                let slot = self.reserve(&path, StructuralType::Mapping);
                let mut footprint = Footprint { size: 2, fields: 0 };
                let mut measured = 0;
                let mut seen = HashSet::with_capacity(members.len());

                for (key, member) in members {
                    // first occurrence wins
                    if !seen.insert(key.as_str()) {
                        self.reject(MeasureError::DuplicateKey {
                            document_id: self.document_id.clone(),
                            path: path.child_key(key),
                        })?;
                        continue;
                    }
                    let Some(child) = self.visit(member, path.child_key(key))? else {
                        continue;
                    };
                    if measured > 0 {
                        footprint.size += 1;
                    }
                    // "key": value
                    footprint.size += json_string_len(key) as u64 + 1 + child.size;
                    footprint.fields += 1 + child.fields;
                    measured += 1;
                }

                self.fill(slot, footprint);
                Ok(Some(footprint))
            }
        }
    }

    /// Fail the walk or record the error and skip the value, per policy
    fn reject(&mut self, error: MeasureError) -> Result<Option<Footprint>, MeasureError> {
        match self.policy {
            MalformedPolicy::SkipDocument => Err(error),
            MalformedPolicy::SkipValue => {
                self.errors.push(error);
                Ok(None)
            }
        }
    }

    fn emit(&mut self, path: AttributePath, structural_type: StructuralType, footprint: Footprint) {
        let depth = path.depth();
        self.rows.push(Measurement {
            document_id: self.document_id.clone(),
            attribute_path: path,
            structural_type,
            size_bytes: footprint.size,
            field_count: footprint.fields,
            depth,
        });
    }

    /// Push a container row before its children; sizes are known only after them
    fn reserve(&mut self, path: &AttributePath, structural_type: StructuralType) -> usize {
        self.emit(path.clone(), structural_type, Footprint { size: 0, fields: 0 });
        self.rows.len() - 1
    }

    fn fill(&mut self, slot: usize, footprint: Footprint) {
        if let Some(row) = self.rows.get_mut(slot) {
            row.size_bytes = footprint.size;
            row.field_count = footprint.fields;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn source(id: &str, value: Value) -> SourceDocument {
        SourceDocument::new(DocumentId::new(id), value)
    }

    fn find<'a>(rows: &'a [Measurement], path: &str) -> &'a Measurement {
        let path: AttributePath = path.parse().unwrap();
        rows.iter()
            .find(|m| m.attribute_path == path)
            .unwrap_or_else(|| panic!("no measurement for {}", path))
    }

    fn malformed_document() -> SourceDocument {
        SourceDocument {
            id: DocumentId::new("doc-7"),
            body: Document::Mapping(vec![
                ("a".to_string(), Document::from(json!(1))),
                (
                    "d".to_string(),
                    Document::Mapping(vec![
                        ("ok".to_string(), Document::from(json!("yes"))),
                        ("weird".to_string(), Document::opaque("binary")),
                        ("after".to_string(), Document::from(json!([1, 2]))),
                    ]),
                ),
                ("z".to_string(), Document::from(json!(true))),
            ]),
        }
    }

    #[test]
    fn test_reference_document() {
        let doc = source("d1", json!({"a": 1, "b": [1, 2, 3], "c": {"x": "hello"}}));
        let catalog = PathCatalog::from_documents([&doc.body]);
        let rows = StructuralMeasurer::new(&catalog, MeasureConfig::default())
            .measure(&doc)
            .unwrap();

        let order: Vec<String> = rows.iter().map(|m| m.attribute_path.to_string()).collect();
        assert_eq!(order, vec!["$", "a", "b", "b[0]", "b[1]", "b[2]", "c", "c.x"]);

        let b = find(&rows, "b");
        assert_eq!(b.structural_type, StructuralType::Sequence);
        assert_eq!(b.field_count, 3);
        assert_eq!(b.size_bytes, "[1,2,3]".len() as u64);
        assert_eq!(b.depth, 1);

        let c = find(&rows, "c");
        assert_eq!(c.structural_type, StructuralType::Mapping);
        assert_eq!(c.field_count, 1);
        assert_eq!(c.size_bytes, r#"{"x":"hello"}"#.len() as u64);

        let x = find(&rows, "c.x");
        assert_eq!(x.structural_type, StructuralType::Scalar);
        assert_eq!(x.field_count, 0);
        assert_eq!(x.size_bytes, 7);
        assert_eq!(x.depth, 2);

        let root = find(&rows, "$");
        assert_eq!(root.field_count, 3 + 3 + 1);
        assert_eq!(
            root.size_bytes,
            serde_json::to_string(&doc.body).unwrap().len() as u64
        );
    }

    #[test]
    fn test_absent_paths_follow_present_ones() {
        let docs = vec![
            source("full", json!({"a": 1, "b": {"c": [true]}})),
            source("sparse", json!({"a": 2})),
        ];
        let catalog = PathCatalog::from_documents(docs.iter().map(|d| &d.body));
        let measurer = StructuralMeasurer::new(&catalog, MeasureConfig::default());

        let rows = measurer.measure(&docs[1]).unwrap();
        let summary: Vec<(String, StructuralType, u64)> = rows
            .iter()
            .map(|m| (m.attribute_path.to_string(), m.structural_type, m.size_bytes))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("$".to_string(), StructuralType::Mapping, 7),
                ("a".to_string(), StructuralType::Scalar, 1),
                ("b".to_string(), StructuralType::Absent, 0),
                ("b.c".to_string(), StructuralType::Absent, 0),
                ("b.c[0]".to_string(), StructuralType::Absent, 0),
            ]
        );
        assert!(rows.iter().all(|m| m.document_id == DocumentId::new("sparse")));
    }

    #[test]
    fn test_uncatalogued_paths_are_still_measured() {
        let catalog = PathCatalog::new();
        let doc = source("d", json!({"k": [null]}));
        let rows = StructuralMeasurer::new(&catalog, MeasureConfig::default())
            .measure(&doc)
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(find(&rows, "k[0]").size_bytes, 4);
    }

    #[test]
    fn test_field_counts_nest() {
        let doc = source("d", json!({"a": {"b": 1}, "l": [[1, 2]], "e": [], "o": {}}));
        let catalog = PathCatalog::from_documents([&doc.body]);
        let rows = StructuralMeasurer::new(&catalog, MeasureConfig::default())
            .measure(&doc)
            .unwrap();

        assert_eq!(find(&rows, "a").field_count, 1);
        assert_eq!(find(&rows, "l").field_count, 3);
        assert_eq!(find(&rows, "l[0]").field_count, 2);
        assert_eq!(find(&rows, "e").field_count, 0);
        assert_eq!(find(&rows, "e").size_bytes, 2);
        assert_eq!(find(&rows, "o").field_count, 0);
        assert_eq!(find(&rows, "o").structural_type, StructuralType::Mapping);
        // 4 keys + a(1) + l(3) + e(0) + o(0)
        assert_eq!(find(&rows, "$").field_count, 8);
    }

    #[test]
    fn test_scalar_document() {
        let doc = source("s", json!("just a string"));
        let catalog = PathCatalog::from_documents([&doc.body]);
        let rows = StructuralMeasurer::new(&catalog, MeasureConfig::default())
            .measure(&doc)
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].structural_type, StructuralType::Scalar);
        assert_eq!(rows[0].size_bytes, 15);
        assert_eq!(rows[0].depth, 0);
    }

    #[test]
    fn test_measure_is_idempotent() {
        let doc = source("d", json!({"x": [{"y": 1}, {"z": [2, 3]}], "w": "v"}));
        let catalog = PathCatalog::from_documents([&doc.body]);
        let measurer = StructuralMeasurer::new(&catalog, MeasureConfig::default());

        assert_eq!(measurer.measure(&doc).unwrap(), measurer.measure(&doc).unwrap());
    }

    #[test]
    fn test_malformed_skips_document_by_default() {
        let doc = malformed_document();
        let catalog = PathCatalog::from_documents([&doc.body]);
        let measurer = StructuralMeasurer::new(&catalog, MeasureConfig::default());

        let err = measurer.measure(&doc).unwrap_err();
        let MeasureError::MalformedDocument {
            document_id,
            path,
            type_name,
        } = err
        else {
            panic!("Expected malformed document error");
        };
        assert_eq!(document_id, DocumentId::new("doc-7"));
        assert_eq!(path.to_string(), "d.weird");
        assert_eq!(type_name, "binary");

        let outcome = measurer.measure_outcome(&doc);
        assert!(outcome.measurements.is_empty());
        assert_eq!(outcome.errors.len(), 1);
    }

    #[test]
    fn test_malformed_value_skipped_keeps_siblings() {
        let doc = malformed_document();
        let catalog = PathCatalog::from_documents([&doc.body]);
        let config = MeasureConfig {
            on_malformed: MalformedPolicy::SkipValue,
        };
        let measurer = StructuralMeasurer::new(&catalog, config);

        let outcome = measurer.measure_outcome(&doc);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(
            outcome.errors[0].to_string(),
            "document doc-7: unsupported value of type `binary` at d.weird"
        );

        let rows = &outcome.measurements;
        let d = find(rows, "d");
        assert_eq!(d.structural_type, StructuralType::Mapping);
        assert_eq!(d.size_bytes, r#"{"ok":"yes","after":[1,2]}"#.len() as u64);
        assert_eq!(d.field_count, 2 + 2);
        assert_eq!(find(rows, "d.after[1]").size_bytes, 1);
        assert_eq!(find(rows, "z").structural_type, StructuralType::Scalar);
        assert!(rows.iter().all(|m| m.attribute_path.to_string() != "d.weird"));

        assert_eq!(measurer.measure(&doc).unwrap(), outcome.measurements);
    }

    #[test]
    fn test_mapping_keys_keep_document_order() {
        let doc = source("d", json!({"zeta": 1, "alpha": {"y": 1, "b": 2}}));
        let catalog = PathCatalog::from_documents([&doc.body]);
        let rows = StructuralMeasurer::new(&catalog, MeasureConfig::default())
            .measure(&doc)
            .unwrap();

        let order: Vec<String> = rows.iter().map(|m| m.attribute_path.to_string()).collect();
        assert_eq!(order, vec!["$", "zeta", "alpha", "alpha.y", "alpha.b"]);
        assert_eq!(
            find(&rows, "$").size_bytes,
            r#"{"zeta":1,"alpha":{"y":1,"b":2}}"#.len() as u64
        );
    }

    fn duplicate_key_document() -> SourceDocument {
        SourceDocument {
            id: DocumentId::new("dup"),
            body: Document::Mapping(vec![
                ("k".to_string(), Document::from(json!(1))),
                ("k".to_string(), Document::from(json!([1, 2]))),
                ("m".to_string(), Document::from(json!("x"))),
            ]),
        }
    }

    #[test]
    fn test_duplicate_key_skips_document_by_default() {
        let doc = duplicate_key_document();
        let catalog = PathCatalog::from_documents([&doc.body]);
        let measurer = StructuralMeasurer::new(&catalog, MeasureConfig::default());

        let err = measurer.measure(&doc).unwrap_err();
        assert_eq!(
            err,
            MeasureError::DuplicateKey {
                document_id: DocumentId::new("dup"),
                path: "k".parse().unwrap(),
            }
        );
        assert_eq!(err.to_string(), "document dup: duplicate key at k");
        assert!(measurer.measure_outcome(&doc).measurements.is_empty());
    }

    #[test]
    fn test_duplicate_key_keeps_first_member() {
        let doc = duplicate_key_document();
        let catalog = PathCatalog::from_documents([&doc.body]);
        let config = MeasureConfig {
            on_malformed: MalformedPolicy::SkipValue,
        };
        let measurer = StructuralMeasurer::new(&catalog, config);

        let outcome = measurer.measure_outcome(&doc);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].path().to_string(), "k");

        let rows = &outcome.measurements;
        assert_eq!(rows.len(), catalog.len());
        let k_rows: Vec<&Measurement> = rows
            .iter()
            .filter(|m| m.attribute_path.to_string() == "k")
            .collect();
        assert_eq!(k_rows.len(), 1);
        assert_eq!(k_rows[0].structural_type, StructuralType::Scalar);
        // the second `k` was a sequence in the catalog; its elements are absent here
        assert_eq!(find(rows, "k[0]").structural_type, StructuralType::Absent);
        assert_eq!(find(rows, "$").size_bytes, r#"{"k":1,"m":"x"}"#.len() as u64);
        assert_eq!(find(rows, "$").field_count, 2);
    }

    #[test]
    fn test_measure_hides_skipped_values() {
        let doc = malformed_document();
        let catalog = PathCatalog::from_documents([&doc.body]);
        let measurer = StructuralMeasurer::new(
            &catalog,
            MeasureConfig {
                on_malformed: MalformedPolicy::SkipValue,
            },
        );

        let rows = measurer.measure(&doc).unwrap();
        let outcome = measurer.measure_outcome(&doc);
        assert_eq!(rows, outcome.measurements);
        assert_eq!(outcome.errors.len(), 1);
    }
}

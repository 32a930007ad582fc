//! Line-oriented tab-separated mapping codec.
//!
//! ```text
//! v1	official	intermediary	named
//! CLASS	a	net/ex/class_1	net/ex/Alpha
//! FIELD	a	I	x	field_1	counter
//! METHOD	a	()V	run	method_1	tick
//! ```
//!
//! `FIELD`/`METHOD` rows name their owner class and the member descriptor in
//! the first namespace, then one name per namespace. Serialization is
//! canonical (classes and members in sorted first-namespace order, members
//! after their class, fields before methods), so a canonical document
//! round-trips byte-for-byte through parse + serialize.

use std::fmt::Write as _;

use crate::error::MappingError;
use crate::table::{ClassMapping, MappingTable, MemberKey};

const HEADER: &str = "v1";

/// Parse a complete document into a fresh table whose namespaces come from
/// the header line.
pub fn parse(text: &str) -> Result<MappingTable, MappingError> {
    let namespaces = parse_header(text)?;
    let mut table = MappingTable::new(namespaces);
    parse_into(text, &mut table)?;
    Ok(table)
}

/// Merge a document into an existing table.
///
/// The document's namespace list must equal the table's exactly. Rows
/// replace existing records per the table's wholesale-replacement policy.
pub fn parse_into(text: &str, table: &mut MappingTable) -> Result<(), MappingError> {
    let found = parse_header(text)?;
    if found != table.namespaces() {
        return Err(MappingError::NamespaceMismatch {
            expected: table.namespaces().to_vec(),
            found,
        });
    }
    let width = table.namespaces().len();

    for (idx, line) in text.lines().enumerate().skip(1) {
        let line_no = idx + 1;
        if line.is_empty() {
            continue;
        }
        let mut cols = line.split('\t');
        let kind = cols.next().unwrap_or_default();
        let cols: Vec<&str> = cols.collect();

        let fail = |message: String| MappingError::Parse {
            line: line_no,
            message,
        };

        match kind {
            "CLASS" => {
                if cols.len() != width {
                    return Err(fail(format!(
                        "CLASS row has {} names, expected {width}",
                        cols.len()
                    )));
                }
                table.insert_class(ClassMapping::new(cols))?;
            }
            "FIELD" | "METHOD" => {
                if cols.len() != width + 2 {
                    return Err(fail(format!(
                        "{kind} row has {} columns, expected {}",
                        cols.len(),
                        width + 2
                    )));
                }
                let owner = cols[0];
                let key = MemberKey::new(cols[2], cols[1]);
                let names: Vec<String> = cols[2..].iter().map(|s| s.to_string()).collect();
                let result = if kind == "FIELD" {
                    table.insert_field(owner, key, names)
                } else {
                    table.insert_method(owner, key, names)
                };
                result.map_err(|e| match e {
                    MappingError::OrphanMember { owner } => {
                        fail(format!("member of unknown class {owner:?}"))
                    }
                    other => other,
                })?;
            }
            other => return Err(fail(format!("unknown record kind {other:?}"))),
        }
    }
    Ok(())
}

fn parse_header(text: &str) -> Result<Vec<String>, MappingError> {
    let first = text.lines().next().unwrap_or_default();
    let mut cols = first.split('\t');
    if cols.next() != Some(HEADER) {
        return Err(MappingError::Parse {
            line: 1,
            message: format!("expected {HEADER:?} header, got {first:?}"),
        });
    }
    let namespaces: Vec<String> = cols.map(|s| s.to_string()).collect();
    if namespaces.len() < 2 {
        return Err(MappingError::Parse {
            line: 1,
            message: "header names fewer than two namespaces".to_string(),
        });
    }
    Ok(namespaces)
}

/// Serialize the table canonically.
pub fn serialize(table: &MappingTable) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    for ns in table.namespaces() {
        out.push('\t');
        out.push_str(ns);
    }
    out.push('\n');

    for class in table.classes() {
        out.push_str("CLASS");
        for name in &class.names {
            out.push('\t');
            out.push_str(name);
        }
        out.push('\n');
        for (kind, members) in [("FIELD", &class.fields), ("METHOD", &class.methods)] {
            for (key, names) in members {
                let _ = write!(out, "{kind}\t{}\t{}", class.primary_name(), key.descriptor);
                for name in names {
                    out.push('\t');
                    out.push_str(name);
                }
                out.push('\n');
            }
        }
    }
    out
}

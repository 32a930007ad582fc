//! Static discovery of library filenames from a class file's initializer.
//!
//! Legacy patch archives embed their auto-downloaded library list as string
//! constants inside one class's static initializer, next to string constants
//! holding those libraries' checksums. The sniffer parses the class file
//! (never executing it), walks only the `<clinit>` bytecode, and keeps the
//! string constants that end with a library-filename suffix.
//!
//! Filenames are told apart from the co-located checksum literals purely by
//! that suffix. This is a deliberate heuristic carried over from the legacy
//! layout: a class that stops suffixing its filenames would yield false
//! negatives. Do not strengthen it without revisiting the fetch logic that
//! assumes exactly this literal set.

pub use error::{Result, SniffError};

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::classfile::ClassFile;

mod classfile;
mod error;

/// JVM name of the static initializer method.
const CLINIT: &str = "<clinit>";

/// Suffix used for jar-packaged libraries.
pub const JAR_SUFFIX: &str = ".jar";

/// Extract every string literal loaded by the class's static initializer
/// whose value ends with `suffix`, in order of appearance, deduplicated.
///
/// A class without a static initializer yields an empty set.
pub fn sniff(class_bytes: &[u8], suffix: &str) -> Result<Vec<String>> {
    let class = ClassFile::parse(class_bytes)?;
    let Some(code) = class.method_code(CLINIT) else {
        return Ok(Vec::new());
    };

    let mut found: Vec<String> = Vec::new();
    for literal in class.loaded_strings(code)? {
        if literal.ends_with(suffix) && !found.iter().any(|f| f == literal) {
            debug!(library = literal, "sniffed library literal");
            found.push(literal.to_string());
        }
    }
    Ok(found)
}

/// Run [`sniff`] over one class entry of a jar/zip archive.
///
/// Returns `Ok(None)` when the archive has no such entry; the caller treats
/// that as "no legacy-library manifest present", not as an error.
pub fn sniff_archive(
    archive_path: &Path,
    entry_name: &str,
    suffix: &str,
) -> Result<Option<Vec<String>>> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|source| SniffError::Archive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let mut entry = match archive.by_name(entry_name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(source) => {
            return Err(SniffError::Archive {
                path: archive_path.to_path_buf(),
                source,
            });
        }
    };

    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;
    drop(entry);

    sniff(&bytes, suffix).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Hand-assembled class file: a constant pool of UTF-8/String entries
    /// and a single `<clinit>` whose code is supplied verbatim.
    fn class_with_clinit(strings: &[&str], code_for: impl Fn(&[u16]) -> Vec<u8>) -> Vec<u8> {
        let mut pool: Vec<Vec<u8>> = Vec::new();
        let push_utf8 = |pool: &mut Vec<Vec<u8>>, text: &str| -> u16 {
            let mut e = vec![1u8];
            e.extend((text.len() as u16).to_be_bytes());
            e.extend(text.as_bytes());
            pool.push(e);
            pool.len() as u16
        };

        let clinit = push_utf8(&mut pool, "<clinit>");
        let void_desc = push_utf8(&mut pool, "()V");
        let code_name = push_utf8(&mut pool, "Code");

        // One String entry per literal, remembering its pool index.
        let mut string_indices = Vec::new();
        for s in strings {
            let utf8 = push_utf8(&mut pool, s);
            pool.push({
                let mut e = vec![8u8];
                e.extend(utf8.to_be_bytes());
                e
            });
            string_indices.push(pool.len() as u16);
        }

        let code = code_for(&string_indices);

        let mut out = Vec::new();
        out.extend(0xCAFE_BABEu32.to_be_bytes());
        out.extend(0u16.to_be_bytes()); // minor
        out.extend(50u16.to_be_bytes()); // major
        out.extend(((pool.len() + 1) as u16).to_be_bytes());
        for entry in &pool {
            out.extend(entry);
        }
        out.extend(0x0021u16.to_be_bytes()); // access
        out.extend(0u16.to_be_bytes()); // this
        out.extend(0u16.to_be_bytes()); // super
        out.extend(0u16.to_be_bytes()); // interfaces
        out.extend(0u16.to_be_bytes()); // fields
        out.extend(1u16.to_be_bytes()); // methods
        out.extend(0x0008u16.to_be_bytes()); // static
        out.extend(clinit.to_be_bytes());
        out.extend(void_desc.to_be_bytes());
        out.extend(1u16.to_be_bytes()); // one attribute: Code
        out.extend(code_name.to_be_bytes());
        out.extend(((code.len() + 8) as u32).to_be_bytes());
        out.extend(2u16.to_be_bytes()); // max_stack
        out.extend(0u16.to_be_bytes()); // max_locals
        out.extend((code.len() as u32).to_be_bytes());
        out.extend(&code);
        out
    }

    fn ldc_all_and_return(indices: &[u16]) -> Vec<u8> {
        let mut code = Vec::new();
        for idx in indices {
            if *idx <= 0xff {
                code.push(0x12);
                code.push(*idx as u8);
            } else {
                code.push(0x13);
                code.extend(idx.to_be_bytes());
            }
            code.push(0x57); // pop
        }
        code.push(0xb1); // return
        code
    }

    #[test]
    fn keeps_jar_literals_and_drops_hashes() {
        let bytes = class_with_clinit(&["foo-1.0.jar", "deadbeef"], ldc_all_and_return);
        let found = sniff(&bytes, JAR_SUFFIX).unwrap();
        assert_eq!(found, vec!["foo-1.0.jar"]);
    }

    #[test]
    fn preserves_order_and_deduplicates() {
        let bytes = class_with_clinit(
            &["b-2.0.jar", "a-1.0.jar", "b-2.0.jar", "cafebabe"],
            ldc_all_and_return,
        );
        let found = sniff(&bytes, JAR_SUFFIX).unwrap();
        assert_eq!(found, vec!["b-2.0.jar", "a-1.0.jar"]);
    }

    #[test]
    fn class_without_clinit_yields_empty_set() {
        // Rename the initializer so no <clinit> exists.
        let mut bytes = class_with_clinit(&["foo-1.0.jar"], ldc_all_and_return);
        let pos = bytes
            .windows(8)
            .position(|w| w == b"<clinit>")
            .expect("initializer name present");
        bytes[pos..pos + 8].copy_from_slice(b"whatever");
        assert!(sniff(&bytes, JAR_SUFFIX).unwrap().is_empty());
    }

    #[test]
    fn walks_past_wide_and_branch_instructions() {
        let bytes = class_with_clinit(&["lib.jar"], |indices| {
            let mut code = Vec::new();
            code.extend([0x10, 0x2a]); // bipush 42
            code.push(0x3b); // istore_0
            code.extend([0xc4, 0x15, 0x00, 0x00]); // wide iload 0
            code.push(0x57); // pop
            code.extend([0xa7, 0x00, 0x03]); // goto +3
            code.extend([0x12, indices[0] as u8, 0x57]); // ldc, pop
            code.push(0xb1);
            code
        });
        assert_eq!(sniff(&bytes, JAR_SUFFIX).unwrap(), vec!["lib.jar"]);
    }

    #[test]
    fn rejects_non_class_bytes() {
        assert!(matches!(
            sniff(b"PK\x03\x04not a class", JAR_SUFFIX),
            Err(SniffError::BadMagic)
        ));
    }

    #[test]
    fn archive_without_target_class_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("patch.jar");
        let file = std::fs::File::create(&jar).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("other/Thing.class", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"irrelevant").unwrap();
        writer.finish().unwrap();

        let result = sniff_archive(&jar, "relauncher/CoreLibraries.class", JAR_SUFFIX).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn archive_with_target_class_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("patch.jar");
        let class = class_with_clinit(&["argo-2.25.jar", "deadbeef"], ldc_all_and_return);

        let file = std::fs::File::create(&jar).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(
                "relauncher/CoreLibraries.class",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
        writer.write_all(&class).unwrap();
        writer.finish().unwrap();

        let found = sniff_archive(&jar, "relauncher/CoreLibraries.class", JAR_SUFFIX)
            .unwrap()
            .unwrap();
        assert_eq!(found, vec!["argo-2.25.jar"]);
    }
}

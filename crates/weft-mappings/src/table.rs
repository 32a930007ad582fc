use std::collections::BTreeMap;

use crate::error::MappingError;

/// Key of a field or method record: name and descriptor in the table's
/// first namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MemberKey {
    pub name: String,
    pub descriptor: String,
}

impl MemberKey {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }
}

/// One class record: its name in every namespace plus member records.
///
/// `names` is parallel to the owning table's namespace list; members are
/// keyed by their first-namespace identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMapping {
    pub names: Vec<String>,
    pub fields: BTreeMap<MemberKey, Vec<String>>,
    pub methods: BTreeMap<MemberKey, Vec<String>>,
}

impl ClassMapping {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
        }
    }

    pub fn field(
        mut self,
        key: MemberKey,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.fields
            .insert(key, names.into_iter().map(Into::into).collect());
        self
    }

    pub fn method(
        mut self,
        key: MemberKey,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.methods
            .insert(key, names.into_iter().map(Into::into).collect());
        self
    }

    /// Name of this class in the table's first namespace, the key every
    /// record is filed under.
    pub fn primary_name(&self) -> &str {
        &self.names[0]
    }
}

/// The merged renaming relation across an ordered list of namespaces.
///
/// Classes are keyed by their name in the first namespace. Insertions
/// replace wholesale: a re-inserted class drops every member record the
/// previous entry carried, it never splices sub-fields. This is the merge
/// policy layered composition relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable {
    namespaces: Vec<String>,
    classes: BTreeMap<String, ClassMapping>,
}

impl MappingTable {
    pub fn new(namespaces: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
            classes: BTreeMap::new(),
        }
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn namespace_index(&self, namespace: &str) -> Option<usize> {
        self.namespaces.iter().position(|ns| ns == namespace)
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespace_index(namespace).is_some()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Insert a class record, replacing any previous record under the same
    /// first-namespace name wholesale.
    pub fn insert_class(&mut self, class: ClassMapping) -> Result<(), MappingError> {
        if class.names.len() != self.namespaces.len() {
            return Err(MappingError::NamespaceCount {
                expected: self.namespaces.len(),
                found: class.names.len(),
            });
        }
        for row in class.fields.values().chain(class.methods.values()) {
            if row.len() != self.namespaces.len() {
                return Err(MappingError::NamespaceCount {
                    expected: self.namespaces.len(),
                    found: row.len(),
                });
            }
        }
        self.classes.insert(class.primary_name().to_string(), class);
        Ok(())
    }

    /// Replace one member record of an existing class.
    pub fn insert_field(
        &mut self,
        owner: &str,
        key: MemberKey,
        names: Vec<String>,
    ) -> Result<(), MappingError> {
        self.insert_member(owner, key, names, true)
    }

    pub fn insert_method(
        &mut self,
        owner: &str,
        key: MemberKey,
        names: Vec<String>,
    ) -> Result<(), MappingError> {
        self.insert_member(owner, key, names, false)
    }

    fn insert_member(
        &mut self,
        owner: &str,
        key: MemberKey,
        names: Vec<String>,
        is_field: bool,
    ) -> Result<(), MappingError> {
        if names.len() != self.namespaces.len() {
            return Err(MappingError::NamespaceCount {
                expected: self.namespaces.len(),
                found: names.len(),
            });
        }
        let class = self
            .classes
            .get_mut(owner)
            .ok_or_else(|| MappingError::OrphanMember {
                owner: owner.to_string(),
            })?;
        if is_field {
            class.fields.insert(key, names);
        } else {
            class.methods.insert(key, names);
        }
        Ok(())
    }

    pub fn get_class(&self, primary_name: &str) -> Option<&ClassMapping> {
        self.classes.get(primary_name)
    }

    /// Classes in deterministic (first-namespace, lexicographic) order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassMapping> {
        self.classes.values()
    }

    /// Translate a class name from one namespace to another.
    ///
    /// `Ok(None)` means the table has no record for that class; whether that
    /// is tolerable is the caller's policy (the remap session treats it as
    /// fatal).
    pub fn rename_class(
        &self,
        name: &str,
        from: &str,
        to: &str,
    ) -> Result<Option<&str>, MappingError> {
        let from_idx = self
            .namespace_index(from)
            .ok_or_else(|| MappingError::UnknownNamespace(from.to_string()))?;
        let to_idx = self
            .namespace_index(to)
            .ok_or_else(|| MappingError::UnknownNamespace(to.to_string()))?;

        let class = if from_idx == 0 {
            self.classes.get(name)
        } else {
            // Keys are first-namespace names; a non-primary source namespace
            // needs a scan. Tables are small enough that no reverse index is
            // maintained.
            self.classes.values().find(|c| c.names[from_idx] == name)
        };
        Ok(class.map(|c| c.names[to_idx].as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MappingTable {
        let mut t = MappingTable::new(["official", "named"]);
        t.insert_class(
            ClassMapping::new(["a", "com/example/Alpha"]).field(
                MemberKey::new("x", "I"),
                ["x", "counter"],
            ),
        )
        .unwrap();
        t
    }

    #[test]
    fn rename_across_namespaces() {
        let t = table();
        assert_eq!(
            t.rename_class("a", "official", "named").unwrap(),
            Some("com/example/Alpha")
        );
        assert_eq!(
            t.rename_class("com/example/Alpha", "named", "official")
                .unwrap(),
            Some("a")
        );
        assert_eq!(t.rename_class("b", "official", "named").unwrap(), None);
    }

    #[test]
    fn unknown_namespace_is_an_error() {
        let t = table();
        assert!(matches!(
            t.rename_class("a", "official", "intermediary"),
            Err(MappingError::UnknownNamespace(_))
        ));
    }

    #[test]
    fn reinserting_a_class_replaces_it_wholesale() {
        let mut t = table();
        t.insert_class(ClassMapping::new(["a", "com/example/Renamed"]))
            .unwrap();

        let class = t.get_class("a").unwrap();
        assert_eq!(class.names[1], "com/example/Renamed");
        // The earlier record's members are gone, not spliced in.
        assert!(class.fields.is_empty());
    }

    #[test]
    fn name_row_width_is_checked() {
        let mut t = table();
        assert!(matches!(
            t.insert_class(ClassMapping::new(["only-one"])),
            Err(MappingError::NamespaceCount { .. })
        ));
    }

    #[test]
    fn member_of_unknown_class_is_rejected() {
        let mut t = table();
        let err = t
            .insert_field(
                "missing",
                MemberKey::new("y", "J"),
                vec!["y".into(), "timer".into()],
            )
            .unwrap_err();
        assert!(matches!(err, MappingError::OrphanMember { .. }));
    }
}

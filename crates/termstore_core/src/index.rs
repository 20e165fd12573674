//! Secondary index over record fields.
//!
//! An indexed record produces one entry per configured field it carries.
//! The entry key is `encode({Field, FieldValue, PrimaryKey})` and the value
//! is empty, so all records sharing a field value sit under the common
//! prefix `encode_prefix({Field, FieldValue})` in primary key order.

use crate::error::{StoreError, StoreResult};
use termstore_codec::{decode, encode, encode_prefix, Term};

/// Fields maintained in the secondary index.
#[derive(Debug, Clone, Default)]
pub struct IndexSpec {
    fields: Vec<Term>,
}

impl IndexSpec {
    /// Creates a spec over `fields`. Duplicate fields are ignored.
    #[must_use]
    pub fn new(fields: &[Term]) -> Self {
        let mut unique: Vec<Term> = Vec::with_capacity(fields.len());
        for field in fields {
            if !unique.contains(field) {
                unique.push(field.clone());
            }
        }
        Self { fields: unique }
    }

    /// Whether no field is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether `field` is indexed.
    #[must_use]
    pub fn covers(&self, field: &Term) -> bool {
        self.fields.contains(field)
    }

    /// Indexed fields.
    #[must_use]
    pub fn fields(&self) -> &[Term] {
        &self.fields
    }

    /// Encoded index entry keys for a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] if an entry key cannot be encoded.
    pub fn entry_keys(&self, primary: &Term, record: &Term) -> StoreResult<Vec<Vec<u8>>> {
        self.fields
            .iter()
            .filter_map(|field| field_value(record, field).map(|value| (field, value)))
            .map(|(field, value)| {
                let entry = Term::tuple([field.clone(), value.clone(), primary.clone()]);
                encode(&entry).map_err(StoreError::Encode)
            })
            .collect()
    }
}

/// Extracts `field` from a record value.
///
/// Map records are looked up by key. Tuple records take a 1-based integer
/// position. Any other record shape has no fields.
#[must_use]
pub fn field_value<'t>(record: &'t Term, field: &Term) -> Option<&'t Term> {
    match record {
        Term::Map(_) => record.get(field),
        Term::Tuple(_) => field
            .as_integer()
            .and_then(|position| usize::try_from(position).ok())
            .and_then(|position| record.element(position)),
        _ => None,
    }
}

/// Prefix under which all entries for `field == value` are stored.
pub(crate) fn lookup_prefix(field: &Term, value: &Term) -> StoreResult<Vec<u8>> {
    encode_prefix(&Term::tuple([field.clone(), value.clone()])).map_err(StoreError::Encode)
}

/// Recovers the primary key from an encoded index entry key.
pub(crate) fn primary_key(entry_key: &[u8]) -> StoreResult<Term> {
    let entry = decode(entry_key).map_err(StoreError::Decode)?;
    match entry {
        Term::Tuple(mut items) if items.len() == 3 => Ok(items.swap_remove(2)),
        other => Err(StoreError::Decode(termstore_codec::CodecError::non_canonical(
            format!("index entry is not a 3-tuple: {other}"),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Term {
        Term::map([
            (Term::atom("name"), Term::from("ann")),
            (Term::atom("role"), Term::atom("admin")),
        ])
    }

    #[test]
    fn map_fields_by_key() {
        assert_eq!(
            field_value(&user(), &Term::atom("role")),
            Some(&Term::atom("admin"))
        );
        assert_eq!(field_value(&user(), &Term::atom("age")), None);
    }

    #[test]
    fn tuple_fields_by_position() {
        let record = Term::tuple([Term::atom("user"), Term::from("bob"), Term::Integer(30)]);
        assert_eq!(field_value(&record, &Term::Integer(3)), Some(&Term::Integer(30)));
        assert_eq!(field_value(&record, &Term::Integer(0)), None);
        assert_eq!(field_value(&record, &Term::Integer(4)), None);
        assert_eq!(field_value(&record, &Term::Integer(-1)), None);
        assert_eq!(field_value(&record, &Term::atom("name")), None);
    }

    #[test]
    fn scalars_have_no_fields() {
        assert_eq!(field_value(&Term::Integer(1), &Term::Integer(1)), None);
        assert_eq!(field_value(&Term::from("x"), &Term::atom("x")), None);
    }

    #[test]
    fn entries_sit_under_lookup_prefix() {
        let spec = IndexSpec::new(&[Term::atom("role"), Term::atom("missing")]);
        let primary = Term::Integer(7);

        let keys = spec.entry_keys(&primary, &user()).unwrap();
        assert_eq!(keys.len(), 1);

        let prefix = lookup_prefix(&Term::atom("role"), &Term::atom("admin")).unwrap();
        assert!(keys[0].starts_with(&prefix));
        assert_eq!(primary_key(&keys[0]).unwrap(), primary);
    }

    #[test]
    fn lookup_prefix_does_not_match_longer_values() {
        let spec = IndexSpec::new(&[Term::atom("name")]);
        let keys = spec.entry_keys(&Term::Integer(1), &user()).unwrap();

        let prefix = lookup_prefix(&Term::atom("name"), &Term::from("an")).unwrap();
        assert!(!keys[0].starts_with(&prefix));
    }

    #[test]
    fn duplicate_fields_collapse() {
        let spec = IndexSpec::new(&[Term::atom("a"), Term::atom("a")]);
        assert_eq!(spec.fields().len(), 1);
        assert!(spec.covers(&Term::atom("a")));
        assert!(!spec.covers(&Term::atom("b")));
        assert!(IndexSpec::default().is_empty());
    }

    #[test]
    fn malformed_entry_key() {
        let bytes = encode(&Term::Integer(1)).unwrap();
        assert!(matches!(primary_key(&bytes), Err(StoreError::Decode(_))));
    }
}

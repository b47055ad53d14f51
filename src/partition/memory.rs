use super::{FieldKind, KeywordValues, NumericValues, PartitionContext, PartitionReader, Schema};
use crate::common::DocId;
use ahash::AHashMap;
use std::sync::Arc;

/// Column of per-document values, indexed by doc id.
#[derive(Debug, Default, Clone)]
pub struct MemoryColumn<T> {
    docs: Vec<Vec<T>>,
}

impl<T> MemoryColumn<T> {
    fn get(&self, doc: DocId) -> &[T] {
        self.docs
            .get(doc as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

impl NumericValues for MemoryColumn<i64> {
    fn values(&self, doc: DocId) -> &[i64] {
        self.get(doc)
    }
}

impl KeywordValues for MemoryColumn<String> {
    fn values(&self, doc: DocId) -> &[String] {
        self.get(doc)
    }
}

/// A document under construction for a [`MemoryPartition`].
#[derive(Debug, Default, Clone)]
pub struct Document {
    numeric: Vec<(String, Vec<i64>)>,
    keyword: Vec<(String, Vec<String>)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn numeric(mut self, field: &str, values: impl IntoIterator<Item = i64>) -> Self {
        self.numeric
            .push((field.to_string(), values.into_iter().collect()));
        self
    }

    pub fn keyword<S: Into<String>>(
        mut self,
        field: &str,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        self.keyword.push((
            field.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }
}

/// An in-memory partition. Document ids are assigned in insertion order starting at 0.
#[derive(Debug, Default)]
pub struct MemoryPartition {
    ordinal: usize,
    max_doc: DocId,
    schema: Arc<Schema>,
    numeric: AHashMap<String, Arc<MemoryColumn<i64>>>,
    keyword: AHashMap<String, Arc<MemoryColumn<String>>>,
}

impl MemoryPartition {
    /// Builds a partition whose schema holds exactly the fields its documents carry.
    pub fn from_documents(ordinal: usize, documents: impl IntoIterator<Item = Document>) -> Self {
        Self::with_schema(ordinal, Arc::default(), documents)
    }

    /// Builds a partition over a shared schema. Fields the documents carry but the schema
    /// lacks are added to this partition's copy.
    pub fn with_schema(
        ordinal: usize,
        mut schema: Arc<Schema>,
        documents: impl IntoIterator<Item = Document>,
    ) -> Self {
        let mut numeric: AHashMap<String, MemoryColumn<i64>> = AHashMap::new();
        let mut keyword: AHashMap<String, MemoryColumn<String>> = AHashMap::new();
        let mut max_doc: usize = 0;

        for (doc, document) in documents.into_iter().enumerate() {
            for (field, values) in document.numeric {
                put(numeric.entry(field).or_default(), doc, values);
            }
            for (field, values) in document.keyword {
                put(keyword.entry(field).or_default(), doc, values);
            }
            max_doc = doc + 1;
        }

        declare_all(&mut schema, numeric.keys(), FieldKind::Numeric);
        declare_all(&mut schema, keyword.keys(), FieldKind::Keyword);

        Self {
            ordinal,
            max_doc: max_doc as DocId,
            schema,
            numeric: numeric.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
            keyword: keyword.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
        }
    }

    pub fn into_context(self) -> PartitionContext {
        Arc::new(self)
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = DocId> {
        0..self.max_doc
    }
}

fn declare_all<'a>(
    schema: &mut Arc<Schema>,
    fields: impl Iterator<Item = &'a String>,
    kind: FieldKind,
) {
    for field in fields {
        if schema.kind(field).is_none() {
            Arc::make_mut(schema).declare(field, kind);
        }
    }
}

fn put<T>(column: &mut MemoryColumn<T>, doc: usize, values: Vec<T>) {
    if column.docs.len() <= doc {
        column.docs.resize_with(doc + 1, Vec::new);
    }
    column.docs[doc].extend(values);
}

impl PartitionReader for MemoryPartition {
    fn ordinal(&self) -> usize {
        self.ordinal
    }

    fn max_doc(&self) -> DocId {
        self.max_doc
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn numeric_values(&self, field: &str) -> Option<Arc<dyn NumericValues>> {
        self.numeric
            .get(field)
            .map(|c| Arc::clone(c) as Arc<dyn NumericValues>)
    }

    fn keyword_values(&self, field: &str) -> Option<Arc<dyn KeywordValues>> {
        self.keyword
            .get(field)
            .map(|c| Arc::clone(c) as Arc<dyn KeywordValues>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_without_a_field_have_no_values() {
        let partition = MemoryPartition::from_documents(
            0,
            [
                Document::new().numeric("ts", [10]),
                Document::new().keyword("tag", ["x", "y"]),
                Document::new().numeric("ts", [30, 40]),
            ],
        );
        assert_eq!(partition.max_doc(), 3);

        let ts = partition.numeric_values("ts").unwrap();
        assert_eq!(ts.values(0), &[10]);
        assert!(ts.values(1).is_empty());
        assert_eq!(ts.values(2), &[30, 40]);
        assert!(ts.values(99).is_empty());

        let tags = partition.keyword_values("tag").unwrap();
        assert!(tags.values(0).is_empty());
        assert_eq!(tags.values(1), &["x".to_string(), "y".to_string()]);

        assert!(partition.numeric_values("missing").is_none());
        assert!(partition.keyword_values("ts").is_none());

        assert_eq!(partition.schema().kind("ts"), Some(FieldKind::Numeric));
        assert_eq!(partition.schema().kind("tag"), Some(FieldKind::Keyword));
        assert_eq!(partition.schema().kind("missing"), None);
    }

    #[test]
    fn test_shared_schema_is_extended_per_partition() {
        let shared = Arc::new(Schema::new().numeric("ts"));
        let partition = MemoryPartition::with_schema(
            1,
            Arc::clone(&shared),
            [Document::new().keyword("tag", ["a"])],
        );
        assert_eq!(partition.schema().kind("ts"), Some(FieldKind::Numeric));
        assert_eq!(partition.schema().kind("tag"), Some(FieldKind::Keyword));
        assert_eq!(shared.kind("tag"), None);
        assert!(partition.numeric_values("ts").is_none());
    }
}

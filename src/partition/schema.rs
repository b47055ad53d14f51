use ahash::AHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Numeric,
    Keyword,
}

/// Field names and kinds known to a set of partitions.
#[derive(Debug, Default, Clone)]
pub struct Schema {
    fields: AHashMap<String, FieldKind>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn numeric(self, field: &str) -> Self {
        self.with_field(field, FieldKind::Numeric)
    }

    pub fn keyword(self, field: &str) -> Self {
        self.with_field(field, FieldKind::Keyword)
    }

    pub fn with_field(mut self, field: &str, kind: FieldKind) -> Self {
        self.declare(field, kind);
        self
    }

    /// Declares a field unless it is already known. The first declaration wins.
    pub fn declare(&mut self, field: &str, kind: FieldKind) {
        if !self.fields.contains_key(field) {
            self.fields.insert(field.to_string(), kind);
        }
    }

    pub fn kind(&self, field: &str) -> Option<FieldKind> {
        self.fields.get(field).copied()
    }
}

/// String Interner for categorical columns
///
/// A categorical column stores each distinct string once and keeps a small
/// integer code per row. The interner is the dictionary of categories.
///
/// # Design
///
/// - Categories are stored once in a `Vec<String>`, in first-seen order
/// - A `HashMap<String, u32>` provides O(1) lookup from category to code
/// - Codes are 32-bit unsigned integers
/// - Occurrence counts track how many rows use each category
///
/// An interner is filled while a column is being recast and is frozen behind an
/// `Arc` afterwards, so columns built from it are cheap to clone and share.
///
/// # Examples
///
/// ```
/// use biorempp::StringInterner;
///
/// let mut interner = StringInterner::new();
///
/// let id1 = interner.intern("Aromatic");
/// let id2 = interner.intern("Metal");
/// let id3 = interner.intern("Aromatic");
///
/// assert_eq!(id1, id3);
/// assert_ne!(id1, id2);
/// assert_eq!(interner.resolve(id1), Some("Aromatic"));
/// ```

use std::collections::HashMap;

/// Interned string ID type
pub type StringId = u32;

/// Category dictionary mapping strings to dense codes
#[derive(Debug, Clone, Default)]
pub struct StringInterner {
    string_to_id: HashMap<String, StringId>,
    /// Stores strings by ID (index = ID)
    id_to_string: Vec<String>,
    /// Number of times each category was interned
    occurrences: Vec<u64>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        StringInterner {
            string_to_id: HashMap::with_capacity(capacity),
            id_to_string: Vec::with_capacity(capacity),
            occurrences: Vec::with_capacity(capacity),
        }
    }

    /// Intern a string, returning its code.
    /// Known strings return their existing code and bump the occurrence count.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.string_to_id.get(s) {
            self.occurrences[id as usize] += 1;
            return id;
        }

        let id = self.id_to_string.len() as StringId;
        self.id_to_string.push(s.to_string());
        self.occurrences.push(1);
        self.string_to_id.insert(s.to_string(), id);
        id
    }

    /// Look up the code of a string without interning it
    pub fn get(&self, s: &str) -> Option<StringId> {
        self.string_to_id.get(s).copied()
    }

    pub fn resolve(&self, id: StringId) -> Option<&str> {
        self.id_to_string.get(id as usize).map(|s| s.as_str())
    }

    pub fn occurrences(&self, id: StringId) -> u64 {
        self.occurrences.get(id as usize).copied().unwrap_or(0)
    }

    /// Number of distinct categories
    pub fn len(&self) -> usize {
        self.id_to_string.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_string.is_empty()
    }

    /// Categories in code order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.id_to_string.iter().map(|s| s.as_str())
    }

    /// Returns total memory used by the dictionary (approximate)
    pub fn memory_usage(&self) -> usize {
        let string_bytes: usize = self
            .id_to_string
            .iter()
            .map(|s| s.len() + std::mem::size_of::<String>())
            .sum();

        let map_overhead = self.string_to_id.capacity()
            * (std::mem::size_of::<String>() + std::mem::size_of::<StringId>());

        let vec_overhead = self.id_to_string.capacity() * std::mem::size_of::<String>()
            + self.occurrences.capacity() * std::mem::size_of::<u64>();

        string_bytes + map_overhead + vec_overhead
    }

    pub fn stats(&self) -> InternerStats {
        InternerStats {
            unique_strings: self.len(),
            total_references: self.occurrences.iter().sum(),
            memory_bytes: self.memory_usage(),
        }
    }
}

/// Statistics about a category dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternerStats {
    /// Number of distinct categories
    pub unique_strings: usize,
    /// Number of rows that referenced a category
    pub total_references: u64,
    /// Approximate memory usage in bytes
    pub memory_bytes: usize,
}

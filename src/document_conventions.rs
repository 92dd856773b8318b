/// Client-side conventions shared by every command built against a store.
#[derive(Debug, Clone)]
pub struct DocumentConventions {
    max_length_of_query_using_get_url: usize,
}

impl Default for DocumentConventions {
    fn default() -> Self {
        Self {
            max_length_of_query_using_get_url: 1024 + 512,
        }
    }
}

// Mutators
impl DocumentConventions {
    pub fn with_max_length_of_query_using_get_url(mut self, length: usize) -> Self {
        self.max_length_of_query_using_get_url = length;
        self
    }
}

// Getters
impl DocumentConventions {
    /// Query-text length at or below which [`QueryCommand`] travels as POST
    /// instead of GET.
    ///
    /// [`QueryCommand`]: crate::commands::QueryCommand
    pub fn max_length_of_query_using_get_url(&self) -> usize {
        self.max_length_of_query_using_get_url
    }
}
